//! Domain types shared by the database layer, the command handlers and the tool transport.

mod amount;
mod budget;
mod categories;
mod expense;
mod income;
mod recurring;

pub use amount::Amount;
pub use budget::Budgets;
pub use categories::Categories;
pub use expense::{Expense, ExpenseFilter, ExpenseUpdates, NewExpense};
pub use income::{Income, IncomeFilter, IncomeUpdates, NewIncome};
pub use recurring::{Frequency, NewRecurringTemplate, RecurringTemplate};
