//! Expense CRUD command handlers.

use crate::args::{AddExpenseArgs, IdArgs, ListExpensesArgs, SearchArgs, UpdateExpenseArgs};
use crate::commands::Out;
use crate::error::{not_found, validation, ErrorType, IntoResult};
use crate::model::{Expense, ExpenseFilter, ExpenseUpdates, NewExpense};
use crate::{validate, Config, Result};

/// Validates and inserts a new expense, returning the store-assigned id.
///
/// # Errors
///
/// - `Validation` if the date is malformed, the amount is not positive, or the category is
///   empty. Nothing is persisted in that case.
/// - `Database` if the insert fails.
pub async fn add_expense(config: Config, args: AddExpenseArgs) -> Result<Out<i64>> {
    let expense = NewExpense {
        date: validate::date("date", &args.date)?,
        amount: validate::positive_amount("amount", args.amount)?,
        category: validate::required("category", &args.category)?,
        subcategory: validate::optional(args.subcategory),
        note: validate::optional(args.note),
        payment_method: validate::optional(args.payment_method),
        location: validate::optional(args.location),
        tags: validate::optional(args.tags),
        recurring_template_id: None,
    };
    let id = config
        .db()
        .insert_expense(&expense)
        .await
        .pub_result(ErrorType::Database)?;
    let message = format!(
        "Added expense {id}: {} for {} on {}",
        expense.amount, expense.category, expense.date
    );
    Ok(Out::new(message, id))
}

/// Applies partial field changes to an expense and returns the updated record.
///
/// Only supplied fields are re-validated and written. Supplying an empty string for an
/// optional field clears it.
///
/// # Errors
///
/// - `Validation` if no updatable field was supplied, or a supplied field fails validation.
/// - `NotFound` if no expense has the given id.
pub async fn update_expense(config: Config, args: UpdateExpenseArgs) -> Result<Out<Expense>> {
    let id = args.id;
    let updates = ExpenseUpdates {
        date: args.date.as_deref().map(|d| validate::date("date", d)).transpose()?,
        amount: args
            .amount
            .map(|a| validate::positive_amount("amount", a))
            .transpose()?,
        category: args
            .category
            .as_deref()
            .map(|c| validate::required("category", c))
            .transpose()?,
        subcategory: args.subcategory,
        note: args.note,
        payment_method: args.payment_method,
        location: args.location,
        tags: args.tags,
    };
    if updates.is_empty() {
        return Err(validation("No fields to update"));
    }

    let updated = config
        .db()
        .update_expense(id, &updates)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| not_found(format!("Expense with id {id} not found")))?;
    Ok(Out::new(format!("Updated expense {id}"), updated))
}

/// Deletes an expense by id.
///
/// # Errors
///
/// - `NotFound` if no expense has the given id. A repeated delete of the same id fails the
///   same way rather than succeeding silently.
pub async fn delete_expense(config: Config, args: IdArgs) -> Result<Out<i64>> {
    let id = args.id;
    let deleted = config
        .db()
        .delete_expense(id)
        .await
        .pub_result(ErrorType::Database)?;
    if !deleted {
        return Err(not_found(format!("Expense with id {id} not found")));
    }
    Ok(Out::new(format!("Deleted expense {id}"), id))
}

/// Fetches a single expense by id, or fails with `NotFound`.
pub async fn get_expense(config: Config, args: IdArgs) -> Result<Out<Expense>> {
    let id = args.id;
    let expense = config
        .db()
        .get_expense(id)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| not_found(format!("Expense with id {id} not found")))?;
    Ok(Out::new(format!("Found expense {id}"), expense))
}

/// Lists expenses in an inclusive date range, narrowed by the optional filters, ordered by
/// date then id ascending.
pub async fn list_expenses(config: Config, args: ListExpensesArgs) -> Result<Out<Vec<Expense>>> {
    let date_from = validate::date("date_from", &args.date_from)?;
    let date_to = validate::date("date_to", &args.date_to)?;
    validate::date_range(date_from, date_to)?;
    let filter = ExpenseFilter {
        date_from,
        date_to,
        category: validate::optional(args.category),
        payment_method: validate::optional(args.payment_method),
        location: validate::optional(args.location),
        tag: validate::optional(args.tag),
    };

    let expenses = config
        .db()
        .list_expenses(&filter)
        .await
        .pub_result(ErrorType::Database)?;
    let message = format!(
        "Found {} expense{} between {date_from} and {date_to}",
        expenses.len(),
        if expenses.len() == 1 { "" } else { "s" }
    );
    Ok(Out::new(message, expenses))
}

/// Case-insensitive substring search over the free-text expense fields (note, category,
/// subcategory, location, tags), newest first.
pub async fn search_expenses(config: Config, args: SearchArgs) -> Result<Out<Vec<Expense>>> {
    let keyword = validate::required("keyword", &args.keyword)?;
    let date_from = args
        .date_from
        .as_deref()
        .map(|d| validate::date("date_from", d))
        .transpose()?;
    let date_to = args
        .date_to
        .as_deref()
        .map(|d| validate::date("date_to", d))
        .transpose()?;

    let expenses = config
        .db()
        .search_expenses(&keyword, date_from, date_to)
        .await
        .pub_result(ErrorType::Database)?;
    let message = format!(
        "Found {} expense{} matching '{keyword}'",
        expenses.len(),
        if expenses.len() == 1 { "" } else { "s" }
    );
    Ok(Out::new(message, expenses))
}
