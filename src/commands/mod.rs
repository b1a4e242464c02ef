//! Command handlers.
//!
//! Each handler implements one operation end-to-end: validate the raw arguments, call the
//! database, and package the outcome as an [`Out`]. Both the CLI and the MCP server route
//! through these functions, so they behave identically on either surface.

mod budget;
mod expense;
mod export;
mod income;
mod init;
mod mcp;
mod recurring;
mod report;

use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use budget::set_budget;
pub use expense::{
    add_expense, delete_expense, get_expense, list_expenses, search_expenses, update_expense,
};
pub use export::{export_expenses_csv, ExportReceipt};
pub use income::{
    add_income, delete_income, get_income, list_income, search_income, update_income,
};
pub use init::init;
pub use mcp::mcp;
pub use recurring::{
    add_recurring_expense, deactivate_recurring_expense, list_recurring_expenses,
    process_due_recurring_expenses, ProcessReport, ProcessedTemplate, SkippedTemplate,
};
pub use report::{
    calculate_net_worth, check_budget_status, get_expense_statistics, get_spending_trends,
    summarize, BudgetStatus, GroupSummary, MonthlySummary, NetWorth, Statistics,
};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data to both the command line and MCP server interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}
