//! These structs provide the CLI interface and the MCP tool parameter schemas.
//!
//! The same argument structs back both surfaces, as in: a struct can derive `clap::Parser`
//! for the command line and `Deserialize`/`JsonSchema` for the MCP tool call, so the two
//! interfaces cannot drift apart.

use crate::model::{Amount, Frequency};
use clap::{Parser, Subcommand};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// expenses: a local personal-finance record keeper.
///
/// Stores expenses, income, recurring-expense templates and budgets in a local SQLite
/// database and answers summary, trend, statistics, budget and net-worth questions over
/// them.
///
/// The primary way to use this program is through an AI agent, like Claude or Claude Code,
/// via the mcp subcommand. A few commands are also available directly from the command line.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory, the configuration files and an empty database.
    ///
    /// This is the first command you should run. Decide what directory you want to store
    /// data in and pass it as --home (or EXPENSES_HOME); by default it will be $HOME/expenses.
    Init,
    /// Run the MCP server on stdio for AI agent integration.
    Mcp,
    /// Materialize expenses from recurring templates that have come due.
    Process(ProcessArgs),
    /// Print grouped expense totals for a date range.
    Report(SummarizeArgs),
    /// Export expenses in a date range to a CSV file.
    Export(ExportArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate for instructions.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where expense data and configuration is held. Defaults to ~/expenses
    #[arg(long, env = "EXPENSES_HOME", default_value_t = default_expenses_home())]
    home: DisplayPath,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

fn default_expenses_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("expenses"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or EXPENSES_HOME instead of relying on the default \
                home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("expenses")
        }
    })
}

/// The dimension used to bucket expenses for summary aggregation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Category,
    Subcategory,
    PaymentMethod,
    Date,
}

serde_plain::derive_display_from_serialize!(GroupBy);
serde_plain::derive_fromstr_from_deserialize!(GroupBy);

// =====================================================================================
// Expense tools
// =====================================================================================

/// Parameters for the add_expense tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "AddExpenseParams")]
pub struct AddExpenseArgs {
    /// The calendar date of the expense, formatted YYYY-MM-DD.
    pub date: String,

    /// The amount spent. Must be positive.
    pub amount: Amount,

    /// The expense category, ideally one from the categories resource.
    pub category: String,

    /// Optional finer-grained category.
    #[serde(default)]
    pub subcategory: Option<String>,

    /// Optional free-text note.
    #[serde(default)]
    pub note: Option<String>,

    /// Optional payment method, ideally one from the categories resource.
    #[serde(default)]
    pub payment_method: Option<String>,

    /// Optional location, e.g. a merchant or city.
    #[serde(default)]
    pub location: Option<String>,

    /// Optional comma-separated tags, e.g. "work,travel".
    #[serde(default)]
    pub tags: Option<String>,
}

/// Parameters for the update_expense tool. Only fields with values are modified; for optional
/// columns an empty string clears the stored value.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[schemars(title = "UpdateExpenseParams")]
pub struct UpdateExpenseArgs {
    /// The id of the expense to update.
    pub id: i64,

    /// New date, formatted YYYY-MM-DD.
    #[serde(default)]
    pub date: Option<String>,

    /// New amount. Must be positive.
    #[serde(default)]
    pub amount: Option<Amount>,

    /// New category.
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub subcategory: Option<String>,

    #[serde(default)]
    pub note: Option<String>,

    #[serde(default)]
    pub payment_method: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub tags: Option<String>,
}

/// Parameters for tools that reference a single record by id.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "IdParams")]
pub struct IdArgs {
    /// The store-assigned record id.
    pub id: i64,
}

/// Parameters for the list_expenses tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "ListExpensesParams")]
pub struct ListExpensesArgs {
    /// Start of the date range (inclusive), formatted YYYY-MM-DD.
    pub date_from: String,

    /// End of the date range (inclusive), formatted YYYY-MM-DD.
    pub date_to: String,

    /// Only expenses with exactly this category.
    #[serde(default)]
    pub category: Option<String>,

    /// Only expenses with exactly this payment method.
    #[serde(default)]
    pub payment_method: Option<String>,

    /// Only expenses whose location contains this text.
    #[serde(default)]
    pub location: Option<String>,

    /// Only expenses whose tags contain this text.
    #[serde(default)]
    pub tag: Option<String>,
}

/// Parameters for the search tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "SearchParams")]
pub struct SearchArgs {
    /// Case-insensitive text to look for in the free-text fields.
    pub keyword: String,

    /// Optional lower date bound (inclusive), formatted YYYY-MM-DD.
    #[serde(default)]
    pub date_from: Option<String>,

    /// Optional upper date bound (inclusive), formatted YYYY-MM-DD.
    #[serde(default)]
    pub date_to: Option<String>,
}

// =====================================================================================
// Income tools
// =====================================================================================

/// Parameters for the add_income tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "AddIncomeParams")]
pub struct AddIncomeArgs {
    /// The calendar date the income was received, formatted YYYY-MM-DD.
    pub date: String,

    /// The amount received. Must be positive.
    pub amount: Amount,

    /// Where the money came from, e.g. an employer name.
    pub source: String,

    /// Optional income category, e.g. "salary" or "freelance".
    #[serde(default)]
    pub category: Option<String>,

    /// Optional free-text note.
    #[serde(default)]
    pub note: Option<String>,
}

/// Parameters for the update_income tool. Only fields with values are modified; for optional
/// columns an empty string clears the stored value.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[schemars(title = "UpdateIncomeParams")]
pub struct UpdateIncomeArgs {
    /// The id of the income record to update.
    pub id: i64,

    /// New date, formatted YYYY-MM-DD.
    #[serde(default)]
    pub date: Option<String>,

    /// New amount. Must be positive.
    #[serde(default)]
    pub amount: Option<Amount>,

    /// New source.
    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub note: Option<String>,
}

/// Parameters for the list_income tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "ListIncomeParams")]
pub struct ListIncomeArgs {
    /// Start of the date range (inclusive), formatted YYYY-MM-DD.
    pub date_from: String,

    /// End of the date range (inclusive), formatted YYYY-MM-DD.
    pub date_to: String,

    /// Only income with exactly this source.
    #[serde(default)]
    pub source: Option<String>,

    /// Only income with exactly this category.
    #[serde(default)]
    pub category: Option<String>,
}

// =====================================================================================
// Recurring templates
// =====================================================================================

/// Parameters for the add_recurring_expense tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "AddRecurringExpenseParams")]
pub struct AddRecurringArgs {
    /// A unique name for the template, e.g. "Rent".
    pub name: String,

    /// The amount of each materialized expense. Must be positive.
    pub amount: Amount,

    /// The category of each materialized expense.
    pub category: String,

    /// How often the expense recurs.
    pub frequency: Frequency,

    /// The first due date, formatted YYYY-MM-DD.
    pub next_due_date: String,

    /// Optional finer-grained category.
    #[serde(default)]
    pub subcategory: Option<String>,

    /// Optional free-text note copied onto each materialized expense.
    #[serde(default)]
    pub note: Option<String>,
}

/// Parameters for the list_recurring_expenses tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "ListRecurringExpensesParams")]
pub struct ListRecurringArgs {
    /// When true (the default), only active templates are returned.
    #[serde(default = "default_true")]
    pub active_only: bool,
}

fn default_true() -> bool {
    true
}

/// Parameters for the process_due_recurring_expenses tool and the process CLI command.
#[derive(Debug, Clone, Default, Parser, Deserialize, JsonSchema)]
#[schemars(title = "ProcessDueRecurringExpensesParams")]
pub struct ProcessArgs {
    /// The reference "today" used to decide which templates are due, formatted YYYY-MM-DD.
    /// Defaults to the current date.
    #[arg(long)]
    #[serde(default)]
    pub as_of_date: Option<String>,
}

// =====================================================================================
// Reports
// =====================================================================================

/// Parameters for the summarize tool and the report CLI command.
#[derive(Debug, Clone, Parser, Deserialize, JsonSchema)]
#[schemars(title = "SummarizeParams")]
pub struct SummarizeArgs {
    /// Start of the date range (inclusive), formatted YYYY-MM-DD.
    #[arg(long)]
    pub date_from: String,

    /// End of the date range (inclusive), formatted YYYY-MM-DD.
    #[arg(long)]
    pub date_to: String,

    /// The dimension to group by: category, subcategory, payment_method or date.
    #[arg(long, value_enum, default_value_t = GroupBy::Category)]
    #[serde(default)]
    pub group_by: GroupBy,

    /// Optionally restrict the summary to a single category before grouping.
    #[arg(long)]
    #[serde(default)]
    pub category: Option<String>,
}

/// Parameters for the get_spending_trends tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "GetSpendingTrendsParams")]
pub struct TrendsArgs {
    /// How many trailing calendar months to report, ending at the current month.
    #[serde(default = "default_months")]
    pub months: u32,

    /// Overrides the final month of the series, formatted YYYY-MM. Defaults to the current
    /// month.
    #[serde(default)]
    pub end_month: Option<String>,
}

fn default_months() -> u32 {
    6
}

/// Parameters for the get_expense_statistics tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "GetExpenseStatisticsParams")]
pub struct StatisticsArgs {
    /// Start of the date range (inclusive), formatted YYYY-MM-DD.
    pub date_from: String,

    /// End of the date range (inclusive), formatted YYYY-MM-DD.
    pub date_to: String,
}

/// Parameters for the set_budget tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(title = "SetBudgetParams")]
pub struct SetBudgetArgs {
    /// The expense category the limit applies to.
    pub category: String,

    /// The monthly spending limit. Must be positive. Replaces any existing limit for the
    /// category.
    pub monthly_limit: Amount,
}

/// Parameters for tools that report on a single calendar month.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[schemars(title = "MonthParams")]
pub struct MonthArgs {
    /// The month to report on, formatted YYYY-MM. Defaults to the current month.
    #[serde(default)]
    pub month: Option<String>,
}

// =====================================================================================
// Export
// =====================================================================================

/// Parameters for the export_expenses_csv tool and the export CLI command.
#[derive(Debug, Clone, Parser, Deserialize, JsonSchema)]
#[schemars(title = "ExportExpensesCsvParams")]
pub struct ExportArgs {
    /// Start of the date range (inclusive), formatted YYYY-MM-DD.
    #[arg(long)]
    pub date_from: String,

    /// End of the date range (inclusive), formatted YYYY-MM-DD.
    #[arg(long)]
    pub date_to: String,

    /// The file to write. Parent directories must already exist.
    #[arg(long)]
    pub destination: PathBuf,

    /// Only expenses with exactly this category.
    #[arg(long)]
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_round_trips_through_strings() {
        assert_eq!("payment_method".parse::<GroupBy>().unwrap(), GroupBy::PaymentMethod);
        assert_eq!(GroupBy::PaymentMethod.to_string(), "payment_method");
        assert!("merchant".parse::<GroupBy>().is_err());
    }

    #[test]
    fn tool_args_deserialize_with_defaults() {
        let args: ListRecurringArgs = serde_json::from_str("{}").unwrap();
        assert!(args.active_only);

        let args: TrendsArgs = serde_json::from_str("{}").unwrap();
        assert_eq!(args.months, 6);
        assert_eq!(args.end_month, None);

        let args: AddExpenseArgs = serde_json::from_str(
            r#"{"date": "2025-01-15", "amount": 4.5, "category": "Food & Dining"}"#,
        )
        .unwrap();
        assert_eq!(args.subcategory, None);
        assert_eq!(args.amount.to_string(), "4.5");
    }

    #[test]
    fn summarize_params_schema_mentions_grouping() {
        let schema = schemars::schema_for!(SummarizeArgs);
        let json = serde_json::to_string_pretty(&schema).unwrap();
        let expected_snippet = "dimension to group by";
        assert!(
            json.contains(expected_snippet),
            "Expected JSON schema to contain '{expected_snippet}' but it did not. \
             Schema:\n\n{json}\n\n"
        );
    }
}
