//! The MCP tool definitions. Each tool is a thin wrapper around a command handler; the doc
//! comments become the tool descriptions that agents see.

use crate::args::{
    AddExpenseArgs, AddIncomeArgs, AddRecurringArgs, ExportArgs, IdArgs, ListExpensesArgs,
    ListIncomeArgs, ListRecurringArgs, MonthArgs, ProcessArgs, SearchArgs, SetBudgetArgs,
    StatisticsArgs, SummarizeArgs, TrendsArgs, UpdateExpenseArgs, UpdateIncomeArgs,
};
use crate::commands;
use crate::mcp::mcp_utils::tool_result;
use crate::mcp::ExpenseServer;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use tracing::info;

#[tool_router(vis = "pub(super)")]
impl ExpenseServer {
    #[tool]
    /// Initialize the expenses MCP service for this session and return usage instructions.
    /// You **MUST** call this **ONCE** before using other tools so that you have the full
    /// usage instructions. You **MAY** call it more than once if you have forgotten the
    /// usage instructions.
    async fn initialize_service(&self) -> Result<CallToolResult, McpError> {
        let mut initialized = self.initialized.lock().await;
        *initialized = true;
        Ok(CallToolResult::success(vec![rmcp::model::Content::text(
            include_str!("docs/INSTRUCTIONS.md"),
        )]))
    }

    /// Add a new expense and return its id.
    ///
    /// `date` (YYYY-MM-DD), a positive `amount` and a `category` are required; subcategory,
    /// note, payment_method, location and comma-separated tags are optional. Prefer category
    /// and payment-method values from the `expense://categories` resource. The input is
    /// validated before anything is written.
    #[tool]
    async fn add_expense(
        &self,
        Parameters(args): Parameters<AddExpenseArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::add_expense(config, args).await;
        tool_result(out)
    }

    /// Update an existing expense by id and return the updated record.
    ///
    /// Only the fields you supply are re-validated and changed; for optional fields an empty
    /// string clears the stored value. Fails with `not_found` if the id does not exist.
    #[tool]
    async fn update_expense(
        &self,
        Parameters(args): Parameters<UpdateExpenseArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::update_expense(config, args).await;
        tool_result(out)
    }

    /// Delete an expense by id. Fails with `not_found` if the id does not exist, including
    /// on a repeated delete of the same id.
    #[tool]
    async fn delete_expense(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::delete_expense(config, args).await;
        tool_result(out)
    }

    /// Get one expense by id.
    #[tool]
    async fn get_expense_by_id(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::get_expense(config, args).await;
        tool_result(out)
    }

    /// List expenses in an inclusive date range, ordered by date then id.
    ///
    /// Optional filters: `category` and `payment_method` match exactly; `location` and `tag`
    /// match substrings.
    #[tool]
    async fn list_expenses(
        &self,
        Parameters(args): Parameters<ListExpensesArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::list_expenses(config, args).await;
        tool_result(out)
    }

    /// Search expenses by keyword, newest first.
    ///
    /// The keyword is matched case-insensitively as a substring of the note, category,
    /// subcategory, location and tags fields. Optional `date_from`/`date_to` bound the
    /// results.
    #[tool]
    async fn search_expenses(
        &self,
        Parameters(args): Parameters<SearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::search_expenses(config, args).await;
        tool_result(out)
    }

    /// Add a new income record and return its id.
    ///
    /// `date` (YYYY-MM-DD), a positive `amount` and a `source` (e.g. an employer name) are
    /// required; category and note are optional.
    #[tool]
    async fn add_income(
        &self,
        Parameters(args): Parameters<AddIncomeArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::add_income(config, args).await;
        tool_result(out)
    }

    /// Update an existing income record by id and return the updated record. Only supplied
    /// fields are changed.
    #[tool]
    async fn update_income(
        &self,
        Parameters(args): Parameters<UpdateIncomeArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::update_income(config, args).await;
        tool_result(out)
    }

    /// Delete an income record by id.
    #[tool]
    async fn delete_income(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::delete_income(config, args).await;
        tool_result(out)
    }

    /// Get one income record by id.
    #[tool]
    async fn get_income_by_id(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::get_income(config, args).await;
        tool_result(out)
    }

    /// List income records in an inclusive date range, ordered by date then id. Optional
    /// `source` and `category` filters match exactly.
    #[tool]
    async fn list_income(
        &self,
        Parameters(args): Parameters<ListIncomeArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::list_income(config, args).await;
        tool_result(out)
    }

    /// Search income records by keyword (note, source and category fields), newest first.
    #[tool]
    async fn search_income(
        &self,
        Parameters(args): Parameters<SearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::search_income(config, args).await;
        tool_result(out)
    }

    /// Add a recurring expense template.
    ///
    /// The template materializes a concrete expense per period once processed. `name` must
    /// be unique (a duplicate fails with `conflict`), `frequency` is one of daily, weekly,
    /// monthly or yearly, and `next_due_date` is the first date the expense is due.
    #[tool]
    async fn add_recurring_expense(
        &self,
        Parameters(args): Parameters<AddRecurringArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::add_recurring_expense(config, args).await;
        tool_result(out)
    }

    /// List recurring expense templates, soonest due first. By default only active templates
    /// are returned; pass `active_only: false` to include deactivated ones.
    #[tool]
    async fn list_recurring_expenses(
        &self,
        Parameters(args): Parameters<ListRecurringArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::list_recurring_expenses(config, args).await;
        tool_result(out)
    }

    /// Deactivate a recurring expense template by id.
    ///
    /// Deactivation is one-way: the processing engine skips inactive templates and there is
    /// no reactivation operation. The template and its already-materialized expenses are
    /// kept.
    #[tool]
    async fn deactivate_recurring_expense(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::deactivate_recurring_expense(config, args).await;
        tool_result(out)
    }

    /// Process recurring templates that are due and create the corresponding expenses.
    ///
    /// For every active template whose due date is on or before `as_of_date` (default:
    /// today), one expense is materialized per missed period — dated with that occurrence's
    /// due date — and the template's due date advances past the as-of date. Monthly and
    /// yearly advancement clamp to the last valid day of a shorter target month.
    ///
    /// Returns a per-template report: materialized counts, new due dates, and any templates
    /// that were skipped because their stored data could not be read. Skipping one template
    /// never aborts the others.
    #[tool]
    async fn process_due_recurring_expenses(
        &self,
        Parameters(args): Parameters<ProcessArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!(
            "MCP: process_due_recurring_expenses called with as_of_date={:?}",
            args.as_of_date
        );
        let config = (*self.config).clone();
        let out = commands::process_due_recurring_expenses(config, args).await;
        tool_result(out)
    }

    /// Summarize expenses in a date range, grouped by category, subcategory, payment_method
    /// or date. Returns each group's total and count, largest total first. Expenses missing
    /// the chosen optional dimension are bucketed under "(none)".
    #[tool]
    async fn summarize(
        &self,
        Parameters(args): Parameters<SummarizeArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::summarize(config, args).await;
        tool_result(out)
    }

    /// Report spending trends for the trailing N calendar months (default 6), oldest first.
    ///
    /// Each entry carries the month's total, expense count and per-category breakdown.
    /// Months with no expenses are included with zero totals. `end_month` (YYYY-MM)
    /// overrides the final month of the series; it defaults to the current month.
    #[tool]
    async fn get_spending_trends(
        &self,
        Parameters(args): Parameters<TrendsArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::get_spending_trends(config, args).await;
        tool_result(out)
    }

    /// Get statistics for the expenses in a date range: count, total, mean, minimum,
    /// maximum, the single largest expense, the top category by total spend, the number of
    /// distinct days with expenses, and the per-day average.
    #[tool]
    async fn get_expense_statistics(
        &self,
        Parameters(args): Parameters<StatisticsArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::get_expense_statistics(config, args).await;
        tool_result(out)
    }

    /// Set or replace the monthly budget limit for a category. The limit must be positive.
    #[tool]
    async fn set_budget(
        &self,
        Parameters(args): Parameters<SetBudgetArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::set_budget(config, args).await;
        tool_result(out)
    }

    /// Check budget compliance for a month (YYYY-MM, default: the current month).
    ///
    /// For each budgeted category, reports the limit, the spend, the remaining headroom
    /// (negative once exceeded), the percentage used, and whether the category is over
    /// budget. Spending exactly the limit counts as over budget.
    #[tool]
    async fn check_budget_status(
        &self,
        Parameters(args): Parameters<MonthArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::check_budget_status(config, args).await;
        tool_result(out)
    }

    /// Calculate net worth for a month (YYYY-MM, default: the current month): total income
    /// minus total expenses, plus the savings rate as a ratio of income (zero when the month
    /// has no income).
    #[tool]
    async fn calculate_net_worth(
        &self,
        Parameters(args): Parameters<MonthArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::calculate_net_worth(config, args).await;
        tool_result(out)
    }

    /// Export the expenses in a date range to a CSV file on the local disk.
    ///
    /// Rows are filtered and ordered exactly like `list_expenses` and written with a fixed
    /// header (Date, Amount, Category, Subcategory, Note, Payment Method, Location, Tags)
    /// and standard CSV quoting. Returns the destination path and the row count. Fails with
    /// `io` if the destination cannot be written.
    #[tool]
    async fn export_expenses_csv(
        &self,
        Parameters(args): Parameters<ExportArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = (*self.config).clone();
        let out = commands::export_expenses_csv(config, args).await;
        tool_result(out)
    }
}
