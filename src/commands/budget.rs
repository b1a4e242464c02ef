//! Budget management.

use crate::args::SetBudgetArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::Budgets;
use crate::{validate, Config, Result};

/// Sets or replaces the monthly spending limit for a category.
///
/// The budgets document is read, modified and rewritten on each call, so a limit set during
/// a session is visible to the next `check_budget_status` without restarting.
pub async fn set_budget(config: Config, args: SetBudgetArgs) -> Result<Out<Budgets>> {
    let category = validate::required("category", &args.category)?;
    let limit = validate::positive_amount("monthly_limit", args.monthly_limit)?;

    let path = config.budgets_path();
    let mut budgets = Budgets::load(&path).await.pub_result(ErrorType::Io)?;
    budgets.set(&category, limit);
    budgets.save(&path).await.pub_result(ErrorType::Io)?;

    let message = format!("Set budget for {category}: {limit}/month");
    Ok(Out::new(message, budgets))
}
