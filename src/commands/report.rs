//! The aggregation and reporting handlers: grouped summaries, monthly trends, descriptive
//! statistics, budget compliance and net worth.
//!
//! All of these are pure reads. They pull rows through the same listing queries the CRUD
//! handlers use and do the arithmetic in Rust on `Decimal`, so results are deterministic for
//! identical store contents and arguments.

use crate::args::{GroupBy, MonthArgs, StatisticsArgs, SummarizeArgs, TrendsArgs};
use crate::commands::Out;
use crate::error::{validation, ErrorType, IntoResult};
use crate::model::{Amount, Budgets, Expense, ExpenseFilter, IncomeFilter};
use crate::{validate, Config, Result};
use chrono::{Datelike, Local, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The bucket key used when an expense lacks the optional grouping dimension.
const NONE_KEY: &str = "(none)";

/// One bucket of a grouped summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub total: Amount,
    pub count: u32,
}

/// One month of a spending-trends series. Months with no expenses report a zero total and an
/// empty category list rather than being omitted.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    /// The month, formatted YYYY-MM.
    pub month: String,
    pub total: Amount,
    pub count: u32,
    pub categories: Vec<GroupSummary>,
}

/// Descriptive statistics over the expenses in a date range.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub count: u32,
    pub total: Amount,
    /// Mean expense amount, rounded to cents. `None` when the range is empty.
    pub mean: Option<Amount>,
    pub min: Option<Amount>,
    pub max: Option<Amount>,
    /// The single largest expense in the range (the earliest one on a tie).
    pub largest_expense: Option<Expense>,
    /// The category with the greatest total spend.
    pub top_category: Option<GroupSummary>,
    /// How many distinct dates carry at least one expense.
    pub days_tracked: u32,
    /// Total divided by days_tracked, rounded to cents. `None` when the range is empty.
    pub daily_average: Option<Amount>,
}

/// Budget compliance for one category in one month.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub category: String,
    pub monthly_limit: Amount,
    pub spent: Amount,
    /// Headroom left this month; negative once the limit is exceeded.
    pub remaining: Amount,
    /// Spend as a percentage of the limit, rounded to one decimal place.
    pub percent_used: Decimal,
    /// True when spend has reached the limit. The boundary is inclusive: spending exactly
    /// the limit counts as over budget.
    pub over_budget: bool,
}

/// Income minus expenses for one month.
#[derive(Debug, Clone, Serialize)]
pub struct NetWorth {
    /// The month, formatted YYYY-MM.
    pub month: String,
    pub total_income: Amount,
    pub total_expenses: Amount,
    pub net_worth: Amount,
    /// `net_worth / total_income` as a ratio rounded to four decimal places, or zero when
    /// the month has no income.
    pub savings_rate: Decimal,
}

/// Groups expenses in a date range by the requested dimension and totals each bucket,
/// largest total first.
pub async fn summarize(config: Config, args: SummarizeArgs) -> Result<Out<Vec<GroupSummary>>> {
    let date_from = validate::date("date_from", &args.date_from)?;
    let date_to = validate::date("date_to", &args.date_to)?;
    validate::date_range(date_from, date_to)?;
    let mut filter = ExpenseFilter::range(date_from, date_to);
    filter.category = validate::optional(args.category);

    let expenses = config
        .db()
        .list_expenses(&filter)
        .await
        .pub_result(ErrorType::Database)?;
    let groups = group(&expenses, args.group_by);
    let message = format!(
        "Summarized {} expense{} into {} {} group{}",
        expenses.len(),
        if expenses.len() == 1 { "" } else { "s" },
        groups.len(),
        args.group_by,
        if groups.len() == 1 { "" } else { "s" }
    );
    Ok(Out::new(message, groups))
}

/// Reports per-month totals and category breakdowns for the trailing `months` calendar
/// months, oldest first.
pub async fn get_spending_trends(
    config: Config,
    args: TrendsArgs,
) -> Result<Out<Vec<MonthlySummary>>> {
    if args.months == 0 {
        return Err(validation("months must be at least 1"));
    }
    let end_first = match &args.end_month {
        Some(m) => validate::month_bounds(m)?.0,
        None => current_month_first(),
    };
    let start_first = end_first
        .checked_sub_months(Months::new(args.months - 1))
        .ok_or_else(|| validation(format!("months value {} is out of range", args.months)))?;
    let end_last = last_day_of_month(end_first);

    let expenses = config
        .db()
        .list_expenses(&ExpenseFilter::range(start_first, end_last))
        .await
        .pub_result(ErrorType::Database)?;

    let mut by_month: BTreeMap<String, Vec<&Expense>> = BTreeMap::new();
    for e in &expenses {
        by_month.entry(e.month_key()).or_default().push(e);
    }

    let mut series = Vec::with_capacity(args.months as usize);
    let mut month_first = start_first;
    while month_first <= end_first {
        let key = month_first.format("%Y-%m").to_string();
        let month_expenses: Vec<Expense> = by_month
            .get(&key)
            .map(|v| v.iter().map(|e| (*e).clone()).collect())
            .unwrap_or_default();
        series.push(MonthlySummary {
            month: key,
            total: month_expenses.iter().map(|e| e.amount).sum(),
            count: month_expenses.len() as u32,
            categories: group(&month_expenses, GroupBy::Category),
        });
        month_first = month_first
            .checked_add_months(Months::new(1))
            .ok_or_else(|| validation("month range is out of range"))?;
    }

    let message = format!(
        "Spending trends for {} month{} ending {}",
        args.months,
        if args.months == 1 { "" } else { "s" },
        end_first.format("%Y-%m")
    );
    Ok(Out::new(message, series))
}

/// Computes descriptive statistics over the expenses in a date range. An empty range yields
/// zero counts and `None` aggregates rather than an error.
pub async fn get_expense_statistics(
    config: Config,
    args: StatisticsArgs,
) -> Result<Out<Statistics>> {
    let date_from = validate::date("date_from", &args.date_from)?;
    let date_to = validate::date("date_to", &args.date_to)?;
    validate::date_range(date_from, date_to)?;

    let expenses = config
        .db()
        .list_expenses(&ExpenseFilter::range(date_from, date_to))
        .await
        .pub_result(ErrorType::Database)?;

    let count = expenses.len() as u32;
    let total: Amount = expenses.iter().map(|e| e.amount).sum();

    let mut largest: Option<&Expense> = None;
    for e in &expenses {
        if largest.map(|l| e.amount > l.amount).unwrap_or(true) {
            largest = Some(e);
        }
    }

    let days: BTreeSet<NaiveDate> = expenses.iter().map(|e| e.date).collect();
    let days_tracked = days.len() as u32;

    let stats = Statistics {
        count,
        total,
        mean: (count > 0).then(|| {
            Amount::new(total.value() / Decimal::from(count)).round_dp(2)
        }),
        min: expenses.iter().map(|e| e.amount).min(),
        max: expenses.iter().map(|e| e.amount).max(),
        largest_expense: largest.cloned(),
        top_category: group(&expenses, GroupBy::Category).into_iter().next(),
        days_tracked,
        daily_average: (days_tracked > 0).then(|| {
            Amount::new(total.value() / Decimal::from(days_tracked)).round_dp(2)
        }),
    };

    let message = format!(
        "{count} expense{} totaling {total} between {date_from} and {date_to}",
        if count == 1 { "" } else { "s" }
    );
    Ok(Out::new(message, stats))
}

/// Compares each budgeted category's spend in the given month against its configured limit.
pub async fn check_budget_status(config: Config, args: MonthArgs) -> Result<Out<Vec<BudgetStatus>>> {
    let month = month_or_current(&args);
    let (first, last) = validate::month_bounds(&month)?;

    let budgets = Budgets::load(&config.budgets_path())
        .await
        .pub_result(ErrorType::Io)?;
    if budgets.is_empty() {
        return Ok(Out::new("No budgets have been set", Vec::new()));
    }

    let expenses = config
        .db()
        .list_expenses(&ExpenseFilter::range(first, last))
        .await
        .pub_result(ErrorType::Database)?;
    let mut spent_by_category: BTreeMap<&str, Amount> = BTreeMap::new();
    for e in &expenses {
        *spent_by_category.entry(e.category.as_str()).or_insert(Amount::ZERO) += e.amount;
    }

    let mut statuses = Vec::new();
    for (category, &limit) in budgets.iter() {
        let spent = spent_by_category
            .get(category.as_str())
            .copied()
            .unwrap_or(Amount::ZERO);
        statuses.push(BudgetStatus {
            category: category.clone(),
            monthly_limit: limit,
            spent,
            remaining: limit - spent,
            // set_budget enforces a positive limit, so the division is safe.
            percent_used: (spent.value() * Decimal::from(100) / limit.value()).round_dp(1),
            over_budget: spent >= limit,
        });
    }

    let over = statuses.iter().filter(|s| s.over_budget).count();
    let message = format!(
        "{over} of {} budgeted categor{} over budget in {month}",
        statuses.len(),
        if statuses.len() == 1 { "y is" } else { "ies are" }
    );
    Ok(Out::new(message, statuses))
}

/// Computes income minus expenses for the given month, and the savings rate as a ratio of
/// income. A month with no income reports a zero rate instead of a division fault.
pub async fn calculate_net_worth(config: Config, args: MonthArgs) -> Result<Out<NetWorth>> {
    let month = month_or_current(&args);
    let (first, last) = validate::month_bounds(&month)?;

    let total_income: Amount = config
        .db()
        .list_income(&IncomeFilter::range(first, last))
        .await
        .pub_result(ErrorType::Database)?
        .iter()
        .map(|i| i.amount)
        .sum();
    let total_expenses: Amount = config
        .db()
        .list_expenses(&ExpenseFilter::range(first, last))
        .await
        .pub_result(ErrorType::Database)?
        .iter()
        .map(|e| e.amount)
        .sum();

    let net_worth = total_income - total_expenses;
    let savings_rate = if total_income.is_zero() {
        Decimal::ZERO
    } else {
        (net_worth.value() / total_income.value()).round_dp(4)
    };

    let result = NetWorth {
        month: month.clone(),
        total_income,
        total_expenses,
        net_worth,
        savings_rate,
    };
    let message = format!("Net worth for {month}: {net_worth} (savings rate {savings_rate})");
    Ok(Out::new(message, result))
}

/// Buckets expenses by the requested dimension, totals each bucket, and sorts by total
/// descending with the key as the tiebreak.
fn group(expenses: &[Expense], group_by: GroupBy) -> Vec<GroupSummary> {
    let mut buckets: BTreeMap<String, (Amount, u32)> = BTreeMap::new();
    for e in expenses {
        let key = match group_by {
            GroupBy::Category => e.category.clone(),
            GroupBy::Subcategory => e.subcategory.clone().unwrap_or_else(|| NONE_KEY.to_string()),
            GroupBy::PaymentMethod => {
                e.payment_method.clone().unwrap_or_else(|| NONE_KEY.to_string())
            }
            GroupBy::Date => e.date.to_string(),
        };
        let entry = buckets.entry(key).or_insert((Amount::ZERO, 0));
        entry.0 += e.amount;
        entry.1 += 1;
    }

    let mut groups: Vec<GroupSummary> = buckets
        .into_iter()
        .map(|(key, (total, count))| GroupSummary { key, total, count })
        .collect();
    groups.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
    groups
}

fn month_or_current(args: &MonthArgs) -> String {
    match &args.month {
        Some(m) => m.trim().to_string(),
        None => Local::now().date_naive().format("%Y-%m").to_string(),
    }
}

fn current_month_first() -> NaiveDate {
    let today = Local::now().date_naive();
    today.with_day(1).unwrap_or(today)
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.checked_sub_days(chrono::Days::new(1)))
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::SetBudgetArgs;
    use crate::commands::set_budget;
    use crate::test::TestEnv;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn summarize_args(from: &str, to: &str, group_by: GroupBy) -> SummarizeArgs {
        SummarizeArgs {
            date_from: from.to_string(),
            date_to: to.to_string(),
            group_by,
            category: None,
        }
    }

    fn month_args(m: &str) -> MonthArgs {
        MonthArgs {
            month: Some(m.to_string()),
        }
    }

    #[tokio::test]
    async fn test_summarize_sorts_by_total_descending() {
        let env = TestEnv::new().await;
        env.add_expense("2025-01-05", "10", "Food & Dining").await;
        env.add_expense("2025-01-06", "15", "Food & Dining").await;
        env.add_expense("2025-01-07", "40", "Transportation").await;

        let out = summarize(
            env.config(),
            summarize_args("2025-01-01", "2025-01-31", GroupBy::Category),
        )
        .await
        .unwrap();
        let groups = out.structure().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "Transportation");
        assert_eq!(groups[0].total, amt("40"));
        assert_eq!(groups[0].count, 1);
        assert_eq!(groups[1].key, "Food & Dining");
        assert_eq!(groups[1].total, amt("25"));
        assert_eq!(groups[1].count, 2);
    }

    #[tokio::test]
    async fn test_summarize_buckets_missing_dimension_under_none() {
        let env = TestEnv::new().await;
        env.add_expense("2025-01-05", "10", "Food & Dining").await;
        env.add_expense_with_payment("2025-01-06", "5", "Food & Dining", "Cash").await;

        let out = summarize(
            env.config(),
            summarize_args("2025-01-01", "2025-01-31", GroupBy::PaymentMethod),
        )
        .await
        .unwrap();
        let groups = out.structure().unwrap();
        assert_eq!(groups[0].key, NONE_KEY);
        assert_eq!(groups[0].total, amt("10"));
        assert_eq!(groups[1].key, "Cash");
    }

    #[tokio::test]
    async fn test_summarize_grand_total_matches_statistics_total() {
        let env = TestEnv::new().await;
        env.add_expense("2025-01-05", "10.10", "Food & Dining").await;
        env.add_expense("2025-01-15", "20.25", "Transportation").await;
        env.add_expense("2025-01-25", "0.65", "Shopping").await;
        // Outside the range, must not count.
        env.add_expense("2025-02-01", "99", "Shopping").await;

        let groups = summarize(
            env.config(),
            summarize_args("2025-01-01", "2025-01-31", GroupBy::Category),
        )
        .await
        .unwrap();
        let grand_total: Amount = groups.structure().unwrap().iter().map(|g| g.total).sum();

        let stats = get_expense_statistics(
            env.config(),
            StatisticsArgs {
                date_from: "2025-01-01".to_string(),
                date_to: "2025-01-31".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(grand_total, stats.structure().unwrap().total);
        assert_eq!(grand_total, amt("31.00"));
    }

    #[tokio::test]
    async fn test_statistics_fields() {
        let env = TestEnv::new().await;
        env.add_expense("2025-01-05", "10", "Food & Dining").await;
        env.add_expense("2025-01-05", "30", "Transportation").await;
        env.add_expense("2025-01-07", "20", "Food & Dining").await;

        let out = get_expense_statistics(
            env.config(),
            StatisticsArgs {
                date_from: "2025-01-01".to_string(),
                date_to: "2025-01-31".to_string(),
            },
        )
        .await
        .unwrap();
        let stats = out.structure().unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total, amt("60"));
        assert_eq!(stats.mean.unwrap(), amt("20.00"));
        assert_eq!(stats.min.unwrap(), amt("10"));
        assert_eq!(stats.max.unwrap(), amt("30"));
        assert_eq!(stats.largest_expense.as_ref().unwrap().amount, amt("30"));
        let top = stats.top_category.as_ref().unwrap();
        assert_eq!(top.key, "Transportation");
        assert_eq!(stats.days_tracked, 2);
        assert_eq!(stats.daily_average.unwrap(), amt("30.00"));
    }

    #[tokio::test]
    async fn test_statistics_empty_range_has_no_aggregates() {
        let env = TestEnv::new().await;
        let out = get_expense_statistics(
            env.config(),
            StatisticsArgs {
                date_from: "2025-01-01".to_string(),
                date_to: "2025-01-31".to_string(),
            },
        )
        .await
        .unwrap();
        let stats = out.structure().unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.total, Amount::ZERO);
        assert!(stats.mean.is_none());
        assert!(stats.largest_expense.is_none());
        assert!(stats.top_category.is_none());
        assert!(stats.daily_average.is_none());
    }

    #[tokio::test]
    async fn test_trends_includes_zero_months() {
        let env = TestEnv::new().await;
        // Expenses only in the oldest of the three months.
        env.add_expense("2025-01-10", "12", "Food & Dining").await;
        env.add_expense("2025-01-20", "8", "Shopping").await;

        let out = get_spending_trends(
            env.config(),
            TrendsArgs {
                months: 3,
                end_month: Some("2025-03".to_string()),
            },
        )
        .await
        .unwrap();
        let series = out.structure().unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(
            series.iter().map(|m| m.month.as_str()).collect::<Vec<_>>(),
            vec!["2025-01", "2025-02", "2025-03"]
        );
        assert_eq!(series[0].total, amt("20"));
        assert_eq!(series[0].count, 2);
        assert_eq!(series[0].categories.len(), 2);
        for empty in &series[1..] {
            assert_eq!(empty.total, Amount::ZERO);
            assert_eq!(empty.count, 0);
            assert!(empty.categories.is_empty());
        }
    }

    #[tokio::test]
    async fn test_trends_rejects_zero_months() {
        let env = TestEnv::new().await;
        let err = get_spending_trends(
            env.config(),
            TrendsArgs {
                months: 0,
                end_month: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), crate::error::ErrorType::Validation);
    }

    #[tokio::test]
    async fn test_budget_boundary_is_inclusive() {
        let env = TestEnv::new().await;
        set_budget(
            env.config(),
            SetBudgetArgs {
                category: "Food & Dining".to_string(),
                monthly_limit: amt("500"),
            },
        )
        .await
        .unwrap();

        env.add_expense("2025-01-10", "499.99", "Food & Dining").await;

        let out = check_budget_status(env.config(), month_args("2025-01")).await.unwrap();
        let status = &out.structure().unwrap()[0];
        assert!(!status.over_budget);
        assert_eq!(status.remaining, amt("0.01"));

        // One more cent reaches the limit exactly, which counts as over budget.
        env.add_expense("2025-01-11", "0.01", "Food & Dining").await;
        let out = check_budget_status(env.config(), month_args("2025-01")).await.unwrap();
        let status = &out.structure().unwrap()[0];
        assert!(status.over_budget);
        assert_eq!(status.spent, amt("500.00"));
        assert_eq!(status.remaining, amt("0.00"));
        assert_eq!(status.percent_used, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_budget_status_covers_unspent_categories() {
        let env = TestEnv::new().await;
        set_budget(
            env.config(),
            SetBudgetArgs {
                category: "Travel".to_string(),
                monthly_limit: amt("200"),
            },
        )
        .await
        .unwrap();

        let out = check_budget_status(env.config(), month_args("2025-01")).await.unwrap();
        let status = &out.structure().unwrap()[0];
        assert_eq!(status.spent, Amount::ZERO);
        assert_eq!(status.remaining, amt("200"));
        assert!(!status.over_budget);
    }

    #[tokio::test]
    async fn test_budget_status_with_no_budgets() {
        let env = TestEnv::new().await;
        let out = check_budget_status(env.config(), month_args("2025-01")).await.unwrap();
        assert!(out.structure().unwrap().is_empty());
        assert_eq!(out.message(), "No budgets have been set");
    }

    #[tokio::test]
    async fn test_net_worth_and_savings_rate() {
        let env = TestEnv::new().await;
        env.add_income("2025-01-15", "5000", "Acme Corp").await;
        env.add_expense("2025-01-10", "3200", "Home").await;
        // Adjacent months must not leak in.
        env.add_income("2025-02-01", "100", "Acme Corp").await;
        env.add_expense("2024-12-31", "100", "Home").await;

        let out = calculate_net_worth(env.config(), month_args("2025-01")).await.unwrap();
        let nw = out.structure().unwrap();
        assert_eq!(nw.total_income, amt("5000"));
        assert_eq!(nw.total_expenses, amt("3200"));
        assert_eq!(nw.net_worth, amt("1800"));
        assert_eq!(nw.savings_rate, Decimal::new(36, 2)); // 0.36
    }

    #[tokio::test]
    async fn test_net_worth_with_zero_income_reports_zero_rate() {
        let env = TestEnv::new().await;
        env.add_expense("2025-01-10", "50", "Home").await;

        let out = calculate_net_worth(env.config(), month_args("2025-01")).await.unwrap();
        let nw = out.structure().unwrap();
        assert_eq!(nw.net_worth, amt("-50"));
        assert_eq!(nw.savings_rate, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_month_args_reject_garbage() {
        let env = TestEnv::new().await;
        for bad in ["2025", "2025-13", "January", "2025-1"] {
            let err = calculate_net_worth(env.config(), month_args(bad)).await.unwrap_err();
            assert_eq!(err.error_type(), crate::error::ErrorType::Validation, "input: {bad}");
        }
    }
}
