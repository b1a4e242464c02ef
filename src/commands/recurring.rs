//! Recurring-expense template handlers and the due-date processing engine.

use crate::args::{AddRecurringArgs, IdArgs, ListRecurringArgs, ProcessArgs};
use crate::commands::Out;
use crate::db::TemplateLoad;
use crate::error::{conflict, not_found, ErrorType, IntoResult};
use crate::model::{NewExpense, NewRecurringTemplate, RecurringTemplate};
use crate::{validate, Config, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

/// Validates and inserts a new recurring template.
///
/// # Errors
///
/// - `Validation` for a malformed due date, non-positive amount, unknown frequency (rejected
///   at the argument boundary), or empty name/category.
/// - `Conflict` when a template with the same name already exists.
pub async fn add_recurring_expense(config: Config, args: AddRecurringArgs) -> Result<Out<i64>> {
    let template = NewRecurringTemplate {
        name: validate::required("name", &args.name)?,
        amount: validate::positive_amount("amount", args.amount)?,
        category: validate::required("category", &args.category)?,
        subcategory: validate::optional(args.subcategory),
        note: validate::optional(args.note),
        frequency: args.frequency,
        next_due_date: validate::date("next_due_date", &args.next_due_date)?,
    };

    let id = match config.db().insert_template(&template).await {
        Ok(id) => id,
        Err(e) if format!("{e:#}").contains("UNIQUE constraint failed") => {
            return Err(conflict(format!(
                "A recurring template named '{}' already exists",
                template.name
            )));
        }
        Err(e) => return Err(e).pub_result(ErrorType::Database),
    };

    let message = format!(
        "Added recurring template {id}: '{}' ({} {})",
        template.name, template.amount, template.frequency
    );
    Ok(Out::new(message, id))
}

/// Lists recurring templates, soonest due first.
pub async fn list_recurring_expenses(
    config: Config,
    args: ListRecurringArgs,
) -> Result<Out<Vec<RecurringTemplate>>> {
    let templates = config
        .db()
        .list_templates(args.active_only)
        .await
        .pub_result(ErrorType::Database)?;
    let message = format!(
        "Found {} {}recurring template{}",
        templates.len(),
        if args.active_only { "active " } else { "" },
        if templates.len() == 1 { "" } else { "s" }
    );
    Ok(Out::new(message, templates))
}

/// Deactivates a recurring template. This is a one-way transition: there is no reactivation
/// operation, and the processing engine skips inactive templates.
///
/// # Errors
///
/// - `NotFound` when no template has the given id.
/// - `Conflict` when the template is already inactive.
pub async fn deactivate_recurring_expense(
    config: Config,
    args: IdArgs,
) -> Result<Out<RecurringTemplate>> {
    let id = args.id;
    let mut template = config
        .db()
        .get_template(id)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| not_found(format!("Recurring template with id {id} not found")))?;
    if !template.active {
        return Err(conflict(format!(
            "Recurring template '{}' is already inactive",
            template.name
        )));
    }

    config
        .db()
        .set_template_active(id, false)
        .await
        .pub_result(ErrorType::Database)?;
    template.active = false;
    let message = format!("Deactivated recurring template '{}'", template.name);
    Ok(Out::new(message, template))
}

/// One successfully processed template in a [`ProcessReport`].
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedTemplate {
    pub id: i64,
    pub name: String,
    /// How many expense rows were materialized, one per missed period.
    pub materialized: u32,
    /// Where the due date landed; always after the as-of date.
    pub next_due_date: NaiveDate,
}

/// A template the engine could not process. Skipping is per-template: one bad row never
/// aborts its siblings.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedTemplate {
    pub id: i64,
    pub name: String,
    pub reason: String,
}

/// The outcome of one processing run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub as_of_date: NaiveDate,
    pub processed: Vec<ProcessedTemplate>,
    pub skipped: Vec<SkippedTemplate>,
    pub total_materialized: u32,
}

/// Materializes expenses from every active template that is due on or before the as-of date.
///
/// For each due template, one expense row is created per missed period — dated with that
/// occurrence's due date — and the template's `next_due_date` advances past the as-of date.
/// The rows and the date advancement for a template are committed in a single transaction.
pub async fn process_due_recurring_expenses(
    config: Config,
    args: ProcessArgs,
) -> Result<Out<ProcessReport>> {
    let as_of = match &args.as_of_date {
        Some(d) => validate::date("as_of_date", d)?,
        None => chrono::Local::now().date_naive(),
    };

    let loads = config
        .db()
        .due_templates(as_of)
        .await
        .pub_result(ErrorType::Database)?;

    let mut report = ProcessReport {
        as_of_date: as_of,
        processed: Vec::new(),
        skipped: Vec::new(),
        total_materialized: 0,
    };

    for load in loads {
        let template = match load {
            TemplateLoad::Parsed(t) => t,
            TemplateLoad::Unreadable { id, name, reason } => {
                warn!("Skipping unreadable recurring template {id} '{name}': {reason}");
                report.skipped.push(SkippedTemplate { id, name, reason });
                continue;
            }
        };

        match plan_occurrences(&template, as_of) {
            Ok((expenses, next_due_date)) => {
                config
                    .db()
                    .apply_occurrences(template.id, &expenses, next_due_date)
                    .await
                    .pub_result(ErrorType::Database)?;
                info!(
                    "Recurring template '{}': materialized {} expense(s), next due {next_due_date}",
                    template.name,
                    expenses.len()
                );
                report.total_materialized += expenses.len() as u32;
                report.processed.push(ProcessedTemplate {
                    id: template.id,
                    name: template.name,
                    materialized: expenses.len() as u32,
                    next_due_date,
                });
            }
            Err(e) => {
                warn!("Skipping recurring template '{}': {e}", template.name);
                report.skipped.push(SkippedTemplate {
                    id: template.id,
                    name: template.name,
                    reason: e.to_string(),
                });
            }
        }
    }

    let message = format!(
        "Materialized {} expense{} from {} template{}{}",
        report.total_materialized,
        if report.total_materialized == 1 { "" } else { "s" },
        report.processed.len(),
        if report.processed.len() == 1 { "" } else { "s" },
        if report.skipped.is_empty() {
            String::new()
        } else {
            format!(" ({} skipped)", report.skipped.len())
        }
    );
    Ok(Out::new(message, report))
}

/// Computes the expense rows for every period of `template` due on or before `as_of`, and the
/// due date the template should advance to. The returned date is strictly after `as_of`.
fn plan_occurrences(
    template: &RecurringTemplate,
    as_of: NaiveDate,
) -> anyhow::Result<(Vec<NewExpense>, NaiveDate)> {
    let note = match &template.note {
        Some(n) => format!("[Recurring: {}] {n}", template.name),
        None => format!("[Recurring: {}]", template.name),
    };

    let mut expenses = Vec::new();
    let mut due = template.next_due_date;
    while due <= as_of {
        expenses.push(NewExpense {
            date: due,
            amount: template.amount,
            category: template.category.clone(),
            subcategory: template.subcategory.clone(),
            note: Some(note.clone()),
            payment_method: None,
            location: None,
            tags: None,
            recurring_template_id: Some(template.id),
        });
        due = template.frequency.advance(due)?;
    }
    Ok((expenses, due))
}
