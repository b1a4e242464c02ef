//! Income CRUD command handlers. These mirror the expense handlers with income-specific
//! fields.

use crate::args::{AddIncomeArgs, IdArgs, ListIncomeArgs, SearchArgs, UpdateIncomeArgs};
use crate::commands::Out;
use crate::error::{not_found, validation, ErrorType, IntoResult};
use crate::model::{Income, IncomeFilter, IncomeUpdates, NewIncome};
use crate::{validate, Config, Result};

/// Validates and inserts a new income record, returning the store-assigned id.
pub async fn add_income(config: Config, args: AddIncomeArgs) -> Result<Out<i64>> {
    let income = NewIncome {
        date: validate::date("date", &args.date)?,
        amount: validate::positive_amount("amount", args.amount)?,
        source: validate::required("source", &args.source)?,
        category: validate::optional(args.category),
        note: validate::optional(args.note),
    };
    let id = config
        .db()
        .insert_income(&income)
        .await
        .pub_result(ErrorType::Database)?;
    let message = format!(
        "Added income {id}: {} from {} on {}",
        income.amount, income.source, income.date
    );
    Ok(Out::new(message, id))
}

/// Applies partial field changes to an income record and returns the updated record.
pub async fn update_income(config: Config, args: UpdateIncomeArgs) -> Result<Out<Income>> {
    let id = args.id;
    let updates = IncomeUpdates {
        date: args.date.as_deref().map(|d| validate::date("date", d)).transpose()?,
        amount: args
            .amount
            .map(|a| validate::positive_amount("amount", a))
            .transpose()?,
        source: args
            .source
            .as_deref()
            .map(|s| validate::required("source", s))
            .transpose()?,
        category: args.category,
        note: args.note,
    };
    if updates.is_empty() {
        return Err(validation("No fields to update"));
    }

    let updated = config
        .db()
        .update_income(id, &updates)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| not_found(format!("Income with id {id} not found")))?;
    Ok(Out::new(format!("Updated income {id}"), updated))
}

/// Deletes an income record by id. A repeated delete fails with `NotFound`.
pub async fn delete_income(config: Config, args: IdArgs) -> Result<Out<i64>> {
    let id = args.id;
    let deleted = config
        .db()
        .delete_income(id)
        .await
        .pub_result(ErrorType::Database)?;
    if !deleted {
        return Err(not_found(format!("Income with id {id} not found")));
    }
    Ok(Out::new(format!("Deleted income {id}"), id))
}

/// Fetches a single income record by id, or fails with `NotFound`.
pub async fn get_income(config: Config, args: IdArgs) -> Result<Out<Income>> {
    let id = args.id;
    let income = config
        .db()
        .get_income(id)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| not_found(format!("Income with id {id} not found")))?;
    Ok(Out::new(format!("Found income {id}"), income))
}

/// Lists income in an inclusive date range, ordered by date then id ascending.
pub async fn list_income(config: Config, args: ListIncomeArgs) -> Result<Out<Vec<Income>>> {
    let date_from = validate::date("date_from", &args.date_from)?;
    let date_to = validate::date("date_to", &args.date_to)?;
    validate::date_range(date_from, date_to)?;
    let filter = IncomeFilter {
        date_from,
        date_to,
        source: validate::optional(args.source),
        category: validate::optional(args.category),
    };

    let income = config
        .db()
        .list_income(&filter)
        .await
        .pub_result(ErrorType::Database)?;
    let message = format!(
        "Found {} income record{} between {date_from} and {date_to}",
        income.len(),
        if income.len() == 1 { "" } else { "s" }
    );
    Ok(Out::new(message, income))
}

/// Case-insensitive substring search over note, source and category, newest first.
pub async fn search_income(config: Config, args: SearchArgs) -> Result<Out<Vec<Income>>> {
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

    let income = config
        .db()
        .search_income(&keyword, date_from, date_to)
        .await
        .pub_result(ErrorType::Database)?;
    let message = format!(
        "Found {} income record{} matching '{keyword}'",
        income.len(),
        if income.len() == 1 { "" } else { "s" }
    );
    Ok(Out::new(message, income))
}
