//! CSV export of expenses.

use crate::args::ExportArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Expense, ExpenseFilter};
use crate::{validate, Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;

const CSV_HEADER: [&str; 8] = [
    "Date",
    "Amount",
    "Category",
    "Subcategory",
    "Note",
    "Payment Method",
    "Location",
    "Tags",
];

/// What an export wrote and where.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReceipt {
    pub destination: PathBuf,
    pub rows: u32,
}

/// Writes the expenses in a date range to `destination` as CSV, with the same filtering and
/// ordering as `list_expenses`. The `csv` crate applies RFC 4180 quoting, so notes containing
/// commas, quotes or newlines survive a round-trip.
///
/// # Errors
///
/// - `Io` when the destination cannot be created or written.
pub async fn export_expenses_csv(config: Config, args: ExportArgs) -> Result<Out<ExportReceipt>> {
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

    write_csv(&args.destination, &expenses).pub_result(ErrorType::Io)?;

    let receipt = ExportReceipt {
        destination: args.destination,
        rows: expenses.len() as u32,
    };
    let message = format!(
        "Exported {} expense{} to {}",
        receipt.rows,
        if receipt.rows == 1 { "" } else { "s" },
        receipt.destination.display()
    );
    Ok(Out::new(message, receipt))
}

fn write_csv(destination: &PathBuf, expenses: &[Expense]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(destination)
        .with_context(|| format!("Unable to open {} for writing", destination.display()))?;
    writer.write_record(CSV_HEADER)?;
    for e in expenses {
        writer.write_record([
            e.date.to_string().as_str(),
            e.amount.to_string().as_str(),
            e.category.as_str(),
            e.subcategory.as_deref().unwrap_or(""),
            e.note.as_deref().unwrap_or(""),
            e.payment_method.as_deref().unwrap_or(""),
            e.location.as_deref().unwrap_or(""),
            e.tags.as_deref().unwrap_or(""),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Unable to finish writing {}", destination.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::test::TestEnv;
    use tempfile::TempDir;

    fn export_args(from: &str, to: &str, destination: PathBuf) -> ExportArgs {
        ExportArgs {
            date_from: from.to_string(),
            date_to: to.to_string(),
            destination,
            category: None,
        }
    }

    #[tokio::test]
    async fn test_export_round_trips_awkward_text() {
        let env = TestEnv::new().await;
        env.add_expense_with_note(
            "2025-01-10",
            "12.50",
            "Food & Dining",
            "lunch, with \"friends\" downtown",
        )
        .await;
        env.add_expense("2025-01-05", "7", "Transportation").await;

        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out.csv");
        let out = export_expenses_csv(
            env.config(),
            export_args("2025-01-01", "2025-01-31", destination.clone()),
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().rows, 2);

        // Re-parse and compare against the same listing.
        let mut reader = csv::Reader::from_path(&destination).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "Date");
        assert_eq!(&headers[5], "Payment Method");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        // Same order as list_expenses: date ascending.
        assert_eq!(&rows[0][0], "2025-01-05");
        assert_eq!(&rows[0][2], "Transportation");
        assert_eq!(&rows[1][0], "2025-01-10");
        assert_eq!(&rows[1][1], "12.50");
        assert_eq!(&rows[1][4], "lunch, with \"friends\" downtown");
    }

    #[tokio::test]
    async fn test_export_fails_with_io_error_for_bad_destination() {
        let env = TestEnv::new().await;
        let err = export_expenses_csv(
            env.config(),
            export_args(
                "2025-01-01",
                "2025-01-31",
                PathBuf::from("/no/such/directory/out.csv"),
            ),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Io);
    }

    #[tokio::test]
    async fn test_export_respects_category_filter() {
        let env = TestEnv::new().await;
        env.add_expense("2025-01-05", "7", "Transportation").await;
        env.add_expense("2025-01-06", "9", "Shopping").await;

        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out.csv");
        let mut args = export_args("2025-01-01", "2025-01-31", destination.clone());
        args.category = Some("Shopping".to_string());
        let out = export_expenses_csv(env.config(), args).await.unwrap();
        assert_eq!(out.structure().unwrap().rows, 1);

        let mut reader = csv::Reader::from_path(&destination).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][2], "Shopping");
    }
}
