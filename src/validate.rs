//! The validation layer.
//!
//! Every mutation validates its raw inputs here before anything touches the store. All
//! functions are pure: they either return the normalized, typed value or fail with a
//! [`Validation`](crate::error::ErrorType::Validation) error.

use crate::error::{validation, Result};
use crate::model::Amount;
use chrono::NaiveDate;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a strict `YYYY-MM-DD` calendar date.
pub(crate) fn date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| validation(format!("{field} must be a YYYY-MM-DD date, got '{value}'")))
}

/// Parses a strict `YYYY-MM` month and returns its first and last day.
pub(crate) fn month_bounds(value: &str) -> Result<(NaiveDate, NaiveDate)> {
    let bad = || validation(format!("month must be formatted YYYY-MM, got '{value}'"));
    let first = NaiveDate::parse_from_str(&format!("{}-01", value.trim()), DATE_FORMAT)
        .map_err(|_| bad())?;
    // parse_from_str tolerates a single-digit month; require the canonical form.
    if first.format("%Y-%m").to_string() != value.trim() {
        return Err(bad());
    }
    let last = first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|d| d.checked_sub_days(chrono::Days::new(1)))
        .ok_or_else(bad)?;
    Ok((first, last))
}

/// Checks an inclusive date range.
pub(crate) fn date_range(date_from: NaiveDate, date_to: NaiveDate) -> Result<()> {
    if date_from > date_to {
        return Err(validation(format!(
            "date_from ({date_from}) must not be after date_to ({date_to})"
        )));
    }
    Ok(())
}

/// Requires a strictly positive amount.
pub(crate) fn positive_amount(field: &str, amount: Amount) -> Result<Amount> {
    if !amount.is_positive() {
        return Err(validation(format!(
            "{field} must be a positive amount, got {amount}"
        )));
    }
    Ok(amount)
}

/// Requires a non-empty string after trimming, and returns the trimmed value.
pub(crate) fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Normalizes an optional free-text field: empty or whitespace-only becomes `None`.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    match value {
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use std::str::FromStr;

    #[test]
    fn date_accepts_iso_and_rejects_the_rest() {
        assert_eq!(
            date("date", "2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        for bad in ["2023-02-29", "2024-13-01", "02/29/2024", "yesterday", ""] {
            let err = date("date", bad).unwrap_err();
            assert_eq!(err.error_type(), ErrorType::Validation, "input: {bad}");
        }
    }

    #[test]
    fn month_bounds_spans_the_month() {
        let (first, last) = month_bounds("2024-02").unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let (_, last) = month_bounds("2024-12").unwrap();
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        assert!(month_bounds("2024-2").is_err());
        assert!(month_bounds("2024-00").is_err());
        assert!(month_bounds("March").is_err());
    }

    #[test]
    fn positive_amount_rejects_zero_and_negative() {
        assert!(positive_amount("amount", Amount::from_str("0.01").unwrap()).is_ok());
        assert!(positive_amount("amount", Amount::ZERO).is_err());
        assert!(positive_amount("amount", Amount::from_str("-5").unwrap()).is_err());
    }

    #[test]
    fn required_trims() {
        assert_eq!(required("category", "  Food ").unwrap(), "Food");
        assert!(required("category", "   ").is_err());
    }

    #[test]
    fn date_range_ordering() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert!(date_range(a, b).is_ok());
        assert!(date_range(a, a).is_ok());
        assert!(date_range(b, a).is_err());
    }

    #[test]
    fn optional_normalizes_blank_to_none() {
        assert_eq!(optional(Some("  ".to_string())), None);
        assert_eq!(optional(Some(" x ".to_string())), Some("x".to_string()));
        assert_eq!(optional(None), None);
    }
}
