//! Recurring expense templates and due-date arithmetic.

use crate::model::Amount;
use anyhow::Context;
use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How often a recurring template materializes an expense.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

serde_plain::derive_display_from_serialize!(Frequency);
serde_plain::derive_fromstr_from_deserialize!(Frequency);

impl Frequency {
    /// Returns the next due date after `from`.
    ///
    /// Monthly advancement lands on the same day-of-month, clamped to the last valid day when
    /// the target month is shorter (Jan 31 -> Feb 29 in a leap year, Feb 28 otherwise).
    /// Yearly advancement clamps Feb 29 to Feb 28 on non-leap years.
    pub fn advance(&self, from: NaiveDate) -> anyhow::Result<NaiveDate> {
        let next = match self {
            Frequency::Daily => from.checked_add_days(Days::new(1)),
            Frequency::Weekly => from.checked_add_days(Days::new(7)),
            Frequency::Monthly => from.checked_add_months(Months::new(1)),
            Frequency::Yearly => from.checked_add_months(Months::new(12)),
        };
        next.with_context(|| format!("Cannot advance {from} by one {self} period"))
    }
}

/// A recurring expense template.
///
/// `next_due_date` moves monotonically forward as the template is processed. Templates are
/// never deleted by the engine, only deactivated; inactive templates are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: i64,
    pub name: String,
    pub amount: Amount,
    pub category: String,
    pub subcategory: Option<String>,
    pub note: Option<String>,
    pub frequency: Frequency,
    pub next_due_date: NaiveDate,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A fully validated template that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecurringTemplate {
    pub name: String,
    pub amount: Amount,
    pub category: String,
    pub subcategory: Option<String>,
    pub note: Option<String>,
    pub frequency: Frequency,
    pub next_due_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn daily_and_weekly() {
        assert_eq!(Frequency::Daily.advance(d("2024-03-31")).unwrap(), d("2024-04-01"));
        assert_eq!(Frequency::Weekly.advance(d("2024-12-28")).unwrap(), d("2025-01-04"));
    }

    #[test]
    fn monthly_clamps_to_shorter_month() {
        // Leap year: Jan 31 -> Feb 29.
        assert_eq!(Frequency::Monthly.advance(d("2024-01-31")).unwrap(), d("2024-02-29"));
        // Non-leap year: Jan 31 -> Feb 28.
        assert_eq!(Frequency::Monthly.advance(d("2023-01-31")).unwrap(), d("2023-02-28"));
        // 31st -> 30-day month.
        assert_eq!(Frequency::Monthly.advance(d("2024-03-31")).unwrap(), d("2024-04-30"));
        // Mid-month days are untouched.
        assert_eq!(Frequency::Monthly.advance(d("2024-05-15")).unwrap(), d("2024-06-15"));
        // December rolls the year.
        assert_eq!(Frequency::Monthly.advance(d("2024-12-31")).unwrap(), d("2025-01-31"));
    }

    #[test]
    fn yearly_clamps_leap_day() {
        assert_eq!(Frequency::Yearly.advance(d("2024-02-29")).unwrap(), d("2025-02-28"));
        assert_eq!(Frequency::Yearly.advance(d("2024-07-04")).unwrap(), d("2025-07-04"));
    }

    #[test]
    fn frequency_round_trips_through_strings() {
        for (s, f) in [
            ("daily", Frequency::Daily),
            ("weekly", Frequency::Weekly),
            ("monthly", Frequency::Monthly),
            ("yearly", Frequency::Yearly),
        ] {
            assert_eq!(s.parse::<Frequency>().unwrap(), f);
            assert_eq!(f.to_string(), s);
        }
        assert!("fortnightly".parse::<Frequency>().is_err());
    }
}
