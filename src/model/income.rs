//! The income record and its query/update parameter objects.

use crate::model::Amount;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single income row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: Amount,
    /// Where the money came from, e.g. an employer name.
    pub source: String,
    pub category: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A fully validated income record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncome {
    pub date: NaiveDate,
    pub amount: Amount,
    pub source: String,
    pub category: Option<String>,
    pub note: Option<String>,
}

/// Partial field changes for an income record. `None` leaves a column untouched; for optional
/// columns an empty string clears the stored value to NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomeUpdates {
    pub date: Option<NaiveDate>,
    pub amount: Option<Amount>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub note: Option<String>,
}

impl IncomeUpdates {
    pub fn is_empty(&self) -> bool {
        *self == IncomeUpdates::default()
    }
}

/// Filters for listing income. The date range is inclusive; `source` and `category` are
/// equality filters.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeFilter {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub source: Option<String>,
    pub category: Option<String>,
}

impl IncomeFilter {
    /// A filter with only the date range set.
    pub fn range(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            date_from,
            date_to,
            source: None,
            category: None,
        }
    }
}
