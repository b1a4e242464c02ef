//! The expense record and the parameter objects used to query and update it.

use crate::model::Amount;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single expense row.
///
/// Optional fields default to `None` and are stored as NULL. `id` and `created_at` are
/// assigned by the store on insert and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: Amount,
    pub category: String,
    pub subcategory: Option<String>,
    pub note: Option<String>,
    pub payment_method: Option<String>,
    pub location: Option<String>,
    /// Comma-separated tags, e.g. `"work,travel"`.
    pub tags: Option<String>,
    /// Back-reference to the recurring template that materialized this row, if any.
    pub recurring_template_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// The `YYYY-MM` key used for monthly grouping.
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

/// A fully validated expense that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub amount: Amount,
    pub category: String,
    pub subcategory: Option<String>,
    pub note: Option<String>,
    pub payment_method: Option<String>,
    pub location: Option<String>,
    pub tags: Option<String>,
    pub recurring_template_id: Option<i64>,
}

/// Partial field changes for an expense. `None` leaves a column untouched; for optional
/// columns an empty string clears the stored value to NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseUpdates {
    pub date: Option<NaiveDate>,
    pub amount: Option<Amount>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub note: Option<String>,
    pub payment_method: Option<String>,
    pub location: Option<String>,
    pub tags: Option<String>,
}

impl ExpenseUpdates {
    pub fn is_empty(&self) -> bool {
        *self == ExpenseUpdates::default()
    }
}

/// Filters for listing expenses. The date range is inclusive on both ends. `category` and
/// `payment_method` are equality filters; `location` and `tag` match substrings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseFilter {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub location: Option<String>,
    pub tag: Option<String>,
}

impl ExpenseFilter {
    /// A filter with only the date range set.
    pub fn range(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            date_from,
            date_to,
            category: None,
            payment_method: None,
            location: None,
            tag: None,
        }
    }
}
