//! The budgets document: one monthly spending limit per category.

use crate::model::Amount;
use crate::utils;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Category name -> monthly limit, persisted as `budgets.json` in the home directory.
///
/// Setting a limit for a category that already has one overwrites it. A `BTreeMap` keeps the
/// on-disk document and all reports in a stable category order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Budgets(BTreeMap<String, Amount>);

impl Budgets {
    /// Loads the budgets document. A missing file is an empty mapping, not an error.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Budgets::default());
        }
        utils::deserialize(path).await
    }

    /// Writes the document back to disk as pretty JSON.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize budgets")?;
        utils::write(path, data).await
    }

    /// Sets or replaces the monthly limit for `category`.
    pub fn set(&mut self, category: impl Into<String>, limit: Amount) {
        self.0.insert(category.into(), limit);
    }

    pub fn get(&self, category: &str) -> Option<Amount> {
        self.0.get(category).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Amount)> {
        self.0.iter()
    }
}
