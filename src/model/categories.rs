//! The read-only categories/payment-methods document.

use crate::utils;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The configured category and payment-method lists, read from `categories.json` once at
/// startup and treated as immutable for the process lifetime. Editing the file takes effect
/// on the next start.
///
/// Categories are advisory: expenses may use any category string, but agents are pointed at
/// this list so that data stays consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categories {
    pub categories: Vec<String>,
    pub payment_methods: Vec<String>,
}

impl Default for Categories {
    fn default() -> Self {
        Self {
            categories: [
                "Food & Dining",
                "Transportation",
                "Shopping",
                "Entertainment",
                "Bills & Utilities",
                "Healthcare",
                "Travel",
                "Education",
                "Personal Care",
                "Home",
                "Miscellaneous",
            ]
            .map(String::from)
            .to_vec(),
            payment_methods: [
                "Cash",
                "Credit Card",
                "Debit Card",
                "Bank Transfer",
                "Digital Wallet",
                "Check",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl Categories {
    /// Loads the document. A missing file yields the default lists.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Categories::default());
        }
        utils::deserialize(path).await
    }

    /// Writes the document, used only when initializing a new home directory.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        utils::write(path, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let c = Categories::load(&dir.path().join("categories.json")).await.unwrap();
        assert!(c.categories.contains(&"Food & Dining".to_string()));
        assert!(c.payment_methods.contains(&"Cash".to_string()));
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("categories.json");
        let mut c = Categories::default();
        c.categories.push("Pets".to_string());
        c.save(&path).await.unwrap();
        assert_eq!(Categories::load(&path).await.unwrap(), c);
    }
}
