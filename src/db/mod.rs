//! This module is responsible for reading, writing and managing the SQLite database.
//!
//! All SQL lives here. Dates are stored as ISO `YYYY-MM-DD` TEXT (which makes lexicographic
//! comparison in SQL correct), timestamps as RFC 3339 TEXT, and amounts as canonical decimal
//! TEXT so that arithmetic always happens on `Decimal` in Rust rather than on SQLite floats.

mod migrations;

use crate::model::{
    Amount, Expense, ExpenseFilter, ExpenseUpdates, Frequency, Income, IncomeFilter,
    IncomeUpdates, NewExpense, NewIncome, NewRecurringTemplate, RecurringTemplate,
};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

const INSERT_EXPENSE_SQL: &str = "INSERT INTO expenses \
    (date, amount, category, subcategory, note, payment_method, location, tags, \
     recurring_template_id, created_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const SELECT_EXPENSE_COLUMNS: &str = "SELECT id, date, amount, category, subcategory, note, \
    payment_method, location, tags, recurring_template_id, created_at FROM expenses";

const SELECT_INCOME_COLUMNS: &str =
    "SELECT id, date, amount, source, category, note, created_at FROM income";

const SELECT_TEMPLATE_COLUMNS: &str = "SELECT id, name, amount, category, subcategory, note, \
    frequency, next_due_date, active, created_at FROM recurring_templates";

/// A handle to the SQLite database.
#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

/// The outcome of loading one recurring template row. Rows that fail to parse (a hand-edited
/// date or frequency, for example) are reported rather than failing the whole batch.
#[derive(Debug)]
pub(crate) enum TemplateLoad {
    Parsed(RecurringTemplate),
    Unreadable { id: i64, name: String, reason: String },
}

impl Db {
    /// Creates a new SQLite file at `path` and initializes the schema.
    ///
    /// Fails if a file already exists at `path`.
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database file already exists at {}", path.display());
        }
        let pool = connect(path, true).await?;

        sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .context("Failed to create schema_version table")?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(&pool)
            .await
            .context("Failed to write initial schema version")?;

        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    /// Opens the SQLite file at `path`, bringing the schema up to date if needed.
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The database file is missing at {}", path.display());
        }
        let pool = connect(path, false).await?;

        let row: (i32,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
            .fetch_one(&pool)
            .await
            .with_context(|| {
                format!(
                    "{} does not look like a database created by this program",
                    path.display()
                )
            })?;
        migrations::run(&pool, row.0, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    // ------------------------------------------------------------------------------------
    // Expenses
    // ------------------------------------------------------------------------------------

    /// Inserts an expense and returns its store-assigned id.
    pub(crate) async fn insert_expense(&self, expense: &NewExpense) -> Result<i64> {
        let result = bind_new_expense(sqlx::query(INSERT_EXPENSE_SQL), expense)
            .execute(&self.pool)
            .await
            .context("Failed to insert expense")?;
        Ok(result.last_insert_rowid())
    }

    pub(crate) async fn get_expense(&self, id: i64) -> Result<Option<Expense>> {
        let sql = format!("{SELECT_EXPENSE_COLUMNS} WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query expense")?;
        row.map(|r| expense_from_row(&r)).transpose()
    }

    /// Applies the supplied field changes and returns the updated record, or `None` when no
    /// row has this id. For optional columns an empty string clears the value to NULL.
    pub(crate) async fn update_expense(
        &self,
        id: i64,
        updates: &ExpenseUpdates,
    ) -> Result<Option<Expense>> {
        let mut sets = Vec::new();
        if updates.date.is_some() {
            sets.push("date = ?");
        }
        if updates.amount.is_some() {
            sets.push("amount = ?");
        }
        if updates.category.is_some() {
            sets.push("category = ?");
        }
        if updates.subcategory.is_some() {
            sets.push("subcategory = ?");
        }
        if updates.note.is_some() {
            sets.push("note = ?");
        }
        if updates.payment_method.is_some() {
            sets.push("payment_method = ?");
        }
        if updates.location.is_some() {
            sets.push("location = ?");
        }
        if updates.tags.is_some() {
            sets.push("tags = ?");
        }

        let sql = format!("UPDATE expenses SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        if let Some(date) = updates.date {
            query = query.bind(date.to_string());
        }
        if let Some(amount) = updates.amount {
            query = query.bind(amount.to_string());
        }
        if let Some(category) = &updates.category {
            query = query.bind(category.clone());
        }
        for optional in [
            &updates.subcategory,
            &updates.note,
            &updates.payment_method,
            &updates.location,
            &updates.tags,
        ]
        .into_iter()
        .flatten()
        {
            query = query.bind(clearable(optional));
        }

        let result = query
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update expense")?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_expense(id).await
    }

    /// Removes an expense row. Returns false when no row has this id.
    pub(crate) async fn delete_expense(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete expense")?;
        Ok(result.rows_affected() > 0)
    }

    /// Lists expenses in the inclusive date range, narrowed by the optional filters, ordered
    /// by date then id ascending.
    pub(crate) async fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let mut sql = format!("{SELECT_EXPENSE_COLUMNS} WHERE date BETWEEN ? AND ?");
        if filter.category.is_some() {
            sql.push_str(" AND category = ?");
        }
        if filter.payment_method.is_some() {
            sql.push_str(" AND payment_method = ?");
        }
        if filter.location.is_some() {
            sql.push_str(" AND LOWER(COALESCE(location, '')) LIKE ? ESCAPE '\\'");
        }
        if filter.tag.is_some() {
            sql.push_str(" AND LOWER(COALESCE(tags, '')) LIKE ? ESCAPE '\\'");
        }
        sql.push_str(" ORDER BY date ASC, id ASC");

        let mut query = sqlx::query(&sql)
            .bind(filter.date_from.to_string())
            .bind(filter.date_to.to_string());
        if let Some(category) = &filter.category {
            query = query.bind(category.clone());
        }
        if let Some(payment_method) = &filter.payment_method {
            query = query.bind(payment_method.clone());
        }
        if let Some(location) = &filter.location {
            query = query.bind(like_pattern(location));
        }
        if let Some(tag) = &filter.tag {
            query = query.bind(like_pattern(tag));
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list expenses")?;
        rows.iter().map(expense_from_row).collect()
    }

    /// Case-insensitive substring search over the free-text expense fields, newest first.
    pub(crate) async fn search_expenses(
        &self,
        keyword: &str,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<Expense>> {
        let mut sql = format!(
            "{SELECT_EXPENSE_COLUMNS} WHERE (\
               LOWER(COALESCE(note, '')) LIKE ?1 ESCAPE '\\' OR \
               LOWER(category) LIKE ?1 ESCAPE '\\' OR \
               LOWER(COALESCE(subcategory, '')) LIKE ?1 ESCAPE '\\' OR \
               LOWER(COALESCE(location, '')) LIKE ?1 ESCAPE '\\' OR \
               LOWER(COALESCE(tags, '')) LIKE ?1 ESCAPE '\\')"
        );
        if date_from.is_some() {
            sql.push_str(" AND date >= ?");
        }
        if date_to.is_some() {
            sql.push_str(" AND date <= ?");
        }
        sql.push_str(" ORDER BY date DESC, id DESC");

        let mut query = sqlx::query(&sql).bind(like_pattern(keyword));
        if let Some(from) = date_from {
            query = query.bind(from.to_string());
        }
        if let Some(to) = date_to {
            query = query.bind(to.to_string());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to search expenses")?;
        rows.iter().map(expense_from_row).collect()
    }

    // ------------------------------------------------------------------------------------
    // Income
    // ------------------------------------------------------------------------------------

    pub(crate) async fn insert_income(&self, income: &NewIncome) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO income (date, amount, source, category, note, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(income.date.to_string())
        .bind(income.amount.to_string())
        .bind(income.source.clone())
        .bind(income.category.clone())
        .bind(income.note.clone())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to insert income")?;
        Ok(result.last_insert_rowid())
    }

    pub(crate) async fn get_income(&self, id: i64) -> Result<Option<Income>> {
        let sql = format!("{SELECT_INCOME_COLUMNS} WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query income")?;
        row.map(|r| income_from_row(&r)).transpose()
    }

    pub(crate) async fn update_income(
        &self,
        id: i64,
        updates: &IncomeUpdates,
    ) -> Result<Option<Income>> {
        let mut sets = Vec::new();
        if updates.date.is_some() {
            sets.push("date = ?");
        }
        if updates.amount.is_some() {
            sets.push("amount = ?");
        }
        if updates.source.is_some() {
            sets.push("source = ?");
        }
        if updates.category.is_some() {
            sets.push("category = ?");
        }
        if updates.note.is_some() {
            sets.push("note = ?");
        }

        let sql = format!("UPDATE income SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        if let Some(date) = updates.date {
            query = query.bind(date.to_string());
        }
        if let Some(amount) = updates.amount {
            query = query.bind(amount.to_string());
        }
        if let Some(source) = &updates.source {
            query = query.bind(source.clone());
        }
        for optional in [&updates.category, &updates.note].into_iter().flatten() {
            query = query.bind(clearable(optional));
        }

        let result = query
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update income")?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_income(id).await
    }

    pub(crate) async fn delete_income(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM income WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete income")?;
        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn list_income(&self, filter: &IncomeFilter) -> Result<Vec<Income>> {
        let mut sql = format!("{SELECT_INCOME_COLUMNS} WHERE date BETWEEN ? AND ?");
        if filter.source.is_some() {
            sql.push_str(" AND source = ?");
        }
        if filter.category.is_some() {
            sql.push_str(" AND category = ?");
        }
        sql.push_str(" ORDER BY date ASC, id ASC");

        let mut query = sqlx::query(&sql)
            .bind(filter.date_from.to_string())
            .bind(filter.date_to.to_string());
        if let Some(source) = &filter.source {
            query = query.bind(source.clone());
        }
        if let Some(category) = &filter.category {
            query = query.bind(category.clone());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list income")?;
        rows.iter().map(income_from_row).collect()
    }

    /// Case-insensitive substring search over note, source and category, newest first.
    pub(crate) async fn search_income(
        &self,
        keyword: &str,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<Income>> {
        let mut sql = format!(
            "{SELECT_INCOME_COLUMNS} WHERE (\
               LOWER(COALESCE(note, '')) LIKE ?1 ESCAPE '\\' OR \
               LOWER(source) LIKE ?1 ESCAPE '\\' OR \
               LOWER(COALESCE(category, '')) LIKE ?1 ESCAPE '\\')"
        );
        if date_from.is_some() {
            sql.push_str(" AND date >= ?");
        }
        if date_to.is_some() {
            sql.push_str(" AND date <= ?");
        }
        sql.push_str(" ORDER BY date DESC, id DESC");

        let mut query = sqlx::query(&sql).bind(like_pattern(keyword));
        if let Some(from) = date_from {
            query = query.bind(from.to_string());
        }
        if let Some(to) = date_to {
            query = query.bind(to.to_string());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to search income")?;
        rows.iter().map(income_from_row).collect()
    }

    // ------------------------------------------------------------------------------------
    // Recurring templates
    // ------------------------------------------------------------------------------------

    /// Inserts a template. The template name carries a UNIQUE constraint; violations surface
    /// as a database error mentioning `UNIQUE constraint failed`.
    pub(crate) async fn insert_template(&self, template: &NewRecurringTemplate) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO recurring_templates \
             (name, amount, category, subcategory, note, frequency, next_due_date, active, \
              created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(template.name.clone())
        .bind(template.amount.to_string())
        .bind(template.category.clone())
        .bind(template.subcategory.clone())
        .bind(template.note.clone())
        .bind(template.frequency.to_string())
        .bind(template.next_due_date.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to insert recurring template")?;
        Ok(result.last_insert_rowid())
    }

    pub(crate) async fn get_template(&self, id: i64) -> Result<Option<RecurringTemplate>> {
        let sql = format!("{SELECT_TEMPLATE_COLUMNS} WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query recurring template")?;
        row.map(|r| template_from_row(&r)).transpose()
    }

    pub(crate) async fn list_templates(&self, active_only: bool) -> Result<Vec<RecurringTemplate>> {
        let mut sql = SELECT_TEMPLATE_COLUMNS.to_string();
        if active_only {
            sql.push_str(" WHERE active = 1");
        }
        sql.push_str(" ORDER BY next_due_date ASC, id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list recurring templates")?;
        rows.iter().map(template_from_row).collect()
    }

    pub(crate) async fn set_template_active(&self, id: i64, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE recurring_templates SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update recurring template")?;
        Ok(result.rows_affected() > 0)
    }

    /// Loads every active template due on or before `as_of`, ordered by due date. Rows that
    /// fail to parse are returned as [`TemplateLoad::Unreadable`] so the caller can report
    /// them without aborting the batch.
    pub(crate) async fn due_templates(&self, as_of: NaiveDate) -> Result<Vec<TemplateLoad>> {
        let sql = format!(
            "{SELECT_TEMPLATE_COLUMNS} WHERE active = 1 AND next_due_date <= ? \
             ORDER BY next_due_date ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(as_of.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to query due recurring templates")?;

        let mut loads = Vec::with_capacity(rows.len());
        for row in &rows {
            loads.push(match template_from_row(row) {
                Ok(template) => TemplateLoad::Parsed(template),
                Err(e) => TemplateLoad::Unreadable {
                    id: row.try_get("id").unwrap_or_default(),
                    name: row.try_get("name").unwrap_or_default(),
                    reason: e.to_string(),
                },
            });
        }
        Ok(loads)
    }

    /// Materializes the given expense rows and advances the template's due date, all within
    /// one transaction so a crash cannot record the expenses without moving the date (or the
    /// reverse).
    pub(crate) async fn apply_occurrences(
        &self,
        template_id: i64,
        expenses: &[NewExpense],
        next_due_date: NaiveDate,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin recurring-processing transaction")?;
        for expense in expenses {
            bind_new_expense(sqlx::query(INSERT_EXPENSE_SQL), expense)
                .execute(&mut *tx)
                .await
                .context("Failed to materialize recurring expense")?;
        }
        sqlx::query("UPDATE recurring_templates SET next_due_date = ? WHERE id = ?")
            .bind(next_due_date.to_string())
            .bind(template_id)
            .execute(&mut *tx)
            .await
            .context("Failed to advance recurring template due date")?;
        tx.commit()
            .await
            .context("Failed to commit recurring-processing transaction")?;
        Ok(())
    }

    /// Executes arbitrary SQL, for tests that need to fabricate rows the typed API would
    /// refuse to write.
    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .context("Failed to parse SQLite connection string")?
        .create_if_missing(create);

    // Single local user, single writer: one connection is all we need and it sidesteps
    // SQLITE_BUSY entirely.
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open SQLite database at {}", path.display()))
}

type Query<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_new_expense<'q>(query: Query<'q>, expense: &NewExpense) -> Query<'q> {
    query
        .bind(expense.date.to_string())
        .bind(expense.amount.to_string())
        .bind(expense.category.clone())
        .bind(expense.subcategory.clone())
        .bind(expense.note.clone())
        .bind(expense.payment_method.clone())
        .bind(expense.location.clone())
        .bind(expense.tags.clone())
        .bind(expense.recurring_template_id)
        .bind(Utc::now().to_rfc3339())
}

/// Turns a user-supplied update value into a bind: empty string clears the column to NULL.
fn clearable(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Builds a `%keyword%` LIKE pattern with SQL wildcards escaped, lowercased to pair with
/// `LOWER(column)`.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped.to_lowercase())
}

fn parse_stored_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Stored date '{value}' is not a valid YYYY-MM-DD date"))
}

fn parse_stored_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Stored timestamp '{value}' is not valid RFC 3339"))?
        .with_timezone(&Utc))
}

fn parse_stored_amount(value: &str) -> Result<Amount> {
    Amount::from_str(value).with_context(|| format!("Stored amount '{value}' is not a decimal"))
}

fn expense_from_row(row: &SqliteRow) -> Result<Expense> {
    Ok(Expense {
        id: row.try_get("id")?,
        date: parse_stored_date(&row.try_get::<String, _>("date")?)?,
        amount: parse_stored_amount(&row.try_get::<String, _>("amount")?)?,
        category: row.try_get("category")?,
        subcategory: row.try_get("subcategory")?,
        note: row.try_get("note")?,
        payment_method: row.try_get("payment_method")?,
        location: row.try_get("location")?,
        tags: row.try_get("tags")?,
        recurring_template_id: row.try_get("recurring_template_id")?,
        created_at: parse_stored_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn income_from_row(row: &SqliteRow) -> Result<Income> {
    Ok(Income {
        id: row.try_get("id")?,
        date: parse_stored_date(&row.try_get::<String, _>("date")?)?,
        amount: parse_stored_amount(&row.try_get::<String, _>("amount")?)?,
        source: row.try_get("source")?,
        category: row.try_get("category")?,
        note: row.try_get("note")?,
        created_at: parse_stored_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn template_from_row(row: &SqliteRow) -> Result<RecurringTemplate> {
    let frequency_str: String = row.try_get("frequency")?;
    let frequency = Frequency::from_str(&frequency_str)
        .map_err(|_| anyhow::anyhow!("Stored frequency '{frequency_str}' is not recognized"))?;
    Ok(RecurringTemplate {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        amount: parse_stored_amount(&row.try_get::<String, _>("amount")?)?,
        category: row.try_get("category")?,
        subcategory: row.try_get("subcategory")?,
        note: row.try_get("note")?,
        frequency,
        next_due_date: parse_stored_date(&row.try_get::<String, _>("next_due_date")?)?,
        active: row.try_get("active")?,
        created_at: parse_stored_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    async fn test_db() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("expenses.sqlite")).await.unwrap();
        (dir, db)
    }

    fn new_expense(date: &str, amount: &str, category: &str) -> NewExpense {
        NewExpense {
            date: d(date),
            amount: amt(amount),
            category: category.to_string(),
            subcategory: None,
            note: None,
            payment_method: None,
            location: None,
            tags: None,
            recurring_template_id: None,
        }
    }

    #[tokio::test]
    async fn init_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expenses.sqlite");
        Db::init(&path).await.unwrap();
        assert!(Db::init(&path).await.is_err());
        // But load works.
        Db::load(&path).await.unwrap();
    }

    #[tokio::test]
    async fn load_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        assert!(Db::load(dir.path().join("nope.sqlite")).await.is_err());
    }

    #[tokio::test]
    async fn expense_insert_get_update_delete() {
        let (_dir, db) = test_db().await;

        let mut e = new_expense("2025-03-05", "12.50", "Food & Dining");
        e.note = Some("lunch".to_string());
        let id = db.insert_expense(&e).await.unwrap();

        let got = db.get_expense(id).await.unwrap().unwrap();
        assert_eq!(got.date, d("2025-03-05"));
        assert_eq!(got.amount, amt("12.50"));
        assert_eq!(got.note.as_deref(), Some("lunch"));
        assert_eq!(got.subcategory, None);

        // Partial update touches only the supplied columns; empty string clears.
        let updates = ExpenseUpdates {
            amount: Some(amt("13.00")),
            note: Some(String::new()),
            ..Default::default()
        };
        let updated = db.update_expense(id, &updates).await.unwrap().unwrap();
        assert_eq!(updated.amount, amt("13.00"));
        assert_eq!(updated.note, None);
        assert_eq!(updated.category, "Food & Dining");
        assert_eq!(updated.created_at, got.created_at);

        assert!(db.delete_expense(id).await.unwrap());
        assert!(!db.delete_expense(id).await.unwrap());
        assert!(db.get_expense(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_expense_returns_none() {
        let (_dir, db) = test_db().await;
        let updates = ExpenseUpdates {
            note: Some("x".to_string()),
            ..Default::default()
        };
        assert!(db.update_expense(42, &updates).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_expenses_filters_and_orders() {
        let (_dir, db) = test_db().await;

        let mut a = new_expense("2025-01-10", "5", "Food & Dining");
        a.payment_method = Some("Cash".to_string());
        let mut b = new_expense("2025-01-02", "7", "Transportation");
        b.tags = Some("work,commute".to_string());
        let c = new_expense("2025-02-01", "9", "Food & Dining");
        let a_id = db.insert_expense(&a).await.unwrap();
        let b_id = db.insert_expense(&b).await.unwrap();
        let _out_of_range = db.insert_expense(&c).await.unwrap();

        let listed = db
            .list_expenses(&ExpenseFilter::range(d("2025-01-01"), d("2025-01-31")))
            .await
            .unwrap();
        assert_eq!(
            listed.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![b_id, a_id],
            "date ascending"
        );

        let mut filter = ExpenseFilter::range(d("2025-01-01"), d("2025-01-31"));
        filter.category = Some("Food & Dining".to_string());
        let listed = db.list_expenses(&filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, a_id);

        let mut filter = ExpenseFilter::range(d("2025-01-01"), d("2025-01-31"));
        filter.tag = Some("commute".to_string());
        let listed = db.list_expenses(&filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, b_id);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_escapes_wildcards() {
        let (_dir, db) = test_db().await;

        let mut a = new_expense("2025-01-10", "5", "Food & Dining");
        a.note = Some("Lunch at CAFE".to_string());
        let mut b = new_expense("2025-01-11", "5", "Shopping");
        b.note = Some("100% cotton shirt".to_string());
        let a_id = db.insert_expense(&a).await.unwrap();
        let b_id = db.insert_expense(&b).await.unwrap();

        let hits = db.search_expenses("cafe", None, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a_id);

        // A literal '%' must not act as a wildcard.
        let hits = db.search_expenses("100%", None, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, b_id);

        let hits = db
            .search_expenses("shirt", Some(d("2025-01-12")), None)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn template_round_trip_and_unique_name() {
        let (_dir, db) = test_db().await;

        let t = NewRecurringTemplate {
            name: "Rent".to_string(),
            amount: amt("1500"),
            category: "Home".to_string(),
            subcategory: None,
            note: None,
            frequency: Frequency::Monthly,
            next_due_date: d("2025-02-01"),
        };
        let id = db.insert_template(&t).await.unwrap();
        let got = db.get_template(id).await.unwrap().unwrap();
        assert_eq!(got.frequency, Frequency::Monthly);
        assert!(got.active);

        let err = db.insert_template(&t).await.unwrap_err();
        // The sqlite message is nested in the error chain.
        assert!(format!("{err:#}").contains("UNIQUE constraint failed"));
    }

    #[tokio::test]
    async fn due_templates_reports_unreadable_rows() {
        let (_dir, db) = test_db().await;

        let good = NewRecurringTemplate {
            name: "Gym".to_string(),
            amount: amt("30"),
            category: "Healthcare".to_string(),
            subcategory: None,
            note: None,
            frequency: Frequency::Weekly,
            next_due_date: d("2025-01-01"),
        };
        db.insert_template(&good).await.unwrap();

        // Simulate a hand-edited row with an unknown frequency.
        sqlx::query(
            "INSERT INTO recurring_templates \
             (name, amount, category, frequency, next_due_date, active, created_at) \
             VALUES ('Broken', '5', 'Misc', 'fortnightly', '2025-01-01', 1, ?)",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&db.pool)
        .await
        .unwrap();

        let loads = db.due_templates(d("2025-01-15")).await.unwrap();
        assert_eq!(loads.len(), 2);
        let parsed: Vec<_> = loads
            .iter()
            .filter(|l| matches!(l, TemplateLoad::Parsed(_)))
            .collect();
        assert_eq!(parsed.len(), 1);
        let unreadable = loads
            .iter()
            .find_map(|l| match l {
                TemplateLoad::Unreadable { name, reason, .. } => Some((name, reason)),
                _ => None,
            })
            .unwrap();
        assert_eq!(unreadable.0, "Broken");
        assert!(unreadable.1.contains("fortnightly"));
    }

    #[tokio::test]
    async fn apply_occurrences_is_transactional_and_tags_rows() {
        let (_dir, db) = test_db().await;

        let t = NewRecurringTemplate {
            name: "Coffee".to_string(),
            amount: amt("4.50"),
            category: "Food & Dining".to_string(),
            subcategory: None,
            note: None,
            frequency: Frequency::Daily,
            next_due_date: d("2025-01-01"),
        };
        let template_id = db.insert_template(&t).await.unwrap();

        let mut occurrence = new_expense("2025-01-01", "4.50", "Food & Dining");
        occurrence.recurring_template_id = Some(template_id);
        db.apply_occurrences(template_id, &[occurrence.clone()], d("2025-01-02"))
            .await
            .unwrap();

        let listed = db
            .list_expenses(&ExpenseFilter::range(d("2025-01-01"), d("2025-01-31")))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].recurring_template_id, Some(template_id));

        let template = db.get_template(template_id).await.unwrap().unwrap();
        assert_eq!(template.next_due_date, d("2025-01-02"));
    }

    #[tokio::test]
    async fn income_round_trip() {
        let (_dir, db) = test_db().await;

        let income = NewIncome {
            date: d("2025-01-31"),
            amount: amt("5000"),
            source: "Acme Corp".to_string(),
            category: Some("salary".to_string()),
            note: None,
        };
        let id = db.insert_income(&income).await.unwrap();
        let got = db.get_income(id).await.unwrap().unwrap();
        assert_eq!(got.source, "Acme Corp");

        let listed = db
            .list_income(&IncomeFilter::range(d("2025-01-01"), d("2025-01-31")))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let updates = IncomeUpdates {
            amount: Some(amt("5100")),
            ..Default::default()
        };
        let updated = db.update_income(id, &updates).await.unwrap().unwrap();
        assert_eq!(updated.amount, amt("5100"));

        let hits = db.search_income("acme", None, None).await.unwrap();
        assert_eq!(hits.len(), 1);

        assert!(db.delete_income(id).await.unwrap());
        assert!(!db.delete_income(id).await.unwrap());
    }
}
