//! This module is responsible for reading, writing and managing the SQLite database

mod migrations;

use crate::error::{ErrorType, IntoResult, Res};
use crate::model::{Amount, MonthLabel, RecordView, UploadRow};
use crate::{Error, Result};
use anyhow::{bail, Context};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

const MAX_CONNECTIONS: u32 = 8;

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Validates that there is a SQLite file at `path`
    /// - Creates a SQLite connection pool
    /// - Updates the database schema with migrations if it is out-of-date
    /// - Returns a constructed `Db` object for further operations
    pub(crate) async fn load(path: impl AsRef<Path>, busy_timeout: Duration) -> Res<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The SQLite database is missing '{}'", path.display());
        }
        let pool = connect(path, false, busy_timeout).await?;
        let db = Self { pool };
        let current = db.schema_version().await?;
        migrations::upgrade(&db.pool, current).await?;
        Ok(db)
    }

    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    /// - Returns a constructed `Db` object for further operations
    pub(crate) async fn init(path: impl AsRef<Path>, busy_timeout: Duration) -> Res<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A file already exists at '{}'", path.display());
        }
        let pool = connect(path, true, busy_timeout).await?;

        sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .context("Failed to create schema_version table")?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(&pool)
            .await
            .context("Failed to insert initial schema version")?;

        migrations::upgrade(&pool, 0).await?;
        Ok(Self { pool })
    }

    /// Returns the schema version recorded in the database.
    pub(crate) async fn schema_version(&self) -> Res<i32> {
        let row: (i32,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
            .fetch_one(&self.pool)
            .await
            .context("Failed to query schema version")?;
        Ok(row.0)
    }

    /// Replaces every record for (`user_id`, `year`) with `rows` and returns the number of rows
    /// inserted.
    ///
    /// All steps run in one `BEGIN IMMEDIATE` transaction. The write lock is taken before the user
    /// check, so concurrent uploads for the same key run one after the other and the result is
    /// always exactly one upload's rows. If anything fails the transaction is rolled back when it
    /// is dropped and no change is visible.
    ///
    /// # Errors
    /// - `ErrorType::NotFound` if `user_id` is not in the users table
    /// - `ErrorType::Database` for any storage failure
    pub(crate) async fn reconcile(&self, user_id: i64, year: i64, rows: &[UploadRow]) -> Result<u64> {
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin transaction")
            .pub_result(ErrorType::Database)?;

        let user: Option<i64> = sqlx::query_scalar("SELECT user_id FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to look up user")
            .pub_result(ErrorType::Database)?;
        if user.is_none() {
            return Err(Error::msg(
                ErrorType::NotFound,
                format!("user_id {user_id} does not exist in users table"),
            ));
        }

        let deleted = sqlx::query("DELETE FROM financial_records WHERE user_id = ? AND year = ?")
            .bind(user_id)
            .bind(year)
            .execute(&mut *tx)
            .await
            .context("Failed to delete existing records")
            .pub_result(ErrorType::Database)?
            .rows_affected();
        trace!("Deleted {deleted} existing records for user_id={user_id}, year={year}");

        let mut inserted = 0;
        for row in rows {
            inserted += sqlx::query(
                "INSERT INTO financial_records (user_id, year, month, amount) VALUES (?, ?, ?, ?)",
            )
            .bind(user_id)
            .bind(year)
            .bind(row.month().as_str())
            .bind(row.amount().to_f64())
            .execute(&mut *tx)
            .await
            .context("Failed to insert record")
            .pub_result(ErrorType::Database)?
            .rows_affected();
        }

        tx.commit()
            .await
            .context("Failed to commit transaction")
            .pub_result(ErrorType::Database)?;

        debug!(
            "Replaced {deleted} records with {inserted} for user_id={user_id}, year={year}"
        );
        Ok(inserted)
    }

    /// Returns the records for (`user_id`, `year`) joined with the user's name, in calendar order.
    /// Records with the same month keep the order in which they were inserted.
    pub(crate) async fn read_records(&self, user_id: i64, year: i64) -> Res<Vec<RecordView>> {
        let rows: Vec<(String, String, f64)> = sqlx::query_as(
            "SELECT u.user_name, f.month, f.amount \
            FROM financial_records f \
            JOIN users u ON u.user_id = f.user_id \
            WHERE f.user_id = ? AND f.year = ? \
            ORDER BY f.id",
        )
        .bind(user_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query financial records")?;

        let mut records = rows
            .into_iter()
            .map(|(user_name, month, amount)| {
                let amount = Amount::from_f64(amount)
                    .with_context(|| format!("Stored amount {amount} is not a finite number"))?;
                Ok(RecordView {
                    user_name,
                    month: MonthLabel::from_stored(month),
                    amount,
                })
            })
            .collect::<Res<Vec<RecordView>>>()?;

        records.sort_by(|a, b| a.month.chronological_cmp(&b.month));
        Ok(records)
    }

    /// Closes the connection pool. Further operations fail.
    pub(crate) async fn close(&self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn connect(path: &Path, create: bool, busy_timeout: Duration) -> Res<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(busy_timeout);

    SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(busy_timeout)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open SQLite database at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use std::str::FromStr;
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn rows(pairs: &[(&str, &str)]) -> Vec<UploadRow> {
        pairs
            .iter()
            .map(|(m, a)| UploadRow::new(MonthLabel::normalize(m), Amount::from_str(a).unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finances.sqlite");
        let db = Db::init(&path, TIMEOUT).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), migrations::CURRENT_VERSION);
        db.close().await;

        let db = Db::load(&path, TIMEOUT).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), migrations::CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_load_refuses_newer_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finances.sqlite");
        let db = Db::init(&path, TIMEOUT).await.unwrap();
        sqlx::query("UPDATE schema_version SET version = ?")
            .bind(migrations::CURRENT_VERSION + 1)
            .execute(&db.pool)
            .await
            .unwrap();
        db.close().await;

        let err = Db::load(&path, TIMEOUT).await.unwrap_err();
        assert!(err.to_string().contains("Cannot upgrade"), "{err}");
    }

    #[tokio::test]
    async fn test_init_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finances.sqlite");
        std::fs::write(&path, b"").unwrap();
        assert!(Db::init(&path, TIMEOUT).await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Db::load(dir.path().join("nope.sqlite"), TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_reconcile_inserts_and_reads_in_calendar_order() {
        let env = TestEnv::new().await;
        env.insert_user(1, "Alice").await;
        let db = env.config().db().clone();

        let count = db
            .reconcile(1, 2024, &rows(&[("March", "3"), ("Jan", "1"), ("February", "2")]))
            .await
            .unwrap();
        assert_eq!(count, 3);

        let records = db.read_records(1, 2024).await.unwrap();
        let months: Vec<&str> = records.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(months, vec!["Jan", "February", "March"]);
        assert!(records.iter().all(|r| r.user_name == "Alice"));
    }

    #[tokio::test]
    async fn test_reconcile_stores_amounts_without_loss() {
        let env = TestEnv::new().await;
        env.insert_user(1, "Alice").await;
        let db = env.config().db().clone();

        db.reconcile(
            1,
            2024,
            &rows(&[("Jan", "1e30"), ("Feb", "1e-30"), ("Mar", "123456789.12345678")]),
        )
        .await
        .unwrap();

        assert_eq!(
            env.stored(1, 2024).await,
            vec![
                ("Jan".to_string(), 1e30),
                ("Feb".to_string(), 1e-30),
                ("Mar".to_string(), 123456789.12345678),
            ]
        );
    }

    #[tokio::test]
    async fn test_reconcile_overwrites_previous_upload() {
        let env = TestEnv::new().await;
        env.insert_user(1, "Alice").await;
        let db = env.config().db().clone();

        db.reconcile(1, 2024, &rows(&[("Jan", "100")])).await.unwrap();
        db.reconcile(1, 2024, &rows(&[("Feb", "200")])).await.unwrap();

        assert_eq!(env.stored(1, 2024).await, vec![("Feb".to_string(), 200.0)]);
    }

    #[tokio::test]
    async fn test_reconcile_only_touches_its_own_period() {
        let env = TestEnv::new().await;
        env.insert_user(1, "Alice").await;
        env.insert_user(2, "Bob").await;
        let db = env.config().db().clone();

        db.reconcile(1, 2023, &rows(&[("Jan", "1")])).await.unwrap();
        db.reconcile(2, 2024, &rows(&[("Jan", "2")])).await.unwrap();
        db.reconcile(1, 2024, &rows(&[("Jan", "3")])).await.unwrap();
        db.reconcile(1, 2024, &rows(&[("Mar", "4")])).await.unwrap();

        assert_eq!(env.stored(1, 2023).await, vec![("Jan".to_string(), 1.0)]);
        assert_eq!(env.stored(2, 2024).await, vec![("Jan".to_string(), 2.0)]);
        assert_eq!(env.stored(1, 2024).await, vec![("Mar".to_string(), 4.0)]);
    }

    #[tokio::test]
    async fn test_reconcile_empty_clears_period() {
        let env = TestEnv::new().await;
        env.insert_user(1, "Alice").await;
        let db = env.config().db().clone();

        db.reconcile(1, 2024, &rows(&[("Jan", "1"), ("Feb", "2")]))
            .await
            .unwrap();
        let count = db.reconcile(1, 2024, &[]).await.unwrap();

        assert_eq!(count, 0);
        assert!(env.stored(1, 2024).await.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_keeps_duplicate_months_in_insert_order() {
        let env = TestEnv::new().await;
        env.insert_user(1, "Alice").await;
        let db = env.config().db().clone();

        let count = db
            .reconcile(1, 2024, &rows(&[("Jan", "2"), ("Jan", "1")]))
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            env.stored(1, 2024).await,
            vec![("Jan".to_string(), 2.0), ("Jan".to_string(), 1.0)]
        );
    }

    #[tokio::test]
    async fn test_reconcile_unknown_user_writes_nothing() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();

        let err = db
            .reconcile(999999, 2024, &rows(&[("Jan", "1")]))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
        assert_eq!(
            err.to_string(),
            "user_id 999999 does not exist in users table"
        );

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM financial_records")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 0);
    }

    #[tokio::test]
    async fn test_reconcile_on_closed_pool_is_database_error() {
        let env = TestEnv::new().await;
        env.insert_user(1, "Alice").await;
        let db = env.config().db().clone();
        db.close().await;

        let err = db.reconcile(1, 2024, &rows(&[("Jan", "1")])).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Database);
        assert!(err.to_string().starts_with("Database error: "));
    }

    #[tokio::test]
    async fn test_read_records_empty() {
        let env = TestEnv::new().await;
        env.insert_user(1, "Alice").await;
        let records = env.config().db().read_records(1, 2024).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_read_records_unrecognized_months_last() {
        let env = TestEnv::new().await;
        env.insert_user(1, "Alice").await;
        let db = env.config().db().clone();

        db.reconcile(
            1,
            2024,
            &rows(&[("Total", "9"), ("december", "12"), ("Bonus", "5"), ("jan", "1")]),
        )
        .await
        .unwrap();

        let months: Vec<String> = env
            .stored(1, 2024)
            .await
            .into_iter()
            .map(|(m, _)| m)
            .collect();
        assert_eq!(months, vec!["Jan", "December", "Bonus", "Total"]);
    }

    #[tokio::test]
    async fn test_concurrent_reconciles_never_interleave() {
        let env = TestEnv::new().await;
        env.insert_user(1, "Alice").await;
        let db = env.config().db().clone();

        let first = rows(&[("Jan", "1"), ("Feb", "1"), ("Mar", "1"), ("Apr", "1")]);
        let second = rows(&[("May", "2"), ("Jun", "2"), ("Jul", "2")]);

        for _ in 0..10 {
            let (a, b) = tokio::join!(
                db.reconcile(1, 2024, &first),
                db.reconcile(1, 2024, &second)
            );
            a.unwrap();
            b.unwrap();

            let amounts: Vec<f64> = env
                .stored(1, 2024)
                .await
                .into_iter()
                .map(|(_, a)| a)
                .collect();
            let only_first = amounts.len() == 4 && amounts.iter().all(|a| *a == 1.0);
            let only_second = amounts.len() == 3 && amounts.iter().all(|a| *a == 2.0);
            assert!(only_first || only_second, "interleaved rows: {amounts:?}");
        }
    }
}
