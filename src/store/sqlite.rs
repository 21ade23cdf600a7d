//! SQLite repository.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text, so lexical order
//! in SQL equals time order. Writes that touch an entity and its tag join
//! rows run in one transaction.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};

use super::{Repository, StoreError, StoreResult};
use crate::models::{
    Activity, ActivityId, Expense, ExpenseId, Tag, TagId, TIME_MAX_YEAR, TIME_MIN_YEAR,
};

/// Open (creating if needed) the database file and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL,
            place TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            time TEXT NOT NULL,
            duration_secs INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL,
            time TEXT NOT NULL,
            value REAL NOT NULL,
            unit TEXT NOT NULL,
            activity_id INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS expense_tags (
            expense_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (expense_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS activity_tags (
            activity_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (activity_id, tag_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name);
        CREATE INDEX IF NOT EXISTS idx_expenses_time ON expenses(time);
        CREATE INDEX IF NOT EXISTS idx_expenses_activity ON expenses(activity_id);
        CREATE INDEX IF NOT EXISTS idx_activities_time ON activities(time);
        CREATE INDEX IF NOT EXISTS idx_expense_tags_tag ON expense_tags(tag_id);
        CREATE INDEX IF NOT EXISTS idx_activity_tags_tag ON activity_tags(tag_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

const EARLIEST_TIME: &str = "0001-01-01T00:00:00.000000Z";

const EXPENSE_COLUMNS: &str = "e.id, e.label, e.time, e.value, e.unit, e.activity_id";
const ACTIVITY_COLUMNS: &str = "a.id, a.label, a.place, a.description, a.time, a.duration_secs";

/// Repository backed by a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database at `db_path` and wrap it in a store.
    pub async fn open(db_path: &Path) -> StoreResult<Self> {
        Ok(Self::new(init_database(db_path).await?))
    }

    async fn tags_of_expense(&self, id: ExpenseId) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT t.id, t.name FROM tags t JOIN expense_tags et ON et.tag_id = t.id WHERE et.expense_id = ? ORDER BY t.name",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(tag_from_row).collect()
    }

    async fn tags_of_activity(&self, id: ActivityId) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT t.id, t.name FROM tags t JOIN activity_tags atg ON atg.tag_id = t.id WHERE atg.activity_id = ? ORDER BY t.name",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(tag_from_row).collect()
    }

    /// Decode expense rows and attach their tags.
    async fn hydrate_expenses(&self, rows: &[SqliteRow]) -> StoreResult<Vec<Expense>> {
        let mut expenses = Vec::with_capacity(rows.len());
        for row in rows {
            let mut expense = expense_from_row(row)?;
            expense.tags = self.tags_of_expense(expense.id).await?;
            expenses.push(expense);
        }
        Ok(expenses)
    }

    /// Decode activity rows and attach their tags and owned expenses.
    async fn hydrate_activities(&self, rows: &[SqliteRow]) -> StoreResult<Vec<Activity>> {
        let mut activities = Vec::with_capacity(rows.len());
        for row in rows {
            let mut activity = activity_from_row(row)?;
            activity.tags = self.tags_of_activity(activity.id).await?;
            activity.expenses = self.find_expenses_by_activity(activity.id).await?;
            activities.push(activity);
        }
        Ok(activities)
    }
}

#[async_trait]
impl Repository for SqliteStore {
    // ==================== TAGS ====================

    async fn find_tag_by_id(&self, id: TagId) -> StoreResult<Tag> {
        let row = sqlx::query("SELECT id, name FROM tags WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => tag_from_row(&row),
            None => Err(StoreError::tag_not_found(id)),
        }
    }

    async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        let row = sqlx::query("SELECT id, name FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(tag_from_row).transpose()
    }

    async fn find_all_tags(&self) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(tag_from_row).collect()
    }

    async fn save_tag(&self, tag: &Tag) -> StoreResult<TagId> {
        let now = encode_time(&Utc::now())?;
        let result = sqlx::query("INSERT INTO tags (name, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(&tag.name)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await?;

        Ok(TagId(result.last_insert_rowid()))
    }

    async fn edit_tag(&self, tag: &Tag) -> StoreResult<()> {
        let now = encode_time(&Utc::now())?;
        let result = sqlx::query("UPDATE tags SET name = ?, updated_at = ? WHERE id = ?")
            .bind(&tag.name)
            .bind(&now)
            .bind(tag.id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::tag_not_found(tag.id));
        }
        Ok(())
    }

    async fn delete_tag(&self, id: TagId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::tag_not_found(id));
        }

        sqlx::query("DELETE FROM expense_tags WHERE tag_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM activity_tags WHERE tag_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // ==================== EXPENSES ====================

    async fn find_expense_by_id(&self, id: ExpenseId) -> StoreResult<Expense> {
        let row = sqlx::query(&format!("SELECT {EXPENSE_COLUMNS} FROM expenses e WHERE e.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        let row = row.ok_or_else(|| StoreError::expense_not_found(id))?;
        let mut expense = expense_from_row(&row)?;
        expense.tags = self.tags_of_expense(id).await?;
        Ok(expense)
    }

    async fn find_expenses_by_time(&self, since: DateTime<Utc>) -> StoreResult<Vec<Expense>> {
        let rows = sqlx::query(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses e WHERE e.time >= ? ORDER BY e.time DESC"
        ))
        .bind(encode_since(&since)?)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_expenses(&rows).await
    }

    async fn find_expenses_by_tag(&self, tag_id: TagId) -> StoreResult<Vec<Expense>> {
        let rows = sqlx::query(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses e JOIN expense_tags et ON et.expense_id = e.id WHERE et.tag_id = ? ORDER BY e.time DESC"
        ))
        .bind(tag_id.0)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_expenses(&rows).await
    }

    async fn find_expenses_by_activity(
        &self,
        activity_id: ActivityId,
    ) -> StoreResult<Vec<Expense>> {
        let rows = sqlx::query(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses e WHERE e.activity_id = ? ORDER BY e.time DESC"
        ))
        .bind(activity_id.0)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_expenses(&rows).await
    }

    async fn save_expense(&self, expense: &Expense) -> StoreResult<ExpenseId> {
        let now = encode_time(&Utc::now())?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO expenses (label, time, value, unit, activity_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&expense.label)
        .bind(encode_time(&expense.time)?)
        .bind(expense.value)
        .bind(&expense.unit)
        .bind(expense.activity_id.map(|a| a.0))
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let id = ExpenseId(result.last_insert_rowid());
        link_tags(&mut tx, "expense_tags", "expense_id", id.0, &expense.tags).await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn edit_expense(&self, expense: &Expense) -> StoreResult<()> {
        let now = encode_time(&Utc::now())?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE expenses SET label = ?, time = ?, value = ?, unit = ?, activity_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&expense.label)
        .bind(encode_time(&expense.time)?)
        .bind(expense.value)
        .bind(&expense.unit)
        .bind(expense.activity_id.map(|a| a.0))
        .bind(&now)
        .bind(expense.id.0)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::expense_not_found(expense.id));
        }

        sqlx::query("DELETE FROM expense_tags WHERE expense_id = ?")
            .bind(expense.id.0)
            .execute(&mut *tx)
            .await?;
        link_tags(&mut tx, "expense_tags", "expense_id", expense.id.0, &expense.tags).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_expense(&self, id: ExpenseId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::expense_not_found(id));
        }

        sqlx::query("DELETE FROM expense_tags WHERE expense_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // ==================== ACTIVITIES ====================

    async fn find_activity_by_id(&self, id: ActivityId) -> StoreResult<Activity> {
        let row = sqlx::query(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities a WHERE a.id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| StoreError::activity_not_found(id))?;
        let mut activities = self.hydrate_activities(std::slice::from_ref(&row)).await?;
        activities
            .pop()
            .ok_or_else(|| StoreError::activity_not_found(id))
    }

    async fn find_activities_by_time(&self, since: DateTime<Utc>) -> StoreResult<Vec<Activity>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities a WHERE a.time >= ? ORDER BY a.time DESC"
        ))
        .bind(encode_since(&since)?)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_activities(&rows).await
    }

    async fn find_activities_by_tag(&self, tag_id: TagId) -> StoreResult<Vec<Activity>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities a JOIN activity_tags atg ON atg.activity_id = a.id WHERE atg.tag_id = ? ORDER BY a.time DESC"
        ))
        .bind(tag_id.0)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_activities(&rows).await
    }

    async fn save_activity(&self, activity: &Activity) -> StoreResult<ActivityId> {
        let now = encode_time(&Utc::now())?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO activities (label, place, description, time, duration_secs, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&activity.label)
        .bind(&activity.place)
        .bind(&activity.description)
        .bind(encode_time(&activity.time)?)
        .bind(duration_to_secs(activity.duration)?)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let id = ActivityId(result.last_insert_rowid());
        link_tags(&mut tx, "activity_tags", "activity_id", id.0, &activity.tags).await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn edit_activity(&self, activity: &Activity) -> StoreResult<()> {
        let now = encode_time(&Utc::now())?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE activities SET label = ?, place = ?, description = ?, time = ?, duration_secs = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&activity.label)
        .bind(&activity.place)
        .bind(&activity.description)
        .bind(encode_time(&activity.time)?)
        .bind(duration_to_secs(activity.duration)?)
        .bind(&now)
        .bind(activity.id.0)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::activity_not_found(activity.id));
        }

        sqlx::query("DELETE FROM activity_tags WHERE activity_id = ?")
            .bind(activity.id.0)
            .execute(&mut *tx)
            .await?;
        link_tags(
            &mut tx,
            "activity_tags",
            "activity_id",
            activity.id.0,
            &activity.tags,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_activity(&self, id: ActivityId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM activities WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::activity_not_found(id));
        }

        sqlx::query("DELETE FROM activity_tags WHERE activity_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE expenses SET activity_id = NULL WHERE activity_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Insert one join row per tag. `table` and `owner_column` are internal
/// constants, never user input.
async fn link_tags(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    owner_column: &str,
    owner_id: i64,
    tags: &[Tag],
) -> StoreResult<()> {
    let sql = format!("INSERT OR IGNORE INTO {table} ({owner_column}, tag_id) VALUES (?, ?)");
    for tag in tags {
        sqlx::query(&sql)
            .bind(owner_id)
            .bind(tag.id.0)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

// Helper functions for row conversion

/// Text sorts like time only for four-digit years; anything else is refused
/// rather than stored out of order.
fn encode_time(time: &DateTime<Utc>) -> StoreResult<String> {
    if !(TIME_MIN_YEAR..=TIME_MAX_YEAR).contains(&time.year()) {
        return Err(StoreError::OutOfRange(format!(
            "timestamp {time} outside years {TIME_MIN_YEAR}..={TIME_MAX_YEAR}"
        )));
    }
    Ok(time.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Lower bound for `time >= ?`. Rounded up to the stored microsecond
/// precision so sub-microsecond bounds exclude what they exclude in memory.
fn encode_since(since: &DateTime<Utc>) -> StoreResult<String> {
    if since.year() < TIME_MIN_YEAR {
        return Ok(EARLIEST_TIME.to_string());
    }
    let truncated = since.trunc_subsecs(6);
    if truncated < *since {
        return encode_time(&(truncated + chrono::Duration::microseconds(1)));
    }
    encode_time(&truncated)
}

fn decode_time(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid timestamp {raw:?}: {e}")))
}

fn duration_to_secs(duration: Duration) -> StoreResult<i64> {
    i64::try_from(duration.as_secs())
        .map_err(|_| StoreError::OutOfRange(format!("duration of {}s", duration.as_secs())))
}

fn tag_from_row(row: &SqliteRow) -> StoreResult<Tag> {
    Ok(Tag {
        id: TagId(row.try_get("id")?),
        name: row.try_get("name")?,
    })
}

fn expense_from_row(row: &SqliteRow) -> StoreResult<Expense> {
    let time: String = row.try_get("time")?;
    let activity_id: Option<i64> = row.try_get("activity_id")?;
    Ok(Expense {
        id: ExpenseId(row.try_get("id")?),
        label: row.try_get("label")?,
        time: decode_time(&time)?,
        value: row.try_get("value")?,
        unit: row.try_get("unit")?,
        activity_id: activity_id.map(ActivityId),
        tags: Vec::new(),
    })
}

fn activity_from_row(row: &SqliteRow) -> StoreResult<Activity> {
    let time: String = row.try_get("time")?;
    let duration_secs: i64 = row.try_get("duration_secs")?;
    Ok(Activity {
        id: ActivityId(row.try_get("id")?),
        label: row.try_get("label")?,
        place: row.try_get("place")?,
        description: row.try_get("description")?,
        time: decode_time(&time)?,
        duration: Duration::from_secs(duration_secs.max(0) as u64),
        tags: Vec::new(),
        expenses: Vec::new(),
    })
}
