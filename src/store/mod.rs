//! Persistence layer.
//!
//! Services depend only on the [`Repository`] trait. Two adapters implement
//! it: [`MemoryStore`] for tests and throwaway runs, and [`SqliteStore`] which
//! is the source of truth in production.
//!
//! Reads return entities with their tag associations resolved. Tag-name
//! uniqueness and reference integrity are *not* enforced here; the editing
//! service checks them with sequential reads.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{init_database, SqliteStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Activity, ActivityId, Expense, ExpenseId, Tag, TagId};

/// Failure reported by a repository adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded into a domain entity.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The value has no faithful representation in this backend.
    #[error("value out of storable range: {0}")]
    OutOfRange(String),

    #[error("in-memory store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn tag_not_found(id: TagId) -> Self {
        StoreError::NotFound {
            entity: "Tag",
            id: id.0,
        }
    }

    pub fn expense_not_found(id: ExpenseId) -> Self {
        StoreError::NotFound {
            entity: "Expense",
            id: id.0,
        }
    }

    pub fn activity_not_found(id: ActivityId) -> Self {
        StoreError::NotFound {
            entity: "Activity",
            id: id.0,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage contract for tags, expenses and activities.
///
/// Lookups by ID fail with [`StoreError::NotFound`]; lookups by name return
/// `Ok(None)` because "no such tag" is an expected answer there. `save_*`
/// ignores the incoming ID and returns the one the store assigned. Result
/// order of the list queries is not part of the contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    // ==================== TAGS ====================

    async fn find_tag_by_id(&self, id: TagId) -> StoreResult<Tag>;

    async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>>;

    async fn find_all_tags(&self) -> StoreResult<Vec<Tag>>;

    async fn save_tag(&self, tag: &Tag) -> StoreResult<TagId>;

    async fn edit_tag(&self, tag: &Tag) -> StoreResult<()>;

    async fn delete_tag(&self, id: TagId) -> StoreResult<()>;

    // ==================== EXPENSES ====================

    async fn find_expense_by_id(&self, id: ExpenseId) -> StoreResult<Expense>;

    /// Expenses whose time is at or after `since`.
    async fn find_expenses_by_time(&self, since: DateTime<Utc>) -> StoreResult<Vec<Expense>>;

    async fn find_expenses_by_tag(&self, tag_id: TagId) -> StoreResult<Vec<Expense>>;

    async fn find_expenses_by_activity(&self, activity_id: ActivityId)
        -> StoreResult<Vec<Expense>>;

    async fn save_expense(&self, expense: &Expense) -> StoreResult<ExpenseId>;

    async fn edit_expense(&self, expense: &Expense) -> StoreResult<()>;

    async fn delete_expense(&self, id: ExpenseId) -> StoreResult<()>;

    // ==================== ACTIVITIES ====================

    async fn find_activity_by_id(&self, id: ActivityId) -> StoreResult<Activity>;

    /// Activities whose time is at or after `since`.
    async fn find_activities_by_time(&self, since: DateTime<Utc>) -> StoreResult<Vec<Activity>>;

    async fn find_activities_by_tag(&self, tag_id: TagId) -> StoreResult<Vec<Activity>>;

    async fn save_activity(&self, activity: &Activity) -> StoreResult<ActivityId>;

    async fn edit_activity(&self, activity: &Activity) -> StoreResult<()>;

    async fn delete_activity(&self, id: ActivityId) -> StoreResult<()>;
}
