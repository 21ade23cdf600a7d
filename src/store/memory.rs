//! In-memory repository.
//!
//! One `MemoryStore` owns all of its tables; construct a fresh one per test
//! or per run. IDs come from per-entity monotonic counters advanced under the
//! write lock, so they never collide.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Repository, StoreError, StoreResult};
use crate::models::{Activity, ActivityId, Expense, ExpenseId, Tag, TagId};

#[derive(Debug, Default)]
struct Tables {
    tags: BTreeMap<TagId, Tag>,
    expenses: BTreeMap<ExpenseId, Expense>,
    activities: BTreeMap<ActivityId, Activity>,
    last_tag_id: i64,
    last_expense_id: i64,
    last_activity_id: i64,
}

impl Tables {
    /// Re-reads tag names from the tag table so renames show up everywhere.
    fn resolve_tags(&self, tags: &[Tag]) -> Vec<Tag> {
        tags.iter()
            .filter_map(|t| self.tags.get(&t.id).cloned())
            .collect()
    }

    fn hydrate_expense(&self, expense: &Expense) -> Expense {
        Expense {
            tags: self.resolve_tags(&expense.tags),
            ..expense.clone()
        }
    }

    fn expenses_of(&self, id: ActivityId) -> Vec<Expense> {
        let mut owned: Vec<Expense> = self
            .expenses
            .values()
            .filter(|e| e.activity_id == Some(id))
            .map(|e| self.hydrate_expense(e))
            .collect();
        owned.sort_by(|a, b| b.time.cmp(&a.time));
        owned
    }

    fn hydrate_activity(&self, activity: &Activity) -> Activity {
        Activity {
            tags: self.resolve_tags(&activity.tags),
            expenses: self.expenses_of(activity.id),
            ..activity.clone()
        }
    }
}

/// Repository backed by maps held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl Repository for MemoryStore {
    // ==================== TAGS ====================

    async fn find_tag_by_id(&self, id: TagId) -> StoreResult<Tag> {
        self.read()?
            .tags
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::tag_not_found(id))
    }

    async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        Ok(self
            .read()?
            .tags
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn find_all_tags(&self) -> StoreResult<Vec<Tag>> {
        Ok(self.read()?.tags.values().cloned().collect())
    }

    async fn save_tag(&self, tag: &Tag) -> StoreResult<TagId> {
        let mut tables = self.write()?;
        tables.last_tag_id += 1;
        let id = TagId(tables.last_tag_id);
        tables.tags.insert(id, Tag::new(id, tag.name.clone()));
        Ok(id)
    }

    async fn edit_tag(&self, tag: &Tag) -> StoreResult<()> {
        let mut tables = self.write()?;
        let stored = tables
            .tags
            .get_mut(&tag.id)
            .ok_or_else(|| StoreError::tag_not_found(tag.id))?;
        stored.name = tag.name.clone();
        Ok(())
    }

    async fn delete_tag(&self, id: TagId) -> StoreResult<()> {
        self.write()?
            .tags
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::tag_not_found(id))
    }

    // ==================== EXPENSES ====================

    async fn find_expense_by_id(&self, id: ExpenseId) -> StoreResult<Expense> {
        let tables = self.read()?;
        tables
            .expenses
            .get(&id)
            .map(|e| tables.hydrate_expense(e))
            .ok_or_else(|| StoreError::expense_not_found(id))
    }

    async fn find_expenses_by_time(&self, since: DateTime<Utc>) -> StoreResult<Vec<Expense>> {
        let tables = self.read()?;
        Ok(tables
            .expenses
            .values()
            .filter(|e| e.time >= since)
            .map(|e| tables.hydrate_expense(e))
            .collect())
    }

    async fn find_expenses_by_tag(&self, tag_id: TagId) -> StoreResult<Vec<Expense>> {
        let tables = self.read()?;
        Ok(tables
            .expenses
            .values()
            .filter(|e| e.has_tag(tag_id))
            .map(|e| tables.hydrate_expense(e))
            .collect())
    }

    async fn find_expenses_by_activity(
        &self,
        activity_id: ActivityId,
    ) -> StoreResult<Vec<Expense>> {
        Ok(self.read()?.expenses_of(activity_id))
    }

    async fn save_expense(&self, expense: &Expense) -> StoreResult<ExpenseId> {
        let mut tables = self.write()?;
        tables.last_expense_id += 1;
        let id = ExpenseId(tables.last_expense_id);
        tables.expenses.insert(
            id,
            Expense {
                id,
                ..expense.clone()
            },
        );
        Ok(id)
    }

    async fn edit_expense(&self, expense: &Expense) -> StoreResult<()> {
        let mut tables = self.write()?;
        let stored = tables
            .expenses
            .get_mut(&expense.id)
            .ok_or_else(|| StoreError::expense_not_found(expense.id))?;
        *stored = expense.clone();
        Ok(())
    }

    async fn delete_expense(&self, id: ExpenseId) -> StoreResult<()> {
        self.write()?
            .expenses
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::expense_not_found(id))
    }

    // ==================== ACTIVITIES ====================

    async fn find_activity_by_id(&self, id: ActivityId) -> StoreResult<Activity> {
        let tables = self.read()?;
        tables
            .activities
            .get(&id)
            .map(|a| tables.hydrate_activity(a))
            .ok_or_else(|| StoreError::activity_not_found(id))
    }

    async fn find_activities_by_time(&self, since: DateTime<Utc>) -> StoreResult<Vec<Activity>> {
        let tables = self.read()?;
        Ok(tables
            .activities
            .values()
            .filter(|a| a.time >= since)
            .map(|a| tables.hydrate_activity(a))
            .collect())
    }

    async fn find_activities_by_tag(&self, tag_id: TagId) -> StoreResult<Vec<Activity>> {
        let tables = self.read()?;
        Ok(tables
            .activities
            .values()
            .filter(|a| a.has_tag(tag_id))
            .map(|a| tables.hydrate_activity(a))
            .collect())
    }

    async fn save_activity(&self, activity: &Activity) -> StoreResult<ActivityId> {
        let mut tables = self.write()?;
        tables.last_activity_id += 1;
        let id = ActivityId(tables.last_activity_id);
        tables.activities.insert(
            id,
            Activity {
                id,
                expenses: Vec::new(),
                ..activity.clone()
            },
        );
        Ok(id)
    }

    async fn edit_activity(&self, activity: &Activity) -> StoreResult<()> {
        let mut tables = self.write()?;
        let stored = tables
            .activities
            .get_mut(&activity.id)
            .ok_or_else(|| StoreError::activity_not_found(activity.id))?;
        *stored = Activity {
            expenses: Vec::new(),
            ..activity.clone()
        };
        Ok(())
    }

    async fn delete_activity(&self, id: ActivityId) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables
            .activities
            .remove(&id)
            .ok_or_else(|| StoreError::activity_not_found(id))?;
        for expense in tables.expenses.values_mut() {
            if expense.activity_id == Some(id) {
                expense.activity_id = None;
            }
        }
        Ok(())
    }
}
