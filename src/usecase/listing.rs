//! Read-path use cases.
//!
//! Store result order is not guaranteed across backends, so every list is
//! re-sorted here: newest first, stable for equal timestamps.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::models::{Activity, ActivityId, Expense, ExpenseId, Tag, TagId};
use crate::store::Repository;

#[derive(Clone)]
pub struct ListingService {
    repo: Arc<dyn Repository>,
}

impl ListingService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// All tags, sorted by name.
    pub async fn all_tags(&self) -> AppResult<Vec<Tag>> {
        let mut tags = self.repo.find_all_tags().await?;
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    pub async fn find_tag_by_id(&self, id: TagId) -> AppResult<Tag> {
        Ok(self.repo.find_tag_by_id(id).await?)
    }

    pub async fn find_expense_by_id(&self, id: ExpenseId) -> AppResult<Expense> {
        Ok(self.repo.find_expense_by_id(id).await?)
    }

    pub async fn find_activity_by_id(&self, id: ActivityId) -> AppResult<Activity> {
        Ok(self.repo.find_activity_by_id(id).await?)
    }

    /// Expenses at or after `since`, most recent first.
    ///
    /// Fails with [`AppError::FutureTime`] without touching the store when
    /// `since` lies in the future.
    pub async fn find_expenses_by_time(&self, since: DateTime<Utc>) -> AppResult<Vec<Expense>> {
        debug!(%since, "Listing expenses by time");
        ensure_not_future(since)?;
        let mut expenses = self.repo.find_expenses_by_time(since).await?;
        newest_first(&mut expenses, |e| e.time);
        Ok(expenses)
    }

    /// Expenses carrying the tag, most recent first.
    ///
    /// The tag is resolved before the join query so a missing tag reports
    /// [`AppError::NotFound`] rather than an empty list.
    pub async fn find_expenses_by_tag(&self, tag_id: TagId) -> AppResult<Vec<Expense>> {
        debug!(%tag_id, "Listing expenses by tag");
        self.repo.find_tag_by_id(tag_id).await?;
        let mut expenses = self.repo.find_expenses_by_tag(tag_id).await?;
        newest_first(&mut expenses, |e| e.time);
        Ok(expenses)
    }

    /// Activities at or after `since`, most recent first.
    pub async fn find_activities_by_time(
        &self,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<Activity>> {
        debug!(%since, "Listing activities by time");
        ensure_not_future(since)?;
        let mut activities = self.repo.find_activities_by_time(since).await?;
        newest_first(&mut activities, |a| a.time);
        Ok(activities)
    }

    /// Activities carrying the tag, most recent first.
    pub async fn find_activities_by_tag(&self, tag_id: TagId) -> AppResult<Vec<Activity>> {
        debug!(%tag_id, "Listing activities by tag");
        self.repo.find_tag_by_id(tag_id).await?;
        let mut activities = self.repo.find_activities_by_tag(tag_id).await?;
        newest_first(&mut activities, |a| a.time);
        Ok(activities)
    }

    /// Expenses owned by an activity, most recent first.
    pub async fn find_activity_expenses(&self, id: ActivityId) -> AppResult<Vec<Expense>> {
        self.repo.find_activity_by_id(id).await?;
        let mut expenses = self.repo.find_expenses_by_activity(id).await?;
        newest_first(&mut expenses, |e| e.time);
        Ok(expenses)
    }
}

fn ensure_not_future(since: DateTime<Utc>) -> AppResult<()> {
    if since > Utc::now() {
        return Err(AppError::FutureTime(format!(
            "Cannot list entries starting in the future ({})",
            since.to_rfc3339()
        )));
    }
    Ok(())
}

fn newest_first<T>(items: &mut [T], time: impl Fn(&T) -> DateTime<Utc>) {
    // sort_by is stable: equal timestamps keep store order
    items.sort_by(|a, b| time(b).cmp(&time(a)));
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::store::{MemoryStore, MockRepository, StoreError};

    fn expense_on(label: &str, day: u32, tags: Vec<Tag>) -> Expense {
        Expense {
            id: ExpenseId::default(),
            label: label.to_string(),
            time: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            value: 1.0,
            unit: "EUR".to_string(),
            activity_id: None,
            tags,
        }
    }

    fn activity_on(label: &str, day: u32, tags: Vec<Tag>) -> Activity {
        Activity {
            id: ActivityId::default(),
            label: label.to_string(),
            place: String::new(),
            description: String::new(),
            time: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            duration: Duration::from_secs(60),
            tags,
            expenses: Vec::new(),
        }
    }

    fn labels(expenses: &[Expense]) -> Vec<&str> {
        expenses.iter().map(|e| e.label.as_str()).collect()
    }

    #[tokio::test]
    async fn test_expenses_by_time_newest_first() {
        let store = Arc::new(MemoryStore::new());
        for (label, day) in [("jan1", 1), ("jan3", 3), ("jan2", 2)] {
            store.save_expense(&expense_on(label, day, Vec::new())).await.unwrap();
        }
        let listing = ListingService::new(store);

        let since = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        let expenses = listing.find_expenses_by_time(since).await.unwrap();
        assert_eq!(labels(&expenses), vec!["jan3", "jan2", "jan1"]);
    }

    #[tokio::test]
    async fn test_activities_by_time_newest_first() {
        let store = Arc::new(MemoryStore::new());
        for (label, day) in [("jan1", 1), ("jan3", 3), ("jan2", 2)] {
            store.save_activity(&activity_on(label, day, Vec::new())).await.unwrap();
        }
        let listing = ListingService::new(store);

        let since = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        let activities = listing.find_activities_by_time(since).await.unwrap();
        let labels: Vec<_> = activities.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["jan3", "jan2", "jan1"]);

        let since = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let activities = listing.find_activities_by_time(since).await.unwrap();
        let labels: Vec<_> = activities.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["jan3", "jan2"]);
    }

    #[tokio::test]
    async fn test_equal_times_keep_store_order() {
        let store = Arc::new(MemoryStore::new());
        for label in ["first", "second", "third"] {
            store.save_expense(&expense_on(label, 2, Vec::new())).await.unwrap();
        }
        store.save_expense(&expense_on("later", 5, Vec::new())).await.unwrap();
        let listing = ListingService::new(store);

        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let expenses = listing.find_expenses_by_time(since).await.unwrap();
        assert_eq!(labels(&expenses), vec!["later", "first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_future_time_never_reaches_store() {
        // No expectations: any store call panics.
        let listing = ListingService::new(Arc::new(MockRepository::new()));
        let tomorrow = Utc::now() + chrono::Duration::days(1);

        let err = listing.find_expenses_by_time(tomorrow).await.unwrap_err();
        assert!(matches!(err, AppError::FutureTime(_)));

        let err = listing.find_activities_by_time(tomorrow).await.unwrap_err();
        assert!(matches!(err, AppError::FutureTime(_)));
    }

    #[tokio::test]
    async fn test_unknown_tag_fails_before_join() {
        let mut repo = MockRepository::new();
        repo.expect_find_tag_by_id()
            .times(2)
            .returning(|id| Err(StoreError::tag_not_found(id)));
        repo.expect_find_expenses_by_tag().never();
        repo.expect_find_activities_by_tag().never();
        let listing = ListingService::new(Arc::new(repo));

        let err = listing.find_expenses_by_tag(TagId(404)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = listing.find_activities_by_tag(TagId(404)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_storage_failure_passes_through() {
        let mut repo = MockRepository::new();
        repo.expect_find_expenses_by_time()
            .returning(|_| Err(StoreError::Corrupt("bad row".to_string())));
        let listing = ListingService::new(Arc::new(repo));

        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let err = listing.find_expenses_by_time(since).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_by_tag_sorted() {
        let store = Arc::new(MemoryStore::new());
        let work = store.save_tag(&Tag::new(TagId(0), "work")).await.unwrap();
        let other = store.save_tag(&Tag::new(TagId(0), "other")).await.unwrap();
        let work_tag = vec![Tag::new(work, "work")];
        store.save_expense(&expense_on("a", 1, work_tag.clone())).await.unwrap();
        store.save_expense(&expense_on("b", 4, work_tag.clone())).await.unwrap();
        store
            .save_expense(&expense_on("c", 9, vec![Tag::new(other, "other")]))
            .await
            .unwrap();
        store.save_activity(&activity_on("x", 2, work_tag.clone())).await.unwrap();
        store.save_activity(&activity_on("y", 6, work_tag)).await.unwrap();
        let listing = ListingService::new(store);

        let expenses = listing.find_expenses_by_tag(work).await.unwrap();
        assert_eq!(labels(&expenses), vec!["b", "a"]);

        let activities = listing.find_activities_by_tag(work).await.unwrap();
        let act_labels: Vec<_> = activities.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(act_labels, vec!["y", "x"]);

        assert!(listing.find_activities_by_tag(other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_tags_sorted_by_name() {
        let store = Arc::new(MemoryStore::new());
        for name in ["zeta", "alpha", "mid"] {
            store.save_tag(&Tag::new(TagId(0), name)).await.unwrap();
        }
        let listing = ListingService::new(store);

        let names: Vec<String> = listing
            .all_tags()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_activity_expenses() {
        let store = Arc::new(MemoryStore::new());
        let act = store.save_activity(&activity_on("trip", 1, Vec::new())).await.unwrap();
        let mut owned = expense_on("ticket", 1, Vec::new());
        owned.activity_id = Some(act);
        store.save_expense(&owned).await.unwrap();
        store.save_expense(&expense_on("unrelated", 2, Vec::new())).await.unwrap();
        let listing = ListingService::new(store);

        let expenses = listing.find_activity_expenses(act).await.unwrap();
        assert_eq!(labels(&expenses), vec!["ticket"]);

        let err = listing
            .find_activity_expenses(ActivityId(77))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
