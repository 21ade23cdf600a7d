//! Write-path use cases.
//!
//! Every mutation runs validate, existence check, business rule check, then
//! persist. Checks are sequential reads followed by a write; nothing here is
//! transactional, so two concurrent `add_tag` calls with the same name can
//! both pass the duplicate check. The server runs one store per process and
//! accepts that window.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};
use crate::models::{
    ActivityId, ActivityRequest, ExpenseId, ExpenseRequest, Tag, TagId, TagRequest,
};
use crate::store::Repository;

#[derive(Clone)]
pub struct EditingService {
    repo: Arc<dyn Repository>,
}

impl EditingService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    // ==================== TAGS ====================

    /// Create a tag and return its generated ID.
    pub async fn add_tag(&self, request: &TagRequest) -> AppResult<TagId> {
        let tag = Tag::new(TagId::default(), request.name.clone());
        tag.validate()?;

        if let Some(existing) = self.repo.find_tag_by_name(&tag.name).await? {
            warn!(name = %tag.name, existing = %existing.id, "Rejected duplicate tag name");
            return Err(duplicate_name(&tag.name, existing.id));
        }

        let id = self.repo.save_tag(&tag).await?;
        info!(%id, name = %tag.name, "Tag created");
        Ok(id)
    }

    /// Rename a tag. Keeping the tag's own current name is not a duplicate.
    pub async fn edit_tag(&self, id: TagId, request: &TagRequest) -> AppResult<()> {
        let tag = Tag::new(id, request.name.clone());
        tag.validate()?;

        self.repo.find_tag_by_id(id).await?;

        match self.repo.find_tag_by_name(&tag.name).await? {
            Some(holder) if holder.id != id => {
                warn!(%id, name = %tag.name, holder = %holder.id, "Rejected duplicate tag name");
                return Err(duplicate_name(&tag.name, holder.id));
            }
            _ => {}
        }

        self.repo.edit_tag(&tag).await?;
        info!(%id, name = %tag.name, "Tag renamed");
        Ok(())
    }

    /// Delete a tag no expense or activity references.
    pub async fn delete_tag(&self, id: TagId) -> AppResult<()> {
        self.repo.find_tag_by_id(id).await?;

        let expenses = self.repo.find_expenses_by_tag(id).await?;
        if !expenses.is_empty() {
            warn!(%id, count = expenses.len(), "Tag delete blocked by expenses");
            return Err(AppError::InUse(format!(
                "Tag {} is used by {} expense(s)",
                id,
                expenses.len()
            )));
        }

        let activities = self.repo.find_activities_by_tag(id).await?;
        if !activities.is_empty() {
            warn!(%id, count = activities.len(), "Tag delete blocked by activities");
            return Err(AppError::InUse(format!(
                "Tag {} is used by {} activity(ies)",
                id,
                activities.len()
            )));
        }

        self.repo.delete_tag(id).await?;
        info!(%id, "Tag deleted");
        Ok(())
    }

    // ==================== EXPENSES ====================

    pub async fn add_expense(&self, request: &ExpenseRequest) -> AppResult<ExpenseId> {
        let mut expense = request.to_expense(ExpenseId::default());
        expense.validate()?;

        expense.tags = self.resolve_tags(&request.tag_ids).await?;
        self.ensure_activity(expense.activity_id).await?;

        let id = self.repo.save_expense(&expense).await?;
        info!(%id, label = %expense.label, "Expense created");
        Ok(id)
    }

    pub async fn edit_expense(&self, id: ExpenseId, request: &ExpenseRequest) -> AppResult<()> {
        let mut expense = request.to_expense(id);
        expense.validate()?;

        self.repo.find_expense_by_id(id).await?;
        expense.tags = self.resolve_tags(&request.tag_ids).await?;
        self.ensure_activity(expense.activity_id).await?;

        self.repo.edit_expense(&expense).await?;
        info!(%id, "Expense updated");
        Ok(())
    }

    /// Nothing references an expense, so deletion only needs it to exist.
    pub async fn delete_expense(&self, id: ExpenseId) -> AppResult<()> {
        self.repo.find_expense_by_id(id).await?;
        self.repo.delete_expense(id).await?;
        info!(%id, "Expense deleted");
        Ok(())
    }

    // ==================== ACTIVITIES ====================

    pub async fn add_activity(&self, request: &ActivityRequest) -> AppResult<ActivityId> {
        let mut activity = request.to_activity(ActivityId::default());
        activity.validate()?;

        activity.tags = self.resolve_tags(&request.tag_ids).await?;

        let id = self.repo.save_activity(&activity).await?;
        info!(%id, label = %activity.label, "Activity created");
        Ok(id)
    }

    pub async fn edit_activity(&self, id: ActivityId, request: &ActivityRequest) -> AppResult<()> {
        let mut activity = request.to_activity(id);
        activity.validate()?;

        self.repo.find_activity_by_id(id).await?;
        activity.tags = self.resolve_tags(&request.tag_ids).await?;

        self.repo.edit_activity(&activity).await?;
        info!(%id, "Activity updated");
        Ok(())
    }

    /// Delete an activity. Blocked while it still owns expenses; delete or
    /// move those first.
    pub async fn delete_activity(&self, id: ActivityId) -> AppResult<()> {
        self.repo.find_activity_by_id(id).await?;

        let owned = self.repo.find_expenses_by_activity(id).await?;
        if !owned.is_empty() {
            warn!(%id, count = owned.len(), "Activity delete blocked by owned expenses");
            return Err(AppError::InUse(format!(
                "Activity {} still owns {} expense(s)",
                id,
                owned.len()
            )));
        }

        self.repo.delete_activity(id).await?;
        info!(%id, "Activity deleted");
        Ok(())
    }

    // ==================== HELPERS ====================

    /// Look up every referenced tag, dropping repeats. Any unknown ID fails
    /// the whole request.
    async fn resolve_tags(&self, ids: &[TagId]) -> AppResult<Vec<Tag>> {
        let mut seen = HashSet::new();
        let mut tags = Vec::with_capacity(ids.len());
        for &id in ids {
            if seen.insert(id) {
                tags.push(self.repo.find_tag_by_id(id).await?);
            }
        }
        debug!(count = tags.len(), "Resolved tag references");
        Ok(tags)
    }

    async fn ensure_activity(&self, id: Option<ActivityId>) -> AppResult<()> {
        if let Some(id) = id {
            self.repo.find_activity_by_id(id).await?;
        }
        Ok(())
    }
}

fn duplicate_name(name: &str, holder: TagId) -> AppError {
    AppError::DuplicateName(format!(
        "Tag name {:?} is already used by tag {}",
        name, holder
    ))
}
