//! Tag API endpoints.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{body, created, path_id, success, ApiResult};
use crate::errors::AppError;
use crate::models::{Activity, Created, Expense, Tag, TagId, TagRequest};
use crate::AppState;

/// GET /api/tags - List all tags.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<Tag>> {
    success(state.listing.all_tags().await?)
}

/// GET /api/tags/{id} - Get a single tag.
pub async fn get_tag(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Tag> {
    let id = path_id(path)?;
    success(state.listing.find_tag_by_id(TagId(id)).await?)
}

/// POST /api/tags - Create a new tag.
pub async fn create_tag(
    State(state): State<AppState>,
    payload: Result<Json<TagRequest>, JsonRejection>,
) -> ApiResult<Created<TagId>> {
    let request = body(payload)?;
    let id = state.editing.add_tag(&request).await?;
    created(Created { id })
}

/// PUT /api/tags/{id} - Rename a tag.
pub async fn update_tag(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TagRequest>, JsonRejection>,
) -> ApiResult<Tag> {
    let id = path_id(path)?;
    let request = body(payload)?;
    let id = TagId(id);
    state.editing.edit_tag(id, &request).await?;
    success(state.listing.find_tag_by_id(id).await?)
}

/// DELETE /api/tags/{id} - Delete an unreferenced tag.
pub async fn delete_tag(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = path_id(path)?;
    state.editing.delete_tag(TagId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/tags/{id}/expenses - Expenses carrying the tag.
pub async fn tag_expenses(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Vec<Expense>> {
    let id = path_id(path)?;
    success(state.listing.find_expenses_by_tag(TagId(id)).await?)
}

/// GET /api/tags/{id}/activities - Activities carrying the tag.
pub async fn tag_activities(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Vec<Activity>> {
    let id = path_id(path)?;
    success(state.listing.find_activities_by_tag(TagId(id)).await?)
}
