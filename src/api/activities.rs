//! Activity API endpoints.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{body, created, path_id, success, ApiResult, TimeQuery};
use crate::errors::AppError;
use crate::models::{Activity, ActivityId, ActivityRequest, Created, Expense};
use crate::AppState;

/// GET /api/activities?from= - Activities since a point in time, newest first.
pub async fn list_activities(
    State(state): State<AppState>,
    query: Result<Query<TimeQuery>, QueryRejection>,
) -> ApiResult<Vec<Activity>> {
    let since = TimeQuery::resolve(query)?;
    success(state.listing.find_activities_by_time(since).await?)
}

/// GET /api/activities/{id} - Get a single activity with its expenses.
pub async fn get_activity(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Activity> {
    let id = path_id(path)?;
    success(state.listing.find_activity_by_id(ActivityId(id)).await?)
}

/// GET /api/activities/{id}/expenses - Expenses owned by the activity.
pub async fn activity_expenses(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Vec<Expense>> {
    let id = path_id(path)?;
    success(state.listing.find_activity_expenses(ActivityId(id)).await?)
}

/// POST /api/activities - Create a new activity.
pub async fn create_activity(
    State(state): State<AppState>,
    payload: Result<Json<ActivityRequest>, JsonRejection>,
) -> ApiResult<Created<ActivityId>> {
    let request = body(payload)?;
    let id = state.editing.add_activity(&request).await?;
    created(Created { id })
}

/// PUT /api/activities/{id} - Replace an activity.
pub async fn update_activity(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ActivityRequest>, JsonRejection>,
) -> ApiResult<Activity> {
    let id = path_id(path)?;
    let request = body(payload)?;
    let id = ActivityId(id);
    state.editing.edit_activity(id, &request).await?;
    success(state.listing.find_activity_by_id(id).await?)
}

/// DELETE /api/activities/{id} - Delete an activity that owns no expenses.
pub async fn delete_activity(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = path_id(path)?;
    state.editing.delete_activity(ActivityId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
