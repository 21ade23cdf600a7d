//! Expense API endpoints.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{body, created, path_id, success, ApiResult, TimeQuery};
use crate::errors::AppError;
use crate::models::{Created, Expense, ExpenseId, ExpenseRequest};
use crate::AppState;

/// GET /api/expenses?from= - Expenses since a point in time, newest first.
pub async fn list_expenses(
    State(state): State<AppState>,
    query: Result<Query<TimeQuery>, QueryRejection>,
) -> ApiResult<Vec<Expense>> {
    let since = TimeQuery::resolve(query)?;
    success(state.listing.find_expenses_by_time(since).await?)
}

/// GET /api/expenses/{id} - Get a single expense.
pub async fn get_expense(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Expense> {
    let id = path_id(path)?;
    success(state.listing.find_expense_by_id(ExpenseId(id)).await?)
}

/// POST /api/expenses - Create a new expense.
pub async fn create_expense(
    State(state): State<AppState>,
    payload: Result<Json<ExpenseRequest>, JsonRejection>,
) -> ApiResult<Created<ExpenseId>> {
    let request = body(payload)?;
    let id = state.editing.add_expense(&request).await?;
    created(Created { id })
}

/// PUT /api/expenses/{id} - Replace an expense.
pub async fn update_expense(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ExpenseRequest>, JsonRejection>,
) -> ApiResult<Expense> {
    let id = path_id(path)?;
    let request = body(payload)?;
    let id = ExpenseId(id);
    state.editing.edit_expense(id, &request).await?;
    success(state.listing.find_expense_by_id(id).await?)
}

/// DELETE /api/expenses/{id} - Delete an expense.
pub async fn delete_expense(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = path_id(path)?;
    state.editing.delete_expense(ExpenseId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
