//! REST API module.
//!
//! Handlers translate HTTP requests into service calls; [`AppError`] decides
//! the status code of every failure.

mod activities;
mod auth;
mod expenses;
mod tags;

pub use activities::*;
pub use auth::*;
pub use expenses::*;
pub use tags::*;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Lookback used by time listings when no `from` is given.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    pub status: StatusCode,
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Self {
            status,
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// 200 with a body.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(StatusCode::OK, data))
}

/// 201 with a body.
pub fn created<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(StatusCode::CREATED, data))
}

/// Unwrap a JSON body, reporting malformed input as 400.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Unwrap a numeric `{id}` path segment, reporting anything else as 400.
pub(crate) fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id).map_err(|e| AppError::BadRequest(e.body_text()))
}

/// `?from=<rfc3339>` for time listings.
#[derive(Debug, Deserialize)]
pub struct TimeQuery {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
}

impl TimeQuery {
    pub(crate) fn resolve(
        query: Result<Query<TimeQuery>, QueryRejection>,
    ) -> Result<DateTime<Utc>, AppError> {
        let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(query
            .from
            .unwrap_or_else(|| Utc::now() - Duration::days(DEFAULT_LOOKBACK_DAYS)))
    }
}
