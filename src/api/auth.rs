//! Login and token refresh endpoints.

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::{body, success, ApiResult};
use crate::auth::{LoginRequest, RefreshRequest, TokenPair};
use crate::AppState;

/// POST /auth/login - Exchange the password for a token pair.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<TokenPair> {
    let request = body(payload)?;
    success(state.auth.login(&request.password)?)
}

/// POST /auth/refresh - Exchange a refresh token for a new pair.
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<TokenPair> {
    let request = body(payload)?;
    success(state.auth.refresh(&request.refresh_token)?)
}
