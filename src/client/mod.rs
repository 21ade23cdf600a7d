//! HTTP client for the lifelog REST API.
//!
//! Wraps the response envelopes and bearer authentication. When the server
//! rejects the access token the client refreshes the pair once and retries;
//! callers persist the new pair via [`ApiClient::tokens`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::TokenPair;
use crate::errors::ErrorResponse;
use crate::models::{
    Activity, ActivityId, ActivityRequest, Created, Expense, ExpenseId, ExpenseRequest, Tag,
    TagId, TagRequest,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} ({code}, HTTP {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("not logged in; run `lifelog login` first")]
    NotLoggedIn,
}

impl ClientError {
    /// HTTP status of a server-side failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct FromQuery {
    from: DateTime<Utc>,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: Option<TokenPair>,
    tokens_changed: bool,
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: Option<TokenPair>) -> ClientResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            tokens_changed: false,
        })
    }

    /// Current token pair, if logged in.
    pub fn tokens(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }

    /// Whether login or a silent refresh replaced the pair.
    pub fn tokens_changed(&self) -> bool {
        self.tokens_changed
    }

    // ==================== AUTH ====================

    pub async fn login(&mut self, password: &str) -> ClientResult<TokenPair> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginBody { password })
            .send()
            .await?;
        let pair: TokenPair = decode(resp).await?;
        self.store_tokens(pair.clone());
        Ok(pair)
    }

    pub async fn refresh(&mut self) -> ClientResult<TokenPair> {
        let refresh_token = match &self.tokens {
            Some(pair) => pair.refresh_token.clone(),
            None => return Err(ClientError::NotLoggedIn),
        };
        let resp = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&RefreshBody {
                refresh_token: &refresh_token,
            })
            .send()
            .await?;
        let pair: TokenPair = decode(resp).await?;
        self.store_tokens(pair.clone());
        Ok(pair)
    }

    // ==================== TAGS ====================

    pub async fn list_tags(&mut self) -> ClientResult<Vec<Tag>> {
        self.get("/api/tags", None).await
    }

    pub async fn get_tag(&mut self, id: TagId) -> ClientResult<Tag> {
        self.get(&format!("/api/tags/{id}"), None).await
    }

    pub async fn add_tag(&mut self, request: &TagRequest) -> ClientResult<TagId> {
        let created: Created<TagId> = self.send(Method::POST, "/api/tags", request).await?;
        Ok(created.id)
    }

    pub async fn edit_tag(&mut self, id: TagId, request: &TagRequest) -> ClientResult<Tag> {
        self.send(Method::PUT, &format!("/api/tags/{id}"), request)
            .await
    }

    pub async fn delete_tag(&mut self, id: TagId) -> ClientResult<()> {
        self.delete(&format!("/api/tags/{id}")).await
    }

    pub async fn tag_expenses(&mut self, id: TagId) -> ClientResult<Vec<Expense>> {
        self.get(&format!("/api/tags/{id}/expenses"), None).await
    }

    pub async fn tag_activities(&mut self, id: TagId) -> ClientResult<Vec<Activity>> {
        self.get(&format!("/api/tags/{id}/activities"), None).await
    }

    // ==================== EXPENSES ====================

    /// Expenses since `from`, or the server's default window.
    pub async fn list_expenses(
        &mut self,
        from: Option<DateTime<Utc>>,
    ) -> ClientResult<Vec<Expense>> {
        self.get("/api/expenses", from).await
    }

    pub async fn get_expense(&mut self, id: ExpenseId) -> ClientResult<Expense> {
        self.get(&format!("/api/expenses/{id}"), None).await
    }

    pub async fn add_expense(&mut self, request: &ExpenseRequest) -> ClientResult<ExpenseId> {
        let created: Created<ExpenseId> =
            self.send(Method::POST, "/api/expenses", request).await?;
        Ok(created.id)
    }

    pub async fn edit_expense(
        &mut self,
        id: ExpenseId,
        request: &ExpenseRequest,
    ) -> ClientResult<Expense> {
        self.send(Method::PUT, &format!("/api/expenses/{id}"), request)
            .await
    }

    pub async fn delete_expense(&mut self, id: ExpenseId) -> ClientResult<()> {
        self.delete(&format!("/api/expenses/{id}")).await
    }

    // ==================== ACTIVITIES ====================

    pub async fn list_activities(
        &mut self,
        from: Option<DateTime<Utc>>,
    ) -> ClientResult<Vec<Activity>> {
        self.get("/api/activities", from).await
    }

    pub async fn get_activity(&mut self, id: ActivityId) -> ClientResult<Activity> {
        self.get(&format!("/api/activities/{id}"), None).await
    }

    pub async fn activity_expenses(&mut self, id: ActivityId) -> ClientResult<Vec<Expense>> {
        self.get(&format!("/api/activities/{id}/expenses"), None)
            .await
    }

    pub async fn add_activity(&mut self, request: &ActivityRequest) -> ClientResult<ActivityId> {
        let created: Created<ActivityId> =
            self.send(Method::POST, "/api/activities", request).await?;
        Ok(created.id)
    }

    pub async fn edit_activity(
        &mut self,
        id: ActivityId,
        request: &ActivityRequest,
    ) -> ClientResult<Activity> {
        self.send(Method::PUT, &format!("/api/activities/{id}"), request)
            .await
    }

    pub async fn delete_activity(&mut self, id: ActivityId) -> ClientResult<()> {
        self.delete(&format!("/api/activities/{id}")).await
    }

    // ==================== PLUMBING ====================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn store_tokens(&mut self, pair: TokenPair) {
        self.tokens = Some(pair);
        self.tokens_changed = true;
    }

    async fn get<T: DeserializeOwned>(
        &mut self,
        path: &str,
        from: Option<DateTime<Utc>>,
    ) -> ClientResult<T> {
        let url = self.url(path);
        let resp = self
            .authorized(|http| {
                let request = http.get(&url);
                match from {
                    Some(from) => request.query(&FromQuery { from }),
                    None => request,
                }
            })
            .await?;
        decode(resp).await
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &mut self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let url = self.url(path);
        let resp = self
            .authorized(|http| http.request(method.clone(), &url).json(body))
            .await?;
        decode(resp).await
    }

    async fn delete(&mut self, path: &str) -> ClientResult<()> {
        let url = self.url(path);
        let resp = self.authorized(|http| http.delete(&url)).await?;
        if resp.status().is_success() {
            return Ok(());
        }
        Err(api_error(resp).await)
    }

    /// Send with the access token; on 401 refresh once and resend.
    async fn authorized(
        &mut self,
        build: impl Fn(&Client) -> RequestBuilder,
    ) -> ClientResult<Response> {
        let access = self.access_token()?;
        let resp = build(&self.http).bearer_auth(access).send().await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        debug!("Access token rejected, refreshing");
        if let Err(e) = self.refresh().await {
            debug!("Refresh failed: {e}");
            return Ok(resp);
        }
        let access = self.access_token()?;
        Ok(build(&self.http).bearer_auth(access).send().await?)
    }

    fn access_token(&self) -> ClientResult<String> {
        self.tokens
            .as_ref()
            .map(|pair| pair.access_token.clone())
            .ok_or(ClientError::NotLoggedIn)
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
    if !resp.status().is_success() {
        return Err(api_error(resp).await);
    }
    let envelope: Envelope<T> = resp.json().await?;
    Ok(envelope.data)
}

async fn api_error(resp: Response) -> ClientError {
    let status = resp.status();
    match resp.json::<ErrorResponse>().await {
        Ok(body) => ClientError::Api {
            status: status.as_u16(),
            code: body.error.code,
            message: body.error.message,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: "HTTP_ERROR".to_string(),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string(),
        },
    }
}
