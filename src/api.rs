//! Remote game API.
//!
//! Wire types for every endpoint the client consumes, the [`GameApi`] seam the
//! state containers talk through, and [`HttpApi`], its reqwest implementation.
//!
//! The wire schema is camelCase JSON everywhere:
//!
//! | Call                   | Request                         | Response                    |
//! |------------------------|---------------------------------|-----------------------------|
//! | `POST /auth/login`     | `{username, email, password}`   | `{token, user?}`            |
//! | `POST /auth/register`  | `{username, email, password}`   | `{token, user?}`            |
//! | `POST /user/cooldown`  | `{token}`                       | `{cooldownLeftInSeconds}`   |
//! | `GET /provinces`       | `?type=all\|alive\|destroyed`   | `{provinceList}`            |
//! | `GET /provinces/top`   | `?limit=n`                      | `{provinces}`               |
//! | `POST /provinces/attack`  | `{provinceId}`               | `{isSuccess}`               |
//! | `POST /provinces/support` | `{provinceId}`               | `{isSuccess}`               |
//! | `GET /provinces/round` |                                 | `{round, success}`          |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;
use crate::state::province::Province;

/// `POST /auth/login` body. Either identifier may be null, not both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

impl LoginRequest {
    pub fn with_username(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            email: None,
            password: password.into(),
        }
    }

    pub fn with_email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: None,
            email: Some(email.into()),
            password: password.into(),
        }
    }

    /// True when at least one non-blank identifier is present.
    pub fn has_identifier(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.username) || present(&self.email)
    }
}

/// `POST /auth/register` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// User record as the server reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub last_action_at: Option<DateTime<Utc>>,
}

/// Reply to login and register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<UserPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CooldownRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownResponse {
    /// May be negative if the server's clock ran past the deadline.
    pub cooldown_left_in_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvinceListResponse {
    province_list: Vec<Province>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopProvincesResponse {
    #[serde(default)]
    provinces: Vec<Province>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvinceActionRequest<'a> {
    province_id: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvinceActionResponse {
    is_success: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RoundResponse {
    round: u32,
    #[serde(default)]
    success: bool,
}

/// Which provinces `GET /provinces` should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvinceFilter {
    #[default]
    All,
    /// Not yet destroyed
    Alive,
    Destroyed,
}

impl ProvinceFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Alive => "alive",
            Self::Destroyed => "destroyed",
        }
    }
}

/// The two things a player can do to a province.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Attack,
    Support,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Support => "support",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            Self::Attack => "/provinces/attack",
            Self::Support => "/provinces/support",
        }
    }
}

/// Remote API failures.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the credentials or token (401/403).
    #[error("invalid credentials")]
    Unauthorized,

    #[error("server returned HTTP {status}")]
    Status { status: u16 },

    #[error("network error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(Box::new(e))
        }
    }
}

/// Everything the state containers need from the server.
#[async_trait]
pub trait GameApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError>;

    /// Seconds left before the token's owner may act again.
    async fn cooldown(&self, token: &str) -> Result<i64, ApiError>;

    async fn provinces(&self, filter: ProvinceFilter) -> Result<Vec<Province>, ApiError>;

    /// Server-ranked provinces by damage, at most `limit`.
    async fn top_provinces(&self, limit: usize) -> Result<Vec<Province>, ApiError>;

    /// Attack or support a province. Returns the server's success flag.
    async fn act(
        &self,
        kind: ActionKind,
        province_id: &str,
        token: Option<&str>,
    ) -> Result<bool, ApiError>;

    async fn current_round(&self) -> Result<u32, ApiError>;
}

/// reqwest-backed [`GameApi`].
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_client(client, &config.api_base_url))
    }

    /// Use an existing client (shared connection pool).
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<R: DeserializeOwned>(request: RequestBuilder) -> Result<R, ApiError> {
        let response = request.send().await?;
        decode(response).await
    }

    async fn post<B, R>(&self, path: &str, body: &B, token: Option<&str>) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        debug!(path, "POST");
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Self::send(request).await
    }

    async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<R, ApiError> {
        debug!(path, "GET");
        Self::send(self.client.get(self.url(path)).query(query)).await
    }
}

async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, ApiError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
        });
    }
    response
        .json::<R>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl GameApi for HttpApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post("/auth/login", request, None).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.post("/auth/register", request, None).await
    }

    async fn cooldown(&self, token: &str) -> Result<i64, ApiError> {
        let response: CooldownResponse = self
            .post("/user/cooldown", &CooldownRequest { token }, Some(token))
            .await?;
        Ok(response.cooldown_left_in_seconds)
    }

    async fn provinces(&self, filter: ProvinceFilter) -> Result<Vec<Province>, ApiError> {
        let response: ProvinceListResponse = self
            .get("/provinces", &[("type", filter.as_str().to_string())])
            .await?;
        Ok(response.province_list)
    }

    async fn top_provinces(&self, limit: usize) -> Result<Vec<Province>, ApiError> {
        let response: TopProvincesResponse = self
            .get("/provinces/top", &[("limit", limit.to_string())])
            .await?;
        Ok(response.provinces)
    }

    async fn act(
        &self,
        kind: ActionKind,
        province_id: &str,
        token: Option<&str>,
    ) -> Result<bool, ApiError> {
        let response: ProvinceActionResponse = self
            .post(kind.path(), &ProvinceActionRequest { province_id }, token)
            .await?;
        Ok(response.is_success)
    }

    async fn current_round(&self) -> Result<u32, ApiError> {
        let response: RoundResponse = self.get("/provinces/round", &[]).await?;
        if !response.success {
            debug!(round = response.round, "round reported without success flag");
        }
        Ok(response.round)
    }
}
