//! Session and cooldown state.
//!
//! Single source of truth for "am I logged in" and "can I act now".
//!
//! # Cooldown
//!
//! The cooldown is stored as one absolute deadline in epoch milliseconds.
//! Zero, or any instant in the past, means the player may act. Everything a
//! view shows is derived from that deadline and the clock:
//!
//! ```text
//! remaining = max(0, ceil((deadline - now) / 1000))
//! allowed   = now >= deadline          (equivalently: remaining == 0)
//! ```
//!
//! # Persistence
//!
//! Identity and deadline are written to the [`SessionStore`] after every
//! mutation and read back by [`SessionState::restore`]. A failing store is
//! logged and otherwise ignored; the in-memory session stays authoritative.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::{ApiError, AuthResponse, GameApi, LoginRequest, RegisterRequest};
use crate::clock::Clock;
use crate::config::CooldownFallback;
use crate::store::{PersistedSession, SessionStore};

/// The logged-in player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Option<String>,
    pub username: String,
    pub email: String,
    /// When the player last acted (or signed in, if never)
    pub last_action_at: DateTime<Utc>,
    pub auth_token: String,
}

impl Identity {
    /// Build from an auth reply. A reply without a user record falls back to
    /// what was sent.
    fn from_auth(response: AuthResponse, username: &str, email: &str, now: DateTime<Utc>) -> Self {
        match response.user {
            Some(user) => Self {
                id: user.id,
                username: user.username,
                email: user.email,
                last_action_at: user.last_action_at.unwrap_or(now),
                auth_token: response.token,
            },
            None => Self {
                id: None,
                username: username.to_string(),
                email: email.to_string(),
                last_action_at: now,
                auth_token: response.token,
            },
        }
    }
}

/// Where an applied cooldown came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownUpdate {
    /// Reported by the server
    Server(u32),
    /// The configured default, applied because the server could not be asked
    Fallback(u32),
}

impl CooldownUpdate {
    pub fn seconds(&self) -> u32 {
        match self {
            Self::Server(s) | Self::Fallback(s) => *s,
        }
    }
}

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a username or email is required")]
    MissingIdentifier,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not logged in")]
    NotLoggedIn,

    /// The server no longer accepts the stored token.
    #[error("session expired")]
    Expired,

    #[error(transparent)]
    Api(ApiError),
}

impl SessionError {
    /// Text suitable for showing to the player.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingIdentifier => "Enter a username or email",
            Self::InvalidCredentials => "Invalid username or password",
            Self::NotLoggedIn => "Please log in first",
            Self::Expired => "Your session has expired, please log in again",
            Self::Api(_) => "Something went wrong, please try again",
        }
    }
}

impl SessionError {
    /// A rejected login or registration.
    fn from_sign_in(e: ApiError) -> Self {
        if e.is_unauthorized() {
            Self::InvalidCredentials
        } else {
            Self::Api(e)
        }
    }

    /// A rejected call made with the stored token.
    fn from_token(e: ApiError) -> Self {
        if e.is_unauthorized() {
            Self::Expired
        } else {
            Self::Api(e)
        }
    }
}

/// Session state container.
pub struct SessionState {
    api: Arc<dyn GameApi>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn SessionStore>,
    fallback: CooldownFallback,

    identity: Option<Identity>,

    /// Epoch milliseconds; 0 or past means allowed now
    next_allowed_action_at: i64,

    cooldown_tx: watch::Sender<i64>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("username", &self.identity.as_ref().map(|i| &i.username))
            .field("next_allowed_action_at", &self.next_allowed_action_at)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl SessionState {
    /// Create an empty (logged out) session.
    pub fn new(
        api: Arc<dyn GameApi>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn SessionStore>,
        fallback: CooldownFallback,
    ) -> Self {
        let (cooldown_tx, _) = watch::channel(0);
        Self {
            api,
            clock,
            store,
            fallback,
            identity: None,
            next_allowed_action_at: 0,
            cooldown_tx,
        }
    }

    /// Create a session from whatever the store last saved.
    ///
    /// An unreadable record is logged and treated as no record.
    pub fn restore(
        api: Arc<dyn GameApi>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn SessionStore>,
        fallback: CooldownFallback,
    ) -> Self {
        let loaded = store.load();
        let mut session = Self::new(api, clock, store, fallback);
        match loaded {
            Ok(Some(saved)) => {
                session.identity = saved.identity;
                session.next_allowed_action_at = saved.next_allowed_action_at;
                session.cooldown_tx.send_replace(saved.next_allowed_action_at);
                info!(
                    logged_in = session.identity.is_some(),
                    next_allowed_action_at = saved.next_allowed_action_at,
                    "session restored"
                );
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "ignoring unreadable stored session"),
        }
        session
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.auth_token.as_str())
    }

    /// Deadline in epoch milliseconds.
    pub fn next_allowed_action_at(&self) -> i64 {
        self.next_allowed_action_at
    }

    pub fn fallback(&self) -> CooldownFallback {
        self.fallback
    }

    /// Receiver that sees every deadline change.
    pub fn watch_cooldown(&self) -> watch::Receiver<i64> {
        self.cooldown_tx.subscribe()
    }

    /// Sign in. State is untouched on failure; nothing is retried.
    ///
    /// Signing in as a different player clears the previous player's
    /// cooldown. Signing in again as the same player keeps it.
    pub async fn login(&mut self, credentials: LoginRequest) -> Result<&Identity, SessionError> {
        if !credentials.has_identifier() {
            return Err(SessionError::MissingIdentifier);
        }

        let response = self.api.login(&credentials).await.map_err(|e| {
            warn!(error = %e, "login failed");
            SessionError::from_sign_in(e)
        })?;

        let identity = Identity::from_auth(
            response,
            credentials.username.as_deref().unwrap_or_default(),
            credentials.email.as_deref().unwrap_or_default(),
            self.clock.now(),
        );
        info!(username = %identity.username, "logged in");
        Ok(self.set_identity(identity))
    }

    /// Create an account and sign in with it.
    pub async fn register(&mut self, account: RegisterRequest) -> Result<&Identity, SessionError> {
        let response = self.api.register(&account).await.map_err(|e| {
            warn!(error = %e, "registration failed");
            SessionError::from_sign_in(e)
        })?;

        let identity =
            Identity::from_auth(response, &account.username, &account.email, self.clock.now());
        info!(username = %identity.username, "registered");
        Ok(self.set_identity(identity))
    }

    /// Forget the identity and any cooldown. Local only; cannot fail.
    pub fn logout(&mut self) {
        if let Some(identity) = self.identity.take() {
            info!(username = %identity.username, "logged out");
        }
        self.set_deadline(0);
        self.persist();
    }

    pub fn is_allowed_to_act(&self) -> bool {
        self.clock.now_millis() >= self.next_allowed_action_at
    }

    pub fn remaining_cooldown_seconds(&self) -> u64 {
        remaining_seconds(self.next_allowed_action_at, self.clock.now_millis())
    }

    /// Start a cooldown of `seconds` from now and stamp the player's last
    /// action time.
    pub fn update_cooldown(&mut self, seconds: u32) {
        let now = self.clock.now();
        if let Some(identity) = self.identity.as_mut() {
            identity.last_action_at = now;
        }
        self.set_deadline(now.timestamp_millis() + i64::from(seconds) * 1000);
        self.persist();
    }

    /// Ask the server how long the player must still wait and apply it.
    ///
    /// If the server cannot be asked, the configured [`CooldownFallback`]
    /// decides between applying a fixed cooldown and returning the error.
    pub async fn fetch_cooldown_from_server(&mut self) -> Result<CooldownUpdate, SessionError> {
        let token = self
            .auth_token()
            .ok_or(SessionError::NotLoggedIn)?
            .to_string();

        match self.api.cooldown(&token).await {
            Ok(left) => {
                let seconds = u32::try_from(left.max(0)).unwrap_or(u32::MAX);
                self.update_cooldown(seconds);
                Ok(CooldownUpdate::Server(seconds))
            }
            Err(e) => match self.fallback {
                CooldownFallback::UseDefault { seconds } => {
                    warn!(error = %e, seconds, "cooldown fetch failed, applying default");
                    self.update_cooldown(seconds);
                    Ok(CooldownUpdate::Fallback(seconds))
                }
                CooldownFallback::Propagate => {
                    warn!(error = %e, "cooldown fetch failed");
                    Err(SessionError::from_token(e))
                }
            },
        }
    }

    /// The record that gets persisted.
    pub fn snapshot(&self) -> PersistedSession {
        PersistedSession::new(self.identity.clone(), self.next_allowed_action_at)
    }

    fn set_identity(&mut self, identity: Identity) -> &Identity {
        let switched = self
            .identity
            .as_ref()
            .is_some_and(|previous| previous.username != identity.username);
        if switched {
            info!(username = %identity.username, "switched player, clearing cooldown");
            self.set_deadline(0);
        }
        self.persist_with(Some(&identity));
        self.identity.insert(identity)
    }

    fn set_deadline(&mut self, deadline: i64) {
        self.next_allowed_action_at = deadline;
        self.cooldown_tx.send_replace(deadline);
    }

    fn persist(&self) {
        self.persist_with(self.identity.as_ref());
    }

    fn persist_with(&self, identity: Option<&Identity>) {
        let record = PersistedSession::new(identity.cloned(), self.next_allowed_action_at);
        if let Err(e) = self.store.save(&record) {
            warn!(error = %e, "failed to persist session");
        }
    }
}

/// Whole seconds until `deadline`, rounded up, never negative.
pub fn remaining_seconds(deadline_millis: i64, now_millis: i64) -> u64 {
    let left = deadline_millis.saturating_sub(now_millis);
    if left <= 0 {
        0
    } else {
        // ceil for positive values
        (left as u64).div_ceil(1000)
    }
}
