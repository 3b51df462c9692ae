//! State containers for the game client.
//!
//! - `session` - identity and action cooldown, persisted across restarts
//! - `province` - cached province lists and attack/support wrappers
//! - `schedule` - daily reset arithmetic
//! - `ticker` - owned repeating timer
//! - `panel` - countdown display driven by two tickers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            AppState                              │
//! │                                                                  │
//! │  ┌────────────────────┐            ┌────────────────────┐        │
//! │  │    SessionState    │            │   ProvinceState    │        │
//! │  │                    │            │                    │        │
//! │  │ identity           │  token     │ provinces          │        │
//! │  │ next_allowed_at ───┼───────────▶│ top_provinces      │        │
//! │  │                    │            │ is_loading / error │        │
//! │  └───┬──────────┬─────┘            └─────────┬──────────┘        │
//! │      │ save     │ watch                      │                   │
//! │      ▼          ▼                            ▼                   │
//! │  SessionStore  CountdownPanel ◀── Ticker ×2  GameApi ──▶ HTTP    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod panel;
pub mod province;
pub mod schedule;
pub mod session;
pub mod ticker;

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ActionKind, ApiError, GameApi, HttpApi, LoginRequest, RegisterRequest};
use crate::clock::{Clock, SystemClock};
use crate::config::{ClientConfig, ConfigError};
use crate::store::{FileStore, SessionStore};

pub use panel::{CountdownPanel, PanelSnapshot, PanelTicks};
pub use province::{Province, ProvinceState, DEFAULT_TOP_COUNT, NOT_DESTROYED};
pub use schedule::{ResetSchedule, ScheduleError};
pub use session::{CooldownUpdate, Identity, SessionError, SessionState};
pub use ticker::Ticker;

/// Errors from building an [`AppState`].
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("failed to build HTTP client: {0}")]
    Api(#[from] ApiError),
}

/// Why an attack or support was not sent.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error("next action allowed in {remaining_seconds}s")]
    CoolingDown { remaining_seconds: u64 },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result of a province action that reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOutcome {
    /// The server's success flag
    pub success: bool,
    /// Cooldown applied afterwards, if it could be determined
    pub cooldown: Option<CooldownUpdate>,
}

/// Both containers plus what the countdown panel needs.
///
/// Built once at startup and handed to views by reference.
#[derive(Debug)]
pub struct AppState {
    pub session: SessionState,
    pub provinces: ProvinceState,
    clock: Arc<dyn Clock>,
    schedule: ResetSchedule,
    ticks: PanelTicks,
}

impl AppState {
    pub fn new(session: SessionState, provinces: ProvinceState, clock: Arc<dyn Clock>) -> Self {
        Self {
            session,
            provinces,
            clock,
            schedule: ResetSchedule::default(),
            ticks: PanelTicks::default(),
        }
    }

    /// Wire everything from config with the given collaborators, restoring any
    /// saved session.
    pub fn with_parts(
        config: &ClientConfig,
        api: Arc<dyn GameApi>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, StartupError> {
        config.validate()?;
        let session = SessionState::restore(
            api.clone(),
            clock.clone(),
            store,
            config.cooldown_fallback,
        );
        Ok(Self {
            session,
            provinces: ProvinceState::new(api),
            clock,
            schedule: ResetSchedule::new(config.reset_hour_utc)?,
            ticks: PanelTicks::from(config),
        })
    }

    /// Production wiring: HTTP API, session file, system clock.
    pub fn from_config(config: &ClientConfig) -> Result<Self, StartupError> {
        let api = Arc::new(HttpApi::new(config)?);
        let store = Arc::new(FileStore::new(&config.storage_path));
        info!(api = %config.api_base_url, storage = %config.storage_path.display(), "starting client");
        Self::with_parts(config, api, Arc::new(SystemClock), store)
    }

    pub fn schedule(&self) -> ResetSchedule {
        self.schedule
    }

    /// Log in, then sync the cooldown so a returning player sees the
    /// server's deadline straight away.
    pub async fn sign_in(&mut self, credentials: LoginRequest) -> Result<(), SessionError> {
        self.session.login(credentials).await?;
        self.sync_cooldown().await;
        Ok(())
    }

    /// Register, then sync the cooldown.
    pub async fn sign_up(&mut self, account: RegisterRequest) -> Result<(), SessionError> {
        self.session.register(account).await?;
        self.sync_cooldown().await;
        Ok(())
    }

    /// Attack or support a province on behalf of the logged-in player.
    ///
    /// Refused locally while the cooldown runs. After a successful action the
    /// cooldown is refreshed from the server. The province cache is not
    /// touched; re-fetch to see new counts.
    pub async fn act(
        &mut self,
        kind: ActionKind,
        province_id: &str,
    ) -> Result<ActionOutcome, ActionError> {
        let token = self
            .session
            .auth_token()
            .ok_or(ActionError::NotLoggedIn)?
            .to_string();
        if !self.session.is_allowed_to_act() {
            return Err(ActionError::CoolingDown {
                remaining_seconds: self.session.remaining_cooldown_seconds(),
            });
        }

        let success = self.provinces.act(kind, province_id, Some(token.as_str())).await?;
        if !success {
            info!(action = kind.as_str(), province_id, "action rejected by server");
            return Ok(ActionOutcome {
                success,
                cooldown: None,
            });
        }

        Ok(ActionOutcome {
            success,
            cooldown: self.sync_cooldown().await,
        })
    }

    /// Mount the countdown panel for this session.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn mount_countdown(&self) -> CountdownPanel {
        CountdownPanel::mount(
            self.session.watch_cooldown(),
            self.clock.clone(),
            self.schedule,
            self.ticks,
        )
    }

    async fn sync_cooldown(&mut self) -> Option<CooldownUpdate> {
        match self.session.fetch_cooldown_from_server().await {
            Ok(update) => Some(update),
            Err(e) => {
                warn!(error = %e, "cooldown left unsynced");
                None
            }
        }
    }
}
