//! Province cache.
//!
//! Holds the last full province list and the server-ranked top list, plus thin
//! wrappers for attack/support. Counts are never changed locally; callers
//! re-fetch after an action to observe its effect.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{ActionKind, ApiError, GameApi, ProvinceFilter};

/// Destruction round of a province that is still standing.
pub const NOT_DESTROYED: i32 = -1;

/// Size of the top ranking shown next to the map.
pub const DEFAULT_TOP_COUNT: usize = 5;

/// Message stored when the full list could not be loaded.
pub const LOAD_PROVINCES_FAILED: &str = "Failed to load provinces";

/// Message stored when the top list could not be loaded.
pub const LOAD_TOP_FAILED: &str = "Failed to load top provinces";

fn not_destroyed() -> i32 {
    NOT_DESTROYED
}

/// A province as the server reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Province {
    pub id: String,
    pub name: String,
    pub color_hex: String,
    pub attack_count: i64,
    pub support_count: i64,
    /// Round in which it was destroyed, or [`NOT_DESTROYED`]
    #[serde(default = "not_destroyed")]
    pub destruction_round: i32,
}

impl Province {
    /// Attack count minus support count.
    pub fn damage(&self) -> i64 {
        self.attack_count - self.support_count
    }

    pub fn is_destroyed(&self) -> bool {
        self.destruction_round >= 0
    }
}

/// Cached province data.
pub struct ProvinceState {
    api: Arc<dyn GameApi>,

    /// Every province from the last successful full fetch
    pub provinces: Vec<Province>,

    /// Top provinces by damage, in server order
    pub top_provinces: Vec<Province>,

    /// A fetch is in flight
    pub is_loading: bool,

    /// Message from the last failed fetch, cleared when a new one starts
    pub error: Option<String>,

    /// Last round number reported by the server
    pub current_round: Option<u32>,
}

impl std::fmt::Debug for ProvinceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvinceState")
            .field("provinces", &self.provinces.len())
            .field("top_provinces", &self.top_provinces.len())
            .field("is_loading", &self.is_loading)
            .field("error", &self.error)
            .field("current_round", &self.current_round)
            .finish()
    }
}

impl ProvinceState {
    pub fn new(api: Arc<dyn GameApi>) -> Self {
        Self {
            api,
            provinces: Vec::new(),
            top_provinces: Vec::new(),
            is_loading: false,
            error: None,
            current_round: None,
        }
    }

    /// Replace the full list.
    ///
    /// On failure the previous list stays and `error` is set.
    pub async fn fetch_all(&mut self, filter: ProvinceFilter) -> Result<(), ApiError> {
        self.begin_fetch();
        let result = self.api.provinces(filter).await;
        self.is_loading = false;

        match result {
            Ok(provinces) => {
                debug!(count = provinces.len(), filter = filter.as_str(), "provinces loaded");
                self.provinces = provinces;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch provinces");
                self.error = Some(LOAD_PROVINCES_FAILED.to_string());
                Err(e)
            }
        }
    }

    /// Replace the top-`n` list. Order is the server's; only the length is
    /// enforced here.
    pub async fn fetch_top(&mut self, n: usize) -> Result<(), ApiError> {
        self.begin_fetch();
        let result = self.api.top_provinces(n).await;
        self.is_loading = false;

        match result {
            Ok(mut provinces) => {
                provinces.truncate(n);
                self.top_provinces = provinces;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch top provinces");
                self.error = Some(LOAD_TOP_FAILED.to_string());
                Err(e)
            }
        }
    }

    pub async fn attack(&self, province_id: &str, token: Option<&str>) -> Result<bool, ApiError> {
        self.act(ActionKind::Attack, province_id, token).await
    }

    pub async fn support(&self, province_id: &str, token: Option<&str>) -> Result<bool, ApiError> {
        self.act(ActionKind::Support, province_id, token).await
    }

    /// One round trip; the cached lists are left as they are.
    pub async fn act(
        &self,
        kind: ActionKind,
        province_id: &str,
        token: Option<&str>,
    ) -> Result<bool, ApiError> {
        let result = self.api.act(kind, province_id, token).await;
        if let Err(e) = &result {
            warn!(error = %e, action = kind.as_str(), province_id, "province action failed");
        }
        result
    }

    pub async fn fetch_current_round(&mut self) -> Result<u32, ApiError> {
        match self.api.current_round().await {
            Ok(round) => {
                self.current_round = Some(round);
                Ok(round)
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch current round");
                Err(e)
            }
        }
    }

    /// Look up a cached province.
    pub fn get(&self, province_id: &str) -> Option<&Province> {
        self.provinces.iter().find(|p| p.id == province_id)
    }

    /// Provinces still standing.
    pub fn alive(&self) -> impl Iterator<Item = &Province> {
        self.provinces.iter().filter(|p| !p.is_destroyed())
    }

    /// The last province standing, once all others are destroyed.
    pub fn winner(&self) -> Option<&Province> {
        if self.provinces.len() < 2 {
            return None;
        }
        let mut alive = self.alive();
        match (alive.next(), alive.next()) {
            (Some(last), None) => Some(last),
            _ => None,
        }
    }

    fn begin_fetch(&mut self) {
        self.is_loading = true;
        self.error = None;
    }
}
