//! Scripted [`GameApi`] for unit tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::api::{
    ActionKind, ApiError, AuthResponse, GameApi, LoginRequest, ProvinceFilter, RegisterRequest,
    UserPayload,
};
use crate::state::province::{Province, NOT_DESTROYED};

pub(crate) fn province(id: &str, attack_count: i64, support_count: i64) -> Province {
    Province {
        id: id.to_string(),
        name: format!("Province {}", id),
        color_hex: "#FF0000".to_string(),
        attack_count,
        support_count,
        destruction_round: NOT_DESTROYED,
    }
}

#[derive(Debug, Default)]
struct Script {
    provinces: Vec<Province>,
    top: Vec<Province>,
    round: u32,
    cooldown_secs: i64,
    reject_credentials: bool,
    omit_user: bool,
    fail_next: bool,
    fail_cooldown: bool,
    expired_tokens: bool,
    actions: Vec<(ActionKind, String, Option<String>)>,
    last_top_limit: Option<usize>,
    cooldown_tokens: Vec<String>,
    login_calls: usize,
}

#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    script: Mutex<Script>,
}

impl FakeApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub(crate) fn set_provinces(&self, provinces: Vec<Province>) {
        self.lock().provinces = provinces;
    }

    pub(crate) fn set_top(&self, top: Vec<Province>) {
        self.lock().top = top;
    }

    pub(crate) fn set_round(&self, round: u32) {
        self.lock().round = round;
    }

    pub(crate) fn set_cooldown(&self, seconds: i64) {
        self.lock().cooldown_secs = seconds;
    }

    pub(crate) fn reject_credentials(&self) {
        self.lock().reject_credentials = true;
    }

    /// Answer auth calls with a bare token and no user record.
    pub(crate) fn omit_user(&self) {
        self.lock().omit_user = true;
    }

    /// The next call of any kind fails as if the network were down.
    pub(crate) fn fail_next_with_transport(&self) {
        self.lock().fail_next = true;
    }

    /// Every cooldown call fails from now on.
    pub(crate) fn fail_cooldown(&self) {
        self.lock().fail_cooldown = true;
    }

    /// Every call made with a token is rejected as unauthorized from now on.
    pub(crate) fn expire_tokens(&self) {
        self.lock().expired_tokens = true;
    }

    pub(crate) fn actions(&self) -> Vec<(ActionKind, String, Option<String>)> {
        self.lock().actions.clone()
    }

    pub(crate) fn last_top_limit(&self) -> Option<usize> {
        self.lock().last_top_limit
    }

    pub(crate) fn cooldown_tokens(&self) -> Vec<String> {
        self.lock().cooldown_tokens.clone()
    }

    pub(crate) fn login_calls(&self) -> usize {
        self.lock().login_calls
    }

    fn check_transport(script: &mut Script) -> Result<(), ApiError> {
        if std::mem::take(&mut script.fail_next) {
            return Err(ApiError::Transport("connection refused".into()));
        }
        Ok(())
    }

    fn auth(script: &Script, username: &str, email: &str) -> Result<AuthResponse, ApiError> {
        if script.reject_credentials {
            return Err(ApiError::Unauthorized);
        }
        let user = (!script.omit_user).then(|| UserPayload {
            id: Some(format!("id-{}", username)),
            username: username.to_string(),
            email: email.to_string(),
            last_action_at: None,
        });
        Ok(AuthResponse {
            token: format!("token-{}", username),
            user,
        })
    }
}

#[async_trait]
impl GameApi for FakeApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let mut script = self.lock();
        script.login_calls += 1;
        Self::check_transport(&mut script)?;
        let username = request.username.clone().unwrap_or_default();
        let email = request.email.clone().unwrap_or_default();
        Self::auth(&script, &username, &email)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let mut script = self.lock();
        Self::check_transport(&mut script)?;
        Self::auth(&script, &request.username, &request.email)
    }

    async fn cooldown(&self, token: &str) -> Result<i64, ApiError> {
        let mut script = self.lock();
        Self::check_transport(&mut script)?;
        if script.expired_tokens {
            return Err(ApiError::Unauthorized);
        }
        if script.fail_cooldown {
            return Err(ApiError::Status { status: 503 });
        }
        script.cooldown_tokens.push(token.to_string());
        Ok(script.cooldown_secs)
    }

    async fn provinces(&self, _filter: ProvinceFilter) -> Result<Vec<Province>, ApiError> {
        let mut script = self.lock();
        Self::check_transport(&mut script)?;
        Ok(script.provinces.clone())
    }

    async fn top_provinces(&self, limit: usize) -> Result<Vec<Province>, ApiError> {
        let mut script = self.lock();
        Self::check_transport(&mut script)?;
        script.last_top_limit = Some(limit);
        Ok(script.top.clone())
    }

    async fn act(
        &self,
        kind: ActionKind,
        province_id: &str,
        token: Option<&str>,
    ) -> Result<bool, ApiError> {
        let mut script = self.lock();
        Self::check_transport(&mut script)?;
        script
            .actions
            .push((kind, province_id.to_string(), token.map(str::to_string)));
        let Some(target) = script.provinces.iter_mut().find(|p| p.id == province_id) else {
            return Ok(false);
        };
        match kind {
            ActionKind::Attack => target.attack_count += 1,
            ActionKind::Support => target.support_count += 1,
        }
        Ok(true)
    }

    async fn current_round(&self) -> Result<u32, ApiError> {
        let mut script = self.lock();
        Self::check_transport(&mut script)?;
        Ok(script.round)
    }
}
