//! Nuclick State Library
//!
//! Client-side state for the Nuclick territory game: who is logged in, when
//! they may act next, and what the provinces look like.
//!
//! # Overview
//!
//! - **Session** - Login, registration and logout against the game API, plus
//!   the per-player action cooldown stored as one absolute deadline. The
//!   identity and deadline survive restarts through a [`store::SessionStore`].
//!
//! - **Provinces** - Cached full list and server-ranked top list, with thin
//!   attack/support wrappers that never change counts locally.
//!
//! - **Countdown** - Read-only panel showing the cooldown and progress toward
//!   the daily reset (14:00 UTC by default), driven by owned timers that stop
//!   when the panel is dropped.
//!
//! # Design Principles
//!
//! 1. **No globals** - State lives in containers the application builds once
//!    and hands to views by reference.
//!
//! 2. **Seams for the outside world** - The server ([`api::GameApi`]), local
//!    storage ([`store::SessionStore`]) and time ([`clock::Clock`]) are traits,
//!    so every rule can be checked against a scripted server and a fixed clock.
//!
//! 3. **Failures stay at the boundary** - Remote errors are returned or stored
//!    as a message; they never corrupt state or panic.
//!
//! 4. **One wire schema** - camelCase JSON for every request and response.
//!
//! # Example
//!
//! ```rust,ignore
//! use nuclick_state::{
//!     api::{ActionKind, LoginRequest, ProvinceFilter},
//!     config::ClientConfig,
//!     state::{AppState, DEFAULT_TOP_COUNT},
//! };
//!
//! let config = ClientConfig::from_env()?;
//! let mut app = AppState::from_config(&config)?;
//!
//! app.sign_in(LoginRequest::with_username("alice", "hunter2")).await?;
//! app.provinces.fetch_all(ProvinceFilter::All).await?;
//! app.provinces.fetch_top(DEFAULT_TOP_COUNT).await?;
//!
//! let panel = app.mount_countdown();
//! if app.session.is_allowed_to_act() {
//!     app.act(ActionKind::Attack, &app.provinces.provinces[0].id.clone()).await?;
//! }
//! println!("next action in {}s", panel.snapshot().cooldown_seconds);
//! ```

pub mod api;
pub mod clock;
pub mod config;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export everything from state module at crate root
pub use state::*;
