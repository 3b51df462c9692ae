//! Countdown panel.
//!
//! Read-only display state for the bottom of the game screen: seconds left on
//! the player's cooldown, and progress toward the next daily reset. Mounting a
//! panel starts two [`Ticker`]s; dropping it stops both.
//!
//! The fast ticker refreshes everything shown to the second (the cooldown and
//! the time left until reset). The slow one refreshes the progress bar.
//!
//! The panel reads the cooldown deadline through a watch receiver, so it never
//! borrows the session. If the session goes away first, the panel keeps
//! showing the last deadline it saw.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::clock::Clock;
use crate::config::ClientConfig;
use crate::state::schedule::{format_hms, ResetSchedule};
use crate::state::session::remaining_seconds;
use crate::state::ticker::Ticker;

/// What the panel currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSnapshot {
    /// Seconds until the player may act again
    pub cooldown_seconds: u64,
    /// 0..=100
    pub reset_progress_percent: f64,
    /// e.g. `"3h 12m 5s"`
    pub reset_time_left: String,
}

impl PanelSnapshot {
    pub fn compute(deadline_millis: i64, schedule: &ResetSchedule, clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            cooldown_seconds: remaining_seconds(deadline_millis, now.timestamp_millis()),
            reset_progress_percent: schedule.progress_percent(now),
            reset_time_left: format_hms(schedule.time_until_reset(now)),
        }
    }
}

/// Tick periods for a mounted panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelTicks {
    pub cooldown: Duration,
    /// One minute or finer
    pub progress: Duration,
}

impl Default for PanelTicks {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for PanelTicks {
    fn from(config: &ClientConfig) -> Self {
        Self {
            cooldown: config.cooldown_tick,
            progress: config.progress_tick,
        }
    }
}

/// A mounted countdown panel.
#[derive(Debug)]
pub struct CountdownPanel {
    snapshot: watch::Receiver<PanelSnapshot>,
    cooldown_ticker: Ticker,
    progress_ticker: Ticker,
}

impl CountdownPanel {
    /// Mount on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn mount(
        cooldown: watch::Receiver<i64>,
        clock: Arc<dyn Clock>,
        schedule: ResetSchedule,
        ticks: PanelTicks,
    ) -> Self {
        let initial = PanelSnapshot::compute(*cooldown.borrow(), &schedule, clock.as_ref());
        let (tx, snapshot) = watch::channel(initial);
        let tx = Arc::new(tx);

        let cooldown_ticker = {
            let tx = tx.clone();
            let clock = clock.clone();
            Ticker::start(ticks.cooldown, move || {
                let now = clock.now();
                let seconds = remaining_seconds(*cooldown.borrow(), now.timestamp_millis());
                let left = format_hms(schedule.time_until_reset(now));
                tx.send_if_modified(|s| {
                    let changed = s.cooldown_seconds != seconds || s.reset_time_left != left;
                    s.cooldown_seconds = seconds;
                    s.reset_time_left = left;
                    changed
                });
            })
        };

        let progress_ticker = Ticker::start(ticks.progress, move || {
            let percent = schedule.progress_percent(clock.now());
            tx.send_if_modified(|s| {
                let changed = s.reset_progress_percent != percent;
                s.reset_progress_percent = percent;
                changed
            });
        });

        Self {
            snapshot,
            cooldown_ticker,
            progress_ticker,
        }
    }

    /// What the panel shows right now.
    pub fn snapshot(&self) -> PanelSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that wakes on every visible change.
    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.snapshot.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.cooldown_ticker.is_running() && self.progress_ticker.is_running()
    }

    /// Stop both timers. Equivalent to dropping the panel.
    pub fn unmount(mut self) {
        self.cooldown_ticker.stop();
        self.progress_ticker.stop();
    }
}
