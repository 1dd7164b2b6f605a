//! Periodic and daily refreshes with stale-data tracking.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeDelta};
use log::{debug, info, warn};

use crate::{client::InfoPointClient, portal_data::FetchResult, requests::Transport};

/// When to refresh. `None` disables a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Option<Duration>,
    pub daily_at: Option<NaiveTime>,
}

impl Schedule {
    /// Time until the next refresh, or `None` if nothing is scheduled.
    pub fn next_delay(&self, now: NaiveDateTime) -> Option<Duration> {
        let daily = self.daily_at.and_then(|at| until_next(now, at));
        match (self.interval, daily) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Wall-clock distance to the next `at`; tomorrow if today's has passed.
fn until_next(now: NaiveDateTime, at: NaiveTime) -> Option<Duration> {
    let mut next = now.date().and_time(at);
    if next <= now {
        next += TimeDelta::days(1);
    }
    (next - now).to_std().ok()
}

/// What the last refreshes left behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataState {
    /// Result of the last successful fetch, kept across failures.
    pub data: Option<FetchResult>,
    /// The last refresh failed; `data` is older than it should be.
    pub stale: bool,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Local>>,
}

impl DataState {
    pub fn is_available(&self) -> bool {
        self.data.is_some() && !self.stale
    }
}

/// Owns the client and runs refreshes one at a time.
pub struct Coordinator<T> {
    client: InfoPointClient<T>,
    schedule: Schedule,
    state: DataState,
}

impl<T: Transport> Coordinator<T> {
    pub fn new(client: InfoPointClient<T>, schedule: Schedule) -> Self {
        Self {
            client,
            schedule,
            state: DataState::default(),
        }
    }

    pub fn state(&self) -> &DataState {
        &self.state
    }

    pub fn client(&self) -> &InfoPointClient<T> {
        &self.client
    }

    /// Fetches once. Failures mark the data stale and are not retried.
    pub async fn refresh(&mut self) -> &DataState {
        match self.client.get_data().await {
            Ok(data) => {
                info!("Portal data updated");
                self.state.data = Some(data);
                self.state.stale = false;
                self.state.last_error = None;
                self.state.last_success = Some(Local::now());
            }
            Err(e) => {
                let message = format!("Error communicating with API: {e}");
                warn!("{message}");
                self.state.stale = true;
                self.state.last_error = Some(message);
            }
        }
        &self.state
    }

    /// Refreshes now and then on schedule until nothing is left to wait for.
    pub async fn run<F>(mut self, mut on_update: F)
    where
        F: FnMut(&DataState),
    {
        loop {
            on_update(self.refresh().await);
            let Some(delay) = self.schedule.next_delay(Local::now().naive_local()) else {
                info!("No refresh scheduled, stopping");
                return;
            };
            debug!("Next refresh in {}s", delay.as_secs());
            tokio::time::sleep(delay).await;
        }
    }
}
