//! When the `watch` loop starts a round.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sitewatch_core::Settings;
use tracing::warn;

/// How close to a daily time a tick must land for the round to start.
pub const DAILY_WINDOW: Duration = Duration::from_secs(30);
/// How often the daily schedule is checked.
pub const DAILY_TICK: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// A round every `monitor_interval`, the first one immediately.
    Interval(Duration),
    /// A round once per day at each local time.
    Daily(Vec<NaiveTime>),
}

impl Schedule {
    /// Daily mode when every scheduled time parses, interval mode otherwise.
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.scheduled_times.is_empty() {
            return Schedule::Interval(settings.monitor_interval());
        }
        match parse_times(&settings.scheduled_times) {
            Some(times) => Schedule::Daily(times),
            None => {
                warn!(
                    times = ?settings.scheduled_times,
                    "Invalid scheduled times, falling back to interval mode"
                );
                Schedule::Interval(settings.monitor_interval())
            }
        }
    }
}

/// Parse `HH:MM` values. `None` when the list is empty or any entry is malformed.
pub fn parse_times(values: &[String]) -> Option<Vec<NaiveTime>> {
    if values.is_empty() {
        return None;
    }
    let mut times = values
        .iter()
        .map(|value| NaiveTime::parse_from_str(value.trim(), "%H:%M").ok())
        .collect::<Option<Vec<_>>>()?;
    times.sort();
    times.dedup();
    Some(times)
}

/// Remembers which daily times already ran today.
#[derive(Debug)]
pub struct DailyTracker {
    times: Vec<NaiveTime>,
    last_run: HashMap<NaiveTime, NaiveDate>,
}

impl DailyTracker {
    pub fn new(times: Vec<NaiveTime>) -> Self {
        Self {
            times,
            last_run: HashMap::new(),
        }
    }

    /// True when `now` falls inside the window of a time that has not run
    /// today. That time is marked as run.
    pub fn due(&mut self, now: NaiveDateTime) -> bool {
        let today = now.date();
        let window = chrono::Duration::seconds(DAILY_WINDOW.as_secs() as i64);

        for time in &self.times {
            if self.last_run.get(time) == Some(&today) {
                continue;
            }
            let elapsed = now.time().signed_duration_since(*time);
            if elapsed >= chrono::Duration::zero() && elapsed < window {
                self.last_run.insert(*time, today);
                return true;
            }
        }
        false
    }
}
