//! Typed measurements with explicit failure sentinels.
//!
//! A probe either measured something or it did not, and *why* it did not
//! matters to the people reading the log: a skipped ping is not a lost ping,
//! and neither is a zero. [`Metric`] keeps those cases apart until the record
//! is rendered, at which point each variant maps to its fixed display string.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

pub const NOT_AVAILABLE: &str = "N/A";
pub const FAILED: &str = "Failed";
pub const ERROR: &str = "Error";
pub const WHOIS_FAILED: &str = "WHOIS Failed";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric<T> {
    /// A genuine measurement
    Measured(T),
    /// Not attempted or nothing to report ("N/A")
    Unavailable,
    /// Attempted without a usable answer ("Failed")
    Failed,
    /// The probe transport itself raised ("Error")
    Error,
    /// The registry lookup could not be performed ("WHOIS Failed")
    LookupFailed,
}

impl<T> Metric<T> {
    pub fn measured(&self) -> Option<&T> {
        match self {
            Metric::Measured(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, Metric::Measured(_))
    }

    /// The display string for a non-measured variant.
    pub fn sentinel(&self) -> Option<&'static str> {
        match self {
            Metric::Measured(_) => None,
            Metric::Unavailable => Some(NOT_AVAILABLE),
            Metric::Failed => Some(FAILED),
            Metric::Error => Some(ERROR),
            Metric::LookupFailed => Some(WHOIS_FAILED),
        }
    }
}

/// How a measured value is written to the log.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for f64 {
    fn render(&self) -> String {
        if self.fract() == 0.0 {
            format!("{:.1}", self)
        } else {
            format!("{}", self)
        }
    }
}

impl Render for i64 {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl Render for DateTime<Utc> {
    fn render(&self) -> String {
        self.to_rfc3339()
    }
}

impl<T: Render> Metric<T> {
    pub fn render(&self) -> String {
        match self {
            Metric::Measured(value) => value.render(),
            other => other.sentinel().unwrap_or(NOT_AVAILABLE).to_string(),
        }
    }
}

impl<T: Render> fmt::Display for Metric<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Measurements serialize as their natural JSON type, sentinels as strings.
impl<T: Serialize> Serialize for Metric<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Measured(value) => value.serialize(serializer),
            other => serializer.serialize_str(other.sentinel().unwrap_or(NOT_AVAILABLE)),
        }
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whole days from `now` until `until`, rounded towards negative infinity.
///
/// An expiry twelve hours in the past is `-1`, not `0`.
pub fn days_until(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (until - now).num_seconds().div_euclid(86_400)
}
