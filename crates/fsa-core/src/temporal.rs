//! # Timestamps
//!
//! `Timestamp` is a UTC instant with whole-second precision. Audit start and
//! end times, photo selection times and transition records all use it.
//!
//! Devices and the backing API report times in whatever form they hold:
//! `Z`, an explicit offset (`-03:00` on Brazilian devices), or a bare local
//! date-time without offset. [`Timestamp::parse`] accepts all three; a bare
//! value is taken as UTC.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FsaError;

/// A UTC instant, whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current instant.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(0))
    }

    /// Parse an RFC 3339 value with any offset, or an offset-less
    /// `YYYY-MM-DDTHH:MM:SS[.fff]` taken as UTC.
    pub fn parse(s: &str) -> Result<Self, FsaError> {
        let s = s.trim();
        let utc = match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(rfc_err) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc())
                .map_err(|_| FsaError::InvalidTimestamp(format!("{s:?}: {rfc_err}")))?,
        };
        Ok(Self(utc.trunc_subsecs(0)))
    }

    /// Seconds from `earlier` to `self`; negative if `earlier` is later.
    pub fn seconds_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).num_seconds()
    }

    /// `2026-01-15T12:00:00Z` form.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}
