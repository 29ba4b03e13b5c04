//! Session - ordered readings collected from one connection
//!
//! A `Session` is append-only while its connection is open. `finish()`
//! freezes it into a `FinishedSession`, which the sink consumes by value.

use std::net::SocketAddr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::constants::SESSION_TIME_FORMAT;
use crate::error::{Error, Result};

/// Identity of a session: peer address plus start time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionId {
    pub peer: SocketAddr,
    pub started_at: DateTime<Local>,
}

impl SessionId {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            started_at: Local::now(),
        }
    }

    /// `<peer-ip>_<peer-port>_<day-month-year_hour-minute-second>.csv`
    pub fn record_name(&self) -> String {
        format!(
            "{}_{}_{}.csv",
            self.peer.ip(),
            self.peer.port(),
            self.started_at.format(SESSION_TIME_FORMAT)
        )
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.peer, self.started_at.format(SESSION_TIME_FORMAT))
    }
}

/// Open session, owned by a single collector
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    readings: Vec<String>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            readings: Vec::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn push(&mut self, reading: impl Into<String>) {
        self.readings.push(reading.into());
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Freeze the session once its connection has ended
    pub fn finish(self) -> FinishedSession {
        FinishedSession {
            id: self.id,
            readings: self.readings,
        }
    }
}

/// Frozen session, readable but no longer appendable
#[derive(Debug, Clone)]
pub struct FinishedSession {
    id: SessionId,
    readings: Vec<String>,
}

impl FinishedSession {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Readings as decoded text, in arrival order
    pub fn readings(&self) -> &[String] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Parse readings as scalars for classification
    pub fn values(&self) -> Result<Vec<f32>> {
        self.readings
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                parse_scalar(raw).ok_or_else(|| {
                    Error::Validation(format!("Reading {} is not numeric: {:?}", index, raw))
                })
            })
            .collect()
    }
}

/// Parse one scalar; blank and NaN cells count as zero
pub fn parse_scalar(raw: &str) -> Option<f32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    match trimmed.parse::<f32>() {
        Ok(v) if v.is_nan() => Some(0.0),
        Ok(v) => Some(v),
        Err(_) => None,
    }
}
