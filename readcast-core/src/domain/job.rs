//! Job domain types
//!
//! A job is one server-side PDF-to-audiobook conversion, identified by an
//! opaque string id assigned by the backend. The client only ever observes
//! jobs through status updates; it never mutates them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Conversion job status as reported by the backend.
///
/// The wire casing is not stable (the backend has emitted `PENDING`,
/// `pending`, and `RUNNING` at various points), so parsing is
/// case-insensitive and `RUNNING` maps onto [`JobStatus::Processing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    /// True once no further updates are expected for the job.
    ///
    /// Terminal states are sticky: a subscription must stop after
    /// delivering a `Done` or `Error` update.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Canonical wire form (uppercase).
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Done => "DONE",
            JobStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status string the backend sent that maps to none of the known states.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(JobStatus::Pending),
            // Older backend revisions report the in-flight state as RUNNING.
            "PROCESSING" | "RUNNING" => Ok(JobStatus::Processing),
            "DONE" => Ok(JobStatus::Done),
            "ERROR" => Ok(JobStatus::Error),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl Serialize for JobStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Normalized view of one job update, as handed to consumers.
///
/// This is the post-demux shape: progress reports that arrive through the
/// overloaded wire `error` field are exposed as [`JobUpdate::progress`],
/// and `error` only ever carries a genuine failure message. Updates are
/// replaced wholesale, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    /// Opaque id assigned by the backend at job creation.
    pub id: String,
    pub status: JobStatus,
    /// Completion percentage (0-100), when the backend reported one.
    pub progress: Option<u8>,
    /// Genuine failure message; never the raw progress sentinel.
    pub error: Option<String>,
    /// Short OCR excerpt of the source document.
    pub preview_text: Option<String>,
    /// Playback URLs; may appear before the job reaches `DONE`.
    pub output_mp3_url: Option<String>,
    pub output_m4b_url: Option<String>,
    /// Content-disposition-forcing download URLs, distinct from playback.
    pub download_mp3_url: Option<String>,
    pub download_m4b_url: Option<String>,
}

impl JobUpdate {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
