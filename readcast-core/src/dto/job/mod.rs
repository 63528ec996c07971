//! Job DTOs and wire normalization
//!
//! The backend serializes its job rows directly, so every field except
//! `id` and `status` can be absent. The `error` column is overloaded: it
//! carries either a genuine failure message or a `PROGRESS::<n>` sentinel
//! encoding a completion percentage. [`RawJobUpdate::normalize`] is the
//! single place that demultiplexes the two; the sentinel string never
//! escapes this module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::{JobStatus, JobUpdate};

/// Prefix of a progress report smuggled through the `error` field.
pub const PROGRESS_SENTINEL: &str = "PROGRESS::";

/// One job update exactly as the backend serializes it.
///
/// Deserializing already normalizes status casing (see
/// [`JobStatus`]); an unknown status string fails the whole parse, which
/// subscribers treat as a malformed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJobUpdate {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub input_filename: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_sec: Option<i64>,
    #[serde(default)]
    pub preview_text: Option<String>,
    #[serde(default)]
    pub output_mp3_url: Option<String>,
    #[serde(default)]
    pub output_m4b_url: Option<String>,
    #[serde(default)]
    pub download_mp3_url: Option<String>,
    #[serde(default)]
    pub download_m4b_url: Option<String>,
    #[serde(default)]
    pub chapters_json_url: Option<String>,
}

impl RawJobUpdate {
    /// Demux the overloaded `error` field and produce the consumer shape.
    pub fn normalize(self) -> JobUpdate {
        let (progress, error) = match self.error {
            Some(raw) => match parse_progress_sentinel(&raw) {
                Some(pct) => (Some(pct), None),
                None => (None, Some(raw)),
            },
            None => (None, None),
        };

        JobUpdate {
            id: self.id,
            status: self.status,
            progress,
            error,
            preview_text: self.preview_text,
            output_mp3_url: self.output_mp3_url,
            output_m4b_url: self.output_m4b_url,
            download_mp3_url: self.download_mp3_url,
            download_m4b_url: self.download_m4b_url,
        }
    }
}

impl From<RawJobUpdate> for JobUpdate {
    fn from(raw: RawJobUpdate) -> Self {
        raw.normalize()
    }
}

/// Parse a `PROGRESS::<digits>` sentinel into a percentage.
///
/// Strict on purpose: anything that is not the prefix followed by plain
/// digits is treated as a real error message, not a progress report.
/// Values over 100 are clamped.
fn parse_progress_sentinel(error: &str) -> Option<u8> {
    let digits = error.strip_prefix(PROGRESS_SENTINEL)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse::<u64>().ok()?.min(100) as u8)
}

/// Response of `POST /api/jobs`.
///
/// The backend returns only the new id; `status` is present in newer
/// revisions and defaults to `PENDING` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedJob {
    pub id: String,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

impl CreatedJob {
    pub fn status_or_pending(&self) -> JobStatus {
        self.status.unwrap_or(JobStatus::Pending)
    }
}

/// One entry of `GET /api/jobs/history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub input_filename: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_sec: Option<i64>,
    #[serde(default)]
    pub output_mp3_url: Option<String>,
    #[serde(default)]
    pub output_m4b_url: Option<String>,
    #[serde(default)]
    pub download_mp3_url: Option<String>,
    #[serde(default)]
    pub download_m4b_url: Option<String>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

impl Health {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: JobStatus, error: Option<&str>) -> RawJobUpdate {
        RawJobUpdate {
            id: "abc123".to_string(),
            status,
            error: error.map(String::from),
            input_filename: None,
            voice: None,
            lang: None,
            created_at: None,
            duration_sec: None,
            preview_text: None,
            output_mp3_url: None,
            output_m4b_url: None,
            download_mp3_url: None,
            download_m4b_url: None,
            chapters_json_url: None,
        }
    }

    #[test]
    fn test_progress_sentinel_demux() {
        let update = raw(JobStatus::Processing, Some("PROGRESS::42")).normalize();
        assert_eq!(update.progress, Some(42));
        assert_eq!(update.error, None);
        assert!(!update.is_terminal());
    }

    #[test]
    fn test_genuine_error_passes_through() {
        let update = raw(JobStatus::Error, Some("TTS synthesis failed")).normalize();
        assert_eq!(update.progress, None);
        assert_eq!(update.error.as_deref(), Some("TTS synthesis failed"));
        assert!(update.is_terminal());
    }

    #[test]
    fn test_malformed_sentinel_is_an_error_message() {
        for bad in ["PROGRESS::", "PROGRESS::abc", "PROGRESS::4a", "progress::42"] {
            let update = raw(JobStatus::Processing, Some(bad)).normalize();
            assert_eq!(update.progress, None, "{bad:?} must not parse as progress");
            assert_eq!(update.error.as_deref(), Some(bad));
        }
    }

    #[test]
    fn test_progress_is_clamped_to_100() {
        let update = raw(JobStatus::Processing, Some("PROGRESS::250")).normalize();
        assert_eq!(update.progress, Some(100));
    }

    #[test]
    fn test_deserializes_sparse_backend_row() {
        let update: RawJobUpdate =
            serde_json::from_str(r#"{"id":"j1","status":"pending"}"#).unwrap();
        assert_eq!(update.status, JobStatus::Pending);
        assert_eq!(update.error, None);
        assert_eq!(update.output_mp3_url, None);
    }

    #[test]
    fn test_normalize_keeps_partial_artifacts() {
        let mut partial = raw(JobStatus::Processing, Some("PROGRESS::90"));
        partial.output_mp3_url = Some("http://x/a.mp3".to_string());
        let update = partial.normalize();
        assert_eq!(update.output_mp3_url.as_deref(), Some("http://x/a.mp3"));
        assert_eq!(update.download_mp3_url, None);
    }

    #[test]
    fn test_created_job_defaults_to_pending() {
        let created: CreatedJob = serde_json::from_str(r#"{"id":"j1"}"#).unwrap();
        assert_eq!(created.status_or_pending(), JobStatus::Pending);
    }

    #[test]
    fn test_health_ok() {
        let health: Health =
            serde_json::from_str(r#"{"status":"ok","uptime_sec":12}"#).unwrap();
        assert!(health.is_ok());
    }
}
