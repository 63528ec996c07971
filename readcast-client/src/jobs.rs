//! Job-related API endpoints

use reqwest::Method;
use reqwest::multipart::{Form, Part};

use crate::ReadcastClient;
use crate::error::Result;
use readcast_core::domain::job::JobUpdate;
use readcast_core::dto::job::{CreatedJob, Health, JobSummary, RawJobUpdate};
use readcast_core::validate::{self, UploadLimits};

/// A PDF upload about to become a conversion job.
#[derive(Debug, Clone)]
pub struct JobUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Narrator voice; backend default is "Rachel".
    pub voice: Option<String>,
    /// Source language; backend default is "fra".
    pub lang: Option<String>,
}

impl JobUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            voice: None,
            lang: None,
        }
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

impl ReadcastClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Create a conversion job from a PDF upload
    ///
    /// The upload is validated locally first; an invalid file is rejected
    /// with [`crate::ClientError::InvalidUpload`] before any network call.
    ///
    /// # Arguments
    /// * `upload` - The file to convert plus optional voice/language
    /// * `limits` - Size limits to enforce before sending
    ///
    /// # Returns
    /// The created job's id and initial status
    ///
    /// # Example
    /// ```no_run
    /// # use readcast_client::{JobUpload, ReadcastClient};
    /// # use readcast_core::validate::UploadLimits;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = ReadcastClient::new("http://localhost:8000");
    /// let bytes = tokio::fs::read("book.pdf").await?;
    /// let created = client
    ///     .create_job(
    ///         JobUpload::new("book.pdf", bytes).voice("Rachel").lang("fra"),
    ///         &UploadLimits::default(),
    ///     )
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_job(&self, upload: JobUpload, limits: &UploadLimits) -> Result<CreatedJob> {
        let head_len = upload.bytes.len().min(8);
        validate::validate_upload(
            &upload.filename,
            upload.bytes.len() as u64,
            &upload.bytes[..head_len],
            limits,
        )?;

        let file_part = Part::bytes(upload.bytes)
            .file_name(upload.filename.clone())
            .mime_str("application/pdf")?;
        let mut form = Form::new().part("file", file_part);
        if let Some(voice) = upload.voice {
            form = form.text("voice", voice);
        }
        if let Some(lang) = upload.lang {
            form = form.text("lang", lang);
        }

        tracing::debug!(filename = %upload.filename, "Creating conversion job");
        let url = format!("{}/api/jobs", self.base_url());
        let response = self.request(Method::POST, &url).multipart(form).send().await?;

        self.handle_response(response).await
    }

    /// Get the current state of a job, normalized
    ///
    /// # Arguments
    /// * `job_id` - The opaque job id returned at creation
    pub async fn get_job(&self, job_id: &str) -> Result<JobUpdate> {
        let url = format!("{}/api/jobs/{}", self.base_url(), job_id);
        let response = self.request(Method::GET, &url).send().await?;

        let raw: RawJobUpdate = self.handle_response(response).await?;
        Ok(raw.normalize())
    }

    /// List recent jobs
    ///
    /// # Returns
    /// Job summaries, newest first
    pub async fn job_history(&self) -> Result<Vec<JobSummary>> {
        let url = format!("{}/api/jobs/history", self.base_url());
        let response = self.request(Method::GET, &url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Health
    // =============================================================================

    /// Check backend availability
    pub async fn health(&self) -> Result<Health> {
        let url = format!("{}/health", self.base_url());
        let response = self.request(Method::GET, &url).send().await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readcast_core::validate::ValidateError;

    #[tokio::test]
    async fn test_create_job_rejects_oversized_upload_before_network() {
        // Unroutable base URL: if validation did not short-circuit, the
        // request would fail with a transport error instead.
        let client = ReadcastClient::new("http://readcast.invalid");
        let limits = UploadLimits { max_bytes: 16 };
        let upload = JobUpload::new("big.pdf", b"%PDF-1.7 0123456789".to_vec());

        let err = client.create_job(upload, &limits).await.unwrap_err();
        match err {
            crate::ClientError::InvalidUpload(ValidateError::TooLarge { actual, limit }) => {
                assert_eq!(actual, 19);
                assert_eq!(limit, 16);
            }
            other => panic!("expected InvalidUpload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_job_rejects_non_pdf_before_network() {
        let client = ReadcastClient::new("http://readcast.invalid");
        let upload = JobUpload::new("notes.txt", b"hello".to_vec());

        let err = client
            .create_job(upload, &UploadLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::ClientError::InvalidUpload(ValidateError::NotPdf(_))
        ));
    }

    #[test]
    fn test_upload_builder() {
        let upload = JobUpload::new("a.pdf", vec![1]).voice("Rachel").lang("eng");
        assert_eq!(upload.voice.as_deref(), Some("Rachel"));
        assert_eq!(upload.lang.as_deref(), Some("eng"));
    }
}
