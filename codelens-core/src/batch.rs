//! Multi-file batch analysis: wire types and status polling.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::Result;
use crate::transport::HttpTransport;

/// Interval between batch status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Margin, in percentage points, one similarity must lead the other by.
const SIMILARITY_MARGIN: f64 = 10.0;

/// Processing state of a batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Files are still being analyzed.
    Processing,
    /// Every file has been analyzed.
    Completed,
    /// The batch failed.
    Error,
}

impl BatchStatus {
    /// Wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Error => "error",
        }
    }

    /// Whether polling should stop.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchStatus::Processing)
    }
}

/// Outcome of a single file in a batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// The file was analyzed.
    Success,
    /// The file could not be analyzed.
    Error,
}

/// Per-file result in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysisResult {
    /// File name.
    pub filename: String,
    /// Path inside the archive or folder.
    pub filepath: String,
    /// Outcome for this file.
    pub status: FileStatus,
    /// Similarity to AI-written code, in percent.
    #[serde(default)]
    pub ai_similarity: f64,
    /// Similarity to human-written code, in percent.
    #[serde(default)]
    pub human_similarity: f64,
    /// Lines of code.
    #[serde(default)]
    pub loc: u64,
    /// Size in bytes.
    #[serde(default)]
    pub file_size: u64,
    /// Identifier of the per-file analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
    /// Source of the file, when the backend returns it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_content: Option<String>,
    /// Failure reason for errored files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch submission, status and results share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnalysisResponse {
    /// Batch identifier.
    pub batch_id: String,
    /// Current state.
    pub status: BatchStatus,
    /// Files found in the submission.
    pub total_files: u64,
    /// Files analyzed so far.
    pub processed_files: u64,
    /// Per-file results collected so far.
    #[serde(default)]
    pub results: Vec<FileAnalysisResult>,
    /// Backend message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BatchAnalysisResponse {
    /// Results whose file was analyzed successfully.
    pub fn successful_results(&self) -> impl Iterator<Item = &FileAnalysisResult> {
        self.results
            .iter()
            .filter(|result| result.status == FileStatus::Success)
    }
}

/// Request body for a Google Drive batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleDriveBatchRequest {
    /// Always `google_drive`.
    pub source_type: String,
    /// Shared folder or file link.
    pub google_drive_url: String,
}

impl GoogleDriveBatchRequest {
    /// Build a Drive batch request.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            source_type: "google_drive".to_string(),
            google_drive_url: url.into(),
        }
    }
}

/// Coarse label comparing AI and human similarity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SimilarityLabel {
    /// AI similarity leads by more than ten points.
    AiLike,
    /// Human similarity leads by more than ten points.
    HumanLike,
    /// Neither leads clearly.
    Mixed,
}

impl SimilarityLabel {
    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityLabel::AiLike => "AI-like",
            SimilarityLabel::HumanLike => "Human-like",
            SimilarityLabel::Mixed => "Mixed",
        }
    }
}

/// Label a file by its percentage similarities.
pub fn similarity_label(ai_similarity: f64, human_similarity: f64) -> SimilarityLabel {
    if ai_similarity > human_similarity + SIMILARITY_MARGIN {
        SimilarityLabel::AiLike
    } else if human_similarity > ai_similarity + SIMILARITY_MARGIN {
        SimilarityLabel::HumanLike
    } else {
        SimilarityLabel::Mixed
    }
}

/// Async sleep abstraction for polling.
pub trait Sleeper {
    /// Sleep for the duration.
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Tokio-backed sleeper.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Poll a batch until it leaves `processing`.
///
/// The first fetch happens one `interval` after the call. Each fetched status is passed to `on_update`. A failed fetch ends polling
/// with that error; there is no retry.
pub async fn poll_batch<T, S, F>(
    client: &ApiClient<T>,
    batch_id: &str,
    sleeper: &S,
    interval: Duration,
    mut on_update: F,
) -> Result<BatchAnalysisResponse>
where
    T: HttpTransport,
    S: Sleeper,
    F: FnMut(&BatchAnalysisResponse),
{
    loop {
        sleeper.sleep(interval).await;
        let batch = client.batch_status(batch_id).await?;
        on_update(&batch);
        if batch.status.is_terminal() {
            log::info!(
                "batch {batch_id} finished as {} ({}/{} files)",
                batch.status.as_str(),
                batch.processed_files,
                batch.total_files
            );
            return Ok(batch);
        }
        log::info!(
            "batch {batch_id} processing ({}/{} files)",
            batch.processed_files,
            batch.total_files
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{ScriptedTransport, response};
    use crate::error::CodelensError;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingSleeper {
        durations: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn new() -> Self {
            Self {
                durations: Mutex::new(Vec::new()),
            }
        }

        fn durations(&self) -> Vec<Duration> {
            self.durations.lock().expect("durations").clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep<'a>(
            &'a self,
            duration: Duration,
        ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
            Box::pin(async move {
                self.durations.lock().expect("durations").push(duration);
            })
        }
    }

    fn status(status: &str, processed: u64) -> crate::error::Result<crate::transport::HttpResponse> {
        let body = json!({
            "batch_id": "batch-7",
            "status": status,
            "total_files": 2,
            "processed_files": processed,
            "results": [
                {
                    "filename": "a.c",
                    "filepath": "src/a.c",
                    "status": "success",
                    "ai_similarity": 71.5,
                    "human_similarity": 20.0,
                    "loc": 40,
                    "file_size": 900,
                    "analysis_id": "analysis_a"
                },
                {
                    "filename": "b.c",
                    "filepath": "src/b.c",
                    "status": "error",
                    "error": "not valid UTF-8"
                }
            ]
        });
        Ok(response(200, "OK", body.to_string()))
    }

    #[test]
    fn similarity_label_needs_a_ten_point_lead() {
        assert_eq!(similarity_label(71.0, 60.0), SimilarityLabel::AiLike);
        assert_eq!(similarity_label(20.0, 30.5), SimilarityLabel::HumanLike);
        assert_eq!(similarity_label(50.0, 60.0), SimilarityLabel::Mixed);
        assert_eq!(similarity_label(60.0, 50.0), SimilarityLabel::Mixed);
    }

    #[test]
    fn google_drive_request_sets_source_type() {
        let request = GoogleDriveBatchRequest::new("https://drive.google.com/x");
        assert_eq!(request.source_type, "google_drive");
    }

    #[tokio::test]
    async fn poll_batch_stops_on_terminal_status() {
        let transport = ScriptedTransport::new(vec![
            status("processing", 0),
            status("processing", 1),
            status("completed", 2),
        ]);
        let client = ApiClient::new("http://backend", &transport);
        let sleeper = RecordingSleeper::new();
        let mut seen = Vec::new();

        let batch = poll_batch(
            &client,
            "batch-7",
            &sleeper,
            DEFAULT_POLL_INTERVAL,
            |batch| seen.push(batch.processed_files),
        )
        .await
        .expect("batch");

        assert_eq!(batch.status, BatchStatus::Completed);
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(sleeper.durations(), vec![Duration::from_secs(3); 3]);
        assert_eq!(batch.successful_results().count(), 1);
        assert_eq!(
            transport.requests()[0].url,
            "http://backend/api/analysis/batch/batch-7/status"
        );
    }

    #[tokio::test]
    async fn poll_batch_treats_error_status_as_terminal() {
        let transport = ScriptedTransport::new(vec![status("error", 0)]);
        let client = ApiClient::new("http://backend", &transport);
        let sleeper = RecordingSleeper::new();

        let batch = poll_batch(&client, "batch-7", &sleeper, DEFAULT_POLL_INTERVAL, |_| {})
            .await
            .expect("batch");
        assert_eq!(batch.status, BatchStatus::Error);
        assert_eq!(sleeper.durations(), vec![DEFAULT_POLL_INTERVAL]);
    }

    #[tokio::test]
    async fn poll_batch_stops_on_fetch_failure() {
        let transport = ScriptedTransport::new(vec![
            status("processing", 0),
            Ok(response(404, "Not Found", r#"{"detail":"batch not found"}"#)),
        ]);
        let client = ApiClient::new("http://backend", &transport);
        let sleeper = RecordingSleeper::new();

        let err = poll_batch(&client, "batch-7", &sleeper, DEFAULT_POLL_INTERVAL, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, CodelensError::Http { status: 404, .. }));
        assert_eq!(err.to_string(), "batch not found");
        assert_eq!(sleeper.durations().len(), 2);
    }
}
