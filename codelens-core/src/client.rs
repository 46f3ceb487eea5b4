//! Typed client for the analysis backend.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::batch::{BatchAnalysisResponse, GoogleDriveBatchRequest};
use crate::classify::{AnalysisResult, classify};
use crate::domain::{
    AiMdxResponse, AnalysisMethodsResponse, AnalysisResponse, ApiErrorBody, CodeAnalysisRequest,
    HealthStatus, IndividualAnalysisResponse,
};
use crate::error::{CodelensError, Result};
use crate::transport::{FormField, HttpRequest, HttpResponse, HttpTransport, Method, RequestBody};
use crate::validate::{validate_archive, validate_google_drive_url};

/// Backend endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Liveness and module status.
    Health,
    /// Available analysis modes.
    Methods,
    /// Combined analysis.
    CombinedAnalysis,
    /// AST-only analysis.
    AstAnalysis,
    /// Human style analysis.
    HumanStyle,
    /// Advanced features analysis.
    AdvancedFeatures,
    /// Narrative AI analysis.
    AiAnalysis,
    /// Single file upload.
    UploadFile,
    /// Archive batch upload.
    BatchUpload,
    /// Google Drive batch submission.
    BatchGoogleDrive,
    /// Batch status for an id.
    BatchStatus(String),
    /// Batch results for an id.
    BatchResults(String),
}

impl Endpoint {
    /// Path relative to the backend base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::Health => "/health".to_string(),
            Endpoint::Methods => "/api/analysis/methods".to_string(),
            Endpoint::CombinedAnalysis => "/api/analysis/combined-analysis".to_string(),
            Endpoint::AstAnalysis => "/api/analysis/ast-analysis".to_string(),
            Endpoint::HumanStyle => "/api/analysis/human-style".to_string(),
            Endpoint::AdvancedFeatures => "/api/analysis/advanced-features".to_string(),
            Endpoint::AiAnalysis => "/api/analysis/ai-analysis".to_string(),
            Endpoint::UploadFile => "/api/analysis/upload-file".to_string(),
            Endpoint::BatchUpload => "/api/analysis/batch/upload".to_string(),
            Endpoint::BatchGoogleDrive => "/api/analysis/batch/google-drive".to_string(),
            Endpoint::BatchStatus(id) => {
                format!("/api/analysis/batch/{}/status", urlencoding::encode(id))
            }
            Endpoint::BatchResults(id) => {
                format!("/api/analysis/batch/{}/results", urlencoding::encode(id))
            }
        }
    }
}

/// Analysis modes a submission can request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AnalysisMode {
    /// All feature extractors plus an assessment.
    Combined,
    /// AST structure only.
    Ast,
    /// Human style signals only.
    HumanStyle,
    /// Complexity and AI pattern features only.
    Advanced,
    /// Narrative LLM analysis.
    Ai,
}

impl AnalysisMode {
    /// Identifier used by the backend (`analysis_type` form field).
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Combined => "combined",
            AnalysisMode::Ast => "ast",
            AnalysisMode::HumanStyle => "human-style",
            AnalysisMode::Advanced => "advanced",
            AnalysisMode::Ai => "ai",
        }
    }

    /// Endpoint serving JSON submissions in this mode.
    pub fn endpoint(&self) -> Endpoint {
        match self {
            AnalysisMode::Combined => Endpoint::CombinedAnalysis,
            AnalysisMode::Ast => Endpoint::AstAnalysis,
            AnalysisMode::HumanStyle => Endpoint::HumanStyle,
            AnalysisMode::Advanced => Endpoint::AdvancedFeatures,
            AnalysisMode::Ai => Endpoint::AiAnalysis,
        }
    }

    /// Whether the upload endpoint accepts this mode.
    pub fn supports_upload(&self) -> bool {
        !matches!(self, AnalysisMode::Ai)
    }
}

/// A file submitted through a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    /// Filename reported to the backend.
    pub filename: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Client for the analysis backend.
///
/// Built explicitly from a base URL and a transport; there is no shared
/// instance.
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    base_url: String,
    transport: T,
}

impl<T: HttpTransport> ApiClient<T> {
    /// Create a client for the given base URL.
    pub fn new(base_url: impl AsRef<str>, transport: T) -> Self {
        Self {
            base_url: base_url.as_ref().trim().trim_end_matches('/').to_string(),
            transport,
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one request and decode the JSON response.
    ///
    /// JSON and empty bodies default to `Content-Type: application/json`;
    /// entries in `headers` replace defaults of the same name. Multipart
    /// bodies carry no default so the transport can set the boundary.
    pub async fn request<R: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        method: Method,
        body: RequestBody,
        headers: &[(&str, &str)],
    ) -> Result<R> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        let request = HttpRequest {
            method,
            url,
            headers: merge_headers(&body, headers),
            body,
        };
        log::debug!("{} {}", request.method.as_str(), request.url);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            let error = http_error(&response);
            log::debug!("request failed with status {}: {error}", response.status);
            return Err(error);
        }
        serde_json::from_slice(&response.body)
            .map_err(|err| CodelensError::Request(format!("Request failed: {err}")))
    }

    async fn get<R: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<R> {
        self.request(&endpoint, Method::Get, RequestBody::Empty, &[])
            .await
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        payload: &B,
    ) -> Result<R> {
        let body = RequestBody::Json(serde_json::to_value(payload)?);
        self.request(&endpoint, Method::Post, body, &[]).await
    }

    /// Backend liveness and module status.
    pub async fn health_check(&self) -> Result<HealthStatus> {
        self.get(Endpoint::Health).await
    }

    /// Available analysis modes and limits.
    pub async fn analysis_methods(&self) -> Result<AnalysisMethodsResponse> {
        self.get(Endpoint::Methods).await
    }

    /// Combined analysis with grouped features and an assessment.
    pub async fn analyze_combined(&self, request: &CodeAnalysisRequest) -> Result<AnalysisResponse> {
        self.post_json(Endpoint::CombinedAnalysis, request).await
    }

    /// AST analysis only.
    pub async fn analyze_ast(
        &self,
        request: &CodeAnalysisRequest,
    ) -> Result<IndividualAnalysisResponse> {
        self.post_json(Endpoint::AstAnalysis, request).await
    }

    /// Human style analysis only.
    pub async fn analyze_human_style(
        &self,
        request: &CodeAnalysisRequest,
    ) -> Result<IndividualAnalysisResponse> {
        self.post_json(Endpoint::HumanStyle, request).await
    }

    /// Advanced features analysis only.
    pub async fn analyze_advanced(
        &self,
        request: &CodeAnalysisRequest,
    ) -> Result<IndividualAnalysisResponse> {
        self.post_json(Endpoint::AdvancedFeatures, request).await
    }

    /// Narrative AI analysis.
    pub async fn analyze_ai(&self, request: &CodeAnalysisRequest) -> Result<AiMdxResponse> {
        self.post_json(Endpoint::AiAnalysis, request).await
    }

    /// Analyze in the given mode and classify whatever shape comes back.
    pub async fn analyze(
        &self,
        request: &CodeAnalysisRequest,
        mode: AnalysisMode,
    ) -> Result<AnalysisResult> {
        let value: Value = self.post_json(mode.endpoint(), request).await?;
        classify(value)
    }

    /// Upload a single source file for analysis.
    pub async fn analyze_file(
        &self,
        file: UploadFile,
        mode: AnalysisMode,
        language: &str,
    ) -> Result<AnalysisResult> {
        if !mode.supports_upload() {
            return Err(CodelensError::Validation(format!(
                "file upload does not support {} analysis",
                mode.as_str()
            )));
        }
        let body = RequestBody::Multipart(vec![
            FormField::File {
                name: "file".to_string(),
                filename: file.filename,
                bytes: file.bytes,
            },
            FormField::Text {
                name: "analysis_type".to_string(),
                value: mode.as_str().to_string(),
            },
            FormField::Text {
                name: "language".to_string(),
                value: language.to_string(),
            },
        ]);
        let value: Value = self
            .request(&Endpoint::UploadFile, Method::Post, body, &[])
            .await?;
        classify(value)
    }

    /// Submit a ZIP/RAR archive for batch analysis.
    pub async fn upload_batch_archive(&self, archive: UploadFile) -> Result<BatchAnalysisResponse> {
        validate_archive(&archive.filename, archive.bytes.len() as u64)?;
        let body = RequestBody::Multipart(vec![FormField::File {
            name: "file".to_string(),
            filename: archive.filename,
            bytes: archive.bytes,
        }]);
        self.request(&Endpoint::BatchUpload, Method::Post, body, &[])
            .await
    }

    /// Submit a shared Google Drive folder or file for batch analysis.
    pub async fn analyze_batch_google_drive(&self, url: &str) -> Result<BatchAnalysisResponse> {
        let url = validate_google_drive_url(url)?;
        let payload = GoogleDriveBatchRequest::new(url);
        self.post_json(Endpoint::BatchGoogleDrive, &payload).await
    }

    /// Current status of a batch.
    pub async fn batch_status(&self, batch_id: &str) -> Result<BatchAnalysisResponse> {
        self.get(Endpoint::BatchStatus(batch_id.to_string())).await
    }

    /// Results of a batch.
    pub async fn batch_results(&self, batch_id: &str) -> Result<BatchAnalysisResponse> {
        self.get(Endpoint::BatchResults(batch_id.to_string())).await
    }
}

fn merge_headers(body: &RequestBody, overrides: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();
    if !matches!(body, RequestBody::Multipart(_)) {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }
    for (name, value) in overrides {
        headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        headers.push((name.to_string(), value.to_string()));
    }
    headers
}

fn http_error(response: &HttpResponse) -> CodelensError {
    let fallback = format!("HTTP {}: {}", response.status, response.reason);
    let message = serde_json::from_slice::<ApiErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message())
        .unwrap_or(fallback);
    CodelensError::Http {
        status: response.status,
        message,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::error::{CodelensError, Result};
    use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportFuture};

    /// Transport that replays canned responses and records requests.
    pub(crate) struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(responses: Vec<Result<HttpResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn json(status: u16, reason: &str, body: serde_json::Value) -> Self {
            Self::new(vec![Ok(response(status, reason, body.to_string()))])
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    pub(crate) fn response(status: u16, reason: &str, body: impl Into<Vec<u8>>) -> HttpResponse {
        HttpResponse {
            status,
            reason: reason.to_string(),
            body: body.into(),
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn send<'a>(&'a self, request: HttpRequest) -> TransportFuture<'a> {
            Box::pin(async move {
                self.requests.lock().expect("requests lock").push(request);
                self.responses
                    .lock()
                    .expect("responses lock")
                    .pop_front()
                    .unwrap_or_else(|| Err(CodelensError::Other("no scripted response".into())))
            })
        }
    }
}
