#![deny(missing_docs)]
//! CodeLens core library.
//!
//! This crate contains the wire types, API client and result handling that
//! power the CodeLens AI-code detection tooling.

pub mod baseline;
pub mod batch;
pub mod cache;
pub mod classify;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod language;
pub mod report;
pub mod store;
pub mod transport;
pub mod validate;

pub use baseline::{VerdictCounts, features_with_baseline, verdict_counts};
pub use batch::{
    BatchAnalysisResponse, BatchStatus, DEFAULT_POLL_INTERVAL, FileAnalysisResult, FileStatus,
    GoogleDriveBatchRequest, SimilarityLabel, Sleeper, TokioSleeper, poll_batch,
    similarity_label,
};
pub use cache::{Clock, ResultCache, SystemClock, cache_key};
pub use classify::{
    AnalysisResult, ResponseKind, classify, is_ai_mdx_response, is_analysis_response,
    is_individual_analysis_response,
};
pub use client::{AnalysisMode, ApiClient, Endpoint, UploadFile};
pub use config::{ClientConfig, DEFAULT_API_URL, cache_dir};
pub use domain::{
    AiMdxResponse, AnalysisMethodsResponse, AnalysisResponse, CodeAnalysisRequest, HealthStatus,
    IndividualAnalysisResponse,
};
pub use error::{CodelensError, Result, error_message};
pub use language::detect_language;
pub use report::{
    ConfidenceLevel, ExportedReport, export_file_name, format_file_size, format_percent, render_analysis_markdown,
    render_batch_markdown, render_json, write_export,
};
pub use store::{DirStore, KeyValueStore, MemoryStore};
pub use transport::{HttpTransport, Method, RequestBody, ReqwestTransport};
