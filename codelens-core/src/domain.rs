//! Wire entities exchanged with the analysis backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat mapping of feature names to measured values.
pub type FeatureMap = BTreeMap<String, f64>;

/// Source code submitted for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeAnalysisRequest {
    /// Source code to analyze.
    pub code: String,
    /// Filename used by the backend for context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Programming language of the code.
    pub language: String,
}

impl CodeAnalysisRequest {
    /// Build a request, naming the file `code.<language>` when no filename is given.
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        let language = language.into();
        Self {
            code: code.into(),
            filename: Some(format!("code.{language}")),
            language,
        }
    }

    /// Override the filename sent with the request.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Chart hint attached to a feature group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationType {
    /// Bar chart.
    Bar,
    /// Radar chart.
    Radar,
    /// Box plot.
    Boxplot,
    /// Line chart.
    Line,
}

/// Verdict of a single baseline comparison.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Closer to the AI-written corpus.
    #[serde(rename = "ai-like")]
    AiLike,
    /// Closer to the human-written corpus.
    #[serde(rename = "human-like")]
    HumanLike,
    /// No meaningful lean either way.
    #[serde(rename = "neutral")]
    Neutral,
}

impl Verdict {
    /// Wire label for the verdict.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::AiLike => "ai-like",
            Verdict::HumanLike => "human-like",
            Verdict::Neutral => "neutral",
        }
    }
}

/// Precomputed comparison of a feature against the AI and human corpora.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    /// Mean value in the AI-written corpus.
    pub ai_baseline: f64,
    /// Mean value in the human-written corpus.
    pub human_baseline: f64,
    /// Value measured on the submitted code.
    pub current_value: f64,
    /// Similarity to the AI corpus, 0-1.
    pub ai_similarity: f64,
    /// Similarity to the human corpus, 0-1.
    pub human_similarity: f64,
    /// Which corpus the value leans toward.
    pub verdict: Verdict,
    /// Confidence in the verdict, 0-1.
    pub confidence: f64,
    /// Backend explanation of the verdict.
    pub explanation: String,
}

/// Aggregate of all baseline comparisons in an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSummary {
    /// Average similarity to the AI corpus, 0-1.
    pub overall_ai_similarity: f64,
    /// Average similarity to the human corpus, 0-1.
    pub overall_human_similarity: f64,
    /// Number of features judged ai-like.
    pub ai_like_features: u32,
    /// Number of features judged human-like.
    pub human_like_features: u32,
    /// Number of neutral features.
    pub neutral_features: u32,
    /// Feature names pointing most strongly toward AI authorship.
    #[serde(default)]
    pub strongest_ai_indicators: Vec<String>,
    /// Feature names pointing most strongly toward human authorship.
    #[serde(default)]
    pub strongest_human_indicators: Vec<String>,
}

/// A single weighted feature measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfo {
    /// Feature name.
    pub name: String,
    /// Measured value.
    pub value: f64,
    /// Whether the value is normalized to 0-1.
    pub normalized: bool,
    /// Human-readable interpretation.
    pub interpretation: String,
    /// Weight of the feature in its group score.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Comparison against the baseline corpora, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_comparison: Option<BaselineComparison>,
}

fn default_weight() -> f64 {
    1.0
}

/// A named group of related features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroup {
    /// Display name of the group.
    pub group_name: String,
    /// Group description.
    pub description: String,
    /// Features in the group.
    pub features: Vec<FeatureInfo>,
    /// Aggregate score of the group.
    pub group_score: f64,
    /// Preferred chart type.
    pub visualization_type: VisualizationType,
}

/// The fixed set of feature groups returned by combined analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroups {
    /// Code structure metrics.
    pub structure_metrics: FeatureGroup,
    /// Coding style metrics.
    pub style_metrics: FeatureGroup,
    /// Complexity metrics.
    pub complexity_metrics: FeatureGroup,
    /// AI pattern detection metrics.
    pub ai_detection_metrics: FeatureGroup,
}

impl FeatureGroups {
    /// Groups paired with their wire keys, in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FeatureGroup)> {
        [
            ("structure_metrics", &self.structure_metrics),
            ("style_metrics", &self.style_metrics),
            ("complexity_metrics", &self.complexity_metrics),
            ("ai_detection_metrics", &self.ai_detection_metrics),
        ]
        .into_iter()
    }
}

/// Overall AI-likelihood assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// 0 = human-like, 1 = AI-like.
    pub overall_score: f64,
    /// Confidence level, 0-1.
    pub confidence: f64,
    /// Indicators that drove the score.
    #[serde(default)]
    pub key_indicators: Vec<String>,
    /// Free-text summary.
    pub summary: String,
    /// Baseline comparison summary, when the backend has baselines loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_summary: Option<BaselineSummary>,
}

/// Basic information about the analyzed code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeInfo {
    /// Filename the backend used.
    pub filename: String,
    /// Language the backend used.
    pub language: String,
    /// Lines of code.
    pub loc: u64,
    /// Size in bytes.
    pub file_size: u64,
}

/// Combined, feature-grouped analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Whether the backend completed the analysis.
    pub success: bool,
    /// Backend identifier of this analysis.
    pub analysis_id: String,
    /// Backend timestamp.
    pub timestamp: String,
    /// Code metadata.
    pub code_info: CodeInfo,
    /// Grouped features.
    pub feature_groups: FeatureGroups,
    /// Overall assessment.
    pub assessment: AssessmentResult,
    /// Every extracted feature, ungrouped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_features: Option<FeatureMap>,
}

/// Single-method analysis with a flat feature map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualAnalysisResponse {
    /// Whether the backend completed the analysis.
    pub success: bool,
    /// Backend identifier of this analysis.
    pub analysis_id: String,
    /// Backend timestamp.
    pub timestamp: String,
    /// Method tag, e.g. `ast`.
    pub analysis_type: String,
    /// Code metadata.
    pub code_info: CodeInfo,
    /// Extracted features.
    pub features: FeatureMap,
    /// Free-text summary.
    pub summary: String,
}

/// Narrative AI analysis delivered as an MDX document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMdxResponse {
    /// Whether the backend completed the analysis.
    pub success: bool,
    /// Backend identifier of this analysis.
    pub analysis_id: String,
    /// Backend timestamp.
    pub timestamp: String,
    /// Always `ai_mdx`.
    pub analysis_type: String,
    /// Markdown/MDX reasoning.
    pub mdx_content: String,
    /// Code metadata, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_info: Option<CodeInfo>,
}

/// One analysis mode advertised by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMethod {
    /// Mode identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description of the mode.
    pub description: String,
    /// Feature families covered.
    #[serde(default)]
    pub features: Vec<String>,
    /// Rough duration, e.g. `1-2 seconds`.
    pub estimated_time: String,
}

/// Available analysis modes and submission limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMethodsResponse {
    /// Available modes.
    pub methods: Vec<AnalysisMethod>,
    /// Accepted languages.
    pub supported_languages: Vec<String>,
    /// Accepted file extensions.
    pub supported_extensions: Vec<String>,
    /// Upload limit as reported, e.g. `1MB`.
    pub max_file_size: String,
    /// Maximum code length in characters.
    pub max_code_length: u64,
}

/// Backend liveness report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status, e.g. `healthy`.
    pub status: String,
    /// Backend timestamp.
    pub timestamp: String,
    /// Availability of each analysis module.
    #[serde(default)]
    pub modules: BTreeMap<String, bool>,
}

/// Error body returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error detail; a string for most errors, a list for validation failures.
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// Detail rendered as a message, if it carries any text.
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) if text.is_empty() => None,
            serde_json::Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}
