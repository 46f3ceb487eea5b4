//! Structural classification of analysis payloads.
//!
//! The backend does not tag its three analysis shapes consistently, so a raw
//! payload is identified by which fields it carries. [`classify`] is the single
//! entry point: exactly one shape must match; anything else is an
//! [`CodelensError::UnrecognizedResponse`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{AiMdxResponse, AnalysisResponse, IndividualAnalysisResponse};
use crate::error::{CodelensError, Result};

/// `analysis_type` value carried by narrative AI responses.
pub const AI_MDX_TAG: &str = "ai_mdx";

/// The three analysis shapes the backend can return.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    /// Combined, feature-grouped analysis.
    Combined,
    /// Single-method analysis with a flat feature map.
    Individual,
    /// Narrative AI analysis as MDX.
    AiMdx,
}

impl ResponseKind {
    /// Short label for the shape.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Combined => "combined",
            ResponseKind::Individual => "individual",
            ResponseKind::AiMdx => "ai_mdx",
        }
    }
}

/// A classified analysis result.
///
/// Serializes to the backend's original payload; deserializing goes through
/// [`classify`], so stored results are held to the same shape rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    /// Combined, feature-grouped analysis.
    Combined(AnalysisResponse),
    /// Single-method analysis.
    Individual(IndividualAnalysisResponse),
    /// Narrative AI analysis.
    AiMdx(AiMdxResponse),
}

impl AnalysisResult {
    /// Which shape this result has.
    pub fn kind(&self) -> ResponseKind {
        match self {
            AnalysisResult::Combined(_) => ResponseKind::Combined,
            AnalysisResult::Individual(_) => ResponseKind::Individual,
            AnalysisResult::AiMdx(_) => ResponseKind::AiMdx,
        }
    }

    /// Backend identifier of the analysis.
    pub fn analysis_id(&self) -> &str {
        match self {
            AnalysisResult::Combined(response) => &response.analysis_id,
            AnalysisResult::Individual(response) => &response.analysis_id,
            AnalysisResult::AiMdx(response) => &response.analysis_id,
        }
    }

    /// Whether this is a combined analysis.
    pub fn is_analysis_response(&self) -> bool {
        matches!(self, AnalysisResult::Combined(_))
    }

    /// Whether this is an individual analysis.
    pub fn is_individual_analysis_response(&self) -> bool {
        matches!(self, AnalysisResult::Individual(_))
    }

    /// Whether this is a narrative AI analysis.
    pub fn is_ai_mdx_response(&self) -> bool {
        matches!(self, AnalysisResult::AiMdx(_))
    }
}

impl<'de> Deserialize<'de> for AnalysisResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        classify(value).map_err(serde::de::Error::custom)
    }
}

impl From<AnalysisResponse> for AnalysisResult {
    fn from(value: AnalysisResponse) -> Self {
        Self::Combined(value)
    }
}

impl From<IndividualAnalysisResponse> for AnalysisResult {
    fn from(value: IndividualAnalysisResponse) -> Self {
        Self::Individual(value)
    }
}

impl From<AiMdxResponse> for AnalysisResult {
    fn from(value: AiMdxResponse) -> Self {
        Self::AiMdx(value)
    }
}

fn has(value: &Value, key: &str) -> bool {
    value.get(key).is_some()
}

/// True iff both `feature_groups` and `assessment` are present.
pub fn is_analysis_response(value: &Value) -> bool {
    has(value, "feature_groups") && has(value, "assessment")
}

/// True iff `mdx_content` is present and `analysis_type` equals `ai_mdx`.
pub fn is_ai_mdx_response(value: &Value) -> bool {
    has(value, "mdx_content")
        && value.get("analysis_type").and_then(Value::as_str) == Some(AI_MDX_TAG)
}

/// True iff `analysis_type` and `features` are present and `mdx_content` is absent.
pub fn is_individual_analysis_response(value: &Value) -> bool {
    has(value, "analysis_type") && has(value, "features") && !has(value, "mdx_content")
}

/// Every shape whose predicate holds for the payload.
pub fn matching_kinds(value: &Value) -> Vec<ResponseKind> {
    let mut kinds = Vec::new();
    if is_analysis_response(value) {
        kinds.push(ResponseKind::Combined);
    }
    if is_individual_analysis_response(value) {
        kinds.push(ResponseKind::Individual);
    }
    if is_ai_mdx_response(value) {
        kinds.push(ResponseKind::AiMdx);
    }
    kinds
}

/// Identify and decode a raw payload, failing unless exactly one shape matches.
pub fn classify(value: Value) -> Result<AnalysisResult> {
    let kinds = matching_kinds(&value);
    let kind = match kinds.as_slice() {
        [kind] => *kind,
        [] => {
            return Err(CodelensError::UnrecognizedResponse(format!(
                "no known shape matches fields [{}]",
                field_names(&value)
            )));
        }
        many => {
            let labels: Vec<&str> = many.iter().map(ResponseKind::as_str).collect();
            return Err(CodelensError::UnrecognizedResponse(format!(
                "ambiguous payload matches {}",
                labels.join(", ")
            )));
        }
    };
    decode(kind, value)
}

fn decode(kind: ResponseKind, value: Value) -> Result<AnalysisResult> {
    let decoded = match kind {
        ResponseKind::Combined => serde_json::from_value(value).map(AnalysisResult::Combined),
        ResponseKind::Individual => serde_json::from_value(value).map(AnalysisResult::Individual),
        ResponseKind::AiMdx => serde_json::from_value(value).map(AnalysisResult::AiMdx),
    };
    decoded.map_err(|err| {
        CodelensError::UnrecognizedResponse(format!("{} payload is malformed: {err}", kind.as_str()))
    })
}

fn field_names(value: &Value) -> String {
    match value.as_object() {
        Some(map) => map.keys().cloned().collect::<Vec<_>>().join(", "),
        None => "not an object".to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures;
    use super::*;
    use serde_json::json;

    #[test]
    fn combined_payload_matches_only_analysis_predicate() {
        let value = fixtures::combined();
        assert!(is_analysis_response(&value));
        assert!(!is_individual_analysis_response(&value));
        assert!(!is_ai_mdx_response(&value));
    }

    #[test]
    fn ai_mdx_payload_matches_only_mdx_predicate() {
        let value = fixtures::ai_mdx();
        assert!(is_ai_mdx_response(&value));
        assert!(!is_individual_analysis_response(&value));
        assert!(!is_analysis_response(&value));
    }

    #[test]
    fn mdx_content_excludes_individual_even_with_features() {
        let mut value = fixtures::ai_mdx();
        value["features"] = json!({"loc": 3.0});
        assert!(is_ai_mdx_response(&value));
        assert!(!is_individual_analysis_response(&value));
        let result = classify(value).expect("classify");
        assert_eq!(result.kind(), ResponseKind::AiMdx);
    }

    #[test]
    fn mdx_predicate_requires_exact_tag() {
        let mut value = fixtures::ai_mdx();
        value["analysis_type"] = json!("gemini");
        assert!(!is_ai_mdx_response(&value));
        let err = classify(value).unwrap_err();
        assert!(matches!(err, CodelensError::UnrecognizedResponse(_)));
    }

    #[test]
    fn classify_decodes_each_shape() {
        let combined = classify(fixtures::combined()).expect("combined");
        assert!(combined.is_analysis_response());
        assert_eq!(combined.analysis_id(), "analysis_0123456789ab");

        let individual = classify(fixtures::individual()).expect("individual");
        assert!(individual.is_individual_analysis_response());
        match individual {
            AnalysisResult::Individual(response) => {
                assert_eq!(response.analysis_type, "ast");
                assert_eq!(response.features["max_nesting_depth"], 2.0);
            }
            other => panic!("expected individual, got {:?}", other.kind()),
        }

        let mdx = classify(fixtures::ai_mdx()).expect("mdx");
        assert!(mdx.is_ai_mdx_response());
    }

    #[test]
    fn classify_rejects_unknown_shape() {
        let err = classify(json!({"success": true, "analysis_id": "x"})).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("no known shape"));
        assert!(message.contains("analysis_id"));
    }

    #[test]
    fn classify_rejects_ambiguous_payload() {
        let mut value = fixtures::combined();
        value["analysis_type"] = json!("combined");
        value["features"] = json!({});
        assert_eq!(
            matching_kinds(&value),
            vec![ResponseKind::Combined, ResponseKind::Individual]
        );
        let err = classify(value).unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn classify_reports_malformed_matching_shape() {
        let value = json!({"feature_groups": {}, "assessment": {}});
        let err = classify(value).unwrap_err();
        assert!(err.to_string().contains("combined payload is malformed"));
    }

    #[test]
    fn classify_rejects_non_objects() {
        let err = classify(json!([1, 2, 3])).unwrap_err();
        assert!(err.to_string().contains("not an object"));
    }

    #[test]
    fn untagged_result_serializes_to_original_shape() {
        let result = classify(fixtures::individual()).expect("individual");
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value, fixtures::individual());
    }

    #[test]
    fn deserializing_a_result_applies_classification() {
        let parsed: AnalysisResult =
            serde_json::from_value(fixtures::ai_mdx()).expect("deserialize");
        assert!(parsed.is_ai_mdx_response());

        let err = serde_json::from_value::<AnalysisResult>(json!({"detail": "x"})).unwrap_err();
        assert!(err.to_string().contains("unrecognized response shape"));
    }
}
