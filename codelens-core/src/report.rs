//! Report export and rendering for analysis results.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::baseline::{features_with_baseline, verdict_counts};
use crate::batch::{BatchAnalysisResponse, FileStatus, similarity_label};
use crate::classify::AnalysisResult;
use crate::domain::{AnalysisResponse, BaselineSummary, FeatureGroup, IndividualAnalysisResponse};
use crate::error::Result;

/// Version stamped into every exported report.
pub const EXPORT_VERSION: &str = "1.0";

/// Analysis result wrapped with export metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedReport {
    /// The exported analysis.
    pub analysis: AnalysisResult,
    /// RFC 3339 export time.
    pub exported_at: String,
    /// Export format version.
    pub export_version: String,
}

impl ExportedReport {
    /// Wrap a result exported at `now`.
    pub fn new(analysis: AnalysisResult, now: DateTime<Utc>) -> Self {
        Self {
            analysis,
            exported_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            export_version: EXPORT_VERSION.to_string(),
        }
    }
}

/// File name used when exporting `result`.
pub fn export_file_name(result: &AnalysisResult) -> String {
    format!("analysis-report-{}.json", result.analysis_id())
}

/// Write `result` as a pretty-printed export into `dir`, returning the file path.
pub fn write_export(dir: &Path, result: &AnalysisResult, now: DateTime<Utc>) -> Result<PathBuf> {
    let report = ExportedReport::new(result.clone(), now);
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(result));
    std::fs::write(&path, render_json(&report)?)?;
    log::info!("exported analysis {} to {}", result.analysis_id(), path.display());
    Ok(path)
}

/// Render any serializable payload as pretty JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(payload)?)
}

/// Render an analysis result as Markdown.
pub fn render_analysis_markdown(result: &AnalysisResult) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Code Analysis Report\n");
    let _ = writeln!(output, "- Analysis: `{}`", result.analysis_id());
    let _ = writeln!(output, "- Type: {}", result.kind().as_str());
    match result {
        AnalysisResult::Combined(response) => append_combined(&mut output, response),
        AnalysisResult::Individual(response) => append_individual(&mut output, response),
        AnalysisResult::AiMdx(response) => {
            if let Some(info) = &response.code_info {
                let _ = writeln!(output, "- File: {} ({})", info.filename, info.language);
            }
            let _ = writeln!(output, "\n{}", response.mdx_content.trim_end());
        }
    }
    output
}

/// Render a batch as Markdown.
pub fn render_batch_markdown(batch: &BatchAnalysisResponse) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Batch Analysis Report\n");
    let _ = writeln!(output, "- Batch: `{}`", batch.batch_id);
    let _ = writeln!(output, "- Status: {}", batch.status.as_str());
    let _ = writeln!(
        output,
        "- Processed: {}/{} files",
        batch.processed_files, batch.total_files
    );
    if let Some(message) = &batch.message {
        let _ = writeln!(output, "- Message: {message}");
    }
    let _ = writeln!(output);

    if batch.results.is_empty() {
        let _ = writeln!(output, "### Files\nNo results yet.");
        return output;
    }
    let _ = writeln!(output, "### Files");
    let _ = writeln!(
        output,
        "| File | Status | AI | Human | Label | LOC | Size |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|");
    for file in &batch.results {
        match file.status {
            FileStatus::Success => {
                let _ = writeln!(
                    output,
                    "| {} | success | {:.1}% | {:.1}% | {} | {} | {} |",
                    file.filepath,
                    file.ai_similarity,
                    file.human_similarity,
                    similarity_label(file.ai_similarity, file.human_similarity).as_str(),
                    file.loc,
                    format_file_size(file.file_size)
                );
            }
            FileStatus::Error => {
                let _ = writeln!(
                    output,
                    "| {} | error: {} | - | - | - | - | - |",
                    file.filepath,
                    file.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }
    output
}

/// Format a 0-1 fraction as a percentage with one decimal.
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Coarse reading of an overall AI-likelihood score.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfidenceLevel {
    /// Below 0.6.
    Low,
    /// From 0.6 up to 0.8.
    Medium,
    /// 0.8 and above.
    High,
}

impl ConfidenceLevel {
    /// Bucket a 0-1 score.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceLevel::High
        } else if score >= 0.6 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }

    /// Reader-facing interpretation of the level.
    pub fn description(self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "likely written by the student",
            ConfidenceLevel::Medium => "suspected AI assistance",
            ConfidenceLevel::High => "very likely AI-generated",
        }
    }
}

/// Format a byte count using B/KB/MB/GB with at most two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

fn append_combined(output: &mut String, response: &AnalysisResponse) {
    let info = &response.code_info;
    let _ = writeln!(
        output,
        "- File: {} ({}, {} lines, {})",
        info.filename,
        info.language,
        info.loc,
        format_file_size(info.file_size)
    );
    let assessment = &response.assessment;
    let _ = writeln!(output, "\n## Assessment\n");
    let _ = writeln!(
        output,
        "- AI likelihood: {}",
        format_percent(assessment.overall_score)
    );
    let level = ConfidenceLevel::from_score(assessment.overall_score);
    let _ = writeln!(output, "- Level: {} ({})", level.as_str(), level.description());
    let _ = writeln!(output, "- Confidence: {}", format_percent(assessment.confidence));
    let _ = writeln!(output, "- Summary: {}", assessment.summary);
    let _ = writeln!(output);
    append_list(
        output,
        "Key indicators",
        &assessment.key_indicators,
        "No key indicators.",
    );

    for (_, group) in response.feature_groups.iter() {
        append_group(output, group);
    }

    if let Some(summary) = &assessment.baseline_summary {
        append_baseline_summary(output, summary);
    }
    let strongest = features_with_baseline(&response.feature_groups);
    if !strongest.is_empty() {
        let counts = verdict_counts(strongest.iter().copied());
        let _ = writeln!(
            output,
            "### Baseline comparisons ({} ai-like, {} human-like, {} neutral)",
            counts.ai_like, counts.human_like, counts.neutral
        );
        for feature in strongest {
            if let Some(cmp) = &feature.baseline_comparison {
                let _ = writeln!(
                    output,
                    "- {}: {} (AI {}, human {}) {}",
                    feature.name,
                    cmp.verdict.as_str(),
                    format_percent(cmp.ai_similarity),
                    format_percent(cmp.human_similarity),
                    cmp.explanation
                );
            }
        }
        let _ = writeln!(output);
    }
}

fn append_group(output: &mut String, group: &FeatureGroup) {
    let _ = writeln!(
        output,
        "### {} (score {:.2})",
        group.group_name, group.group_score
    );
    if group.features.is_empty() {
        let _ = writeln!(output, "No features.\n");
        return;
    }
    for feature in &group.features {
        let _ = writeln!(
            output,
            "- {}: {:.3} ({})",
            feature.name, feature.value, feature.interpretation
        );
    }
    let _ = writeln!(output);
}

fn append_baseline_summary(output: &mut String, summary: &BaselineSummary) {
    let _ = writeln!(output, "## Baseline summary\n");
    let _ = writeln!(
        output,
        "- AI similarity: {}",
        format_percent(summary.overall_ai_similarity)
    );
    let _ = writeln!(
        output,
        "- Human similarity: {}",
        format_percent(summary.overall_human_similarity)
    );
    let _ = writeln!(
        output,
        "- Features: {} ai-like, {} human-like, {} neutral",
        summary.ai_like_features, summary.human_like_features, summary.neutral_features
    );
    let _ = writeln!(output);
    append_list(
        output,
        "Strongest AI indicators",
        &summary.strongest_ai_indicators,
        "None.",
    );
    append_list(
        output,
        "Strongest human indicators",
        &summary.strongest_human_indicators,
        "None.",
    );
}

fn append_individual(output: &mut String, response: &IndividualAnalysisResponse) {
    let info = &response.code_info;
    let _ = writeln!(
        output,
        "- File: {} ({}, {} lines, {})",
        info.filename,
        info.language,
        info.loc,
        format_file_size(info.file_size)
    );
    let _ = writeln!(output, "- Summary: {}\n", response.summary);
    let _ = writeln!(output, "### Features ({})", response.analysis_type);
    if response.features.is_empty() {
        let _ = writeln!(output, "No features.");
        return;
    }
    for (name, value) in &response.features {
        let _ = writeln!(output, "- {name}: {value:.3}");
    }
}

fn append_list(output: &mut String, title: &str, items: &[String], empty_message: &str) {
    if items.is_empty() {
        let _ = writeln!(output, "### {title}\n{empty_message}\n");
        return;
    }
    let _ = writeln!(output, "### {title}");
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
    let _ = writeln!(output);
}
