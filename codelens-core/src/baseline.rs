//! Helpers over the backend's precomputed baseline comparisons.

use crate::domain::{FeatureGroups, FeatureInfo, Verdict};

/// Counts of features per verdict.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VerdictCounts {
    /// Features leaning toward AI authorship.
    pub ai_like: usize,
    /// Features leaning toward human authorship.
    pub human_like: usize,
    /// Features with no clear lean.
    pub neutral: usize,
}

/// Features carrying a baseline comparison, strongest signal first.
///
/// Signal strength is the gap between AI and human similarity.
pub fn features_with_baseline(groups: &FeatureGroups) -> Vec<&FeatureInfo> {
    let mut features: Vec<&FeatureInfo> = groups
        .iter()
        .flat_map(|(_, group)| group.features.iter())
        .filter(|feature| feature.baseline_comparison.is_some())
        .collect();
    features.sort_by(|a, b| {
        signal_strength(b)
            .partial_cmp(&signal_strength(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    features
}

fn signal_strength(feature: &FeatureInfo) -> f64 {
    feature
        .baseline_comparison
        .as_ref()
        .map(|cmp| (cmp.ai_similarity - cmp.human_similarity).abs())
        .unwrap_or(0.0)
}

/// Tally verdicts across features with baseline comparisons.
pub fn verdict_counts<'a>(features: impl IntoIterator<Item = &'a FeatureInfo>) -> VerdictCounts {
    let mut counts = VerdictCounts::default();
    for feature in features {
        match feature.baseline_comparison.as_ref().map(|cmp| cmp.verdict) {
            Some(Verdict::AiLike) => counts.ai_like += 1,
            Some(Verdict::HumanLike) => counts.human_like += 1,
            Some(Verdict::Neutral) => counts.neutral += 1,
            None => {}
        }
    }
    counts
}
