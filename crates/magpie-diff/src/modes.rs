//! Comparison modes and summary assembly.
//!
//! The engine ships two filter presets. *Static* mode is strict visual
//! regression: every property counts, text is compared, tolerances are
//! tight. *Dynamic* mode tolerates content churn: image/cursor properties
//! are ignored, text is skipped, only structural attributes are diffed,
//! and tolerances loosen. Both presets can be overridden from
//! configuration.

use magpie_common::config::{MagpieConfig, ModeConfig, Tolerances};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::differ::ElementComparison;
use crate::severity::Severity;

/// The two preconfigured comparison modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComparisonMode {
    /// Strict visual regression.
    Static,
    /// Resilient to content churn.
    Dynamic,
}

/// The per-mode filter handed to the differ.
#[derive(Debug, Clone)]
pub struct ModeFilter {
    /// Properties excluded from diffing.
    pub ignored_properties: std::collections::BTreeSet<String>,
    /// Whether trimmed text content is diffed.
    pub compare_text_content: bool,
    /// Whether attribute diffs are restricted to the structural list.
    pub structural_attributes_only: bool,
    /// The structural attribute allow-list.
    pub structural_attributes: std::collections::BTreeSet<String>,
    /// Numeric tolerances for significance checks.
    pub tolerances: Tolerances,
}

impl ModeFilter {
    /// Resolve the filter for `mode` from configuration.
    pub fn for_mode(config: &MagpieConfig, mode: ComparisonMode) -> Self {
        let preset: &ModeConfig = match mode {
            ComparisonMode::Static => &config.comparison.modes.static_mode,
            ComparisonMode::Dynamic => &config.comparison.modes.dynamic,
        };
        Self {
            ignored_properties: preset.ignored_properties.clone(),
            compare_text_content: preset.compare_text_content,
            structural_attributes_only: preset.structural_attributes_only,
            structural_attributes: preset.structural_attributes.clone(),
            tolerances: preset.tolerances,
        }
    }
}

/// Per-severity difference counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityCounts {
    /// Critical differences.
    pub critical: usize,
    /// High differences.
    pub high: usize,
    /// Medium differences.
    pub medium: usize,
    /// Low differences.
    pub low: usize,
}

impl SeverityCounts {
    /// Bump the counter for one severity.
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    /// Merge another set of counts into this one.
    pub fn merge(&mut self, other: &Self) {
        self.critical += other.critical;
        self.high += other.high;
        self.medium += other.medium;
        self.low += other.low;
    }

    /// Total differences across all severities.
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// The per-mode comparison summary.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    /// Matched elements compared.
    pub total_elements: usize,
    /// Elements with no reported differences.
    pub unchanged_elements: usize,
    /// Elements with at least one difference.
    pub modified_elements: usize,
    /// Sum of all reported differences.
    pub total_differences: usize,
    /// Differences bucketed by severity.
    pub severity_counts: SeverityCounts,
}

impl ComparisonSummary {
    /// Fold one element result into the summary.
    pub fn accumulate(&mut self, result: &ElementComparison) {
        self.total_elements += 1;
        if result.differences.is_empty() {
            self.unchanged_elements += 1;
        } else {
            self.modified_elements += 1;
        }
        self.total_differences += result.total_differences;
        for difference in &result.differences {
            self.severity_counts.record(difference.severity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&ComparisonMode::Static).unwrap(), "\"static\"");
        assert_eq!(ComparisonMode::Dynamic.to_string(), "dynamic");
        let parsed: ComparisonMode = serde_json::from_str("\"dynamic\"").unwrap();
        assert_eq!(parsed, ComparisonMode::Dynamic);
    }

    #[test]
    fn static_and_dynamic_presets_differ() {
        let config = MagpieConfig::default();
        let static_filter = ModeFilter::for_mode(&config, ComparisonMode::Static);
        let dynamic_filter = ModeFilter::for_mode(&config, ComparisonMode::Dynamic);

        assert!(static_filter.ignored_properties.is_empty());
        assert!(static_filter.compare_text_content);
        assert!(!static_filter.structural_attributes_only);
        assert_eq!(static_filter.tolerances.color, 5.0);

        assert!(dynamic_filter.ignored_properties.contains("cursor"));
        assert!(!dynamic_filter.compare_text_content);
        assert!(dynamic_filter.structural_attributes_only);
    }

    #[test]
    fn severity_counts_arithmetic() {
        let mut counts = SeverityCounts::default();
        counts.record(Severity::Critical);
        counts.record(Severity::Low);
        counts.record(Severity::Low);
        let mut other = SeverityCounts::default();
        other.record(Severity::High);
        counts.merge(&other);
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.high, 1);
        assert_eq!(counts.low, 2);
        assert_eq!(counts.total(), 4);
    }
}
