//! End-to-end report comparison.
//!
//! [`Comparator`] wires the whole core together: match the two element
//! lists, diff every matched pair under the selected mode's filter,
//! aggregate the summary, and wrap everything in a serializable envelope
//! with report metadata, match statistics, and timing.
//!
//! All collaborators are built once from the frozen configuration; the
//! comparator itself is immutable and reusable across comparisons. Mode
//! selection is a typed enum, so a misspelled mode keyword dies at the
//! boundary (deserialization or CLI parsing), never inside the pipeline.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use magpie_common::config::MagpieConfig;
use magpie_common::diagnostics::Diagnostics;
use magpie_diff::{ComparisonMode, ComparisonSummary, ElementComparison, ModeFilter, PropertyDiffer};
use magpie_match::{ElementMatcher, MatchOutcome};
use magpie_normalize::StyleNormalizer;
use magpie_report::{ElementDescriptor, Report};
use serde::Serialize;

/// Report metadata echoed into the result envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    /// Report id.
    pub id: String,
    /// Captured URL.
    pub url: String,
    /// Page title.
    pub title: String,
    /// Capture timestamp.
    pub timestamp: DateTime<Utc>,
    /// Element count.
    pub total_elements: usize,
}

impl ReportMeta {
    fn from_report(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            url: report.url.clone(),
            title: report.title.clone(),
            timestamp: report.timestamp,
            total_elements: report.elements.len(),
        }
    }
}

/// Match statistics for the envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingStats {
    /// Matched pair count.
    pub total_matched: usize,
    /// Baseline elements without a partner.
    pub unmatched_baseline: usize,
    /// Compare elements never claimed.
    pub unmatched_compare: usize,
    /// `round(matched / baseline × 100)`, 0 for an empty baseline.
    pub match_rate: u32,
}

/// Compact identity of an unmatched element.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSummary {
    /// The element's report id.
    pub id: String,
    /// Tag name.
    pub tag_name: String,
    /// Best available handle (selector or tag#id).
    pub selector: String,
}

impl ElementSummary {
    fn from_descriptor(element: &ElementDescriptor) -> Self {
        Self {
            id: element.id.clone(),
            tag_name: element.tag_name.clone(),
            selector: element.display_handle(),
        }
    }
}

/// Unmatched elements on both sides.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedElements {
    /// Removed relative to baseline.
    pub baseline: Vec<ElementSummary>,
    /// Added relative to baseline.
    pub compare: Vec<ElementSummary>,
}

/// The per-mode comparison payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonPayload {
    /// The mode that produced these results.
    pub mode: ComparisonMode,
    /// Per-matched-element results, in baseline order.
    pub results: Vec<ElementComparison>,
    /// Aggregated summary.
    pub summary: ComparisonSummary,
}

/// The full comparison result envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// Baseline report metadata.
    pub baseline: ReportMeta,
    /// Compare report metadata.
    pub compare: ReportMeta,
    /// The mode used.
    pub mode: ComparisonMode,
    /// Match statistics.
    pub matching: MatchingStats,
    /// Per-element results and summary.
    pub comparison: ComparisonPayload,
    /// Elements that found no partner.
    pub unmatched_elements: UnmatchedElements,
    /// Wall-clock duration of the comparison, in milliseconds.
    pub duration: u64,
    /// When the comparison ran.
    pub timestamp: DateTime<Utc>,
}

/// The comparison facade.
pub struct Comparator {
    config: MagpieConfig,
    matcher: ElementMatcher,
    differ: PropertyDiffer,
    normalizer: Arc<StyleNormalizer>,
    diagnostics: Arc<Diagnostics>,
}

impl Comparator {
    /// Build a comparator with silent diagnostics.
    pub fn new(config: MagpieConfig) -> Self {
        Self::with_diagnostics(config, Arc::new(Diagnostics::new()))
    }

    /// Build a comparator sharing an external diagnostics collector.
    pub fn with_diagnostics(config: MagpieConfig, diagnostics: Arc<Diagnostics>) -> Self {
        let normalizer =
            Arc::new(StyleNormalizer::new(config.normalization.clone(), Arc::clone(&diagnostics)));
        let matcher = ElementMatcher::new(&config);
        let differ = PropertyDiffer::new(&config, Arc::clone(&normalizer));
        Self { config, matcher, differ, normalizer, diagnostics }
    }

    /// The frozen configuration this comparator was built with.
    pub fn config(&self) -> &MagpieConfig {
        &self.config
    }

    /// Recovered-error counts accumulated so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Normalization cache hit-rate statistics, when caching is enabled.
    pub fn cache_stats(&self) -> Option<magpie_normalize::CacheStats> {
        self.normalizer.cache_stats()
    }

    /// Compare two reports under the given mode.
    pub fn compare(
        &self,
        baseline: &Report,
        compare: &Report,
        mode: ComparisonMode,
    ) -> ComparisonResult {
        let started = Instant::now();
        let filter = ModeFilter::for_mode(&self.config, mode);

        let outcome = self.matcher.match_elements(&baseline.elements, &compare.elements);

        let mut results = Vec::with_capacity(outcome.matches.len());
        let mut summary = ComparisonSummary::default();
        for matched in &outcome.matches {
            let base_element = &baseline.elements[matched.baseline_index];
            let compare_element = &compare.elements[matched.compare_index];
            let result = self.differ.compare_elements(base_element, compare_element, &filter);
            summary.accumulate(&result);
            results.push(result);
        }

        ComparisonResult {
            baseline: ReportMeta::from_report(baseline),
            compare: ReportMeta::from_report(compare),
            mode,
            matching: matching_stats(&outcome, baseline.elements.len()),
            comparison: ComparisonPayload { mode, results, summary },
            unmatched_elements: UnmatchedElements {
                baseline: outcome
                    .unmatched_baseline
                    .iter()
                    .map(|&i| ElementSummary::from_descriptor(&baseline.elements[i]))
                    .collect(),
                compare: outcome
                    .unmatched_compare
                    .iter()
                    .map(|&i| ElementSummary::from_descriptor(&compare.elements[i]))
                    .collect(),
            },
            duration: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        }
    }
}

fn matching_stats(outcome: &MatchOutcome, baseline_total: usize) -> MatchingStats {
    let match_rate = if baseline_total == 0 {
        0
    } else {
        ((outcome.matches.len() as f64 / baseline_total as f64) * 100.0).round() as u32
    };
    MatchingStats {
        total_matched: outcome.matches.len(),
        unmatched_baseline: outcome.unmatched_baseline.len(),
        unmatched_compare: outcome.unmatched_compare.len(),
        match_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use magpie_diff::Severity;
    use magpie_report::SelectorSet;

    fn report(id: &str, elements: Vec<ElementDescriptor>) -> Report {
        Report {
            id: id.to_owned(),
            url: "https://example.com".to_owned(),
            title: "Example".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap(),
            elements,
        }
    }

    fn button(report_id: &str, test_id: &str, styles: &[(&str, &str)]) -> ElementDescriptor {
        ElementDescriptor {
            id: report_id.to_owned(),
            tag_name: "button".to_owned(),
            attributes: [("data-testid".to_owned(), test_id.to_owned())].into_iter().collect(),
            styles: styles.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
            selectors: SelectorSet {
                css: format!("[data-testid=\"{test_id}\"]"),
                css_confidence: 95,
                xpath: format!("//*[@data-testid='{test_id}']"),
                xpath_confidence: 97,
            },
            ..Default::default()
        }
    }

    #[test]
    fn end_to_end_envelope() {
        let comparator = Comparator::new(MagpieConfig::default());
        let baseline = report(
            "base",
            vec![
                button("b1", "submit", &[("color", "#ff0000"), ("display", "block")]),
                button("b2", "cancel", &[("color", "blue")]),
            ],
        );
        let compare = report(
            "head",
            vec![
                button("c1", "submit", &[("color", "rgb(253, 1, 0)"), ("display", "none")]),
                button("c3", "help", &[("color", "green")]),
            ],
        );

        let result = comparator.compare(&baseline, &compare, ComparisonMode::Static);

        assert_eq!(result.baseline.total_elements, 2);
        assert_eq!(result.matching.total_matched, 1);
        assert_eq!(result.matching.unmatched_baseline, 1);
        assert_eq!(result.matching.unmatched_compare, 1);
        assert_eq!(result.matching.match_rate, 50);

        // The matched pair differs only in display (color is within
        // tolerance), and display:block -> none is critical.
        assert_eq!(result.comparison.results.len(), 1);
        let element_result = &result.comparison.results[0];
        assert_eq!(element_result.total_differences, 1);
        assert_eq!(element_result.differences[0].property, "display");
        assert_eq!(element_result.differences[0].severity, Severity::Critical);

        assert_eq!(result.comparison.summary.total_elements, 1);
        assert_eq!(result.comparison.summary.modified_elements, 1);
        assert_eq!(result.comparison.summary.severity_counts.critical, 1);

        assert_eq!(result.unmatched_elements.baseline[0].id, "b2");
        assert_eq!(result.unmatched_elements.compare[0].id, "c3");
    }

    #[test]
    fn empty_reports_produce_well_formed_envelope() {
        let comparator = Comparator::new(MagpieConfig::default());
        let baseline = report("base", Vec::new());
        let compare = report("head", Vec::new());
        let result = comparator.compare(&baseline, &compare, ComparisonMode::Dynamic);
        assert_eq!(result.matching.total_matched, 0);
        assert_eq!(result.matching.match_rate, 0);
        assert!(result.comparison.results.is_empty());
        assert_eq!(result.comparison.summary.total_elements, 0);
    }

    #[test]
    fn envelope_serializes_camel_case() {
        let comparator = Comparator::new(MagpieConfig::default());
        let baseline = report("base", vec![button("b1", "go", &[])]);
        let compare = report("head", vec![button("c1", "go", &[])]);
        let result = comparator.compare(&baseline, &compare, ComparisonMode::Static);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["mode"], "static");
        assert!(json["matching"]["totalMatched"].is_number());
        assert!(json["comparison"]["summary"]["severityCounts"].is_object());
        assert!(json["unmatchedElements"]["baseline"].is_array());
        assert!(json["duration"].is_number());
    }

    #[test]
    fn unchanged_elements_counted() {
        let comparator = Comparator::new(MagpieConfig::default());
        let baseline = report("base", vec![button("b1", "go", &[("color", "red")])]);
        let compare = report("head", vec![button("c1", "go", &[("color", "#ff0000")])]);
        let result = comparator.compare(&baseline, &compare, ComparisonMode::Static);
        assert_eq!(result.comparison.summary.unchanged_elements, 1);
        assert_eq!(result.comparison.summary.total_differences, 0);
        // The normalizer's cache saw the color values.
        let stats = comparator.cache_stats().unwrap();
        assert!(stats.absolute_entries > 0);
    }
}
