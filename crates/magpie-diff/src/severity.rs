//! Severity classification for property differences.
//!
//! Severity is assigned per difference with a strict precedence: critical
//! beats high beats medium beats low, and the first rule that fires wins.
//! Two kinds of rules participate at each level: membership in a
//! configured property list, and value-aware heuristics (layout breakage,
//! perceptual color shift) that can escalate a property the lists alone
//! would rank lower.

use std::collections::BTreeSet;

use magpie_common::config::SeverityConfig;
use magpie_normalize::{Rgba, parse_px};
use serde::Serialize;
use strum_macros::Display;

use crate::category::DiffCategory;

/// Difference severity, ordered so `max()` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// Cosmetic only.
    Low,
    /// Noticeable spacing/border shifts.
    Medium,
    /// Strong visual or typographic impact.
    High,
    /// Layout-breaking or visibility-changing.
    Critical,
}

/// `display` values whose family change is layout-breaking.
const DISPLAY_FAMILIES: [&str; 4] = ["block", "flex", "grid", "inline-block"];

/// The severity analyzer: configured property lists + fixed heuristics.
#[derive(Debug, Clone)]
pub struct SeverityAnalyzer {
    critical: BTreeSet<String>,
    high: BTreeSet<String>,
    medium: BTreeSet<String>,
}

impl SeverityAnalyzer {
    /// Build from the configured property lists.
    pub fn new(config: &SeverityConfig) -> Self {
        Self {
            critical: config.critical.clone(),
            high: config.high.clone(),
            medium: config.medium.clone(),
        }
    }

    /// Classify one modified property.
    ///
    /// `base` and `compare` are the normalized values (either may be empty
    /// for added/removed differences).
    pub fn severity_of(
        &self,
        property: &str,
        base: &str,
        compare: &str,
        category: DiffCategory,
    ) -> Severity {
        if self.critical.contains(property) || is_layout_breaking(property, base, compare) {
            return Severity::Critical;
        }
        if self.high.contains(property) || is_high_visual_impact(property, base, compare) {
            return Severity::High;
        }
        if self.medium.contains(property) || category == DiffCategory::Layout {
            return Severity::Medium;
        }
        Severity::Low
    }
}

/// Layout-breaking heuristics, the "page falls apart" cases.
fn is_layout_breaking(property: &str, base: &str, compare: &str) -> bool {
    match property {
        "display" => {
            if base == "none" || compare == "none" {
                return true;
            }
            let base_in_family = DISPLAY_FAMILIES.contains(&base);
            let compare_in_family = DISPLAY_FAMILIES.contains(&compare);
            base_in_family != compare_in_family
        }
        "position" => {
            base != compare
                && (matches!(base, "absolute" | "fixed") || matches!(compare, "absolute" | "fixed"))
        }
        "width" | "height" => relative_change_exceeds(base, compare, 50.0),
        _ => false,
    }
}

/// High-visual-impact heuristics: perceptually large changes to paint.
fn is_high_visual_impact(property: &str, base: &str, compare: &str) -> bool {
    if property == "opacity" {
        if let (Ok(a), Ok(b)) = (base.parse::<f64>(), compare.parse::<f64>()) {
            return (a - b).abs() > 0.3;
        }
        return false;
    }
    if property.contains("color") {
        if let (Some(a), Some(b)) = (Rgba::parse(base), Rgba::parse(compare)) {
            return (a.relative_luminance() - b.relative_luminance()).abs() > 0.4;
        }
        return false;
    }
    if property == "font-size" {
        return relative_change_exceeds(base, compare, 25.0);
    }
    false
}

/// |Δ| / base × 100 > threshold, over parsed px values.
fn relative_change_exceeds(base: &str, compare: &str, threshold_percent: f64) -> bool {
    let (Some(a), Some(b)) = (parse_px(base), parse_px(compare)) else { return false };
    if a == 0.0 {
        return b != 0.0;
    }
    ((a - b).abs() / a.abs()) * 100.0 > threshold_percent
}

/// The worst severity present, for per-element and overall rollups.
pub fn overall_severity(severities: impl IntoIterator<Item = Severity>) -> Option<Severity> {
    severities.into_iter().max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> SeverityAnalyzer {
        SeverityAnalyzer::new(&SeverityConfig::default())
    }

    #[test]
    fn display_to_none_is_critical() {
        // block -> none disappears content.
        let severity = analyzer().severity_of("display", "block", "none", DiffCategory::Layout);
        assert_eq!(severity, Severity::Critical);
    }

    #[test]
    fn display_family_flip_is_critical() {
        let a = analyzer();
        assert_eq!(a.severity_of("display", "flex", "inline", DiffCategory::Layout), Severity::Critical);
        // Within-family changes still hit the critical property list.
        assert_eq!(a.severity_of("display", "flex", "grid", DiffCategory::Layout), Severity::Critical);
    }

    #[test]
    fn position_mode_changes() {
        let a = analyzer();
        assert_eq!(
            a.severity_of("position", "static", "absolute", DiffCategory::Position),
            Severity::Critical
        );
        assert_eq!(
            a.severity_of("top", "10px", "20px", DiffCategory::Position),
            Severity::Low
        );
    }

    #[test]
    fn width_over_50_percent_is_critical() {
        let a = analyzer();
        assert_eq!(
            a.severity_of("width", "100.00px", "49.00px", DiffCategory::Layout),
            Severity::Critical
        );
        // Under the threshold, width falls back to the high list.
        assert_eq!(
            a.severity_of("width", "100.00px", "80.00px", DiffCategory::Layout),
            Severity::High
        );
    }

    #[test]
    fn luminance_shift_escalates_unlisted_color() {
        let a = analyzer();
        // border-top-color is in no list; white -> black luminance delta = 1.
        assert_eq!(
            a.severity_of(
                "border-top-color",
                "rgba(255, 255, 255, 1)",
                "rgba(0, 0, 0, 1)",
                DiffCategory::Visual
            ),
            Severity::High
        );
        // A tiny shift stays wherever the lists put it (nowhere = low).
        assert_eq!(
            a.severity_of(
                "border-top-color",
                "rgba(250, 250, 250, 1)",
                "rgba(255, 255, 255, 1)",
                DiffCategory::Visual
            ),
            Severity::Low
        );
    }

    #[test]
    fn opacity_thresholds() {
        let a = analyzer();
        // opacity is in the high list regardless; check the heuristic via
        // an unlisted alias is not possible, so check ordering instead.
        assert_eq!(a.severity_of("opacity", "1", "0.5", DiffCategory::Visual), Severity::High);
    }

    #[test]
    fn medium_from_list_or_layout_category() {
        let a = analyzer();
        assert_eq!(
            a.severity_of("margin-top", "8.00px", "16.00px", DiffCategory::Spacing),
            Severity::Medium
        );
        // Unlisted property with layout category gets medium.
        assert_eq!(
            a.severity_of("flex-basis", "auto", "0", DiffCategory::Layout),
            Severity::Medium
        );
    }

    #[test]
    fn overall_is_the_maximum() {
        assert_eq!(
            overall_severity([Severity::Low, Severity::Critical, Severity::Medium]),
            Some(Severity::Critical)
        );
        assert_eq!(overall_severity([]), None);
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
