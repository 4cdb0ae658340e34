//! CSS length canonicalization.
//!
//! [CSS Values and Units Level 4](https://www.w3.org/TR/css-values-4/)
//!
//! Lengths arrive in whatever unit the page author picked; the differ wants
//! them all in px. Absolute units convert unconditionally; font- and
//! viewport-relative units convert only when a [`LayoutContext`] supplies
//! the reference they need, and otherwise pass through unchanged so the
//! diff falls back to string comparison rather than guessing.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// User agent default root font size, used to resolve `rem`.
///
/// [§ 3.5 font-size](https://www.w3.org/TR/css-fonts-4/#font-size-prop)
pub const DEFAULT_ROOT_FONT_SIZE_PX: f64 = 16.0;

/// Layout references needed to resolve context-dependent units.
///
/// All fields are optional; a missing reference makes the units that need
/// it pass through. The struct is also the cache fingerprint for
/// context-dependent normalization, so it serializes with a stable field
/// order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutContext {
    /// The element's computed font size in px (`em` reference).
    pub font_size: Option<f64>,
    /// The parent's computed font size in px (`%` reference for font-size).
    pub parent_font_size: Option<f64>,
    /// The parent's content width in px (`%` reference for widths/margins).
    pub parent_width: Option<f64>,
    /// The parent's content height in px (`%` reference for heights).
    pub parent_height: Option<f64>,
    /// Viewport width in px (`vw` reference).
    pub viewport_width: Option<f64>,
    /// Viewport height in px (`vh` reference).
    pub viewport_height: Option<f64>,
}

impl LayoutContext {
    /// True when no reference is available at all; such a context behaves
    /// like `None`.
    pub fn is_vacant(&self) -> bool {
        *self == Self::default()
    }
}

/// Which box edge a percentage resolves against.
///
/// [§ 4.3 Percentages](https://www.w3.org/TR/css-values-4/#percentages)
/// "percentage values are always relative to another value"; which value
/// depends on the property. Margins and paddings resolve against the
/// containing block's *width*, even the vertical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PercentBase {
    ParentWidth,
    ParentHeight,
    ParentFontSize,
}

fn percent_base(property: &str) -> PercentBase {
    if property == "font-size" {
        return PercentBase::ParentFontSize;
    }
    if property.contains("height") || property == "top" || property == "bottom" {
        return PercentBase::ParentHeight;
    }
    PercentBase::ParentWidth
}

/// Keywords the unit normalizer passes through untouched.
const PASS_THROUGH_KEYWORDS: [&str; 5] = ["auto", "none", "inherit", "initial", "unset"];

fn value_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(-?\d+(?:\.\d+)?)([a-z%]*)$").unwrap_or_else(|_| unreachable!())
    })
}

/// True if the raw value mentions a unit that needs layout context.
///
/// Drives the normalization engine's cache-tier split: values matching this
/// are keyed with the context fingerprint.
pub fn is_context_dependent(value: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"\d(em|rem|%|vw|vh|vmin|vmax)(\s|$|,|\))").unwrap_or_else(|_| unreachable!())
    });
    pattern.is_match(value)
}

/// Canonicalize one length value for `property`.
///
/// - keywords and unparseable values return unchanged
/// - bare `0` becomes `0px`
/// - absolute units convert to px, rounded to `decimals` places
/// - relative units convert when `context` provides their reference and
///   otherwise return unchanged (deliberately no 16px guess)
/// - values already in px are kept verbatim; the differ compares px
///   numerically, so `16px` and `16.00px` are already equal to it
pub fn normalize_length(
    property: &str,
    value: &str,
    context: Option<&LayoutContext>,
    decimals: u32,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || PASS_THROUGH_KEYWORDS.iter().any(|k| trimmed.eq_ignore_ascii_case(k)) {
        return value.to_owned();
    }
    if trimmed == "0" {
        return "0px".to_owned();
    }

    let lower = trimmed.to_ascii_lowercase();
    let Some(captures) = value_pattern().captures(&lower) else {
        return value.to_owned();
    };
    let Ok(number) = captures[1].parse::<f64>() else {
        return value.to_owned();
    };
    let unit = &captures[2];

    let px = match unit {
        "px" => return value.to_owned(),
        // [§ 6.1 Absolute lengths](https://www.w3.org/TR/css-values-4/#absolute-lengths)
        "pt" => Some(number * 1.3333),
        "pc" => Some(number * 16.0),
        "in" => Some(number * 96.0),
        "cm" => Some(number * 37.795_275_590_6),
        "mm" => Some(number * 3.779_527_559_06),
        "q" => Some(number * 0.944_881_889_76),
        // [§ 5.1.1 Font-relative lengths](https://www.w3.org/TR/css-values-4/#font-relative-lengths)
        "em" => context.and_then(|c| c.font_size).map(|font_size| number * font_size),
        "rem" => context.map(|_| number * DEFAULT_ROOT_FONT_SIZE_PX),
        "%" => resolve_percent(property, number, context),
        // [§ 5.1.2 Viewport-percentage lengths](https://www.w3.org/TR/css-values-4/#viewport-relative-lengths)
        "vw" => context.and_then(|c| c.viewport_width).map(|w| number * w / 100.0),
        "vh" => context.and_then(|c| c.viewport_height).map(|h| number * h / 100.0),
        "vmin" => viewport_extent(context, f64::min).map(|v| number * v / 100.0),
        "vmax" => viewport_extent(context, f64::max).map(|v| number * v / 100.0),
        // Unitless non-zero numbers (line-height multipliers, z-index) and
        // unknown units return unchanged.
        _ => None,
    };

    px.map_or_else(|| value.to_owned(), |px| format_px(px, decimals))
}

fn resolve_percent(property: &str, number: f64, context: Option<&LayoutContext>) -> Option<f64> {
    let context = context?;
    let base = match percent_base(property) {
        PercentBase::ParentWidth => context.parent_width,
        PercentBase::ParentHeight => context.parent_height,
        PercentBase::ParentFontSize => context.parent_font_size,
    }?;
    // A zero reference makes the percentage meaningless; keep the token.
    if base == 0.0 {
        return None;
    }
    Some(number * base / 100.0)
}

fn viewport_extent(context: Option<&LayoutContext>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    let context = context?;
    match (context.viewport_width, context.viewport_height) {
        (Some(w), Some(h)) => Some(pick(w, h)),
        _ => None,
    }
}

/// Format a converted px value with the configured number of decimals.
fn format_px(px: f64, decimals: u32) -> String {
    format!("{px:.precision$}px", precision = decimals as usize)
}

/// Parse a `<number>px` string back to its number, for tolerance checks.
pub fn parse_px(value: &str) -> Option<f64> {
    let lower = value.trim().to_ascii_lowercase();
    if lower == "0" {
        return Some(0.0);
    }
    lower.strip_suffix("px")?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_context() -> LayoutContext {
        LayoutContext {
            font_size: Some(16.0),
            parent_font_size: Some(20.0),
            parent_width: Some(800.0),
            parent_height: Some(600.0),
            viewport_width: Some(1280.0),
            viewport_height: Some(720.0),
        }
    }

    #[test]
    fn zero_and_keywords() {
        assert_eq!(normalize_length("width", "0", None, 2), "0px");
        assert_eq!(normalize_length("width", "auto", None, 2), "auto");
        assert_eq!(normalize_length("height", "inherit", None, 2), "inherit");
    }

    #[test]
    fn absolute_units_convert_without_context() {
        assert_eq!(normalize_length("font-size", "12pt", None, 2), "16.00px");
        assert_eq!(normalize_length("width", "1in", None, 2), "96.00px");
        assert_eq!(normalize_length("width", "2pc", None, 2), "32.00px");
        assert_eq!(normalize_length("width", "1cm", None, 2), "37.80px");
        assert_eq!(normalize_length("width", "10mm", None, 2), "37.80px");
        assert_eq!(normalize_length("width", "4q", None, 2), "3.78px");
    }

    #[test]
    fn em_needs_font_size() {
        let ctx = full_context();
        // 1em with a 16px font context normalizes to 16.00px.
        assert_eq!(normalize_length("width", "1em", Some(&ctx), 2), "16.00px");
        assert_eq!(normalize_length("width", "1.5em", Some(&ctx), 2), "24.00px");
        // No context: token survives (no 16px guess).
        assert_eq!(normalize_length("width", "1em", None, 2), "1em");
    }

    #[test]
    fn rem_resolves_against_root_default() {
        let ctx = full_context();
        assert_eq!(normalize_length("margin-top", "2rem", Some(&ctx), 2), "32.00px");
        assert_eq!(normalize_length("margin-top", "2rem", None, 2), "2rem");
    }

    #[test]
    fn percent_bases_by_property() {
        let ctx = full_context();
        assert_eq!(normalize_length("width", "50%", Some(&ctx), 2), "400.00px");
        assert_eq!(normalize_length("height", "50%", Some(&ctx), 2), "300.00px");
        assert_eq!(normalize_length("font-size", "150%", Some(&ctx), 2), "30.00px");
        // Margins resolve against parent *width*, vertical ones included.
        assert_eq!(normalize_length("margin-top", "10%", Some(&ctx), 2), "80.00px");
        assert_eq!(normalize_length("top", "10%", Some(&ctx), 2), "60.00px");
    }

    #[test]
    fn percent_with_zero_or_missing_reference_survives() {
        let ctx = LayoutContext { parent_width: Some(0.0), ..LayoutContext::default() };
        assert_eq!(normalize_length("width", "50%", Some(&ctx), 2), "50%");
        assert_eq!(normalize_length("width", "50%", None, 2), "50%");
    }

    #[test]
    fn viewport_units() {
        let ctx = full_context();
        assert_eq!(normalize_length("width", "10vw", Some(&ctx), 2), "128.00px");
        assert_eq!(normalize_length("height", "10vh", Some(&ctx), 2), "72.00px");
        assert_eq!(normalize_length("width", "10vmin", Some(&ctx), 2), "72.00px");
        assert_eq!(normalize_length("width", "10vmax", Some(&ctx), 2), "128.00px");
    }

    #[test]
    fn px_and_unitless_pass_through() {
        assert_eq!(normalize_length("width", "16px", None, 2), "16px");
        assert_eq!(normalize_length("line-height", "1.5", None, 2), "1.5");
        assert_eq!(normalize_length("width", "wide", None, 2), "wide");
    }

    #[test]
    fn rounding_respects_decimals() {
        let ctx = full_context();
        assert_eq!(normalize_length("width", "1pt", Some(&ctx), 2), "1.33px");
        assert_eq!(normalize_length("width", "1pt", Some(&ctx), 1), "1.3px");
        assert_eq!(normalize_length("width", "1pt", Some(&ctx), 0), "1px");
    }

    #[test]
    fn context_dependence_detection() {
        assert!(is_context_dependent("1em"));
        assert!(is_context_dependent("50%"));
        assert!(is_context_dependent("10vmin"));
        assert!(!is_context_dependent("16px"));
        assert!(!is_context_dependent("12pt"));
        assert!(!is_context_dependent("auto"));
    }

    #[test]
    fn px_parsing() {
        assert_eq!(parse_px("16.00px"), Some(16.0));
        assert_eq!(parse_px(" 16px "), Some(16.0));
        assert_eq!(parse_px("0"), Some(0.0));
        assert_eq!(parse_px("16em"), None);
    }
}
