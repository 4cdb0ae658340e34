//! Stability and static-text predicates.
//!
//! A selector is only worth emitting if the tokens it leans on will still
//! be there tomorrow. Build pipelines churn generated class names
//! (`css-1q2w3e`, `jss42`, `sc-bdVaJa`) on every deploy, and text nodes
//! churn timestamps and counters on every render. These predicates are the
//! gatekeepers every strategy consults before using an id, class,
//! attribute value, or text fragment.

use std::sync::OnceLock;

use regex::Regex;

/// Compiled unstable-value patterns plus the static-text heuristics.
///
/// Built once from configuration and shared (behind an `Arc`) with every
/// strategy worker.
#[derive(Debug)]
pub struct StabilityPolicy {
    unstable: Vec<Regex>,
}

impl StabilityPolicy {
    /// Compile the configured pattern list. Patterns that fail to compile
    /// are skipped; an over-permissive policy only costs selector quality,
    /// never correctness, since every candidate is verified against the
    /// document anyway.
    pub fn new(patterns: &[String]) -> Self {
        Self { unstable: patterns.iter().filter_map(|p| Regex::new(p).ok()).collect() }
    }

    /// Policy with the default pattern list.
    pub fn with_defaults() -> Self {
        Self::new(&magpie_common::config::SelectorsConfig::default().unstable_patterns)
    }

    /// True if `value` looks hand-written rather than machine-generated.
    pub fn is_stable(&self, value: &str) -> bool {
        !value.is_empty() && !self.unstable.iter().any(|pattern| pattern.is_match(value))
    }

    /// Stable id usable in selectors: stable *and* a plain CSS identifier,
    /// so it needs no escaping in either `#id` or `[@id='...']` form.
    pub fn is_stable_id(&self, id: &str) -> bool {
        is_css_identifier(id) && self.is_stable(id)
    }

    /// Stable class token, same identifier restriction as ids.
    pub fn is_stable_class(&self, class: &str) -> bool {
        is_css_identifier(class) && self.is_stable(class)
    }

    /// Stable attribute value: stable and quotable in both selector
    /// grammars (no quotes of either kind).
    pub fn is_stable_attr_value(&self, value: &str) -> bool {
        !value.contains('"') && !value.contains('\'') && self.is_stable(value)
    }

    /// True if `text` is content-invariant: no timestamps, dates,
    /// counters, or currency amounts, not a bare number, and short enough
    /// to be a label rather than prose.
    pub fn is_static_text(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || text.len() > 60 {
            return false;
        }
        !volatile_text_patterns().iter().any(|pattern| pattern.is_match(text))
    }
}

/// Patterns marking text as render-variant.
fn volatile_text_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Clock times: 14:30, 2:05:59
            r"\d{1,2}:\d{2}",
            // ISO and slashed dates
            r"\d{4}-\d{2}-\d{2}",
            r"\d{1,2}/\d{1,2}/\d{2,4}",
            // Counter badges: (3), [12]
            r"[(\[]\d+[)\]]",
            // Currency amounts
            r"[$€£¥]\s*\d",
            // Bare numbers
            r"^\d+([.,]\d+)?$",
            // Relative-time phrases
            r"(?i)\b\d+\s+(second|minute|hour|day|week|month|year)s?\s+ago\b",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// True if `value` can appear verbatim as a CSS identifier (id or class
/// token) without escaping.
pub fn is_css_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else { return false };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_generated_names_are_unstable() {
        let policy = StabilityPolicy::with_defaults();
        for value in [
            "MuiButton-root",
            "makeStyles-root-42",
            "css-1q2w3e",
            "jss421",
            "sc-bdVaJa",
            "emotion-0",
            "lwc-3abc",
            "_ngcontent4",
            "item-17",
            "col_3",
            "42",
            "3f2a8b1c-9d4e-4f6a-8b2c-1d3e5f7a9b0c",
        ] {
            assert!(!policy.is_stable(value), "{value} should be unstable");
        }
    }

    #[test]
    fn hand_written_names_are_stable() {
        let policy = StabilityPolicy::with_defaults();
        for value in ["submit-button", "hero", "nav", "primary", "searchForm"] {
            assert!(policy.is_stable(value), "{value} should be stable");
        }
    }

    #[test]
    fn identifier_restriction_applies_to_ids() {
        let policy = StabilityPolicy::with_defaults();
        assert!(policy.is_stable_id("hero"));
        assert!(!policy.is_stable_id("hero section"));
        assert!(!policy.is_stable_id("1hero"));
        assert!(!policy.is_stable_id(""));
    }

    #[test]
    fn volatile_text_rejected() {
        let policy = StabilityPolicy::with_defaults();
        assert!(policy.is_static_text("Submit"));
        assert!(policy.is_static_text("Create account"));
        assert!(!policy.is_static_text("Updated 14:30"));
        assert!(!policy.is_static_text("2026-01-15"));
        assert!(!policy.is_static_text("Inbox (3)"));
        assert!(!policy.is_static_text("$19.99"));
        assert!(!policy.is_static_text("42"));
        assert!(!policy.is_static_text("5 minutes ago"));
        assert!(!policy.is_static_text(""));
    }

    #[test]
    fn quotes_block_attribute_values() {
        let policy = StabilityPolicy::with_defaults();
        assert!(policy.is_stable_attr_value("main-nav"));
        assert!(!policy.is_stable_attr_value("say \"hi\""));
        assert!(!policy.is_stable_attr_value("it's"));
    }
}
