//! Element report data model.
//!
//! A *report* is one snapshot of a rendered page: page metadata plus a flat
//! list of enriched element descriptors produced by the external extractor.
//! The comparison engine consumes two reports and never touches a live DOM,
//! so these types are the whole input surface of the core.
//!
//! Wire format is camelCase JSON, matching what the extractor emits
//! (`tagName`, `textContent`, ...).

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error type for report loading.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The report file could not be read.
    #[error("failed to read report: {0}")]
    Io(#[from] std::io::Error),
    /// The report is not valid JSON or has the wrong shape.
    #[error("failed to parse report: {0}")]
    Parse(#[from] serde_json::Error),
    /// Element ids are not unique within the report.
    #[error("duplicate element id '{0}' in report")]
    DuplicateElementId(String),
}

/// Absolute page coordinates of an element, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Distance from the left page edge.
    pub x: f64,
    /// Distance from the top page edge.
    pub y: f64,
}

impl Position {
    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.hypot(dy)
    }
}

/// Precomputed selectors stamped onto a descriptor at extraction time.
///
/// Confidences are the 0-100 robustness score of the strategy tier that
/// produced the selector, not a per-element measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorSet {
    /// Unique CSS selector, or empty when generation was skipped.
    pub css: String,
    /// Robustness score of the CSS selector (0-100).
    pub css_confidence: u8,
    /// Unique XPath, or empty when generation was skipped.
    pub xpath: String,
    /// Robustness score of the XPath (0-100).
    pub xpath_confidence: u8,
}

/// One enriched DOM element as reported by the extractor.
///
/// Invariant: within a single report, `id` is unique, and a non-empty
/// `selectors.css`/`selectors.xpath` matched exactly one element in the
/// originating document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementDescriptor {
    /// Opaque identifier, unique within the report.
    pub id: String,
    /// Lowercase element tag.
    pub tag_name: String,
    /// The DOM `id` attribute value, or empty.
    pub element_id: String,
    /// Raw `class` attribute string.
    pub class_name: String,
    /// All attributes, name to value.
    pub attributes: BTreeMap<String, String>,
    /// Trimmed visible text (possibly empty).
    pub text_content: String,
    /// Computed styles, CSS property name to raw value string.
    pub styles: BTreeMap<String, String>,
    /// Absolute page position, when known.
    pub position: Option<Position>,
    /// Precomputed selectors.
    pub selectors: SelectorSet,
}

impl ElementDescriptor {
    /// Look up an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Class names from the raw class string, in attribute order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.class_name.split_whitespace()
    }

    /// A short human-readable handle for summaries: the selector if one
    /// exists, otherwise tag plus DOM id.
    pub fn display_handle(&self) -> String {
        if !self.selectors.css.is_empty() {
            return self.selectors.css.clone();
        }
        if self.element_id.is_empty() {
            self.tag_name.clone()
        } else {
            format!("{}#{}", self.tag_name, self.element_id)
        }
    }
}

/// One snapshot of a rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Opaque report identifier.
    pub id: String,
    /// URL the snapshot was taken from.
    pub url: String,
    /// Page title at capture time.
    pub title: String,
    /// Capture timestamp.
    pub timestamp: DateTime<Utc>,
    /// All extracted elements, in extraction (document) order.
    pub elements: Vec<ElementDescriptor>,
}

impl Report {
    /// Parse a report from a JSON string and validate its id invariant.
    pub fn from_json_str(text: &str) -> Result<Self, ReportError> {
        let report: Self = serde_json::from_str(text)?;
        report.validate()?;
        Ok(report)
    }

    /// Read and parse a report from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ReportError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Check the per-report invariant that element ids are unique.
    pub fn validate(&self) -> Result<(), ReportError> {
        let mut seen = HashSet::new();
        for element in &self.elements {
            if !seen.insert(element.id.as_str()) {
                return Err(ReportError::DuplicateElementId(element.id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r##"{
            "id": "r1",
            "url": "https://example.com",
            "title": "Example",
            "timestamp": "2026-05-01T12:00:00Z",
            "elements": [
                {
                    "id": "e1",
                    "tagName": "button",
                    "elementId": "submit",
                    "className": "btn btn-primary",
                    "attributes": { "data-testid": "submit" },
                    "textContent": "Submit",
                    "styles": { "color": "#fff", "display": "block" },
                    "position": { "x": 100.0, "y": 240.5 },
                    "selectors": {
                        "css": "#submit",
                        "cssConfidence": 100,
                        "xpath": "//*[@id='submit']",
                        "xpathConfidence": 90
                    }
                }
            ]
        }"##
    }

    #[test]
    fn parses_camel_case_wire_format() {
        let report = Report::from_json_str(sample_json()).unwrap();
        assert_eq!(report.elements.len(), 1);
        let element = &report.elements[0];
        assert_eq!(element.tag_name, "button");
        assert_eq!(element.element_id, "submit");
        assert_eq!(element.attribute("data-testid"), Some("submit"));
        assert_eq!(element.selectors.css_confidence, 100);
        assert_eq!(element.position.unwrap().y, 240.5);
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{
            "id": "r1", "url": "u", "title": "t",
            "timestamp": "2026-05-01T12:00:00Z",
            "elements": [ { "id": "e1", "tagName": "div" } ]
        }"#;
        let report = Report::from_json_str(json).unwrap();
        let element = &report.elements[0];
        assert!(element.position.is_none());
        assert!(element.styles.is_empty());
        assert!(element.selectors.css.is_empty());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let json = r#"{
            "id": "r1", "url": "u", "title": "t",
            "timestamp": "2026-05-01T12:00:00Z",
            "elements": [
                { "id": "e1", "tagName": "div" },
                { "id": "e1", "tagName": "span" }
            ]
        }"#;
        assert!(matches!(
            Report::from_json_str(json),
            Err(ReportError::DuplicateElementId(id)) if id == "e1"
        ));
    }

    #[test]
    fn classes_split_on_whitespace() {
        let mut element = ElementDescriptor { class_name: " btn  btn-primary ".into(), ..Default::default() };
        assert_eq!(element.classes().collect::<Vec<_>>(), vec!["btn", "btn-primary"]);
        element.class_name.clear();
        assert_eq!(element.classes().count(), 0);
    }

    #[test]
    fn position_distance() {
        let a = Position { x: 0.0, y: 0.0 };
        let b = Position { x: 3.0, y: 4.0 };
        assert_eq!(a.distance_to(&b), 5.0);
    }
}
