//! Frozen configuration for the comparison engine.
//!
//! A [`MagpieConfig`] is built once (from defaults or a JSON file), then
//! shared read-only by every subsystem. No subsystem mutates it; tunables
//! that change per comparison (the mode) are passed as call arguments
//! instead.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The config file is not valid JSON or has the wrong shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Root configuration object.
///
/// Every field has a spec'd default, so `MagpieConfig::default()` is a fully
/// working configuration and a JSON file only needs to override the keys it
/// cares about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MagpieConfig {
    /// Matching, diffing, and severity tunables.
    pub comparison: ComparisonConfig,
    /// Style normalization tunables.
    pub normalization: NormalizationConfig,
    /// Selector generation tunables.
    pub selectors: SelectorsConfig,
    /// Attribute priority used for test-attribute matching.
    pub attributes: AttributesConfig,
}

impl MagpieConfig {
    /// Load a configuration from a JSON file, falling back to defaults for
    /// any key the file omits.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Comparison-stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComparisonConfig {
    /// Match confidence thresholds.
    pub confidence: ConfidenceConfig,
    /// Position-strategy matching tunables.
    pub matching: MatchingConfig,
    /// Per-mode filter presets.
    pub modes: ModesConfig,
    /// Property lists driving severity classification.
    pub severity: SeverityConfig,
    /// Property lists driving category classification.
    pub property_categories: PropertyCategories,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            confidence: ConfidenceConfig::default(),
            matching: MatchingConfig::default(),
            modes: ModesConfig::default(),
            severity: SeverityConfig::default(),
            property_categories: PropertyCategories::default(),
        }
    }
}

/// Confidence thresholds for element matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfidenceConfig {
    /// Minimum confidence for a match to be emitted.
    pub min: f64,
    /// Confidence at which the matcher stops trying weaker strategies.
    pub high: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self { min: 0.5, high: 0.9 }
    }
}

/// Position-strategy tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchingConfig {
    /// Maximum Euclidean distance (CSS px) for a positional match.
    pub position_tolerance: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { position_tolerance: 50.0 }
    }
}

/// The two preconfigured comparison filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModesConfig {
    /// Strict visual-regression preset.
    #[serde(rename = "static")]
    pub static_mode: ModeConfig,
    /// Content-churn-resilient preset.
    pub dynamic: ModeConfig,
}

impl Default for ModesConfig {
    fn default() -> Self {
        Self {
            static_mode: ModeConfig::static_default(),
            dynamic: ModeConfig::dynamic_default(),
        }
    }
}

/// One mode's filter preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModeConfig {
    /// Properties excluded from diffing entirely.
    pub ignored_properties: BTreeSet<String>,
    /// Whether trimmed text content is diffed.
    pub compare_text_content: bool,
    /// Whether attribute diffs are restricted to the structural allow-list.
    pub structural_attributes_only: bool,
    /// The structural attribute allow-list, when restriction is on.
    pub structural_attributes: BTreeSet<String>,
    /// Numeric tolerances below which a modification is insignificant.
    pub tolerances: Tolerances,
}

impl ModeConfig {
    /// The static (strict) preset.
    pub fn static_default() -> Self {
        Self {
            ignored_properties: BTreeSet::new(),
            compare_text_content: true,
            structural_attributes_only: false,
            structural_attributes: default_structural_attributes(),
            tolerances: Tolerances { color: 5.0, size: 3.0, opacity: 0.01 },
        }
    }

    /// The dynamic (content-churn-resilient) preset.
    pub fn dynamic_default() -> Self {
        Self {
            ignored_properties: ["background-image", "content", "cursor", "pointer-events"]
                .into_iter()
                .map(String::from)
                .collect(),
            compare_text_content: false,
            structural_attributes_only: true,
            structural_attributes: default_structural_attributes(),
            tolerances: Tolerances { color: 10.0, size: 5.0, opacity: 0.05 },
        }
    }
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self::static_default()
    }
}

/// Attributes still compared when `structural_attributes_only` is set.
fn default_structural_attributes() -> BTreeSet<String> {
    ["role", "aria-label", "type", "name", "data-testid"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Per-type numeric tolerances for significance testing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tolerances {
    /// Maximum per-channel RGB delta considered equal.
    pub color: f64,
    /// Maximum px delta considered equal.
    pub size: f64,
    /// Maximum opacity/alpha delta considered equal.
    pub opacity: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { color: 5.0, size: 3.0, opacity: 0.01 }
    }
}

/// Property lists that force a difference into a severity level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeverityConfig {
    /// Properties whose modification is always critical.
    pub critical: BTreeSet<String>,
    /// Properties whose modification is at least high.
    pub high: BTreeSet<String>,
    /// Properties whose modification is at least medium.
    pub medium: BTreeSet<String>,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            critical: ["display", "visibility", "position", "z-index"]
                .into_iter()
                .map(String::from)
                .collect(),
            high: [
                "width",
                "height",
                "max-width",
                "max-height",
                "min-width",
                "min-height",
                "color",
                "background-color",
                "opacity",
                "font-size",
                "font-family",
                "font-weight",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            medium: [
                "margin",
                "margin-top",
                "margin-right",
                "margin-bottom",
                "margin-left",
                "padding",
                "padding-top",
                "padding-right",
                "padding-bottom",
                "padding-left",
                "border",
                "border-width",
                "border-style",
                "border-color",
                "line-height",
                "text-align",
                "font-style",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Property lists mapping CSS properties to diff categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyCategories {
    /// Box-tree shaping properties.
    pub layout: BTreeSet<String>,
    /// Paint-affecting properties.
    pub visual: BTreeSet<String>,
    /// Text rendering properties.
    pub typography: BTreeSet<String>,
    /// Margin/padding/gap properties.
    pub spacing: BTreeSet<String>,
    /// Offset properties for positioned boxes.
    pub position: BTreeSet<String>,
}

impl Default for PropertyCategories {
    fn default() -> Self {
        Self {
            layout: [
                "display",
                "width",
                "height",
                "max-width",
                "max-height",
                "min-width",
                "min-height",
                "float",
                "clear",
                "overflow",
                "overflow-x",
                "overflow-y",
                "box-sizing",
                "flex-direction",
                "flex-wrap",
                "flex-grow",
                "flex-shrink",
                "flex-basis",
                "justify-content",
                "align-items",
                "align-content",
                "align-self",
                "grid-template-columns",
                "grid-template-rows",
                "grid-auto-flow",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            visual: [
                "color",
                "background",
                "background-color",
                "background-image",
                "border-color",
                "border-top-color",
                "border-right-color",
                "border-bottom-color",
                "border-left-color",
                "border-style",
                "border-width",
                "border-radius",
                "box-shadow",
                "opacity",
                "visibility",
                "outline-color",
                "text-decoration-color",
                "caret-color",
                "column-rule-color",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            typography: [
                "font-family",
                "font-size",
                "font-weight",
                "font-style",
                "font-variant",
                "line-height",
                "letter-spacing",
                "word-spacing",
                "text-align",
                "text-transform",
                "text-decoration",
                "text-indent",
                "white-space",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            spacing: [
                "margin",
                "margin-top",
                "margin-right",
                "margin-bottom",
                "margin-left",
                "padding",
                "padding-top",
                "padding-right",
                "padding-bottom",
                "padding-left",
                "gap",
                "row-gap",
                "column-gap",
                "grid-gap",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            position: ["position", "top", "right", "bottom", "left", "z-index", "transform"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Normalization-stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizationConfig {
    /// Normalization cache sizing.
    pub cache: CacheConfig,
    /// Numeric rounding applied to converted values.
    pub rounding: RoundingConfig,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self { cache: CacheConfig::default(), rounding: RoundingConfig::default() }
    }
}

/// Normalization cache sizing.
///
/// The relative (context-dependent) tier is always allocated half the
/// absolute tier's capacity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Whether normalized values are cached at all.
    pub enabled: bool,
    /// Capacity of the absolute (context-free) tier.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, max_entries: 2048 }
    }
}

/// Rounding convention for unit conversion output.
///
/// Applied uniformly to every converted number; there is deliberately only
/// one decimals knob for the whole engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoundingConfig {
    /// Number of decimal places in formatted px/percent output.
    pub decimals: u32,
}

impl Default for RoundingConfig {
    fn default() -> Self {
        Self { decimals: 2 }
    }
}

/// Selector generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorsConfig {
    /// CSS strategy execution bounds.
    pub css: StrategyBudget,
    /// XPath strategy execution bounds.
    pub xpath: StrategyBudget,
    /// Regex patterns marking an id/class/attribute value as machine
    /// generated (and therefore unusable in a selector).
    pub unstable_patterns: Vec<String>,
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            css: StrategyBudget { per_strategy_timeout_ms: 50 },
            xpath: StrategyBudget { per_strategy_timeout_ms: 80 },
            unstable_patterns: default_unstable_patterns(),
        }
    }
}

/// Time budget for a single selector strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategyBudget {
    /// Per-strategy timeout in milliseconds.
    pub per_strategy_timeout_ms: u64,
}

impl Default for StrategyBudget {
    fn default() -> Self {
        Self { per_strategy_timeout_ms: 50 }
    }
}

/// Default unstable-value patterns, covering the common CSS-in-JS and
/// framework-generated naming schemes.
fn default_unstable_patterns() -> Vec<String> {
    [
        r"^Mui",
        r"makeStyles-",
        r"^css-[a-z0-9]+$",
        r"^jss\d+",
        r"^sc-",
        r"^emotion-",
        r"lwc-",
        r"^_[a-z0-9]{5,}$",
        r"-\d+$",
        r"_\d+$",
        r"^\d+$",
        r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Attribute-priority configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributesConfig {
    /// Ordered attribute names; the first four are used for test-attribute
    /// matching and the whole list ranks selector attribute candidates.
    pub priority: Vec<String>,
}

impl Default for AttributesConfig {
    fn default() -> Self {
        Self {
            priority: [
                "data-testid",
                "data-test",
                "data-qa",
                "data-cy",
                "data-automation-id",
                "name",
                "aria-label",
                "role",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}
