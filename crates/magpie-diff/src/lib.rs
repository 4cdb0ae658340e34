//! Property diffing, severity analysis, and comparison modes.
//!
//! Given a matched element pair, [`differ::PropertyDiffer`] reports the
//! significant per-property differences, [`severity::SeverityAnalyzer`]
//! ranks each one, and [`modes`] supplies the static/dynamic filter
//! presets plus the summary types the comparator aggregates into.

pub mod category;
pub mod differ;
pub mod modes;
pub mod severity;

pub use category::{CategoryMap, DiffCategory};
pub use differ::{DiffType, Difference, ElementComparison, PropertyDiffer};
pub use modes::{ComparisonMode, ComparisonSummary, ModeFilter, SeverityCounts};
pub use severity::{Severity, SeverityAnalyzer, overall_severity};
