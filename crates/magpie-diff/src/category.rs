//! Property-to-category classification.

use magpie_common::config::PropertyCategories;
use serde::Serialize;
use strum_macros::Display;

/// What kind of change a difference represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiffCategory {
    /// Box-tree shaping.
    Layout,
    /// Paint.
    Visual,
    /// Text rendering.
    Typography,
    /// Margins, paddings, gaps.
    Spacing,
    /// Positioned-box offsets.
    Position,
    /// Text content changes.
    Content,
    /// Attribute changes.
    Attribute,
    /// Everything else.
    Other,
}

/// Classifier over the configured property lists.
///
/// First list containing the property wins, in the order layout, visual,
/// typography, spacing, position; the default lists are disjoint, so order
/// only matters for overlapping custom configurations.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    categories: PropertyCategories,
}

impl CategoryMap {
    /// Build from the configured lists.
    pub fn new(categories: &PropertyCategories) -> Self {
        Self { categories: categories.clone() }
    }

    /// The category for a CSS property; `Other` when unlisted.
    pub fn category_of(&self, property: &str) -> DiffCategory {
        if self.categories.layout.contains(property) {
            DiffCategory::Layout
        } else if self.categories.visual.contains(property) {
            DiffCategory::Visual
        } else if self.categories.typography.contains(property) {
            DiffCategory::Typography
        } else if self.categories.spacing.contains(property) {
            DiffCategory::Spacing
        } else if self.categories.position.contains(property) {
            DiffCategory::Position
        } else {
            DiffCategory::Other
        }
    }
}
