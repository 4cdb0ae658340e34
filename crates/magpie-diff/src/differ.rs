//! Tolerance-aware property diffing for one matched element pair.
//!
//! Both style maps are normalized first, so the differ only ever compares
//! canonical forms. A modification is *reported* only when it is
//! significant: colors must move beyond the per-channel tolerance, sizes
//! beyond the px tolerance, opacity beyond the alpha tolerance. Everything
//! else is plain string inequality. Unchanged and insignificant properties
//! are implicitly unchanged and never emitted.

use std::collections::BTreeSet;
use std::sync::Arc;

use magpie_common::config::{MagpieConfig, Tolerances};
use magpie_normalize::{LayoutContext, Rgba, StyleNormalizer, parse_px};
use magpie_report::ElementDescriptor;
use serde::Serialize;
use strum_macros::Display;

use crate::category::{CategoryMap, DiffCategory};
use crate::modes::ModeFilter;
use crate::severity::{Severity, SeverityAnalyzer};

/// How the two sides of a property relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiffType {
    /// Present only on the compare side.
    Added,
    /// Present only on the baseline side.
    Removed,
    /// Present on both sides with a significant difference.
    Modified,
    /// Equal (or insignificantly different); not normally emitted.
    Unchanged,
}

/// One reported difference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Difference {
    /// CSS property name, `textContent`, or `attr:<name>`.
    pub property: String,
    /// Baseline value, absent for added properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_value: Option<String>,
    /// Compare value, absent for removed properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_value: Option<String>,
    /// Relation between the two sides.
    #[serde(rename = "type")]
    pub diff_type: DiffType,
    /// Property category.
    pub category: DiffCategory,
    /// Assigned severity.
    pub severity: Severity,
}

/// The diff result for one matched element pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementComparison {
    /// The baseline element's report id.
    pub element_id: String,
    /// The element's tag.
    pub tag_name: String,
    /// Number of reported differences.
    pub total_differences: usize,
    /// The differences, style properties first, then text, then attributes.
    pub differences: Vec<Difference>,
}

/// The property differ: normalizer + category map + severity analyzer.
pub struct PropertyDiffer {
    normalizer: Arc<StyleNormalizer>,
    categories: CategoryMap,
    severity: SeverityAnalyzer,
}

impl PropertyDiffer {
    /// Build a differ sharing the given normalizer.
    pub fn new(config: &MagpieConfig, normalizer: Arc<StyleNormalizer>) -> Self {
        Self {
            normalizer,
            categories: CategoryMap::new(&config.comparison.property_categories),
            severity: SeverityAnalyzer::new(&config.comparison.severity),
        }
    }

    /// Diff one matched pair under the given mode filter.
    pub fn compare_elements(
        &self,
        base: &ElementDescriptor,
        compare: &ElementDescriptor,
        filter: &ModeFilter,
    ) -> ElementComparison {
        let base_styles =
            self.normalizer.normalize(&base.styles, layout_context_for(base).as_ref());
        let compare_styles =
            self.normalizer.normalize(&compare.styles, layout_context_for(compare).as_ref());

        let mut differences = Vec::new();

        let properties: BTreeSet<&String> =
            base_styles.keys().chain(compare_styles.keys()).collect();
        for property in properties {
            if filter.ignored_properties.contains(property.as_str()) {
                continue;
            }
            let base_value = base_styles.get(property);
            let compare_value = compare_styles.get(property);
            let category = self.categories.category_of(property);
            match (base_value, compare_value) {
                (Some(base_value), None) => {
                    differences.push(self.difference(
                        property,
                        Some(base_value.clone()),
                        None,
                        DiffType::Removed,
                        category,
                    ));
                }
                (None, Some(compare_value)) => {
                    differences.push(self.difference(
                        property,
                        None,
                        Some(compare_value.clone()),
                        DiffType::Added,
                        category,
                    ));
                }
                (Some(base_value), Some(compare_value)) => {
                    if base_value != compare_value
                        && is_significant(
                            property,
                            base_value,
                            compare_value,
                            category,
                            &filter.tolerances,
                        )
                    {
                        differences.push(self.difference(
                            property,
                            Some(base_value.clone()),
                            Some(compare_value.clone()),
                            DiffType::Modified,
                            category,
                        ));
                    }
                }
                (None, None) => {}
            }
        }

        if filter.compare_text_content {
            let base_text = base.text_content.trim();
            let compare_text = compare.text_content.trim();
            if base_text != compare_text {
                differences.push(self.difference(
                    "textContent",
                    Some(base_text.to_owned()),
                    Some(compare_text.to_owned()),
                    DiffType::Modified,
                    DiffCategory::Content,
                ));
            }
        }

        self.diff_attributes(base, compare, filter, &mut differences);

        ElementComparison {
            element_id: base.id.clone(),
            tag_name: base.tag_name.clone(),
            total_differences: differences.len(),
            differences,
        }
    }

    fn diff_attributes(
        &self,
        base: &ElementDescriptor,
        compare: &ElementDescriptor,
        filter: &ModeFilter,
        differences: &mut Vec<Difference>,
    ) {
        let keys: BTreeSet<&String> = base.attributes.keys().chain(compare.attributes.keys()).collect();
        for key in keys {
            if filter.structural_attributes_only
                && !filter.structural_attributes.contains(key.as_str())
            {
                continue;
            }
            let base_value = base.attributes.get(key);
            let compare_value = compare.attributes.get(key);
            let property = format!("attr:{key}");
            let (diff_type, base_value, compare_value) = match (base_value, compare_value) {
                (Some(a), Some(b)) if a == b => continue,
                (Some(a), Some(b)) => (DiffType::Modified, Some(a.clone()), Some(b.clone())),
                (Some(a), None) => (DiffType::Removed, Some(a.clone()), None),
                (None, Some(b)) => (DiffType::Added, None, Some(b.clone())),
                (None, None) => continue,
            };
            differences.push(self.difference(
                &property,
                base_value,
                compare_value,
                diff_type,
                DiffCategory::Attribute,
            ));
        }
    }

    fn difference(
        &self,
        property: &str,
        base_value: Option<String>,
        compare_value: Option<String>,
        diff_type: DiffType,
        category: DiffCategory,
    ) -> Difference {
        let severity = self.severity.severity_of(
            property,
            base_value.as_deref().unwrap_or(""),
            compare_value.as_deref().unwrap_or(""),
            category,
        );
        Difference {
            property: property.to_owned(),
            base_value,
            compare_value,
            diff_type,
            category,
            severity,
        }
    }
}

/// Element-level layout context recovered from the reported styles: the
/// element's own computed font size feeds `em` resolution. Anything more
/// (parent dimensions, viewport) is not recoverable from one descriptor.
fn layout_context_for(element: &ElementDescriptor) -> Option<LayoutContext> {
    let font_size = element.styles.get("font-size").and_then(|value| parse_px(value))?;
    Some(LayoutContext { font_size: Some(font_size), ..LayoutContext::default() })
}

/// Tolerance-aware significance test for a modified property.
fn is_significant(
    property: &str,
    base: &str,
    compare: &str,
    category: DiffCategory,
    tolerances: &Tolerances,
) -> bool {
    if property == "opacity" {
        if let (Ok(a), Ok(b)) = (base.parse::<f64>(), compare.parse::<f64>()) {
            return (a - b).abs() > tolerances.opacity;
        }
        return true;
    }

    let color_typed = category == DiffCategory::Visual || property.contains("color");
    if color_typed {
        if let (Some(a), Some(b)) = (Rgba::parse(base), Rgba::parse(compare)) {
            let channel_delta = f64::from(a.r.abs_diff(b.r))
                .max(f64::from(a.g.abs_diff(b.g)))
                .max(f64::from(a.b.abs_diff(b.b)));
            let alpha_delta = (a.a - b.a).abs();
            return channel_delta > tolerances.color || alpha_delta > tolerances.opacity;
        }
        // Unparseable as color: the strings already differ.
        return true;
    }

    let size_typed = matches!(
        category,
        DiffCategory::Layout | DiffCategory::Spacing | DiffCategory::Position
    ) || property.contains("width")
        || property.contains("height")
        || property.contains("size");
    if size_typed {
        if let (Some(a), Some(b)) = (parse_px(base), parse_px(compare)) {
            return (a - b).abs() > tolerances.size;
        }
        return true;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{ComparisonMode, ModeFilter};

    fn differ() -> (PropertyDiffer, MagpieConfig) {
        let config = MagpieConfig::default();
        let normalizer = Arc::new(StyleNormalizer::with_defaults());
        (PropertyDiffer::new(&config, normalizer), config)
    }

    fn element(styles: &[(&str, &str)]) -> ElementDescriptor {
        ElementDescriptor {
            id: "e1".to_owned(),
            tag_name: "div".to_owned(),
            styles: styles.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn colors_within_tolerance_are_silent() {
        // rgb(255,0,0) vs rgb(253,1,0) sits inside the per-channel tolerance of 5.
        let (differ, config) = differ();
        let filter = ModeFilter::for_mode(&config, ComparisonMode::Static);
        let base = element(&[("color", "rgb(255, 0, 0)")]);
        let compare = element(&[("color", "rgb(253, 1, 0)")]);
        let result = differ.compare_elements(&base, &compare, &filter);
        assert_eq!(result.total_differences, 0);
    }

    #[test]
    fn colors_beyond_tolerance_are_reported() {
        let (differ, config) = differ();
        let filter = ModeFilter::for_mode(&config, ComparisonMode::Static);
        let base = element(&[("color", "rgb(255, 0, 0)")]);
        let compare = element(&[("color", "rgb(240, 0, 0)")]);
        let result = differ.compare_elements(&base, &compare, &filter);
        assert_eq!(result.total_differences, 1);
        let diff = &result.differences[0];
        assert_eq!(diff.diff_type, DiffType::Modified);
        assert_eq!(diff.category, DiffCategory::Visual);
        // color is in the high severity list.
        assert_eq!(diff.severity, Severity::High);
    }

    #[test]
    fn display_change_is_critical_layout() {
        // block -> none makes the element disappear.
        let (differ, config) = differ();
        let filter = ModeFilter::for_mode(&config, ComparisonMode::Static);
        let base = element(&[("display", "block")]);
        let compare = element(&[("display", "none")]);
        let result = differ.compare_elements(&base, &compare, &filter);
        let diff = &result.differences[0];
        assert_eq!(diff.category, DiffCategory::Layout);
        assert_eq!(diff.severity, Severity::Critical);
    }

    #[test]
    fn hex_and_named_colors_do_not_diff() {
        // #ff0000 and red are the same paint.
        let (differ, config) = differ();
        let filter = ModeFilter::for_mode(&config, ComparisonMode::Static);
        let base = element(&[("color", "#ff0000")]);
        let compare = element(&[("color", "red")]);
        let result = differ.compare_elements(&base, &compare, &filter);
        assert_eq!(result.total_differences, 0);
    }

    #[test]
    fn em_and_px_widths_do_not_diff() {
        // width 1em with a 16px font equals width 16px.
        let (differ, config) = differ();
        let filter = ModeFilter::for_mode(&config, ComparisonMode::Static);
        let base = element(&[("width", "1em"), ("font-size", "16px")]);
        let compare = element(&[("width", "16px"), ("font-size", "16px")]);
        let result = differ.compare_elements(&base, &compare, &filter);
        assert_eq!(result.total_differences, 0);
    }

    #[test]
    fn size_tolerance_applies_to_lengths() {
        let (differ, config) = differ();
        let filter = ModeFilter::for_mode(&config, ComparisonMode::Static);
        let base = element(&[("margin-top", "10px")]);
        let within = element(&[("margin-top", "12px")]);
        let beyond = element(&[("margin-top", "14px")]);
        assert_eq!(differ.compare_elements(&base, &within, &filter).total_differences, 0);
        let result = differ.compare_elements(&base, &beyond, &filter);
        assert_eq!(result.total_differences, 1);
        assert_eq!(result.differences[0].severity, Severity::Medium);
    }

    #[test]
    fn added_and_removed_properties() {
        let (differ, config) = differ();
        let filter = ModeFilter::for_mode(&config, ComparisonMode::Static);
        let base = element(&[("color", "red")]);
        let compare = element(&[("opacity", "0.5")]);
        let result = differ.compare_elements(&base, &compare, &filter);
        let removed = result.differences.iter().find(|d| d.property == "color").unwrap();
        assert_eq!(removed.diff_type, DiffType::Removed);
        assert!(removed.compare_value.is_none());
        let added = result.differences.iter().find(|d| d.property == "opacity").unwrap();
        assert_eq!(added.diff_type, DiffType::Added);
        assert!(added.base_value.is_none());
    }

    #[test]
    fn text_content_respects_mode() {
        let (differ, config) = differ();
        let mut base = element(&[]);
        base.text_content = "Hello".to_owned();
        let mut compare = element(&[]);
        compare.text_content = "Goodbye".to_owned();

        let static_filter = ModeFilter::for_mode(&config, ComparisonMode::Static);
        let result = differ.compare_elements(&base, &compare, &static_filter);
        assert_eq!(result.differences[0].property, "textContent");
        assert_eq!(result.differences[0].category, DiffCategory::Content);

        let dynamic_filter = ModeFilter::for_mode(&config, ComparisonMode::Dynamic);
        let result = differ.compare_elements(&base, &compare, &dynamic_filter);
        assert_eq!(result.total_differences, 0);
    }

    #[test]
    fn structural_attribute_filtering() {
        let (differ, config) = differ();
        let mut base = element(&[]);
        let _ = base.attributes.insert("role".to_owned(), "button".to_owned());
        let _ = base.attributes.insert("style".to_owned(), "color: red".to_owned());
        let mut compare = element(&[]);
        let _ = compare.attributes.insert("role".to_owned(), "link".to_owned());
        let _ = compare.attributes.insert("style".to_owned(), "color: blue".to_owned());

        let dynamic_filter = ModeFilter::for_mode(&config, ComparisonMode::Dynamic);
        let result = differ.compare_elements(&base, &compare, &dynamic_filter);
        assert_eq!(result.total_differences, 1);
        assert_eq!(result.differences[0].property, "attr:role");
        assert_eq!(result.differences[0].category, DiffCategory::Attribute);

        let static_filter = ModeFilter::for_mode(&config, ComparisonMode::Static);
        let result = differ.compare_elements(&base, &compare, &static_filter);
        assert_eq!(result.total_differences, 2);
    }

    #[test]
    fn dynamic_mode_ignores_configured_properties() {
        let (differ, config) = differ();
        let filter = ModeFilter::for_mode(&config, ComparisonMode::Dynamic);
        let base = element(&[("cursor", "pointer")]);
        let compare = element(&[("cursor", "wait")]);
        assert_eq!(differ.compare_elements(&base, &compare, &filter).total_differences, 0);
    }
}
