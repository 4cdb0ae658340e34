//! The normalization engine.
//!
//! One entry point per granularity: [`StyleNormalizer::normalize`] for a
//! whole style map (shorthand expansion included) and
//! [`StyleNormalizer::normalize_property`] for a single value. Dispatch is
//! by property name: color properties go through the color canonicalizer,
//! size properties through the unit canonicalizer, `font-family` through
//! the font canonicalizer, and everything else passes through untouched.
//!
//! Every failure path is absorbed: a value that will not parse is returned
//! as it came in (and counted in diagnostics), never propagated. One broken
//! value must not poison an element, and one broken element must not abort
//! a comparison.

use std::sync::{Arc, Mutex};

use magpie_common::config::NormalizationConfig;
use magpie_common::diagnostics::Diagnostics;

use crate::cache::{CacheStats, NormalizationCache};
use crate::color::{self, Rgba};
use crate::font::normalize_font_family;
use crate::shorthand::{StyleMap, expand_shorthands};
use crate::units::{self, LayoutContext};

/// Properties canonicalized as colors.
const COLOR_PROPERTIES: [&str; 11] = [
    "color",
    "background-color",
    "border-color",
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
    "outline-color",
    "text-decoration-color",
    "column-rule-color",
    "caret-color",
];

/// Properties canonicalized as lengths.
const SIZE_PROPERTIES: [&str; 39] = [
    "width",
    "height",
    "max-width",
    "max-height",
    "min-width",
    "min-height",
    "top",
    "right",
    "bottom",
    "left",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "border-width",
    "border-top-width",
    "border-right-width",
    "border-bottom-width",
    "border-left-width",
    "border-radius",
    "border-top-left-radius",
    "border-top-right-radius",
    "border-bottom-right-radius",
    "border-bottom-left-radius",
    "font-size",
    "line-height",
    "letter-spacing",
    "word-spacing",
    "gap",
    "row-gap",
    "column-gap",
    "grid-gap",
    "outline-width",
    "outline-offset",
    "text-indent",
];

/// True if `property` is canonicalized as a color.
pub fn is_color_property(property: &str) -> bool {
    COLOR_PROPERTIES.contains(&property)
}

/// True if `property` is canonicalized as a length.
pub fn is_size_property(property: &str) -> bool {
    SIZE_PROPERTIES.contains(&property)
}

/// The style normalization engine.
///
/// Holds the frozen normalization config, the two-tier cache, and the
/// shared diagnostics collector. The cache sits behind a mutex so the
/// normalizer can be shared immutably; within one comparison the lock is
/// uncontended.
pub struct StyleNormalizer {
    config: NormalizationConfig,
    cache: Option<Mutex<NormalizationCache>>,
    diagnostics: Arc<Diagnostics>,
}

impl StyleNormalizer {
    /// Build a normalizer from configuration.
    pub fn new(config: NormalizationConfig, diagnostics: Arc<Diagnostics>) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| Mutex::new(NormalizationCache::new(config.cache.max_entries)));
        Self { config, cache, diagnostics }
    }

    /// Build a normalizer with default configuration and silent diagnostics.
    pub fn with_defaults() -> Self {
        Self::new(NormalizationConfig::default(), Arc::new(Diagnostics::new()))
    }

    /// Canonicalize a whole style map.
    ///
    /// Shorthands are expanded first, then every property is normalized
    /// individually. The result has the same keys as the expanded input.
    pub fn normalize(&self, styles: &StyleMap, context: Option<&LayoutContext>) -> StyleMap {
        let expanded = expand_shorthands(styles);
        expanded
            .iter()
            .map(|(property, value)| {
                (property.clone(), self.normalize_property(property, value, context))
            })
            .collect()
    }

    /// Canonicalize a single property value.
    pub fn normalize_property(
        &self,
        property: &str,
        value: &str,
        context: Option<&LayoutContext>,
    ) -> String {
        if is_color_property(property) {
            return self.cached_absolute(property, value, |v| self.normalize_color_value(v));
        }
        if is_size_property(property) {
            return self.normalize_size(property, value, context);
        }
        if property == "font-family" {
            return self.cached_absolute(property, value, |v| normalize_font_family(v));
        }
        value.to_owned()
    }

    /// Cache statistics, when the cache is enabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().and_then(|cache| cache.lock().ok().map(|guard| guard.stats()))
    }

    fn normalize_color_value(&self, value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() || color::is_pass_through_keyword(trimmed) {
            return value.to_owned();
        }
        match Rgba::parse(trimmed) {
            Some(rgba) => rgba.to_string(),
            None => {
                self.diagnostics.recovered("color", &format!("unparseable color '{trimmed}'"));
                value.to_owned()
            }
        }
    }

    fn normalize_size(&self, property: &str, value: &str, context: Option<&LayoutContext>) -> String {
        let decimals = self.config.rounding.decimals;
        if units::is_context_dependent(value) {
            // Context-dependent values key on the layout fingerprint; a
            // missing context still caches (under the vacant fingerprint)
            // because the answer is the same for every missing context.
            let fingerprint = context.copied().unwrap_or_default();
            if let Some(cache) = &self.cache {
                if let Ok(mut guard) = cache.lock() {
                    if let Some(hit) = guard.get_relative(property, value, &fingerprint) {
                        return hit;
                    }
                }
            }
            let normalized = units::normalize_length(property, value, context, decimals);
            if let Some(cache) = &self.cache {
                if let Ok(mut guard) = cache.lock() {
                    guard.put_relative(property, value, &fingerprint, normalized.clone());
                }
            }
            normalized
        } else {
            self.cached_absolute(property, value, |v| {
                units::normalize_length(property, v, context, decimals)
            })
        }
    }

    fn cached_absolute(&self, property: &str, value: &str, compute: impl Fn(&str) -> String) -> String {
        if let Some(cache) = &self.cache {
            if let Ok(mut guard) = cache.lock() {
                if let Some(hit) = guard.get_absolute(property, value) {
                    return hit;
                }
            }
        }
        let normalized = compute(value);
        if let Some(cache) = &self.cache {
            if let Ok(mut guard) = cache.lock() {
                guard.put_absolute(property, value, normalized.clone());
            }
        }
        normalized
    }
}
