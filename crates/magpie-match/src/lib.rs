//! Cross-snapshot element matching.
//!
//! Two reports of the "same" page never agree on element identity for
//! free: DOM ids churn, structure shifts, content reflows. The matcher
//! pairs baseline and compare elements using five strategies in strict
//! priority order, each with a fixed confidence:
//!
//! | # | strategy | confidence |
//! |---|----------|------------|
//! | 1 | test-attribute equality | 1.00 |
//! | 2 | DOM id equality | 0.95 |
//! | 3 | CSS selector equality | max(0.85, avg conf/100) |
//! | 4 | XPath equality | max(0.80, avg conf/100) |
//! | 5 | position proximity (same tag) | max(0.1, 1 − d/tol) × 0.30 |
//!
//! Lookups are precomputed (hash maps for 1-4, a spatial grid for 5), so
//! matching is linear in the element count. Compare elements are claimed
//! first-come-first-served in baseline order, and the whole pass is
//! deterministic for fixed inputs.

use std::collections::HashMap;

use magpie_common::config::MagpieConfig;
use magpie_report::ElementDescriptor;
use serde::Serialize;
use strum_macros::Display;

/// How a match was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MatchStrategy {
    /// Shared test-automation attribute value.
    TestAttribute,
    /// Shared DOM id.
    Id,
    /// Identical precomputed CSS selector.
    CssSelector,
    /// Identical precomputed XPath.
    Xpath,
    /// Same tag within position tolerance.
    Position,
}

/// One matched pair, by index into the input slices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMatch {
    /// Index into the baseline slice.
    pub baseline_index: usize,
    /// Index into the compare slice.
    pub compare_index: usize,
    /// Match confidence, 0-1.
    pub confidence: f64,
    /// Which strategy produced the pair.
    pub strategy: MatchStrategy,
}

/// The matcher's full result.
///
/// Invariants: no index appears twice on either side, and
/// `matches.len() + unmatched_*.len()` partitions each input exactly.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    /// Matched pairs, in baseline order.
    pub matches: Vec<ElementMatch>,
    /// Baseline indices that found no partner.
    pub unmatched_baseline: Vec<usize>,
    /// Compare indices that were never claimed.
    pub unmatched_compare: Vec<usize>,
}

/// The element matcher. Built once from configuration, reusable across
/// comparisons.
#[derive(Debug, Clone)]
pub struct ElementMatcher {
    min_confidence: f64,
    high_confidence: f64,
    position_tolerance: f64,
    test_attributes: Vec<String>,
}

impl ElementMatcher {
    /// Build a matcher from the frozen configuration. The first four
    /// priority attributes participate in test-attribute matching.
    pub fn new(config: &MagpieConfig) -> Self {
        Self {
            min_confidence: config.comparison.confidence.min,
            high_confidence: config.comparison.confidence.high,
            position_tolerance: config.comparison.matching.position_tolerance,
            test_attributes: config.attributes.priority.iter().take(4).cloned().collect(),
        }
    }

    /// Pair up baseline and compare elements.
    pub fn match_elements(
        &self,
        baseline: &[ElementDescriptor],
        compare: &[ElementDescriptor],
    ) -> MatchOutcome {
        let lookup = CompareLookup::build(compare, &self.test_attributes, self.position_tolerance);
        let mut claimed = vec![false; compare.len()];
        let mut outcome = MatchOutcome::default();

        for (baseline_index, element) in baseline.iter().enumerate() {
            let best = self.best_match(element, compare, &lookup, &claimed);
            match best {
                Some((compare_index, confidence, strategy))
                    if confidence >= self.min_confidence =>
                {
                    claimed[compare_index] = true;
                    outcome.matches.push(ElementMatch {
                        baseline_index,
                        compare_index,
                        confidence,
                        strategy,
                    });
                }
                _ => outcome.unmatched_baseline.push(baseline_index),
            }
        }

        outcome.unmatched_compare =
            claimed.iter().enumerate().filter(|&(_, &used)| !used).map(|(i, _)| i).collect();
        outcome
    }

    /// Try the strategies in priority order, keeping the best confidence
    /// seen and stopping early once it clears the high-confidence bar.
    fn best_match(
        &self,
        element: &ElementDescriptor,
        compare: &[ElementDescriptor],
        lookup: &CompareLookup,
        claimed: &[bool],
    ) -> Option<(usize, f64, MatchStrategy)> {
        let mut best: Option<(usize, f64, MatchStrategy)> = None;
        let high = self.high_confidence;

        if consider(&mut best, self.try_test_attribute(element, lookup, claimed), high) {
            return best;
        }
        if consider(&mut best, self.try_id(element, lookup, claimed), high) {
            return best;
        }
        if consider(&mut best, self.try_css(element, compare, lookup, claimed), high) {
            return best;
        }
        if consider(&mut best, self.try_xpath(element, compare, lookup, claimed), high) {
            return best;
        }
        let _ = consider(&mut best, self.try_position(element, compare, lookup, claimed), high);
        best
    }

    fn try_test_attribute(
        &self,
        element: &ElementDescriptor,
        lookup: &CompareLookup,
        claimed: &[bool],
    ) -> Option<(usize, f64, MatchStrategy)> {
        for name in &self.test_attributes {
            let Some(value) = element.attribute(name) else { continue };
            let key = (name.clone(), value.to_owned());
            if let Some(index) = first_unclaimed(lookup.by_test_attribute.get(&key), claimed) {
                return Some((index, 1.0, MatchStrategy::TestAttribute));
            }
        }
        None
    }

    fn try_id(
        &self,
        element: &ElementDescriptor,
        lookup: &CompareLookup,
        claimed: &[bool],
    ) -> Option<(usize, f64, MatchStrategy)> {
        if element.element_id.is_empty() {
            return None;
        }
        first_unclaimed(lookup.by_id.get(&element.element_id), claimed)
            .map(|index| (index, 0.95, MatchStrategy::Id))
    }

    fn try_css(
        &self,
        element: &ElementDescriptor,
        compare: &[ElementDescriptor],
        lookup: &CompareLookup,
        claimed: &[bool],
    ) -> Option<(usize, f64, MatchStrategy)> {
        if element.selectors.css.is_empty() {
            return None;
        }
        let index = first_unclaimed(lookup.by_css.get(&element.selectors.css), claimed)?;
        let average = f64::from(
            u16::from(element.selectors.css_confidence)
                + u16::from(compare[index].selectors.css_confidence),
        ) / 2.0;
        let confidence = (average / 100.0).max(0.85);
        Some((index, confidence, MatchStrategy::CssSelector))
    }

    fn try_xpath(
        &self,
        element: &ElementDescriptor,
        compare: &[ElementDescriptor],
        lookup: &CompareLookup,
        claimed: &[bool],
    ) -> Option<(usize, f64, MatchStrategy)> {
        if element.selectors.xpath.is_empty() {
            return None;
        }
        let index = first_unclaimed(lookup.by_xpath.get(&element.selectors.xpath), claimed)?;
        let average = f64::from(
            u16::from(element.selectors.xpath_confidence)
                + u16::from(compare[index].selectors.xpath_confidence),
        ) / 2.0;
        let confidence = (average / 100.0).max(0.80);
        Some((index, confidence, MatchStrategy::Xpath))
    }

    /// Scan the 3x3 grid neighborhood around the element's cell for the
    /// nearest unclaimed same-tag element within tolerance.
    fn try_position(
        &self,
        element: &ElementDescriptor,
        compare: &[ElementDescriptor],
        lookup: &CompareLookup,
        claimed: &[bool],
    ) -> Option<(usize, f64, MatchStrategy)> {
        let position = element.position?;
        let tolerance = self.position_tolerance;
        let (cell_x, cell_y) = grid_cell(position.x, position.y, tolerance);
        let mut nearest: Option<(usize, f64)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                let key = (cell_x + dx, cell_y + dy, element.tag_name.clone());
                let Some(indices) = lookup.grid.get(&key) else { continue };
                for &index in indices {
                    if claimed[index] {
                        continue;
                    }
                    let Some(other) = compare[index].position else { continue };
                    let distance = position.distance_to(&other);
                    if distance <= tolerance
                        && nearest.is_none_or(|(_, best)| distance < best)
                    {
                        nearest = Some((index, distance));
                    }
                }
            }
        }
        nearest.map(|(index, distance)| {
            let confidence = (1.0 - distance / tolerance).max(0.1) * 0.30;
            (index, confidence, MatchStrategy::Position)
        })
    }
}

/// Precomputed lookup structures over the compare side.
struct CompareLookup {
    by_test_attribute: HashMap<(String, String), Vec<usize>>,
    by_id: HashMap<String, Vec<usize>>,
    by_css: HashMap<String, Vec<usize>>,
    by_xpath: HashMap<String, Vec<usize>>,
    grid: HashMap<(i64, i64, String), Vec<usize>>,
}

impl CompareLookup {
    fn build(
        compare: &[ElementDescriptor],
        test_attributes: &[String],
        tolerance: f64,
    ) -> Self {
        let mut lookup = Self {
            by_test_attribute: HashMap::new(),
            by_id: HashMap::new(),
            by_css: HashMap::new(),
            by_xpath: HashMap::new(),
            grid: HashMap::new(),
        };
        for (index, element) in compare.iter().enumerate() {
            for name in test_attributes {
                if let Some(value) = element.attribute(name) {
                    lookup
                        .by_test_attribute
                        .entry((name.clone(), value.to_owned()))
                        .or_default()
                        .push(index);
                }
            }
            if !element.element_id.is_empty() {
                lookup.by_id.entry(element.element_id.clone()).or_default().push(index);
            }
            if !element.selectors.css.is_empty() {
                lookup.by_css.entry(element.selectors.css.clone()).or_default().push(index);
            }
            if !element.selectors.xpath.is_empty() {
                lookup.by_xpath.entry(element.selectors.xpath.clone()).or_default().push(index);
            }
            if let Some(position) = element.position {
                let (cell_x, cell_y) = grid_cell(position.x, position.y, tolerance);
                lookup
                    .grid
                    .entry((cell_x, cell_y, element.tag_name.clone()))
                    .or_default()
                    .push(index);
            }
        }
        lookup
    }
}

fn grid_cell(x: f64, y: f64, tolerance: f64) -> (i64, i64) {
    let size = tolerance.max(1.0);
    ((x / size).floor() as i64, (y / size).floor() as i64)
}

fn first_unclaimed(indices: Option<&Vec<usize>>, claimed: &[bool]) -> Option<usize> {
    indices?.iter().copied().find(|&index| !claimed[index])
}

/// Fold a strategy's candidate into the running best; true once the best
/// clears the early-exit bar.
fn consider(
    best: &mut Option<(usize, f64, MatchStrategy)>,
    candidate: Option<(usize, f64, MatchStrategy)>,
    high_confidence: f64,
) -> bool {
    if let Some((index, confidence, strategy)) = candidate {
        if best.is_none_or(|(_, best_confidence, _)| confidence > best_confidence) {
            *best = Some((index, confidence, strategy));
        }
    }
    best.is_some_and(|(_, confidence, _)| confidence >= high_confidence)
}
