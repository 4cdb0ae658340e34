//! The selector generator.
//!
//! For one target element the generator runs the CSS and XPath strategy
//! cascades and returns one validated selector of each kind, tagged with
//! the tier's robustness score. The contract is totality: semantic
//! strategies may all fail, but the positional fallback cannot, so the
//! caller never sees an absent selector.
//!
//! Strategies inside a tier group run concurrently, one worker thread
//! each, bounded by the configured per-strategy timeout. The group settles
//! (collects every result that arrives before the deadline) and only then
//! picks the lowest-tier validated candidate; a slow or panicking strategy
//! simply contributes nothing.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use magpie_common::config::SelectorsConfig;
use magpie_dom::{DomTree, NodeId};
use serde::Serialize;

use crate::css::Selector;
use crate::stability::StabilityPolicy;
use crate::strategies_css::{
    CSS_STRATEGIES, CSS_TIER_GROUPS, CSS_TIER_ROBUSTNESS, Candidate, StrategyFn, TEST_ATTRIBUTES,
};
use crate::strategies_xpath::{
    XPATH_STRATEGIES, XPATH_TIER_GROUPS, XPATH_TIER_ROBUSTNESS, absolute_path,
};
use crate::xpath::XPath;

/// Confidence assigned to positional fallback selectors.
const FALLBACK_CONFIDENCE: u8 = 30;

/// How many ancestors the CSS anchoring pass may climb.
const MAX_ANCHOR_DEPTH: usize = 6;

/// One generated selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSelector {
    /// The selector text.
    pub value: String,
    /// The originating tier's robustness score (0-100).
    pub confidence: u8,
    /// Name of the strategy that produced it.
    pub strategy: String,
}

/// The CSS + XPath pair for one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSelectors {
    /// Unique CSS selector.
    pub css: GeneratedSelector,
    /// Unique XPath.
    pub xpath: GeneratedSelector,
}

/// Selector generator: strategy tables + stability policy + time budgets.
#[derive(Debug)]
pub struct SelectorGenerator {
    css_timeout: Duration,
    xpath_timeout: Duration,
    policy: Arc<StabilityPolicy>,
}

impl SelectorGenerator {
    /// Build a generator from configuration.
    pub fn new(config: &SelectorsConfig) -> Self {
        Self {
            css_timeout: Duration::from_millis(config.css.per_strategy_timeout_ms),
            xpath_timeout: Duration::from_millis(config.xpath.per_strategy_timeout_ms),
            policy: Arc::new(StabilityPolicy::new(&config.unstable_patterns)),
        }
    }

    /// Generator with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(&SelectorsConfig::default())
    }

    /// Generate both selectors for `target`.
    ///
    /// The tree rides in an `Arc` because strategy workers need to outlive
    /// the borrow checker's view of this call when they straggle past the
    /// deadline.
    pub fn generate(&self, tree: &Arc<DomTree>, target: NodeId) -> GeneratedSelectors {
        GeneratedSelectors {
            css: self.generate_css(tree, target),
            xpath: self.generate_xpath(tree, target),
        }
    }

    /// Generate the CSS selector for `target`.
    pub fn generate_css(&self, tree: &Arc<DomTree>, target: NodeId) -> GeneratedSelector {
        for (low, high) in CSS_TIER_GROUPS {
            let strategies: Vec<(u8, &'static str, StrategyFn)> = CSS_STRATEGIES
                .iter()
                .copied()
                .filter(|(tier, _, _)| *tier >= low && *tier <= high)
                .collect();
            let candidates =
                run_group(tree, target, &self.policy, &strategies, self.css_timeout);
            for candidate in candidates {
                if let Some(value) = validate_css(tree, target, &candidate.value, &self.policy) {
                    return GeneratedSelector {
                        value,
                        confidence: CSS_TIER_ROBUSTNESS[candidate.tier as usize],
                        strategy: candidate.strategy.to_owned(),
                    };
                }
            }
        }
        css_fallback(tree, target, &self.policy)
    }

    /// Generate the XPath for `target`.
    pub fn generate_xpath(&self, tree: &Arc<DomTree>, target: NodeId) -> GeneratedSelector {
        for (low, high) in XPATH_TIER_GROUPS {
            let strategies: Vec<(u8, &'static str, StrategyFn)> = XPATH_STRATEGIES
                .iter()
                .copied()
                .filter(|(tier, _, _)| *tier >= low && *tier <= high)
                .collect();
            let candidates =
                run_group(tree, target, &self.policy, &strategies, self.xpath_timeout);
            for candidate in candidates {
                if let Some(value) = validate_xpath(tree, target, &candidate.value) {
                    return GeneratedSelector {
                        value,
                        confidence: XPATH_TIER_ROBUSTNESS[candidate.tier as usize],
                        strategy: candidate.strategy.to_owned(),
                    };
                }
            }
        }
        xpath_fallback(tree, target, &self.policy)
    }
}

/// Launch every strategy in the group on its own thread, settle until all
/// report or the deadline passes, and return candidates sorted by tier.
///
/// The sort is stable, so a strategy's own candidate order survives within
/// a tier.
fn run_group(
    tree: &Arc<DomTree>,
    target: NodeId,
    policy: &Arc<StabilityPolicy>,
    strategies: &[(u8, &'static str, StrategyFn)],
    timeout: Duration,
) -> Vec<Candidate> {
    let (sender, receiver) = crossbeam_channel::bounded::<Vec<Candidate>>(strategies.len());
    for &(_, _, strategy) in strategies {
        let tree = Arc::clone(tree);
        let policy = Arc::clone(policy);
        let sender = sender.clone();
        let _ = thread::Builder::new().spawn(move || {
            let candidates = strategy(&tree, target, &policy);
            let _ = sender.send(candidates);
        });
    }
    drop(sender);

    let deadline = Instant::now() + timeout;
    let mut collected = Vec::new();
    let mut settled = 0;
    while settled < strategies.len() {
        match receiver.recv_deadline(deadline) {
            Ok(candidates) => {
                collected.extend(candidates);
                settled += 1;
            }
            // Deadline hit or every remaining worker died; both mean the
            // missing strategies contribute nothing.
            Err(_) => break,
        }
    }
    collected.sort_by_key(|candidate| candidate.tier);
    collected
}

/// Accept a CSS candidate iff it parses and resolves to exactly the
/// target. A non-unique candidate gets one rescue attempt: anchoring under
/// a stable-id or test-attribute ancestor.
fn validate_css(
    tree: &DomTree,
    target: NodeId,
    value: &str,
    policy: &StabilityPolicy,
) -> Option<String> {
    let selector = Selector::parse(value).ok()?;
    let matches = selector.query_all(tree);
    if matches.len() == 1 && matches[0] == target {
        return Some(value.to_owned());
    }
    if matches.len() > 1 {
        return anchor_css(tree, target, value, policy);
    }
    None
}

/// Prepend `#ancestorId ` or `[test-attr="v"] ` and re-verify, walking up
/// at most [`MAX_ANCHOR_DEPTH`] ancestors.
fn anchor_css(
    tree: &DomTree,
    target: NodeId,
    value: &str,
    policy: &StabilityPolicy,
) -> Option<String> {
    // Anchoring an already-anchored selector would nest ids; skip.
    if value.starts_with('#') {
        return None;
    }
    for ancestor in tree.ancestors(target).take(MAX_ANCHOR_DEPTH) {
        let Some(element) = tree.as_element(ancestor) else { continue };
        let mut prefixes = Vec::new();
        if let Some(id) = element.id().filter(|id| policy.is_stable_id(id)) {
            prefixes.push(format!("#{id}"));
        }
        for name in TEST_ATTRIBUTES {
            if let Some(attr_value) =
                element.attr(name).filter(|v| policy.is_stable_attr_value(v))
            {
                prefixes.push(format!("[{name}=\"{attr_value}\"]"));
            }
        }
        for prefix in prefixes {
            let anchored = format!("{prefix} {value}");
            if let Ok(selector) = Selector::parse(&anchored) {
                let matches = selector.query_all(tree);
                if matches.len() == 1 && matches[0] == target {
                    return Some(anchored);
                }
            }
        }
    }
    None
}

/// Accept an XPath candidate iff it resolves to exactly the target; with
/// several matches, disambiguate by document-order position via the
/// `(path)[N]` form and re-verify.
fn validate_xpath(tree: &DomTree, target: NodeId, value: &str) -> Option<String> {
    let xpath = XPath::parse(value).ok()?;
    let matches = xpath.eval(tree);
    if matches.len() == 1 && matches[0] == target {
        return Some(value.to_owned());
    }
    if matches.len() > 1 {
        let position = matches.iter().position(|&id| id == target)? + 1;
        let wrapped = format!("({value})[{position}]");
        let reparsed = XPath::parse(&wrapped).ok()?;
        let rechecked = reparsed.eval(tree);
        if rechecked.len() == 1 && rechecked[0] == target {
            return Some(wrapped);
        }
    }
    None
}

/// Positional CSS fallback: a `>`-chain of `tag:nth-of-type(N)` segments,
/// cut short at the first stable-id ancestor. Never fails for an element.
fn css_fallback(tree: &Arc<DomTree>, target: NodeId, policy: &StabilityPolicy) -> GeneratedSelector {
    let mut segments = Vec::new();
    let mut current = Some(target);
    let mut anchor = None;
    while let Some(node) = current {
        let Some(element) = tree.as_element(node) else { break };
        if node != target {
            if let Some(id) = element.id().filter(|id| policy.is_stable_id(id)) {
                anchor = Some(format!("#{id}"));
                break;
            }
        }
        if tree.same_tag_sibling_count(node) > 1 {
            let position = tree.same_tag_position(node).unwrap_or(1);
            segments.push(format!("{}:nth-of-type({position})", element.tag_name));
        } else {
            segments.push(element.tag_name.clone());
        }
        current = tree.parent(node).filter(|&p| tree.as_element(p).is_some());
    }
    segments.reverse();
    let mut parts = Vec::new();
    if let Some(anchor) = anchor {
        parts.push(anchor);
    }
    parts.extend(segments);
    GeneratedSelector {
        value: parts.join(" > "),
        confidence: FALLBACK_CONFIDENCE,
        strategy: "positional-fallback".to_owned(),
    }
}

/// Positional XPath fallback: the `/html/...` same-tag-indexed path, cut
/// short at the first stable-id ancestor. Never fails for an element.
fn xpath_fallback(
    tree: &Arc<DomTree>,
    target: NodeId,
    policy: &StabilityPolicy,
) -> GeneratedSelector {
    let mut segments = Vec::new();
    let mut current = Some(target);
    let mut anchor = None;
    while let Some(node) = current {
        let Some(element) = tree.as_element(node) else { break };
        if node != target {
            if let Some(id) = element.id().filter(|id| policy.is_stable_id(id)) {
                anchor = Some(format!("//*[@id='{id}']"));
                break;
            }
        }
        if tree.same_tag_sibling_count(node) > 1 {
            let position = tree.same_tag_position(node).unwrap_or(1);
            segments.push(format!("{}[{position}]", element.tag_name));
        } else {
            segments.push(element.tag_name.clone());
        }
        current = tree.parent(node).filter(|&p| tree.as_element(p).is_some());
    }
    segments.reverse();
    let value = match anchor {
        Some(anchor) => format!("{anchor}/{}", segments.join("/")),
        None => absolute_path(tree, target).unwrap_or_else(|| format!("/{}", segments.join("/"))),
    };
    GeneratedSelector {
        value,
        confidence: FALLBACK_CONFIDENCE,
        strategy: "positional-fallback".to_owned(),
    }
}
