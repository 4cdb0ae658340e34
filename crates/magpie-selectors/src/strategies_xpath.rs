//! Tiered XPath candidate generators.
//!
//! The XPath side has a much deeper tier table than CSS: text anchors and
//! sibling context have no CSS equivalent, and the long tail of structural
//! fallbacks degrades gracefully all the way down to bare positions. Tier
//! 22 (the global `(//*)[N]` form) exists in the robustness table but is
//! deliberately absent from the strategy set; the generator's positional
//! fallback produces a readable path instead.

use magpie_dom::{DomTree, NodeId};

use crate::stability::StabilityPolicy;
use crate::strategies_css::{Candidate, StrategyFn, TEST_ATTRIBUTES};

/// Robustness score per XPath tier (index = tier; 22 = the excluded
/// global-position tier, kept so the table covers the whole range).
pub const XPATH_TIER_ROBUSTNESS: [u8; 23] = [
    99, 97, 95, 92, 90, 87, 85, 82, 80, 78, 75, 72, 70, 68, 65, 62, 58, 55, 50, 45, 40, 35, 30,
];

/// Tier groups executed as concurrent batches, in order.
pub const XPATH_TIER_GROUPS: [(u8, u8); 4] = [(0, 5), (6, 10), (11, 15), (16, 21)];

/// Attributes treated as semantically meaningful anchors (tier 4).
const SEMANTIC_ATTRIBUTES: [&str; 3] = ["name", "placeholder", "for"];

/// The full XPath strategy table, tier order.
pub const XPATH_STRATEGIES: [(u8, &str, StrategyFn); 22] = [
    (0, "exact-text", xp_exact_text),
    (1, "test-attribute", xp_test_attribute),
    (2, "stable-id", xp_stable_id),
    (3, "normalized-text", xp_normalized_text),
    (4, "stable-attribute", xp_stable_attribute),
    (5, "data-attribute", xp_data_attribute),
    (6, "ancestor-id", xp_ancestor_id),
    (7, "nearby-text", xp_nearby_text),
    (8, "sibling-context", xp_sibling_context),
    (9, "ancestor-chain", xp_ancestor_chain),
    (10, "type-and-name", xp_type_and_name),
    (11, "aria-label", xp_aria_label),
    (12, "partial-text", xp_partial_text),
    (13, "parent-id-indexed", xp_parent_id_indexed),
    (14, "class-combination", xp_class_combination),
    (15, "ancestor-stable-attribute", xp_ancestor_stable_attribute),
    (16, "role", xp_role),
    (17, "href-or-src", xp_href_or_src),
    (18, "alt-or-title", xp_alt_or_title),
    (19, "absolute-path", xp_absolute_path),
    (20, "tag-position", xp_tag_position),
    (21, "type-position", xp_type_position),
];

fn candidate(tier: u8, strategy: &'static str, value: String) -> Candidate {
    Candidate { tier, strategy, value }
}

/// True if `value` can sit inside a single-quoted XPath literal.
fn quotable(value: &str) -> bool {
    !value.is_empty() && !value.contains('\'')
}

/// Tier 0: the element's own text, when short and content-invariant.
fn xp_exact_text(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let text = tree.own_text(target);
    if !policy.is_static_text(&text) || !quotable(&text) {
        return Vec::new();
    }
    vec![candidate(0, "exact-text", format!("//{}[text()='{text}']", element.tag_name))]
}

/// Tier 1: test-automation attributes.
fn xp_test_attribute(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let mut out = Vec::new();
    for name in TEST_ATTRIBUTES {
        if let Some(value) = element.attr(name) {
            if policy.is_stable_attr_value(value) {
                out.push(candidate(1, "test-attribute", format!("//*[@{name}='{value}']")));
                out.push(candidate(
                    1,
                    "test-attribute",
                    format!("//{}[@{name}='{value}']", element.tag_name),
                ));
            }
        }
    }
    out
}

/// Tier 2: stable DOM id, tag-qualified and wildcard forms.
fn xp_stable_id(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let Some(id) = element.id().filter(|id| policy.is_stable_id(id)) else { return Vec::new() };
    vec![
        candidate(2, "stable-id", format!("//{}[@id='{id}']", element.tag_name)),
        candidate(2, "stable-id", format!("//*[@id='{id}']")),
    ]
}

/// Tier 3: normalize-space text match.
fn xp_normalized_text(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let text = tree.own_text(target);
    if !policy.is_static_text(&text) || !quotable(&text) {
        return Vec::new();
    }
    vec![candidate(
        3,
        "normalized-text",
        format!("//{}[normalize-space(text())='{text}']", element.tag_name),
    )]
}

/// Tier 4: semantic attributes (`name`, `placeholder`, `for`).
fn xp_stable_attribute(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    SEMANTIC_ATTRIBUTES
        .iter()
        .filter_map(|&name| {
            element
                .attr(name)
                .filter(|value| policy.is_stable_attr_value(value) && quotable(value))
                .map(|value| {
                    candidate(
                        4,
                        "stable-attribute",
                        format!("//{}[@{name}='{value}']", element.tag_name),
                    )
                })
        })
        .collect()
}

/// Tier 5: any other stable `data-*` attribute.
fn xp_data_attribute(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    element
        .attrs
        .iter()
        .filter(|(name, value)| {
            name.starts_with("data-")
                && !TEST_ATTRIBUTES.contains(&name.as_str())
                && policy.is_stable_attr_value(value)
                && quotable(value)
        })
        .take(2)
        .map(|(name, value)| {
            candidate(5, "data-attribute", format!("//{}[@{name}='{value}']", element.tag_name))
        })
        .collect()
}

/// Tier 6: scoped under the nearest stable-id ancestor.
fn xp_ancestor_id(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    for ancestor in tree.ancestors(target).take(6) {
        let Some(ancestor_id) = tree.as_element(ancestor).and_then(|a| a.id()) else { continue };
        if policy.is_stable_id(ancestor_id) {
            return vec![candidate(
                6,
                "ancestor-id",
                format!("//*[@id='{ancestor_id}']//{}", element.tag_name),
            )];
        }
    }
    Vec::new()
}

/// Tier 7: anchored to a preceding sibling's static text, the classic
/// `label → input` relationship.
fn xp_nearby_text(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    for sibling in tree.preceding_element_siblings(target).into_iter().rev() {
        let Some(sibling_tag) = tree.tag_name(sibling) else { continue };
        let text = tree.own_text(sibling);
        if policy.is_static_text(&text) && quotable(&text) {
            return vec![candidate(
                7,
                "nearby-text",
                format!(
                    "//{sibling_tag}[normalize-space(text())='{text}']/following-sibling::{}[1]",
                    element.tag_name
                ),
            )];
        }
    }
    Vec::new()
}

/// Tier 8: anchored to a preceding sibling's stable id.
fn xp_sibling_context(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    for sibling in tree.preceding_element_siblings(target).into_iter().rev() {
        let Some(sibling_id) = tree.as_element(sibling).and_then(|s| s.id()) else { continue };
        if policy.is_stable_id(sibling_id) {
            return vec![candidate(
                8,
                "sibling-context",
                format!(
                    "//*[@id='{sibling_id}']/following-sibling::{}[1]",
                    element.tag_name
                ),
            )];
        }
    }
    Vec::new()
}

/// Tier 9: bare tag chain through parent and grandparent.
fn xp_ancestor_chain(tree: &DomTree, target: NodeId, _policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let Some(parent_tag) = tree.parent(target).and_then(|p| tree.tag_name(p)) else {
        return Vec::new();
    };
    let grandparent_tag =
        tree.parent(target).and_then(|p| tree.parent(p)).and_then(|gp| tree.tag_name(gp));
    let mut out = Vec::new();
    if let Some(grandparent_tag) = grandparent_tag {
        out.push(candidate(
            9,
            "ancestor-chain",
            format!("//{grandparent_tag}/{parent_tag}/{}", element.tag_name),
        ));
    }
    out.push(candidate(9, "ancestor-chain", format!("//{parent_tag}/{}", element.tag_name)));
    out
}

/// Tier 10: form controls by `type` + `name`.
fn xp_type_and_name(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let kind = element.attr("type").filter(|v| policy.is_stable_attr_value(v) && quotable(v));
    let name = element.attr("name").filter(|v| policy.is_stable_attr_value(v) && quotable(v));
    let (Some(kind), Some(name)) = (kind, name) else { return Vec::new() };
    vec![candidate(
        10,
        "type-and-name",
        format!("//{}[@type='{kind}'][@name='{name}']", element.tag_name),
    )]
}

/// Tier 11: accessibility label.
fn xp_aria_label(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let Some(label) = element
        .attr("aria-label")
        .filter(|v| policy.is_stable_attr_value(v) && quotable(v))
    else {
        return Vec::new();
    };
    vec![
        candidate(11, "aria-label", format!("//{}[@aria-label='{label}']", element.tag_name)),
        candidate(11, "aria-label", format!("//*[@aria-label='{label}']")),
    ]
}

/// Tier 12: a static prefix of the subtree text.
fn xp_partial_text(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let text = tree.text_content(target);
    if text.len() < 4 {
        return Vec::new();
    }
    let prefix: String = text.chars().take(20).collect();
    // The prefix itself must be content-invariant even if the tail churns.
    if !policy.is_static_text(&prefix) || !quotable(&prefix) {
        return Vec::new();
    }
    vec![candidate(
        12,
        "partial-text",
        format!("//{}[contains(normalize-space(.), '{prefix}')]", element.tag_name),
    )]
}

/// Tier 13: child of a stable-id parent, indexed when the tag repeats.
fn xp_parent_id_indexed(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let Some(parent) = tree.parent(target) else { return Vec::new() };
    let Some(parent_id) = tree.as_element(parent).and_then(|p| p.id()) else { return Vec::new() };
    if !policy.is_stable_id(parent_id) {
        return Vec::new();
    }
    let base = format!("//*[@id='{parent_id}']/{}", element.tag_name);
    if tree.same_tag_sibling_count(target) > 1 {
        let Some(position) = tree.same_tag_position(target) else { return Vec::new() };
        vec![candidate(13, "parent-id-indexed", format!("{base}[{position}]"))]
    } else {
        vec![candidate(13, "parent-id-indexed", base)]
    }
}

/// Tier 14: stable class tokens, single and pair forms.
fn xp_class_combination(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let stable: Vec<&str> = element.classes().filter(|c| policy.is_stable_class(c)).take(2).collect();
    let mut out = Vec::new();
    for class in &stable {
        out.push(candidate(
            14,
            "class-combination",
            format!("//{}[contains(@class, '{class}')]", element.tag_name),
        ));
    }
    if let [a, b] = stable.as_slice() {
        out.push(candidate(
            14,
            "class-combination",
            format!("//{}[contains(@class, '{a}')][contains(@class, '{b}')]", element.tag_name),
        ));
    }
    out
}

/// Tier 15: scoped under an ancestor carrying any stable marker attribute.
fn xp_ancestor_stable_attribute(
    tree: &DomTree,
    target: NodeId,
    policy: &StabilityPolicy,
) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    for ancestor in tree.ancestors(target).take(6) {
        let Some(ancestor_element) = tree.as_element(ancestor) else { continue };
        let marker = ancestor_element.attrs.iter().find(|(name, value)| {
            (name.starts_with("data-") || name.as_str() == "role")
                && policy.is_stable_attr_value(value)
                && quotable(value)
        });
        if let Some((name, value)) = marker {
            return vec![candidate(
                15,
                "ancestor-stable-attribute",
                format!(
                    "//{}[@{name}='{value}']//{}",
                    ancestor_element.tag_name, element.tag_name
                ),
            )];
        }
    }
    Vec::new()
}

/// Tier 16: ARIA role.
fn xp_role(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let Some(role) =
        element.attr("role").filter(|v| policy.is_stable_attr_value(v) && quotable(v))
    else {
        return Vec::new();
    };
    vec![candidate(16, "role", format!("//{}[@role='{role}']", element.tag_name))]
}

/// Tier 17: link and resource URLs.
fn xp_href_or_src(tree: &DomTree, target: NodeId, _policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let attr = match element.tag_name.as_str() {
        "a" | "area" => "href",
        "img" | "script" | "iframe" | "source" | "video" | "audio" => "src",
        _ => return Vec::new(),
    };
    element
        .attr(attr)
        .filter(|v| quotable(v))
        .map(|value| {
            vec![candidate(
                17,
                "href-or-src",
                format!("//{}[@{attr}='{value}']", element.tag_name),
            )]
        })
        .unwrap_or_default()
}

/// Tier 18: `alt` and `title` labels.
fn xp_alt_or_title(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let mut out = Vec::new();
    if let Some(alt) = element.attr("alt").filter(|v| policy.is_static_text(v) && quotable(v)) {
        out.push(candidate(18, "alt-or-title", format!("//{}[@alt='{alt}']", element.tag_name)));
    }
    if let Some(title) = element.attr("title").filter(|v| policy.is_static_text(v) && quotable(v)) {
        out.push(candidate(
            18,
            "alt-or-title",
            format!("//{}[@title='{title}']", element.tag_name),
        ));
    }
    out
}

/// Tier 19: full absolute path with same-tag sibling indexing.
fn xp_absolute_path(tree: &DomTree, target: NodeId, _policy: &StabilityPolicy) -> Vec<Candidate> {
    absolute_path(tree, target)
        .map(|path| vec![candidate(19, "absolute-path", path)])
        .unwrap_or_default()
}

/// Tier 20: tag position within the direct parent.
fn xp_tag_position(tree: &DomTree, target: NodeId, _policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let Some(parent_tag) = tree.parent(target).and_then(|p| tree.tag_name(p)) else {
        return Vec::new();
    };
    let Some(position) = tree.same_tag_position(target) else { return Vec::new() };
    vec![candidate(
        20,
        "tag-position",
        format!("//{parent_tag}/{}[{position}]", element.tag_name),
    )]
}

/// Tier 21: type position within the grandparent's context.
fn xp_type_position(tree: &DomTree, target: NodeId, _policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let grandparent =
        tree.parent(target).and_then(|p| tree.parent(p));
    let Some(grandparent_tag) = grandparent.and_then(|gp| tree.tag_name(gp)) else {
        return Vec::new();
    };
    let Some(position) = tree.same_tag_position(target) else { return Vec::new() };
    vec![candidate(
        21,
        "type-position",
        format!("//{grandparent_tag}/*/{}[{position}]", element.tag_name),
    )]
}

/// Build the `/html/...` path with same-tag indexing, used by tier 19 and
/// by the generator's positional fallback.
pub fn absolute_path(tree: &DomTree, target: NodeId) -> Option<String> {
    let mut segments = Vec::new();
    let mut current = Some(target);
    while let Some(node) = current {
        let element = tree.as_element(node)?;
        let needs_index = tree.same_tag_sibling_count(node) > 1;
        if needs_index {
            segments.push(format!("{}[{}]", element.tag_name, tree.same_tag_position(node)?));
        } else {
            segments.push(element.tag_name.clone());
        }
        let parent = tree.parent(node);
        current = parent.filter(|&p| tree.as_element(p).is_some());
    }
    segments.reverse();
    Some(format!("/{}", segments.join("/")))
}
