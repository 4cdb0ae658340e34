//! Tiered CSS selector candidate generators.
//!
//! Each strategy looks at one kind of signal (id, test attribute, stable
//! classes, structure) and emits zero or more candidate selectors, tagged
//! with its tier. Lower tier = more robust signal. Strategies never verify
//! uniqueness themselves; the generator validates every candidate against
//! the document afterwards.

use magpie_dom::{DomTree, NodeId};

use crate::stability::StabilityPolicy;

/// A candidate selector with its originating tier and strategy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Strategy tier (lower = more robust).
    pub tier: u8,
    /// Strategy name, carried into the generated selector's metadata.
    pub strategy: &'static str,
    /// The selector text.
    pub value: String,
}

/// A strategy: document + target + stability policy in, candidates out.
pub type StrategyFn = fn(&DomTree, NodeId, &StabilityPolicy) -> Vec<Candidate>;

/// Test-automation attributes, strongest first.
pub const TEST_ATTRIBUTES: [&str; 5] =
    ["data-testid", "data-test", "data-qa", "data-cy", "data-automation-id"];

/// Robustness score per CSS tier (index = tier, tier 0 unused).
pub const CSS_TIER_ROBUSTNESS: [u8; 11] = [0, 100, 95, 90, 80, 70, 60, 50, 40, 30, 19];

/// Tier groups executed as concurrent batches, in order.
pub const CSS_TIER_GROUPS: [(u8, u8); 3] = [(1, 4), (5, 7), (8, 10)];

/// The full CSS strategy table, tier order.
pub const CSS_STRATEGIES: [(u8, &str, StrategyFn); 10] = [
    (1, "id", css_id),
    (2, "test-attribute", css_test_attribute),
    (3, "combined-data-attributes", css_combined_data_attributes),
    (4, "type-and-name", css_type_and_name),
    (5, "stable-classes", css_stable_classes),
    (6, "parent-id-child", css_parent_id_child),
    (7, "ancestor-id-descendant", css_ancestor_id_descendant),
    (8, "pseudo-class", css_pseudo_class),
    (9, "nth-child", css_nth_child),
    (10, "nth-of-type", css_nth_of_type),
];

fn candidate(tier: u8, strategy: &'static str, value: String) -> Candidate {
    Candidate { tier, strategy, value }
}

/// Tier 1: `#id` from a stable DOM id.
fn css_id(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    element
        .id()
        .filter(|id| policy.is_stable_id(id))
        .map(|id| vec![candidate(1, "id", format!("#{id}"))])
        .unwrap_or_default()
}

/// Tier 2: `[data-testid="v"]`, the attributes test authors maintain.
fn css_test_attribute(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let mut out = Vec::new();
    for name in TEST_ATTRIBUTES {
        if let Some(value) = element.attr(name) {
            if policy.is_stable_attr_value(value) {
                out.push(candidate(2, "test-attribute", format!("[{name}=\"{value}\"]")));
                out.push(candidate(
                    2,
                    "test-attribute",
                    format!("{}[{name}=\"{value}\"]", element.tag_name),
                ));
            }
        }
    }
    out
}

/// Tier 3: two stable `data-*` attributes combined.
fn css_combined_data_attributes(
    tree: &DomTree,
    target: NodeId,
    policy: &StabilityPolicy,
) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let data: Vec<(&str, &str)> = element
        .attrs
        .iter()
        .filter(|(name, value)| {
            name.starts_with("data-")
                && !TEST_ATTRIBUTES.contains(&name.as_str())
                && policy.is_stable_attr_value(value)
        })
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    if data.len() < 2 {
        return Vec::new();
    }
    let (a, b) = (data[0], data[1]);
    vec![candidate(
        3,
        "combined-data-attributes",
        format!("{}[{}=\"{}\"][{}=\"{}\"]", element.tag_name, a.0, a.1, b.0, b.1),
    )]
}

/// Tier 4: form controls addressed by `type` + `name`.
fn css_type_and_name(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    if !matches!(element.tag_name.as_str(), "input" | "select" | "textarea" | "button") {
        return Vec::new();
    }
    let name = element.attr("name").filter(|v| policy.is_stable_attr_value(v));
    let kind = element.attr("type").filter(|v| policy.is_stable_attr_value(v));
    let mut out = Vec::new();
    if let (Some(kind), Some(name)) = (kind, name) {
        out.push(candidate(
            4,
            "type-and-name",
            format!("{}[type=\"{kind}\"][name=\"{name}\"]", element.tag_name),
        ));
    }
    if let Some(name) = element.attr("name").filter(|v| policy.is_stable_attr_value(v)) {
        out.push(candidate(4, "type-and-name", format!("{}[name=\"{name}\"]", element.tag_name)));
    }
    out
}

/// Tier 5: up to three stable classes, tag-qualified and bare.
fn css_stable_classes(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let stable: Vec<&str> = element.classes().filter(|c| policy.is_stable_class(c)).take(3).collect();
    if stable.is_empty() {
        return Vec::new();
    }
    let classes = stable.iter().map(|c| format!(".{c}")).collect::<String>();
    vec![
        candidate(5, "stable-classes", format!("{}{classes}", element.tag_name)),
        candidate(5, "stable-classes", classes),
    ]
}

/// Tier 6: `#parentId > tag`, optionally narrowed by a stable class.
fn css_parent_id_child(tree: &DomTree, target: NodeId, policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let Some(parent) = tree.parent(target) else { return Vec::new() };
    let Some(parent_id) = tree.as_element(parent).and_then(|p| p.id()) else { return Vec::new() };
    if !policy.is_stable_id(parent_id) {
        return Vec::new();
    }
    let mut out =
        vec![candidate(6, "parent-id-child", format!("#{parent_id} > {}", element.tag_name))];
    if let Some(class) = element.classes().find(|c| policy.is_stable_class(c)) {
        out.push(candidate(
            6,
            "parent-id-child",
            format!("#{parent_id} > {}.{class}", element.tag_name),
        ));
    }
    out
}

/// Tier 7: `#ancestorId tag`, walking up to six ancestors.
fn css_ancestor_id_descendant(
    tree: &DomTree,
    target: NodeId,
    policy: &StabilityPolicy,
) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let mut out = Vec::new();
    for ancestor in tree.ancestors(target).take(6) {
        let Some(ancestor_id) = tree.as_element(ancestor).and_then(|a| a.id()) else { continue };
        if !policy.is_stable_id(ancestor_id) {
            continue;
        }
        out.push(candidate(
            7,
            "ancestor-id-descendant",
            format!("#{ancestor_id} {}", element.tag_name),
        ));
        if let Some(class) = element.classes().find(|c| policy.is_stable_class(c)) {
            out.push(candidate(
                7,
                "ancestor-id-descendant",
                format!("#{ancestor_id} {}.{class}", element.tag_name),
            ));
        }
        break;
    }
    out
}

/// Tier 8: form-state pseudo-classes derived from attributes.
fn css_pseudo_class(tree: &DomTree, target: NodeId, _policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    [("disabled", ":disabled"), ("required", ":required"), ("checked", ":checked"), ("readonly", ":read-only")]
        .iter()
        .filter(|(attr, _)| element.attr(attr).is_some())
        .map(|(_, pseudo)| {
            candidate(8, "pseudo-class", format!("{}{pseudo}", element.tag_name))
        })
        .collect()
}

/// Tier 9: `:nth-child(N)`, parent-qualified when possible.
fn css_nth_child(tree: &DomTree, target: NodeId, _policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let Some(position) = tree.position_in_parent(target) else { return Vec::new() };
    let mut out = Vec::new();
    if let Some(parent_tag) = tree.parent(target).and_then(|p| tree.tag_name(p)) {
        out.push(candidate(
            9,
            "nth-child",
            format!("{parent_tag} > {}:nth-child({position})", element.tag_name),
        ));
    }
    out.push(candidate(9, "nth-child", format!("{}:nth-child({position})", element.tag_name)));
    out
}

/// Tier 10: `:nth-of-type(N)`, parent-qualified when possible.
fn css_nth_of_type(tree: &DomTree, target: NodeId, _policy: &StabilityPolicy) -> Vec<Candidate> {
    let Some(element) = tree.as_element(target) else { return Vec::new() };
    let Some(position) = tree.same_tag_position(target) else { return Vec::new() };
    let mut out = Vec::new();
    if let Some(parent_tag) = tree.parent(target).and_then(|p| tree.tag_name(p)) {
        out.push(candidate(
            10,
            "nth-of-type",
            format!("{parent_tag} > {}:nth-of-type({position})", element.tag_name),
        ));
    }
    out.push(candidate(10, "nth-of-type", format!("{}:nth-of-type({position})", element.tag_name)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_dom::NodeId;

    fn policy() -> StabilityPolicy {
        StabilityPolicy::with_defaults()
    }

    #[test]
    fn id_strategy_respects_stability() {
        let mut tree = DomTree::new();
        let html = tree.append_element(NodeId::ROOT, "html", &[]);
        let stable = tree.append_element(html, "div", &[("id", "hero")]);
        let unstable = tree.append_element(html, "div", &[("id", "jss42")]);
        assert_eq!(css_id(&tree, stable, &policy())[0].value, "#hero");
        assert!(css_id(&tree, unstable, &policy()).is_empty());
    }

    #[test]
    fn test_attribute_strategy_emits_bare_and_tagged() {
        let mut tree = DomTree::new();
        let html = tree.append_element(NodeId::ROOT, "html", &[]);
        let button = tree.append_element(html, "button", &[("data-testid", "submit")]);
        let values: Vec<String> =
            css_test_attribute(&tree, button, &policy()).into_iter().map(|c| c.value).collect();
        assert!(values.contains(&"[data-testid=\"submit\"]".to_owned()));
        assert!(values.contains(&"button[data-testid=\"submit\"]".to_owned()));
    }

    #[test]
    fn stable_classes_filters_generated_names() {
        let mut tree = DomTree::new();
        let html = tree.append_element(NodeId::ROOT, "html", &[]);
        let button =
            tree.append_element(html, "button", &[("class", "btn css-1q2w3e primary jss9")]);
        let values: Vec<String> =
            css_stable_classes(&tree, button, &policy()).into_iter().map(|c| c.value).collect();
        assert!(values.contains(&"button.btn.primary".to_owned()));
        assert!(values.contains(&".btn.primary".to_owned()));
    }

    #[test]
    fn structural_strategies_use_positions() {
        let mut tree = DomTree::new();
        let html = tree.append_element(NodeId::ROOT, "html", &[]);
        let ul = tree.append_element(html, "ul", &[]);
        tree.append_element(ul, "li", &[]);
        let second = tree.append_element(ul, "li", &[]);
        let nth: Vec<String> =
            css_nth_child(&tree, second, &policy()).into_iter().map(|c| c.value).collect();
        assert!(nth.contains(&"ul > li:nth-child(2)".to_owned()));
        let of_type: Vec<String> =
            css_nth_of_type(&tree, second, &policy()).into_iter().map(|c| c.value).collect();
        assert!(of_type.contains(&"li:nth-of-type(2)".to_owned()));
    }

    #[test]
    fn every_strategy_is_in_a_group() {
        for (tier, _, _) in CSS_STRATEGIES {
            assert!(
                CSS_TIER_GROUPS.iter().any(|&(lo, hi)| tier >= lo && tier <= hi),
                "tier {tier} not covered by a group"
            );
        }
    }
}
