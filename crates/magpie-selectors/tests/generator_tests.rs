//! Integration tests for selector generation over snapshot-built trees.

use std::sync::Arc;

use magpie_dom::DomTree;
use magpie_selectors::{Selector, SelectorGenerator, XPath};

fn login_page() -> Arc<DomTree> {
    let json = r#"{
        "root": {
            "tagName": "html",
            "children": [
                {
                    "tagName": "body",
                    "children": [
                        {
                            "tagName": "header",
                            "attributes": { "class": "site-header" },
                            "children": [
                                { "tagName": "a", "attributes": { "href": "/" },
                                  "children": [ { "text": "Home" } ] }
                            ]
                        },
                        {
                            "tagName": "form",
                            "attributes": { "id": "login" },
                            "children": [
                                { "tagName": "label", "children": [ { "text": "Email" } ] },
                                { "tagName": "input",
                                  "attributes": { "type": "email", "name": "email" } },
                                { "tagName": "label", "children": [ { "text": "Password" } ] },
                                { "tagName": "input",
                                  "attributes": { "type": "password", "name": "password" } },
                                { "tagName": "button",
                                  "attributes": { "data-testid": "submit", "class": "btn" },
                                  "children": [ { "text": "Sign in" } ] }
                            ]
                        },
                        {
                            "tagName": "ul",
                            "attributes": { "class": "css-a1b2c" },
                            "children": [
                                { "tagName": "li", "children": [ { "text": "Updated 14:30" } ] },
                                { "tagName": "li", "children": [ { "text": "Updated 15:45" } ] }
                            ]
                        }
                    ]
                }
            ]
        }
    }"#;
    Arc::new(DomTree::from_snapshot_json(json).expect("valid snapshot"))
}

#[test]
fn test_attribute_beats_everything_but_id() {
    let tree = login_page();
    let generator = SelectorGenerator::with_defaults();
    let button = tree.elements().find(|&id| tree.tag_name(id) == Some("button")).unwrap();
    let selectors = generator.generate(&tree, button);

    assert_eq!(selectors.css.value, "[data-testid=\"submit\"]");
    assert_eq!(selectors.css.strategy, "test-attribute");
    assert_eq!(selectors.css.confidence, 95);

    // Exact text is tier 0 on the XPath side, above test attributes.
    assert_eq!(selectors.xpath.value, "//button[text()='Sign in']");
    assert_eq!(selectors.xpath.confidence, 99);
}

#[test]
fn form_inputs_resolve_by_name() {
    let tree = login_page();
    let generator = SelectorGenerator::with_defaults();
    let email = tree
        .elements()
        .find(|&id| {
            tree.as_element(id).is_some_and(|e| e.attr("name") == Some("email"))
        })
        .unwrap();
    let selectors = generator.generate(&tree, email);

    assert_eq!(selectors.css.value, "input[type=\"email\"][name=\"email\"]");
    assert_eq!(selectors.css.strategy, "type-and-name");

    let matches = XPath::parse(&selectors.xpath.value).unwrap().eval(&tree);
    assert_eq!(matches, vec![email]);
}

#[test]
fn volatile_list_items_fall_through_to_structure() {
    let tree = login_page();
    let generator = SelectorGenerator::with_defaults();
    let second_li = tree
        .elements()
        .filter(|&id| tree.tag_name(id) == Some("li"))
        .nth(1)
        .unwrap();
    let selectors = generator.generate(&tree, second_li);

    // Text is volatile, the class is machine-generated; whatever strategy
    // wins must still resolve uniquely.
    let css_matches = Selector::parse(&selectors.css.value).unwrap().query_all(&tree);
    assert_eq!(css_matches, vec![second_li]);
    let xpath_matches = XPath::parse(&selectors.xpath.value).unwrap().eval(&tree);
    assert_eq!(xpath_matches, vec![second_li]);
}

#[test]
fn every_element_gets_both_selectors() {
    // Fallback totality over the whole document.
    let tree = login_page();
    let generator = SelectorGenerator::with_defaults();
    for element in tree.elements().collect::<Vec<_>>() {
        let selectors = generator.generate(&tree, element);
        assert!(!selectors.css.value.is_empty());
        assert!(!selectors.xpath.value.is_empty());
        assert!(selectors.css.confidence >= 19);
        assert!(selectors.xpath.confidence >= 30);

        let css_matches = Selector::parse(&selectors.css.value).unwrap().query_all(&tree);
        assert_eq!(css_matches, vec![element], "css {}", selectors.css.value);
        let xpath_matches = XPath::parse(&selectors.xpath.value).unwrap().eval(&tree);
        assert_eq!(xpath_matches, vec![element], "xpath {}", selectors.xpath.value);
    }
}
