//! XPath parsing and evaluation.
//!
//! [XML Path Language 1.0](https://www.w3.org/TR/xpath-10/)
//!
//! Like the CSS engine, this is a subset evaluator scoped to the grammar
//! the XPath strategies emit: absolute and `//` location paths, tag or `*`
//! node tests, the `following-sibling::` axis, attribute/position/text
//! predicates, and the outer `(path)[N]` disambiguation form. Every
//! generated candidate is parsed and evaluated here before it is trusted,
//! so a candidate outside the subset is rejected, not mis-verified.
//!
//! Node ids double as document order (trees are built depth-first), which
//! keeps result ordering and `(path)[N]` indexing cheap.

use magpie_dom::{DomTree, NodeId};

/// Parse failure for an XPath string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathParseError {
    /// What the parser choked on.
    pub message: String,
}

impl std::fmt::Display for XPathParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid xpath: {}", self.message)
    }
}

impl std::error::Error for XPathParseError {}

/// [§ 2.2 Axes](https://www.w3.org/TR/xpath-10/#axes) - the three we emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `/step` - children of the context node.
    Child,
    /// `//step` - all descendants of the context node.
    Descendant,
    /// `following-sibling::step`.
    FollowingSibling,
}

/// [§ 2.3 Node Tests](https://www.w3.org/TR/xpath-10/#node-tests)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `*` - any element.
    Any,
    /// A specific tag.
    Tag(String),
}

/// [§ 2.4 Predicates](https://www.w3.org/TR/xpath-10/#predicates) - the
/// predicate forms the strategies emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `[@name='value']`
    AttrEquals(String, String),
    /// `[N]` - 1-based position within the step's per-context result.
    Position(usize),
    /// `[text()='value']` - the element's own text.
    TextEquals(String),
    /// `[normalize-space(text())='value']`
    NormalizedTextEquals(String),
    /// `[contains(normalize-space(.), 'value')]` - whole subtree text.
    ContainsText(String),
    /// `[contains(@attr, 'value')]`
    ContainsAttr(String, String),
}

/// One location step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// How this step moves from the context node.
    pub axis: Axis,
    /// Which elements it selects.
    pub test: NodeTest,
    /// Filters applied in order.
    pub predicates: Vec<Predicate>,
}

/// A parsed XPath expression.
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    /// The location steps, outermost first.
    pub steps: Vec<Step>,
    /// The `(path)[N]` wrapper, when present: 1-based index into the
    /// path's full result in document order.
    pub global_index: Option<usize>,
}

impl XPath {
    /// Parse an XPath string.
    pub fn parse(input: &str) -> Result<Self, XPathParseError> {
        Parser { input: input.as_bytes(), pos: 0 }.parse_xpath()
    }

    /// Evaluate against a tree, returning matches in document order.
    pub fn eval(&self, tree: &DomTree) -> Vec<NodeId> {
        let mut current = vec![tree.root()];
        for step in &self.steps {
            let mut next: Vec<NodeId> = Vec::new();
            for &context in &current {
                let mut matched: Vec<NodeId> = match step.axis {
                    Axis::Child => tree
                        .children(context)
                        .iter()
                        .copied()
                        .filter(|&id| test_matches(tree, id, &step.test))
                        .collect(),
                    Axis::Descendant => tree
                        .descendants(context)
                        .filter(|&id| test_matches(tree, id, &step.test))
                        .collect(),
                    Axis::FollowingSibling => tree
                        .following_element_siblings(context)
                        .into_iter()
                        .filter(|&id| test_matches(tree, id, &step.test))
                        .collect(),
                };
                // Predicates filter per context group, so `[N]` counts
                // positions within this context's matches, as XPath does.
                for predicate in &step.predicates {
                    matched = apply_predicate(tree, matched, predicate);
                }
                next.extend(matched);
            }
            next.sort_unstable();
            next.dedup();
            current = next;
        }
        match self.global_index {
            Some(index) => current.get(index - 1).map(|&id| vec![id]).unwrap_or_default(),
            None => current,
        }
    }
}

/// Parse and evaluate in one call.
pub fn query(tree: &DomTree, xpath: &str) -> Result<Vec<NodeId>, XPathParseError> {
    Ok(XPath::parse(xpath)?.eval(tree))
}

fn test_matches(tree: &DomTree, id: NodeId, test: &NodeTest) -> bool {
    match test {
        NodeTest::Any => tree.as_element(id).is_some(),
        NodeTest::Tag(tag) => tree.tag_name(id) == Some(tag.as_str()),
    }
}

fn apply_predicate(tree: &DomTree, matched: Vec<NodeId>, predicate: &Predicate) -> Vec<NodeId> {
    match predicate {
        Predicate::Position(n) => matched.get(n - 1).map(|&id| vec![id]).unwrap_or_default(),
        Predicate::AttrEquals(name, value) => matched
            .into_iter()
            .filter(|&id| {
                tree.as_element(id).is_some_and(|e| e.attr(name) == Some(value.as_str()))
            })
            .collect(),
        Predicate::TextEquals(value) | Predicate::NormalizedTextEquals(value) => {
            // Snapshot text is whitespace-collapsed at build time, so the
            // exact and normalize-space forms coincide here.
            matched.into_iter().filter(|&id| tree.own_text(id) == *value).collect()
        }
        Predicate::ContainsText(value) => {
            matched.into_iter().filter(|&id| tree.text_content(id).contains(value)).collect()
        }
        Predicate::ContainsAttr(name, value) => matched
            .into_iter()
            .filter(|&id| {
                tree.as_element(id).is_some_and(|e| e.attr(name).is_some_and(|a| a.contains(value)))
            })
            .collect(),
    }
}

struct Parser<'input> {
    input: &'input [u8],
    pos: usize,
}

impl Parser<'_> {
    fn parse_xpath(&mut self) -> Result<XPath, XPathParseError> {
        self.skip_whitespace();
        // `(path)[N]` wrapper form.
        if self.peek() == Some(b'(') {
            self.pos += 1;
            let steps = self.parse_steps()?;
            self.expect(b')')?;
            self.expect(b'[')?;
            let index = self.parse_number()?;
            self.expect(b']')?;
            self.skip_whitespace();
            if !self.at_end() {
                return Err(self.error("trailing input after (path)[N]"));
            }
            return Ok(XPath { steps, global_index: Some(index) });
        }
        let steps = self.parse_steps()?;
        self.skip_whitespace();
        if !self.at_end() {
            return Err(self.error("trailing input"));
        }
        Ok(XPath { steps, global_index: None })
    }

    fn parse_steps(&mut self) -> Result<Vec<Step>, XPathParseError> {
        let mut steps = Vec::new();
        loop {
            let axis = if self.consume_str("//") {
                Axis::Descendant
            } else if self.consume(b'/') {
                Axis::Child
            } else if steps.is_empty() {
                return Err(self.error("path must start with '/' or '//'"));
            } else {
                break;
            };
            let axis = if self.consume_str("following-sibling::") {
                // `/following-sibling::tag` - the slash carried us here,
                // the named axis overrides the default child move.
                Axis::FollowingSibling
            } else {
                axis
            };
            let test = self.parse_node_test()?;
            let mut predicates = Vec::new();
            while self.peek() == Some(b'[') {
                self.pos += 1;
                predicates.push(self.parse_predicate()?);
                self.expect(b']')?;
            }
            steps.push(Step { axis, test, predicates });
            if self.peek() != Some(b'/') {
                break;
            }
        }
        if steps.is_empty() {
            return Err(self.error("empty path"));
        }
        Ok(steps)
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, XPathParseError> {
        if self.consume(b'*') {
            return Ok(NodeTest::Any);
        }
        let name = self.parse_name()?;
        Ok(NodeTest::Tag(name.to_ascii_lowercase()))
    }

    fn parse_predicate(&mut self) -> Result<Predicate, XPathParseError> {
        self.skip_whitespace();
        if self.peek().is_some_and(|b| b.is_ascii_digit()) {
            let n = self.parse_number()?;
            self.skip_whitespace();
            return Ok(Predicate::Position(n));
        }
        if self.consume(b'@') {
            let name = self.parse_name()?;
            self.skip_whitespace();
            self.expect(b'=')?;
            self.skip_whitespace();
            let value = self.parse_string()?;
            self.skip_whitespace();
            return Ok(Predicate::AttrEquals(name, value));
        }
        if self.consume_str("text()") {
            self.skip_whitespace();
            self.expect(b'=')?;
            self.skip_whitespace();
            let value = self.parse_string()?;
            self.skip_whitespace();
            return Ok(Predicate::TextEquals(value));
        }
        if self.consume_str("normalize-space(text())") {
            self.skip_whitespace();
            self.expect(b'=')?;
            self.skip_whitespace();
            let value = self.parse_string()?;
            self.skip_whitespace();
            return Ok(Predicate::NormalizedTextEquals(value));
        }
        if self.consume_str("contains(") {
            self.skip_whitespace();
            if self.consume_str("normalize-space(.)") {
                self.skip_whitespace();
                self.expect(b',')?;
                self.skip_whitespace();
                let value = self.parse_string()?;
                self.skip_whitespace();
                self.expect(b')')?;
                self.skip_whitespace();
                return Ok(Predicate::ContainsText(value));
            }
            if self.consume(b'@') {
                let name = self.parse_name()?;
                self.skip_whitespace();
                self.expect(b',')?;
                self.skip_whitespace();
                let value = self.parse_string()?;
                self.skip_whitespace();
                self.expect(b')')?;
                self.skip_whitespace();
                return Ok(Predicate::ContainsAttr(name, value));
            }
            return Err(self.error("unsupported contains() subject"));
        }
        Err(self.error("unsupported predicate"))
    }

    fn parse_string(&mut self) -> Result<String, XPathParseError> {
        let Some(quote @ (b'\'' | b'"')) = self.peek() else {
            return Err(self.error("expected string literal"));
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b != quote) {
            self.pos += 1;
        }
        if self.at_end() {
            return Err(self.error("unterminated string"));
        }
        let value = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("bad string"))?
            .to_owned();
        self.pos += 1;
        Ok(value)
    }

    fn parse_name(&mut self) -> Result<String, XPathParseError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| (b as char).is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected name"));
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .map(str::to_owned)
            .map_err(|_| self.error("bad name"))
    }

    fn parse_number(&mut self) -> Result<usize, XPathParseError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits =
            std::str::from_utf8(&self.input[start..self.pos]).map_err(|_| self.error("bad number"))?;
        let n: usize = digits.parse().map_err(|_| self.error("bad number"))?;
        if n == 0 {
            return Err(self.error("positions are 1-based"));
        }
        Ok(n)
    }

    fn consume(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn consume_str(&mut self, s: &str) -> bool {
        if self.input[self.pos..].starts_with(s.as_bytes()) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), XPathParseError> {
        if self.consume(byte) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn error(&self, message: &str) -> XPathParseError {
        XPathParseError { message: format!("{message} at byte {}", self.pos) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_dom::NodeId;

    /// `<html><body><form id="login"><label>Email</label><input name="email">
    /// <input name="pass"></form><div><p>one</p><p>two</p></div></body></html>`
    fn sample() -> (DomTree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let html = tree.append_element(NodeId::ROOT, "html", &[]);
        let body = tree.append_element(html, "body", &[]);
        let form = tree.append_element(body, "form", &[("id", "login")]);
        let label = tree.append_element(form, "label", &[]);
        tree.append_text(label, "Email");
        let email = tree.append_element(form, "input", &[("name", "email"), ("type", "text")]);
        let pass = tree.append_element(form, "input", &[("name", "pass")]);
        let div = tree.append_element(body, "div", &[]);
        let p1 = tree.append_element(div, "p", &[]);
        tree.append_text(p1, "one");
        let p2 = tree.append_element(div, "p", &[]);
        tree.append_text(p2, "two");
        let _ = p1;
        (tree, form, email, pass, p2)
    }

    #[test]
    fn attribute_queries() {
        let (tree, form, email, _, _) = sample();
        assert_eq!(query(&tree, "//*[@id='login']").unwrap(), vec![form]);
        assert_eq!(query(&tree, "//input[@name='email']").unwrap(), vec![email]);
        assert_eq!(
            query(&tree, "//input[@name='email'][@type='text']").unwrap(),
            vec![email]
        );
        assert!(query(&tree, "//input[@name='nope']").unwrap().is_empty());
    }

    #[test]
    fn text_predicates() {
        let (tree, _, _, _, p2) = sample();
        let label = query(&tree, "//label[text()='Email']").unwrap();
        assert_eq!(label.len(), 1);
        assert_eq!(query(&tree, "//p[normalize-space(text())='two']").unwrap(), vec![p2]);
        let contains = query(&tree, "//p[contains(normalize-space(.), 'tw')]").unwrap();
        assert_eq!(contains, vec![p2]);
    }

    #[test]
    fn positional_predicates_are_per_context() {
        let (tree, _, _, pass, p2) = sample();
        assert_eq!(query(&tree, "//form/input[2]").unwrap(), vec![pass]);
        assert_eq!(query(&tree, "/html/body/div/p[2]").unwrap(), vec![p2]);
    }

    #[test]
    fn global_index_form() {
        let (tree, _, email, pass, _) = sample();
        assert_eq!(query(&tree, "(//input)[1]").unwrap(), vec![email]);
        assert_eq!(query(&tree, "(//input)[2]").unwrap(), vec![pass]);
        assert!(query(&tree, "(//input)[9]").unwrap().is_empty());
    }

    #[test]
    fn following_sibling_axis() {
        let (tree, _, email, _, _) = sample();
        let after_label = query(&tree, "//label[text()='Email']/following-sibling::input[1]").unwrap();
        assert_eq!(after_label, vec![email]);
    }

    #[test]
    fn descendant_within_anchor() {
        let (tree, _, email, pass, _) = sample();
        assert_eq!(query(&tree, "//*[@id='login']//input").unwrap(), vec![email, pass]);
    }

    #[test]
    fn contains_attr() {
        let mut tree = DomTree::new();
        let html = tree.append_element(NodeId::ROOT, "html", &[]);
        let a = tree.append_element(html, "div", &[("class", "btn btn-primary")]);
        tree.append_element(html, "div", &[("class", "card")]);
        assert_eq!(query(&tree, "//div[contains(@class, 'btn')]").unwrap(), vec![a]);
    }

    #[test]
    fn malformed_paths_rejected() {
        for xpath in ["", "div", "//", "//div[", "//div[@x]", "//div[last()]", "(//div)", "//div[0]"] {
            assert!(XPath::parse(xpath).is_err(), "{xpath:?} should fail");
        }
    }
}
