//! CSS selector parsing and matching.
//!
//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/)
//!
//! This is deliberately a subset engine: it understands exactly the grammar
//! the CSS strategies emit (type, `#id`, `.class`, attribute equality,
//! a few form pseudo-classes, `:nth-child`/`:nth-of-type`, descendant and
//! child combinators). Candidate validation parses every generated
//! selector through here, so an unparseable candidate is rejected rather
//! than trusted.

use magpie_dom::{DomTree, NodeId};

/// Parse failure for a selector string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorParseError {
    /// What the parser choked on.
    pub message: String,
}

impl std::fmt::Display for SelectorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid selector: {}", self.message)
    }
}

impl std::error::Error for SelectorParseError {}

/// [§ 5 Elemental selectors](https://www.w3.org/TR/selectors-4/#elemental-selectors)
/// [§ 6 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
///
/// One condition on a single element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// `div`, `button`
    Type(String),
    /// `#hero`
    Id(String),
    /// `.btn`
    Class(String),
    /// `[disabled]`
    AttrExists(String),
    /// `[type="text"]`
    AttrEquals(String, String),
    /// `:disabled`, `:required`, `:checked`, `:read-only`
    Pseudo(PseudoClass),
    /// `:nth-child(3)` - position among element siblings, 1-based
    NthChild(usize),
    /// `:nth-of-type(2)` - position among same-tag siblings, 1-based
    NthOfType(usize),
}

/// Form-state pseudo-classes the strategies emit.
///
/// Matched structurally from attributes, since a report snapshot has no
/// live form state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoClass {
    /// `:disabled` - element carries the `disabled` attribute
    Disabled,
    /// `:required` - element carries the `required` attribute
    Required,
    /// `:checked` - element carries the `checked` attribute
    Checked,
    /// `:read-only` - element carries the `readonly` attribute
    ReadOnly,
}

/// A compound selector: all conditions on one element (`input.form[name="q"]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    /// The conditions; all must hold.
    pub parts: Vec<SimpleSelector>,
}

/// [§ 14 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: ancestor/descendant.
    Descendant,
    /// `>`: parent/child.
    Child,
}

/// A complex selector: compounds joined by combinators, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// The leftmost compound.
    pub first: CompoundSelector,
    /// Each following combinator + compound pair.
    pub rest: Vec<(Combinator, CompoundSelector)>,
}

impl Selector {
    /// Parse a selector string.
    pub fn parse(input: &str) -> Result<Self, SelectorParseError> {
        Parser { input: input.as_bytes(), pos: 0 }.parse_selector(input)
    }

    /// The rightmost compound (the one that must match the subject).
    fn subject(&self) -> &CompoundSelector {
        self.rest.last().map_or(&self.first, |(_, compound)| compound)
    }

    /// True if `node` matches this selector within `tree`.
    ///
    /// The subject compound is checked first, then combinators are walked
    /// right to left: `>` steps to the parent, whitespace scans all
    /// ancestors.
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        if !matches_compound(tree, node, self.subject()) {
            return false;
        }
        // Compounds to the left of the subject, paired with the combinator
        // that connects them to the compound on their right.
        let mut remaining: Vec<(&CompoundSelector, Combinator)> = Vec::new();
        let mut left = &self.first;
        for (combinator, compound) in &self.rest {
            remaining.push((left, *combinator));
            left = compound;
        }

        let mut current = node;
        while let Some((compound, combinator)) = remaining.pop() {
            match combinator {
                Combinator::Child => {
                    let Some(parent) = tree.parent(current) else { return false };
                    if !matches_compound(tree, parent, compound) {
                        return false;
                    }
                    current = parent;
                }
                Combinator::Descendant => {
                    let mut found = None;
                    for ancestor in tree.ancestors(current) {
                        if matches_compound(tree, ancestor, compound) {
                            found = Some(ancestor);
                            break;
                        }
                    }
                    // NOTE: first-match ancestor scanning is not fully
                    // general for pathological selector chains, but it is
                    // exact for the anchored forms the strategies emit
                    // (at most one descendant combinator from an id/attr
                    // anchor).
                    match found {
                        Some(ancestor) => current = ancestor,
                        None => return false,
                    }
                }
            }
        }
        true
    }

    /// All elements of `tree` matching this selector, in document order.
    pub fn query_all(&self, tree: &DomTree) -> Vec<NodeId> {
        tree.elements().filter(|&id| self.matches(tree, id)).collect()
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_compound(f, &self.first)?;
        for (combinator, compound) in &self.rest {
            match combinator {
                Combinator::Descendant => write!(f, " ")?,
                Combinator::Child => write!(f, " > ")?,
            }
            write_compound(f, compound)?;
        }
        Ok(())
    }
}

fn write_compound(f: &mut std::fmt::Formatter<'_>, compound: &CompoundSelector) -> std::fmt::Result {
    for part in &compound.parts {
        match part {
            SimpleSelector::Type(tag) => write!(f, "{tag}")?,
            SimpleSelector::Id(id) => write!(f, "#{id}")?,
            SimpleSelector::Class(class) => write!(f, ".{class}")?,
            SimpleSelector::AttrExists(name) => write!(f, "[{name}]")?,
            SimpleSelector::AttrEquals(name, value) => write!(f, "[{name}=\"{value}\"]")?,
            SimpleSelector::Pseudo(PseudoClass::Disabled) => write!(f, ":disabled")?,
            SimpleSelector::Pseudo(PseudoClass::Required) => write!(f, ":required")?,
            SimpleSelector::Pseudo(PseudoClass::Checked) => write!(f, ":checked")?,
            SimpleSelector::Pseudo(PseudoClass::ReadOnly) => write!(f, ":read-only")?,
            SimpleSelector::NthChild(n) => write!(f, ":nth-child({n})")?,
            SimpleSelector::NthOfType(n) => write!(f, ":nth-of-type({n})")?,
        }
    }
    Ok(())
}

fn matches_compound(tree: &DomTree, node: NodeId, compound: &CompoundSelector) -> bool {
    let Some(element) = tree.as_element(node) else { return false };
    compound.parts.iter().all(|part| match part {
        SimpleSelector::Type(tag) => element.tag_name == *tag,
        SimpleSelector::Id(id) => element.id() == Some(id.as_str()),
        SimpleSelector::Class(class) => element.has_class(class),
        SimpleSelector::AttrExists(name) => element.attr(name).is_some(),
        SimpleSelector::AttrEquals(name, value) => element.attr(name) == Some(value.as_str()),
        SimpleSelector::Pseudo(pseudo) => {
            let attr = match pseudo {
                PseudoClass::Disabled => "disabled",
                PseudoClass::Required => "required",
                PseudoClass::Checked => "checked",
                PseudoClass::ReadOnly => "readonly",
            };
            element.attr(attr).is_some()
        }
        SimpleSelector::NthChild(n) => tree.position_in_parent(node) == Some(*n),
        SimpleSelector::NthOfType(n) => tree.same_tag_position(node) == Some(*n),
    })
}

/// Hand-rolled recursive-descent parser over the selector bytes.
struct Parser<'input> {
    input: &'input [u8],
    pos: usize,
}

impl Parser<'_> {
    fn parse_selector(&mut self, original: &str) -> Result<Selector, SelectorParseError> {
        self.skip_whitespace();
        let first = self.parse_compound()?;
        if first.parts.is_empty() {
            return Err(self.error("empty selector"));
        }
        let mut rest = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            if self.at_end() {
                break;
            }
            let combinator = if self.peek() == Some(b'>') {
                self.pos += 1;
                self.skip_whitespace();
                Combinator::Child
            } else if had_space {
                Combinator::Descendant
            } else {
                return Err(self.error("expected combinator"));
            };
            let compound = self.parse_compound()?;
            if compound.parts.is_empty() {
                return Err(self.error("dangling combinator"));
            }
            rest.push((combinator, compound));
        }
        if original.trim().is_empty() {
            return Err(self.error("empty selector"));
        }
        Ok(Selector { first, rest })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorParseError> {
        let mut parts = Vec::new();
        while let Some(byte) = self.peek() {
            match byte {
                b'#' => {
                    self.pos += 1;
                    parts.push(SimpleSelector::Id(self.parse_identifier()?));
                }
                b'.' => {
                    self.pos += 1;
                    parts.push(SimpleSelector::Class(self.parse_identifier()?));
                }
                b'[' => {
                    self.pos += 1;
                    parts.push(self.parse_attribute()?);
                }
                b':' => {
                    self.pos += 1;
                    parts.push(self.parse_pseudo()?);
                }
                b if (b as char).is_ascii_alphabetic() => {
                    if parts.iter().any(|p| matches!(p, SimpleSelector::Type(_))) {
                        return Err(self.error("second type selector in compound"));
                    }
                    if !parts.is_empty() {
                        // A type selector must come first in a compound.
                        return Err(self.error("type selector after other parts"));
                    }
                    parts.push(SimpleSelector::Type(self.parse_identifier()?.to_ascii_lowercase()));
                }
                _ => break,
            }
        }
        Ok(CompoundSelector { parts })
    }

    fn parse_attribute(&mut self) -> Result<SimpleSelector, SelectorParseError> {
        let name = self.parse_identifier()?;
        self.skip_whitespace();
        match self.peek() {
            Some(b']') => {
                self.pos += 1;
                Ok(SimpleSelector::AttrExists(name))
            }
            Some(b'=') => {
                self.pos += 1;
                self.skip_whitespace();
                let value = self.parse_quoted_or_bare()?;
                self.skip_whitespace();
                if self.peek() != Some(b']') {
                    return Err(self.error("unterminated attribute selector"));
                }
                self.pos += 1;
                Ok(SimpleSelector::AttrEquals(name, value))
            }
            _ => Err(self.error("malformed attribute selector")),
        }
    }

    fn parse_pseudo(&mut self) -> Result<SimpleSelector, SelectorParseError> {
        let name = self.parse_identifier()?;
        match name.as_str() {
            "disabled" => Ok(SimpleSelector::Pseudo(PseudoClass::Disabled)),
            "required" => Ok(SimpleSelector::Pseudo(PseudoClass::Required)),
            "checked" => Ok(SimpleSelector::Pseudo(PseudoClass::Checked)),
            "read-only" => Ok(SimpleSelector::Pseudo(PseudoClass::ReadOnly)),
            "nth-child" => Ok(SimpleSelector::NthChild(self.parse_index_argument()?)),
            "nth-of-type" => Ok(SimpleSelector::NthOfType(self.parse_index_argument()?)),
            other => Err(self.error(&format!("unsupported pseudo-class ':{other}'"))),
        }
    }

    fn parse_index_argument(&mut self) -> Result<usize, SelectorParseError> {
        if self.peek() != Some(b'(') {
            return Err(self.error("expected '('"));
        }
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("bad index"))?;
        let index: usize = digits.parse().map_err(|_| self.error("bad index"))?;
        if self.peek() != Some(b')') {
            return Err(self.error("expected ')'"));
        }
        self.pos += 1;
        if index == 0 {
            return Err(self.error("index must be 1-based"));
        }
        Ok(index)
    }

    fn parse_quoted_or_bare(&mut self) -> Result<String, SelectorParseError> {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
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
            _ => self.parse_identifier(),
        }
    }

    fn parse_identifier(&mut self) -> Result<String, SelectorParseError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| (b as char).is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .map(str::to_owned)
            .map_err(|_| self.error("bad identifier"))
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn error(&self, message: &str) -> SelectorParseError {
        SelectorParseError { message: format!("{message} at byte {}", self.pos) }
    }
}
