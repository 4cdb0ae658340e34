//! Selector generation for Magpie element reports.
//!
//! Given a DOM snapshot and a target element, this crate synthesizes a
//! stable, unique CSS selector and XPath, each tagged with a 0-100
//! robustness score. Strategies are tiered (id and test attributes at the
//! top, bare positions at the bottom), run concurrently in groups under
//! per-strategy timeouts, and every candidate is validated against the
//! document before it is trusted. A positional fallback guarantees the
//! generator never comes back empty-handed.
//!
//! The same crate hosts the subset CSS ([`css`]) and XPath ([`xpath`])
//! engines that validation runs on.

pub mod css;
pub mod generator;
pub mod stability;
pub mod strategies_css;
pub mod strategies_xpath;
pub mod xpath;

pub use css::Selector;
pub use generator::{GeneratedSelector, GeneratedSelectors, SelectorGenerator};
pub use stability::StabilityPolicy;
pub use xpath::XPath;
