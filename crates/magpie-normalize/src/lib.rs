//! Style normalization for the Magpie comparison engine.
//!
//! Computed styles arrive as raw strings in whatever form the browser and
//! page author produced: `#f00`, `red`, and `rgb(255,0,0)` are the same
//! paint; `1em` and `16px` may be the same distance. This crate reduces
//! those heterogeneous forms to one comparable representation:
//!
//! - every color as `rgba(r, g, b, a)` ([`color`])
//! - every convertible length as `<number>px` ([`units`])
//! - `font-family` lists unquoted and consistently cased ([`font`])
//! - the common shorthands expanded to longhands ([`shorthand`])
//!
//! all orchestrated by [`engine::StyleNormalizer`], backed by the two-tier
//! LRU in [`cache`].

pub mod cache;
pub mod color;
pub mod engine;
pub mod font;
pub mod shorthand;
pub mod units;

pub use cache::{CacheStats, NormalizationCache};
pub use color::Rgba;
pub use engine::{StyleNormalizer, is_color_property, is_size_property};
pub use shorthand::StyleMap;
pub use units::{LayoutContext, parse_px};
