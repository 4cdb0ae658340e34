//! Common infrastructure for the Magpie comparison engine.
//!
//! This crate provides the pieces every other Magpie crate leans on:
//! - **Configuration** - the frozen [`config::MagpieConfig`] consumed
//!   read-only by normalization, matching, diffing, and selector generation
//! - **Diagnostics** - deduplicated accounting of recovered errors
//! - **Net** - blocking HTTP fetch used by the CLI to load remote reports

pub mod config;
pub mod diagnostics;
pub mod net;
