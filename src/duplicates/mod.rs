//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - The size → partial fingerprint → full fingerprint funnel ([`finder`])
//! - Duplicate group management ([`groups`])

pub mod finder;
pub mod groups;

pub use finder::{DuplicateFinder, FinderConfig, FunnelStats};
pub use groups::{name_key, DuplicateGroup};
