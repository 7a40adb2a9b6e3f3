//! # WNC Common Library
//!
//! Shared code for the web-novel classifier crates including:
//! - Error types
//! - Configuration file and data folder resolution
//! - Canonical genre labels and confidence tiers
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod genre;
pub mod time;

pub use error::{Error, Result};
pub use genre::ConfidenceTier;
