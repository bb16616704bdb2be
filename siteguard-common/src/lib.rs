//! # SiteGuard Common Library
//!
//! Shared code for the SiteGuard screening crates:
//! - Error taxonomy
//! - Bootstrap configuration loading (TOML)
//! - Distance unit conversions

pub mod config;
pub mod error;
pub mod units;

pub use error::{Error, Result};
