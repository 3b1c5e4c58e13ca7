//! # Coco Common Library
//!
//! Shared code for the coco import tooling, including:
//! - Error type
//! - Bootstrap configuration loading (TOML file)
//! - Import event types and EventBus
//! - Localization catalog

pub mod config;
pub mod error;
pub mod events;
pub mod i18n;

pub use error::{Error, Result};
pub use i18n::{Catalog, Translate};
