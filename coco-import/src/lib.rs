//! coco-import: two-phase bulk import pipeline
//!
//! A spreadsheet is uploaded for a server-side preview parse, image assets
//! are reconciled against the preview locally, and the same upload is then
//! committed as one request.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;

pub use crate::config::{ConfigOverrides, ImportConfig};
pub use crate::error::{Error, Result};
pub use crate::pipeline::{ImportPipeline, ImportSessionHandle};

use std::sync::Arc;

use coco_common::{Catalog, Translate};

/// Translation catalog named by the config, or the identity catalog
pub fn load_translator(config: &ImportConfig) -> Result<Arc<dyn Translate>> {
    let catalog = match config.translations_path() {
        Some(path) => Catalog::load(path)?,
        None => Catalog::identity(),
    };
    Ok(Arc::new(catalog))
}
