//! Localization
//!
//! Message keys are the English source strings; a catalog maps them to the
//! active locale. Keys missing from the catalog render as themselves.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Localization function `t(key)`
pub trait Translate: Send + Sync {
    fn t(&self, key: &str) -> String;
}

impl<F> Translate for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn t(&self, key: &str) -> String {
        self(key)
    }
}

/// Message catalog loaded from a TOML `[messages]` table
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    messages: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    messages: HashMap<String, String>,
}

impl Catalog {
    /// Catalog with no entries; every key renders as itself
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: HashMap<String, String>) -> Self {
        Self { messages }
    }

    /// Parse a catalog from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse translation catalog failed: {}", e)))?;
        Ok(Self::from_messages(file.messages))
    }

    /// Load a catalog file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        info!(
            "Loaded {} translations from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Translate for Catalog {
    fn t(&self, key: &str) -> String {
        self.messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
