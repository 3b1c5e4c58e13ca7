//! Session-scoped asset URL

use serde::{Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// URL under which a staged asset's bytes can be fetched locally
///
/// Valid from acquisition until it is released through the store that issued
/// it. The token identifies the asset inside that store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetUrl {
    token: Uuid,
    href: String,
}

impl AssetUrl {
    pub fn new(token: Uuid, href: impl Into<String>) -> Self {
        Self {
            token,
            href: href.into(),
        }
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn as_str(&self) -> &str {
        &self.href
    }
}

impl fmt::Display for AssetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href)
    }
}

impl Serialize for AssetUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.href)
    }
}
