//! Business-object kinds that can be bulk imported

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity kind tag
///
/// Selects the column schema and the asset-reference field for a session.
/// The wire tag is what the import endpoint expects in its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "educational_organizations_app")]
    Organization,
    #[serde(rename = "campus_app")]
    Campus,
    #[serde(rename = "college_app")]
    College,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Organization,
        EntityKind::Campus,
        EntityKind::College,
    ];

    /// Wire tag sent as the multipart `type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Organization => "educational_organizations_app",
            EntityKind::Campus => "campus_app",
            EntityKind::College => "college_app",
        }
    }

    /// Resolve a wire tag or short alias (`organization`, `campus`, `college`)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "educational_organizations_app" | "organization" => Some(EntityKind::Organization),
            "campus_app" | "campus" => Some(EntityKind::Campus),
            "college_app" | "college" => Some(EntityKind::College),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = coco_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
            .ok_or_else(|| coco_common::Error::InvalidInput(format!("Unknown entity kind: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip_for_all_kinds() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_tag(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(EntityKind::from_tag("campus"), Some(EntityKind::Campus));
        assert_eq!(
            "organization".parse::<EntityKind>().unwrap(),
            EntityKind::Organization
        );
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(EntityKind::from_tag("questions"), None);
        assert!("questions".parse::<EntityKind>().is_err());
    }
}
