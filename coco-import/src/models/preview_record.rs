//! Preview records returned by the server's parse of the primary file

use serde::Serialize;
use serde_json::{Map, Value};

use super::AssetUrl;

/// One parsed row plus the locally derived asset URL
///
/// Records are never updated in place: every change produces a new record
/// through `with_asset_url` / `with_field`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRecord {
    #[serde(flatten)]
    fields: Map<String, Value>,

    /// Set by reconciliation, `None` when no staged asset matched
    asset_url: Option<AssetUrl>,
}

impl PreviewRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            asset_url: None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Field rendered as plain text
    ///
    /// Strings are returned as-is, numbers and booleans formatted; null,
    /// arrays and objects yield `None`.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn asset_url(&self) -> Option<&AssetUrl> {
        self.asset_url.as_ref()
    }

    /// Copy of this record with the given asset URL
    pub fn with_asset_url(&self, asset_url: Option<AssetUrl>) -> Self {
        Self {
            fields: self.fields.clone(),
            asset_url,
        }
    }

    /// Copy of this record with one field added or replaced
    pub fn with_field(&self, key: impl Into<String>, value: Value) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(key.into(), value);
        Self {
            fields,
            asset_url: self.asset_url.clone(),
        }
    }
}

impl From<Map<String, Value>> for PreviewRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn record(value: Value) -> PreviewRecord {
        match value {
            Value::Object(map) => PreviewRecord::new(map),
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_text_formats_scalars() {
        let rec = record(json!({"name": "MIT", "id": 7, "status": true, "city": null}));
        assert_eq!(rec.text("name").as_deref(), Some("MIT"));
        assert_eq!(rec.text("id").as_deref(), Some("7"));
        assert_eq!(rec.text("status").as_deref(), Some("true"));
        assert_eq!(rec.text("city"), None);
        assert_eq!(rec.text("missing"), None);
    }

    #[test]
    fn test_with_asset_url_leaves_original_untouched() {
        let rec = record(json!({"logo_file": "a.png"}));
        let url = AssetUrl::new(Uuid::new_v4(), "http://127.0.0.1:1/assets/x");

        let linked = rec.with_asset_url(Some(url.clone()));

        assert_eq!(rec.asset_url(), None);
        assert_eq!(linked.asset_url(), Some(&url));
        assert_eq!(linked.fields(), rec.fields());
    }

    #[test]
    fn test_serializes_flat_with_asset_url() {
        let url = AssetUrl::new(Uuid::new_v4(), "http://host/assets/1");
        let rec = record(json!({"name": "MIT"})).with_asset_url(Some(url));

        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["name"], "MIT");
        assert_eq!(value["asset_url"], "http://host/assets/1");
    }
}
