//! Lookup-label enrichment for foreign-key fields
//!
//! A record holding `under_category: 3` gains `under_category_name: "Public"`
//! when the `categories` table has an entry with id 3, or `"N/A"` otherwise.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::PreviewRecord;
use crate::{Error, Result};

pub const MISSING_LABEL: &str = "N/A";

/// One selectable entry: integer id plus display label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOption {
    pub value: i64,
    pub label: String,
}

/// Accepts `{value, label}` or a raw API row `{id, name | reference_name | title}`
#[derive(Deserialize)]
struct RawLookupOption {
    value: Option<i64>,
    id: Option<i64>,
    label: Option<String>,
    name: Option<String>,
    reference_name: Option<String>,
    title: Option<String>,
}

impl RawLookupOption {
    fn into_option(self) -> Option<LookupOption> {
        Some(LookupOption {
            value: self.value.or(self.id)?,
            label: self
                .label
                .or(self.name)
                .or(self.reference_name)
                .or(self.title)
                .unwrap_or_default(),
        })
    }
}

/// Named lookup tables, e.g. `categories`, `states`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LookupTables {
    #[serde(deserialize_with = "deserialize_tables")]
    tables: HashMap<String, Vec<LookupOption>>,
}

/// Rows without an id can never be referenced and are dropped
fn deserialize_tables<'de, D>(
    deserializer: D,
) -> std::result::Result<HashMap<String, Vec<LookupOption>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, Vec<RawLookupOption>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, rows)| {
            let total = rows.len();
            let options: Vec<LookupOption> =
                rows.into_iter().filter_map(RawLookupOption::into_option).collect();
            if options.len() < total {
                tracing::warn!(
                    table = %name,
                    skipped = total - options.len(),
                    "Skipping lookup rows without an id"
                );
            }
            (name, options)
        })
        .collect())
}

impl LookupTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, options: Vec<LookupOption>) {
        self.tables.insert(table.into(), options);
    }

    pub fn table(&self, name: &str) -> &[LookupOption] {
        self.tables.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Load `{ "<table>": [ {id, name}, ... ], ... }` from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let tables: Self = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Parse lookup tables failed ({}): {}", path.display(), e))
        })?;
        tracing::info!(
            tables = tables.tables.len(),
            "Loaded lookup tables from {}",
            path.display()
        );
        Ok(tables)
    }

    fn label_for(&self, table: &str, raw: &Value) -> Value {
        let label = lookup_id(raw)
            .and_then(|id| self.table(table).iter().find(|o| o.value == id))
            .map(|o| o.label.clone())
            .unwrap_or_else(|| MISSING_LABEL.to_string());
        Value::String(label)
    }
}

/// Adds `<field>_name` labels to records
#[derive(Debug, Clone)]
pub struct LookupEnricher {
    fields: Vec<(String, String)>,
}

impl LookupEnricher {
    /// `fields` pairs a record field with the lookup table that resolves it
    pub fn new<F, T>(fields: impl IntoIterator<Item = (F, T)>) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(f, t)| (f.into(), t.into()))
                .collect(),
        }
    }

    /// New record with label fields added; the input is left untouched
    pub fn enrich(&self, record: &PreviewRecord, tables: &LookupTables) -> PreviewRecord {
        let mut enriched = record.clone();

        for (field, table) in &self.fields {
            let Some(value) = record.get(field) else {
                continue;
            };
            if !is_truthy(value) {
                continue;
            }

            let label = match value {
                Value::Array(items) => Value::Array(
                    items.iter().map(|item| tables.label_for(table, item)).collect(),
                ),
                other => tables.label_for(table, other),
            };
            enriched = enriched.with_field(format!("{}_name", field), label);
        }

        enriched
    }

    pub fn enrich_all(&self, records: &[PreviewRecord], tables: &LookupTables) -> Vec<PreviewRecord> {
        records.iter().map(|r| self.enrich(r, tables)).collect()
    }
}

/// Integer id from a number or a numeric string (leading digits, like `parseInt`)
fn lookup_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            s[..end].parse().ok()
        }
        _ => None,
    }
}

/// Empty strings, zero, false and null carry no reference
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> PreviewRecord {
        match value {
            Value::Object(map) => PreviewRecord::new(map),
            other => panic!("expected object, got {}", other),
        }
    }

    fn tables() -> LookupTables {
        serde_json::from_value(json!({
            "categories": [
                {"id": 1, "name": "Public"},
                {"id": 2, "name": "Private"}
            ],
            "states": [
                {"value": 10, "label": "Ontario"}
            ],
            "exams": [
                {"id": 5, "reference_name": "SAT"},
                {"id": 6, "title": "ACT"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_adds_label_for_matching_id() {
        let enricher = LookupEnricher::new([("under_category", "categories"), ("state_province", "states")]);
        let rec = record(json!({"under_category": 2, "state_province": "10"}));

        let out = enricher.enrich(&rec, &tables());

        assert_eq!(out.text("under_category_name").as_deref(), Some("Private"));
        assert_eq!(out.text("state_province_name").as_deref(), Some("Ontario"));
        assert!(rec.get("under_category_name").is_none());
    }

    #[test]
    fn test_unmatched_id_is_not_available() {
        let enricher = LookupEnricher::new([("under_category", "categories")]);
        let out = enricher.enrich(&record(json!({"under_category": 99})), &tables());
        assert_eq!(out.text("under_category_name").as_deref(), Some(MISSING_LABEL));
    }

    #[test]
    fn test_empty_or_absent_values_are_skipped() {
        let enricher = LookupEnricher::new([("under_category", "categories")]);
        for value in [json!(""), json!(null), json!(0)] {
            let out = enricher.enrich(&record(json!({ "under_category": value })), &tables());
            assert!(out.get("under_category_name").is_none());
        }
        let out = enricher.enrich(&record(json!({"name": "MIT"})), &tables());
        assert!(out.get("under_category_name").is_none());
    }

    #[test]
    fn test_array_values_map_element_wise() {
        let enricher = LookupEnricher::new([("exam_references", "exams")]);
        let out = enricher.enrich(&record(json!({"exam_references": [5, "6", 7]})), &tables());
        assert_eq!(
            out.get("exam_references_name"),
            Some(&json!(["SAT", "ACT", "N/A"]))
        );
    }

    #[test]
    fn test_lookup_id_parses_leading_digits() {
        assert_eq!(lookup_id(&json!("42abc")), Some(42));
        assert_eq!(lookup_id(&json!(" 7 ")), Some(7));
        assert_eq!(lookup_id(&json!("abc")), None);
        assert_eq!(lookup_id(&json!(3.9)), Some(3));
    }

    #[test]
    fn test_unknown_table_yields_not_available() {
        let enricher = LookupEnricher::new([("campus", "campuses")]);
        let out = enricher.enrich(&record(json!({"campus": 1})), &tables());
        assert_eq!(out.text("campus_name").as_deref(), Some(MISSING_LABEL));
    }

    #[test]
    fn test_rows_without_id_are_skipped() {
        let tables: LookupTables = serde_json::from_value(json!({
            "categories": [
                {"name": "Orphan"},
                {"id": 1, "name": "Public"}
            ]
        }))
        .unwrap();
        assert_eq!(tables.table("categories").len(), 1);

        let enricher = LookupEnricher::new([("under_category", "categories")]);
        let out = enricher.enrich(&record(json!({"under_category": "0"})), &tables);
        assert_eq!(out.text("under_category_name").as_deref(), Some(MISSING_LABEL));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookups.json");
        std::fs::write(&path, r#"{"states": [{"id": 1, "name": "Quebec"}]}"#).unwrap();

        let tables = LookupTables::load(&path).unwrap();
        assert_eq!(tables.table("states").len(), 1);
        assert_eq!(tables.table("states")[0].label, "Quebec");
    }
}
