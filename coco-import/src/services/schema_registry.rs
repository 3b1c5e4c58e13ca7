//! Column schemas per entity kind
//!
//! Each entity kind owns an `EntitySchema`: the field that references its
//! asset file, the foreign-key fields that get lookup labels, and the column
//! specs. `columns_for` turns a schema into localized `ColumnDescriptor`s.
//! Adding an entity kind is a `register` call, not a new branch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use coco_common::Translate;
use serde_json::Value;

use crate::models::{EntityKind, PreviewRecord};

/// Cell renderer attached to a column
pub type CellRenderer = Arc<dyn Fn(&PreviewRecord) -> DisplayValue + Send + Sync>;

pub const ACTIVE_LABEL_KEY: &str = "Active";
pub const INACTIVE_LABEL_KEY: &str = "Inactive";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Success,
    Danger,
}

/// What a grid cell should show
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayValue {
    Text(String),
    Badge { label: String, tone: BadgeTone },
    /// Image with the URL to use if `src` is missing or fails to load
    Image { src: Option<String>, fallback: String },
    Empty,
}

impl DisplayValue {
    /// Plain-text rendering for terminal output
    pub fn as_text(&self) -> String {
        match self {
            DisplayValue::Text(s) => s.clone(),
            DisplayValue::Badge { label, .. } => label.clone(),
            DisplayValue::Image { src, fallback } => {
                src.clone().unwrap_or_else(|| fallback.clone())
            }
            DisplayValue::Empty => String::new(),
        }
    }
}

/// Localized column ready for a grid renderer
#[derive(Clone)]
pub struct ColumnDescriptor {
    pub key: String,
    pub label: String,
    pub sortable: bool,
    pub width: Option<String>,
    pub render: Option<CellRenderer>,
}

impl ColumnDescriptor {
    /// Value for one record, through the custom renderer when present
    pub fn display(&self, record: &PreviewRecord) -> DisplayValue {
        match &self.render {
            Some(render) => render(record),
            None => record
                .text(&self.key)
                .map(DisplayValue::Text)
                .unwrap_or(DisplayValue::Empty),
        }
    }
}

impl fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("sortable", &self.sortable)
            .field("width", &self.width)
            .field("render", &self.render.is_some())
            .finish()
    }
}

/// How a column's cells are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Plain,
    /// ISO timestamp shown as `YYYY-MM-DD`
    Date,
    /// Record's reconciled asset URL, falling back to the placeholder
    Thumbnail,
    /// Boolean-or-string status shown as an Active/Inactive badge
    StatusBadge,
}

/// Unlocalized column definition
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub key: &'static str,
    /// Label message key
    pub label: &'static str,
    pub sortable: bool,
    pub width: Option<&'static str>,
    pub kind: CellKind,
}

impl ColumnSpec {
    pub const fn plain(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            sortable: true,
            width: None,
            kind: CellKind::Plain,
        }
    }

    pub const fn width(mut self, width: &'static str) -> Self {
        self.width = Some(width);
        self
    }

    pub const fn kind(mut self, kind: CellKind) -> Self {
        self.kind = kind;
        if matches!(kind, CellKind::Thumbnail) {
            self.sortable = false;
        }
        self
    }
}

/// Everything the pipeline needs to know about one entity kind
#[derive(Debug, Clone)]
pub struct EntitySchema {
    /// Field whose value names the record's asset file
    pub asset_field: &'static str,
    /// `field -> lookup table` pairs for label enrichment
    pub lookup_fields: Vec<(&'static str, &'static str)>,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<EntityKind, EntitySchema>,
    placeholder_url: String,
}

impl SchemaRegistry {
    /// Empty registry
    pub fn new(placeholder_url: impl Into<String>) -> Self {
        Self {
            schemas: HashMap::new(),
            placeholder_url: placeholder_url.into(),
        }
    }

    /// Registry holding organization, campus and college schemas
    pub fn with_builtin_kinds(placeholder_url: impl Into<String>) -> Self {
        let mut registry = Self::new(placeholder_url);
        registry.register(EntityKind::Organization, organization_schema());
        registry.register(EntityKind::Campus, campus_schema());
        registry.register(EntityKind::College, college_schema());
        registry
    }

    pub fn register(&mut self, kind: EntityKind, schema: EntitySchema) {
        self.schemas.insert(kind, schema);
    }

    pub fn schema(&self, kind: EntityKind) -> Option<&EntitySchema> {
        self.schemas.get(&kind)
    }

    pub fn asset_field(&self, kind: EntityKind) -> Option<&'static str> {
        self.schema(kind).map(|s| s.asset_field)
    }

    pub fn placeholder_url(&self) -> &str {
        &self.placeholder_url
    }

    /// Localized columns for a kind; an unregistered kind has no columns
    pub fn columns_for(&self, kind: EntityKind, t: &dyn Translate) -> Vec<ColumnDescriptor> {
        let Some(schema) = self.schema(kind) else {
            return Vec::new();
        };

        schema
            .columns
            .iter()
            .map(|spec| self.describe(spec, t))
            .collect()
    }

    /// Same as `columns_for`, keyed by the wire tag
    ///
    /// Unknown tags yield no columns rather than an error.
    pub fn columns_for_tag(&self, tag: &str, t: &dyn Translate) -> Vec<ColumnDescriptor> {
        match EntityKind::from_tag(tag) {
            Some(kind) => self.columns_for(kind, t),
            None => {
                tracing::debug!(tag = %tag, "No schema for entity tag");
                Vec::new()
            }
        }
    }

    fn describe(&self, spec: &ColumnSpec, t: &dyn Translate) -> ColumnDescriptor {
        let key = spec.key;
        let render: Option<CellRenderer> = match spec.kind {
            CellKind::Plain => None,
            CellKind::Date => Some(Arc::new(move |record: &PreviewRecord| {
                record
                    .text(key)
                    .map(|raw| DisplayValue::Text(format_date(&raw)))
                    .unwrap_or(DisplayValue::Empty)
            })),
            CellKind::Thumbnail => {
                let fallback = self.placeholder_url.clone();
                Some(Arc::new(move |record: &PreviewRecord| DisplayValue::Image {
                    src: record.asset_url().map(|u| u.as_str().to_string()),
                    fallback: fallback.clone(),
                }))
            }
            CellKind::StatusBadge => {
                let active = t.t(ACTIVE_LABEL_KEY);
                let inactive = t.t(INACTIVE_LABEL_KEY);
                Some(Arc::new(move |record: &PreviewRecord| {
                    if normalize_status(record.get(key)) {
                        DisplayValue::Badge {
                            label: active.clone(),
                            tone: BadgeTone::Success,
                        }
                    } else {
                        DisplayValue::Badge {
                            label: inactive.clone(),
                            tone: BadgeTone::Danger,
                        }
                    }
                }))
            }
        };

        ColumnDescriptor {
            key: key.to_string(),
            label: t.t(spec.label),
            sortable: spec.sortable,
            width: spec.width.map(str::to_string),
            render,
        }
    }
}

/// Interpret a status field that may arrive as text or as a boolean
///
/// Text compares case-insensitively to `"true"`; booleans pass through;
/// numbers are active when non-zero. Anything else is inactive.
pub fn normalize_status(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn format_date(raw: &str) -> String {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.format("%Y-%m-%d").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}

fn organization_schema() -> EntitySchema {
    EntitySchema {
        asset_field: "logo_file",
        lookup_fields: vec![
            ("under_category", "categories"),
            ("state_province", "states"),
        ],
        columns: vec![
            ColumnSpec::plain("id", "ID"),
            ColumnSpec::plain("updated_at", "Updated")
                .width("110px")
                .kind(CellKind::Date),
            ColumnSpec::plain("logo_file", "Logo").kind(CellKind::Thumbnail),
            ColumnSpec::plain("name", "Name").width("130px"),
            ColumnSpec::plain("under_category_name", "Category").width("95px"),
            ColumnSpec::plain("web_address", "Web Address").width("180px"),
            ColumnSpec::plain("country_name", "Country").width("130px"),
            ColumnSpec::plain("state_province_name", "State").width("130px"),
            ColumnSpec::plain("city", "City").width("100px"),
            ColumnSpec::plain("address_line1", "Address Line 1").width("150px"),
            ColumnSpec::plain("address_line2", "Address Line 2").width("150px"),
            ColumnSpec::plain("postal_code", "Postal Code"),
            ColumnSpec::plain("status", "Status")
                .width("100px")
                .kind(CellKind::StatusBadge),
        ],
    }
}

fn campus_schema() -> EntitySchema {
    EntitySchema {
        asset_field: "logo_file",
        lookup_fields: vec![
            ("organization", "organizations"),
            ("state_province", "states"),
        ],
        columns: vec![
            ColumnSpec::plain("id", "ID"),
            ColumnSpec::plain("updated_at", "Updated")
                .width("110px")
                .kind(CellKind::Date),
            ColumnSpec::plain("logo_file", "Logo").kind(CellKind::Thumbnail),
            ColumnSpec::plain("name", "Name").width("130px"),
            ColumnSpec::plain("organization_name", "Organization").width("150px"),
            ColumnSpec::plain("country_name", "Country").width("130px"),
            ColumnSpec::plain("state_province_name", "State").width("130px"),
            ColumnSpec::plain("city", "City").width("100px"),
            ColumnSpec::plain("address_line1", "Address Line 1").width("150px"),
            ColumnSpec::plain("status", "Status")
                .width("100px")
                .kind(CellKind::StatusBadge),
        ],
    }
}

fn college_schema() -> EntitySchema {
    EntitySchema {
        asset_field: "logo_file",
        lookup_fields: vec![
            ("organization", "organizations"),
            ("campus", "campuses"),
        ],
        columns: vec![
            ColumnSpec::plain("id", "ID"),
            ColumnSpec::plain("updated_at", "Updated")
                .width("110px")
                .kind(CellKind::Date),
            ColumnSpec::plain("logo_file", "Logo").kind(CellKind::Thumbnail),
            ColumnSpec::plain("name", "Name").width("130px"),
            ColumnSpec::plain("organization_name", "Organization").width("150px"),
            ColumnSpec::plain("campus_name", "Campus").width("130px"),
            ColumnSpec::plain("web_address", "Web Address").width("180px"),
            ColumnSpec::plain("status", "Status")
                .width("100px")
                .kind(CellKind::StatusBadge),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetUrl;
    use coco_common::Catalog;
    use serde_json::json;
    use uuid::Uuid;

    fn record(value: Value) -> PreviewRecord {
        match value {
            Value::Object(map) => PreviewRecord::new(map),
            other => panic!("expected object, got {}", other),
        }
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::with_builtin_kinds("/images/placeholder.png")
    }

    fn status_column(registry: &SchemaRegistry) -> ColumnDescriptor {
        registry
            .columns_for_tag("educational_organizations_app", &Catalog::identity())
            .into_iter()
            .find(|c| c.key == "status")
            .unwrap()
    }

    #[test]
    fn test_status_badge_normalizes_text_and_bool() {
        let registry = registry();
        let column = status_column(&registry);

        for (value, expected) in [
            (json!(true), "Active"),
            (json!("True"), "Active"),
            (json!(false), "Inactive"),
            (json!("false"), "Inactive"),
        ] {
            let shown = column.display(&record(json!({ "status": value })));
            assert_eq!(shown.as_text(), expected, "status {:?}", value);
        }
    }

    #[test]
    fn test_status_badge_tone() {
        let registry = registry();
        let column = status_column(&registry);

        let shown = column.display(&record(json!({"status": "TRUE"})));
        assert_eq!(
            shown,
            DisplayValue::Badge {
                label: "Active".to_string(),
                tone: BadgeTone::Success
            }
        );
    }

    #[test]
    fn test_normalize_status_edge_values() {
        assert!(normalize_status(Some(&json!(1))));
        assert!(!normalize_status(Some(&json!(0))));
        assert!(!normalize_status(Some(&Value::Null)));
        assert!(!normalize_status(None));
        assert!(!normalize_status(Some(&json!("yes"))));
    }

    #[test]
    fn test_unknown_tag_has_no_columns() {
        let columns = registry().columns_for_tag("question_app", &Catalog::identity());
        assert!(columns.is_empty());
    }

    #[test]
    fn test_empty_registry_has_no_columns() {
        let registry = SchemaRegistry::new("/p.png");
        assert!(registry
            .columns_for(EntityKind::Campus, &Catalog::identity())
            .is_empty());
    }

    #[test]
    fn test_labels_are_localized() {
        let t = |key: &str| format!("[{}]", key);
        let columns = registry().columns_for(EntityKind::Organization, &t);

        let status = columns.iter().find(|c| c.key == "status").unwrap();
        assert_eq!(status.label, "[Status]");
        assert_eq!(
            status.display(&record(json!({"status": true}))).as_text(),
            "[Active]"
        );
    }

    #[test]
    fn test_every_kind_has_identity_thumbnail_and_status() {
        let registry = registry();
        for kind in EntityKind::ALL {
            let columns = registry.columns_for(kind, &Catalog::identity());
            assert!(columns.iter().any(|c| c.key == "id"), "{}", kind);
            assert!(columns.iter().any(|c| c.key == "status"), "{}", kind);
            assert!(
                columns
                    .iter()
                    .any(|c| c.key == registry.asset_field(kind).unwrap()),
                "{}",
                kind
            );
        }
    }

    #[test]
    fn test_thumbnail_falls_back_to_placeholder() {
        let registry = registry();
        let columns = registry.columns_for(EntityKind::Organization, &Catalog::identity());
        let logo = columns.iter().find(|c| c.key == "logo_file").unwrap();
        assert!(!logo.sortable);

        let bare = record(json!({"logo_file": "a.png"}));
        assert_eq!(
            logo.display(&bare),
            DisplayValue::Image {
                src: None,
                fallback: "/images/placeholder.png".to_string()
            }
        );

        let url = AssetUrl::new(Uuid::new_v4(), "http://127.0.0.1:9/assets/a");
        let linked = bare.with_asset_url(Some(url));
        assert_eq!(logo.display(&linked).as_text(), "http://127.0.0.1:9/assets/a");
    }

    #[test]
    fn test_date_column_trims_timestamp() {
        let columns = registry().columns_for(EntityKind::College, &Catalog::identity());
        let updated = columns.iter().find(|c| c.key == "updated_at").unwrap();

        let rec = record(json!({"updated_at": "2024-03-05T10:20:30Z"}));
        assert_eq!(updated.display(&rec).as_text(), "2024-03-05");
        assert_eq!(
            updated.display(&record(json!({}))),
            DisplayValue::Empty
        );
    }
}
