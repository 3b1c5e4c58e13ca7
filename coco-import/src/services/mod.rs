//! Pipeline services
//!
//! Validation, schema lookup and reconciliation are pure and synchronous.
//! The transport and listing clients are the only network-facing pieces.

pub mod asset_matcher;
pub mod import_transport;
pub mod import_validator;
pub mod listing_client;
pub mod lookup_enricher;
pub mod object_urls;
pub mod schema_registry;

pub use asset_matcher::{ambiguous_names, AssetMatcher, StagedAsset};
pub use import_transport::{
    CommitReceipt, HttpImportTransport, ImportRequest, ImportTransport, ServerPayload,
    SuccessRange, TransportError,
};
pub use import_validator::{ImportValidator, ValidationError};
pub use listing_client::{ListingClient, ListingPage};
pub use lookup_enricher::{LookupEnricher, LookupOption, LookupTables};
pub use object_urls::{AssetUrlRegistry, ObjectUrlStore};
pub use schema_registry::{
    BadgeTone, CellKind, ColumnDescriptor, ColumnSpec, DisplayValue, EntitySchema,
    SchemaRegistry,
};
