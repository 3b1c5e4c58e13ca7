//! Data models for the import pipeline

pub mod asset_url;
pub mod entity_kind;
pub mod import_session;
pub mod notice;
pub mod preview_record;
pub mod raw_asset;

pub use asset_url::AssetUrl;
pub use coco_common::events::{ImportPhase, RequestKind};
pub use entity_kind::EntityKind;
pub use import_session::{
    AssetSummary, ImportSession, PendingRequest, PhaseTransition, SessionContext,
    SessionRejection, SessionSnapshot, StaleResponse, Ticket,
};
pub use notice::{Notice, NoticeKind};
pub use preview_record::PreviewRecord;
pub use raw_asset::RawAsset;
