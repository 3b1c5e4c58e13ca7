//! Import session state machine
//!
//! Idle → Previewing → PreviewReady → Committing → Committed, with Failed as
//! the landing phase for a rejected preview. The machine is synchronous: each
//! request is split into a `begin` step that returns the request to send plus
//! a ticket, and a `complete` step fed with the transport outcome. Tickets
//! carry the session generation so responses that outlive a reset or a newer
//! request are discarded instead of applied.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use coco_common::events::ImportEvent;
use coco_common::Translate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{EntityKind, ImportPhase, Notice, PreviewRecord, RawAsset, RequestKind};
use crate::services::asset_matcher::{ambiguous_names, AssetMatcher, StagedAsset};
use crate::services::import_transport::{
    ImportRequest, ServerPayload, TransportError, GENERIC_FAILURE_KEY,
};
use crate::services::import_validator::{ImportValidator, ValidationError};
use crate::services::lookup_enricher::{LookupEnricher, LookupTables};
use crate::services::object_urls::ObjectUrlStore;
use crate::services::schema_registry::SchemaRegistry;

pub const PREVIEW_SUCCESS_KEY: &str = "File parsed successfully!";
pub const COMMIT_SUCCESS_KEY: &str = "Import completed successfully.";

/// Asset reference field used when the schema registry has no entry
const DEFAULT_ASSET_FIELD: &str = "logo_file";

/// Collaborators shared by every session of a pipeline
#[derive(Clone)]
pub struct SessionContext {
    pub validator: ImportValidator,
    pub schema: Arc<SchemaRegistry>,
    pub urls: Arc<dyn ObjectUrlStore>,
    pub translator: Arc<dyn Translate>,
    pub lookups: Option<Arc<LookupTables>>,
    /// Auto-dismiss timer for notices
    pub alert_ttl: Duration,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("live_urls", &self.urls.live_count())
            .field("lookups", &self.lookups.is_some())
            .field("alert_ttl", &self.alert_ttl)
            .finish()
    }
}

/// Why a session operation was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionRejection {
    /// A request is already in flight
    #[error("Session is busy ({phase})")]
    Busy { phase: ImportPhase },

    #[error("Operation not allowed while {phase}")]
    NotAllowed { phase: ImportPhase },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Identifies one in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub kind: RequestKind,
}

/// Request to hand to the transport, with the ticket to complete it
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub ticket: Ticket,
    pub request: ImportRequest,
}

/// Response that arrived for a generation the session has moved past
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Discarded stale {kind:?} response (generation {ticket_generation}, current {current_generation})")]
pub struct StaleResponse {
    pub kind: RequestKind,
    pub ticket_generation: u64,
    pub current_generation: u64,
}

/// Phase change record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    pub session_id: Uuid,
    pub generation: u64,
    pub old_phase: ImportPhase,
    pub new_phase: ImportPhase,
    pub transitioned_at: DateTime<Utc>,
}

/// Name, type and size of a selected file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub name: String,
    pub mime_type: String,
    pub size: usize,
}

impl From<&RawAsset> for AssetSummary {
    fn from(asset: &RawAsset) -> Self {
        Self {
            name: asset.name().to_string(),
            mime_type: asset.mime_type().to_string(),
            size: asset.len(),
        }
    }
}

/// Read-only view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub entity_kind: EntityKind,
    pub phase: ImportPhase,
    pub generation: u64,
    pub primary_file: Option<AssetSummary>,
    pub asset_files: Vec<AssetSummary>,
    pub preview_records: Vec<PreviewRecord>,
    pub error: Option<String>,
    pub notice: Option<Notice>,
    pub started_at: DateTime<Utc>,
}

/// One user-initiated import
pub struct ImportSession {
    session_id: Uuid,
    entity_kind: EntityKind,
    phase: ImportPhase,
    generation: u64,
    primary_file: Option<RawAsset>,
    staged: Vec<StagedAsset>,
    /// Server records after lookup enrichment, without asset URLs
    parsed_records: Vec<PreviewRecord>,
    /// Parsed records reconciled against the staged assets
    preview_records: Vec<PreviewRecord>,
    error: Option<String>,
    notice: Option<Notice>,
    started_at: DateTime<Utc>,
    matcher: AssetMatcher,
    enricher: LookupEnricher,
    context: SessionContext,
    outbox: Vec<ImportEvent>,
}

impl ImportSession {
    pub fn new(entity_kind: EntityKind, context: SessionContext) -> Self {
        let schema = context.schema.schema(entity_kind);
        let asset_field = schema.map(|s| s.asset_field).unwrap_or(DEFAULT_ASSET_FIELD);
        let enricher = LookupEnricher::new(
            schema
                .map(|s| s.lookup_fields.clone())
                .unwrap_or_default(),
        );

        let session = Self {
            session_id: Uuid::new_v4(),
            entity_kind,
            phase: ImportPhase::Idle,
            generation: 0,
            primary_file: None,
            staged: Vec::new(),
            parsed_records: Vec::new(),
            preview_records: Vec::new(),
            error: None,
            notice: None,
            started_at: Utc::now(),
            matcher: AssetMatcher::new(asset_field),
            enricher,
            context,
            outbox: Vec::new(),
        };

        info!(
            session_id = %session.session_id,
            kind = %entity_kind,
            "Created import session"
        );
        session
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn primary_file(&self) -> Option<&RawAsset> {
        self.primary_file.as_ref()
    }

    pub fn staged_assets(&self) -> &[StagedAsset] {
        &self.staged
    }

    pub fn preview_records(&self) -> &[PreviewRecord] {
        &self.preview_records
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Current notice unless its timer has run out
    pub fn active_notice(&self, now: DateTime<Utc>) -> Option<&Notice> {
        self.notice.as_ref().filter(|n| !n.is_expired(now))
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Events raised since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<ImportEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Validate and stage a new primary file, starting a preview
    ///
    /// Admitted from Idle, PreviewReady and Failed. On validation failure the
    /// phase and records stay as they were.
    pub fn select_primary_file(
        &mut self,
        file: RawAsset,
    ) -> Result<PendingRequest, SessionRejection> {
        match self.phase {
            ImportPhase::Previewing | ImportPhase::Committing => {
                return Err(self.reject_busy("select_primary_file"))
            }
            ImportPhase::Committed => return Err(self.reject_not_allowed("select_primary_file")),
            ImportPhase::Idle | ImportPhase::PreviewReady | ImportPhase::Failed => {}
        }

        if let Err(e) = self.context.validator.validate_primary(&file) {
            return Err(self.reject_invalid(e));
        }

        self.parsed_records.clear();
        self.preview_records.clear();
        self.error = None;
        self.primary_file = Some(file.clone());

        Ok(self.begin(RequestKind::Preview, ImportPhase::Previewing, file))
    }

    /// Validate and stage asset files, re-reconciling locally
    ///
    /// Never issues a request. The previous asset set's URLs are released.
    /// Returns how many preview records received an asset URL.
    pub fn select_asset_files(&mut self, files: Vec<RawAsset>) -> Result<usize, SessionRejection> {
        match self.phase {
            ImportPhase::Committing => return Err(self.reject_busy("select_asset_files")),
            ImportPhase::Committed => return Err(self.reject_not_allowed("select_asset_files")),
            ImportPhase::Idle
            | ImportPhase::Previewing
            | ImportPhase::PreviewReady
            | ImportPhase::Failed => {}
        }

        if let Err(e) = self.context.validator.validate_assets(&files) {
            return Err(self.reject_invalid(e));
        }

        self.release_urls();
        self.staged = files
            .into_iter()
            .map(|asset| {
                let url = self.context.urls.acquire(&asset);
                StagedAsset::new(asset, url)
            })
            .collect();

        let duplicates = ambiguous_names(&self.staged);
        if !duplicates.is_empty() {
            warn!(
                session_id = %self.session_id,
                names = ?duplicates,
                "Duplicate asset filenames, first occurrence wins"
            );
        }

        self.preview_records = self.matcher.reconcile(&self.parsed_records, &self.staged);
        if self.phase != ImportPhase::Failed {
            self.error = None;
        }

        let matched = self.matched_count();
        debug!(
            session_id = %self.session_id,
            assets = self.staged.len(),
            matched,
            "Staged asset files"
        );
        self.outbox.push(ImportEvent::AssetsReconciled {
            session_id: self.session_id,
            asset_count: self.staged.len(),
            matched_records: matched,
            timestamp: Utc::now(),
        });

        Ok(matched)
    }

    /// Start the commit of the previewed import
    ///
    /// Only admitted in PreviewReady; resends the already validated files.
    pub fn begin_commit(&mut self) -> Result<PendingRequest, SessionRejection> {
        match self.phase {
            ImportPhase::PreviewReady => {}
            ImportPhase::Previewing | ImportPhase::Committing => {
                return Err(self.reject_busy("commit"))
            }
            ImportPhase::Idle | ImportPhase::Failed | ImportPhase::Committed => {
                return Err(self.reject_not_allowed("commit"))
            }
        }

        // PreviewReady is only reached through a preview of a primary file
        let Some(primary) = self.primary_file.clone() else {
            return Err(self.reject_not_allowed("commit"));
        };

        self.error = None;
        Ok(self.begin(RequestKind::Commit, ImportPhase::Committing, primary))
    }

    /// Apply a transport outcome to the request identified by `ticket`
    pub fn complete(
        &mut self,
        ticket: Ticket,
        outcome: Result<ServerPayload, TransportError>,
    ) -> Result<PhaseTransition, StaleResponse> {
        let expected_phase = match ticket.kind {
            RequestKind::Preview => ImportPhase::Previewing,
            RequestKind::Commit => ImportPhase::Committing,
        };

        if ticket.generation != self.generation || self.phase != expected_phase {
            let stale = StaleResponse {
                kind: ticket.kind,
                ticket_generation: ticket.generation,
                current_generation: self.generation,
            };
            warn!(
                session_id = %self.session_id,
                generation = self.generation,
                ticket_generation = ticket.generation,
                request = ?ticket.kind,
                "Discarding stale response"
            );
            self.outbox.push(ImportEvent::StaleResponseDiscarded {
                session_id: self.session_id,
                request: ticket.kind,
                ticket_generation: ticket.generation,
                current_generation: self.generation,
                timestamp: Utc::now(),
            });
            return Err(stale);
        }

        Ok(match (ticket.kind, outcome) {
            (RequestKind::Preview, Ok(ServerPayload::Records(rows))) => self.apply_preview(rows),
            (RequestKind::Commit, Ok(ServerPayload::Receipt(receipt))) => {
                self.apply_commit(receipt.display_message().map(str::to_string))
            }
            (kind, Ok(_)) => self.apply_failure(
                kind,
                TransportError::Decode(format!("unexpected payload for {:?} request", kind)),
            ),
            (kind, Err(e)) => self.apply_failure(kind, e),
        })
    }

    /// Back to Idle with everything cleared
    ///
    /// Releases all asset URLs and bumps the generation so any outstanding
    /// response is discarded when it lands.
    pub fn reset(&mut self) -> PhaseTransition {
        self.release_urls();
        self.primary_file = None;
        self.parsed_records.clear();
        self.preview_records.clear();
        self.error = None;
        self.notice = None;
        self.generation += 1;

        let transition = self.transition_to(ImportPhase::Idle);
        info!(
            session_id = %self.session_id,
            generation = self.generation,
            "Reset import session"
        );
        transition
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            entity_kind: self.entity_kind,
            phase: self.phase,
            generation: self.generation,
            primary_file: self.primary_file.as_ref().map(AssetSummary::from),
            asset_files: self
                .staged
                .iter()
                .map(|s| AssetSummary::from(&s.asset))
                .collect(),
            preview_records: self.preview_records.clone(),
            error: self.error.clone(),
            notice: self.notice.clone(),
            started_at: self.started_at,
        }
    }

    fn begin(
        &mut self,
        kind: RequestKind,
        phase: ImportPhase,
        primary_file: RawAsset,
    ) -> PendingRequest {
        self.generation += 1;
        self.transition_to(phase);

        let ticket = Ticket {
            generation: self.generation,
            kind,
        };
        let request = ImportRequest {
            entity_kind: self.entity_kind,
            primary_file,
            asset_files: self.staged.iter().map(|s| s.asset.clone()).collect(),
            preview: kind == RequestKind::Preview,
        };

        PendingRequest { ticket, request }
    }

    fn apply_preview(&mut self, rows: Vec<serde_json::Map<String, serde_json::Value>>) -> PhaseTransition {
        let records: Vec<PreviewRecord> = rows.into_iter().map(PreviewRecord::new).collect();
        self.parsed_records = match &self.context.lookups {
            Some(tables) => self.enricher.enrich_all(&records, tables),
            None => records,
        };
        self.preview_records = self.matcher.reconcile(&self.parsed_records, &self.staged);
        self.error = None;
        self.raise_success(PREVIEW_SUCCESS_KEY.to_string(), true);

        self.outbox.push(ImportEvent::PreviewLoaded {
            session_id: self.session_id,
            record_count: self.preview_records.len(),
            timestamp: Utc::now(),
        });
        self.transition_to(ImportPhase::PreviewReady)
    }

    fn apply_commit(&mut self, server_message: Option<String>) -> PhaseTransition {
        match server_message.clone() {
            Some(m) => self.raise_success(m, false),
            None => self.raise_success(COMMIT_SUCCESS_KEY.to_string(), true),
        }

        self.outbox.push(ImportEvent::ImportCommitted {
            session_id: self.session_id,
            record_count: self.preview_records.len(),
            message: server_message,
            timestamp: Utc::now(),
        });
        self.transition_to(ImportPhase::Committed)
    }

    fn apply_failure(&mut self, kind: RequestKind, error: TransportError) -> PhaseTransition {
        let message = error
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| self.context.translator.t(GENERIC_FAILURE_KEY));

        warn!(
            session_id = %self.session_id,
            request = ?kind,
            error = %error,
            "Import request failed"
        );

        self.error = Some(message.clone());
        self.notice = Some(Notice::error(message.clone(), self.context.alert_ttl));
        self.outbox.push(ImportEvent::ImportFailed {
            session_id: self.session_id,
            request: kind,
            message,
            timestamp: Utc::now(),
        });

        // A failed commit keeps the preview so the user can retry
        let next = match kind {
            RequestKind::Preview => ImportPhase::Failed,
            RequestKind::Commit => ImportPhase::PreviewReady,
        };
        self.transition_to(next)
    }

    fn raise_success(&mut self, message: String, translate: bool) {
        let message = if translate {
            self.context.translator.t(&message)
        } else {
            message
        };
        self.notice = Some(Notice::success(message, self.context.alert_ttl));
    }

    fn transition_to(&mut self, new_phase: ImportPhase) -> PhaseTransition {
        let transition = PhaseTransition {
            session_id: self.session_id,
            generation: self.generation,
            old_phase: self.phase,
            new_phase,
            transitioned_at: Utc::now(),
        };
        self.phase = new_phase;

        if transition.old_phase != new_phase {
            info!(
                session_id = %self.session_id,
                generation = self.generation,
                phase = %new_phase,
                records = self.preview_records.len(),
                assets = self.staged.len(),
                "{} -> {}",
                transition.old_phase,
                new_phase
            );
            self.outbox.push(ImportEvent::PhaseChanged {
                session_id: self.session_id,
                generation: self.generation,
                old_phase: transition.old_phase,
                new_phase,
                timestamp: transition.transitioned_at,
            });
        }

        transition
    }

    fn reject_busy(&self, operation: &str) -> SessionRejection {
        warn!(
            session_id = %self.session_id,
            phase = %self.phase,
            operation,
            "Rejected operation, request in flight"
        );
        SessionRejection::Busy { phase: self.phase }
    }

    fn reject_not_allowed(&self, operation: &str) -> SessionRejection {
        warn!(
            session_id = %self.session_id,
            phase = %self.phase,
            operation,
            "Rejected operation in current phase"
        );
        SessionRejection::NotAllowed { phase: self.phase }
    }

    fn reject_invalid(&mut self, error: ValidationError) -> SessionRejection {
        let message = self.context.translator.t(error.message_key());
        warn!(
            session_id = %self.session_id,
            phase = %self.phase,
            error = %error,
            "File validation failed"
        );
        self.error = Some(message.clone());
        self.notice = Some(Notice::error(message, self.context.alert_ttl));
        SessionRejection::Invalid(error)
    }

    fn matched_count(&self) -> usize {
        self.preview_records
            .iter()
            .filter(|r| r.asset_url().is_some())
            .count()
    }

    fn release_urls(&mut self) {
        for staged in self.staged.drain(..) {
            self.context.urls.release(&staged.url);
        }
    }
}

impl Drop for ImportSession {
    fn drop(&mut self) {
        self.release_urls();
    }
}

impl fmt::Debug for ImportSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportSession")
            .field("session_id", &self.session_id)
            .field("entity_kind", &self.entity_kind)
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("primary_file", &self.primary_file)
            .field("assets", &self.staged.len())
            .field("records", &self.preview_records.len())
            .field("error", &self.error)
            .finish()
    }
}
