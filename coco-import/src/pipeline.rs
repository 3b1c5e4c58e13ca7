//! Async driver for import sessions
//!
//! `ImportPipeline` owns the collaborators shared by every session and hands
//! out `ImportSessionHandle`s. A handle locks the session only around its
//! synchronous steps; the lock is never held across a transport call. The
//! phase guard inside the session is what keeps a second request out while
//! one is in flight.

use std::sync::Arc;

use chrono::Utc;
use coco_common::events::EventBus;
use coco_common::Translate;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::config::ImportConfig;
use crate::models::{
    EntityKind, ImportSession, Notice, PendingRequest, RawAsset, SessionContext, SessionRejection,
    SessionSnapshot,
};
use crate::services::{
    AssetUrlRegistry, ColumnDescriptor, HttpImportTransport, ImportTransport, ImportValidator,
    LookupTables, SchemaRegistry,
};
use crate::Result;

/// Factory for sessions sharing one transport, schema and URL store
#[derive(Clone)]
pub struct ImportPipeline {
    transport: Arc<dyn ImportTransport>,
    context: SessionContext,
    events: EventBus,
}

impl ImportPipeline {
    pub fn new(transport: Arc<dyn ImportTransport>, context: SessionContext, events: EventBus) -> Self {
        Self {
            transport,
            context,
            events,
        }
    }

    /// Wire the HTTP transport and a locally served URL registry from config
    pub async fn from_config(
        config: &ImportConfig,
        translator: Arc<dyn Translate>,
        lookups: Option<LookupTables>,
        events: EventBus,
    ) -> Result<Self> {
        let transport = HttpImportTransport::new(
            config.import_endpoint.clone(),
            config.success_range,
            config.request_timeout,
        )?;
        let urls = AssetUrlRegistry::serve(config.asset_server_port).await?;

        let context = SessionContext {
            validator: ImportValidator::new(),
            schema: Arc::new(SchemaRegistry::with_builtin_kinds(
                config.placeholder_asset_url.clone(),
            )),
            urls: Arc::new(urls),
            translator,
            lookups: lookups.map(Arc::new),
            alert_ttl: config.alert_timeout,
        };

        Ok(Self::new(Arc::new(transport), context, events))
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Localized columns for rendering a kind's preview
    pub fn columns_for(&self, kind: EntityKind) -> Vec<ColumnDescriptor> {
        self.context
            .schema
            .columns_for(kind, self.context.translator.as_ref())
    }

    /// Start a fresh session in Idle
    pub fn create_session(&self, kind: EntityKind) -> ImportSessionHandle {
        let session = ImportSession::new(kind, self.context.clone());
        ImportSessionHandle {
            session_id: session.session_id(),
            session: Arc::new(Mutex::new(session)),
            transport: Arc::clone(&self.transport),
            events: self.events.clone(),
        }
    }
}

/// Shared handle to one session
///
/// Clones drive the same session. Dropping the last clone drops the session,
/// which releases its asset URLs.
#[derive(Clone)]
pub struct ImportSessionHandle {
    session_id: Uuid,
    session: Arc<Mutex<ImportSession>>,
    transport: Arc<dyn ImportTransport>,
    events: EventBus,
}

impl ImportSessionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Select the primary file and run its preview to completion
    pub async fn select_primary_file(
        &self,
        file: RawAsset,
    ) -> std::result::Result<SessionSnapshot, SessionRejection> {
        let pending = {
            let mut session = self.lock().await;
            let begun = session.select_primary_file(file);
            self.publish(&mut session);
            begun?
        };
        Ok(self.run(pending).await)
    }

    /// Stage asset files and reconcile them locally; never hits the network
    pub async fn select_asset_files(
        &self,
        files: Vec<RawAsset>,
    ) -> std::result::Result<SessionSnapshot, SessionRejection> {
        let mut session = self.lock().await;
        let staged = session.select_asset_files(files);
        self.publish(&mut session);
        staged.map(|_| session.snapshot())
    }

    /// Commit the previewed import
    pub async fn commit(&self) -> std::result::Result<SessionSnapshot, SessionRejection> {
        let pending = {
            let mut session = self.lock().await;
            let begun = session.begin_commit();
            self.publish(&mut session);
            begun?
        };
        Ok(self.run(pending).await)
    }

    /// Return to Idle; responses still in flight will be discarded
    pub async fn reset(&self) -> SessionSnapshot {
        let mut session = self.lock().await;
        session.reset();
        self.publish(&mut session);
        session.snapshot()
    }

    pub async fn state(&self) -> SessionSnapshot {
        self.lock().await.snapshot()
    }

    pub async fn active_notice(&self) -> Option<Notice> {
        self.lock().await.active_notice(Utc::now()).cloned()
    }

    pub async fn dismiss_notice(&self) {
        self.lock().await.dismiss_notice();
    }

    async fn run(&self, pending: PendingRequest) -> SessionSnapshot {
        let PendingRequest { ticket, request } = pending;

        debug!(
            session_id = %self.session_id,
            generation = ticket.generation,
            request = ?ticket.kind,
            "Awaiting transport"
        );
        let outcome = self.transport.submit(&request).await;

        let mut session = self.lock().await;
        // A stale outcome is already logged and reported by the session
        let _ = session.complete(ticket, outcome);
        self.publish(&mut session);
        session.snapshot()
    }

    async fn lock(&self) -> MutexGuard<'_, ImportSession> {
        self.session.lock().await
    }

    fn publish(&self, session: &mut ImportSession) {
        for event in session.drain_events() {
            self.events.emit_lossy(event);
        }
    }
}

impl std::fmt::Debug for ImportSessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportSessionHandle")
            .field("session_id", &self.session_id)
            .finish()
    }
}
