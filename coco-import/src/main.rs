//! coco-import - command-line driver for the bulk import pipeline
//!
//! Previews a spreadsheet against the import endpoint, reconciles image
//! assets locally, prints the preview grid and optionally commits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use coco_common::events::{EventBus, ImportEvent};
use coco_import::models::{EntityKind, NoticeKind, RawAsset, SessionSnapshot};
use coco_import::services::{ColumnDescriptor, ListingClient, LookupTables};
use coco_import::{load_translator, ConfigOverrides, ImportConfig, ImportPipeline};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for coco-import
#[derive(Parser, Debug)]
#[command(name = "coco-import")]
#[command(about = "Preview and commit bulk imports of organizations, campuses and colleges")]
#[command(version)]
struct Args {
    /// Entity kind tag (educational_organizations_app, campus_app, college_app)
    #[arg(short, long)]
    kind: EntityKind,

    /// Primary spreadsheet (CSV, XLS or XLSX)
    #[arg(short, long)]
    file: PathBuf,

    /// Image assets referenced by the spreadsheet
    #[arg(short, long, num_args = 1..)]
    assets: Vec<PathBuf>,

    /// Commit after a successful preview
    #[arg(long)]
    commit: bool,

    /// Config file path
    #[arg(long, env = "COCO_CONFIG")]
    config: Option<PathBuf>,

    /// Import endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Listing endpoint re-fetched after a commit
    #[arg(long)]
    listing_endpoint: Option<String>,

    /// Page size for the listing re-fetch
    #[arg(long)]
    page_size: Option<u32>,

    /// JSON file of lookup tables for label enrichment
    #[arg(long)]
    lookups: Option<PathBuf>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        config_path: args.config.clone(),
        import_endpoint: args.endpoint.clone(),
        listing_endpoint: args.listing_endpoint.clone(),
        page_size: args.page_size,
        log_level: args.log_level.clone(),
    };
    let config = ImportConfig::load(&overrides).context("Failed to load configuration")?;

    init_tracing(&config)?;
    info!("Starting coco-import for {}", args.kind);

    let translator = load_translator(&config).context("Failed to load translations")?;
    let lookups = match &args.lookups {
        Some(path) => Some(LookupTables::load(path).context("Failed to load lookup tables")?),
        None => None,
    };

    let events = EventBus::new(64);
    spawn_event_logger(&events);

    let pipeline = ImportPipeline::from_config(&config, translator, lookups, events)
        .await
        .context("Failed to build import pipeline")?;
    let session = pipeline.create_session(args.kind);

    let primary = RawAsset::from_path(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let mut assets = Vec::with_capacity(args.assets.len());
    for path in &args.assets {
        assets.push(
            RawAsset::from_path(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        );
    }

    if !assets.is_empty() {
        session
            .select_asset_files(assets)
            .await
            .context("Asset files rejected")?;
    }

    let mut snapshot = session
        .select_primary_file(primary)
        .await
        .context("Primary file rejected")?;

    print_notice(&session).await;
    if let Some(error) = &snapshot.error {
        anyhow::bail!("Preview failed: {}", error);
    }

    print_grid(&pipeline.columns_for(args.kind), &snapshot);

    if args.commit {
        snapshot = session.commit().await.context("Commit rejected")?;
        print_notice(&session).await;

        if let Some(error) = &snapshot.error {
            anyhow::bail!("Commit failed: {}", error);
        }

        if let Some(endpoint) = &config.listing_endpoint {
            let listing = ListingClient::new(
                endpoint.clone(),
                config.page_size,
                config.success_range,
                config.request_timeout,
            )?;
            match listing.fetch_page(1).await {
                Ok(page) => info!(
                    records = page.results.len(),
                    total = ?page.count,
                    "Re-fetched {} listing",
                    args.kind
                ),
                Err(e) => warn!(error = %e, "Listing re-fetch failed"),
            }
        }
    }

    info!(phase = %snapshot.phase, "Import session finished");
    Ok(())
}

fn init_tracing(config: &ImportConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=warn", config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    match &config.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

fn spawn_event_logger(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match &event {
                ImportEvent::PreviewLoaded { record_count, .. } => {
                    info!(records = record_count, "Preview loaded")
                }
                ImportEvent::AssetsReconciled {
                    asset_count,
                    matched_records,
                    ..
                } => info!(
                    assets = asset_count,
                    matched = matched_records,
                    "Assets reconciled"
                ),
                other => debug!(event = ?other, "Import event"),
            }
        }
    });
}

async fn print_notice(session: &coco_import::ImportSessionHandle) {
    if let Some(notice) = session.active_notice().await {
        let tag = match notice.kind {
            NoticeKind::Success => "OK",
            NoticeKind::Error => "ERROR",
        };
        println!("[{}] {}", tag, notice.message);
    }
}

fn print_grid(columns: &[ColumnDescriptor], snapshot: &SessionSnapshot) {
    if columns.is_empty() || snapshot.preview_records.is_empty() {
        println!("(no records)");
        return;
    }

    let rows: Vec<Vec<String>> = snapshot
        .preview_records
        .iter()
        .map(|record| columns.iter().map(|c| c.display(record).as_text()).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.label.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c.label, w = *w))
        .collect();
    println!("{}", header.join(" | "));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    );

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
            .collect();
        println!("{}", cells.join(" | "));
    }

    println!(
        "{} record(s), {} asset(s) staged",
        snapshot.preview_records.len(),
        snapshot.asset_files.len()
    );
}
