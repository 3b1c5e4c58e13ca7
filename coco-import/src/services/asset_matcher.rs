//! Local reconciliation of staged assets against preview records
//!
//! Matching is by exact filename. The first staged asset with a given name
//! wins; later duplicates are reported but never used.

use std::collections::{HashMap, HashSet};

use crate::models::{AssetUrl, PreviewRecord, RawAsset};

/// Asset selected for the session plus the URL issued for it
#[derive(Debug, Clone)]
pub struct StagedAsset {
    pub asset: RawAsset,
    pub url: AssetUrl,
}

impl StagedAsset {
    pub fn new(asset: RawAsset, url: AssetUrl) -> Self {
        Self { asset, url }
    }

    pub fn name(&self) -> &str {
        self.asset.name()
    }
}

/// Reconciles records with staged assets through one reference field
#[derive(Debug, Clone)]
pub struct AssetMatcher {
    reference_field: String,
}

impl AssetMatcher {
    pub fn new(reference_field: impl Into<String>) -> Self {
        Self {
            reference_field: reference_field.into(),
        }
    }

    pub fn reference_field(&self) -> &str {
        &self.reference_field
    }

    /// Produce new records whose asset URL reflects the staged set
    ///
    /// Output record `i` corresponds to input record `i`. Records without a
    /// matching asset get `None`, clearing any URL from a previous set.
    pub fn reconcile(&self, records: &[PreviewRecord], staged: &[StagedAsset]) -> Vec<PreviewRecord> {
        let mut by_name: HashMap<&str, &AssetUrl> = HashMap::with_capacity(staged.len());
        for entry in staged {
            by_name.entry(entry.name()).or_insert(&entry.url);
        }

        let reconciled: Vec<PreviewRecord> = records
            .iter()
            .map(|record| {
                let url = record
                    .text(&self.reference_field)
                    .and_then(|name| by_name.get(name.as_str()).map(|u| (*u).clone()));
                record.with_asset_url(url)
            })
            .collect();

        tracing::debug!(
            field = %self.reference_field,
            records = records.len(),
            assets = staged.len(),
            matched = reconciled.iter().filter(|r| r.asset_url().is_some()).count(),
            "Reconciled assets"
        );

        reconciled
    }
}

/// Filenames staged more than once, in first-seen order
pub fn ambiguous_names(staged: &[StagedAsset]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();

    for entry in staged {
        if !seen.insert(entry.name()) && reported.insert(entry.name()) {
            duplicates.push(entry.name().to_string());
        }
    }

    duplicates
}
