//! Pre-submission file type checks
//!
//! Validation is pure: failures come back as values carrying a message key,
//! never as faults, so callers can render them inline.

use thiserror::Error;

use crate::models::raw_asset::mime;
use crate::models::RawAsset;

/// Primary file types accepted for import
pub const PRIMARY_MIME_TYPES: [&str; 3] = [mime::CSV, mime::XLS, mime::XLSX];

/// Asset file types accepted alongside the primary file
pub const ASSET_MIME_TYPES: [&str; 2] = [mime::JPEG, mime::PNG];

pub const MISSING_PRIMARY_KEY: &str = "Please select a file to import.";
pub const UNSUPPORTED_FILE_KEY: &str = "Unsupported file type. Please upload a CSV, XLS, or XLSX file.";
pub const UNSUPPORTED_ASSET_KEY: &str =
    "Unsupported file extension. Please upload a JPG, JPEG, or PNG file.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No primary file selected")]
    MissingPrimaryFile,

    #[error("Unsupported file type for {name}: {mime_type}")]
    UnsupportedFileType { name: String, mime_type: String },

    #[error("Unsupported asset type for {name}: {mime_type}")]
    UnsupportedAssetType { name: String, mime_type: String },
}

impl ValidationError {
    /// Localization key shown to the user
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationError::MissingPrimaryFile => MISSING_PRIMARY_KEY,
            ValidationError::UnsupportedFileType { .. } => UNSUPPORTED_FILE_KEY,
            ValidationError::UnsupportedAssetType { .. } => UNSUPPORTED_ASSET_KEY,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportValidator;

impl ImportValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a primary file together with its optional asset set
    pub fn validate(
        &self,
        primary_file: Option<&RawAsset>,
        asset_files: &[RawAsset],
    ) -> Result<(), ValidationError> {
        let primary = primary_file.ok_or(ValidationError::MissingPrimaryFile)?;
        self.validate_primary(primary)?;
        self.validate_assets(asset_files)
    }

    pub fn validate_primary(&self, file: &RawAsset) -> Result<(), ValidationError> {
        if accepts(&PRIMARY_MIME_TYPES, file.mime_type()) {
            Ok(())
        } else {
            Err(ValidationError::UnsupportedFileType {
                name: file.name().to_string(),
                mime_type: file.mime_type().to_string(),
            })
        }
    }

    /// All-or-nothing: the first unsupported asset fails the whole set
    pub fn validate_assets(&self, asset_files: &[RawAsset]) -> Result<(), ValidationError> {
        match asset_files
            .iter()
            .find(|asset| !accepts(&ASSET_MIME_TYPES, asset.mime_type()))
        {
            Some(asset) => Err(ValidationError::UnsupportedAssetType {
                name: asset.name().to_string(),
                mime_type: asset.mime_type().to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Compare ignoring case and any `;charset=...` parameters
fn accepts(accepted: &[&str], declared: &str) -> bool {
    let essence = declared.split(';').next().unwrap_or_default().trim();
    accepted.iter().any(|m| m.eq_ignore_ascii_case(essence))
}
