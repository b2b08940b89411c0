use super::photo::CapturedImage;
use crate::error::{PhotoboothError, Result};
use crate::orientation::Orientation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// Sidecar record written next to a saved photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub photo_id: Uuid,
    pub file_name: String,
    pub orientation: Orientation,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
    pub overlay_applied: bool,
    pub captured_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

impl PhotoMetadata {
    pub fn new(image: &CapturedImage, file_name: &str, saved_at: DateTime<Utc>) -> Self {
        Self {
            photo_id: image.id(),
            file_name: file_name.to_string(),
            orientation: image.orientation(),
            width: image.width(),
            height: image.height(),
            bytes: image.len(),
            overlay_applied: image.overlay_applied(),
            captured_at: DateTime::<Utc>::from(image.captured_at()),
            saved_at,
        }
    }
}

/// Write `<dir>/metadata/<stem>.json`
pub(crate) async fn save_metadata(
    metadata: &PhotoMetadata,
    stem: &str,
    dir: &Path,
) -> Result<PathBuf> {
    let metadata_json = serde_json::to_string_pretty(metadata)?;

    let metadata_dir = dir.join("metadata");
    fs::create_dir_all(&metadata_dir).await.map_err(|e| {
        PhotoboothError::component(
            "download",
            &format!("Failed to create metadata directory: {}", e),
        )
    })?;

    let metadata_path = metadata_dir.join(format!("{}.json", stem));
    fs::write(&metadata_path, metadata_json).await.map_err(|e| {
        PhotoboothError::component("download", &format!("Failed to write metadata file: {}", e))
    })?;

    debug!("Saved metadata to {}", metadata_path.display());
    Ok(metadata_path)
}
