use crate::config::OverlayConfig;
use crate::error::OverlayError;
use crate::orientation::Orientation;
use async_trait::async_trait;
use image::RgbaImage;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Where overlay artwork comes from
#[async_trait]
pub trait OverlaySource: Send + Sync {
    /// Fetch and decode the overlay for an orientation
    async fn fetch(&self, orientation: Orientation) -> Result<RgbaImage, OverlayError>;

    /// Human-readable location of the overlay, for logs
    fn locate(&self, orientation: Orientation) -> String;
}

/// Overlays stored as image files in one directory
#[derive(Debug, Clone)]
pub struct DirectoryOverlaySource {
    dir: PathBuf,
    portrait_file: String,
    landscape_file: String,
}

impl DirectoryOverlaySource {
    pub fn new<P: Into<PathBuf>>(dir: P, portrait_file: &str, landscape_file: &str) -> Self {
        Self {
            dir: dir.into(),
            portrait_file: portrait_file.to_string(),
            landscape_file: landscape_file.to_string(),
        }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(&config.dir, &config.portrait_file, &config.landscape_file)
    }

    pub fn path_for(&self, orientation: Orientation) -> PathBuf {
        match orientation {
            Orientation::Portrait => self.dir.join(&self.portrait_file),
            Orientation::Landscape => self.dir.join(&self.landscape_file),
        }
    }
}

#[async_trait]
impl OverlaySource for DirectoryOverlaySource {
    async fn fetch(&self, orientation: Orientation) -> Result<RgbaImage, OverlayError> {
        let path = self.path_for(orientation);
        debug!("Reading overlay {}", path.display());

        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => OverlayError::NotFound {
                path: path.display().to_string(),
            },
            _ => OverlayError::Read {
                path: path.display().to_string(),
                details: e.to_string(),
            },
        })?;

        tokio::task::spawn_blocking(move || {
            image::load_from_memory(&bytes)
                .map(|img| img.to_rgba8())
                .map_err(|e| OverlayError::Decode {
                    orientation,
                    details: e.to_string(),
                })
        })
        .await
        .map_err(|e| OverlayError::Decode {
            orientation,
            details: format!("decode task failed: {}", e),
        })?
    }

    fn locate(&self, orientation: Orientation) -> String {
        self.path_for(orientation).display().to_string()
    }
}

/// Pre-decoded overlays held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryOverlaySource {
    overlays: HashMap<Orientation, RgbaImage>,
}

impl MemoryOverlaySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, orientation: Orientation, overlay: RgbaImage) -> Self {
        self.overlays.insert(orientation, overlay);
        self
    }
}

#[async_trait]
impl OverlaySource for MemoryOverlaySource {
    async fn fetch(&self, orientation: Orientation) -> Result<RgbaImage, OverlayError> {
        self.overlays
            .get(&orientation)
            .cloned()
            .ok_or_else(|| OverlayError::NotFound {
                path: self.locate(orientation),
            })
    }

    fn locate(&self, orientation: Orientation) -> String {
        format!("memory:{}", orientation)
    }
}
