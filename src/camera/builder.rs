use super::interface::CameraBackend;
use super::still::StillImageCamera;
use super::synthetic::SyntheticCamera;
use crate::config::{CameraConfig, CameraSource};
use crate::error::{PhotoboothError, Result};
use std::sync::Arc;
use tracing::info;

/// Builder for the configured camera backend
pub struct CameraBackendBuilder {
    config: Option<CameraConfig>,
}

impl CameraBackendBuilder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Arc<dyn CameraBackend>> {
        let config = self
            .config
            .ok_or_else(|| PhotoboothError::system("Camera configuration must be specified"))?;

        let backend: Arc<dyn CameraBackend> = match config.source {
            CameraSource::Synthetic => Arc::new(SyntheticCamera::new(config.sensor_resolution)),
            CameraSource::Still => {
                let path = config.still_path.as_deref().ok_or_else(|| {
                    PhotoboothError::system("Camera source 'still' requires still_path")
                })?;
                Arc::new(StillImageCamera::new(path))
            }
        };

        info!("Using '{}' camera backend", backend.name());
        Ok(backend)
    }
}

impl Default for CameraBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}
