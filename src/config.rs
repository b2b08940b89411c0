use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PhotoboothConfig {
    pub camera: CameraConfig,
    pub overlay: OverlayConfig,
    pub flash: FlashConfig,
    pub output: OutputConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Which camera backend to open
    #[serde(default = "default_camera_source")]
    pub source: CameraSource,

    /// Picture served by the `still` backend
    #[serde(default)]
    pub still_path: Option<String>,

    /// Preferred stream width; the backend picks the closest it supports
    #[serde(default = "default_ideal_width")]
    pub ideal_width: u32,

    /// Requested facing mode
    #[serde(default = "default_facing")]
    pub facing: FacingMode,

    /// Full sensor size of the synthetic camera (width, height)
    #[serde(default = "default_sensor_resolution")]
    pub sensor_resolution: (u32, u32),
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraSource {
    Synthetic,
    Still,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Directory holding the frame overlays
    #[serde(default = "default_overlay_dir")]
    pub dir: String,

    #[serde(default = "default_portrait_file")]
    pub portrait_file: String,

    #[serde(default = "default_landscape_file")]
    pub landscape_file: String,

    /// What capture does while the overlay is missing
    #[serde(default = "default_overlay_policy")]
    pub policy: OverlayPolicy,
}

/// How capture treats an overlay that is not ready
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverlayPolicy {
    /// Never block; composite whatever is ready (possibly nothing)
    Fallback,
    /// Refuse to capture until the load resolves
    Block,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FlashConfig {
    /// How long the flash pulse stays visible
    #[serde(default = "default_flash_duration_ms")]
    pub duration_ms: u64,

    /// Delay before the photo is handed to the capture callback
    #[serde(default = "default_delivery_delay_ms")]
    pub delivery_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    /// Directory saved photos are written to
    #[serde(default = "default_output_dir")]
    pub dir: String,

    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,

    #[serde(default = "default_png_compression")]
    pub png_compression: PngCompression,

    /// Write a JSON sidecar next to each saved photo
    #[serde(default = "default_save_metadata")]
    pub save_metadata: bool,
}

/// PNG compression effort; output is lossless at every level
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    Fast,
    Default,
    Best,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl PhotoboothConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("photobooth.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.source", "synthetic")?
            .set_default("camera.ideal_width", default_ideal_width())?
            .set_default("camera.facing", "user")?
            .set_default(
                "camera.sensor_resolution",
                vec![
                    default_sensor_resolution().0,
                    default_sensor_resolution().1,
                ],
            )?
            .set_default("overlay.dir", default_overlay_dir())?
            .set_default("overlay.portrait_file", default_portrait_file())?
            .set_default("overlay.landscape_file", default_landscape_file())?
            .set_default("overlay.policy", "fallback")?
            .set_default("flash.duration_ms", default_flash_duration_ms())?
            .set_default("flash.delivery_delay_ms", default_delivery_delay_ms())?
            .set_default("output.dir", default_output_dir())?
            .set_default("output.filename_prefix", default_filename_prefix())?
            .set_default("output.png_compression", "fast")?
            .set_default("output.save_metadata", default_save_metadata())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // PHOTOBOOTH_OVERLAY__POLICY=block
            .add_source(
                Environment::with_prefix("PHOTOBOOTH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: PhotoboothConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.ideal_width == 0 {
            return Err(ConfigError::Message(
                "Camera ideal_width must be greater than 0".to_string(),
            ));
        }

        if self.camera.sensor_resolution.0 == 0 || self.camera.sensor_resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera sensor_resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.source == CameraSource::Still
            && self
                .camera
                .still_path
                .as_deref()
                .map_or(true, |p| p.trim().is_empty())
        {
            return Err(ConfigError::Message(
                "Camera source 'still' requires camera.still_path".to_string(),
            ));
        }

        if self.overlay.portrait_file.trim().is_empty()
            || self.overlay.landscape_file.trim().is_empty()
        {
            return Err(ConfigError::Message(
                "Overlay file names must not be empty".to_string(),
            ));
        }

        if self.flash.duration_ms == 0 {
            return Err(ConfigError::Message(
                "Flash duration_ms must be greater than 0".to_string(),
            ));
        }

        if self.output.filename_prefix.trim().is_empty()
            || self.output.filename_prefix.contains(['/', '\\'])
        {
            return Err(ConfigError::Message(
                "Output filename_prefix must be a plain, non-empty name".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for PhotoboothConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                source: default_camera_source(),
                still_path: None,
                ideal_width: default_ideal_width(),
                facing: default_facing(),
                sensor_resolution: default_sensor_resolution(),
            },
            overlay: OverlayConfig {
                dir: default_overlay_dir(),
                portrait_file: default_portrait_file(),
                landscape_file: default_landscape_file(),
                policy: default_overlay_policy(),
            },
            flash: FlashConfig {
                duration_ms: default_flash_duration_ms(),
                delivery_delay_ms: default_delivery_delay_ms(),
            },
            output: OutputConfig {
                dir: default_output_dir(),
                filename_prefix: default_filename_prefix(),
                png_compression: default_png_compression(),
                save_metadata: default_save_metadata(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_camera_source() -> CameraSource {
    CameraSource::Synthetic
}
fn default_ideal_width() -> u32 {
    1920
}
fn default_facing() -> FacingMode {
    FacingMode::User
}
fn default_sensor_resolution() -> (u32, u32) {
    (1920, 1080)
}

fn default_overlay_dir() -> String {
    "./frames".to_string()
}
fn default_portrait_file() -> String {
    "frame-portrait.png".to_string()
}
fn default_landscape_file() -> String {
    "frame-landscape.png".to_string()
}
fn default_overlay_policy() -> OverlayPolicy {
    OverlayPolicy::Fallback
}

fn default_flash_duration_ms() -> u64 {
    200
}
fn default_delivery_delay_ms() -> u64 {
    300
}

fn default_output_dir() -> String {
    "./photos".to_string()
}
fn default_filename_prefix() -> String {
    "photo".to_string()
}
fn default_png_compression() -> PngCompression {
    PngCompression::Fast
}
fn default_save_metadata() -> bool {
    false
}

fn default_event_bus_capacity() -> usize {
    64
}
