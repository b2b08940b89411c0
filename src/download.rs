//! Saving captured photos to disk.

use crate::capture::{self, CapturedImage, PhotoMetadata};
use crate::config::OutputConfig;
use crate::error::{PhotoboothError, Result};
use crate::events::{EventBus, PhotoboothEvent};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Collision suffixes tried before giving up
const MAX_COLLISION_SUFFIX: u32 = 1000;

/// File stem for a photo saved at `timestamp`: `<prefix>-<unix millis>`
pub fn file_stem(prefix: &str, timestamp: SystemTime) -> String {
    let millis = timestamp
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0);
    format!("{}-{}", prefix, millis)
}

/// `<prefix>-<unix millis>.png`
pub fn generate_filename(prefix: &str, timestamp: SystemTime) -> String {
    format!("{}.png", file_stem(prefix, timestamp))
}

/// Write `image` into `dir` under a name generated now.
///
/// Existing files are never overwritten; a `-1`, `-2`, ... suffix is added
/// instead. With `save_metadata` a JSON sidecar is written to
/// `<dir>/metadata/<stem>.json`.
pub async fn save_photo(
    image: &CapturedImage,
    dir: &Path,
    prefix: &str,
    save_metadata: bool,
) -> Result<PathBuf> {
    if prefix.is_empty() || prefix.contains(['/', '\\']) {
        return Err(PhotoboothError::component(
            "download",
            format!("Invalid filename prefix '{}'", prefix),
        ));
    }

    fs::create_dir_all(dir).await.map_err(|e| {
        PhotoboothError::component(
            "download",
            format!("Failed to create output directory {}: {}", dir.display(), e),
        )
    })?;

    let saved_at = SystemTime::now();
    let (path, stem, file) = create_unique(dir, &file_stem(prefix, saved_at)).await?;

    write_or_discard(file, &path, image.as_bytes()).await?;
    debug!("Wrote {} bytes to {}", image.len(), path.display());

    if save_metadata {
        let file_name = format!("{}.png", stem);
        let metadata = PhotoMetadata::new(image, &file_name, DateTime::<Utc>::from(saved_at));
        capture::save_metadata(&metadata, &stem, dir).await?;
    }

    info!("Saved photo {} to {}", image.id(), path.display());
    Ok(path)
}

/// Write `bytes` and flush; on failure the partially written file at `path` is removed
async fn write_or_discard<W>(mut writer: W, path: &Path, bytes: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(bytes).await?;
        writer.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(writer);
        warn!("Failed to write {}: {}", path.display(), e);
        if let Err(remove_err) = fs::remove_file(path).await {
            debug!("Could not remove {}: {}", path.display(), remove_err);
        }
        return Err(e.into());
    }

    Ok(())
}

async fn create_unique(dir: &Path, stem: &str) -> Result<(PathBuf, String, fs::File)> {
    for attempt in 0..=MAX_COLLISION_SUFFIX {
        let candidate = if attempt == 0 {
            stem.to_string()
        } else {
            format!("{}-{}", stem, attempt)
        };
        let path = dir.join(format!("{}.png", candidate));

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next suffix", path.display());
            }
            Err(e) => {
                return Err(PhotoboothError::component(
                    "download",
                    format!("Failed to create {}: {}", path.display(), e),
                ));
            }
        }
    }

    Err(PhotoboothError::component(
        "download",
        format!("No free file name for {} in {}", stem, dir.display()),
    ))
}

/// Saves photos with the configured output settings and announces them
pub struct PhotoStore {
    output: OutputConfig,
    event_bus: Arc<EventBus>,
}

impl PhotoStore {
    pub fn new(output: OutputConfig, event_bus: Arc<EventBus>) -> Self {
        Self { output, event_bus }
    }

    pub fn output_dir(&self) -> &Path {
        Path::new(&self.output.dir)
    }

    pub async fn save(&self, image: &CapturedImage) -> Result<PathBuf> {
        let path = save_photo(
            image,
            self.output_dir(),
            &self.output.filename_prefix,
            self.output.save_metadata,
        )
        .await?;

        self.event_bus.publish(PhotoboothEvent::PhotoSaved {
            photo_id: image.id(),
            path: path.display().to_string(),
        });
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::test_pattern;
    use crate::capture::encode_png;
    use crate::config::PngCompression;
    use crate::orientation::Orientation;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writer that fails every write, like a full disk
    struct FailingWriter;

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "no space left")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn create_test_photo() -> CapturedImage {
        let png = encode_png(&test_pattern(6, 9), PngCompression::Fast).unwrap();
        CapturedImage::new(Orientation::Portrait, 6, 9, png, false)
    }

    fn create_test_output(dir: &Path, save_metadata: bool) -> OutputConfig {
        OutputConfig {
            dir: dir.to_string_lossy().to_string(),
            filename_prefix: "booth".to_string(),
            png_compression: PngCompression::Fast,
            save_metadata,
        }
    }

    fn millis_in(file_name: &str, prefix: &str) -> u128 {
        file_name
            .strip_prefix(&format!("{}-", prefix))
            .and_then(|rest| rest.strip_suffix(".png"))
            .unwrap()
            .parse()
            .unwrap()
    }

    #[test]
    fn test_generate_filename() {
        let timestamp = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(
            generate_filename("photo", timestamp),
            "photo-1700000000123.png"
        );
        assert_eq!(file_stem("photo", UNIX_EPOCH), "photo-0");
    }

    #[tokio::test]
    async fn test_save_photo_names_file_at_save_time() {
        let temp_dir = TempDir::new().unwrap();
        let photo = create_test_photo();

        let before = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis();
        let path = save_photo(&photo, temp_dir.path(), "photo", false)
            .await
            .unwrap();
        let after = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis();

        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        let millis = millis_in(&file_name, "photo");
        assert!(before <= millis && millis <= after);

        assert_eq!(std::fs::read(&path).unwrap(), photo.as_bytes());
        assert!(!temp_dir.path().join("metadata").exists());
    }

    #[tokio::test]
    async fn test_save_photo_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("photo-5.png"), b"existing").unwrap();
        std::fs::write(temp_dir.path().join("photo-5-1.png"), b"existing").unwrap();

        let (path, stem, _file) = create_unique(temp_dir.path(), "photo-5").await.unwrap();
        assert_eq!(stem, "photo-5-2");
        assert_eq!(path, temp_dir.path().join("photo-5-2.png"));
        assert_eq!(
            std::fs::read(temp_dir.path().join("photo-5.png")).unwrap(),
            b"existing"
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let (path, _stem, file) = create_unique(temp_dir.path(), "photo-7").await.unwrap();
        drop(file);
        assert!(path.exists());

        let result = write_or_discard(FailingWriter, &path, b"png bytes").await;
        assert!(matches!(result, Err(PhotoboothError::Io(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_repeated_saves_get_distinct_files() {
        let temp_dir = TempDir::new().unwrap();
        let photo = create_test_photo();

        let mut paths = Vec::new();
        for _ in 0..3 {
            paths.push(save_photo(&photo, temp_dir.path(), "photo", false).await.unwrap());
        }
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 3);
    }

    #[tokio::test]
    async fn test_save_photo_writes_metadata_sidecar() {
        let temp_dir = TempDir::new().unwrap();
        let output_dir = temp_dir.path().join("nested").join("photos");
        let photo = create_test_photo();

        let path = save_photo(&photo, &output_dir, "photo", true).await.unwrap();
        let stem = path.file_stem().unwrap().to_string_lossy().to_string();

        let sidecar = output_dir.join("metadata").join(format!("{}.json", stem));
        let metadata: PhotoMetadata =
            serde_json::from_str(&std::fs::read_to_string(sidecar).unwrap()).unwrap();
        assert_eq!(metadata.photo_id, photo.id());
        assert_eq!(metadata.file_name, format!("{}.png", stem));
        assert_eq!((metadata.width, metadata.height), (6, 9));
        assert_eq!(metadata.orientation, Orientation::Portrait);
        assert!(!metadata.overlay_applied);
    }

    #[tokio::test]
    async fn test_save_photo_rejects_path_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let result = save_photo(&create_test_photo(), temp_dir.path(), "../escape", false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_photo_store_publishes_saved_event() {
        let temp_dir = TempDir::new().unwrap();
        let event_bus = Arc::new(EventBus::new(8));
        let mut events = event_bus.subscribe();
        let store = PhotoStore::new(create_test_output(temp_dir.path(), true), Arc::clone(&event_bus));
        let photo = create_test_photo();

        let path = store.save(&photo).await.unwrap();
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("booth-"));
        assert!(temp_dir.path().join("metadata").is_dir());

        assert_eq!(
            events.recv().await.unwrap(),
            PhotoboothEvent::PhotoSaved {
                photo_id: photo.id(),
                path: path.display().to_string(),
            }
        );
    }
}
