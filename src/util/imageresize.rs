use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info};

/// Largest edge a resized variant may have.
const MAX_DIMENSION: u32 = 2000;

/// Requested variant of an image. All `None` means the original.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u32>,
}

impl ResizeSpec {
    pub fn new(width: Option<u32>, height: Option<u32>, quality: Option<u32>) -> Self {
        let dim = |v: Option<u32>| v.filter(|v| *v > 0).map(|v| v.min(MAX_DIMENSION));
        Self {
            width: dim(width),
            height: dim(height),
            quality: quality.map(|q| q.clamp(1, 100)),
        }
    }

    pub fn is_original(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.quality.is_none()
    }
}

/// Where a stored image URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Remote(String),
    Local(PathBuf),
}

/// Fetches celebrity images and keeps resized variants on disk.
pub struct ImageResizer {
    cache_dir: PathBuf,
    originals_dir: PathBuf,
    image_root: Option<PathBuf>,
    client: reqwest::Client,
}

impl ImageResizer {
    pub fn new(
        cache_dir: PathBuf,
        originals_dir: PathBuf,
        image_root: Option<PathBuf>,
    ) -> Result<Self, ImageResizerError> {
        fs::create_dir_all(&cache_dir)?;
        fs::create_dir_all(&originals_dir)?;
        Ok(Self {
            cache_dir,
            originals_dir,
            image_root,
            client: reqwest::Client::new(),
        })
    }

    /// Classify a stored URL. Server-relative paths resolve under the
    /// image root and may not climb out of it.
    pub fn source_for(&self, url: &str) -> Option<ImageSource> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Some(ImageSource::Remote(url.to_string()));
        }
        let relative = url.strip_prefix('/')?;
        let root = self.image_root.as_ref()?;
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(ImageSource::Local(root.join(relative)))
    }

    /// Local path of the unmodified image, downloading it on first use.
    pub async fn original_path(&self, source: &ImageSource) -> Result<PathBuf, ImageResizerError> {
        match source {
            ImageSource::Local(path) => {
                if tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false) {
                    Ok(path.clone())
                } else {
                    Err(ImageResizerError::NotFound(path.to_string_lossy().to_string()))
                }
            }
            ImageSource::Remote(url) => {
                let path = self.originals_dir.join(download_name(url));
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    return Ok(path);
                }

                info!("Downloading image {}", url);
                let response = self.client.get(url).send().await?;
                if !response.status().is_success() {
                    return Err(ImageResizerError::Download(format!(
                        "{} returned {}",
                        url,
                        response.status()
                    )));
                }
                let bytes = response.bytes().await?;

                let tmp = path.with_extension("part");
                tokio::fs::write(&tmp, &bytes).await?;
                tokio::fs::rename(&tmp, &path).await?;
                Ok(path)
            }
        }
    }

    /// Path of the requested variant of `source`.
    pub async fn variant(
        self: &std::sync::Arc<Self>,
        source: &ImageSource,
        spec: ResizeSpec,
    ) -> Result<PathBuf, ImageResizerError> {
        let original = self.original_path(source).await?;
        if spec.is_original() {
            return Ok(original);
        }
        let this = std::sync::Arc::clone(self);
        tokio::task::spawn_blocking(move || this.resize_image(&original, spec))
            .await
            .map_err(|e| ImageResizerError::Task(e.to_string()))?
    }

    /// Resize `source_path`, reusing a cached variant when present. Any
    /// failure to decode or encode falls back to the original file.
    pub fn resize_image(
        &self,
        source_path: &Path,
        spec: ResizeSpec,
    ) -> Result<PathBuf, ImageResizerError> {
        if spec.is_original() {
            return Ok(source_path.to_path_buf());
        }

        let cache_key = self.generate_cache_key(source_path, spec);
        let cache_path = self.cache_dir.join(&cache_key);

        if cache_path.exists() {
            debug!("Serving cached image: {}", cache_key);
            return Ok(cache_path);
        }

        debug!("Resizing image: {:?} to {:?}", source_path, spec);

        let file_bytes = fs::read(source_path)?;

        let format = match image::guess_format(&file_bytes) {
            Ok(fmt) => fmt,
            Err(e) => {
                error!("Failed to detect format for {:?}: {}", source_path, e);
                return Ok(source_path.to_path_buf());
            }
        };

        let img = match image::load_from_memory_with_format(&file_bytes, format) {
            Ok(img) => img,
            Err(e) => {
                error!("Failed to load image {:?}: {}", source_path, e);
                return Ok(source_path.to_path_buf());
            }
        };

        let (orig_width, orig_height) = img.dimensions();
        let (target_width, target_height) =
            calculate_dimensions(orig_width, orig_height, spec.width, spec.height);

        let resized = if target_width == orig_width && target_height == orig_height {
            img
        } else {
            img.resize_to_fill(target_width, target_height, FilterType::Lanczos3)
        };

        let encoded = match encode_image(resized, format, spec.quality) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to encode image {:?}: {}", source_path, e);
                return Ok(source_path.to_path_buf());
            }
        };

        fs::write(&cache_path, &encoded)?;

        Ok(cache_path)
    }

    fn generate_cache_key(&self, source_path: &Path, spec: ResizeSpec) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source_path.to_string_lossy().as_bytes());
        hasher.update(spec.width.unwrap_or(0).to_le_bytes());
        hasher.update(spec.height.unwrap_or(0).to_le_bytes());
        hasher.update(spec.quality.unwrap_or(0).to_le_bytes());

        if let Ok(metadata) = fs::metadata(source_path) {
            if let Ok(modified) = metadata.modified() {
                if let Ok(duration) = modified.duration_since(std::time::UNIX_EPOCH) {
                    hasher.update(duration.as_secs().to_le_bytes());
                }
            }
        }

        let extension = source_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg");

        format!("{}.{}", hex::encode(hasher.finalize()), extension)
    }
}

/// Stable file name for a downloaded URL, keeping its extension.
fn download_name(url: &str) -> String {
    let hash = hex::encode(Sha256::digest(url.as_bytes()));
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("jpg")
        .to_ascii_lowercase();
    format!("{}.{}", hash, extension)
}

/// Target size. With one edge given the other follows the aspect ratio;
/// upscaling is never done.
fn calculate_dimensions(
    orig_width: u32,
    orig_height: u32,
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let (w, h) = match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => {
            let aspect_ratio = orig_height as f32 / orig_width as f32;
            (w, (w as f32 * aspect_ratio).round() as u32)
        }
        (None, Some(h)) => {
            let aspect_ratio = orig_width as f32 / orig_height as f32;
            ((h as f32 * aspect_ratio).round() as u32, h)
        }
        (None, None) => (orig_width, orig_height),
    };
    if w > orig_width || h > orig_height {
        let scale = f32::min(orig_width as f32 / w as f32, orig_height as f32 / h as f32);
        return (
            ((w as f32 * scale).round() as u32).max(1),
            ((h as f32 * scale).round() as u32).max(1),
        );
    }
    (w.max(1), h.max(1))
}

fn encode_image(
    img: DynamicImage,
    format: ImageFormat,
    quality: Option<u32>,
) -> Result<Vec<u8>, ImageResizerError> {
    let mut buffer = Cursor::new(Vec::new());

    match format {
        ImageFormat::Jpeg => {
            let quality = quality.unwrap_or(85).clamp(1, 100);
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality as u8);
            img.write_with_encoder(encoder)?;
        }
        _ => {
            img.write_to(&mut buffer, format)?;
        }
    }

    Ok(buffer.into_inner())
}

#[derive(Debug, thiserror::Error)]
pub enum ImageResizerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Download failed: {0}")]
    Download(String),
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("Resize task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "celebrity-bio-{}-{}",
            name,
            uuid::Uuid::new_v4()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn resizer(root: &Path) -> ImageResizer {
        ImageResizer::new(root.join("images"), root.join("originals"), Some(root.join("media")))
            .unwrap()
    }

    #[test]
    fn test_resize_spec_clamps() {
        let spec = ResizeSpec::new(Some(0), Some(5000), Some(150));
        assert_eq!(spec.width, None);
        assert_eq!(spec.height, Some(MAX_DIMENSION));
        assert_eq!(spec.quality, Some(100));
        assert!(ResizeSpec::new(None, None, None).is_original());
    }

    #[test]
    fn test_calculate_dimensions() {
        assert_eq!(calculate_dimensions(800, 400, Some(200), None), (200, 100));
        assert_eq!(calculate_dimensions(800, 400, None, Some(100)), (200, 100));
        assert_eq!(calculate_dimensions(800, 400, Some(100), Some(100)), (100, 100));
        // Never upscale.
        assert_eq!(calculate_dimensions(100, 100, Some(400), None), (100, 100));
    }

    #[test]
    fn test_source_for() {
        let root = temp_dir("source");
        let resizer = resizer(&root);
        assert_eq!(
            resizer.source_for("https://cdn.example.org/a.jpg"),
            Some(ImageSource::Remote("https://cdn.example.org/a.jpg".to_string()))
        );
        assert_eq!(
            resizer.source_for("/celebrities/tarkan.jpg"),
            Some(ImageSource::Local(root.join("media").join("celebrities/tarkan.jpg")))
        );
        assert_eq!(resizer.source_for("/../etc/passwd"), None);
        assert_eq!(resizer.source_for("relative.jpg"), None);
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_download_name_keeps_extension() {
        assert!(download_name("https://x.org/a/b.PNG?w=1").ends_with(".png"));
        assert!(download_name("https://x.org/a/b").ends_with(".jpg"));
        assert_ne!(download_name("https://x.org/1.jpg"), download_name("https://x.org/2.jpg"));
    }

    #[test]
    fn test_resize_image_is_cached() {
        let root = temp_dir("resize");
        let resizer = resizer(&root);
        let source = root.join("photo.png");
        ImageBuffer::from_pixel(64, 32, Rgb([200u8, 10, 10]))
            .save(&source)
            .unwrap();

        let spec = ResizeSpec::new(Some(32), None, None);
        let resized = resizer.resize_image(&source, spec).unwrap();
        assert_ne!(resized, source);
        let img = image::open(&resized).unwrap();
        assert_eq!(img.dimensions(), (32, 16));

        assert_eq!(resizer.resize_image(&source, spec).unwrap(), resized);
        assert_eq!(
            resizer.resize_image(&source, ResizeSpec::default()).unwrap(),
            source
        );
        fs::remove_dir_all(root).unwrap();
    }
}
