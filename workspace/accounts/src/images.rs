//! Profile picture pipeline: validate, shrink, store under a random name.
//!
//! The upload is decoded and resized entirely in memory, then written once to
//! a hidden temp file and renamed into place, so readers of the storage
//! directory never observe a half-written picture. File names are 16 random
//! bytes in hex plus the original extension, which keeps concurrent uploads
//! from colliding without any locking.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{AccountError, FieldErrors};

/// Extensions accepted for uploads, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Default bound for both width and height, in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 125;

const TOKEN_BYTES: usize = 16;

/// A file received from a form, before any processing.
#[derive(Clone)]
pub struct Upload {
    /// Name as sent by the client. Only its extension is used.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// A file input left blank arrives with no name and no content.
    pub fn is_empty(&self) -> bool {
        self.file_name.is_empty() && self.bytes.is_empty()
    }
}

/// Message shown when the extension is not in [`ALLOWED_EXTENSIONS`].
pub fn extension_message() -> String {
    format!(
        "File does not have an approved extension: {}",
        ALLOWED_EXTENSIONS.join(", ")
    )
}

/// The upload's extension exactly as written, if it is an allowed one.
pub fn allowed_extension(file_name: &str) -> Option<&str> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        .then_some(ext)
}

/// Random hex token followed by `.{extension}`.
pub fn generate_filename(extension: &str) -> String {
    let token: [u8; TOKEN_BYTES] = rand::random();
    format!("{}.{}", hex::encode(token), extension)
}

/// Shrink to fit inside `max` x `max`, keeping aspect ratio. Never enlarges.
pub fn fit_within(img: DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max && height <= max {
        return img;
    }
    img.thumbnail(max, max)
}

/// Decode `bytes`, shrink, and re-encode as `target`.
///
/// The content signature decides how the bytes are decoded; the extension is
/// never trusted for that.
fn render(bytes: &[u8], target: ImageFormat, max: u32) -> Result<Vec<u8>, AccountError> {
    let detected = image::guess_format(bytes)
        .map_err(|_| AccountError::InvalidImage("unrecognised image signature".to_string()))?;
    if !matches!(detected, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(AccountError::InvalidImage(format!(
            "unsupported image format {:?}",
            detected
        )));
    }

    let img = image::load_from_memory_with_format(bytes, detected)
        .map_err(|e| AccountError::InvalidImage(e.to_string()))?;
    let (width, height) = img.dimensions();
    let img = fit_within(img, max);
    trace!(
        "Resized {}x{} to {}x{}",
        width,
        height,
        img.width(),
        img.height()
    );

    // JPEG has no alpha channel.
    let img = match target {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, target)
        .map_err(|e| AccountError::InvalidImage(e.to_string()))?;
    Ok(out.into_inner())
}

/// Turns uploads into stored thumbnails inside one fixed directory.
#[derive(Clone, Debug)]
pub struct ImageProcessor {
    dir: PathBuf,
    max_dimension: u32,
}

impl ImageProcessor {
    pub fn new(dir: impl Into<PathBuf>, max_dimension: u32) -> Self {
        Self {
            dir: dir.into(),
            max_dimension,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the storage directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), AccountError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(AccountError::storage)
    }

    /// Write a plain grey picture under `name` unless a file already exists.
    pub async fn ensure_placeholder(&self, name: &str) -> Result<(), AccountError> {
        let path = self.dir.join(name);
        if tokio::fs::try_exists(&path).await.map_err(AccountError::storage)? {
            return Ok(());
        }
        let format = allowed_extension(name)
            .and_then(ImageFormat::from_extension)
            .ok_or_else(|| AccountError::InvalidImage(format!("no encoder for {}", name)))?;

        let size = self.max_dimension;
        let grey = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            size,
            size,
            image::Rgb([200, 200, 200]),
        ));
        let mut out = Cursor::new(Vec::new());
        grey.write_to(&mut out, format)
            .map_err(|e| AccountError::InvalidImage(e.to_string()))?;

        self.store(name, out.get_ref()).await?;
        info!("Created placeholder picture {}", name);
        Ok(())
    }

    /// Validate, shrink and store `upload`. Returns the stored file name.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn process(&self, upload: Upload) -> Result<String, AccountError> {
        trace!("Entering process function");

        let Some(extension) = allowed_extension(&upload.file_name) else {
            debug!("Rejected upload extension for {:?}", upload.file_name);
            return Err(AccountError::Validation(FieldErrors::single(
                "picture",
                extension_message(),
            )));
        };
        let target = ImageFormat::from_extension(extension).ok_or_else(|| {
            AccountError::InvalidImage(format!("no encoder for .{}", extension))
        })?;
        let filename = generate_filename(extension);

        let max = self.max_dimension;
        let bytes = upload.bytes;
        let encoded = tokio::task::spawn_blocking(move || render(&bytes, target, max))
            .await
            .map_err(|e| AccountError::InvalidImage(format!("image worker failed: {}", e)))??;

        self.store(&filename, &encoded).await?;
        info!("Stored profile picture {} ({} bytes)", filename, encoded.len());
        Ok(filename)
    }

    async fn store(&self, filename: &str, encoded: &[u8]) -> Result<(), AccountError> {
        let tmp = self.dir.join(format!(".{}.tmp", filename));
        let target = self.dir.join(filename);

        if let Err(e) = tokio::fs::write(&tmp, encoded).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AccountError::storage(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AccountError::storage(e));
        }
        Ok(())
    }

    /// Remove a picture stored by [`process`](Self::process). Best effort.
    pub async fn discard(&self, filename: &str) {
        // Only ever touch names this processor could have produced.
        if filename.contains(['/', '\\']) || filename.starts_with('.') {
            warn!("Refusing to discard suspicious file name {:?}", filename);
            return;
        }
        match tokio::fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => debug!("Discarded picture {}", filename),
            Err(e) => warn!("Failed to discard picture {}: {}", filename, e),
        }
    }
}
