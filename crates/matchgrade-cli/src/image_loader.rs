//! Image decoding and encoding at the edges of the pipeline.

use std::path::{Path, PathBuf};

use matchgrade_core::{MatchError, PixelBuffer};

/// Decode an image from disk into an RGBA8 `PixelBuffer`.
///
/// Supports the formats enabled in the `image` crate (PNG, JPEG, TIFF, ...).
/// Every format is converted to 8-bit RGBA.
pub fn load_image(path: &Path) -> Result<PixelBuffer, MatchError> {
    let img = image::open(path)
        .map_err(|e| MatchError::DecodeFailure(format!("{}: {e}", path.display())))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    tracing::info!("loaded {} ({width}x{height})", path.display());
    PixelBuffer::new(width, height, rgba.into_raw())
}

/// Decode source and reference concurrently on the blocking pool.
///
/// Both decodes run to completion before either result is returned.
pub async fn load_pair(
    source: PathBuf,
    reference: PathBuf,
) -> Result<(PixelBuffer, PixelBuffer), MatchError> {
    let source_task = tokio::task::spawn_blocking(move || load_image(&source));
    let reference_task = tokio::task::spawn_blocking(move || load_image(&reference));
    let (source, reference) = tokio::join!(source_task, reference_task);

    Ok((joined(source)?, joined(reference)?))
}

fn joined(
    res: Result<Result<PixelBuffer, MatchError>, tokio::task::JoinError>,
) -> Result<PixelBuffer, MatchError> {
    res.map_err(|e| MatchError::DecodeFailure(format!("decode task failed: {e}")))?
}

/// Encode a `PixelBuffer`; the format follows the file extension.
pub fn save_image(buffer: &PixelBuffer, path: &Path) -> Result<(), ImageSaveError> {
    let (width, height) = (buffer.width(), buffer.height());
    let img = image::RgbaImage::from_raw(width, height, buffer.as_bytes().to_vec())
        .ok_or(ImageSaveError::Layout)?;
    let format = image::ImageFormat::from_path(path)?;
    if format == image::ImageFormat::Jpeg {
        // JPEG has no alpha channel.
        image::DynamicImage::ImageRgba8(img).to_rgb8().save(path)?;
    } else {
        img.save_with_format(path, format)?;
    }
    tracing::info!("wrote {}", path.display());
    Ok(())
}

/// Errors that can occur while writing an image.
#[derive(Debug, thiserror::Error)]
pub enum ImageSaveError {
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("pixel buffer does not match its dimensions")]
    Layout,
}
