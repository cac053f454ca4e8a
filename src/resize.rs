use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{GenericImageView, ImageReader};
use log::{debug, trace};

use crate::error::MangaError;

/// Width of an image of `width`x`height` scaled to `target_height`, keeping the aspect ratio.
pub fn resized_width(width: u32, height: u32, target_height: u32) -> u32 {
    if height == 0 {
        return width.max(1);
    }
    let scaled = (width as f64 * target_height as f64 / height as f64).round();
    (scaled as u32).max(1)
}

/// Path of the resized variant: `page_001.jpg` becomes `page_001.res.jpg`.
pub fn resized_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    match path.extension() {
        Some(ext) => path.with_file_name(format!("{}.res.{}", stem, ext.to_string_lossy())),
        None => path.with_file_name(format!("{}.res", stem)),
    }
}

/// Resizes the image at `path` to `height` pixels tall and writes it next to
/// the original in the same format. Returns the original path when `height` is `None`.
pub fn resize_to_height(path: &Path, height: Option<u32>) -> Result<PathBuf, MangaError> {
    let Some(height) = height else {
        return Ok(path.to_path_buf());
    };

    debug!("Resizing {} to {}px height", path.display(), height);

    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| MangaError::DownloadError(format!("Failed to open {}: {}", path.display(), e)))?;
    let format = reader
        .format()
        .ok_or_else(|| MangaError::DownloadError(format!("Unknown image format: {}", path.display())))?;
    let img = reader
        .decode()
        .map_err(|e| MangaError::DownloadError(format!("Failed to decode {}: {}", path.display(), e)))?;

    let (width, original_height) = img.dimensions();
    let new_width = resized_width(width, original_height, height);
    trace!("{}x{} -> {}x{}", width, original_height, new_width, height);

    let resized = img.resize_exact(new_width, height, FilterType::Lanczos3);
    let output = resized_path(path);
    resized
        .save_with_format(&output, format)
        .map_err(|e| MangaError::DownloadError(format!("Failed to save {}: {}", output.display(), e)))?;

    Ok(output)
}
