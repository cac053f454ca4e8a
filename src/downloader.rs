use std::{env, path::{Path, PathBuf}, time::Duration};
use futures::{stream, StreamExt, TryStreamExt};
use log::{debug, trace};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::MangaError;
use crate::progress::image_bar;
use crate::resize::resize_to_height;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client shared by every request of a run
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, MangaError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Downloads a single image from a URL to a specified path
pub async fn download_image(client: &reqwest::Client, url: &Url, path: &Path) -> Result<(), MangaError> {
    trace!("Downloading {} to {}", url, path.display());

    let response = client.get(url.clone()).send().await
        .map_err(|e| MangaError::DownloadError(format!("{}: {}", url, e)))?;

    // Check if the response was successful
    if !response.status().is_success() {
        return Err(MangaError::DownloadError(
            format!("HTTP error: {} for URL {}", response.status(), url)
        ));
    }

    let bytes = response.bytes().await
        .map_err(|e| MangaError::DownloadError(format!("{}: {}", url, e)))?;

    // Create the file
    let mut file = tokio::fs::File::create(path).await
        .map_err(|e| MangaError::DownloadError(format!("Failed to create {}: {}", path.display(), e)))?;

    let write_error = |e: std::io::Error| MangaError::DownloadError(format!("Failed to write {}: {}", path.display(), e));
    file.write_all(&bytes).await.map_err(write_error)?;
    file.flush().await.map_err(write_error)?;

    Ok(())
}

/// Downloads the pages of a chapter into `output_dir`, resizing each one when
/// `height` is set. Returns the local paths in the order of `image_urls`.
///
/// At most `concurrency` requests are in flight. The first failure aborts the batch.
pub async fn download_images(
    client: &reqwest::Client,
    image_urls: &[Url],
    output_dir: &Path,
    height: Option<u32>,
    concurrency: usize,
) -> Result<Vec<PathBuf>, MangaError> {
    let bar = image_bar(image_urls.len());

    let result = stream::iter(image_urls.iter().enumerate())
        .map(|(i, url)| {
            let path = output_dir.join(image_file_name(i, url));
            let bar = bar.clone();
            async move {
                download_image(client, url, &path).await?;
                // Resizing decodes the whole image, keep it off the runtime thread
                let page = tokio::task::spawn_blocking(move || resize_to_height(&path, height))
                    .await
                    .map_err(|e| MangaError::DownloadError(format!("Resize task failed: {}", e)))??;
                bar.inc(1);
                Ok::<_, MangaError>(page)
            }
        })
        // buffered, not buffer_unordered: pages must come back in order
        .buffered(concurrency.max(1))
        .try_collect::<Vec<_>>()
        .await;

    match &result {
        Ok(pages) => {
            bar.finish_with_message("All downloads complete!");
            debug!("Downloaded {} images to {}", pages.len(), output_dir.display());
        }
        Err(e) => bar.abandon_with_message(format!("✗ Failed: {}", e)),
    }

    result
}

/// Local file name of the `index`th page: `page_001.jpg`, keeping the URL's extension.
pub fn image_file_name(index: usize, url: &Url) -> String {
    let extension = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| String::from("jpg"));

    format!("page_{:03}.{}", index + 1, extension)
}

/// Directory holding one manga's PDFs: `<output_dir>/<sanitized title>`
pub fn build_manga_path(output_dir: &Path, manga_title: &str) -> PathBuf {
    output_dir.join(sanitize_filename(manga_title))
}

/// Working directory for a chapter's images
pub fn build_chapter_path(manga_dir: &Path, chapter: u32) -> PathBuf {
    manga_dir.join(format!("c{}", chapter))
}

/// Output PDF for a chapter
pub fn build_pdf_path(manga_dir: &Path, chapter: u32) -> PathBuf {
    manga_dir.join(format!("c{}.pdf", chapter))
}

/// Ensures a directory exists, creating it if necessary
pub fn ensure_dir_exists(path: &Path) -> Result<(), MangaError> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Sanitizes a string to be safe as a filename across different operating systems
pub fn sanitize_filename(input: &str) -> String {
    let invalid_chars = match env::consts::OS {
        "windows" => r#"\/:*?"<>|"#,
        _ => "/",
    };

    let mut result = input.trim().to_lowercase().replace(' ', "-");

    for c in invalid_chars.chars() {
        result = result.replace(c, "_");
    }

    if env::consts::OS == "windows" {
        let reserved_names = [
            "CON", "PRN", "AUX", "NUL",
            "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
            "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9"
        ];

        if reserved_names.iter().any(|&name| result.eq_ignore_ascii_case(name)) {
            result = format!("_{}", result);
        }
    }

    // Leading dots would hide the directory on Unix
    if result.starts_with('.') || result.is_empty() {
        result = format!("_{}", result);
    }

    if result.len() > 255 {
        let mut end = 255;
        while !result.is_char_boundary(end) {
            end -= 1;
        }
        result.truncate(end);
    }

    result
}
