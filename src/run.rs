use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::chapter_to_download::ChapterToDownload;
use crate::download_job::DownloadJob;
use crate::downloader::{build_chapter_path, build_client, build_manga_path, build_pdf_path, download_images, ensure_dir_exists};
use crate::error::MangaError;
use crate::manga_to_download::MangaToDownload;
use crate::pdf::create_pdf_from_images;
use crate::progress::spinner;

/// Outcome of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub attempted: usize,
    pub pdfs: Vec<PathBuf>,
    pub failures: Vec<(u32, String)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Downloads every chapter of the job, one after the other. A failing
/// chapter is logged and recorded, and the next chapter is attempted.
pub async fn run(job: &DownloadJob) -> Result<RunSummary, MangaError> {
    let client = build_client(job.timeout)?;
    let mut manga = MangaToDownload::new(job.manga_url.clone())?;
    info!("Manga: {}", manga.title);

    if let Err(e) = manga.load_index(&client).await {
        warn!("Could not read the chapter list ({}), falling back to chapter URLs built from {}", e, job.manga_url);
    }

    let manga_dir = build_manga_path(&job.output_dir, &manga.title);
    ensure_dir_exists(&manga_dir)?;

    let mut summary = RunSummary::default();
    // One chapter at a time, a failure moves on to the next
    for number in job.selection.numbers() {
        summary.attempted += 1;
        match download_chapter(&client, &manga, number, job, &manga_dir).await {
            Ok(pdf) => {
                info!("✓ Chapter {} saved to {}", number, pdf.display());
                summary.pdfs.push(pdf);
            }
            Err(e) => {
                error!("✗ Chapter {} failed: {}", number, e);
                summary.failures.push((number, e.to_string()));
            }
        }
    }

    info!(
        "All chapters have been processed: {} PDFs written, {} failed",
        summary.pdfs.len(),
        summary.failures.len()
    );
    Ok(summary)
}

/// fetch -> extract -> download -> assemble for one chapter.
pub async fn download_chapter(
    client: &reqwest::Client,
    manga: &MangaToDownload,
    number: u32,
    job: &DownloadJob,
    manga_dir: &Path,
) -> Result<PathBuf, MangaError> {
    // Listed URL if the index has one, `c<n>` otherwise
    let url = manga.chapter_url(number)?;
    info!("Processing chapter {} ({})", number, url);

    let page_spinner = spinner(format!("Fetching chapter {}...", number));
    let chapter = match ChapterToDownload::new(client, number, url).await {
        Ok(chapter) => chapter,
        Err(e) => {
            page_spinner.abandon_with_message(format!("✗ Chapter {}", number));
            return Err(e);
        }
    };
    page_spinner.finish_with_message(format!("✓ Chapter {}: {} pages", number, chapter.images.len()));

    let chapter_dir = build_chapter_path(manga_dir, chapter.number);
    ensure_dir_exists(&chapter_dir)?;

    let result = assemble_chapter(client, &chapter, job, manga_dir, &chapter_dir).await;

    // The image directory goes away on failure too, unless asked to keep it
    if !job.keep_images {
        debug!("Removing {}", chapter_dir.display());
        if let Err(e) = std::fs::remove_dir_all(&chapter_dir) {
            warn!("Could not remove {}: {}", chapter_dir.display(), e);
        }
    }

    result
}

/// Downloads the chapter's images into `chapter_dir` and writes its PDF.
async fn assemble_chapter(
    client: &reqwest::Client,
    chapter: &ChapterToDownload,
    job: &DownloadJob,
    manga_dir: &Path,
    chapter_dir: &Path,
) -> Result<PathBuf, MangaError> {
    info!("Downloading {} images for chapter {}", chapter.images.len(), chapter.number);
    let pages = download_images(client, &chapter.images, chapter_dir, job.height, job.concurrency).await?;

    let pdf_path = build_pdf_path(manga_dir, chapter.number);
    info!("Converting chapter {} to pdf...", chapter.number);
    create_pdf_from_images(&pages[..], &pdf_path)?;

    Ok(pdf_path)
}
