// Expose modules for integration testing
pub mod chapter_to_download;
pub mod download_job;
pub mod downloader;
pub mod error;
pub mod manga_to_download;
pub mod manga_url;
pub mod pdf;
pub mod progress;
pub mod resize;
pub mod run;

pub use chapter_to_download::ChapterToDownload;
pub use download_job::{ChapterSelection, DownloadJob};
pub use error::MangaError;
pub use manga_to_download::MangaToDownload;
pub use run::{run, RunSummary};
