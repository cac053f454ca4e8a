use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::MangaError;
use crate::manga_url::parse_manga_url;

/// Which chapters a run downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterSelection {
    Single(u32),
    /// Inclusive on both ends.
    Range { start: u32, end: u32 },
}

impl ChapterSelection {
    pub fn from_args(chapter: Option<u32>, chapters: Option<&[u32]>) -> Result<Self, MangaError> {
        match (chapter, chapters) {
            (Some(n), None) => Ok(ChapterSelection::Single(n)),
            (None, Some([start, end])) => {
                if start > end {
                    return Err(MangaError::InvalidArgument(format!(
                        "chapter range {}-{} ends before it starts",
                        start, end
                    )));
                }
                Ok(ChapterSelection::Range { start: *start, end: *end })
            }
            (None, Some(other)) => Err(MangaError::InvalidArgument(format!(
                "a chapter range needs exactly two numbers, got {}",
                other.len()
            ))),
            (Some(_), Some(_)) => Err(MangaError::InvalidArgument(String::from(
                "give either a single chapter or a chapter range, not both",
            ))),
            (None, None) => Err(MangaError::InvalidArgument(String::from(
                "no chapter given; use --chapter or --chapters",
            ))),
        }
    }

    pub fn numbers(&self) -> RangeInclusive<u32> {
        match *self {
            ChapterSelection::Single(n) => n..=n,
            ChapterSelection::Range { start, end } => start..=end,
        }
    }
}

/// Everything one invocation needs. Built once and never mutated.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub manga_url: Url,
    pub selection: ChapterSelection,
    /// Target image height in pixels; `None` keeps downloaded sizes.
    pub height: Option<u32>,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub timeout: Duration,
    pub keep_images: bool,
}

impl DownloadJob {
    pub fn new(manga_url: &str, selection: ChapterSelection) -> Result<Self, MangaError> {
        Ok(Self {
            manga_url: parse_manga_url(manga_url)?,
            selection,
            height: None,
            output_dir: PathBuf::from("."),
            concurrency: 1,
            timeout: Duration::from_secs(60),
            keep_images: false,
        })
    }

    pub fn with_height(mut self, height: Option<u32>) -> Result<Self, MangaError> {
        if height == Some(0) {
            return Err(MangaError::InvalidArgument(String::from("--size must be greater than 0")));
        }
        self.height = height;
        Ok(self)
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, MangaError> {
        if concurrency == 0 {
            return Err(MangaError::InvalidArgument(String::from("--concurrency must be at least 1")));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn keep_images(mut self, keep: bool) -> Self {
        self.keep_images = keep;
        self
    }
}
