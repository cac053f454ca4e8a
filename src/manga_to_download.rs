use log::{debug, info};
use url::Url;

use crate::chapter_to_download::fetch_page;
use crate::error::MangaError;
use crate::manga_url::{chapter_number_from_url, chapter_page_url, manga_title, resolve_link};
use crate::progress::spinner;

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterInfo {
    pub number: u32,
    pub url: Url,
}

pub struct MangaToDownload {
    pub link: Url,
    pub title: String,
    pub chapters: Vec<ChapterInfo>,
}

impl MangaToDownload {
    /// Creates the manga from its URL. No request is made until [`load_index`](Self::load_index).
    pub fn new(link: Url) -> Result<Self, MangaError> {
        let title = manga_title(&link)?;
        Ok(Self { link, title, chapters: Vec::new() })
    }

    /// Fetches the manga landing page and reads its chapter listing.
    pub async fn load_index(&mut self, client: &reqwest::Client) -> Result<(), MangaError> {
        let spinner = spinner("Fetching chapter list...");

        let chapters = match fetch_page(client, &self.link).await {
            Ok(body) => parse_chapter_index(&body, &self.link),
            Err(e) => Err(e),
        };
        self.chapters = match chapters {
            Ok(chapters) => chapters,
            Err(e) => {
                spinner.finish_with_message("✗ Chapter list unavailable");
                return Err(e);
            }
        };

        spinner.finish_with_message(format!("✓ Found {} chapters of {}", self.chapters.len(), self.title));
        info!("Manga {} lists {} chapters", self.title, self.chapters.len());
        Ok(())
    }

    /// URL of the given chapter's page: the listed one when the index has it,
    /// otherwise `c<number>` appended to the manga URL.
    pub fn chapter_url(&self, number: u32) -> Result<Url, MangaError> {
        match self.chapters.iter().find(|c| c.number == number) {
            Some(chapter) => Ok(chapter.url.clone()),
            None => {
                debug!("Chapter {} not listed, using substituted URL", number);
                chapter_page_url(&self.link, number)
            }
        }
    }
}

/// Reads the chapter listing of a manga landing page, oldest chapter first.
///
/// The page carries one `div.stream` per scanlation version; the stream with
/// the most chapters wins. Chapters with fractional numbers are skipped.
pub fn parse_chapter_index(html: &str, base: &Url) -> Result<Vec<ChapterInfo>, MangaError> {
    let document = scraper::Html::parse_document(html.trim());
    let stream_selector = selector("div.stream")?;
    let entry_selector = selector("li")?;
    let link_selector = selector("em a")?;

    let mut best: Option<(usize, scraper::ElementRef)> = None;
    for stream in document.select(&stream_selector) {
        let len = stream.select(&entry_selector).count();
        if best.map_or(true, |(best_len, _)| len > best_len) {
            best = Some((len, stream));
        }
    }

    let Some((_, stream)) = best else {
        return Err(MangaError::ParseError(String::from("No chapter streams found on manga page")));
    };

    let entries = stream.select(&entry_selector).collect::<Vec<_>>();
    let mut chapters = Vec::new();
    for entry in entries.into_iter().rev() {
        let Some(href) = entry.select(&link_selector).last().and_then(|a| a.attr("href")) else {
            continue;
        };
        let url = resolve_link(base, href)?;
        match chapter_number_from_url(&url) {
            Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => {
                chapters.push(ChapterInfo { number: n as u32, url });
            }
            _ => debug!("Skipping chapter link {}", url),
        }
    }

    Ok(chapters)
}

fn selector(css: &str) -> Result<scraper::Selector, MangaError> {
    scraper::Selector::parse(css)
        .map_err(|_| MangaError::SelectorError(format!("Failed to parse {} selector", css)))
}
