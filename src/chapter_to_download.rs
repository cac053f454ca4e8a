use log::{debug, trace};
use url::Url;

use crate::error::MangaError;
use crate::manga_url::{resolve_link, strip_parameters};

/// Image elements of the chapter viewer, one per page.
const PAGE_IMAGE_SELECTOR: &str = "a.img-link img";

pub struct ChapterToDownload {
    pub number: u32,
    pub link: Url,
    pub images: Vec<Url>,
}

impl ChapterToDownload {
    /// Fetches the chapter page and extracts its page images.
    pub async fn new(client: &reqwest::Client, number: u32, link: Url) -> Result<Self, MangaError> {
        let body = fetch_page(client, &link).await?;
        let images = extract_image_urls(&body, &link)?;
        debug!("Chapter {} has {} pages", number, images.len());
        Ok(Self { number, link, images })
    }
}

/// Performs a single GET and returns the body. Non-success statuses are errors.
pub async fn fetch_page(client: &reqwest::Client, url: &Url) -> Result<String, MangaError> {
    trace!("GET {}", url);
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Returns the chapter's image URLs in document order.
///
/// Query parameters are stripped and links are resolved against `page_url`.
pub fn extract_image_urls(html: &str, page_url: &Url) -> Result<Vec<Url>, MangaError> {
    let document = scraper::Html::parse_document(html.trim());
    let images_selector = scraper::Selector::parse(PAGE_IMAGE_SELECTOR)
        .map_err(|_| MangaError::SelectorError(format!("Failed to parse {} selector", PAGE_IMAGE_SELECTOR)))?;

    let images = document
        .select(&images_selector)
        .filter_map(|e| {
            e.attr("src")
                .or_else(|| e.attr("data-src"))
                .map(|src| strip_parameters(src.trim()).to_string())
        })
        .filter(|src| !src.is_empty())
        .map(|src| resolve_link(page_url, &src))
        .collect::<Result<Vec<_>, _>>()?;

    if images.is_empty() {
        return Err(MangaError::ParseError(format!("No images found in chapter page {}", page_url)));
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://mangapark.me/manga/ajin/s1/c20").unwrap()
    }

    #[test]
    fn test_extract_image_urls_in_document_order() {
        let html = r##"
            <html><body>
              <div id="viewer">
                <a class="img-link" href="#2"><img src="https://cdn.host/ajin/20/001.jpg?t=1"></a>
                <a class="img-link" href="#3"><img src="//cdn.host/ajin/20/002.jpg"></a>
                <a class="img-link" href="#4"><img data-src="/ajin/20/003.png"></a>
              </div>
              <img src="https://cdn.host/banner.jpg">
            </body></html>
        "##;

        let images = extract_image_urls(html, &page()).unwrap();
        let urls: Vec<&str> = images.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.host/ajin/20/001.jpg",
                "https://cdn.host/ajin/20/002.jpg",
                "https://mangapark.me/ajin/20/003.png",
            ]
        );
    }

    #[test]
    fn test_extract_image_urls_skips_empty_sources() {
        let html = r#"
            <a class="img-link"><img src=""></a>
            <a class="img-link"><img src="https://cdn.host/p1.jpg"></a>
        "#;
        let images = extract_image_urls(html, &page()).unwrap();
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn test_extract_image_urls_without_viewer_is_parse_error() {
        let html = r#"<html><body><p>This chapter has been removed.</p><img src="/logo.png"></body></html>"#;
        assert!(matches!(extract_image_urls(html, &page()), Err(MangaError::ParseError(_))));
    }
}
