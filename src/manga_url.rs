use url::Url;

use crate::error::MangaError;

/// Parses the manga URL given on the command line.
///
/// URLs typed without a scheme (`mangapark.me/manga/ajin`) are read as `http://`.
pub fn parse_manga_url(input: &str) -> Result<Url, MangaError> {
    let input = input.trim();
    match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        Ok(url) => Err(MangaError::InvalidArgument(format!(
            "unsupported URL scheme '{}' in {}",
            url.scheme(),
            input
        ))),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Url::parse(&format!("http://{}", input))?),
        Err(e) => Err(e.into()),
    }
}

/// Extracts the manga title from its URL: the path segment after `/manga/`,
/// or the first path segment when the site uses a flat layout.
pub fn manga_title(url: &Url) -> Result<String, MangaError> {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let title = match segments.iter().position(|seg| *seg == "manga") {
        Some(pos) => segments.get(pos + 1),
        None => segments.first(),
    };

    title
        .map(|t| t.to_string())
        .ok_or_else(|| MangaError::ParseError(format!("Couldn't read a manga title from {}", url)))
}

/// Builds a chapter page URL by appending `c<number>` to the manga URL.
pub fn chapter_page_url(manga_url: &Url, number: u32) -> Result<Url, MangaError> {
    let mut base = manga_url.clone();
    base.set_query(None);
    base.set_fragment(None);
    let substituted = format!("{}/c{}", base.as_str().trim_end_matches('/'), number);
    Ok(Url::parse(&substituted)?)
}

/// Reads the chapter number from a chapter URL such as `/manga/ajin/s1/c20`.
///
/// Returns `None` when the last segment is not of the form `c<number>`.
pub fn chapter_number_from_url(url: &Url) -> Option<f64> {
    let last = url.path_segments()?.filter(|seg| !seg.is_empty()).last()?;
    let number = last.strip_prefix('c')?;
    number.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Drops everything from the first `?` on.
pub fn strip_parameters(url: &str) -> &str {
    match url.find('?') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

/// Resolves a link found on a page against that page's URL. Handles absolute,
/// root-relative, relative and protocol-relative (`//host/...`) links.
pub fn resolve_link(base: &Url, href: &str) -> Result<Url, MangaError> {
    Ok(base.join(href.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_parse_manga_url_without_scheme() {
        let parsed = parse_manga_url("mangapark.me/manga/ajin-miura-tsuina/").unwrap();
        assert_eq!(parsed.as_str(), "http://mangapark.me/manga/ajin-miura-tsuina/");
    }

    #[test]
    fn test_parse_manga_url_rejects_other_schemes() {
        assert!(matches!(
            parse_manga_url("ftp://mangapark.me/manga/ajin"),
            Err(MangaError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_manga_title() {
        let title = manga_title(&url("http://mangapark.me/manga/ajin-miura-tsuina/")).unwrap();
        assert_eq!(title, "ajin-miura-tsuina");

        let flat = manga_title(&url("http://127.0.0.1:1234/berserk")).unwrap();
        assert_eq!(flat, "berserk");

        assert!(manga_title(&url("http://mangapark.me/")).is_err());
    }

    #[test]
    fn test_chapter_page_url_substitution() {
        let manga = url("http://mangapark.me/manga/ajin-miura-tsuina/?sort=asc");
        let chapter = chapter_page_url(&manga, 20).unwrap();
        assert_eq!(chapter.as_str(), "http://mangapark.me/manga/ajin-miura-tsuina/c20");

        let no_slash = url("http://mangapark.me/manga/ajin");
        assert_eq!(
            chapter_page_url(&no_slash, 3).unwrap().as_str(),
            "http://mangapark.me/manga/ajin/c3"
        );
    }

    #[test]
    fn test_chapter_number_from_url() {
        assert_eq!(chapter_number_from_url(&url("http://mangapark.me/manga/ajin/s1/c20")), Some(20.0));
        assert_eq!(chapter_number_from_url(&url("http://mangapark.me/manga/ajin/s2/v3/c19.5/")), Some(19.5));
        assert_eq!(chapter_number_from_url(&url("http://mangapark.me/manga/ajin/s1")), None);
        assert_eq!(chapter_number_from_url(&url("http://mangapark.me/manga/ajin/s1/cover")), None);
    }

    #[test]
    fn test_strip_parameters() {
        assert_eq!(strip_parameters("http://img.host/a/001.jpg?token=abc&x=1"), "http://img.host/a/001.jpg");
        assert_eq!(strip_parameters("http://img.host/a/002.png"), "http://img.host/a/002.png");
    }

    #[test]
    fn test_resolve_link() {
        let page = url("https://mangapark.me/manga/ajin/s1/c20");
        assert_eq!(
            resolve_link(&page, "//cdn.host/img/1.jpg").unwrap().as_str(),
            "https://cdn.host/img/1.jpg"
        );
        assert_eq!(
            resolve_link(&page, "/manga/ajin/s1/c21").unwrap().as_str(),
            "https://mangapark.me/manga/ajin/s1/c21"
        );
        assert_eq!(
            resolve_link(&page, "http://other.host/x.png").unwrap().as_str(),
            "http://other.host/x.png"
        );
    }
}
