use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum MangaError {
    NetworkError(reqwest::Error),
    IoError(std::io::Error),
    ParseError(String),
    SelectorError(String),
    DownloadError(String),
    ConversionError(String),
    InvalidArgument(String),
}

impl fmt::Display for MangaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MangaError::NetworkError(e) => write!(f, "Failed to fetch page: {}", e),
            MangaError::IoError(e) => write!(f, "IO operation failed: {}", e),
            MangaError::ParseError(msg) => write!(f, "Unexpected page structure: {}", msg),
            MangaError::SelectorError(msg) => write!(f, "Invalid CSS selector: {}", msg),
            MangaError::DownloadError(msg) => write!(f, "Image download failed: {}", msg),
            MangaError::ConversionError(msg) => write!(
                f,
                "PDF conversion failed: {} (images of mixed sizes often cause this, try --size)",
                msg
            ),
            MangaError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl Error for MangaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MangaError::NetworkError(e) => Some(e),
            MangaError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for MangaError {
    fn from(err: reqwest::Error) -> Self {
        MangaError::NetworkError(err)
    }
}

impl From<std::io::Error> for MangaError {
    fn from(err: std::io::Error) -> Self {
        MangaError::IoError(err)
    }
}

impl From<lopdf::Error> for MangaError {
    fn from(err: lopdf::Error) -> Self {
        MangaError::ConversionError(err.to_string())
    }
}

impl From<url::ParseError> for MangaError {
    fn from(err: url::ParseError) -> Self {
        MangaError::ParseError(format!("invalid URL: {}", err))
    }
}
