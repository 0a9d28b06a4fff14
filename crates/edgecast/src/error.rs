use thiserror::Error;

#[derive(Error, Debug)]
pub enum EdgeError {
    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error("Invalid m3u8 file: {0}")]
    M3u8ParseError(String),

    #[error("Master playlist received where a media playlist was expected")]
    UnexpectedMasterPlaylist,

    #[error("Segment {0} has no content and no CDN to fetch it from")]
    ContentUnavailable(String),

    #[error("Invalid MPD: {0}")]
    MpdError(String),

    #[error(transparent)]
    XmlError(#[from] quick_xml::Error),

    #[error(transparent)]
    TimeParseError(#[from] chrono::ParseError),

    #[error(transparent)]
    Utf8Error(#[from] std::str::Utf8Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),
}

pub type EdgeResult<T> = Result<T, EdgeError>;
