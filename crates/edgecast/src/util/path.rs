use url::{Position, Url};

use crate::error::EdgeResult;

pub(crate) fn is_absolute_url(s: &str) -> bool {
    s.starts_with("http://")
        || s.starts_with("https://")
        || s.starts_with("file://")
        || s.starts_with("ftp://")
}

/// Strip scheme and authority from an absolute URL, keeping path, query and fragment.
///
/// Relative inputs are returned unchanged.
pub(crate) fn strip_origin(s: &str) -> String {
    if !is_absolute_url(s) {
        return s.to_string();
    }

    match Url::parse(s) {
        Ok(url) => url[Position::BeforePath..].to_string(),
        Err(_) => s.to_string(),
    }
}

/// Where a stream's playlist lives, derived from its CDN endpoint.
///
/// `path` and `dir` are server-relative and carry no leading slash, which is
/// also the form broadcast content locations arrive in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistLocation {
    /// `live/stream/index.m3u8?token=1`
    pub path: String,
    /// `live/stream/`
    pub dir: String,
    /// `https://cdn.example.com/`
    pub origin: Url,
}

impl PlaylistLocation {
    pub fn from_endpoint(endpoint: &str) -> EdgeResult<Self> {
        let url = Url::parse(endpoint)?;

        let mut path = url.path().trim_start_matches('/').to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        // the query never contributes to the directory
        let bare = url.path().trim_start_matches('/');
        let dir = match bare.rfind('/') {
            Some(pos) => bare[..=pos].to_string(),
            None => String::new(),
        };

        let mut origin = url;
        origin.set_path("");
        origin.set_query(None);
        origin.set_fragment(None);

        Ok(Self { path, dir, origin })
    }

    /// Full server-relative uri of an entry listed in the playlist.
    pub fn resolve(&self, relative: &str) -> String {
        format!("{}{}", self.dir, relative.trim_start_matches('/'))
    }
}
