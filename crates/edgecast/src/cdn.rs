use bytes::Bytes;
use url::Url;

use crate::{
    error::{EdgeError, EdgeResult},
    util::http::HttpClient,
};

/// Fetches playlists and segments from the unicast origin of a stream.
#[derive(Debug, Clone)]
pub struct CdnClient {
    client: HttpClient,
    base: Url,
}

impl CdnClient {
    pub fn new(client: HttpClient, base: Url) -> Self {
        Self { client, base }
    }

    /// GET `path` relative to the origin.
    ///
    /// Any non-2xx response is an error, the body is never returned in that case.
    pub async fn fetch(&self, path: &str) -> EdgeResult<Bytes> {
        let url = self.base.join(path)?;
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            if let Ok(body) = response.text().await {
                tracing::debug!("Error body: {body}");
            }
            return Err(EdgeError::HttpError(status));
        }

        Ok(response.bytes().await?)
    }
}
