use std::{ops::Deref, time::Duration};

use reqwest::{Client, ClientBuilder};

use crate::error::EdgeResult;

/// Shared HTTP client used for every CDN request.
///
/// Cloning is cheap, all clones share the same connection pool.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> EdgeResult<Self> {
        let client = builder.build()?;
        Ok(Self { client })
    }

    /// Client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> EdgeResult<Self> {
        Self::new(Client::builder().timeout(timeout))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
