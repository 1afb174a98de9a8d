use std::future::Future;
use std::time::Duration;

use alloy::hex::ToHexExt;
use alloy::primitives::B256;
use anyhow::{bail, Context, Result};
use reqwest::{Client, Url};

/// Content-addressed document lookup. Callers treat a fetch failure as
/// missing content and move on.
pub trait ContentStore {
    fn fetch(&self, hash: B256) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Clone)]
pub struct HttpContentStore {
    client: Client,
    base: Url,
}

impl HttpContentStore {
    pub fn new(base: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(8))
            .build()
            .context("Failed to initialize client for content fetches")?;

        Ok(Self { client, base })
    }
}

impl ContentStore for HttpContentStore {
    async fn fetch(&self, hash: B256) -> Result<String> {
        let url = format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            hash.encode_hex_with_prefix()
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to reach the content gateway")?;

        if !response.status().is_success() {
            bail!("content gateway returned {}", response.status());
        }

        response.text().await.context("failed to read content body")
    }
}
