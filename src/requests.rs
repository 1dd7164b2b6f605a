use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response, header::REFERER};

use crate::config::TransportConfig;

/// The portal serves different markup to (or blocks) non-browser agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// A fetched page: the final URL after redirects and the decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub body: String,
}

/// HTTP session with a persistent cookie store.
///
/// Implementations must keep cookies between calls and send [`USER_AGENT`]
/// with every request. HTTP error statuses are returned as pages; only
/// transport faults are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> anyhow::Result<Page>;

    async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
        referer: &str,
    ) -> anyhow::Result<Page>;
}

pub struct RequestClient {
    client: Client,
}

impl RequestClient {
    pub fn new(config: &TransportConfig) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }

    async fn into_page(response: Response) -> anyhow::Result<Page> {
        // Grab the URL before `text()` consumes the response.
        let url = response.url().to_string();
        let body = response.text().await?;
        Ok(Page { url, body })
    }
}

#[async_trait]
impl Transport for RequestClient {
    async fn get(&self, url: &str) -> anyhow::Result<Page> {
        let response = self.client.get(url).send().await?;
        Self::into_page(response).await
    }

    async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
        referer: &str,
    ) -> anyhow::Result<Page> {
        let response = self
            .client
            .post(url)
            .header(REFERER, referer)
            .form(fields)
            .send()
            .await?;
        Self::into_page(response).await
    }
}
