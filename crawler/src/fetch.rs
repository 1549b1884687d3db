use crate::config::CrawlConfig;
use anyhow::{anyhow, Result};
use reqwest::Client;

/// Source of raw page content.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain HTTP GET over a shared `reqwest` client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP {status}"));
        }
        let bytes = resp.bytes().await?;
        if bytes.len() > CrawlConfig::MAX_BODY_BYTES {
            return Err(anyhow!("response body of {} bytes exceeds limit", bytes.len()));
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
