use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::time::Duration;

/// Retrieves one HTML document per URL.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain GET with a status check.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!("Fetching URL: {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        let html = resp.text().with_context(|| format!("read body of {url}"))?;
        tracing::debug!("Fetched {} bytes from {}", html.len(), url);
        Ok(html)
    }
}
