//! API client for the sidecar's submission endpoint

use anyhow::{Context, Result};
use bridge_lib::models::{PodSubmission, SubmitResponse};
use reqwest::Client;
use url::Url;

/// HTTP client for a running sidecar
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Submit a pod, returning the {pod uid, job id} pair
    pub async fn submit(&self, submission: &PodSubmission) -> Result<SubmitResponse> {
        let url = self.base_url.join("create").context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(submission)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}
