use std::time::Duration;

use finishcam_core::FetchFailure;
use url::Url;

/// HTTP GET of session documents, mapped onto the scheduler's failure type.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("finishcam/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub async fn get(&self, url: Url) -> Result<Vec<u8>, FetchFailure> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| FetchFailure::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        let body = response.bytes().await.map_err(|e| FetchFailure::Network(e.to_string()))?;
        Ok(body.to_vec())
    }
}
