//! Outbound calls to peer replicas.

use crate::error::DistributedError;
use reqwest::Client;
use std::time::Duration;

/// Default per-call timeout.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(30);

/// Issues one trigger call and returns the raw response text.
#[async_trait::async_trait]
pub trait PeerClient: Send + Sync {
    async fn trigger(&self, url: &str) -> Result<String, DistributedError>;
}

/// [`PeerClient`] over HTTP GET.
#[derive(Clone)]
pub struct HttpPeerClient {
    client: Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, DistributedError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PeerClient for HttpPeerClient {
    async fn trigger(&self, url: &str) -> Result<String, DistributedError> {
        tracing::debug!("Triggering peer at {url}");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DistributedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}
