//! Replica discovery.

use crate::error::DistributedError;
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;

/// One live replica: its name and a routable address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    pub name: String,
    pub address: String,
}

impl PeerEntry {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Synthetic target used when no replica is discovered.
    pub fn localhost() -> Self {
        Self::new("localhost", "localhost")
    }

    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.address.is_empty()
    }
}

impl FromStr for PeerEntry {
    type Err = DistributedError;

    /// Parse `name=address`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, address)) if !name.trim().is_empty() && !address.trim().is_empty() => {
                Ok(Self::new(name.trim(), address.trim()))
            }
            _ => Err(DistributedError::InvalidPeer(s.to_string())),
        }
    }
}

/// Source of live replicas matching a label selector.
///
/// An empty result is valid. Entries are returned fresh on every call.
#[async_trait::async_trait]
pub trait ServiceRegistry: Send + Sync {
    async fn discover(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PeerEntry>, DistributedError>;
}

/// Fixed peer list from configuration. Namespace and selector are ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    peers: Vec<PeerEntry>,
}

impl StaticRegistry {
    pub fn new(peers: Vec<PeerEntry>) -> Self {
        Self { peers }
    }
}

#[async_trait::async_trait]
impl ServiceRegistry for StaticRegistry {
    async fn discover(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> Result<Vec<PeerEntry>, DistributedError> {
        Ok(self.peers.clone())
    }
}

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    #[serde(default)]
    metadata: PodMetadata,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Debug, Default, Deserialize)]
struct PodMetadata {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodStatus {
    #[serde(default)]
    phase: String,
    #[serde(default, rename = "podIP")]
    pod_ip: String,
}

/// Running pods with an IP, taken from a pod list response body.
fn running_pods(list: PodList) -> Vec<PeerEntry> {
    list.items
        .into_iter()
        .filter(|pod| pod.status.phase == "Running")
        .map(|pod| PeerEntry::new(pod.metadata.name, pod.status.pod_ip))
        .filter(PeerEntry::is_complete)
        .collect()
}

/// Pods listed through the Kubernetes API with the in-cluster service account.
pub struct KubernetesRegistry {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl KubernetesRegistry {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            token: token.into(),
        }
    }

    /// Build from the pod's service account and `KUBERNETES_SERVICE_HOST/PORT`.
    pub fn from_in_cluster() -> Result<Self, DistributedError> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| DistributedError::Registry("KUBERNETES_SERVICE_HOST is not set".into()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        let token = read_credential("token")?;
        let ca = read_credential("ca.crt")?;
        let certificate = reqwest::Certificate::from_pem(ca.as_bytes())?;
        let client = reqwest::Client::builder()
            .add_root_certificate(certificate)
            .build()?;

        Ok(Self::new(client, format!("https://{host}:{port}"), token.trim()))
    }
}

fn read_credential(file: &str) -> Result<String, DistributedError> {
    let path = format!("{SERVICE_ACCOUNT_DIR}/{file}");
    std::fs::read_to_string(&path).map_err(|source| DistributedError::Credentials { path, source })
}

#[async_trait::async_trait]
impl ServiceRegistry for KubernetesRegistry {
    async fn discover(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PeerEntry>, DistributedError> {
        let url = format!("{}/api/v1/namespaces/{namespace}/pods", self.api_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("labelSelector", label_selector)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DistributedError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let peers = running_pods(response.json::<PodList>().await?);
        debug!(namespace, label_selector, peers = peers.len(), "Discovered pods");
        Ok(peers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_static_peer() {
        let peer: PeerEntry = "loadgen-0=10.60.1.19".parse().unwrap();
        assert_eq!(peer, PeerEntry::new("loadgen-0", "10.60.1.19"));
        assert!("loadgen-0".parse::<PeerEntry>().is_err());
        assert!("=10.60.1.19".parse::<PeerEntry>().is_err());
    }

    #[test]
    fn test_running_pods_filters_incomplete_entries() {
        let body = r#"{
            "items": [
                {"metadata": {"name": "a"}, "status": {"phase": "Running", "podIP": "10.0.0.1"}},
                {"metadata": {"name": "b"}, "status": {"phase": "Pending"}},
                {"metadata": {"name": "c"}, "status": {"phase": "Running"}},
                {"metadata": {"name": ""}, "status": {"phase": "Running", "podIP": "10.0.0.4"}}
            ]
        }"#;
        let list: PodList = serde_json::from_str(body).unwrap();
        assert_eq!(running_pods(list), vec![PeerEntry::new("a", "10.0.0.1")]);
    }

    #[tokio::test]
    async fn test_static_registry_returns_configured_peers() {
        let registry = StaticRegistry::new(vec![PeerEntry::new("a", "10.0.0.1")]);
        let peers = registry.discover("ns", "app=x").await.unwrap();
        assert_eq!(peers.len(), 1);
    }
}
