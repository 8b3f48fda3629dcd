//! Outbound HTTP to other nodes.
//!
//! `PeerClient` is the seam between the peer logic and the network; tests
//! substitute their own implementation.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::api::paths;
use crate::error::{PlatformerError, Result};
use crate::peers::PeerList;
use crate::secrets::Secret;
use crate::{api_error, config_error};

#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Lightweight liveness request. Every failure mode reports `false`.
    async fn head(&self, url: &Url) -> bool;

    /// Register `secret` with the node at `url`. Anything but `201 Created`
    /// is `PeerUnreachable`.
    async fn post_secret(&self, url: &Url, secret: &Secret) -> Result<()>;

    /// Fetch the node's known peers
    async fn fetch_peer_list(&self, url: &Url) -> Result<PeerList>;
}

/// `PeerClient` backed by reqwest. Every request is bounded by `timeout`.
#[derive(Clone, Debug)]
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| config_error!("Failed building HTTP client: {}", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn head(&self, url: &Url) -> bool {
        match self.client.head(url.clone()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }

    async fn post_secret(&self, url: &Url, secret: &Secret) -> Result<()> {
        let endpoint = paths::endpoint(url, paths::SECRET);
        let response = self
            .client
            .post(endpoint)
            .json(secret)
            .send()
            .await
            .map_err(|e| {
                debug!("POST secret to {} failed: {}", url, e);
                PlatformerError::PeerUnreachable(url.to_string())
            })?;
        if response.status() == StatusCode::CREATED {
            Ok(())
        } else {
            debug!("POST secret to {} returned {}", url, response.status());
            Err(PlatformerError::PeerUnreachable(url.to_string()))
        }
    }

    async fn fetch_peer_list(&self, url: &Url) -> Result<PeerList> {
        let endpoint = paths::endpoint(url, paths::peers::LIST);
        let response = self.client.get(endpoint).send().await.map_err(|e| {
            debug!("GET peer list from {} failed: {}", url, e);
            PlatformerError::PeerUnreachable(url.to_string())
        })?;
        if !response.status().is_success() {
            debug!("GET peer list from {} returned {}", url, response.status());
            return Err(PlatformerError::PeerUnreachable(url.to_string()));
        }
        response
            .json::<PeerList>()
            .await
            .map_err(|e| api_error!("Invalid peer list from {}: {}", url, e))
    }
}
