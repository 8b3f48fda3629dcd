use std::sync::Arc;

use tracing::{debug, instrument};
use url::Url;

use crate::client::PeerClient;
use crate::error::{PlatformerError, Result};
use crate::peers::PeerStatus;

/// Parse and normalize a peer URL. Only absolute http(s) URLs with a host
/// can name a peer.
pub fn parse_peer_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(PlatformerError::InvalidPeerUrl(format!(
                "unsupported scheme '{}' in {}",
                scheme, url
            )))
        }
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(PlatformerError::InvalidPeerUrl(format!(
            "missing host in {}",
            url
        )));
    }
    Ok(parsed)
}

/// Reachability probe for peers
#[derive(Clone)]
pub struct HealthChecker {
    client: Arc<dyn PeerClient>,
}

impl std::fmt::Debug for HealthChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthChecker").finish()
    }
}

impl HealthChecker {
    pub fn new(client: Arc<dyn PeerClient>) -> Self {
        Self { client }
    }

    /// Whether `url` answered a liveness request. Only a malformed URL is an
    /// error; unreachable peers are simply `false`.
    #[instrument(skip(self), level = "debug")]
    pub async fn probe(&self, url: &str) -> Result<bool> {
        let url = parse_peer_url(url)?;
        let active = self.client.head(&url).await;
        debug!("Probed {}: active={}", url, active);
        Ok(active)
    }

    /// Probe and stamp the outcome with the current time
    pub async fn status(&self, url: &str) -> Result<PeerStatus> {
        let active = self.probe(url).await?;
        Ok(PeerStatus::observed_now(active))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::peers::PeerList;
    use crate::secrets::Secret;

    struct FixedClient(bool);

    #[async_trait]
    impl PeerClient for FixedClient {
        async fn head(&self, _url: &Url) -> bool {
            self.0
        }

        async fn post_secret(&self, url: &Url, _secret: &Secret) -> Result<()> {
            Err(PlatformerError::PeerUnreachable(url.to_string()))
        }

        async fn fetch_peer_list(&self, _url: &Url) -> Result<PeerList> {
            Ok(PeerList::default())
        }
    }

    #[test]
    fn test_parse_peer_url_normalizes() {
        let url = parse_peer_url("http://127.0.0.1:5001").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5001/");
        assert_eq!(
            parse_peer_url(" HTTP://Example.com:5000/ ").unwrap().as_str(),
            "http://example.com:5000/"
        );
    }

    #[test]
    fn test_parse_peer_url_rejects_garbage() {
        assert!(matches!(
            parse_peer_url("not a url"),
            Err(PlatformerError::InvalidPeerUrl(_))
        ));
        assert!(matches!(
            parse_peer_url("ftp://127.0.0.1/"),
            Err(PlatformerError::InvalidPeerUrl(_))
        ));
        assert!(parse_peer_url("").is_err());
    }

    #[tokio::test]
    async fn test_probe_maps_unreachable_to_false() {
        let checker = HealthChecker::new(Arc::new(FixedClient(false)));
        assert!(!checker.probe("http://127.0.0.1:5001/").await.unwrap());

        let checker = HealthChecker::new(Arc::new(FixedClient(true)));
        let status = checker.status("http://127.0.0.1:5001/").await.unwrap();
        assert!(status.active);
    }

    #[tokio::test]
    async fn test_probe_rejects_invalid_url() {
        let checker = HealthChecker::new(Arc::new(FixedClient(true)));
        assert!(matches!(
            checker.probe("localhost:5000").await,
            Err(PlatformerError::InvalidPeerUrl(_))
        ));
    }
}
