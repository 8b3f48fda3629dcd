//! Deciding whether a URL refers to this node.
//!
//! Hostnames and ports are unreliable here (several bind addresses, proxies,
//! NAT), so identity is established by reflection: post a fresh secret to the
//! candidate and check whether it arrived in our own `SecretStore`.
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::client::PeerClient;
use crate::error::Result;
use crate::health::parse_peer_url;
use crate::secrets::{generate_secret, SecretStore};

#[derive(Clone)]
pub struct SelfIdentifier {
    client: Arc<dyn PeerClient>,
    secrets: Arc<SecretStore>,
}

impl std::fmt::Debug for SelfIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfIdentifier")
            .field("pending_secrets", &self.secrets.len())
            .finish()
    }
}

impl SelfIdentifier {
    pub fn new(client: Arc<dyn PeerClient>, secrets: Arc<SecretStore>) -> Self {
        Self { client, secrets }
    }

    /// `Ok(true)` if `url` looped back into this process, `Ok(false)` if it is
    /// a distinct node. `PeerUnreachable` means undecided, never "not me".
    #[instrument(skip(self), level = "debug")]
    pub async fn is_me(&self, url: &str) -> Result<bool> {
        let url = parse_peer_url(url)?;
        let secret = generate_secret();
        self.client.post_secret(&url, &secret).await?;
        let is_me = self.secrets.take(&secret)?;
        debug!("Identity of {} resolved: is_me={}", url, is_me);
        Ok(is_me)
    }
}
