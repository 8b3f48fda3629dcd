use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::client::{HttpPeerClient, PeerClient};
use crate::error::{PlatformerError, Result};
use crate::gossip::{GossipExchanger, ImportReport};
use crate::health::{parse_peer_url, HealthChecker};
use crate::identity::SelfIdentifier;
use crate::peers::{
    InMemoryPeerStore, JsonFilePeerStore, Peer, PeerId, PeerList, PeerStatus, PeerStore,
};
use crate::secrets::{Secret, SecretStore};
use crate::settings::Settings;

pub type SharedNode = Arc<Node>;

/// A registry node: its peer view, its secrets and the components that act
/// on them.
pub struct Node {
    settings: Settings,
    peers: Arc<dyn PeerStore>,
    secrets: Arc<SecretStore>,
    client: Arc<dyn PeerClient>,
    health: HealthChecker,
    identity: SelfIdentifier,
    gossip: GossipExchanger,
    // Serializes read-modify-write of a single peer record
    peer_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.settings.name)
            .field("gossip", &self.gossip)
            .finish()
    }
}

impl Node {
    pub fn new(
        settings: Settings,
        peers: Arc<dyn PeerStore>,
        secrets: Arc<SecretStore>,
        client: Arc<dyn PeerClient>,
    ) -> Self {
        let health = HealthChecker::new(client.clone());
        let identity = SelfIdentifier::new(client.clone(), secrets.clone());
        let gossip = GossipExchanger::new(settings.unreachable_policy);
        Self {
            settings,
            peers,
            secrets,
            client,
            health,
            identity,
            gossip,
            peer_locks: DashMap::new(),
        }
    }

    /// Build a node with an HTTP client and the store the settings ask for
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let client = Arc::new(HttpPeerClient::new(settings.request_timeout())?);
        let peers: Arc<dyn PeerStore> = match settings.snapshot_path() {
            Some(path) => Arc::new(JsonFilePeerStore::open(path, settings.reinit_db).await?),
            None => Arc::new(InMemoryPeerStore::new()),
        };
        let known = peers.len().await?;
        info!("[Node<{}>] Created with {} known peers", settings.name, known);
        Ok(Self::new(
            settings,
            peers,
            Arc::new(SecretStore::new()),
            client,
        ))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &Arc<dyn PeerClient> {
        &self.client
    }

    pub fn secrets(&self) -> &Arc<SecretStore> {
        &self.secrets
    }

    pub fn peer_store(&self) -> &Arc<dyn PeerStore> {
        &self.peers
    }

    pub async fn is_me(&self, url: &str) -> Result<bool> {
        self.identity.is_me(url).await
    }

    /// Register `url` as a peer: resolve identity first, then probe and store.
    /// Fails with `PeerIsMe` without touching the store when `url` is this node.
    #[instrument(skip(self), level = "debug")]
    pub async fn add_peer(&self, url: &str) -> Result<Peer> {
        let url = parse_peer_url(url)?;
        if self.is_me(url.as_str()).await? {
            return Err(PlatformerError::PeerIsMe(url.to_string()));
        }
        self.check_peer(url.as_str()).await
    }

    /// Probe `url` and fold the outcome into its record, creating it if needed
    #[instrument(skip(self), level = "debug")]
    pub async fn check_peer(&self, url: &str) -> Result<Peer> {
        let url = parse_peer_url(url)?;
        let peer = self.peers.get_or_create(url.as_str()).await?;
        let status = self.health.status(url.as_str()).await?;
        self.update_status(&peer, status).await
    }

    /// Apply a probe outcome to `peer` and persist it.
    ///
    /// The stored record is re-read under a per-url lock, so concurrent
    /// updates of one peer each contribute to the average.
    pub async fn update_status(&self, peer: &Peer, status: PeerStatus) -> Result<Peer> {
        let lock = self.peer_lock(&peer.url);
        let _guard = lock.lock().await;
        let mut current = self.peers.get_or_create(&peer.url).await?;
        current.update_status(status);
        let stored = self.peers.upsert(current).await?;
        info!(
            "Peer {} active={} health={:.4}",
            stored.url,
            stored.active,
            stored.health.value()
        );
        Ok(stored)
    }

    /// Import the peer list of the node at `url`
    pub async fn get_peer_list_from(&self, url: &str) -> Result<ImportReport> {
        self.gossip.import_peer_list(self, url).await
    }

    pub async fn list_peers(&self) -> Result<Vec<Peer>> {
        self.peers.list().await
    }

    /// This node's peers in the shape gossip partners expect
    pub async fn peer_list(&self) -> Result<PeerList> {
        Ok(self.peers.list().await?.iter().map(Peer::entry).collect())
    }

    pub async fn get_peer(&self, id: PeerId) -> Result<Peer> {
        self.peers
            .get(id)
            .await?
            .ok_or(PlatformerError::PeerNotFound(id))
    }

    /// Remove the record `id`. Waits for any update of the same url in flight.
    pub async fn delete_peer(&self, id: PeerId) -> Result<Peer> {
        let url = self.get_peer(id).await?.url;
        let lock = self.peer_lock(&url);
        let _guard = lock.lock().await;
        let peer = self
            .peers
            .delete(id)
            .await?
            .ok_or(PlatformerError::PeerNotFound(id))?;
        info!("Deleted peer {} ({})", id, peer.url);
        Ok(peer)
    }

    // Entries are never removed, so every caller for a url shares one mutex
    fn peer_lock(&self, url: &str) -> Arc<Mutex<()>> {
        self.peer_locks.entry(url.to_string()).or_default().clone()
    }

    /// Accept a secret posted by whoever is probing this node
    pub fn receive_secret(&self, secret: Secret) -> Result<()> {
        self.secrets.put(secret)
    }

    pub fn expire_secrets(&self) -> Result<usize> {
        self.secrets.expire(self.settings.secret_ttl())
    }
}
