//! An in-process network of fake hosts for driving nodes deterministically.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use platformer::client::PeerClient;
use platformer::error::{PlatformerError, Result};
use platformer::node::Node;
use platformer::peers::{InMemoryPeerStore, PeerEntry, PeerList};
use platformer::secrets::{Secret, SecretStore};
use platformer::settings::{Settings, UnreachablePolicy};

#[derive(Clone)]
struct FakeHost {
    reachable: bool,
    secrets: Arc<SecretStore>,
    peers: Vec<String>,
    // How long the host takes to answer a secret
    delay: Duration,
}

/// Every url resolves to a host; secrets posted to a host land in its
/// `SecretStore`, which for a node is the node's own store.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    hosts: Arc<RwLock<HashMap<String, FakeHost>>>,
}

pub fn key(url: &str) -> String {
    Url::parse(url).unwrap().to_string()
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reachable host that is not any node under test
    pub fn add_host(&self, url: &str) -> Arc<SecretStore> {
        let secrets = Arc::new(SecretStore::new());
        self.route(url, secrets.clone());
        secrets
    }

    /// Send everything addressed to `url` to the owner of `secrets`
    pub fn route(&self, url: &str, secrets: Arc<SecretStore>) {
        self.hosts.write().unwrap().insert(
            key(url),
            FakeHost {
                reachable: true,
                secrets,
                peers: Vec::new(),
                delay: Duration::ZERO,
            },
        );
    }

    pub fn set_reachable(&self, url: &str, reachable: bool) {
        if let Some(host) = self.hosts.write().unwrap().get_mut(&key(url)) {
            host.reachable = reachable;
        }
    }

    pub fn set_delay(&self, url: &str, delay: Duration) {
        if let Some(host) = self.hosts.write().unwrap().get_mut(&key(url)) {
            host.delay = delay;
        }
    }

    pub fn set_peer_list(&self, url: &str, peers: &[String]) {
        if let Some(host) = self.hosts.write().unwrap().get_mut(&key(url)) {
            host.peers = peers.to_vec();
        }
    }

    /// A node listening at `own_url` on this network
    pub fn node(&self, own_url: &str, policy: UnreachablePolicy) -> Arc<Node> {
        let secrets = Arc::new(SecretStore::new());
        self.route(own_url, secrets.clone());
        let settings = Settings {
            name: own_url.to_string(),
            unreachable_policy: policy,
            ..Default::default()
        };
        Arc::new(Node::new(
            settings,
            Arc::new(InMemoryPeerStore::new()),
            secrets,
            Arc::new(self.clone()),
        ))
    }

    fn reachable_host(&self, url: &Url) -> Option<FakeHost> {
        self.hosts
            .read()
            .unwrap()
            .get(url.as_str())
            .filter(|host| host.reachable)
            .cloned()
    }
}

#[async_trait]
impl PeerClient for FakeNetwork {
    async fn head(&self, url: &Url) -> bool {
        self.reachable_host(url).is_some()
    }

    async fn post_secret(&self, url: &Url, secret: &Secret) -> Result<()> {
        match self.reachable_host(url) {
            Some(host) => {
                if !host.delay.is_zero() {
                    tokio::time::sleep(host.delay).await;
                }
                host.secrets.put(secret.clone())
            }
            None => Err(PlatformerError::PeerUnreachable(url.to_string())),
        }
    }

    async fn fetch_peer_list(&self, url: &Url) -> Result<PeerList> {
        match self.reachable_host(url) {
            Some(host) => Ok(host
                .peers
                .into_iter()
                .map(|url| PeerEntry { id: None, url })
                .collect()),
            None => Err(PlatformerError::PeerUnreachable(url.to_string())),
        }
    }
}

pub fn peer_url(port: u16) -> String {
    format!("http://10.0.0.1:{}/", port)
}
