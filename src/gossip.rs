//! Gossip: importing another node's peer list, and the optional periodic
//! exchange that keeps a node's view fresh.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, event, info, instrument, warn, Level};

use crate::error::{PlatformerError, Result};
use crate::health::parse_peer_url;
use crate::node::Node;
use crate::settings::UnreachablePolicy;

/// What happened to each entry of an imported peer list
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub source: String,
    /// Stored or refreshed
    pub merged: Vec<String>,
    /// Entries naming this node
    pub skipped_self: Vec<String>,
    /// Entries whose identity could not be resolved
    pub unreachable: Vec<String>,
    /// Entries that are not usable peer URLs
    pub invalid: Vec<String>,
}

impl ImportReport {
    fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }
}

/// Merges remote peer lists through `Node::add_peer`, so self-exclusion and
/// dedup apply to every imported entry.
#[derive(Clone, Copy, Debug, Default)]
pub struct GossipExchanger {
    policy: UnreachablePolicy,
}

impl GossipExchanger {
    pub fn new(policy: UnreachablePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnreachablePolicy {
        self.policy
    }

    /// Fetch the peer list of `from_url` and add every entry.
    ///
    /// Entries are merged one at a time; dropping the returned future stops
    /// further merges without undoing finished ones. With
    /// `UnreachablePolicy::Abort` the first undecidable entry ends the import
    /// with `PeerUnreachable`. Storage failures always abort.
    #[instrument(skip(self, node), level = "debug")]
    pub async fn import_peer_list(&self, node: &Node, from_url: &str) -> Result<ImportReport> {
        let source = parse_peer_url(from_url)?;
        let list = node.client().fetch_peer_list(&source).await?;
        info!("Received {} peers from {}", list.objects.len(), source);

        let mut report = ImportReport::new(source.as_str());
        let mut seen = HashSet::new();
        for entry in list.objects {
            let url = match parse_peer_url(&entry.url) {
                Ok(url) => url,
                Err(_) => {
                    warn!("Ignoring invalid peer url '{}' from {}", entry.url, source);
                    report.invalid.push(entry.url);
                    continue;
                }
            };
            if !seen.insert(url.to_string()) {
                continue;
            }
            match node.add_peer(url.as_str()).await {
                Ok(peer) => {
                    debug!("Merged peer {} (active={})", peer.url, peer.active);
                    report.merged.push(peer.url);
                }
                Err(PlatformerError::PeerIsMe(url)) => {
                    debug!("Skipping own url {} in peer list of {}", url, source);
                    report.skipped_self.push(url);
                }
                Err(PlatformerError::PeerUnreachable(url)) => match self.policy {
                    UnreachablePolicy::Skip => {
                        warn!("Could not identify {}; skipping", url);
                        report.unreachable.push(url);
                    }
                    UnreachablePolicy::Abort => {
                        event!(
                            Level::ERROR,
                            message = "Aborting peer list import",
                            source = source.as_str(),
                            unreachable = url.as_str()
                        );
                        return Err(PlatformerError::PeerUnreachable(url));
                    }
                },
                Err(err) => return Err(err),
            }
        }
        info!(
            "Imported peer list from {}: {} merged, {} self, {} unreachable, {} invalid",
            report.source,
            report.merged.len(),
            report.skipped_self.len(),
            report.unreachable.len(),
            report.invalid.len()
        );
        Ok(report)
    }
}

/// Periodic gossip: re-check every known peer, then import the list of one
/// randomly chosen active peer.
#[derive(Clone, Debug)]
pub struct GossipScheduler {
    gossip_interval: Duration,
}

impl GossipScheduler {
    pub fn new(gossip_interval: Duration) -> Self {
        Self { gossip_interval }
    }

    pub async fn run(self, node: Arc<Node>) {
        let mut ticker = interval(self.gossip_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = self.round(&node).await {
                event!(
                    Level::ERROR,
                    message = "Gossip round failed",
                    err = format!("{:?}", err)
                );
            }
        }
    }

    /// One gossip round. Returns the import report, if a partner was available.
    pub async fn round(&self, node: &Node) -> Result<Option<ImportReport>> {
        let peers = node.list_peers().await?;
        for peer in &peers {
            node.check_peer(&peer.url).await?;
        }

        let active: Vec<String> = node
            .list_peers()
            .await?
            .into_iter()
            .filter(|peer| peer.active)
            .map(|peer| peer.url)
            .collect();
        let partner = {
            let mut rng = rand::thread_rng();
            active.choose(&mut rng).cloned()
        };
        let partner = match partner {
            Some(url) => url,
            None => {
                debug!("No active peers to gossip with");
                return Ok(None);
            }
        };
        match node.get_peer_list_from(&partner).await {
            Ok(report) => Ok(Some(report)),
            // The partner went away between the probe and the fetch
            Err(PlatformerError::PeerUnreachable(url)) => {
                warn!("Gossip partner {} unreachable", url);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
