//! Peer records as known locally, plus the peer-list wire format exchanged
//! with gossip partners.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlatformerError;

pub mod store;

pub use store::{InMemoryPeerStore, JsonFilePeerStore, PeerStore};

/// Numeric id assigned to a peer the first time it is persisted
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, PartialOrd, Ord, Eq, Hash,
)]
#[serde(transparent)]
pub struct PeerId(u64);

impl PeerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for PeerId {
    fn from(id: u64) -> Self {
        PeerId(id)
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reachability trend of a peer, always within [0.0, 1.0].
///
/// Every observation halves the weight of history:
/// `new = (old + (1.0 if active else 0.0)) / 2.0`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Health(f64);

impl Health {
    pub const MIN: Health = Health(0.0);
    pub const MAX: Health = Health(1.0);

    pub fn new(value: f64) -> Result<Self, PlatformerError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PlatformerError::InvalidHealth(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Fold one probe outcome into the average
    pub fn observe(self, active: bool) -> Self {
        let signal = if active { 1.0 } else { 0.0 };
        Self((self.0 + signal) / 2.0)
    }
}

impl Default for Health {
    fn default() -> Self {
        Health::MIN
    }
}

impl TryFrom<f64> for Health {
    type Error = PlatformerError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Health::new(value)
    }
}

impl From<Health> for f64 {
    fn from(health: Health) -> Self {
        health.0
    }
}

/// Outcome of a single reachability probe
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerStatus {
    pub active: bool,
    pub last_checked: DateTime<Utc>,
}

impl PeerStatus {
    pub fn observed_now(active: bool) -> Self {
        Self {
            active,
            last_checked: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub id: Option<PeerId>,
    pub url: String,
    pub active: bool,
    pub health: Health,
    pub last_checked: DateTime<Utc>,
}

impl Peer {
    /// A freshly discovered peer: inactive with zero health, not yet persisted
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            active: false,
            health: Health::MIN,
            last_checked: Utc::now(),
        }
    }

    pub fn update_status(&mut self, status: PeerStatus) {
        self.active = status.active;
        self.health = self.health.observe(status.active);
        self.last_checked = status.last_checked;
    }

    pub fn status(&self) -> PeerStatus {
        PeerStatus {
            active: self.active,
            last_checked: self.last_checked,
        }
    }

    pub fn entry(&self) -> PeerEntry {
        PeerEntry {
            id: self.id,
            url: self.url.clone(),
        }
    }
}

/// A peer as it appears in a gossip partner's list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntry {
    #[serde(default)]
    pub id: Option<PeerId>,
    pub url: String,
}

/// `GET /peer` response body
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerList {
    pub objects: Vec<PeerEntry>,
}

impl FromIterator<PeerEntry> for PeerList {
    fn from_iter<I: IntoIterator<Item = PeerEntry>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_rejects_out_of_range() {
        assert!(Health::new(0.0).is_ok());
        assert!(Health::new(1.0).is_ok());
        assert!(matches!(
            Health::new(1.5),
            Err(PlatformerError::InvalidHealth(_))
        ));
        assert!(Health::new(-0.1).is_err());
        assert!(Health::new(f64::NAN).is_err());
    }

    #[test]
    fn test_two_successful_probes_from_zero() {
        let health = Health::MIN.observe(true);
        assert_eq!(health.value(), 0.5);
        let health = health.observe(true);
        assert_eq!(health.value(), 0.75);
    }

    #[test]
    fn test_health_decays_on_failure() {
        let health = Health::MAX.observe(false).observe(false);
        assert_eq!(health.value(), 0.25);
    }

    #[test]
    fn test_health_deserialization_enforces_range() {
        assert!(serde_json::from_str::<Health>("0.5").is_ok());
        assert!(serde_json::from_str::<Health>("2.0").is_err());
    }

    #[test]
    fn test_update_status_mutates_in_place() {
        let mut peer = Peer::new("http://127.0.0.1:5001/");
        let first = PeerStatus::observed_now(true);
        peer.update_status(first);
        assert!(peer.active);
        assert_eq!(peer.health.value(), 0.5);
        assert_eq!(peer.last_checked, first.last_checked);

        let second = PeerStatus {
            active: false,
            last_checked: first.last_checked + chrono::Duration::seconds(5),
        };
        peer.update_status(second);
        assert!(!peer.active);
        assert_eq!(peer.health.value(), 0.25);
        assert!(peer.last_checked > first.last_checked);
    }

    #[test]
    fn test_peer_list_wire_shape() {
        let list: PeerList = vec![PeerEntry {
            id: Some(PeerId::new(1)),
            url: "http://127.0.0.1:5001/".to_string(),
        }]
        .into_iter()
        .collect();
        let value = serde_json::to_value(&list).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"objects": [{"id": 1, "url": "http://127.0.0.1:5001/"}]})
        );

        // Partners may omit ids or add pagination fields
        let parsed: PeerList = serde_json::from_str(
            r#"{"num_results": 1, "objects": [{"url": "http://10.0.0.2:5000/"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.objects[0].id, None);
    }
}
