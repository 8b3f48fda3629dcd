//! Platformer application settings
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{PlatformerError, Result};

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const STANDARD_PORT_HTTP: u16 = 5000;
pub const DEFAULT_PORT_HTTP: &str = "5000";
pub const DEFAULT_NODE_NAME: &str = "local";
pub const DEFAULT_REQUEST_TIMEOUT_MS: &str = "2000";
pub const DEFAULT_SECRET_TTL_SECS: &str = "60";

/// Length of the random token used for self-identification
pub const SECRET_LENGTH: usize = 255;

/// What a gossip import does when identity cannot be resolved for one entry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnreachablePolicy {
    /// Record the entry as unreachable and keep merging the rest
    #[default]
    Skip,
    /// Stop the import and surface the error
    Abort,
}

impl std::fmt::Display for UnreachablePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnreachablePolicy::Skip => write!(f, "skip"),
            UnreachablePolicy::Abort => write!(f, "abort"),
        }
    }
}

impl std::str::FromStr for UnreachablePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(UnreachablePolicy::Skip),
            "abort" => Ok(UnreachablePolicy::Abort),
            _ => Err(format!("Invalid unreachable policy: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    // Server listen address
    pub listen_address: String,

    // HTTP API listen port
    pub listen_port: u16,

    // Name of this node, used to name its snapshot file
    pub name: String,

    // Directory for the peer snapshot; in-memory only when absent
    pub data_dir: Option<PathBuf>,

    // Empty the peer snapshot on startup
    pub reinit_db: bool,

    // Upper bound for every outbound request (probe, secret, peer list)
    pub request_timeout_ms: u64,

    // Periodic gossip; zero disables it
    pub gossip_interval_secs: u64,

    // Secrets older than this are purged
    pub secret_ttl_secs: u64,

    pub unreachable_policy: UnreachablePolicy,

    // Peers to import from once the server is up
    pub bootstrap: Vec<Url>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            listen_port: STANDARD_PORT_HTTP,
            name: DEFAULT_NODE_NAME.to_string(),
            data_dir: None,
            reinit_db: false,
            request_timeout_ms: 2000,
            gossip_interval_secs: 0,
            secret_ttl_secs: 60,
            unreachable_policy: UnreachablePolicy::Skip,
            bootstrap: Vec::new(),
        }
    }
}

impl Settings {
    pub fn socket_address(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.listen_address.parse().map_err(|_| {
            PlatformerError::Config(format!("Invalid ip address: {}", self.listen_address))
        })?;
        Ok(SocketAddr::from((ip, self.listen_port)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn secret_ttl(&self) -> Duration {
        Duration::from_secs(self.secret_ttl_secs)
    }

    pub fn gossip_interval(&self) -> Option<Duration> {
        if self.gossip_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.gossip_interval_secs))
        }
    }

    /// Location of this node's peer snapshot, if persistence is enabled
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("platformer_node_{}.json", self.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_policy_parsing() {
        assert_eq!("skip".parse::<UnreachablePolicy>(), Ok(UnreachablePolicy::Skip));
        assert_eq!("ABORT".parse::<UnreachablePolicy>(), Ok(UnreachablePolicy::Abort));
        assert!("retry".parse::<UnreachablePolicy>().is_err());
        assert_eq!(UnreachablePolicy::Abort.to_string(), "abort");
    }

    #[test]
    fn test_snapshot_path_uses_node_name() {
        let settings = Settings {
            name: "alpha".to_string(),
            data_dir: Some(PathBuf::from("/var/lib/platformer")),
            ..Default::default()
        };
        assert_eq!(
            settings.snapshot_path(),
            Some(PathBuf::from("/var/lib/platformer/platformer_node_alpha.json"))
        );
        assert_eq!(Settings::default().snapshot_path(), None);
    }

    #[test]
    fn test_gossip_interval_zero_disables() {
        assert_eq!(Settings::default().gossip_interval(), None);
        let settings = Settings {
            gossip_interval_secs: 30,
            ..Default::default()
        };
        assert_eq!(settings.gossip_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_socket_address() {
        let settings = Settings {
            listen_address: "127.0.0.1".to_string(),
            listen_port: 5001,
            ..Default::default()
        };
        assert_eq!(
            settings.socket_address().unwrap(),
            "127.0.0.1:5001".parse::<SocketAddr>().unwrap()
        );
        let bad = Settings {
            listen_address: "nope".to_string(),
            ..Default::default()
        };
        assert!(matches!(bad.socket_address(), Err(PlatformerError::Config(_))));
    }
}
