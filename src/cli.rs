//! CLI for this application
//!
use std::path::PathBuf;

use url::Url;

use crate::settings;

#[derive(Clone, Debug, clap::Parser)]
#[clap(version)]
pub struct Cli {
    // Server listen address
    #[clap(
        long,
        default_value = "0.0.0.0",
        env("PLATFORMER_LISTEN_ADDRESS"),
        help = "IP Address to listen on"
    )]
    pub listen_address: String,

    // HTTP API listen port
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_HTTP,
        env("PLATFORMER_LISTEN_PORT"),
        help = "Port to bind the Platformer HTTP API server to"
    )]
    pub listen_port: u16,

    #[clap(
        long,
        default_value = settings::DEFAULT_NODE_NAME,
        env("PLATFORMER_NAME"),
        help = "Name to assign to this node"
    )]
    pub name: String,

    #[clap(
        long,
        env("PLATFORMER_DATA_DIR"),
        help = "Directory for the peer snapshot. If empty, peers are kept in memory only."
    )]
    pub data_dir: Option<PathBuf>,

    #[clap(long, help = "Reinitialize (empty) the peer snapshot")]
    pub reinit_db: bool,

    #[clap(
        long,
        default_value = settings::DEFAULT_REQUEST_TIMEOUT_MS,
        env("PLATFORMER_REQUEST_TIMEOUT_MS"),
        help = "Timeout in milliseconds for health probes, secrets and peer list fetches"
    )]
    pub request_timeout_ms: u64,

    #[clap(
        long,
        default_value = "0",
        env("PLATFORMER_GOSSIP_INTERVAL_SECS"),
        help = "Seconds between gossip rounds (0 disables periodic gossip)"
    )]
    pub gossip_interval_secs: u64,

    #[clap(
        long,
        default_value = settings::DEFAULT_SECRET_TTL_SECS,
        env("PLATFORMER_SECRET_TTL_SECS"),
        help = "Seconds an identification secret is kept before it is purged"
    )]
    pub secret_ttl_secs: u64,

    #[clap(
        long,
        default_value = "skip",
        env("PLATFORMER_ON_UNREACHABLE"),
        help = "Gossip import policy for unreachable entries: 'skip' or 'abort'"
    )]
    pub on_unreachable: settings::UnreachablePolicy,

    #[clap(
        long,
        env("PLATFORMER_BOOTSTRAP"),
        value_delimiter = ',',
        help = "Peers to import peer lists from on startup (e.g., http://node1:5000,http://node2:5000)"
    )]
    pub bootstrap: Vec<Url>,
}

impl Cli {
    pub fn into_settings(self) -> settings::Settings {
        settings::Settings {
            listen_address: self.listen_address,
            listen_port: self.listen_port,
            name: self.name,
            data_dir: self.data_dir,
            reinit_db: self.reinit_db,
            request_timeout_ms: self.request_timeout_ms,
            gossip_interval_secs: self.gossip_interval_secs,
            secret_ttl_secs: self.secret_ttl_secs,
            unreachable_policy: self.on_unreachable,
            bootstrap: self.bootstrap,
        }
    }
}
