pub mod api;
pub mod cli;
pub mod client;
pub mod error;
pub mod gossip;
pub mod health;
pub mod identity;
pub mod node;
pub mod peers;
pub mod secrets;
pub mod settings;
