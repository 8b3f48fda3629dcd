use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::PlatformerError;
use crate::node::SharedNode;
use crate::settings::APP_VERSION;

/// Liveness probe target: 200 with an empty body
pub async fn pong() -> StatusCode {
    StatusCode::OK
}

/// Which node answered, and how much of the network it knows
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub version: String,
    pub known_peers: usize,
}

#[instrument(skip(node), level = "debug")]
pub async fn node_info(
    State(node): State<SharedNode>,
) -> Result<Json<NodeInfo>, PlatformerError> {
    let known_peers = node.peer_store().len().await?;
    Ok(Json(NodeInfo {
        name: node.settings().name.clone(),
        version: APP_VERSION.to_string(),
        known_peers,
    }))
}
