use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{event, instrument, Level};

use crate::error::PlatformerError;
use crate::gossip::ImportReport;
use crate::node::SharedNode;
use crate::peers::{Peer, PeerEntry, PeerId, PeerList};

/// Body of `POST /peer` and `POST /peer-list/import`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeerUrl {
    pub url: String,
}

fn log_failure(message: &'static str, err: &PlatformerError) {
    match err {
        // Expected outcomes of identity resolution, not server faults
        PlatformerError::PeerIsMe(_) | PlatformerError::InvalidPeerUrl(_) => {
            event!(Level::DEBUG, message = message, err = format!("{}", err))
        }
        _ => event!(Level::ERROR, message = message, err = format!("{:?}", err)),
    }
}

#[instrument(skip(node), level = "debug")]
pub async fn list_peers(State(node): State<SharedNode>) -> Result<Json<PeerList>, PlatformerError> {
    node.peer_list().await.map(Json).map_err(|err| {
        log_failure("Failed listing peers", &err);
        err
    })
}

#[instrument(skip(node), level = "debug")]
pub async fn create_peer(
    State(node): State<SharedNode>,
    Json(body): Json<PeerUrl>,
) -> Result<(StatusCode, Json<Peer>), PlatformerError> {
    let peer = node.add_peer(&body.url).await.map_err(|err| {
        log_failure("Failed registering peer", &err);
        err
    })?;
    Ok((StatusCode::CREATED, Json(peer)))
}

#[instrument(skip(node), level = "debug")]
pub async fn get_peer(
    Path(id): Path<u64>,
    State(node): State<SharedNode>,
) -> Result<Json<PeerEntry>, PlatformerError> {
    let peer = node.get_peer(PeerId::new(id)).await?;
    Ok(Json(peer.entry()))
}

#[instrument(skip(node), level = "debug")]
pub async fn delete_peer(
    Path(id): Path<u64>,
    State(node): State<SharedNode>,
) -> Result<StatusCode, PlatformerError> {
    node.delete_peer(PeerId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(node), level = "debug")]
pub async fn import_peer_list(
    State(node): State<SharedNode>,
    Json(body): Json<PeerUrl>,
) -> Result<Json<ImportReport>, PlatformerError> {
    node.get_peer_list_from(&body.url)
        .await
        .map(Json)
        .map_err(|err| {
            log_failure("Failed importing peer list", &err);
            err
        })
}
