mod base;
mod peers;
mod secrets;

use std::borrow::Cow;

use axum::{
    error_handling::HandleErrorLayer, http::StatusCode, response::IntoResponse, routing, Router,
};
use tokio::time::Duration;
use tower::{BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;

pub mod paths;

pub use base::NodeInfo;
pub use peers::PeerUrl;

use crate::error::Result;
use crate::node::SharedNode;

// Peer imports may touch many nodes, each bounded by the client timeout
const HANDLER_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the HTTP surface of a node
pub async fn api(node: SharedNode) -> Result<Router> {
    let api = Router::new()
        .route(
            paths::base::ROOT,
            routing::get(base::node_info).head(base::pong),
        )
        // Peer registry
        .route(
            paths::peers::LIST,
            routing::get(peers::list_peers).post(peers::create_peer),
        )
        .route(
            paths::peers::ITEM,
            routing::get(peers::get_peer).delete(peers::delete_peer),
        )
        .route(paths::peers::IMPORT, routing::post(peers::import_peer_list))
        // Self-identification
        .route(paths::SECRET, routing::post(secrets::receive_secret))
        .layer(
            ServiceBuilder::new()
                // Handle errors from middleware
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .timeout(HANDLER_TIMEOUT),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(node);

    Ok(api)
}

async fn handle_error(error: BoxError) -> impl IntoResponse {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (StatusCode::REQUEST_TIMEOUT, Cow::from("request timed out"));
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Cow::from("service is overloaded, try again later"),
        );
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Cow::from(format!("Unhandled internal error: {}", error)),
    )
}
