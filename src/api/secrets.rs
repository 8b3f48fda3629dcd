use axum::{extract::State, http::StatusCode, Json};
use tracing::debug;

use crate::api_error;
use crate::error::PlatformerError;
use crate::node::SharedNode;
use crate::secrets::Secret;

/// Receive a one-shot identification secret
pub async fn receive_secret(
    State(node): State<SharedNode>,
    Json(secret): Json<Secret>,
) -> Result<StatusCode, PlatformerError> {
    if secret.value.is_empty() {
        return Err(api_error!("Secret value must not be empty"));
    }
    node.receive_secret(secret)?;
    debug!("Stored identification secret");
    Ok(StatusCode::CREATED)
}
