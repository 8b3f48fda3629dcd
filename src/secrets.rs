//! Single-use random tokens for self-identification round-trips.
//!
//! A node posts a fresh secret to a candidate URL. If that request loops back
//! into this process, the secret shows up in our own `SecretStore`.
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::settings::SECRET_LENGTH;
use crate::storage_error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Secret {
    pub value: String,
}

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// A fresh alphanumeric secret long enough that collisions are negligible
pub fn generate_secret() -> Secret {
    let value: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect();
    Secret { value }
}

/// Ephemeral secret storage, keyed by secret value
#[derive(Debug, Default)]
pub struct SecretStore {
    secrets: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl SecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, secret: Secret) -> Result<()> {
        let mut secrets = self
            .secrets
            .write()
            .map_err(|e| storage_error!("Failed to acquire secret store lock: {}", e))?;
        secrets.insert(secret.value, Utc::now());
        Ok(())
    }

    /// Look up a secret and consume it
    pub fn take(&self, secret: &Secret) -> Result<bool> {
        let mut secrets = self
            .secrets
            .write()
            .map_err(|e| storage_error!("Failed to acquire secret store lock: {}", e))?;
        Ok(secrets.remove(secret.as_str()).is_some())
    }

    /// Drop secrets older than `ttl`, returning how many were removed
    pub fn expire(&self, ttl: Duration) -> Result<usize> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| storage_error!("Invalid secret ttl: {}", e))?;
        let cutoff = Utc::now() - ttl;
        let mut secrets = self
            .secrets
            .write()
            .map_err(|e| storage_error!("Failed to acquire secret store lock: {}", e))?;
        let before = secrets.len();
        secrets.retain(|_, created| *created > cutoff);
        Ok(before - secrets.len())
    }

    pub fn len(&self) -> usize {
        self.secrets.read().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
