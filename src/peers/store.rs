use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Peer, PeerId};
use crate::error::{PlatformerError, Result};
use crate::storage_error;

/// Keyed peer storage. URL is the unique key; ids are assigned on first persist.
#[async_trait]
pub trait PeerStore: Send + Sync {
    /// Existing record for `url`, or a fresh inactive one that is not persisted
    async fn get_or_create(&self, url: &str) -> Result<Peer>;

    /// Persist `peer`, overwriting any record with the same url
    async fn upsert(&self, peer: Peer) -> Result<Peer>;

    /// Snapshot of all stored peers
    async fn list(&self) -> Result<Vec<Peer>>;

    async fn get(&self, id: PeerId) -> Result<Option<Peer>>;

    async fn delete(&self, id: PeerId) -> Result<Option<Peer>>;

    async fn len(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }
}

#[derive(Clone, Debug, Default)]
struct PeerTable {
    next_id: u64,
    peers: BTreeMap<PeerId, Peer>,
    ids_by_url: HashMap<String, PeerId>,
}

impl PeerTable {
    fn from_peers(peers: Vec<Peer>) -> Self {
        let mut table = Self::default();
        for peer in peers {
            table.upsert(peer);
        }
        table
    }

    fn upsert(&mut self, mut peer: Peer) -> Peer {
        let id = match self.ids_by_url.get(&peer.url) {
            Some(id) => *id,
            None => match peer.id {
                Some(id) if !self.peers.contains_key(&id) => id,
                _ => PeerId::new(self.next_id + 1),
            },
        };
        self.next_id = self.next_id.max(id.value());
        peer.id = Some(id);
        self.ids_by_url.insert(peer.url.clone(), id);
        self.peers.insert(id, peer.clone());
        peer
    }

    fn delete(&mut self, id: PeerId) -> Option<Peer> {
        let peer = self.peers.remove(&id)?;
        self.ids_by_url.remove(&peer.url);
        Some(peer)
    }

    fn get_by_url(&self, url: &str) -> Option<Peer> {
        self.ids_by_url
            .get(url)
            .and_then(|id| self.peers.get(id))
            .cloned()
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> PlatformerError {
    storage_error!("Failed to acquire peer table lock: {}", e)
}

/// Peers held in process memory
#[derive(Debug, Default)]
pub struct InMemoryPeerStore {
    table: RwLock<PeerTable>,
}

impl InMemoryPeerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peers(peers: Vec<Peer>) -> Self {
        Self {
            table: RwLock::new(PeerTable::from_peers(peers)),
        }
    }

    fn snapshot(&self) -> Result<PeerTable> {
        Ok(self.table.read().map_err(lock_error)?.clone())
    }

    fn replace(&self, table: PeerTable) -> Result<()> {
        *self.table.write().map_err(lock_error)? = table;
        Ok(())
    }
}

#[async_trait]
impl PeerStore for InMemoryPeerStore {
    async fn get_or_create(&self, url: &str) -> Result<Peer> {
        let table = self.table.read().map_err(lock_error)?;
        Ok(table.get_by_url(url).unwrap_or_else(|| Peer::new(url)))
    }

    async fn upsert(&self, peer: Peer) -> Result<Peer> {
        let mut table = self.table.write().map_err(lock_error)?;
        Ok(table.upsert(peer))
    }

    async fn list(&self) -> Result<Vec<Peer>> {
        let table = self.table.read().map_err(lock_error)?;
        Ok(table.peers.values().cloned().collect())
    }

    async fn get(&self, id: PeerId) -> Result<Option<Peer>> {
        let table = self.table.read().map_err(lock_error)?;
        Ok(table.peers.get(&id).cloned())
    }

    async fn delete(&self, id: PeerId) -> Result<Option<Peer>> {
        let mut table = self.table.write().map_err(lock_error)?;
        Ok(table.delete(id))
    }

    async fn len(&self) -> Result<usize> {
        let table = self.table.read().map_err(lock_error)?;
        Ok(table.peers.len())
    }
}

/// In-memory peers with a JSON snapshot rewritten on every mutation. A change
/// becomes visible only once the snapshot holding it is on disk.
#[derive(Debug)]
pub struct JsonFilePeerStore {
    path: PathBuf,
    inner: InMemoryPeerStore,
    // Held across build, write and commit of every mutation
    write_lock: Mutex<()>,
}

impl JsonFilePeerStore {
    /// Load the snapshot at `path`. A missing file is an empty store; `reinit`
    /// discards whatever is there.
    pub async fn open(path: impl AsRef<Path>, reinit: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let peers = if reinit {
            info!("Reinitializing peer snapshot at {}", path.display());
            Vec::new()
        } else {
            match tokio::fs::read(&path).await {
                Ok(bytes) => serde_json::from_slice::<Vec<Peer>>(&bytes).map_err(|e| {
                    storage_error!("Corrupt peer snapshot {}: {}", path.display(), e)
                })?,
                Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
                Err(e) => {
                    return Err(storage_error!(
                        "Failed reading peer snapshot {}: {}",
                        path.display(),
                        e
                    ))
                }
            }
        };
        info!(
            "Loaded {} peers from snapshot {}",
            peers.len(),
            path.display()
        );
        let store = Self {
            path,
            inner: InMemoryPeerStore::with_peers(peers),
            write_lock: Mutex::new(()),
        };
        if reinit {
            store.write_snapshot(&PeerTable::default()).await?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file at `path` with `table`, via a temporary file and rename
    async fn write_snapshot(&self, table: &PeerTable) -> Result<()> {
        let peers: Vec<&Peer> = table.peers.values().collect();
        let bytes = serde_json::to_vec_pretty(&peers)?;
        let tmp = self.path.with_extension("json.tmp");
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| storage_error!("Failed creating {}: {}", dir.display(), e))?;
        }
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| storage_error!("Failed writing {}: {}", tmp.display(), e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_error!("Failed replacing {}: {}", self.path.display(), e))?;
        debug!("Wrote {} peers to {}", peers.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl PeerStore for JsonFilePeerStore {
    async fn get_or_create(&self, url: &str) -> Result<Peer> {
        self.inner.get_or_create(url).await
    }

    async fn upsert(&self, peer: Peer) -> Result<Peer> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.inner.snapshot()?;
        let peer = table.upsert(peer);
        self.write_snapshot(&table).await?;
        self.inner.replace(table)?;
        Ok(peer)
    }

    async fn list(&self) -> Result<Vec<Peer>> {
        self.inner.list().await
    }

    async fn get(&self, id: PeerId) -> Result<Option<Peer>> {
        self.inner.get(id).await
    }

    async fn delete(&self, id: PeerId) -> Result<Option<Peer>> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.inner.snapshot()?;
        let removed = match table.delete(id) {
            Some(peer) => peer,
            None => return Ok(None),
        };
        self.write_snapshot(&table).await?;
        self.inner.replace(table)?;
        Ok(Some(removed))
    }

    async fn len(&self) -> Result<usize> {
        self.inner.len().await
    }
}
