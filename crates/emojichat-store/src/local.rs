//! In-process implementation of [`RealtimeStore`].
//!
//! A [`LocalStore`] is a cheap, cloneable handle to a hub that holds the
//! documents (in memory or in SQLite) and the live subscriptions. Every write
//! rebuilds the full snapshot of the touched collection and pushes it to each
//! subscriber of that collection. When backed by a database file shared with
//! other processes, [`LocalStore::poll_external_changes`] picks up their
//! commits.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde_json::Map;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{
    apply_mode, next_server_time, stamp_fields, CollectionPath, DocumentId, DocumentWrite,
    Snapshot, StoredDocument, WriteMode,
};
use crate::realtime::RealtimeStore;
use crate::subscription::Subscription;

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryDocuments {
    collections: HashMap<CollectionPath, Vec<StoredDocument>>,
    next_seq: u64,
    last_ms: Option<i64>,
}

impl MemoryDocuments {
    fn apply_write(
        &mut self,
        path: &CollectionPath,
        id: &DocumentId,
        write: &DocumentWrite,
        mode: WriteMode,
        stamp: bool,
    ) {
        let at = if stamp {
            let at = next_server_time(self.last_ms, Utc::now());
            self.last_ms = Some(at.timestamp_millis());
            Some(at)
        } else {
            None
        };

        let docs = self.collections.entry(path.clone()).or_default();
        match docs.iter_mut().find(|doc| &doc.id == id) {
            Some(doc) => {
                let current = std::mem::take(&mut doc.data);
                doc.data = apply_mode(Some(current), &write.fields, mode);
                stamp_fields(&mut doc.data, &write.server_timestamps, at);
            }
            None => {
                self.next_seq += 1;
                let mut data = apply_mode(None, &write.fields, mode);
                stamp_fields(&mut data, &write.server_timestamps, at);
                docs.push(StoredDocument {
                    id: id.clone(),
                    data,
                    seq: self.next_seq,
                });
            }
        }
    }

    fn load_collection(&self, path: &CollectionPath) -> Vec<StoredDocument> {
        self.collections.get(path).cloned().unwrap_or_default()
    }

    fn get_document(&self, path: &CollectionPath, id: &DocumentId) -> Option<StoredDocument> {
        self.collections
            .get(path)
            .and_then(|docs| docs.iter().find(|doc| &doc.id == id))
            .cloned()
    }
}

enum Backend {
    Memory(MemoryDocuments),
    Sqlite(Database),
}

impl Backend {
    fn apply_write(
        &mut self,
        path: &CollectionPath,
        id: &DocumentId,
        write: &DocumentWrite,
        mode: WriteMode,
        stamp: bool,
    ) -> Result<()> {
        match self {
            Backend::Memory(mem) => {
                mem.apply_write(path, id, write, mode, stamp);
                Ok(())
            }
            Backend::Sqlite(db) => db.apply_write(path, id, write, mode, stamp),
        }
    }

    fn load_collection(&self, path: &CollectionPath) -> Result<Vec<StoredDocument>> {
        match self {
            Backend::Memory(mem) => Ok(mem.load_collection(path)),
            Backend::Sqlite(db) => db.load_collection(path),
        }
    }

    fn get_document(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
    ) -> Result<Option<StoredDocument>> {
        match self {
            Backend::Memory(mem) => Ok(mem.get_document(path, id)),
            Backend::Sqlite(db) => db.get_document(path, id),
        }
    }
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

struct Listener {
    path: CollectionPath,
    tx: mpsc::UnboundedSender<Snapshot>,
}

/// Server-stamped fields still waiting for acknowledgement.
struct PendingStamp {
    path: CollectionPath,
    id: DocumentId,
    fields: Vec<String>,
}

struct Hub {
    backend: Backend,
    listeners: HashMap<u64, Listener>,
    next_listener: u64,
    deferred_acks: bool,
    pending: Vec<PendingStamp>,
    offline: bool,
    seen_data_version: Option<i64>,
}

impl Hub {
    fn new(backend: Backend, seen_data_version: Option<i64>) -> Self {
        Self {
            backend,
            listeners: HashMap::new(),
            next_listener: 0,
            deferred_acks: false,
            pending: Vec::new(),
            offline: false,
            seen_data_version,
        }
    }

    fn commit(
        &mut self,
        path: &CollectionPath,
        id: &DocumentId,
        write: &DocumentWrite,
        mode: WriteMode,
    ) -> Result<()> {
        if self.offline {
            return Err(StoreError::Offline);
        }

        let stamp = !self.deferred_acks;
        self.backend.apply_write(path, id, write, mode, stamp)?;

        if !stamp && !write.server_timestamps.is_empty() {
            self.pending.push(PendingStamp {
                path: path.clone(),
                id: id.clone(),
                fields: write.server_timestamps.clone(),
            });
        }

        self.broadcast(path)
    }

    fn broadcast(&mut self, path: &CollectionPath) -> Result<()> {
        if !self.listeners.values().any(|l| &l.path == path) {
            return Ok(());
        }

        let snapshot = Snapshot {
            path: path.clone(),
            documents: self.backend.load_collection(path)?,
        };
        debug!(path = %path, documents = snapshot.len(), "broadcasting snapshot");

        // Listeners whose receiver is gone are dropped here.
        self.listeners
            .retain(|_, l| &l.path != path || l.tx.send(snapshot.clone()).is_ok());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public handle
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct LocalStore {
    hub: Arc<Mutex<Hub>>,
}

impl LocalStore {
    /// Volatile store living only as long as its handles.
    pub fn in_memory() -> Self {
        Self::from_hub(Hub::new(Backend::Memory(MemoryDocuments::default()), None))
    }

    /// Store persisted in `db`; documents written earlier (by this or another
    /// process) are visible immediately.
    pub fn with_database(db: Database) -> Result<Self> {
        let version = db.data_version()?;
        info!(path = ?db.path(), "local store backed by database");
        Ok(Self::from_hub(Hub::new(Backend::Sqlite(db), Some(version))))
    }

    fn from_hub(hub: Hub) -> Self {
        Self {
            hub: Arc::new(Mutex::new(hub)),
        }
    }

    /// Leave server-stamped fields null until [`LocalStore::acknowledge_pending`]
    /// runs, the way a remote store reports a write before its commit.
    pub fn with_deferred_acks(self) -> Self {
        if let Ok(mut hub) = self.hub.lock() {
            hub.deferred_acks = true;
        }
        self
    }

    /// Fill every pending server timestamp. Returns how many writes were
    /// acknowledged.
    pub fn acknowledge_pending(&self) -> Result<usize> {
        let mut hub = self.lock()?;
        let pending = std::mem::take(&mut hub.pending);
        let mut touched = BTreeSet::new();

        for stamp in &pending {
            let write = DocumentWrite {
                fields: Map::new(),
                server_timestamps: stamp.fields.clone(),
            };
            hub.backend
                .apply_write(&stamp.path, &stamp.id, &write, WriteMode::Merge, true)?;
            touched.insert(stamp.path.clone());
        }
        for path in &touched {
            hub.broadcast(path)?;
        }

        Ok(pending.len())
    }

    /// Refuse reads and writes while `offline` is set.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut hub) = self.hub.lock() {
            hub.offline = offline;
        }
    }

    /// Re-broadcast subscribed collections if another connection committed
    /// to the backing database since the last call. Returns whether anything
    /// was re-broadcast.
    pub fn poll_external_changes(&self) -> Result<bool> {
        let mut hub = self.lock()?;
        let version = match &hub.backend {
            Backend::Sqlite(db) => db.data_version()?,
            Backend::Memory(_) => return Ok(false),
        };
        if hub.seen_data_version == Some(version) {
            return Ok(false);
        }
        hub.seen_data_version = Some(version);

        let paths: BTreeSet<CollectionPath> =
            hub.listeners.values().map(|l| l.path.clone()).collect();
        for path in &paths {
            hub.broadcast(path)?;
        }
        debug!(version, collections = paths.len(), "picked up external changes");
        Ok(true)
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.hub.lock().map(|hub| hub.listeners.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Hub>> {
        self.hub
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {e}")))
    }
}

impl RealtimeStore for LocalStore {
    async fn add(&self, path: &CollectionPath, write: DocumentWrite) -> Result<DocumentId> {
        let id = DocumentId::generate();
        self.lock()?.commit(path, &id, &write, WriteMode::Replace)?;
        debug!(path = %path, id = %id, "document added");
        Ok(id)
    }

    async fn set(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        write: DocumentWrite,
        mode: WriteMode,
    ) -> Result<()> {
        self.lock()?.commit(path, id, &write, mode)?;
        debug!(path = %path, id = %id, ?mode, "document set");
        Ok(())
    }

    async fn get(&self, path: &CollectionPath, id: &DocumentId) -> Result<Option<StoredDocument>> {
        let hub = self.lock()?;
        if hub.offline {
            return Err(StoreError::Offline);
        }
        hub.backend.get_document(path, id)
    }

    fn subscribe(&self, path: &CollectionPath) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();

        let listener_id = {
            let mut hub = self.lock()?;
            if hub.offline {
                return Err(StoreError::Offline);
            }

            let initial = Snapshot {
                path: path.clone(),
                documents: hub.backend.load_collection(path)?,
            };
            // The receiver is held right here, so this cannot fail.
            let _ = tx.send(initial);

            let id = hub.next_listener;
            hub.next_listener += 1;
            hub.listeners.insert(
                id,
                Listener {
                    path: path.clone(),
                    tx,
                },
            );
            id
        };

        debug!(path = %path, listener = listener_id, "subscribed");

        let hub = Arc::downgrade(&self.hub);
        Ok(Subscription::new(path.clone(), rx, move || {
            if let Some(hub) = hub.upgrade() {
                if let Ok(mut hub) = hub.lock() {
                    hub.listeners.remove(&listener_id);
                }
            }
        }))
    }
}
