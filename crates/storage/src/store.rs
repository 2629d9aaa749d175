use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{Collection, Record, StorageError, StorageResult};

/// Current on-disk schema version
const SCHEMA_VERSION: u32 = 1;

/// Marker file recording the schema version of a store directory
const SCHEMA_FILE: &str = "schema.json";

#[derive(Debug, Serialize, Deserialize)]
struct SchemaMarker {
    version: u32,
}

/// In-memory state of one collection. Guarded by a per-collection mutex so
/// operations on different collections run concurrently while operations on
/// the same collection are serialized.
struct CollectionState {
    collection: Collection,
    records: HashMap<String, Record>,
    /// field name -> index key -> record ids
    indexes: HashMap<&'static str, HashMap<String, HashSet<String>>>,
}

impl CollectionState {
    fn new(collection: Collection) -> Self {
        let indexes = collection
            .indexed_fields()
            .iter()
            .map(|field| (*field, HashMap::new()))
            .collect();
        Self {
            collection,
            records: HashMap::new(),
            indexes,
        }
    }

    fn index_insert(&mut self, record: &Record) {
        for field in self.collection.indexed_fields() {
            if let Some(value) = record.field(field) {
                if let Some(index) = self.indexes.get_mut(field) {
                    index
                        .entry(Record::index_key(value))
                        .or_default()
                        .insert(record.id.clone());
                }
            }
        }
    }

    fn index_remove(&mut self, record: &Record) {
        for field in self.collection.indexed_fields() {
            if let Some(value) = record.field(field) {
                let key = Record::index_key(value);
                if let Some(index) = self.indexes.get_mut(field) {
                    if let Some(ids) = index.get_mut(&key) {
                        ids.remove(&record.id);
                        if ids.is_empty() {
                            index.remove(&key);
                        }
                    }
                }
            }
        }
    }
}

/// Durable CRUD over the three shell collections
///
/// Initialization is versioned: the first open of a directory creates the
/// collections and their secondary indexes; later opens with a matching
/// schema version skip creation and load what is there. Every operation
/// persists atomically (write-temp-then-rename) before returning.
pub struct PersistentStore {
    root: PathBuf,
    collections: HashMap<Collection, Mutex<CollectionState>>,
}

impl PersistentStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// Fails with [`StorageError::Unavailable`] if the directory cannot be
    /// created, the schema marker cannot be read or written, or the marker
    /// names a schema newer than this build understands. Open failures are
    /// surfaced to the caller and never retried here.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::Unavailable(format!("cannot create {}: {}", root.display(), e)))?;

        let schema_path = root.join(SCHEMA_FILE);
        match tokio::fs::read(&schema_path).await {
            Ok(bytes) => {
                let marker: SchemaMarker = serde_json::from_slice(&bytes).map_err(|e| {
                    StorageError::Unavailable(format!("corrupt schema marker: {}", e))
                })?;
                if marker.version > SCHEMA_VERSION {
                    return Err(StorageError::Unavailable(format!(
                        "store schema v{} is newer than supported v{}",
                        marker.version, SCHEMA_VERSION
                    )));
                }
                log::debug!("opening store at {} (schema v{})", root.display(), marker.version);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // First use: create the collections and the version marker.
                log::info!("initializing store at {} (schema v{})", root.display(), SCHEMA_VERSION);
                for collection in Collection::ALL {
                    write_atomic(&collection_path(&root, collection), b"[]")
                        .await
                        .map_err(|e| {
                            StorageError::Unavailable(format!(
                                "cannot create collection {}: {}",
                                collection, e
                            ))
                        })?;
                }
                let marker = serde_json::to_vec(&SchemaMarker { version: SCHEMA_VERSION })?;
                write_atomic(&schema_path, &marker).await.map_err(|e| {
                    StorageError::Unavailable(format!("cannot write schema marker: {}", e))
                })?;
            }
            Err(e) => {
                return Err(StorageError::Unavailable(format!(
                    "cannot read schema marker: {}",
                    e
                )));
            }
        }

        let mut collections = HashMap::new();
        for collection in Collection::ALL {
            let mut state = CollectionState::new(collection);
            for record in load_collection(&root, collection).await? {
                state.index_insert(&record);
                state.records.insert(record.id.clone(), record);
            }
            collections.insert(collection, Mutex::new(state));
        }

        Ok(Self { root, collections })
    }

    /// Insert or overwrite by id. Overwriting is the intended update path
    /// and never an error; [`StorageError::Conflict`] is returned only when
    /// the backing medium refuses the write.
    pub async fn put(&self, collection: Collection, record: Record) -> StorageResult<()> {
        let mut state = self.state(collection).lock().await;

        let previous = state.records.remove(&record.id);
        if let Some(old) = &previous {
            state.index_remove(old);
        }
        state.index_insert(&record);
        state.records.insert(record.id.clone(), record.clone());

        if let Err(e) = self.persist(&state).await {
            // Roll the in-memory state back so a failed write leaves the
            // collection exactly as it was.
            state.index_remove(&record);
            state.records.remove(&record.id);
            if let Some(old) = previous {
                state.index_insert(&old);
                state.records.insert(old.id.clone(), old);
            }
            return Err(StorageError::Conflict(format!(
                "write to {} failed: {}",
                collection, e
            )));
        }
        Ok(())
    }

    /// Fetch a record by id. Absence is `None`, not an error.
    pub async fn get(&self, collection: Collection, id: &str) -> Option<Record> {
        self.state(collection).lock().await.records.get(id).cloned()
    }

    /// All records in the collection, unordered. Callers sort as needed.
    pub async fn list(&self, collection: Collection) -> Vec<Record> {
        self.state(collection).lock().await.records.values().cloned().collect()
    }

    /// Secondary lookup by a non-unique field. Indexed fields resolve
    /// through the index; other fields fall back to a scan.
    pub async fn find_by(&self, collection: Collection, field: &str, value: &Value) -> Vec<Record> {
        let state = self.state(collection).lock().await;
        if let Some(index) = state.indexes.get(field) {
            let key = Record::index_key(value);
            index
                .get(&key)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| state.records.get(id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        } else {
            state
                .records
                .values()
                .filter(|record| record.field(field) == Some(value))
                .cloned()
                .collect()
        }
    }

    /// Delete by id. A no-op if the record is absent.
    pub async fn remove(&self, collection: Collection, id: &str) -> StorageResult<()> {
        let mut state = self.state(collection).lock().await;

        let removed = match state.records.remove(id) {
            Some(record) => record,
            None => return Ok(()),
        };
        state.index_remove(&removed);

        if let Err(e) = self.persist(&state).await {
            state.index_insert(&removed);
            state.records.insert(removed.id.clone(), removed);
            return Err(StorageError::Conflict(format!(
                "delete from {} failed: {}",
                collection, e
            )));
        }
        Ok(())
    }

    fn state(&self, collection: Collection) -> &Mutex<CollectionState> {
        // All three collections are created at open, so the lookup cannot miss.
        &self.collections[&collection]
    }

    async fn persist(&self, state: &CollectionState) -> std::io::Result<()> {
        let records: Vec<&Record> = state.records.values().collect();
        let bytes = serde_json::to_vec_pretty(&records)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        write_atomic(&collection_path(&self.root, state.collection), &bytes).await
    }
}

fn collection_path(root: &Path, collection: Collection) -> PathBuf {
    root.join(format!("{}.json", collection.name()))
}

async fn load_collection(root: &Path, collection: Collection) -> StorageResult<Vec<Record>> {
    let path = collection_path(root, collection);
    match tokio::fs::read(&path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Unavailable(format!("corrupt collection {}: {}", collection, e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(StorageError::Unavailable(format!(
            "cannot read collection {}: {}",
            collection, e
        ))),
    }
}

/// Write the full payload to a temp file, then rename it into place, so a
/// reader never observes a partial write.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}
