use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::r#trait::{DocumentStore, RawDocument, StoreError, WriteBatch, WriteOp};

type DocKey = (String, Uuid);

#[derive(Debug, Clone)]
struct Entry {
    version: u64,
    unique_key: Option<String>,
    body: JsonValue,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    docs: BTreeMap<DocKey, Entry>,
    sequences: HashMap<String, u64>,
}

impl State {
    fn unique_holder(&self, collection: &str, key: &str) -> Option<Uuid> {
        self.docs
            .iter()
            .find(|((c, _), e)| c == collection && e.unique_key.as_deref() == Some(key))
            .map(|((_, id), _)| *id)
    }

    fn ensure_unique(&self, collection: &str, id: Uuid, key: Option<&str>) -> Result<(), StoreError> {
        if let Some(key) = key {
            if let Some(holder) = self.unique_holder(collection, key) {
                if holder != id {
                    return Err(StoreError::Duplicate(format!("{collection}: '{key}' already exists")));
                }
            }
        }
        Ok(())
    }

    /// Apply one op, recording the previous entry so the batch can be undone.
    fn apply(
        &mut self,
        op: WriteOp,
        now: DateTime<Utc>,
        undo: &mut Vec<(DocKey, Option<Entry>)>,
    ) -> Result<(), StoreError> {
        match op {
            WriteOp::Insert {
                collection,
                id,
                unique_key,
                body,
            } => {
                let key = (collection.to_string(), id);
                if self.docs.contains_key(&key) {
                    return Err(StoreError::Concurrency(format!("{collection}/{id} already exists")));
                }
                self.ensure_unique(collection, id, unique_key.as_deref())?;
                undo.push((key.clone(), None));
                self.docs.insert(
                    key,
                    Entry {
                        version: 1,
                        unique_key,
                        body,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
            WriteOp::Update {
                collection,
                id,
                expected,
                unique_key,
                body,
            } => {
                let key = (collection.to_string(), id);
                let current = self
                    .docs
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| StoreError::Concurrency(format!("{collection}/{id} no longer exists")))?;
                if !expected.matches(current.version) {
                    return Err(StoreError::Concurrency(format!(
                        "{collection}/{id}: expected {expected:?}, found {}",
                        current.version
                    )));
                }
                self.ensure_unique(collection, id, unique_key.as_deref())?;
                let next = Entry {
                    version: current.version + 1,
                    unique_key,
                    body,
                    created_at: current.created_at,
                    updated_at: now,
                };
                undo.push((key.clone(), Some(current)));
                self.docs.insert(key, next);
            }
            WriteOp::Delete {
                collection,
                id,
                expected,
            } => {
                let key = (collection.to_string(), id);
                let current = self
                    .docs
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| StoreError::Concurrency(format!("{collection}/{id} no longer exists")))?;
                if !expected.matches(current.version) {
                    return Err(StoreError::Concurrency(format!(
                        "{collection}/{id}: expected {expected:?}, found {}",
                        current.version
                    )));
                }
                self.docs.remove(&key);
                undo.push((key, Some(current)));
            }
        }
        Ok(())
    }

    fn rollback(&mut self, undo: Vec<(DocKey, Option<Entry>)>) {
        for (key, previous) in undo.into_iter().rev() {
            match previous {
                Some(entry) => {
                    self.docs.insert(key, entry);
                }
                None => {
                    self.docs.remove(&key);
                }
            }
        }
    }
}

fn to_raw(key: &DocKey, entry: &Entry) -> RawDocument {
    RawDocument {
        collection: key.0.clone(),
        id: key.1,
        version: entry.version,
        unique_key: entry.unique_key.clone(),
        body: entry.body.clone(),
        created_at: entry.created_at,
        updated_at: entry.updated_at,
    }
}

/// In-memory document store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    state: RwLock<State>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn fetch(&self, collection: &str, id: Uuid) -> Result<Option<RawDocument>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let key = (collection.to_string(), id);
        Ok(state.docs.get(&key).map(|e| to_raw(&key, e)))
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<RawDocument>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .docs
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|(k, e)| to_raw(k, e))
            .collect())
    }

    async fn find_unique(
        &self,
        collection: &str,
        unique_key: &str,
    ) -> Result<Option<RawDocument>, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let Some(id) = state.unique_holder(collection, unique_key) else {
            return Ok(None);
        };
        let key = (collection.to_string(), id);
        Ok(state.docs.get(&key).map(|e| to_raw(&key, e)))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().map_err(|_| poisoned())?;
        let now = Utc::now();
        let mut undo = Vec::with_capacity(batch.len());
        for op in batch.into_ops() {
            if let Err(e) = state.apply(op, now, &mut undo) {
                state.rollback(undo);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn next_sequence(&self, name: &str) -> Result<u64, StoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let value = state.sequences.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}
