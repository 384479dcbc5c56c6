use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use stockroom_core::ExpectedVersion;
use std::sync::Arc;

/// A stored document as the backend sees it: an opaque JSON body plus the
/// bookkeeping the store maintains.
///
/// `version` starts at 1 on insert and grows by one on every update. It is
/// the token callers hand back as `ExpectedVersion::Exact` to detect
/// concurrent writers.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub collection: String,
    pub id: Uuid,
    pub version: u64,
    pub unique_key: Option<String>,
    pub body: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create a document. Fails with `Concurrency` if the id is taken and
    /// with `Duplicate` if `unique_key` is taken within the collection.
    Insert {
        collection: &'static str,
        id: Uuid,
        unique_key: Option<String>,
        body: JsonValue,
    },
    /// Replace the body of an existing document.
    Update {
        collection: &'static str,
        id: Uuid,
        expected: ExpectedVersion,
        unique_key: Option<String>,
        body: JsonValue,
    },
    /// Remove an existing document.
    Delete {
        collection: &'static str,
        id: Uuid,
        expected: ExpectedVersion,
    },
}

impl WriteOp {
    pub fn collection(&self) -> &'static str {
        match self {
            WriteOp::Insert { collection, .. }
            | WriteOp::Update { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            WriteOp::Insert { id, .. } | WriteOp::Update { id, .. } | WriteOp::Delete { id, .. } => *id,
        }
    }
}

/// Writes that commit together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Store operation error.
///
/// These are infrastructure errors as opposed to domain errors
/// (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A version check failed, or an insert hit an existing id. The whole
    /// batch was rejected; re-read and decide again.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// A unique key is already held by another document.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("document serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Versioned JSON document store.
///
/// Implementations must:
/// - apply every op of a batch atomically (all or nothing)
/// - check expected versions and unique keys against the state the batch
///   sees, including earlier ops of the same batch
/// - hand out strictly increasing values per sequence name
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, collection: &str, id: Uuid) -> Result<Option<RawDocument>, StoreError>;

    /// Every document of a collection, in ascending id order.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RawDocument>, StoreError>;

    async fn find_unique(
        &self,
        collection: &str,
        unique_key: &str,
    ) -> Result<Option<RawDocument>, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Next value of a named counter, starting at 1.
    async fn next_sequence(&self, name: &str) -> Result<u64, StoreError>;
}

#[async_trait::async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn fetch(&self, collection: &str, id: Uuid) -> Result<Option<RawDocument>, StoreError> {
        (**self).fetch(collection, id).await
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<RawDocument>, StoreError> {
        (**self).fetch_all(collection).await
    }

    async fn find_unique(
        &self,
        collection: &str,
        unique_key: &str,
    ) -> Result<Option<RawDocument>, StoreError> {
        (**self).find_unique(collection, unique_key).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch).await
    }

    async fn next_sequence(&self, name: &str) -> Result<u64, StoreError> {
        (**self).next_sequence(name).await
    }
}
