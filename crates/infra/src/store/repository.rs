//! Typed access to the document store.
//!
//! Domain types stay unaware of storage: they are plain serde structs that
//! implement [`Entity`]. This module adds what the store needs on top of
//! that (a human label for errors and an optional unique key) and does the
//! JSON conversion in one place.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use stockroom_auth::{Otp, User};
use stockroom_catalog::{Category, Product, UnitOfMeasure};
use stockroom_core::{Entity, ExpectedVersion};
use stockroom_inventory::{Location, Stock, StockMove};
use stockroom_operations::{Adjustment, Delivery, Receipt};
use stockroom_parties::Party;

use super::r#trait::{DocumentStore, RawDocument, StoreError, WriteBatch, WriteOp};

/// A domain type that is persisted as a document.
pub trait Document: Entity + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Singular name used in "not found" messages.
    const LABEL: &'static str;

    /// Key that must be unique within the collection, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

impl Document for User {
    const LABEL: &'static str = "user";

    fn unique_key(&self) -> Option<String> {
        Some(self.email().to_string())
    }
}

impl Document for Otp {
    const LABEL: &'static str = "code";
}

impl Document for Category {
    const LABEL: &'static str = "category";
}

impl Document for UnitOfMeasure {
    const LABEL: &'static str = "unit of measure";

    fn unique_key(&self) -> Option<String> {
        Some(self.name().to_lowercase())
    }
}

impl Document for Product {
    const LABEL: &'static str = "product";

    fn unique_key(&self) -> Option<String> {
        Some(self.sku().to_lowercase())
    }
}

impl Document for Party {
    const LABEL: &'static str = "party";
}

impl Document for Location {
    const LABEL: &'static str = "location";
}

impl Document for Stock {
    const LABEL: &'static str = "stock";
}

impl Document for StockMove {
    const LABEL: &'static str = "stock move";
}

impl Document for Receipt {
    const LABEL: &'static str = "receipt";
}

impl Document for Delivery {
    const LABEL: &'static str = "delivery";
}

impl Document for Adjustment {
    const LABEL: &'static str = "adjustment";
}

/// A decoded document together with its store version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Expectation that holds only while nobody else wrote the document.
    pub fn expected(&self) -> ExpectedVersion {
        ExpectedVersion::Exact(self.version)
    }
}

fn encode<T: Document>(doc: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(doc)
        .map_err(|e| StoreError::Serialization(format!("{}: {e}", T::COLLECTION)))
}

fn decode<T: Document>(raw: RawDocument) -> Result<Versioned<T>, StoreError> {
    let value = serde_json::from_value(raw.body).map_err(|e| {
        StoreError::Serialization(format!("{}/{}: {e}", raw.collection, raw.id))
    })?;
    Ok(Versioned {
        version: raw.version,
        value,
    })
}

impl WriteBatch {
    pub fn insert<T: Document>(&mut self, doc: &T) -> Result<&mut Self, StoreError> {
        self.push(WriteOp::Insert {
            collection: T::COLLECTION,
            id: doc.id().into(),
            unique_key: doc.unique_key(),
            body: encode(doc)?,
        });
        Ok(self)
    }

    pub fn update<T: Document>(
        &mut self,
        doc: &T,
        expected: ExpectedVersion,
    ) -> Result<&mut Self, StoreError> {
        self.push(WriteOp::Update {
            collection: T::COLLECTION,
            id: doc.id().into(),
            expected,
            unique_key: doc.unique_key(),
            body: encode(doc)?,
        });
        Ok(self)
    }

    /// Insert when `version` is `None`, otherwise update at that version.
    pub fn upsert<T: Document>(&mut self, doc: &T, version: Option<u64>) -> Result<&mut Self, StoreError> {
        match version {
            None => self.insert(doc),
            Some(v) => self.update(doc, ExpectedVersion::Exact(v)),
        }
    }

    pub fn delete<T: Document>(&mut self, id: T::Id, expected: ExpectedVersion) -> &mut Self {
        self.push(WriteOp::Delete {
            collection: T::COLLECTION,
            id: id.into(),
            expected,
        });
        self
    }
}

/// Typed, cloneable handle on a [`DocumentStore`].
#[derive(Clone)]
pub struct Documents {
    store: Arc<dyn DocumentStore>,
}

impl core::fmt::Debug for Documents {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Documents").finish_non_exhaustive()
    }
}

impl Documents {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get<T: Document>(&self, id: T::Id) -> Result<Option<Versioned<T>>, StoreError> {
        let id: Uuid = id.into();
        match self.store.fetch(T::COLLECTION, id).await? {
            Some(raw) => decode(raw).map(Some),
            None => Ok(None),
        }
    }

    /// All documents of a type, newest first.
    pub async fn list<T: Document>(&self) -> Result<Vec<Versioned<T>>, StoreError> {
        let mut docs = self
            .store
            .fetch_all(T::COLLECTION)
            .await?
            .into_iter()
            .map(decode::<T>)
            .collect::<Result<Vec<_>, _>>()?;
        docs.reverse();
        Ok(docs)
    }

    pub async fn find_unique<T: Document>(&self, key: &str) -> Result<Option<Versioned<T>>, StoreError> {
        match self.store.find_unique(T::COLLECTION, key).await? {
            Some(raw) => decode(raw).map(Some),
            None => Ok(None),
        }
    }

    pub async fn exists<T: Document>(&self, id: T::Id) -> Result<bool, StoreError> {
        Ok(self.store.fetch(T::COLLECTION, id.into()).await?.is_some())
    }

    pub async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.store.commit(batch).await
    }

    pub async fn insert<T: Document>(&self, doc: &T) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.insert(doc)?;
        self.commit(batch).await
    }

    pub async fn next_sequence(&self, name: &str) -> Result<u64, StoreError> {
        self.store.next_sequence(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockroom_catalog::CategoryDetails;
    use stockroom_core::CategoryId;

    use crate::store::InMemoryDocumentStore;

    fn docs() -> Documents {
        Documents::new(Arc::new(InMemoryDocumentStore::new()))
    }

    fn category(name: &str) -> Category {
        Category::create(
            CategoryId::new(),
            CategoryDetails {
                name: Some(name.to_string()),
                description: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn typed_round_trip_keeps_version() {
        let docs = docs();
        let tools = category("Tools");
        docs.insert(&tools).await.unwrap();

        let loaded = docs.get::<Category>(tools.id()).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.value, tools);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let docs = docs();
        let first = category("First");
        let second = category("Second");
        docs.insert(&first).await.unwrap();
        docs.insert(&second).await.unwrap();

        let names: Vec<String> = docs
            .list::<Category>()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.value.name().to_string())
            .collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn upsert_picks_insert_or_versioned_update() {
        let docs = docs();
        let mut tools = category("Tools");

        let mut batch = WriteBatch::new();
        batch.upsert(&tools, None).unwrap();
        docs.commit(batch).await.unwrap();

        tools
            .update(
                CategoryDetails {
                    name: Some("Hand tools".to_string()),
                    description: None,
                },
                Utc::now(),
            )
            .unwrap();
        let mut batch = WriteBatch::new();
        batch.upsert(&tools, Some(1)).unwrap();
        docs.commit(batch).await.unwrap();

        let loaded = docs.get::<Category>(tools.id()).await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.value.name(), "Hand tools");
    }
}
