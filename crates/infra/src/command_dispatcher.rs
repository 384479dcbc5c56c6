//! Command execution pipeline (application-level orchestration).
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the document and its version
//!   ↓
//! 2. Decide (pure domain code, may reject)
//!   ↓
//! 3. Commit with ExpectedVersion::Exact(version)
//!   ↓
//! 4. On a concurrency failure, go back to 1 (bounded)
//! ```
//!
//! Domain code never sees the store; the dispatcher never makes decisions.

use thiserror::Error;

use stockroom_core::{Aggregate, DomainError, DomainResult, Event};
use stockroom_operations::document_number;

use crate::store::{Document, Documents, StoreError, Versioned, WriteBatch};

/// How many times a read-decide-commit cycle runs before giving up.
pub const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DispatchError {
    pub fn is_concurrency(&self) -> bool {
        matches!(self, DispatchError::Store(StoreError::Concurrency(_)))
    }
}

/// Whether a failed commit should be retried.
pub(crate) fn should_retry(err: &StoreError, attempt: u32, max_attempts: u32) -> bool {
    matches!(err, StoreError::Concurrency(_)) && attempt < max_attempts
}

/// Reusable command execution engine for stored documents.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    docs: Documents,
    max_attempts: u32,
}

impl CommandDispatcher {
    pub fn new(docs: Documents) -> Self {
        Self {
            docs,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn documents(&self) -> &Documents {
        &self.docs
    }

    /// Load a document or fail with a `NotFound` domain error.
    pub async fn load<T: Document>(&self, id: T::Id) -> Result<Versioned<T>, DispatchError> {
        self.docs
            .get::<T>(id)
            .await?
            .ok_or_else(|| DomainError::not_found(T::LABEL).into())
    }

    /// Persist a freshly created document.
    pub async fn create<T: Document>(&self, doc: T) -> Result<Versioned<T>, DispatchError> {
        self.docs.insert(&doc).await?;
        tracing::info!(collection = T::COLLECTION, id = %doc.id(), "document created");
        Ok(Versioned {
            version: 1,
            value: doc,
        })
    }

    /// Allocate the next number of a document series, e.g. `WH/IN/0003`.
    pub async fn next_number(&self, series: &str) -> Result<String, DispatchError> {
        let sequence = self.docs.next_sequence(series).await?;
        Ok(document_number(series, sequence))
    }

    /// Read, mutate with `change`, and commit; retried on concurrent writes.
    pub async fn modify<T, R, F>(&self, id: T::Id, mut change: F) -> Result<(Versioned<T>, R), DispatchError>
    where
        T: Document,
        F: FnMut(&mut T) -> DomainResult<R>,
    {
        let mut attempt = 1;
        loop {
            let current = self.load::<T>(id).await?;
            let mut doc = current.value.clone();
            let output = change(&mut doc)?;

            let mut batch = WriteBatch::new();
            batch.update(&doc, current.expected())?;
            match self.docs.commit(batch).await {
                Ok(()) => {
                    let updated = Versioned {
                        version: current.version + 1,
                        value: doc,
                    };
                    return Ok((updated, output));
                }
                Err(e) if should_retry(&e, attempt, self.max_attempts) => {
                    tracing::debug!(collection = T::COLLECTION, %id, attempt, "retrying after concurrent write: {e}");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Run an aggregate command through the pipeline.
    pub async fn dispatch<A>(&self, id: A::Id, command: A::Command) -> Result<Versioned<A>, DispatchError>
    where
        A: Aggregate<Error = DomainError> + Document,
        A::Event: Event,
    {
        let (doc, events) = self.modify::<A, _, _>(id, |aggregate| aggregate.execute(&command)).await?;
        for event in &events {
            tracing::info!(collection = A::COLLECTION, %id, event_type = event.event_type(), "command applied");
        }
        Ok(doc)
    }

    /// Delete a document after `guard` accepted its current state.
    pub async fn delete<T, F>(&self, id: T::Id, guard: F) -> Result<T, DispatchError>
    where
        T: Document,
        F: Fn(&T) -> DomainResult<()>,
    {
        let mut attempt = 1;
        loop {
            let current = self.load::<T>(id).await?;
            guard(&current.value)?;

            let mut batch = WriteBatch::new();
            batch.delete::<T>(id, current.expected());
            match self.docs.commit(batch).await {
                Ok(()) => {
                    tracing::info!(collection = T::COLLECTION, %id, "document deleted");
                    return Ok(current.value);
                }
                Err(e) if should_retry(&e, attempt, self.max_attempts) => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use stockroom_catalog::{Category, CategoryDetails};
    use stockroom_core::{CategoryId, Entity, LineId, PartyId, ProductId, ReceiptId, UserId};
    use stockroom_operations::{AddLine, CreateReceipt, Receipt, ReceiptCommand, RECEIPT_SERIES};

    use super::*;
    use crate::store::InMemoryDocumentStore;

    fn dispatcher() -> CommandDispatcher {
        CommandDispatcher::new(Documents::new(Arc::new(InMemoryDocumentStore::new())))
    }

    fn details(name: &str) -> CategoryDetails {
        CategoryDetails {
            name: Some(name.to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn modify_commits_and_bumps_version() {
        let d = dispatcher();
        let created = d
            .create(Category::create(CategoryId::new(), details("Tools"), Utc::now()).unwrap())
            .await
            .unwrap();

        let (updated, ()) = d
            .modify::<Category, _, _>(created.value.id(), |c| c.update(details("Hardware"), Utc::now()))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.value.name(), "Hardware");
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let d = dispatcher();
        let err = d
            .modify::<Category, _, _>(CategoryId::new(), |_| Ok(()))
            .await
            .unwrap_err();
        match err {
            DispatchError::Domain(DomainError::NotFound(what)) => assert_eq!(what, "category"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_commands_write_nothing() {
        let d = dispatcher();
        let created = d
            .create(Category::create(CategoryId::new(), details("Tools"), Utc::now()).unwrap())
            .await
            .unwrap();

        let err = d
            .modify::<Category, _, _>(created.value.id(), |c| c.update(details("   "), Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Domain(DomainError::Validation(_))));

        let stored = d.load::<Category>(created.value.id()).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.value.name(), "Tools");
    }

    #[tokio::test]
    async fn dispatch_runs_aggregate_commands() {
        let d = dispatcher();
        let number = d.next_number(RECEIPT_SERIES).await.unwrap();
        assert_eq!(number, "WH/IN/0001");

        let receipt = Receipt::create(CreateReceipt {
            receipt_id: ReceiptId::new(),
            number,
            supplier_id: PartyId::new(),
            location_id: None,
            scheduled_date: None,
            notes: None,
            created_by: UserId::new(),
            occurred_at: Utc::now(),
        });
        let id = receipt.id();
        d.create(receipt).await.unwrap();

        let updated = d
            .dispatch::<Receipt>(
                id,
                ReceiptCommand::AddLine(AddLine {
                    line_id: LineId::new(),
                    product_id: ProductId::new(),
                    quantity: 4,
                    unit_price: None,
                    occurred_at: Utc::now(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.value.lines().len(), 1);
    }

    #[tokio::test]
    async fn delete_respects_the_guard() {
        let d = dispatcher();
        let created = d
            .create(Category::create(CategoryId::new(), details("Tools"), Utc::now()).unwrap())
            .await
            .unwrap();
        let id = created.value.id();

        let err = d
            .delete::<Category, _>(id, |_| Err(DomainError::validation("in use")))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Domain(_)));

        d.delete::<Category, _>(id, |_| Ok(())).await.unwrap();
        assert!(d.documents().get::<Category>(id).await.unwrap().is_none());
    }
}
