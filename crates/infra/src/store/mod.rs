//! Versioned document store boundary.
//!
//! Every persisted record is a JSON document in a named collection. Writes
//! go through [`WriteBatch`]es that commit atomically, with optimistic
//! version checks per document.

pub mod in_memory;
pub mod postgres;
pub mod repository;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use r#trait::{DocumentStore, RawDocument, StoreError, WriteBatch, WriteOp};
pub use repository::{Document, Documents, Versioned};
