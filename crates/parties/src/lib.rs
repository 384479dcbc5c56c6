//! Parties domain module (customers and suppliers).
//!
//! Suppliers and customers share one shape and one collection; the `kind`
//! field decides which API surface a party belongs to.

pub mod party;

pub use party::{ContactInfo, Party, PartyKind, RegisterParty, UpdateDetails};
