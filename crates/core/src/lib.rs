//! `stockroom-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, require_text};
pub use event::Event;
pub use id::{
    AdjustmentId, CategoryId, DeliveryId, LineId, LocationId, OtpId, PartyId, ProductId,
    ReceiptId, StockMoveId, UnitId, UserId,
};
pub use value_object::ValueObject;
