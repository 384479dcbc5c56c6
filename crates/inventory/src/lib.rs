//! Inventory domain module: the per-product stock ledger, its audit trail and
//! warehouse locations.
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod location;
pub mod stock;
pub mod stock_move;

pub use location::{Location, LocationDetails};
pub use stock::{
    AdjustStock, IssueStock, ReceiveStock, SetStockLevels, Stock, StockAdjusted, StockCommand,
    StockEvent, StockIssued, StockLevelsSet, StockReceived,
};
pub use stock_move::{DocumentRef, MoveContext, MovementType, StockMove};
