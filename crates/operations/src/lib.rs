//! Operations domain module: receipts, deliveries and inventory adjustments.
//!
//! Documents are aggregates with a guarded status lifecycle. Validating a
//! document produces a [`Settlement`]: the completed document together with
//! every stock row and stock move it touches, decided in one pure step so
//! the store can commit it atomically.

pub mod adjustment;
pub mod delivery;
pub mod line;
pub mod receipt;
pub mod settlement;
pub mod status;

pub use adjustment::{
    Adjustment, AdjustmentCommand, AdjustmentEvent, AdjustmentReason, CreateAdjustment,
    UpdateAdjustment, ValidateAdjustment,
};
pub use delivery::{CreateDelivery, Delivery, DeliveryCommand, DeliveryEvent, UpdateDelivery};
pub use line::{AddLine, LineItem, RemoveLine, UpdateLine};
pub use receipt::{CreateReceipt, Receipt, ReceiptCommand, ReceiptEvent, UpdateReceipt};
pub use settlement::{Settle, Settlement, StockBook};
pub use status::{ChangeStatus, Complete, DocumentStatus};

/// Format a document number such as `WH/IN/0007` from a series prefix and a
/// sequence value.
pub fn document_number(prefix: &str, sequence: u64) -> String {
    format!("{prefix}/{sequence:04}")
}

/// Number series prefix of receipts.
pub const RECEIPT_SERIES: &str = "WH/IN";
/// Number series prefix of deliveries.
pub const DELIVERY_SERIES: &str = "WH/OUT";
/// Number series prefix of adjustments.
pub const ADJUSTMENT_SERIES: &str = "ADJ";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_zero_padded() {
        assert_eq!(document_number(RECEIPT_SERIES, 1), "WH/IN/0001");
        assert_eq!(document_number(ADJUSTMENT_SERIES, 12345), "ADJ/12345");
    }
}
