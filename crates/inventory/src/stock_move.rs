use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockroom_core::{Entity, Event, LocationId, ProductId, StockMoveId, UserId};

use crate::stock::StockEvent;

/// What caused a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Receipt,
    Delivery,
    Adjustment,
    /// Direct edits of the stock row and opening balances.
    Manual,
}

/// The document a movement originates from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: Uuid,
    pub number: String,
}

/// Append-only audit row of the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMove {
    id: StockMoveId,
    product_id: ProductId,
    from_location_id: Option<LocationId>,
    to_location_id: Option<LocationId>,
    /// Signed; positive moves goods into stock.
    quantity: i64,
    movement_type: MovementType,
    reference: Option<DocumentRef>,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

/// Where a movement is recorded from, for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveContext {
    pub movement_type: MovementType,
    pub reference: Option<DocumentRef>,
    pub location_id: Option<LocationId>,
    pub actor: UserId,
}

impl StockMove {
    /// Record the movement described by a stock event.
    ///
    /// The context location is the destination of incoming goods and the
    /// source of outgoing ones.
    pub fn record(event: &StockEvent, context: &MoveContext) -> Self {
        let quantity = event.quantity_delta();
        let (from_location_id, to_location_id) = if quantity < 0 {
            (context.location_id, None)
        } else {
            (None, context.location_id)
        };

        Self {
            id: StockMoveId::new(),
            product_id: event.product_id(),
            from_location_id,
            to_location_id,
            quantity,
            movement_type: context.movement_type,
            reference: context.reference.clone(),
            created_by: context.actor,
            created_at: event.occurred_at(),
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn reference(&self) -> Option<&DocumentRef> {
        self.reference.as_ref()
    }

    pub fn from_location_id(&self) -> Option<LocationId> {
        self.from_location_id
    }

    pub fn to_location_id(&self) -> Option<LocationId> {
        self.to_location_id
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for StockMove {
    type Id = StockMoveId;
    const COLLECTION: &'static str = "stock_moves";

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stock::{StockIssued, StockReceived};

    fn context(location_id: Option<LocationId>) -> MoveContext {
        MoveContext {
            movement_type: MovementType::Delivery,
            reference: Some(DocumentRef {
                id: Uuid::now_v7(),
                number: "WH/OUT/0001".to_string(),
            }),
            location_id,
            actor: UserId::new(),
        }
    }

    #[test]
    fn outgoing_moves_leave_the_location() {
        let location = LocationId::new();
        let event = StockEvent::StockIssued(StockIssued {
            product_id: ProductId::new(),
            quantity: 4,
            occurred_at: Utc::now(),
        });

        let movement = StockMove::record(&event, &context(Some(location)));
        assert_eq!(movement.quantity(), -4);
        assert_eq!(movement.from_location_id(), Some(location));
        assert_eq!(movement.to_location_id(), None);
        assert_eq!(movement.reference().map(|r| r.number.as_str()), Some("WH/OUT/0001"));
    }

    #[test]
    fn incoming_moves_enter_the_location() {
        let location = LocationId::new();
        let event = StockEvent::StockReceived(StockReceived {
            product_id: ProductId::new(),
            quantity: 9,
            occurred_at: Utc::now(),
        });

        let movement = StockMove::record(&event, &context(Some(location)));
        assert_eq!(movement.quantity(), 9);
        assert_eq!(movement.to_location_id(), Some(location));
    }
}
