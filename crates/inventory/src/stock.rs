use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Aggregate, DomainError, Entity, Event, ProductId};

/// Aggregate root: the stock ledger row of one product.
///
/// Invariants, checked by `handle` and kept by `apply`:
/// - `quantity >= 0`
/// - `0 <= free_to_use <= quantity`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    product_id: ProductId,
    quantity: i64,
    free_to_use: i64,
    updated_at: Option<DateTime<Utc>>,
}

impl Stock {
    /// A zero row for a product that has never been stocked.
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            quantity: 0,
            free_to_use: 0,
            updated_at: None,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn free_to_use(&self) -> i64 {
        self.free_to_use
    }

    /// Quantity on hand that is not free to use.
    pub fn reserved(&self) -> i64 {
        self.quantity - self.free_to_use
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn clamp_free(&mut self) {
        self.free_to_use = self.free_to_use.clamp(0, self.quantity.max(0));
    }
}

impl Entity for Stock {
    type Id = ProductId;
    const COLLECTION: &'static str = "stock";

    fn id(&self) -> Self::Id {
        self.product_id
    }
}

/// Command: ReceiveStock (goods in).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: IssueStock (goods out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStock {
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock (signed correction from a physical count).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetStockLevels (manual upsert).
///
/// When `free_to_use` is omitted the reserved part of the stock is kept
/// and the free quantity follows the new total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStockLevels {
    pub product_id: ProductId,
    pub quantity: Option<i64>,
    pub free_to_use: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    Receive(ReceiveStock),
    Issue(IssueStock),
    Adjust(AdjustStock),
    SetLevels(SetStockLevels),
}

/// Event: StockReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIssued {
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub product_id: ProductId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockLevelsSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevelsSet {
    pub product_id: ProductId,
    pub previous_quantity: i64,
    pub quantity: i64,
    pub free_to_use: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    StockReceived(StockReceived),
    StockIssued(StockIssued),
    StockAdjusted(StockAdjusted),
    StockLevelsSet(StockLevelsSet),
}

impl StockEvent {
    pub fn product_id(&self) -> ProductId {
        match self {
            StockEvent::StockReceived(e) => e.product_id,
            StockEvent::StockIssued(e) => e.product_id,
            StockEvent::StockAdjusted(e) => e.product_id,
            StockEvent::StockLevelsSet(e) => e.product_id,
        }
    }

    /// Signed change of the on-hand quantity (positive = into stock).
    pub fn quantity_delta(&self) -> i64 {
        match self {
            StockEvent::StockReceived(e) => e.quantity,
            StockEvent::StockIssued(e) => -e.quantity,
            StockEvent::StockAdjusted(e) => e.delta,
            StockEvent::StockLevelsSet(e) => e.quantity - e.previous_quantity,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::StockReceived(_) => "inventory.stock.received",
            StockEvent::StockIssued(_) => "inventory.stock.issued",
            StockEvent::StockAdjusted(_) => "inventory.stock.adjusted",
            StockEvent::StockLevelsSet(_) => "inventory.stock.levels_set",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::StockReceived(e) => e.occurred_at,
            StockEvent::StockIssued(e) => e.occurred_at,
            StockEvent::StockAdjusted(e) => e.occurred_at,
            StockEvent::StockLevelsSet(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Stock {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::StockReceived(e) => {
                self.quantity += e.quantity;
                self.free_to_use += e.quantity;
            }
            StockEvent::StockIssued(e) => {
                self.quantity -= e.quantity;
                self.free_to_use = (self.free_to_use - e.quantity).max(0);
            }
            StockEvent::StockAdjusted(e) => {
                self.quantity += e.delta;
                self.free_to_use += e.delta;
            }
            StockEvent::StockLevelsSet(e) => {
                self.quantity = e.quantity;
                self.free_to_use = e.free_to_use;
            }
        }
        self.clamp_free();
        self.updated_at = Some(event.occurred_at());
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::Receive(cmd) => self.handle_receive(cmd),
            StockCommand::Issue(cmd) => self.handle_issue(cmd),
            StockCommand::Adjust(cmd) => self.handle_adjust(cmd),
            StockCommand::SetLevels(cmd) => self.handle_set_levels(cmd),
        }
    }
}

impl Stock {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.product_id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_positive(quantity: i64) -> Result<(), DomainError> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }

    fn handle_receive(&self, cmd: &ReceiveStock) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_product_id(cmd.product_id)?;
        Self::ensure_positive(cmd.quantity)?;
        if self.quantity.checked_add(cmd.quantity).is_none() {
            return Err(DomainError::invariant("stock quantity overflow"));
        }

        Ok(vec![StockEvent::StockReceived(StockReceived {
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_issue(&self, cmd: &IssueStock) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_product_id(cmd.product_id)?;
        Self::ensure_positive(cmd.quantity)?;
        if self.quantity < cmd.quantity {
            return Err(DomainError::insufficient_stock(
                self.product_id,
                cmd.quantity,
                self.quantity,
            ));
        }

        Ok(vec![StockEvent::StockIssued(StockIssued {
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_product_id(cmd.product_id)?;

        // A count that matches the books moves nothing.
        if cmd.delta == 0 {
            return Ok(Vec::new());
        }

        match self.quantity.checked_add(cmd.delta) {
            Some(after) if after >= 0 => {}
            _ => {
                return Err(DomainError::invariant(format!(
                    "stock cannot go negative (on hand {}, change {})",
                    self.quantity, cmd.delta
                )));
            }
        }

        Ok(vec![StockEvent::StockAdjusted(StockAdjusted {
            product_id: cmd.product_id,
            delta: cmd.delta,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_levels(&self, cmd: &SetStockLevels) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_product_id(cmd.product_id)?;
        if cmd.quantity.is_none() && cmd.free_to_use.is_none() {
            return Err(DomainError::validation("quantity or free_to_use is required"));
        }

        let quantity = cmd.quantity.unwrap_or(self.quantity);
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }

        let free_to_use = match cmd.free_to_use {
            Some(free) if free < 0 || free > quantity => {
                return Err(DomainError::validation(format!(
                    "free_to_use must be between 0 and {quantity}"
                )));
            }
            Some(free) => free,
            None => (quantity - self.reserved()).clamp(0, quantity),
        };

        if quantity == self.quantity && free_to_use == self.free_to_use {
            return Ok(Vec::new());
        }

        Ok(vec![StockEvent::StockLevelsSet(StockLevelsSet {
            product_id: cmd.product_id,
            previous_quantity: self.quantity,
            quantity,
            free_to_use,
            occurred_at: cmd.occurred_at,
        })])
    }
}
