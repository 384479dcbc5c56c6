use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{
    Aggregate, DeliveryId, DomainError, Entity, Event, LineId, LocationId, PartyId, UserId,
};

use crate::line::{self, AddLine, LineItem, RemoveLine, UpdateLine};
use crate::status::{ChangeStatus, Complete, DocumentStatus};

/// Aggregate root: Delivery (outgoing goods to a customer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    id: DeliveryId,
    number: String,
    customer_id: PartyId,
    location_id: Option<LocationId>,
    scheduled_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    status: DocumentStatus,
    lines: Vec<LineItem>,
    created_by: UserId,
    validated_by: Option<UserId>,
    validated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: CreateDelivery. Deliveries always start in Draft without lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDelivery {
    pub delivery_id: DeliveryId,
    pub number: String,
    pub customer_id: PartyId,
    pub location_id: Option<LocationId>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl Delivery {
    pub fn create(cmd: CreateDelivery) -> Self {
        Self {
            id: cmd.delivery_id,
            number: cmd.number,
            customer_id: cmd.customer_id,
            location_id: cmd.location_id,
            scheduled_date: cmd.scheduled_date,
            notes: cmd.notes,
            status: DocumentStatus::Draft,
            lines: Vec::new(),
            created_by: cmd.created_by,
            validated_by: None,
            validated_at: None,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        }
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn customer_id(&self) -> PartyId {
        self.customer_id
    }

    pub fn location_id(&self) -> Option<LocationId> {
        self.location_id
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn validated_by(&self) -> Option<UserId> {
        self.validated_by
    }

    pub fn validated_at(&self) -> Option<DateTime<Utc>> {
        self.validated_at
    }

    /// Shipped deliveries stay on record; cancelled ones may go.
    pub fn ensure_deletable(&self) -> Result<(), DomainError> {
        if self.status == DocumentStatus::Done {
            return Err(DomainError::invariant("cannot delete a completed delivery"));
        }
        Ok(())
    }
}

impl Entity for Delivery {
    type Id = DeliveryId;
    const COLLECTION: &'static str = "deliveries";

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Command: UpdateDelivery. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDelivery {
    pub customer_id: Option<PartyId>,
    pub location_id: Option<LocationId>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryCommand {
    Update(UpdateDelivery),
    AddLine(AddLine),
    UpdateLine(UpdateLine),
    RemoveLine(RemoveLine),
    ChangeStatus(ChangeStatus),
    Complete(Complete),
}

/// Event: DeliveryUpdated (carries the full new header).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryUpdated {
    pub delivery_id: DeliveryId,
    pub customer_id: PartyId,
    pub location_id: Option<LocationId>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryLineAdded / DeliveryLineUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLineChanged {
    pub delivery_id: DeliveryId,
    pub line: LineItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryLineRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLineRemoved {
    pub delivery_id: DeliveryId,
    pub line_id: LineId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatusChanged {
    pub delivery_id: DeliveryId,
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryCompleted (goods left the warehouse).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCompleted {
    pub delivery_id: DeliveryId,
    pub validated_by: UserId,
    pub lines: Vec<LineItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryEvent {
    DeliveryUpdated(DeliveryUpdated),
    DeliveryLineAdded(DeliveryLineChanged),
    DeliveryLineUpdated(DeliveryLineChanged),
    DeliveryLineRemoved(DeliveryLineRemoved),
    DeliveryStatusChanged(DeliveryStatusChanged),
    DeliveryCompleted(DeliveryCompleted),
}

impl Event for DeliveryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DeliveryEvent::DeliveryUpdated(_) => "operations.delivery.updated",
            DeliveryEvent::DeliveryLineAdded(_) => "operations.delivery.line_added",
            DeliveryEvent::DeliveryLineUpdated(_) => "operations.delivery.line_updated",
            DeliveryEvent::DeliveryLineRemoved(_) => "operations.delivery.line_removed",
            DeliveryEvent::DeliveryStatusChanged(_) => "operations.delivery.status_changed",
            DeliveryEvent::DeliveryCompleted(_) => "operations.delivery.completed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DeliveryEvent::DeliveryUpdated(e) => e.occurred_at,
            DeliveryEvent::DeliveryLineAdded(e) => e.occurred_at,
            DeliveryEvent::DeliveryLineUpdated(e) => e.occurred_at,
            DeliveryEvent::DeliveryLineRemoved(e) => e.occurred_at,
            DeliveryEvent::DeliveryStatusChanged(e) => e.occurred_at,
            DeliveryEvent::DeliveryCompleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Delivery {
    type Command = DeliveryCommand;
    type Event = DeliveryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DeliveryEvent::DeliveryUpdated(e) => {
                self.customer_id = e.customer_id;
                self.location_id = e.location_id;
                self.scheduled_date = e.scheduled_date;
                self.notes = e.notes.clone();
            }
            DeliveryEvent::DeliveryLineAdded(e) => self.lines.push(e.line.clone()),
            DeliveryEvent::DeliveryLineUpdated(e) => line::replace(&mut self.lines, &e.line),
            DeliveryEvent::DeliveryLineRemoved(e) => self.lines.retain(|l| l.id != e.line_id),
            DeliveryEvent::DeliveryStatusChanged(e) => self.status = e.to,
            DeliveryEvent::DeliveryCompleted(e) => {
                self.status = DocumentStatus::Done;
                self.validated_by = Some(e.validated_by);
                self.validated_at = Some(e.occurred_at);
            }
        }
        self.updated_at = event.occurred_at();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DeliveryCommand::Update(cmd) => self.handle_update(cmd),
            DeliveryCommand::AddLine(cmd) => self.handle_add_line(cmd),
            DeliveryCommand::UpdateLine(cmd) => self.handle_update_line(cmd),
            DeliveryCommand::RemoveLine(cmd) => self.handle_remove_line(cmd),
            DeliveryCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            DeliveryCommand::Complete(cmd) => self.handle_complete(cmd),
        }
    }
}

impl Delivery {
    fn ensure_has_lines(&self) -> Result<(), DomainError> {
        if self.lines.is_empty() {
            return Err(DomainError::invariant("cannot validate delivery without items"));
        }
        Ok(())
    }

    fn handle_update(&self, cmd: &UpdateDelivery) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.status.ensure_editable("delivery")?;

        Ok(vec![DeliveryEvent::DeliveryUpdated(DeliveryUpdated {
            delivery_id: self.id,
            customer_id: cmd.customer_id.unwrap_or(self.customer_id),
            location_id: cmd.location_id.or(self.location_id),
            scheduled_date: cmd.scheduled_date.or(self.scheduled_date),
            notes: cmd.notes.clone().or_else(|| self.notes.clone()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.status.ensure_editable("delivery")?;
        let line = line::new_line(&self.lines, cmd)?;

        Ok(vec![DeliveryEvent::DeliveryLineAdded(DeliveryLineChanged {
            delivery_id: self.id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_line(&self, cmd: &UpdateLine) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.status.ensure_editable("delivery")?;
        let line = line::patched_line(&self.lines, cmd)?;

        Ok(vec![DeliveryEvent::DeliveryLineUpdated(DeliveryLineChanged {
            delivery_id: self.id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_line(&self, cmd: &RemoveLine) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.status.ensure_editable("delivery")?;
        line::find(&self.lines, cmd.line_id)?;

        Ok(vec![DeliveryEvent::DeliveryLineRemoved(DeliveryLineRemoved {
            delivery_id: self.id,
            line_id: cmd.line_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.status.ensure_transition(cmd.status, "delivery")?;
        self.ensure_has_lines()?;
        if cmd.status == DocumentStatus::Done {
            return Err(DomainError::invariant(
                "completing a delivery must go through stock validation",
            ));
        }

        Ok(vec![DeliveryEvent::DeliveryStatusChanged(DeliveryStatusChanged {
            delivery_id: self.id,
            from: self.status,
            to: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &Complete) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.status.ensure_transition(DocumentStatus::Done, "delivery")?;
        self.ensure_has_lines()?;

        Ok(vec![DeliveryEvent::DeliveryCompleted(DeliveryCompleted {
            delivery_id: self.id,
            validated_by: cmd.validated_by,
            lines: self.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::ProductId;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn draft() -> Delivery {
        Delivery::create(CreateDelivery {
            delivery_id: DeliveryId::new(),
            number: "WH/OUT/0001".to_string(),
            customer_id: PartyId::new(),
            location_id: None,
            scheduled_date: None,
            notes: Some("leave at the loading dock".to_string()),
            created_by: UserId::new(),
            occurred_at: test_time(),
        })
    }

    fn add_line(delivery: &mut Delivery, quantity: i64) -> LineId {
        let line_id = LineId::new();
        delivery
            .execute(&DeliveryCommand::AddLine(AddLine {
                line_id,
                product_id: ProductId::new(),
                quantity,
                unit_price: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        line_id
    }

    fn complete(delivery: &mut Delivery) -> Result<Vec<DeliveryEvent>, DomainError> {
        delivery.execute(&DeliveryCommand::Complete(Complete {
            validated_by: UserId::new(),
            occurred_at: test_time(),
        }))
    }

    #[test]
    fn new_deliveries_are_empty_drafts() {
        let delivery = draft();
        assert_eq!(delivery.status(), DocumentStatus::Draft);
        assert!(delivery.lines().is_empty());
        assert_eq!(delivery.number(), "WH/OUT/0001");
    }

    #[test]
    fn add_line_rejects_non_positive_quantity() {
        let delivery = draft();
        let err = delivery
            .handle(&DeliveryCommand::AddLine(AddLine {
                line_id: LineId::new(),
                product_id: ProductId::new(),
                quantity: 0,
                unit_price: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn complete_requires_items() {
        let mut delivery = draft();
        match complete(&mut delivery).unwrap_err() {
            DomainError::InvariantViolation(msg) if msg.contains("without items") => {}
            _ => panic!("Expected invariant violation for empty delivery"),
        }
    }

    #[test]
    fn complete_stamps_validation_and_freezes_the_delivery() {
        let mut delivery = draft();
        let line_id = add_line(&mut delivery, 10);
        complete(&mut delivery).unwrap();

        assert_eq!(delivery.status(), DocumentStatus::Done);
        assert!(delivery.validated_by().is_some());
        assert!(delivery.validated_at().is_some());

        match complete(&mut delivery).unwrap_err() {
            DomainError::InvariantViolation(msg) if msg.contains("already completed") => {}
            _ => panic!("Expected second validation to be rejected"),
        }

        let edit = delivery.handle(&DeliveryCommand::RemoveLine(RemoveLine {
            line_id,
            occurred_at: test_time(),
        }));
        match edit.unwrap_err() {
            DomainError::InvariantViolation(msg) if msg.contains("cannot edit a completed delivery") => {}
            _ => panic!("Expected completed delivery to be immutable"),
        }
        assert!(delivery.ensure_deletable().is_err());
    }

    #[test]
    fn change_status_cannot_complete() {
        let mut delivery = draft();
        add_line(&mut delivery, 1);
        let err = delivery
            .handle(&DeliveryCommand::ChangeStatus(ChangeStatus {
                status: DocumentStatus::Done,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn cancelled_deliveries_can_be_deleted_but_not_edited() {
        let mut delivery = draft();
        add_line(&mut delivery, 1);
        delivery
            .execute(&DeliveryCommand::ChangeStatus(ChangeStatus {
                status: DocumentStatus::Cancelled,
                occurred_at: test_time(),
            }))
            .unwrap();

        assert!(delivery.ensure_deletable().is_ok());
        let err = delivery
            .handle(&DeliveryCommand::Update(UpdateDelivery {
                customer_id: None,
                location_id: None,
                scheduled_date: None,
                notes: Some("late".to_string()),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn update_line_changes_quantity_in_place() {
        let mut delivery = draft();
        let line_id = add_line(&mut delivery, 5);
        delivery
            .execute(&DeliveryCommand::UpdateLine(UpdateLine {
                line_id,
                product_id: None,
                quantity: Some(2),
                unit_price: Some(990),
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(delivery.lines().len(), 1);
        assert_eq!(delivery.lines()[0].quantity, 2);
        assert_eq!(delivery.lines()[0].unit_price, Some(990));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let mut delivery = draft();
        add_line(&mut delivery, 3);
        let before = delivery.clone();
        let cmd = DeliveryCommand::Complete(Complete {
            validated_by: UserId::new(),
            occurred_at: test_time(),
        });

        let events1 = delivery.handle(&cmd).unwrap();
        let events2 = delivery.handle(&cmd).unwrap();
        assert_eq!(delivery, before);
        assert_eq!(events1, events2);
    }
}
