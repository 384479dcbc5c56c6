use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{
    Aggregate, DomainError, Entity, Event, LineId, LocationId, PartyId, ReceiptId, UserId,
};

use crate::line::{self, AddLine, LineItem, RemoveLine, UpdateLine};
use crate::status::{ChangeStatus, Complete, DocumentStatus};

/// Aggregate root: Receipt (incoming goods from a supplier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    id: ReceiptId,
    number: String,
    supplier_id: PartyId,
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

/// Command: CreateReceipt. Receipts always start in Draft without lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReceipt {
    pub receipt_id: ReceiptId,
    pub number: String,
    pub supplier_id: PartyId,
    pub location_id: Option<LocationId>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl Receipt {
    pub fn create(cmd: CreateReceipt) -> Self {
        Self {
            id: cmd.receipt_id,
            number: cmd.number,
            supplier_id: cmd.supplier_id,
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

    pub fn supplier_id(&self) -> PartyId {
        self.supplier_id
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

    /// Terminal receipts may be deleted only when they never touched stock.
    pub fn ensure_deletable(&self) -> Result<(), DomainError> {
        if self.status == DocumentStatus::Done {
            return Err(DomainError::invariant("cannot delete a completed receipt"));
        }
        Ok(())
    }
}

impl Entity for Receipt {
    type Id = ReceiptId;
    const COLLECTION: &'static str = "receipts";

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Command: UpdateReceipt. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReceipt {
    pub supplier_id: Option<PartyId>,
    pub location_id: Option<LocationId>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptCommand {
    Update(UpdateReceipt),
    AddLine(AddLine),
    UpdateLine(UpdateLine),
    RemoveLine(RemoveLine),
    ChangeStatus(ChangeStatus),
    Complete(Complete),
}

/// Event: ReceiptUpdated (carries the full new header).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptUpdated {
    pub receipt_id: ReceiptId,
    pub supplier_id: PartyId,
    pub location_id: Option<LocationId>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptLineAdded / ReceiptLineUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLineChanged {
    pub receipt_id: ReceiptId,
    pub line: LineItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptLineRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLineRemoved {
    pub receipt_id: ReceiptId,
    pub line_id: LineId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptStatusChanged {
    pub receipt_id: ReceiptId,
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptCompleted {
    pub receipt_id: ReceiptId,
    pub validated_by: UserId,
    pub lines: Vec<LineItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptEvent {
    ReceiptUpdated(ReceiptUpdated),
    ReceiptLineAdded(ReceiptLineChanged),
    ReceiptLineUpdated(ReceiptLineChanged),
    ReceiptLineRemoved(ReceiptLineRemoved),
    ReceiptStatusChanged(ReceiptStatusChanged),
    ReceiptCompleted(ReceiptCompleted),
}

impl Event for ReceiptEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReceiptEvent::ReceiptUpdated(_) => "operations.receipt.updated",
            ReceiptEvent::ReceiptLineAdded(_) => "operations.receipt.line_added",
            ReceiptEvent::ReceiptLineUpdated(_) => "operations.receipt.line_updated",
            ReceiptEvent::ReceiptLineRemoved(_) => "operations.receipt.line_removed",
            ReceiptEvent::ReceiptStatusChanged(_) => "operations.receipt.status_changed",
            ReceiptEvent::ReceiptCompleted(_) => "operations.receipt.completed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReceiptEvent::ReceiptUpdated(e) => e.occurred_at,
            ReceiptEvent::ReceiptLineAdded(e) => e.occurred_at,
            ReceiptEvent::ReceiptLineUpdated(e) => e.occurred_at,
            ReceiptEvent::ReceiptLineRemoved(e) => e.occurred_at,
            ReceiptEvent::ReceiptStatusChanged(e) => e.occurred_at,
            ReceiptEvent::ReceiptCompleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Receipt {
    type Command = ReceiptCommand;
    type Event = ReceiptEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReceiptEvent::ReceiptUpdated(e) => {
                self.supplier_id = e.supplier_id;
                self.location_id = e.location_id;
                self.scheduled_date = e.scheduled_date;
                self.notes = e.notes.clone();
            }
            ReceiptEvent::ReceiptLineAdded(e) => self.lines.push(e.line.clone()),
            ReceiptEvent::ReceiptLineUpdated(e) => line::replace(&mut self.lines, &e.line),
            ReceiptEvent::ReceiptLineRemoved(e) => self.lines.retain(|l| l.id != e.line_id),
            ReceiptEvent::ReceiptStatusChanged(e) => self.status = e.to,
            ReceiptEvent::ReceiptCompleted(e) => {
                self.status = DocumentStatus::Done;
                self.validated_by = Some(e.validated_by);
                self.validated_at = Some(e.occurred_at);
            }
        }
        self.updated_at = event.occurred_at();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ReceiptCommand::Update(cmd) => self.handle_update(cmd),
            ReceiptCommand::AddLine(cmd) => self.handle_add_line(cmd),
            ReceiptCommand::UpdateLine(cmd) => self.handle_update_line(cmd),
            ReceiptCommand::RemoveLine(cmd) => self.handle_remove_line(cmd),
            ReceiptCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            ReceiptCommand::Complete(cmd) => self.handle_complete(cmd),
        }
    }
}

impl Receipt {
    fn ensure_has_lines(&self) -> Result<(), DomainError> {
        if self.lines.is_empty() {
            return Err(DomainError::invariant("cannot validate receipt without items"));
        }
        Ok(())
    }

    fn handle_update(&self, cmd: &UpdateReceipt) -> Result<Vec<ReceiptEvent>, DomainError> {
        self.status.ensure_editable("receipt")?;

        Ok(vec![ReceiptEvent::ReceiptUpdated(ReceiptUpdated {
            receipt_id: self.id,
            supplier_id: cmd.supplier_id.unwrap_or(self.supplier_id),
            location_id: cmd.location_id.or(self.location_id),
            scheduled_date: cmd.scheduled_date.or(self.scheduled_date),
            notes: cmd.notes.clone().or_else(|| self.notes.clone()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<ReceiptEvent>, DomainError> {
        self.status.ensure_editable("receipt")?;
        let line = line::new_line(&self.lines, cmd)?;

        Ok(vec![ReceiptEvent::ReceiptLineAdded(ReceiptLineChanged {
            receipt_id: self.id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_line(&self, cmd: &UpdateLine) -> Result<Vec<ReceiptEvent>, DomainError> {
        self.status.ensure_editable("receipt")?;
        let line = line::patched_line(&self.lines, cmd)?;

        Ok(vec![ReceiptEvent::ReceiptLineUpdated(ReceiptLineChanged {
            receipt_id: self.id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_line(&self, cmd: &RemoveLine) -> Result<Vec<ReceiptEvent>, DomainError> {
        self.status.ensure_editable("receipt")?;
        line::find(&self.lines, cmd.line_id)?;

        Ok(vec![ReceiptEvent::ReceiptLineRemoved(ReceiptLineRemoved {
            receipt_id: self.id,
            line_id: cmd.line_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<ReceiptEvent>, DomainError> {
        self.status.ensure_transition(cmd.status, "receipt")?;
        self.ensure_has_lines()?;
        if cmd.status == DocumentStatus::Done {
            return Err(DomainError::invariant(
                "completing a receipt must go through stock validation",
            ));
        }

        Ok(vec![ReceiptEvent::ReceiptStatusChanged(ReceiptStatusChanged {
            receipt_id: self.id,
            from: self.status,
            to: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &Complete) -> Result<Vec<ReceiptEvent>, DomainError> {
        self.status.ensure_transition(DocumentStatus::Done, "receipt")?;
        self.ensure_has_lines()?;

        Ok(vec![ReceiptEvent::ReceiptCompleted(ReceiptCompleted {
            receipt_id: self.id,
            validated_by: cmd.validated_by,
            lines: self.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
