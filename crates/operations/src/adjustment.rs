use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{
    AdjustmentId, Aggregate, DomainError, Entity, Event, LocationId, ProductId, UserId,
};

/// Why a physical count differs from the books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentReason {
    Damage,
    Extra,
    Expired,
    Theft,
    Correction,
    Other,
}

impl AdjustmentReason {
    pub fn as_str(self) -> &'static str {
        match self {
            AdjustmentReason::Damage => "damage",
            AdjustmentReason::Extra => "extra",
            AdjustmentReason::Expired => "expired",
            AdjustmentReason::Theft => "theft",
            AdjustmentReason::Correction => "correction",
            AdjustmentReason::Other => "other",
        }
    }
}

impl FromStr for AdjustmentReason {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "damage" => Ok(AdjustmentReason::Damage),
            "extra" => Ok(AdjustmentReason::Extra),
            "expired" => Ok(AdjustmentReason::Expired),
            "theft" => Ok(AdjustmentReason::Theft),
            "correction" => Ok(AdjustmentReason::Correction),
            "other" => Ok(AdjustmentReason::Other),
            other => Err(DomainError::validation(format!("unknown reason: {other}"))),
        }
    }
}

/// Aggregate root: Adjustment (one physical count of one product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    id: AdjustmentId,
    number: String,
    product_id: ProductId,
    location_id: Option<LocationId>,
    system_quantity: i64,
    counted_quantity: i64,
    /// Always `counted_quantity - system_quantity`.
    difference: i64,
    reason: AdjustmentReason,
    notes: Option<String>,
    created_by: UserId,
    validated_by: Option<UserId>,
    validated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: CreateAdjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAdjustment {
    pub adjustment_id: AdjustmentId,
    pub number: String,
    pub product_id: ProductId,
    pub location_id: Option<LocationId>,
    pub system_quantity: i64,
    pub counted_quantity: i64,
    pub reason: AdjustmentReason,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

fn ensure_counts(system_quantity: i64, counted_quantity: i64) -> Result<i64, DomainError> {
    if system_quantity < 0 || counted_quantity < 0 {
        return Err(DomainError::validation("quantities cannot be negative"));
    }
    counted_quantity
        .checked_sub(system_quantity)
        .ok_or_else(|| DomainError::validation("quantity difference overflow"))
}

impl Adjustment {
    pub fn create(cmd: CreateAdjustment) -> Result<Self, DomainError> {
        let difference = ensure_counts(cmd.system_quantity, cmd.counted_quantity)?;
        Ok(Self {
            id: cmd.adjustment_id,
            number: cmd.number,
            product_id: cmd.product_id,
            location_id: cmd.location_id,
            system_quantity: cmd.system_quantity,
            counted_quantity: cmd.counted_quantity,
            difference,
            reason: cmd.reason,
            notes: cmd.notes,
            created_by: cmd.created_by,
            validated_by: None,
            validated_at: None,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn location_id(&self) -> Option<LocationId> {
        self.location_id
    }

    pub fn system_quantity(&self) -> i64 {
        self.system_quantity
    }

    pub fn counted_quantity(&self) -> i64 {
        self.counted_quantity
    }

    pub fn difference(&self) -> i64 {
        self.difference
    }

    pub fn reason(&self) -> AdjustmentReason {
        self.reason
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn validated_at(&self) -> Option<DateTime<Utc>> {
        self.validated_at
    }

    pub fn is_validated(&self) -> bool {
        self.validated_at.is_some()
    }

    pub fn ensure_open(&self, action: &str) -> Result<(), DomainError> {
        if self.is_validated() {
            return Err(DomainError::invariant(format!(
                "cannot {action} a validated adjustment"
            )));
        }
        Ok(())
    }
}

impl Entity for Adjustment {
    type Id = AdjustmentId;
    const COLLECTION: &'static str = "adjustments";

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Command: UpdateAdjustment. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAdjustment {
    pub product_id: Option<ProductId>,
    pub location_id: Option<LocationId>,
    pub system_quantity: Option<i64>,
    pub counted_quantity: Option<i64>,
    pub reason: Option<AdjustmentReason>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ValidateAdjustment (only issued while settling stock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateAdjustment {
    pub validated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentCommand {
    Update(UpdateAdjustment),
    Validate(ValidateAdjustment),
}

/// Event: AdjustmentUpdated (carries the full new count).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentUpdated {
    pub adjustment_id: AdjustmentId,
    pub product_id: ProductId,
    pub location_id: Option<LocationId>,
    pub system_quantity: i64,
    pub counted_quantity: i64,
    pub difference: i64,
    pub reason: AdjustmentReason,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AdjustmentValidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentValidated {
    pub adjustment_id: AdjustmentId,
    pub product_id: ProductId,
    pub difference: i64,
    pub validated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentEvent {
    AdjustmentUpdated(AdjustmentUpdated),
    AdjustmentValidated(AdjustmentValidated),
}

impl Event for AdjustmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AdjustmentEvent::AdjustmentUpdated(_) => "operations.adjustment.updated",
            AdjustmentEvent::AdjustmentValidated(_) => "operations.adjustment.validated",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AdjustmentEvent::AdjustmentUpdated(e) => e.occurred_at,
            AdjustmentEvent::AdjustmentValidated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Adjustment {
    type Command = AdjustmentCommand;
    type Event = AdjustmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AdjustmentEvent::AdjustmentUpdated(e) => {
                self.product_id = e.product_id;
                self.location_id = e.location_id;
                self.system_quantity = e.system_quantity;
                self.counted_quantity = e.counted_quantity;
                self.difference = e.difference;
                self.reason = e.reason;
                self.notes = e.notes.clone();
            }
            AdjustmentEvent::AdjustmentValidated(e) => {
                self.validated_by = Some(e.validated_by);
                self.validated_at = Some(e.occurred_at);
            }
        }
        self.updated_at = event.occurred_at();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AdjustmentCommand::Update(cmd) => self.handle_update(cmd),
            AdjustmentCommand::Validate(cmd) => self.handle_validate(cmd),
        }
    }
}

impl Adjustment {
    fn handle_update(&self, cmd: &UpdateAdjustment) -> Result<Vec<AdjustmentEvent>, DomainError> {
        self.ensure_open("edit")?;

        let system_quantity = cmd.system_quantity.unwrap_or(self.system_quantity);
        let counted_quantity = cmd.counted_quantity.unwrap_or(self.counted_quantity);
        let difference = ensure_counts(system_quantity, counted_quantity)?;

        Ok(vec![AdjustmentEvent::AdjustmentUpdated(AdjustmentUpdated {
            adjustment_id: self.id,
            product_id: cmd.product_id.unwrap_or(self.product_id),
            location_id: cmd.location_id.or(self.location_id),
            system_quantity,
            counted_quantity,
            difference,
            reason: cmd.reason.unwrap_or(self.reason),
            notes: cmd.notes.clone().or_else(|| self.notes.clone()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_validate(&self, cmd: &ValidateAdjustment) -> Result<Vec<AdjustmentEvent>, DomainError> {
        if self.is_validated() {
            return Err(DomainError::invariant("adjustment is already validated"));
        }

        Ok(vec![AdjustmentEvent::AdjustmentValidated(AdjustmentValidated {
            adjustment_id: self.id,
            product_id: self.product_id,
            difference: self.difference,
            validated_by: cmd.validated_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn count(system_quantity: i64, counted_quantity: i64) -> Result<Adjustment, DomainError> {
        Adjustment::create(CreateAdjustment {
            adjustment_id: AdjustmentId::new(),
            number: "ADJ/0001".to_string(),
            product_id: ProductId::new(),
            location_id: None,
            system_quantity,
            counted_quantity,
            reason: AdjustmentReason::Damage,
            notes: None,
            created_by: UserId::new(),
            occurred_at: test_time(),
        })
    }

    fn validate(adjustment: &mut Adjustment) -> Result<Vec<AdjustmentEvent>, DomainError> {
        adjustment.execute(&AdjustmentCommand::Validate(ValidateAdjustment {
            validated_by: UserId::new(),
            occurred_at: test_time(),
        }))
    }

    #[test]
    fn difference_is_counted_minus_system() {
        let adjustment = count(12, 9).unwrap();
        assert_eq!(adjustment.difference(), -3);
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(matches!(count(-1, 4), Err(DomainError::Validation(_))));
    }

    #[test]
    fn update_recomputes_difference() {
        let mut adjustment = count(12, 9).unwrap();
        adjustment
            .execute(&AdjustmentCommand::Update(UpdateAdjustment {
                product_id: None,
                location_id: None,
                system_quantity: None,
                counted_quantity: Some(15),
                reason: Some(AdjustmentReason::Extra),
                notes: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(adjustment.difference(), 3);
        assert_eq!(adjustment.reason(), AdjustmentReason::Extra);
    }

    #[test]
    fn validation_is_one_shot() {
        let mut adjustment = count(5, 4).unwrap();
        validate(&mut adjustment).unwrap();
        assert!(adjustment.is_validated());

        match validate(&mut adjustment).unwrap_err() {
            DomainError::InvariantViolation(msg) if msg.contains("already validated") => {}
            _ => panic!("Expected re-validation to be rejected"),
        }
        assert!(adjustment.ensure_open("delete").is_err());
    }

    #[test]
    fn reasons_parse_from_lowercase_labels() {
        assert_eq!("Theft".parse::<AdjustmentReason>().unwrap(), AdjustmentReason::Theft);
        assert!("lost".parse::<AdjustmentReason>().is_err());
    }
}
