use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, PartyId, ValueObject, require_text};

/// Party kind: customer or supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn label(self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }
}

/// Contact information for a party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ValueObject for ContactInfo {}

impl ContactInfo {
    /// Trim every field and drop the blank ones.
    fn normalized(self) -> DomainResult<Self> {
        let email = clean(self.email);
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(DomainError::validation(format!("invalid email: {email}")));
            }
        }
        Ok(Self {
            email,
            phone: clean(self.phone),
            address: clean(self.address),
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Supplier or customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    id: PartyId,
    kind: PartyKind,
    name: String,
    #[serde(flatten)]
    contact: ContactInfo,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: RegisterParty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterParty {
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub contact: ContactInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Party {
    pub fn register(cmd: RegisterParty) -> DomainResult<Self> {
        require_text("name", &cmd.name)?;
        Ok(Self {
            id: cmd.party_id,
            kind: cmd.kind,
            name: cmd.name.trim().to_string(),
            contact: cmd.contact.normalized()?,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    /// Merge the given fields into the party.
    pub fn update(&mut self, cmd: UpdateDetails, at: DateTime<Utc>) -> DomainResult<()> {
        let name = match cmd.name {
            Some(name) => {
                require_text("name", &name)?;
                name.trim().to_string()
            }
            None => self.name.clone(),
        };
        let contact = ContactInfo {
            email: cmd.email.or_else(|| self.contact.email.clone()),
            phone: cmd.phone.or_else(|| self.contact.phone.clone()),
            address: cmd.address.or_else(|| self.contact.address.clone()),
        }
        .normalized()?;

        self.name = name;
        self.contact = contact;
        self.updated_at = at;
        Ok(())
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for Party {
    type Id = PartyId;
    const COLLECTION: &'static str = "parties";

    fn id(&self) -> Self::Id {
        self.id
    }
}
