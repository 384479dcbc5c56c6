use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainResult, Entity, UnitId, require_text};

/// Unit of measure (e.g. "Kilogram" / "kg").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfMeasure {
    id: UnitId,
    name: String,
    abbreviation: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Editable fields of a unit. `None` keeps the stored value on update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitDetails {
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub description: Option<String>,
}

impl UnitOfMeasure {
    pub fn create(id: UnitId, details: UnitDetails, at: DateTime<Utc>) -> DomainResult<Self> {
        let name = details.name.unwrap_or_default();
        let abbreviation = details.abbreviation.unwrap_or_default();
        require_text("name", &name)?;
        require_text("abbreviation", &abbreviation)?;

        Ok(Self {
            id,
            name: name.trim().to_string(),
            abbreviation: abbreviation.trim().to_string(),
            description: details.description,
            created_at: at,
            updated_at: at,
        })
    }

    pub fn update(&mut self, details: UnitDetails, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = &details.name {
            require_text("name", name)?;
        }
        if let Some(abbreviation) = &details.abbreviation {
            require_text("abbreviation", abbreviation)?;
        }

        if let Some(name) = details.name {
            self.name = name.trim().to_string();
        }
        if let Some(abbreviation) = details.abbreviation {
            self.abbreviation = abbreviation.trim().to_string();
        }
        if details.description.is_some() {
            self.description = details.description;
        }
        self.updated_at = at;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Unit names are unique regardless of case.
    pub fn same_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

impl Entity for UnitOfMeasure {
    type Id = UnitId;
    const COLLECTION: &'static str = "units_of_measure";

    fn id(&self) -> Self::Id {
        self.id
    }
}
