use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, LocationId, require_text};

/// A warehouse location (shelf, room, site), optionally nested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    id: LocationId,
    name: String,
    parent_location_id: Option<LocationId>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Editable fields of a location. `None` keeps the stored value on update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationDetails {
    pub name: Option<String>,
    pub parent_location_id: Option<LocationId>,
    pub description: Option<String>,
}

impl Location {
    pub fn create(id: LocationId, details: LocationDetails, at: DateTime<Utc>) -> DomainResult<Self> {
        let name = details.name.unwrap_or_default();
        require_text("name", &name)?;
        let mut location = Self {
            id,
            name: name.trim().to_string(),
            parent_location_id: None,
            description: details.description,
            created_at: at,
            updated_at: at,
        };
        location.set_parent(details.parent_location_id)?;
        Ok(location)
    }

    pub fn update(&mut self, details: LocationDetails, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = &details.name {
            require_text("name", name)?;
        }
        if details.parent_location_id == Some(self.id) {
            return Err(DomainError::validation("a location cannot be its own parent"));
        }

        if let Some(name) = details.name {
            self.name = name.trim().to_string();
        }
        if details.parent_location_id.is_some() {
            self.parent_location_id = details.parent_location_id;
        }
        if details.description.is_some() {
            self.description = details.description;
        }
        self.updated_at = at;
        Ok(())
    }

    fn set_parent(&mut self, parent: Option<LocationId>) -> DomainResult<()> {
        if parent == Some(self.id) {
            return Err(DomainError::validation("a location cannot be its own parent"));
        }
        self.parent_location_id = parent;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_location_id(&self) -> Option<LocationId> {
        self.parent_location_id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Entity for Location {
    type Id = LocationId;
    const COLLECTION: &'static str = "locations";

    fn id(&self) -> Self::Id {
        self.id
    }
}
