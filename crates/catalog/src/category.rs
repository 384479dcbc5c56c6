use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainResult, Entity, require_text};

/// Product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    id: CategoryId,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Editable fields of a category. `None` keeps the stored value on update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDetails {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Category {
    pub fn create(id: CategoryId, details: CategoryDetails, at: DateTime<Utc>) -> DomainResult<Self> {
        let name = details.name.unwrap_or_default();
        require_text("name", &name)?;
        Ok(Self {
            id,
            name: name.trim().to_string(),
            description: details.description,
            created_at: at,
            updated_at: at,
        })
    }

    pub fn update(&mut self, details: CategoryDetails, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = details.name {
            require_text("name", &name)?;
            self.name = name.trim().to_string();
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

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Entity for Category {
    type Id = CategoryId;
    const COLLECTION: &'static str = "categories";

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_required() {
        let result = Category::create(CategoryId::new(), CategoryDetails::default(), Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn update_keeps_description_when_absent() {
        let mut category = Category::create(
            CategoryId::new(),
            CategoryDetails {
                name: Some("Fasteners".to_string()),
                description: Some("Bolts and nuts".to_string()),
            },
            Utc::now(),
        )
        .unwrap();
        category
            .update(
                CategoryDetails {
                    name: Some("Hardware".to_string()),
                    description: None,
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(category.name(), "Hardware");
        assert_eq!(category.description(), Some("Bolts and nuts"));
    }
}
