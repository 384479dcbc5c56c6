use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockroom_core::DomainError;

/// Staff role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Inventory Managers")]
    InventoryManager,
    #[serde(rename = "Warehouse Staff")]
    WarehouseStaff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::InventoryManager => "Inventory Managers",
            Role::WarehouseStaff => "Warehouse Staff",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Inventory Managers" => Ok(Role::InventoryManager),
            "Warehouse Staff" => Ok(Role::WarehouseStaff),
            other => Err(DomainError::validation(format!(
                "role must be 'Inventory Managers' or 'Warehouse Staff', got '{other}'"
            ))),
        }
    }
}
