//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7, so identifiers sort by creation time.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s.trim())
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

uuid_id!(
    /// Identifier of a user (actor identity).
    UserId,
    "UserId"
);
uuid_id!(
    /// Identifier of a pending one-time code.
    OtpId,
    "OtpId"
);
uuid_id!(ProductId, "ProductId");
uuid_id!(CategoryId, "CategoryId");
uuid_id!(UnitId, "UnitId");
uuid_id!(
    /// Identifier of a supplier or customer.
    PartyId,
    "PartyId"
);
uuid_id!(LocationId, "LocationId");
uuid_id!(ReceiptId, "ReceiptId");
uuid_id!(DeliveryId, "DeliveryId");
uuid_id!(AdjustmentId, "AdjustmentId");
uuid_id!(
    /// Identifier of a line item inside a receipt or delivery.
    LineId,
    "LineId"
);
uuid_id!(StockMoveId, "StockMoveId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_output() {
        let id = ProductId::new();
        let parsed: ProductId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_garbage_with_type_name() {
        let err = "not-a-uuid".parse::<ReceiptId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) if msg.starts_with("ReceiptId") => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn new_ids_are_time_ordered() {
        let first = LineId::new();
        let second = LineId::new();
        assert!(first < second);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
