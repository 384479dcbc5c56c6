use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainError, DomainResult, Entity, ProductId, require_text};

/// A stocked product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    sku: String,
    category_id: Option<CategoryId>,
    /// Unit of measure label (e.g. "pcs", "kg").
    uom: String,
    /// Cost per unit in the smallest currency unit.
    unit_cost: u64,
    reorder_level: i64,
    initial_stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub category_id: Option<CategoryId>,
    pub uom: String,
    pub unit_cost: u64,
    pub reorder_level: i64,
    pub initial_stock: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProduct. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category_id: Option<CategoryId>,
    pub uom: Option<String>,
    pub unit_cost: Option<u64>,
    pub reorder_level: Option<i64>,
}

fn ensure_non_negative(field: &str, value: i64) -> DomainResult<()> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

impl Product {
    pub fn create(cmd: CreateProduct) -> DomainResult<Self> {
        require_text("name", &cmd.name)?;
        require_text("sku", &cmd.sku)?;
        require_text("uom", &cmd.uom)?;
        ensure_non_negative("reorder_level", cmd.reorder_level)?;
        ensure_non_negative("initial_stock", cmd.initial_stock)?;

        Ok(Self {
            id: cmd.product_id,
            name: cmd.name.trim().to_string(),
            sku: cmd.sku.trim().to_string(),
            category_id: cmd.category_id,
            uom: cmd.uom.trim().to_string(),
            unit_cost: cmd.unit_cost,
            reorder_level: cmd.reorder_level,
            initial_stock: cmd.initial_stock,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    /// Merge the given fields into the product. Identity and opening stock
    /// never change.
    pub fn update(&mut self, cmd: UpdateProduct, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = &cmd.name {
            require_text("name", name)?;
        }
        if let Some(sku) = &cmd.sku {
            require_text("sku", sku)?;
        }
        if let Some(uom) = &cmd.uom {
            require_text("uom", uom)?;
        }
        if let Some(level) = cmd.reorder_level {
            ensure_non_negative("reorder_level", level)?;
        }

        if let Some(name) = cmd.name {
            self.name = name.trim().to_string();
        }
        if let Some(sku) = cmd.sku {
            self.sku = sku.trim().to_string();
        }
        if let Some(uom) = cmd.uom {
            self.uom = uom.trim().to_string();
        }
        if cmd.category_id.is_some() {
            self.category_id = cmd.category_id;
        }
        if let Some(cost) = cmd.unit_cost {
            self.unit_cost = cost;
        }
        if let Some(level) = cmd.reorder_level {
            self.reorder_level = level;
        }
        self.updated_at = at;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    pub fn uom(&self) -> &str {
        &self.uom
    }

    pub fn unit_cost(&self) -> u64 {
        self.unit_cost
    }

    pub fn reorder_level(&self) -> i64 {
        self.reorder_level
    }

    pub fn initial_stock(&self) -> i64 {
        self.initial_stock
    }

    /// Whether an on-hand quantity has fallen to the reorder level.
    pub fn needs_reorder(&self, on_hand: i64) -> bool {
        self.reorder_level > 0 && on_hand <= self.reorder_level
    }

    /// Whether two SKUs collide (comparison ignores case).
    pub fn same_sku(&self, sku: &str) -> bool {
        self.sku.eq_ignore_ascii_case(sku.trim())
    }
}

impl Entity for Product {
    type Id = ProductId;
    const COLLECTION: &'static str = "products";

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd() -> CreateProduct {
        CreateProduct {
            product_id: ProductId::new(),
            name: "Steel bolt M8".to_string(),
            sku: " BOLT-M8 ".to_string(),
            category_id: None,
            uom: "pcs".to_string(),
            unit_cost: 25,
            reorder_level: 100,
            initial_stock: 0,
            occurred_at: test_time(),
        }
    }

    #[test]
    fn create_trims_identity_fields() {
        let product = Product::create(create_cmd()).unwrap();
        assert_eq!(product.sku(), "BOLT-M8");
        assert!(product.same_sku("bolt-m8"));
    }

    #[test]
    fn create_requires_sku_and_uom() {
        let mut cmd = create_cmd();
        cmd.sku = String::new();
        match Product::create(cmd).unwrap_err() {
            DomainError::Validation(msg) if msg.contains("sku") => {}
            _ => panic!("Expected Validation error for missing sku"),
        }

        let mut cmd = create_cmd();
        cmd.uom = " ".to_string();
        assert!(Product::create(cmd).is_err());
    }

    #[test]
    fn create_rejects_negative_levels() {
        let mut cmd = create_cmd();
        cmd.initial_stock = -1;
        match Product::create(cmd).unwrap_err() {
            DomainError::Validation(msg) if msg.contains("initial_stock") => {}
            _ => panic!("Expected Validation error for negative initial stock"),
        }
    }

    #[test]
    fn update_is_a_partial_merge() {
        let mut product = Product::create(create_cmd()).unwrap();
        product
            .update(
                UpdateProduct {
                    unit_cost: Some(30),
                    ..UpdateProduct::default()
                },
                test_time(),
            )
            .unwrap();
        assert_eq!(product.unit_cost(), 30);
        assert_eq!(product.name(), "Steel bolt M8");
        assert_eq!(product.reorder_level(), 100);
    }

    #[test]
    fn failed_update_leaves_product_untouched() {
        let mut product = Product::create(create_cmd()).unwrap();
        let before = product.clone();
        let result = product.update(
            UpdateProduct {
                name: Some("Renamed".to_string()),
                reorder_level: Some(-5),
                ..UpdateProduct::default()
            },
            test_time(),
        );
        assert!(result.is_err());
        assert_eq!(product, before);
    }

    #[test]
    fn reorder_threshold() {
        let product = Product::create(create_cmd()).unwrap();
        assert!(product.needs_reorder(100));
        assert!(!product.needs_reorder(101));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: edits never touch identity or opening stock, and a
            /// negative reorder level is always rejected.
            #[test]
            fn update_preserves_identity(
                cost in 0u64..1_000_000,
                level in -1_000i64..1_000,
                name in "[A-Za-z][A-Za-z0-9 ]{0,40}"
            ) {
                let mut product = Product::create(create_cmd()).unwrap();
                let id = product.id();
                let result = product.update(
                    UpdateProduct {
                        name: Some(name),
                        unit_cost: Some(cost),
                        reorder_level: Some(level),
                        ..UpdateProduct::default()
                    },
                    test_time(),
                );

                prop_assert_eq!(result.is_ok(), level >= 0);
                prop_assert_eq!(product.id(), id);
                prop_assert_eq!(product.initial_stock(), 0);
                prop_assert!(product.reorder_level() >= 0);
            }
        }
    }
}
