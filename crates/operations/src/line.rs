use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, LineId, ProductId};

/// A line item owned by a receipt or a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price per unit in the smallest currency unit.
    pub unit_price: Option<u64>,
}

/// Command: AddLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub line_id: LineId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateLine. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLine {
    pub line_id: LineId,
    pub product_id: Option<ProductId>,
    pub quantity: Option<i64>,
    pub unit_price: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLine {
    pub line_id: LineId,
    pub occurred_at: DateTime<Utc>,
}

fn ensure_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}

pub(crate) fn new_line(lines: &[LineItem], cmd: &AddLine) -> DomainResult<LineItem> {
    ensure_quantity(cmd.quantity)?;
    if lines.iter().any(|l| l.id == cmd.line_id) {
        return Err(DomainError::conflict(format!("line {} already exists", cmd.line_id)));
    }
    Ok(LineItem {
        id: cmd.line_id,
        product_id: cmd.product_id,
        quantity: cmd.quantity,
        unit_price: cmd.unit_price,
    })
}

pub(crate) fn patched_line(lines: &[LineItem], cmd: &UpdateLine) -> DomainResult<LineItem> {
    let current = find(lines, cmd.line_id)?;
    let quantity = cmd.quantity.unwrap_or(current.quantity);
    ensure_quantity(quantity)?;
    Ok(LineItem {
        id: current.id,
        product_id: cmd.product_id.unwrap_or(current.product_id),
        quantity,
        unit_price: cmd.unit_price.or(current.unit_price),
    })
}

pub(crate) fn find(lines: &[LineItem], line_id: LineId) -> DomainResult<&LineItem> {
    lines
        .iter()
        .find(|l| l.id == line_id)
        .ok_or_else(|| DomainError::not_found("item"))
}

pub(crate) fn replace(lines: &mut [LineItem], line: &LineItem) {
    if let Some(slot) = lines.iter_mut().find(|l| l.id == line.id) {
        *slot = line.clone();
    }
}

/// Total quantity per product across lines.
pub fn totals_by_product(lines: &[LineItem]) -> BTreeMap<ProductId, i64> {
    let mut totals = BTreeMap::new();
    for line in lines {
        *totals.entry(line.product_id).or_insert(0) += line.quantity;
    }
    totals
}
