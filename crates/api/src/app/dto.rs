use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use stockroom_core::{DomainError, DomainResult};

// -------------------------
// Parsing helpers
// -------------------------

/// A required, non-blank text field.
pub fn required(field: &str, value: Option<String>) -> DomainResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}

pub fn required_value<T>(field: &str, value: Option<T>) -> DomainResult<T> {
    value.ok_or_else(|| DomainError::validation(format!("{field} is required")))
}

pub fn parse_id<T: FromStr<Err = DomainError>>(raw: &str) -> DomainResult<T> {
    raw.parse()
}

/// Parse an optional id; blank strings count as absent.
pub fn parse_opt_id<T: FromStr<Err = DomainError>>(raw: Option<&str>) -> DomainResult<Option<T>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_id)
        .transpose()
}

/// Accept RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
pub fn parse_date(field: &str, raw: Option<&str>) -> DomainResult<Option<DateTime<Utc>>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| Some(d.and_utc()))
        .ok_or_else(|| DomainError::validation(format!("{field} must be a date")))
}

pub fn parse_opt<T: FromStr<Err = DomainError>>(raw: Option<&str>) -> DomainResult<Option<T>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .transpose()
}

// -------------------------
// Auth
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OtpSendRequest {
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub purpose: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub purpose: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OtpResetRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "newPassword", alias = "new_password")]
    pub new_password: Option<String>,
}

// -------------------------
// Settings
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PartyRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnitRequest {
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationRequest {
    pub name: Option<String>,
    pub parent_location_id: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductRequest {
    #[serde(alias = "product_name")]
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category_id: Option<String>,
    pub uom: Option<String>,
    pub unit_cost: Option<u64>,
    pub reorder_level: Option<i64>,
    pub initial_stock: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

// -------------------------
// Operations
// -------------------------

/// Header of a receipt or delivery; `party_id` is the supplier or customer.
#[derive(Debug, Default, Deserialize)]
pub struct DocumentRequest {
    #[serde(alias = "supplier_id", alias = "customer_id")]
    pub party_id: Option<String>,
    pub location_id: Option<String>,
    pub scheduled_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LineRequest {
    pub product_id: Option<String>,
    #[serde(alias = "quantity_received", alias = "quantity_delivered")]
    pub quantity: Option<i64>,
    pub unit_price: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateRequest {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentListQuery {
    pub status: Option<String>,
    #[serde(alias = "supplier_id", alias = "customer_id")]
    pub party_id: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdjustmentRequest {
    pub product_id: Option<String>,
    pub location_id: Option<String>,
    pub system_quantity: Option<i64>,
    pub counted_quantity: Option<i64>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdjustmentListQuery {
    pub validated: Option<bool>,
    pub reason: Option<String>,
    pub product_id: Option<String>,
    pub search: Option<String>,
}

// -------------------------
// Stock
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub product_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetStockRequest {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    #[serde(alias = "freeToUse")]
    pub free_to_use: Option<i64>,
}
