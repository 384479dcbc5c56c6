//! Catalog domain module: products, categories and units of measure.
//!
//! Pure domain logic (no IO, no HTTP, no storage). Uniqueness of SKUs and
//! unit names is enforced by the document store through unique keys.

pub mod category;
pub mod product;
pub mod unit;

pub use category::{Category, CategoryDetails};
pub use product::{CreateProduct, Product, UpdateProduct};
pub use unit::{UnitDetails, UnitOfMeasure};
