//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity; two with the same attribute values are
/// equal. Contact details and line items are examples in this workspace,
/// as opposed to entities such as a `Party` or a `Receipt`.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
