use chrono::{DateTime, Utc};

/// A domain event.
///
/// Events are immutable facts returned by `Aggregate::handle`.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "inventory.stock.received").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
