use chrono::{DateTime, Utc};

/// A fact the core announces after the backing store accepted a write.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, `<context>.<record>.<what>` (e.g. "sales.sale.spawned").
    fn event_type(&self) -> &'static str;

    fn occurred_at(&self) -> DateTime<Utc>;
}
