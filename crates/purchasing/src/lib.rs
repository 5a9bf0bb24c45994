//! Purchasing domain module: purchases, their line items and the derived totals.
//!
//! This crate contains business rules only, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage). Totals are always recomputed from the
//! current line snapshots; nothing here caches or persists a derived figure.

pub mod access;
pub mod aggregator;
pub mod line;
pub mod purchase;
pub mod reconciliation;

pub use access::ensure_can_edit_supplier_lines;
pub use aggregator::{InvoiceMismatch, PurchaseSummary, summarize};
pub use line::{
    InvoiceLine, InvoiceLinePatch, Line, LineKind, LinePatch, LogisticsDestination,
    LogisticsLine, LogisticsLinePatch, NewInvoiceLine, NewLine, NewLogisticsLine,
    NewSupplierLine, SupplierLine, SupplierLinePatch,
};
pub use purchase::{NewPurchase, Purchase, PurchaseLines, PurchasePatch};
pub use reconciliation::{AllArrived, NotificationPayload};
