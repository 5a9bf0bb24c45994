//! Core services: compose the store seams with the pure domain rules.
//!
//! Every service validates before it writes, maps store failures to the matching
//! [`CoreError`](crate::CoreError) variant and publishes an [`AggregateChanged`]
//! notice after each successful write. A failed publish never fails the operation.

mod attach;
mod lines;
mod progression;
mod purchase;

pub use attach::Attachment;
pub use lines::LineService;
pub use progression::{Progression, ProgressionEffect, SaleProgressionEngine};
pub use purchase::{PurchaseService, PurchaseView};

use tradeops_events::{AggregateChanged, AggregateRef, ChangeKind, Event, EventBus};
use tradeops_purchasing::Line;

fn publish<B>(bus: &B, aggregate: AggregateRef, change: ChangeKind)
where
    B: EventBus<AggregateChanged>,
{
    let notice = AggregateChanged::new(aggregate, change);
    let event_type = notice.event_type();
    if let Err(e) = bus.publish(notice) {
        tracing::warn!(event_type, error = ?e, "failed to publish change notice");
    }
}

fn line_ref(line: &Line) -> AggregateRef {
    let purchase_id = line.purchase_id();
    let line_id = line.id();
    match line {
        Line::Invoice(_) => AggregateRef::InvoiceLine {
            purchase_id,
            line_id,
        },
        Line::Supplier(_) => AggregateRef::SupplierLine {
            purchase_id,
            line_id,
        },
        Line::Logistics(_) => AggregateRef::LogisticsLine {
            purchase_id,
            line_id,
        },
    }
}
