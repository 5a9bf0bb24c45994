//! Change notices published after core writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradeops_core::{DealId, LineId, PurchaseId, SaleId};

use crate::event::Event;

/// The record a write touched, with the parent ids a cache needs to invalidate
/// derived data (e.g. purchase totals when a line changes).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateRef {
    Deal { deal_id: DealId },
    Sale { deal_id: DealId, sale_id: SaleId },
    Purchase { purchase_id: PurchaseId },
    InvoiceLine { purchase_id: PurchaseId, line_id: LineId },
    SupplierLine { purchase_id: PurchaseId, line_id: LineId },
    LogisticsLine { purchase_id: PurchaseId, line_id: LineId },
}

impl AggregateRef {
    /// The purchase whose derived totals are affected, if any.
    pub fn purchase_id(&self) -> Option<PurchaseId> {
        match self {
            AggregateRef::Purchase { purchase_id }
            | AggregateRef::InvoiceLine { purchase_id, .. }
            | AggregateRef::SupplierLine { purchase_id, .. }
            | AggregateRef::LogisticsLine { purchase_id, .. } => Some(*purchase_id),
            AggregateRef::Deal { .. } | AggregateRef::Sale { .. } => None,
        }
    }

    /// The deal the record belongs to, when the reference carries it.
    pub fn deal_id(&self) -> Option<DealId> {
        match self {
            AggregateRef::Deal { deal_id } | AggregateRef::Sale { deal_id, .. } => Some(*deal_id),
            _ => None,
        }
    }
}

/// What happened to the referenced record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    FileAttached,
    /// A new sale row was spawned from an open one, which is left untouched.
    Spawned { from: SaleId },
}

/// Notice that a core write succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateChanged {
    pub aggregate: AggregateRef,
    pub change: ChangeKind,
    pub occurred_at: DateTime<Utc>,
}

impl AggregateChanged {
    pub fn new(aggregate: AggregateRef, change: ChangeKind) -> Self {
        Self {
            aggregate,
            change,
            occurred_at: Utc::now(),
        }
    }
}

impl Event for AggregateChanged {
    fn event_type(&self) -> &'static str {
        match (&self.aggregate, &self.change) {
            (AggregateRef::Sale { .. }, ChangeKind::Spawned { .. }) => "sales.sale.spawned",
            (AggregateRef::Sale { .. }, ChangeKind::Created) => "sales.sale.created",
            (AggregateRef::Sale { .. }, _) => "sales.sale.updated",
            (AggregateRef::Deal { .. }, _) => "sales.deal.updated",
            (AggregateRef::Purchase { .. }, ChangeKind::Created) => "purchasing.purchase.created",
            (AggregateRef::Purchase { .. }, _) => "purchasing.purchase.updated",
            (_, ChangeKind::Created) => "purchasing.line.created",
            (_, ChangeKind::FileAttached) => "purchasing.line.file_attached",
            (_, _) => "purchasing.line.updated",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_refs_point_at_their_purchase() {
        let purchase_id = PurchaseId::new();
        let aggregate = AggregateRef::SupplierLine {
            purchase_id,
            line_id: LineId::new(),
        };
        assert_eq!(aggregate.purchase_id(), Some(purchase_id));
        assert_eq!(aggregate.deal_id(), None);
    }

    #[test]
    fn spawn_notices_have_their_own_type() {
        let notice = AggregateChanged::new(
            AggregateRef::Sale {
                deal_id: DealId::new(),
                sale_id: SaleId::new(),
            },
            ChangeKind::Spawned { from: SaleId::new() },
        );
        assert_eq!(notice.event_type(), "sales.sale.spawned");
    }

    #[test]
    fn notices_serialize_with_discriminants() {
        let notice = AggregateChanged::new(
            AggregateRef::Purchase {
                purchase_id: PurchaseId::new(),
            },
            ChangeKind::Updated,
        );
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["aggregate"]["kind"], "purchase");
        assert_eq!(json["change"]["type"], "updated");
    }
}
