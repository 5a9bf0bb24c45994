use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradeops_core::{CounterpartyId, DealId, Entity, LineId, PurchaseId, upsert};

use crate::line::{InvoiceLine, Line, LineKind, LogisticsLine, SupplierLine};

/// Procurement side of a deal (header fields only).
///
/// A purchase is never closed explicitly; completeness is read off its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: PurchaseId,
    pub deal_id: DealId,
    pub request_number: String,
    pub counterparty_id: Option<CounterpartyId>,
    pub comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Purchase {
    type Id = PurchaseId;

    fn id(&self) -> &PurchaseId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchase {
    pub deal_id: DealId,
    pub request_number: String,
    pub counterparty_id: Option<CounterpartyId>,
    pub comment: Option<String>,
}

impl NewPurchase {
    pub fn into_purchase(self, id: PurchaseId, created_at: DateTime<Utc>) -> Purchase {
        Purchase {
            id,
            deal_id: self.deal_id,
            request_number: self.request_number,
            counterparty_id: self.counterparty_id,
            comment: self.comment,
            created_at: Some(created_at),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_id: Option<CounterpartyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl PurchasePatch {
    pub fn apply_to(&self, purchase: &mut Purchase) {
        if let Some(number) = &self.request_number {
            purchase.request_number = number.clone();
        }
        if let Some(counterparty_id) = self.counterparty_id {
            purchase.counterparty_id = Some(counterparty_id);
        }
        if let Some(comment) = &self.comment {
            purchase.comment = Some(comment.clone());
        }
    }
}

/// Snapshot of a purchase's lines, in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLines {
    pub invoice: Vec<InvoiceLine>,
    pub supplier: Vec<SupplierLine>,
    pub logistics: Vec<LogisticsLine>,
}

impl PurchaseLines {
    pub fn is_empty(&self) -> bool {
        self.invoice.is_empty() && self.supplier.is_empty() && self.logistics.is_empty()
    }

    pub fn find(&self, kind: LineKind, id: LineId) -> Option<Line> {
        match kind {
            LineKind::Invoice => self
                .invoice
                .iter()
                .find(|l| l.id == id)
                .cloned()
                .map(Line::Invoice),
            LineKind::Supplier => self
                .supplier
                .iter()
                .find(|l| l.id == id)
                .cloned()
                .map(Line::Supplier),
            LineKind::Logistics => self
                .logistics
                .iter()
                .find(|l| l.id == id)
                .cloned()
                .map(Line::Logistics),
        }
    }

    /// Replace the line with the same id, or append it.
    pub fn upsert(&mut self, line: Line) {
        match line {
            Line::Invoice(l) => upsert(&mut self.invoice, l),
            Line::Supplier(l) => upsert(&mut self.supplier, l),
            Line::Logistics(l) => upsert(&mut self.logistics, l),
        };
    }
}
