//! Purchase totals.
//!
//! Everything here is a pure function of the line snapshots passed in. Callers
//! recompute on every read; no figure produced here is ever stored as truth.

use serde::{Deserialize, Serialize};

use tradeops_core::{DomainError, DomainResult, LineId, Money};

use crate::line::InvoiceLine;
use crate::purchase::PurchaseLines;

/// An invoice line whose stored total disagrees with quantity × unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceMismatch {
    pub line_id: LineId,
    pub stored_total: Money,
    /// `None` when quantity × unit price overflows.
    pub expected_total: Option<Money>,
}

/// Derived purchase totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummary {
    pub total_supplier_cost: Money,
    pub total_logistics_cost: Money,
    /// Sum of stored invoice totals; see `invoice_mismatches`.
    pub total_invoice: Money,
    /// `None` when the sale amount is unknown or zero.
    pub total_profit: Option<Money>,
    pub invoice_mismatches: Vec<InvoiceMismatch>,
    pub fully_received: bool,
}

impl PurchaseSummary {
    pub fn has_mismatches(&self) -> bool {
        !self.invoice_mismatches.is_empty()
    }
}

/// Compute totals for `lines` against the linked sale's amount.
///
/// Fails with an invariant violation when a total does not fit in an `i64` of
/// kopecks; no partial figures are produced.
pub fn summarize(
    lines: &PurchaseLines,
    sale_amount: Option<Money>,
) -> DomainResult<PurchaseSummary> {
    let total_supplier_cost =
        Money::checked_sum(lines.supplier.iter().map(|l| l.total_purchase_amount))
            .ok_or_else(|| DomainError::invariant("supplier cost total overflow"))?;
    let total_logistics_cost = Money::checked_sum(lines.logistics.iter().map(|l| l.amount))
        .ok_or_else(|| DomainError::invariant("logistics cost total overflow"))?;
    let total_invoice = Money::checked_sum(lines.invoice.iter().map(|l| l.total_price))
        .ok_or_else(|| DomainError::invariant("invoice total overflow"))?;

    let total_profit = match sale_amount.filter(|amount| !amount.is_zero()) {
        Some(amount) => Some(
            amount
                .checked_sub(total_supplier_cost)
                .and_then(|m| m.checked_sub(total_logistics_cost))
                .ok_or_else(|| DomainError::invariant("profit overflow"))?,
        ),
        None => None,
    };

    Ok(PurchaseSummary {
        total_supplier_cost,
        total_logistics_cost,
        total_invoice,
        total_profit,
        invoice_mismatches: lines.invoice.iter().filter_map(invoice_mismatch).collect(),
        fully_received: lines.is_fully_received(),
    })
}

/// Flag (never correct) an invoice line whose total is off.
pub fn invoice_mismatch(line: &InvoiceLine) -> Option<InvoiceMismatch> {
    let expected = line.unit_price.checked_times(line.quantity);
    if expected == Some(line.total_price) {
        return None;
    }
    Some(InvoiceMismatch {
        line_id: line.id,
        stored_total: line.total_price,
        expected_total: expected,
    })
}

impl PurchaseLines {
    /// Whether the purchase qualifies for the "all arrived" confirmation.
    ///
    /// Requires at least one supplier line and every supplier line delivered; every
    /// logistics line must carry its shipment date. A purchase without logistics
    /// lines (goods collected by the customer) is not held back by them.
    pub fn is_fully_received(&self) -> bool {
        !self.supplier.is_empty()
            && self.supplier.iter().all(|l| l.delivered)
            && self.logistics.iter().all(|l| l.date.is_some())
    }
}
