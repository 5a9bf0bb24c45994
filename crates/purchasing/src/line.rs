//! Purchase line items.
//!
//! Three kinds of line hang off a purchase: invoice lines (what the customer is
//! billed), supplier lines (what we buy) and logistics lines (what moving it costs).
//! Lines are append-only from the client's point of view: drafts carry no id and the
//! store assigns one on create.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tradeops_core::{CounterpartyId, DomainError, DomainResult, Entity, LineId, Money, PurchaseId};

/// Discriminant of the three line kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Invoice,
    Supplier,
    Logistics,
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Invoice => "invoice",
            LineKind::Supplier => "supplier",
            LineKind::Logistics => "logistics",
        }
    }

    /// Whether lines of this kind carry an attached document.
    pub fn carries_files(&self) -> bool {
        !matches!(self, LineKind::Invoice)
    }
}

impl core::fmt::Display for LineKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a shipment goes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogisticsDestination {
    ToClient,
    ToUs,
    ReturnFromClient,
    ReturnToSupplier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub id: LineId,
    pub purchase_id: PurchaseId,
    pub article: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// As stored; not trusted. See `aggregator::invoice_mismatch`.
    pub total_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierLine {
    pub id: LineId,
    pub purchase_id: PurchaseId,
    pub supplier_id: Option<CounterpartyId>,
    pub article: String,
    pub quantity: i64,
    pub total_purchase_amount: Money,
    #[serde(default)]
    pub delivered: bool,
    pub payment_date: Option<NaiveDate>,
    pub shipment_date: Option<NaiveDate>,
    pub supplier_invoice: Option<String>,
    pub pdf_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogisticsLine {
    pub id: LineId,
    pub purchase_id: PurchaseId,
    pub amount: Money,
    pub carrier: String,
    /// Shipment/arrival date; its presence marks the line complete.
    pub date: Option<NaiveDate>,
    pub destination: LogisticsDestination,
    pub pdf_url: Option<String>,
}

macro_rules! impl_line_entity {
    ($t:ty) => {
        impl Entity for $t {
            type Id = LineId;

            fn id(&self) -> &LineId {
                &self.id
            }
        }
    };
}

impl_line_entity!(InvoiceLine);
impl_line_entity!(SupplierLine);
impl_line_entity!(LogisticsLine);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoiceLine {
    pub purchase_id: PurchaseId,
    pub article: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
}

impl NewInvoiceLine {
    /// Reject drafts whose total disagrees with quantity × unit price.
    pub fn validate(&self) -> DomainResult<()> {
        check_invoice_pricing(self.quantity, self.unit_price, self.total_price)
    }

    pub fn into_line(self, id: LineId) -> InvoiceLine {
        InvoiceLine {
            id,
            purchase_id: self.purchase_id,
            article: self.article,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_price: self.total_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplierLine {
    pub purchase_id: PurchaseId,
    pub supplier_id: Option<CounterpartyId>,
    pub article: String,
    pub quantity: i64,
    pub total_purchase_amount: Money,
    #[serde(default)]
    pub delivered: bool,
    pub payment_date: Option<NaiveDate>,
    pub shipment_date: Option<NaiveDate>,
    pub supplier_invoice: Option<String>,
}

impl NewSupplierLine {
    pub fn into_line(self, id: LineId) -> SupplierLine {
        SupplierLine {
            id,
            purchase_id: self.purchase_id,
            supplier_id: self.supplier_id,
            article: self.article,
            quantity: self.quantity,
            total_purchase_amount: self.total_purchase_amount,
            delivered: self.delivered,
            payment_date: self.payment_date,
            shipment_date: self.shipment_date,
            supplier_invoice: self.supplier_invoice,
            pdf_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLogisticsLine {
    pub purchase_id: PurchaseId,
    pub amount: Money,
    pub carrier: String,
    pub date: Option<NaiveDate>,
    pub destination: LogisticsDestination,
}

impl NewLogisticsLine {
    pub fn into_line(self, id: LineId) -> LogisticsLine {
        LogisticsLine {
            id,
            purchase_id: self.purchase_id,
            amount: self.amount,
            carrier: self.carrier,
            date: self.date,
            destination: self.destination,
            pdf_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLinePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Money>,
}

impl InvoiceLinePatch {
    /// Price edits must carry quantity, unit price and total together, and agree.
    pub fn validate(&self) -> DomainResult<()> {
        match (self.quantity, self.unit_price, self.total_price) {
            (None, None, None) => Ok(()),
            (Some(quantity), Some(unit_price), Some(total_price)) => {
                check_invoice_pricing(quantity, unit_price, total_price)
            }
            _ => Err(DomainError::validation(
                "invoice line price edits must include quantity, unit price and total",
            )),
        }
    }

    pub fn apply_to(&self, line: &mut InvoiceLine) {
        if let Some(article) = &self.article {
            line.article = article.clone();
        }
        if let Some(quantity) = self.quantity {
            line.quantity = quantity;
        }
        if let Some(unit_price) = self.unit_price {
            line.unit_price = unit_price;
        }
        if let Some(total_price) = self.total_price {
            line.total_price = total_price;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierLinePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<CounterpartyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_purchase_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_invoice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

impl SupplierLinePatch {
    pub fn apply_to(&self, line: &mut SupplierLine) {
        if let Some(supplier_id) = self.supplier_id {
            line.supplier_id = Some(supplier_id);
        }
        if let Some(article) = &self.article {
            line.article = article.clone();
        }
        if let Some(quantity) = self.quantity {
            line.quantity = quantity;
        }
        if let Some(amount) = self.total_purchase_amount {
            line.total_purchase_amount = amount;
        }
        if let Some(delivered) = self.delivered {
            line.delivered = delivered;
        }
        if let Some(date) = self.payment_date {
            line.payment_date = Some(date);
        }
        if let Some(date) = self.shipment_date {
            line.shipment_date = Some(date);
        }
        if let Some(invoice) = &self.supplier_invoice {
            line.supplier_invoice = Some(invoice.clone());
        }
        if let Some(url) = &self.pdf_url {
            line.pdf_url = Some(url.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogisticsLinePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<LogisticsDestination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

impl LogisticsLinePatch {
    pub fn apply_to(&self, line: &mut LogisticsLine) {
        if let Some(amount) = self.amount {
            line.amount = amount;
        }
        if let Some(carrier) = &self.carrier {
            line.carrier = carrier.clone();
        }
        if let Some(date) = self.date {
            line.date = Some(date);
        }
        if let Some(destination) = self.destination {
            line.destination = destination;
        }
        if let Some(url) = &self.pdf_url {
            line.pdf_url = Some(url.clone());
        }
    }
}

/// A line of any kind, as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Line {
    Invoice(InvoiceLine),
    Supplier(SupplierLine),
    Logistics(LogisticsLine),
}

impl Line {
    pub fn kind(&self) -> LineKind {
        match self {
            Line::Invoice(_) => LineKind::Invoice,
            Line::Supplier(_) => LineKind::Supplier,
            Line::Logistics(_) => LineKind::Logistics,
        }
    }

    pub fn id(&self) -> LineId {
        match self {
            Line::Invoice(l) => l.id,
            Line::Supplier(l) => l.id,
            Line::Logistics(l) => l.id,
        }
    }

    pub fn purchase_id(&self) -> PurchaseId {
        match self {
            Line::Invoice(l) => l.purchase_id,
            Line::Supplier(l) => l.purchase_id,
            Line::Logistics(l) => l.purchase_id,
        }
    }

    pub fn pdf_url(&self) -> Option<&str> {
        match self {
            Line::Invoice(_) => None,
            Line::Supplier(l) => l.pdf_url.as_deref(),
            Line::Logistics(l) => l.pdf_url.as_deref(),
        }
    }
}

/// Create payload for a line of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NewLine {
    Invoice(NewInvoiceLine),
    Supplier(NewSupplierLine),
    Logistics(NewLogisticsLine),
}

impl NewLine {
    pub fn kind(&self) -> LineKind {
        match self {
            NewLine::Invoice(_) => LineKind::Invoice,
            NewLine::Supplier(_) => LineKind::Supplier,
            NewLine::Logistics(_) => LineKind::Logistics,
        }
    }

    pub fn purchase_id(&self) -> PurchaseId {
        match self {
            NewLine::Invoice(l) => l.purchase_id,
            NewLine::Supplier(l) => l.purchase_id,
            NewLine::Logistics(l) => l.purchase_id,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        match self {
            NewLine::Invoice(l) => l.validate(),
            NewLine::Supplier(l) if l.quantity <= 0 => {
                Err(DomainError::validation("quantity must be positive"))
            }
            NewLine::Supplier(_) | NewLine::Logistics(_) => Ok(()),
        }
    }

    pub fn into_line(self, id: LineId) -> Line {
        match self {
            NewLine::Invoice(l) => Line::Invoice(l.into_line(id)),
            NewLine::Supplier(l) => Line::Supplier(l.into_line(id)),
            NewLine::Logistics(l) => Line::Logistics(l.into_line(id)),
        }
    }
}

/// Partial update for a line of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinePatch {
    Invoice(InvoiceLinePatch),
    Supplier(SupplierLinePatch),
    Logistics(LogisticsLinePatch),
}

impl LinePatch {
    pub fn kind(&self) -> LineKind {
        match self {
            LinePatch::Invoice(_) => LineKind::Invoice,
            LinePatch::Supplier(_) => LineKind::Supplier,
            LinePatch::Logistics(_) => LineKind::Logistics,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        match self {
            LinePatch::Invoice(p) => p.validate(),
            LinePatch::Supplier(_) | LinePatch::Logistics(_) => Ok(()),
        }
    }

    /// The patch that sets a line's document URL.
    pub fn attach(kind: LineKind, url: impl Into<String>) -> DomainResult<LinePatch> {
        let url = url.into();
        match kind {
            LineKind::Invoice => Err(DomainError::validation(
                "invoice lines do not carry documents",
            )),
            LineKind::Supplier => Ok(LinePatch::Supplier(SupplierLinePatch {
                pdf_url: Some(url),
                ..SupplierLinePatch::default()
            })),
            LineKind::Logistics => Ok(LinePatch::Logistics(LogisticsLinePatch {
                pdf_url: Some(url),
                ..LogisticsLinePatch::default()
            })),
        }
    }

    /// Apply to a line of the same kind; a kind mismatch is an invariant violation.
    pub fn apply_to(&self, line: &mut Line) -> DomainResult<()> {
        match (self, line) {
            (LinePatch::Invoice(p), Line::Invoice(l)) => p.apply_to(l),
            (LinePatch::Supplier(p), Line::Supplier(l)) => p.apply_to(l),
            (LinePatch::Logistics(p), Line::Logistics(l)) => p.apply_to(l),
            (patch, line) => {
                return Err(DomainError::invariant(format!(
                    "cannot apply {} patch to {} line",
                    patch.kind(),
                    line.kind()
                )));
            }
        }
        Ok(())
    }
}

fn check_invoice_pricing(quantity: i64, unit_price: Money, total_price: Money) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    match unit_price.checked_times(quantity) {
        Some(expected) if expected == total_price => Ok(()),
        _ => Err(DomainError::validation("invoice line total mismatch")),
    }
}
