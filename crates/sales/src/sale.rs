use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradeops_core::{CounterpartyId, DealId, DomainError, DomainResult, Entity, Money, SaleId};

/// Where the goods of a sale currently are.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStage {
    InStock,
    ItemSent,
    ItemDeliveredPartial,
    ItemDeliveredFull,
    PurchasedForOrder,
    Return,
}

/// How the sale's closing documents were signed. Both values are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SigningStage {
    SignedOnPaper,
    SignedInEdo,
}

/// Lifecycle of a sale row, derived from its signing stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SaleLifecycle {
    /// Not signed yet; delivery stage is edited in place.
    Open,
    /// Signed; the row is a finalized snapshot.
    Progressed,
}

/// One progression snapshot of a deal's sale side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: SaleId,
    pub deal_id: DealId,
    pub counterparty_id: CounterpartyId,
    pub sale_amount: Option<Money>,
    pub total_sale_amount: Option<Money>,
    pub paid_now: Option<Money>,
    pub prepayment_amount: Option<Money>,
    pub logistics_cost: Option<Money>,
    pub purchase_cost: Option<Money>,
    pub margin: Option<Money>,
    pub delivery_stage: Option<DeliveryStage>,
    pub signing_stage: Option<SigningStage>,
    pub status_set_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub progressed: bool,
    pub pdf_url: Option<String>,
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &SaleId {
        &self.id
    }
}

impl Sale {
    pub fn lifecycle(&self) -> SaleLifecycle {
        match self.signing_stage {
            None => SaleLifecycle::Open,
            Some(_) => SaleLifecycle::Progressed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle() == SaleLifecycle::Open
    }

    /// The amount the purchase margin is computed against: `totalSaleAmount`, falling
    /// back to `saleAmount`. Zero counts as unknown.
    pub fn effective_sale_amount(&self) -> Option<Money> {
        self.total_sale_amount
            .filter(|m| !m.is_zero())
            .or(self.sale_amount)
            .filter(|m| !m.is_zero())
    }

    /// `saleAmount − purchaseCost − logisticsCost`, when the sale amount is known.
    pub fn margin_for(
        &self,
        purchase_cost: Money,
        logistics_cost: Money,
    ) -> DomainResult<Option<Money>> {
        let Some(amount) = self.effective_sale_amount() else {
            return Ok(None);
        };
        amount
            .checked_sub(purchase_cost)
            .and_then(|m| m.checked_sub(logistics_cost))
            .map(Some)
            .ok_or_else(|| DomainError::invariant("margin overflow"))
    }

    /// Materialize a stored row from a create payload and the id the store assigned.
    pub fn from_new(id: SaleId, new: NewSale) -> Self {
        Self {
            id,
            deal_id: new.deal_id,
            counterparty_id: new.counterparty_id,
            sale_amount: new.sale_amount,
            total_sale_amount: new.total_sale_amount,
            paid_now: new.paid_now,
            prepayment_amount: new.prepayment_amount,
            logistics_cost: new.logistics_cost,
            purchase_cost: new.purchase_cost,
            margin: new.margin,
            delivery_stage: new.delivery_stage,
            signing_stage: new.signing_stage,
            status_set_date: new.status_set_date,
            progressed: new.progressed,
            pdf_url: new.pdf_url,
        }
    }
}

/// The row a deal's sale side is currently represented by: the most recently
/// progressed snapshot, or the open row while nothing has been signed yet.
pub fn current_snapshot(rows: &[Sale]) -> Option<&Sale> {
    rows.iter()
        .filter(|s| s.progressed)
        .max_by_key(|s| s.status_set_date)
        .or_else(|| rows.iter().find(|s| s.is_open()))
        .or_else(|| rows.last())
}

/// The single unsigned row of a deal, if any.
pub fn open_row(rows: &[Sale]) -> Option<&Sale> {
    rows.iter().find(|s| s.is_open())
}

/// Create payload for a sale row (no client-assigned id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub deal_id: DealId,
    pub counterparty_id: CounterpartyId,
    pub sale_amount: Option<Money>,
    pub total_sale_amount: Option<Money>,
    pub paid_now: Option<Money>,
    pub prepayment_amount: Option<Money>,
    pub logistics_cost: Option<Money>,
    pub purchase_cost: Option<Money>,
    pub margin: Option<Money>,
    pub delivery_stage: Option<DeliveryStage>,
    pub signing_stage: Option<SigningStage>,
    pub status_set_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub progressed: bool,
    pub pdf_url: Option<String>,
}

impl NewSale {
    /// Copy every business field of an existing row.
    pub fn from_snapshot(sale: &Sale) -> Self {
        Self {
            deal_id: sale.deal_id,
            counterparty_id: sale.counterparty_id,
            sale_amount: sale.sale_amount,
            total_sale_amount: sale.total_sale_amount,
            paid_now: sale.paid_now,
            prepayment_amount: sale.prepayment_amount,
            logistics_cost: sale.logistics_cost,
            purchase_cost: sale.purchase_cost,
            margin: sale.margin,
            delivery_stage: sale.delivery_stage,
            signing_stage: sale.signing_stage,
            status_set_date: sale.status_set_date,
            progressed: sale.progressed,
            pdf_url: sale.pdf_url.clone(),
        }
    }
}

/// Partial update of a sale row; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_stage: Option<DeliveryStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_stage: Option<SigningStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_set_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_cost: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logistics_cost: Option<Money>,
    /// `Some(None)` clears a margin the current costs no longer support.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::deal::present_or_null"
    )]
    pub margin: Option<Option<Money>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

impl SalePatch {
    pub fn is_empty(&self) -> bool {
        *self == SalePatch::default()
    }

    pub fn apply_to(&self, sale: &mut Sale) {
        if let Some(stage) = self.delivery_stage {
            sale.delivery_stage = Some(stage);
        }
        if let Some(stage) = self.signing_stage {
            sale.signing_stage = Some(stage);
        }
        if let Some(date) = self.status_set_date {
            sale.status_set_date = Some(date);
        }
        if let Some(cost) = self.purchase_cost {
            sale.purchase_cost = Some(cost);
        }
        if let Some(cost) = self.logistics_cost {
            sale.logistics_cost = Some(cost);
        }
        if let Some(margin) = self.margin {
            sale.margin = margin;
        }
        if let Some(url) = &self.pdf_url {
            sale.pdf_url = Some(url.clone());
        }
    }
}
