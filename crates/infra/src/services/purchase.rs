//! Purchase headers, the derived purchase view and the "all arrived" confirmation.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use tradeops_core::{Actor, DomainError, NotificationId, PurchaseId};
use tradeops_events::{AggregateChanged, AggregateRef, ChangeKind, EventBus};
use tradeops_purchasing::{
    AllArrived, NewPurchase, Purchase, PurchaseLines, PurchasePatch, PurchaseSummary, summarize,
};
use tradeops_sales::{Sale, current_snapshot};

use super::publish;
use crate::error::{CoreError, CoreResult};
use crate::notifier::{CounterpartyDirectory, ReconciliationNotifier};
use crate::repository::{LineRepository, PurchaseRepository, SalesRepository};

/// A purchase with its lines, the deal's current sale row and the totals derived
/// from both. Built fresh on every load.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseView {
    pub purchase: Purchase,
    pub lines: PurchaseLines,
    pub sale: Option<Sale>,
    pub summary: PurchaseSummary,
}

pub struct PurchaseService<S, N, B> {
    store: Arc<S>,
    notifier: Arc<N>,
    bus: B,
}

impl<S, N, B> PurchaseService<S, N, B>
where
    S: PurchaseRepository + LineRepository + SalesRepository + CounterpartyDirectory,
    N: ReconciliationNotifier,
    B: EventBus<AggregateChanged>,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, bus: B) -> Self {
        Self {
            store,
            notifier,
            bus,
        }
    }

    pub async fn list_purchases(&self) -> CoreResult<Vec<Purchase>> {
        self.store
            .list_purchases()
            .await
            .map_err(CoreError::read("purchases"))
    }

    /// Load a purchase and recompute its totals from the current lines.
    pub async fn load_view(&self, purchase_id: PurchaseId) -> CoreResult<PurchaseView> {
        let purchase = self
            .store
            .get_purchase(purchase_id)
            .await
            .map_err(CoreError::read("purchase"))?;
        let lines = self
            .store
            .list_lines(purchase_id)
            .await
            .map_err(CoreError::read("purchase lines"))?;
        let rows = self
            .store
            .list_sales(purchase.deal_id)
            .await
            .map_err(CoreError::read("sales"))?;

        let sale = current_snapshot(&rows).cloned();
        let summary = summarize(&lines, sale.as_ref().and_then(Sale::effective_sale_amount))?;
        if summary.has_mismatches() {
            tracing::warn!(
                %purchase_id,
                mismatches = summary.invoice_mismatches.len(),
                "invoice lines disagree with quantity x unit price"
            );
        }

        Ok(PurchaseView {
            purchase,
            lines,
            sale,
            summary,
        })
    }

    pub async fn create_purchase(&self, draft: NewPurchase) -> CoreResult<Purchase> {
        let purchase = self
            .store
            .create_purchase(draft)
            .await
            .map_err(CoreError::PurchaseWrite)?;

        tracing::info!(purchase_id = %purchase.id, deal_id = %purchase.deal_id, "purchase created");
        publish(
            &self.bus,
            AggregateRef::Purchase {
                purchase_id: purchase.id,
            },
            ChangeKind::Created,
        );
        Ok(purchase)
    }

    pub async fn update_purchase(
        &self,
        purchase_id: PurchaseId,
        patch: PurchasePatch,
    ) -> CoreResult<Purchase> {
        let purchase = self
            .store
            .update_purchase(purchase_id, patch)
            .await
            .map_err(CoreError::PurchaseWrite)?;

        publish(
            &self.bus,
            AggregateRef::Purchase { purchase_id },
            ChangeKind::Updated,
        );
        Ok(purchase)
    }

    /// Confirm that all goods of a purchase arrived and notify the team.
    ///
    /// Refused with a validation error unless the purchase is fully received. A
    /// missing counterparty only drops the name from the message.
    pub async fn confirm_all_arrived(
        &self,
        purchase_id: PurchaseId,
        actor: &Actor,
    ) -> CoreResult<NotificationId> {
        let purchase = self
            .store
            .get_purchase(purchase_id)
            .await
            .map_err(CoreError::read("purchase"))?;
        let lines = self
            .store
            .list_lines(purchase_id)
            .await
            .map_err(CoreError::read("purchase lines"))?;

        if !lines.is_fully_received() {
            return Err(DomainError::validation("purchase is not fully received").into());
        }

        let counterparty_name = match purchase.counterparty_id {
            Some(id) => match self.store.get_counterparty(id).await {
                Ok(counterparty) => Some(counterparty.name),
                Err(e) => {
                    tracing::warn!(counterparty_id = %id, error = %e, "counterparty lookup failed");
                    None
                }
            },
            None => None,
        };

        let event = AllArrived {
            purchase_id,
            deal_id: purchase.deal_id,
            request_number: purchase.request_number,
            counterparty_name,
            confirmed_by: actor.clone(),
            occurred_at: Utc::now(),
        };

        let notification_id = self
            .notifier
            .notify_all_arrived(&event)
            .await
            .map_err(CoreError::Notify)?;

        tracing::info!(
            %purchase_id,
            %notification_id,
            confirmed_by = %actor.id,
            "all-arrived notification sent"
        );
        Ok(notification_id)
    }
}
