//! Executes sale progression decisions against the store.

use std::sync::Arc;

use chrono::Utc;

use tradeops_core::{DealId, SaleId};
use tradeops_events::{AggregateChanged, AggregateRef, ChangeKind, EventBus};
use tradeops_purchasing::PurchaseSummary;
use tradeops_sales::{
    Deal, DealStage, DeliveryStage, Sale, SaleCommand, SalePatch, SaleWrite, SigningStage,
    current_snapshot,
};

use super::attach::{Attachment, link_with_retry};
use super::publish;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::files::{FileStorage, FileUpload, UploadTarget};
use crate::repository::SalesRepository;

/// What executing a command did to the sale side of a deal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProgressionEffect {
    /// No write; the row already matched.
    Unchanged,
    /// The row was patched in place.
    Updated,
    /// A new progressed row was created; `from` is untouched.
    Spawned { from: SaleId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Progression {
    /// The row the UI should show now: the patched row, the spawned row, or the
    /// input row when nothing changed.
    pub sale: Sale,
    pub effect: ProgressionEffect,
}

pub struct SaleProgressionEngine<S, F, B> {
    sales: Arc<S>,
    files: Arc<F>,
    bus: B,
    config: CoreConfig,
}

impl<S, F, B> SaleProgressionEngine<S, F, B>
where
    S: SalesRepository,
    F: FileStorage,
    B: EventBus<AggregateChanged>,
{
    pub fn new(sales: Arc<S>, files: Arc<F>, bus: B, config: CoreConfig) -> Self {
        Self {
            sales,
            files,
            bus,
            config,
        }
    }

    /// The row currently representing the deal's sale side, if any.
    pub async fn current_sale(&self, deal_id: DealId) -> CoreResult<Option<Sale>> {
        let rows = self
            .sales
            .list_sales(deal_id)
            .await
            .map_err(CoreError::read("sales"))?;
        Ok(current_snapshot(&rows).cloned())
    }

    /// Decide and execute `command` on `sale`.
    ///
    /// A rejected decision writes nothing. A failed write surfaces as
    /// [`CoreError::ProgressionWrite`]; in the spawn case the original row is
    /// untouched either way.
    pub async fn execute(&self, sale: &Sale, command: SaleCommand) -> CoreResult<Progression> {
        match sale.decide(&command, Utc::now())? {
            SaleWrite::Unchanged => {
                tracing::debug!(sale_id = %sale.id, ?command, "sale already up to date");
                Ok(Progression {
                    sale: sale.clone(),
                    effect: ProgressionEffect::Unchanged,
                })
            }
            SaleWrite::Patch(patch) => {
                let updated = self.patch(sale, patch).await?;
                Ok(Progression {
                    sale: updated,
                    effect: ProgressionEffect::Updated,
                })
            }
            SaleWrite::Spawn(draft) => {
                let created = self
                    .sales
                    .create_sale(draft)
                    .await
                    .map_err(CoreError::ProgressionWrite)?;

                tracing::info!(
                    deal_id = %sale.deal_id,
                    from = %sale.id,
                    sale_id = %created.id,
                    "spawned progressed sale row"
                );
                publish(
                    &self.bus,
                    AggregateRef::Sale {
                        deal_id: created.deal_id,
                        sale_id: created.id,
                    },
                    ChangeKind::Spawned { from: sale.id },
                );
                Ok(Progression {
                    sale: created,
                    effect: ProgressionEffect::Spawned { from: sale.id },
                })
            }
        }
    }

    pub async fn set_delivery_stage(
        &self,
        sale: &Sale,
        stage: DeliveryStage,
    ) -> CoreResult<Progression> {
        self.execute(sale, SaleCommand::SetDeliveryStage(stage)).await
    }

    /// Sign an open row (spawns a progressed row) or correct an existing signature.
    pub async fn set_signing_stage(
        &self,
        sale: &Sale,
        stage: SigningStage,
    ) -> CoreResult<Progression> {
        self.execute(sale, SaleCommand::SetSigningStage(stage)).await
    }

    /// Copy the purchase totals onto the row and recompute its margin.
    pub async fn apply_costs(
        &self,
        sale: &Sale,
        summary: &PurchaseSummary,
    ) -> CoreResult<Progression> {
        self.execute(
            sale,
            SaleCommand::ApplyCosts {
                purchase_cost: summary.total_supplier_cost,
                logistics_cost: summary.total_logistics_cost,
            },
        )
        .await
    }

    pub async fn set_deal_stage(
        &self,
        deal_id: DealId,
        stage: DealStage,
        loss_reason: Option<&str>,
    ) -> CoreResult<Deal> {
        let deal = self
            .sales
            .get_deal(deal_id)
            .await
            .map_err(CoreError::read("deal"))?;

        let patch = deal.plan_stage_change(stage, loss_reason)?;
        if patch.is_empty() {
            return Ok(deal);
        }

        let updated = self
            .sales
            .update_deal(deal_id, patch)
            .await
            .map_err(CoreError::ProgressionWrite)?;

        tracing::info!(%deal_id, stage = ?updated.stage, "deal stage changed");
        publish(&self.bus, AggregateRef::Deal { deal_id }, ChangeKind::Updated);
        Ok(updated)
    }

    /// Upload the sale's signed document and point the row at it.
    pub async fn attach_pdf(&self, sale: &Sale, file: FileUpload) -> CoreResult<Attachment<Sale>> {
        let target = UploadTarget::SalePdf(sale.id);
        let url = self
            .files
            .upload(target, file)
            .await
            .map_err(CoreError::ProgressionWrite)?;

        self.link_pdf(sale, target, url).await
    }

    /// Re-run only the patch leg of [`attach_pdf`](Self::attach_pdf).
    pub async fn reattach_pdf(&self, sale: &Sale, url: String) -> CoreResult<Attachment<Sale>> {
        self.link_pdf(sale, UploadTarget::SalePdf(sale.id), url).await
    }

    async fn link_pdf(
        &self,
        sale: &Sale,
        target: UploadTarget,
        url: String,
    ) -> CoreResult<Attachment<Sale>> {
        let patch = SalePatch {
            pdf_url: Some(url.clone()),
            ..SalePatch::default()
        };
        let sales = &*self.sales;
        let sale_id = sale.id;

        let updated = link_with_retry(&self.config, target, move || {
            sales.update_sale(sale_id, patch.clone())
        })
        .await
        .map_err(|cause| CoreError::AttachPartialFailure {
            target,
            url: url.clone(),
            cause,
        })?;

        publish(
            &self.bus,
            AggregateRef::Sale {
                deal_id: updated.deal_id,
                sale_id: updated.id,
            },
            ChangeKind::FileAttached,
        );
        Ok(Attachment {
            url,
            record: updated,
        })
    }

    async fn patch(&self, sale: &Sale, patch: SalePatch) -> CoreResult<Sale> {
        let updated = self
            .sales
            .update_sale(sale.id, patch)
            .await
            .map_err(CoreError::ProgressionWrite)?;

        publish(
            &self.bus,
            AggregateRef::Sale {
                deal_id: updated.deal_id,
                sale_id: updated.id,
            },
            ChangeKind::Updated,
        );
        Ok(updated)
    }
}
