//! Data-access seams over the backing store.
//!
//! Implementations are thin: they persist what they are given and return the
//! canonical record the store answers with. Business rules live in the services.

use async_trait::async_trait;

use tradeops_core::{DealId, LineId, PurchaseId, SaleId};
use tradeops_purchasing::{
    InvoiceLine, Line, LinePatch, LogisticsLine, NewLine, NewPurchase, Purchase, PurchaseLines,
    PurchasePatch, SupplierLine,
};
use tradeops_sales::{Deal, DealPatch, NewSale, Sale, SalePatch};

use crate::error::StoreError;

/// Line items of purchases.
///
/// Creation is append-only: the store assigns the id and returns the created line.
#[async_trait]
pub trait LineRepository: Send + Sync {
    async fn list_invoice_lines(
        &self,
        purchase_id: PurchaseId,
    ) -> Result<Vec<InvoiceLine>, StoreError>;

    async fn list_supplier_lines(
        &self,
        purchase_id: PurchaseId,
    ) -> Result<Vec<SupplierLine>, StoreError>;

    async fn list_logistics_lines(
        &self,
        purchase_id: PurchaseId,
    ) -> Result<Vec<LogisticsLine>, StoreError>;

    async fn create_line(&self, draft: NewLine) -> Result<Line, StoreError>;

    async fn update_line(
        &self,
        purchase_id: PurchaseId,
        line_id: LineId,
        patch: LinePatch,
    ) -> Result<Line, StoreError>;

    /// All three lists, fetched one after another.
    async fn list_lines(&self, purchase_id: PurchaseId) -> Result<PurchaseLines, StoreError> {
        Ok(PurchaseLines {
            invoice: self.list_invoice_lines(purchase_id).await?,
            supplier: self.list_supplier_lines(purchase_id).await?,
            logistics: self.list_logistics_lines(purchase_id).await?,
        })
    }
}

/// Deals and their sale rows.
#[async_trait]
pub trait SalesRepository: Send + Sync {
    async fn get_sale(&self, sale_id: SaleId) -> Result<Sale, StoreError>;

    /// Every row of a deal's sale side, oldest first.
    async fn list_sales(&self, deal_id: DealId) -> Result<Vec<Sale>, StoreError>;

    async fn create_sale(&self, draft: NewSale) -> Result<Sale, StoreError>;

    async fn update_sale(&self, sale_id: SaleId, patch: SalePatch) -> Result<Sale, StoreError>;

    async fn get_deal(&self, deal_id: DealId) -> Result<Deal, StoreError>;

    async fn update_deal(&self, deal_id: DealId, patch: DealPatch) -> Result<Deal, StoreError>;
}

/// Purchase headers.
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    async fn get_purchase(&self, purchase_id: PurchaseId) -> Result<Purchase, StoreError>;

    async fn list_purchases(&self) -> Result<Vec<Purchase>, StoreError>;

    async fn create_purchase(&self, draft: NewPurchase) -> Result<Purchase, StoreError>;

    async fn update_purchase(
        &self,
        purchase_id: PurchaseId,
        patch: PurchasePatch,
    ) -> Result<Purchase, StoreError>;
}
