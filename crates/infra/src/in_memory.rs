//! In-memory store for tests/dev.
//!
//! Implements every store seam over plain maps, assigns ids the way the backing
//! service does, and can be told to fail the next N calls of a given kind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use tradeops_core::{
    Counterparty, CounterpartyId, DealId, LineId, NotificationId, PurchaseId, SaleId,
};
use tradeops_purchasing::{
    AllArrived, InvoiceLine, Line, LinePatch, LogisticsLine, NewLine, NewPurchase,
    NotificationPayload, Purchase, PurchaseLines, PurchasePatch, SupplierLine,
};
use tradeops_sales::{Deal, DealPatch, NewSale, Sale, SalePatch};

use crate::error::StoreError;
use crate::files::{FileStorage, FileUpload, UploadTarget};
use crate::notifier::{CounterpartyDirectory, ReconciliationNotifier};
use crate::repository::{LineRepository, PurchaseRepository, SalesRepository};

#[derive(Debug, Default)]
struct State {
    deals: HashMap<DealId, Deal>,
    sales: Vec<Sale>,
    purchases: Vec<Purchase>,
    lines: HashMap<PurchaseId, PurchaseLines>,
    counterparties: HashMap<CounterpartyId, Counterparty>,
    files: HashMap<String, FileUpload>,
    notifications: Vec<(NotificationId, NotificationPayload)>,
}

#[derive(Debug, Default)]
struct Faults {
    line_writes: u32,
    uploads: u32,
    sale_writes: u32,
    notifications: u32,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    faults: Mutex<Faults>,
    writes: AtomicU64,
}

fn poisoned() -> StoreError {
    StoreError::transport("in-memory store lock poisoned")
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| poisoned())
    }

    fn take_fault(&self, pick: impl FnOnce(&mut Faults) -> &mut u32) -> Result<(), StoreError> {
        let mut faults = self.faults.lock().map_err(|_| poisoned())?;
        let remaining = pick(&mut faults);
        if *remaining > 0 {
            *remaining -= 1;
            return Err(StoreError::transport("injected failure"));
        }
        Ok(())
    }

    fn set_fault(&self, pick: impl FnOnce(&mut Faults) -> &mut u32, n: u32) {
        if let Ok(mut faults) = self.faults.lock() {
            *pick(&mut faults) = n;
        }
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    // --- seeding -------------------------------------------------------------

    pub fn insert_deal(&self, deal: Deal) {
        if let Ok(mut state) = self.state.write() {
            state.deals.insert(deal.id, deal);
        }
    }

    pub fn insert_sale(&self, sale: Sale) {
        if let Ok(mut state) = self.state.write() {
            state.sales.push(sale);
        }
    }

    pub fn insert_purchase(&self, purchase: Purchase) {
        if let Ok(mut state) = self.state.write() {
            state.lines.entry(purchase.id).or_default();
            state.purchases.push(purchase);
        }
    }

    pub fn insert_counterparty(&self, counterparty: Counterparty) {
        if let Ok(mut state) = self.state.write() {
            state.counterparties.insert(counterparty.id, counterparty);
        }
    }

    // --- inspection ----------------------------------------------------------

    /// Successful writes so far (creates, updates, uploads, notifications).
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn sales_of(&self, deal_id: DealId) -> Vec<Sale> {
        self.state
            .read()
            .map(|s| s.sales.iter().filter(|x| x.deal_id == deal_id).cloned().collect())
            .unwrap_or_default()
    }

    pub fn stored_file(&self, url: &str) -> Option<FileUpload> {
        self.state.read().ok()?.files.get(url).cloned()
    }

    pub fn notifications(&self) -> Vec<(NotificationId, NotificationPayload)> {
        self.state
            .read()
            .map(|s| s.notifications.clone())
            .unwrap_or_default()
    }

    // --- fault injection -----------------------------------------------------

    /// Fail the next `n` line creates/updates.
    pub fn fail_next_line_writes(&self, n: u32) {
        self.set_fault(|f| &mut f.line_writes, n);
    }

    pub fn fail_next_uploads(&self, n: u32) {
        self.set_fault(|f| &mut f.uploads, n);
    }

    /// Fail the next `n` sale creates/updates (deal updates included).
    pub fn fail_next_sale_writes(&self, n: u32) {
        self.set_fault(|f| &mut f.sale_writes, n);
    }

    pub fn fail_next_notifications(&self, n: u32) {
        self.set_fault(|f| &mut f.notifications, n);
    }
}

#[async_trait]
impl LineRepository for InMemoryStore {
    async fn list_invoice_lines(
        &self,
        purchase_id: PurchaseId,
    ) -> Result<Vec<InvoiceLine>, StoreError> {
        let state = self.read()?;
        Ok(state
            .lines
            .get(&purchase_id)
            .map(|l| l.invoice.clone())
            .unwrap_or_default())
    }

    async fn list_supplier_lines(
        &self,
        purchase_id: PurchaseId,
    ) -> Result<Vec<SupplierLine>, StoreError> {
        let state = self.read()?;
        Ok(state
            .lines
            .get(&purchase_id)
            .map(|l| l.supplier.clone())
            .unwrap_or_default())
    }

    async fn list_logistics_lines(
        &self,
        purchase_id: PurchaseId,
    ) -> Result<Vec<LogisticsLine>, StoreError> {
        let state = self.read()?;
        Ok(state
            .lines
            .get(&purchase_id)
            .map(|l| l.logistics.clone())
            .unwrap_or_default())
    }

    async fn create_line(&self, draft: NewLine) -> Result<Line, StoreError> {
        self.take_fault(|f| &mut f.line_writes)?;
        let mut state = self.write()?;

        let purchase_id = draft.purchase_id();
        let lines = state
            .lines
            .get_mut(&purchase_id)
            .ok_or_else(|| StoreError::not_found(format!("purchase {purchase_id}")))?;

        let line = draft.into_line(LineId::new());
        lines.upsert(line.clone());
        self.count_write();
        Ok(line)
    }

    async fn update_line(
        &self,
        purchase_id: PurchaseId,
        line_id: LineId,
        patch: LinePatch,
    ) -> Result<Line, StoreError> {
        self.take_fault(|f| &mut f.line_writes)?;
        let mut state = self.write()?;

        let lines = state
            .lines
            .get_mut(&purchase_id)
            .ok_or_else(|| StoreError::not_found(format!("purchase {purchase_id}")))?;

        let mut line = lines
            .find(patch.kind(), line_id)
            .ok_or_else(|| StoreError::not_found(format!("{} line {line_id}", patch.kind())))?;

        patch.apply_to(&mut line).map_err(|e| StoreError::Api {
            status: 422,
            message: e.to_string(),
        })?;
        lines.upsert(line.clone());
        self.count_write();
        Ok(line)
    }
}

#[async_trait]
impl SalesRepository for InMemoryStore {
    async fn get_sale(&self, sale_id: SaleId) -> Result<Sale, StoreError> {
        let state = self.read()?;
        state
            .sales
            .iter()
            .find(|s| s.id == sale_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("sale {sale_id}")))
    }

    async fn list_sales(&self, deal_id: DealId) -> Result<Vec<Sale>, StoreError> {
        let state = self.read()?;
        Ok(state
            .sales
            .iter()
            .filter(|s| s.deal_id == deal_id)
            .cloned()
            .collect())
    }

    async fn create_sale(&self, draft: NewSale) -> Result<Sale, StoreError> {
        self.take_fault(|f| &mut f.sale_writes)?;
        let mut state = self.write()?;
        let sale = Sale::from_new(SaleId::new(), draft);
        state.sales.push(sale.clone());
        self.count_write();
        Ok(sale)
    }

    async fn update_sale(&self, sale_id: SaleId, patch: SalePatch) -> Result<Sale, StoreError> {
        self.take_fault(|f| &mut f.sale_writes)?;
        let mut state = self.write()?;
        let sale = state
            .sales
            .iter_mut()
            .find(|s| s.id == sale_id)
            .ok_or_else(|| StoreError::not_found(format!("sale {sale_id}")))?;
        patch.apply_to(sale);
        let sale = sale.clone();
        self.count_write();
        Ok(sale)
    }

    async fn get_deal(&self, deal_id: DealId) -> Result<Deal, StoreError> {
        let state = self.read()?;
        state
            .deals
            .get(&deal_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("deal {deal_id}")))
    }

    async fn update_deal(&self, deal_id: DealId, patch: DealPatch) -> Result<Deal, StoreError> {
        self.take_fault(|f| &mut f.sale_writes)?;
        let mut state = self.write()?;
        let deal = state
            .deals
            .get_mut(&deal_id)
            .ok_or_else(|| StoreError::not_found(format!("deal {deal_id}")))?;
        patch.apply_to(deal);
        let deal = deal.clone();
        self.count_write();
        Ok(deal)
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryStore {
    async fn get_purchase(&self, purchase_id: PurchaseId) -> Result<Purchase, StoreError> {
        let state = self.read()?;
        state
            .purchases
            .iter()
            .find(|p| p.id == purchase_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("purchase {purchase_id}")))
    }

    async fn list_purchases(&self) -> Result<Vec<Purchase>, StoreError> {
        Ok(self.read()?.purchases.clone())
    }

    async fn create_purchase(&self, draft: NewPurchase) -> Result<Purchase, StoreError> {
        let mut state = self.write()?;
        let purchase = draft.into_purchase(PurchaseId::new(), Utc::now());
        state.lines.entry(purchase.id).or_default();
        state.purchases.push(purchase.clone());
        self.count_write();
        Ok(purchase)
    }

    async fn update_purchase(
        &self,
        purchase_id: PurchaseId,
        patch: PurchasePatch,
    ) -> Result<Purchase, StoreError> {
        let mut state = self.write()?;
        let purchase = state
            .purchases
            .iter_mut()
            .find(|p| p.id == purchase_id)
            .ok_or_else(|| StoreError::not_found(format!("purchase {purchase_id}")))?;
        patch.apply_to(purchase);
        let purchase = purchase.clone();
        self.count_write();
        Ok(purchase)
    }
}

#[async_trait]
impl FileStorage for InMemoryStore {
    async fn upload(&self, target: UploadTarget, file: FileUpload) -> Result<String, StoreError> {
        self.take_fault(|f| &mut f.uploads)?;
        let mut state = self.write()?;
        let url = format!("memory://files/{}/{}", target.path(), file.file_name);
        state.files.insert(url.clone(), file);
        self.count_write();
        Ok(url)
    }
}

#[async_trait]
impl ReconciliationNotifier for InMemoryStore {
    async fn notify_all_arrived(&self, event: &AllArrived) -> Result<NotificationId, StoreError> {
        self.take_fault(|f| &mut f.notifications)?;
        let mut state = self.write()?;
        let id = NotificationId::new();
        state.notifications.push((id, event.notification()));
        self.count_write();
        Ok(id)
    }
}

#[async_trait]
impl CounterpartyDirectory for InMemoryStore {
    async fn get_counterparty(&self, id: CounterpartyId) -> Result<Counterparty, StoreError> {
        let state = self.read()?;
        state
            .counterparties
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("counterparty {id}")))
    }
}
