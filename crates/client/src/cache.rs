//! Local purchase-view cache.
//!
//! Views are stored as loaded, then kept current from the responses of the
//! client's own writes (`apply_*`). Totals are never patched: any change to a
//! purchase's lines or sale drops its summary, and the next read recomputes it
//! from the cached snapshot. Notices about writes made elsewhere evict the
//! affected views instead, since their new content is unknown here.
//!
//! Every sale row seen for a deal is kept, and the row shown is picked with
//! [`current_snapshot`], the same rule a fresh load applies. Writing to an older
//! row therefore never hides a later progressed one.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use tradeops_core::{DealId, PurchaseId, upsert};
use tradeops_events::{AggregateChanged, AggregateRef, Subscription};
use tradeops_infra::PurchaseView;
use tradeops_purchasing::{Line, Purchase, PurchaseLines, PurchaseSummary, summarize};
use tradeops_sales::{Sale, current_snapshot};

#[derive(Debug, Clone)]
struct CachedPurchase {
    purchase: Purchase,
    lines: PurchaseLines,
    sale_rows: Vec<Sale>,
    summary: Option<PurchaseSummary>,
    cached_at: DateTime<Utc>,
}

impl CachedPurchase {
    fn sale(&self) -> Option<&Sale> {
        current_snapshot(&self.sale_rows)
    }

    /// `None` when the cached figures do not add up; the view is then not served.
    fn summary(&mut self) -> Option<PurchaseSummary> {
        if let Some(summary) = &self.summary {
            return Some(summary.clone());
        }
        let sale_amount = self.sale().and_then(Sale::effective_sale_amount);
        match summarize(&self.lines, sale_amount) {
            Ok(summary) => {
                self.summary = Some(summary.clone());
                Some(summary)
            }
            Err(err) => {
                tracing::warn!(
                    purchase_id = %self.purchase.id,
                    error = %err,
                    "cannot total cached purchase"
                );
                None
            }
        }
    }

    fn touch(&mut self) {
        self.summary = None;
        self.cached_at = Utc::now();
    }
}

#[derive(Debug, Default)]
pub struct LocalCache {
    purchases: RwLock<HashMap<PurchaseId, CachedPurchase>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_view(&self, view: &PurchaseView) {
        let Ok(mut purchases) = self.purchases.write() else {
            tracing::error!("purchase cache lock poisoned");
            return;
        };
        purchases.insert(
            view.purchase.id,
            CachedPurchase {
                purchase: view.purchase.clone(),
                lines: view.lines.clone(),
                sale_rows: view.sale.iter().cloned().collect(),
                summary: Some(view.summary.clone()),
                cached_at: Utc::now(),
            },
        );
    }

    /// The cached view, unless it is older than `max_age`.
    pub fn view(&self, purchase_id: PurchaseId, max_age: Option<Duration>) -> Option<PurchaseView> {
        let mut purchases = self.purchases.write().ok()?;
        let entry = purchases.get_mut(&purchase_id)?;

        if let Some(max_age) = max_age {
            if Utc::now() - entry.cached_at > max_age {
                tracing::debug!(%purchase_id, "cached purchase view is stale");
                return None;
            }
        }

        let summary = entry.summary()?;
        Some(PurchaseView {
            purchase: entry.purchase.clone(),
            lines: entry.lines.clone(),
            sale: entry.sale().cloned(),
            summary,
        })
    }

    pub fn summary(&self, purchase_id: PurchaseId) -> Option<PurchaseSummary> {
        let mut purchases = self.purchases.write().ok()?;
        purchases.get_mut(&purchase_id)?.summary()
    }

    /// Apply a purchase header returned by a write.
    pub fn apply_purchase(&self, purchase: &Purchase) {
        self.with_entry(purchase.id, |entry| {
            entry.purchase = purchase.clone();
            entry.cached_at = Utc::now();
        });
    }

    /// Apply a line returned by a create or update.
    pub fn apply_line(&self, line: &Line) {
        self.with_entry(line.purchase_id(), |entry| {
            entry.lines.upsert(line.clone());
            entry.touch();
        });
    }

    /// Apply a sale row returned by a write to every cached purchase of its deal.
    /// The row shown afterwards is the deal's current snapshot, which need not be
    /// the row just written.
    pub fn apply_sale(&self, sale: &Sale) {
        let Ok(mut purchases) = self.purchases.write() else {
            return;
        };
        for entry in purchases
            .values_mut()
            .filter(|e| e.purchase.deal_id == sale.deal_id)
        {
            upsert(&mut entry.sale_rows, sale.clone());
            entry.touch();
        }
    }

    /// Evict whatever a notice refers to.
    pub fn invalidate(&self, notice: &AggregateChanged) {
        let Ok(mut purchases) = self.purchases.write() else {
            return;
        };
        match notice.aggregate {
            AggregateRef::Deal { deal_id } | AggregateRef::Sale { deal_id, .. } => {
                evict_deal(&mut purchases, deal_id)
            }
            other => {
                if let Some(purchase_id) = other.purchase_id() {
                    purchases.remove(&purchase_id);
                }
            }
        }
    }

    /// Evict for every notice queued on `subscription`; returns how many were seen.
    pub fn invalidate_from(&self, subscription: &Subscription<AggregateChanged>) -> usize {
        let notices = subscription.drain();
        for notice in &notices {
            self.invalidate(notice);
        }
        notices.len()
    }

    pub fn len(&self) -> usize {
        self.purchases.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_entry(&self, purchase_id: PurchaseId, f: impl FnOnce(&mut CachedPurchase)) {
        let Ok(mut purchases) = self.purchases.write() else {
            return;
        };
        if let Some(entry) = purchases.get_mut(&purchase_id) {
            f(entry);
        }
    }
}

fn evict_deal(purchases: &mut HashMap<PurchaseId, CachedPurchase>, deal_id: DealId) {
    purchases.retain(|_, entry| entry.purchase.deal_id != deal_id);
}
