//! External collaborators: notification service and counterparty directory.

use async_trait::async_trait;

use tradeops_core::{Counterparty, CounterpartyId, NotificationId};
use tradeops_purchasing::AllArrived;

use crate::error::StoreError;

/// Accepts "all arrived" confirmations. Delivery and seen-tracking are its concern.
#[async_trait]
pub trait ReconciliationNotifier: Send + Sync {
    async fn notify_all_arrived(&self, event: &AllArrived) -> Result<NotificationId, StoreError>;
}

/// Read-only lookup of counterparty reference data.
#[async_trait]
pub trait CounterpartyDirectory: Send + Sync {
    async fn get_counterparty(&self, id: CounterpartyId) -> Result<Counterparty, StoreError>;
}
