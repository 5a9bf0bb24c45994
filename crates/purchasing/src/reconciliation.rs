//! "All arrived" confirmation.
//!
//! A user confirms that everything procured for a purchase has arrived. The core
//! decides eligibility (`PurchaseLines::is_fully_received`) and the notification
//! payload; delivery and read tracking belong to the notification service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradeops_core::{Actor, DealId, PurchaseId, WorkerId};
use tradeops_events::Event;

/// Fact: a worker confirmed that all goods of a purchase arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllArrived {
    pub purchase_id: PurchaseId,
    pub deal_id: DealId,
    pub request_number: String,
    pub counterparty_name: Option<String>,
    pub confirmed_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

impl Event for AllArrived {
    fn event_type(&self) -> &'static str {
        "purchasing.purchase.all_arrived"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Body of `POST /notifications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub content: String,
    pub created_by: WorkerId,
    pub title: String,
    pub seen_by: Vec<WorkerId>,
}

impl AllArrived {
    pub fn notification(&self) -> NotificationPayload {
        let counterparty = self
            .counterparty_name
            .as_deref()
            .map(|name| format!(" ({name})"))
            .unwrap_or_default();

        NotificationPayload {
            title: format!("All arrived: request {}", self.request_number),
            content: format!(
                "All goods for request {}{} have arrived. Confirmed by {} at {}.",
                self.request_number,
                counterparty,
                self.confirmed_by.name,
                self.occurred_at.format("%d.%m.%Y %H:%M UTC"),
            ),
            created_by: self.confirmed_by.id,
            seen_by: Vec::new(),
        }
    }
}
