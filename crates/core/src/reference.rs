//! Read-only reference data consumed by the core.
//!
//! Workers, departments and counterparties are owned elsewhere; the core only reads
//! a worker's role (eligibility checks) and a counterparty's name (notification text).

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::{CounterpartyId, WorkerId};

/// Role of a worker as reported by the staffing service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRole {
    Director,
    Purchaser,
    SalesManager,
    Logistician,
    Accountant,
}

impl WorkerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerRole::Director => "DIRECTOR",
            WorkerRole::Purchaser => "PURCHASER",
            WorkerRole::SalesManager => "SALES_MANAGER",
            WorkerRole::Logistician => "LOGISTICIAN",
            WorkerRole::Accountant => "ACCOUNTANT",
        }
    }
}

impl core::str::FromStr for WorkerRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DIRECTOR" => Ok(WorkerRole::Director),
            "PURCHASER" => Ok(WorkerRole::Purchaser),
            "SALES_MANAGER" => Ok(WorkerRole::SalesManager),
            "LOGISTICIAN" => Ok(WorkerRole::Logistician),
            "ACCOUNTANT" => Ok(WorkerRole::Accountant),
            other => Err(DomainError::validation(format!("unknown worker role: {other}"))),
        }
    }
}

/// The worker performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: WorkerId,
    pub name: String,
    pub role: WorkerRole,
}

impl Actor {
    pub fn new(id: WorkerId, name: impl Into<String>, role: WorkerRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }
}

/// Customer or supplier organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterparty {
    pub id: CounterpartyId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inn: Option<String>,
}
