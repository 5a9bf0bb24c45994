//! `tradeops-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, money, the domain error model and the read-only reference data
//! (actors, counterparties) the sale and purchase rules consult.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod reference;
pub mod value_object;

pub use entity::{Entity, upsert};
pub use error::{DomainError, DomainResult};
pub use id::{CounterpartyId, DealId, LineId, NotificationId, PurchaseId, SaleId, WorkerId};
pub use money::Money;
pub use reference::{Actor, Counterparty, WorkerRole};
pub use value_object::ValueObject;
