//! Sales domain module: deals, sale rows and sale progression.
//!
//! This crate contains business rules only, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage). Decisions are returned as
//! [`SaleWrite`] values that the infrastructure layer executes.

pub mod deal;
pub mod progression;
pub mod sale;

pub use deal::{Deal, DealPatch, DealStage};
pub use progression::{SaleCommand, SaleWrite};
pub use sale::{
    DeliveryStage, NewSale, Sale, SaleLifecycle, SalePatch, SigningStage, current_snapshot,
    open_row,
};
