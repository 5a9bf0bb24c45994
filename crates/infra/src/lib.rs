//! Infrastructure layer: store seams, configuration and the core services.
//!
//! The backing store is an external HTTP service; everything here talks to it
//! through the async traits in [`repository`], [`files`] and [`notifier`]. The
//! services compose those traits with the pure rules of the sales and purchasing
//! crates and publish a change notice after every successful write.

pub mod config;
pub mod error;
pub mod files;
pub mod in_memory;
pub mod notifier;
pub mod repository;
pub mod services;

#[cfg(test)]
mod integration_tests;

pub use config::CoreConfig;
pub use error::{CoreError, CoreResult, StoreError};
pub use files::{FileStorage, FileUpload, UploadTarget};
pub use in_memory::InMemoryStore;
pub use notifier::{CounterpartyDirectory, ReconciliationNotifier};
pub use repository::{LineRepository, PurchaseRepository, SalesRepository};
pub use services::{
    Attachment, LineService, Progression, ProgressionEffect, PurchaseService, PurchaseView,
    SaleProgressionEngine,
};
