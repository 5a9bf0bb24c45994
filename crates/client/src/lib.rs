//! `tradeops-client`
//!
//! **Responsibility:** talking to the backing REST service.
//!
//! This crate provides:
//! - [`HttpStore`], the reqwest implementation of every infra store seam
//! - [`LocalCache`], purchase views kept current from write responses
//! - [`ClientConfig`] and the argument parsing of the `tradeops` binary
//!
//! The service remains the authority; nothing here writes offline.

pub mod cache;
pub mod cli;
pub mod config;
pub mod http;

pub use cache::LocalCache;
pub use cli::Command;
pub use config::ClientConfig;
pub use http::HttpStore;
