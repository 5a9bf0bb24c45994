//! Error taxonomy of the core services.
//!
//! - [`DomainError`]: validation and eligibility failures. Nothing was written.
//! - [`CoreError::LineWrite`] / [`CoreError::ProgressionWrite`] / [`CoreError::PurchaseWrite`]:
//!   the store rejected or never received a write. Not retried; existing rows were
//!   not modified.
//! - [`CoreError::AttachPartialFailure`]: the document is stored but its owner does
//!   not point at it yet. Retry the attach with the returned URL, not the upload.

use thiserror::Error;

use tradeops_core::DomainError;
use tradeops_purchasing::LineKind;

use crate::files::UploadTarget;

/// Failure talking to the backing store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("store responded {status}: {message}")]
    Api { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed store response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Worth retrying: the request may not have reached the store, or the store
    /// failed on its side.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transport(_) => true,
            StoreError::Api { status, .. } => *status >= 500,
            StoreError::NotFound(_) | StoreError::Decode(_) => false,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("failed to write {kind} line: {cause}")]
    LineWrite {
        kind: LineKind,
        #[source]
        cause: StoreError,
    },

    #[error("failed to persist sale progression: {0}")]
    ProgressionWrite(#[source] StoreError),

    #[error("failed to write purchase: {0}")]
    PurchaseWrite(#[source] StoreError),

    #[error("document stored at {url} but linking it to {target} failed: {cause}")]
    AttachPartialFailure {
        target: UploadTarget,
        url: String,
        #[source]
        cause: StoreError,
    },

    #[error("failed to read {what}: {cause}")]
    Read {
        what: &'static str,
        #[source]
        cause: StoreError,
    },

    #[error("failed to send notification: {0}")]
    Notify(#[source] StoreError),
}

impl CoreError {
    pub fn read(what: &'static str) -> impl FnOnce(StoreError) -> CoreError {
        move |cause| CoreError::Read { what, cause }
    }

    pub fn line_write(kind: LineKind) -> impl FnOnce(StoreError) -> CoreError {
        move |cause| CoreError::LineWrite { kind, cause }
    }

    /// Validation failures are shown inline; nothing was attempted against the store.
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Domain(e) if e.is_validation())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::Domain(DomainError::NotFound)
                | CoreError::Read {
                    cause: StoreError::NotFound(_),
                    ..
                }
        )
    }

    /// The URL to re-attach with, when only the patch leg of an attach failed.
    pub fn pending_attachment_url(&self) -> Option<&str> {
        match self {
            CoreError::AttachPartialFailure { url, .. } => Some(url),
            _ => None,
        }
    }
}
