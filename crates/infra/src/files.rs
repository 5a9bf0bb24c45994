//! File storage seam.
//!
//! Storing bytes is the storage service's job; the core only needs an upload that
//! answers with the URL to record on the owning line or sale.

use async_trait::async_trait;

use tradeops_core::{DomainError, DomainResult, LineId, SaleId};
use tradeops_purchasing::LineKind;

use crate::error::StoreError;

/// What an uploaded document belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UploadTarget {
    SalePdf(SaleId),
    SupplierPdf(LineId),
    LogisticsPdf(LineId),
}

impl UploadTarget {
    pub fn for_line(kind: LineKind, line_id: LineId) -> DomainResult<Self> {
        match kind {
            LineKind::Supplier => Ok(UploadTarget::SupplierPdf(line_id)),
            LineKind::Logistics => Ok(UploadTarget::LogisticsPdf(line_id)),
            LineKind::Invoice => Err(DomainError::validation(
                "invoice lines do not carry documents",
            )),
        }
    }

    /// Upload route segment: `{pdf|supplier-pdf|logistics-pdf}/{id}`.
    pub fn path(&self) -> String {
        match self {
            UploadTarget::SalePdf(id) => format!("pdf/{id}"),
            UploadTarget::SupplierPdf(id) => format!("supplier-pdf/{id}"),
            UploadTarget::LogisticsPdf(id) => format!("logistics-pdf/{id}"),
        }
    }
}

impl core::fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UploadTarget::SalePdf(id) => write!(f, "sale {id}"),
            UploadTarget::SupplierPdf(id) => write!(f, "supplier line {id}"),
            UploadTarget::LogisticsPdf(id) => write!(f, "logistics line {id}"),
        }
    }
}

/// A document to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "application/pdf".to_string(),
            bytes,
        }
    }
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store the document and return its URL.
    async fn upload(&self, target: UploadTarget, file: FileUpload) -> Result<String, StoreError>;
}
