//! Line writes: create, update and document attach for the three line kinds.

use std::sync::Arc;

use tradeops_core::{Actor, DomainResult, LineId, PurchaseId};
use tradeops_events::{AggregateChanged, ChangeKind, EventBus};
use tradeops_purchasing::{
    Line, LineKind, LinePatch, NewLine, PurchaseLines, ensure_can_edit_supplier_lines,
};

use super::attach::{Attachment, link_with_retry};
use super::{line_ref, publish};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::files::{FileStorage, FileUpload, UploadTarget};
use crate::repository::LineRepository;

pub struct LineService<R, F, B> {
    repo: Arc<R>,
    files: Arc<F>,
    bus: B,
    config: CoreConfig,
}

impl<R, F, B> LineService<R, F, B>
where
    R: LineRepository,
    F: FileStorage,
    B: EventBus<AggregateChanged>,
{
    pub fn new(repo: Arc<R>, files: Arc<F>, bus: B, config: CoreConfig) -> Self {
        Self {
            repo,
            files,
            bus,
            config,
        }
    }

    pub async fn list_lines(&self, purchase_id: PurchaseId) -> CoreResult<PurchaseLines> {
        self.repo
            .list_lines(purchase_id)
            .await
            .map_err(CoreError::read("purchase lines"))
    }

    /// Validate and create a line. Nothing is written when validation fails.
    pub async fn create_line(&self, actor: &Actor, draft: NewLine) -> CoreResult<Line> {
        let kind = draft.kind();
        authorize(actor, kind)?;
        draft.validate()?;

        let line = self
            .repo
            .create_line(draft)
            .await
            .map_err(CoreError::line_write(kind))?;

        tracing::debug!(kind = %kind, line_id = %line.id(), "line created");
        publish(&self.bus, line_ref(&line), ChangeKind::Created);
        Ok(line)
    }

    /// Validate and apply a partial update.
    pub async fn update_line(
        &self,
        actor: &Actor,
        purchase_id: PurchaseId,
        line_id: LineId,
        patch: LinePatch,
    ) -> CoreResult<Line> {
        let kind = patch.kind();
        authorize(actor, kind)?;
        patch.validate()?;

        let line = self
            .repo
            .update_line(purchase_id, line_id, patch)
            .await
            .map_err(CoreError::line_write(kind))?;

        tracing::debug!(kind = %kind, %line_id, "line updated");
        publish(&self.bus, line_ref(&line), ChangeKind::Updated);
        Ok(line)
    }

    /// Upload a document and point the line at it.
    ///
    /// A failed upload is a [`CoreError::LineWrite`] and the line is untouched. When
    /// the upload succeeds but every patch attempt fails the result is
    /// [`CoreError::AttachPartialFailure`] carrying the stored URL; pass it to
    /// [`LineService::reattach`] instead of uploading again.
    pub async fn attach_file(
        &self,
        actor: &Actor,
        purchase_id: PurchaseId,
        kind: LineKind,
        line_id: LineId,
        file: FileUpload,
    ) -> CoreResult<Attachment<Line>> {
        authorize(actor, kind)?;
        let target = UploadTarget::for_line(kind, line_id)?;

        let url = self
            .files
            .upload(target, file)
            .await
            .map_err(CoreError::line_write(kind))?;
        tracing::debug!(%target, %url, "document uploaded");

        self.link(purchase_id, kind, line_id, target, url).await
    }

    /// Re-run only the patch leg of an attach, with a URL from an earlier upload.
    pub async fn reattach(
        &self,
        actor: &Actor,
        purchase_id: PurchaseId,
        kind: LineKind,
        line_id: LineId,
        url: String,
    ) -> CoreResult<Attachment<Line>> {
        authorize(actor, kind)?;
        let target = UploadTarget::for_line(kind, line_id)?;
        self.link(purchase_id, kind, line_id, target, url).await
    }

    async fn link(
        &self,
        purchase_id: PurchaseId,
        kind: LineKind,
        line_id: LineId,
        target: UploadTarget,
        url: String,
    ) -> CoreResult<Attachment<Line>> {
        let patch = LinePatch::attach(kind, url.clone())?;
        let repo = &*self.repo;

        let line = link_with_retry(&self.config, target, move || {
            repo.update_line(purchase_id, line_id, patch.clone())
        })
        .await
        .map_err(|cause| CoreError::AttachPartialFailure {
            target,
            url: url.clone(),
            cause,
        })?;

        publish(&self.bus, line_ref(&line), ChangeKind::FileAttached);
        Ok(Attachment { url, record: line })
    }
}

fn authorize(actor: &Actor, kind: LineKind) -> DomainResult<()> {
    match kind {
        LineKind::Supplier => ensure_can_edit_supplier_lines(actor),
        LineKind::Invoice | LineKind::Logistics => Ok(()),
    }
}
