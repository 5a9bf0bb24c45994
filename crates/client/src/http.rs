//! HTTP adapter for the backing service.
//!
//! Routes:
//! - `GET/POST /purchases`, `GET/PUT /purchases/{id}`
//! - `GET /purchases/{id}/{kind}-lines`, `POST /purchases/{id}/{kind}-line`,
//!   `PUT /purchases/{id}/{kind}-line/{lineId}` for `kind` in invoice/supplier/logistics
//! - `GET /sales?dealId=`, `POST /sales`, `GET/PUT /sales/{id}`
//! - `GET/PUT /deals/{id}`, `GET /counterparties/{id}`
//! - `POST /files/upload/{pdf|supplier-pdf|logistics-pdf}/{id}` (multipart, field `file`)
//! - `POST /notifications`
//!
//! Nothing here retries; retry policy belongs to the services.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use tradeops_core::{
    Counterparty, CounterpartyId, DealId, LineId, NotificationId, PurchaseId, SaleId,
};
use tradeops_infra::{
    CounterpartyDirectory, FileStorage, FileUpload, LineRepository, PurchaseRepository,
    ReconciliationNotifier, SalesRepository, StoreError, UploadTarget,
};
use tradeops_purchasing::{
    AllArrived, InvoiceLine, Line, LineKind, LinePatch, LogisticsLine, NewLine, NewPurchase,
    Purchase, PurchasePatch, SupplierLine,
};
use tradeops_sales::{Deal, DealPatch, NewSale, Sale, SalePatch};

use crate::config::ClientConfig;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct NotificationCreated {
    id: NotificationId,
}

/// reqwest-backed store. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl HttpStore {
    pub fn new(config: &ClientConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.client.request(method, format!("{}{}", self.api_url, path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> Result<T, StoreError> {
        let resp = req.send().await.map_err(|e| {
            tracing::warn!("Request for {} failed: {}", what, e);
            StoreError::transport(e.to_string())
        })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(what));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), what, "store rejected request");
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| StoreError::Decode(format!("{what}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, StoreError> {
        tracing::debug!(path, "GET");
        self.send(self.request(Method::GET, path), what).await
    }

    async fn post<B, T>(&self, path: &str, body: &B, what: &str) -> Result<T, StoreError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!(path, "POST");
        self.send(self.request(Method::POST, path).json(body), what)
            .await
    }

    async fn put<B, T>(&self, path: &str, body: &B, what: &str) -> Result<T, StoreError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!(path, "PUT");
        self.send(self.request(Method::PUT, path).json(body), what)
            .await
    }
}

fn line_segment(kind: LineKind) -> &'static str {
    match kind {
        LineKind::Invoice => "invoice-line",
        LineKind::Supplier => "supplier-line",
        LineKind::Logistics => "logistics-line",
    }
}

fn lines_path(purchase_id: PurchaseId, kind: LineKind) -> String {
    format!("/purchases/{purchase_id}/{}s", line_segment(kind))
}

fn line_path(purchase_id: PurchaseId, kind: LineKind) -> String {
    format!("/purchases/{purchase_id}/{}", line_segment(kind))
}

#[async_trait]
impl LineRepository for HttpStore {
    async fn list_invoice_lines(
        &self,
        purchase_id: PurchaseId,
    ) -> Result<Vec<InvoiceLine>, StoreError> {
        self.get(&lines_path(purchase_id, LineKind::Invoice), "invoice lines")
            .await
    }

    async fn list_supplier_lines(
        &self,
        purchase_id: PurchaseId,
    ) -> Result<Vec<SupplierLine>, StoreError> {
        self.get(&lines_path(purchase_id, LineKind::Supplier), "supplier lines")
            .await
    }

    async fn list_logistics_lines(
        &self,
        purchase_id: PurchaseId,
    ) -> Result<Vec<LogisticsLine>, StoreError> {
        self.get(&lines_path(purchase_id, LineKind::Logistics), "logistics lines")
            .await
    }

    async fn create_line(&self, draft: NewLine) -> Result<Line, StoreError> {
        let path = line_path(draft.purchase_id(), draft.kind());
        let line = match &draft {
            NewLine::Invoice(body) => Line::Invoice(self.post(&path, body, "invoice line").await?),
            NewLine::Supplier(body) => {
                Line::Supplier(self.post(&path, body, "supplier line").await?)
            }
            NewLine::Logistics(body) => {
                Line::Logistics(self.post(&path, body, "logistics line").await?)
            }
        };
        tracing::info!(kind = %line.kind(), line_id = %line.id(), "line created");
        Ok(line)
    }

    async fn update_line(
        &self,
        purchase_id: PurchaseId,
        line_id: LineId,
        patch: LinePatch,
    ) -> Result<Line, StoreError> {
        let path = format!("{}/{line_id}", line_path(purchase_id, patch.kind()));
        let line = match &patch {
            LinePatch::Invoice(body) => Line::Invoice(self.put(&path, body, "invoice line").await?),
            LinePatch::Supplier(body) => {
                Line::Supplier(self.put(&path, body, "supplier line").await?)
            }
            LinePatch::Logistics(body) => {
                Line::Logistics(self.put(&path, body, "logistics line").await?)
            }
        };
        tracing::info!(kind = %line.kind(), %line_id, "line updated");
        Ok(line)
    }
}

#[async_trait]
impl SalesRepository for HttpStore {
    async fn get_sale(&self, sale_id: SaleId) -> Result<Sale, StoreError> {
        self.get(&format!("/sales/{sale_id}"), "sale").await
    }

    async fn list_sales(&self, deal_id: DealId) -> Result<Vec<Sale>, StoreError> {
        self.get(&format!("/sales?dealId={deal_id}"), "sales").await
    }

    async fn create_sale(&self, draft: NewSale) -> Result<Sale, StoreError> {
        let sale: Sale = self.post("/sales", &draft, "sale").await?;
        tracing::info!(sale_id = %sale.id, deal_id = %sale.deal_id, "sale created");
        Ok(sale)
    }

    async fn update_sale(&self, sale_id: SaleId, patch: SalePatch) -> Result<Sale, StoreError> {
        let sale = self
            .put(&format!("/sales/{sale_id}"), &patch, "sale")
            .await?;
        tracing::info!(%sale_id, "sale updated");
        Ok(sale)
    }

    async fn get_deal(&self, deal_id: DealId) -> Result<Deal, StoreError> {
        self.get(&format!("/deals/{deal_id}"), "deal").await
    }

    async fn update_deal(&self, deal_id: DealId, patch: DealPatch) -> Result<Deal, StoreError> {
        let deal = self
            .put(&format!("/deals/{deal_id}"), &patch, "deal")
            .await?;
        tracing::info!(%deal_id, "deal updated");
        Ok(deal)
    }
}

#[async_trait]
impl PurchaseRepository for HttpStore {
    async fn get_purchase(&self, purchase_id: PurchaseId) -> Result<Purchase, StoreError> {
        self.get(&format!("/purchases/{purchase_id}"), "purchase")
            .await
    }

    async fn list_purchases(&self) -> Result<Vec<Purchase>, StoreError> {
        self.get("/purchases", "purchases").await
    }

    async fn create_purchase(&self, draft: NewPurchase) -> Result<Purchase, StoreError> {
        let purchase: Purchase = self.post("/purchases", &draft, "purchase").await?;
        tracing::info!(purchase_id = %purchase.id, "purchase created");
        Ok(purchase)
    }

    async fn update_purchase(
        &self,
        purchase_id: PurchaseId,
        patch: PurchasePatch,
    ) -> Result<Purchase, StoreError> {
        let purchase = self
            .put(&format!("/purchases/{purchase_id}"), &patch, "purchase")
            .await?;
        tracing::info!(%purchase_id, "purchase updated");
        Ok(purchase)
    }
}

#[async_trait]
impl FileStorage for HttpStore {
    async fn upload(&self, target: UploadTarget, file: FileUpload) -> Result<String, StoreError> {
        let size = file.bytes.len();
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|e| StoreError::transport(format!("invalid content type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let path = format!("/files/upload/{}", target.path());
        tracing::debug!(path, size, "POST multipart");
        let resp: UploadResponse = self
            .send(self.request(Method::POST, &path).multipart(form), "upload")
            .await?;

        tracing::info!(%target, url = %resp.url, "document uploaded");
        Ok(resp.url)
    }
}

#[async_trait]
impl ReconciliationNotifier for HttpStore {
    async fn notify_all_arrived(&self, event: &AllArrived) -> Result<NotificationId, StoreError> {
        let created: NotificationCreated = self
            .post("/notifications", &event.notification(), "notification")
            .await?;
        tracing::info!(
            purchase_id = %event.purchase_id,
            notification_id = %created.id,
            "notification posted"
        );
        Ok(created.id)
    }
}

#[async_trait]
impl CounterpartyDirectory for HttpStore {
    async fn get_counterparty(&self, id: CounterpartyId) -> Result<Counterparty, StoreError> {
        self.get(&format!("/counterparties/{id}"), "counterparty")
            .await
    }
}
