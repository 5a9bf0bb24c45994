//! End-to-end tests of the core services against the in-memory store.

use std::sync::Arc;

use chrono::NaiveDate;

use tradeops_core::{
    Actor, Counterparty, CounterpartyId, DealId, DomainError, LineId, Money, PurchaseId, SaleId,
    WorkerId, WorkerRole,
};
use tradeops_events::{AggregateChanged, AggregateRef, ChangeKind, EventBus, InMemoryEventBus};
use tradeops_purchasing::{
    InvoiceLinePatch, Line, LineKind, LinePatch, LogisticsDestination, NewInvoiceLine, NewLine,
    NewLogisticsLine, NewPurchase, NewSupplierLine, Purchase, SupplierLinePatch,
};
use tradeops_sales::{Deal, DealStage, DeliveryStage, Sale, SigningStage};

use crate::{
    CoreConfig, CoreError, FileUpload, InMemoryStore, LineService, ProgressionEffect,
    PurchaseService, SaleProgressionEngine, UploadTarget,
};

type Bus = Arc<InMemoryEventBus<AggregateChanged>>;

struct Fixture {
    store: Arc<InMemoryStore>,
    bus: Bus,
    deal: Deal,
    purchase: Purchase,
}

fn test_config() -> CoreConfig {
    CoreConfig::default().without_backoff()
}

fn test_fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let counterparty = Counterparty {
        id: CounterpartyId::new(),
        name: "OOO Vector".to_string(),
        inn: Some("7701234567".to_string()),
    };
    let deal = Deal {
        id: DealId::new(),
        request_number: "Z-1042".to_string(),
        counterparty_id: counterparty.id,
        stage: DealStage::InProgress,
        turnover_rub: None,
        margin_rub: None,
        purchase_id: None,
        sale_id: None,
        loss_reason: None,
        created_by: None,
    };
    let purchase = Purchase {
        id: PurchaseId::new(),
        deal_id: deal.id,
        request_number: deal.request_number.clone(),
        counterparty_id: Some(counterparty.id),
        comment: None,
        created_at: None,
    };

    store.insert_counterparty(counterparty);
    store.insert_deal(deal.clone());
    store.insert_purchase(purchase.clone());

    Fixture {
        store,
        bus: Arc::new(InMemoryEventBus::new()),
        deal,
        purchase,
    }
}

fn test_open_sale(deal: &Deal, margin: Option<Money>) -> Sale {
    Sale {
        id: SaleId::new(),
        deal_id: deal.id,
        counterparty_id: deal.counterparty_id,
        sale_amount: Some(Money::from_rubles(50_000)),
        total_sale_amount: Some(Money::from_rubles(50_000)),
        paid_now: None,
        prepayment_amount: None,
        logistics_cost: None,
        purchase_cost: None,
        margin,
        delivery_stage: Some(DeliveryStage::PurchasedForOrder),
        signing_stage: None,
        status_set_date: None,
        progressed: false,
        pdf_url: None,
    }
}

fn test_actor(role: WorkerRole) -> Actor {
    Actor::new(WorkerId::new(), "Irina Petrova", role)
}

fn engine(f: &Fixture) -> SaleProgressionEngine<InMemoryStore, InMemoryStore, Bus> {
    SaleProgressionEngine::new(f.store.clone(), f.store.clone(), f.bus.clone(), test_config())
}

fn line_service(f: &Fixture) -> LineService<InMemoryStore, InMemoryStore, Bus> {
    LineService::new(f.store.clone(), f.store.clone(), f.bus.clone(), test_config())
}

fn purchase_service(f: &Fixture) -> PurchaseService<InMemoryStore, InMemoryStore, Bus> {
    PurchaseService::new(f.store.clone(), f.store.clone(), f.bus.clone())
}

fn supplier_draft(purchase_id: PurchaseId, amount: i64, delivered: bool) -> NewLine {
    NewLine::Supplier(NewSupplierLine {
        purchase_id,
        supplier_id: None,
        article: "Bearing 6204".to_string(),
        quantity: 10,
        total_purchase_amount: Money::from_rubles(amount),
        delivered,
        payment_date: None,
        shipment_date: None,
        supplier_invoice: None,
    })
}

fn logistics_draft(purchase_id: PurchaseId, amount: i64, date: Option<NaiveDate>) -> NewLine {
    NewLine::Logistics(NewLogisticsLine {
        purchase_id,
        amount: Money::from_rubles(amount),
        carrier: "Delovye Linii".to_string(),
        date,
        destination: LogisticsDestination::ToClient,
    })
}

fn supplier_line_id(line: &Line) -> LineId {
    match line {
        Line::Supplier(l) => l.id,
        other => panic!("Expected supplier line, got {other:?}"),
    }
}

// --- sale progression ---------------------------------------------------------

#[tokio::test]
async fn signing_without_margin_writes_nothing() {
    let f = test_fixture();
    let sale = test_open_sale(&f.deal, None);
    f.store.insert_sale(sale.clone());

    let err = engine(&f)
        .set_signing_stage(&sale, SigningStage::SignedOnPaper)
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(f.store.sales_of(f.deal.id), vec![sale]);
    assert_eq!(f.store.write_count(), 0);
}

#[tokio::test]
async fn signing_an_open_row_spawns_a_progressed_row() {
    let f = test_fixture();
    let sale = test_open_sale(&f.deal, Some(Money::from_rubles(1000)));
    f.store.insert_sale(sale.clone());
    let notices = f.bus.subscribe();

    let progression = engine(&f)
        .set_signing_stage(&sale, SigningStage::SignedInEdo)
        .await
        .unwrap();

    assert_eq!(progression.effect, ProgressionEffect::Spawned { from: sale.id });
    assert_ne!(progression.sale.id, sale.id);
    assert_eq!(progression.sale.signing_stage, Some(SigningStage::SignedInEdo));
    assert!(progression.sale.progressed);
    assert!(progression.sale.status_set_date.is_some());
    assert_eq!(progression.sale.margin, Some(Money::from_rubles(1000)));

    let rows = f.store.sales_of(f.deal.id);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], sale, "open row must be left untouched");

    let current = engine(&f).current_sale(f.deal.id).await.unwrap();
    assert_eq!(current.map(|s| s.id), Some(progression.sale.id));

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.change, ChangeKind::Spawned { from: sale.id });
}

#[tokio::test]
async fn resigning_a_progressed_row_updates_in_place() {
    let f = test_fixture();
    let sale = test_open_sale(&f.deal, Some(Money::from_rubles(1000)));
    f.store.insert_sale(sale.clone());
    let engine = engine(&f);

    let signed = engine
        .set_signing_stage(&sale, SigningStage::SignedOnPaper)
        .await
        .unwrap()
        .sale;
    let corrected = engine
        .set_signing_stage(&signed, SigningStage::SignedInEdo)
        .await
        .unwrap();

    assert_eq!(corrected.effect, ProgressionEffect::Updated);
    assert_eq!(corrected.sale.id, signed.id);
    assert_eq!(corrected.sale.signing_stage, Some(SigningStage::SignedInEdo));
    assert_eq!(f.store.sales_of(f.deal.id).len(), 2);
}

#[tokio::test]
async fn repeating_the_delivery_stage_is_a_no_op() {
    let f = test_fixture();
    let sale = test_open_sale(&f.deal, None);
    f.store.insert_sale(sale.clone());
    let engine = engine(&f);

    let moved = engine
        .set_delivery_stage(&sale, DeliveryStage::ItemSent)
        .await
        .unwrap();
    assert_eq!(moved.effect, ProgressionEffect::Updated);
    assert_eq!(f.store.write_count(), 1);

    let again = engine
        .set_delivery_stage(&moved.sale, DeliveryStage::ItemSent)
        .await
        .unwrap();
    assert_eq!(again.effect, ProgressionEffect::Unchanged);
    assert_eq!(f.store.write_count(), 1);
}

#[tokio::test]
async fn failed_spawn_leaves_the_deal_unchanged() {
    let f = test_fixture();
    let sale = test_open_sale(&f.deal, Some(Money::from_rubles(1000)));
    f.store.insert_sale(sale.clone());
    f.store.fail_next_sale_writes(1);

    let err = engine(&f)
        .set_signing_stage(&sale, SigningStage::SignedOnPaper)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::ProgressionWrite(_)));
    assert_eq!(f.store.sales_of(f.deal.id), vec![sale]);
}

#[tokio::test]
async fn applying_purchase_costs_recomputes_margin() {
    let f = test_fixture();
    let sale = test_open_sale(&f.deal, None);
    f.store.insert_sale(sale.clone());
    let actor = test_actor(WorkerRole::Purchaser);
    let lines = line_service(&f);
    lines
        .create_line(&actor, supplier_draft(f.purchase.id, 30_000, false))
        .await
        .unwrap();
    lines
        .create_line(&actor, logistics_draft(f.purchase.id, 5_800, None))
        .await
        .unwrap();

    let view = purchase_service(&f).load_view(f.purchase.id).await.unwrap();
    assert_eq!(view.summary.total_profit, Some(Money::from_rubles(14_200)));

    let progression = engine(&f).apply_costs(&sale, &view.summary).await.unwrap();
    assert_eq!(progression.effect, ProgressionEffect::Updated);
    assert_eq!(progression.sale.purchase_cost, Some(Money::from_rubles(30_000)));
    assert_eq!(progression.sale.logistics_cost, Some(Money::from_rubles(5_800)));
    assert_eq!(progression.sale.margin, Some(Money::from_rubles(14_200)));
}

#[tokio::test]
async fn losing_a_deal_requires_a_reason() {
    let f = test_fixture();
    let engine = engine(&f);

    let err = engine
        .set_deal_stage(f.deal.id, DealStage::Lost, Some("  "))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let lost = engine
        .set_deal_stage(f.deal.id, DealStage::Lost, Some("Client chose a competitor"))
        .await
        .unwrap();
    assert_eq!(lost.stage, DealStage::Lost);

    let reopened = engine
        .set_deal_stage(f.deal.id, DealStage::InProgress, None)
        .await
        .unwrap();
    assert_eq!(reopened.loss_reason, None);
}

#[tokio::test]
async fn sale_pdf_attach_records_the_url() {
    let f = test_fixture();
    let sale = test_open_sale(&f.deal, None);
    f.store.insert_sale(sale.clone());

    let attachment = engine(&f)
        .attach_pdf(&sale, FileUpload::pdf("upd.pdf", b"%PDF-1.7".to_vec()))
        .await
        .unwrap();

    assert_eq!(attachment.record.pdf_url.as_deref(), Some(attachment.url.as_str()));
    assert!(f.store.stored_file(&attachment.url).is_some());
}

#[tokio::test]
async fn sale_pdf_link_failure_keeps_the_url_for_reattach() {
    let f = test_fixture();
    let sale = test_open_sale(&f.deal, None);
    f.store.insert_sale(sale.clone());
    let engine = engine(&f);

    f.store.fail_next_sale_writes(3);
    let err = engine
        .attach_pdf(&sale, FileUpload::pdf("upd.pdf", b"%PDF-1.7".to_vec()))
        .await
        .unwrap_err();

    let url = match err {
        CoreError::AttachPartialFailure {
            target: UploadTarget::SalePdf(sale_id),
            url,
            ..
        } => {
            assert_eq!(sale_id, sale.id);
            url
        }
        other => panic!("Expected AttachPartialFailure for the sale, got {other:?}"),
    };
    assert!(f.store.stored_file(&url).is_some());
    assert_eq!(f.store.sales_of(f.deal.id)[0].pdf_url, None);

    let writes_before = f.store.write_count();
    let attachment = engine.reattach_pdf(&sale, url.clone()).await.unwrap();

    assert_eq!(attachment.record.pdf_url.as_deref(), Some(url.as_str()));
    assert_eq!(f.store.sales_of(f.deal.id)[0].pdf_url.as_deref(), Some(url.as_str()));
    assert_eq!(f.store.write_count(), writes_before + 1);
}

// --- lines --------------------------------------------------------------------

#[tokio::test]
async fn invoice_total_mismatch_is_rejected_before_writing() {
    let f = test_fixture();
    let draft = NewLine::Invoice(NewInvoiceLine {
        purchase_id: f.purchase.id,
        article: "Bearing 6204".to_string(),
        quantity: 3,
        unit_price: Money::from_rubles(100),
        total_price: Money::from_rubles(250),
    });

    let err = line_service(&f)
        .create_line(&test_actor(WorkerRole::SalesManager), draft)
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        DomainError::validation("invoice line total mismatch").to_string()
    );
    assert_eq!(f.store.write_count(), 0);
}

#[tokio::test]
async fn partial_invoice_price_patch_is_rejected() {
    let f = test_fixture();
    let patch = LinePatch::Invoice(InvoiceLinePatch {
        quantity: Some(4),
        ..InvoiceLinePatch::default()
    });

    let err = line_service(&f)
        .update_line(
            &test_actor(WorkerRole::Director),
            f.purchase.id,
            LineId::new(),
            patch,
        )
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(f.store.write_count(), 0);
}

#[tokio::test]
async fn supplier_lines_are_restricted_to_purchasing_roles() {
    let f = test_fixture();
    let service = line_service(&f);

    let err = service
        .create_line(
            &test_actor(WorkerRole::SalesManager),
            supplier_draft(f.purchase.id, 1_000, false),
        )
        .await
        .unwrap_err();
    match err {
        CoreError::Domain(DomainError::Unauthorized(_)) => {}
        other => panic!("Expected Unauthorized, got {other:?}"),
    }

    // Logistics lines are open to everyone.
    service
        .create_line(
            &test_actor(WorkerRole::SalesManager),
            logistics_draft(f.purchase.id, 500, None),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_line_write_is_reported_with_its_kind() {
    let f = test_fixture();
    f.store.fail_next_line_writes(1);

    let err = line_service(&f)
        .create_line(
            &test_actor(WorkerRole::Purchaser),
            supplier_draft(f.purchase.id, 1_000, false),
        )
        .await
        .unwrap_err();

    match err {
        CoreError::LineWrite { kind, .. } => assert_eq!(kind, LineKind::Supplier),
        other => panic!("Expected LineWrite, got {other:?}"),
    }
}

#[tokio::test]
async fn attach_retries_the_patch_and_links_the_document() {
    let f = test_fixture();
    let actor = test_actor(WorkerRole::Purchaser);
    let service = line_service(&f);
    let line = service
        .create_line(&actor, supplier_draft(f.purchase.id, 1_000, false))
        .await
        .unwrap();
    let line_id = supplier_line_id(&line);

    f.store.fail_next_line_writes(2);
    let attachment = service
        .attach_file(
            &actor,
            f.purchase.id,
            LineKind::Supplier,
            line_id,
            FileUpload::pdf("invoice.pdf", b"%PDF-1.7".to_vec()),
        )
        .await
        .unwrap();

    assert_eq!(attachment.record.pdf_url(), Some(attachment.url.as_str()));
    assert!(attachment.url.contains(&UploadTarget::SupplierPdf(line_id).path()));
}

#[tokio::test]
async fn exhausted_patch_retries_keep_the_url_for_reattach() {
    let f = test_fixture();
    let actor = test_actor(WorkerRole::Purchaser);
    let service = line_service(&f);
    let line = service
        .create_line(&actor, supplier_draft(f.purchase.id, 1_000, false))
        .await
        .unwrap();
    let line_id = supplier_line_id(&line);

    f.store.fail_next_line_writes(3);
    let err = service
        .attach_file(
            &actor,
            f.purchase.id,
            LineKind::Supplier,
            line_id,
            FileUpload::pdf("invoice.pdf", b"%PDF-1.7".to_vec()),
        )
        .await
        .unwrap_err();

    let url = err
        .pending_attachment_url()
        .expect("partial failure carries the url")
        .to_string();
    assert!(f.store.stored_file(&url).is_some());

    let lines = service.list_lines(f.purchase.id).await.unwrap();
    assert_eq!(lines.supplier[0].pdf_url, None);

    let attachment = service
        .reattach(&actor, f.purchase.id, LineKind::Supplier, line_id, url.clone())
        .await
        .unwrap();
    assert_eq!(attachment.record.pdf_url(), Some(url.as_str()));
}

#[tokio::test]
async fn failed_upload_leaves_the_line_untouched() {
    let f = test_fixture();
    let actor = test_actor(WorkerRole::Purchaser);
    let service = line_service(&f);
    let line = service
        .create_line(&actor, logistics_draft(f.purchase.id, 700, None))
        .await
        .unwrap();
    f.store.fail_next_uploads(1);

    let err = service
        .attach_file(
            &actor,
            f.purchase.id,
            LineKind::Logistics,
            line.id(),
            FileUpload::pdf("waybill.pdf", Vec::new()),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::LineWrite { .. }));
    assert!(err.pending_attachment_url().is_none());
}

#[tokio::test]
async fn invoice_lines_do_not_take_documents() {
    let f = test_fixture();
    let err = line_service(&f)
        .attach_file(
            &test_actor(WorkerRole::Director),
            f.purchase.id,
            LineKind::Invoice,
            LineId::new(),
            FileUpload::pdf("x.pdf", Vec::new()),
        )
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(f.store.write_count(), 0);
}

#[tokio::test]
async fn line_writes_publish_change_notices() {
    let f = test_fixture();
    let notices = f.bus.subscribe();
    let actor = test_actor(WorkerRole::Purchaser);
    let service = line_service(&f);

    let line = service
        .create_line(&actor, supplier_draft(f.purchase.id, 1_000, false))
        .await
        .unwrap();
    let line_id = supplier_line_id(&line);
    service
        .update_line(
            &actor,
            f.purchase.id,
            line_id,
            LinePatch::Supplier(SupplierLinePatch {
                delivered: Some(true),
                ..SupplierLinePatch::default()
            }),
        )
        .await
        .unwrap();

    let received = notices.drain();
    assert_eq!(received.len(), 2);
    assert_eq!(
        received[0].aggregate,
        AggregateRef::SupplierLine {
            purchase_id: f.purchase.id,
            line_id,
        }
    );
    assert_eq!(received[0].change, ChangeKind::Created);
    assert_eq!(received[1].change, ChangeKind::Updated);
}

// --- purchases ----------------------------------------------------------------

#[tokio::test]
async fn load_view_uses_the_current_sale_row() {
    let f = test_fixture();
    let open = test_open_sale(&f.deal, Some(Money::from_rubles(1000)));
    f.store.insert_sale(open.clone());
    let signed = engine(&f)
        .set_signing_stage(&open, SigningStage::SignedOnPaper)
        .await
        .unwrap()
        .sale;

    let view = purchase_service(&f).load_view(f.purchase.id).await.unwrap();

    assert_eq!(view.sale.map(|s| s.id), Some(signed.id));
    assert_eq!(view.summary.total_supplier_cost, Money::ZERO);
    assert_eq!(view.summary.total_profit, Some(Money::from_rubles(50_000)));
}

#[tokio::test]
async fn creating_a_purchase_publishes_a_notice() {
    let f = test_fixture();
    let notices = f.bus.subscribe();

    let purchase = purchase_service(&f)
        .create_purchase(NewPurchase {
            deal_id: f.deal.id,
            request_number: "Z-1043".to_string(),
            counterparty_id: None,
            comment: None,
        })
        .await
        .unwrap();

    assert!(purchase.created_at.is_some());
    let notice = notices.try_recv().unwrap();
    assert_eq!(
        notice.aggregate,
        AggregateRef::Purchase {
            purchase_id: purchase.id
        }
    );
}

#[tokio::test]
async fn all_arrived_is_refused_until_everything_is_received() {
    let f = test_fixture();
    let actor = test_actor(WorkerRole::Logistician);
    let purchaser = test_actor(WorkerRole::Purchaser);
    line_service(&f)
        .create_line(&purchaser, supplier_draft(f.purchase.id, 1_000, false))
        .await
        .unwrap();

    let err = purchase_service(&f)
        .confirm_all_arrived(f.purchase.id, &actor)
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(f.store.notifications().is_empty());
}

#[tokio::test]
async fn all_arrived_notifies_with_counterparty_name() {
    let f = test_fixture();
    let actor = test_actor(WorkerRole::Logistician);
    let purchaser = test_actor(WorkerRole::Purchaser);
    let lines = line_service(&f);
    lines
        .create_line(&purchaser, supplier_draft(f.purchase.id, 1_000, true))
        .await
        .unwrap();
    lines
        .create_line(
            &purchaser,
            logistics_draft(f.purchase.id, 300, NaiveDate::from_ymd_opt(2024, 5, 17)),
        )
        .await
        .unwrap();

    let id = purchase_service(&f)
        .confirm_all_arrived(f.purchase.id, &actor)
        .await
        .unwrap();

    let notifications = f.store.notifications();
    assert_eq!(notifications.len(), 1);
    let (stored_id, payload) = &notifications[0];
    assert_eq!(*stored_id, id);
    assert_eq!(payload.title, "All arrived: request Z-1042");
    assert!(payload.content.contains("OOO Vector"));
    assert!(payload.content.contains("Irina Petrova"));
    assert_eq!(payload.created_by, actor.id);
    assert!(payload.seen_by.is_empty());
}

#[tokio::test]
async fn notifier_failure_is_reported() {
    let f = test_fixture();
    let purchaser = test_actor(WorkerRole::Purchaser);
    line_service(&f)
        .create_line(&purchaser, supplier_draft(f.purchase.id, 1_000, true))
        .await
        .unwrap();
    f.store.fail_next_notifications(1);

    let err = purchase_service(&f)
        .confirm_all_arrived(f.purchase.id, &purchaser)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Notify(_)));
}

#[tokio::test]
async fn missing_purchase_is_a_read_error() {
    let f = test_fixture();
    let err = purchase_service(&f)
        .load_view(PurchaseId::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
