//! `tradeops` command-line entry point.

use std::sync::Arc;

use anyhow::Context;

use tradeops_client::{ClientConfig, Command, HttpStore};
use tradeops_core::{Actor, PurchaseId};
use tradeops_events::{AggregateChanged, InMemoryEventBus};
use tradeops_infra::{
    CoreError, FileUpload, ProgressionEffect, PurchaseService, PurchaseView, SaleProgressionEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tradeops_observability::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let config = ClientConfig::from_env();
    tracing::debug!(api_url = %config.api_url, "using backing service");

    let store = Arc::new(HttpStore::new(&config).context("failed to set up HTTP client")?);
    let bus: Arc<InMemoryEventBus<AggregateChanged>> = Arc::new(InMemoryEventBus::new());
    let purchases = PurchaseService::new(store.clone(), store.clone(), bus.clone());
    let progression = SaleProgressionEngine::new(store.clone(), store, bus, config.core.clone());

    match command {
        Command::Summary { purchase_id } => {
            let view = load(&purchases, purchase_id).await?;
            print_summary(&view);
        }
        Command::SyncCosts { purchase_id } => {
            let view = load(&purchases, purchase_id).await?;
            let sale = view
                .sale
                .as_ref()
                .with_context(|| format!("deal of purchase {purchase_id} has no sale row"))?;
            let outcome = progression
                .apply_costs(sale, &view.summary)
                .await
                .with_context(|| format!("failed to sync costs of purchase {purchase_id}"))?;
            match outcome.effect {
                ProgressionEffect::Unchanged => println!("sale {} already up to date", sale.id),
                _ => println!("sale {} updated", outcome.sale.id),
            }
        }
        Command::AttachSalePdf { purchase_id, path } => {
            let view = load(&purchases, purchase_id).await?;
            let sale = view
                .sale
                .as_ref()
                .with_context(|| format!("deal of purchase {purchase_id} has no sale row"))?;
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.pdf".to_string());

            match progression.attach_pdf(sale, FileUpload::pdf(file_name, bytes)).await {
                Ok(attachment) => println!("sale {} linked to {}", sale.id, attachment.url),
                Err(CoreError::AttachPartialFailure { url, cause, .. }) => {
                    anyhow::bail!("uploaded to {url} but linking sale {} failed: {cause}", sale.id)
                }
                Err(err) => return Err(err).context("failed to attach sale document"),
            }
        }
        Command::AllArrived {
            purchase_id,
            worker_id,
            worker_name,
            role,
        } => {
            let actor = Actor::new(worker_id, worker_name, role);
            let notification_id = purchases
                .confirm_all_arrived(purchase_id, &actor)
                .await
                .with_context(|| format!("all-arrived confirmation for {purchase_id} failed"))?;
            println!("notification {notification_id} sent");
        }
    }

    Ok(())
}

async fn load(
    purchases: &PurchaseService<HttpStore, HttpStore, Arc<InMemoryEventBus<AggregateChanged>>>,
    purchase_id: PurchaseId,
) -> anyhow::Result<PurchaseView> {
    purchases
        .load_view(purchase_id)
        .await
        .with_context(|| format!("failed to load purchase {purchase_id}"))
}

fn print_summary(view: &PurchaseView) {
    let summary = &view.summary;
    println!("purchase {} (request {})", view.purchase.id, view.purchase.request_number);
    println!("  supplier cost:   {}", summary.total_supplier_cost);
    println!("  logistics cost:  {}", summary.total_logistics_cost);
    println!("  invoice total:   {}", summary.total_invoice);
    match summary.total_profit {
        Some(profit) => println!("  profit:          {profit}"),
        None => println!("  profit:          n/a (sale amount unknown)"),
    }
    println!(
        "  fully received:  {}",
        if summary.fully_received { "yes" } else { "no" }
    );
    for mismatch in &summary.invoice_mismatches {
        match mismatch.expected_total {
            Some(expected) => println!(
                "  ! invoice line {}: stored {}, expected {}",
                mismatch.line_id, mismatch.stored_total, expected
            ),
            None => println!(
                "  ! invoice line {}: stored {}, quantity x price overflows",
                mismatch.line_id, mismatch.stored_total
            ),
        }
    }
}
