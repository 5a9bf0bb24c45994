//! Argument parsing for the `tradeops` binary.

use std::path::PathBuf;

use anyhow::{Context, bail};

use tradeops_core::{PurchaseId, WorkerId, WorkerRole};

pub const USAGE: &str = "\
usage:
  tradeops summary <purchase-id>
  tradeops sync-costs <purchase-id>
  tradeops attach-sale-pdf <purchase-id> <file>
  tradeops all-arrived <purchase-id> <worker-id> <worker-name> [role]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the purchase totals.
    Summary { purchase_id: PurchaseId },
    /// Copy the purchase totals onto the deal's current sale row.
    SyncCosts { purchase_id: PurchaseId },
    /// Upload a signed document and link it to the deal's current sale row.
    AttachSalePdf { purchase_id: PurchaseId, path: PathBuf },
    /// Confirm that everything arrived and notify the team.
    AllArrived {
        purchase_id: PurchaseId,
        worker_id: WorkerId,
        worker_name: String,
        role: WorkerRole,
    },
}

impl Command {
    pub fn parse<S: AsRef<str>>(args: &[S]) -> anyhow::Result<Self> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        match args.as_slice() {
            ["summary", purchase_id] => Ok(Command::Summary {
                purchase_id: parse_purchase_id(purchase_id)?,
            }),
            ["sync-costs", purchase_id] => Ok(Command::SyncCosts {
                purchase_id: parse_purchase_id(purchase_id)?,
            }),
            ["attach-sale-pdf", purchase_id, path] => Ok(Command::AttachSalePdf {
                purchase_id: parse_purchase_id(purchase_id)?,
                path: PathBuf::from(path),
            }),
            ["all-arrived", purchase_id, worker_id, worker_name, rest @ ..] if rest.len() <= 1 => {
                let role = match rest.first() {
                    Some(raw) => raw.parse().context("invalid role")?,
                    None => WorkerRole::Logistician,
                };
                Ok(Command::AllArrived {
                    purchase_id: parse_purchase_id(purchase_id)?,
                    worker_id: worker_id
                        .parse()
                        .with_context(|| format!("invalid worker id {worker_id:?}"))?,
                    worker_name: worker_name.to_string(),
                    role,
                })
            }
            _ => bail!("{USAGE}"),
        }
    }
}

fn parse_purchase_id(raw: &str) -> anyhow::Result<PurchaseId> {
    raw.parse()
        .with_context(|| format!("invalid purchase id {raw:?}"))
}
