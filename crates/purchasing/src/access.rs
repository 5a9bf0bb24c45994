use tradeops_core::{Actor, DomainError, DomainResult, WorkerRole};

/// Supplier lines carry purchase prices and payment dates; only directors and
/// purchasers may write them.
pub fn ensure_can_edit_supplier_lines(actor: &Actor) -> DomainResult<()> {
    match actor.role {
        WorkerRole::Director | WorkerRole::Purchaser => Ok(()),
        other => Err(DomainError::unauthorized(format!(
            "role {} may not edit supplier lines",
            other.as_str()
        ))),
    }
}
