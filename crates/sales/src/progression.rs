//! Sale progression decisions.
//!
//! A sale row is either *open* (unsigned) or *progressed* (signed). Delivery-stage
//! changes and corrections to an existing signature patch the row in place. Signing
//! an open row never touches it: a new, progressed row is spawned instead and the
//! open row stays behind as the historical snapshot.
//!
//! Decisions are pure. `Sale::decide` reports what should be written; executing the
//! write is the caller's job.

use chrono::{DateTime, Utc};

use tradeops_core::{DomainError, DomainResult, Money};

use crate::sale::{DeliveryStage, NewSale, Sale, SaleLifecycle, SalePatch, SigningStage};

/// A requested change to a sale row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleCommand {
    SetDeliveryStage(DeliveryStage),
    SetSigningStage(SigningStage),
    /// Copy purchase totals onto the row and recompute its margin.
    ApplyCosts {
        purchase_cost: Money,
        logistics_cost: Money,
    },
}

/// The write a command resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleWrite {
    /// Nothing to write; the row already reflects the command.
    Unchanged,
    /// In-place update of the existing row.
    Patch(SalePatch),
    /// Create a new row; the existing row is left as is.
    Spawn(NewSale),
}

impl Sale {
    /// Decide how `command` applies to this row.
    ///
    /// `now` stamps `statusSetDate` on spawned rows.
    pub fn decide(&self, command: &SaleCommand, now: DateTime<Utc>) -> DomainResult<SaleWrite> {
        match command {
            SaleCommand::SetDeliveryStage(stage) => Ok(self.decide_delivery(*stage)),
            SaleCommand::SetSigningStage(stage) => self.decide_signing(*stage, now),
            SaleCommand::ApplyCosts {
                purchase_cost,
                logistics_cost,
            } => self.decide_costs(*purchase_cost, *logistics_cost),
        }
    }

    fn decide_delivery(&self, stage: DeliveryStage) -> SaleWrite {
        if self.delivery_stage == Some(stage) {
            return SaleWrite::Unchanged;
        }
        SaleWrite::Patch(SalePatch {
            delivery_stage: Some(stage),
            ..SalePatch::default()
        })
    }

    fn decide_signing(&self, stage: SigningStage, now: DateTime<Utc>) -> DomainResult<SaleWrite> {
        match self.lifecycle() {
            SaleLifecycle::Progressed if self.signing_stage == Some(stage) => {
                Ok(SaleWrite::Unchanged)
            }
            SaleLifecycle::Progressed => Ok(SaleWrite::Patch(SalePatch {
                signing_stage: Some(stage),
                ..SalePatch::default()
            })),
            SaleLifecycle::Open => {
                let mut next = NewSale::from_snapshot(self);
                next.signing_stage = Some(stage);
                next.progressed = true;
                next.status_set_date = Some(now);

                if next.margin.is_none() {
                    return Err(DomainError::validation("margin required"));
                }
                Ok(SaleWrite::Spawn(next))
            }
        }
    }

    /// Without a known sale amount the margin cannot be derived from the new costs,
    /// so a margin left from earlier costs is cleared rather than kept.
    fn decide_costs(
        &self,
        purchase_cost: Money,
        logistics_cost: Money,
    ) -> DomainResult<SaleWrite> {
        let mut patch = SalePatch::default();
        if self.purchase_cost != Some(purchase_cost) {
            patch.purchase_cost = Some(purchase_cost);
        }
        if self.logistics_cost != Some(logistics_cost) {
            patch.logistics_cost = Some(logistics_cost);
        }
        let margin = self.margin_for(purchase_cost, logistics_cost)?;
        if self.margin != margin {
            patch.margin = Some(margin);
        }

        Ok(if patch.is_empty() {
            SaleWrite::Unchanged
        } else {
            SaleWrite::Patch(patch)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tradeops_core::{CounterpartyId, DealId, SaleId};

    fn open_sale(margin: Option<Money>) -> Sale {
        Sale {
            id: SaleId::new(),
            deal_id: DealId::new(),
            counterparty_id: CounterpartyId::new(),
            sale_amount: Some(Money::from_rubles(20_000)),
            total_sale_amount: Some(Money::from_rubles(20_000)),
            paid_now: Some(Money::from_rubles(5_000)),
            prepayment_amount: None,
            logistics_cost: None,
            purchase_cost: None,
            margin,
            delivery_stage: Some(DeliveryStage::InStock),
            signing_stage: None,
            status_set_date: None,
            progressed: false,
            pdf_url: Some("https://files.example/sale.pdf".to_string()),
        }
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn delivery_stage_change_patches_in_place() {
        let sale = open_sale(None);
        let write = sale
            .decide(&SaleCommand::SetDeliveryStage(DeliveryStage::ItemSent), test_time())
            .unwrap();
        match write {
            SaleWrite::Patch(patch) => {
                assert_eq!(patch.delivery_stage, Some(DeliveryStage::ItemSent));
                assert_eq!(patch.signing_stage, None);
            }
            other => panic!("expected patch, got {other:?}"),
        }
    }

    #[test]
    fn same_delivery_stage_is_unchanged() {
        let sale = open_sale(None);
        let write = sale
            .decide(&SaleCommand::SetDeliveryStage(DeliveryStage::InStock), test_time())
            .unwrap();
        assert_eq!(write, SaleWrite::Unchanged);
    }

    #[test]
    fn signing_open_sale_without_margin_is_rejected() {
        let sale = open_sale(None);
        let err = sale
            .decide(&SaleCommand::SetSigningStage(SigningStage::SignedInEdo), test_time())
            .unwrap_err();
        assert_eq!(err, DomainError::validation("margin required"));
    }

    #[test]
    fn signing_open_sale_spawns_progressed_copy() {
        let sale = open_sale(Some(Money::from_rubles(1_000)));
        let now = test_time();
        let write = sale
            .decide(&SaleCommand::SetSigningStage(SigningStage::SignedInEdo), now)
            .unwrap();

        match write {
            SaleWrite::Spawn(next) => {
                assert_eq!(next.signing_stage, Some(SigningStage::SignedInEdo));
                assert!(next.progressed);
                assert_eq!(next.status_set_date, Some(now));
                assert_eq!(next.deal_id, sale.deal_id);
                assert_eq!(next.margin, sale.margin);
                assert_eq!(next.paid_now, sale.paid_now);
                assert_eq!(next.pdf_url, sale.pdf_url);
            }
            other => panic!("expected spawn, got {other:?}"),
        }
        assert_eq!(sale.signing_stage, None);
    }

    #[test]
    fn zero_margin_counts_as_present() {
        let sale = open_sale(Some(Money::ZERO));
        let write = sale
            .decide(&SaleCommand::SetSigningStage(SigningStage::SignedOnPaper), test_time())
            .unwrap();
        assert!(matches!(write, SaleWrite::Spawn(_)));
    }

    #[test]
    fn re_signing_progressed_sale_patches_signing_stage_only() {
        let mut sale = open_sale(None);
        sale.signing_stage = Some(SigningStage::SignedOnPaper);
        sale.progressed = true;

        let write = sale
            .decide(&SaleCommand::SetSigningStage(SigningStage::SignedInEdo), test_time())
            .unwrap();
        assert_eq!(
            write,
            SaleWrite::Patch(SalePatch {
                signing_stage: Some(SigningStage::SignedInEdo),
                ..SalePatch::default()
            })
        );
    }

    #[test]
    fn re_signing_with_same_value_is_unchanged() {
        let mut sale = open_sale(None);
        sale.signing_stage = Some(SigningStage::SignedOnPaper);
        let write = sale
            .decide(&SaleCommand::SetSigningStage(SigningStage::SignedOnPaper), test_time())
            .unwrap();
        assert_eq!(write, SaleWrite::Unchanged);
    }

    #[test]
    fn applying_costs_computes_margin() {
        let sale = open_sale(None);
        let write = sale
            .decide(
                &SaleCommand::ApplyCosts {
                    purchase_cost: Money::from_rubles(5_000),
                    logistics_cost: Money::from_rubles(800),
                },
                test_time(),
            )
            .unwrap();
        match write {
            SaleWrite::Patch(patch) => {
                assert_eq!(patch.margin, Some(Some(Money::from_rubles(14_200))));
                assert_eq!(patch.purchase_cost, Some(Money::from_rubles(5_000)));
                assert_eq!(patch.logistics_cost, Some(Money::from_rubles(800)));
            }
            other => panic!("expected patch, got {other:?}"),
        }
    }

    #[test]
    fn applying_costs_without_sale_amount_leaves_margin_unset() {
        let mut sale = open_sale(None);
        sale.sale_amount = None;
        sale.total_sale_amount = None;
        let write = sale
            .decide(
                &SaleCommand::ApplyCosts {
                    purchase_cost: Money::from_rubles(5_000),
                    logistics_cost: Money::ZERO,
                },
                test_time(),
            )
            .unwrap();
        match write {
            SaleWrite::Patch(patch) => assert_eq!(patch.margin, None),
            other => panic!("expected patch, got {other:?}"),
        }
    }

    #[test]
    fn applying_costs_without_sale_amount_clears_a_stale_margin() {
        let mut sale = open_sale(Some(Money::from_rubles(1_000)));
        sale.sale_amount = None;
        sale.total_sale_amount = None;
        let write = sale
            .decide(
                &SaleCommand::ApplyCosts {
                    purchase_cost: Money::from_rubles(5_000),
                    logistics_cost: Money::ZERO,
                },
                test_time(),
            )
            .unwrap();
        let SaleWrite::Patch(patch) = write else {
            panic!("expected patch, got {write:?}");
        };
        assert_eq!(patch.margin, Some(None));

        patch.apply_to(&mut sale);
        assert_eq!(sale.margin, None);
        assert!(matches!(
            sale.decide(&SaleCommand::SetSigningStage(SigningStage::SignedInEdo), test_time()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn overflowing_margin_is_refused() {
        let mut sale = open_sale(None);
        sale.total_sale_amount = Some(Money::from_kopecks(i64::MIN + 1));
        let result = sale.decide(
            &SaleCommand::ApplyCosts {
                purchase_cost: Money::from_rubles(5_000),
                logistics_cost: Money::ZERO,
            },
            test_time(),
        );
        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    fn delivery_stage() -> impl Strategy<Value = DeliveryStage> {
        prop_oneof![
            Just(DeliveryStage::InStock),
            Just(DeliveryStage::ItemSent),
            Just(DeliveryStage::ItemDeliveredPartial),
            Just(DeliveryStage::ItemDeliveredFull),
            Just(DeliveryStage::PurchasedForOrder),
            Just(DeliveryStage::Return),
        ]
    }

    proptest! {
        /// Property: once a delivery stage is applied, repeating it writes nothing.
        #[test]
        fn delivery_stage_is_idempotent(stage in delivery_stage()) {
            let mut sale = open_sale(None);
            if let SaleWrite::Patch(patch) = sale
                .decide(&SaleCommand::SetDeliveryStage(stage), test_time())
                .unwrap()
            {
                patch.apply_to(&mut sale);
            }
            let again = sale
                .decide(&SaleCommand::SetDeliveryStage(stage), test_time())
                .unwrap();
            prop_assert_eq!(again, SaleWrite::Unchanged);
            prop_assert!(sale.is_open());
        }
    }
}
