use serde::{Deserialize, Deserializer, Serialize};

use tradeops_core::{
    CounterpartyId, DealId, DomainError, DomainResult, Entity, Money, PurchaseId, SaleId, WorkerId,
};

/// Deal-level stage, independent of the sale rows' delivery/signing stages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealStage {
    New,
    InProgress,
    Won,
    Lost,
}

/// A customer engagement linking a sale side and a purchase side.
///
/// Deals are never deleted; a dead deal is `Lost` with a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: DealId,
    pub request_number: String,
    pub counterparty_id: CounterpartyId,
    pub stage: DealStage,
    pub turnover_rub: Option<Money>,
    pub margin_rub: Option<Money>,
    pub purchase_id: Option<PurchaseId>,
    pub sale_id: Option<SaleId>,
    pub loss_reason: Option<String>,
    pub created_by: Option<WorkerId>,
}

impl Entity for Deal {
    type Id = DealId;

    fn id(&self) -> &DealId {
        &self.id
    }
}

/// Partial update of a deal. `loss_reason: Some(None)` clears the stored reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<DealStage>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub loss_reason: Option<Option<String>>,
}

impl DealPatch {
    pub fn is_empty(&self) -> bool {
        self.stage.is_none() && self.loss_reason.is_none()
    }

    pub fn apply_to(&self, deal: &mut Deal) {
        if let Some(stage) = self.stage {
            deal.stage = stage;
        }
        if let Some(reason) = &self.loss_reason {
            deal.loss_reason = reason.clone();
        }
    }
}

// Distinguishes an explicit `null` (clear) from an absent field (leave alone).
pub(crate) fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Deal {
    /// Plan a stage change.
    ///
    /// Moving to `Lost` requires a non-blank reason; leaving `Lost` clears it.
    /// Returns an empty patch when nothing would change.
    pub fn plan_stage_change(
        &self,
        stage: DealStage,
        loss_reason: Option<&str>,
    ) -> DomainResult<DealPatch> {
        let reason = loss_reason.map(str::trim).filter(|r| !r.is_empty());

        let mut patch = DealPatch::default();
        if stage == DealStage::Lost {
            let reason = reason
                .ok_or_else(|| DomainError::validation("loss reason required"))?
                .to_string();
            if self.loss_reason.as_deref() != Some(reason.as_str()) {
                patch.loss_reason = Some(Some(reason));
            }
        } else if self.loss_reason.is_some() {
            patch.loss_reason = Some(None);
        }

        if self.stage != stage {
            patch.stage = Some(stage);
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_deal(stage: DealStage) -> Deal {
        Deal {
            id: DealId::new(),
            request_number: "Z-1042".to_string(),
            counterparty_id: CounterpartyId::new(),
            stage,
            turnover_rub: None,
            margin_rub: None,
            purchase_id: None,
            sale_id: None,
            loss_reason: None,
            created_by: None,
        }
    }

    #[test]
    fn losing_a_deal_requires_a_reason() {
        let deal = test_deal(DealStage::InProgress);
        let err = deal.plan_stage_change(DealStage::Lost, Some("  ")).unwrap_err();
        assert_eq!(err, DomainError::validation("loss reason required"));
    }

    #[test]
    fn losing_a_deal_records_the_reason() {
        let mut deal = test_deal(DealStage::InProgress);
        let patch = deal
            .plan_stage_change(DealStage::Lost, Some("price too high"))
            .unwrap();
        patch.apply_to(&mut deal);
        assert_eq!(deal.stage, DealStage::Lost);
        assert_eq!(deal.loss_reason.as_deref(), Some("price too high"));
    }

    #[test]
    fn reopening_clears_the_reason() {
        let mut deal = test_deal(DealStage::Lost);
        deal.loss_reason = Some("price too high".to_string());

        let patch = deal.plan_stage_change(DealStage::InProgress, None).unwrap();
        assert_eq!(patch.loss_reason, Some(None));

        let json = serde_json::to_value(&patch).unwrap();
        assert!(json["lossReason"].is_null());
        assert_eq!(json["stage"], "IN_PROGRESS");

        let back: DealPatch = serde_json::from_value(json).unwrap();
        assert_eq!(back, patch);
    }

    #[test]
    fn same_stage_is_an_empty_patch() {
        let deal = test_deal(DealStage::Won);
        assert!(deal.plan_stage_change(DealStage::Won, None).unwrap().is_empty());
    }
}
