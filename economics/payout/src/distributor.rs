use subreward_chain::{AccountName, BroadcastMode, Broadcaster, TransferOperation};

use crate::plan::PayoutPlan;
use crate::types::*;

/// Build the ordered transfer list for a plan: one per subscriber, then the
/// owner fee when it is worth paying. Independent of the broadcast mode.
pub fn plan_transfers(
    plan: &PayoutPlan,
    from: &str,
    subscribers: &[AccountName],
    memo: &str,
    owner: Option<&str>,
) -> Vec<TransferOperation> {
    let mut transfers: Vec<TransferOperation> = subscribers
        .iter()
        .map(|to| TransferOperation {
            from: from.to_string(),
            to: to.clone(),
            amount: plan.per_subscriber_fee.clone(),
            memo: memo.to_string(),
        })
        .collect();

    if let Some(owner) = owner.filter(|_| plan.pays_owner()) {
        transfers.push(TransferOperation {
            from: from.to_string(),
            to: owner.to_string(),
            amount: plan.owner_fee.clone(),
            memo: memo.to_string(),
        });
    }
    transfers
}

/// What a distribution pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Every transfer of the plan, in emission order.
    pub planned: Vec<TransferOperation>,
    /// How many of them were broadcast (zero in dry-run mode).
    pub broadcast: usize,
}

/// Emits transfers one at a time, in order, or only logs them in dry-run mode.
pub struct FeeDistributor<'a, B: ?Sized> {
    broadcaster: &'a B,
    mode: BroadcastMode,
}

impl<'a, B> FeeDistributor<'a, B>
where
    B: Broadcaster + ?Sized,
{
    pub fn new(broadcaster: &'a B, mode: BroadcastMode) -> Self {
        Self { broadcaster, mode }
    }

    /// Send `transfers`. The first failure stops the pass; transfers already
    /// broadcast stay in effect.
    pub async fn distribute(
        &self,
        transfers: Vec<TransferOperation>,
    ) -> Result<Distribution, PayoutError> {
        let mut broadcast = 0usize;
        for op in &transfers {
            if !self.mode.is_live() {
                tracing::debug!(to = %op.to, amount = %op.amount, memo = %op.memo, "no broadcast, transfer");
                continue;
            }

            tracing::debug!(to = %op.to, amount = %op.amount, memo = %op.memo, "transfer");
            self.broadcaster
                .transfer(op)
                .await
                .map_err(|source| PayoutError::Transfer {
                    to: op.to.clone(),
                    completed: broadcast,
                    source,
                })?;
            broadcast += 1;
        }

        tracing::info!(
            planned = transfers.len(),
            broadcast,
            mode = ?self.mode,
            "distribution finished"
        );
        Ok(Distribution {
            planned: transfers,
            broadcast,
        })
    }
}
