use std::fmt;

use serde::{Deserialize, Serialize};
use subreward_chain::Asset;

use crate::split::PayoutSplit;
use crate::types::*;

/// What a run is going to pay, computed once before any transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutPlan {
    pub balance: Asset,
    pub split: PayoutSplit,
    /// Total set aside for subscribers.
    pub reward_pool: Asset,
    pub owner_fee: Asset,
    /// Amount each eligible subscriber receives.
    pub per_subscriber_fee: Asset,
    pub subscriber_count: usize,
}

impl PayoutPlan {
    /// Split `balance` among `subscriber_count` subscribers and the owner.
    ///
    /// All shares round down, so the subscriber transfers plus the owner fee
    /// never exceed the balance.
    pub fn compute(
        balance: &Asset,
        split: PayoutSplit,
        subscriber_count: usize,
    ) -> Result<Self, PayoutError> {
        if subscriber_count == 0 {
            return Err(PayoutError::NoSubscribers);
        }

        let reward_pool = balance.with_milli(split.reward_pool(balance.milli));
        let owner_fee = balance.with_milli(split.owner_fee(balance.milli));
        let per_subscriber = reward_pool.milli / subscriber_count as u64;
        if per_subscriber == 0 {
            return Err(PayoutError::FeeTooSmall {
                pool: reward_pool,
                subscribers: subscriber_count,
            });
        }

        Ok(Self {
            balance: balance.clone(),
            split,
            per_subscriber_fee: balance.with_milli(per_subscriber),
            reward_pool,
            owner_fee,
            subscriber_count,
        })
    }

    /// Whether the owner fee is large enough to be transferred.
    pub fn pays_owner(&self) -> bool {
        self.owner_fee.milli > OWNER_FEE_THRESHOLD_MILLI
    }
}

impl fmt::Display for PayoutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "going to transfer {} of {} to each of {} subscribers",
            self.per_subscriber_fee.amount_string(),
            self.reward_pool,
            self.subscriber_count
        )?;
        if self.pays_owner() {
            write!(
                f,
                ", and {} ({}%) to the owner",
                self.owner_fee,
                self.split.owner_percentage()
            )?;
        }
        Ok(())
    }
}
