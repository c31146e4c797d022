/// Percentages of the balance paid to subscribers and to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PayoutSplit {
    percentage: u32,
    owner_percentage: u32,
}

impl PayoutSplit {
    /// Percentages are validated with the run configuration. Out-of-range
    /// values are clamped, subscriber share first, so the two shares never
    /// add up to more than the whole balance.
    pub fn new(percentage: u32, owner_percentage: u32) -> Self {
        let percentage = percentage.min(100);
        Self {
            percentage,
            owner_percentage: owner_percentage.min(100 - percentage),
        }
    }

    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    pub fn owner_percentage(&self) -> u32 {
        self.owner_percentage
    }

    /// Subscriber share of `balance` (thousandths), rounded down.
    pub fn reward_pool(&self, balance: u64) -> u64 {
        share(balance, self.percentage)
    }

    /// Owner share of `balance` (thousandths), rounded down.
    pub fn owner_fee(&self, balance: u64) -> u64 {
        share(balance, self.owner_percentage)
    }
}

fn share(amount: u64, percent: u32) -> u64 {
    (amount as u128 * percent as u128 / 100) as u64
}
