pub mod distributor;
pub mod plan;
pub mod report;
pub mod retry;
pub mod split;
pub mod types;

pub use distributor::{plan_transfers, Distribution, FeeDistributor};
pub use plan::PayoutPlan;
pub use report::{PayoutReport, PersistOutcome, ReportPersister};
pub use retry::{retry_fixed, RetryExhausted, RetryPolicy};
pub use split::PayoutSplit;
pub use types::*;
