pub mod blacklist;
pub mod filter;
pub mod followers;
pub mod reputation;
pub mod scanner;
pub mod types;

pub use blacklist::Blacklist;
pub use filter::{EligibilityFilter, EligibilityPolicy};
pub use followers::collect_followers;
pub use reputation::score as reputation_score;
pub use scanner::{scan_history, ActivityRules, ActivityScanner, ScanState};
pub use types::*;
