pub mod config;
pub mod types;

pub use config::RewardConfig;
pub use types::*;
