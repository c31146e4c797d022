pub mod run;

pub use run::{execute, log_level, Confirm, RunError, RunOptions, RunOutcome, StdinConfirm};
