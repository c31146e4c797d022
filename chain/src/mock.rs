//! In-memory chain and broadcaster that record every call.
//!
//! Used by the test suites of the downstream crates to assert request counts
//! and emitted side effects without a node.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::api::ChainApi;
use crate::broadcast::{Broadcaster, CustomDataOperation, TransferOperation};
use crate::types::*;

/// Every request a [`MockChain`] has served, in order.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    pub properties: usize,
    pub accounts: Vec<Vec<AccountName>>,
    /// Start cursor of each follower page request.
    pub followers: Vec<String>,
    pub history: Vec<HistoryRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub account: AccountName,
    pub from: HistoryCursor,
    pub limit: u32,
}

impl CallLog {
    /// Total number of remote calls of any kind.
    pub fn total(&self) -> usize {
        self.properties + self.accounts.len() + self.followers.len() + self.history.len()
    }

    /// History requests issued for one account.
    pub fn history_for(&self, account: &str) -> Vec<HistoryRequest> {
        self.history
            .iter()
            .filter(|r| r.account == account)
            .cloned()
            .collect()
    }
}

/// A scriptable chain node.
pub struct MockChain {
    time: DateTime<Utc>,
    accounts: HashMap<AccountName, Account>,
    /// Sorted follower names, served with the node's inclusive-start paging.
    followers: Vec<AccountName>,
    /// When set, follower requests pop these pages instead.
    scripted_pages: Mutex<Option<VecDeque<Vec<AccountName>>>>,
    histories: HashMap<AccountName, Vec<HistoryEntry>>,
    malformed_history: HashSet<AccountName>,
    failing_history: HashMap<AccountName, ChainError>,
    calls: Mutex<CallLog>,
}

impl MockChain {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time,
            accounts: HashMap::new(),
            followers: Vec::new(),
            scripted_pages: Mutex::new(None),
            histories: HashMap::new(),
            malformed_history: HashSet::new(),
            failing_history: HashMap::new(),
            calls: Mutex::new(CallLog::default()),
        }
    }

    pub fn with_account(mut self, name: &str, reputation: Option<&str>, balance: &str) -> Self {
        // Test fixtures are trusted; an invalid balance falls back to zero GBG.
        let sbd_balance = balance.parse().unwrap_or_else(|_| Asset::zero("GBG"));
        self.accounts.insert(
            name.to_string(),
            Account {
                name: name.to_string(),
                reputation: reputation.map(str::to_string),
                sbd_balance,
            },
        );
        self
    }

    pub fn with_followers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<AccountName>,
    {
        self.followers.extend(names.into_iter().map(Into::into));
        self.followers.sort();
        self.followers.dedup();
        self
    }

    /// Serve exactly these follower pages, one per request, then empty pages.
    pub fn with_follower_pages(self, pages: Vec<Vec<AccountName>>) -> Self {
        *self.scripted_pages.lock() = Some(pages.into());
        self
    }

    /// Install the full history of an account. Entries may be in any order.
    pub fn with_history(mut self, account: &str, mut entries: Vec<HistoryEntry>) -> Self {
        entries.sort_by_key(|e| e.seq);
        self.histories.insert(account.to_string(), entries);
        self
    }

    /// History requests for `account` answer with something that is not a list.
    pub fn with_malformed_history(mut self, account: &str) -> Self {
        self.malformed_history.insert(account.to_string());
        self
    }

    /// History requests for `account` fail with `err`.
    pub fn with_failing_history(mut self, account: &str, err: ChainError) -> Self {
        self.failing_history.insert(account.to_string(), err);
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ChainApi for MockChain {
    async fn dynamic_global_properties(&self) -> Result<DynamicGlobalProperties, ChainError> {
        self.calls.lock().properties += 1;
        Ok(DynamicGlobalProperties { time: self.time })
    }

    async fn accounts(&self, names: &[AccountName]) -> Result<Vec<Account>, ChainError> {
        self.calls.lock().accounts.push(names.to_vec());
        Ok(names
            .iter()
            .filter_map(|n| self.accounts.get(n).cloned())
            .collect())
    }

    async fn followers(
        &self,
        account: &str,
        start: &str,
        _kind: FollowKind,
        limit: u32,
    ) -> Result<Vec<FollowEntry>, ChainError> {
        self.calls.lock().followers.push(start.to_string());

        let names: Vec<AccountName> = match self.scripted_pages.lock().as_mut() {
            Some(pages) => pages.pop_front().unwrap_or_default(),
            None => self
                .followers
                .iter()
                .filter(|f| f.as_str() >= start)
                .take(limit as usize)
                .cloned()
                .collect(),
        };

        Ok(names
            .into_iter()
            .map(|follower| FollowEntry {
                follower,
                following: account.to_string(),
                what: vec![FollowKind::Blog.as_str().to_string()],
            })
            .collect())
    }

    async fn account_history(
        &self,
        account: &str,
        from: HistoryCursor,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, ChainError> {
        self.calls.lock().history.push(HistoryRequest {
            account: account.to_string(),
            from,
            limit,
        });

        if let Some(err) = self.failing_history.get(account) {
            return Err(err.clone());
        }
        if self.malformed_history.contains(account) {
            return Err(ChainError::MalformedResponse {
                method: "get_account_history",
                reason: "invalid type: map, expected a sequence".to_string(),
            });
        }

        let entries = match self.histories.get(account) {
            Some(entries) if !entries.is_empty() => entries,
            _ => return Ok(Vec::new()),
        };
        // The node answers with the records in [from - limit, from], oldest first.
        let newest = entries.last().map(|e| e.seq).unwrap_or_default();
        let upper = match from {
            HistoryCursor::Latest => newest,
            HistoryCursor::At(seq) => seq.min(newest),
        };
        let lower = upper.saturating_sub(limit as u64);
        Ok(entries
            .iter()
            .filter(|e| e.seq >= lower && e.seq <= upper)
            .cloned()
            .collect())
    }
}

/// Records broadcasts instead of sending them.
#[derive(Default)]
pub struct MockBroadcaster {
    transfers: Mutex<Vec<TransferOperation>>,
    custom_json: Mutex<Vec<CustomDataOperation>>,
    custom_json_attempts: Mutex<usize>,
    /// Number of upcoming custom_json calls that fail before one succeeds.
    custom_json_failures: Mutex<usize>,
    /// Fail every transfer to this account.
    failing_recipient: Option<AccountName>,
}

impl MockBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_custom_json(self, times: usize) -> Self {
        *self.custom_json_failures.lock() = times;
        self
    }

    pub fn failing_transfer_to(mut self, recipient: &str) -> Self {
        self.failing_recipient = Some(recipient.to_string());
        self
    }

    pub fn transfers(&self) -> Vec<TransferOperation> {
        self.transfers.lock().clone()
    }

    pub fn custom_json_ops(&self) -> Vec<CustomDataOperation> {
        self.custom_json.lock().clone()
    }

    pub fn custom_json_attempts(&self) -> usize {
        *self.custom_json_attempts.lock()
    }
}

#[async_trait]
impl Broadcaster for MockBroadcaster {
    async fn transfer(&self, op: &TransferOperation) -> Result<(), ChainError> {
        if self.failing_recipient.as_deref() == Some(op.to.as_str()) {
            return Err(ChainError::Broadcast(format!(
                "10 assert_exception: Assert Exception\naccount {} is frozen",
                op.to
            )));
        }
        self.transfers.lock().push(op.clone());
        Ok(())
    }

    async fn custom_json(&self, op: &CustomDataOperation) -> Result<(), ChainError> {
        *self.custom_json_attempts.lock() += 1;
        let mut failures = self.custom_json_failures.lock();
        if *failures > 0 {
            *failures -= 1;
            return Err(ChainError::Transport("connection reset".to_string()));
        }
        self.custom_json.lock().push(op.clone());
        Ok(())
    }
}
