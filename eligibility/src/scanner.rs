use chrono::{DateTime, Utc};
use subreward_chain::{
    AppliedOperation, ChainApi, ChainError, CustomJsonOperation, HistoryCursor, HistoryEntry,
    Operation,
};

use crate::types::*;

/// History records requested per page.
pub const SCAN_WINDOW: u32 = 50;

/// `custom_json` id used by the follow plugin (follows, reblogs).
const FOLLOW_PLUGIN_ID: &str = "follow";

/// Per-account scan state. `Found` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Scanning,
    /// A qualifying activity lies within the horizon.
    Found,
    /// The scan crossed the horizon without a match.
    Expired,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanState::Scanning)
    }
}

/// Which operations count as activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityRules {
    /// When false, the subject's own posts and comments are not activity;
    /// only votes and reblogs are.
    pub count_authored_posts: bool,
}

/// Classifies history records of one subject account against a horizon.
#[derive(Debug, Clone)]
pub struct ActivityScanner<'a> {
    subject: &'a str,
    horizon: DateTime<Utc>,
    rules: ActivityRules,
}

impl<'a> ActivityScanner<'a> {
    pub fn new(subject: &'a str, horizon: DateTime<Utc>, rules: ActivityRules) -> Self {
        Self {
            subject,
            horizon,
            rules,
        }
    }

    pub fn subject(&self) -> &str {
        self.subject
    }

    /// Advance the state machine by one record, newest first.
    pub fn step(&self, state: ScanState, record: &AppliedOperation) -> ScanState {
        if state.is_terminal() {
            return state;
        }
        if record.timestamp < self.horizon {
            return ScanState::Expired;
        }
        if self.is_activity(&record.op) {
            ScanState::Found
        } else {
            ScanState::Scanning
        }
    }

    /// Whether `op` is an activity signal of the subject.
    pub fn is_activity(&self, op: &Operation) -> bool {
        match op {
            Operation::Vote(vote) => vote.voter == self.subject,
            Operation::Comment(comment) => {
                self.rules.count_authored_posts && comment.author == self.subject
            }
            Operation::CustomJson(custom) if custom.id == FOLLOW_PLUGIN_ID => {
                self.is_own_reblog(custom)
            }
            Operation::CustomJson(_) | Operation::Other(_) => false,
        }
    }

    /// Follow plugin payloads look like `["reblog", {"account": .., ..}]`.
    fn is_own_reblog(&self, custom: &CustomJsonOperation) -> bool {
        let payload: (String, serde_json::Value) = match serde_json::from_str(&custom.json) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(subject = %self.subject, error = %e, "unparsable follow payload");
                return false;
            }
        };
        payload.0 == "reblog"
            && payload.1.get("account").and_then(|a| a.as_str()) == Some(self.subject)
    }
}

/// Result of walking one account's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    pub state: ScanState,
    /// History pages fetched.
    pub pages: usize,
    /// The node answered with something that was not a history page.
    pub aborted: bool,
}

impl ScanOutcome {
    pub fn found(&self) -> bool {
        self.state == ScanState::Found
    }
}

/// Walk the subject's history backward in windows of `window` records until
/// the scanner decides, or the start of history is reached.
///
/// Cursors start at the newest record and continue at one below the lowest
/// sequence id read so far; the window shrinks near the start of history.
/// A malformed page, or one holding records above the requested cursor,
/// aborts the scan for this account only. Any other remote failure is
/// returned to the caller.
pub async fn scan_history<C>(
    chain: &C,
    scanner: &ActivityScanner<'_>,
    window: u32,
) -> Result<ScanOutcome, EligibilityError>
where
    C: ChainApi + ?Sized,
{
    let subject = scanner.subject();
    let mut state = ScanState::Scanning;
    let mut cursor = HistoryCursor::Latest;
    let mut count = window;
    let mut pages = 0usize;

    loop {
        tracing::trace!(%subject, start = %cursor, count, "get history");
        let page = match chain.account_history(subject, cursor, count).await {
            Ok(page) => page,
            Err(e @ ChainError::MalformedResponse { .. }) => {
                tracing::warn!(%subject, error = %e, "history scan aborted");
                return Ok(ScanOutcome {
                    state,
                    pages,
                    aborted: true,
                });
            }
            Err(e) => return Err(e.into()),
        };
        pages += 1;

        let Some(first_read) = page.iter().map(|e| e.seq).min() else {
            break;
        };
        // Every record must lie at or below the requested cursor, otherwise
        // the next cursor would not move backward.
        if let HistoryCursor::At(upper) = cursor {
            if let Some(newest) = page.iter().map(|e| e.seq).max().filter(|&s| s > upper) {
                tracing::warn!(
                    %subject,
                    cursor = upper,
                    newest,
                    "history did not move backward, scan aborted"
                );
                return Ok(ScanOutcome {
                    state,
                    pages,
                    aborted: true,
                });
            }
        }

        let mut newest_first: Vec<&HistoryEntry> = page.iter().collect();
        newest_first.sort_by(|a, b| b.seq.cmp(&a.seq));
        for entry in newest_first {
            let next = scanner.step(state, &entry.record);
            tracing::trace!(%subject, seq = entry.seq, op = entry.record.op.kind(), ?next, "check history record");
            state = next;
            if state.is_terminal() {
                break;
            }
        }

        if state.is_terminal() || first_read <= 1 {
            break;
        }
        let next = first_read - 1;
        cursor = HistoryCursor::At(next);
        count = window.min(u32::try_from(next).unwrap_or(u32::MAX));
    }

    tracing::trace!(%subject, ?state, pages, "history scan done");
    Ok(ScanOutcome {
        state,
        pages,
        aborted: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use subreward_chain::mock::MockChain;
    use subreward_chain::{
        Account, AccountName, CommentOperation, DynamicGlobalProperties, FollowEntry, FollowKind,
        VoteOperation,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 3, 10, 12, 0, 0).unwrap()
    }

    fn horizon() -> DateTime<Utc> {
        now() - Duration::days(7)
    }

    fn vote(voter: &str) -> Operation {
        Operation::Vote(VoteOperation {
            voter: voter.to_string(),
            author: "someone".to_string(),
            permlink: "post".to_string(),
            weight: 10_000,
        })
    }

    fn comment(author: &str) -> Operation {
        Operation::Comment(CommentOperation {
            parent_author: String::new(),
            parent_permlink: "golos".to_string(),
            author: author.to_string(),
            permlink: "hello".to_string(),
        })
    }

    fn custom(id: &str, json: &str) -> Operation {
        Operation::CustomJson(CustomJsonOperation {
            required_auths: vec![],
            required_posting_auths: vec!["alice".to_string()],
            id: id.to_string(),
            json: json.to_string(),
        })
    }

    fn other() -> Operation {
        Operation::Other("transfer".to_string())
    }

    fn record(op: Operation, at: DateTime<Utc>) -> AppliedOperation {
        AppliedOperation { timestamp: at, op }
    }

    fn scanner(rules: ActivityRules) -> ActivityScanner<'static> {
        ActivityScanner::new("alice", horizon(), rules)
    }

    #[test]
    fn vote_by_subject_is_found() {
        let s = scanner(ActivityRules::default());
        let recent = now() - Duration::hours(1);
        assert_eq!(s.step(ScanState::Scanning, &record(vote("alice"), recent)), ScanState::Found);
        assert_eq!(s.step(ScanState::Scanning, &record(vote("bob"), recent)), ScanState::Scanning);
    }

    #[test]
    fn record_older_than_horizon_expires() {
        let s = scanner(ActivityRules::default());
        let old = horizon() - Duration::seconds(1);
        assert_eq!(s.step(ScanState::Scanning, &record(vote("alice"), old)), ScanState::Expired);
    }

    #[test]
    fn terminal_states_are_sticky() {
        let s = scanner(ActivityRules::default());
        let recent = now() - Duration::hours(1);
        let old = horizon() - Duration::days(1);
        assert_eq!(s.step(ScanState::Found, &record(other(), old)), ScanState::Found);
        assert_eq!(s.step(ScanState::Expired, &record(vote("alice"), recent)), ScanState::Expired);
    }

    #[test]
    fn own_comment_counts_only_when_enabled() {
        let recent = now() - Duration::hours(1);
        let default = scanner(ActivityRules::default());
        assert_eq!(
            default.step(ScanState::Scanning, &record(comment("alice"), recent)),
            ScanState::Scanning
        );

        let counting = scanner(ActivityRules {
            count_authored_posts: true,
        });
        assert_eq!(
            counting.step(ScanState::Scanning, &record(comment("alice"), recent)),
            ScanState::Found
        );
        assert_eq!(
            counting.step(ScanState::Scanning, &record(comment("bob"), recent)),
            ScanState::Scanning
        );
    }

    #[test]
    fn reblog_by_subject_is_found() {
        let s = scanner(ActivityRules::default());
        assert!(s.is_activity(&custom(
            "follow",
            r#"["reblog",{"account":"alice","author":"bob","permlink":"p"}]"#
        )));
        assert!(!s.is_activity(&custom(
            "follow",
            r#"["reblog",{"account":"carol","author":"bob","permlink":"p"}]"#
        )));
        assert!(!s.is_activity(&custom(
            "follow",
            r#"["follow",{"follower":"alice","following":"bob","what":["blog"]}]"#
        )));
        assert!(!s.is_activity(&custom(
            "market",
            r#"["reblog",{"account":"alice"}]"#
        )));
        assert!(!s.is_activity(&custom("follow", "not json")));
        assert!(!s.is_activity(&other()));
    }

    /// 150 recent records, ids 0..=149; the subject's only vote is at id 42.
    fn history_with_vote_at_42() -> Vec<HistoryEntry> {
        (0..150u64)
            .map(|seq| {
                let at = now() - Duration::minutes(150 - seq as i64);
                let op = if seq == 42 { vote("alice") } else { vote("bob") };
                HistoryEntry::new(seq, at, op)
            })
            .collect()
    }

    #[tokio::test]
    async fn finds_vote_on_third_page_and_stops() {
        let chain = MockChain::new(now()).with_history("alice", history_with_vote_at_42());
        let outcome = scan_history(&chain, &scanner(ActivityRules::default()), SCAN_WINDOW)
            .await
            .unwrap();

        assert!(outcome.found());
        assert_eq!(outcome.pages, 3);
        let requests = chain.calls().history_for("alice");
        let cursors: Vec<_> = requests.iter().map(|r| (r.from, r.limit)).collect();
        // [99..=149], [48..=98], [0..=47]
        assert_eq!(
            cursors,
            vec![
                (HistoryCursor::Latest, 50),
                (HistoryCursor::At(98), 50),
                (HistoryCursor::At(47), 47),
            ]
        );
    }

    #[tokio::test]
    async fn stops_at_page_containing_the_vote() {
        // Vote at 120 lies in the first window; nothing older is fetched.
        let history: Vec<HistoryEntry> = (0..150u64)
            .map(|seq| {
                let op = if seq == 120 { vote("alice") } else { other() };
                HistoryEntry::new(seq, now() - Duration::minutes(150 - seq as i64), op)
            })
            .collect();
        let chain = MockChain::new(now()).with_history("alice", history);

        let outcome = scan_history(&chain, &scanner(ActivityRules::default()), SCAN_WINDOW)
            .await
            .unwrap();
        assert!(outcome.found());
        assert_eq!(chain.calls().history.len(), 1);
    }

    #[tokio::test]
    async fn history_older_than_horizon_expires_after_one_page() {
        let history: Vec<HistoryEntry> = (0..500u64)
            .map(|seq| {
                let at = horizon() - Duration::days(1) - Duration::minutes(500 - seq as i64);
                HistoryEntry::new(seq, at, vote("alice"))
            })
            .collect();
        let chain = MockChain::new(now()).with_history("alice", history);

        let outcome = scan_history(&chain, &scanner(ActivityRules::default()), SCAN_WINDOW)
            .await
            .unwrap();
        assert_eq!(outcome.state, ScanState::Expired);
        assert!(!outcome.found());
        assert_eq!(outcome.pages, 1);
    }

    #[tokio::test]
    async fn short_recent_history_without_activity_reaches_start() {
        // 120 recent records, none by alice: walk to the start of history.
        let history: Vec<HistoryEntry> = (0..120u64)
            .map(|seq| HistoryEntry::new(seq, now() - Duration::minutes(1), vote("bob")))
            .collect();
        let chain = MockChain::new(now()).with_history("alice", history);

        let outcome = scan_history(&chain, &scanner(ActivityRules::default()), SCAN_WINDOW)
            .await
            .unwrap();
        assert_eq!(outcome.state, ScanState::Scanning);
        assert!(!outcome.found());
        // [69..=119], [18..=68], [0..=17]
        let cursors: Vec<_> = chain
            .calls()
            .history
            .iter()
            .map(|r| (r.from, r.limit))
            .collect();
        assert_eq!(
            cursors,
            vec![
                (HistoryCursor::Latest, 50),
                (HistoryCursor::At(68), 50),
                (HistoryCursor::At(17), 17),
            ]
        );
    }

    #[tokio::test]
    async fn empty_history_is_not_found() {
        let chain = MockChain::new(now());
        let outcome = scan_history(&chain, &scanner(ActivityRules::default()), SCAN_WINDOW)
            .await
            .unwrap();
        assert!(!outcome.found());
        assert_eq!(outcome.pages, 1);
    }

    #[tokio::test]
    async fn malformed_page_aborts_scan_only() {
        let chain = MockChain::new(now()).with_malformed_history("alice");
        let outcome = scan_history(&chain, &scanner(ActivityRules::default()), SCAN_WINDOW)
            .await
            .unwrap();
        assert!(outcome.aborted);
        assert!(!outcome.found());
    }

    /// A node that answers every history request with the same records,
    /// whatever the cursor.
    struct FixedPage {
        entries: Vec<HistoryEntry>,
        requests: AtomicUsize,
    }

    impl FixedPage {
        fn new(entries: Vec<HistoryEntry>) -> Self {
            Self {
                entries,
                requests: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainApi for FixedPage {
        async fn dynamic_global_properties(&self) -> Result<DynamicGlobalProperties, ChainError> {
            Ok(DynamicGlobalProperties { time: now() })
        }

        async fn accounts(&self, _names: &[AccountName]) -> Result<Vec<Account>, ChainError> {
            Ok(Vec::new())
        }

        async fn followers(
            &self,
            _account: &str,
            _start: &str,
            _kind: FollowKind,
            _limit: u32,
        ) -> Result<Vec<FollowEntry>, ChainError> {
            Ok(Vec::new())
        }

        async fn account_history(
            &self,
            _account: &str,
            _from: HistoryCursor,
            _limit: u32,
        ) -> Result<Vec<HistoryEntry>, ChainError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.clone())
        }
    }

    /// Twenty own votes older than the horizon, then one recent own vote at id 20.
    fn old_history_with_recent_vote() -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = (0..20u64)
            .map(|seq| HistoryEntry::new(seq, horizon() - Duration::days(1), vote("alice")))
            .collect();
        entries.push(HistoryEntry::new(20, now() - Duration::hours(1), vote("alice")));
        entries
    }

    #[tokio::test]
    async fn page_mixing_old_and_recent_records_is_read_newest_first() {
        let chain = MockChain::new(now()).with_history("alice", old_history_with_recent_vote());
        let outcome = scan_history(&chain, &scanner(ActivityRules::default()), SCAN_WINDOW)
            .await
            .unwrap();

        assert_eq!(outcome.state, ScanState::Found);
        assert_eq!(outcome.pages, 1);
    }

    #[tokio::test]
    async fn descending_page_is_read_newest_first() {
        let mut entries = old_history_with_recent_vote();
        entries.reverse();
        let chain = FixedPage::new(entries);

        let outcome = scan_history(&chain, &scanner(ActivityRules::default()), SCAN_WINDOW)
            .await
            .unwrap();

        assert_eq!(outcome.state, ScanState::Found);
        assert_eq!(chain.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn node_ignoring_the_cursor_aborts_the_scan() {
        // Records 100..=150 at every cursor: the second request asks for
        // ids up to 99 and gets 150 back.
        let entries = (100..=150u64)
            .map(|seq| HistoryEntry::new(seq, now() - Duration::minutes(1), vote("bob")))
            .collect();
        let chain = FixedPage::new(entries);

        let outcome = scan_history(&chain, &scanner(ActivityRules::default()), SCAN_WINDOW)
            .await
            .unwrap();

        assert!(outcome.aborted);
        assert!(!outcome.found());
        assert_eq!(outcome.pages, 2);
        assert_eq!(chain.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let chain = MockChain::new(now())
            .with_failing_history("alice", ChainError::Transport("closed".to_string()));
        let result = scan_history(&chain, &scanner(ActivityRules::default()), SCAN_WINDOW).await;
        assert!(matches!(
            result,
            Err(EligibilityError::Chain(ChainError::Transport(_)))
        ));
    }
}
