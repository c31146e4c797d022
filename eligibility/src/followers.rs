use std::collections::HashSet;

use subreward_chain::{AccountName, ChainApi, FollowKind};

use crate::types::*;

/// Followers requested per page. A full page means there may be more.
pub const FOLLOWER_PAGE_SIZE: u32 = 100;

/// Collect every blog follower of `account`, deduplicated, in discovery order.
///
/// Each page after the first starts at the last follower of the previous
/// page; the node includes that start entry again, so pages overlap by one.
/// Collection stops at the first page shorter than the page size, or at a
/// page that adds no new follower.
pub async fn collect_followers<C>(
    chain: &C,
    account: &str,
) -> Result<Vec<AccountName>, EligibilityError>
where
    C: ChainApi + ?Sized,
{
    let mut seen: HashSet<AccountName> = HashSet::new();
    let mut followers = Vec::new();
    let mut start = String::new();
    let mut pages = 0usize;

    loop {
        tracing::trace!(%account, start = %start, "fetching followers page");
        let page = chain
            .followers(account, &start, FollowKind::Blog, FOLLOWER_PAGE_SIZE)
            .await?;
        pages += 1;

        let before = followers.len();
        for entry in &page {
            if seen.insert(entry.follower.clone()) {
                tracing::trace!(follower = %entry.follower, "add follower");
                followers.push(entry.follower.clone());
            }
        }
        if followers.len() == before && !page.is_empty() {
            tracing::warn!(%account, start = %start, "followers page added nothing new, stopping");
            break;
        }

        match page.last() {
            Some(last) if page.len() == FOLLOWER_PAGE_SIZE as usize => {
                start = last.follower.clone();
            }
            _ => break,
        }
    }

    tracing::debug!(%account, pages, followers = followers.len(), "followers collected");
    Ok(followers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use subreward_chain::mock::MockChain;

    fn names(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("{prefix}{i:04}")).collect()
    }

    #[tokio::test]
    async fn three_pages_100_100_37() {
        let chain = MockChain::new(Utc::now()).with_follower_pages(vec![
            names("f", 0..100),
            names("f", 100..200),
            names("f", 200..237),
        ]);

        let followers = collect_followers(&chain, "blogger").await.unwrap();

        assert_eq!(followers.len(), 237);
        let calls = chain.calls();
        assert_eq!(calls.followers.len(), 3);
        assert_eq!(calls.followers[0], "");
        assert_eq!(calls.followers[1], "f0099");
        assert_eq!(calls.followers[2], "f0199");
    }

    #[tokio::test]
    async fn overlapping_pages_are_deduplicated() {
        // Node semantics: every page starts with the previous page's last entry.
        let all = names("u", 0..250);
        let chain = MockChain::new(Utc::now()).with_followers(all.clone());

        let followers = collect_followers(&chain, "blogger").await.unwrap();

        assert_eq!(followers, all);
        // 0..100, 99..199, 198..250 (52 entries)
        assert_eq!(chain.calls().followers.len(), 3);
    }

    #[tokio::test]
    async fn empty_first_page_ends_without_error() {
        let chain = MockChain::new(Utc::now());
        let followers = collect_followers(&chain, "loner").await.unwrap();
        assert!(followers.is_empty());
        assert_eq!(chain.calls().followers.len(), 1);
    }

    #[tokio::test]
    async fn repeated_full_page_stops_collection() {
        let page = names("f", 0..100);
        let chain = MockChain::new(Utc::now()).with_follower_pages(vec![
            page.clone(),
            page.clone(),
            page.clone(),
            page,
        ]);

        let followers = collect_followers(&chain, "blogger").await.unwrap();

        assert_eq!(followers.len(), 100);
        assert_eq!(chain.calls().followers.len(), 2);
    }

    #[tokio::test]
    async fn exact_page_multiple_needs_one_more_fetch() {
        let chain = MockChain::new(Utc::now()).with_follower_pages(vec![names("f", 0..100)]);
        let followers = collect_followers(&chain, "blogger").await.unwrap();
        assert_eq!(followers.len(), 100);
        // The second (empty) page signals the end.
        assert_eq!(chain.calls().followers.len(), 2);
    }
}
