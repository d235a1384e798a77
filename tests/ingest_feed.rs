// tests/ingest_feed.rs
//
// Feed provider + filter pipeline against the embedded RSS fixture:
// parsing, HTML cleanup, recency window, and per-fetch title dedup.

use crypto_content_composer::ingest::providers::cointelegraph_rss::CoinTelegraphRssProvider;
use crypto_content_composer::ingest::types::FeedProvider;
use crypto_content_composer::ingest::{filter_fresh_unique, parse_rfc2822_to_unix};

const FIXTURE: &str = include_str!("fixtures/cointelegraph_rss.xml");

#[tokio::test]
async fn fixture_parses_with_clean_text() {
    let provider = CoinTelegraphRssProvider::from_fixture(FIXTURE);
    let items = provider.fetch_latest().await.expect("parse fixture");

    // All five entries parse (filtering happens later in the pipeline).
    assert_eq!(items.len(), 5);

    let bridge = &items[0];
    assert_eq!(bridge.title, "Layer2 bridge upgrade cuts fees in half");
    assert_eq!(
        bridge.link,
        "https://news.example/articles/layer2-bridge-upgrade"
    );
    // Tags and entities stripped, whitespace collapsed.
    assert_eq!(
        bridge.content,
        "The network's new bridge release reduces settlement costs for users."
    );
}

#[tokio::test]
async fn recency_and_title_dedup_filter_the_fetch() {
    let provider = CoinTelegraphRssProvider::from_fixture(FIXTURE);
    let items = provider.fetch_latest().await.expect("parse fixture");

    // "Now" is one hour after the newest fixture entry.
    let now = parse_rfc2822_to_unix("Tue, 04 Aug 2026 10:15:00 +0000");
    let (kept, stale, dups) = filter_fresh_unique(now, items);

    let titles: Vec<&str> = kept.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Layer2 bridge upgrade cuts fees in half",
            "Custody partnership brings institutional adoption",
        ]
    );
    // The 3-day-old story and the undated one are stale; the syndicated
    // copy is a duplicate title.
    assert_eq!(stale, 2);
    assert_eq!(dups, 1);
}
