// src/ingest/mod.rs
pub mod providers;
pub mod types;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::types::{FeedItem, FeedProvider};

/// Feed entries older than this are not worth summarizing.
pub const FEED_RECENCY_HOURS: u64 = 24;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Total entries parsed from feed providers.");
        describe_counter!("ingest_kept_total", "Entries kept after recency filter + title dedup.");
        describe_counter!("ingest_stale_total", "Entries dropped as older than the recency window.");
        describe_counter!("ingest_dup_title_total", "Entries dropped as duplicate titles within one fetch.");
        describe_counter!("ingest_provider_errors_total", "Provider fetch/parse errors.");
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
    });
}

/// Strip HTML and collapse the text into one clean line.
pub fn normalize_text(s: &str) -> String {
    // HTML entity decode, then drop tags
    let decoded = html_escape::decode_html_entities(s).to_string();
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let mut out = re_tags.replace_all(&decoded, " ").to_string();

    // Typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // Collapse whitespace
    out = out.split_whitespace().collect::<Vec<_>>().join(" ");

    // Length cap: summaries do not need more than this
    if out.chars().count() > 2000 {
        out = out.chars().take(2000).collect();
    }

    out
}

/// Parse an RFC 2822 feed timestamp into unix seconds; 0 when unparseable.
pub fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

/// True iff the feed timestamp falls within the recency window before `now`.
/// Unparseable timestamps are treated as stale.
pub fn is_recent(published: &str, now_unix: u64) -> bool {
    let ts = parse_rfc2822_to_unix(published);
    if ts == 0 {
        return false;
    }
    now_unix.saturating_sub(ts) <= FEED_RECENCY_HOURS * 3600
}

/// Drop stale entries and duplicate titles within one fetch.
/// Returns (kept, stale_count, dup_count).
pub fn filter_fresh_unique(
    now_unix: u64,
    raw: Vec<FeedItem>,
) -> (Vec<FeedItem>, usize, usize) {
    let mut stale = 0usize;
    let mut dups = 0usize;
    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(raw.len());

    for item in raw {
        if !is_recent(&item.published, now_unix) {
            stale += 1;
            continue;
        }
        if !seen_titles.insert(item.title.clone()) {
            dups += 1;
            continue;
        }
        keep.push(item);
    }

    (keep, stale, dups)
}

/// Run ingest once over the given providers.
pub async fn run_once(providers: &[Box<dyn FeedProvider>]) -> (Vec<FeedItem>, usize, usize) {
    ensure_metrics_described();

    let mut raw = Vec::new();
    for p in providers {
        match p.fetch_latest().await {
            Ok(mut v) => raw.append(&mut v),
            Err(e) => {
                tracing::warn!(error = ?e, provider = p.name(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }

    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let (kept, stale, dups) = filter_fresh_unique(now, raw);

    counter!("ingest_kept_total").increment(kept.len() as u64);
    counter!("ingest_stale_total").increment(stale as u64);
    counter!("ingest_dup_title_total").increment(dups as u64);

    (kept, stale, dups)
}
