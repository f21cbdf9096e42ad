use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::types::{BetRecord, Feed};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodeStats {
    pub api_total: usize,
    /// Array elements that were not BetRecord-shaped objects.
    pub rejected_shape: usize,
    pub decoded: usize,
}

/// Shared client for feed retrieval.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, FeedError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// GET the pick feed and decode it into a snapshot.
/// Network errors, non-2xx statuses and bodies that are not a JSON array
/// fail the whole fetch. Individual elements that do not decode are dropped.
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<Feed, FeedError> {
    let started = Instant::now();
    let resp = client.get(url).send().await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FeedError::Status(status.as_u16()));
    }

    let body = resp.bytes().await?;
    let value: serde_json::Value = serde_json::from_slice(&body)?;
    let (feed, stats) = decode_feed(value)?;

    if stats.rejected_shape > 0 {
        warn!(
            url,
            rejected = stats.rejected_shape,
            total = stats.api_total,
            "[FEED] dropped records that are not bet objects"
        );
    }
    info!(
        url,
        records = stats.decoded,
        bytes = body.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "[FEED] fetched {} records",
        stats.decoded,
    );

    Ok(feed)
}

/// Decode a feed body. Must be a JSON array; each element is decoded on its
/// own so one bad row does not lose the snapshot.
pub fn decode_feed(value: serde_json::Value) -> Result<(Feed, DecodeStats), FeedError> {
    let serde_json::Value::Array(items) = value else {
        return Err(FeedError::NotAnArray);
    };

    let mut stats = DecodeStats { api_total: items.len(), ..Default::default() };
    let mut feed = Vec::with_capacity(items.len());

    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<BetRecord>(item) {
            Ok(rec) => feed.push(rec),
            Err(e) => {
                debug!(index = idx, "[FEED] rejected element: {e}");
                stats.rejected_shape += 1;
            }
        }
    }

    stats.decoded = feed.len();
    Ok((feed, stats))
}
