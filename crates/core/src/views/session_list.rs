//! Session directory listing.

use chrono::{FixedOffset, TimeDelta};
use finishcam_protocol::{SessionIndex, SessionIndexEntry};
use serde::{Deserialize, Serialize};

use crate::time::{Timestamp, checked_add_seconds, from_epoch_seconds};

const DEFAULT_TIME_SPAN: f64 = 10.0;
/// A session whose last frame ended this recently is still listed as live.
const LIVE_GRACE: TimeDelta = TimeDelta::seconds(20);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub key: String,
    pub time_start: Timestamp,
    pub time_end: Timestamp,
    pub image_count: u64,
    pub live: bool,
}

impl SessionSummary {
    fn from_entry(key: &str, entry: &SessionIndexEntry, offset: FixedOffset, now: Timestamp) -> Option<Self> {
        let start = entry.time_start.unwrap_or(0.0);
        let span = entry.time_span.filter(|s| *s > 0.0).unwrap_or(DEFAULT_TIME_SPAN);
        let last_index = entry.last_index.unwrap_or(0).max(0) as u64;
        let time_start = from_epoch_seconds(start, offset)?;
        let time_end = checked_add_seconds(&time_start, span * (last_index + 1) as f64)?;
        Some(Self {
            key: key.to_string(),
            time_start,
            time_end,
            image_count: last_index + 1,
            live: now
                .checked_sub_signed(LIVE_GRACE)
                .is_none_or(|cutoff| time_end > cutoff),
        })
    }
}

/// One row per session, newest first.
pub fn summarize(index: &SessionIndex, offset: FixedOffset, now: Timestamp) -> Vec<SessionSummary> {
    index
        .keys_newest_first()
        .into_iter()
        .filter_map(|key| {
            let entry = index.get(key)?;
            SessionSummary::from_entry(key, entry, offset, now)
                .or_else(|| {
                    log::warn!("skipping session {key} with unrepresentable start or end time");
                    None
                })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct EmbeddedMetadata {
    session_name: Option<String>,
}

/// Session key named by metadata embedded in the host page, if the index
/// lists it.
pub fn select_embedded(index: &SessionIndex, embedded_json: &str) -> Option<String> {
    let embedded: EmbeddedMetadata = serde_json::from_str(embedded_json)
        .inspect_err(|e| log::warn!("could not parse embedded session metadata: {e}"))
        .ok()?;
    embedded.session_name.filter(|name| index.contains(name))
}
