use serde::Serialize;

use crate::model::Lane;
use crate::time::{Timestamp, format_time, time_of_day_difference, time_of_day_difference_ms};

/// A lane with a marked time, placed by that time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedLane {
    pub lane: usize,
    pub label: String,
    pub time: Timestamp,
    /// Milliseconds behind the previous ranked lane, or behind the session
    /// start for the first one.
    pub delta_ms: Option<i64>,
    pub delta_label: Option<String>,
}

/// Lanes with a time in ascending time order. Equal times keep lane order.
pub fn rank_lanes(lanes: &[Lane], session_start: Option<&Timestamp>) -> Vec<RankedLane> {
    let mut timed: Vec<(&Lane, Timestamp)> = lanes
        .iter()
        .filter_map(|lane| lane.assigned_time.map(|t| (lane, t)))
        .collect();
    timed.sort_by_key(|(lane, time)| (*time, lane.index));

    let mut previous = session_start.copied();
    timed
        .into_iter()
        .map(|(lane, time)| {
            let reference = previous.replace(time);
            RankedLane {
                lane: lane.index,
                label: lane.label.clone(),
                time,
                delta_ms: reference.map(|r| time_of_day_difference_ms(&time, &r)),
                delta_label: reference
                    .map(|r| format!("+{}", format_time(&time_of_day_difference(&time, &r), true))),
            }
        })
        .collect()
}
