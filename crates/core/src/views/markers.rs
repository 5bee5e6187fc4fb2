use serde::Serialize;

use crate::layout::LaneLayout;
use crate::model::TimeBase;
use crate::store::KeyValueStore;
use crate::time::{Timestamp, format_time, time_of_day_difference};

/// Vertical time marker drawn inside a lane's band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneMarker {
    pub lane: usize,
    pub x: f64,
    pub label: String,
    /// Offset to the race start, `MM:SS.CC` below one hour.
    pub relative: Option<String>,
}

pub fn lane_markers<S: KeyValueStore>(
    layout: &LaneLayout<S>,
    time_base: &impl TimeBase,
    race_start: Option<&Timestamp>,
) -> Vec<LaneMarker> {
    layout
        .lanes()
        .iter()
        .filter_map(|lane| {
            let time = lane.assigned_time?;
            let x = layout.x_from_time(&time, time_base)?;
            Some(LaneMarker {
                lane: lane.index,
                x,
                label: format_time(&time, false),
                relative: race_start
                    .map(|start| format_time(&time_of_day_difference(&time, start), true)),
            })
        })
        .collect()
}
