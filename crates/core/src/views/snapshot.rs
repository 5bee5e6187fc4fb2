use serde::Serialize;

use super::{FrameTile, LaneMarker, RankedLane, frame_tiles, lane_markers, rank_lanes};
use crate::layout::LaneLayout;
use crate::model::{Lane, TimeBase};
use crate::scheduler::PollScheduler;
use crate::store::KeyValueStore;
use crate::time::{Timestamp, format_time, time_of_day_difference};

/// Time under the pointer, as shown in the heads-up display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Crosshair {
    pub time: Timestamp,
    pub label: String,
    pub relative: Option<String>,
}

/// Everything a renderer needs for one frame of the measuring view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub loaded: bool,
    pub live: bool,
    pub last_error: Option<String>,
    pub time_start: Option<Timestamp>,
    pub time_end: Option<Timestamp>,
    pub image_width: f64,
    pub image_height: f64,
    pub lanes: Vec<Lane>,
    pub heights: Vec<f64>,
    pub active_lane: Option<usize>,
    pub crosshair: Option<Crosshair>,
    pub tiles: Vec<FrameTile>,
    pub markers: Vec<LaneMarker>,
    pub ranking: Vec<RankedLane>,
}

impl ViewSnapshot {
    pub fn capture<S: KeyValueStore>(
        scheduler: &PollScheduler,
        layout: &LaneLayout<S>,
        race_start: Option<&Timestamp>,
        now: Timestamp,
    ) -> Self {
        let time_start = scheduler.time_start(0);
        let crosshair = layout.crosshair().map(|time| Crosshair {
            time,
            label: format_time(&time, false),
            relative: race_start.map(|start| format_time(&time_of_day_difference(&time, start), true)),
        });
        Self {
            loaded: scheduler.loaded(),
            live: scheduler.is_live(now),
            last_error: scheduler.last_error().map(str::to_string),
            time_start,
            time_end: scheduler.time_end(),
            image_width: scheduler.image_width(),
            image_height: scheduler.image_height(),
            lanes: layout.lanes().to_vec(),
            heights: layout.heights().to_vec(),
            active_lane: layout.active_lane().map(|lane| lane.index),
            crosshair,
            tiles: frame_tiles(scheduler, now),
            markers: lane_markers(layout, scheduler, race_start),
            ranking: rank_lanes(layout.lanes(), time_start.as_ref()),
        }
    }
}
