//! Per-render view models derived from the session clock and lane layout.

pub mod frame_strip;
pub mod markers;
pub mod ranking;
pub mod session_list;
pub mod snapshot;

pub use frame_strip::{FrameTile, frame_tiles};
pub use markers::{LaneMarker, lane_markers};
pub use ranking::{RankedLane, rank_lanes};
pub use session_list::{SessionSummary, select_embedded, summarize};
pub use snapshot::{Crosshair, ViewSnapshot};
