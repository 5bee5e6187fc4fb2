//! Lane layout and pointer → time mapping.
//!
//! Lanes are horizontal bands stacked over the frame strip. Their heights
//! are percentages of the lane area that always sum to 100, none below
//! [`MIN_LANE_SHARE`]. Pointer input arrives through typed methods; the
//! layout answers with [`LayoutEvent`]s for the embedding view.

use chrono::DateTime;
use finishcam_protocol::{LAYOUTS_KEY, LayoutBook, LayoutRecord};
use serde::{Deserialize, Serialize};

use crate::model::{Lane, LaneDeclaration, TimeBase};
use crate::store::{KeyValueStore, StoreError};
use crate::time::{Timestamp, checked_add_seconds, format_time, parse_time, seconds_between};

/// Smallest share of the lane area, in percent, a lane can be resized to.
pub const MIN_LANE_SHARE: f64 = 2.0;
/// Height of the grab zone at the bottom edge of a lane label.
pub const RESIZE_HANDLE_PX: f64 = 3.0;
pub const PRIMARY_BUTTON: u16 = 1;

/// Geometry measured by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewGeometry {
    /// Viewport x of the first frame's left edge.
    pub strip_left: f64,
    /// Rendered frame width divided by native frame width.
    pub scale: f64,
    pub lanes_top: f64,
    pub lanes_height: f64,
}

impl Default for ViewGeometry {
    fn default() -> Self {
        Self {
            strip_left: 0.0,
            scale: 1.0,
            lanes_top: 0.0,
            lanes_height: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The label column of a lane.
    LaneLabel(usize),
    /// Anywhere over the frame strip.
    Strip,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
    /// Bit set of held buttons, `PRIMARY_BUTTON` = 1.
    pub buttons: u16,
    pub target: PointerTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent {
    HeightsChanged(Vec<f64>),
    TimeAssigned { lane: usize, time: Timestamp },
    TimeCleared { lane: usize },
}

#[derive(Debug)]
pub struct LaneLayout<S: KeyValueStore> {
    instance_id: String,
    lanes: Vec<Lane>,
    heights: Vec<f64>,
    geometry: ViewGeometry,
    active_lane: Option<usize>,
    resizing: Option<usize>,
    crosshair: Option<Timestamp>,
    times_dirty: bool,
    store: S,
}

impl<S: KeyValueStore> LaneLayout<S> {
    /// Build the lanes of one view instance.
    ///
    /// Heights come from `external_heights`, then the stored record of
    /// `instance_id`, then an equal split, element by element. Preset input
    /// values are parsed onto `base_date`; lanes without one get their stored
    /// marked time back.
    pub fn new(
        declarations: &[LaneDeclaration],
        base_date: Option<&Timestamp>,
        instance_id: impl Into<String>,
        external_heights: Option<&[f64]>,
        store: S,
    ) -> Self {
        let instance_id = instance_id.into();
        let record = load_book(&store).remove(&instance_id).unwrap_or_default();

        let mut lanes: Vec<Lane> = declarations
            .iter()
            .enumerate()
            .map(|(index, declaration)| Lane::from_declaration(index, declaration))
            .collect();
        for lane in &mut lanes {
            lane.assigned_time = preset_time(lane, base_date)
                .or_else(|| stored_time(&record, lane.index));
        }

        let heights = initial_heights(
            lanes.len(),
            external_heights,
            Some(record.lane_height_percentages.as_slice()),
        );

        Self {
            instance_id,
            lanes,
            heights,
            geometry: ViewGeometry::default(),
            active_lane: None,
            resizing: None,
            crosshair: None,
            times_dirty: false,
            store,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn geometry(&self) -> ViewGeometry {
        self.geometry
    }

    pub fn set_geometry(&mut self, geometry: ViewGeometry) {
        self.geometry = geometry;
    }

    pub fn active_lane(&self) -> Option<&Lane> {
        self.active_lane.and_then(|i| self.lanes.get(i))
    }

    /// Lane whose lower edge is being dragged.
    pub fn resizing(&self) -> Option<usize> {
        self.resizing
    }

    /// Time under the pointer.
    pub fn crosshair(&self) -> Option<Timestamp> {
        self.crosshair
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Session time at viewport x, using the session's first frame as origin.
    /// `None` when x maps outside the representable time range.
    pub fn time_from_x(&self, x: f64, time_base: &impl TimeBase) -> Option<Timestamp> {
        let start = time_base.time_start(0)?;
        let px_per_second = time_base.px_per_second().filter(|p| *p > 0.0)?;
        let scale = self.geometry.scale;
        if !(scale > 0.0 && x.is_finite()) {
            return None;
        }
        checked_add_seconds(&start, (x - self.geometry.strip_left) / px_per_second / scale)
    }

    pub fn x_from_time(&self, time: &Timestamp, time_base: &impl TimeBase) -> Option<f64> {
        let start = time_base.time_start(0)?;
        let px_per_second = time_base.px_per_second().filter(|p| *p > 0.0)?;
        Some(
            self.geometry.strip_left
                + seconds_between(time, &start) * px_per_second * self.geometry.scale,
        )
    }

    /// Top edge and height of lane `index` in viewport pixels.
    pub fn lane_band(&self, index: usize) -> Option<(f64, f64)> {
        let height = self.heights.get(index)?;
        let px_per_percent = self.geometry.lanes_height / 100.0;
        let above: f64 = self.heights[..index].iter().sum();
        Some((
            self.geometry.lanes_top + above * px_per_percent,
            height * px_per_percent,
        ))
    }

    pub fn on_pointer_down(
        &mut self,
        event: PointerEvent,
        time_base: &impl TimeBase,
    ) -> Vec<LayoutEvent> {
        match event.target {
            PointerTarget::LaneLabel(lane) => {
                if lane + 1 < self.lanes.len() && self.on_resize_handle(lane, event.y) {
                    self.resizing = Some(lane);
                }
                Vec::new()
            }
            PointerTarget::Strip => {
                self.track_pointer(event, time_base);
                self.assign_at_crosshair().into_iter().collect()
            }
        }
    }

    pub fn on_pointer_move(
        &mut self,
        event: PointerEvent,
        time_base: &impl TimeBase,
    ) -> Vec<LayoutEvent> {
        if let Some(lane) = self.resizing {
            self.drag_boundary(lane, event.y);
        }
        self.track_pointer(event, time_base);
        if self.resizing.is_none()
            && event.target == PointerTarget::Strip
            && event.buttons & PRIMARY_BUTTON != 0
        {
            return self.assign_at_crosshair().into_iter().collect();
        }
        Vec::new()
    }

    pub fn on_pointer_up(
        &mut self,
        event: PointerEvent,
        time_base: &impl TimeBase,
    ) -> Vec<LayoutEvent> {
        let events = self.on_resize_end();
        self.track_pointer(event, time_base);
        events
    }

    pub fn on_pointer_leave(&mut self) -> Vec<LayoutEvent> {
        self.on_resize_end()
    }

    /// Finish a resize or drag: persist and report changed heights.
    pub fn on_resize_end(&mut self) -> Vec<LayoutEvent> {
        let mut events = Vec::new();
        if self.resizing.take().is_some() {
            self.persist();
            events.push(LayoutEvent::HeightsChanged(self.heights.clone()));
        } else if self.times_dirty {
            self.persist();
        }
        events
    }

    /// Move the boundary between `lane` and `lane + 1` so that `fraction`
    /// of their combined height goes to `lane`. Other lanes are untouched.
    pub fn resize(&mut self, lane: usize, fraction: f64) {
        if lane + 1 >= self.heights.len() || !fraction.is_finite() {
            return;
        }
        let total = self.heights[lane] + self.heights[lane + 1];
        if total < 2.0 * MIN_LANE_SHARE {
            return;
        }
        let share = (total * fraction).clamp(MIN_LANE_SHARE, total - MIN_LANE_SHARE);
        self.heights[lane] = share;
        self.heights[lane + 1] = total - share;
    }

    pub fn assign_time(&mut self, lane: usize, time: Timestamp) -> Option<LayoutEvent> {
        let target = self.lanes.get_mut(lane)?;
        if target.assigned_time == Some(time) {
            return None;
        }
        target.assigned_time = Some(time);
        if let Some(input) = target.bound_input.as_mut() {
            *input = format_time(&time, false);
        }
        self.times_dirty = true;
        Some(LayoutEvent::TimeAssigned { lane, time })
    }

    pub fn delete_time(&mut self, lane: usize) -> Option<LayoutEvent> {
        let target = self.lanes.get_mut(lane)?;
        target.assigned_time.take()?;
        if let Some(input) = target.bound_input.as_mut() {
            input.clear();
        }
        self.times_dirty = true;
        self.persist();
        Some(LayoutEvent::TimeCleared { lane })
    }

    pub fn delete_active_time(&mut self) -> Option<LayoutEvent> {
        self.delete_time(self.active_lane?)
    }

    fn on_resize_handle(&self, lane: usize, y: f64) -> bool {
        match self.lane_band(lane) {
            Some((top, height)) if height > 0.0 => {
                let bottom = top + height;
                y > bottom - RESIZE_HANDLE_PX && y <= bottom + RESIZE_HANDLE_PX
            }
            _ => false,
        }
    }

    fn drag_boundary(&mut self, lane: usize, y: f64) {
        let (Some((top, upper)), Some((_, lower))) = (self.lane_band(lane), self.lane_band(lane + 1))
        else {
            return;
        };
        let total_height = upper + lower;
        if total_height > 0.0 {
            self.resize(lane, (y - top) / total_height);
        }
    }

    fn track_pointer(&mut self, event: PointerEvent, time_base: &impl TimeBase) {
        self.crosshair = self.time_from_x(event.x, time_base);
        // Keep the active lane while a button is held so drags do not flicker.
        if event.buttons == 0 {
            self.active_lane = (0..self.lanes.len()).find(|&i| {
                self.lane_band(i)
                    .is_some_and(|(top, height)| top <= event.y && event.y <= top + height)
            });
        }
    }

    fn assign_at_crosshair(&mut self) -> Option<LayoutEvent> {
        let time = self.crosshair?;
        let lane = self.active_lane?;
        self.assign_time(lane, time)
    }

    fn persist(&mut self) {
        let mut book = load_book(&self.store);
        book.insert(
            self.instance_id.clone(),
            LayoutRecord {
                lane_height_percentages: self.heights.clone(),
                marked_times: self
                    .lanes
                    .iter()
                    .map(|lane| lane.assigned_time.map(|t| t.to_rfc3339()))
                    .collect(),
            },
        );
        let result = serde_json::to_value(&book)
            .map_err(StoreError::from)
            .and_then(|value| self.store.set(LAYOUTS_KEY, value));
        match result {
            Ok(()) => self.times_dirty = false,
            Err(e) => log::warn!("could not persist layout of {}: {e}", self.instance_id),
        }
    }
}

fn load_book(store: &impl KeyValueStore) -> LayoutBook {
    let Some(value) = store.get(LAYOUTS_KEY) else {
        return LayoutBook::new();
    };
    serde_json::from_value(value).unwrap_or_else(|e| {
        log::warn!("ignoring malformed stored layouts: {e}");
        LayoutBook::new()
    })
}

fn preset_time(lane: &Lane, base_date: Option<&Timestamp>) -> Option<Timestamp> {
    let text = lane.bound_input.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }
    parse_time(text, base_date)
        .inspect_err(|e| log::warn!("ignoring preset time of lane {:?}: {e}", lane.label))
        .ok()
}

fn stored_time(record: &LayoutRecord, index: usize) -> Option<Timestamp> {
    let text = record.marked_times.get(index)?.as_deref()?;
    DateTime::parse_from_rfc3339(text)
        .inspect_err(|e| log::warn!("ignoring stored time {text:?}: {e}"))
        .ok()
}

/// Merge height sources element-wise and normalize to 100.
pub fn initial_heights(
    lane_count: usize,
    external: Option<&[f64]>,
    stored: Option<&[f64]>,
) -> Vec<f64> {
    if lane_count == 0 {
        return Vec::new();
    }
    let equal = 100.0 / lane_count as f64;
    let pick = |source: Option<&[f64]>, i: usize| {
        source
            .and_then(|s| s.get(i).copied())
            .filter(|h| h.is_finite() && *h > 0.0)
    };
    let mut heights: Vec<f64> = (0..lane_count)
        .map(|i| pick(external, i).or_else(|| pick(stored, i)).unwrap_or(equal))
        .collect();
    normalize(&mut heights);
    heights
}

/// Scale to a sum of 100, then lift shares below the floor, taking the
/// difference from the remaining lanes proportionally.
fn normalize(heights: &mut [f64]) {
    let n = heights.len();
    if n == 0 {
        return;
    }
    if n as f64 * MIN_LANE_SHARE > 100.0 {
        heights.fill(100.0 / n as f64);
        return;
    }

    let sum: f64 = heights.iter().sum();
    for h in heights.iter_mut() {
        *h *= 100.0 / sum;
    }

    let mut pinned = vec![false; n];
    for _ in 0..n {
        let mut lifted = false;
        for (h, pin) in heights.iter_mut().zip(pinned.iter_mut()) {
            if !*pin && *h < MIN_LANE_SHARE {
                *h = MIN_LANE_SHARE;
                *pin = true;
                lifted = true;
            }
        }
        if !lifted {
            break;
        }
        let pinned_total = pinned.iter().filter(|p| **p).count() as f64 * MIN_LANE_SHARE;
        let free_total: f64 = heights
            .iter()
            .zip(&pinned)
            .filter(|(_, pin)| !**pin)
            .map(|(h, _)| *h)
            .sum();
        if free_total <= 0.0 {
            break;
        }
        let factor = (100.0 - pinned_total) / free_total;
        for (h, pin) in heights.iter_mut().zip(&pinned) {
            if !*pin {
                *h *= factor;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SessionClock, SessionMetadata};
    use crate::store::MemoryStore;
    use crate::time::seconds;
    use chrono::FixedOffset;
    use serde_json::json;

    fn clock() -> SessionClock {
        SessionClock::new(
            SessionMetadata {
                time_start: 1_760_000_000.0,
                time_span: 10.0,
                last_index: Some(5),
                px_per_second: Some(100.0),
                frame_height: Some(400.0),
            },
            FixedOffset::east_opt(2 * 3600).unwrap(),
        )
    }

    fn lanes(n: usize) -> Vec<LaneDeclaration> {
        (0..n)
            .map(|i| LaneDeclaration::labeled(format!("Runner {}", i + 1)))
            .collect()
    }

    fn layout(n: usize) -> LaneLayout<MemoryStore> {
        let mut layout = LaneLayout::new(&lanes(n), None, "view-1", None, MemoryStore::new());
        layout.set_geometry(ViewGeometry {
            strip_left: 10.0,
            scale: 0.5,
            lanes_top: 0.0,
            lanes_height: 400.0,
        });
        layout
    }

    fn sum(heights: &[f64]) -> f64 {
        heights.iter().sum()
    }

    fn pointer(x: f64, y: f64, buttons: u16, target: PointerTarget) -> PointerEvent {
        PointerEvent {
            x,
            y,
            buttons,
            target,
        }
    }

    #[test]
    fn equal_split_by_default() {
        let layout = layout(4);
        assert_eq!(layout.heights(), &[25.0, 25.0, 25.0, 25.0]);
        assert_eq!(layout.lanes()[2].label, "Runner 3");
    }

    #[test]
    fn override_beats_stored_beats_equal_split() {
        let mut store = MemoryStore::new();
        store
            .set(
                LAYOUTS_KEY,
                json!({"view-1": {"laneHeightPercentages": [10.0, 60.0, 30.0]}}),
            )
            .unwrap();
        let layout = LaneLayout::new(&lanes(3), None, "view-1", Some(&[20.0][..]), store);
        // Raw [20, 60, 30] sums to 110.
        let expected = [20.0 / 1.1, 60.0 / 1.1, 30.0 / 1.1];
        for (h, e) in layout.heights().iter().zip(expected) {
            assert!((h - e).abs() < 1e-9, "{:?}", layout.heights());
        }
        assert!((sum(layout.heights()) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn other_instances_do_not_leak() {
        let mut store = MemoryStore::new();
        store
            .set(LAYOUTS_KEY, json!({"view-2": {"laneHeightPercentages": [90.0, 10.0]}}))
            .unwrap();
        let layout = LaneLayout::new(&lanes(2), None, "view-1", None, store);
        assert_eq!(layout.heights(), &[50.0, 50.0]);
    }

    #[test]
    fn initial_heights_respect_the_floor() {
        let heights = initial_heights(3, Some(&[0.5, 99.0, 0.5][..]), None);
        assert!((sum(&heights) - 100.0).abs() < 1e-6);
        assert!(heights.iter().all(|h| *h >= MIN_LANE_SHARE - 1e-9), "{heights:?}");

        let heights = initial_heights(4, Some(&[f64::NAN, -3.0, 50.0, 50.0][..]), None);
        assert!((sum(&heights) - 100.0).abs() < 1e-6);
        assert_eq!(initial_heights(0, None, None), Vec::<f64>::new());
    }

    #[test]
    fn resize_keeps_pair_total_and_floor() {
        let mut layout = layout(3);
        for fraction in [-5.0, -0.01, 0.0, 0.01, 0.3, 0.5, 0.99, 1.0, 1.7, 40.0] {
            layout.resize(1, fraction);
            let h = layout.heights();
            assert!((sum(h) - 100.0).abs() < 1e-6, "{h:?}");
            assert!(h.iter().all(|v| *v >= MIN_LANE_SHARE), "{h:?}");
            assert!((h[0] - 100.0 / 3.0).abs() < 1e-9);
        }
        // The last lane has no lower neighbour.
        let before = layout.heights().to_vec();
        layout.resize(2, 0.5);
        assert_eq!(layout.heights(), &before[..]);
    }

    #[test]
    fn drag_resize_persists_on_release() {
        let mut layout = layout(2);
        let clock = clock();
        // Lane 0 spans 0..200 px, its grab zone is the bottom 3 px.
        let events = layout.on_pointer_down(pointer(0.0, 150.0, 1, PointerTarget::LaneLabel(0)), &clock);
        assert!(events.is_empty());
        assert_eq!(layout.resizing(), None);

        layout.on_pointer_down(pointer(0.0, 199.0, 1, PointerTarget::LaneLabel(0)), &clock);
        assert_eq!(layout.resizing(), Some(0));

        layout.on_pointer_move(pointer(0.0, 100.0, 1, PointerTarget::LaneLabel(0)), &clock);
        assert_eq!(layout.heights(), &[25.0, 75.0]);
        layout.on_pointer_move(pointer(0.0, -50.0, 1, PointerTarget::LaneLabel(0)), &clock);
        assert_eq!(layout.heights(), &[MIN_LANE_SHARE, 100.0 - MIN_LANE_SHARE]);
        layout.on_pointer_move(pointer(0.0, 300.0, 1, PointerTarget::LaneLabel(0)), &clock);
        assert_eq!(layout.heights(), &[75.0, 25.0]);

        let events = layout.on_pointer_up(pointer(0.0, 300.0, 0, PointerTarget::LaneLabel(0)), &clock);
        assert_eq!(events, vec![LayoutEvent::HeightsChanged(vec![75.0, 25.0])]);
        assert_eq!(layout.resizing(), None);

        let stored = layout.store().get(LAYOUTS_KEY).unwrap();
        assert_eq!(stored["view-1"]["laneHeightPercentages"], json!([75.0, 25.0]));

        let restored = LaneLayout::new(&lanes(2), None, "view-1", None, layout.into_store());
        assert_eq!(restored.heights(), &[75.0, 25.0]);
    }

    #[test]
    fn last_lane_cannot_start_a_resize() {
        let mut layout = layout(2);
        layout.on_pointer_down(pointer(0.0, 399.0, 1, PointerTarget::LaneLabel(1)), &clock());
        assert_eq!(layout.resizing(), None);
    }

    #[test]
    fn leaving_the_view_ends_a_resize() {
        let mut layout = layout(2);
        layout.on_pointer_down(pointer(0.0, 199.0, 1, PointerTarget::LaneLabel(0)), &clock());
        let events = layout.on_pointer_leave();
        assert!(matches!(&events[..], [LayoutEvent::HeightsChanged(_)]));
        assert!(layout.on_pointer_leave().is_empty());
    }

    #[test]
    fn x_maps_to_time_and_back() {
        let layout = layout(2);
        let clock = clock();
        let start = clock.time_start(0).unwrap();
        // 100 px/s at scale 0.5 is 50 viewport px per second.
        let t = layout.time_from_x(10.0 + 125.0, &clock).unwrap();
        assert_eq!((t - start).num_milliseconds(), 2_500);
        let x = layout.x_from_time(&t, &clock).unwrap();
        assert!((x - 135.0).abs() < 1e-6);
    }

    #[test]
    fn x_beyond_the_time_range_maps_to_nothing() {
        let mut layout = layout(2);
        layout.set_geometry(ViewGeometry {
            strip_left: 10.0,
            scale: 1e-15,
            lanes_top: 0.0,
            lanes_height: 400.0,
        });
        let clock = clock();
        assert_eq!(layout.time_from_x(1000.0, &clock), None);
        assert_eq!(layout.time_from_x(-1000.0, &clock), None);
        assert_eq!(layout.time_from_x(10.0, &clock), clock.time_start(0));
    }

    #[test]
    fn mapping_needs_metadata() {
        let layout = layout(2);
        let mut metadata = clock().metadata;
        metadata.px_per_second = None;
        let clock = SessionClock::new(metadata, FixedOffset::east_opt(0).unwrap());
        assert_eq!(layout.time_from_x(50.0, &clock), None);
    }

    #[test]
    fn click_assigns_time_to_active_lane() {
        let mut layout = LaneLayout::new(
            &[
                LaneDeclaration::labeled("Anna").with_input(""),
                LaneDeclaration::labeled("Ben"),
            ],
            None,
            "view-1",
            None,
            MemoryStore::new(),
        );
        layout.set_geometry(ViewGeometry {
            strip_left: 0.0,
            scale: 1.0,
            lanes_top: 0.0,
            lanes_height: 200.0,
        });
        let clock = clock();

        // Hover selects lane 0, then the press assigns.
        layout.on_pointer_move(pointer(250.0, 40.0, 0, PointerTarget::Strip), &clock);
        assert_eq!(layout.active_lane().map(|l| l.index), Some(0));
        let events = layout.on_pointer_down(pointer(250.0, 40.0, 1, PointerTarget::Strip), &clock);
        let expected = clock.time_start(0).unwrap() + seconds(2.5);
        assert_eq!(events, vec![LayoutEvent::TimeAssigned { lane: 0, time: expected }]);
        assert_eq!(layout.lanes()[0].assigned_time, Some(expected));
        assert_eq!(
            layout.lanes()[0].bound_input.as_deref(),
            Some(format_time(&expected, false).as_str())
        );

        // Dragging into lane 1's band keeps lane 0 active.
        let events = layout.on_pointer_move(pointer(300.0, 150.0, 1, PointerTarget::Strip), &clock);
        assert_eq!(layout.active_lane().map(|l| l.index), Some(0));
        assert!(matches!(&events[..], [LayoutEvent::TimeAssigned { lane: 0, .. }]));

        // Releasing persists the marked time.
        layout.on_pointer_up(pointer(300.0, 150.0, 0, PointerTarget::Strip), &clock);
        assert_eq!(layout.active_lane().map(|l| l.index), Some(1));
        let stored = layout.store().get(LAYOUTS_KEY).unwrap();
        assert!(stored["view-1"]["markedTimes"][0].is_string());
        assert!(stored["view-1"]["markedTimes"][1].is_null());
    }

    #[test]
    fn delete_clears_time_and_input() {
        let clock = clock();
        let base = clock.time_start(0).unwrap();
        let mut layout = LaneLayout::new(
            &[LaneDeclaration::labeled("Anna").with_input("12:00:01.50")],
            Some(&base),
            "view-1",
            None,
            MemoryStore::new(),
        );
        let preset = layout.lanes()[0].assigned_time.unwrap();
        assert_eq!(preset.date_naive(), base.date_naive());
        assert_eq!(format_time(&preset, false), "12:00:01.50");

        assert_eq!(layout.delete_time(0), Some(LayoutEvent::TimeCleared { lane: 0 }));
        assert_eq!(layout.lanes()[0].assigned_time, None);
        assert_eq!(layout.lanes()[0].bound_input.as_deref(), Some(""));
        assert_eq!(layout.delete_time(0), None);
        assert_eq!(layout.delete_active_time(), None);
    }

    #[test]
    fn marked_times_survive_a_reload() {
        let clock = clock();
        let mut layout = layout(2);
        let t = clock.time_start(1).unwrap();
        layout.assign_time(1, t);
        layout.on_resize_end();

        let restored = LaneLayout::new(&lanes(2), None, "view-1", None, layout.into_store());
        assert_eq!(restored.lanes()[1].assigned_time, Some(t));
        assert_eq!(restored.lanes()[0].assigned_time, None);
    }

    #[test]
    fn unlabeled_lanes_get_numbered() {
        let layout = LaneLayout::new(
            &[LaneDeclaration::default(), LaneDeclaration::labeled("  ")],
            None,
            "v",
            None,
            MemoryStore::new(),
        );
        assert_eq!(layout.lanes()[0].label, "Lane 1");
        assert_eq!(layout.lanes()[1].label, "Lane 2");
    }
}
