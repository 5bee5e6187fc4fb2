use serde::Serialize;
use url::Url;

use crate::model::TimeBase;
use crate::scheduler::PollScheduler;
use crate::time::Timestamp;

/// One frame position in the strip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameTile {
    pub index: u64,
    pub uri: Option<Url>,
    pub time_start: Option<Timestamp>,
    /// Placeholder for the frame still being captured; fed by the push
    /// stream rather than loaded from `uri`.
    pub live: bool,
}

/// Most complete-frame tiles a strip holds; older frames are left out.
pub const MAX_TILES: u64 = 10_000;

/// Tiles for the newest [`MAX_TILES`] complete frames, plus a live tile while
/// the session is live.
pub fn frame_tiles(scheduler: &PollScheduler, now: Timestamp) -> Vec<FrameTile> {
    let Some(location) = scheduler.location() else {
        return Vec::new();
    };
    if !scheduler.loaded() {
        return Vec::new();
    }
    let count = scheduler.image_count();
    let tile = |index: u64, live: bool| FrameTile {
        index,
        uri: location
            .image_uri(index)
            .inspect_err(|e| log::debug!("no uri for frame {index}: {e}"))
            .ok(),
        time_start: scheduler.time_start(index),
        live,
    };

    let first = count.saturating_sub(MAX_TILES);
    if first > 0 {
        log::debug!("frame strip shows frames {first}..{count} only");
    }
    let mut tiles: Vec<FrameTile> = (first..count).map(|index| tile(index, false)).collect();
    if scheduler.is_live(now) {
        tiles.push(tile(count, true));
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SessionLocation;
    use crate::scheduler::PollConfig;
    use crate::time::from_epoch_seconds;
    use chrono::FixedOffset;

    fn at(secs: f64) -> Timestamp {
        from_epoch_seconds(secs, FixedOffset::east_opt(0).unwrap()).unwrap()
    }

    fn loaded(now: f64, body: &str) -> PollScheduler {
        let mut scheduler = PollScheduler::new(PollConfig::default(), FixedOffset::east_opt(0).unwrap());
        scheduler.start(SessionLocation::parse("http://cam.local/data/heat1").unwrap(), at(now));
        let ticket = scheduler.begin_fetch(at(now)).unwrap();
        scheduler.complete_fetch(&ticket, Ok(body.as_bytes()), at(now));
        scheduler
    }

    #[test]
    fn live_session_gets_trailing_live_tile() {
        let scheduler = loaded(1025.0, r#"{"time_start":1000,"time_span":10,"last_index":1}"#);
        let tiles = frame_tiles(&scheduler, at(1025.0));
        assert_eq!(tiles.len(), 3);
        assert_eq!(
            tiles[1].uri.as_ref().map(Url::as_str),
            Some("http://cam.local/data/heat1/img1.webp")
        );
        assert_eq!(tiles[1].time_start, Some(at(1010.0)));
        assert!(!tiles[1].live);
        assert!(tiles[2].live);
        assert_eq!(tiles[2].index, 2);
    }

    #[test]
    fn finished_session_has_no_live_tile() {
        let scheduler = loaded(2000.0, r#"{"time_start":1000,"time_span":10,"last_index":1}"#);
        let tiles = frame_tiles(&scheduler, at(2000.0));
        assert_eq!(tiles.len(), 2);
        assert!(tiles.iter().all(|t| !t.live));
    }

    #[test]
    fn strip_keeps_only_the_newest_tiles() {
        let scheduler = loaded(
            1025.0,
            r#"{"time_start":1000,"time_span":10,"last_index":9223372036854775806}"#,
        );
        let tiles = frame_tiles(&scheduler, at(1025.0));
        let complete: Vec<&FrameTile> = tiles.iter().filter(|t| !t.live).collect();
        assert_eq!(complete.len() as u64, MAX_TILES);
        assert_eq!(complete[0].index, 9_223_372_036_854_775_807 - MAX_TILES);
        assert_eq!(complete.last().map(|t| t.index), Some(9_223_372_036_854_775_806));
        assert!(tiles.len() as u64 <= MAX_TILES + 1);
    }

    #[test]
    fn nothing_before_metadata() {
        let scheduler = PollScheduler::new(PollConfig::default(), FixedOffset::east_opt(0).unwrap());
        assert!(frame_tiles(&scheduler, at(0.0)).is_empty());
    }
}
