//! Polling scheduler: the authoritative session clock.
//!
//! The scheduler never performs I/O. A driver asks it for a [`FetchTicket`]
//! once a poll is due, performs the request, and hands the outcome back via
//! [`PollScheduler::complete_fetch`]. Every operation takes the current time
//! explicitly.

use chrono::{FixedOffset, TimeDelta};
use finishcam_protocol::MetadataDocument;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::{SessionClock, SessionLocation, SessionMetadata, TimeBase};
use crate::time::{Timestamp, checked_add_seconds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// A session counts as live while its next frame is expected no more
    /// than this long ago.
    pub live_window_ms: u64,
    /// Delay added after the expected frame arrival before polling, so the
    /// poll does not race the server writing the frame.
    pub fetch_again_delay_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            live_window_ms: 2_000,
            fetch_again_delay_ms: 500,
        }
    }
}

impl PollConfig {
    pub fn live_window(&self) -> TimeDelta {
        millis(self.live_window_ms)
    }

    pub fn fetch_again_delay(&self) -> TimeDelta {
        millis(self.fetch_again_delay_ms)
    }
}

/// Milliseconds as a duration, saturating at [`TimeDelta::MAX`].
fn millis(ms: u64) -> TimeDelta {
    i64::try_from(ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .unwrap_or(TimeDelta::MAX)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchFailure {
    #[error("{status} {reason}")]
    Status { status: u16, reason: String },
    #[error("{0}")]
    Network(String),
}

/// Permission to run one metadata request.
///
/// Outcomes carrying a ticket from before the latest `start` are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    pub url: Url,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// Accepted metadata with a new `last_index`.
    NewImage { last_index: Option<u64> },
    /// A fetch failed; the message is meant for the operator.
    Error(String),
    /// A fetch succeeded after an earlier error.
    Recovered,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollSchedule {
    pub next_poll_at: Option<Timestamp>,
    /// A fetch is in flight.
    pub pending: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PollScheduler {
    config: PollConfig,
    offset: FixedOffset,
    location: Option<SessionLocation>,
    clock: Option<SessionClock>,
    schedule: PollSchedule,
    generation: u64,
}

impl PollScheduler {
    /// `offset` is the UTC offset session times are presented in.
    pub fn new(config: PollConfig, offset: FixedOffset) -> Self {
        Self {
            config,
            offset,
            location: None,
            clock: None,
            schedule: PollSchedule::default(),
            generation: 0,
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Begin polling `location` right away.
    ///
    /// Calling this again cancels the scheduled refetch and orphans any
    /// in-flight request. Metadata is kept only if the location is unchanged.
    pub fn start(&mut self, location: SessionLocation, now: Timestamp) {
        if self.location.as_ref() != Some(&location) {
            self.clock = None;
        }
        log::info!("polling session metadata at {}", location.metadata_uri());
        self.location = Some(location);
        self.generation += 1;
        self.schedule.pending = false;
        self.schedule.next_poll_at = Some(now);
    }

    /// Stop polling and orphan any in-flight request.
    pub fn stop(&mut self) {
        self.generation += 1;
        self.schedule.pending = false;
        self.schedule.next_poll_at = None;
    }

    pub fn location(&self) -> Option<&SessionLocation> {
        self.location.as_ref()
    }

    pub fn clock(&self) -> Option<&SessionClock> {
        self.clock.as_ref()
    }

    pub fn metadata(&self) -> Option<&SessionMetadata> {
        self.clock.as_ref().map(|c| &c.metadata)
    }

    pub fn loaded(&self) -> bool {
        self.clock.is_some()
    }

    pub fn schedule(&self) -> &PollSchedule {
        &self.schedule
    }

    pub fn last_error(&self) -> Option<&str> {
        self.schedule.last_error.as_deref()
    }

    pub fn next_poll_at(&self) -> Option<Timestamp> {
        self.schedule.next_poll_at
    }

    pub fn image_width(&self) -> f64 {
        self.clock.as_ref().map_or(0.0, SessionClock::image_width)
    }

    pub fn image_height(&self) -> f64 {
        self.clock.as_ref().map_or(0.0, SessionClock::image_height)
    }

    /// When the frame after the last complete one should exist; `now` while
    /// nothing is known yet.
    pub fn expected_next_frame_at(&self, now: Timestamp) -> Timestamp {
        match (self.time_end(), self.time_span()) {
            (Some(end), Some(span)) => checked_add_seconds(&end, span).unwrap_or(end),
            _ => now,
        }
    }

    pub fn is_live(&self, now: Timestamp) -> bool {
        self.is_live_within(now, self.config.live_window())
    }

    /// Live while the next frame is expected after `now - window`.
    pub fn is_live_within(&self, now: Timestamp, window: TimeDelta) -> bool {
        self.expected_next_frame_at(now) - now > -window
    }

    /// A poll is scheduled for `now` or earlier and none is in flight.
    pub fn due(&self, now: Timestamp) -> bool {
        !self.schedule.pending && self.schedule.next_poll_at.is_some_and(|at| at <= now)
    }

    /// Claim the next poll. Returns `None` while a fetch is in flight or
    /// before the poll is due.
    pub fn begin_fetch(&mut self, now: Timestamp) -> Option<FetchTicket> {
        if !self.due(now) {
            return None;
        }
        let url = self.location.as_ref()?.metadata_uri().clone();
        self.schedule.pending = true;
        self.schedule.next_poll_at = None;
        Some(FetchTicket {
            generation: self.generation,
            url,
        })
    }

    /// Apply the outcome of the fetch described by `ticket`.
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        outcome: Result<&[u8], FetchFailure>,
        now: Timestamp,
    ) -> Vec<SchedulerEvent> {
        if ticket.generation != self.generation {
            log::debug!("discarding stale metadata response from {}", ticket.url);
            return Vec::new();
        }
        self.schedule.pending = false;

        let body = match outcome {
            Ok(body) => body,
            Err(failure) => {
                let message = format!(
                    "Failed to fetch JSON metadata from \"{}\": {failure}",
                    ticket.url
                );
                log::warn!("{message}");
                self.schedule.last_error = Some(message.clone());
                self.schedule.next_poll_at = self.after_delay(now);
                return vec![SchedulerEvent::Error(message)];
            }
        };

        let mut events = Vec::new();
        match MetadataDocument::from_slice(body) {
            Ok(doc) => {
                if self.schedule.last_error.take().is_some() {
                    events.push(SchedulerEvent::Recovered);
                }
                self.accept(SessionMetadata::from(doc), &mut events);
            }
            Err(e) => log::warn!("ignoring metadata from {}: {e}", ticket.url),
        }
        self.reschedule(now);
        events
    }

    fn accept(&mut self, metadata: SessionMetadata, events: &mut Vec<SchedulerEvent>) {
        if let Some(current) = &self.clock {
            let known = current.metadata.last_index;
            if metadata.last_index == known {
                return;
            }
            if metadata.last_index < known {
                log::warn!(
                    "ignoring metadata moving last_index backwards ({known:?} -> {:?})",
                    metadata.last_index
                );
                return;
            }
        }
        let last_index = metadata.last_index;
        self.clock = Some(SessionClock::new(metadata, self.offset));
        events.push(SchedulerEvent::NewImage { last_index });
    }

    fn reschedule(&mut self, now: Timestamp) {
        if self.is_live(now) {
            let expected = self.expected_next_frame_at(now).max(now);
            self.schedule.next_poll_at = self.after_delay(expected);
            if let Some(at) = self.schedule.next_poll_at {
                log::debug!("next metadata poll at {at}");
            }
        } else {
            log::info!("session is not live, polling stopped");
            self.schedule.next_poll_at = None;
        }
    }

    /// `t` plus the refetch delay; `None` (no further poll) past the end of time.
    fn after_delay(&self, t: Timestamp) -> Option<Timestamp> {
        let at = t.checked_add_signed(self.config.fetch_again_delay());
        if at.is_none() {
            log::warn!(
                "refetch delay of {} ms is out of range, polling stopped",
                self.config.fetch_again_delay_ms
            );
        }
        at
    }
}

impl TimeBase for PollScheduler {
    fn time_start(&self, index: u64) -> Option<Timestamp> {
        self.clock.as_ref()?.time_start(index)
    }

    fn time_span(&self) -> Option<f64> {
        self.clock.as_ref()?.time_span()
    }

    fn px_per_second(&self) -> Option<f64> {
        self.clock.as_ref()?.px_per_second()
    }

    fn image_count(&self) -> u64 {
        self.clock.as_ref().map_or(0, TimeBase::image_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::from_epoch_seconds;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(secs: f64) -> Timestamp {
        from_epoch_seconds(secs, utc()).unwrap()
    }

    fn started(now: f64) -> PollScheduler {
        let mut scheduler = PollScheduler::new(PollConfig::default(), utc());
        scheduler.start(SessionLocation::parse("http://cam.local/data/s1").unwrap(), at(now));
        scheduler
    }

    fn poll(scheduler: &mut PollScheduler, now: f64, body: &str) -> Vec<SchedulerEvent> {
        let ticket = scheduler.begin_fetch(at(now)).expect("poll should be due");
        scheduler.complete_fetch(&ticket, Ok(body.as_bytes()), at(now))
    }

    #[test]
    fn readers_are_empty_before_first_load() {
        let scheduler = started(1000.0);
        assert!(!scheduler.loaded());
        assert_eq!(scheduler.time_start(0), None);
        assert_eq!(scheduler.time_end(), None);
        assert_eq!(scheduler.time_span(), None);
        assert_eq!(scheduler.expected_next_frame_at(at(1000.0)), at(1000.0));
        assert!(scheduler.is_live(at(1000.0)));
    }

    #[test]
    fn metadata_drives_frame_times() {
        let mut scheduler = started(1035.0);
        let events = poll(
            &mut scheduler,
            1035.0,
            r#"{"time_start": 1000, "time_span": 10, "last_index": 2}"#,
        );
        assert_eq!(events, vec![SchedulerEvent::NewImage { last_index: Some(2) }]);
        assert_eq!(scheduler.time_start(0), Some(at(1000.0)));
        assert_eq!(scheduler.time_start(3), Some(at(1030.0)));
        assert_eq!(scheduler.expected_next_frame_at(at(1035.0)), at(1040.0));
        assert_eq!(scheduler.next_poll_at(), Some(at(1040.5)));
    }

    #[test]
    fn live_window_brackets_expected_arrival() {
        let mut scheduler = started(1035.0);
        poll(
            &mut scheduler,
            1035.0,
            r#"{"time_start": 1000, "time_span": 10, "last_index": 2}"#,
        );
        assert!(scheduler.is_live(at(1038.0)));
        assert!(scheduler.is_live(at(1041.9)));
        assert!(!scheduler.is_live(at(1042.1)));
        assert!(!scheduler.is_live(at(1050.0)));
        assert!(scheduler.is_live_within(at(1050.0), TimeDelta::seconds(11)));
    }

    #[test]
    fn oversized_durations_saturate_instead_of_wrapping() {
        let config = PollConfig {
            live_window_ms: u64::MAX,
            fetch_again_delay_ms: 9_223_372_036_854_775_808,
        };
        assert_eq!(config.live_window(), TimeDelta::MAX);
        assert_eq!(config.fetch_again_delay(), TimeDelta::MAX);

        let location = SessionLocation::parse("http://cam.local/data/s1").unwrap();
        let mut scheduler = PollScheduler::new(config, utc());
        scheduler.start(location.clone(), at(1035.0));
        let events = poll(
            &mut scheduler,
            1035.0,
            r#"{"time_start": 1000, "time_span": 10, "last_index": 2}"#,
        );
        assert_eq!(events, vec![SchedulerEvent::NewImage { last_index: Some(2) }]);
        assert!(scheduler.is_live(at(1e9)));
        assert_eq!(scheduler.next_poll_at(), None);

        scheduler.start(location, at(1040.0));
        let ticket = scheduler.begin_fetch(at(1040.0)).unwrap();
        let events = scheduler.complete_fetch(
            &ticket,
            Err(FetchFailure::Network("timed out".into())),
            at(1040.0),
        );
        assert!(matches!(&events[..], [SchedulerEvent::Error(_)]));
        assert_eq!(scheduler.next_poll_at(), None);
    }

    #[test]
    fn unchanged_last_index_is_not_reported() {
        let mut scheduler = started(1035.0);
        let doc = r#"{"time_start": 1000, "time_span": 10, "last_index": 2}"#;
        poll(&mut scheduler, 1035.0, doc);
        let events = poll(&mut scheduler, 1040.5, doc);
        assert!(events.is_empty());
        assert_eq!(scheduler.metadata().unwrap().last_index, Some(2));
    }

    #[test]
    fn last_index_never_moves_backwards() {
        let mut scheduler = started(1045.0);
        poll(
            &mut scheduler,
            1045.0,
            r#"{"time_start": 1000, "time_span": 10, "last_index": 3}"#,
        );
        let events = poll(
            &mut scheduler,
            1050.5,
            r#"{"time_start": 1000, "time_span": 10, "last_index": 1}"#,
        );
        assert!(events.is_empty());
        assert_eq!(scheduler.metadata().unwrap().last_index, Some(3));
    }

    #[test]
    fn only_one_fetch_in_flight() {
        let mut scheduler = started(1000.0);
        let ticket = scheduler.begin_fetch(at(1000.0)).unwrap();
        assert!(scheduler.schedule().pending);
        assert_eq!(scheduler.begin_fetch(at(1000.0)), None);
        assert_eq!(scheduler.begin_fetch(at(2000.0)), None);
        scheduler.complete_fetch(
            &ticket,
            Err(FetchFailure::Network("connection refused".into())),
            at(1000.0),
        );
        assert!(!scheduler.schedule().pending);
    }

    #[test]
    fn failures_surface_persist_and_clear() {
        let mut scheduler = started(1000.0);

        let ticket = scheduler.begin_fetch(at(1000.0)).unwrap();
        let events = scheduler.complete_fetch(
            &ticket,
            Err(FetchFailure::Status {
                status: 503,
                reason: "Service Unavailable".into(),
            }),
            at(1000.0),
        );
        assert!(matches!(&events[..], [SchedulerEvent::Error(msg)] if msg.contains("503")));
        assert!(scheduler.last_error().is_some());
        // Retry right away, no backoff.
        assert_eq!(scheduler.next_poll_at(), Some(at(1000.5)));

        let ticket = scheduler.begin_fetch(at(1000.5)).unwrap();
        assert_eq!(scheduler.begin_fetch(at(1000.5)), None);
        scheduler.complete_fetch(
            &ticket,
            Err(FetchFailure::Network("timed out".into())),
            at(1000.5),
        );
        assert!(scheduler.last_error().unwrap().contains("timed out"));

        let ticket = scheduler.begin_fetch(at(1001.0)).unwrap();
        let events = scheduler.complete_fetch(
            &ticket,
            Ok(br#"{"time_start": 1000, "time_span": 10, "last_index": null}"#.as_slice()),
            at(1001.0),
        );
        assert_eq!(
            events,
            vec![
                SchedulerEvent::Recovered,
                SchedulerEvent::NewImage { last_index: None }
            ]
        );
        assert_eq!(scheduler.last_error(), None);
    }

    #[test]
    fn malformed_json_keeps_state_and_error() {
        let mut scheduler = started(1035.0);
        poll(
            &mut scheduler,
            1035.0,
            r#"{"time_start": 1000, "time_span": 10, "last_index": 2}"#,
        );
        let before = scheduler.metadata().cloned();
        let events = poll(&mut scheduler, 1040.5, "{oops");
        assert!(events.is_empty());
        assert_eq!(scheduler.metadata().cloned(), before);
        assert!(scheduler.next_poll_at().is_some());
    }

    #[test]
    fn polling_stops_once_not_live() {
        let mut scheduler = started(5000.0);
        poll(
            &mut scheduler,
            5000.0,
            r#"{"time_start": 1000, "time_span": 10, "last_index": 2}"#,
        );
        assert!(scheduler.loaded());
        assert_eq!(scheduler.next_poll_at(), None);
        assert_eq!(scheduler.begin_fetch(at(6000.0)), None);
    }

    #[test]
    fn restart_orphans_in_flight_fetch() {
        let mut scheduler = started(1000.0);
        let stale = scheduler.begin_fetch(at(1000.0)).unwrap();
        let location = SessionLocation::parse("http://cam.local/data/s2").unwrap();
        scheduler.start(location, at(1001.0));
        assert!(!scheduler.schedule().pending);

        let events = scheduler.complete_fetch(
            &stale,
            Ok(br#"{"time_start": 1000, "time_span": 10, "last_index": 4}"#.as_slice()),
            at(1001.0),
        );
        assert!(events.is_empty());
        assert!(!scheduler.loaded());

        let fresh = scheduler.begin_fetch(at(1001.0)).unwrap();
        assert_eq!(fresh.url.as_str(), "http://cam.local/data/s2/index.json");
    }

    #[test]
    fn restart_on_same_location_keeps_metadata() {
        let mut scheduler = started(1035.0);
        poll(
            &mut scheduler,
            1035.0,
            r#"{"time_start": 1000, "time_span": 10, "last_index": 2}"#,
        );
        let location = scheduler.location().cloned().unwrap();
        scheduler.start(location, at(1036.0));
        assert!(scheduler.loaded());
        assert_eq!(scheduler.next_poll_at(), Some(at(1036.0)));
    }
}
