//! Live push-channel handler.
//!
//! Decodes `[kind][payload]` frames into a bounded, index-ordered buffer of
//! decoded images. Image resources are owned by an [`ImageStore`]; every
//! handle the buffer holds is released exactly once, on replacement,
//! eviction, disconnect or drop.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use finishcam_protocol::{FrameAnnouncement, PushDecodeError, PushMessage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::{Timestamp, checked_add_seconds, from_epoch_seconds};

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("empty image payload")]
    Empty,
    #[error("cannot decode image: {0}")]
    Decode(String),
}

/// Owner of decoded image resources.
pub trait ImageStore {
    type Handle: Clone + PartialEq + fmt::Debug;

    fn acquire(&mut self, encoded: &[u8]) -> Result<Self::Handle, ImageStoreError>;

    /// Revoke a handle. Using it afterwards is a bug in the caller.
    fn release(&mut self, handle: Self::Handle);

    fn is_valid(&self, handle: &Self::Handle) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobHandle(u64);

/// Revocable in-memory registry of encoded image blobs, the analogue of
/// browser object URLs.
#[derive(Debug, Default)]
pub struct BlobStore {
    next_id: u64,
    blobs: HashMap<BlobHandle, Arc<[u8]>>,
}

impl BlobStore {
    pub fn get(&self, handle: &BlobHandle) -> Option<Arc<[u8]>> {
        self.blobs.get(handle).cloned()
    }

    /// Number of handles acquired and not yet released.
    pub fn live_handles(&self) -> usize {
        self.blobs.len()
    }
}

impl ImageStore for BlobStore {
    type Handle = BlobHandle;

    fn acquire(&mut self, encoded: &[u8]) -> Result<BlobHandle, ImageStoreError> {
        if encoded.is_empty() {
            return Err(ImageStoreError::Empty);
        }
        let handle = BlobHandle(self.next_id);
        self.next_id += 1;
        self.blobs.insert(handle, Arc::from(encoded));
        Ok(handle)
    }

    fn release(&mut self, handle: BlobHandle) {
        if self.blobs.remove(&handle).is_none() {
            log::error!("released unknown or already revoked image handle {handle:?}");
        }
    }

    fn is_valid(&self, handle: &BlobHandle) -> bool {
        self.blobs.contains_key(handle)
    }
}

/// What to do when the push channel closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    Never,
    Fixed {
        delay_ms: u64,
        #[serde(default)]
        max_attempts: Option<u32>,
    },
    Exponential {
        initial_ms: u64,
        max_ms: u64,
        #[serde(default)]
        max_attempts: Option<u32>,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed {
            delay_ms: 1_000,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (0-based), `None` to give up.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::Never => None,
            ReconnectPolicy::Fixed {
                delay_ms,
                max_attempts,
            } => within(attempt, max_attempts).then(|| Duration::from_millis(delay_ms)),
            ReconnectPolicy::Exponential {
                initial_ms,
                max_ms,
                max_attempts,
            } => within(attempt, max_attempts).then(|| {
                let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms))
            }),
        }
    }
}

fn within(attempt: u32, max_attempts: Option<u32>) -> bool {
    max_attempts.is_none_or(|max| attempt < max)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Maximum number of frames kept; the lowest indices are evicted first.
    pub capacity: usize,
    pub reconnect: ReconnectPolicy,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveFrame<H> {
    pub index: u64,
    pub time_start: Timestamp,
    /// Seconds.
    pub time_span: f64,
    pub image: Option<H>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameImage<'a, H> {
    Decoded(&'a H),
    /// Not decoded from the push channel; use the polled image instead.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameSlot<'a, H> {
    pub index: u64,
    pub time_start: Option<Timestamp>,
    pub image: FrameImage<'a, H>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    Announced { index: u64 },
    ImageStored { index: u64 },
}

pub struct LiveStream<S: ImageStore> {
    config: LiveConfig,
    offset: FixedOffset,
    store: S,
    frames: BTreeMap<u64, LiveFrame<S::Handle>>,
    current_index: Option<u64>,
    session_name: Option<String>,
}

impl<S: ImageStore> LiveStream<S> {
    pub fn new(store: S, config: LiveConfig, offset: FixedOffset) -> Self {
        Self {
            config,
            offset,
            store,
            frames: BTreeMap::new(),
            current_index: None,
            session_name: None,
        }
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_index(&self) -> Option<u64> {
        self.current_index
    }

    /// Session name from the latest announcement that carried one.
    pub fn session_name(&self) -> Option<&str> {
        self.session_name.as_deref()
    }

    pub fn get(&self, index: u64) -> Option<&LiveFrame<S::Handle>> {
        self.frames.get(&index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Newest frame with a decoded image.
    pub fn latest_image(&self) -> Option<(u64, &S::Handle)> {
        self.frames
            .values()
            .rev()
            .find_map(|f| f.image.as_ref().map(|h| (f.index, h)))
    }

    /// Apply one push frame. Undecodable, unknown and orphaned frames are
    /// dropped without touching the buffer.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Option<LiveEvent> {
        match PushMessage::decode(frame) {
            Ok(PushMessage::Announce(announcement)) => self.announce(announcement),
            Ok(PushMessage::Image(bytes)) => self.store_image(bytes),
            Err(
                e @ (PushDecodeError::Json(_)
                | PushDecodeError::InvalidTimeStart(_)
                | PushDecodeError::InvalidTimeSpan(_)),
            ) => {
                log::warn!("dropping push frame: {e}");
                None
            }
            Err(e) => {
                log::debug!("dropping push frame: {e}");
                None
            }
        }
    }

    fn announce(&mut self, announcement: FrameAnnouncement) -> Option<LiveEvent> {
        let Some(time_start) = from_epoch_seconds(announcement.time_start, self.offset) else {
            log::warn!(
                "dropping announcement for frame {} with invalid time_start",
                announcement.index
            );
            return None;
        };
        let index = announcement.index;
        self.current_index = Some(index);
        if announcement.session_name.is_some() {
            self.session_name = announcement.session_name;
        }
        self.frames
            .entry(index)
            .and_modify(|f| {
                f.time_start = time_start;
                f.time_span = announcement.time_span;
            })
            .or_insert(LiveFrame {
                index,
                time_start,
                time_span: announcement.time_span,
                image: None,
            });
        self.evict_overflow();
        Some(LiveEvent::Announced { index })
    }

    fn store_image(&mut self, bytes: &[u8]) -> Option<LiveEvent> {
        let Some(index) = self.current_index else {
            log::debug!("dropping image payload received before any announcement");
            return None;
        };
        if !self.frames.contains_key(&index) {
            log::debug!("dropping image payload for evicted frame {index}");
            return None;
        }
        let handle = match self.store.acquire(bytes) {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("dropping image payload for frame {index}: {e}");
                return None;
            }
        };
        let previous = self
            .frames
            .get_mut(&index)
            .and_then(|frame| frame.image.replace(handle));
        if let Some(previous) = previous {
            self.store.release(previous);
        }
        Some(LiveEvent::ImageStored { index })
    }

    fn evict_overflow(&mut self) {
        let capacity = self.config.capacity.max(1);
        while self.frames.len() > capacity {
            let Some((_, frame)) = self.frames.pop_first() else {
                break;
            };
            if let Some(handle) = frame.image {
                self.store.release(handle);
            }
        }
    }

    /// Frames `from..=to` in index order, `to` defaulting to the current
    /// index. Frames not held in the buffer get a fallback image and a start
    /// time extrapolated from the nearest announcement.
    ///
    /// At most `capacity` slots are returned, the ones ending at `to`.
    pub fn frames(&self, from: u64, to: Option<u64>) -> Vec<FrameSlot<'_, S::Handle>> {
        let Some(to) = to.or(self.current_index) else {
            return Vec::new();
        };
        let capacity = self.config.capacity.max(1) as u64;
        let from = from.max(to.saturating_sub(capacity - 1));
        if from > to {
            return Vec::new();
        }
        (from..=to)
            .map(|index| match self.frames.get(&index) {
                Some(frame) => FrameSlot {
                    index,
                    time_start: Some(frame.time_start),
                    image: frame
                        .image
                        .as_ref()
                        .map_or(FrameImage::Fallback, FrameImage::Decoded),
                },
                None => FrameSlot {
                    index,
                    time_start: self.extrapolate(index),
                    image: FrameImage::Fallback,
                },
            })
            .collect()
    }

    fn extrapolate(&self, index: u64) -> Option<Timestamp> {
        let reference = self
            .current_index
            .and_then(|i| self.frames.get(&i))
            .or_else(|| self.frames.values().next_back())?;
        let steps = index as f64 - reference.index as f64;
        checked_add_seconds(&reference.time_start, steps * reference.time_span)
    }

    /// Release every held image and forget all frames.
    pub fn disconnect(&mut self) {
        let released = self.release_all();
        self.current_index = None;
        self.session_name = None;
        log::debug!("live buffer torn down, {released} image handles released");
    }

    fn release_all(&mut self) -> usize {
        let mut released = 0;
        for (_, frame) in std::mem::take(&mut self.frames) {
            if let Some(handle) = frame.image {
                self.store.release(handle);
                released += 1;
            }
        }
        released
    }
}

impl<S: ImageStore> Drop for LiveStream<S> {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl<S: ImageStore> fmt::Debug for LiveStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveStream")
            .field("current_index", &self.current_index)
            .field("frames", &self.frames.len())
            .field("capacity", &self.config.capacity)
            .finish()
    }
}
