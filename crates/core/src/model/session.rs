use chrono::FixedOffset;
use finishcam_protocol::MetadataDocument;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::time::{Timestamp, from_epoch_seconds};

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("invalid session location: {0}")]
    Parse(#[from] url::ParseError),
    #[error("session location {0} cannot hold relative paths")]
    NotABase(String),
    #[error("no push endpoint for scheme {0:?}")]
    UnsupportedScheme(String),
}

/// Base location of one session's frames and `index.json`.
///
/// The base always ends in `/`, so relative lookups resolve inside the
/// session directory instead of replacing its last path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLocation {
    base: Url,
    metadata: Url,
}

impl SessionLocation {
    pub fn parse(href: &str) -> Result<Self, LocationError> {
        Self::from_url(Url::parse(href)?)
    }

    pub fn from_url(mut base: Url) -> Result<Self, LocationError> {
        if base.cannot_be_a_base() {
            return Err(LocationError::NotABase(base.to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let metadata = base.join("index.json")?;
        Ok(Self { base, metadata })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The `index.json` document of this location.
    pub fn metadata_uri(&self) -> &Url {
        &self.metadata
    }

    pub fn join(&self, relative: &str) -> Result<Url, LocationError> {
        Ok(self.base.join(relative)?)
    }

    pub fn image_uri(&self, index: u64) -> Result<Url, LocationError> {
        self.join(&format!("img{index}.webp"))
    }

    /// Location of a session listed in this directory's index.
    pub fn child(&self, session_key: &str) -> Result<SessionLocation, LocationError> {
        Self::from_url(self.join(session_key)?)
    }

    /// The server-wide live push endpoint, `ws(s)://host/ws/live`.
    pub fn push_endpoint(&self) -> Result<Url, LocationError> {
        let scheme = match self.base.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(LocationError::UnsupportedScheme(other.to_string())),
        };
        let mut url = self.base.clone();
        url.set_scheme(scheme)
            .map_err(|()| LocationError::UnsupportedScheme(scheme.to_string()))?;
        url.set_path("/ws/live");
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}

/// Session metadata as last accepted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Epoch seconds of frame 0.
    pub time_start: f64,
    /// Seconds per frame, always > 0.
    pub time_span: f64,
    /// Highest complete frame index, `None` while no frame is complete.
    pub last_index: Option<u64>,
    pub px_per_second: Option<f64>,
    pub frame_height: Option<f64>,
}

impl From<MetadataDocument> for SessionMetadata {
    fn from(doc: MetadataDocument) -> Self {
        Self {
            last_index: doc.last_complete_index(),
            time_start: doc.time_start,
            time_span: doc.time_span,
            px_per_second: doc.px_per_second,
            frame_height: doc.height,
        }
    }
}

impl SessionMetadata {
    pub fn image_count(&self) -> u64 {
        self.last_index.map_or(0, |i| i + 1)
    }
}

/// Read-only session time base.
///
/// Implemented by the polling scheduler (the authoritative clock) and by
/// [`SessionClock`] snapshots.
pub trait TimeBase {
    /// Start of frame `index`, `None` until metadata is known.
    fn time_start(&self, index: u64) -> Option<Timestamp>;
    fn time_span(&self) -> Option<f64>;
    fn px_per_second(&self) -> Option<f64>;
    /// Number of complete frames.
    fn image_count(&self) -> u64;

    /// End of the last complete frame.
    fn time_end(&self) -> Option<Timestamp> {
        self.time_start(self.image_count())
    }
}

/// Metadata paired with the offset its timestamps are shown in.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClock {
    pub metadata: SessionMetadata,
    pub offset: FixedOffset,
}

impl SessionClock {
    pub fn new(metadata: SessionMetadata, offset: FixedOffset) -> Self {
        Self { metadata, offset }
    }

    /// Native frame width in pixels, 0 without a scale hint.
    pub fn image_width(&self) -> f64 {
        self.metadata
            .px_per_second
            .map_or(0.0, |pps| pps * self.metadata.time_span)
    }

    pub fn image_height(&self) -> f64 {
        self.metadata.frame_height.unwrap_or(0.0)
    }
}

impl TimeBase for SessionClock {
    fn time_start(&self, index: u64) -> Option<Timestamp> {
        let secs = self.metadata.time_start + self.metadata.time_span * index as f64;
        from_epoch_seconds(secs, self.offset)
    }

    fn time_span(&self) -> Option<f64> {
        Some(self.metadata.time_span)
    }

    fn px_per_second(&self) -> Option<f64> {
        self.metadata.px_per_second
    }

    fn image_count(&self) -> u64 {
        self.metadata.image_count()
    }
}
