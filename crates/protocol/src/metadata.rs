use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataDecodeError {
    #[error("malformed metadata JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("time_span must be a positive number of seconds, got {0}")]
    InvalidTimeSpan(f64),
    #[error("time_start must be finite, got {0}")]
    InvalidTimeStart(f64),
}

/// The per-session `index.json` document written by the capture server.
///
/// `last_index` is `null` (or negative) until the first frame is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Epoch seconds of frame 0.
    pub time_start: f64,
    /// Seconds covered by one frame.
    pub time_span: f64,
    #[serde(default)]
    pub last_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub px_per_second: Option<f64>,
    /// Frame height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl MetadataDocument {
    /// Decode and validate a metadata document.
    pub fn from_slice(data: &[u8]) -> Result<Self, MetadataDecodeError> {
        let doc: MetadataDocument = serde_json::from_slice(data)?;
        if !doc.time_start.is_finite() {
            return Err(MetadataDecodeError::InvalidTimeStart(doc.time_start));
        }
        if !(doc.time_span.is_finite() && doc.time_span > 0.0) {
            return Err(MetadataDecodeError::InvalidTimeSpan(doc.time_span));
        }
        Ok(doc)
    }

    /// Highest complete frame index, with negative values folded into `None`.
    pub fn last_complete_index(&self) -> Option<u64> {
        self.last_index.and_then(|i| u64::try_from(i).ok())
    }
}
