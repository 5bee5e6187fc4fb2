use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind byte of a frame carrying raw encoded image bytes.
pub const KIND_IMAGE: u8 = 0;
/// Kind byte of a frame announcing the index the next image belongs to.
pub const KIND_ANNOUNCE: u8 = 1;

#[derive(Debug, Error)]
pub enum PushDecodeError {
    #[error("empty push frame")]
    Empty,
    #[error("unknown push frame kind {0}")]
    UnknownKind(u8),
    #[error("malformed announcement JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("announcement time_span must be a positive number of seconds, got {0}")]
    InvalidTimeSpan(f64),
    #[error("announcement time_start must be finite, got {0}")]
    InvalidTimeStart(f64),
}

/// Metadata for the frame the *next* image payload belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnnouncement {
    pub index: u64,
    /// Epoch seconds.
    pub time_start: f64,
    /// Seconds covered by the frame.
    pub time_span: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}

/// A decoded push-channel frame: `[kind: u8][payload]`.
///
/// Image payloads borrow from the received buffer; nothing is copied until
/// the frame is handed to an image store.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage<'a> {
    Image(&'a [u8]),
    Announce(FrameAnnouncement),
}

impl<'a> PushMessage<'a> {
    pub fn decode(frame: &'a [u8]) -> Result<Self, PushDecodeError> {
        let (&kind, payload) = frame.split_first().ok_or(PushDecodeError::Empty)?;
        match kind {
            KIND_IMAGE => Ok(PushMessage::Image(payload)),
            KIND_ANNOUNCE => {
                let announcement: FrameAnnouncement = serde_json::from_slice(payload)?;
                if !announcement.time_start.is_finite() {
                    return Err(PushDecodeError::InvalidTimeStart(announcement.time_start));
                }
                if !(announcement.time_span.is_finite() && announcement.time_span > 0.0) {
                    return Err(PushDecodeError::InvalidTimeSpan(announcement.time_span));
                }
                Ok(PushMessage::Announce(announcement))
            }
            other => Err(PushDecodeError::UnknownKind(other)),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            PushMessage::Image(bytes) => {
                let mut frame = Vec::with_capacity(bytes.len() + 1);
                frame.push(KIND_IMAGE);
                frame.extend_from_slice(bytes);
                Ok(frame)
            }
            PushMessage::Announce(announcement) => {
                let mut frame = vec![KIND_ANNOUNCE];
                serde_json::to_writer(&mut frame, announcement)?;
                Ok(frame)
            }
        }
    }
}
