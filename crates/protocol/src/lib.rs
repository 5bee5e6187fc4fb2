pub mod layout_record;
pub mod metadata;
pub mod push;
pub mod session_index;

pub use layout_record::{LAYOUTS_KEY, LayoutBook, LayoutRecord};
pub use metadata::{MetadataDecodeError, MetadataDocument};
pub use push::{FrameAnnouncement, KIND_ANNOUNCE, KIND_IMAGE, PushDecodeError, PushMessage};
pub use session_index::{SessionIndex, SessionIndexEntry};
