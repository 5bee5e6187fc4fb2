//! Sans-IO core of the finishcam client.
//!
//! Nothing here performs network I/O or reads a clock: drivers pass the
//! current time into every operation and act on the returned events.

pub mod layout;
pub mod live;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod time;
pub mod views;

pub use layout::{LaneLayout, LayoutEvent, PointerEvent, PointerTarget, ViewGeometry};
pub use live::{BlobStore, ImageStore, LiveConfig, LiveEvent, LiveStream, ReconnectPolicy};
pub use model::{SessionClock, SessionLocation, SessionMetadata, TimeBase};
pub use scheduler::{FetchFailure, FetchTicket, PollConfig, PollScheduler, SchedulerEvent};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
pub use time::Timestamp;
