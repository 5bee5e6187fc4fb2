pub mod lane;
pub mod session;

pub use lane::{Lane, LaneDeclaration};
pub use session::{
    LocationError, SessionClock, SessionLocation, SessionMetadata, TimeBase,
};
