//! Xbox controller input reports: decoding, rendering, the latest-state
//! snapshot, and delivery of raw reports to a consumer callback.

pub mod dispatch;
pub mod render;
pub mod report;
pub mod snapshot;


pub use dispatch::{InputCallback, InputDispatcher};
pub use render::{render, RENDER_CAPACITY};
pub use report::{
    decode, query, ButtonId, CenterButtons, ControllerState, DPad, FaceButtons, OutOfRange,
    ShareButton, REPORT_SIZE,
};
pub use snapshot::SnapshotStore;
