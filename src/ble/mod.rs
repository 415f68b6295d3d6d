//! Bluetooth Low Energy central.
//!
//! The controller is found and connected by [`Central`], a task-style
//! state machine driven by [`Events`] bits and [`LinkEvent`] completions:
//!
//! 1. **Discovery** - bring up the radio and scan for peripherals
//!    advertising the HID service under the controller's name.
//! 2. **Setup** - resolve the battery and input report handles, tune
//!    the connection parameters and PHY, read the battery level.
//! 3. **Streaming** - enable input report notifications and hand each
//!    one to the gamepad dispatcher.
//!
//! The radio itself sits behind [`LinkLayer`] and [`Platform`] so the
//! whole flow runs on the host in tests.

pub mod adv_parser;
pub mod central;
pub mod context;
pub mod events;
pub mod link;


pub use central::{Central, LedStatus};
pub use context::{
    AttHandle, ConnHandle, ConnParams, ConnectionContext, GattHandles, Peer, PeerAddress, Phase,
    Phy,
};
pub use events::Events;
pub use link::{LinkEvent, LinkLayer, Platform, ScanParams};
