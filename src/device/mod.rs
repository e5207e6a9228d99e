//! Device-facing side of the engine.
//!
//! Everything here is non-deterministic I/O: inbound presses and updates
//! arrive on the bus, outbound commands leave through the sink traits.

pub mod bus;
pub mod protocol;
pub mod sink;

pub use bus::{MessageBus, DEFAULT_BUS_CAPACITY};
pub use protocol::{AddressedUpdate, DeviceCommand, InternalUpdate, PressEvent, PressMetadata};
pub use sink::{Announcer, AudioPlayer, ChannelDevice, Device, NodeRenderer, NullDevice};
