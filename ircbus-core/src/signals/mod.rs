//! Outbound signal types and the bus capability

pub mod bus;
pub mod memory;
pub mod types;

pub use bus::SignalBus;
pub use memory::MemoryBus;
pub use types::{Signal, now_millis};
