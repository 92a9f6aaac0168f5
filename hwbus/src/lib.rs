#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod smbus;
pub mod register;
pub mod port;
pub mod recorder;
#[cfg(feature = "hal")]
pub mod hal;

pub use smbus::{BusError, SmBus, SimulatedBus};
pub use register::{RegisterSpace, Memory, Mmio};
pub use port::{PortIo, PortLog};
pub use recorder::{Recorder, Transaction};
