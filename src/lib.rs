//! SNES emulator core built around a mode-specialized WDC 65816 interpreter.

pub mod bus;
pub mod cartridge;
pub mod clock;
pub mod cpu;
pub mod cpu_bus;
pub mod debug_flags;
pub mod debugger;
pub mod emulator;
pub mod signals;
pub mod wram;

pub use crate::bus::BusSnes;
pub use crate::cartridge::{Cartridge, CartridgeError};
pub use crate::clock::{Clock, ClockSnes};
pub use crate::cpu::{Cpu, Mode, State};
pub use crate::cpu_bus::Bus;
pub use crate::debugger::Debugger;
pub use crate::emulator::Emulator;
pub use crate::signals::{BreakReason, Signals, SlowPath};
