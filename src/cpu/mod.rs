//! WDC 65816 core.

pub mod addressing;
pub mod catalog;
pub mod core;
pub mod disassembler;
pub mod dispatch;
pub mod ops;
pub mod state;

#[cfg(test)]
mod tests;

pub use self::addressing::AddressingMode;
pub use self::catalog::{Catalog, Depends, Instruction};
pub use self::disassembler::Disassembly;
pub use self::dispatch::Dispatcher;
pub use self::state::{Mode, State, StatusFlags};

use crate::clock::Clock;
use crate::cpu_bus::Bus;
use crate::debug_flags;
use crate::signals::BreakReason;

pub struct Cpu {
    pub state: State,
    catalog: Catalog,
    dispatcher: Box<Dispatcher>,
    slice: usize,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        let catalog = Catalog::build();
        let dispatcher = Dispatcher::compile(&catalog);

        Cpu {
            state: State::new(),
            catalog,
            dispatcher,
            slice: debug_flags::cpu_slice(),
        }
    }

    /// Architectural reset: registers cleared, emulation mode, S = $0100 and
    /// PC from the vector at $FFFC.
    pub fn reset(&mut self, bus: &mut dyn Bus) -> BreakReason {
        self.state = State::new();

        let lo = bus.read(0xfffc, &mut self.state.signals) as u16;
        let hi = bus.read(0xfffd, &mut self.state.signals) as u16;
        self.state.pc = (hi << 8) | lo;

        log::debug!("reset: pc={:04X}", self.state.pc);
        self.state.signals.reason
    }

    /// Execute up to `limit` instructions and return how many ran. Check
    /// `break_reason` afterwards.
    pub fn run(&mut self, bus: &mut dyn Bus, clock: &mut dyn Clock, limit: usize) -> usize {
        if debug_flags::trace() && log::log_enabled!(log::Level::Trace) {
            return self.run_traced(bus, clock, limit);
        }

        self.dispatcher
            .run(limit, self.slice, &mut self.state, bus, clock)
    }

    fn run_traced(&mut self, bus: &mut dyn Bus, clock: &mut dyn Clock, limit: usize) -> usize {
        let mut executed = 0;

        while executed < limit {
            let pc = self.state.pc24();
            let line = self.catalog.disassemble(self.state.mode, pc, bus);
            log::trace!("{:06X}  {:<16} {}", pc, line.text, self.state);

            executed += self.dispatcher.run(1, 1, &mut self.state, bus, clock);
            if self.state.signals.is_break() {
                break;
            }
        }

        executed
    }

    /// Number of instructions per inner-loop entry.
    pub fn set_slice(&mut self, slice: usize) {
        self.slice = slice.max(1);
    }

    pub fn break_reason(&self) -> BreakReason {
        self.state.signals.reason
    }

    pub fn break_message(&self) -> &str {
        &self.state.signals.message
    }

    pub fn describe_state(&self) -> String {
        self.state.to_string()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn disassemble(&self, mode: Mode, address: u32, bus: &dyn Bus) -> Disassembly {
        self.catalog.disassemble(mode, address, bus)
    }
}
