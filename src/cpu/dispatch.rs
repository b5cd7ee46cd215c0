//! Specialized dispatch tables.
//!
//! Every opcode gets one handler per mode it can observably differ in. Modes
//! are folded onto a canonical mode using the width flags the instruction
//! depends on, so for example `CLC` ends up with a single procedure and
//! `LDA (dp),Y` with five. The choice is made once at construction time.
//!
//! Execution is two-level: the outer loop picks the table for the current
//! mode, the inner loop runs opcodes from that table until the budget is
//! spent or a handler sets a slow-path bit.

use super::catalog::{Catalog, Depends};
use super::core::Handler;
use super::state::{Mode, State};
use crate::clock::Clock;
use crate::cpu_bus::Bus;
use crate::signals::{BreakReason, SlowPath};

/// Mode whose handler serves `mode` for an instruction with `depends`.
pub fn canonical_mode(mode: Mode, depends: Depends) -> Mode {
    if mode == Mode::Emulation {
        return if depends.contains(Depends::EMULATION) {
            Mode::Emulation
        } else {
            Mode::M8X8
        };
    }

    Mode::native(
        mode.acc16() && depends.contains(Depends::ACC),
        mode.idx16() && depends.contains(Depends::INDEX),
    )
}

pub struct Dispatcher {
    tables: [[Handler; 256]; 5],
    variants: [u8; 256],
}

impl Dispatcher {
    pub fn compile(catalog: &Catalog) -> Box<Self> {
        let tables = std::array::from_fn(|mode| {
            let mode = Mode::ALL[mode];
            std::array::from_fn(|opcode| {
                let instruction = catalog.get(opcode as u8);
                instruction.handler(canonical_mode(mode, instruction.depends))
            })
        });

        let variants = std::array::from_fn(|opcode| {
            let depends = catalog.get(opcode as u8).depends;
            let mut seen: Vec<Mode> = Vec::with_capacity(5);
            for mode in Mode::ALL {
                let canonical = canonical_mode(mode, depends);
                if !seen.contains(&canonical) {
                    seen.push(canonical);
                }
            }
            seen.len() as u8
        });

        let dispatcher = Box::new(Self { tables, variants });
        if crate::debug_flags::dispatch() {
            log::info!(
                "dispatcher compiled: {} procedures for {} opcode/mode slots",
                dispatcher.procedure_count(),
                256 * Mode::ALL.len()
            );
        }
        dispatcher
    }

    /// Distinct procedures generated for `opcode`.
    pub fn variant_count(&self, opcode: u8) -> usize {
        self.variants[opcode as usize] as usize
    }

    pub fn procedure_count(&self) -> usize {
        self.variants.iter().map(|&n| n as usize).sum()
    }

    #[inline]
    pub fn handler(&self, mode: Mode, opcode: u8) -> Handler {
        self.tables[mode.index()][opcode as usize]
    }

    /// Execute up to `limit` instructions, re-entering the inner loop at most
    /// `slice` instructions at a time. Returns the number executed. A stopped
    /// CPU executes nothing and latches `Stop` again.
    pub fn run(
        &self,
        limit: usize,
        slice: usize,
        state: &mut State,
        bus: &mut dyn Bus,
        clock: &mut dyn Clock,
    ) -> usize {
        let slice = slice.max(1);
        let mut total = 0;
        state.signals.clear_break();

        if state.stopped {
            let at = state.pc24();
            state
                .signals
                .raise(BreakReason::Stop, format!("stopped at {:06X}", at));
            return 0;
        }

        while total < limit {
            state.signals.slow_path = SlowPath::empty();

            let budget = (limit - total).min(slice);
            total += self.run_mode(state.mode, budget, state, bus, clock);

            if state.signals.is_break() {
                break;
            }
        }

        total
    }

    fn run_mode(
        &self,
        mode: Mode,
        budget: usize,
        state: &mut State,
        bus: &mut dyn Bus,
        clock: &mut dyn Clock,
    ) -> usize {
        let table = &self.tables[mode.index()];
        let mut executed = 0;

        while executed < budget {
            let opcode = bus.read(state.pc24(), &mut state.signals);
            state.pc = state.pc.wrapping_add(1);

            table[opcode as usize](state, bus, clock);
            executed += 1;

            if !state.signals.slow_path.is_empty() {
                break;
            }
        }

        executed
    }
}
