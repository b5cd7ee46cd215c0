use crate::bus::BusSnes;
use crate::cartridge::{Cartridge, CartridgeError};
use crate::clock::ClockSnes;
use crate::cpu::Cpu;
use crate::signals::BreakReason;
use crate::wram::Wram;

/// Console wired together from a cartridge image: WRAM, system bus, master
/// clock and the CPU.
pub struct Emulator {
    cpu: Cpu,
    bus: BusSnes,
    clock: ClockSnes,
}

impl Emulator {
    pub fn new(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        let cartridge = Cartridge::load_from_bytes(rom)?;
        Ok(Self::with_cartridge(cartridge))
    }

    pub fn with_cartridge(cartridge: Cartridge) -> Self {
        let clock = ClockSnes::new();
        let bus = BusSnes::new(Wram::new(), cartridge, clock.clone());

        let mut emulator = Emulator {
            cpu: Cpu::new(),
            bus,
            clock,
        };
        emulator.reset();
        emulator
    }

    pub fn reset(&mut self) -> BreakReason {
        self.bus.reset();
        self.clock.reset();
        self.cpu.reset(&mut self.bus)
    }

    /// Execute up to `limit` instructions, returning how many completed.
    pub fn run(&mut self, limit: usize) -> usize {
        let mut clock = self.clock.clone();
        self.cpu.run(&mut self.bus, &mut clock, limit)
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn bus(&self) -> &BusSnes {
        &self.bus
    }

    pub fn cartridge(&self) -> &Cartridge {
        self.bus.cartridge()
    }

    pub fn master_clocks(&self) -> u64 {
        self.clock.master_clocks()
    }
}
