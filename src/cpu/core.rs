//! Execution context shared by every instruction handler.
//!
//! `Core` bundles the register file with the bus and clock for the duration
//! of one instruction. The `MODE` parameter is the width configuration the
//! handler was specialized for, so width and emulation checks below fold
//! away at compile time.

use super::addressing::Ea;
use super::state::{acc16, emulation, idx16, Mode, State, StatusFlags};
use crate::clock::Clock;
use crate::cpu_bus::Bus;
use crate::signals::BreakReason;

/// Compiled procedure for one (opcode, mode) pair. The opcode byte has
/// already been fetched when it runs.
pub type Handler = fn(&mut State, &mut dyn Bus, &mut dyn Clock);

pub struct Core<'a, const MODE: u8> {
    pub state: &'a mut State,
    bus: &'a mut dyn Bus,
    clock: &'a mut dyn Clock,
}

impl<'a, const MODE: u8> Core<'a, MODE> {
    pub const WIDE_A: bool = acc16(MODE);
    pub const WIDE_XY: bool = idx16(MODE);
    pub const EMULATION: bool = emulation(MODE);

    #[inline]
    pub fn new(state: &'a mut State, bus: &'a mut dyn Bus, clock: &'a mut dyn Clock) -> Self {
        Self { state, bus, clock }
    }

    #[inline]
    pub fn read(&mut self, address: u32) -> u8 {
        self.bus.read(address & 0xff_ffff, &mut self.state.signals)
    }

    #[inline]
    pub fn write(&mut self, address: u32, value: u8) {
        self.bus.write(address & 0xff_ffff, value, &mut self.state.signals);
    }

    /// One internal operation cycle.
    #[inline]
    pub fn idle(&mut self) {
        self.clock.tick_cpu();
    }

    pub fn fault(&mut self, message: impl Into<String>) {
        self.state
            .signals
            .raise(BreakReason::InstructionFault, message);
    }

    #[inline]
    pub fn fetch8(&mut self) -> u8 {
        let value = self.read(self.state.pc24());
        self.state.pc = self.state.pc.wrapping_add(1);
        value
    }

    pub fn fetch16(&mut self) -> u16 {
        let lo = self.fetch8() as u16;
        let hi = self.fetch8() as u16;
        (hi << 8) | lo
    }

    pub fn fetch24(&mut self) -> u32 {
        let lo = self.fetch16() as u32;
        let bank = self.fetch8() as u32;
        (bank << 16) | lo
    }

    pub fn read_ea(&mut self, ea: Ea, wide: bool) -> u16 {
        let lo = self.read(ea.address) as u16;
        if !wide {
            return lo;
        }
        let hi = self.read(ea.next()) as u16;
        (hi << 8) | lo
    }

    pub fn write_ea(&mut self, ea: Ea, value: u16, wide: bool) {
        self.write(ea.address, value as u8);
        if wide {
            self.write(ea.next(), (value >> 8) as u8);
        }
    }

    /// Word read inside bank 0, as used for vectors and indirect jumps.
    pub fn read_bank0_u16(&mut self, offset: u16) -> u16 {
        let lo = self.read(offset as u32) as u16;
        let hi = self.read(offset.wrapping_add(1) as u32) as u16;
        (hi << 8) | lo
    }

    // Legacy stack operations: in emulation mode S stays in page 1.

    pub fn push8(&mut self, value: u8) {
        let s = self.state.s;
        self.write(s as u32, value);
        self.state.s = if Self::EMULATION {
            0x0100 | (s.wrapping_sub(1) & 0xff)
        } else {
            s.wrapping_sub(1)
        };
    }

    pub fn pull8(&mut self) -> u8 {
        self.state.s = if Self::EMULATION {
            0x0100 | (self.state.s.wrapping_add(1) & 0xff)
        } else {
            self.state.s.wrapping_add(1)
        };
        self.read(self.state.s as u32)
    }

    pub fn push16(&mut self, value: u16) {
        self.push8((value >> 8) as u8);
        self.push8(value as u8);
    }

    pub fn pull16(&mut self) -> u16 {
        let lo = self.pull8() as u16;
        let hi = self.pull8() as u16;
        (hi << 8) | lo
    }

    // 65816-only stack operations run on the full 16-bit S even in
    // emulation mode; callers finish with `confine_stack`.

    pub fn push8_linear(&mut self, value: u8) {
        let s = self.state.s;
        self.write(s as u32, value);
        self.state.s = s.wrapping_sub(1);
    }

    pub fn pull8_linear(&mut self) -> u8 {
        self.state.s = self.state.s.wrapping_add(1);
        self.read(self.state.s as u32)
    }

    pub fn push16_linear(&mut self, value: u16) {
        self.push8_linear((value >> 8) as u8);
        self.push8_linear(value as u8);
    }

    pub fn pull16_linear(&mut self) -> u16 {
        let lo = self.pull8_linear() as u16;
        let hi = self.pull8_linear() as u16;
        (hi << 8) | lo
    }

    #[inline]
    pub fn confine_stack(&mut self) {
        if Self::EMULATION {
            self.state.s = 0x0100 | (self.state.s & 0xff);
        }
    }

    #[inline]
    pub fn set_flag(&mut self, flag: StatusFlags, on: bool) {
        self.state.p.set(flag, on);
    }

    /// Accumulator as seen at the current width.
    #[inline]
    pub fn acc(&self) -> u16 {
        if Self::WIDE_A {
            self.state.a
        } else {
            self.state.a & 0xff
        }
    }

    /// Store into the accumulator at the current width and update N/Z. The
    /// high byte survives 8-bit writes.
    pub fn set_a(&mut self, value: u16) {
        if Self::WIDE_A {
            self.state.a = value;
        } else {
            self.state.a = (self.state.a & 0xff00) | (value & 0xff);
        }
        self.state.set_nz(value, Self::WIDE_A);
    }

    pub fn set_x(&mut self, value: u16) {
        self.state.x = if Self::WIDE_XY { value } else { value & 0xff };
        self.state.set_nz(value, Self::WIDE_XY);
    }

    pub fn set_y(&mut self, value: u16) {
        self.state.y = if Self::WIDE_XY { value } else { value & 0xff };
        self.state.set_nz(value, Self::WIDE_XY);
    }

    /// Replace P and apply everything that follows from the new m/x bits.
    pub fn set_p(&mut self, value: u8) {
        let mut p = StatusFlags::from_bits_retain(value);
        if Self::EMULATION {
            p |= StatusFlags::MEMORY_8BIT | StatusFlags::INDEX_8BIT;
        }
        self.state.p = p;

        if p.contains(StatusFlags::INDEX_8BIT) {
            self.state.x &= 0xff;
            self.state.y &= 0xff;
        }

        if !Self::EMULATION {
            let mode = Mode::from_flags(p);
            if mode != self.state.mode {
                log::debug!("mode {} -> {} at {:06X}", self.state.mode, mode, self.state.pc24());
                self.state.mode = mode;
                self.state.signals.mode_changed();
            }
        }
    }
}
