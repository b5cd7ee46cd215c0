use crate::signals::{BreakReason, Signals};
use bitflags::bitflags;
use std::fmt;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u8 {
        const CARRY = 0x01;
        const ZERO = 0x02;
        const IRQ_DISABLE = 0x04;
        const DECIMAL = 0x08;
        const INDEX_8BIT = 0x10;
        const MEMORY_8BIT = 0x20;
        const OVERFLOW = 0x40;
        const NEGATIVE = 0x80;
    }
}

/// Width configuration the core is running in.
///
/// The discriminants are the index used by the dispatch tables and by the
/// `MODE` const parameter of every instruction handler. Native modes are
/// `(p >> 4) & 3`, so an upper-case letter means the 8-bit width is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Mode {
    M16X16 = 0,
    M16X8 = 1,
    M8X16 = 2,
    M8X8 = 3,
    #[default]
    Emulation = 4,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::M16X16,
        Mode::M16X8,
        Mode::M8X16,
        Mode::M8X8,
        Mode::Emulation,
    ];

    pub const fn native(acc16: bool, idx16: bool) -> Mode {
        match (acc16, idx16) {
            (true, true) => Mode::M16X16,
            (true, false) => Mode::M16X8,
            (false, true) => Mode::M8X16,
            (false, false) => Mode::M8X8,
        }
    }

    pub fn from_flags(p: StatusFlags) -> Mode {
        Mode::ALL[((p.bits() >> 4) & 0x03) as usize]
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn acc16(self) -> bool {
        acc16(self as u8)
    }

    pub const fn idx16(self) -> bool {
        idx16(self as u8)
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::M16X16 => "mx",
            Mode::M16X8 => "mX",
            Mode::M8X16 => "Mx",
            Mode::M8X8 => "MX",
            Mode::Emulation => "em",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[inline]
pub const fn acc16(mode: u8) -> bool {
    mode == Mode::M16X16 as u8 || mode == Mode::M16X8 as u8
}

#[inline]
pub const fn idx16(mode: u8) -> bool {
    mode == Mode::M16X16 as u8 || mode == Mode::M8X16 as u8
}

#[inline]
pub const fn emulation(mode: u8) -> bool {
    mode == Mode::Emulation as u8
}

/// Register file of the 65816.
///
/// `k` and `dbr` hold the bank pre-shifted by 16 so that `k | pc` is the
/// 24-bit fetch address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub a: u16,
    pub x: u16,
    pub y: u16,
    pub pc: u16,
    pub s: u16,
    pub d: u16,
    pub k: u32,
    pub dbr: u32,
    pub p: StatusFlags,
    pub mode: Mode,
    /// Set by STP. Nothing executes until the next reset.
    pub stopped: bool,
    pub signals: Signals,
}

impl Default for State {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            s: 0x0100,
            d: 0,
            k: 0,
            dbr: 0,
            p: StatusFlags::MEMORY_8BIT | StatusFlags::INDEX_8BIT | StatusFlags::IRQ_DISABLE,
            mode: Mode::Emulation,
            stopped: false,
            signals: Signals::default(),
        }
    }
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn pc24(&self) -> u32 {
        self.k | self.pc as u32
    }

    #[inline]
    pub fn flag(&self, flag: StatusFlags) -> bool {
        self.p.contains(flag)
    }

    /// Zero and negative from the width-appropriate part of `value`.
    #[inline]
    pub fn set_nz(&mut self, value: u16, wide: bool) {
        let (zero, negative) = if wide {
            (value == 0, value & 0x8000 != 0)
        } else {
            (value & 0xff == 0, value & 0x80 != 0)
        };
        self.p.set(StatusFlags::ZERO, zero);
        self.p.set(StatusFlags::NEGATIVE, negative);
    }

    /// Enter a mode directly, applying the invariants a real transition
    /// would establish. Used by tooling that loads arbitrary register
    /// snapshots.
    pub fn enter_mode(&mut self, mode: Mode) {
        self.mode = mode;
        if mode == Mode::Emulation {
            self.s = 0x0100 | (self.s & 0xff);
            self.p |= StatusFlags::MEMORY_8BIT | StatusFlags::INDEX_8BIT;
        }
        if !mode.idx16() {
            self.x &= 0xff;
            self.y &= 0xff;
        }
    }

    /// Compare architectural registers, ignoring the break channel.
    pub fn same_registers(&self, other: &State) -> bool {
        self.a == other.a
            && self.x == other.x
            && self.y == other.y
            && self.pc == other.pc
            && self.s == other.s
            && self.d == other.d
            && self.k == other.k
            && self.dbr == other.dbr
            && self.p == other.p
            && self.mode == other.mode
    }
}

fn flag_letters(p: StatusFlags) -> String {
    const LETTERS: [(StatusFlags, char); 8] = [
        (StatusFlags::NEGATIVE, 'n'),
        (StatusFlags::OVERFLOW, 'v'),
        (StatusFlags::MEMORY_8BIT, 'm'),
        (StatusFlags::INDEX_8BIT, 'x'),
        (StatusFlags::DECIMAL, 'd'),
        (StatusFlags::IRQ_DISABLE, 'i'),
        (StatusFlags::ZERO, 'z'),
        (StatusFlags::CARRY, 'c'),
    ];

    LETTERS
        .iter()
        .map(|&(flag, c)| if p.contains(flag) { c.to_ascii_uppercase() } else { c })
        .collect()
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "A:{:04X} X:{:04X} Y:{:04X} S:{:04X} D:{:04X} DBR:{:02X} K:{:02X} PC:{:04X}",
            self.a,
            self.x,
            self.y,
            self.s,
            self.d,
            self.dbr >> 16,
            self.k >> 16,
            self.pc
        )?;
        write!(f, "P:{:02X} [{}] mode:{}", self.p.bits(), flag_letters(self.p), self.mode)?;
        if self.stopped {
            f.write_str(" stopped")?;
        }
        if !self.signals.slow_path.is_empty() {
            write!(f, " slow:{:?}", self.signals.slow_path)?;
        }
        if self.signals.reason != BreakReason::None {
            write!(f, " break:{} ({})", self.signals.reason, self.signals.message)?;
        }
        Ok(())
    }
}
