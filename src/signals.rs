//! Break channel shared between the CPU core and bus implementations.
//!
//! Faults never unwind. A bus or an instruction latches a reason and a
//! message here and the dispatch loop stops after the current instruction.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Reasons for the inner dispatch loop to return to the outer loop.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SlowPath: u8 {
        const BREAK = 0x01;
        const MODE_CHANGE = 0x02;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakReason {
    #[default]
    None,
    BadRead,
    BadWrite,
    InstructionFault,
    Stop,
}

impl BreakReason {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakReason::None => "none",
            BreakReason::BadRead => "bad read",
            BreakReason::BadWrite => "bad write",
            BreakReason::InstructionFault => "instruction fault",
            BreakReason::Stop => "stop",
        }
    }
}

impl fmt::Display for BreakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals {
    pub slow_path: SlowPath,
    pub reason: BreakReason,
    pub message: String,
}

impl Signals {
    /// Latch a break. Only the first reason since the last clear is kept.
    pub fn raise(&mut self, reason: BreakReason, message: impl Into<String>) {
        if self.reason != BreakReason::None || reason == BreakReason::None {
            return;
        }

        self.reason = reason;
        self.message = message.into();
        self.slow_path |= SlowPath::BREAK;

        if reason == BreakReason::Stop {
            log::debug!("break latched: {} ({})", reason, self.message);
        } else {
            log::warn!("break latched: {} ({})", reason, self.message);
        }
    }

    pub fn clear_break(&mut self) {
        self.reason = BreakReason::None;
        self.message.clear();
        self.slow_path.remove(SlowPath::BREAK);
    }

    pub fn mode_changed(&mut self) {
        self.slow_path |= SlowPath::MODE_CHANGE;
    }

    #[inline]
    pub fn is_break(&self) -> bool {
        self.reason != BreakReason::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_reason_wins() {
        let mut signals = Signals::default();
        signals.raise(BreakReason::BadRead, "unmapped $2100");
        signals.raise(BreakReason::Stop, "stp");

        assert_eq!(signals.reason, BreakReason::BadRead);
        assert_eq!(signals.message, "unmapped $2100");
        assert!(signals.slow_path.contains(SlowPath::BREAK));
    }

    #[test]
    fn test_clear_break_keeps_mode_change() {
        let mut signals = Signals::default();
        signals.mode_changed();
        signals.raise(BreakReason::InstructionFault, "wdm");
        signals.clear_break();

        assert!(!signals.is_break());
        assert!(signals.message.is_empty());
        assert_eq!(signals.slow_path, SlowPath::MODE_CHANGE);
    }
}
