//! Trait representing the minimal bus interface required by the 65816 core.

use crate::signals::Signals;

/// 24-bit address space as seen by the CPU.
///
/// `read` and `write` may latch a break through `signals`; the core uses the
/// returned value regardless. `peek` has no side effects and is only used by
/// tooling.
pub trait Bus {
    fn read(&mut self, address: u32, signals: &mut Signals) -> u8;
    fn write(&mut self, address: u32, value: u8, signals: &mut Signals);
    fn peek(&self, address: u32) -> u8;

    /// Little-endian word, wrapping inside the bank of `address`.
    fn peek_u16(&self, address: u32) -> u16 {
        let lo = self.peek(address) as u16;
        let hi = self.peek(next_in_bank(address)) as u16;
        (hi << 8) | lo
    }
}

#[inline]
pub fn next_in_bank(address: u32) -> u32 {
    (address & 0xff_0000) | (address.wrapping_add(1) & 0xffff)
}
