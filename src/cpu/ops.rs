//! Instruction semantics.
//!
//! Every handler is generic over the width mode it runs in and the
//! addressing mode of its opcode. The opcode byte is already consumed.

use super::addressing::IMMEDIATE;
use super::core::Core;
use super::state::{acc16, emulation, idx16, Mode, State, StatusFlags};
use crate::signals::BreakReason;

// ---- arithmetic helpers ----

fn adc8(state: &mut State, data: u8) {
    let a = state.a & 0xff;
    let data = data as u16;
    let carry = state.flag(StatusFlags::CARRY) as u16;

    let mut result: u16;
    if !state.flag(StatusFlags::DECIMAL) {
        result = a + data + carry;
    } else {
        result = (a & 0x0f) + (data & 0x0f) + carry;
        if result > 0x09 {
            result += 0x06;
        }
        let half = (result > 0x0f) as u16;
        result = (a & 0xf0) + (data & 0xf0) + (half << 4) + (result & 0x0f);
    }

    state.p.set(
        StatusFlags::OVERFLOW,
        !(a ^ data) & (a ^ result) & 0x80 != 0,
    );
    if state.flag(StatusFlags::DECIMAL) && result > 0x9f {
        result += 0x60;
    }
    state.p.set(StatusFlags::CARRY, result > 0xff);
    state.a = (state.a & 0xff00) | (result & 0xff);
    state.set_nz(result, false);
}

fn adc16(state: &mut State, data: u16) {
    let a = state.a as u32;
    let data = data as u32;
    let carry = state.flag(StatusFlags::CARRY) as u32;

    let mut result: u32;
    if !state.flag(StatusFlags::DECIMAL) {
        result = a + data + carry;
    } else {
        result = (a & 0x000f) + (data & 0x000f) + carry;
        if result > 0x0009 {
            result += 0x0006;
        }
        let mut c = (result > 0x000f) as u32;
        result = (a & 0x00f0) + (data & 0x00f0) + (c << 4) + (result & 0x000f);
        if result > 0x009f {
            result += 0x0060;
        }
        c = (result > 0x00ff) as u32;
        result = (a & 0x0f00) + (data & 0x0f00) + (c << 8) + (result & 0x00ff);
        if result > 0x09ff {
            result += 0x0600;
        }
        c = (result > 0x0fff) as u32;
        result = (a & 0xf000) + (data & 0xf000) + (c << 12) + (result & 0x0fff);
    }

    state.p.set(
        StatusFlags::OVERFLOW,
        !(a ^ data) & (a ^ result) & 0x8000 != 0,
    );
    if state.flag(StatusFlags::DECIMAL) && result > 0x9fff {
        result += 0x6000;
    }
    state.p.set(StatusFlags::CARRY, result > 0xffff);
    state.a = result as u16;
    state.set_nz(state.a, true);
}

fn sbc8(state: &mut State, data: u8) {
    let a = (state.a & 0xff) as i32;
    let data = (!data) as i32;
    let carry = state.flag(StatusFlags::CARRY) as i32;

    let mut result: i32;
    if !state.flag(StatusFlags::DECIMAL) {
        result = a + data + carry;
    } else {
        result = (a & 0x0f) + (data & 0x0f) + carry;
        if result <= 0x0f {
            result -= 0x06;
        }
        let half = (result > 0x0f) as i32;
        result = (a & 0xf0) + (data & 0xf0) + (half << 4) + (result & 0x0f);
    }

    state.p.set(
        StatusFlags::OVERFLOW,
        !(a ^ data) & (a ^ result) & 0x80 != 0,
    );
    if state.flag(StatusFlags::DECIMAL) && result <= 0xff {
        result -= 0x60;
    }
    state.p.set(StatusFlags::CARRY, result > 0xff);
    let result = (result & 0xff) as u16;
    state.a = (state.a & 0xff00) | result;
    state.set_nz(result, false);
}

fn sbc16(state: &mut State, data: u16) {
    let a = state.a as i32;
    let data = (!data) as i32;
    let carry = state.flag(StatusFlags::CARRY) as i32;

    let mut result: i32;
    if !state.flag(StatusFlags::DECIMAL) {
        result = a + data + carry;
    } else {
        result = (a & 0x000f) + (data & 0x000f) + carry;
        if result <= 0x000f {
            result -= 0x0006;
        }
        let mut c = (result > 0x000f) as i32;
        result = (a & 0x00f0) + (data & 0x00f0) + (c << 4) + (result & 0x000f);
        if result <= 0x00ff {
            result -= 0x0060;
        }
        c = (result > 0x00ff) as i32;
        result = (a & 0x0f00) + (data & 0x0f00) + (c << 8) + (result & 0x00ff);
        if result <= 0x0fff {
            result -= 0x0600;
        }
        c = (result > 0x0fff) as i32;
        result = (a & 0xf000) + (data & 0xf000) + (c << 12) + (result & 0x0fff);
    }

    state.p.set(
        StatusFlags::OVERFLOW,
        !(a ^ data) & (a ^ result) & 0x8000 != 0,
    );
    if state.flag(StatusFlags::DECIMAL) && result <= 0xffff {
        result -= 0x6000;
    }
    state.p.set(StatusFlags::CARRY, result > 0xffff);
    state.a = (result & 0xffff) as u16;
    state.set_nz(state.a, true);
}

fn compare(state: &mut State, register: u16, data: u16, wide: bool) {
    let (register, data) = if wide {
        (register, data)
    } else {
        (register & 0xff, data & 0xff)
    };
    state.p.set(StatusFlags::CARRY, register >= data);
    state.set_nz(register.wrapping_sub(data), wide);
}

#[inline]
fn msb(wide: bool) -> u16 {
    if wide {
        0x8000
    } else {
        0x80
    }
}

#[inline]
fn mask(wide: bool) -> u16 {
    if wide {
        0xffff
    } else {
        0xff
    }
}

// ---- loads and stores ----

pub fn lda<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.load::<AM>(acc16(MODE));
    c.set_a(value);
}

pub fn ldx<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.load::<AM>(idx16(MODE));
    c.set_x(value);
}

pub fn ldy<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.load::<AM>(idx16(MODE));
    c.set_y(value);
}

pub fn sta<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.state.a;
    c.store::<AM>(value, acc16(MODE));
}

pub fn stx<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.state.x;
    c.store::<AM>(value, idx16(MODE));
}

pub fn sty<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.state.y;
    c.store::<AM>(value, idx16(MODE));
}

pub fn stz<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.store::<AM>(0, acc16(MODE));
}

// ---- logic and arithmetic ----

pub fn ora<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.load::<AM>(acc16(MODE));
    let result = c.acc() | value;
    c.set_a(result);
}

pub fn and<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.load::<AM>(acc16(MODE));
    let result = c.acc() & value;
    c.set_a(result);
}

pub fn eor<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.load::<AM>(acc16(MODE));
    let result = c.acc() ^ value;
    c.set_a(result);
}

pub fn adc<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.load::<AM>(acc16(MODE));
    if acc16(MODE) {
        adc16(c.state, value);
    } else {
        adc8(c.state, value as u8);
    }
}

pub fn sbc<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.load::<AM>(acc16(MODE));
    if acc16(MODE) {
        sbc16(c.state, value);
    } else {
        sbc8(c.state, value as u8);
    }
}

pub fn cmp<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.load::<AM>(acc16(MODE));
    let a = c.state.a;
    compare(c.state, a, value, acc16(MODE));
}

pub fn cpx<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.load::<AM>(idx16(MODE));
    let x = c.state.x;
    compare(c.state, x, value, idx16(MODE));
}

pub fn cpy<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.load::<AM>(idx16(MODE));
    let y = c.state.y;
    compare(c.state, y, value, idx16(MODE));
}

/// Immediate BIT only touches Z.
pub fn bit<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let wide = acc16(MODE);
    let value = c.load::<AM>(wide);
    if AM != IMMEDIATE {
        c.set_flag(StatusFlags::NEGATIVE, value & msb(wide) != 0);
        c.set_flag(StatusFlags::OVERFLOW, value & (msb(wide) >> 1) != 0);
    }
    let zero = c.acc() & value == 0;
    c.set_flag(StatusFlags::ZERO, zero);
}

pub fn tsb<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let wide = acc16(MODE);
    let a = c.acc();
    c.modify::<AM>(wide, |state, value| {
        state.p.set(StatusFlags::ZERO, a & value == 0);
        value | a
    });
}

pub fn trb<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let wide = acc16(MODE);
    let a = c.acc();
    c.modify::<AM>(wide, |state, value| {
        state.p.set(StatusFlags::ZERO, a & value == 0);
        value & !a
    });
}

// ---- shifts, rotates, increments ----

pub fn asl<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let wide = acc16(MODE);
    c.modify::<AM>(wide, |state, value| {
        state.p.set(StatusFlags::CARRY, value & msb(wide) != 0);
        let result = (value << 1) & mask(wide);
        state.set_nz(result, wide);
        result
    });
}

pub fn lsr<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let wide = acc16(MODE);
    c.modify::<AM>(wide, |state, value| {
        state.p.set(StatusFlags::CARRY, value & 1 != 0);
        let result = value >> 1;
        state.set_nz(result, wide);
        result
    });
}

pub fn rol<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let wide = acc16(MODE);
    c.modify::<AM>(wide, |state, value| {
        let carry_in = state.flag(StatusFlags::CARRY) as u16;
        state.p.set(StatusFlags::CARRY, value & msb(wide) != 0);
        let result = ((value << 1) | carry_in) & mask(wide);
        state.set_nz(result, wide);
        result
    });
}

pub fn ror<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let wide = acc16(MODE);
    c.modify::<AM>(wide, |state, value| {
        let carry_in = if state.flag(StatusFlags::CARRY) {
            msb(wide)
        } else {
            0
        };
        state.p.set(StatusFlags::CARRY, value & 1 != 0);
        let result = (value >> 1) | carry_in;
        state.set_nz(result, wide);
        result
    });
}

pub fn inc<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let wide = acc16(MODE);
    c.modify::<AM>(wide, |state, value| {
        let result = value.wrapping_add(1) & mask(wide);
        state.set_nz(result, wide);
        result
    });
}

pub fn dec<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let wide = acc16(MODE);
    c.modify::<AM>(wide, |state, value| {
        let result = value.wrapping_sub(1) & mask(wide);
        state.set_nz(result, wide);
        result
    });
}

pub fn inx<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let value = c.state.x.wrapping_add(1);
    c.set_x(value);
}

pub fn iny<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let value = c.state.y.wrapping_add(1);
    c.set_y(value);
}

pub fn dex<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let value = c.state.x.wrapping_sub(1);
    c.set_x(value);
}

pub fn dey<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let value = c.state.y.wrapping_sub(1);
    c.set_y(value);
}

// ---- transfers ----

pub fn tax<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let value = c.state.a;
    c.set_x(value);
}

pub fn tay<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let value = c.state.a;
    c.set_y(value);
}

pub fn txa<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let value = c.state.x;
    c.set_a(value);
}

pub fn tya<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let value = c.state.y;
    c.set_a(value);
}

pub fn txy<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let value = c.state.x;
    c.set_y(value);
}

pub fn tyx<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let value = c.state.y;
    c.set_x(value);
}

pub fn tsx<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let value = c.state.s;
    c.set_x(value);
}

pub fn txs<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.state.s = c.state.x;
    c.confine_stack();
}

pub fn tcs<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.state.s = c.state.a;
    c.confine_stack();
}

pub fn tsc<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.state.a = c.state.s;
    c.state.set_nz(c.state.a, true);
}

pub fn tcd<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.state.d = c.state.a;
    c.state.set_nz(c.state.d, true);
}

pub fn tdc<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.state.a = c.state.d;
    c.state.set_nz(c.state.a, true);
}

pub fn xba<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
    c.state.a = c.state.a.swap_bytes();
    c.state.set_nz(c.state.a, false);
}

// ---- stack ----

pub fn pha<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let a = c.state.a;
    if acc16(MODE) {
        c.push16(a);
    } else {
        c.push8(a as u8);
    }
}

pub fn phx<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let x = c.state.x;
    if idx16(MODE) {
        c.push16(x);
    } else {
        c.push8(x as u8);
    }
}

pub fn phy<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let y = c.state.y;
    if idx16(MODE) {
        c.push16(y);
    } else {
        c.push8(y as u8);
    }
}

pub fn php<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let p = c.state.p.bits();
    c.push8(p);
}

pub fn phb<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let bank = (c.state.dbr >> 16) as u8;
    c.push8(bank);
}

pub fn phk<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let bank = (c.state.k >> 16) as u8;
    c.push8(bank);
}

pub fn phd<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let d = c.state.d;
    c.push16_linear(d);
    c.confine_stack();
}

pub fn pla<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
    let value = if acc16(MODE) {
        c.pull16()
    } else {
        c.pull8() as u16
    };
    c.set_a(value);
}

pub fn plx<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
    let value = if idx16(MODE) {
        c.pull16()
    } else {
        c.pull8() as u16
    };
    c.set_x(value);
}

pub fn ply<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
    let value = if idx16(MODE) {
        c.pull16()
    } else {
        c.pull8() as u16
    };
    c.set_y(value);
}

pub fn plp<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
    let value = c.pull8();
    c.set_p(value);
}

pub fn plb<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
    let bank = c.pull8_linear();
    c.confine_stack();
    c.state.dbr = (bank as u32) << 16;
    c.state.set_nz(bank as u16, false);
}

pub fn pld<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
    let d = c.pull16_linear();
    c.confine_stack();
    c.state.d = d;
    c.state.set_nz(d, true);
}

pub fn pea<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let value = c.fetch16();
    c.push16_linear(value);
    c.confine_stack();
}

pub fn pei<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let offset = c.fetch8() as u16;
    c.direct_penalty();
    let pointer = c.state.d.wrapping_add(offset);
    let value = c.read_bank0_u16(pointer);
    c.push16_linear(value);
    c.confine_stack();
}

pub fn per<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let displacement = c.fetch16();
    c.idle();
    let value = c.state.pc.wrapping_add(displacement);
    c.push16_linear(value);
    c.confine_stack();
}

// ---- branches ----

/// Displacement is relative to the following instruction. Emulation mode
/// charges an extra cycle when the target is on another page.
fn branch<const MODE: u8>(c: &mut Core<'_, MODE>, take: bool) {
    let displacement = c.fetch8() as i8;
    if !take {
        return;
    }

    let target = c.state.pc.wrapping_add(displacement as i16 as u16);
    c.idle();
    if emulation(MODE) && (target & 0xff00) != (c.state.pc & 0xff00) {
        c.idle();
    }
    c.state.pc = target;
}

pub fn bpl<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let take = !c.state.flag(StatusFlags::NEGATIVE);
    branch(c, take);
}

pub fn bmi<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let take = c.state.flag(StatusFlags::NEGATIVE);
    branch(c, take);
}

pub fn bvc<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let take = !c.state.flag(StatusFlags::OVERFLOW);
    branch(c, take);
}

pub fn bvs<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let take = c.state.flag(StatusFlags::OVERFLOW);
    branch(c, take);
}

pub fn bcc<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let take = !c.state.flag(StatusFlags::CARRY);
    branch(c, take);
}

pub fn bcs<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let take = c.state.flag(StatusFlags::CARRY);
    branch(c, take);
}

pub fn bne<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let take = !c.state.flag(StatusFlags::ZERO);
    branch(c, take);
}

pub fn beq<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let take = c.state.flag(StatusFlags::ZERO);
    branch(c, take);
}

pub fn bra<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    branch(c, true);
}

pub fn brl<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let displacement = c.fetch16();
    c.idle();
    c.state.pc = c.state.pc.wrapping_add(displacement);
}

// ---- jumps and calls ----

pub fn jmp<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.state.pc = c.fetch16();
}

pub fn jml<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let target = c.fetch24();
    c.state.pc = target as u16;
    c.state.k = target & 0xff_0000;
}

/// `JMP ($1234)`: the pointer lives in bank 0.
pub fn jmp_indirect<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let pointer = c.fetch16();
    c.state.pc = c.read_bank0_u16(pointer);
}

/// `JMP ($1234,X)`: the pointer lives in the program bank.
pub fn jmp_indexed_indirect<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let base = c.fetch16();
    c.idle();
    let pointer = base.wrapping_add(c.state.x);
    let k = c.state.k;
    let lo = c.read(k | pointer as u32) as u16;
    let hi = c.read(k | pointer.wrapping_add(1) as u32) as u16;
    c.state.pc = (hi << 8) | lo;
}

pub fn jml_indirect<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let pointer = c.fetch16();
    let lo = c.read_bank0_u16(pointer);
    let bank = c.read(pointer.wrapping_add(2) as u32) as u32;
    c.state.pc = lo;
    c.state.k = bank << 16;
}

/// Pushes the address of the instruction's last byte.
pub fn jsr<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let target = c.fetch16();
    c.idle();
    let ret = c.state.pc.wrapping_sub(1);
    c.push16(ret);
    c.state.pc = target;
}

pub fn jsr_indexed_indirect<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let lo = c.fetch8() as u16;
    let ret = c.state.pc;
    c.push16_linear(ret);
    let hi = c.fetch8() as u16;
    c.idle();
    let pointer = ((hi << 8) | lo).wrapping_add(c.state.x);
    let k = c.state.k;
    let target_lo = c.read(k | pointer as u32) as u16;
    let target_hi = c.read(k | pointer.wrapping_add(1) as u32) as u16;
    c.confine_stack();
    c.state.pc = (target_hi << 8) | target_lo;
}

pub fn jsl<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let target = c.fetch16();
    let k = (c.state.k >> 16) as u8;
    c.push8_linear(k);
    c.idle();
    let bank = c.fetch8() as u32;
    let ret = c.state.pc.wrapping_sub(1);
    c.push16_linear(ret);
    c.confine_stack();
    c.state.pc = target;
    c.state.k = bank << 16;
}

pub fn rts<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
    let ret = c.pull16();
    c.idle();
    c.state.pc = ret.wrapping_add(1);
}

pub fn rtl<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
    let ret = c.pull16_linear();
    let bank = c.pull8_linear() as u32;
    c.confine_stack();
    c.state.pc = ret.wrapping_add(1);
    c.state.k = bank << 16;
}

pub fn rti<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
    let p = c.pull8();
    c.set_p(p);
    c.state.pc = c.pull16();
    if !emulation(MODE) {
        let bank = c.pull8() as u32;
        c.state.k = bank << 16;
    }
}

// ---- interrupts ----

fn interrupt<const MODE: u8>(
    c: &mut Core<'_, MODE>,
    native_vector: u16,
    emulation_vector: u16,
    brk: bool,
) {
    c.fetch8();
    let emulated = emulation(MODE);
    if !emulated {
        let k = (c.state.k >> 16) as u8;
        c.push8(k);
    }
    let pc = c.state.pc;
    c.push16(pc);

    let mut p = c.state.p;
    if emulated && brk {
        p |= StatusFlags::INDEX_8BIT;
    }
    c.push8(p.bits());

    c.state.p.insert(StatusFlags::IRQ_DISABLE);
    c.state.p.remove(StatusFlags::DECIMAL);
    c.state.k = 0;

    let vector = if emulated {
        emulation_vector
    } else {
        native_vector
    };
    c.state.pc = c.read_bank0_u16(vector);
}

pub fn brk<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    interrupt(c, 0xffe6, 0xfffe, true);
}

pub fn cop<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    interrupt(c, 0xffe4, 0xfff4, false);
}

// ---- flags and mode ----

pub fn clc<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.set_flag(StatusFlags::CARRY, false);
}

pub fn sec<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.set_flag(StatusFlags::CARRY, true);
}

pub fn cli<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.set_flag(StatusFlags::IRQ_DISABLE, false);
}

pub fn sei<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.set_flag(StatusFlags::IRQ_DISABLE, true);
}

pub fn cld<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.set_flag(StatusFlags::DECIMAL, false);
}

pub fn sed<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.set_flag(StatusFlags::DECIMAL, true);
}

pub fn clv<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.set_flag(StatusFlags::OVERFLOW, false);
}

pub fn rep<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let bits = c.fetch8();
    c.idle();
    let p = c.state.p.bits() & !bits;
    c.set_p(p);
}

pub fn sep<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let bits = c.fetch8();
    c.idle();
    let p = c.state.p.bits() | bits;
    c.set_p(p);
}

/// Swap carry with the emulation bit.
pub fn xce<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    let carry = c.state.flag(StatusFlags::CARRY);

    if emulation(MODE) {
        if carry {
            return;
        }
        c.state.p.insert(StatusFlags::CARRY);
        c.state.mode = Mode::from_flags(c.state.p);
    } else {
        if !carry {
            return;
        }
        c.state.p.remove(StatusFlags::CARRY);
        c.state.p |= StatusFlags::MEMORY_8BIT | StatusFlags::INDEX_8BIT;
        c.state.x &= 0xff;
        c.state.y &= 0xff;
        c.state.s = 0x0100 | (c.state.s & 0xff);
        c.state.mode = Mode::Emulation;
    }

    log::debug!("XCE -> {} at {:06X}", c.state.mode, c.state.pc24());
    c.state.signals.mode_changed();
}

// ---- block moves ----

fn block_move<const MODE: u8>(c: &mut Core<'_, MODE>, step: u16) {
    let dest = c.fetch8() as u32;
    let src = c.fetch8() as u32;
    c.state.dbr = dest << 16;

    let value = c.read((src << 16) | c.state.x as u32);
    c.write((dest << 16) | c.state.y as u32, value);
    c.idle();
    c.idle();

    let index_mask = mask(idx16(MODE));
    c.state.x = c.state.x.wrapping_add(step) & index_mask;
    c.state.y = c.state.y.wrapping_add(step) & index_mask;

    c.state.a = c.state.a.wrapping_sub(1);
    if c.state.a != 0xffff {
        c.state.pc = c.state.pc.wrapping_sub(3);
    }
}

pub fn mvn<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    block_move(c, 1);
}

pub fn mvp<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    block_move(c, 0xffff);
}

// ---- misc ----

pub fn nop<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
}

pub fn wdm<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    let operand = c.fetch8();
    let at = c.state.pc24();
    c.fault(format!("WDM ${:02X} at {:06X}", operand, at));
}

/// No interrupt sources are modelled, so WAI completes immediately.
pub fn wai<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
}

pub fn stp<const MODE: u8, const AM: u8>(c: &mut Core<'_, MODE>) {
    c.idle();
    c.idle();
    let at = c.state.pc24();
    c.state.stopped = true;
    c.state
        .signals
        .raise(BreakReason::Stop, format!("STP at {:06X}", at));
}
