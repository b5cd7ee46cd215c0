//! Addressing-mode resolver.
//!
//! Every resolution consumes operand bytes through the program counter and
//! ticks internal cycles as it goes, so decoding and timing are interleaved
//! exactly as on the bus.

use super::catalog::Depends;
use super::core::Core;
use super::state::State;
use crate::cpu_bus::next_in_bank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AddressingMode {
    /// `$1234`
    Abs,
    /// `$1234,X`
    AbsX,
    /// `$1234,Y`
    AbsY,
    /// `($1234)`
    AbsIndirect,
    /// `[$1234]`
    AbsIndirectLong,
    /// `($1234,X)`
    AbsXIndirect,
    /// `$12`
    Direct,
    /// `$12,X`
    DirectX,
    /// `$12,Y`
    DirectY,
    /// `($12)`
    DirectIndirect,
    /// `[$12]`
    DirectIndirectLong,
    /// `($12,X)`
    DirectXIndirect,
    /// `($12),Y`
    DirectIndirectY,
    /// `[$12],Y`
    DirectIndirectLongY,
    /// `#$12` or `#$1234`
    Immediate,
    Implied,
    /// `$123456`
    Long,
    /// `$123456,X`
    LongX,
    Rel8,
    Rel16,
    /// `$12,$34` for the block moves
    SrcDest,
    /// `$12,S`
    Stack,
    /// `($12,S),Y`
    StackIndirectY,
}

impl AddressingMode {
    pub const ALL: [AddressingMode; 23] = [
        AddressingMode::Abs,
        AddressingMode::AbsX,
        AddressingMode::AbsY,
        AddressingMode::AbsIndirect,
        AddressingMode::AbsIndirectLong,
        AddressingMode::AbsXIndirect,
        AddressingMode::Direct,
        AddressingMode::DirectX,
        AddressingMode::DirectY,
        AddressingMode::DirectIndirect,
        AddressingMode::DirectIndirectLong,
        AddressingMode::DirectXIndirect,
        AddressingMode::DirectIndirectY,
        AddressingMode::DirectIndirectLongY,
        AddressingMode::Immediate,
        AddressingMode::Implied,
        AddressingMode::Long,
        AddressingMode::LongX,
        AddressingMode::Rel8,
        AddressingMode::Rel16,
        AddressingMode::SrcDest,
        AddressingMode::Stack,
        AddressingMode::StackIndirectY,
    ];

    #[inline]
    pub const fn from_tag(tag: u8) -> AddressingMode {
        Self::ALL[tag as usize]
    }

    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Operand bytes following the opcode. Immediates depend on the width.
    pub fn operand_bytes(self, wide_immediate: bool) -> u8 {
        use AddressingMode::*;
        match self {
            Implied => 0,
            Immediate => {
                if wide_immediate {
                    2
                } else {
                    1
                }
            }
            Direct | DirectX | DirectY | DirectIndirect | DirectIndirectLong | DirectXIndirect
            | DirectIndirectY | DirectIndirectLongY | Rel8 | Stack | StackIndirectY => 1,
            Abs | AbsX | AbsY | AbsIndirect | AbsIndirectLong | AbsXIndirect | Rel16 | SrcDest => 2,
            Long | LongX => 3,
        }
    }

    /// Width flags the resolution itself depends on, independent of the
    /// instruction using it.
    pub fn depends(self) -> Depends {
        use AddressingMode::*;
        match self {
            AbsX | AbsY => Depends::INDEX,
            DirectIndirectY => Depends::INDEX | Depends::EMULATION,
            DirectX | DirectY | DirectIndirect | DirectXIndirect => Depends::EMULATION,
            _ => Depends::empty(),
        }
    }

    pub fn name(self) -> &'static str {
        use AddressingMode::*;
        match self {
            Abs => "abs",
            AbsX => "abs,x",
            AbsY => "abs,y",
            AbsIndirect => "(abs)",
            AbsIndirectLong => "[abs]",
            AbsXIndirect => "(abs,x)",
            Direct => "dp",
            DirectX => "dp,x",
            DirectY => "dp,y",
            DirectIndirect => "(dp)",
            DirectIndirectLong => "[dp]",
            DirectXIndirect => "(dp,x)",
            DirectIndirectY => "(dp),y",
            DirectIndirectLongY => "[dp],y",
            Immediate => "imm",
            Implied => "implied",
            Long => "long",
            LongX => "long,x",
            Rel8 => "rel8",
            Rel16 => "rel16",
            SrcDest => "src,dest",
            Stack => "sr,s",
            StackIndirectY => "(sr,s),y",
        }
    }
}

pub const IMMEDIATE: u8 = AddressingMode::Immediate as u8;
pub const IMPLIED: u8 = AddressingMode::Implied as u8;

/// Kind of access an effective address is resolved for. Indexed modes
/// charge their extra cycle differently for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Modify,
}

/// Resolved effective address.
///
/// Direct-page and stack-relative targets live in bank 0 and their second
/// byte wraps at 16 bits; everything else carries into the next bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ea {
    pub address: u32,
    pub bank_wrap: bool,
}

impl Ea {
    #[inline]
    pub fn linear(address: u32) -> Self {
        Self {
            address: address & 0xff_ffff,
            bank_wrap: false,
        }
    }

    #[inline]
    pub fn bank0(offset: u16) -> Self {
        Self {
            address: offset as u32,
            bank_wrap: true,
        }
    }

    #[inline]
    pub fn next(self) -> u32 {
        if self.bank_wrap {
            next_in_bank(self.address)
        } else {
            (self.address + 1) & 0xff_ffff
        }
    }
}

impl<const MODE: u8> Core<'_, MODE> {
    /// Direct-page offset as read through a pointer or index. In emulation
    /// mode with a page-aligned D the access stays inside that page.
    #[inline]
    fn direct_wrapped(&self, offset: u16) -> u16 {
        let d = self.state.d;
        if Self::EMULATION && d & 0xff == 0 {
            d | (offset & 0xff)
        } else {
            d.wrapping_add(offset)
        }
    }

    #[inline]
    pub fn direct_penalty(&mut self) {
        if self.state.d & 0xff != 0 {
            self.idle();
        }
    }

    fn direct_pointer16(&mut self, offset: u16) -> u16 {
        let lo = self.read(self.direct_wrapped(offset) as u32) as u16;
        let hi = self.read(self.direct_wrapped(offset.wrapping_add(1)) as u32) as u16;
        (hi << 8) | lo
    }

    /// Long pointers never use the emulation-mode page wrap.
    fn direct_pointer24(&mut self, offset: u16) -> u32 {
        let base = self.state.d.wrapping_add(offset);
        let lo = self.read(base as u32) as u32;
        let mid = self.read(base.wrapping_add(1) as u32) as u32;
        let hi = self.read(base.wrapping_add(2) as u32) as u32;
        (hi << 16) | (mid << 8) | lo
    }

    /// Extra cycle for indexing: always for writes, read-modify-writes and
    /// 16-bit indices, otherwise only when the index crosses a page.
    #[inline]
    pub fn index_penalty(&mut self, base: u16, index: u16, access: Access) {
        if access != Access::Read
            || Self::WIDE_XY
            || (base & 0xff00) != (base.wrapping_add(index) & 0xff00)
        {
            self.idle();
        }
    }

    fn absolute_indexed(&mut self, index: u16, access: Access) -> Ea {
        let base = self.fetch16();
        self.index_penalty(base, index, access);
        Ea::linear(self.state.dbr + base as u32 + index as u32)
    }

    /// Resolve the effective address of a memory operand.
    pub fn effective<const AM: u8>(&mut self, access: Access) -> Ea {
        use AddressingMode::*;

        match AddressingMode::from_tag(AM) {
            Abs => {
                let offset = self.fetch16();
                Ea::linear(self.state.dbr | offset as u32)
            }
            AbsX => self.absolute_indexed(self.state.x, access),
            AbsY => self.absolute_indexed(self.state.y, access),
            Direct => {
                let offset = self.fetch8() as u16;
                self.direct_penalty();
                Ea::bank0(self.direct_wrapped(offset))
            }
            DirectX | DirectY => {
                let offset = self.fetch8() as u16;
                self.direct_penalty();
                self.idle();
                let index = if AddressingMode::from_tag(AM) == DirectX {
                    self.state.x
                } else {
                    self.state.y
                };
                Ea::bank0(self.direct_wrapped(offset.wrapping_add(index)))
            }
            DirectIndirect => {
                let offset = self.fetch8() as u16;
                self.direct_penalty();
                let pointer = self.direct_pointer16(offset);
                Ea::linear(self.state.dbr | pointer as u32)
            }
            DirectXIndirect => {
                let offset = self.fetch8() as u16;
                self.direct_penalty();
                self.idle();
                let pointer = self.direct_pointer16(offset.wrapping_add(self.state.x));
                Ea::linear(self.state.dbr | pointer as u32)
            }
            DirectIndirectY => {
                let offset = self.fetch8() as u16;
                self.direct_penalty();
                let pointer = self.direct_pointer16(offset);
                let y = self.state.y;
                self.index_penalty(pointer, y, access);
                Ea::linear(self.state.dbr + pointer as u32 + y as u32)
            }
            DirectIndirectLong => {
                let offset = self.fetch8() as u16;
                self.direct_penalty();
                Ea::linear(self.direct_pointer24(offset))
            }
            DirectIndirectLongY => {
                let offset = self.fetch8() as u16;
                self.direct_penalty();
                let pointer = self.direct_pointer24(offset);
                Ea::linear(pointer + self.state.y as u32)
            }
            Long => Ea::linear(self.fetch24()),
            LongX => {
                let base = self.fetch24();
                Ea::linear(base + self.state.x as u32)
            }
            Stack => {
                let offset = self.fetch8() as u16;
                self.idle();
                Ea::bank0(self.state.s.wrapping_add(offset))
            }
            StackIndirectY => {
                let offset = self.fetch8() as u16;
                self.idle();
                let pointer = self.read_bank0_u16(self.state.s.wrapping_add(offset));
                self.idle();
                Ea::linear(self.state.dbr + pointer as u32 + self.state.y as u32)
            }
            other => {
                self.fault(format!(
                    "addressing mode {} has no effective address",
                    other.name()
                ));
                Ea::linear(0)
            }
        }
    }

    /// Operand value at the given width, immediate or from memory.
    pub fn load<const AM: u8>(&mut self, wide: bool) -> u16 {
        if AM == IMMEDIATE {
            if wide {
                self.fetch16()
            } else {
                self.fetch8() as u16
            }
        } else {
            let ea = self.effective::<AM>(Access::Read);
            self.read_ea(ea, wide)
        }
    }

    pub fn store<const AM: u8>(&mut self, value: u16, wide: bool) {
        let ea = self.effective::<AM>(Access::Write);
        self.write_ea(ea, value, wide);
    }

    /// Read-modify-write. With implied addressing the accumulator is the
    /// operand. Memory results are written high byte first.
    pub fn modify<const AM: u8>(&mut self, wide: bool, op: impl FnOnce(&mut State, u16) -> u16) {
        if AM == IMPLIED {
            self.idle();
            let value = if wide { self.state.a } else { self.state.a & 0xff };
            let result = op(&mut *self.state, value);
            self.state.a = if wide {
                result
            } else {
                (self.state.a & 0xff00) | (result & 0xff)
            };
            return;
        }

        let ea = self.effective::<AM>(Access::Modify);
        let value = self.read_ea(ea, wide);
        self.idle();
        let result = op(&mut *self.state, value);
        if wide {
            self.write(ea.next(), (result >> 8) as u8);
        }
        self.write(ea.address, result as u8);
    }
}
