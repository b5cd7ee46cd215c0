//! Per-opcode instruction descriptors.
//!
//! The catalog is plain data: mnemonic, addressing mode, the width flags the
//! generated code depends on and a builder that yields the handler
//! specialized for a given mode. It is built once and never mutated.

use super::addressing::AddressingMode;
use super::core::{Core, Handler};
use super::disassembler::{self, Disassembly};
use super::ops;
use super::state::{Mode, State};
use crate::clock::Clock;
use crate::cpu_bus::Bus;
use bitflags::bitflags;

bitflags! {
    /// Processor state a handler's generated code varies with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Depends: u8 {
        /// accumulator / memory width (m)
        const ACC = 0x01;
        /// index width (x)
        const INDEX = 0x02;
        /// emulation-mode quirks beyond the 8-bit widths
        const EMULATION = 0x04;
    }
}

/// Which width flag selects the size of an immediate operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Accumulator,
    Index,
}

#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub addressing_mode: AddressingMode,
    pub depends: Depends,
    pub immediate_width: Option<Width>,
    build: fn(Mode) -> Handler,
}

impl Instruction {
    fn new(
        opcode: u8,
        mnemonic: &'static str,
        addressing_mode: AddressingMode,
        depends: Depends,
        immediate_width: Option<Width>,
        build: fn(Mode) -> Handler,
    ) -> Self {
        Self {
            opcode,
            mnemonic,
            addressing_mode,
            depends: depends | addressing_mode.depends(),
            immediate_width,
            build,
        }
    }

    /// Handler specialized for `mode`.
    pub fn handler(&self, mode: Mode) -> Handler {
        (self.build)(mode)
    }

    pub fn wide_immediate(&self, mode: Mode) -> bool {
        match self.immediate_width {
            Some(Width::Accumulator) => mode.acc16(),
            Some(Width::Index) => mode.idx16(),
            None => false,
        }
    }

    pub fn operand_bytes(&self, mode: Mode) -> u8 {
        self.addressing_mode.operand_bytes(self.wide_immediate(mode))
    }

    pub fn description(&self) -> String {
        format!("{} {}", self.mnemonic, self.addressing_mode.name())
    }

    pub fn disassemble(&self, mode: Mode, address: u32, bus: &dyn Bus) -> Disassembly {
        disassembler::disassemble(self, mode, address, bus)
    }
}

macro_rules! instruction {
    ($opcode:literal, $mnemonic:literal, $am:ident, $op:ident, $depends:expr, $immediate:expr) => {{
        fn build(mode: Mode) -> Handler {
            const AM: u8 = AddressingMode::$am as u8;

            fn run<const MODE: u8>(state: &mut State, bus: &mut dyn Bus, clock: &mut dyn Clock) {
                ops::$op::<MODE, AM>(&mut Core::new(state, bus, clock));
            }

            match mode {
                Mode::M16X16 => run::<0> as Handler,
                Mode::M16X8 => run::<1> as Handler,
                Mode::M8X16 => run::<2> as Handler,
                Mode::M8X8 => run::<3> as Handler,
                Mode::Emulation => run::<4> as Handler,
            }
        }

        Instruction::new(
            $opcode,
            $mnemonic,
            AddressingMode::$am,
            $depends,
            $immediate,
            build,
        )
    }};
}

/// The 256-entry opcode table.
#[derive(Debug, Clone)]
pub struct Catalog {
    instructions: Vec<Instruction>,
}

impl Catalog {
    pub fn build() -> Self {
        const NONE: Depends = Depends::empty();
        const M: Depends = Depends::ACC;
        const X: Depends = Depends::INDEX;
        const E: Depends = Depends::EMULATION;

        let instructions = vec![
            instruction!(0x00, "BRK", Immediate, brk, E, None),
            instruction!(0x01, "ORA", DirectXIndirect, ora, M, None),
            instruction!(0x02, "COP", Immediate, cop, E, None),
            instruction!(0x03, "ORA", Stack, ora, M, None),
            instruction!(0x04, "TSB", Direct, tsb, M, None),
            instruction!(0x05, "ORA", Direct, ora, M, None),
            instruction!(0x06, "ASL", Direct, asl, M, None),
            instruction!(0x07, "ORA", DirectIndirectLong, ora, M, None),
            instruction!(0x08, "PHP", Implied, php, E, None),
            instruction!(0x09, "ORA", Immediate, ora, M, Some(Width::Accumulator)),
            instruction!(0x0A, "ASL", Implied, asl, M, None),
            instruction!(0x0B, "PHD", Implied, phd, E, None),
            instruction!(0x0C, "TSB", Abs, tsb, M, None),
            instruction!(0x0D, "ORA", Abs, ora, M, None),
            instruction!(0x0E, "ASL", Abs, asl, M, None),
            instruction!(0x0F, "ORA", Long, ora, M, None),
            instruction!(0x10, "BPL", Rel8, bpl, E, None),
            instruction!(0x11, "ORA", DirectIndirectY, ora, M, None),
            instruction!(0x12, "ORA", DirectIndirect, ora, M, None),
            instruction!(0x13, "ORA", StackIndirectY, ora, M, None),
            instruction!(0x14, "TRB", Direct, trb, M, None),
            instruction!(0x15, "ORA", DirectX, ora, M, None),
            instruction!(0x16, "ASL", DirectX, asl, M, None),
            instruction!(0x17, "ORA", DirectIndirectLongY, ora, M, None),
            instruction!(0x18, "CLC", Implied, clc, NONE, None),
            instruction!(0x19, "ORA", AbsY, ora, M, None),
            instruction!(0x1A, "INC", Implied, inc, M, None),
            instruction!(0x1B, "TCS", Implied, tcs, E, None),
            instruction!(0x1C, "TRB", Abs, trb, M, None),
            instruction!(0x1D, "ORA", AbsX, ora, M, None),
            instruction!(0x1E, "ASL", AbsX, asl, M, None),
            instruction!(0x1F, "ORA", LongX, ora, M, None),
            instruction!(0x20, "JSR", Abs, jsr, E, None),
            instruction!(0x21, "AND", DirectXIndirect, and, M, None),
            instruction!(0x22, "JSL", Long, jsl, E, None),
            instruction!(0x23, "AND", Stack, and, M, None),
            instruction!(0x24, "BIT", Direct, bit, M, None),
            instruction!(0x25, "AND", Direct, and, M, None),
            instruction!(0x26, "ROL", Direct, rol, M, None),
            instruction!(0x27, "AND", DirectIndirectLong, and, M, None),
            instruction!(0x28, "PLP", Implied, plp, E, None),
            instruction!(0x29, "AND", Immediate, and, M, Some(Width::Accumulator)),
            instruction!(0x2A, "ROL", Implied, rol, M, None),
            instruction!(0x2B, "PLD", Implied, pld, E, None),
            instruction!(0x2C, "BIT", Abs, bit, M, None),
            instruction!(0x2D, "AND", Abs, and, M, None),
            instruction!(0x2E, "ROL", Abs, rol, M, None),
            instruction!(0x2F, "AND", Long, and, M, None),
            instruction!(0x30, "BMI", Rel8, bmi, E, None),
            instruction!(0x31, "AND", DirectIndirectY, and, M, None),
            instruction!(0x32, "AND", DirectIndirect, and, M, None),
            instruction!(0x33, "AND", StackIndirectY, and, M, None),
            instruction!(0x34, "BIT", DirectX, bit, M, None),
            instruction!(0x35, "AND", DirectX, and, M, None),
            instruction!(0x36, "ROL", DirectX, rol, M, None),
            instruction!(0x37, "AND", DirectIndirectLongY, and, M, None),
            instruction!(0x38, "SEC", Implied, sec, NONE, None),
            instruction!(0x39, "AND", AbsY, and, M, None),
            instruction!(0x3A, "DEC", Implied, dec, M, None),
            instruction!(0x3B, "TSC", Implied, tsc, NONE, None),
            instruction!(0x3C, "BIT", AbsX, bit, M, None),
            instruction!(0x3D, "AND", AbsX, and, M, None),
            instruction!(0x3E, "ROL", AbsX, rol, M, None),
            instruction!(0x3F, "AND", LongX, and, M, None),
            instruction!(0x40, "RTI", Implied, rti, E, None),
            instruction!(0x41, "EOR", DirectXIndirect, eor, M, None),
            instruction!(0x42, "WDM", Immediate, wdm, NONE, None),
            instruction!(0x43, "EOR", Stack, eor, M, None),
            instruction!(0x44, "MVP", SrcDest, mvp, X, None),
            instruction!(0x45, "EOR", Direct, eor, M, None),
            instruction!(0x46, "LSR", Direct, lsr, M, None),
            instruction!(0x47, "EOR", DirectIndirectLong, eor, M, None),
            instruction!(0x48, "PHA", Implied, pha, M | E, None),
            instruction!(0x49, "EOR", Immediate, eor, M, Some(Width::Accumulator)),
            instruction!(0x4A, "LSR", Implied, lsr, M, None),
            instruction!(0x4B, "PHK", Implied, phk, E, None),
            instruction!(0x4C, "JMP", Abs, jmp, NONE, None),
            instruction!(0x4D, "EOR", Abs, eor, M, None),
            instruction!(0x4E, "LSR", Abs, lsr, M, None),
            instruction!(0x4F, "EOR", Long, eor, M, None),
            instruction!(0x50, "BVC", Rel8, bvc, E, None),
            instruction!(0x51, "EOR", DirectIndirectY, eor, M, None),
            instruction!(0x52, "EOR", DirectIndirect, eor, M, None),
            instruction!(0x53, "EOR", StackIndirectY, eor, M, None),
            instruction!(0x54, "MVN", SrcDest, mvn, X, None),
            instruction!(0x55, "EOR", DirectX, eor, M, None),
            instruction!(0x56, "LSR", DirectX, lsr, M, None),
            instruction!(0x57, "EOR", DirectIndirectLongY, eor, M, None),
            instruction!(0x58, "CLI", Implied, cli, NONE, None),
            instruction!(0x59, "EOR", AbsY, eor, M, None),
            instruction!(0x5A, "PHY", Implied, phy, X | E, None),
            instruction!(0x5B, "TCD", Implied, tcd, NONE, None),
            instruction!(0x5C, "JML", Long, jml, NONE, None),
            instruction!(0x5D, "EOR", AbsX, eor, M, None),
            instruction!(0x5E, "LSR", AbsX, lsr, M, None),
            instruction!(0x5F, "EOR", LongX, eor, M, None),
            instruction!(0x60, "RTS", Implied, rts, E, None),
            instruction!(0x61, "ADC", DirectXIndirect, adc, M, None),
            instruction!(0x62, "PER", Rel16, per, E, None),
            instruction!(0x63, "ADC", Stack, adc, M, None),
            instruction!(0x64, "STZ", Direct, stz, M, None),
            instruction!(0x65, "ADC", Direct, adc, M, None),
            instruction!(0x66, "ROR", Direct, ror, M, None),
            instruction!(0x67, "ADC", DirectIndirectLong, adc, M, None),
            instruction!(0x68, "PLA", Implied, pla, M | E, None),
            instruction!(0x69, "ADC", Immediate, adc, M, Some(Width::Accumulator)),
            instruction!(0x6A, "ROR", Implied, ror, M, None),
            instruction!(0x6B, "RTL", Implied, rtl, E, None),
            instruction!(0x6C, "JMP", AbsIndirect, jmp_indirect, NONE, None),
            instruction!(0x6D, "ADC", Abs, adc, M, None),
            instruction!(0x6E, "ROR", Abs, ror, M, None),
            instruction!(0x6F, "ADC", Long, adc, M, None),
            instruction!(0x70, "BVS", Rel8, bvs, E, None),
            instruction!(0x71, "ADC", DirectIndirectY, adc, M, None),
            instruction!(0x72, "ADC", DirectIndirect, adc, M, None),
            instruction!(0x73, "ADC", StackIndirectY, adc, M, None),
            instruction!(0x74, "STZ", DirectX, stz, M, None),
            instruction!(0x75, "ADC", DirectX, adc, M, None),
            instruction!(0x76, "ROR", DirectX, ror, M, None),
            instruction!(0x77, "ADC", DirectIndirectLongY, adc, M, None),
            instruction!(0x78, "SEI", Implied, sei, NONE, None),
            instruction!(0x79, "ADC", AbsY, adc, M, None),
            instruction!(0x7A, "PLY", Implied, ply, X | E, None),
            instruction!(0x7B, "TDC", Implied, tdc, NONE, None),
            instruction!(0x7C, "JMP", AbsXIndirect, jmp_indexed_indirect, NONE, None),
            instruction!(0x7D, "ADC", AbsX, adc, M, None),
            instruction!(0x7E, "ROR", AbsX, ror, M, None),
            instruction!(0x7F, "ADC", LongX, adc, M, None),
            instruction!(0x80, "BRA", Rel8, bra, E, None),
            instruction!(0x81, "STA", DirectXIndirect, sta, M, None),
            instruction!(0x82, "BRL", Rel16, brl, NONE, None),
            instruction!(0x83, "STA", Stack, sta, M, None),
            instruction!(0x84, "STY", Direct, sty, X, None),
            instruction!(0x85, "STA", Direct, sta, M, None),
            instruction!(0x86, "STX", Direct, stx, X, None),
            instruction!(0x87, "STA", DirectIndirectLong, sta, M, None),
            instruction!(0x88, "DEY", Implied, dey, X, None),
            instruction!(0x89, "BIT", Immediate, bit, M, Some(Width::Accumulator)),
            instruction!(0x8A, "TXA", Implied, txa, M, None),
            instruction!(0x8B, "PHB", Implied, phb, E, None),
            instruction!(0x8C, "STY", Abs, sty, X, None),
            instruction!(0x8D, "STA", Abs, sta, M, None),
            instruction!(0x8E, "STX", Abs, stx, X, None),
            instruction!(0x8F, "STA", Long, sta, M, None),
            instruction!(0x90, "BCC", Rel8, bcc, E, None),
            instruction!(0x91, "STA", DirectIndirectY, sta, M, None),
            instruction!(0x92, "STA", DirectIndirect, sta, M, None),
            instruction!(0x93, "STA", StackIndirectY, sta, M, None),
            instruction!(0x94, "STY", DirectX, sty, X, None),
            instruction!(0x95, "STA", DirectX, sta, M, None),
            instruction!(0x96, "STX", DirectY, stx, X, None),
            instruction!(0x97, "STA", DirectIndirectLongY, sta, M, None),
            instruction!(0x98, "TYA", Implied, tya, M, None),
            instruction!(0x99, "STA", AbsY, sta, M, None),
            instruction!(0x9A, "TXS", Implied, txs, E, None),
            instruction!(0x9B, "TXY", Implied, txy, X, None),
            instruction!(0x9C, "STZ", Abs, stz, M, None),
            instruction!(0x9D, "STA", AbsX, sta, M, None),
            instruction!(0x9E, "STZ", AbsX, stz, M, None),
            instruction!(0x9F, "STA", LongX, sta, M, None),
            instruction!(0xA0, "LDY", Immediate, ldy, X, Some(Width::Index)),
            instruction!(0xA1, "LDA", DirectXIndirect, lda, M, None),
            instruction!(0xA2, "LDX", Immediate, ldx, X, Some(Width::Index)),
            instruction!(0xA3, "LDA", Stack, lda, M, None),
            instruction!(0xA4, "LDY", Direct, ldy, X, None),
            instruction!(0xA5, "LDA", Direct, lda, M, None),
            instruction!(0xA6, "LDX", Direct, ldx, X, None),
            instruction!(0xA7, "LDA", DirectIndirectLong, lda, M, None),
            instruction!(0xA8, "TAY", Implied, tay, X, None),
            instruction!(0xA9, "LDA", Immediate, lda, M, Some(Width::Accumulator)),
            instruction!(0xAA, "TAX", Implied, tax, X, None),
            instruction!(0xAB, "PLB", Implied, plb, E, None),
            instruction!(0xAC, "LDY", Abs, ldy, X, None),
            instruction!(0xAD, "LDA", Abs, lda, M, None),
            instruction!(0xAE, "LDX", Abs, ldx, X, None),
            instruction!(0xAF, "LDA", Long, lda, M, None),
            instruction!(0xB0, "BCS", Rel8, bcs, E, None),
            instruction!(0xB1, "LDA", DirectIndirectY, lda, M, None),
            instruction!(0xB2, "LDA", DirectIndirect, lda, M, None),
            instruction!(0xB3, "LDA", StackIndirectY, lda, M, None),
            instruction!(0xB4, "LDY", DirectX, ldy, X, None),
            instruction!(0xB5, "LDA", DirectX, lda, M, None),
            instruction!(0xB6, "LDX", DirectY, ldx, X, None),
            instruction!(0xB7, "LDA", DirectIndirectLongY, lda, M, None),
            instruction!(0xB8, "CLV", Implied, clv, NONE, None),
            instruction!(0xB9, "LDA", AbsY, lda, M, None),
            instruction!(0xBA, "TSX", Implied, tsx, X, None),
            instruction!(0xBB, "TYX", Implied, tyx, X, None),
            instruction!(0xBC, "LDY", AbsX, ldy, X, None),
            instruction!(0xBD, "LDA", AbsX, lda, M, None),
            instruction!(0xBE, "LDX", AbsY, ldx, X, None),
            instruction!(0xBF, "LDA", LongX, lda, M, None),
            instruction!(0xC0, "CPY", Immediate, cpy, X, Some(Width::Index)),
            instruction!(0xC1, "CMP", DirectXIndirect, cmp, M, None),
            instruction!(0xC2, "REP", Immediate, rep, E, None),
            instruction!(0xC3, "CMP", Stack, cmp, M, None),
            instruction!(0xC4, "CPY", Direct, cpy, X, None),
            instruction!(0xC5, "CMP", Direct, cmp, M, None),
            instruction!(0xC6, "DEC", Direct, dec, M, None),
            instruction!(0xC7, "CMP", DirectIndirectLong, cmp, M, None),
            instruction!(0xC8, "INY", Implied, iny, X, None),
            instruction!(0xC9, "CMP", Immediate, cmp, M, Some(Width::Accumulator)),
            instruction!(0xCA, "DEX", Implied, dex, X, None),
            instruction!(0xCB, "WAI", Implied, wai, NONE, None),
            instruction!(0xCC, "CPY", Abs, cpy, X, None),
            instruction!(0xCD, "CMP", Abs, cmp, M, None),
            instruction!(0xCE, "DEC", Abs, dec, M, None),
            instruction!(0xCF, "CMP", Long, cmp, M, None),
            instruction!(0xD0, "BNE", Rel8, bne, E, None),
            instruction!(0xD1, "CMP", DirectIndirectY, cmp, M, None),
            instruction!(0xD2, "CMP", DirectIndirect, cmp, M, None),
            instruction!(0xD3, "CMP", StackIndirectY, cmp, M, None),
            instruction!(0xD4, "PEI", DirectIndirect, pei, E, None),
            instruction!(0xD5, "CMP", DirectX, cmp, M, None),
            instruction!(0xD6, "DEC", DirectX, dec, M, None),
            instruction!(0xD7, "CMP", DirectIndirectLongY, cmp, M, None),
            instruction!(0xD8, "CLD", Implied, cld, NONE, None),
            instruction!(0xD9, "CMP", AbsY, cmp, M, None),
            instruction!(0xDA, "PHX", Implied, phx, X | E, None),
            instruction!(0xDB, "STP", Implied, stp, NONE, None),
            instruction!(0xDC, "JML", AbsIndirectLong, jml_indirect, NONE, None),
            instruction!(0xDD, "CMP", AbsX, cmp, M, None),
            instruction!(0xDE, "DEC", AbsX, dec, M, None),
            instruction!(0xDF, "CMP", LongX, cmp, M, None),
            instruction!(0xE0, "CPX", Immediate, cpx, X, Some(Width::Index)),
            instruction!(0xE1, "SBC", DirectXIndirect, sbc, M, None),
            instruction!(0xE2, "SEP", Immediate, sep, E, None),
            instruction!(0xE3, "SBC", Stack, sbc, M, None),
            instruction!(0xE4, "CPX", Direct, cpx, X, None),
            instruction!(0xE5, "SBC", Direct, sbc, M, None),
            instruction!(0xE6, "INC", Direct, inc, M, None),
            instruction!(0xE7, "SBC", DirectIndirectLong, sbc, M, None),
            instruction!(0xE8, "INX", Implied, inx, X, None),
            instruction!(0xE9, "SBC", Immediate, sbc, M, Some(Width::Accumulator)),
            instruction!(0xEA, "NOP", Implied, nop, NONE, None),
            instruction!(0xEB, "XBA", Implied, xba, NONE, None),
            instruction!(0xEC, "CPX", Abs, cpx, X, None),
            instruction!(0xED, "SBC", Abs, sbc, M, None),
            instruction!(0xEE, "INC", Abs, inc, M, None),
            instruction!(0xEF, "SBC", Long, sbc, M, None),
            instruction!(0xF0, "BEQ", Rel8, beq, E, None),
            instruction!(0xF1, "SBC", DirectIndirectY, sbc, M, None),
            instruction!(0xF2, "SBC", DirectIndirect, sbc, M, None),
            instruction!(0xF3, "SBC", StackIndirectY, sbc, M, None),
            instruction!(0xF4, "PEA", Abs, pea, E, None),
            instruction!(0xF5, "SBC", DirectX, sbc, M, None),
            instruction!(0xF6, "INC", DirectX, inc, M, None),
            instruction!(0xF7, "SBC", DirectIndirectLongY, sbc, M, None),
            instruction!(0xF8, "SED", Implied, sed, NONE, None),
            instruction!(0xF9, "SBC", AbsY, sbc, M, None),
            instruction!(0xFA, "PLX", Implied, plx, X | E, None),
            instruction!(0xFB, "XCE", Implied, xce, E, None),
            instruction!(0xFC, "JSR", AbsXIndirect, jsr_indexed_indirect, E, None),
            instruction!(0xFD, "SBC", AbsX, sbc, M, None),
            instruction!(0xFE, "INC", AbsX, inc, M, None),
            instruction!(0xFF, "SBC", LongX, sbc, M, None),
        ];

        debug_assert!(instructions
            .iter()
            .enumerate()
            .all(|(i, instruction)| instruction.opcode as usize == i));

        Self { instructions }
    }

    #[inline]
    pub fn get(&self, opcode: u8) -> &Instruction {
        &self.instructions[opcode as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    pub fn disassemble(&self, mode: Mode, address: u32, bus: &dyn Bus) -> Disassembly {
        self.get(bus.peek(address)).disassemble(mode, address, bus)
    }
}
