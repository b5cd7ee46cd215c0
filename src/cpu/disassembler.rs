use super::addressing::AddressingMode;
use super::catalog::Instruction;
use super::state::{Mode, StatusFlags};
use crate::cpu_bus::Bus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    pub text: String,
    /// Operand bytes following the opcode.
    pub additional_bytes: u8,
    /// Mode to use for the next instruction in a linear listing.
    pub mode: Mode,
}

#[inline]
fn operand_address(address: u32, offset: u32) -> u32 {
    (address & 0xff_0000) | (address.wrapping_add(offset) & 0xffff)
}

fn width_bits(mode: Mode) -> u8 {
    (mode as u8) << 4
}

/// Mode after REP/SEP/XCE, as far as it can be known statically.
fn next_mode(instruction: &Instruction, mode: Mode, address: u32, bus: &dyn Bus) -> Mode {
    match instruction.mnemonic {
        "REP" | "SEP" if mode != Mode::Emulation => {
            let bits = bus.peek(operand_address(address, 1));
            let p = if instruction.mnemonic == "REP" {
                width_bits(mode) & !bits
            } else {
                width_bits(mode) | bits
            };
            Mode::from_flags(StatusFlags::from_bits_retain(p))
        }
        // The carry is unknown here; the usual CLC/SEC prefix decides.
        "XCE" => match bus.peek(operand_address(address, 0xffff)) {
            0x18 if mode == Mode::Emulation => Mode::M8X8,
            0x38 => Mode::Emulation,
            _ => mode,
        },
        _ => mode,
    }
}

pub fn disassemble(
    instruction: &Instruction,
    mode: Mode,
    address: u32,
    bus: &dyn Bus,
) -> Disassembly {
    use AddressingMode::*;

    let byte = |offset: u32| bus.peek(operand_address(address, offset));
    let word = |offset: u32| bus.peek_u16(operand_address(address, offset));
    let long = |offset: u32| (byte(offset + 2) as u32) << 16 | word(offset) as u32;

    let additional_bytes = instruction.operand_bytes(mode);
    let after = (address & 0xffff).wrapping_add(1 + additional_bytes as u32) as u16;

    let operand = match instruction.addressing_mode {
        Implied => String::new(),
        Immediate if additional_bytes == 2 => format!("#${:04X}", word(1)),
        Immediate => format!("#${:02X}", byte(1)),
        Abs => format!("${:04X}", word(1)),
        AbsX => format!("${:04X},X", word(1)),
        AbsY => format!("${:04X},Y", word(1)),
        AbsIndirect => format!("(${:04X})", word(1)),
        AbsIndirectLong => format!("[${:04X}]", word(1)),
        AbsXIndirect => format!("(${:04X},X)", word(1)),
        Direct => format!("${:02X}", byte(1)),
        DirectX => format!("${:02X},X", byte(1)),
        DirectY => format!("${:02X},Y", byte(1)),
        DirectIndirect => format!("(${:02X})", byte(1)),
        DirectIndirectLong => format!("[${:02X}]", byte(1)),
        DirectXIndirect => format!("(${:02X},X)", byte(1)),
        DirectIndirectY => format!("(${:02X}),Y", byte(1)),
        DirectIndirectLongY => format!("[${:02X}],Y", byte(1)),
        Long => format!("${:06X}", long(1)),
        LongX => format!("${:06X},X", long(1)),
        Rel8 => format!("${:04X}", after.wrapping_add(byte(1) as i8 as i16 as u16)),
        Rel16 => format!("${:04X}", after.wrapping_add(word(1))),
        // Encoded destination first, written source first.
        SrcDest => format!("${:02X},${:02X}", byte(2), byte(1)),
        Stack => format!("${:02X},S", byte(1)),
        StackIndirectY => format!("(${:02X},S),Y", byte(1)),
    };

    let text = if operand.is_empty() {
        instruction.mnemonic.to_string()
    } else {
        format!("{} {}", instruction.mnemonic, operand)
    };

    Disassembly {
        text,
        additional_bytes,
        mode: next_mode(instruction, mode, address, bus),
    }
}
