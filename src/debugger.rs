use crate::cpu::Mode;
use crate::cpu_bus::Bus;
use crate::emulator::Emulator;

/// Read-only inspection of a running emulator. Everything goes through
/// `peek`, so inspecting memory never disturbs the bus.
pub struct Debugger<'a> {
    emulator: &'a Emulator,
}

impl<'a> Debugger<'a> {
    pub fn new(emulator: &'a Emulator) -> Self {
        Debugger { emulator }
    }

    pub fn dump(&self, start: u32, count: u32) -> String {
        let bus = self.emulator.bus();

        (0..count)
            .map(|i| {
                let address = start.wrapping_add(i) & 0xff_ffff;
                format!("${:06X}: ${:02X}", address, bus.peek(address))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Linear listing of `count` instructions. The mode is threaded through
    /// the listing so REP/SEP/XCE change how later immediates are decoded.
    pub fn disassemble(&self, start: u32, count: u32, mode: Mode) -> String {
        let cpu = self.emulator.cpu();
        let bus = self.emulator.bus();

        let mut address = start & 0xff_ffff;
        let mut mode = mode;
        let mut lines = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let disassembly = cpu.disassemble(mode, address, bus);

            let bytes = (0..=disassembly.additional_bytes as u32)
                .map(|i| {
                    let at = (address & 0xff_0000) | (address.wrapping_add(i) & 0xffff);
                    format!("{:02X}", bus.peek(at))
                })
                .collect::<Vec<_>>()
                .join(" ");
            lines.push(format!(
                "${:06X}: {:<12} {:<16} ; {}",
                address, bytes, disassembly.text, mode
            ));

            mode = disassembly.mode;
            address = (address & 0xff_0000)
                | (address.wrapping_add(1 + disassembly.additional_bytes as u32) & 0xffff);
        }

        lines.join("\n")
    }

    /// Disassembly starting at the current program counter in the current mode.
    pub fn disassemble_at_pc(&self, count: u32) -> String {
        let state = &self.emulator.cpu().state;
        self.disassemble(state.pc24(), count, state.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::test_rom;

    #[test]
    fn test_dump() {
        let emulator = Emulator::new(test_rom::build(&[0xa9, 0x12])).unwrap();
        let debugger = Debugger::new(&emulator);

        assert_eq!(debugger.dump(0x8000, 2), "$008000: $A9\n$008001: $12");
        assert_eq!(debugger.dump(0xff_ffff, 1).lines().count(), 1);
    }

    #[test]
    fn test_disassemble_threads_mode() {
        // REP #$20; LDA #$1234; SEP #$20; LDA #$56
        let program = [0xc2, 0x20, 0xa9, 0x34, 0x12, 0xe2, 0x20, 0xa9, 0x56];
        let emulator = Emulator::new(test_rom::build(&program)).unwrap();
        let debugger = Debugger::new(&emulator);

        let listing = debugger.disassemble(0x8000, 4, Mode::M8X8);
        let lines: Vec<&str> = listing.lines().collect();

        assert!(lines[0].contains("REP #$20"));
        assert!(lines[1].contains("LDA #$1234"));
        assert!(lines[1].starts_with("$008002: A9 34 12"));
        assert!(lines[2].contains("SEP #$20"));
        assert!(lines[3].contains("LDA #$56"));
    }
}
