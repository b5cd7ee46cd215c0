use crate::cartridge::Cartridge;
use crate::clock::{Clock, ClockSnes};
use crate::cpu_bus::Bus;
use crate::signals::Signals;
use crate::wram::Wram;

/// Memory select register; bit 0 enables FastROM timing for banks $80-$FF.
const MEMSEL: u32 = 0x420d;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    /// Low 8K mirror of WRAM.
    LowRam,
    /// PPU, APU and WRAM ports at $2000-$3FFF.
    BusB,
    /// Old-style joypad ports at $4000-$41FF.
    Joypad,
    /// CPU, DMA and expansion registers at $4200-$5FFF.
    Io,
    /// Expansion area at $6000-$7FFF.
    Expansion,
}

impl Region {
    fn decode(offset: u32) -> Region {
        match offset {
            0x0000..=0x1fff => Region::LowRam,
            0x2000..=0x3fff => Region::BusB,
            0x4000..=0x41ff => Region::Joypad,
            0x4200..=0x5fff => Region::Io,
            _ => Region::Expansion,
        }
    }

    fn tick(self, clock: &mut dyn Clock) {
        match self {
            Region::Joypad => clock.tick_div12(),
            Region::LowRam | Region::Expansion => clock.tick_div8(),
            Region::BusB | Region::Io => clock.tick_div6(),
        }
    }
}

/// Console address decoder.
///
/// Every access charges the master clock for its region's speed class and
/// updates the open-bus value that unmapped I/O reads return.
pub struct BusSnes {
    wram: Wram,
    cartridge: Cartridge,
    clock: ClockSnes,
    last_value: u8,
    fast_rom: bool,
}

impl BusSnes {
    pub fn new(wram: Wram, cartridge: Cartridge, clock: ClockSnes) -> Self {
        BusSnes {
            wram,
            cartridge,
            clock,
            last_value: 0,
            fast_rom: false,
        }
    }

    pub fn reset(&mut self) {
        self.last_value = 0;
        self.fast_rom = false;
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    pub fn wram(&self) -> &Wram {
        &self.wram
    }

    pub fn open_bus(&self) -> u8 {
        self.last_value
    }

    pub fn fast_rom(&self) -> bool {
        self.fast_rom
    }

    #[inline]
    fn is_system_area(address: u32) -> bool {
        address & 0x04_8000 == 0
    }

    #[inline]
    fn is_wram(address: u32) -> bool {
        address & 0x7e_0000 == 0x7e_0000
    }

    fn tick_cartridge(&mut self, address: u32) {
        if address & 0x80_0000 != 0 && self.fast_rom {
            self.clock.tick_div6();
        } else {
            self.clock.tick_div8();
        }
    }

    fn read_transaction(&mut self, address: u32, signals: &mut Signals) -> u8 {
        if Self::is_system_area(address) {
            let offset = address & 0x7fff;
            let region = Region::decode(offset);
            region.tick(&mut self.clock);

            return match region {
                Region::LowRam => self.wram.read(offset),
                _ => self.last_value,
            };
        }

        if Self::is_wram(address) {
            self.clock.tick_div8();
            return self.wram.read(address);
        }

        self.tick_cartridge(address);
        self.cartridge.read(address, signals)
    }
}

impl Bus for BusSnes {
    fn read(&mut self, address: u32, signals: &mut Signals) -> u8 {
        self.last_value = self.read_transaction(address & 0xff_ffff, signals);
        self.last_value
    }

    fn write(&mut self, address: u32, value: u8, signals: &mut Signals) {
        let address = address & 0xff_ffff;
        self.last_value = value;

        if Self::is_system_area(address) {
            let offset = address & 0x7fff;
            let region = Region::decode(offset);
            region.tick(&mut self.clock);

            match region {
                Region::LowRam => self.wram.write(offset, value),
                Region::Io if offset == MEMSEL => {
                    self.fast_rom = value & 0x01 != 0;
                    log::debug!("MEMSEL: fast ROM {}", if self.fast_rom { "on" } else { "off" });
                }
                _ => {}
            }
            return;
        }

        if Self::is_wram(address) {
            self.clock.tick_div8();
            self.wram.write(address, value);
            return;
        }

        self.tick_cartridge(address);
        self.cartridge.write(address, value, signals);
    }

    fn peek(&self, address: u32) -> u8 {
        let address = address & 0xff_ffff;

        if Self::is_system_area(address) {
            let offset = address & 0x7fff;
            return match Region::decode(offset) {
                Region::LowRam => self.wram.peek(offset),
                _ => 0,
            };
        }

        if Self::is_wram(address) {
            return self.wram.peek(address);
        }

        self.cartridge.peek(address)
    }
}
