pub mod header;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::signals::{BreakReason, Signals};

pub use self::header::{HeaderError, MapMode, RomHeader};
use self::header::HEADER_SIZE;

const HEADER_OFFSET: usize = 0x7fc0;
const COPIER_HEADER: usize = 512;

#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("empty image")]
    Empty,

    #[error("bad ROM header: {0}")]
    BadHeader(#[from] HeaderError),

    #[error("ROM length mismatch: header declares {declared} bytes, image has {actual}")]
    LengthMismatch { declared: u64, actual: usize },

    #[error("unsupported address space layout")]
    UnsupportedLayout,

    #[error("checksum mismatch: header ${expected:04X}, image ${actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("failed to read ROM file: {0}")]
    Io(#[from] std::io::Error),
}

/// 16-bit wrapping byte sum over the whole image.
pub fn checksum(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(byte as u16))
}

/// LoROM cartridge: 32K ROM pages in the upper half of each bank, optional
/// battery RAM in the lower half of banks $70-$7D.
pub struct Cartridge {
    rom: Vec<u8>,
    sram: Vec<u8>,
    header: RomHeader,
    has_copier_header: bool,
}

impl Cartridge {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        Self::load_from_bytes(data)
    }

    pub fn load_from_bytes(mut data: Vec<u8>) -> Result<Self, CartridgeError> {
        let has_copier_header = data.len() % 0x8000 != 0
            && data.len() >= COPIER_HEADER
            && (data.len() - COPIER_HEADER) % 0x8000 == 0;
        if has_copier_header {
            data.drain(0..COPIER_HEADER);
        }

        if data.is_empty() {
            return Err(CartridgeError::Empty);
        }

        let raw = data
            .get(HEADER_OFFSET..HEADER_OFFSET + HEADER_SIZE)
            .ok_or(HeaderError::InvalidSize(data.len().saturating_sub(HEADER_OFFSET)))?;
        let header = RomHeader::decode(raw)?;

        if header.rom_size() > data.len() as u64 {
            return Err(CartridgeError::LengthMismatch {
                declared: header.rom_size(),
                actual: data.len(),
            });
        }

        if data.len() > 3 << 20 && header.ram_size() > 0 {
            return Err(CartridgeError::UnsupportedLayout);
        }

        let actual = checksum(&data);
        if actual != header.checksum {
            return Err(CartridgeError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        log::info!("loaded cartridge: {}", header);

        // LoROM decodes at most 32K of RAM per bank window.
        let sram = vec![0; header.ram_size().min(0x8000) as usize];

        Ok(Cartridge {
            rom: data,
            sram,
            header,
            has_copier_header,
        })
    }

    pub fn header(&self) -> &RomHeader {
        &self.header
    }

    pub fn has_copier_header(&self) -> bool {
        self.has_copier_header
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    pub fn description(&self) -> String {
        self.header.description()
    }

    fn sram_index(&self, address: u32) -> Option<usize> {
        let bank = (address >> 16) & 0x7f;
        if self.sram.is_empty() || !(0x70..=0x7d).contains(&bank) || address & 0x8000 != 0 {
            return None;
        }

        Some((address & 0x7fff) as usize % self.sram.len())
    }

    #[inline]
    fn rom_index(&self, address: u32) -> usize {
        let offset = (((address >> 16) & 0x7f) << 15) | (address & 0x7fff);
        offset as usize % self.rom.len()
    }

    pub fn read(&mut self, address: u32, _signals: &mut Signals) -> u8 {
        self.peek(address)
    }

    pub fn write(&mut self, address: u32, value: u8, signals: &mut Signals) {
        match self.sram_index(address) {
            Some(index) => self.sram[index] = value,
            None => signals.raise(
                BreakReason::BadWrite,
                format!("write to cartridge ROM at ${:06X}", address & 0xff_ffff),
            ),
        }
    }

    pub fn peek(&self, address: u32) -> u8 {
        match self.sram_index(address) {
            Some(index) => self.sram[index],
            None => self.rom[self.rom_index(address)],
        }
    }
}
