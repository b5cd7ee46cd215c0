use std::fmt;

use thiserror::Error;

pub const HEADER_SIZE: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("invalid header size {0}")]
    InvalidSize(usize),

    #[error("title contains unprintable characters")]
    UnprintableTitle,

    #[error("invalid mode bits ${0:02X}")]
    InvalidModeBits(u8),

    #[error("invalid map mode ${0:02X}")]
    InvalidMapMode(u8),

    #[error("invalid or unsupported hardware type ${0:02X}")]
    UnsupportedChipset(u8),

    #[error("bad ROM size")]
    BadRomSize,

    #[error("bad RAM size")]
    BadRamSize,

    #[error("checksum ${checksum:04X} does not match complement ${complement:04X}")]
    ChecksumComplement { checksum: u16, complement: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    LoRom,
    HiRom,
    ExHiRom,
}

impl MapMode {
    fn decode(mode: u8) -> Result<Self, HeaderError> {
        match mode {
            0 => Ok(MapMode::LoRom),
            1 => Ok(MapMode::HiRom),
            5 => Ok(MapMode::ExHiRom),
            _ => Err(HeaderError::InvalidMapMode(mode)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MapMode::LoRom => "LoROM",
            MapMode::HiRom => "HiROM",
            MapMode::ExHiRom => "ExHiROM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chipset {
    Rom,
    RomRam,
    RomRamBattery,
}

impl Chipset {
    fn decode(kind: u8) -> Result<Self, HeaderError> {
        match kind {
            0x00 => Ok(Chipset::Rom),
            0x01 => Ok(Chipset::RomRam),
            0x02 => Ok(Chipset::RomRamBattery),
            _ => Err(HeaderError::UnsupportedChipset(kind)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Chipset::Rom => "ROM",
            Chipset::RomRam => "ROM + RAM",
            Chipset::RomRamBattery => "ROM + RAM + battery",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TvType {
    Pal,
    Ntsc,
    Unknown,
}

impl TvType {
    pub fn from_country(country: u8) -> Self {
        match country {
            0x02..=0x0c | 0x10 | 0x11 => TvType::Pal,
            0x00 | 0x01 | 0x0d | 0x0f => TvType::Ntsc,
            _ => TvType::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TvType::Pal => "PAL",
            TvType::Ntsc => "NTSC",
            TvType::Unknown => "[unknown]",
        }
    }
}

pub fn country_name(country: u8) -> &'static str {
    match country {
        0x00 => "Japan",
        0x01 => "USA / Canada",
        0x02 => "Europe / Oceania / Asia",
        0x03 => "Sweden / Scandinavia",
        0x04 => "Finland",
        0x05 => "Denmark",
        0x06 => "France",
        0x07 => "Holland",
        0x08 => "Spain",
        0x09 => "Germany / Austria / Switzerland",
        0x0a => "Italy",
        0x0b => "China / Hong Kong",
        0x0c => "Indonesia",
        0x0d => "South Korea",
        0x0f => "Canada",
        0x10 => "Brazil",
        0x11 => "Australia",
        _ => "[unknown]",
    }
}

/// Decoded internal header ($FFC0-$FFDF in the CPU's view of a LoROM).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomHeader {
    pub title: String,
    pub map_mode: MapMode,
    pub speed: Speed,
    pub chipset: Chipset,
    pub rom_size_log2: u32,
    pub ram_size_log2: u32,
    pub country: u8,
    pub developer: u8,
    pub version: u8,
    pub checksum: u16,
}

impl RomHeader {
    pub fn decode(data: &[u8]) -> Result<Self, HeaderError> {
        if data.len() != HEADER_SIZE {
            return Err(HeaderError::InvalidSize(data.len()));
        }

        let title_bytes = &data[0..21];
        if title_bytes.iter().any(|&c| !(0x20..=0x7e).contains(&c)) {
            return Err(HeaderError::UnprintableTitle);
        }
        let title = title_bytes
            .iter()
            .map(|&c| c as char)
            .collect::<String>()
            .trim()
            .to_string();

        let mode = data[0x15];
        if mode >> 5 != 0x01 {
            return Err(HeaderError::InvalidModeBits(mode));
        }
        let map_mode = MapMode::decode(mode & 0x0f)?;
        let speed = if mode & 0x10 != 0 { Speed::High } else { Speed::Low };
        let chipset = Chipset::decode(data[0x16])?;

        let rom_size_log2 = data[0x17] as u32 + 10;
        if rom_size_log2 > 32 {
            return Err(HeaderError::BadRomSize);
        }

        let ram_size_log2 = data[0x18] as u32 + 10;
        if ram_size_log2 > 32 {
            return Err(HeaderError::BadRamSize);
        }

        let complement = u16::from_le_bytes([data[0x1c], data[0x1d]]);
        let checksum = u16::from_le_bytes([data[0x1e], data[0x1f]]);
        if checksum != complement ^ 0xffff {
            return Err(HeaderError::ChecksumComplement { checksum, complement });
        }

        Ok(RomHeader {
            title,
            map_mode,
            speed,
            chipset,
            rom_size_log2,
            ram_size_log2,
            country: data[0x19],
            developer: data[0x1a],
            version: data[0x1b],
            checksum,
        })
    }

    pub fn rom_size(&self) -> u64 {
        1u64 << self.rom_size_log2
    }

    /// Cartridge RAM in bytes. A zero size byte still decodes to 1 KiB; only
    /// the chipset tells whether RAM is present.
    pub fn ram_size(&self) -> u64 {
        match self.chipset {
            Chipset::Rom => 0,
            _ => 1u64 << self.ram_size_log2,
        }
    }

    pub fn tv_type(&self) -> TvType {
        TvType::from_country(self.country)
    }

    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RomHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, {}, {}kB ROM, {}kB RAM, {} speed, {}: {}, dev ID {}, version {}",
            self.title,
            self.map_mode.name(),
            self.chipset.name(),
            self.rom_size() >> 10,
            self.ram_size() >> 10,
            match self.speed {
                Speed::High => "high",
                Speed::Low => "low",
            },
            country_name(self.country),
            self.tv_type().name(),
            self.developer,
            self.version
        )
    }
}
