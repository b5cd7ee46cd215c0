pub const WRAM_SIZE: usize = 128 << 10;

/// Work RAM, visible at banks $7E-$7F and mirrored in the low 8K of the
/// system area.
pub struct Wram {
    ram: Box<[u8]>,
}

impl Default for Wram {
    fn default() -> Self {
        Self::new()
    }
}

impl Wram {
    pub fn new() -> Self {
        Wram {
            ram: vec![0; WRAM_SIZE].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn read(&self, address: u32) -> u8 {
        self.ram[(address & 0x1ffff) as usize]
    }

    #[inline]
    pub fn write(&mut self, address: u32, value: u8) {
        self.ram[(address & 0x1ffff) as usize] = value;
    }

    pub fn peek(&self, address: u32) -> u8 {
        self.read(address)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.ram
    }
}
