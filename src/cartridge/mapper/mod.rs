//! NES mappers for PRG/CHR memory mapping.
//!
//! Mapper0 (NROM), Mapper1 (MMC1), Mapper2 (UxROM), Mapper3 (CNROM), and the
//! storage/mirroring types they share.

pub mod mapper;

pub mod mapper0;
pub mod mapper1;
pub mod mapper2;
pub mod mapper3;

pub const PRG_BANK_SIZE: usize = 0x4000;
pub const CHR_BANK_SIZE: usize = 0x2000;
pub const PRG_RAM_SIZE: usize = 0x2000;

/// Nametable mirroring mode for PPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
    SingleScreenLower,
    SingleScreenUpper,
}

impl Mirroring {
    /// Physical 1 KiB nametable slot (0..4) backing logical table `table` (0..4).
    pub fn nametable_slot(self, table: u16) -> u16 {
        let table = table & 0b11;
        match self {
            Mirroring::Horizontal => table >> 1,
            Mirroring::Vertical => table & 1,
            Mirroring::FourScreen => table,
            Mirroring::SingleScreenLower => 0,
            Mirroring::SingleScreenUpper => 1,
        }
    }
}

/// Pattern table backing store: ROM from the cartridge, or 8 KiB of RAM when
/// the header declares no CHR banks.
pub struct Chr {
    data: Vec<u8>,
    writable: bool,
}

impl Chr {
    pub fn new(chr_rom: Vec<u8>) -> Self {
        if chr_rom.is_empty() {
            Self { data: vec![0; CHR_BANK_SIZE], writable: true }
        } else {
            Self { data: chr_rom, writable: false }
        }
    }

    /// Reads a byte at an absolute offset, wrapping past the end.
    pub fn read(&self, offset: usize) -> u8 {
        self.data[offset % self.data.len()]
    }

    pub fn write(&mut self, offset: usize, data: u8) {
        if self.writable {
            let len = self.data.len();
            self.data[offset % len] = data;
        }
    }
}
