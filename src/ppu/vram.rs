//! PPU address space decoding.
//!
//! $0000–$1FFF pattern tables (cartridge CHR), $2000–$2FFF nametables
//! (mirrored into $3000–$3EFF, laid out per the cartridge's mirroring) and
//! $3F00–$3FFF palette RAM. See [PPU memory map](https://www.nesdev.org/wiki/PPU_memory_map).

use crate::cartridge::{cartridge::Cartridge, mapper::Mirroring};

/// Console-side PPU memory: nametable RAM and palette RAM.
///
/// Nametable storage is sized for four screens; with the usual two-screen
/// boards only the first 2 KiB is touched.
pub struct Vram {
    pub nametables: [u8; 0x1000],
    /// Palette RAM $3F00-$3F1F (32 bytes, with NES mirroring).
    pub palette: [u8; 32],
}

impl Default for Vram {
    fn default() -> Self {
        Self::new()
    }
}

impl Vram {
    pub fn new() -> Self {
        Self {
            nametables: [0; 0x1000],
            palette: [0; 32],
        }
    }

    pub fn read(&self, cart: &Cartridge, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.read_chr(addr),
            0x2000..=0x3EFF => self.nametables[nametable_index(addr, cart.mirroring())],
            _ => self.palette[palette_index(addr)],
        }
    }

    pub fn write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.write_chr(addr, data),
            0x2000..=0x3EFF => self.nametables[nametable_index(addr, cart.mirroring())] = data,
            // upper 2 bits of data ignored on real NES
            _ => self.palette[palette_index(addr)] = data & 0x3F,
        }
    }
}

/// Map PPU nametable address ($2000–$3EFF) to an index into nametable RAM.
pub fn nametable_index(addr: u16, mirroring: Mirroring) -> usize {
    let offset = (addr.wrapping_sub(0x2000)) & 0x0FFF;
    let slot = mirroring.nametable_slot(offset / 0x400);
    (slot * 0x400 + (offset & 0x3FF)) as usize
}

/// Resolve palette address $3F00–$3FFF to a 32-byte index.
/// Addresses $3F10, $3F14, $3F18, $3F1C alias $3F00, $3F04, $3F08, $3F0C.
pub fn palette_index(addr: u16) -> usize {
    let i = (addr & 0x1F) as usize;
    if i >= 0x10 && i % 4 == 0 { i - 0x10 } else { i }
}
