//! Mapper trait: PRG/CHR memory access and mirroring.

use crate::cartridge::mapper::Mirroring;

/// Trait for NES cartridge mappers. CPU/PPU use these for all cartridge address space.
pub trait Mapper {
    /// CPU read in $4020–$FFFF (PRG RAM at $6000–$7FFF, PRG ROM at $8000–$FFFF).
    fn read_prg(&self, addr: u16) -> u8;
    /// CPU write: PRG RAM or mapper registers (PRG ROM is read-only).
    fn write_prg(&mut self, addr: u16, data: u8);
    /// PPU read in the pattern tables ($0000–$1FFF).
    fn read_chr(&self, addr: u16) -> u8;
    /// PPU write; only lands when CHR is RAM.
    fn write_chr(&mut self, addr: u16, data: u8);
    /// Current nametable mirroring for the PPU.
    fn mirroring(&self) -> Mirroring;

    /// Called once per PPU cycle with the position the PPU just rendered.
    fn clock(&mut self, _scanline: u16, _cycle: u16) {}

    /// Poll and clear a pending cartridge IRQ.
    fn poll_irq(&mut self) -> bool {
        false
    }
}
