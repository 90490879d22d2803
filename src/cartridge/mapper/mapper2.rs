//! Mapper 2 (UxROM): switchable 16KB bank at $8000, last bank fixed at $C000.
//!
//! [UxROM](https://www.nesdev.org/wiki/UxROM): any write to $8000–$FFFF selects the low bank.
//! CHR is normally 8KB of RAM.

use crate::cartridge::mapper::{Chr, Mirroring, PRG_BANK_SIZE, PRG_RAM_SIZE, mapper::Mapper};

pub struct Mapper2 {
    prg_rom: Vec<u8>,
    prg_ram: [u8; PRG_RAM_SIZE],
    chr: Chr,
    mirroring: Mirroring,
    bank: u8,
}

impl Mapper2 {
    pub fn new(prg_rom: Vec<u8>, chr: Chr, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            prg_ram: [0; PRG_RAM_SIZE],
            chr,
            mirroring,
            bank: 0,
        }
    }
}

impl Mapper for Mapper2 {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xBFFF => {
                let offset = ((self.bank as usize) << 14) + (addr - 0x8000) as usize;
                self.prg_rom[offset % self.prg_rom.len()]
            }
            0xC000..=0xFFFF => {
                let fixed = self.prg_rom.len().saturating_sub(PRG_BANK_SIZE);
                self.prg_rom[fixed + (addr - 0xC000) as usize]
            }
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, data: u8) {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize] = data,
            0x8000..=0xFFFF => {
                self.bank = data;
                log::trace!("UxROM bank <- {data}");
            }
            _ => {}
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        self.chr.read((addr & 0x1FFF) as usize)
    }

    fn write_chr(&mut self, addr: u16, data: u8) {
        self.chr.write((addr & 0x1FFF) as usize, data);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
