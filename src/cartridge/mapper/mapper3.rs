//! Mapper 3 (CNROM): fixed PRG like NROM, switchable 8KB CHR bank.

use crate::cartridge::mapper::{CHR_BANK_SIZE, Chr, Mirroring, PRG_RAM_SIZE, mapper::Mapper};

pub struct Mapper3 {
    prg_rom: Vec<u8>,
    prg_ram: [u8; PRG_RAM_SIZE],
    chr: Chr,
    mirroring: Mirroring,
    chr_bank: u8,
}

impl Mapper3 {
    pub fn new(prg_rom: Vec<u8>, chr: Chr, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            prg_ram: [0; PRG_RAM_SIZE],
            chr,
            mirroring,
            chr_bank: 0,
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        self.chr_bank as usize * CHR_BANK_SIZE + (addr & 0x1FFF) as usize
    }
}

impl Mapper for Mapper3 {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xFFFF => self.prg_rom[(addr - 0x8000) as usize % self.prg_rom.len()],
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, data: u8) {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize] = data,
            0x8000..=0xFFFF => {
                self.chr_bank = data & 0x03;
                log::trace!("CNROM CHR bank <- {}", self.chr_bank);
            }
            _ => {}
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        self.chr.read(self.chr_offset(addr))
    }

    fn write_chr(&mut self, addr: u16, data: u8) {
        let offset = self.chr_offset(addr);
        self.chr.write(offset, data);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
