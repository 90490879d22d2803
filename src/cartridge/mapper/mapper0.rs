//! Mapper 0 (NROM): no bank switching, 16/32KB PRG, 8KB CHR.

use crate::cartridge::mapper::{Chr, Mirroring, PRG_RAM_SIZE, mapper::Mapper};

/// NROM mapper: fixed PRG and CHR, 16KB PRG mirrored into $C000.
pub struct Mapper0 {
    prg_rom: Vec<u8>,
    prg_ram: [u8; PRG_RAM_SIZE],
    chr: Chr,
    mirroring: Mirroring,
}

impl Mapper0 {
    /// Mirroring comes from the header: NROM boards solder it.
    pub fn new(prg_rom: Vec<u8>, chr: Chr, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            prg_ram: [0; PRG_RAM_SIZE],
            chr,
            mirroring,
        }
    }
}

impl Mapper for Mapper0 {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            // 16 KiB images repeat in the upper half
            0x8000..=0xFFFF => self.prg_rom[(addr - 0x8000) as usize % self.prg_rom.len()],
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, data: u8) {
        if let 0x6000..=0x7FFF = addr {
            self.prg_ram[(addr - 0x6000) as usize] = data;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::{CHR_BANK_SIZE, PRG_BANK_SIZE};

    #[test]
    fn sixteen_kib_prg_is_mirrored() {
        let mut prg = vec![0; PRG_BANK_SIZE];
        prg[0x0010] = 0x5A;
        let mapper = Mapper0::new(prg, Chr::new(Vec::new()), Mirroring::Vertical);

        assert_eq!(mapper.read_prg(0x8010), 0x5A);
        assert_eq!(mapper.read_prg(0xC010), 0x5A);
    }

    #[test]
    fn thirty_two_kib_prg_is_linear() {
        let mut prg = vec![0; 2 * PRG_BANK_SIZE];
        prg[0x4010] = 0x77;
        let mapper = Mapper0::new(prg, Chr::new(Vec::new()), Mirroring::Horizontal);

        assert_eq!(mapper.read_prg(0x8010), 0x00);
        assert_eq!(mapper.read_prg(0xC010), 0x77);
    }

    #[test]
    fn prg_rom_is_read_only_but_prg_ram_is_not() {
        let mut mapper = Mapper0::new(vec![0; PRG_BANK_SIZE], Chr::new(Vec::new()), Mirroring::Vertical);

        mapper.write_prg(0x8000, 0xFF);
        mapper.write_prg(0x6123, 0x42);

        assert_eq!(mapper.read_prg(0x8000), 0x00);
        assert_eq!(mapper.read_prg(0x6123), 0x42);
    }

    #[test]
    fn chr_rom_vs_chr_ram() {
        let mut rom = Mapper0::new(vec![0; PRG_BANK_SIZE], Chr::new(vec![3; CHR_BANK_SIZE]), Mirroring::Vertical);
        rom.write_chr(0x0100, 9);
        assert_eq!(rom.read_chr(0x0100), 3);

        let mut ram = Mapper0::new(vec![0; PRG_BANK_SIZE], Chr::new(Vec::new()), Mirroring::Vertical);
        ram.write_chr(0x0100, 9);
        assert_eq!(ram.read_chr(0x0100), 9);
    }
}
