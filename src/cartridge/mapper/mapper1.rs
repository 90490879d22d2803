//! Mapper 1 (MMC1): bank switching via 5-bit shift register.
//!
//! [MMC1](https://www.nesdev.org/wiki/MMC1): writes to $8000–$9FFF (control), $A000–$BFFF (CHR0),
//! $C000–$DFFF (CHR1), $E000–$FFFF (PRG bank). Any write with bit 7 set resets the shift register.
//! Otherwise, bit 0 is shifted in (LSB first); after 5 writes, the value is latched to the selected
//! register. Control (bits 0–1) = mirroring; bits 2–3 = PRG mode; bit 4 = CHR mode.

use crate::cartridge::mapper::{Chr, Mirroring, PRG_BANK_SIZE, PRG_RAM_SIZE, mapper::Mapper};

const CHR_HALF: usize = 0x1000;

/// MMC1 state: 5-bit shift register, control byte (mirroring + PRG/CHR mode), bank selects.
pub struct Mapper1 {
    prg_rom: Vec<u8>,
    prg_ram: [u8; PRG_RAM_SIZE],
    chr: Chr,
    shift_reg: u8,
    shift_count: u8,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
}

impl Mapper1 {
    /// Control defaults to $0C (PRG mode 3: $8000 switchable, $C000 fixed last).
    pub fn new(prg_rom: Vec<u8>, chr: Chr) -> Self {
        Self {
            prg_rom,
            prg_ram: [0; PRG_RAM_SIZE],
            chr,
            shift_reg: 0,
            shift_count: 0,
            control: 0x0C,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
        }
    }

    /// PRG bank mode from control bits 2–3: 0/1 = 32 KiB mode; 2 = $8000 fixed first, $C000 switchable; 3 = $8000 switchable, $C000 fixed last.
    fn prg_bank_mode(&self) -> u8 {
        (self.control >> 2) & 0b11
    }

    fn prg_bank_count(&self) -> usize {
        (self.prg_rom.len() / PRG_BANK_SIZE).max(1)
    }

    /// 16 KiB bank mapped at $8000 (`upper == false`) or $C000.
    fn prg_bank_for(&self, upper: bool) -> usize {
        let last = self.prg_bank_count() - 1;
        let selected = (self.prg_bank & 0x0F) as usize;

        let bank = match (self.prg_bank_mode(), upper) {
            (0 | 1, false) => selected & !1,
            (0 | 1, true) => selected | 1,
            (2, false) => 0,
            (2, true) => selected,
            (_, false) => selected,
            (_, true) => last,
        };
        bank % self.prg_bank_count()
    }

    fn chr_offset(&self, addr: u16) -> usize {
        let addr = (addr & 0x1FFF) as usize;
        if self.control & 0x10 == 0 {
            // one 8 KiB bank, low bit ignored
            ((self.chr_bank0 & !1) as usize) * CHR_HALF + addr
        } else if addr < CHR_HALF {
            self.chr_bank0 as usize * CHR_HALF + addr
        } else {
            self.chr_bank1 as usize * CHR_HALF + (addr - CHR_HALF)
        }
    }

    fn write_register(&mut self, addr: u16, value: u8) {
        match addr {
            0x8000..=0x9FFF => self.control = value,
            0xA000..=0xBFFF => self.chr_bank0 = value,
            0xC000..=0xDFFF => self.chr_bank1 = value,
            _ => self.prg_bank = value,
        }
        log::trace!("MMC1 ${addr:04X} <- ${value:02X}");
    }
}

impl Mapper for Mapper1 {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xFFFF => {
                let bank = self.prg_bank_for(addr >= 0xC000);
                let offset = (addr as usize - 0x8000) % PRG_BANK_SIZE;
                self.prg_rom[(bank * PRG_BANK_SIZE + offset) % self.prg_rom.len()]
            }
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, data: u8) {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize] = data,
            0x8000..=0xFFFF => {
                // Bit 7 resets the shift register and forces PRG mode 3.
                if data & 0x80 != 0 {
                    self.shift_reg = 0;
                    self.shift_count = 0;
                    self.control |= 0x0C;
                    return;
                }

                self.shift_reg >>= 1;
                self.shift_reg |= (data & 1) << 4;
                self.shift_count += 1;

                if self.shift_count == 5 {
                    self.write_register(addr, self.shift_reg & 0x1F);
                    self.shift_reg = 0;
                    self.shift_count = 0;
                }
            }
            _ => {}
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        self.chr.read(self.chr_offset(addr))
    }

    fn write_chr(&mut self, addr: u16, data: u8) {
        self.chr.write(self.chr_offset(addr), data);
    }

    /// Mirroring from control bits 0–1: 0 = one-screen lower, 1 = one-screen upper, 2 = vertical, 3 = horizontal.
    fn mirroring(&self) -> Mirroring {
        match self.control & 0b11 {
            0 => Mirroring::SingleScreenLower,
            1 => Mirroring::SingleScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }
}
