//! NES cartridge loading from iNES format (.nes files).
//!
//! Implements the [iNES](https://www.nesdev.org/wiki/INES) format: 16-byte header (magic "NES\x1A",
//! PRG size in 16 KiB units, CHR size in 8 KiB units, flags 6–7 for mapper, etc.), an optional
//! 512-byte trainer, then PRG ROM, then CHR ROM. A CHR size of 0 means the board carries 8 KiB of
//! CHR RAM instead. [Mapper](https://www.nesdev.org/wiki/Mapper) implements CPU PRG ($4020–$FFFF)
//! and PPU CHR ($0000–$1FFF) address decoding and bank switching.

use std::{error::Error, fmt, fs, io, path::Path};

use crate::cartridge::mapper::{
    CHR_BANK_SIZE, Chr, Mirroring, PRG_BANK_SIZE, mapper::Mapper, mapper0::Mapper0,
    mapper1::Mapper1, mapper2::Mapper2, mapper3::Mapper3,
};

pub const HEADER_SIZE: usize = 16;
pub const TRAINER_SIZE: usize = 512;
const MAGIC: &[u8; 4] = b"NES\x1A";

#[derive(Debug)]
pub enum CartridgeError {
    Io(io::Error),
    /// Fewer bytes than an iNES header.
    TooShort(usize),
    BadMagic,
    /// Header promises more PRG/CHR data than the file holds.
    Truncated { expected: usize, actual: usize },
    UnsupportedMapper(u8),
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartridgeError::Io(err) => write!(f, "failed to read ROM: {err}"),
            CartridgeError::TooShort(len) => {
                write!(f, "ROM is {len} bytes, shorter than an iNES header")
            }
            CartridgeError::BadMagic => write!(f, "missing iNES magic \"NES\\x1A\""),
            CartridgeError::Truncated { expected, actual } => {
                write!(f, "ROM truncated: header needs {expected} bytes, file has {actual}")
            }
            CartridgeError::UnsupportedMapper(id) => write!(f, "unsupported mapper {id}"),
        }
    }
}

impl Error for CartridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CartridgeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CartridgeError {
    fn from(err: io::Error) -> Self {
        CartridgeError::Io(err)
    }
}

/// Fields decoded from the 16-byte iNES header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// PRG ROM size in 16 KiB units.
    pub prg_banks: u8,
    /// CHR ROM size in 8 KiB units (0 → 8 KiB CHR RAM).
    pub chr_banks: u8,
    pub mapper: u8,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub trainer: bool,
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_SIZE {
            return Err(CartridgeError::TooShort(data.len()));
        }
        if &data[0..4] != MAGIC {
            return Err(CartridgeError::BadMagic);
        }

        let flags6 = data[6];
        let flags7 = data[7];

        // Byte 6 bit 3 overrides bit 0: 0 = horizontal, 1 = vertical.
        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        Ok(Self {
            prg_banks: data[4],
            chr_banks: data[5],
            mapper: (flags6 >> 4) | (flags7 & 0xF0),
            mirroring,
            battery: flags6 & 0x02 != 0,
            trainer: flags6 & 0x04 != 0,
        })
    }
}

/// Cartridge: holds PRG/CHR through the mapper that implements read/write and nametable mirroring.
/// CPU reads PRG via bus at $4020–$FFFF; PPU reads CHR at $0000–$1FFF (pattern tables).
pub struct Cartridge {
    /// `None` when the cartridge wraps a ready-made mapper.
    pub header: Option<Header>,
    pub mapper: Box<dyn Mapper>,
}

impl Cartridge {
    /// Load cartridge from an iNES file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Parse an in-memory iNES image and construct its mapper.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        let header = Header::parse(data)?;

        let prg_size = header.prg_banks as usize * PRG_BANK_SIZE;
        let chr_size = header.chr_banks as usize * CHR_BANK_SIZE;

        let prg_start = HEADER_SIZE + if header.trainer { TRAINER_SIZE } else { 0 };
        let prg_end = prg_start + prg_size;
        let chr_end = prg_end + chr_size;

        if data.len() < chr_end || prg_size == 0 {
            return Err(CartridgeError::Truncated {
                expected: chr_end.max(prg_start + PRG_BANK_SIZE),
                actual: data.len(),
            });
        }

        let prg_rom = data[prg_start..prg_end].to_vec();
        let chr = Chr::new(data[prg_end..chr_end].to_vec());

        let mapper: Box<dyn Mapper> = match header.mapper {
            0 => Box::new(Mapper0::new(prg_rom, chr, header.mirroring)),
            1 => Box::new(Mapper1::new(prg_rom, chr)),
            2 => Box::new(Mapper2::new(prg_rom, chr, header.mirroring)),
            3 => Box::new(Mapper3::new(prg_rom, chr, header.mirroring)),
            id => return Err(CartridgeError::UnsupportedMapper(id)),
        };

        log::info!(
            "loaded cartridge: mapper {}, {} KiB PRG, {} ({} KiB), {:?} mirroring{}",
            header.mapper,
            prg_size / 1024,
            if chr_size == 0 { "CHR RAM" } else { "CHR ROM" },
            chr_size.max(CHR_BANK_SIZE) / 1024,
            header.mirroring,
            if header.battery { ", battery" } else { "" },
        );

        Ok(Self { header: Some(header), mapper })
    }

    /// Cartridge with a ready-made mapper, bypassing iNES parsing.
    pub fn with_mapper(mapper: Box<dyn Mapper>) -> Self {
        Self { header: None, mapper }
    }

    /// CPU read in cartridge space ($4020–$FFFF).
    pub fn read(&self, addr: u16) -> u8 {
        self.mapper.read_prg(addr)
    }

    /// CPU write: PRG RAM or mapper registers.
    pub fn write(&mut self, addr: u16, data: u8) {
        self.mapper.write_prg(addr, data);
    }

    pub fn read_chr(&self, addr: u16) -> u8 {
        self.mapper.read_chr(addr)
    }

    pub fn write_chr(&mut self, addr: u16, data: u8) {
        self.mapper.write_chr(addr, data);
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    /// Poll and clear mapper IRQ. Returns true if an IRQ was pending.
    pub fn poll_irq(&mut self) -> bool {
        self.mapper.poll_irq()
    }
}
