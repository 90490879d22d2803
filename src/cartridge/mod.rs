//! NES cartridge loading and mapper support.
//!
//! - **cartridge**: Loads iNES (.nes) files, holds the header and mapper.
//! - **mapper**: NROM (0), MMC1 (1), UxROM (2), CNROM (3); PRG/CHR bank switching and nametable mirroring.

pub mod cartridge;
pub mod mapper;
