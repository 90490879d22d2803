//! PPUCTRL ($2000), PPUMASK ($2001) and PPUSTATUS ($2002) as plain structs.
//!
//! Each register unpacks from and packs back into its byte with
//! `from_bits`/`bits`; see [PPU registers](https://www.nesdev.org/wiki/PPU_registers).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Control {
    /// Base nametable index (0 = $2000, 1 = $2400, 2 = $2800, 3 = $2C00).
    pub nametable: u8,
    /// VRAM address step after $2007 access: 1 across, 32 down.
    pub increment_down: bool,
    /// 8x8 sprite pattern table at $1000 instead of $0000.
    pub sprite_table_high: bool,
    pub background_table_high: bool,
    /// 8x16 sprites.
    pub tall_sprites: bool,
    pub master_slave: bool,
    pub nmi_enable: bool,
}

impl Control {
    pub fn from_bits(byte: u8) -> Self {
        Self {
            nametable: byte & 0x03,
            increment_down: byte & 0x04 != 0,
            sprite_table_high: byte & 0x08 != 0,
            background_table_high: byte & 0x10 != 0,
            tall_sprites: byte & 0x20 != 0,
            master_slave: byte & 0x40 != 0,
            nmi_enable: byte & 0x80 != 0,
        }
    }

    pub fn bits(&self) -> u8 {
        (self.nametable & 0x03)
            | (self.increment_down as u8) << 2
            | (self.sprite_table_high as u8) << 3
            | (self.background_table_high as u8) << 4
            | (self.tall_sprites as u8) << 5
            | (self.master_slave as u8) << 6
            | (self.nmi_enable as u8) << 7
    }

    pub fn vram_increment(&self) -> u16 {
        if self.increment_down { 32 } else { 1 }
    }

    pub fn sprite_table(&self) -> u16 {
        if self.sprite_table_high { 0x1000 } else { 0x0000 }
    }

    pub fn background_table(&self) -> u16 {
        if self.background_table_high { 0x1000 } else { 0x0000 }
    }

    pub fn sprite_height(&self) -> u16 {
        if self.tall_sprites { 16 } else { 8 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mask {
    pub greyscale: bool,
    pub show_background_left: bool,
    pub show_sprites_left: bool,
    pub show_background: bool,
    pub show_sprites: bool,
    pub emphasize_red: bool,
    pub emphasize_green: bool,
    pub emphasize_blue: bool,
}

impl Mask {
    pub fn from_bits(byte: u8) -> Self {
        Self {
            greyscale: byte & 0x01 != 0,
            show_background_left: byte & 0x02 != 0,
            show_sprites_left: byte & 0x04 != 0,
            show_background: byte & 0x08 != 0,
            show_sprites: byte & 0x10 != 0,
            emphasize_red: byte & 0x20 != 0,
            emphasize_green: byte & 0x40 != 0,
            emphasize_blue: byte & 0x80 != 0,
        }
    }

    pub fn bits(&self) -> u8 {
        (self.greyscale as u8)
            | (self.show_background_left as u8) << 1
            | (self.show_sprites_left as u8) << 2
            | (self.show_background as u8) << 3
            | (self.show_sprites as u8) << 4
            | (self.emphasize_red as u8) << 5
            | (self.emphasize_green as u8) << 6
            | (self.emphasize_blue as u8) << 7
    }

    /// Background or sprites on; the fetch pipeline and scroll updates only run while true.
    pub fn rendering_enabled(&self) -> bool {
        self.show_background || self.show_sprites
    }
}

/// Only the top three bits exist; the low five read back as open bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
    pub sprite_overflow: bool,
    pub sprite_zero_hit: bool,
    pub vblank: bool,
}

impl Status {
    pub fn from_bits(byte: u8) -> Self {
        Self {
            sprite_overflow: byte & 0x20 != 0,
            sprite_zero_hit: byte & 0x40 != 0,
            vblank: byte & 0x80 != 0,
        }
    }

    pub fn bits(&self) -> u8 {
        (self.sprite_overflow as u8) << 5
            | (self.sprite_zero_hit as u8) << 6
            | (self.vblank as u8) << 7
    }
}
