//! NES PPU (Picture Processing Unit) implementation.
//!
//! A dot-stepped 2C02: 341 cycles per scanline, 262 scanlines per frame. The
//! background comes out of the loopy v/t/x/w scroll registers and a pair of
//! 16-bit pattern shifters refilled on an 8-cycle fetch cadence. Sprites are
//! evaluated into secondary OAM at cycle 65 and expanded into a 256-wide
//! pixel row at cycle 257. Output is one 6-bit palette index per pixel.
//!
//! See [PPU rendering](https://www.nesdev.org/wiki/PPU_rendering) and
//! [PPU scrolling](https://www.nesdev.org/wiki/PPU_scrolling).

use crate::{
    cartridge::cartridge::Cartridge,
    ppu::{
        registers::{Control, Mask, Status},
        vram::{Vram, palette_index},
    },
};

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 240;
pub const FRAME_LEN: usize = WIDTH * HEIGHT;

/// OAM (Object Attribute Memory): 64 sprites × 4 bytes. Each entry: Y, tile, attr, X.
pub const OAM_LEN: usize = 256;
pub const SECONDARY_OAM_LEN: usize = 8;

pub const PRE_RENDER_SCANLINE: u16 = 261;
pub const VBLANK_SCANLINE: u16 = 241;
const LAST_CYCLE: u16 = 340;

/// PPU cycles between VBlank being raised and the NMI reaching the CPU.
pub const NMI_DELAY: u8 = 15;

// Sprite row buffer layout.
const SPRITE_COLOR: u8 = 0x03;
const SPRITE_PALETTE: u8 = 0x0C;
const SPRITE_BEHIND: u8 = 0x10;
const SPRITE_ZERO: u8 = 0x20;

/// One secondary OAM slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sprite {
    pub y: u8,
    pub tile: u8,
    pub attr: u8,
    pub x: u8,
    /// Index into primary OAM (0..64).
    pub index: u8,
    pub zero: bool,
}

impl Sprite {
    pub const EMPTY: Sprite = Sprite {
        y: 0xFF,
        tile: 0xFF,
        attr: 0xFF,
        x: 0xFF,
        index: 0xFF,
        zero: false,
    };
}

/// PPU state: timing, loopy registers, VRAM, OAM, fetch pipeline and frame buffer.
pub struct PPU {
    pub cycle: u16,
    pub scanline: u16,
    pub frame: u64,

    pub ctrl: Control,
    pub mask: Mask,
    pub status: Status,

    /// Current VRAM address (15 bits).
    pub v: u16,
    /// Temporary VRAM address; the scroll latch.
    pub t: u16,
    /// Fine X scroll (3 bits).
    pub x: u8,
    /// First/second write toggle shared by $2005 and $2006.
    pub w: bool,

    pub vram: Vram,
    pub oam: [u8; OAM_LEN],
    /// OAM address for $2003/$2004 (byte index 0..255).
    pub oam_addr: u8,
    pub secondary_oam: [Sprite; SECONDARY_OAM_LEN],
    pub sprite_count: usize,
    sprite_pixels: [u8; WIDTH],

    // Bytes fetched for the next tile.
    tile_id: u8,
    tile_palette: u8,
    tile_low: u8,
    tile_high: u8,

    pattern_low: u16,
    pattern_high: u16,
    attribute_low: u8,
    attribute_high: u8,
    attribute_latch_low: u8,
    attribute_latch_high: u8,

    read_buffer: u8,
    /// Last value written to any PPU register.
    open_bus: u8,

    nmi_delay: u8,
    nmi_previous: bool,
    nmi_pending: bool,

    /// 256×240 palette indices (0..64). Row-major, left-to-right, top-to-bottom.
    pub frame_buffer: [u8; FRAME_LEN],
}

impl Default for PPU {
    fn default() -> Self {
        Self::new()
    }
}

impl PPU {
    /// Power-on state: scanline 0, cycle 0, frame 0.
    pub fn new() -> Self {
        Self {
            cycle: 0,
            scanline: 0,
            frame: 0,
            ctrl: Control::default(),
            mask: Mask::default(),
            status: Status::default(),
            v: 0,
            t: 0,
            x: 0,
            w: false,
            vram: Vram::new(),
            oam: [0; OAM_LEN],
            oam_addr: 0,
            secondary_oam: [Sprite::EMPTY; SECONDARY_OAM_LEN],
            sprite_count: 0,
            sprite_pixels: [0; WIDTH],
            tile_id: 0,
            tile_palette: 0,
            tile_low: 0,
            tile_high: 0,
            pattern_low: 0,
            pattern_high: 0,
            attribute_low: 0,
            attribute_high: 0,
            attribute_latch_low: 0,
            attribute_latch_high: 0,
            read_buffer: 0,
            open_bus: 0,
            nmi_delay: 0,
            nmi_previous: false,
            nmi_pending: false,
            frame_buffer: [0; FRAME_LEN],
        }
    }

    /// Poll and clear a pending NMI for the CPU.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_pending)
    }

    /// Advance one PPU cycle. Returns true when this cycle wrapped into a new frame,
    /// i.e. `frame_buffer` holds a complete picture.
    pub fn clock(&mut self, cart: &mut Cartridge) -> bool {
        if self.nmi_delay > 0 {
            self.nmi_delay -= 1;
            if self.nmi_delay == 0 && self.ctrl.nmi_enable && self.status.vblank {
                self.nmi_pending = true;
            }
        }

        let frame_done = self.advance();
        self.render_cycle(cart);
        frame_done
    }

    fn advance(&mut self) -> bool {
        // Odd frames drop the last pre-render cycle while rendering.
        if self.mask.rendering_enabled()
            && self.frame % 2 == 1
            && self.scanline == PRE_RENDER_SCANLINE
            && self.cycle == LAST_CYCLE - 1
        {
            self.cycle = 0;
            self.scanline = 0;
            self.frame += 1;
            return true;
        }

        self.cycle += 1;
        if self.cycle > LAST_CYCLE {
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline > PRE_RENDER_SCANLINE {
                self.scanline = 0;
                self.frame += 1;
                return true;
            }
        }
        false
    }

    fn render_cycle(&mut self, cart: &mut Cartridge) {
        let cycle = self.cycle;
        let rendering = self.mask.rendering_enabled();
        let pre_line = self.scanline == PRE_RENDER_SCANLINE;
        let visible_line = self.scanline < HEIGHT as u16;
        let render_line = pre_line || visible_line;
        let visible_cycle = (1..=256).contains(&cycle);
        let fetch_cycle = visible_cycle || (321..=336).contains(&cycle);

        if visible_line && visible_cycle {
            self.render_pixel();
        }

        if rendering && render_line {
            if fetch_cycle {
                if cycle % 8 == 1 {
                    self.load_shifters();
                }
                self.shift();
                match cycle % 8 {
                    1 => self.fetch_nametable(cart),
                    3 => self.fetch_attribute(cart),
                    5 => self.tile_low = self.fetch_pattern(cart, 0),
                    7 => self.tile_high = self.fetch_pattern(cart, 8),
                    0 => self.increment_x(),
                    _ => {}
                }
            }
            if cycle == 256 {
                self.increment_y();
            }
            if cycle == 257 {
                self.copy_x();
            }
            if pre_line && (280..=304).contains(&cycle) {
                self.copy_y();
            }
        }

        if visible_line && self.mask.show_sprites && cycle == 1 {
            self.clear_secondary_oam();
        }
        if visible_line && rendering && cycle == 65 {
            self.evaluate_sprites();
        }
        if render_line && cycle == 257 {
            // the pre-render line evaluates nothing for scanline 0
            self.sprite_pixels = [0; WIDTH];
            if visible_line && self.mask.show_sprites {
                self.build_sprite_row(cart);
            }
        }

        if self.scanline == VBLANK_SCANLINE && cycle == 1 {
            self.status.vblank = true;
            self.nmi_change();
        }
        if pre_line && cycle == 1 {
            self.status.vblank = false;
            self.status.sprite_zero_hit = false;
            self.status.sprite_overflow = false;
            self.nmi_change();
        }
    }

    // Arms the delayed NMI on a rising edge of (vblank && nmi_enable).
    fn nmi_change(&mut self) {
        let nmi = self.ctrl.nmi_enable && self.status.vblank;
        if nmi && !self.nmi_previous {
            self.nmi_delay = NMI_DELAY;
        }
        self.nmi_previous = nmi;
    }

    // --- background pipeline ---

    fn load_shifters(&mut self) {
        self.pattern_low = (self.pattern_low & 0xFF00) | self.tile_low as u16;
        self.pattern_high = (self.pattern_high & 0xFF00) | self.tile_high as u16;
        self.attribute_latch_low = self.tile_palette & 1;
        self.attribute_latch_high = (self.tile_palette >> 1) & 1;
    }

    fn shift(&mut self) {
        self.pattern_low <<= 1;
        self.pattern_high <<= 1;
        self.attribute_low = (self.attribute_low << 1) | self.attribute_latch_low;
        self.attribute_high = (self.attribute_high << 1) | self.attribute_latch_high;
    }

    fn fetch_nametable(&mut self, cart: &Cartridge) {
        self.tile_id = self.vram.read(cart, 0x2000 | (self.v & 0x0FFF));
    }

    fn fetch_attribute(&mut self, cart: &Cartridge) {
        let v = self.v;
        let addr = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
        let shift = ((v >> 4) & 0x04) | (v & 0x02);
        self.tile_palette = (self.vram.read(cart, addr) >> shift) & 0x03;
    }

    fn fetch_pattern(&mut self, cart: &Cartridge, plane: u16) -> u8 {
        let fine_y = (self.v >> 12) & 0x07;
        let addr = self.ctrl.background_table() + self.tile_id as u16 * 16 + fine_y + plane;
        self.vram.read(cart, addr)
    }

    fn increment_x(&mut self) {
        if self.v & 0x001F == 31 {
            self.v &= !0x001F;
            self.v ^= 0x0400;
        } else {
            self.v += 1;
        }
    }

    fn increment_y(&mut self) {
        if self.v & 0x7000 != 0x7000 {
            self.v += 0x1000;
            return;
        }

        self.v &= !0x7000;
        let mut coarse_y = (self.v & 0x03E0) >> 5;
        if coarse_y == 29 {
            coarse_y = 0;
            self.v ^= 0x0800;
        } else if coarse_y == 31 {
            // attribute rows: wrap without switching nametable
            coarse_y = 0;
        } else {
            coarse_y += 1;
        }
        self.v = (self.v & !0x03E0) | (coarse_y << 5);
    }

    fn copy_x(&mut self) {
        self.v = (self.v & 0xFBE0) | (self.t & 0x041F);
    }

    fn copy_y(&mut self) {
        self.v = (self.v & 0x841F) | (self.t & 0x7BE0);
    }

    /// 4-bit background colour (palette << 2 | pixel) at the fine-X tap, 0 when transparent.
    fn background_pixel(&self, x: usize) -> u8 {
        if !self.mask.show_background || (x < 8 && !self.mask.show_background_left) {
            return 0;
        }

        let bit = 15 - self.x as u16;
        let pixel = (((self.pattern_high >> bit) & 1) << 1 | ((self.pattern_low >> bit) & 1)) as u8;
        if pixel == 0 {
            return 0;
        }

        let attr_bit = 7 - self.x;
        let palette = ((self.attribute_high >> attr_bit) & 1) << 1 | ((self.attribute_low >> attr_bit) & 1);
        palette << 2 | pixel
    }

    fn sprite_pixel(&self, x: usize) -> u8 {
        if !self.mask.show_sprites || (x < 8 && !self.mask.show_sprites_left) {
            return 0;
        }
        self.sprite_pixels[x]
    }

    fn render_pixel(&mut self) {
        let x = (self.cycle - 1) as usize;
        let y = self.scanline as usize;

        let background = self.background_pixel(x);
        let sprite = self.sprite_pixel(x);
        let sprite_color = 0x10 | (sprite & (SPRITE_PALETTE | SPRITE_COLOR));

        let color = match (background & 0x03 != 0, sprite & SPRITE_COLOR != 0) {
            (false, false) => 0,
            (false, true) => sprite_color,
            (true, false) => background,
            (true, true) => {
                if sprite & SPRITE_ZERO != 0 && x != 255 {
                    self.status.sprite_zero_hit = true;
                }
                if sprite & SPRITE_BEHIND != 0 { background } else { sprite_color }
            }
        };

        let mut index = self.vram.palette[palette_index(0x3F00 | color as u16)];
        if self.mask.greyscale {
            index &= 0x30;
        }
        self.frame_buffer[y * WIDTH + x] = index & 0x3F;
    }

    // --- sprites ---

    fn clear_secondary_oam(&mut self) {
        self.secondary_oam = [Sprite::EMPTY; SECONDARY_OAM_LEN];
        self.sprite_count = 0;
    }

    /// Copies the first eight sprites covering the current scanline into
    /// secondary OAM; a ninth sets the overflow flag.
    pub fn evaluate_sprites(&mut self) {
        let height = self.ctrl.sprite_height();
        let line = self.scanline;
        let mut count = 0;

        for index in 0..64 {
            let base = index * 4;
            let y = self.oam[base] as u16;
            if line < y || line - y >= height {
                continue;
            }

            if count == SECONDARY_OAM_LEN {
                self.status.sprite_overflow = true;
                break;
            }

            self.secondary_oam[count] = Sprite {
                y: self.oam[base],
                tile: self.oam[base + 1],
                attr: self.oam[base + 2],
                x: self.oam[base + 3],
                index: index as u8,
                zero: index == 0,
            };
            count += 1;
        }

        self.sprite_count = count;
    }

    fn sprite_pattern_addr(&self, sprite: &Sprite, row: u16) -> u16 {
        let flip_v = sprite.attr & 0x80 != 0;

        if !self.ctrl.tall_sprites {
            let row = if flip_v { 7 - row } else { row };
            return self.ctrl.sprite_table() + sprite.tile as u16 * 16 + row;
        }

        let table = (sprite.tile & 1) as u16 * 0x1000;
        let mut tile = (sprite.tile & 0xFE) as u16;
        let mut row = if flip_v { 15 - row } else { row };
        if row > 7 {
            tile += 1;
            row -= 8;
        }
        table + tile * 16 + row
    }

    /// Expands secondary OAM into the per-column sprite row drawn on the next scanline.
    /// Lower OAM indices are drawn last so their opaque pixels win.
    fn build_sprite_row(&mut self, cart: &Cartridge) {
        for slot in (0..self.sprite_count).rev() {
            let sprite = self.secondary_oam[slot];
            if sprite.y >= 0xEF {
                continue;
            }

            let row = self.scanline.saturating_sub(sprite.y as u16) & 0x0F;
            let addr = self.sprite_pattern_addr(&sprite, row);
            let low = self.vram.read(cart, addr);
            let high = self.vram.read(cart, addr + 8);
            let flip_h = sprite.attr & 0x40 != 0;

            for px in 0..8u8 {
                let column = sprite.x as usize + px as usize;
                if column >= WIDTH {
                    break;
                }

                let bit = if flip_h { px } else { 7 - px };
                let color = ((high >> bit) & 1) << 1 | ((low >> bit) & 1);
                if color == 0 {
                    continue;
                }

                let mut value = color | (sprite.attr & 0x03) << 2;
                if sprite.attr & 0x20 != 0 {
                    value |= SPRITE_BEHIND;
                }
                if sprite.zero {
                    value |= SPRITE_ZERO;
                }
                self.sprite_pixels[column] = value;
            }
        }
    }

    // --- CPU-facing registers ---

    /// CPU read of $2000–$3FFF (mirrored every 8 bytes).
    pub fn read_register(&mut self, addr: u16, cart: &Cartridge) -> u8 {
        match addr & 0x2007 {
            0x2002 => self.read_status(),
            0x2004 => self.oam[self.oam_addr as usize],
            0x2007 => self.read_data(cart),
            _ => self.open_bus,
        }
    }

    /// CPU write of $2000–$3FFF (mirrored every 8 bytes).
    pub fn write_register(&mut self, addr: u16, data: u8, cart: &mut Cartridge) {
        self.open_bus = data;

        match addr & 0x2007 {
            0x2000 => self.write_ctrl(data),
            0x2001 => self.mask = Mask::from_bits(data),
            0x2002 => {}
            0x2003 => self.oam_addr = data,
            0x2004 => {
                self.oam[self.oam_addr as usize] = data;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            0x2005 => self.write_scroll(data),
            0x2006 => self.write_addr(data),
            _ => self.write_data(cart, data),
        }
    }

    /// PPUCTRL ($2000): also seeds the nametable bits of t.
    fn write_ctrl(&mut self, data: u8) {
        self.ctrl = Control::from_bits(data);
        self.t = (self.t & 0xF3FF) | ((data as u16 & 0x03) << 10);
        self.nmi_change();
    }

    /// PPUSTATUS ($2002): low bits are open bus; clears vblank and the write toggle.
    fn read_status(&mut self) -> u8 {
        let value = self.status.bits() | (self.open_bus & 0x1F);
        self.status.vblank = false;
        self.nmi_change();
        self.w = false;
        value
    }

    /// PPUSCROLL ($2005): first write = coarse/fine X, second write = coarse/fine Y.
    fn write_scroll(&mut self, data: u8) {
        if !self.w {
            self.t = (self.t & 0xFFE0) | (data as u16 >> 3);
            self.x = data & 0x07;
        } else {
            self.t = (self.t & 0x8FFF) | ((data as u16 & 0x07) << 12);
            self.t = (self.t & 0xFC1F) | ((data as u16 & 0xF8) << 2);
        }
        self.w = !self.w;
    }

    /// PPUADDR ($2006): high byte then low byte; the second write copies t into v.
    fn write_addr(&mut self, data: u8) {
        if !self.w {
            self.t = (self.t & 0x80FF) | ((data as u16 & 0x3F) << 8);
        } else {
            self.t = (self.t & 0xFF00) | data as u16;
            self.v = self.t;
        }
        self.w = !self.w;
    }

    /// PPUDATA ($2007) read: buffered below the palette, direct for palette entries.
    fn read_data(&mut self, cart: &Cartridge) -> u8 {
        let addr = self.v & 0x3FFF;

        let value = if addr <= 0x3EFF {
            let buffered = self.read_buffer;
            self.read_buffer = self.vram.read(cart, addr);
            buffered
        } else {
            // the buffer picks up the nametable byte underneath
            self.read_buffer = self.vram.read(cart, addr - 0x1000);
            self.vram.read(cart, addr)
        };

        self.increment_v();
        value
    }

    fn write_data(&mut self, cart: &mut Cartridge, data: u8) {
        self.vram.write(cart, self.v, data);
        self.increment_v();
    }

    fn increment_v(&mut self) {
        self.v = self.v.wrapping_add(self.ctrl.vram_increment()) & 0x7FFF;
    }
}
