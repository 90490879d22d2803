use crate::{
    cartridge::{
        cartridge::Cartridge,
        mapper::{Chr, Mirroring, mapper0::Mapper0},
    },
    ppu::ppu::{NMI_DELAY, PPU, WIDTH},
};

fn test_cart() -> Cartridge {
    let mapper = Mapper0::new(vec![0; 0x4000], Chr::new(Vec::new()), Mirroring::Horizontal);
    Cartridge::with_mapper(Box::new(mapper))
}

fn run_until(ppu: &mut PPU, cart: &mut Cartridge, scanline: u16, cycle: u16) {
    while !(ppu.scanline == scanline && ppu.cycle == cycle) {
        ppu.clock(cart);
    }
}

/// Tile 1 solid colour 1 in CHR RAM, placed at the top-left nametable entry.
fn solid_tile_setup(ppu: &mut PPU, cart: &mut Cartridge) {
    for row in 0..8 {
        ppu.vram.write(cart, 0x0010 + row, 0xFF);
    }
    ppu.vram.write(cart, 0x2000, 0x01);
    ppu.vram.write(cart, 0x3F00, 0x0F);
    ppu.vram.write(cart, 0x3F01, 0x21);
    ppu.vram.write(cart, 0x3F11, 0x16);
}

#[test]
fn power_on_position() {
    let ppu = PPU::new();
    assert_eq!((ppu.scanline, ppu.cycle, ppu.frame), (0, 0, 0));
}

#[test]
fn nmi_fires_after_fifteen_cycles() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.write_register(0x2000, 0x80, &mut cart);
    ppu.scanline = 241;
    ppu.cycle = 0;

    ppu.clock(&mut cart);
    assert!(ppu.status.vblank);
    assert!(!ppu.take_nmi());

    for _ in 1..NMI_DELAY {
        ppu.clock(&mut cart);
        assert!(!ppu.take_nmi());
    }

    ppu.clock(&mut cart);
    assert!(ppu.take_nmi());
    assert!(!ppu.take_nmi());
}

#[test]
fn nmi_dropped_when_disabled_during_delay() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.write_register(0x2000, 0x80, &mut cart);
    run_until(&mut ppu, &mut cart, 241, 1);

    ppu.write_register(0x2000, 0x00, &mut cart);
    for _ in 0..NMI_DELAY {
        ppu.clock(&mut cart);
    }

    assert!(!ppu.take_nmi());
}

#[test]
fn enabling_nmi_during_vblank_arms_it() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    run_until(&mut ppu, &mut cart, 241, 10);
    assert!(ppu.status.vblank);

    ppu.write_register(0x2000, 0x80, &mut cart);
    for _ in 0..NMI_DELAY {
        ppu.clock(&mut cart);
    }

    assert!(ppu.take_nmi());
}

#[test]
fn vblank_cleared_on_pre_render_line() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.status.sprite_zero_hit = true;
    ppu.status.sprite_overflow = true;

    run_until(&mut ppu, &mut cart, 241, 1);
    assert!(ppu.status.vblank);

    run_until(&mut ppu, &mut cart, 261, 1);
    assert!(!ppu.status.vblank);
    assert!(!ppu.status.sprite_zero_hit);
    assert!(!ppu.status.sprite_overflow);
}

#[test]
fn status_read_clears_vblank_and_toggle() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.write_register(0x2003, 0x1F, &mut cart);
    ppu.status.vblank = true;
    ppu.w = true;

    assert_eq!(ppu.read_register(0x2002, &cart), 0x9F);
    assert!(!ppu.w);
    assert_eq!(ppu.read_register(0x3FFA, &cart), 0x1F);
}

#[test]
fn write_only_registers_read_open_bus() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.write_register(0x2001, 0xA5, &mut cart);

    assert_eq!(ppu.read_register(0x2000, &cart), 0xA5);
    assert_eq!(ppu.read_register(0x2006, &cart), 0xA5);
}

#[test]
fn scroll_and_address_writes_follow_loopy() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();

    ppu.write_register(0x2000, 0x00, &mut cart);
    ppu.read_register(0x2002, &cart);
    ppu.write_register(0x2005, 0x7D, &mut cart);
    assert_eq!((ppu.t, ppu.x, ppu.w), (0x000F, 0x05, true));

    ppu.write_register(0x2005, 0x5E, &mut cart);
    assert_eq!((ppu.t, ppu.w), (0x616F, false));

    ppu.write_register(0x2006, 0x3D, &mut cart);
    assert_eq!(ppu.t, 0x3D6F);

    ppu.write_register(0x2006, 0xF0, &mut cart);
    assert_eq!(ppu.t, 0x3DF0);
    assert_eq!(ppu.v, 0x3DF0);
}

#[test]
fn ctrl_write_seeds_nametable_bits_of_t() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.write_register(0x2000, 0x03, &mut cart);
    assert_eq!(ppu.t, 0x0C00);
}

#[test]
fn data_reads_are_buffered() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();

    ppu.write_register(0x2006, 0x20, &mut cart);
    ppu.write_register(0x2006, 0x00, &mut cart);
    ppu.write_register(0x2007, 0x55, &mut cart);
    ppu.write_register(0x2007, 0x66, &mut cart);

    ppu.write_register(0x2006, 0x20, &mut cart);
    ppu.write_register(0x2006, 0x00, &mut cart);
    assert_eq!(ppu.read_register(0x2007, &cart), 0x00);
    assert_eq!(ppu.read_register(0x2007, &cart), 0x55);
    assert_eq!(ppu.read_register(0x2007, &cart), 0x66);
}

#[test]
fn palette_reads_are_direct() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.vram.write(&mut cart, 0x2F05, 0x77);

    ppu.write_register(0x2006, 0x3F, &mut cart);
    ppu.write_register(0x2006, 0x05, &mut cart);
    ppu.write_register(0x2007, 0x2C, &mut cart);

    ppu.write_register(0x2006, 0x3F, &mut cart);
    ppu.write_register(0x2006, 0x05, &mut cart);
    assert_eq!(ppu.read_register(0x2007, &cart), 0x2C);

    // buffer was refilled from the nametable underneath
    ppu.write_register(0x2006, 0x20, &mut cart);
    ppu.write_register(0x2006, 0x00, &mut cart);
    assert_eq!(ppu.read_register(0x2007, &cart), 0x77);
}

#[test]
fn data_increment_by_32() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.write_register(0x2000, 0x04, &mut cart);
    ppu.write_register(0x2006, 0x20, &mut cart);
    ppu.write_register(0x2006, 0x00, &mut cart);

    ppu.write_register(0x2007, 0x01, &mut cart);
    ppu.write_register(0x2007, 0x02, &mut cart);

    assert_eq!(ppu.v, 0x2040);
    assert_eq!(ppu.vram.read(&cart, 0x2020), 0x02);
}

#[test]
fn oam_data_auto_increments() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.write_register(0x2003, 0xFE, &mut cart);
    ppu.write_register(0x2004, 0x11, &mut cart);
    ppu.write_register(0x2004, 0x22, &mut cart);
    ppu.write_register(0x2004, 0x33, &mut cart);

    assert_eq!(ppu.oam[0xFE], 0x11);
    assert_eq!(ppu.oam[0xFF], 0x22);
    assert_eq!(ppu.oam[0x00], 0x33);
    assert_eq!(ppu.read_register(0x2004, &cart), ppu.oam[0x01]);
}

#[test]
fn nine_sprites_on_a_line_overflow() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.write_register(0x2001, 0x10, &mut cart);
    ppu.oam.fill(0xF0);
    for index in 0..10 {
        ppu.oam[index * 4] = if index == 2 { 50 } else { 10 };
        ppu.oam[index * 4 + 3] = index as u8;
    }

    ppu.scanline = 12;
    ppu.cycle = 64;
    ppu.clock(&mut cart);

    assert!(ppu.status.sprite_overflow);
    assert_eq!(ppu.sprite_count, 8);
    let order: Vec<u8> = ppu.secondary_oam.iter().map(|s| s.index).collect();
    assert_eq!(order, [0, 1, 3, 4, 5, 6, 7, 8]);
    assert!(ppu.secondary_oam[0].zero);
    assert!(!ppu.secondary_oam[1].zero);
}

#[test]
fn eight_sprites_do_not_overflow() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.write_register(0x2001, 0x10, &mut cart);
    ppu.oam.fill(0xF0);
    for index in 0..8 {
        ppu.oam[index * 4] = 10;
    }

    ppu.scanline = 10;
    ppu.cycle = 64;
    ppu.clock(&mut cart);

    assert!(!ppu.status.sprite_overflow);
    assert_eq!(ppu.sprite_count, 8);
}

#[test]
fn tall_sprites_match_sixteen_lines() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.write_register(0x2000, 0x20, &mut cart);
    ppu.write_register(0x2001, 0x10, &mut cart);
    ppu.oam.fill(0xF0);
    ppu.oam[0] = 10;

    ppu.scanline = 25;
    ppu.cycle = 64;
    ppu.clock(&mut cart);

    assert_eq!(ppu.sprite_count, 1);
}

#[test]
fn full_frame_wraps_once() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();

    let completed = (0..262 * 341).filter(|_| ppu.clock(&mut cart)).count();

    assert_eq!(completed, 1);
    assert_eq!((ppu.scanline, ppu.cycle, ppu.frame), (0, 0, 1));
}

#[test]
fn odd_frame_is_one_cycle_short_when_rendering() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.write_register(0x2001, 0x08, &mut cart);

    for _ in 0..262 * 341 {
        ppu.clock(&mut cart);
    }
    assert_eq!(ppu.frame, 1);

    let completed = (0..262 * 341 - 1).filter(|_| ppu.clock(&mut cart)).count();

    assert_eq!(completed, 1);
    assert_eq!((ppu.scanline, ppu.cycle, ppu.frame), (0, 0, 2));
}

#[test]
fn odd_frame_is_full_length_when_not_rendering() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.frame = 1;

    for _ in 0..262 * 341 - 1 {
        ppu.clock(&mut cart);
    }
    assert_eq!((ppu.scanline, ppu.cycle, ppu.frame), (261, 340, 1));
}

#[test]
fn background_tile_is_drawn() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    solid_tile_setup(&mut ppu, &mut cart);
    ppu.write_register(0x2001, 0x0A, &mut cart);

    // frame 0 starts with empty shifters; check frame 1
    while !ppu.clock(&mut cart) {}
    while !ppu.clock(&mut cart) {}

    assert_eq!(&ppu.frame_buffer[0..8], &[0x21; 8]);
    assert_eq!(ppu.frame_buffer[8], 0x0F);
    assert_eq!(ppu.frame_buffer[7 * WIDTH + 7], 0x21);
    assert_eq!(ppu.frame_buffer[8 * WIDTH], 0x0F);
}

#[test]
fn fine_x_scroll_shifts_the_tile() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    solid_tile_setup(&mut ppu, &mut cart);
    ppu.write_register(0x2001, 0x0A, &mut cart);
    ppu.write_register(0x2005, 0x03, &mut cart);
    ppu.write_register(0x2005, 0x00, &mut cart);

    while !ppu.clock(&mut cart) {}
    while !ppu.clock(&mut cart) {}

    assert_eq!(&ppu.frame_buffer[0..5], &[0x21; 5]);
    assert_eq!(ppu.frame_buffer[5], 0x0F);
}

#[test]
fn left_background_clip_shows_backdrop() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    solid_tile_setup(&mut ppu, &mut cart);
    ppu.write_register(0x2001, 0x08, &mut cart);

    while !ppu.clock(&mut cart) {}
    while !ppu.clock(&mut cart) {}

    assert_eq!(&ppu.frame_buffer[0..8], &[0x0F; 8]);
}

#[test]
fn sprite_zero_hit_on_overlap() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    solid_tile_setup(&mut ppu, &mut cart);
    ppu.oam.fill(0xF0);
    ppu.oam[0..4].copy_from_slice(&[0, 1, 0, 0]);
    ppu.write_register(0x2001, 0x1E, &mut cart);

    run_until(&mut ppu, &mut cart, 1, 0);
    assert!(!ppu.status.sprite_zero_hit);

    run_until(&mut ppu, &mut cart, 2, 0);
    assert!(ppu.status.sprite_zero_hit);
    // sprite in front of background
    assert_eq!(ppu.frame_buffer[WIDTH], 0x16);
}

#[test]
fn sprite_behind_background_yields_background_colour() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    solid_tile_setup(&mut ppu, &mut cart);
    ppu.oam.fill(0xF0);
    ppu.oam[0..4].copy_from_slice(&[0, 1, 0x20, 0]);
    ppu.write_register(0x2001, 0x1E, &mut cart);

    run_until(&mut ppu, &mut cart, 2, 0);

    assert!(ppu.status.sprite_zero_hit);
    assert_eq!(ppu.frame_buffer[WIDTH], 0x21);
}

#[test]
fn clipped_sprite_does_not_hit() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    solid_tile_setup(&mut ppu, &mut cart);
    ppu.oam.fill(0xF0);
    ppu.oam[0..4].copy_from_slice(&[0, 1, 0, 0]);
    // sprites hidden in the leftmost 8 pixels
    ppu.write_register(0x2001, 0x1A, &mut cart);

    run_until(&mut ppu, &mut cart, 2, 0);

    assert!(!ppu.status.sprite_zero_hit);
}

#[test]
fn lower_oam_index_wins_overlap() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    solid_tile_setup(&mut ppu, &mut cart);
    ppu.vram.write(&mut cart, 0x3F15, 0x2A);
    ppu.oam.fill(0xF0);
    ppu.oam[0..4].copy_from_slice(&[20, 1, 0, 100]);
    ppu.oam[4..8].copy_from_slice(&[20, 1, 1, 100]);
    ppu.write_register(0x2001, 0x10, &mut cart);

    run_until(&mut ppu, &mut cart, 22, 0);

    assert_eq!(ppu.frame_buffer[21 * WIDTH + 100], 0x16);
}

#[test]
fn greyscale_masks_output() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.vram.write(&mut cart, 0x3F00, 0x2A);
    ppu.write_register(0x2001, 0x01, &mut cart);

    run_until(&mut ppu, &mut cart, 1, 0);

    assert_eq!(ppu.frame_buffer[0], 0x20);
}

/// Clocks from `cycle - 1` of `scanline` onto `cycle` with rendering enabled.
fn clock_onto(ppu: &mut PPU, cart: &mut Cartridge, scanline: u16, cycle: u16, v: u16) {
    ppu.write_register(0x2001, 0x08, cart);
    ppu.scanline = scanline;
    ppu.cycle = cycle - 1;
    ppu.v = v;
    ppu.clock(cart);
}

#[test]
fn fine_y_increments_at_cycle_256() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();

    clock_onto(&mut ppu, &mut cart, 10, 256, 0x20A0);

    assert_eq!(ppu.v & 0x7BE0, 0x30A0);
}

#[test]
fn fine_y_wrap_carries_into_coarse_y() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();

    // fine Y 7, coarse Y 5
    clock_onto(&mut ppu, &mut cart, 10, 256, 0x70A0);

    assert_eq!(ppu.v & 0x7BE0, 0x00C0);
}

#[test]
fn coarse_y_row_29_wraps_and_switches_nametable() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();

    clock_onto(&mut ppu, &mut cart, 10, 256, 0x73A0);
    assert_eq!(ppu.v & 0x7BE0, 0x0800);

    clock_onto(&mut ppu, &mut cart, 10, 256, 0x7BA0);
    assert_eq!(ppu.v & 0x7BE0, 0x0000);
}

#[test]
fn coarse_y_row_31_wraps_without_switching() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();

    clock_onto(&mut ppu, &mut cart, 10, 256, 0x73E0);

    assert_eq!(ppu.v & 0x7BE0, 0x0000);
}

#[test]
fn coarse_x_31_wraps_and_switches_nametable() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();

    clock_onto(&mut ppu, &mut cart, 10, 8, 0x001F);
    assert_eq!(ppu.v, 0x0400);

    clock_onto(&mut ppu, &mut cart, 10, 8, 0x041F);
    assert_eq!(ppu.v, 0x0000);

    clock_onto(&mut ppu, &mut cart, 10, 8, 0x0005);
    assert_eq!(ppu.v, 0x0006);
}

#[test]
fn pre_render_line_copies_vertical_bits() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    ppu.t = 0x7FFF;

    clock_onto(&mut ppu, &mut cart, 261, 279, 0x0000);
    assert_eq!(ppu.v, 0x0000);

    ppu.clock(&mut cart);
    assert_eq!(ppu.cycle, 280);
    assert_eq!(ppu.v, 0x7BE0);

    ppu.t = 0x1000;
    run_until(&mut ppu, &mut cart, 261, 304);
    assert_eq!(ppu.v, 0x1000);

    ppu.t = 0x2000;
    ppu.clock(&mut cart);
    assert_eq!(ppu.v, 0x1000);
}

#[test]
fn hidden_sprites_leave_no_stale_row() {
    let mut cart = test_cart();
    let mut ppu = PPU::new();
    solid_tile_setup(&mut ppu, &mut cart);
    ppu.oam.fill(0xF0);
    ppu.oam[0..4].copy_from_slice(&[10, 1, 0, 100]);
    ppu.write_register(0x2001, 0x10, &mut cart);

    // sprites off across cycle 257 of line 12, back on before line 13
    run_until(&mut ppu, &mut cart, 12, 200);
    ppu.write_register(0x2001, 0x08, &mut cart);
    run_until(&mut ppu, &mut cart, 12, 300);
    ppu.write_register(0x2001, 0x10, &mut cart);
    run_until(&mut ppu, &mut cart, 15, 0);

    assert_eq!(ppu.frame_buffer[12 * WIDTH + 100], 0x16);
    assert_eq!(ppu.frame_buffer[13 * WIDTH + 100], 0x0F);
    assert_eq!(ppu.frame_buffer[14 * WIDTH + 100], 0x16);
}
