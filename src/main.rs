//! NES emulator entry point.
//!
//! Loads a cartridge and runs it in a window, or headless for a fixed number
//! of frames. Usage: tandem [--scale 1|2|4] [--frames N] [--verbose|--trace] path/to/game.nes

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    path::PathBuf,
    process::ExitCode,
};

use ansi_term::Colour::{Blue, Green, Purple, Red, Yellow};
use clap::{Parser, ValueEnum};
use log::{Level, LevelFilter, Log, Metadata, Record};
use minifb::{Key, Scale, Window, WindowOptions};
use tandem::{
    cartridge::cartridge::Cartridge,
    controller::Button,
    cpu::cpu::CpuError,
    nes::Nes,
    ppu::ppu::{FRAME_LEN, HEIGHT, WIDTH},
};

/// NES 2C02-style 64-color palette (0xRRGGBB). Index 0 = backdrop.
pub const NES_PALETTE_RGB: [u32; 64] = [
    0x545454, 0x001E74, 0x081090, 0x300088, 0x440064, 0x5C0030, 0x540400, 0x3C1800, 0x202A00,
    0x083A00, 0x004000, 0x003C00, 0x00302C, 0x000000, 0x000000, 0x000000, 0x989698, 0x084CC4,
    0x3032EC, 0x5C1EE4, 0x8814B0, 0xA01464, 0x982220, 0x783C00, 0x545A00, 0x287200, 0x087C00,
    0x007628, 0x006678, 0x000000, 0x000000, 0x000000, 0xECEEEC, 0x3C7EEC, 0x5C5CEC, 0x8844EC,
    0xB02CEC, 0xE028B0, 0xD83C50, 0xC45400, 0xAC7000, 0x808800, 0x409C30, 0x20A458, 0x209A88,
    0x404040, 0x000000, 0x000000, 0xECEEEC, 0xA8BCEC, 0xBCACEC, 0xD4A0EC, 0xEC94EC, 0xEC90D4,
    0xEC9CB4, 0xE4B090, 0xDCC878, 0xD4DC78, 0xB8EC98, 0xA8ECBC, 0xA0E4E4, 0xA0A0A0, 0x000000,
    0x000000,
];

const KEYMAP: [(Key, Button); 8] = [
    (Key::Z, Button::A),
    (Key::X, Button::B),
    (Key::RightShift, Button::Select),
    (Key::Enter, Button::Start),
    (Key::Up, Button::Up),
    (Key::Down, Button::Down),
    (Key::Left, Button::Left),
    (Key::Right, Button::Right),
];

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WindowScale {
    #[value(name = "1")]
    X1,
    #[value(name = "2")]
    X2,
    #[value(name = "4")]
    X4,
}

impl From<WindowScale> for Scale {
    fn from(scale: WindowScale) -> Self {
        match scale {
            WindowScale::X1 => Scale::X1,
            WindowScale::X2 => Scale::X2,
            WindowScale::X4 => Scale::X4,
        }
    }
}

/// Cycle-stepped NES emulator
#[derive(Parser, Debug)]
#[command(name = "tandem", version, about, long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,

    /// Window scale factor
    #[arg(short, long, value_enum, default_value = "2")]
    scale: WindowScale,

    /// Run this many frames without a window and print a checksum of the last one
    #[arg(short, long)]
    frames: Option<u64>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Log every executed instruction
    #[arg(long)]
    trace: bool,
}

/// Writes records to stderr with a coloured level tag.
struct TermLogger;

impl Log for TermLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let tag = match record.level() {
            Level::Error => Red.bold().paint("ERROR"),
            Level::Warn => Yellow.bold().paint("WARN "),
            Level::Info => Green.bold().paint("INFO "),
            Level::Debug => Blue.paint("DEBUG"),
            Level::Trace => Purple.paint("TRACE"),
        };
        eprintln!("{} {}", tag, record.args());
    }

    fn flush(&self) {}
}

static LOGGER: TermLogger = TermLogger;

fn init_logging(args: &Args) {
    let level = if args.trace {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Only fails if a logger is already installed.
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn frame_checksum(frame: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    frame.hash(&mut hasher);
    hasher.finish()
}

fn run_headless(nes: &mut Nes, frames: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mut checksum = 0;
    for _ in 0..frames {
        nes.run_frame(|frame| checksum = frame_checksum(frame))?;
    }

    log::info!("ran {frames} frames");
    println!("{checksum:016x}");
    Ok(())
}

fn run_window(nes: &mut Nes, scale: WindowScale) -> Result<(), Box<dyn std::error::Error>> {
    let mut window = Window::new(
        "Tandem",
        WIDTH,
        HEIGHT,
        WindowOptions {
            scale: scale.into(),
            ..WindowOptions::default()
        },
    )?;
    // NTSC runs at ~60.0988 Hz; minifb sleeps in update to hold this rate
    window.set_target_fps(60);

    let mut pixels = vec![0u32; FRAME_LEN];

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let pad = nes.controller(0);
        for (key, button) in KEYMAP {
            pad.set_pressed(button, window.is_key_down(key));
        }

        nes.run_frame(|frame| {
            for (pixel, &index) in pixels.iter_mut().zip(frame) {
                *pixel = NES_PALETTE_RGB[(index & 0x3F) as usize];
            }
        })?;
        window.update_with_buffer(&pixels, WIDTH, HEIGHT)?;
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    let cart = match Cartridge::load(&args.rom) {
        Ok(cart) => cart,
        Err(err) => {
            log::error!("{}: {err}", args.rom.display());
            return ExitCode::FAILURE;
        }
    };
    let mut nes = Nes::new(cart);

    let result = match args.frames {
        Some(frames) => run_headless(&mut nes, frames),
        None => run_window(&mut nes, args.scale),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // CPU faults are logged by the core as they happen
            if !err.is::<CpuError>() {
                log::error!("{err}");
            }
            ExitCode::FAILURE
        }
    }
}
