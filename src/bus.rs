//! Memory bus and address decoding for the NES.
//!
//! Maps CPU addresses to RAM, PPU registers, OAM DMA, controllers, the APU
//! stub and the cartridge. See [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map).

use crate::{
    cartridge::cartridge::Cartridge,
    controller::Controller,
    ppu::ppu::PPU,
};

/// Trait for memory-mapped I/O and bus access used by the CPU.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);

    /// Poll and clear a pending NMI.
    fn poll_nmi(&mut self) -> bool {
        false
    }

    /// Level of the IRQ line.
    fn poll_irq(&mut self) -> bool {
        false
    }

    /// Page written to $4014 since the last call, if any.
    fn take_dma_request(&mut self) -> Option<u8> {
        None
    }
}

/// Main NES bus: RAM, PPU, cartridge, and both controller ports.
pub struct NesBus {
    pub ram: [u8; 2048],
    pub cart: Cartridge,
    pub ppu: PPU,
    pub controllers: [Controller; 2],
    dma_page: Option<u8>,
}

impl NesBus {
    /// Create a new bus with the given cartridge.
    pub fn new(cart: Cartridge) -> Self {
        Self {
            ram: [0; 2048],
            cart,
            ppu: PPU::new(),
            controllers: [Controller::new(), Controller::new()],
            dma_page: None,
        }
    }

    /// Advance the PPU (and the mapper's cycle hook) by one PPU cycle.
    /// Returns true when a frame has just completed.
    pub fn clock_ppu(&mut self) -> bool {
        let frame_done = self.ppu.clock(&mut self.cart);
        self.cart.mapper.clock(self.ppu.scanline, self.ppu.cycle);
        frame_done
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // Internal RAM (mirrored 4x in 0x0000-0x1FFF)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            // PPU registers $2000-$3FFF (mirrored every 8 bytes)
            0x2000..=0x3FFF => self.ppu.read_register(addr, &self.cart),
            0x4016 => self.controllers[0].read(),
            0x4017 => self.controllers[1].read(),
            // APU and I/O: not emulated
            0x4000..=0x401F => 0,
            // Cartridge: PRG RAM, PRG ROM, expansion
            0x4020..=0xFFFF => self.cart.read(addr),
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            // Internal RAM
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = data,
            // PPU registers $2000-$3FFF (mirrored every 8 bytes)
            0x2000..=0x3FFF => self.ppu.write_register(addr, data, &mut self.cart),
            // OAM DMA; the CPU performs the copy and stalls
            0x4014 => self.dma_page = Some(data),
            // Strobe reaches both ports
            0x4016 => {
                self.controllers[0].write(data);
                self.controllers[1].write(data);
            }
            0x4017 => self.controllers[1].write(data),
            0x4000..=0x401F => {}
            // Cartridge: PRG RAM and mapper registers
            0x4020..=0xFFFF => self.cart.write(addr, data),
        }
    }

    fn poll_nmi(&mut self) -> bool {
        self.ppu.take_nmi()
    }

    fn poll_irq(&mut self) -> bool {
        self.cart.poll_irq()
    }

    fn take_dma_request(&mut self) -> Option<u8> {
        self.dma_page.take()
    }
}
