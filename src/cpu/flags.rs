//! 6502 processor status register (P) flag bits.

pub const FLAG_CARRY: u8 = 1 << 0;
pub const FLAG_ZERO: u8 = 1 << 1;
pub const FLAG_INTERRUPT_DISABLE: u8 = 1 << 2;
pub const FLAG_DECIMAL: u8 = 1 << 3;  // Stored, but the 2A03 has no BCD mode
pub const FLAG_BREAK: u8 = 1 << 4;    // Only meaningful in a pushed copy
pub const FLAG_UNUSED: u8 = 1 << 5;   // Always 1 when read on 6502
pub const FLAG_OVERFLOW: u8 = 1 << 6;
pub const FLAG_NEGATIVE: u8 = 1 << 7;

/// Unpacked status register. Each flag is its own field; `bits`/`from_bits`
/// convert to and from the packed byte (C,Z,I,D,B,U,V,N from bit 0 up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub carry: bool,
    pub zero: bool,
    pub interrupt_disable: bool,
    pub decimal: bool,
    pub brk: bool,
    pub unused: bool,
    pub overflow: bool,
    pub negative: bool,
}

impl Flags {
    pub fn from_bits(byte: u8) -> Self {
        Self {
            carry: byte & FLAG_CARRY != 0,
            zero: byte & FLAG_ZERO != 0,
            interrupt_disable: byte & FLAG_INTERRUPT_DISABLE != 0,
            decimal: byte & FLAG_DECIMAL != 0,
            brk: byte & FLAG_BREAK != 0,
            unused: byte & FLAG_UNUSED != 0,
            overflow: byte & FLAG_OVERFLOW != 0,
            negative: byte & FLAG_NEGATIVE != 0,
        }
    }

    pub fn bits(&self) -> u8 {
        let mut byte = 0;
        for (set, mask) in [
            (self.carry, FLAG_CARRY),
            (self.zero, FLAG_ZERO),
            (self.interrupt_disable, FLAG_INTERRUPT_DISABLE),
            (self.decimal, FLAG_DECIMAL),
            (self.brk, FLAG_BREAK),
            (self.unused, FLAG_UNUSED),
            (self.overflow, FLAG_OVERFLOW),
            (self.negative, FLAG_NEGATIVE),
        ] {
            if set {
                byte |= mask;
            }
        }
        byte
    }

    /// Copy pushed by PHP/BRK (`brk = true`) or by NMI/IRQ (`brk = false`). U is always set.
    pub fn pushed(&self, brk: bool) -> u8 {
        let byte = self.bits() | FLAG_UNUSED;
        if brk { byte | FLAG_BREAK } else { byte & !FLAG_BREAK }
    }

    /// Status as restored by PLP/RTI: B is dropped and U forced on.
    pub fn pulled(byte: u8) -> Self {
        Self::from_bits((byte & !FLAG_BREAK) | FLAG_UNUSED)
    }

    pub fn set_zn(&mut self, value: u8) {
        self.zero = value == 0;
        self.negative = value & 0x80 != 0;
    }
}
