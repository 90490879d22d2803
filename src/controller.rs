//! NES controller input handling.
//!
//! Implements the standard NES controller shift register protocol:
//! write $01 to $4016 to hold the latch open (reads keep returning A), then
//! write $00 and read repeatedly to get one bit per read
//! (A, B, Select, Start, Up, Down, Left, Right).

/// Upper bits of a controller read come from the open data bus.
const OPEN_BUS: u8 = 0x40;

/// Button masks in shift-out order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Button {
    A = 0x01,
    B = 0x02,
    Select = 0x04,
    Start = 0x08,
    Up = 0x10,
    Down = 0x20,
    Left = 0x40,
    Right = 0x80,
}

/// A standard controller plugged into $4016 or $4017.
#[derive(Debug, Default, Clone)]
pub struct Controller {
    /// Held buttons: bit 0 = A, 1 = B, 2 = Select, 3 = Start, 4 = Up, 5 = Down, 6 = Left, 7 = Right.
    pub state: u8,
    strobe: bool,
    index: u8,
}

impl Controller {
    /// Create a new controller with no buttons pressed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, button: Button) {
        self.state |= button as u8;
    }

    pub fn release(&mut self, button: Button) {
        self.state &= !(button as u8);
    }

    pub fn set_pressed(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.press(button)
        } else {
            self.release(button)
        }
    }

    /// Returns the next button bit OR'd with open bus. Once all eight have
    /// been shifted out, reads return 1.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return (self.state & 1) | OPEN_BUS;
        }

        let bit = if self.index < 8 {
            (self.state >> self.index) & 1
        } else {
            1
        };
        self.index = self.index.saturating_add(1);
        bit | OPEN_BUS
    }

    /// Bit 0 is the strobe. While high the shift position stays on A.
    pub fn write(&mut self, data: u8) {
        self.strobe = data & 1 != 0;
        if self.strobe {
            self.index = 0;
        }
    }
}
