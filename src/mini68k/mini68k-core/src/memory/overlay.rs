/// Observable state of the boot overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    /// Every access is forced to ROM
    Overlaid,
    /// Normal memory map, until the next reset
    Normal,
}

/// Emulates U27, the shift register that keeps ROM at address 0 for the
/// first eight bus cycles after reset so the CPU can fetch its reset vector.
pub struct RomOverlay {
    shift: u8,
}

impl RomOverlay {
    pub fn new() -> Self {
        Self { shift: 0 }
    }

    pub fn reset(&mut self) {
        self.shift = 0;
    }

    /// True while the high bit has not yet been shifted in
    pub fn is_active(&self) -> bool {
        self.shift & 0x80 == 0
    }

    /// One bus cycle: shift a 1 in from the bottom
    pub fn clock(&mut self) {
        self.shift = (self.shift << 1) | 1;
    }

    pub fn state(&self) -> OverlayState {
        if self.is_active() {
            OverlayState::Overlaid
        } else {
            OverlayState::Normal
        }
    }
}
