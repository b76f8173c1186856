use crate::constants::board_config::*;

/// MF/PIC configuration latch
#[derive(Clone, Default)]
pub struct BoardConfig {
    value: u8,
}

impl BoardConfig {
    pub fn new() -> Self {
        Self { value: 0 }
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }

    pub fn read(&self) -> u8 {
        self.value
    }

    pub fn write(&mut self, value: u8) {
        self.value = value;
    }

    /// Bit 2: hides the upper eight NS32202 sources
    pub fn upper_irqs_masked(&self) -> bool {
        self.value & CONFIG_MASK_UPPER_IRQS != 0
    }

    /// Bits 1-0: shift applied to the interrupt vector
    pub fn vector_shift(&self) -> u8 {
        self.value & CONFIG_VECTOR_SHIFT
    }
}
