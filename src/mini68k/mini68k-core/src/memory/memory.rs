use crate::constants::address_space::{RAM_FILL, RAM_SIZE};
use crate::memory::MemoryType;
use alloc::boxed::Box;
use alloc::vec;

/// Static RAM occupying the bottom of the address space
/// Filled with a recognisable pattern at power on
pub struct Ram {
    cells: Box<[u8]>,
}

impl Ram {
    pub fn new() -> Self {
        Self {
            cells: vec![RAM_FILL; RAM_SIZE].into_boxed_slice(),
        }
    }
}

impl MemoryType for Ram {
    fn read(&self, offset: u32) -> u8 {
        self.cells[offset as usize % RAM_SIZE]
    }

    fn write(&mut self, offset: u32, value: u8) {
        self.cells[offset as usize % RAM_SIZE] = value;
    }
}
