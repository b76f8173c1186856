use crate::constants::address_space::{ROM_ADDRESS_MASK, ROM_SIZE};
use crate::memory::MemoryType;
use alloc::boxed::Box;
use core::fmt;
use log::trace;

/// Failure to build a ROM from an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RomError {
    TooShort { expected: usize, actual: usize },
}

impl fmt::Display for RomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RomError::TooShort { expected, actual } => write!(
                f,
                "image too short ({} bytes, expected {})",
                actual, expected
            ),
        }
    }
}

/// Flash/EPROM image, mirrored through the ROM window
pub struct ReadOnlyMemory {
    image: Box<[u8]>,
}

impl MemoryType for ReadOnlyMemory {
    fn read(&self, offset: u32) -> u8 {
        self.image[(offset & ROM_ADDRESS_MASK) as usize]
    }

    fn write(&mut self, offset: u32, value: u8) {
        // Flash programming is not modelled
        trace!("Dropped ROM write {:02X} at offset {:05X}", value, offset);
    }
}

impl ReadOnlyMemory {
    /// Builds the ROM from the first 128K of `image`; extra bytes are ignored
    pub fn new(image: &[u8]) -> Result<Self, RomError> {
        if image.len() < ROM_SIZE {
            return Err(RomError::TooShort {
                expected: ROM_SIZE,
                actual: image.len(),
            });
        }
        Ok(Self {
            image: Box::from(&image[..ROM_SIZE]),
        })
    }

    /// ROM filled with a single value, used before an image is attached
    pub fn blank(fill: u8) -> Self {
        Self {
            image: alloc::vec![fill; ROM_SIZE].into_boxed_slice(),
        }
    }
}
