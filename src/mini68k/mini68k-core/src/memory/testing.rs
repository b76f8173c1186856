// Recording stand-ins for the board peripherals

use super::mods::{ClockChip, DiskController, Peripheral, SerialPort};
use alloc::vec::Vec;

pub struct MockSerial {
    pub writes: Vec<(u8, u8)>,
    pub reads: usize,
    pub irq: bool,
    pub input: bool,
    pub resets: usize,
    pub events: usize,
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            reads: 0,
            irq: false,
            input: false,
            resets: 0,
            events: 0,
        }
    }
}

impl Peripheral for MockSerial {
    fn is_interrupt(&self) -> bool {
        self.irq
    }
}

impl SerialPort for MockSerial {
    fn read(&mut self, register: u8) -> u8 {
        self.reads += 1;
        0xE0 | register
    }

    fn write(&mut self, register: u8, value: u8) {
        self.writes.push((register, value));
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.irq = false;
    }

    fn set_input(&mut self, enabled: bool) {
        self.input = enabled;
    }

    fn event(&mut self) {
        self.events += 1;
    }

    fn trace(&mut self, _enabled: bool) {}
}

pub struct MockDisk {
    pub writes: Vec<(u8, u8)>,
    pub resets: usize,
}

impl MockDisk {
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            resets: 0,
        }
    }
}

impl DiskController for MockDisk {
    fn read(&mut self, register: u8) -> u8 {
        0xD0 | register
    }

    fn write(&mut self, register: u8, value: u8) {
        self.writes.push((register, value));
    }

    fn reset(&mut self) {
        self.resets += 1;
    }

    fn trace(&mut self, _enabled: bool) {}
}

pub struct MockClock {
    pub writes: Vec<u8>,
    pub output: u8,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            output: 0,
        }
    }
}

impl ClockChip for MockClock {
    fn read(&mut self) -> u8 {
        self.output
    }

    fn write(&mut self, value: u8) {
        self.writes.push(value);
    }

    fn reset(&mut self) {}

    fn trace(&mut self, _enabled: bool) {}
}
