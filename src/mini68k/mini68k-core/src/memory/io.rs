use super::interrupts::InterruptController;
use super::mods::{ClockChip, DiskController, SerialPort};
use super::registers::BoardConfig;
use crate::constants::address_space::UNMAPPED_VALUE;
use crate::constants::ports::*;
use crate::utils::{rtc_remap_read, rtc_remap_write};

use log::trace;

/// Devices on the MF/PIC board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoDevice {
    InterruptController,
    BoardConfig,
    Clock,
    Disk,
    Serial,
}

/// Inclusive range of low address bytes owned by one device
#[derive(Debug, Clone, Copy)]
pub struct PortRange {
    pub first: u8,
    pub last: u8,
    pub device: IoDevice,
}

impl PortRange {
    pub fn contains(&self, port: u8) -> bool {
        self.first <= port && port <= self.last
    }
}

/// Decode table, ranges must not overlap
pub const IO_MAP: [PortRange; 5] = [
    PortRange {
        first: PORT_NS32202,
        last: PORT_NS32202,
        device: IoDevice::InterruptController,
    },
    PortRange {
        first: PORT_CONFIG,
        last: PORT_CONFIG,
        device: IoDevice::BoardConfig,
    },
    PortRange {
        first: PORT_RTC,
        last: PORT_RTC,
        device: IoDevice::Clock,
    },
    PortRange {
        first: PORT_PPIDE_FIRST,
        last: PORT_PPIDE_LAST,
        device: IoDevice::Disk,
    },
    PortRange {
        first: PORT_UART_FIRST,
        last: PORT_UART_LAST,
        device: IoDevice::Serial,
    },
];

/// Device owning the low byte of an I/O address, if any
pub fn decode_port(port: u8) -> Option<IoDevice> {
    IO_MAP
        .iter()
        .find(|range| range.contains(port))
        .map(|range| range.device)
}

/// Routes ECB bus I/O cycles to the MF/PIC devices
pub struct IoController<S, D, C> {
    icu: InterruptController,
    config: BoardConfig,
    serial: S,
    disk: D,
    clock: C,
}

impl<S: SerialPort, D: DiskController, C: ClockChip> IoController<S, D, C> {
    pub fn new(serial: S, disk: D, clock: C) -> Self {
        Self {
            icu: InterruptController::new(),
            config: BoardConfig::new(),
            serial,
            disk,
            clock,
        }
    }

    /// Board level reset of the registers this controller owns
    pub fn reset(&mut self) {
        self.icu.reset();
        self.config.reset();
    }

    /// Read from a 16-bit I/O address; unassigned ports float high
    pub fn read_port(&mut self, address: u16) -> u8 {
        let port = (address & 0xFF) as u8;
        let value = match decode_port(port) {
            Some(IoDevice::InterruptController) => self
                .icu
                .read_register(InterruptController::register_index(address)),
            Some(IoDevice::BoardConfig) => self.config.read(),
            Some(IoDevice::Clock) => rtc_remap_read(self.clock.read()),
            Some(IoDevice::Disk) => self.disk.read(port & PPIDE_REGISTER_MASK),
            Some(IoDevice::Serial) => self.serial.read(port & UART_REGISTER_MASK),
            None => UNMAPPED_VALUE,
        };
        trace!("I/O read {:04X} -> {:02X}", address, value);
        value
    }

    /// Write to a 16-bit I/O address; unassigned ports ignore the cycle
    pub fn write_port(&mut self, address: u16, value: u8) {
        let port = (address & 0xFF) as u8;
        trace!("I/O write {:04X} <- {:02X}", address, value);
        match decode_port(port) {
            Some(IoDevice::InterruptController) => self
                .icu
                .write_register(InterruptController::register_index(address), value),
            Some(IoDevice::BoardConfig) => self.config.write(value),
            Some(IoDevice::Clock) => self.clock.write(rtc_remap_write(value)),
            Some(IoDevice::Disk) => self.disk.write(port & PPIDE_REGISTER_MASK, value),
            Some(IoDevice::Serial) => self.serial.write(port & UART_REGISTER_MASK, value),
            None => {}
        }
    }

    pub fn interrupt_controller(&self) -> &InterruptController {
        &self.icu
    }

    pub fn interrupt_controller_mut(&mut self) -> &mut InterruptController {
        &mut self.icu
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    pub fn disk_mut(&mut self) -> &mut D {
        &mut self.disk
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}
