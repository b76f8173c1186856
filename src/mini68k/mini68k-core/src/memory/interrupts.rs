use crate::constants::ns32202::*;
use log::debug;

/// How a register of the NS32202 responds to the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegisterKind {
    /// Stored and returned verbatim
    Plain,
    /// SVCT: shares HVCT's storage, writes only touch the high nibble
    SoftwareVector,
    /// IPND pair, owned by raise()
    Pending,
    /// FPRT low byte, accepted but not acted on
    FirstPriority,
    /// FPRT high byte
    ReadOnly,
    /// CCTL, decrement-clock status bits never latch
    CounterControl,
    /// CICTL, two independently enabled halves
    CounterInterruptControl,
}

use RegisterKind::*;

const REGISTER_KINDS: [RegisterKind; REGISTER_COUNT] = [
    Plain,                   // HVCT
    SoftwareVector,          // SVCT
    Plain,                   // ELTG
    Plain,                   // ELTG + 1
    Plain,                   // TPR
    Plain,                   // TPR + 1
    Pending,                 // IPND
    Pending,                 // IPND + 1
    Plain,                   // ISRV
    Plain,                   // ISRV + 1
    Plain,                   // IMSK
    Plain,                   // IMSK + 1
    Plain,                   // CSRC
    Plain,                   // CSRC + 1
    FirstPriority,           // FPRT
    ReadOnly,                // FPRT + 1
    Plain,                   // MCTL
    Plain,                   // OCASN
    Plain,                   // CIPTR
    Plain,                   // PDAT, no GPIO attached
    Plain,                   // IPS
    Plain,                   // PDIR
    CounterControl,          // CCTL
    CounterInterruptControl, // CICTL
    Plain,                   // CSV
    Plain,                   // CSV + 1
    Plain,                   // CSV + 2
    Plain,                   // CSV + 3
    Plain,                   // CCV, readable at any time
    Plain,                   // CCV + 1
    Plain,                   // CCV + 2
    Plain,                   // CCV + 3
];

/// Whether the controller drives the CPU's interrupt lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Pending and mask state is kept but never reaches the CPU
    NotWired,
}

/// Register level model of the NS32202 interrupt control unit.
///
/// Vector computation, priority resolution, the counters and interrupt
/// delivery are not modelled: raising a source only records it in IPND.
pub struct InterruptController {
    registers: [u8; REGISTER_COUNT],
}

impl InterruptController {
    pub fn new() -> Self {
        Self {
            registers: [0; REGISTER_COUNT],
        }
    }

    /// Everything cleared, all sources masked
    pub fn reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.registers[REGISTER_IMSK] = 0xFF;
        self.registers[REGISTER_IMSK + 1] = 0xFF;
        self.registers[REGISTER_CIPTR] = 0xFF;
    }

    /// Register index selected by A8-A12 of a 16-bit I/O address
    pub fn register_index(io_address: u16) -> usize {
        ((io_address >> REGISTER_SHIFT) & REGISTER_MASK) as usize
    }

    pub fn read_register(&self, offset: usize) -> u8 {
        let offset = offset % REGISTER_COUNT;
        match REGISTER_KINDS[offset] {
            // No acknowledge or HVCT recompute on read
            SoftwareVector => self.registers[REGISTER_HVCT],
            _ => self.registers[offset],
        }
    }

    pub fn write_register(&mut self, offset: usize, value: u8) {
        let offset = offset % REGISTER_COUNT;
        debug!("NS32202 write reg {} <- {:02X}", offset, value);
        let reg = &mut self.registers;
        match REGISTER_KINDS[offset] {
            Plain => reg[offset] = value,
            SoftwareVector => {
                reg[REGISTER_HVCT] = (reg[REGISTER_HVCT] & 0x0F) | (value & 0xF0);
            }
            Pending | FirstPriority | ReadOnly => {}
            // The board firmware's model masks then overwrites, latching the
            // raw value; here CDCRL/CDCRH are dropped as the chip does
            CounterControl => reg[offset] = value & CCTL_WRITE_MASK,
            CounterInterruptControl => {
                if value & CICTL_LOW_ENABLE != 0 {
                    reg[offset] = (reg[offset] & 0xF0) | (value & CICTL_LOW_MASK);
                }
                if value & CICTL_HIGH_ENABLE != 0 {
                    reg[offset] = (reg[offset] & 0x0F) | (value & CICTL_HIGH_MASK);
                }
            }
        }
    }

    /// Latch interrupt source 0-15 into IPND unless the unit is frozen
    pub fn raise(&mut self, source: u8) {
        if self.registers[REGISTER_MCTL] & MCTL_FREEZE != 0 {
            return;
        }
        let bit = 1 << (source & 7);
        let half = if source & 8 != 0 { 1 } else { 0 };
        self.registers[REGISTER_IPND + half] |= bit;
    }

    /// Withdrawing a request is not modelled
    pub fn clear(&mut self, _source: u8) {}

    /// IPND pair as a 16-bit source mask
    pub fn pending(&self) -> u16 {
        u16::from_le_bytes([
            self.registers[REGISTER_IPND],
            self.registers[REGISTER_IPND + 1],
        ])
    }

    pub fn delivery(&self) -> Delivery {
        Delivery::NotWired
    }
}
