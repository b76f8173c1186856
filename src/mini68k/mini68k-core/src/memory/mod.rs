mod interrupts;
pub mod io;
mod memory;
pub mod mods;
mod overlay;
mod registers;
mod rom;
#[cfg(test)]
pub(crate) mod testing;

pub use interrupts::{Delivery, InterruptController};
pub use io::{IoController, IoDevice};
pub use mods::{ClockChip, DiskController, Peripheral, SerialPort};
pub use overlay::{OverlayState, RomOverlay};
pub use registers::BoardConfig;
pub use rom::{ReadOnlyMemory, RomError};

use crate::constants::address_space::*;
use crate::constants::ADDRESS_MASK;
use crate::cpu;
use log::info;

/// Log target for memory trace records
pub const MEM_TARGET: &str = "mini68k::mem";

/// Byte-addressed backing store
trait MemoryType {
    fn read(&self, offset: u32) -> u8;
    fn write(&mut self, offset: u32, value: u8);
}

/// Size of a CPU bus access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
    Long,
}

impl Width {
    pub fn bytes(self) -> u32 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
            Width::Long => 4,
        }
    }

    fn mnemonic(self) -> char {
        match self {
            Width::Byte => 'B',
            Width::Word => 'W',
            Width::Long => 'L',
        }
    }
}

/// Nominal decode of the board address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Ram,
    Banked,
    OffBoard,
    Rom,
    Io,
}

const REGION_MAP: [(u32, u32, Region); 5] = [
    (RAM_START, RAM_END, Region::Ram),
    (BANKED_START, BANKED_END, Region::Banked),
    (OFF_BOARD_START, OFF_BOARD_END, Region::OffBoard),
    (ROM_START, ROM_END, Region::Rom),
    (IO_START, IO_END, Region::Io),
];

/// Region an address falls in once folded onto the 22 decoded lines
pub fn decode_region(address: u32) -> Region {
    let address = address & ADDRESS_MASK;
    REGION_MAP
        .iter()
        .find(|(start, end, _)| *start <= address && address < *end)
        .map(|(_, _, region)| *region)
        .unwrap_or(Region::Io)
}

/// What the CPU core sees of the board
pub trait Bus {
    /// Big-endian access of `width`; `debug` marks a side-effect free probe
    fn read(&mut self, address: u32, width: Width, debug: bool) -> u32;
    fn write(&mut self, address: u32, width: Width, value: u32);

    fn read_byte(&mut self, address: u32) -> u8 {
        self.read(address, Width::Byte, false) as u8
    }

    fn read_word(&mut self, address: u32) -> u16 {
        self.read(address, Width::Word, false) as u16
    }

    fn read_long(&mut self, address: u32) -> u32 {
        self.read(address, Width::Long, false)
    }

    /// Disassembler fetches, never clock the overlay or touch devices
    fn read_word_dasm(&mut self, address: u32) -> u16 {
        self.read(address, Width::Word, true) as u16
    }

    fn read_long_dasm(&mut self, address: u32) -> u32 {
        self.read(address, Width::Long, true)
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        self.write(address, Width::Byte, value as u32)
    }

    fn write_word(&mut self, address: u32, value: u16) {
        self.write(address, Width::Word, value as u32)
    }

    fn write_long(&mut self, address: u32, value: u32) {
        self.write(address, Width::Long, value)
    }

    /// Long write from a predecrement mode: low word goes out first
    fn write_long_predec(&mut self, address: u32, value: u32) {
        self.write(address.wrapping_add(2), Width::Word, value & 0xFFFF);
        self.write(address, Width::Word, value >> 16);
    }
}

/// The whole Mini68K address space: RAM, boot ROM with its overlay latch,
/// and the MF/PIC I/O devices
pub struct MemoryMap<S, D, C> {
    ram: memory::Ram,
    rom: rom::ReadOnlyMemory,
    overlay: overlay::RomOverlay,
    io: io::IoController<S, D, C>,
    trace_mem: bool,
}

impl<S: SerialPort, D: DiskController, C: ClockChip> MemoryMap<S, D, C> {
    pub fn new(rom: ReadOnlyMemory, serial: S, disk: D, clock: C) -> Self {
        let mut map = Self {
            ram: memory::Ram::new(),
            rom,
            overlay: overlay::RomOverlay::new(),
            io: io::IoController::new(serial, disk, clock),
            trace_mem: false,
        };
        map.reset();
        map
    }

    /// Power-on reset of the board logic; RAM keeps its contents
    pub fn reset(&mut self) {
        self.overlay.reset();
        self.io.reset();
    }

    pub fn set_trace(&mut self, enabled: bool) {
        self.trace_mem = enabled;
    }

    pub fn overlay_state(&self) -> OverlayState {
        self.overlay.state()
    }

    pub fn io(&self) -> &io::IoController<S, D, C> {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut io::IoController<S, D, C> {
        &mut self.io
    }

    /// Interrupt level the CPU should see right now
    pub fn check_interrupts(&self) -> u8 {
        cpu::recompute_interrupt_line(self.io.serial().is_interrupt())
    }

    /// Answer an interrupt acknowledge cycle; `None` means spurious
    pub fn acknowledge_interrupt(&mut self, level: u8) -> Option<u8> {
        cpu::acknowledge_interrupt(level)
    }

    fn read_cycle(&mut self, address: u32, debug: bool) -> u8 {
        let address = address & ADDRESS_MASK;
        let forced = self.overlay.is_active();
        if !debug {
            self.overlay.clock();
        }
        if forced {
            return self.rom.read(address);
        }

        match decode_region(address) {
            Region::Ram => self.ram.read(address),
            Region::Banked | Region::OffBoard => UNMAPPED_VALUE,
            Region::Rom => self.rom.read(address),
            // The disassembler must not trigger I/O side effects
            Region::Io if debug => UNMAPPED_VALUE,
            Region::Io => self.io.read_port(address as u16),
        }
    }

    fn write_cycle(&mut self, address: u32, value: u8) {
        let address = address & ADDRESS_MASK;
        let forced = self.overlay.is_active();
        self.overlay.clock();
        if forced {
            self.rom.write(address, value);
            return;
        }

        match decode_region(address) {
            Region::Ram => self.ram.write(address, value),
            Region::Banked | Region::OffBoard => {
                if self.trace_mem {
                    info!(target: MEM_TARGET, "{:06X}: write to invalid space.", address);
                }
            }
            Region::Rom => self.rom.write(address, value),
            Region::Io => self.io.write_port(address as u16, value),
        }
    }

    fn read_bytes(&mut self, address: u32, count: u32, debug: bool) -> u32 {
        (0..count).fold(0, |value, i| {
            (value << 8) | self.read_cycle(address.wrapping_add(i), debug) as u32
        })
    }

    fn write_bytes(&mut self, address: u32, count: u32, value: u32) {
        for i in 0..count {
            let shift = 8 * (count - 1 - i);
            self.write_cycle(address.wrapping_add(i), (value >> shift) as u8);
        }
    }
}

impl<S: SerialPort, D: DiskController, C: ClockChip> Bus for MemoryMap<S, D, C> {
    fn read(&mut self, address: u32, width: Width, debug: bool) -> u32 {
        let value = self.read_bytes(address, width.bytes(), debug);
        if self.trace_mem && !debug {
            info!(
                target: MEM_TARGET,
                "R{} {:06X} -> {:0digits$X}",
                width.mnemonic(),
                address & 0xFF_FFFF,
                value,
                digits = 2 * width.bytes() as usize
            );
        }
        value
    }

    fn write(&mut self, address: u32, width: Width, value: u32) {
        if self.trace_mem {
            info!(
                target: MEM_TARGET,
                "W{} {:06X} <- {:0digits$X}",
                width.mnemonic(),
                address & 0xFF_FFFF,
                value,
                digits = 2 * width.bytes() as usize
            );
        }
        self.write_bytes(address, width.bytes(), value);
    }
}
