use log::{debug, info};
use mini68k_core::memory::ClockChip;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const RTC_TARGET: &str = "mini68k::rtc";

pub const NVRAM_SIZE: usize = 31;

// Physical lines as seen by the chip
const PIN_DATA: u8 = 0x80;
const PIN_CLOCK: u8 = 0x40;
const PIN_WRITE_N: u8 = 0x20;
const PIN_ENABLE: u8 = 0x10;

// Command byte
const CMD_VALID: u8 = 0x80;
const CMD_RAM: u8 = 0x40;
const CMD_READ: u8 = 0x01;
const BURST_ADDRESS: u8 = 31;

// Clock register file
const REG_SECONDS: usize = 0;
const REG_WRITE_PROTECT: usize = 7;
const REG_TRICKLE: usize = 8;
const CLOCK_BURST_LEN: usize = 8;

const WRITE_PROTECT: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Command,
    WriteData,
    ReadData,
}

/// DS1302 timekeeper driven by bit-banged lines, with 31 bytes of
/// battery backed RAM. Time comes from the host clock.
pub struct Ds1302 {
    lines: u8,
    phase: Phase,
    shift: u8,
    bits: u8,
    command: u8,
    address: usize,
    output: u8,
    clock_regs: [u8; 9],
    ram: [u8; NVRAM_SIZE],
    now: fn() -> u64,
    trace: bool,
}

fn host_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn bcd(value: u32) -> u8 {
    (((value / 10) << 4) | (value % 10)) as u8
}

/// Civil date from days since 1970-01-01
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

impl Ds1302 {
    pub fn new() -> Self {
        Self::with_time_source(host_seconds)
    }

    /// Clock reading a caller supplied Unix time, for tests
    pub fn with_time_source(now: fn() -> u64) -> Self {
        let mut rtc = Self {
            lines: 0,
            phase: Phase::Idle,
            shift: 0,
            bits: 0,
            command: 0,
            address: 0,
            output: 0,
            clock_regs: [0; 9],
            ram: [0; NVRAM_SIZE],
            now,
            trace: false,
        };
        rtc.reset();
        rtc
    }

    pub fn nvram(&self) -> &[u8; NVRAM_SIZE] {
        &self.ram
    }

    /// Load battery backed RAM; a short file leaves the RAM untouched
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> io::Result<()> {
        let data = fs::read(path)?;
        if data.len() < NVRAM_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "nvram image too short",
            ));
        }
        self.ram.copy_from_slice(&data[..NVRAM_SIZE]);
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fs::write(path, &self.ram[..])
    }

    fn clock_register(&self, index: usize) -> u8 {
        let seconds = (self.now)();
        let days = (seconds / 86_400) as i64;
        let secs_of_day = (seconds % 86_400) as u32;
        let (year, month, day) = civil_from_days(days);
        match index {
            REG_SECONDS => bcd(secs_of_day % 60),
            1 => bcd(secs_of_day / 60 % 60),
            2 => bcd(secs_of_day / 3600),
            3 => bcd(day),
            4 => bcd(month),
            // 1 = Sunday, 1970-01-01 was a Thursday
            5 => ((days + 4).rem_euclid(7) + 1) as u8,
            6 => bcd((year % 100) as u32),
            _ => self.clock_regs.get(index).copied().unwrap_or(0),
        }
    }

    fn read_target(&self) -> u8 {
        if self.command & CMD_RAM != 0 {
            self.ram.get(self.address).copied().unwrap_or(0)
        } else {
            self.clock_register(self.address)
        }
    }

    fn write_target(&mut self, value: u8) {
        let protected = self.clock_regs[REG_WRITE_PROTECT] & WRITE_PROTECT != 0;
        if self.command & CMD_RAM != 0 {
            if !protected && self.address < NVRAM_SIZE {
                self.ram[self.address] = value;
            }
        } else if self.address == REG_WRITE_PROTECT {
            self.clock_regs[REG_WRITE_PROTECT] = value & WRITE_PROTECT;
        } else if !protected && self.address <= REG_TRICKLE {
            // Time registers follow the host; only the flags are kept
            debug!("DS1302 clock register {} <- {:02X}", self.address, value);
            self.clock_regs[self.address] = value;
        }
    }

    fn burst_len(&self) -> usize {
        if self.command & CMD_RAM != 0 {
            NVRAM_SIZE
        } else {
            CLOCK_BURST_LEN
        }
    }

    fn next_address(&mut self) {
        if self.command >> 1 & 0x1F == BURST_ADDRESS {
            self.address = (self.address + 1) % self.burst_len();
        }
    }

    fn command_received(&mut self) {
        self.command = self.shift;
        if self.trace {
            info!(target: RTC_TARGET, "command {:02X}", self.command);
        }
        if self.command & CMD_VALID == 0 {
            self.phase = Phase::Idle;
            return;
        }
        let address = self.command >> 1 & 0x1F;
        self.address = if address == BURST_ADDRESS { 0 } else { address as usize };
        self.bits = 0;
        self.shift = 0;
        if self.command & CMD_READ != 0 {
            self.output = self.read_target();
            self.phase = Phase::ReadData;
        } else {
            self.phase = Phase::WriteData;
        }
    }

    fn rising_edge(&mut self, data: bool) {
        match self.phase {
            Phase::Command | Phase::WriteData => {
                self.shift = (self.shift >> 1) | if data { 0x80 } else { 0 };
                self.bits += 1;
                if self.bits < 8 {
                    return;
                }
                if self.phase == Phase::Command {
                    self.command_received();
                } else {
                    if self.trace {
                        info!(target: RTC_TARGET, "write {} <- {:02X}", self.address, self.shift);
                    }
                    self.write_target(self.shift);
                    self.bits = 0;
                    self.shift = 0;
                    self.next_address();
                }
            }
            Phase::Idle | Phase::ReadData => {}
        }
    }

    fn falling_edge(&mut self) {
        if self.phase != Phase::ReadData {
            return;
        }
        // Output presented after the command is the first bit; shift from the second
        if self.bits > 0 {
            self.output >>= 1;
        }
        self.bits += 1;
        if self.bits > 8 {
            self.next_address();
            self.output = self.read_target();
            self.bits = 1;
        }
    }
}

impl Default for Ds1302 {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockChip for Ds1302 {
    fn read(&mut self) -> u8 {
        let bit = if self.phase == Phase::ReadData && self.lines & PIN_WRITE_N != 0 {
            self.output & 1
        } else {
            0
        };
        if self.trace {
            info!(target: RTC_TARGET, "read -> {}", bit);
        }
        bit
    }

    fn write(&mut self, value: u8) {
        let old = self.lines;
        self.lines = value;
        if value & PIN_ENABLE == 0 {
            self.phase = Phase::Idle;
            return;
        }
        if old & PIN_ENABLE == 0 {
            // CE rising starts a new command
            self.phase = Phase::Command;
            self.bits = 0;
            self.shift = 0;
        }
        let clock = value & PIN_CLOCK != 0;
        let was_clock = old & PIN_CLOCK != 0;
        if clock && !was_clock {
            self.rising_edge(value & PIN_DATA != 0);
        } else if !clock && was_clock {
            self.falling_edge();
        }
    }

    fn reset(&mut self) {
        self.lines = 0;
        self.phase = Phase::Idle;
        self.shift = 0;
        self.bits = 0;
    }

    fn trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }
}

#[cfg(test)]
mod rtc_tests {
    use super::*;

    // 2024-02-29 13:45:07 UTC, a Thursday
    fn fixed_time() -> u64 {
        1_709_214_307
    }

    fn send_byte(rtc: &mut Ds1302, byte: u8) {
        for bit in 0..8 {
            let data = if byte >> bit & 1 != 0 { PIN_DATA } else { 0 };
            rtc.write(PIN_ENABLE | data);
            rtc.write(PIN_ENABLE | data | PIN_CLOCK);
        }
    }

    fn receive_byte(rtc: &mut Ds1302) -> u8 {
        let mut value = 0;
        for bit in 0..8 {
            rtc.write(PIN_ENABLE | PIN_WRITE_N);
            value |= rtc.read() << bit;
            rtc.write(PIN_ENABLE | PIN_WRITE_N | PIN_CLOCK);
        }
        value
    }

    fn start(rtc: &mut Ds1302) {
        rtc.write(0);
        rtc.write(PIN_ENABLE);
    }

    fn read_register(rtc: &mut Ds1302, command: u8) -> u8 {
        start(rtc);
        send_byte(rtc, command);
        let value = receive_byte(rtc);
        rtc.write(0);
        value
    }

    fn write_register(rtc: &mut Ds1302, command: u8, value: u8) {
        start(rtc);
        send_byte(rtc, command);
        send_byte(rtc, value);
        rtc.write(0);
    }

    #[test]
    fn test_civil_date() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_782), (2024, 2, 29));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn test_reads_host_time() {
        let mut rtc = Ds1302::with_time_source(fixed_time);
        assert_eq!(read_register(&mut rtc, 0x81), 0x07);
        assert_eq!(read_register(&mut rtc, 0x83), 0x45);
        assert_eq!(read_register(&mut rtc, 0x85), 0x13);
        assert_eq!(read_register(&mut rtc, 0x87), 0x29);
        assert_eq!(read_register(&mut rtc, 0x89), 0x02);
        assert_eq!(read_register(&mut rtc, 0x8B), 5);
        assert_eq!(read_register(&mut rtc, 0x8D), 0x24);
    }

    #[test]
    fn test_ram_write_read() {
        let mut rtc = Ds1302::with_time_source(fixed_time);
        write_register(&mut rtc, 0xC0 | (3 << 1), 0xA5);
        assert_eq!(read_register(&mut rtc, 0xC1 | (3 << 1)), 0xA5);
        assert_eq!(rtc.nvram()[3], 0xA5);
    }

    #[test]
    fn test_write_protect() {
        let mut rtc = Ds1302::with_time_source(fixed_time);
        write_register(&mut rtc, 0x8E, 0x80);
        write_register(&mut rtc, 0xC0, 0x11);
        assert_eq!(rtc.nvram()[0], 0x00);
        write_register(&mut rtc, 0x8E, 0x00);
        write_register(&mut rtc, 0xC0, 0x11);
        assert_eq!(rtc.nvram()[0], 0x11);
    }

    #[test]
    fn test_ram_burst_read() {
        let mut rtc = Ds1302::with_time_source(fixed_time);
        write_register(&mut rtc, 0xC0, 0x10);
        write_register(&mut rtc, 0xC2, 0x20);
        start(&mut rtc);
        send_byte(&mut rtc, 0xFF);
        assert_eq!(receive_byte(&mut rtc), 0x10);
        assert_eq!(receive_byte(&mut rtc), 0x20);
        rtc.write(0);
    }

    #[test]
    fn test_nvram_persistence() {
        let path = std::env::temp_dir().join(format!("mini68k-rtc-{}.nvram", std::process::id()));
        let mut rtc = Ds1302::with_time_source(fixed_time);
        write_register(&mut rtc, 0xC0 | (30 << 1), 0x3C);
        rtc.save(&path).unwrap();

        let mut restored = Ds1302::with_time_source(fixed_time);
        restored.load(&path).unwrap();
        assert_eq!(restored.nvram()[30], 0x3C);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_nvram_file() {
        let mut rtc = Ds1302::with_time_source(fixed_time);
        let err = rtc.load("/nonexistent/mini68k.nvram").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
