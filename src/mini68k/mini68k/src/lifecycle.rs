use crate::terminal::Terminal;
use log::{info, warn};
use mini68k_core::cpu::CpuCore;
use mini68k_core::memory::{ClockChip, DiskController, MemoryMap, SerialPort};
use mini68k_peripherals::Ds1302;
use std::io;
use std::path::PathBuf;

/// Board level reset and the orderly exit path
pub struct DeviceLifecycle {
    nvram_path: PathBuf,
    nvram_loaded: bool,
    terminal: Terminal,
    shut_down: bool,
}

impl DeviceLifecycle {
    pub fn new<P: Into<PathBuf>>(nvram_path: P, terminal: Terminal) -> Self {
        DeviceLifecycle {
            nvram_path: nvram_path.into(),
            nvram_loaded: false,
            terminal,
            shut_down: false,
        }
    }

    /// Pull in the clock RAM. A missing file still counts as loaded so the
    /// first shutdown creates it.
    pub fn load_nvram(&mut self, rtc: &mut Ds1302) {
        match rtc.load(&self.nvram_path) {
            Ok(()) => {
                info!("NVRAM loaded from {}", self.nvram_path.display());
                self.nvram_loaded = true;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no NVRAM at {}, starting clear", self.nvram_path.display());
                self.nvram_loaded = true;
            }
            Err(e) => {
                warn!("NVRAM {} not loaded: {}", self.nvram_path.display(), e);
                self.nvram_loaded = false;
            }
        }
    }

    pub fn nvram_loaded(&self) -> bool {
        self.nvram_loaded
    }

    /// Peripheral reset line: startup and every RESET instruction
    pub fn reset<S, D, C>(&mut self, map: &mut MemoryMap<S, D, C>, cpu: &mut dyn CpuCore)
    where
        S: SerialPort,
        D: DiskController,
        C: ClockChip,
    {
        map.io_mut().disk_mut().reset();
        let serial = map.io_mut().serial_mut();
        serial.reset();
        serial.set_input(true);
        cpu.set_irq(0);
    }

    /// Save the clock RAM and hand the terminal back; runs once
    pub fn shutdown<S, D>(&mut self, map: &MemoryMap<S, D, Ds1302>)
    where
        S: SerialPort,
        D: DiskController,
    {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if self.nvram_loaded {
            if let Err(e) = map.io().clock().save(&self.nvram_path) {
                warn!("NVRAM {} not saved: {}", self.nvram_path.display(), e);
            }
        }
        self.terminal.restore();
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;
    use crate::cpu::ResetOnlyCore;
    use mini68k_core::constants::address_space::ROM_SIZE;
    use mini68k_core::memory::{Bus, ReadOnlyMemory};
    use mini68k_peripherals::{Console, ConsoleStatus, Ppide, Uart16x50};
    use std::collections::VecDeque;
    use std::fs;

    #[derive(Default)]
    struct Keyboard {
        keys: VecDeque<u8>,
    }

    impl Console for Keyboard {
        fn poll(&mut self) -> ConsoleStatus {
            ConsoleStatus {
                input: !self.keys.is_empty(),
                output: true,
            }
        }

        fn read_byte(&mut self) -> u8 {
            self.keys.pop_front().unwrap_or(0)
        }

        fn write_byte(&mut self, _byte: u8) {}
    }

    type Board = MemoryMap<Uart16x50<Keyboard>, Ppide, Ds1302>;

    fn fixed_time() -> u64 {
        0
    }

    fn board() -> Board {
        let rom = ReadOnlyMemory::new(&vec![0u8; ROM_SIZE]).unwrap();
        MemoryMap::new(
            rom,
            Uart16x50::new(Keyboard::default()),
            Ppide::new("hd0"),
            Ds1302::with_time_source(fixed_time),
        )
    }

    fn scratch(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mini68k-{}-{}", name, std::process::id()));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn test_reset_enables_serial_input() {
        let mut map = board();
        let mut cpu = ResetOnlyCore::new();
        let mut lifecycle = DeviceLifecycle::new(scratch("reset"), Terminal::detached());
        // Vector fetch retires the boot overlay
        cpu.pulse_reset(&mut map);
        map.io_mut().serial_mut().console_mut().keys.push_back(b'k');

        map.io_mut().serial_mut().event();
        assert_eq!(map.io().serial().console().keys.len(), 1);

        cpu.set_irq(1);
        lifecycle.reset(&mut map, &mut cpu);
        assert_eq!(cpu.irq(), 0);
        map.io_mut().serial_mut().event();
        assert!(map.io().serial().console().keys.is_empty());
        // UART data register through the I/O window
        assert_eq!(map.read_byte(0xFF_0048), b'k');
    }

    #[test]
    fn test_missing_nvram_created_on_shutdown() {
        let path = scratch("fresh");
        let mut map = board();
        let mut lifecycle = DeviceLifecycle::new(&path, Terminal::detached());
        lifecycle.load_nvram(map.io_mut().clock_mut());
        assert!(lifecycle.nvram_loaded());

        lifecycle.shutdown(&map);
        assert_eq!(fs::read(&path).unwrap().len(), 31);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unreadable_nvram_not_saved() {
        let path = scratch("short");
        fs::write(&path, [1u8, 2, 3]).unwrap();
        let mut map = board();
        let mut lifecycle = DeviceLifecycle::new(&path, Terminal::detached());
        lifecycle.load_nvram(map.io_mut().clock_mut());
        assert!(!lifecycle.nvram_loaded());

        lifecycle.shutdown(&map);
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_nvram_round_trip() {
        let path = scratch("saved");
        let image: Vec<u8> = (0..31).collect();
        fs::write(&path, &image).unwrap();
        let mut map = board();
        let mut lifecycle = DeviceLifecycle::new(&path, Terminal::detached());
        lifecycle.load_nvram(map.io_mut().clock_mut());
        assert_eq!(&map.io().clock().nvram()[..], &image[..]);

        fs::write(&path, [0u8; 31]).unwrap();
        lifecycle.shutdown(&map);
        lifecycle.shutdown(&map);
        assert_eq!(fs::read(&path).unwrap(), image);
        fs::remove_file(&path).unwrap();
    }
}
