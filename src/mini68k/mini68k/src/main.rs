extern crate clap;
use crossbeam_channel::{bounded, Receiver};
use log::{error, info, warn};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

use mini68k_core::constants::timing::{BURST_CYCLES, NAP_NANOS};
use mini68k_core::cpu::CpuCore;
use mini68k_core::memory::{
    ClockChip, DiskController, MemoryMap, ReadOnlyMemory, RomError, SerialPort,
};
use mini68k_peripherals::{DiskError, Ds1302, Ppide, Uart16x50};

mod config;
mod cpu;
mod lifecycle;
mod terminal;

use config::Config;
use cpu::ResetOnlyCore;
use lifecycle::DeviceLifecycle;
use terminal::{StdioConsole, Terminal};

pub const NVRAM_FILE: &str = "mini68k.nvram";

// A run ended by a signal reports failure to the shell
const SIGNAL_EXIT_STATUS: i32 = 1;

// Set from the SIGQUIT handler, polled between bursts
static QUIT_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Fatal conditions found before the board starts running
#[derive(Debug, Error)]
enum StartupError {
    #[error("cannot read ROM image {path}: {source}")]
    RomUnreadable { path: String, source: io::Error },
    #[error("ROM image {path} unusable: {reason}")]
    RomInvalid { path: String, reason: RomError },
    #[error("cannot open disk image {path}: {source}")]
    DiskUnopenable { path: String, source: io::Error },
    #[error("disk image {path} rejected: {source}")]
    DiskRejected { path: String, source: DiskError },
    #[error("signal handler failed: {0}")]
    Signals(#[from] ctrlc::Error),
}

/// Why the run loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    /// SIGTERM or SIGHUP
    Terminated,
    /// SIGQUIT
    Quit,
}

extern "C" fn quit_handler(_signal: libc::c_int) {
    QUIT_REQUESTED.store(true, Ordering::SeqCst);
}

fn pending_stop(signal_receiver: &Receiver<()>, quit: &AtomicBool) -> Option<StopReason> {
    if !signal_receiver.is_empty() {
        Some(StopReason::Terminated)
    } else if quit.load(Ordering::SeqCst) {
        Some(StopReason::Quit)
    } else {
        None
    }
}

/// SIGTERM and SIGHUP arrive on the channel, SIGQUIT through the flag.
/// SIGINT and SIGTSTP belong to the guest and are ignored.
fn install_signal_handlers(
    saved_mode: Option<libc::termios>,
) -> Result<Receiver<()>, StartupError> {
    let (signal_sender, signal_receiver) = bounded(1);
    ctrlc::set_handler(move || {
        if signal_sender.is_full() {
            // Second signal while the loop is stuck: no NVRAM save, but the
            // shell gets its terminal back
            if let Some(mode) = &saved_mode {
                let _ = terminal::restore_mode(mode);
            }
            std::process::exit(SIGNAL_EXIT_STATUS);
        }
        let _send_result = signal_sender.send(());
    })?;

    let quit = quit_handler as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_IGN);
        libc::signal(libc::SIGTSTP, libc::SIG_IGN);
        libc::signal(libc::SIGQUIT, quit as libc::sighandler_t);
    }
    Ok(signal_receiver)
}

fn load_rom(path: &Path) -> Result<ReadOnlyMemory, StartupError> {
    let image = fs::read(path).map_err(|source| StartupError::RomUnreadable {
        path: path.display().to_string(),
        source,
    })?;
    let rom = ReadOnlyMemory::new(&image).map_err(|reason| StartupError::RomInvalid {
        path: path.display().to_string(),
        reason,
    })?;
    info!("ROM {} loaded", path.display());
    Ok(rom)
}

fn attach_disk(disk: &mut Ppide, path: &Path) -> Result<(), StartupError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| StartupError::DiskUnopenable {
            path: path.display().to_string(),
            source,
        })?;
    disk.attach(0, file)
        .map_err(|source| StartupError::DiskRejected {
            path: path.display().to_string(),
            source,
        })
}

fn run(config: &Config) -> Result<StopReason, StartupError> {
    let rom = load_rom(&config.rom_path)?;
    let mut disk = Ppide::new("hd0");
    if let Some(path) = &config.disk_path {
        attach_disk(&mut disk, path)?;
    }

    let terminal = Terminal::setup();
    let signal_receiver = install_signal_handlers(terminal.saved_mode())?;

    let mut rtc = Ds1302::new();
    let mut lifecycle = DeviceLifecycle::new(NVRAM_FILE, terminal);
    lifecycle.load_nvram(&mut rtc);

    let serial = Uart16x50::new(StdioConsole::new());
    let mut memory_map = MemoryMap::new(rom, serial, disk, rtc);

    let trace = config.trace;
    memory_map.set_trace(trace.mem());
    memory_map.io_mut().serial_mut().trace(trace.uart());
    memory_map.io_mut().disk_mut().trace(trace.ppide());
    memory_map.io_mut().clock_mut().trace(trace.rtc());

    let mut cpu = ResetOnlyCore::new();
    cpu.set_cpu_type(config.cpu_type);
    cpu.set_trace(trace.cpu());
    cpu.pulse_reset(&mut memory_map);
    lifecycle.reset(&mut memory_map, &mut cpu);

    let nap = Duration::from_nanos(NAP_NANOS);
    let reason = loop {
        let burst = cpu.execute(&mut memory_map, BURST_CYCLES);
        if burst.reset_pulse {
            lifecycle.reset(&mut memory_map, &mut cpu);
        }
        memory_map.io_mut().serial_mut().event();
        cpu.set_irq(memory_map.check_interrupts());

        if !config.fast {
            std::thread::sleep(nap);
        }

        if let Some(reason) = pending_stop(&signal_receiver, &QUIT_REQUESTED) {
            break reason;
        }
    };

    lifecycle.shutdown(&memory_map);
    info!("stopped at PC {:06X}", cpu.pc());
    Ok(reason)
}

fn main() {
    let matches = config::cli().get_matches();
    let config = match Config::from_matches(&matches) {
        Ok(config) => config,
        Err(e) => e.exit(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.trace.log_filter()),
    )
    .init();

    match run(&config) {
        Ok(reason) => {
            warn!("stopped by {:?}", reason);
            std::process::exit(SIGNAL_EXIT_STATUS);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
