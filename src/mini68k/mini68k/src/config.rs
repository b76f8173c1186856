use clap::{value_t, App, Arg, ArgGroup, ArgMatches};
use mini68k_core::constants::trace::{TRACE_CPU, TRACE_MEM, TRACE_PPIDE, TRACE_RTC, TRACE_UART};
use mini68k_core::cpu::CpuType;
use std::path::PathBuf;

pub const DEFAULT_ROM: &str = "mini-128.rom";

/// Trace bitmask given with `-d`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceFlags(u32);

// Log target for each trace bit
const TRACE_TARGETS: [(u32, &str); 5] = [
    (TRACE_MEM, "mini68k::mem"),
    (TRACE_CPU, "mini68k::cpu"),
    (TRACE_UART, "mini68k::uart"),
    (TRACE_PPIDE, "mini68k::ppide"),
    (TRACE_RTC, "mini68k::rtc"),
];

impl TraceFlags {
    pub fn new(mask: u32) -> Self {
        TraceFlags(mask)
    }

    fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn mem(self) -> bool {
        self.has(TRACE_MEM)
    }

    pub fn cpu(self) -> bool {
        self.has(TRACE_CPU)
    }

    pub fn uart(self) -> bool {
        self.has(TRACE_UART)
    }

    pub fn ppide(self) -> bool {
        self.has(TRACE_PPIDE)
    }

    pub fn rtc(self) -> bool {
        self.has(TRACE_RTC)
    }

    /// env_logger filter: `warn` everywhere, `info` for traced subsystems
    pub fn log_filter(self) -> String {
        let mut filter = String::from("warn");
        for (bit, target) in TRACE_TARGETS.iter() {
            if self.has(*bit) {
                filter.push(',');
                filter.push_str(target);
                filter.push_str("=info");
            }
        }
        filter
    }
}

/// Run configuration folded from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cpu_type: CpuType,
    pub fast: bool,
    pub trace: TraceFlags,
    pub rom_path: PathBuf,
    pub disk_path: Option<PathBuf>,
}

pub fn cli<'a, 'b>() -> App<'a, 'b> {
    App::new("mini68k")
        .version("0.1")
        .about("Mini68K single board computer emulator")
        .arg(
            Arg::with_name("m68000")
                .short("0")
                .help("Fit a 68000 (default)"),
        )
        .arg(Arg::with_name("m68010").short("1").help("Fit a 68010"))
        .arg(Arg::with_name("m68020").short("2").help("Fit a 68020"))
        .arg(Arg::with_name("m68ec020").short("e").help("Fit a 68EC020"))
        .group(ArgGroup::with_name("cpu").args(&["m68000", "m68010", "m68020", "m68ec020"]))
        .arg(
            Arg::with_name("fast")
                .short("f")
                .help("Run unthrottled"),
        )
        .arg(
            Arg::with_name("debug")
                .short("d")
                .takes_value(true)
                .value_name("MASK")
                .help("Trace mask: 1 memory, 2 CPU, 4 UART, 8 PPIDE, 16 RTC"),
        )
        .arg(
            Arg::with_name("disk")
                .short("i")
                .takes_value(true)
                .value_name("PATH")
                .help("IDE disk image"),
        )
        .arg(
            Arg::with_name("rom")
                .short("r")
                .takes_value(true)
                .value_name("PATH")
                .default_value(DEFAULT_ROM)
                .help("Boot ROM image"),
        )
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let cpu_type = if matches.is_present("m68010") {
            CpuType::M68010
        } else if matches.is_present("m68020") {
            CpuType::M68020
        } else if matches.is_present("m68ec020") {
            CpuType::M68EC020
        } else {
            CpuType::M68000
        };

        let trace = if matches.is_present("debug") {
            TraceFlags::new(value_t!(matches, "debug", u32)?)
        } else {
            TraceFlags::default()
        };

        Ok(Config {
            cpu_type,
            fast: matches.is_present("fast"),
            trace,
            rom_path: PathBuf::from(matches.value_of("rom").unwrap_or(DEFAULT_ROM)),
            disk_path: matches.value_of("disk").map(PathBuf::from),
        })
    }
}
