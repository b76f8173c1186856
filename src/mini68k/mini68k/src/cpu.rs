use log::{info, warn};
use mini68k_core::cpu::{Burst, CpuCore, CpuType};
use mini68k_core::memory::Bus;

const CPU_TARGET: &str = "mini68k::cpu";

/// Core that performs the reset vector fetch and then holds the bus idle.
/// Stands in until an instruction core is linked behind `CpuCore`.
pub struct ResetOnlyCore {
    cpu_type: CpuType,
    ssp: u32,
    pc: u32,
    irq: u8,
    trace: bool,
    warned: bool,
}

impl ResetOnlyCore {
    pub fn new() -> Self {
        ResetOnlyCore {
            cpu_type: CpuType::default(),
            ssp: 0,
            pc: 0,
            irq: 0,
            trace: false,
            warned: false,
        }
    }

    pub fn ssp(&self) -> u32 {
        self.ssp
    }

    pub fn irq(&self) -> u8 {
        self.irq
    }
}

impl CpuCore for ResetOnlyCore {
    fn set_cpu_type(&mut self, cpu_type: CpuType) {
        self.cpu_type = cpu_type;
    }

    fn pulse_reset(&mut self, bus: &mut dyn Bus) {
        self.ssp = bus.read_long(0);
        self.pc = bus.read_long(4);
        self.irq = 0;
        if self.trace {
            info!(
                target: CPU_TARGET,
                "{:?} reset: SSP {:08X} PC {:08X}", self.cpu_type, self.ssp, self.pc
            );
        }
    }

    fn execute(&mut self, _bus: &mut dyn Bus, cycles: u32) -> Burst {
        if !self.warned {
            warn!("no instruction core fitted, CPU halted at {:06X}", self.pc);
            self.warned = true;
        }
        Burst {
            cycles,
            reset_pulse: false,
        }
    }

    fn set_irq(&mut self, level: u8) {
        if self.trace && level != self.irq {
            info!(target: CPU_TARGET, "IRQ level {}", level);
        }
        self.irq = level;
    }

    fn set_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    fn pc(&self) -> u32 {
        self.pc
    }
}
