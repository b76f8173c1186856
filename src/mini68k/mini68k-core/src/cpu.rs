use crate::constants::interrupts::UART_IRQ_LEVEL;
use crate::memory::Bus;

/// 68000 family variants the board can be fitted with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuType {
    M68000,
    M68010,
    M68020,
    M68EC020,
}

impl Default for CpuType {
    fn default() -> Self {
        CpuType::M68000
    }
}

/// Outcome of one execution burst
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Burst {
    /// Cycles actually consumed
    pub cycles: u32,
    /// The core executed RESET and pulsed the peripheral reset line
    pub reset_pulse: bool,
}

/// Instruction execution core driving the board through a `Bus`
pub trait CpuCore {
    fn set_cpu_type(&mut self, cpu_type: CpuType);

    /// Power-on reset: fetch SSP and PC from vectors 0 and 4
    fn pulse_reset(&mut self, bus: &mut dyn Bus);

    /// Run for roughly `cycles` clocks; a burst always completes
    fn execute(&mut self, bus: &mut dyn Bus, cycles: u32) -> Burst;

    /// Level of the autovectored interrupt input, 0 for none
    fn set_irq(&mut self, level: u8);

    /// Per-instruction trace output
    fn set_trace(&mut self, enabled: bool);

    fn pc(&self) -> u32;
}

/// CPU interrupt level for the board. Only the UART is wired (autovector 1);
/// the NS32202's pending state does not take part.
pub fn recompute_interrupt_line(serial_pending: bool) -> u8 {
    if serial_pending {
        UART_IRQ_LEVEL
    } else {
        0
    }
}

/// Interrupt acknowledge cycle: no vector is ever supplied, the CPU takes the
/// spurious interrupt exception
pub fn acknowledge_interrupt(_level: u8) -> Option<u8> {
    None
}
