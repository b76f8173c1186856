use heapless::Deque;
use log::info;
use mini68k_core::memory::{Peripheral, SerialPort};

const UART_TARGET: &str = "mini68k::uart";

const FIFO_DEPTH: usize = 16;

// Register offsets
const REG_DATA: u8 = 0; // RBR/THR, DLL with DLAB
const REG_IER: u8 = 1; // DLM with DLAB
const REG_IIR: u8 = 2; // FCR on write
const REG_LCR: u8 = 3;
const REG_MCR: u8 = 4;
const REG_LSR: u8 = 5;
const REG_MSR: u8 = 6;
const REG_SCR: u8 = 7;

const LCR_DLAB: u8 = 0x80;

const IER_RX_DATA: u8 = 0x01;
const IER_THR_EMPTY: u8 = 0x02;

const IIR_NONE: u8 = 0x01;
const IIR_THR_EMPTY: u8 = 0x02;
const IIR_RX_DATA: u8 = 0x04;
const IIR_FIFO_ENABLED: u8 = 0xC0;

const FCR_ENABLE: u8 = 0x01;
const FCR_CLEAR_RX: u8 = 0x02;

const LSR_DATA_READY: u8 = 0x01;
const LSR_OVERRUN: u8 = 0x02;
const LSR_THR_EMPTY: u8 = 0x20;
const LSR_TX_EMPTY: u8 = 0x40;

const MCR_LOOPBACK: u8 = 0x10;

// CTS, DSR and DCD asserted
const MSR_LINES_UP: u8 = 0xB0;

/// Readiness of the host side of the serial line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleStatus {
    pub input: bool,
    pub output: bool,
}

/// Host terminal the UART talks to
pub trait Console {
    /// Zero-timeout readiness check, never blocks
    fn poll(&mut self) -> ConsoleStatus;

    /// Only called after `poll` reported input
    fn read_byte(&mut self) -> u8;

    fn write_byte(&mut self, byte: u8);
}

/// 16x50 UART with a 16 byte receive FIFO. Transmission is immediate, the
/// transmitter is always empty by the time the CPU looks.
pub struct Uart16x50<T: Console> {
    console: T,
    rx: Deque<u8, FIFO_DEPTH>,
    ier: u8,
    lcr: u8,
    mcr: u8,
    scr: u8,
    fcr: u8,
    lsr_errors: u8,
    divisor: u16,
    thr_empty_pending: bool,
    input: bool,
    trace: bool,
}

impl<T: Console> Uart16x50<T> {
    pub fn new(console: T) -> Self {
        let mut uart = Self {
            console,
            rx: Deque::new(),
            ier: 0,
            lcr: 0,
            mcr: 0,
            scr: 0,
            fcr: 0,
            lsr_errors: 0,
            divisor: 0,
            thr_empty_pending: false,
            input: false,
            trace: false,
        };
        uart.reset();
        uart
    }

    pub fn console(&self) -> &T {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut T {
        &mut self.console
    }

    /// Baud rate divisor latch
    pub fn divisor(&self) -> u16 {
        self.divisor
    }

    fn receive(&mut self, byte: u8) {
        if self.rx.push_back(byte).is_err() {
            self.lsr_errors |= LSR_OVERRUN;
        }
    }

    fn transmit(&mut self, byte: u8) {
        if self.trace {
            info!(target: UART_TARGET, "TX {:02X}", byte);
        }
        if self.mcr & MCR_LOOPBACK != 0 {
            self.receive(byte);
        } else {
            self.console.write_byte(byte);
        }
        self.thr_empty_pending = true;
    }

    fn interrupt_id(&self) -> u8 {
        if self.ier & IER_RX_DATA != 0 && !self.rx.is_empty() {
            IIR_RX_DATA
        } else if self.ier & IER_THR_EMPTY != 0 && self.thr_empty_pending {
            IIR_THR_EMPTY
        } else {
            IIR_NONE
        }
    }

    fn line_status(&mut self) -> u8 {
        let mut lsr = LSR_THR_EMPTY | LSR_TX_EMPTY | self.lsr_errors;
        if !self.rx.is_empty() {
            lsr |= LSR_DATA_READY;
        }
        // Error bits clear on read
        self.lsr_errors = 0;
        lsr
    }
}

impl<T: Console> Peripheral for Uart16x50<T> {
    fn is_interrupt(&self) -> bool {
        self.interrupt_id() != IIR_NONE
    }
}

impl<T: Console> SerialPort for Uart16x50<T> {
    fn read(&mut self, register: u8) -> u8 {
        let value = match register & 7 {
            REG_DATA if self.lcr & LCR_DLAB != 0 => self.divisor as u8,
            REG_DATA => self.rx.pop_front().unwrap_or(0),
            REG_IER if self.lcr & LCR_DLAB != 0 => (self.divisor >> 8) as u8,
            REG_IER => self.ier,
            REG_IIR => {
                let id = self.interrupt_id();
                // Reading IIR acknowledges a transmitter empty interrupt
                if id == IIR_THR_EMPTY {
                    self.thr_empty_pending = false;
                }
                if self.fcr & FCR_ENABLE != 0 {
                    id | IIR_FIFO_ENABLED
                } else {
                    id
                }
            }
            REG_LCR => self.lcr,
            REG_MCR => self.mcr,
            REG_LSR => self.line_status(),
            REG_MSR => MSR_LINES_UP,
            _ => self.scr,
        };
        if self.trace {
            info!(target: UART_TARGET, "R{} -> {:02X}", register, value);
        }
        value
    }

    fn write(&mut self, register: u8, value: u8) {
        if self.trace {
            info!(target: UART_TARGET, "W{} <- {:02X}", register, value);
        }
        match register & 7 {
            REG_DATA if self.lcr & LCR_DLAB != 0 => {
                self.divisor = (self.divisor & 0xFF00) | value as u16;
            }
            REG_DATA => self.transmit(value),
            REG_IER if self.lcr & LCR_DLAB != 0 => {
                self.divisor = (self.divisor & 0x00FF) | (value as u16) << 8;
            }
            REG_IER => {
                // Enabling the THRE interrupt with an empty transmitter fires it
                if value & IER_THR_EMPTY != 0 && self.ier & IER_THR_EMPTY == 0 {
                    self.thr_empty_pending = true;
                }
                self.ier = value & 0x0F;
            }
            REG_IIR => {
                if value & FCR_CLEAR_RX != 0 {
                    self.rx.clear();
                }
                self.fcr = value & !0x06;
            }
            REG_LCR => self.lcr = value,
            REG_MCR => self.mcr = value & 0x1F,
            REG_LSR | REG_MSR => {}
            REG_SCR => self.scr = value,
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.rx.clear();
        self.ier = 0;
        self.lcr = 0;
        self.mcr = 0;
        self.fcr = 0;
        self.lsr_errors = 0;
        self.thr_empty_pending = false;
    }

    fn set_input(&mut self, enabled: bool) {
        self.input = enabled;
    }

    fn event(&mut self) {
        if !self.input {
            return;
        }
        while !self.rx.is_full() {
            if !self.console.poll().input {
                break;
            }
            let byte = self.console.read_byte();
            if self.trace {
                info!(target: UART_TARGET, "RX {:02X}", byte);
            }
            self.receive(byte);
        }
    }

    fn trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }
}

#[cfg(test)]
mod uart_tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedConsole {
        pending: VecDeque<u8>,
        written: Vec<u8>,
    }

    impl Console for ScriptedConsole {
        fn poll(&mut self) -> ConsoleStatus {
            ConsoleStatus {
                input: !self.pending.is_empty(),
                output: true,
            }
        }

        fn read_byte(&mut self) -> u8 {
            self.pending.pop_front().unwrap_or(0xFF)
        }

        fn write_byte(&mut self, byte: u8) {
            self.written.push(byte);
        }
    }

    fn uart_with_input(input: &[u8]) -> Uart16x50<ScriptedConsole> {
        let mut uart = Uart16x50::new(ScriptedConsole::default());
        uart.console_mut().pending.extend(input.iter().copied());
        uart.set_input(true);
        uart
    }

    #[test]
    fn test_transmit_reaches_console() {
        let mut uart = uart_with_input(&[]);
        uart.write(REG_DATA, b'O');
        uart.write(REG_DATA, b'K');
        assert_eq!(uart.console().written, b"OK");
        assert_eq!(uart.read(REG_LSR) & LSR_THR_EMPTY, LSR_THR_EMPTY);
    }

    #[test]
    fn test_receive_via_event() {
        let mut uart = uart_with_input(b"hi");
        assert_eq!(uart.read(REG_LSR) & LSR_DATA_READY, 0);
        uart.event();
        assert_eq!(uart.read(REG_LSR) & LSR_DATA_READY, LSR_DATA_READY);
        assert_eq!(uart.read(REG_DATA), b'h');
        assert_eq!(uart.read(REG_DATA), b'i');
        assert_eq!(uart.read(REG_LSR) & LSR_DATA_READY, 0);
    }

    #[test]
    fn test_input_disabled_leaves_console_alone() {
        let mut uart = uart_with_input(b"x");
        uart.set_input(false);
        uart.event();
        assert_eq!(uart.console().pending.len(), 1);
    }

    #[test]
    fn test_fifo_depth_limits_polling() {
        let mut uart = uart_with_input(&[0x55; 20]);
        uart.event();
        assert_eq!(uart.console().pending.len(), 4);
    }

    #[test]
    fn test_rx_interrupt() {
        let mut uart = uart_with_input(b"a");
        uart.write(REG_IER, IER_RX_DATA);
        assert!(!uart.is_interrupt());
        uart.event();
        assert!(uart.is_interrupt());
        assert_eq!(uart.read(REG_IIR), IIR_RX_DATA);
        uart.read(REG_DATA);
        assert!(!uart.is_interrupt());
    }

    #[test]
    fn test_thre_interrupt_acknowledged_by_iir() {
        let mut uart = uart_with_input(&[]);
        uart.write(REG_IER, IER_THR_EMPTY);
        assert!(uart.is_interrupt());
        assert_eq!(uart.read(REG_IIR), IIR_THR_EMPTY);
        assert!(!uart.is_interrupt());
        uart.write(REG_DATA, b'!');
        assert!(uart.is_interrupt());
    }

    #[test]
    fn test_divisor_latch() {
        let mut uart = uart_with_input(&[]);
        uart.write(REG_LCR, LCR_DLAB | 0x03);
        uart.write(REG_DATA, 0x0C);
        uart.write(REG_IER, 0x00);
        assert_eq!(uart.divisor(), 12);
        uart.write(REG_LCR, 0x03);
        uart.write(REG_DATA, b'A');
        assert_eq!(uart.console().written, b"A");
    }

    #[test]
    fn test_loopback() {
        let mut uart = uart_with_input(&[]);
        uart.write(REG_MCR, MCR_LOOPBACK);
        uart.write(REG_DATA, 0x42);
        assert!(uart.console().written.is_empty());
        assert_eq!(uart.read(REG_DATA), 0x42);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut uart = uart_with_input(b"z");
        uart.write(REG_IER, IER_RX_DATA);
        uart.event();
        uart.reset();
        assert!(!uart.is_interrupt());
        assert_eq!(uart.read(REG_LSR) & LSR_DATA_READY, 0);
        uart.write(REG_SCR, 0x99);
        assert_eq!(uart.read(REG_SCR), 0x99);
    }
}
