// The 68008 only drives A0-A21, everything above aliases
pub const ADDRESS_MASK: u32 = 0x3F_FFFF;

// 24-bit CPU address bus
pub const CPU_ADDRESS_SPACE: u32 = 0x100_0000;

pub mod address_space {
    // Region boundaries (inclusive start, exclusive end)
    pub const RAM_START: u32 = 0x00_0000;
    pub const RAM_END: u32 = 0x20_0000;
    pub const BANKED_START: u32 = 0x20_0000;
    pub const BANKED_END: u32 = 0x30_0000;
    pub const OFF_BOARD_START: u32 = 0x30_0000;
    pub const OFF_BOARD_END: u32 = 0x38_0000;
    pub const ROM_START: u32 = 0x38_0000;
    pub const ROM_END: u32 = 0x3F_0000;
    pub const IO_START: u32 = 0x3F_0000;
    pub const IO_END: u32 = 0x40_0000;

    // Backing store sizes in bytes
    pub const RAM_SIZE: usize = (RAM_END - RAM_START) as usize;
    pub const ROM_SIZE: usize = 0x2_0000;
    pub const ROM_ADDRESS_MASK: u32 = ROM_SIZE as u32 - 1;

    // Power-on RAM contents
    pub const RAM_FILL: u8 = 0xA7;

    // Value floating on the bus for stub regions and unassigned ports
    pub const UNMAPPED_VALUE: u8 = 0xFF;
}

pub mod ports {
    // MF/PIC board, low byte of the I/O address
    pub const PORT_NS32202: u8 = 0x40;
    pub const PORT_CONFIG: u8 = 0x42;
    pub const PORT_RTC: u8 = 0x43;
    pub const PORT_PPIDE_FIRST: u8 = 0x44;
    pub const PORT_PPIDE_LAST: u8 = 0x47;
    pub const PORT_UART_FIRST: u8 = 0x48;
    pub const PORT_UART_LAST: u8 = 0x4F;

    pub const PPIDE_REGISTER_MASK: u8 = 0x03;
    pub const UART_REGISTER_MASK: u8 = 0x07;
}

pub mod ns32202 {
    pub const REGISTER_COUNT: usize = 32;

    // Register selection comes from A8-A12 of the I/O address
    pub const REGISTER_SHIFT: u32 = 8;
    pub const REGISTER_MASK: u16 = 0x1F;

    pub const REGISTER_HVCT: usize = 0;
    pub const REGISTER_SVCT: usize = 1;
    pub const REGISTER_ELTG: usize = 2;
    pub const REGISTER_TPR: usize = 4;
    pub const REGISTER_IPND: usize = 6;
    pub const REGISTER_ISRV: usize = 8;
    pub const REGISTER_IMSK: usize = 10;
    pub const REGISTER_CSRC: usize = 12;
    pub const REGISTER_FPRT: usize = 14;
    pub const REGISTER_MCTL: usize = 16;
    pub const REGISTER_OCASN: usize = 17;
    pub const REGISTER_CIPTR: usize = 18;
    pub const REGISTER_PDAT: usize = 19;
    pub const REGISTER_IPS: usize = 20;
    pub const REGISTER_PDIR: usize = 21;
    pub const REGISTER_CCTL: usize = 22;
    pub const REGISTER_CICTL: usize = 23;
    pub const REGISTER_CSV: usize = 24;
    pub const REGISTER_CCV: usize = 28;

    // MCTL bits
    pub const MCTL_FREEZE: u8 = 0x08;

    // CCTL: CDCRL/CDCRH never read back as set
    pub const CCTL_WRITE_MASK: u8 = 0xFC;

    // CICTL: each half is only written when its enable bit is set
    pub const CICTL_LOW_ENABLE: u8 = 0x08;
    pub const CICTL_LOW_MASK: u8 = 0x07;
    pub const CICTL_HIGH_ENABLE: u8 = 0x80;
    // Decimal 70 (0x46) as found in the board firmware model, not 0x70
    pub const CICTL_HIGH_MASK: u8 = 70;
}

pub mod board_config {
    // Bits 7-3 are free for the user
    pub const CONFIG_MASK_UPPER_IRQS: u8 = 0x04;
    pub const CONFIG_VECTOR_SHIFT: u8 = 0x03;
}

pub mod rtc_lines {
    // Logical (RBC/RC2014 layout) bits
    pub const LOGICAL_DATA: u8 = 0x01;
    pub const LOGICAL_WRITE_N: u8 = 0x02;
    pub const LOGICAL_CLOCK: u8 = 0x04;
    pub const LOGICAL_RESET_N: u8 = 0x08;

    // MF/PIC physical bits
    pub const PHYSICAL_DATA: u8 = 0x80;
    pub const PHYSICAL_CLOCK: u8 = 0x40;
    pub const PHYSICAL_WRITE: u8 = 0x20;
    pub const PHYSICAL_RESET: u8 = 0x10;
    pub const PHYSICAL_DATA_IN: u8 = 0x01;
}

pub mod trace {
    // Bits of the -d trace mask
    pub const TRACE_MEM: u32 = 1;
    pub const TRACE_CPU: u32 = 2;
    pub const TRACE_UART: u32 = 4;
    pub const TRACE_PPIDE: u32 = 8;
    pub const TRACE_RTC: u32 = 16;
}

pub mod timing {
    // Cycles per execution burst, roughly a 68008 between polls
    pub const BURST_CYCLES: u32 = 400;
    // Pause between bursts when throttled
    pub const NAP_NANOS: u64 = 100_000;
}

pub mod interrupts {
    // The UART is wired to autovector level 1
    pub const UART_IRQ_LEVEL: u8 = 1;
}
