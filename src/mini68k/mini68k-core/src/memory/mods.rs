/// Base trait for interrupt-capable peripherals
pub trait Peripheral {
    /// Check whether the device is currently requesting service
    fn is_interrupt(&self) -> bool;
}

/// 16x50 style serial chip, eight byte registers
pub trait SerialPort: Peripheral {
    fn read(&mut self, register: u8) -> u8;
    fn write(&mut self, register: u8, value: u8);
    fn reset(&mut self);

    /// Enable or disable polling of the host console for input
    fn set_input(&mut self, enabled: bool);

    /// Poll the host side, called once per execution burst
    fn event(&mut self);

    fn trace(&mut self, enabled: bool);
}

/// PPI attached IDE controller, four byte registers
pub trait DiskController {
    fn read(&mut self, register: u8) -> u8;
    fn write(&mut self, register: u8, value: u8);
    fn reset(&mut self);
    fn trace(&mut self, enabled: bool);
}

/// Bit-banged clock chip, one latch in each direction (physical layout)
pub trait ClockChip {
    fn read(&mut self) -> u8;
    fn write(&mut self, value: u8);
    fn reset(&mut self);
    fn trace(&mut self, enabled: bool);
}
