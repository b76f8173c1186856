pub mod ppide;
pub mod rtc;
pub mod uart;

pub use ppide::{DiskError, Ppide};
pub use rtc::Ds1302;
pub use uart::{Console, ConsoleStatus, Uart16x50};
