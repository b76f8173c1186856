use crate::constants::rtc_lines::*;

// The MF/PIC doesn't follow the usual RBC/RC2014 layout for the clock lines,
// so values written by the firmware are shuffled onto the board's pins.
pub fn rtc_remap_write(logical: u8) -> u8 {
    let mut physical = 0;
    if logical & LOGICAL_DATA != 0 {
        physical |= PHYSICAL_DATA;
    }
    if logical & LOGICAL_WRITE_N == 0 {
        physical |= PHYSICAL_WRITE; // /Write
    }
    if logical & LOGICAL_CLOCK != 0 {
        physical |= PHYSICAL_CLOCK;
    }
    if logical & LOGICAL_RESET_N == 0 {
        physical |= PHYSICAL_RESET; // /Reset
    }
    physical
}

// Only the data-in line comes back
pub fn rtc_remap_read(physical: u8) -> u8 {
    physical & PHYSICAL_DATA_IN
}

// Inverse of rtc_remap_write over the four lines it drives
pub fn rtc_unmap_write(physical: u8) -> u8 {
    let mut logical = 0;
    if physical & PHYSICAL_DATA != 0 {
        logical |= LOGICAL_DATA;
    }
    if physical & PHYSICAL_WRITE == 0 {
        logical |= LOGICAL_WRITE_N;
    }
    if physical & PHYSICAL_CLOCK != 0 {
        logical |= LOGICAL_CLOCK;
    }
    if physical & PHYSICAL_RESET == 0 {
        logical |= LOGICAL_RESET_N;
    }
    logical
}

#[cfg(test)]
mod remap_tests {
    use super::*;

    #[test]
    fn test_remap_round_trip() {
        for logical in 0..16u8 {
            let physical = rtc_remap_write(logical);
            assert_eq!(physical & 0x0F, 0);
            assert_eq!(rtc_unmap_write(physical), logical);
            assert_eq!(rtc_remap_write(rtc_unmap_write(physical)), physical);
        }
    }

    #[test]
    fn test_remap_data_clock_enabled() {
        // data=1, write=0 (bit1 set), clock=1, reset=0 (bit3 set)
        assert_eq!(rtc_remap_write(0x0F), 0xC0);
        // data=1, clock=1, /write and /reset asserted
        assert_eq!(rtc_remap_write(0x05), 0xF0);
        assert_eq!(rtc_remap_write(0x00), 0x30);
    }

    #[test]
    fn test_remap_read_keeps_data_in_only() {
        for physical in 0..=255u8 {
            assert_eq!(rtc_remap_read(physical), physical & 0x01);
        }
    }
}
