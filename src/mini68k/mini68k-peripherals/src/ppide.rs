use log::{info, warn};
use mini68k_core::memory::DiskController;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use thiserror::Error;

const PPIDE_TARGET: &str = "mini68k::ppide";

pub const SECTOR_SIZE: usize = 512;

// 8255 ports
const PPI_PORT_A: u8 = 0;
const PPI_PORT_B: u8 = 1;
const PPI_PORT_C: u8 = 2;
const PPI_CONTROL: u8 = 3;

const PPI_MODE_SET: u8 = 0x80;
const PPI_A_INPUT: u8 = 0x10;
const PPI_B_INPUT: u8 = 0x02;

// Port C drives the IDE control lines
const LINE_ADDR: u8 = 0x07;
const LINE_CS0: u8 = 0x08;
const LINE_CS1: u8 = 0x10;
const LINE_WR: u8 = 0x20;
const LINE_RD: u8 = 0x40;
const LINE_RESET: u8 = 0x80;

// Command block registers (CS0)
const IDE_DATA: u8 = 0;
const IDE_ERROR: u8 = 1; // features on write
const IDE_SEC_COUNT: u8 = 2;
const IDE_LBA0: u8 = 3;
const IDE_LBA1: u8 = 4;
const IDE_LBA2: u8 = 5;
const IDE_DEVHEAD: u8 = 6;
const IDE_STATUS: u8 = 7; // command on write
// Control block register (CS1)
const IDE_ALT_STATUS: u8 = 6;

const ST_ERR: u8 = 0x01;
const ST_DRQ: u8 = 0x08;
const ST_DSC: u8 = 0x10;
const ST_DRDY: u8 = 0x40;

const ERR_ABRT: u8 = 0x04;
const ERR_IDNF: u8 = 0x10;

const DEVHEAD_LBA: u8 = 0x40;
const DEVHEAD_SLAVE: u8 = 0x10;

const CMD_RECALIBRATE: u8 = 0x10;
const CMD_READ: u8 = 0x20;
const CMD_READ_NO_RETRY: u8 = 0x21;
const CMD_WRITE: u8 = 0x30;
const CMD_WRITE_NO_RETRY: u8 = 0x31;
const CMD_INIT_PARAMS: u8 = 0x91;
const CMD_IDENTIFY: u8 = 0xEC;
const CMD_SET_FEATURES: u8 = 0xEF;

// Translated geometry reported for CHS addressing
const HEADS: u32 = 16;
const SECTORS_PER_TRACK: u32 = 63;

#[derive(Debug, Error)]
pub enum DiskError {
    #[error("only drive 0 and 1 exist, not {0}")]
    NoSuchDrive(usize),
    #[error("image is not a whole number of sectors ({0} bytes)")]
    BadImageSize(u64),
    #[error("disk image I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Anything a drive can be backed by: a file, or memory in tests
pub trait DiskImage: Read + Write + Seek {}

impl<T: Read + Write + Seek> DiskImage for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    None,
    Read,
    Write,
}

struct Drive {
    image: Box<dyn DiskImage>,
    sectors: u32,
}

/// 8255 PPI wired to an IDE interface (the PPIDE)
pub struct Ppide {
    name: String,
    drives: [Option<Drive>; 2],

    // PPI latches
    port_a: u8,
    port_b: u8,
    port_c: u8,
    mode: u8,
    in_a: u8,
    in_b: u8,

    // Task file
    error: u8,
    features: u8,
    sec_count: u8,
    lba: [u8; 3],
    devhead: u8,
    status: u8,
    control: u8,

    buffer: [u8; SECTOR_SIZE],
    index: usize,
    transfer: Transfer,
    remaining: u32,
    position: u32,
    trace: bool,
}

impl Ppide {
    pub fn new(name: &str) -> Self {
        let mut ppide = Self {
            name: name.to_string(),
            drives: [None, None],
            port_a: 0,
            port_b: 0,
            port_c: 0,
            mode: 0x9B,
            in_a: 0,
            in_b: 0,
            error: 0,
            features: 0,
            sec_count: 0,
            lba: [0; 3],
            devhead: 0,
            status: 0,
            control: 0,
            buffer: [0; SECTOR_SIZE],
            index: 0,
            transfer: Transfer::None,
            remaining: 0,
            position: 0,
            trace: false,
        };
        ppide.reset();
        ppide
    }

    /// Attach a backing image to drive 0 (master) or 1 (slave)
    pub fn attach(&mut self, drive: usize, image: File) -> Result<(), DiskError> {
        self.attach_image(drive, Box::new(image))
    }

    pub fn attach_image(
        &mut self,
        drive: usize,
        mut image: Box<dyn DiskImage>,
    ) -> Result<(), DiskError> {
        if drive > 1 {
            return Err(DiskError::NoSuchDrive(drive));
        }
        let size = image.seek(SeekFrom::End(0))?;
        if size == 0 || size % SECTOR_SIZE as u64 != 0 {
            return Err(DiskError::BadImageSize(size));
        }
        let sectors = (size / SECTOR_SIZE as u64).min(u32::MAX as u64) as u32;
        info!("{}: drive {} attached, {} sectors", self.name, drive, sectors);
        self.drives[drive] = Some(Drive { image, sectors });
        Ok(())
    }

    fn selected(&self) -> usize {
        if self.devhead & DEVHEAD_SLAVE != 0 {
            1
        } else {
            0
        }
    }

    fn drive_present(&self) -> bool {
        self.drives[self.selected()].is_some()
    }

    fn drive_reset(&mut self) {
        self.error = 0x01; // diagnostic passed
        self.sec_count = 1;
        self.lba = [1, 0, 0];
        self.devhead = 0;
        self.status = ST_DRDY | ST_DSC;
        self.transfer = Transfer::None;
        self.index = 0;
    }

    fn current_lba(&self) -> u32 {
        if self.devhead & DEVHEAD_LBA != 0 {
            (self.devhead as u32 & 0x0F) << 24
                | (self.lba[2] as u32) << 16
                | (self.lba[1] as u32) << 8
                | self.lba[0] as u32
        } else {
            let cylinder = (self.lba[2] as u32) << 8 | self.lba[1] as u32;
            let head = self.devhead as u32 & 0x0F;
            let sector = (self.lba[0] as u32).max(1);
            (cylinder * HEADS + head) * SECTORS_PER_TRACK + sector - 1
        }
    }

    fn set_lba(&mut self, lba: u32) {
        if self.devhead & DEVHEAD_LBA != 0 {
            self.lba = [lba as u8, (lba >> 8) as u8, (lba >> 16) as u8];
            self.devhead = (self.devhead & 0xF0) | ((lba >> 24) as u8 & 0x0F);
        } else {
            let sector = lba % SECTORS_PER_TRACK + 1;
            let track = lba / SECTORS_PER_TRACK;
            let head = track % HEADS;
            let cylinder = track / HEADS;
            self.lba = [sector as u8, cylinder as u8, (cylinder >> 8) as u8];
            self.devhead = (self.devhead & 0xF0) | head as u8;
        }
    }

    fn fail(&mut self, error: u8) {
        self.error = error;
        self.status = ST_DRDY | ST_DSC | ST_ERR;
        self.transfer = Transfer::None;
    }

    fn complete(&mut self) {
        self.error = 0;
        self.status = ST_DRDY | ST_DSC;
        self.transfer = Transfer::None;
    }

    fn sector_count(&self) -> u32 {
        if self.sec_count == 0 {
            256
        } else {
            self.sec_count as u32
        }
    }

    fn load_sector(&mut self) -> io::Result<bool> {
        let drive = self.selected();
        let position = self.position;
        let buffer = &mut self.buffer;
        match &mut self.drives[drive] {
            Some(disk) if position < disk.sectors => {
                disk.image
                    .seek(SeekFrom::Start(position as u64 * SECTOR_SIZE as u64))?;
                disk.image.read_exact(buffer)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn store_sector(&mut self) -> io::Result<bool> {
        let drive = self.selected();
        let position = self.position;
        let buffer = &self.buffer;
        match &mut self.drives[drive] {
            Some(disk) if position < disk.sectors => {
                disk.image
                    .seek(SeekFrom::Start(position as u64 * SECTOR_SIZE as u64))?;
                disk.image.write_all(buffer)?;
                disk.image.flush()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn begin_read_sector(&mut self) {
        match self.load_sector() {
            Ok(true) => {
                self.index = 0;
                self.transfer = Transfer::Read;
                self.status = ST_DRDY | ST_DSC | ST_DRQ;
            }
            Ok(false) => self.fail(ERR_IDNF),
            Err(e) => {
                warn!("{}: read of sector {} failed: {}", self.name, self.position, e);
                self.fail(ERR_ABRT);
            }
        }
    }

    fn identify(&mut self) {
        let sectors = match &self.drives[self.selected()] {
            Some(disk) => disk.sectors,
            None => return self.fail(ERR_ABRT),
        };
        let cylinders = (sectors / (HEADS * SECTORS_PER_TRACK)).min(16383);

        let mut words = [0u16; SECTOR_SIZE / 2];
        words[0] = 0x0040; // fixed drive
        words[1] = cylinders as u16;
        words[3] = HEADS as u16;
        words[6] = SECTORS_PER_TRACK as u16;
        put_ata_string(&mut words[10..20], "MINI68K0001");
        put_ata_string(&mut words[23..27], "0.1");
        put_ata_string(&mut words[27..47], &self.name);
        words[47] = 0x8001; // one sector per interrupt for multiple
        words[49] = 0x0200; // LBA supported
        words[53] = 0x0001; // words 54-58 valid
        words[54] = cylinders as u16;
        words[55] = HEADS as u16;
        words[56] = SECTORS_PER_TRACK as u16;
        let chs_sectors = cylinders * HEADS * SECTORS_PER_TRACK;
        words[57] = chs_sectors as u16;
        words[58] = (chs_sectors >> 16) as u16;
        words[60] = sectors as u16;
        words[61] = (sectors >> 16) as u16;

        for (i, word) in words.iter().enumerate() {
            self.buffer[2 * i] = *word as u8;
            self.buffer[2 * i + 1] = (*word >> 8) as u8;
        }
        self.index = 0;
        self.position = self.current_lba();
        self.remaining = 1;
        self.transfer = Transfer::Read;
        self.status = ST_DRDY | ST_DSC | ST_DRQ;
    }

    fn command(&mut self, command: u8) {
        if self.trace {
            info!(target: PPIDE_TARGET, "command {:02X}", command);
        }
        if !self.drive_present() {
            return;
        }
        self.error = 0;
        match command {
            CMD_IDENTIFY => self.identify(),
            CMD_READ | CMD_READ_NO_RETRY => {
                self.position = self.current_lba();
                self.remaining = self.sector_count();
                self.begin_read_sector();
            }
            CMD_WRITE | CMD_WRITE_NO_RETRY => {
                self.position = self.current_lba();
                self.remaining = self.sector_count();
                self.index = 0;
                self.transfer = Transfer::Write;
                self.status = ST_DRDY | ST_DSC | ST_DRQ;
            }
            CMD_SET_FEATURES | CMD_INIT_PARAMS | CMD_RECALIBRATE => self.complete(),
            _ => {
                warn!("{}: unsupported command {:02X}", self.name, command);
                self.fail(ERR_ABRT);
            }
        }
    }

    fn data_read(&mut self) -> u16 {
        if self.transfer != Transfer::Read {
            return 0xFFFF;
        }
        let word = u16::from_le_bytes([self.buffer[self.index], self.buffer[self.index + 1]]);
        self.index += 2;
        if self.index == SECTOR_SIZE {
            self.remaining -= 1;
            self.position += 1;
            if self.remaining == 0 {
                self.set_lba(self.position.saturating_sub(1));
                self.complete();
            } else {
                self.begin_read_sector();
            }
        }
        word
    }

    fn data_write(&mut self, word: u16) {
        if self.transfer != Transfer::Write {
            return;
        }
        let [lo, hi] = word.to_le_bytes();
        self.buffer[self.index] = lo;
        self.buffer[self.index + 1] = hi;
        self.index += 2;
        if self.index < SECTOR_SIZE {
            return;
        }
        match self.store_sector() {
            Ok(true) => {}
            Ok(false) => return self.fail(ERR_IDNF),
            Err(e) => {
                warn!("{}: write of sector {} failed: {}", self.name, self.position, e);
                return self.fail(ERR_ABRT);
            }
        }
        self.index = 0;
        self.remaining -= 1;
        self.position += 1;
        if self.remaining == 0 {
            self.set_lba(self.position - 1);
            self.complete();
        }
    }

    fn ide_read(&mut self, lines: u8) -> u16 {
        let register = lines & LINE_ADDR;
        if lines & LINE_CS1 != 0 {
            return match register {
                IDE_ALT_STATUS if self.drive_present() => self.status as u16,
                _ => 0xFF,
            };
        }
        if lines & LINE_CS0 == 0 {
            return 0xFFFF;
        }
        if !self.drive_present() && register != IDE_DEVHEAD {
            return 0x00;
        }
        let value = match register {
            IDE_DATA => return self.data_read(),
            IDE_ERROR => self.error,
            IDE_SEC_COUNT => self.sec_count,
            IDE_LBA0 => self.lba[0],
            IDE_LBA1 => self.lba[1],
            IDE_LBA2 => self.lba[2],
            IDE_DEVHEAD => self.devhead,
            _ => self.status,
        };
        value as u16
    }

    fn ide_write(&mut self, lines: u8, word: u16) {
        let register = lines & LINE_ADDR;
        let value = word as u8;
        if lines & LINE_CS1 != 0 {
            if register == IDE_ALT_STATUS {
                // SRST
                if value & 0x04 != 0 && self.control & 0x04 == 0 {
                    self.drive_reset();
                }
                self.control = value;
            }
            return;
        }
        if lines & LINE_CS0 == 0 {
            return;
        }
        match register {
            IDE_DATA => self.data_write(word),
            IDE_ERROR => self.features = value,
            IDE_SEC_COUNT => self.sec_count = value,
            IDE_LBA0 => self.lba[0] = value,
            IDE_LBA1 => self.lba[1] = value,
            IDE_LBA2 => self.lba[2] = value,
            IDE_DEVHEAD => self.devhead = value,
            IDE_STATUS => self.command(value),
            _ => {}
        }
    }

    /// Port C changed: act on newly asserted strobes
    fn lines_changed(&mut self, old: u8) {
        let new = self.port_c;
        if new & LINE_RESET != 0 {
            if old & LINE_RESET == 0 {
                if self.trace {
                    info!(target: PPIDE_TARGET, "bus reset");
                }
                self.drive_reset();
            }
            return;
        }
        if new & LINE_RD != 0 && old & LINE_RD == 0 {
            let word = self.ide_read(new);
            self.in_a = word as u8;
            self.in_b = (word >> 8) as u8;
            if self.trace {
                info!(target: PPIDE_TARGET, "read reg {} -> {:04X}", new & LINE_ADDR, word);
            }
        }
        if new & LINE_WR != 0 && old & LINE_WR == 0 {
            let word = u16::from_le_bytes([self.port_a, self.port_b]);
            if self.trace {
                info!(target: PPIDE_TARGET, "write reg {} <- {:04X}", new & LINE_ADDR, word);
            }
            self.ide_write(new, word);
        }
    }

    fn write_port_c(&mut self, value: u8) {
        let old = self.port_c;
        self.port_c = value;
        self.lines_changed(old);
    }
}

impl DiskController for Ppide {
    fn read(&mut self, register: u8) -> u8 {
        match register & 3 {
            PPI_PORT_A if self.mode & PPI_A_INPUT != 0 => self.in_a,
            PPI_PORT_A => self.port_a,
            PPI_PORT_B if self.mode & PPI_B_INPUT != 0 => self.in_b,
            PPI_PORT_B => self.port_b,
            PPI_PORT_C => self.port_c,
            // The control register can't be read back on an 8255
            _ => 0xFF,
        }
    }

    fn write(&mut self, register: u8, value: u8) {
        match register & 3 {
            PPI_PORT_A => self.port_a = value,
            PPI_PORT_B => self.port_b = value,
            PPI_PORT_C => self.write_port_c(value),
            PPI_CONTROL => {
                if value & PPI_MODE_SET != 0 {
                    // Mode set clears all outputs
                    self.mode = value;
                    self.port_a = 0;
                    self.port_b = 0;
                    self.write_port_c(0);
                } else {
                    // Port C bit set/reset
                    let bit = 1 << ((value >> 1) & 7);
                    let lines = if value & 1 != 0 {
                        self.port_c | bit
                    } else {
                        self.port_c & !bit
                    };
                    self.write_port_c(lines);
                }
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.mode = 0x9B;
        self.port_a = 0;
        self.port_b = 0;
        self.port_c = 0;
        self.control = 0;
        self.drive_reset();
    }

    fn trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }
}

// ATA strings are space padded with the bytes of each word swapped
fn put_ata_string(words: &mut [u16], text: &str) {
    let mut bytes = text.bytes().chain(std::iter::repeat(b' '));
    for word in words.iter_mut() {
        let first = bytes.next().unwrap_or(b' ');
        let second = bytes.next().unwrap_or(b' ');
        *word = (first as u16) << 8 | second as u16;
    }
}

#[cfg(test)]
mod ppide_tests {
    use super::*;
    use std::io::Cursor;

    // Port A and B outputs, port C outputs
    const MODE_OUTPUT: u8 = 0x80;
    // Port A and B inputs, port C outputs
    const MODE_INPUT: u8 = 0x92;

    fn disk(sectors: usize) -> Ppide {
        let mut image = vec![0u8; sectors * SECTOR_SIZE];
        for (i, byte) in image.iter_mut().enumerate() {
            *byte = (i / SECTOR_SIZE) as u8 ^ (i as u8);
        }
        let mut ppide = Ppide::new("hd0");
        ppide.attach_image(0, Box::new(Cursor::new(image))).unwrap();
        ppide
    }

    fn set_register(ppide: &mut Ppide, register: u8, value: u8) {
        ppide.write(PPI_CONTROL, MODE_OUTPUT);
        ppide.write(PPI_PORT_A, value);
        ppide.write(PPI_PORT_C, LINE_CS0 | register);
        ppide.write(PPI_PORT_C, LINE_CS0 | register | LINE_WR);
        ppide.write(PPI_PORT_C, LINE_CS0 | register);
    }

    fn get_register(ppide: &mut Ppide, register: u8) -> u16 {
        ppide.write(PPI_CONTROL, MODE_INPUT);
        ppide.write(PPI_PORT_C, LINE_CS0 | register);
        ppide.write(PPI_PORT_C, LINE_CS0 | register | LINE_RD);
        let word = ppide.read(PPI_PORT_A) as u16 | (ppide.read(PPI_PORT_B) as u16) << 8;
        ppide.write(PPI_PORT_C, LINE_CS0 | register);
        word
    }

    #[test]
    fn test_ready_after_reset() {
        let mut ppide = disk(4);
        assert_eq!(get_register(&mut ppide, IDE_STATUS) as u8 & ST_DRDY, ST_DRDY);
    }

    #[test]
    fn test_no_drive_reads_zero_status() {
        let mut ppide = Ppide::new("hd0");
        assert_eq!(get_register(&mut ppide, IDE_STATUS), 0);
    }

    #[test]
    fn test_read_sector_lba() {
        let mut ppide = disk(4);
        set_register(&mut ppide, IDE_DEVHEAD, 0xE0);
        set_register(&mut ppide, IDE_LBA0, 2);
        set_register(&mut ppide, IDE_SEC_COUNT, 1);
        set_register(&mut ppide, IDE_STATUS, CMD_READ);
        assert_eq!(get_register(&mut ppide, IDE_STATUS) as u8 & ST_DRQ, ST_DRQ);
        let first = get_register(&mut ppide, IDE_DATA);
        assert_eq!(first, u16::from_le_bytes([2, 3]));
        for _ in 1..SECTOR_SIZE / 2 {
            get_register(&mut ppide, IDE_DATA);
        }
        assert_eq!(get_register(&mut ppide, IDE_STATUS) as u8 & ST_DRQ, 0);
    }

    #[test]
    fn test_write_then_read_back() {
        let mut ppide = disk(2);
        set_register(&mut ppide, IDE_DEVHEAD, 0xE0);
        set_register(&mut ppide, IDE_LBA0, 1);
        set_register(&mut ppide, IDE_SEC_COUNT, 1);
        set_register(&mut ppide, IDE_STATUS, CMD_WRITE);
        for i in 0..SECTOR_SIZE / 2 {
            ppide.write(PPI_CONTROL, MODE_OUTPUT);
            ppide.write(PPI_PORT_A, i as u8);
            ppide.write(PPI_PORT_B, 0x5A);
            ppide.write(PPI_PORT_C, LINE_CS0 | IDE_DATA);
            ppide.write(PPI_PORT_C, LINE_CS0 | IDE_DATA | LINE_WR);
            ppide.write(PPI_PORT_C, LINE_CS0 | IDE_DATA);
        }
        assert_eq!(get_register(&mut ppide, IDE_STATUS) as u8 & (ST_DRQ | ST_ERR), 0);

        set_register(&mut ppide, IDE_LBA0, 1);
        set_register(&mut ppide, IDE_SEC_COUNT, 1);
        set_register(&mut ppide, IDE_STATUS, CMD_READ);
        assert_eq!(get_register(&mut ppide, IDE_DATA), 0x5A00);
        assert_eq!(get_register(&mut ppide, IDE_DATA), 0x5A01);
    }

    #[test]
    fn test_out_of_range_sector() {
        let mut ppide = disk(2);
        set_register(&mut ppide, IDE_DEVHEAD, 0xE0);
        set_register(&mut ppide, IDE_LBA0, 9);
        set_register(&mut ppide, IDE_SEC_COUNT, 1);
        set_register(&mut ppide, IDE_STATUS, CMD_READ);
        assert_eq!(get_register(&mut ppide, IDE_STATUS) as u8 & ST_ERR, ST_ERR);
        assert_eq!(get_register(&mut ppide, IDE_ERROR) as u8, ERR_IDNF);
    }

    #[test]
    fn test_identify_reports_capacity() {
        let mut ppide = disk(8);
        set_register(&mut ppide, IDE_STATUS, CMD_IDENTIFY);
        let words: Vec<u16> = (0..SECTOR_SIZE / 2)
            .map(|_| get_register(&mut ppide, IDE_DATA))
            .collect();
        assert_eq!(words[49] & 0x0200, 0x0200);
        assert_eq!(words[60], 8);
        assert_eq!(words[27], u16::from_be_bytes([b'h', b'd']));
    }

    #[test]
    fn test_unknown_command_aborts() {
        let mut ppide = disk(1);
        set_register(&mut ppide, IDE_STATUS, 0x42);
        assert_eq!(get_register(&mut ppide, IDE_ERROR) as u8, ERR_ABRT);
    }

    #[test]
    fn test_port_c_bit_set_reset() {
        let mut ppide = disk(1);
        ppide.write(PPI_CONTROL, MODE_INPUT);
        ppide.write(PPI_CONTROL, (3 << 1) | 1);
        assert_eq!(ppide.read(PPI_PORT_C), LINE_CS0);
        ppide.write(PPI_CONTROL, 3 << 1);
        assert_eq!(ppide.read(PPI_PORT_C), 0);
    }

    #[test]
    fn test_attach_rejects_bad_images() {
        let mut ppide = Ppide::new("hd0");
        let odd = Box::new(Cursor::new(vec![0u8; 100]));
        assert!(matches!(
            ppide.attach_image(0, odd),
            Err(DiskError::BadImageSize(100))
        ));
        let fine = Box::new(Cursor::new(vec![0u8; SECTOR_SIZE]));
        assert!(matches!(
            ppide.attach_image(2, fine),
            Err(DiskError::NoSuchDrive(2))
        ));
    }
}
