//! Command execution.
//!
//! Every command runs to completion here and leaves the controller in the
//! command phase (no result block) or the result phase. Nothing is left
//! hanging in execution: commands the drive model cannot carry out end
//! with an abnormal-termination result instead.

use format_neon_img::{SECTOR_SIZE, SECTORS_PER_TRACK, sector_offset};
use log::{debug, trace};

use crate::commands::{CommandBytes, CommandKind};
use crate::host::{FdcHost, TransferDirection};
use crate::{FdcPhase, FloppyController};

/// ST0 for an unrecognised command.
pub(crate) const ST0_INVALID_COMMAND: u8 = 0x80;
/// ST0 for a completed transfer.
const ST0_NORMAL: u8 = 0x20;
/// ST0 abnormal termination.
const ST0_ABNORMAL: u8 = 0x40;
/// ST0 abnormal termination with the not-ready flag.
const ST0_NOT_READY: u8 = 0xC8;

const ST1_MISSING_ADDRESS_MARK: u8 = 0x01;
const ST1_NOT_WRITABLE: u8 = 0x02;
const ST1_NO_DATA: u8 = 0x04;

const ST3_WRITE_PROTECT: u8 = 0x40;
const ST3_READY: u8 = 0x20;
const ST3_TRACK0: u8 = 0x10;
const ST3_TWO_SIDE: u8 = 0x08;

const SENSE_INTERRUPT_RESULT: [u8; 2] = [0x20, 0x00];

impl<H: FdcHost> FloppyController<H> {
    pub(crate) fn execute(&mut self, kind: CommandKind, cmd: CommandBytes<'_>) {
        match kind {
            CommandKind::ReadData => self.exec_transfer(TransferDirection::Read, cmd),
            CommandKind::WriteData => self.exec_transfer(TransferDirection::Write, cmd),
            CommandKind::Recalibrate => self.exec_recalibrate(cmd),
            CommandKind::Seek => self.exec_seek(cmd),
            CommandKind::SenseInterruptStatus => self.exec_sense_interrupt(),
            CommandKind::Specify => self.exec_specify(cmd),
            CommandKind::SenseDriveStatus => self.exec_sense_drive(cmd),
            CommandKind::ReadId => self.exec_read_id(cmd),
            CommandKind::ReadTrack
            | CommandKind::FormatTrack
            | CommandKind::ScanEqual
            | CommandKind::ScanLowOrEqual
            | CommandKind::ScanHighOrEqual => self.exec_unsupported(kind, cmd),
        }
    }

    // -----------------------------------------------------------------------
    // READ DATA / WRITE DATA
    // -----------------------------------------------------------------------

    fn exec_transfer(&mut self, direction: TransferDirection, cmd: CommandBytes<'_>) {
        if self.config.trace {
            let name = match direction {
                TransferDirection::Read => CommandKind::ReadData,
                TransferDirection::Write => CommandKind::WriteData,
            };
            debug!(
                "FDC {name} C{:02X} H{:02X} R{:02X} N{:02X} EOT{:02X} GPL{:02X} DTL{:02X}",
                cmd.cylinder(),
                cmd.head(),
                cmd.sector(),
                cmd.size_code(),
                cmd.end_of_track(),
                cmd.gap_length(),
                cmd.data_length(),
            );
        }

        let drive = cmd.drive();
        let drive_bits = drive as u8;
        self.selected_track = cmd.cylinder();
        self.selected_side = cmd.head();

        let (st0, st1) = if !self.drives[drive].is_attached() {
            (ST0_NOT_READY | drive_bits, 0)
        } else if direction == TransferDirection::Write && self.drives[drive].is_read_only() {
            (ST0_ABNORMAL | drive_bits, ST1_NOT_WRITABLE)
        } else if self.transfer_sectors(drive, direction, cmd) {
            (ST0_NORMAL | drive_bits, 0)
        } else {
            (ST0_ABNORMAL | drive_bits, ST1_NO_DATA)
        };

        self.enter_result_phase(&[
            st0,
            st1,
            0,
            cmd.cylinder(),
            cmd.head(),
            cmd.sector(),
            cmd.size_code(),
        ]);
        self.set_interrupt(true);
    }

    /// Hand sectors to the host until it asks to stop.
    ///
    /// Starts at sector `R` and wraps around the track. Returns `false` if
    /// the addressed sector does not exist on the image.
    fn transfer_sectors(
        &mut self,
        drive: usize,
        direction: TransferDirection,
        cmd: CommandBytes<'_>,
    ) -> bool {
        let (cylinder, head, sector) = (cmd.cylinder(), cmd.head(), cmd.sector());
        if sector == 0 || usize::from(sector) > SECTORS_PER_TRACK {
            debug!("FDC sector {sector} outside track, no data");
            return false;
        }

        let mut index = sector - 1;
        let mut moved = 0usize;
        let completed = loop {
            let Some(offset) = sector_offset(cylinder, head, index) else {
                debug!("FDC C{cylinder} H{head} outside image, no data");
                break false;
            };
            if self.config.trace {
                trace!(
                    "FDC {direction:?} sector at {offset:#08X} block {}",
                    offset / SECTOR_SIZE
                );
            }

            let unit = &mut self.drives[drive];
            unit.set_cursor(cylinder, head, offset);
            let Some(Ok(buffer)) = unit.sector_mut(cylinder, head, index) else {
                break false;
            };
            let more = self.host.transfer_sector(direction, buffer);
            moved += 1;
            if !more {
                break true;
            }
            index = (index + 1) % SECTORS_PER_TRACK as u8;
        };

        if direction == TransferDirection::Write && moved > 0 {
            self.drives[drive].mark_dirty();
        }
        completed
    }

    // -----------------------------------------------------------------------
    // RECALIBRATE / SEEK: no result phase, interrupt on completion
    // -----------------------------------------------------------------------

    fn exec_recalibrate(&mut self, cmd: CommandBytes<'_>) {
        if self.config.trace {
            debug!("FDC RECALIBRATE {:#04X}", cmd.param(1));
        }
        self.drives[cmd.drive()].set_track(0);
        self.selected_track = 0;
        self.phase = FdcPhase::Command;
        self.set_interrupt(true);
    }

    fn exec_seek(&mut self, cmd: CommandBytes<'_>) {
        if self.config.trace {
            debug!("FDC SEEK {:#04X} {:#04X}", cmd.param(1), cmd.param(2));
        }
        let ncn = cmd.param(2);
        self.drives[cmd.drive()].set_track(ncn);
        self.selected_track = ncn;
        self.selected_side = cmd.head_select();
        self.phase = FdcPhase::Command;
        self.set_interrupt(true);
    }

    // -----------------------------------------------------------------------
    // SENSE INTERRUPT STATUS
    // -----------------------------------------------------------------------

    fn exec_sense_interrupt(&mut self) {
        if self.config.trace {
            debug!("FDC SENSE_INTERRUPT");
        }
        self.enter_result_phase(&SENSE_INTERRUPT_RESULT);
        self.set_interrupt(false);
    }

    // -----------------------------------------------------------------------
    // SPECIFY: timing parameters, accepted and ignored
    // -----------------------------------------------------------------------

    fn exec_specify(&mut self, cmd: CommandBytes<'_>) {
        if self.config.trace {
            let (p1, p2) = (cmd.param(1), cmd.param(2));
            debug!(
                "FDC SPECIFY SRT={:X} HUT={:X} HLT={:02X} NDMA={}",
                p1 >> 4,
                p1 & 0x0F,
                p2 >> 1,
                p2 & 0x01
            );
        }
        self.phase = FdcPhase::Command;
    }

    // -----------------------------------------------------------------------
    // SENSE DRIVE STATUS: ST3
    // -----------------------------------------------------------------------

    fn exec_sense_drive(&mut self, cmd: CommandBytes<'_>) {
        let drive = cmd.drive();
        let head = cmd.head_select();
        let unit = &self.drives[drive];

        let mut st3 = drive as u8 | (head << 2);
        if unit.is_attached() {
            st3 |= ST3_READY | ST3_TWO_SIDE;
            if unit.is_read_only() {
                st3 |= ST3_WRITE_PROTECT;
            }
        }
        if unit.track() == 0 {
            st3 |= ST3_TRACK0;
        }

        if self.config.trace {
            debug!("FDC SENSE_DRIVE_STATUS {:#04X} -> ST3 {st3:#04X}", cmd.param(1));
        }
        self.selected_side = head;
        self.enter_result_phase(&[st3]);
    }

    // -----------------------------------------------------------------------
    // READ ID: first sector header under the head
    // -----------------------------------------------------------------------

    fn exec_read_id(&mut self, cmd: CommandBytes<'_>) {
        let drive = cmd.drive();
        let head = cmd.head_select();
        let unit = &self.drives[drive];
        let track = unit.track();

        let (st0, st1) = if !unit.is_attached() {
            (ST0_NOT_READY | drive as u8, 0)
        } else if sector_offset(track, head, 0).is_none() {
            (ST0_ABNORMAL | drive as u8, ST1_MISSING_ADDRESS_MARK)
        } else {
            (ST0_NORMAL | drive as u8, 0)
        };

        if self.config.trace {
            debug!("FDC READ_ID {:#04X} C{track:02X} H{head:02X}", cmd.param(1));
        }
        self.selected_track = track;
        self.selected_side = head;
        // Every track is formatted with 512-byte sectors numbered from 1
        self.enter_result_phase(&[st0, st1, 0, track, head, 1, 2]);
        self.set_interrupt(true);
    }

    // -----------------------------------------------------------------------
    // READ TRACK, FORMAT TRACK, SCAN: terminated as unsupported
    // -----------------------------------------------------------------------

    fn exec_unsupported(&mut self, kind: CommandKind, cmd: CommandBytes<'_>) {
        debug!(
            "FDC {kind} ({:#04X}) not supported, terminating abnormally",
            cmd.opcode()
        );

        let drive = cmd.drive();
        let st0 = ST0_ABNORMAL | drive as u8;
        let result = if kind == CommandKind::FormatTrack {
            // Format carries N in byte 2 and has no C/H/R of its own
            [
                st0,
                ST1_NO_DATA,
                0,
                self.drives[drive].track(),
                cmd.head_select(),
                0,
                cmd.param(2),
            ]
        } else {
            [
                st0,
                ST1_NO_DATA,
                0,
                cmd.cylinder(),
                cmd.head(),
                cmd.sector(),
                cmd.size_code(),
            ]
        };
        self.enter_result_phase(&result);
        self.set_interrupt(true);
    }
}
