//! Read-only view of controller state for debugger panels.

use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::drive::FloppyDrive;
use crate::host::FdcHost;
use crate::{FdcPhase, FloppyController};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DriveSnapshot {
    pub attached: bool,
    pub read_only: bool,
    pub dirty: bool,
    pub path: Option<PathBuf>,
    pub track: u8,
    pub side: u8,
    pub offset: usize,
}

impl From<&FloppyDrive> for DriveSnapshot {
    fn from(drive: &FloppyDrive) -> Self {
        Self {
            attached: drive.is_attached(),
            read_only: drive.is_read_only(),
            dirty: drive.is_dirty(),
            path: drive.path().map(PathBuf::from),
            track: drive.track(),
            side: drive.side(),
            offset: drive.offset(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FdcSnapshot {
    pub phase: FdcPhase,
    /// Main Status Register.
    pub msr: u8,
    pub interrupt: bool,
    pub selected_drive: Option<usize>,
    pub selected_track: u8,
    pub selected_side: u8,
    /// Bytes of the command still being received.
    pub command: Vec<u8>,
    /// Staged result block, including bytes already read.
    pub result: Vec<u8>,
    pub result_cursor: usize,
    pub drives: Vec<DriveSnapshot>,
}

impl<H: FdcHost> FloppyController<H> {
    /// Capture the current state. Has no effect on emulation.
    #[must_use]
    pub fn snapshot(&self) -> FdcSnapshot {
        FdcSnapshot {
            phase: self.phase,
            msr: self.read_msr(),
            interrupt: self.interrupt,
            selected_drive: self.selected_drive,
            selected_track: self.selected_track,
            selected_side: self.selected_side,
            command: self.command.as_slice().to_vec(),
            result: self.result.as_slice().to_vec(),
            result_cursor: self.result.cursor(),
            drives: self.drives.iter().map(DriveSnapshot::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{FdcHost, FdcPhase, FloppyController, MSR_CB, MSR_DIO, MSR_RQM, TransferDirection};

    struct NullHost;

    impl FdcHost for NullHost {
        fn set_interrupt(&mut self, _asserted: bool) {}

        fn transfer_sector(&mut self, _direction: TransferDirection, _sector: &mut [u8]) -> bool {
            false
        }
    }

    #[test]
    fn snapshot_tracks_partial_command() {
        let mut fdc = FloppyController::new(NullHost);
        fdc.write_data(0x0F);
        fdc.write_data(0x02);
        let snap = fdc.snapshot();
        assert_eq!(snap.phase, FdcPhase::Command);
        assert_eq!(snap.msr, MSR_RQM);
        assert_eq!(snap.command, vec![0x0F, 0x02]);
        assert!(snap.result.is_empty());
        assert_eq!(snap.drives.len(), 4);
        assert!(snap.drives.iter().all(|d| !d.attached && d.path.is_none()));
    }

    #[test]
    fn snapshot_tracks_result_cursor() {
        let mut fdc = FloppyController::new(NullHost);
        fdc.write_data(0x08);
        let _ = fdc.read_data();
        let snap = fdc.snapshot();
        assert_eq!(snap.phase, FdcPhase::Result);
        assert_eq!(snap.msr, MSR_RQM | MSR_DIO | MSR_CB);
        assert_eq!(snap.result, vec![0x20, 0x00]);
        assert_eq!(snap.result_cursor, 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn snapshot_serialises_to_json() {
        let mut fdc = FloppyController::new(NullHost);
        fdc.write_data(0x0F);
        fdc.write_data(0x01);
        fdc.write_data(0x05);
        let json = serde_json::to_value(fdc.snapshot()).expect("serialise");
        assert_eq!(json["phase"], "Command");
        assert_eq!(json["interrupt"], true);
        assert_eq!(json["selected_drive"], 1);
        assert_eq!(json["selected_track"], 5);
        assert_eq!(json["drives"][1]["track"], 5);
        assert_eq!(json["drives"][1]["attached"], false);
    }
}
