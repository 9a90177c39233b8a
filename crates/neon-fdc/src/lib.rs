//! NEON floppy disk subsystem.
//!
//! A NEC uPD765-style controller driving up to four drives backed by flat
//! 800 KiB image files. The host bus calls into the controller on every
//! access to its ports; the controller talks back through [`FdcHost`]
//! (interrupt line and sector DMA).
//!
//! # Register interface
//!
//! - **Main Status Register (MSR)**, read-only: [`FloppyController::read_msr`]
//! - **Data register (FIFO)**, read/write: [`FloppyController::read_data`]
//!   and [`FloppyController::write_data`]
//!
//! # State machine
//!
//! Command (host writes command bytes) → Execution → Result (host reads
//! result bytes) → Command. Execution is transient: a command runs to
//! completion inside the `write_data` call that supplied its last byte.
//! Seek, Recalibrate and Specify have no result block and go straight back
//! to Command.

#![allow(clippy::cast_possible_truncation)]

pub mod commands;
pub mod config;
pub mod drive;
pub mod error;
mod execute;
mod fifo;
pub mod host;
pub mod snapshot;

use std::path::Path;

use log::{debug, trace, warn};

pub use commands::{Classification, CommandKind, classify};
pub use config::FdcConfig;
pub use drive::FloppyDrive;
pub use error::{BufferError, DriveError};
pub use format_neon_img as image;
pub use host::{FdcHost, TransferDirection};
pub use snapshot::{DriveSnapshot, FdcSnapshot};

use fifo::{CommandBuffer, ResultBuffer};

/// Number of drive slots.
pub const DRIVE_COUNT: usize = 4;

/// MSR bit 7: data register ready for a transfer.
pub const MSR_RQM: u8 = 0x80;
/// MSR bit 6: data direction, set for controller → host.
pub const MSR_DIO: u8 = 0x40;
/// MSR bit 4: controller busy with a command.
pub const MSR_CB: u8 = 0x10;

/// Value read from the data register when there is nothing to read.
pub const FIFO_EMPTY: u8 = 0xFF;

/// Controller protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FdcPhase {
    /// Accepting command bytes.
    Command,
    /// Running a command.
    Execution,
    /// Result bytes waiting to be read.
    Result,
}

/// The floppy disk controller and its four drives.
pub struct FloppyController<H: FdcHost> {
    host: H,
    config: FdcConfig,
    drives: [FloppyDrive; DRIVE_COUNT],
    /// Drive addressed by the last drive-selecting command.
    selected_drive: Option<usize>,
    selected_side: u8,
    selected_track: u8,
    command: CommandBuffer,
    result: ResultBuffer,
    phase: FdcPhase,
    /// Current level of the interrupt request line.
    interrupt: bool,
}

impl<H: FdcHost> FloppyController<H> {
    /// Create a controller with default options and all drives empty.
    pub fn new(host: H) -> Self {
        Self::with_config(host, FdcConfig::default())
    }

    pub fn with_config(host: H, config: FdcConfig) -> Self {
        Self {
            host,
            config,
            drives: std::array::from_fn(|_| FloppyDrive::new(config.write_back)),
            selected_drive: None,
            selected_side: 0,
            selected_track: 0,
            command: CommandBuffer::default(),
            result: ResultBuffer::default(),
            phase: FdcPhase::Command,
            interrupt: false,
        }
    }

    /// Return to the power-on protocol state.
    ///
    /// Pending changes of the selected drive are flushed first. Attached
    /// images stay attached.
    pub fn reset(&mut self) {
        if self.config.trace {
            debug!("FDC reset");
        }

        if let Err(err) = self.flush_changes() {
            warn!("{err}");
        }

        self.selected_drive = None;
        self.selected_side = 0;
        self.selected_track = 0;
        self.command.clear();
        self.result.clear();
        self.phase = FdcPhase::Command;
        self.set_interrupt(false);
    }

    /// Attach an image file to a drive, replacing whatever was there.
    pub fn attach(&mut self, drive: usize, path: impl AsRef<Path>) -> Result<(), DriveError> {
        self.drives
            .get_mut(drive)
            .ok_or(DriveError::InvalidDrive(drive))?
            .attach(path)?;
        self.selected_side = 0;
        self.selected_track = 0;
        Ok(())
    }

    /// Flush and detach a drive's image. Detaching an empty drive is a no-op.
    pub fn detach(&mut self, drive: usize) -> Result<(), DriveError> {
        self.drives
            .get_mut(drive)
            .ok_or(DriveError::InvalidDrive(drive))?
            .detach()
    }

    /// Write pending changes of the selected drive back to its file.
    pub fn flush_changes(&mut self) -> Result<(), DriveError> {
        let Some(index) = self.selected_drive else {
            return Ok(());
        };
        let drive = &mut self.drives[index];
        if !drive.is_attached() {
            return Ok(());
        }
        drive.flush()
    }

    /// Periodic service hook, called once per host scheduling slice.
    pub fn tick(&mut self) {
        let Some(index) = self.selected_drive else {
            return;
        };
        if !self.drives[index].is_attached() {
            return;
        }
        // Sector transfers finish inside their command, so there is no
        // time-sliced work to advance yet.
    }

    /// Read the Main Status Register.
    #[must_use]
    pub fn read_msr(&self) -> u8 {
        match self.phase {
            FdcPhase::Command => MSR_RQM,
            FdcPhase::Execution => MSR_CB,
            FdcPhase::Result => MSR_RQM | MSR_DIO | MSR_CB,
        }
    }

    /// Write to the data register.
    ///
    /// Only accepted in the command phase. The command executes as soon as
    /// its last byte arrives.
    pub fn write_data(&mut self, value: u8) {
        if self.config.trace {
            debug!("FIFO WR {value:#04X}");
        }

        if self.phase != FdcPhase::Command {
            if self.config.trace {
                debug!("FIFO WR ignored in {:?} phase", self.phase);
            }
            return;
        }

        self.set_interrupt(false);

        if let Err(err) = self.command.push(value) {
            warn!("{err}, discarding command");
            self.reject_command();
            return;
        }

        match classify(self.command.as_slice()) {
            Classification::Incomplete => {}
            Classification::Invalid => self.reject_command(),
            Classification::Complete(kind) => self.start_command(kind),
        }
    }

    /// Read from the data register.
    ///
    /// Returns successive result bytes during the result phase and
    /// [`FIFO_EMPTY`] otherwise. Reading the last result byte returns the
    /// controller to the command phase.
    pub fn read_data(&mut self) -> u8 {
        if self.phase != FdcPhase::Result {
            return FIFO_EMPTY;
        }

        self.set_interrupt(false);
        let value = self.result.next_byte().unwrap_or(FIFO_EMPTY);
        if self.result.is_drained() {
            self.phase = FdcPhase::Command;
        }

        if self.config.trace {
            debug!("FIFO RD {value:#04X}");
        }
        value
    }

    /// Turn protocol tracing on or off.
    pub fn set_trace(&mut self, enabled: bool) {
        self.config.trace = enabled;
    }

    #[must_use]
    pub fn config(&self) -> FdcConfig {
        self.config
    }

    #[must_use]
    pub fn phase(&self) -> FdcPhase {
        self.phase
    }

    /// Level of the interrupt request line.
    #[must_use]
    pub fn interrupt_asserted(&self) -> bool {
        self.interrupt
    }

    #[must_use]
    pub fn selected_drive(&self) -> Option<usize> {
        self.selected_drive
    }

    #[must_use]
    pub fn selected_track(&self) -> u8 {
        self.selected_track
    }

    #[must_use]
    pub fn selected_side(&self) -> u8 {
        self.selected_side
    }

    /// Number of command bytes buffered for the command in flight.
    #[must_use]
    pub fn pending_command_len(&self) -> usize {
        self.command.len()
    }

    /// Unread result bytes.
    #[must_use]
    pub fn pending_result_len(&self) -> usize {
        self.result.len() - self.result.cursor()
    }

    #[must_use]
    pub fn drive(&self, drive: usize) -> Option<&FloppyDrive> {
        self.drives.get(drive)
    }

    #[must_use]
    pub fn is_attached(&self, drive: usize) -> bool {
        self.drives.get(drive).is_some_and(FloppyDrive::is_attached)
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Drive the interrupt line, notifying the host on edges only.
    fn set_interrupt(&mut self, asserted: bool) {
        if self.interrupt != asserted {
            self.interrupt = asserted;
            if self.config.trace {
                trace!("FDC INT {}", if asserted { "raised" } else { "lowered" });
            }
            self.host.set_interrupt(asserted);
        }
    }

    /// Answer an unrecognised command with the single invalid-command byte.
    fn reject_command(&mut self) {
        if self.config.trace {
            debug!("FDC invalid command {:02X?}", self.command.as_slice());
        }
        self.command.clear();
        self.enter_result_phase(&[execute::ST0_INVALID_COMMAND]);
    }

    fn start_command(&mut self, kind: CommandKind) {
        let bytes = self.command.take();
        self.result.clear();
        self.phase = FdcPhase::Execution;

        let command = commands::CommandBytes(&bytes);
        if kind.selects_drive() {
            self.selected_drive = Some(command.drive());
        }

        self.execute(kind, command);
    }

    fn enter_result_phase(&mut self, bytes: &[u8]) {
        if let Err(err) = self.result.load(bytes) {
            warn!("{err}, reporting invalid command");
            // A single byte always fits.
            let _ = self.result.load(&[execute::ST0_INVALID_COMMAND]);
        }
        self.phase = FdcPhase::Result;
    }
}

impl<H: FdcHost> Drop for FloppyController<H> {
    fn drop(&mut self) {
        for drive in &mut self.drives {
            if let Err(err) = drive.detach() {
                warn!("{err}");
            }
        }
    }
}
