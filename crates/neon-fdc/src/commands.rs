//! Command table and byte-by-byte classification.
//!
//! A command is identified by its first byte alone. The byte pattern picks
//! the command kind and fixes how many bytes the whole command takes; the
//! controller keeps buffering until that many bytes have arrived.

use std::fmt;

/// Everything the controller can be asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Specify,
    SenseDriveStatus,
    Recalibrate,
    SenseInterruptStatus,
    Seek,
    ReadTrack,
    WriteData,
    ReadData,
    ReadId,
    FormatTrack,
    ScanEqual,
    ScanLowOrEqual,
    ScanHighOrEqual,
}

impl CommandKind {
    /// Whether the second command byte carries a drive select.
    #[must_use]
    pub fn selects_drive(self) -> bool {
        !matches!(self, Self::Specify | Self::SenseInterruptStatus)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Specify => "SPECIFY",
            Self::SenseDriveStatus => "SENSE_DRIVE_STATUS",
            Self::Recalibrate => "RECALIBRATE",
            Self::SenseInterruptStatus => "SENSE_INTERRUPT",
            Self::Seek => "SEEK",
            Self::ReadTrack => "READ_TRACK",
            Self::WriteData => "WRITE_DATA",
            Self::ReadData => "READ_DATA",
            Self::ReadId => "READ_ID",
            Self::FormatTrack => "FORMAT_TRACK",
            Self::ScanEqual => "SCAN_EQUAL",
            Self::ScanLowOrEqual => "SCAN_LOW_OR_EQUAL",
            Self::ScanHighOrEqual => "SCAN_HIGH_OR_EQUAL",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Bits of the first byte that identify the command.
    pub mask: u8,
    /// Required value of `first_byte & mask`.
    pub pattern: u8,
    /// Total command length including the first byte.
    pub length: usize,
    pub kind: CommandKind,
}

const fn exact(opcode: u8, length: usize, kind: CommandKind) -> CommandSpec {
    CommandSpec {
        mask: 0xFF,
        pattern: opcode,
        length,
        kind,
    }
}

/// The top three bits (MT, MFM, SK) are option flags on these commands.
const fn family(low5: u8, length: usize, kind: CommandKind) -> CommandSpec {
    CommandSpec {
        mask: 0x1F,
        pattern: low5,
        length,
        kind,
    }
}

/// Searched in order: exact opcodes shadow the flag-carrying families.
pub const COMMANDS: &[CommandSpec] = &[
    exact(0x03, 3, CommandKind::Specify),
    exact(0x04, 2, CommandKind::SenseDriveStatus),
    exact(0x07, 2, CommandKind::Recalibrate),
    exact(0x08, 1, CommandKind::SenseInterruptStatus),
    exact(0x0F, 3, CommandKind::Seek),
    family(0x02, 9, CommandKind::ReadTrack),
    family(0x05, 9, CommandKind::WriteData),
    // Write Deleted Data
    family(0x09, 9, CommandKind::WriteData),
    family(0x06, 9, CommandKind::ReadData),
    // Read Deleted Data
    family(0x0C, 9, CommandKind::ReadData),
    family(0x0A, 2, CommandKind::ReadId),
    family(0x0D, 6, CommandKind::FormatTrack),
    family(0x11, 9, CommandKind::ScanEqual),
    family(0x19, 9, CommandKind::ScanLowOrEqual),
    family(0x1D, 9, CommandKind::ScanHighOrEqual),
];

/// Table row for a first command byte.
#[must_use]
pub fn lookup(opcode: u8) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| opcode & spec.mask == spec.pattern)
}

/// Outcome of looking at the bytes received so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// More bytes are needed.
    Incomplete,
    /// The first byte matches no command.
    Invalid,
    /// All bytes of this command have arrived.
    Complete(CommandKind),
}

#[must_use]
pub fn classify(bytes: &[u8]) -> Classification {
    let Some(&opcode) = bytes.first() else {
        return Classification::Incomplete;
    };
    match lookup(opcode) {
        None => Classification::Invalid,
        Some(spec) if bytes.len() < spec.length => Classification::Incomplete,
        Some(spec) => Classification::Complete(spec.kind),
    }
}

/// Field view over a complete command.
///
/// Transfer commands are laid out as
/// `[opcode, drive/head, C, H, R, N, EOT, GPL, DTL]`. Missing bytes read as
/// zero, so a short slice never panics.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CommandBytes<'a>(pub &'a [u8]);

impl CommandBytes<'_> {
    fn byte(&self, index: usize) -> u8 {
        self.0.get(index).copied().unwrap_or(0)
    }

    pub fn opcode(&self) -> u8 {
        self.byte(0)
    }

    /// Drive select (US1/US0).
    pub fn drive(&self) -> usize {
        usize::from(self.byte(1) & 0x03)
    }

    /// Head select (HD) from the drive byte.
    pub fn head_select(&self) -> u8 {
        (self.byte(1) >> 2) & 0x01
    }

    pub fn param(&self, index: usize) -> u8 {
        self.byte(index)
    }

    pub fn cylinder(&self) -> u8 {
        self.byte(2)
    }

    pub fn head(&self) -> u8 {
        self.byte(3)
    }

    pub fn sector(&self) -> u8 {
        self.byte(4)
    }

    pub fn size_code(&self) -> u8 {
        self.byte(5)
    }

    pub fn end_of_track(&self) -> u8 {
        self.byte(6)
    }

    pub fn gap_length(&self) -> u8 {
        self.byte(7)
    }

    pub fn data_length(&self) -> u8 {
        self.byte(8)
    }
}
