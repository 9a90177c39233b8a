//! Host bus collaborator.
//!
//! The controller never reaches into the machine directly. Everything it
//! needs from the outside world goes through [`FdcHost`]: the interrupt
//! request line and the DMA side of a sector transfer.

/// Direction of a sector transfer, seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Disk → host. The host copies out of the sector slice.
    Read,
    /// Host → disk. The host copies into the sector slice.
    Write,
}

/// Services the controller consumes from the machine it is plugged into.
pub trait FdcHost {
    /// Drive the interrupt request line. Called on edges only.
    fn set_interrupt(&mut self, asserted: bool);

    /// Move one 512-byte sector between the drive image and the DMA target.
    ///
    /// Returns `true` if another sector should follow.
    fn transfer_sector(&mut self, direction: TransferDirection, sector: &mut [u8]) -> bool;
}

impl<H: FdcHost + ?Sized> FdcHost for &mut H {
    fn set_interrupt(&mut self, asserted: bool) {
        (**self).set_interrupt(asserted);
    }

    fn transfer_sector(&mut self, direction: TransferDirection, sector: &mut [u8]) -> bool {
        (**self).transfer_sector(direction, sector)
    }
}
