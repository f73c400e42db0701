use num_enum::TryFromPrimitive;

use crate::flash::FlashDriver;
use crate::geometry::BlockGeometry;
use crate::mount::{MediaState, MountState};
use crate::scsi::{self, InquiryIdent, ScsiOpcode};
use crate::sense::{CommandError, SenseData};

/// USB MSC callback surface, invoked by the external USB stack one command
/// at a time.
///
/// The transport maps `Ok(n)` to a transferred byte count and `Err(_)` to
/// its stall/failed-status path, then reports the recorded sense triple
/// (see [`MscDevice::sense`]) when the host asks via REQUEST SENSE or
/// autosense. Every handler runs to completion synchronously, including
/// blocking flash erase/write calls.
///
/// This is a single-LUN device; the `lun` argument is carried for signature
/// compatibility with MSC stacks and otherwise ignored.
pub trait MscHandler {
    /// INQUIRY: fill the identification strings and make the medium
    /// host-visible. A disabled device leaves the out-params untouched.
    fn inquiry(
        &mut self,
        lun: u8,
        vendor_id: &mut [u8; 8],
        product_id: &mut [u8; 16],
        product_revision: &mut [u8; 4],
    );

    /// TEST UNIT READY: true iff the medium is mounted and the device
    /// enabled. Records a NOT READY sense triple when false.
    fn test_unit_ready(&mut self, lun: u8) -> bool;

    /// READ CAPACITY: report block count and block size. A disabled device
    /// leaves the out-params untouched (invisible, not zero-capacity).
    fn capacity(&mut self, lun: u8, block_count: &mut u32, block_size: &mut u16);

    /// START STOP UNIT: with `load_eject`, start loads the medium and stop
    /// begins unloading it. Always reports success to the host.
    fn start_stop(&mut self, lun: u8, power_condition: u8, start: bool, load_eject: bool) -> bool;

    /// READ(10): read `buf.len()` bytes starting `offset` bytes into block
    /// `lba`. Returns the byte count read.
    fn read10(&mut self, lun: u8, lba: u32, offset: u32, buf: &mut [u8])
        -> Result<usize, CommandError>;

    /// WRITE(10): erase-then-write whole blocks from `buf`. Returns the byte
    /// count written, `buf.len()` floored to a multiple of the block size; a
    /// trailing partial block is dropped, not an error.
    fn write10(&mut self, lun: u8, lba: u32, buf: &[u8]) -> Result<usize, CommandError>;

    /// Any SCSI command without a dedicated callback, as a raw CDB.
    /// Returns the response length placed in `buf`.
    fn scsi_generic(
        &mut self,
        lun: u8,
        cdb: &[u8; 16],
        buf: &mut [u8],
    ) -> Result<usize, CommandError>;
}

/// The device context: flash driver, geometry, mount state, enablement and
/// the most recent sense triple, owned as one value and threaded through
/// every handler call.
///
/// Exclusive ownership replaces the usual firmware globals; the one-command-
/// at-a-time scheduling guarantee is the embedding firmware's to uphold.
pub struct MscDevice<F: FlashDriver> {
    flash: F,
    geometry: BlockGeometry,
    media: MediaState,
    enabled: bool,
    sense: Option<SenseData>,
    removal_prevented: bool,
    ident: InquiryIdent,
}

impl<F: FlashDriver> MscDevice<F> {
    /// Create an enabled device with an ejected medium and the default
    /// identity strings.
    pub fn new(flash: F, geometry: BlockGeometry) -> Self {
        Self {
            flash,
            geometry,
            media: MediaState::new(),
            enabled: true,
            sense: None,
            removal_prevented: false,
            ident: InquiryIdent::default(),
        }
    }

    /// Replace the INQUIRY identity strings.
    pub fn with_ident(mut self, ident: InquiryIdent) -> Self {
        self.ident = ident;
        self
    }

    /// Toggle host visibility. Disabling also ejects the medium: a disabled
    /// device must never be host-visible as mounted. Re-enabling leaves the
    /// medium ejected until the host sends INQUIRY again.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.media.eject();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn mount_state(&self) -> MountState {
        self.media.state()
    }

    /// Periodic maintenance call: settles a `Transit` medium into `Ejected`
    /// after the unload debounce. All transitions are gated on enablement.
    pub fn periodic_tick(&mut self) {
        if self.enabled {
            self.media.tick();
        }
    }

    /// Most recent failure, for REQUEST SENSE / autosense.
    pub fn sense(&self) -> Option<SenseData> {
        self.sense
    }

    /// Consume the recorded sense triple. The transport calls this when it
    /// reports the failure to the host.
    pub fn take_sense(&mut self) -> Option<SenseData> {
        self.sense.take()
    }

    /// Whether the host has prevented medium removal. The command itself is
    /// a no-op here (no cache to sync), but embedding firmware that wants to
    /// reclaim the flash region can consult this first.
    pub fn removal_prevented(&self) -> bool {
        self.removal_prevented
    }

    pub fn geometry(&self) -> BlockGeometry {
        self.geometry
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Record the sense triple for `err` and hand the error back.
    fn fail(&mut self, err: CommandError) -> CommandError {
        self.sense = Some(err.sense_data());
        err
    }
}

impl<F: FlashDriver> MscHandler for MscDevice<F> {
    fn inquiry(
        &mut self,
        _lun: u8,
        vendor_id: &mut [u8; 8],
        product_id: &mut [u8; 16],
        product_revision: &mut [u8; 4],
    ) {
        if !self.enabled {
            return;
        }
        vendor_id.copy_from_slice(&self.ident.vendor_id);
        product_id.copy_from_slice(&self.ident.product_id);
        product_revision.copy_from_slice(&self.ident.product_revision);
        self.media.load();
    }

    fn test_unit_ready(&mut self, _lun: u8) -> bool {
        if !self.media.is_mounted() || !self.enabled {
            self.fail(CommandError::NotReady);
            return false;
        }
        true
    }

    fn capacity(&mut self, _lun: u8, block_count: &mut u32, block_size: &mut u16) {
        if !self.enabled {
            return;
        }
        *block_count = self.geometry.block_count;
        *block_size = self.geometry.block_size as u16;
    }

    fn start_stop(
        &mut self,
        _lun: u8,
        _power_condition: u8,
        start: bool,
        load_eject: bool,
    ) -> bool {
        if load_eject && self.enabled {
            if start {
                self.media.load();
            } else {
                self.media.unload();
            }
        }
        true
    }

    fn read10(
        &mut self,
        _lun: u8,
        lba: u32,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<usize, CommandError> {
        let Some(address) = self.geometry.resolve_span(lba, offset, buf.len()) else {
            return Err(self.fail(CommandError::OutOfRange { lba }));
        };
        self.flash.read_block(address, buf);
        Ok(buf.len())
    }

    fn write10(&mut self, _lun: u8, lba: u32, buf: &[u8]) -> Result<usize, CommandError> {
        let block_size = self.geometry.block_size as usize;
        let whole_blocks = buf.len() / block_size;
        let span = whole_blocks * block_size;
        let Some(address) = self.geometry.resolve_span(lba, 0, span) else {
            return Err(self.fail(CommandError::OutOfRange { lba }));
        };
        if span == 0 {
            // less than one whole block: nothing reaches flash
            return Ok(0);
        }
        // Every covered sector needs an erase cycle before the single write
        // pass below.
        for n in 0..whole_blocks as u32 {
            self.flash.erase_sector(self.geometry.sector_address(lba + n));
        }
        self.flash.write_block(address, &buf[..span]);
        Ok(span)
    }

    fn scsi_generic(
        &mut self,
        _lun: u8,
        cdb: &[u8; 16],
        _buf: &mut [u8],
    ) -> Result<usize, CommandError> {
        match ScsiOpcode::try_from_primitive(cdb[0]) {
            Ok(ScsiOpcode::PreventAllowMediumRemoval) => {
                // Nothing to flush on allow: there is no write buffering.
                self.removal_prevented = scsi::prevent_bit(cdb);
                Ok(0)
            }
            _ => Err(self.fail(CommandError::IllegalRequest)),
        }
    }
}
