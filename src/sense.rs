use bit_field::BitField;
use byteorder::{BigEndian, ByteOrder};

/// SCSI sense keys (SPC-3 table 27).
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SenseKey {
    NoSense = 0x00,
    RecoveredError = 0x01,
    NotReady = 0x02,
    MediumError = 0x03,
    HardwareError = 0x04,
    IllegalRequest = 0x05,
    UnitAttention = 0x06,
    DataProtect = 0x07,
    BlankCheck = 0x08,
    VendorSpecific = 0x09,
    CopyAborted = 0x0A,
    AbortedCommand = 0x0B,
    Equal = 0x0C,
    VolumeOverflow = 0x0D,
    Miscompare = 0x0E,
}

/// Additional sense code / qualifier pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdditionalSense {
    /// Additional Sense Code
    pub asc: u8,
    /// Additional Sense Code Qualifier
    pub ascq: u8,
}

/// Additional sense conditions this device raises.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdditionalSenseKind {
    NoAdditionalSenseInformation,
    MediumNotPresent,
    InvalidCommandOperationCode,
    LogicalBlockAddressOutOfRange,
}

impl AdditionalSenseKind {
    pub const fn to_code(self) -> AdditionalSense {
        match self {
            AdditionalSenseKind::NoAdditionalSenseInformation => AdditionalSense {
                asc: 0x00,
                ascq: 0x00,
            },
            AdditionalSenseKind::MediumNotPresent => AdditionalSense {
                asc: 0x3a,
                ascq: 0x00,
            },
            AdditionalSenseKind::InvalidCommandOperationCode => AdditionalSense {
                asc: 0x20,
                ascq: 0x00,
            },
            AdditionalSenseKind::LogicalBlockAddressOutOfRange => AdditionalSense {
                asc: 0x21,
                ascq: 0x00,
            },
        }
    }
}

/// Fixed-format sense data length (SPC-3 §4.5.3, no extra bytes).
pub const FIXED_SENSE_DATA_SIZE: usize = 18;

/// One recorded failure: the (sense key, ASC, ASCQ) triple the transport
/// reports to the host, plus its fixed-format wire rendering.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SenseData {
    /// Information field valid. Always false here: no commands report a
    /// meaningful information field.
    pub valid: bool,
    /// 0x70: current errors, fixed format.
    pub error_code: u8,
    pub sense_key: SenseKey,
    /// Set to 0; kept for the wire layout.
    pub information: u32,
    /// Set to 0; kept for the wire layout.
    pub command_specific_information: u32,
    pub additional_sense_code: u8,
    pub additional_sense_code_qualifier: u8,
}

impl SenseData {
    pub fn new(sense_key: SenseKey, kind: AdditionalSenseKind) -> Self {
        let code = kind.to_code();
        Self {
            valid: false,
            error_code: 0x70,
            sense_key,
            information: 0,
            command_specific_information: 0,
            additional_sense_code: code.asc,
            additional_sense_code_qualifier: code.ascq,
        }
    }

    /// The bare (key, asc, ascq) triple.
    pub fn triple(&self) -> (SenseKey, u8, u8) {
        (
            self.sense_key,
            self.additional_sense_code,
            self.additional_sense_code_qualifier,
        )
    }

    pub fn to_data(&self) -> [u8; FIXED_SENSE_DATA_SIZE] {
        let mut data = [0u8; FIXED_SENSE_DATA_SIZE];
        self.prepare_to_buf(&mut data);
        data
    }

    /// Render the fixed-format sense payload into `buf`.
    ///
    /// `buf` must hold at least [`FIXED_SENSE_DATA_SIZE`] bytes.
    pub fn prepare_to_buf(&self, buf: &mut [u8]) {
        assert!(buf.len() >= FIXED_SENSE_DATA_SIZE);

        buf[0] = self.error_code & 0x7f;
        buf[0].set_bit(7, self.valid);
        buf[1] = 0; // segment number, unused for current errors
        buf[2] = (self.sense_key as u8) & 0xf;
        BigEndian::write_u32(&mut buf[3..7], self.information);
        // additional sense length: bytes following byte 7
        buf[7] = (FIXED_SENSE_DATA_SIZE - 8) as u8;
        BigEndian::write_u32(&mut buf[8..12], self.command_specific_information);
        buf[12] = self.additional_sense_code;
        buf[13] = self.additional_sense_code_qualifier;
        buf[14] = 0; // field replaceable unit code
        buf[15] = 0; // SKSV + sense-key specific
        buf[16] = 0;
        buf[17] = 0;
    }
}

/// Failure of a single command invocation.
///
/// Reported synchronously to the transport via the handler's return value;
/// the matching sense triple is recorded on the device for the REQUEST SENSE
/// / autosense path. Nothing is retried or logged here.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Medium not mounted, or the device is disabled. The host is expected
    /// to retry later.
    NotReady,
    /// Unrecognized or unsupported SCSI command. The transport stalls or
    /// fails the command.
    IllegalRequest,
    /// LBA/length combination outside the device geometry.
    OutOfRange { lba: u32 },
}

impl CommandError {
    /// Sense triple the transport reports for this failure.
    pub fn sense_data(&self) -> SenseData {
        match self {
            CommandError::NotReady => {
                SenseData::new(SenseKey::NotReady, AdditionalSenseKind::MediumNotPresent)
            }
            CommandError::IllegalRequest => SenseData::new(
                SenseKey::IllegalRequest,
                AdditionalSenseKind::InvalidCommandOperationCode,
            ),
            CommandError::OutOfRange { .. } => SenseData::new(
                SenseKey::IllegalRequest,
                AdditionalSenseKind::LogicalBlockAddressOutOfRange,
            ),
        }
    }
}
