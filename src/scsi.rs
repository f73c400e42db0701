use bit_field::BitField;
use num_enum::TryFromPrimitive;

/// SCSI command codes this device recognizes.
///
/// INQUIRY, TEST UNIT READY, READ CAPACITY, START STOP UNIT, READ(10) and
/// WRITE(10) arrive through their dedicated callbacks; everything else lands
/// in the generic dispatcher as a raw CDB.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScsiOpcode {
    TestUnitReady = 0x00,
    RequestSense = 0x03,
    Inquiry = 0x12,
    ModeSense6 = 0x1A,
    StartStopUnit = 0x1B,
    PreventAllowMediumRemoval = 0x1E,
    ReadFormatCapacities = 0x23,
    ReadCapacity10 = 0x25,
    Read10 = 0x28,
    Write10 = 0x2A,
    Verify10 = 0x2F,
}

/// PREVENT bit of a PREVENT ALLOW MEDIUM REMOVAL CDB (byte 4, bit 0).
pub fn prevent_bit(cdb: &[u8; 16]) -> bool {
    cdb[4].get_bit(0)
}

/// Standard INQUIRY payload length.
pub const INQUIRY_DATA_SIZE: usize = 36;

/// Identification strings reported by INQUIRY: vendor (8), product (16) and
/// revision (4), ASCII, space padded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InquiryIdent {
    pub vendor_id: [u8; 8],
    pub product_id: [u8; 16],
    pub product_revision: [u8; 4],
}

impl Default for InquiryIdent {
    fn default() -> Self {
        Self {
            vendor_id: *b"daikon  ",
            product_id: *b"daikon flash    ",
            product_revision: *b"1.00",
        }
    }
}

impl InquiryIdent {
    /// Build from free-form strings, truncating and space padding each field
    /// to its wire width.
    pub fn from_strs(vendor: &str, product: &str, revision: &str) -> Self {
        Self {
            vendor_id: ascii_field(vendor),
            product_id: ascii_field(product),
            product_revision: ascii_field(revision),
        }
    }

    /// Render the standard 36-byte INQUIRY payload for a removable
    /// direct-access device, for transports that want the full payload
    /// rather than the three strings.
    pub fn standard_inquiry(&self) -> [u8; INQUIRY_DATA_SIZE] {
        let mut data = [0u8; INQUIRY_DATA_SIZE];
        // byte0: peripheral qualifier 0, device type 0 (direct access)
        data[0] = 0x00;
        // byte1: RMB, removable medium
        data[1].set_bit(7, true);
        // byte2: version, SPC-2
        data[2] = 0x04;
        // byte3: response data format 2
        data[3] = 0x02;
        // byte4: additional length, bytes following byte 4
        data[4] = (INQUIRY_DATA_SIZE - 5) as u8;
        data[8..16].copy_from_slice(&self.vendor_id);
        data[16..32].copy_from_slice(&self.product_id);
        data[32..36].copy_from_slice(&self.product_revision);
        data
    }
}

/// Truncate `s` to `N` bytes and pad the remainder with ASCII spaces.
fn ascii_field<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [b' '; N];
    let bytes = s.as_bytes();
    let n = bytes.len().min(N);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x00, Some(ScsiOpcode::TestUnitReady))]
    #[case(0x1E, Some(ScsiOpcode::PreventAllowMediumRemoval))]
    #[case(0x28, Some(ScsiOpcode::Read10))]
    #[case(0x2A, Some(ScsiOpcode::Write10))]
    #[case(0xFF, None)]
    #[case(0x04, None)]
    fn test_opcode_decode(#[case] raw: u8, #[case] expected: Option<ScsiOpcode>) {
        assert_eq!(ScsiOpcode::try_from_primitive(raw).ok(), expected);
    }

    #[test]
    fn test_prevent_bit() {
        let mut cdb = [0u8; 16];
        cdb[0] = ScsiOpcode::PreventAllowMediumRemoval as u8;
        assert!(!prevent_bit(&cdb));
        cdb[4] = 0x01;
        assert!(prevent_bit(&cdb));
        // only bit 0 counts; bit 1 is reserved in this CDB
        cdb[4] = 0x02;
        assert!(!prevent_bit(&cdb));
    }

    #[test]
    fn test_ident_truncates_and_pads() {
        let ident = InquiryIdent::from_strs("verylongvendor", "p", "1.0");
        assert_eq!(&ident.vendor_id, b"verylong");
        assert_eq!(&ident.product_id, b"p               ");
        assert_eq!(&ident.product_revision, b"1.0 ");
    }

    #[test]
    fn test_standard_inquiry_layout() {
        let data = InquiryIdent::default().standard_inquiry();
        assert_eq!(data[0], 0x00);
        assert_eq!(data[1], 0x80);
        assert_eq!(data[2], 0x04);
        assert_eq!(data[3], 0x02);
        assert_eq!(data[4], 31);
        assert_eq!(&data[8..16], b"daikon  ");
        assert_eq!(&data[16..32], b"daikon flash    ");
        assert_eq!(&data[32..36], b"1.00");
    }
}
