//! Fixed-size plug-in and unplug request records
//!
//! Requests reach the bus as raw byte buffers. Each record starts with its own
//! size so that the bus can reject truncated or over-long buffers before any
//! field is interpreted.
//!
//! # Layout
//!
//! All integers are little-endian and packed without padding:
//! ```text
//! PlugIn: [size: u32][serial_no: u32][target_type: u32][vendor_id: u16][product_id: u16]  (16 bytes)
//! Unplug: [size: u32][serial_no: u32]                                                   ( 8 bytes)
//! ```

use crate::error::{BusError, InvalidParameter, Result};
use crate::types::{SerialNo, TargetKind, VendorProduct};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read, Write};

/// Size of an encoded [`PlugInRecord`]
pub const PLUGIN_RECORD_SIZE: usize = 16;

/// Size of an encoded [`UnplugRecord`]
pub const UNPLUG_RECORD_SIZE: usize = 8;

/// Request to plug in a new virtual target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlugInRecord {
    /// Declared record size, must equal [`PLUGIN_RECORD_SIZE`]
    pub size: u32,
    /// Caller-chosen serial number (non-zero)
    pub serial_no: SerialNo,
    /// Raw target type tag, see [`TargetKind`]
    pub target_type: u32,
    /// Vendor ID override (0 = use default)
    pub vendor_id: u16,
    /// Product ID override (0 = use default)
    pub product_id: u16,
}

impl PlugInRecord {
    /// Create a correctly sized record using the default IDs of `kind`
    pub fn new(serial_no: SerialNo, kind: TargetKind) -> Self {
        Self {
            size: PLUGIN_RECORD_SIZE as u32,
            serial_no,
            target_type: kind.as_raw(),
            vendor_id: 0,
            product_id: 0,
        }
    }

    /// Override the vendor/product IDs
    pub fn with_ids(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self
    }

    /// Requested ID override as carried in the record
    pub fn ids(&self) -> VendorProduct {
        VendorProduct::new(self.vendor_id, self.product_id)
    }

    /// Check the declared size against the record layout
    pub fn check_size(&self) -> Result<()> {
        check_declared(PLUGIN_RECORD_SIZE, self.size as usize, PLUGIN_RECORD_SIZE)
    }

    /// Decode a record from a transport buffer
    pub fn decode(buf: &[u8]) -> Result<Self> {
        check_buffer(buf, PLUGIN_RECORD_SIZE)?;
        Self::read_from(&mut Cursor::new(buf)).map_err(|_| truncated(buf, PLUGIN_RECORD_SIZE))
    }

    /// Read a record from a reader without size validation
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            size: reader.read_u32::<LittleEndian>()?,
            serial_no: SerialNo(reader.read_u32::<LittleEndian>()?),
            target_type: reader.read_u32::<LittleEndian>()?,
            vendor_id: reader.read_u16::<LittleEndian>()?,
            product_id: reader.read_u16::<LittleEndian>()?,
        })
    }

    /// Encode the record
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PLUGIN_RECORD_SIZE);
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.extend_from_slice(&self.serial_no.0.to_le_bytes());
        buf.extend_from_slice(&self.target_type.to_le_bytes());
        buf.extend_from_slice(&self.vendor_id.to_le_bytes());
        buf.extend_from_slice(&self.product_id.to_le_bytes());
        buf
    }

    /// Write the encoded record to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }
}

/// Request to unplug one target, or every target with serial number 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnplugRecord {
    /// Declared record size, must equal [`UNPLUG_RECORD_SIZE`]
    pub size: u32,
    /// Serial number to unplug ([`SerialNo::ALL`] = wildcard)
    pub serial_no: SerialNo,
}

impl UnplugRecord {
    pub fn new(serial_no: SerialNo) -> Self {
        Self {
            size: UNPLUG_RECORD_SIZE as u32,
            serial_no,
        }
    }

    /// Wildcard record: every target the caller may unplug
    pub fn all() -> Self {
        Self::new(SerialNo::ALL)
    }

    pub fn check_size(&self) -> Result<()> {
        check_declared(UNPLUG_RECORD_SIZE, self.size as usize, UNPLUG_RECORD_SIZE)
    }

    /// Decode a record from a transport buffer
    pub fn decode(buf: &[u8]) -> Result<Self> {
        check_buffer(buf, UNPLUG_RECORD_SIZE)?;
        Self::read_from(&mut Cursor::new(buf)).map_err(|_| truncated(buf, UNPLUG_RECORD_SIZE))
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            size: reader.read_u32::<LittleEndian>()?,
            serial_no: SerialNo(reader.read_u32::<LittleEndian>()?),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(UNPLUG_RECORD_SIZE);
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.extend_from_slice(&self.serial_no.0.to_le_bytes());
        buf
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }
}

/// Read the leading size field, if the buffer is long enough to hold one
fn declared_size(buf: &[u8]) -> usize {
    let mut cursor = Cursor::new(buf);
    cursor
        .read_u32::<LittleEndian>()
        .map(|size| size as usize)
        .unwrap_or(0)
}

/// Both the declared size and the buffer length must equal the record size
fn check_buffer(buf: &[u8], expected: usize) -> Result<()> {
    check_declared(expected, declared_size(buf), buf.len())
}

fn check_declared(expected: usize, declared: usize, actual: usize) -> Result<()> {
    if declared != expected || actual != declared {
        return Err(BusError::InvalidParameter(InvalidParameter::SizeMismatch {
            expected,
            declared,
            actual,
        }));
    }
    Ok(())
}

fn truncated(buf: &[u8], expected: usize) -> BusError {
    BusError::InvalidParameter(InvalidParameter::SizeMismatch {
        expected,
        declared: declared_size(buf),
        actual: buf.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_layout() {
        let record =
            PlugInRecord::new(SerialNo(7), TargetKind::DualShock4Wired).with_ids(0x1234, 0xABCD);
        let bytes = record.to_bytes();

        assert_eq!(bytes.len(), PLUGIN_RECORD_SIZE);
        assert_eq!(&bytes[0..4], &16u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &7u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2u32.to_le_bytes());
        assert_eq!(&bytes[12..14], &0x1234u16.to_le_bytes());
        assert_eq!(&bytes[14..16], &0xABCDu16.to_le_bytes());
    }

    #[test]
    fn test_plugin_decode() {
        let record = PlugInRecord::new(SerialNo(3), TargetKind::Xbox360Wired);
        let decoded = PlugInRecord::decode(&record.to_bytes()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_unplug_layout() {
        let bytes = UnplugRecord::all().to_bytes();
        assert_eq!(bytes, vec![8, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_declared_size_mismatch() {
        let mut record = PlugInRecord::new(SerialNo(1), TargetKind::Xbox360Wired);
        record.size = 12;
        let err = PlugInRecord::decode(&record.to_bytes()).unwrap_err();
        assert_eq!(
            err,
            BusError::InvalidParameter(InvalidParameter::SizeMismatch {
                expected: 16,
                declared: 12,
                actual: 16,
            })
        );
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = UnplugRecord::new(SerialNo(1)).to_bytes();
        bytes.push(0);
        assert!(matches!(
            UnplugRecord::decode(&bytes),
            Err(BusError::InvalidParameter(InvalidParameter::SizeMismatch {
                actual: 9,
                ..
            }))
        ));
    }

    #[test]
    fn test_short_buffer_rejected() {
        assert!(matches!(
            UnplugRecord::decode(&[8, 0]),
            Err(BusError::InvalidParameter(InvalidParameter::SizeMismatch {
                declared: 0,
                actual: 2,
                ..
            }))
        ));
    }
}
