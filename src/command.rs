//! S7 job PDU construction.
//!
//! This module builds the request side of the S7 protocol: the
//! Setup-Communication PDU exchanged right after the COTP handshake, and the
//! Read-Var / Write-Var PDUs carrying one or more [`RequestItem`]s.
//!
//! # PDU layout
//!
//! Every job PDU starts with a 10-byte header:
//!
//! ```text
//! +------+------+----------+---------+-----------+----------+
//! | 0x32 | 0x01 | reserved | PDU ref | param len | data len |
//! | 1    | 1    | 2        | 2       | 2         | 2        |
//! +------+------+----------+---------+-----------+----------+
//! ```
//!
//! The PDU reference is echoed by the ack-data response and is the only way
//! to pair answers with requests.
//!
//! # Example
//!
//! ```
//! use s7comm::command::{ReadRequest, RequestItem};
//! use s7comm::Area;
//!
//! let item = RequestItem::bytes(Area::DataBlock, 18, 0, 24).unwrap();
//! let request = ReadRequest::new(0x0001, vec![item]).unwrap();
//! let pdu = request.to_bytes();
//! assert_eq!(pdu.len(), 24);
//! ```

use crate::area::Area;
use crate::error::{Result, S7Error};

/// S7 protocol identifier, first byte of every PDU.
pub(crate) const S7_PROTOCOL_ID: u8 = 0x32;

/// Message type of a job (request) PDU.
pub(crate) const MSG_JOB: u8 = 0x01;

/// Message type of an ack-data (response) PDU.
pub(crate) const MSG_ACK_DATA: u8 = 0x03;

/// Function code for communication setup.
pub(crate) const FN_SETUP_COMMUNICATION: u8 = 0xF0;

/// Function code for reading variables.
pub(crate) const FN_READ_VAR: u8 = 0x04;

/// Function code for writing variables.
pub(crate) const FN_WRITE_VAR: u8 = 0x05;

/// PDU length proposed during communication setup.
pub const PROPOSED_PDU_LENGTH: u16 = 480;

/// Maximum number of items in one Read-Var request.
pub const MAX_ITEMS_PER_REQUEST: usize = 20;

/// Size of one encoded request item.
pub(crate) const REQUEST_ITEM_SIZE: usize = 12;

// Request item prefix: variable specification, address length, S7ANY syntax.
const SPEC_TYPE_VAR: u8 = 0x12;
const ADDRESS_LENGTH: u8 = 0x0A;
const SYNTAX_ID_S7ANY: u8 = 0x10;

// Transport sizes in request items.
const TS_BIT: u8 = 0x01;
const TS_BYTE: u8 = 0x02;

// Transport sizes in write data sections.
const DATA_TS_BIT: u8 = 0x03;
const DATA_TS_BYTE: u8 = 0x04;
const DATA_TS_OCTET: u8 = 0x09;

/// Largest byte offset that still fits the 3-byte bit-granular address field.
const MAX_START_OFFSET: u32 = 0x1F_FFFF;

fn job_header(pdu_ref: u16, param_len: u16, data_len: u16) -> [u8; 10] {
    let mut header = [0u8; 10];
    header[0] = S7_PROTOCOL_ID;
    header[1] = MSG_JOB;
    // bytes 2-3 reserved
    header[4..6].copy_from_slice(&pdu_ref.to_be_bytes());
    header[6..8].copy_from_slice(&param_len.to_be_bytes());
    header[8..10].copy_from_slice(&data_len.to_be_bytes());
    header
}

/// One addressed element of a Read-Var or Write-Var request.
///
/// Byte-addressed items cover `length` bytes starting at `start`; bit items
/// address a single bit. For counters and timers `start` is the entry number
/// and `length` must cover whole 2-byte entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestItem {
    area: Area,
    db_number: u16,
    start: u32,
    bit: Option<u8>,
    length: u16,
}

impl RequestItem {
    /// Creates a byte-addressed item.
    ///
    /// # Arguments
    ///
    /// * `area` - Memory area to address
    /// * `db_number` - Data-block number; must be 0 for areas without one
    /// * `start` - Starting byte offset (entry number for counters/timers)
    /// * `length` - Length in bytes
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidParameter` if the length is zero, the DB
    /// number does not fit the area, the offset exceeds the 3-byte address
    /// encoding, or a counter/timer length is odd.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::command::RequestItem;
    /// use s7comm::Area;
    ///
    /// let item = RequestItem::bytes(Area::DataBlock, 18, 0, 24).unwrap();
    /// assert_eq!(item.payload_len(), 24);
    /// ```
    pub fn bytes(area: Area, db_number: u16, start: u32, length: u16) -> Result<Self> {
        if length == 0 {
            return Err(S7Error::invalid_parameter(
                "length",
                "must be greater than 0",
            ));
        }
        area.check_db_number(db_number)?;
        if start > MAX_START_OFFSET {
            return Err(S7Error::invalid_parameter(
                "start",
                "offset exceeds the 3-byte address encoding",
            ));
        }
        if matches!(area, Area::Counter | Area::Timer) && length % 2 != 0 {
            return Err(S7Error::invalid_parameter(
                "length",
                "counter and timer transfers must cover whole 2-byte entries",
            ));
        }

        Ok(Self {
            area,
            db_number,
            start,
            bit: None,
            length,
        })
    }

    /// Creates a single-bit item.
    ///
    /// # Arguments
    ///
    /// * `area` - Memory area to address (must support bit access)
    /// * `db_number` - Data-block number; must be 0 for areas without one
    /// * `byte_offset` - Byte offset of the addressed bit
    /// * `bit_offset` - Bit position within the byte (0-7)
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidParameter` if the area does not support bit
    /// access, the bit position is above 7, or the offsets do not validate.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::command::RequestItem;
    /// use s7comm::Area;
    ///
    /// let item = RequestItem::bit(Area::Flag, 0, 5, 2).unwrap();
    /// assert_eq!(item.payload_len(), 1);
    /// ```
    pub fn bit(area: Area, db_number: u16, byte_offset: u32, bit_offset: u8) -> Result<Self> {
        if !area.supports_bit_access() {
            return Err(S7Error::invalid_parameter(
                "area",
                format!("area {} does not support bit access", area),
            ));
        }
        if bit_offset > 7 {
            return Err(S7Error::invalid_parameter("bit_offset", "must be 0-7"));
        }
        area.check_db_number(db_number)?;
        if byte_offset > MAX_START_OFFSET {
            return Err(S7Error::invalid_parameter(
                "byte_offset",
                "offset exceeds the 3-byte address encoding",
            ));
        }

        Ok(Self {
            area,
            db_number,
            start: byte_offset,
            bit: Some(bit_offset),
            length: 1,
        })
    }

    /// Returns the memory area this item addresses.
    pub fn area(&self) -> Area {
        self.area
    }

    /// Returns the number of payload bytes this item transfers.
    pub fn payload_len(&self) -> usize {
        self.length as usize
    }

    /// Returns whether this is a bit-addressed item.
    pub fn is_bit(&self) -> bool {
        self.bit.is_some()
    }

    /// Returns the transport size byte for this item's write data section.
    fn data_transport_size(&self) -> u8 {
        if self.bit.is_some() {
            DATA_TS_BIT
        } else if matches!(self.area, Area::Counter | Area::Timer) {
            // counters and timers travel as octet strings
            DATA_TS_OCTET
        } else {
            DATA_TS_BYTE
        }
    }

    /// Serializes the 12-byte item encoding.
    ///
    /// The address field is bit-granular: byte-addressed items shift the
    /// start offset left by 3, bit items add the bit position, and
    /// counter/timer items use the entry number unshifted with the area
    /// code doubling as the transport size.
    pub fn to_bytes(&self) -> [u8; REQUEST_ITEM_SIZE] {
        let (transport_size, count, address) = match (self.area, self.bit) {
            (_, Some(bit)) => (TS_BIT, 1u16, self.start * 8 + bit as u32),
            (Area::Counter | Area::Timer, None) => (self.area.code(), self.length / 2, self.start),
            (_, None) => (TS_BYTE, self.length, self.start * 8),
        };

        let mut bytes = [0u8; REQUEST_ITEM_SIZE];
        bytes[0] = SPEC_TYPE_VAR;
        bytes[1] = ADDRESS_LENGTH;
        bytes[2] = SYNTAX_ID_S7ANY;
        bytes[3] = transport_size;
        bytes[4..6].copy_from_slice(&count.to_be_bytes());
        bytes[6..8].copy_from_slice(&self.db_number.to_be_bytes());
        bytes[8] = self.area.code();
        bytes[9] = (address >> 16) as u8;
        bytes[10] = (address >> 8) as u8;
        bytes[11] = address as u8;
        bytes
    }
}

/// Setup-Communication job, sent once after the COTP handshake.
///
/// Proposes a PDU length; the ack carries the value the CPU actually
/// granted, which bounds every later transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupRequest {
    pdu_ref: u16,
    proposed_pdu_length: u16,
}

impl SetupRequest {
    /// Creates a setup job proposing the given PDU length.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::command::{SetupRequest, PROPOSED_PDU_LENGTH};
    ///
    /// let setup = SetupRequest::new(0x0001, PROPOSED_PDU_LENGTH);
    /// assert_eq!(setup.to_bytes().len(), 18);
    /// ```
    pub fn new(pdu_ref: u16, proposed_pdu_length: u16) -> Self {
        Self {
            pdu_ref,
            proposed_pdu_length,
        }
    }

    /// Returns the PDU reference stamped into this job.
    pub fn pdu_ref(&self) -> u16 {
        self.pdu_ref
    }

    /// Serializes the job to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(18);
        bytes.extend_from_slice(&job_header(self.pdu_ref, 8, 0));
        bytes.push(FN_SETUP_COMMUNICATION);
        bytes.push(0x00); // reserved
        bytes.extend_from_slice(&1u16.to_be_bytes()); // max AMQ calling
        bytes.extend_from_slice(&1u16.to_be_bytes()); // max AMQ called
        bytes.extend_from_slice(&self.proposed_pdu_length.to_be_bytes());
        bytes
    }
}

/// Read-Var job carrying one to [`MAX_ITEMS_PER_REQUEST`] items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pdu_ref: u16,
    items: Vec<RequestItem>,
}

impl ReadRequest {
    /// Creates a read job for the given items.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidParameter` if the item list is empty or
    /// holds more than [`MAX_ITEMS_PER_REQUEST`] entries.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::command::{ReadRequest, RequestItem};
    /// use s7comm::Area;
    ///
    /// let items = vec![
    ///     RequestItem::bytes(Area::DataBlock, 18, 0, 2).unwrap(),
    ///     RequestItem::bytes(Area::Flag, 0, 0, 4).unwrap(),
    /// ];
    /// let request = ReadRequest::new(0x0001, items).unwrap();
    /// assert_eq!(request.expected_payload(), 6);
    /// ```
    pub fn new(pdu_ref: u16, items: Vec<RequestItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(S7Error::invalid_parameter(
                "items",
                "must hold at least one item",
            ));
        }
        if items.len() > MAX_ITEMS_PER_REQUEST {
            return Err(S7Error::invalid_parameter(
                "items",
                format!("must not exceed {} items", MAX_ITEMS_PER_REQUEST),
            ));
        }

        Ok(Self { pdu_ref, items })
    }

    /// Returns the PDU reference stamped into this job.
    pub fn pdu_ref(&self) -> u16 {
        self.pdu_ref
    }

    /// Returns the items carried by this job.
    pub fn items(&self) -> &[RequestItem] {
        &self.items
    }

    /// Returns the payload byte count the matching ack-data will carry.
    pub fn expected_payload(&self) -> usize {
        self.items.iter().map(RequestItem::payload_len).sum()
    }

    /// Serializes the job to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let param_len = 2 + REQUEST_ITEM_SIZE * self.items.len();
        let mut bytes = Vec::with_capacity(10 + param_len);
        bytes.extend_from_slice(&job_header(self.pdu_ref, param_len as u16, 0));
        bytes.push(FN_READ_VAR);
        bytes.push(self.items.len() as u8);
        for item in &self.items {
            bytes.extend_from_slice(&item.to_bytes());
        }
        bytes
    }
}

/// Write-Var job carrying one item and its payload.
///
/// Writes carry a single item per PDU; the response reduces to one
/// aggregate status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pdu_ref: u16,
    item: RequestItem,
    data: Vec<u8>,
}

impl WriteRequest {
    /// Creates a write job for the given item and payload.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidParameter` if the payload length does not
    /// match the item's transfer length.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::command::{WriteRequest, RequestItem};
    /// use s7comm::Area;
    ///
    /// let item = RequestItem::bytes(Area::DataBlock, 18, 10, 4).unwrap();
    /// let job = WriteRequest::new(0x0002, item, 25.5f32.to_be_bytes().to_vec()).unwrap();
    /// assert_eq!(job.to_bytes().len(), 32);
    /// ```
    pub fn new(pdu_ref: u16, item: RequestItem, data: Vec<u8>) -> Result<Self> {
        if data.len() != item.payload_len() {
            return Err(S7Error::invalid_parameter(
                "data",
                format!(
                    "payload is {} bytes but the item transfers {}",
                    data.len(),
                    item.payload_len()
                ),
            ));
        }

        Ok(Self {
            pdu_ref,
            item,
            data,
        })
    }

    /// Returns the PDU reference stamped into this job.
    pub fn pdu_ref(&self) -> u16 {
        self.pdu_ref
    }

    /// Serializes the job to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let param_len = 2 + REQUEST_ITEM_SIZE;
        let data_len = 4 + self.data.len();
        let mut bytes = Vec::with_capacity(10 + param_len + data_len);
        bytes.extend_from_slice(&job_header(
            self.pdu_ref,
            param_len as u16,
            data_len as u16,
        ));
        bytes.push(FN_WRITE_VAR);
        bytes.push(0x01); // item count
        bytes.extend_from_slice(&self.item.to_bytes());

        // data section: reserved, transport size, length, payload
        let transport_size = self.item.data_transport_size();
        let length_field = match transport_size {
            DATA_TS_BIT | DATA_TS_OCTET => self.data.len() as u16,
            _ => (self.data.len() * 8) as u16,
        };
        bytes.push(0x00);
        bytes.push(transport_size);
        bytes.extend_from_slice(&length_field.to_be_bytes());
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_request_serialization() {
        let setup = SetupRequest::new(0x0001, PROPOSED_PDU_LENGTH);
        let bytes = setup.to_bytes();

        // Header (10) + function + reserved + 2 * AMQ (2) + PDU length (2)
        assert_eq!(bytes.len(), 18);

        assert_eq!(bytes[0], 0x32); // protocol id
        assert_eq!(bytes[1], 0x01); // job
        assert_eq!(&bytes[4..6], &[0x00, 0x01]); // PDU reference
        assert_eq!(&bytes[6..8], &[0x00, 0x08]); // parameter length
        assert_eq!(&bytes[8..10], &[0x00, 0x00]); // data length
        assert_eq!(bytes[10], 0xF0); // setup communication
        assert_eq!(&bytes[12..14], &[0x00, 0x01]); // max AMQ calling
        assert_eq!(&bytes[14..16], &[0x00, 0x01]); // max AMQ called
        assert_eq!(&bytes[16..18], &[0x01, 0xE0]); // proposed length 480
    }

    #[test]
    fn test_byte_item_serialization() {
        let item = RequestItem::bytes(Area::DataBlock, 18, 4, 24).unwrap();
        let bytes = item.to_bytes();

        assert_eq!(&bytes[0..3], &[0x12, 0x0A, 0x10]); // variable specification
        assert_eq!(bytes[3], 0x02); // transport size byte
        assert_eq!(&bytes[4..6], &[0x00, 0x18]); // count 24
        assert_eq!(&bytes[6..8], &[0x00, 0x12]); // DB 18
        assert_eq!(bytes[8], 0x84); // area
        assert_eq!(&bytes[9..12], &[0x00, 0x00, 0x20]); // address 4 * 8
    }

    #[test]
    fn test_bit_item_serialization() {
        let item = RequestItem::bit(Area::Flag, 0, 5, 2).unwrap();
        let bytes = item.to_bytes();

        assert_eq!(bytes[3], 0x01); // transport size bit
        assert_eq!(&bytes[4..6], &[0x00, 0x01]); // count 1
        assert_eq!(&bytes[6..8], &[0x00, 0x00]); // no DB number
        assert_eq!(bytes[8], 0x83); // area
        assert_eq!(&bytes[9..12], &[0x00, 0x00, 0x2A]); // address 5 * 8 + 2
    }

    #[test]
    fn test_counter_item_serialization() {
        let item = RequestItem::bytes(Area::Counter, 0, 3, 8).unwrap();
        let bytes = item.to_bytes();

        assert_eq!(bytes[3], 0x1C); // transport size mirrors the area
        assert_eq!(&bytes[4..6], &[0x00, 0x04]); // four 2-byte entries
        assert_eq!(bytes[8], 0x1C); // area
        assert_eq!(&bytes[9..12], &[0x00, 0x00, 0x03]); // entry number unshifted
    }

    #[test]
    fn test_item_validation() {
        assert!(RequestItem::bytes(Area::DataBlock, 18, 0, 0).is_err());
        assert!(RequestItem::bytes(Area::Flag, 1, 0, 4).is_err());
        assert!(RequestItem::bytes(Area::Timer, 0, 0, 3).is_err());
        assert!(RequestItem::bytes(Area::DataBlock, 18, 0x20_0000, 2).is_err());

        assert!(RequestItem::bit(Area::Counter, 0, 0, 0).is_err());
        assert!(RequestItem::bit(Area::Flag, 0, 0, 8).is_err());
        assert!(RequestItem::bit(Area::Flag, 0, 0, 7).is_ok());
    }

    #[test]
    fn test_read_request_serialization() {
        let items = vec![
            RequestItem::bytes(Area::DataBlock, 18, 0, 2).unwrap(),
            RequestItem::bytes(Area::Flag, 0, 10, 4).unwrap(),
        ];
        let request = ReadRequest::new(0x1234, items).unwrap();
        let bytes = request.to_bytes();

        // Header (10) + function + count + 2 items
        assert_eq!(bytes.len(), 36);

        assert_eq!(&bytes[4..6], &[0x12, 0x34]); // PDU reference
        assert_eq!(&bytes[6..8], &[0x00, 0x1A]); // parameter length 26
        assert_eq!(bytes[10], 0x04); // read var
        assert_eq!(bytes[11], 0x02); // item count
        assert_eq!(bytes[12], 0x12); // first item
        assert_eq!(bytes[24], 0x12); // second item
        assert_eq!(request.expected_payload(), 6);
    }

    #[test]
    fn test_read_request_item_limits() {
        assert!(ReadRequest::new(0x0001, vec![]).is_err());

        let item = RequestItem::bytes(Area::Flag, 0, 0, 1).unwrap();
        let too_many = vec![item; MAX_ITEMS_PER_REQUEST + 1];
        assert!(ReadRequest::new(0x0001, too_many).is_err());

        let at_limit = vec![item; MAX_ITEMS_PER_REQUEST];
        assert!(ReadRequest::new(0x0001, at_limit).is_ok());
    }

    #[test]
    fn test_write_request_serialization() {
        let item = RequestItem::bytes(Area::DataBlock, 18, 10, 4).unwrap();
        let job = WriteRequest::new(0x0002, item, vec![0x41, 0xCC, 0x00, 0x00]).unwrap();
        let bytes = job.to_bytes();

        // Header (10) + function + count + item (12) + data header (4) + payload (4)
        assert_eq!(bytes.len(), 32);

        assert_eq!(&bytes[6..8], &[0x00, 0x0E]); // parameter length 14
        assert_eq!(&bytes[8..10], &[0x00, 0x08]); // data length 8
        assert_eq!(bytes[10], 0x05); // write var
        assert_eq!(bytes[11], 0x01); // item count
        assert_eq!(bytes[24], 0x00); // data section reserved byte
        assert_eq!(bytes[25], 0x04); // transport size byte
        assert_eq!(&bytes[26..28], &[0x00, 0x20]); // length 32 bits
        assert_eq!(&bytes[28..32], &[0x41, 0xCC, 0x00, 0x00]);
    }

    #[test]
    fn test_write_bit_serialization() {
        let item = RequestItem::bit(Area::Flag, 0, 0, 2).unwrap();
        let job = WriteRequest::new(0x0003, item, vec![0x01]).unwrap();
        let bytes = job.to_bytes();

        assert_eq!(bytes.len(), 29);
        assert_eq!(bytes[15], 0x01); // item transport size bit
        assert_eq!(bytes[25], 0x03); // data transport size bit
        assert_eq!(&bytes[26..28], &[0x00, 0x01]); // length 1 bit
        assert_eq!(bytes[28], 0x01);
    }

    #[test]
    fn test_write_payload_length_mismatch() {
        let item = RequestItem::bytes(Area::DataBlock, 18, 0, 4).unwrap();
        assert!(WriteRequest::new(0x0002, item, vec![0x00; 3]).is_err());

        let bit_item = RequestItem::bit(Area::Flag, 0, 0, 0).unwrap();
        assert!(WriteRequest::new(0x0002, bit_item, vec![0x01, 0x00]).is_err());
    }
}
