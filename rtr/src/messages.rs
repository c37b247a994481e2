// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::types::{Prefix, Prefix4, Prefix6, Roa};
use nom::{
    bytes::complete::take,
    number::complete::{be_u16, be_u32, be_u8},
    IResult,
};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Deserialize;
use std::fmt::{self, Display, Formatter};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Largest PDU this implementation will read. Only Error Reports are variable
/// length, and no sane report comes anywhere near this.
pub const MAX_PDU_SIZE: usize = 1 << 16;

/// RTR protocol versions.
///
/// Ref: RFC 6810 (version 0), RFC 8210 (version 1)
#[derive(
    Debug,
    Eq,
    PartialEq,
    PartialOrd,
    Ord,
    TryFromPrimitive,
    IntoPrimitive,
    Copy,
    Clone,
)]
#[repr(u8)]
pub enum ProtocolVersion {
    V0 = 0,
    V1 = 1,
}

impl ProtocolVersion {
    pub const LATEST: ProtocolVersion = ProtocolVersion::V1;
}

impl Display for ProtocolVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// RTR PDU types.
///
/// Ref: RFC 8210 §5
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Copy, Clone)]
#[repr(u8)]
pub enum PduType {
    /// Cache to router: the cache has new data.
    SerialNotify = 0,

    /// Router to cache: send what changed since a given serial.
    SerialQuery = 1,

    /// Router to cache: send the whole data set.
    ResetQuery = 2,

    /// Cache to router: start of a response to a query.
    CacheResponse = 3,

    Ipv4Prefix = 4,

    Ipv6Prefix = 6,

    /// Cache to router: end of a response to a query.
    EndOfData = 7,

    /// Cache to router: the cache cannot answer a serial query incrementally.
    CacheReset = 8,

    /// Either direction: something went wrong.
    ErrorReport = 10,
}

impl From<&Pdu> for PduType {
    fn from(p: &Pdu) -> Self {
        match p {
            Pdu::SerialNotify(_) => Self::SerialNotify,
            Pdu::SerialQuery(_) => Self::SerialQuery,
            Pdu::ResetQuery => Self::ResetQuery,
            Pdu::CacheResponse { .. } => Self::CacheResponse,
            Pdu::Prefix(p) if p.roa.prefix().is_v4() => Self::Ipv4Prefix,
            Pdu::Prefix(_) => Self::Ipv6Prefix,
            Pdu::EndOfData(_) => Self::EndOfData,
            Pdu::CacheReset => Self::CacheReset,
            Pdu::ErrorReport(_) => Self::ErrorReport,
        }
    }
}

/// Error Report codes.
///
/// Ref: RFC 8210 §12
#[derive(
    Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Copy, Clone,
)]
#[repr(u16)]
pub enum ErrorCode {
    CorruptData = 0,
    InternalError = 1,
    NoDataAvailable = 2,
    InvalidRequest = 3,
    UnsupportedProtocolVersion = 4,
    UnsupportedPduType = 5,
    WithdrawalOfUnknownRecord = 6,
    DuplicateAnnouncement = 7,
    UnexpectedProtocolVersion = 8,
}

impl ErrorCode {
    /// Whether the session must be torn down after sending or receiving a
    /// report with this code. Only "No Data Available" is recoverable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ErrorCode::NoDataAvailable)
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CorruptData => "corrupt data",
            Self::InternalError => "internal error",
            Self::NoDataAvailable => "no data available",
            Self::InvalidRequest => "invalid request",
            Self::UnsupportedProtocolVersion => "unsupported protocol version",
            Self::UnsupportedPduType => "unsupported pdu type",
            Self::WithdrawalOfUnknownRecord => "withdrawal of unknown record",
            Self::DuplicateAnnouncement => "duplicate announcement",
            Self::UnexpectedProtocolVersion => "unexpected protocol version",
        };
        write!(f, "{s}")
    }
}

/// Every RTR PDU starts with a fixed size header.
///
/// ```text
///  0          8          16         24        31
/// .-------------------------------------------.
/// | Protocol |   PDU    |                     |
/// | Version  |   Type   | Session ID / Code   |
/// +-------------------------------------------+
/// |                                           |
/// |                 Length                    |
/// |                                           |
/// `-------------------------------------------'
/// ```
///
/// The pdu type is kept raw so that a header can be read from the wire before
/// deciding whether the type is one we understand.
///
/// Ref: RFC 8210 §5.1
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Header {
    pub version: u8,
    pub typ: u8,
    /// Session id, error code, or zero depending on the pdu type.
    pub session: u16,
    /// Total length of the pdu including this header.
    pub length: u32,
}

impl Header {
    pub const WIRE_SIZE: usize = 8;

    pub fn to_wire(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0] = self.version;
        buf[1] = self.typ;
        buf[2..4].copy_from_slice(&self.session.to_be_bytes());
        buf[4..8].copy_from_slice(&self.length.to_be_bytes());
        buf
    }

    pub fn from_wire(input: &[u8]) -> Result<Header, Error> {
        let (input, version) = parse_u8(input)?;
        let (input, typ) = parse_u8(input)?;
        let (input, session) = parse_u16(input)?;
        let (_, length) = parse_u32(input)?;
        Ok(Header {
            version,
            typ,
            session,
            length,
        })
    }

    /// Total pdu length as a buffer size, after checking that it is at least
    /// a header and no larger than `MAX_PDU_SIZE`.
    pub fn pdu_len(&self) -> Result<usize, Error> {
        let len = usize::try_from(self.length)
            .map_err(|_| Error::MalformedPdu("length overflow".into()))?;
        if len < Self::WIRE_SIZE {
            return Err(Error::MalformedPdu(format!(
                "declared length {len} shorter than header"
            )));
        }
        if len > MAX_PDU_SIZE {
            return Err(Error::MalformedPdu(format!(
                "declared length {len} exceeds {MAX_PDU_SIZE}"
            )));
        }
        Ok(len)
    }
}

/// A pdu together with the protocol version it is sent with.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Message {
    pub version: ProtocolVersion,
    pub pdu: Pdu,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Pdu {
    SerialNotify(SerialPdu),
    SerialQuery(SerialPdu),
    ResetQuery,
    CacheResponse { session_id: u16 },
    Prefix(PrefixPdu),
    EndOfData(EndOfData),
    CacheReset,
    ErrorReport(ErrorReport),
}

impl Pdu {
    pub fn title(&self) -> &'static str {
        match self {
            Self::SerialNotify(_) => "serial notify",
            Self::SerialQuery(_) => "serial query",
            Self::ResetQuery => "reset query",
            Self::CacheResponse { .. } => "cache response",
            Self::Prefix(_) => "prefix",
            Self::EndOfData(_) => "end of data",
            Self::CacheReset => "cache reset",
            Self::ErrorReport(_) => "error report",
        }
    }

    /// The value carried in the header's session/code field.
    fn header_session(&self) -> u16 {
        match self {
            Self::SerialNotify(s) | Self::SerialQuery(s) => s.session_id,
            Self::CacheResponse { session_id } => *session_id,
            Self::EndOfData(e) => e.session_id,
            Self::ErrorReport(e) => e.code.into(),
            Self::ResetQuery | Self::Prefix(_) | Self::CacheReset => 0,
        }
    }

    fn body_to_wire(&self, version: ProtocolVersion) -> Result<Vec<u8>, Error> {
        match self {
            Self::SerialNotify(s) | Self::SerialQuery(s) => Ok(s.to_wire()),
            Self::ResetQuery
            | Self::CacheResponse { .. }
            | Self::CacheReset => Ok(Vec::new()),
            Self::Prefix(p) => Ok(p.to_wire()),
            Self::EndOfData(e) => e.to_wire(version),
            Self::ErrorReport(e) => e.to_wire(),
        }
    }
}

impl From<PrefixPdu> for Pdu {
    fn from(p: PrefixPdu) -> Pdu {
        Pdu::Prefix(p)
    }
}

impl From<EndOfData> for Pdu {
    fn from(e: EndOfData) -> Pdu {
        Pdu::EndOfData(e)
    }
}

impl From<ErrorReport> for Pdu {
    fn from(e: ErrorReport) -> Pdu {
        Pdu::ErrorReport(e)
    }
}

impl Message {
    pub fn new(version: ProtocolVersion, pdu: impl Into<Pdu>) -> Self {
        Self {
            version,
            pdu: pdu.into(),
        }
    }

    /// Serialize a message, header included. The header length is computed
    /// from the serialized body, so it always matches the bytes returned.
    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let body = self.pdu.body_to_wire(self.version)?;
        let length = u32::try_from(body.len() + Header::WIRE_SIZE)
            .ok()
            .filter(|l| *l as usize <= MAX_PDU_SIZE)
            .ok_or_else(|| {
                Error::TooLarge(format!(
                    "{} body {}",
                    self.pdu.title(),
                    body.len()
                ))
            })?;
        let header = Header {
            version: self.version.into(),
            typ: PduType::from(&self.pdu) as u8,
            session: self.pdu.header_session(),
            length,
        };
        let mut buf = header.to_wire().to_vec();
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Deserialize exactly one pdu. `input` must hold the whole pdu and
    /// nothing else: a declared length that disagrees with the input, or a
    /// body that does not consume it exactly, is malformed.
    pub fn from_wire(input: &[u8]) -> Result<Message, Error> {
        if input.len() < Header::WIRE_SIZE {
            return Err(Error::MalformedPdu(format!(
                "{} bytes is shorter than a header",
                input.len()
            )));
        }
        let header = Header::from_wire(input)?;
        let version = ProtocolVersion::try_from(header.version)
            .map_err(|_| Error::UnsupportedVersion(header.version))?;
        let typ = PduType::try_from(header.typ)
            .map_err(|_| Error::UnsupportedPduType(header.typ))?;

        if header.length as usize != input.len() {
            return Err(Error::MalformedPdu(format!(
                "declared length {} but got {} bytes",
                header.length,
                input.len()
            )));
        }
        if let Some(expected) = fixed_length(typ, version) {
            if header.length != expected {
                return Err(Error::MalformedPdu(format!(
                    "{typ:?} must be {expected} bytes, declared {}",
                    header.length
                )));
            }
        }

        let body = &input[Header::WIRE_SIZE..];
        let session = header.session;
        let pdu = match typ {
            PduType::SerialNotify => {
                Pdu::SerialNotify(SerialPdu::from_wire(session, body)?)
            }
            PduType::SerialQuery => {
                Pdu::SerialQuery(SerialPdu::from_wire(session, body)?)
            }
            PduType::ResetQuery => Pdu::ResetQuery,
            PduType::CacheResponse => Pdu::CacheResponse {
                session_id: session,
            },
            PduType::Ipv4Prefix => Pdu::Prefix(PrefixPdu::from_wire_v4(body)?),
            PduType::Ipv6Prefix => Pdu::Prefix(PrefixPdu::from_wire_v6(body)?),
            PduType::EndOfData => {
                Pdu::EndOfData(EndOfData::from_wire(version, session, body)?)
            }
            PduType::CacheReset => Pdu::CacheReset,
            PduType::ErrorReport => {
                Pdu::ErrorReport(ErrorReport::from_wire(session, body)?)
            }
        };

        Ok(Message { version, pdu })
    }
}

/// Split the first pdu off the front of `input` using its declared length.
/// Returns the pdu bytes and the remainder.
pub fn take_pdu(input: &[u8]) -> Result<(&[u8], &[u8]), Error> {
    if input.len() < Header::WIRE_SIZE {
        return Err(Error::MalformedPdu(format!(
            "{} bytes is shorter than a header",
            input.len()
        )));
    }
    let len = Header::from_wire(input)?.pdu_len()?;
    if input.len() < len {
        return Err(Error::MalformedPdu(format!(
            "truncated pdu: declared {len} bytes, have {}",
            input.len()
        )));
    }
    Ok(input.split_at(len))
}

/// Lengths of the pdu types that have no variable part.
fn fixed_length(typ: PduType, version: ProtocolVersion) -> Option<u32> {
    match typ {
        PduType::SerialNotify | PduType::SerialQuery => Some(12),
        PduType::ResetQuery | PduType::CacheResponse | PduType::CacheReset => {
            Some(8)
        }
        PduType::Ipv4Prefix => Some(20),
        PduType::Ipv6Prefix => Some(32),
        PduType::EndOfData => match version {
            ProtocolVersion::V0 => Some(12),
            ProtocolVersion::V1 => Some(24),
        },
        PduType::ErrorReport => None,
    }
}

/// Body of Serial Notify and Serial Query.
///
/// ```text
/// .-------------------------------------------.
/// |                                           |
/// |               Serial Number               |
/// |                                           |
/// `-------------------------------------------'
/// ```
///
/// Ref: RFC 8210 §5.2, §5.3
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SerialPdu {
    pub session_id: u16,
    pub serial: u32,
}

impl SerialPdu {
    pub fn to_wire(&self) -> Vec<u8> {
        self.serial.to_be_bytes().to_vec()
    }

    pub fn from_wire(session_id: u16, input: &[u8]) -> Result<Self, Error> {
        let (_, serial) = parse_u32(input)?;
        Ok(Self { session_id, serial })
    }
}

/// Flag bit marking a prefix as announced rather than withdrawn.
pub const FLAG_ANNOUNCE: u8 = 1;

/// Body of the IPv4 and IPv6 Prefix pdus. The address is 4 or 16 bytes
/// depending on the family of the ROA.
///
/// ```text
/// .-------------------------------------------.
/// |          |  Prefix  |   Max    |          |
/// |  Flags   |  Length  |  Length  |   zero   |
/// |          |   0..32  |   0..32  |          |
/// +-------------------------------------------+
/// |                                           |
/// |                IPv4 Prefix                |
/// |                                           |
/// +-------------------------------------------+
/// |                                           |
/// |         Autonomous System Number          |
/// |                                           |
/// `-------------------------------------------'
/// ```
///
/// Ref: RFC 8210 §5.6, §5.7
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PrefixPdu {
    pub announce: bool,
    pub roa: Roa,
}

impl PrefixPdu {
    pub fn announce(roa: Roa) -> Self {
        Self {
            announce: true,
            roa,
        }
    }

    pub fn withdraw(roa: Roa) -> Self {
        Self {
            announce: false,
            roa,
        }
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let prefix = self.roa.prefix();
        let mut buf = Vec::with_capacity(24);
        buf.push(if self.announce { FLAG_ANNOUNCE } else { 0 });
        buf.push(prefix.length());
        buf.push(self.roa.max_length());
        buf.push(0);
        match prefix {
            Prefix::V4(p) => buf.extend_from_slice(&p.value.octets()),
            Prefix::V6(p) => buf.extend_from_slice(&p.value.octets()),
        }
        buf.extend_from_slice(&self.roa.origin_asn().to_be_bytes());
        buf
    }

    pub fn from_wire_v4(input: &[u8]) -> Result<Self, Error> {
        let (input, (flags, length, max_length)) = parse_prefix_lead(input)?;
        let (input, addr) = parse_u32(input)?;
        let (_, asn) = parse_u32(input)?;
        let prefix = Prefix4::new(Ipv4Addr::from(addr), length)
            .map_err(|e| Error::MalformedPdu(e.to_string()))?;
        Self::from_parts(flags, prefix.into(), max_length, asn)
    }

    pub fn from_wire_v6(input: &[u8]) -> Result<Self, Error> {
        let (input, (flags, length, max_length)) = parse_prefix_lead(input)?;
        let (input, addr) = parse_bytes(input, 16)?;
        let (_, asn) = parse_u32(input)?;
        let octets: [u8; 16] = addr
            .try_into()
            .map_err(|_| Error::MalformedPdu("ipv6 address".into()))?;
        let prefix = Prefix6::new(Ipv6Addr::from(octets), length)
            .map_err(|e| Error::MalformedPdu(e.to_string()))?;
        Self::from_parts(flags, prefix.into(), max_length, asn)
    }

    fn from_parts(
        flags: u8,
        prefix: Prefix,
        max_length: u8,
        asn: u32,
    ) -> Result<Self, Error> {
        let roa = Roa::new(prefix, max_length, asn)
            .map_err(|e| Error::MalformedPdu(e.to_string()))?;
        Ok(Self {
            announce: flags & FLAG_ANNOUNCE != 0,
            roa,
        })
    }
}

/// The protocol timers a cache hands to its routers, in seconds.
///
/// Ref: RFC 8210 §6
#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Timers {
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
}

impl Default for Timers {
    fn default() -> Self {
        Self {
            refresh: 900,
            retry: 30,
            expire: 171999,
        }
    }
}

impl Timers {
    pub const REFRESH_RANGE: std::ops::RangeInclusive<u32> = 1..=86400;
    pub const RETRY_RANGE: std::ops::RangeInclusive<u32> = 1..=7200;
    pub const EXPIRE_RANGE: std::ops::RangeInclusive<u32> = 600..=172800;

    /// Check the timers against the ranges of RFC 8210 §6. Expire must also
    /// exceed both refresh and retry.
    pub fn validate(&self) -> Result<(), Error> {
        if !Self::REFRESH_RANGE.contains(&self.refresh) {
            return Err(Error::Config(format!(
                "refresh interval {} outside {:?}",
                self.refresh,
                Self::REFRESH_RANGE
            )));
        }
        if !Self::RETRY_RANGE.contains(&self.retry) {
            return Err(Error::Config(format!(
                "retry interval {} outside {:?}",
                self.retry,
                Self::RETRY_RANGE
            )));
        }
        if !Self::EXPIRE_RANGE.contains(&self.expire) {
            return Err(Error::Config(format!(
                "expire interval {} outside {:?}",
                self.expire,
                Self::EXPIRE_RANGE
            )));
        }
        if self.expire <= self.refresh || self.expire <= self.retry {
            return Err(Error::Config(
                "expire interval must exceed refresh and retry".into(),
            ));
        }
        Ok(())
    }
}

/// End of Data. Version 0 carries only the serial, version 1 appends the
/// timers.
///
/// ```text
/// .-------------------------------------------.
/// | Protocol |   PDU    |                     |
/// | Version  |   Type   |     Session ID      |
/// |    1     |    7     |                     |
/// +-------------------------------------------+
/// |                                           |
/// |                 Length=24                 |
/// |                                           |
/// +-------------------------------------------+
/// |                                           |
/// |               Serial Number               |
/// |                                           |
/// +-------------------------------------------+
/// |                                           |
/// |              Refresh Interval             |
/// |                                           |
/// +-------------------------------------------+
/// |                                           |
/// |               Retry Interval              |
/// |                                           |
/// +-------------------------------------------+
/// |                                           |
/// |              Expire Interval              |
/// |                                           |
/// `-------------------------------------------'
/// ```
///
/// Ref: RFC 8210 §5.8, RFC 6810 §5.8
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct EndOfData {
    pub session_id: u16,
    pub serial: u32,
    pub timers: Option<Timers>,
}

impl EndOfData {
    /// Build the End of Data appropriate for `version`.
    pub fn new(
        version: ProtocolVersion,
        session_id: u16,
        serial: u32,
        timers: Timers,
    ) -> Self {
        let timers = match version {
            ProtocolVersion::V0 => None,
            ProtocolVersion::V1 => Some(timers),
        };
        Self {
            session_id,
            serial,
            timers,
        }
    }

    pub fn to_wire(&self, version: ProtocolVersion) -> Result<Vec<u8>, Error> {
        let mut buf = self.serial.to_be_bytes().to_vec();
        match (version, self.timers) {
            (ProtocolVersion::V0, None) => {}
            (ProtocolVersion::V1, Some(t)) => {
                buf.extend_from_slice(&t.refresh.to_be_bytes());
                buf.extend_from_slice(&t.retry.to_be_bytes());
                buf.extend_from_slice(&t.expire.to_be_bytes());
            }
            (v, _) => {
                return Err(Error::MalformedPdu(format!(
                    "end of data timers do not match version {v}"
                )))
            }
        }
        Ok(buf)
    }

    pub fn from_wire(
        version: ProtocolVersion,
        session_id: u16,
        input: &[u8],
    ) -> Result<Self, Error> {
        let (input, serial) = parse_u32(input)?;
        let timers = match version {
            ProtocolVersion::V0 => None,
            ProtocolVersion::V1 => {
                let (input, refresh) = parse_u32(input)?;
                let (input, retry) = parse_u32(input)?;
                let (_, expire) = parse_u32(input)?;
                Some(Timers {
                    refresh,
                    retry,
                    expire,
                })
            }
        };
        Ok(Self {
            session_id,
            serial,
            timers,
        })
    }
}

/// Error Report. The error code travels in the header's session field.
///
/// ```text
/// .-------------------------------------------.
/// |                                           |
/// |       Length of Encapsulated PDU          |
/// |                                           |
/// +-------------------------------------------+
/// ~                                           ~
/// ~           Copy of Erroneous PDU           ~
/// ~                                           ~
/// +-------------------------------------------+
/// |                                           |
/// |           Length of Error Text            |
/// |                                           |
/// +-------------------------------------------+
/// ~                                           ~
/// ~      Arbitrary Text of Error Diagnostic   ~
/// ~                                           ~
/// `-------------------------------------------'
/// ```
///
/// Ref: RFC 8210 §5.11
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub pdu: Vec<u8>,
    pub text: String,
}

impl ErrorReport {
    pub fn new(
        code: ErrorCode,
        pdu: impl Into<Vec<u8>>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            code,
            pdu: pdu.into(),
            text: text.into(),
        }
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let pdu_len = u32::try_from(self.pdu.len())
            .map_err(|_| Error::TooLarge("encapsulated pdu".into()))?;
        let text_len = u32::try_from(self.text.len())
            .map_err(|_| Error::TooLarge("error text".into()))?;
        let mut buf = Vec::with_capacity(8 + self.pdu.len() + self.text.len());
        buf.extend_from_slice(&pdu_len.to_be_bytes());
        buf.extend_from_slice(&self.pdu);
        buf.extend_from_slice(&text_len.to_be_bytes());
        buf.extend_from_slice(self.text.as_bytes());
        Ok(buf)
    }

    pub fn from_wire(code: u16, input: &[u8]) -> Result<Self, Error> {
        let code = ErrorCode::try_from(code)?;
        let (input, pdu_len) = parse_u32(input)?;
        let (input, pdu) = parse_bytes(input, pdu_len as usize)?;
        let (input, text_len) = parse_u32(input)?;
        let (input, text) = parse_bytes(input, text_len as usize)?;
        if !input.is_empty() {
            return Err(Error::MalformedPdu(format!(
                "{} trailing bytes after error text",
                input.len()
            )));
        }
        let text = std::str::from_utf8(text)
            .map_err(|e| Error::MalformedPdu(format!("error text: {e}")))?;
        Ok(Self {
            code,
            pdu: pdu.to_vec(),
            text: text.to_string(),
        })
    }
}

fn parse_u8(input: &[u8]) -> IResult<&[u8], u8> {
    be_u8(input)
}

fn parse_u16(input: &[u8]) -> IResult<&[u8], u16> {
    be_u16(input)
}

fn parse_u32(input: &[u8]) -> IResult<&[u8], u32> {
    be_u32(input)
}

fn parse_bytes(input: &[u8], n: usize) -> IResult<&[u8], &[u8]> {
    take(n)(input)
}

/// Flags, prefix length, max length and the zero byte of a prefix pdu.
fn parse_prefix_lead(input: &[u8]) -> IResult<&[u8], (u8, u8, u8)> {
    let (input, flags) = parse_u8(input)?;
    let (input, length) = parse_u8(input)?;
    let (input, max_length) = parse_u8(input)?;
    let (input, _zero) = parse_u8(input)?;
    Ok((input, (flags, length, max_length)))
}
