// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::messages::ErrorCode;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("malformed pdu: {0}")]
    MalformedPdu(String),

    #[error("unsupported pdu type {0}")]
    UnsupportedPduType(u8),

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("unexpected protocol version {got}, session uses {expected}")]
    UnexpectedVersion { expected: u8, got: u8 },

    #[error("no snapshot has been loaded")]
    SnapshotUnavailable,

    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    #[error("invalid roa: {0}")]
    InvalidRoa(String),

    #[error("pdu too large: {0}")]
    TooLarge(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config: {0}")]
    Config(String),

    #[error("disconnected")]
    Disconnected,

    #[error("attempt to send a pdu when not connected")]
    NotConnected,

    #[error("invalid error code: {0}")]
    ErrorCode(#[from] num_enum::TryFromPrimitiveError<ErrorCode>),
}

impl Error {
    /// The error code to put in an Error Report sent in response to this
    /// error, if the error is one the peer should be told about.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::MalformedPdu(_) | Self::ErrorCode(_) => {
                Some(ErrorCode::CorruptData)
            }
            Self::UnsupportedPduType(_) => Some(ErrorCode::UnsupportedPduType),
            Self::UnsupportedVersion(_) => {
                Some(ErrorCode::UnsupportedProtocolVersion)
            }
            Self::UnexpectedVersion { .. } => {
                Some(ErrorCode::UnexpectedProtocolVersion)
            }
            Self::SnapshotUnavailable => Some(ErrorCode::NoDataAvailable),
            _ => None,
        }
    }
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for Error {
    fn from(e: nom::Err<nom::error::Error<&'a [u8]>>) -> Error {
        let msg = match e {
            nom::Err::Incomplete(_) => "unexpected end of input".to_string(),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                format!("{:?} with {} bytes left", e.code, e.input.len())
            }
        };
        Error::MalformedPdu(msg)
    }
}
