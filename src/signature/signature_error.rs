use std::error;
use std::fmt;

use crate::protocol::Type;

/// Detailed errors raised when validation of a [`Signature`] fails.
///
/// [`Signature`]: crate::Signature
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SignatureError {
    UnknownTypeCode(u8),
    SignatureTooLong,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SignatureError::UnknownTypeCode(code) => {
                write!(f, "Unknown type code: {:?}", Type(code))
            }
            SignatureError::SignatureTooLong => {
                write!(f, "Signature too long")
            }
        }
    }
}

impl error::Error for SignatureError {}
