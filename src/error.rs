use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;

use crate::protocol::Variant;
use crate::transport::TransportState;
use crate::ObjectPathError;
use crate::Signature;
use crate::SignatureError;

/// Result alias using an [`Error`] as the error type by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by this crate.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    operation: Option<&'static str>,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Self {
            kind,
            operation: None,
        }
    }

    /// Attach the name of the operation that raised this error.
    ///
    /// The innermost operation wins, so re-attaching along the propagation
    /// path keeps the original context.
    #[inline]
    pub(crate) fn op(mut self, operation: &'static str) -> Error {
        if self.operation.is_none() {
            self.operation = Some(operation);
        }

        self
    }

    /// The name of the operation that raised this error, if known.
    #[inline]
    pub fn operation(&self) -> Option<&'static str> {
        self.operation
    }

    /// Test if the error was caused by an exhausted time budget.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }
}

impl From<SignatureError> for Error {
    #[inline]
    fn from(error: SignatureError) -> Self {
        Self::new(ErrorKind::Signature(error))
    }
}

impl From<ObjectPathError> for Error {
    #[inline]
    fn from(error: ObjectPathError) -> Self {
        Self::new(ErrorKind::ObjectPath(error))
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Self {
        Self::new(ErrorKind::Io(error))
    }
}

impl From<Utf8Error> for Error {
    #[inline]
    fn from(error: Utf8Error) -> Self {
        Self::new(ErrorKind::Utf8Error(error))
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(operation) = self.operation {
            write!(f, "{operation}: ")?;
        }

        match &self.kind {
            ErrorKind::Io(error) => error.fmt(f),
            ErrorKind::Connect(error) => write!(f, "Connection failed: {error}"),
            ErrorKind::Signature(error) => error.fmt(f),
            ErrorKind::ObjectPath(error) => error.fmt(f),
            ErrorKind::Utf8Error(error) => error.fmt(f),
            ErrorKind::Timeout => write!(f, "Timed out"),
            ErrorKind::BufferUnderflow => write!(f, "Buffer underflow"),
            ErrorKind::MissingBus => write!(f, "Missing session bus"),
            ErrorKind::InvalidAddress => write!(f, "Invalid d-bus address"),
            ErrorKind::InvalidSaslResponse => write!(f, "Invalid SASL response"),
            ErrorKind::NoSupportedMechanism(advertised) => {
                write!(f, "No supported mechanism among `{advertised}`")
            }
            ErrorKind::AuthRejected(line) => {
                write!(f, "Authentication rejected: {line}")
            }
            ErrorKind::LineTooLong(length) => {
                write!(f, "SASL line of {length} bytes exceeds the line limit")
            }
            ErrorKind::InvalidState(state) => write!(f, "Invalid connection state `{state}`"),
            ErrorKind::InvalidProtocol => write!(f, "Invalid protocol"),
            ErrorKind::ProtocolVersion(version) => {
                write!(f, "Unsupported protocol version {version}")
            }
            ErrorKind::InvalidField(field) => {
                write!(f, "Unrecognized header field kind {field}")
            }
            ErrorKind::WrongSignature(field, expected, actual) => {
                write!(
                    f,
                    "Wrong signature for {field:?} field: should be `{expected}`, got `{actual}`"
                )
            }
            ErrorKind::MissingPath => write!(f, "Missing required PATH header"),
            ErrorKind::MissingMember => write!(f, "Missing required MEMBER header"),
            ErrorKind::MissingReplySerial => write!(f, "Missing required REPLY_SERIAL header"),
            ErrorKind::MissingErrorName => write!(f, "Missing required ERROR_NAME header"),
            ErrorKind::ZeroSerial => write!(f, "Zero in header serial"),
            ErrorKind::ZeroReplySerial => write!(f, "Zero REPLY_SERIAL header"),
            ErrorKind::NotNullTerminated => {
                write!(f, "String is not null terminated")
            }
            ErrorKind::FieldsTooLong(length) => {
                write!(f, "Field table of length {length} is too long (max is 67108864)")
            }
            ErrorKind::BodyTooLong(length) => {
                write!(f, "Body of length {length} is too long (max is 134217728)")
            }
            ErrorKind::ResponseError(error_name, message) => {
                write!(f, "Response error: {error_name}: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(error) => Some(error),
            ErrorKind::Connect(error) => Some(error),
            ErrorKind::Signature(error) => Some(error),
            ErrorKind::ObjectPath(error) => Some(error),
            ErrorKind::Utf8Error(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    Io(io::Error),
    Connect(io::Error),
    Signature(SignatureError),
    ObjectPath(ObjectPathError),
    Utf8Error(Utf8Error),
    Timeout,
    BufferUnderflow,
    MissingBus,
    InvalidAddress,
    InvalidSaslResponse,
    NoSupportedMechanism(Box<str>),
    AuthRejected(Box<str>),
    LineTooLong(usize),
    InvalidState(TransportState),
    InvalidProtocol,
    ProtocolVersion(u8),
    InvalidField(u8),
    WrongSignature(Variant, &'static Signature, Box<Signature>),
    MissingPath,
    MissingMember,
    MissingReplySerial,
    MissingErrorName,
    ZeroSerial,
    ZeroReplySerial,
    NotNullTerminated,
    FieldsTooLong(u32),
    BodyTooLong(u32),
    ResponseError(Box<str>, Box<str>),
}
