use std::fmt;
use std::str::from_utf8_unchecked;

use crate::protocol::Type;

use super::SignatureError;

/// A validated D-Bus signature.
///
/// Only the basic types used by the message header are supported: strings
/// (`s`), object paths (`o`), signatures (`g`), and 32-bit unsigned integers
/// (`u`).
///
/// # Examples
///
/// ```
/// use dbus_blocking::Signature;
///
/// const SIG: &Signature = Signature::new_const(b"su");
///
/// assert!(Signature::new(b"sou").is_ok());
/// assert!(Signature::new(b"a{sv}").is_err());
/// ```
#[derive(Hash, PartialEq, Eq)]
#[repr(transparent)]
pub struct Signature([u8]);

impl Signature {
    /// The maximum length of a signature, imposed by its single-byte length
    /// prefix on the wire.
    pub const MAX: usize = 255;

    /// The empty signature.
    pub const EMPTY: &'static Signature = Signature::new_const(b"");

    /// A string.
    pub const STRING: &'static Signature = Signature::new_const(b"s");

    /// An object path.
    pub const OBJECT_PATH: &'static Signature = Signature::new_const(b"o");

    /// A signature.
    pub const SIGNATURE: &'static Signature = Signature::new_const(b"g");

    /// Unsigned 32-bit integer.
    pub const UINT32: &'static Signature = Signature::new_const(b"u");

    /// Construct a new signature, panicking if it is not valid.
    ///
    /// # Panics
    ///
    /// Panics if the argument is not a valid signature.
    #[track_caller]
    pub const fn new_const(signature: &[u8]) -> &Signature {
        if let Err(..) = validate(signature) {
            panic!("Invalid D-Bus signature");
        }

        // SAFETY: The signature was validated just above.
        unsafe { Self::new_unchecked(signature) }
    }

    /// Construct a new validated signature.
    ///
    /// # Errors
    ///
    /// Errors if the argument is not a valid signature.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_blocking::Signature;
    ///
    /// assert!(Signature::new(b"g").is_ok());
    /// assert!(Signature::new(b"x").is_err());
    /// ```
    pub fn new<S>(signature: &S) -> Result<&Signature, SignatureError>
    where
        S: ?Sized + AsRef<[u8]>,
    {
        let signature = signature.as_ref();
        validate(signature)?;
        // SAFETY: The signature was validated just above.
        Ok(unsafe { Self::new_unchecked(signature) })
    }

    /// Construct a signature without validation.
    ///
    /// # Safety
    ///
    /// The caller must ensure the bytes form a valid signature.
    pub(crate) const unsafe fn new_unchecked(signature: &[u8]) -> &Signature {
        // SAFETY: The byte slice is repr transparent over this type.
        &*(signature as *const [u8] as *const Signature)
    }

    /// Get the signature as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the signature as a string.
    pub fn as_str(&self) -> &str {
        // SAFETY: Validation only accepts ASCII type codes.
        unsafe { from_utf8_unchecked(&self.0) }
    }

    /// Test if the signature is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The length of the signature in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for &Signature {
    #[inline]
    fn default() -> Self {
        Signature::EMPTY
    }
}

impl AsRef<Signature> for Signature {
    #[inline]
    fn as_ref(&self) -> &Signature {
        self
    }
}

impl From<&Signature> for Box<Signature> {
    fn from(signature: &Signature) -> Self {
        let boxed = Box::<[u8]>::from(signature.as_bytes());
        // SAFETY: The byte slice is repr transparent over this type.
        unsafe { Box::from_raw(Box::into_raw(boxed) as *mut Signature) }
    }
}

/// Validate that every byte is a supported type code.
const fn validate(bytes: &[u8]) -> Result<(), SignatureError> {
    if bytes.len() > Signature::MAX {
        return Err(SignatureError::SignatureTooLong);
    }

    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if !matches!(
            Type(b),
            Type::STRING | Type::OBJECT_PATH | Type::SIGNATURE | Type::UINT32
        ) {
            return Err(SignatureError::UnknownTypeCode(b));
        }

        i += 1;
    }

    Ok(())
}
