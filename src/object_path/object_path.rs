use std::fmt;
use std::str::from_utf8_unchecked;

use super::ObjectPathError;

/// A validated object path.
///
/// * The path must begin with an ASCII `/` character, and must consist of
///   elements separated by slash characters.
/// * Each element must only contain the ASCII characters `[A-Z][a-z][0-9]_`.
/// * No element may be the empty string, so multiple `/` characters cannot
///   occur in sequence and a trailing `/` is only allowed for the root path.
#[derive(PartialEq, Eq)]
#[repr(transparent)]
pub struct ObjectPath([u8]);

impl ObjectPath {
    /// The special `"/"` object path.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_blocking::ObjectPath;
    ///
    /// assert_eq!(ObjectPath::ROOT, ObjectPath::new(b"/")?);
    /// # Ok::<_, dbus_blocking::ObjectPathError>(())
    /// ```
    pub const ROOT: &'static Self = Self::new_const(b"/");

    /// Construct a new object path, panicking if it is not valid.
    ///
    /// # Panics
    ///
    /// Panics if the argument is not a valid object path.
    #[track_caller]
    pub const fn new_const(path: &[u8]) -> &Self {
        if !validate(path) {
            panic!("Invalid D-Bus object path");
        }

        // SAFETY: The path was validated just above.
        unsafe { Self::new_unchecked(path) }
    }

    /// Construct a new validated object path.
    ///
    /// # Errors
    ///
    /// Errors if the argument is not a valid object path.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_blocking::ObjectPath;
    ///
    /// assert!(ObjectPath::new(b"/org/freedesktop/DBus").is_ok());
    /// assert!(ObjectPath::new(b"/org//freedesktop").is_err());
    /// ```
    pub fn new<P>(path: &P) -> Result<&Self, ObjectPathError>
    where
        P: ?Sized + AsRef<[u8]>,
    {
        let path = path.as_ref();

        if !validate(path) {
            return Err(ObjectPathError);
        }

        // SAFETY: The path was validated just above.
        Ok(unsafe { Self::new_unchecked(path) })
    }

    /// Construct an object path without validation.
    ///
    /// # Safety
    ///
    /// The caller must ensure the bytes form a valid object path.
    const unsafe fn new_unchecked(path: &[u8]) -> &Self {
        // SAFETY: The byte slice is repr transparent over this type.
        &*(path as *const [u8] as *const ObjectPath)
    }

    /// Get the object path as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the object path as a string.
    pub fn as_str(&self) -> &str {
        // SAFETY: Validation only accepts ASCII characters.
        unsafe { from_utf8_unchecked(&self.0) }
    }
}

impl fmt::Debug for ObjectPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for ObjectPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate an object path.
const fn validate(bytes: &[u8]) -> bool {
    let [b'/', bytes @ ..] = bytes else {
        return false;
    };

    // Special case: "/" is a valid path.
    if bytes.is_empty() {
        return true;
    }

    let mut bytes = bytes;
    let mut component = false;

    while let [b, rest @ ..] = bytes {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' => {
                component = true;
            }
            b'/' => {
                if !component {
                    return false;
                }

                component = false;
            }
            _ => {
                return false;
            }
        }

        bytes = rest;
    }

    component
}
