use crate::{OwnedBuf, Signature};

mod sealed {
    use crate::Signature;

    pub trait Sealed {}
    impl Sealed for [u8] {}
    impl Sealed for str {}
    impl Sealed for Signature {}
}

/// An element that can be serialized to a buffer.
pub trait Write: self::sealed::Sealed {
    /// Write `self` into `buf`.
    fn write_to(&self, buf: &mut OwnedBuf);
}

/// Write a length-prefixed byte slice to the buffer.
///
/// # Examples
///
/// ```
/// use dbus_blocking::buf::OwnedBuf;
///
/// let mut buf = OwnedBuf::new();
/// buf.write(&b"foo"[..]);
///
/// assert_eq!(buf.get(), &[3, 0, 0, 0, 102, 111, 111, 0])
/// ```
impl Write for [u8] {
    #[inline]
    fn write_to(&self, buf: &mut OwnedBuf) {
        buf.store(self.len() as u32);
        buf.extend_from_slice_nul(self);
    }
}

/// Write a length-prefixed string to the buffer.
///
/// # Examples
///
/// ```
/// use dbus_blocking::buf::OwnedBuf;
///
/// let mut buf = OwnedBuf::new();
/// buf.write("foo");
///
/// assert_eq!(buf.get(), &[3, 0, 0, 0, 102, 111, 111, 0])
/// ```
impl Write for str {
    #[inline]
    fn write_to(&self, buf: &mut OwnedBuf) {
        self.as_bytes().write_to(buf);
    }
}

/// Write a signature with its single-byte length prefix to the buffer.
///
/// # Examples
///
/// ```
/// use dbus_blocking::buf::OwnedBuf;
/// use dbus_blocking::Signature;
///
/// let mut buf = OwnedBuf::new();
/// buf.write(Signature::UINT32);
///
/// assert_eq!(buf.get(), &[1, b'u', 0])
/// ```
impl Write for Signature {
    #[inline]
    fn write_to(&self, buf: &mut OwnedBuf) {
        buf.store(self.len() as u8);
        buf.extend_from_slice_nul(self.as_bytes());
    }
}
