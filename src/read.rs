use std::str::from_utf8;

use crate::error::Result;
use crate::{ReadBuf, Signature};

mod sealed {
    use crate::Signature;

    pub trait Sealed {}
    impl Sealed for [u8] {}
    impl Sealed for str {}
    impl Sealed for Signature {}
}

/// An element that can be deserialized from a buffer.
pub trait Read: self::sealed::Sealed {
    /// Read the type from the given buffer.
    fn read_from<'de>(buf: &mut ReadBuf<'de>) -> Result<&'de Self>;
}

/// Read a byte slice with a 4-byte length prefix.
impl Read for [u8] {
    #[inline]
    fn read_from<'de>(buf: &mut ReadBuf<'de>) -> Result<&'de Self> {
        let len = buf.load::<u32>()? as usize;
        buf.load_slice(len)
    }
}

/// Read a NUL-terminated string with a 4-byte length prefix.
impl Read for str {
    #[inline]
    fn read_from<'de>(buf: &mut ReadBuf<'de>) -> Result<&'de Self> {
        let len = buf.load::<u32>()? as usize;
        let bytes = buf.load_slice_nul(len)?;
        Ok(from_utf8(bytes)?)
    }
}

/// Read a NUL-terminated signature with a single-byte length prefix.
impl Read for Signature {
    #[inline]
    fn read_from<'de>(buf: &mut ReadBuf<'de>) -> Result<&'de Self> {
        let len = buf.load::<u8>()? as usize;
        let bytes = buf.load_slice_nul(len)?;
        Ok(Signature::new(bytes)?)
    }
}
