use crate::protocol::Endianness;

/// A fixed-layout value in the wire protocol.
///
/// Values implementing this trait are read from and written to the wire as
/// raw bytes, after [`adjust()`] has been applied to every multi-byte field.
///
/// [`adjust()`]: Self::adjust
///
/// # Safety
///
/// The implementor must be `repr(C)` or `repr(transparent)` without interior
/// padding, must inhabit any bit pattern, and must have an alignment of at
/// most 8.
pub unsafe trait Frame: Copy {
    /// Byte-swap every multi-byte field if `endianness` differs from the
    /// native representation.
    fn adjust(&mut self, endianness: Endianness);
}

unsafe impl Frame for u8 {
    #[inline]
    fn adjust(&mut self, _: Endianness) {}
}

macro_rules! impl_frame_for_number {
    ($($ty:ty),* $(,)?) => {
        $(
            unsafe impl Frame for $ty {
                #[inline]
                fn adjust(&mut self, endianness: Endianness) {
                    if endianness != Endianness::NATIVE {
                        *self = <$ty>::swap_bytes(*self);
                    }
                }
            }
        )*
    }
}

impl_frame_for_number!(u16, u32, u64);
