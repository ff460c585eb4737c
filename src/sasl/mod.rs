//! Types related to the SASL authentication which D-Bus performs.
//!
//! Authentication is a line protocol, each line terminated by `\r\n`. The
//! client sends `AUTH` to discover the mechanisms the server advertises,
//! authenticates with one of them, optionally negotiates unix file descriptor
//! passing, and sends `BEGIN` to switch the stream into binary message mode.


use core::fmt;

use crate::error::{Error, ErrorKind, Result};
use crate::lossy_str::LossyStr;
use crate::utils::{split_once, trim_end};

/// A GUID sent over SASL.
#[repr(transparent)]
pub struct Guid([u8]);

impl Guid {
    #[inline]
    pub(crate) fn new(guid: &[u8]) -> &Guid {
        // SAFETY: The byte slice is repr transparent over this type.
        unsafe { &*(guid as *const [u8] as *const Guid) }
    }

    /// Get the guid as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Guid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guid")
            .field(&LossyStr::new(&self.0))
            .finish()
    }
}

/// An authentication mechanism known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Mechanism {
    /// Prove identity through the OS-level peer credentials of the connecting
    /// process.
    External,
}

impl Mechanism {
    /// Client-side preference order.
    const PREFERRED: &'static [Mechanism] = &[Mechanism::External];

    /// Pick the first mechanism from the preference order which the server
    /// advertises.
    ///
    /// `advertised` is the whitespace-separated mechanism list from the
    /// server's `REJECTED` response. A server which advertises nothing leaves
    /// the choice to the client, so the most preferred mechanism is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_blocking::sasl::Mechanism;
    ///
    /// assert_eq!(Mechanism::select(b"EXTERNAL DBUS_COOKIE_SHA1"), Some(Mechanism::External));
    /// assert_eq!(Mechanism::select(b"DBUS_COOKIE_SHA1"), None);
    /// assert_eq!(Mechanism::select(b""), Some(Mechanism::External));
    /// ```
    pub fn select(advertised: &[u8]) -> Option<Mechanism> {
        let mut words = advertised
            .split(|b| b.is_ascii_whitespace())
            .filter(|w| !w.is_empty())
            .peekable();

        if words.peek().is_none() {
            return Self::PREFERRED.first().copied();
        }

        let advertised = words.filter_map(Mechanism::from_bytes).collect::<Vec<_>>();

        Self::PREFERRED
            .iter()
            .copied()
            .find(|mechanism| advertised.contains(mechanism))
    }

    fn from_bytes(bytes: &[u8]) -> Option<Mechanism> {
        match bytes {
            b"EXTERNAL" => Some(Mechanism::External),
            _ => None,
        }
    }
}

/// The payload of an `AUTH` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth<'a> {
    /// EXTERNAL authentication with a literal hex payload.
    External(&'a [u8]),
}

impl<'a> Auth<'a> {
    /// Construct external authentication from the uid of the calling process.
    #[cfg(all(unix, feature = "libc"))]
    pub fn external_from_uid(buf: &'a mut [u8; 32]) -> Auth<'a> {
        // SAFETY: getuid is always successful.
        let uid = unsafe { libc::getuid() };
        Self::external_from_u32_ascii_hex(buf, uid)
    }

    /// Construct an external authentication payload from a u32.
    ///
    /// The id is rendered as a decimal digit string, and every ASCII byte of
    /// that string is hex-encoded.
    pub fn external_from_u32_ascii_hex(buf: &'a mut [u8; 32], mut id: u32) -> Auth<'a> {
        const HEX: [u8; 16] = *b"0123456789abcdef";

        let mut digits = [0u8; 10];
        let mut m = 0;

        loop {
            digits[m] = b'0' + (id % 10) as u8;
            m += 1;
            id /= 10;

            if id == 0 {
                break;
            }
        }

        let mut n = 0;

        while m > 0 {
            m -= 1;
            buf[n] = HEX[(digits[m] >> 4) as usize];
            buf[n + 1] = HEX[(digits[m] & 0xf) as usize];
            n += 2;
        }

        Auth::External(&buf[..n])
    }

    pub(crate) fn payload(&self) -> &'a [u8] {
        match self {
            Auth::External(payload) => payload,
        }
    }
}

/// A server response line during authentication.
#[derive(Debug)]
pub enum SaslResponse<'a> {
    /// Authentication succeeded; carries the server GUID.
    Ok(&'a Guid),
    /// The previous command was rejected; carries the advertised mechanism
    /// list.
    Rejected(&'a [u8]),
    /// The server agrees to pass unix file descriptors.
    AgreeUnixFd,
    /// The server could not parse or will not honor the previous command.
    Error(&'a [u8]),
}

/// Parse one CRLF-terminated server line.
pub(crate) fn response(line: &[u8]) -> Result<SaslResponse<'_>> {
    let line = trim_end(line);

    let (command, rest) = match split_once(line, b' ') {
        Some((command, rest)) => (command, rest),
        None => (line, &[][..]),
    };

    match command {
        b"OK" => Ok(SaslResponse::Ok(Guid::new(rest))),
        b"REJECTED" => Ok(SaslResponse::Rejected(rest)),
        b"AGREE_UNIX_FD" => Ok(SaslResponse::AgreeUnixFd),
        b"ERROR" => Ok(SaslResponse::Error(rest)),
        _ => Err(Error::new(ErrorKind::InvalidSaslResponse)),
    }
}
