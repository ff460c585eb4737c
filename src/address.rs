use std::env;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use crate::error::{Error, ErrorKind, Result};
use crate::utils::split_once;

const ENV_SESSION_BUS: &str = "DBUS_SESSION_BUS_ADDRESS";
const ENV_SYSTEM_BUS: &str = "DBUS_SYSTEM_BUS_ADDRESS";
const DEFAULT_SYSTEM_BUS: &str = "unix:path=/var/run/dbus/system_bus_socket";

/// The bus a connection is established to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BusKind {
    /// The system-wide message bus.
    ///
    /// Resolved through the `DBUS_SYSTEM_BUS_ADDRESS` environment variable
    /// with a fallback to the well-known address
    /// `unix:path=/var/run/dbus/system_bus_socket`.
    System,
    /// The per-login-session message bus.
    ///
    /// Resolved through the `DBUS_SESSION_BUS_ADDRESS` environment variable.
    Session,
}

/// A resolved bus address.
pub(crate) enum Address {
    /// A unix domain stream socket at a filesystem path.
    Unix(Vec<u8>),
}

impl Address {
    /// Resolve the address of the given bus.
    pub(crate) fn resolve(bus: BusKind) -> Result<Address> {
        match bus {
            BusKind::System => Self::from_env(ENV_SYSTEM_BUS, Some(DEFAULT_SYSTEM_BUS)),
            BusKind::Session => Self::from_env(ENV_SESSION_BUS, None),
        }
    }

    fn from_env(env: &str, default: Option<&str>) -> Result<Address> {
        let value;

        let address: &OsStr = match env::var_os(env) {
            Some(address) => {
                value = address;
                value.as_os_str()
            }
            None => match default {
                Some(default) => default.as_ref(),
                None => return Err(Error::new(ErrorKind::MissingBus)),
            },
        };

        Self::parse(address.as_bytes())
    }

    fn parse(bytes: &[u8]) -> Result<Address> {
        let Some((head, tail)) = split_once(bytes, b'=') else {
            return Err(Error::new(ErrorKind::InvalidAddress));
        };

        match head {
            b"unix:path" => Ok(Address::Unix(tail.to_vec())),
            _ => Err(Error::new(ErrorKind::InvalidAddress)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Address;

    #[test]
    fn parse_unix_path() {
        let Ok(Address::Unix(path)) = Address::parse(b"unix:path=/var/run/dbus/system_bus_socket")
        else {
            panic!("expected unix path address");
        };

        assert_eq!(path, b"/var/run/dbus/system_bus_socket");
    }

    #[test]
    fn parse_rejects_other_transports() {
        assert!(Address::parse(b"tcp:host=localhost,port=1234").is_err());
        assert!(Address::parse(b"unix:abstract=/tmp/x").is_err());
        assert!(Address::parse(b"garbage").is_err());
    }
}
