//! A blocking, single-threaded D-Bus client.
//!
//! This crate connects to a message bus over a unix domain socket, performs
//! the SASL authentication handshake, exchanges binary D-Bus messages
//! serially, and completes the mandatory `Hello` call to obtain the unique
//! name of the connection.
//!
//! Every operation either completes, fails, or times out before returning.
//! There is no background I/O and no more than one call in flight at a time.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use dbus_blocking::{org_freedesktop_dbus, Connection, Message};
//!
//! let mut c = Connection::system_bus()?;
//!
//! let m = Message::method_call(org_freedesktop_dbus::PATH, "GetId")
//!     .with_interface(org_freedesktop_dbus::INTERFACE)
//!     .with_destination(org_freedesktop_dbus::DESTINATION);
//!
//! let serial = c.send(&m)?;
//! let reply = c.recv(Duration::from_secs(1))?;
//! # Ok::<_, dbus_blocking::Error>(())
//! ```

#[doc(inline)]
pub use self::connection::Connection;
mod connection;

#[doc(inline)]
pub use self::connection_builder::ConnectionBuilder;
mod connection_builder;

#[doc(inline)]
pub use self::address::BusKind;
mod address;

mod transport;

#[doc(inline)]
pub use self::error::{Error, Result};
mod error;

#[doc(inline)]
pub use self::protocol::{Endianness, Flags};
pub mod protocol;

pub use self::buf::{OwnedBuf, ReadBuf};
pub mod buf;

pub mod sasl;

#[doc(inline)]
pub use self::signature::{Signature, SignatureError};
mod signature;

#[doc(inline)]
pub use self::object_path::{ObjectPath, ObjectPathError};
mod object_path;

#[doc(inline)]
pub use self::frame::Frame;
mod frame;

pub use self::message::{Message, MessageKind};
mod message;

#[doc(inline)]
pub use self::read::Read;
mod read;

#[doc(inline)]
pub use self::write::Write;
mod write;

mod recv_buf;

mod send_buf;

pub mod org_freedesktop_dbus;

mod lossy_str;

mod utils;
