use std::num::NonZeroU32;
use std::time::Duration;

#[cfg(feature = "libc")]
use crate::sasl::{Auth, Mechanism};
#[cfg(feature = "libc")]
use crate::utils::trim_end;

use crate::connection_builder::{AuthKind, ConnectionBuilder, Timeouts};
use crate::error::{Error, ErrorKind, Result};
use crate::message::{Message, MessageKind};
use crate::org_freedesktop_dbus;
use crate::recv_buf::RecvBuf;
use crate::sasl::{self, Guid, SaslResponse};
use crate::send_buf::SendBuf;
use crate::transport::Transport;

/// A blocking connection to a D-Bus message bus.
///
/// A connection moves through socket setup, line-mode authentication, and the
/// mandatory `Hello` call before it is handed to the caller. Any failure
/// along the way is terminal: the instance is never returned, and the caller
/// must establish a fresh connection to retry.
///
/// Messages are sent and received strictly in the order the caller invokes
/// [`send()`] and [`recv()`]; there is no correlation of replies to
/// outstanding calls beyond the serial numbers the caller holds on to.
///
/// [`send()`]: Self::send
/// [`recv()`]: Self::recv
pub struct Connection {
    transport: Transport,
    /// Send buffer and serial allocator.
    send: SendBuf,
    /// Receive scratch.
    recv: RecvBuf,
    timeouts: Timeouts,
    /// Unique name assigned by the bus after `Hello`.
    name: Option<Box<str>>,
    /// GUID the server sent during authentication.
    guid: Option<Box<[u8]>>,
    /// Whether the server agreed to unix file descriptor passing.
    unix_fd: bool,
}

impl Connection {
    /// Shorthand for connecting to the system bus using the default
    /// configuration.
    #[inline]
    pub fn system_bus() -> Result<Self> {
        ConnectionBuilder::new().system_bus().connect()
    }

    /// Shorthand for connecting to the session bus using the default
    /// configuration.
    #[inline]
    pub fn session_bus() -> Result<Self> {
        ConnectionBuilder::new().session_bus().connect()
    }

    pub(crate) fn connect(builder: &ConnectionBuilder) -> Result<Self> {
        let transport = Transport::open(builder.bus, builder.timeouts.send)?;
        Self::establish(transport, builder)
    }

    /// Drive the full handshake over an already opened transport.
    pub(crate) fn establish(transport: Transport, builder: &ConnectionBuilder) -> Result<Self> {
        let mut connection = Self {
            transport,
            send: SendBuf::new(),
            recv: RecvBuf::new(),
            timeouts: builder.timeouts,
            name: None,
            guid: None,
            unix_fd: false,
        };

        connection.authenticate(builder)?;
        connection.hello()?;
        Ok(connection)
    }

    /// The unique name assigned by the bus, such as `:1.42`.
    pub fn unique_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The GUID the server sent during authentication.
    pub fn server_guid(&self) -> Option<&Guid> {
        self.guid.as_deref().map(Guid::new)
    }

    /// Whether the server agreed to receive unix file descriptors.
    pub fn can_send_unix_fds(&self) -> bool {
        self.unix_fd
    }

    /// Send a message, returning the serial assigned to it.
    ///
    /// When the unique name of the connection is known and the message does
    /// not declare a sender, the name is attached as the SENDER field.
    pub fn send(&mut self, message: &Message) -> Result<NonZeroU32> {
        self.send.send_message(
            &mut self.transport,
            message,
            self.name.as_deref(),
            self.timeouts.send,
        )
    }

    /// Receive the next complete message on the wire, whichever it is.
    pub fn recv(&mut self, timeout: Duration) -> Result<Message> {
        self.recv.recv_message(&mut self.transport, timeout)
    }

    /// Drive the line-mode authentication handshake.
    fn authenticate(&mut self, builder: &ConnectionBuilder) -> Result<()> {
        let timeout = self.timeouts.auth;
        let mut line = Vec::new();

        // Discover which mechanisms the server advertises. A bare AUTH is
        // always rejected, and the rejection carries the mechanism list.
        self.transport
            .sasl_send(b"AUTH", timeout)
            .map_err(|error| error.op("auth discover"))?;
        self.transport
            .sasl_recv(&mut line, timeout)
            .map_err(|error| error.op("auth discover"))?;

        let SaslResponse::Rejected(advertised) = sasl::response(&line)? else {
            return Err(Error::new(ErrorKind::InvalidSaslResponse).op("auth discover"));
        };

        #[cfg_attr(not(feature = "libc"), allow(unused_variables))]
        let advertised = advertised.to_vec();

        match builder.auth {
            AuthKind::None => {}
            #[cfg(feature = "libc")]
            AuthKind::Uid => {
                let Some(mechanism) = Mechanism::select(&advertised) else {
                    let advertised = String::from_utf8_lossy(&advertised).into_owned();
                    return Err(Error::new(ErrorKind::NoSupportedMechanism(
                        advertised.into(),
                    )));
                };

                match mechanism {
                    Mechanism::External => {
                        let mut auth_buf = [0u8; 32];
                        let auth = Auth::external_from_uid(&mut auth_buf);
                        self.auth_external(&auth, &mut line)?;
                    }
                }
            }
        }

        // Negotiate unix file descriptor passing. The server may decline
        // with an ERROR response without failing the handshake.
        self.transport
            .sasl_send(b"NEGOTIATE_UNIX_FD", timeout)
            .map_err(|error| error.op("negotiate unix fd"))?;
        self.transport
            .sasl_recv(&mut line, timeout)
            .map_err(|error| error.op("negotiate unix fd"))?;

        self.unix_fd = match sasl::response(&line)? {
            SaslResponse::AgreeUnixFd => true,
            SaslResponse::Error(..) => false,
            _ => {
                return Err(Error::new(ErrorKind::InvalidSaslResponse).op("negotiate unix fd"));
            }
        };

        // Transition to binary message mode.
        self.transport
            .sasl_begin(timeout)
            .map_err(|error| error.op("begin"))
    }

    /// Authenticate with the EXTERNAL mechanism.
    #[cfg(feature = "libc")]
    fn auth_external(&mut self, auth: &Auth<'_>, line: &mut Vec<u8>) -> Result<()> {
        let timeout = self.timeouts.auth;

        let mut request = Vec::with_capacity(14 + auth.payload().len());
        request.extend_from_slice(b"AUTH EXTERNAL ");
        request.extend_from_slice(auth.payload());

        self.transport
            .sasl_send(&request, timeout)
            .map_err(|error| error.op("authenticate"))?;
        self.transport
            .sasl_recv(line, timeout)
            .map_err(|error| error.op("authenticate"))?;

        match sasl::response(line)? {
            SaslResponse::Ok(guid) => {
                self.guid = Some(guid.as_bytes().into());
                Ok(())
            }
            SaslResponse::Rejected(..) | SaslResponse::Error(..) => {
                let line = String::from_utf8_lossy(trim_end(line)).into_owned();
                Err(Error::new(ErrorKind::AuthRejected(line.into())))
            }
            _ => Err(Error::new(ErrorKind::InvalidSaslResponse).op("authenticate")),
        }
    }

    /// Send the mandatory `Hello` call and record the unique name assigned
    /// to this connection.
    fn hello(&mut self) -> Result<()> {
        let m = Message::method_call(org_freedesktop_dbus::PATH, "Hello")
            .with_interface(org_freedesktop_dbus::INTERFACE)
            .with_destination(org_freedesktop_dbus::DESTINATION);

        let serial = self.send(&m)?;

        loop {
            let reply = self.recv(self.timeouts.hello)?;

            match reply.kind() {
                MessageKind::MethodReturn { reply_serial } if *reply_serial == serial => {
                    let name = reply
                        .body()
                        .read::<str>()
                        .map_err(|error| error.op("hello reply"))?;
                    self.name = Some(name.into());
                    return Ok(());
                }
                MessageKind::Error {
                    error_name,
                    reply_serial,
                } if *reply_serial == serial => {
                    let message = reply.body().read::<str>().unwrap_or_default();

                    return Err(Error::new(ErrorKind::ResponseError(
                        error_name.clone(),
                        message.into(),
                    )));
                }
                // The bus may emit signals such as NameAcquired before the
                // reply arrives.
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::num::NonZeroU32;
    use std::os::unix::net::UnixStream;
    use std::thread;

    use bstr::BStr;

    use crate::buf::OwnedBuf;
    use crate::connection_builder::ConnectionBuilder;
    use crate::org_freedesktop_dbus;
    use crate::sasl::Guid;
    use crate::send_buf::SendBuf;
    use crate::transport::Transport;
    use crate::{Message, Signature};

    use super::Connection;

    fn read_line(stream: &mut UnixStream) -> Vec<u8> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        while !line.ends_with(b"\r\n") {
            stream.read_exact(&mut byte).unwrap();
            line.push(byte[0]);
        }

        line
    }

    fn assert_line(stream: &mut UnixStream, expected: &[u8]) {
        let line = read_line(stream);
        assert_eq!(BStr::new(&line), BStr::new(expected));
    }

    /// Consume one serialized message and return its serial.
    fn read_message_bytes(stream: &mut UnixStream) -> NonZeroU32 {
        let mut head = [0u8; 16];
        stream.read_exact(&mut head).unwrap();

        let body_len = u32::from_ne_bytes(head[4..8].try_into().unwrap()) as usize;
        let serial = u32::from_ne_bytes(head[8..12].try_into().unwrap());
        let fields_len = u32::from_ne_bytes(head[12..16].try_into().unwrap()) as usize;
        let padding = (8 - fields_len % 8) % 8;

        let mut rest = vec![0u8; fields_len + padding + body_len];
        stream.read_exact(&mut rest).unwrap();

        NonZeroU32::new(serial).unwrap()
    }

    fn write_message(stream: &mut UnixStream, send: &mut SendBuf, message: &Message) {
        send.write_message(message, Some("org.freedesktop.DBus"))
            .unwrap();
        stream.write_all(send.get()).unwrap();
    }

    fn handshake(stream: &mut UnixStream, advertised: &[u8]) {
        let mut nul = [0u8; 1];
        stream.read_exact(&mut nul).unwrap();
        assert_eq!(nul, [0]);

        assert_line(stream, b"AUTH\r\n");
        stream.write_all(advertised).unwrap();

        let line = read_line(stream);
        assert!(line.starts_with(b"AUTH EXTERNAL "));
        stream.write_all(b"OK 1234deadbeef\r\n").unwrap();

        assert_line(stream, b"NEGOTIATE_UNIX_FD\r\n");
        stream.write_all(b"AGREE_UNIX_FD\r\n").unwrap();

        assert_line(stream, b"BEGIN\r\n");
    }

    #[test]
    fn connect_performs_handshake_and_hello() -> anyhow::Result<()> {
        let (client, server) = UnixStream::pair()?;

        let server_thread = thread::spawn(move || {
            let mut s = server;
            handshake(&mut s, b"REJECTED\r\n");

            let serial = read_message_bytes(&mut s);
            let mut send = SendBuf::new();

            // An unrelated signal racing ahead of the reply must be skipped.
            let signal =
                Message::signal("NameAcquired").with_interface(org_freedesktop_dbus::INTERFACE);
            write_message(&mut s, &mut send, &signal);

            let mut body = OwnedBuf::new();
            body.write(":1.42");

            let reply = Message::method_return(serial)
                .with_signature(Signature::STRING)
                .with_body(body.get().to_vec());
            write_message(&mut s, &mut send, &reply);
        });

        let transport = Transport::from_std(client)?;
        let connection = Connection::establish(transport, &ConnectionBuilder::new())?;

        assert_eq!(connection.unique_name(), Some(":1.42"));
        assert!(connection.can_send_unix_fds());
        assert_eq!(
            connection.server_guid().map(Guid::as_bytes),
            Some(&b"1234deadbeef"[..])
        );

        server_thread.join().unwrap();
        Ok(())
    }

    #[test]
    fn connect_surfaces_hello_error() -> anyhow::Result<()> {
        let (client, server) = UnixStream::pair()?;

        let server_thread = thread::spawn(move || {
            let mut s = server;
            handshake(&mut s, b"REJECTED EXTERNAL\r\n");

            let serial = read_message_bytes(&mut s);
            let mut send = SendBuf::new();

            let mut body = OwnedBuf::new();
            body.write("rejected by policy");

            let reply = Message::error("org.freedesktop.DBus.Error.AccessDenied", serial)
                .with_signature(Signature::STRING)
                .with_body(body.get().to_vec());
            write_message(&mut s, &mut send, &reply);
        });

        let transport = Transport::from_std(client)?;

        let Err(error) = Connection::establish(transport, &ConnectionBuilder::new()) else {
            panic!("expected connect to fail");
        };

        assert!(error.to_string().contains("AccessDenied"));
        server_thread.join().unwrap();
        Ok(())
    }

    #[test]
    fn connect_fails_when_auth_is_rejected() -> anyhow::Result<()> {
        let (client, server) = UnixStream::pair()?;

        let server_thread = thread::spawn(move || {
            let mut s = server;

            let mut nul = [0u8; 1];
            s.read_exact(&mut nul).unwrap();

            assert_line(&mut s, b"AUTH\r\n");
            s.write_all(b"REJECTED EXTERNAL\r\n").unwrap();

            let line = read_line(&mut s);
            assert!(line.starts_with(b"AUTH EXTERNAL "));
            s.write_all(b"REJECTED EXTERNAL\r\n").unwrap();
        });

        let transport = Transport::from_std(client)?;

        let Err(error) = Connection::establish(transport, &ConnectionBuilder::new()) else {
            panic!("expected connect to fail");
        };

        assert!(error.to_string().contains("Authentication rejected"));
        server_thread.join().unwrap();
        Ok(())
    }

    #[test]
    fn connect_fails_without_mutual_mechanism() -> anyhow::Result<()> {
        let (client, server) = UnixStream::pair()?;

        let server_thread = thread::spawn(move || {
            let mut s = server;

            let mut nul = [0u8; 1];
            s.read_exact(&mut nul).unwrap();

            assert_line(&mut s, b"AUTH\r\n");
            s.write_all(b"REJECTED DBUS_COOKIE_SHA1\r\n").unwrap();
        });

        let transport = Transport::from_std(client)?;

        let Err(error) = Connection::establish(transport, &ConnectionBuilder::new()) else {
            panic!("expected connect to fail");
        };

        assert!(error.to_string().contains("No supported mechanism"));
        server_thread.join().unwrap();
        Ok(())
    }
}
