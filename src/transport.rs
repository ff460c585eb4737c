use std::ffi::OsStr;
use std::fmt;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::{Duration, Instant};

use crate::address::{Address, BusKind};
use crate::error::{Error, ErrorKind, Result};

/// Interval slept before retrying an operation which would block.
const RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound on a single SASL line, so a peer which never terminates a line
/// cannot grow the buffer without bound.
const MAX_LINE_LENGTH: usize = 16384;

/// The SASL line terminator.
const ENDLINE: &[u8] = b"\r\n";

#[derive(Debug, Clone, Copy)]
pub(crate) enum SaslState {
    /// The credential byte has not been sent yet.
    Init,
    /// Line traffic may be exchanged.
    Idle,
}

impl fmt::Display for SaslState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaslState::Init => write!(f, "sasl-init"),
            SaslState::Idle => write!(f, "sasl-idle"),
        }
    }
}

/// The state of the transport.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TransportState {
    /// Line-mode authentication in progress.
    Sasl(SaslState),
    /// Binary message mode entered through `BEGIN`.
    Messages,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Sasl(state) => write!(f, "sasl ({state})"),
            TransportState::Messages => write!(f, "messages"),
        }
    }
}

/// A non-blocking byte stream to a message bus.
///
/// All reads and writes are bounded by a caller-supplied time budget.
/// Operations which would block are retried after a short sleep until the
/// budget is exhausted, which is checked before every I/O attempt.
pub(crate) struct Transport {
    // Stream of the connection.
    stream: UnixStream,
    // The state of the connection.
    state: TransportState,
}

impl Transport {
    /// Open a transport to the given bus and send the mandatory credential
    /// NUL byte.
    pub(crate) fn open(bus: BusKind, timeout: Duration) -> Result<Self> {
        let address = Address::resolve(bus)?;

        let stream = match &address {
            Address::Unix(path) => UnixStream::connect(OsStr::from_bytes(path))
                .map_err(|error| Error::new(ErrorKind::Connect(error)))?,
        };

        let mut transport = Self::from_std(stream)?;
        transport
            .write_exact(b"\0", timeout)
            .map_err(|error| error.op("credential byte"))?;
        transport.state = TransportState::Sasl(SaslState::Idle);
        Ok(transport)
    }

    /// Construct a transport from an already connected stream.
    pub(crate) fn from_std(stream: UnixStream) -> Result<Self> {
        stream
            .set_nonblocking(true)
            .map_err(|error| Error::new(ErrorKind::Connect(error)))?;

        Ok(Self {
            stream,
            state: TransportState::Sasl(SaslState::Init),
        })
    }

    /// Send one SASL line, appending the CRLF terminator.
    pub(crate) fn sasl_send(&mut self, line: &[u8], timeout: Duration) -> Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 3);

        match self.state {
            TransportState::Sasl(SaslState::Init) => {
                buf.push(0);
                self.state = TransportState::Sasl(SaslState::Idle);
            }
            TransportState::Sasl(SaslState::Idle) => {}
            state => return Err(Error::new(ErrorKind::InvalidState(state))),
        }

        buf.extend_from_slice(line);
        buf.extend_from_slice(ENDLINE);
        self.write_exact(&buf, timeout)
    }

    /// Receive one SASL line into `line`, including the CRLF terminator.
    ///
    /// Bytes are consumed one at a time so that nothing belonging to the next
    /// line or message is read past the terminator.
    pub(crate) fn sasl_recv(&mut self, line: &mut Vec<u8>, timeout: Duration) -> Result<()> {
        match self.state {
            TransportState::Sasl(SaslState::Idle) => {}
            state => return Err(Error::new(ErrorKind::InvalidState(state))),
        }

        line.clear();
        let start = Instant::now();
        let mut byte = [0u8; 1];

        while !line.ends_with(ENDLINE) {
            if line.len() >= MAX_LINE_LENGTH {
                return Err(Error::new(ErrorKind::LineTooLong(line.len())));
            }

            self.read_exact_deadline(&mut byte, start, timeout)?;
            line.push(byte[0]);
        }

        Ok(())
    }

    /// Send the SASL `BEGIN` line and switch to binary message mode.
    ///
    /// No response is expected, and no further line traffic is permitted.
    pub(crate) fn sasl_begin(&mut self, timeout: Duration) -> Result<()> {
        self.sasl_send(b"BEGIN", timeout)?;
        self.state = TransportState::Messages;
        Ok(())
    }

    /// Assert that the transport is in binary message mode.
    pub(crate) fn expect_messages(&self) -> Result<()> {
        match self.state {
            TransportState::Messages => Ok(()),
            state => Err(Error::new(ErrorKind::InvalidState(state))),
        }
    }

    /// Read exactly `buf.len()` bytes within the given time budget.
    pub(crate) fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        self.read_exact_deadline(buf, Instant::now(), timeout)
    }

    fn read_exact_deadline(
        &mut self,
        buf: &mut [u8],
        start: Instant,
        timeout: Duration,
    ) -> Result<()> {
        let mut read = 0;

        while read < buf.len() {
            if start.elapsed() >= timeout {
                return Err(Error::new(ErrorKind::Timeout));
            }

            match self.stream.read(&mut buf[read..]) {
                Ok(0) => {
                    return Err(Error::from(io::Error::from(io::ErrorKind::UnexpectedEof)));
                }
                Ok(n) => read += n,
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(Error::from(error)),
            }
        }

        Ok(())
    }

    /// Write exactly `buf.len()` bytes within the given time budget.
    pub(crate) fn write_exact(&mut self, buf: &[u8], timeout: Duration) -> Result<()> {
        let start = Instant::now();
        let mut written = 0;

        while written < buf.len() {
            if start.elapsed() >= timeout {
                return Err(Error::new(ErrorKind::Timeout));
            }

            match self.stream.write(&buf[written..]) {
                Ok(0) => {
                    return Err(Error::from(io::Error::from(io::ErrorKind::WriteZero)));
                }
                Ok(n) => written += n,
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(Error::from(error)),
            }
        }

        Ok(())
    }
}

impl AsRawFd for Transport {
    #[inline]
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::os::unix::net::UnixStream;
    use std::time::{Duration, Instant};

    use super::{Transport, TransportState};

    fn pair() -> (Transport, UnixStream) {
        let (client, server) = UnixStream::pair().unwrap();
        (Transport::from_std(client).unwrap(), server)
    }

    #[test]
    fn read_times_out_without_data() {
        let (mut transport, _server) = pair();

        let start = Instant::now();
        let mut buf = [0u8; 4];
        let err = transport
            .read_exact(&mut buf, Duration::from_millis(50))
            .unwrap_err();

        assert!(err.is_timeout());
        // Bounded by the budget plus one retry interval, with slack for slow
        // schedulers.
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn zero_budget_times_out_before_reading() {
        let (mut transport, mut server) = pair();
        server.write_all(b"data").unwrap();

        let mut buf = [0u8; 4];
        let err = transport
            .read_exact(&mut buf, Duration::ZERO)
            .unwrap_err();

        assert!(err.is_timeout());
    }

    #[test]
    fn first_line_is_prefixed_with_credential_byte() {
        let (mut transport, server) = pair();
        transport
            .sasl_send(b"AUTH", Duration::from_millis(100))
            .unwrap();

        let mut buf = [0u8; 7];
        read_blocking(&server, &mut buf);
        assert_eq!(&buf, b"\0AUTH\r\n");
    }

    #[test]
    fn line_read_stops_at_crlf() {
        let (mut transport, mut server) = pair();
        transport.state = TransportState::Sasl(super::SaslState::Idle);

        // Everything after the terminator belongs to the next message and
        // must not be consumed.
        server.write_all(b"OK 1234deadbeef\r\nNEXTDATA").unwrap();

        let mut line = Vec::new();
        transport
            .sasl_recv(&mut line, Duration::from_millis(100))
            .unwrap();
        assert_eq!(line, b"OK 1234deadbeef\r\n");

        let mut rest = [0u8; 8];
        transport
            .read_exact(&mut rest, Duration::from_millis(100))
            .unwrap();
        assert_eq!(&rest, b"NEXTDATA");
    }

    #[test]
    fn unterminated_line_is_bounded() {
        let (mut transport, mut server) = pair();
        transport.state = TransportState::Sasl(super::SaslState::Idle);

        let garbage = vec![b'A'; super::MAX_LINE_LENGTH + 1];
        server.write_all(&garbage).unwrap();

        let mut line = Vec::new();
        let err = transport
            .sasl_recv(&mut line, Duration::from_secs(5))
            .unwrap_err();
        assert!(!err.is_timeout());
    }

    #[test]
    fn line_traffic_is_rejected_in_message_mode() {
        let (mut transport, _server) = pair();
        transport.state = TransportState::Messages;

        let mut line = Vec::new();
        assert!(transport
            .sasl_recv(&mut line, Duration::from_millis(10))
            .is_err());
        assert!(transport
            .sasl_send(b"AUTH", Duration::from_millis(10))
            .is_err());
    }

    fn read_blocking(mut server: &UnixStream, buf: &mut [u8]) {
        use std::io::Read as _;
        server.read_exact(buf).unwrap();
    }
}
