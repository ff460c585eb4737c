use std::time::Duration;

use crate::address::BusKind;
use crate::error::Result;
use crate::Connection;

/// Per-operation time budgets of a connection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timeouts {
    /// Budget for each authentication round trip.
    pub(crate) auth: Duration,
    /// Budget for each outbound write.
    pub(crate) send: Duration,
    /// Budget for receiving the `Hello` reply.
    pub(crate) hello: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            auth: Duration::from_millis(2000),
            send: Duration::from_millis(100),
            hello: Duration::from_millis(2000),
        }
    }
}

pub(crate) enum AuthKind {
    #[cfg_attr(feature = "libc", allow(unused))]
    None,
    #[cfg(feature = "libc")]
    Uid,
}

impl AuthKind {
    #[cfg(not(feature = "libc"))]
    const DEFAULT: Self = Self::None;
    #[cfg(feature = "libc")]
    const DEFAULT: Self = Self::Uid;
}

/// Builder of a [`Connection`].
pub struct ConnectionBuilder {
    pub(crate) bus: BusKind,
    pub(crate) auth: AuthKind,
    pub(crate) timeouts: Timeouts,
}

impl ConnectionBuilder {
    /// Construct a new connection builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_blocking::ConnectionBuilder;
    ///
    /// let c = ConnectionBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            bus: BusKind::Session,
            auth: AuthKind::DEFAULT,
            timeouts: Timeouts::default(),
        }
    }

    /// Connect to the session bus (default).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dbus_blocking::ConnectionBuilder;
    ///
    /// let c = ConnectionBuilder::new().session_bus().connect()?;
    /// # Ok::<_, dbus_blocking::Error>(())
    /// ```
    pub fn session_bus(&mut self) -> &mut Self {
        self.bus = BusKind::Session;
        self
    }

    /// Connect to the system bus.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dbus_blocking::ConnectionBuilder;
    ///
    /// let c = ConnectionBuilder::new().system_bus().connect()?;
    /// # Ok::<_, dbus_blocking::Error>(())
    /// ```
    pub fn system_bus(&mut self) -> &mut Self {
        self.bus = BusKind::System;
        self
    }

    /// Set the time budget for each authentication round trip.
    pub fn auth_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeouts.auth = timeout;
        self
    }

    /// Set the time budget for each outbound write.
    pub fn send_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeouts.send = timeout;
        self
    }

    /// Set the time budget for receiving the `Hello` reply.
    pub fn hello_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeouts.hello = timeout;
        self
    }

    /// Construct and connect a [`Connection`] with the current configuration.
    pub fn connect(&self) -> Result<Connection> {
        Connection::connect(self)
    }
}

impl Default for ConnectionBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
