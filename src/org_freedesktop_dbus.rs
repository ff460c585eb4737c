//! Constants associated with the `org.freedesktop.DBus` interface.

use crate::ObjectPath;

/// Well known destination name.
pub const DESTINATION: &str = "org.freedesktop.DBus";

/// Well known interface name.
pub const INTERFACE: &str = "org.freedesktop.DBus";

/// Well known D-Bus path.
pub const PATH: &ObjectPath = ObjectPath::new_const(b"/org/freedesktop/DBus");
