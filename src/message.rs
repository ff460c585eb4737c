use std::num::NonZeroU32;

use crate::buf::ReadBuf;
use crate::protocol::{Endianness, Flags, MessageType};
use crate::{ObjectPath, Signature};

/// The kind of a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageKind {
    /// A method call.
    MethodCall {
        /// The validated object path being called.
        path: Box<str>,
        /// The member being called.
        member: Box<str>,
    },
    /// A method reply with returned data.
    MethodReturn {
        /// The serial this is a reply to.
        reply_serial: NonZeroU32,
    },
    /// An error reply.
    Error {
        /// The name of the error.
        error_name: Box<str>,
        /// The serial this is a reply to.
        reply_serial: NonZeroU32,
    },
    /// A signal emission.
    Signal {
        /// The member being signalled.
        member: Box<str>,
    },
}

/// A D-Bus message.
///
/// A message is built by the caller before a send, or fully reconstructed
/// from the wire by a receive. The body is an opaque sequence of bytes whose
/// layout is declared by the [`signature()`].
///
/// [`signature()`]: Self::signature
#[derive(Debug, PartialEq, Eq)]
pub struct Message {
    /// The type of the message.
    pub(crate) kind: MessageKind,
    /// Serial of the message, assigned on send when not set.
    pub(crate) serial: Option<NonZeroU32>,
    /// Flags in the message.
    pub(crate) flags: Flags,
    /// The interface of the message.
    pub(crate) interface: Option<Box<str>>,
    /// The destination of the message.
    pub(crate) destination: Option<Box<str>>,
    /// The sender of the message.
    pub(crate) sender: Option<Box<str>>,
    /// The signature of the body.
    pub(crate) signature: Box<Signature>,
    /// The body associated with the message.
    pub(crate) body: Box<[u8]>,
    /// The endianness the body was encoded in.
    pub(crate) endianness: Endianness,
}

impl Message {
    /// Construct a method call.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_blocking::{Message, ObjectPath};
    ///
    /// let m = Message::method_call(ObjectPath::new_const(b"/org/freedesktop/DBus"), "Hello");
    /// ```
    pub fn method_call(path: &ObjectPath, member: &str) -> Self {
        Self::new(MessageKind::MethodCall {
            path: path.as_str().into(),
            member: member.into(),
        })
    }

    /// Construct a method return replying to the given serial.
    pub fn method_return(reply_serial: NonZeroU32) -> Self {
        Self::new(MessageKind::MethodReturn { reply_serial })
    }

    /// Construct an error replying to the given serial.
    pub fn error(error_name: &str, reply_serial: NonZeroU32) -> Self {
        Self::new(MessageKind::Error {
            error_name: error_name.into(),
            reply_serial,
        })
    }

    /// Construct a signal.
    pub fn signal(member: &str) -> Self {
        Self::new(MessageKind::Signal {
            member: member.into(),
        })
    }

    fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            serial: None,
            flags: Flags::EMPTY,
            interface: None,
            destination: None,
            sender: None,
            signature: Signature::EMPTY.into(),
            body: Box::from([]),
            endianness: Endianness::NATIVE,
        }
    }

    /// Get the kind of the message.
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// Get the serial of the message, if it has been assigned one.
    pub fn serial(&self) -> Option<NonZeroU32> {
        self.serial
    }

    /// Get the flags of the message.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Get the interface of the message.
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Get the destination of the message.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Get the sender of the message.
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Get the signature of the body.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Get a read cursor over the body of the message, in the endianness the
    /// body was encoded with.
    pub fn body(&self) -> ReadBuf<'_> {
        ReadBuf::from_slice(&self.body, self.endianness)
    }

    /// Modify the serial of the message.
    pub fn with_serial(self, serial: NonZeroU32) -> Self {
        Self {
            serial: Some(serial),
            ..self
        }
    }

    /// Modify the flags of the message.
    pub fn with_flags(self, flags: Flags) -> Self {
        Self { flags, ..self }
    }

    /// Modify the interface of the message.
    pub fn with_interface(self, interface: &str) -> Self {
        Self {
            interface: Some(interface.into()),
            ..self
        }
    }

    /// Modify the destination of the message.
    pub fn with_destination(self, destination: &str) -> Self {
        Self {
            destination: Some(destination.into()),
            ..self
        }
    }

    /// Modify the sender of the message.
    pub fn with_sender(self, sender: &str) -> Self {
        Self {
            sender: Some(sender.into()),
            ..self
        }
    }

    /// Modify the signature of the body.
    pub fn with_signature(self, signature: &Signature) -> Self {
        Self {
            signature: signature.into(),
            ..self
        }
    }

    /// Modify the body of the message.
    ///
    /// The signature describing the body must be set separately through
    /// [`with_signature()`].
    ///
    /// [`with_signature()`]: Self::with_signature
    pub fn with_body(self, body: Vec<u8>) -> Self {
        Self {
            body: body.into(),
            ..self
        }
    }

    pub(crate) fn message_type(&self) -> MessageType {
        match self.kind {
            MessageKind::MethodCall { .. } => MessageType::METHOD_CALL,
            MessageKind::MethodReturn { .. } => MessageType::METHOD_RETURN,
            MessageKind::Error { .. } => MessageType::ERROR,
            MessageKind::Signal { .. } => MessageType::SIGNAL,
        }
    }
}
