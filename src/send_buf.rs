use std::num::NonZeroU32;
use std::time::Duration;

use crate::buf::OwnedBuf;
use crate::error::{Error, ErrorKind, Result};
use crate::message::{Message, MessageKind};
use crate::protocol::{self, Endianness, Variant};
use crate::transport::Transport;
use crate::Signature;

/// Buffer used for serializing and sending messages.
///
/// Also owns the serial counter of the connection, so every outbound message
/// without an explicit serial gets a fresh non-zero one.
pub(crate) struct SendBuf {
    buf: OwnedBuf,
    serial: u32,
}

impl SendBuf {
    /// Construct a new send buffer in the native endianness.
    pub(crate) fn new() -> Self {
        Self::with_endianness(Endianness::NATIVE)
    }

    /// Construct a new send buffer with the specified endianness.
    pub(crate) fn with_endianness(endianness: Endianness) -> Self {
        Self {
            buf: OwnedBuf::with_endianness(endianness),
            serial: 0,
        }
    }

    /// Get the serialized contents of the buffer.
    pub(crate) fn get(&self) -> &[u8] {
        self.buf.get()
    }

    /// Allocate the next serial, skipping zero on wrap-around.
    pub(crate) fn next_serial(&mut self) -> NonZeroU32 {
        loop {
            self.serial = self.serial.wrapping_add(1);

            if let Some(serial) = NonZeroU32::new(self.serial) {
                return serial;
            }
        }
    }

    /// Serialize `message` into the internal buffer and return the serial
    /// assigned to it.
    ///
    /// When the message does not declare a sender, `local_name` is attached
    /// as the SENDER field.
    pub(crate) fn write_message(
        &mut self,
        message: &Message,
        local_name: Option<&str>,
    ) -> Result<NonZeroU32> {
        self.buf.clear();

        let Ok(body_length) = u32::try_from(message.body.len()) else {
            return Err(Error::new(ErrorKind::BodyTooLong(u32::MAX)));
        };

        if body_length > protocol::MAX_BODY_LENGTH {
            return Err(Error::new(ErrorKind::BodyTooLong(body_length)));
        }

        let serial = match message.serial {
            Some(serial) => serial,
            None => self.next_serial(),
        };

        self.buf.store(protocol::Header {
            endianness: self.buf.endianness(),
            message_type: message.message_type(),
            flags: message.flags,
            version: protocol::VERSION,
            body_length,
            serial: serial.get(),
        });

        let fields = self.buf.alloc::<u32>();
        let start = self.buf.len();

        match &message.kind {
            MessageKind::MethodCall { path, member } => {
                self.buf.align_mut::<u64>();
                self.buf.store(Variant::PATH);
                self.buf.write(Signature::OBJECT_PATH);
                self.buf.write(&**path);

                self.buf.align_mut::<u64>();
                self.buf.store(Variant::MEMBER);
                self.buf.write(Signature::STRING);
                self.buf.write(&**member);
            }
            MessageKind::MethodReturn { reply_serial } => {
                self.buf.align_mut::<u64>();
                self.buf.store(Variant::REPLY_SERIAL);
                self.buf.write(Signature::UINT32);
                self.buf.store(reply_serial.get());
            }
            MessageKind::Error {
                error_name,
                reply_serial,
            } => {
                self.buf.align_mut::<u64>();
                self.buf.store(Variant::ERROR_NAME);
                self.buf.write(Signature::STRING);
                self.buf.write(&**error_name);

                self.buf.align_mut::<u64>();
                self.buf.store(Variant::REPLY_SERIAL);
                self.buf.write(Signature::UINT32);
                self.buf.store(reply_serial.get());
            }
            MessageKind::Signal { member } => {
                self.buf.align_mut::<u64>();
                self.buf.store(Variant::MEMBER);
                self.buf.write(Signature::STRING);
                self.buf.write(&**member);
            }
        }

        if let Some(interface) = &message.interface {
            self.buf.align_mut::<u64>();
            self.buf.store(Variant::INTERFACE);
            self.buf.write(Signature::STRING);
            self.buf.write(&**interface);
        }

        if let Some(destination) = &message.destination {
            self.buf.align_mut::<u64>();
            self.buf.store(Variant::DESTINATION);
            self.buf.write(Signature::STRING);
            self.buf.write(&**destination);
        }

        if let Some(sender) = message.sender.as_deref().or(local_name) {
            self.buf.align_mut::<u64>();
            self.buf.store(Variant::SENDER);
            self.buf.write(Signature::STRING);
            self.buf.write(sender);
        }

        if !message.signature.is_empty() {
            self.buf.align_mut::<u64>();
            self.buf.store(Variant::SIGNATURE);
            self.buf.write(Signature::SIGNATURE);
            self.buf.write(&*message.signature);
        }

        self.buf.store_at(fields, (self.buf.len() - start) as u32);

        // The body starts 8-byte aligned relative to the start of the
        // message.
        self.buf.align_mut::<u64>();
        self.buf.extend_from_slice(&message.body);

        Ok(serial)
    }

    /// Serialize `message` and send it over the transport.
    pub(crate) fn send_message(
        &mut self,
        transport: &mut Transport,
        message: &Message,
        local_name: Option<&str>,
        timeout: Duration,
    ) -> Result<NonZeroU32> {
        transport.expect_messages()?;
        let serial = self.write_message(message, local_name)?;
        transport
            .write_exact(self.buf.get(), timeout)
            .map_err(|error| error.op("send message"))?;
        Ok(serial)
    }
}
