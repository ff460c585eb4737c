use std::mem::size_of;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::buf::{padding_to, ReadBuf};
use crate::error::{Error, ErrorKind, Result};
use crate::frame::Frame;
use crate::message::{Message, MessageKind};
use crate::protocol::{self, Endianness, Variant};
use crate::transport::Transport;
use crate::{ObjectPath, Signature};

/// Buffer used for receiving and decoding messages.
pub(crate) struct RecvBuf {
    /// Scratch for the raw header field table.
    fields: Vec<u8>,
    /// Scratch for the message body.
    body: Vec<u8>,
}

impl RecvBuf {
    /// Construct a new receive buffer.
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Read the next complete message off the transport and decode it.
    ///
    /// Each wire read shares the given per-step time budget. On failure the
    /// read position of the transport is left wherever it was, so the caller
    /// must treat the in-flight message as lost.
    pub(crate) fn recv_message(
        &mut self,
        transport: &mut Transport,
        timeout: Duration,
    ) -> Result<Message> {
        transport.expect_messages()?;

        // Fixed-size header plus the field table length which directly
        // follows it.
        let mut head = [0u8; size_of::<protocol::Header>() + size_of::<u32>()];
        transport
            .read_exact(&mut head, timeout)
            .map_err(|error| error.op("message header"))?;

        let mut buf = ReadBuf::from_slice(&head, Endianness::NATIVE);
        let mut header = buf.load::<protocol::Header>()?;
        let mut fields_len = buf.load::<u32>()?;

        if !matches!(header.endianness, Endianness::LITTLE | Endianness::BIG) {
            return Err(Error::new(ErrorKind::InvalidProtocol));
        }

        header.adjust(header.endianness);
        fields_len.adjust(header.endianness);
        check_header(&header, fields_len)?;

        self.fields.resize(fields_len as usize, 0);
        transport
            .read_exact(&mut self.fields, timeout)
            .map_err(|error| error.op("header fields"))?;

        // The body starts 8-byte aligned relative to the start of the
        // message. The fixed header is 16 bytes, so only the field table
        // length matters, and a table which is already aligned is followed by
        // no padding at all.
        let padding = padding_to::<u64>(fields_len as usize);

        if padding > 0 {
            let mut pad = [0u8; 7];
            transport
                .read_exact(&mut pad[..padding], timeout)
                .map_err(|error| error.op("header padding"))?;
        }

        self.body.resize(header.body_length as usize, 0);
        transport
            .read_exact(&mut self.body, timeout)
            .map_err(|error| error.op("message body"))?;

        read_message(
            header,
            ReadBuf::from_slice(&self.fields, header.endianness),
            &self.body,
        )
    }
}

/// Validate the fixed header and the length of the field table.
pub(crate) fn check_header(header: &protocol::Header, fields_len: u32) -> Result<()> {
    if header.version != protocol::VERSION {
        return Err(Error::new(ErrorKind::ProtocolVersion(header.version)));
    }

    if header.body_length > protocol::MAX_BODY_LENGTH {
        return Err(Error::new(ErrorKind::BodyTooLong(header.body_length)));
    }

    if fields_len > protocol::MAX_FIELDS_LENGTH {
        return Err(Error::new(ErrorKind::FieldsTooLong(fields_len)));
    }

    Ok(())
}

/// Decode the field table and assemble a typed message.
pub(crate) fn read_message(
    header: protocol::Header,
    mut fields: ReadBuf<'_>,
    body: &[u8],
) -> Result<Message> {
    let serial = NonZeroU32::new(header.serial).ok_or(ErrorKind::ZeroSerial)?;

    let mut path = None;
    let mut interface = None;
    let mut member = None;
    let mut error_name = None;
    let mut reply_serial = None;
    let mut destination = None;
    let mut sender = None;
    let mut signature = Signature::EMPTY;

    while !fields.is_empty() {
        // Entries are structs, so each one starts on an 8-byte boundary.
        fields.align::<u64>()?;

        let variant = fields.load::<Variant>()?;
        let sig = fields.read::<Signature>()?;

        match variant {
            Variant::PATH => {
                ensure_signature(variant, Signature::OBJECT_PATH, sig)?;
                path = Some(ObjectPath::new(fields.read::<str>()?)?);
            }
            Variant::INTERFACE => {
                ensure_signature(variant, Signature::STRING, sig)?;
                interface = Some(fields.read::<str>()?);
            }
            Variant::MEMBER => {
                ensure_signature(variant, Signature::STRING, sig)?;
                member = Some(fields.read::<str>()?);
            }
            Variant::ERROR_NAME => {
                ensure_signature(variant, Signature::STRING, sig)?;
                error_name = Some(fields.read::<str>()?);
            }
            Variant::REPLY_SERIAL => {
                ensure_signature(variant, Signature::UINT32, sig)?;
                let number = fields.load::<u32>()?;
                let number = NonZeroU32::new(number).ok_or(ErrorKind::ZeroReplySerial)?;
                reply_serial = Some(number);
            }
            Variant::DESTINATION => {
                ensure_signature(variant, Signature::STRING, sig)?;
                destination = Some(fields.read::<str>()?);
            }
            Variant::SENDER => {
                ensure_signature(variant, Signature::STRING, sig)?;
                sender = Some(fields.read::<str>()?);
            }
            Variant::SIGNATURE => {
                ensure_signature(variant, Signature::SIGNATURE, sig)?;
                signature = fields.read::<Signature>()?;
            }
            Variant::UNIX_FDS => {
                ensure_signature(variant, Signature::UINT32, sig)?;
                // File descriptor passing is not supported, so the count is
                // decoded and dropped.
                let _ = fields.load::<u32>()?;
            }
            Variant(unknown) => {
                return Err(Error::new(ErrorKind::InvalidField(unknown)));
            }
        }
    }

    let kind = match header.message_type {
        protocol::MessageType::METHOD_CALL => {
            let Some(path) = path else {
                return Err(Error::new(ErrorKind::MissingPath));
            };

            let Some(member) = member else {
                return Err(Error::new(ErrorKind::MissingMember));
            };

            MessageKind::MethodCall {
                path: path.as_str().into(),
                member: member.into(),
            }
        }
        protocol::MessageType::METHOD_RETURN => {
            let Some(reply_serial) = reply_serial else {
                return Err(Error::new(ErrorKind::MissingReplySerial));
            };

            MessageKind::MethodReturn { reply_serial }
        }
        protocol::MessageType::ERROR => {
            let Some(error_name) = error_name else {
                return Err(Error::new(ErrorKind::MissingErrorName));
            };

            let Some(reply_serial) = reply_serial else {
                return Err(Error::new(ErrorKind::MissingReplySerial));
            };

            MessageKind::Error {
                error_name: error_name.into(),
                reply_serial,
            }
        }
        protocol::MessageType::SIGNAL => {
            let Some(member) = member else {
                return Err(Error::new(ErrorKind::MissingMember));
            };

            MessageKind::Signal {
                member: member.into(),
            }
        }
        _ => return Err(Error::new(ErrorKind::InvalidProtocol)),
    };

    Ok(Message {
        kind,
        serial: Some(serial),
        flags: header.flags,
        interface: interface.map(Box::from),
        destination: destination.map(Box::from),
        sender: sender.map(Box::from),
        signature: signature.into(),
        body: Box::from(body),
        endianness: header.endianness,
    })
}

fn ensure_signature(
    variant: Variant,
    expected: &'static Signature,
    actual: &Signature,
) -> Result<()> {
    if actual != expected {
        return Err(Error::new(ErrorKind::WrongSignature(
            variant,
            expected,
            actual.into(),
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use crate::buf::{padding_to, OwnedBuf, ReadBuf};
    use crate::error::Result;
    use crate::frame::Frame;
    use crate::protocol::{self, Endianness, Flags, Variant};
    use crate::send_buf::SendBuf;
    use crate::{Message, ObjectPath, Signature};

    /// Decode a full serialized message from a byte slice, mirroring the wire
    /// framing performed against a transport.
    fn decode(bytes: &[u8]) -> Result<Message> {
        let mut buf = ReadBuf::from_slice(bytes, Endianness::NATIVE);
        let mut header = buf.load::<protocol::Header>()?;
        let mut fields_len = buf.load::<u32>()?;

        header.adjust(header.endianness);
        fields_len.adjust(header.endianness);
        super::check_header(&header, fields_len)?;

        let fields = buf.load_slice(fields_len as usize)?;
        let padding = padding_to::<u64>(fields_len as usize);

        if padding > 0 {
            buf.load_slice(padding)?;
        }

        let body = buf.load_slice(header.body_length as usize)?;

        super::read_message(
            header,
            ReadBuf::from_slice(fields, header.endianness),
            body,
        )
    }

    fn serial(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn method_call_round_trip() -> Result<()> {
        let mut body = OwnedBuf::new();
        body.write("hello world");

        let m = Message::method_call(ObjectPath::new_const(b"/org/example/Object"), "Frobnicate")
            .with_serial(serial(42))
            .with_interface("org.example.Interface")
            .with_destination(":1.5")
            .with_sender(":1.9")
            .with_flags(Flags::EMPTY | Flags::NO_AUTO_START)
            .with_signature(Signature::STRING)
            .with_body(body.get().to_vec());

        let mut send = SendBuf::new();
        send.write_message(&m, None)?;

        let decoded = decode(send.get())?;
        assert_eq!(decoded, m);
        assert_eq!(decoded.body().read::<str>()?, "hello world");
        Ok(())
    }

    #[test]
    fn method_return_round_trip() -> Result<()> {
        let m = Message::method_return(serial(77)).with_serial(serial(78));

        let mut send = SendBuf::new();
        send.write_message(&m, None)?;

        assert_eq!(decode(send.get())?, m);
        Ok(())
    }

    #[test]
    fn sender_is_attached_when_missing() -> Result<()> {
        let m = Message::method_call(ObjectPath::ROOT, "Ping").with_serial(serial(1));

        let mut send = SendBuf::new();
        send.write_message(&m, Some(":1.42"))?;

        let decoded = decode(send.get())?;
        assert_eq!(decoded.sender(), Some(":1.42"));
        Ok(())
    }

    #[test]
    fn declared_sender_wins_over_local_name() -> Result<()> {
        let m = Message::method_call(ObjectPath::ROOT, "Ping")
            .with_serial(serial(1))
            .with_sender(":1.9");

        let mut send = SendBuf::new();
        send.write_message(&m, Some(":1.42"))?;

        assert_eq!(decode(send.get())?.sender(), Some(":1.9"));
        Ok(())
    }

    #[test]
    fn wrong_path_signature_is_rejected() {
        // A PATH field declared as a plain string instead of an object path.
        let header = test_header(protocol::MessageType::METHOD_CALL, 0);

        let mut fields = OwnedBuf::new();
        fields.store(Variant::PATH);
        fields.write(Signature::STRING);
        fields.write("/org/example/Object");

        let result = super::read_message(header, fields.read_buf(), &[]);
        let error = result.unwrap_err();
        assert!(error.to_string().contains("Wrong signature for PATH"));
    }

    #[test]
    fn unknown_field_kind_is_rejected() {
        let header = test_header(protocol::MessageType::METHOD_RETURN, 0);

        let mut fields = OwnedBuf::new();
        fields.store(Variant(0xaa));
        fields.write(Signature::UINT32);
        fields.store(7u32);

        let result = super::read_message(header, fields.read_buf(), &[]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let header = test_header(protocol::MessageType::METHOD_CALL, 0);
        let result =
            super::read_message(header, ReadBuf::from_slice(&[], Endianness::NATIVE), &[]);
        assert!(result.is_err());
    }

    #[test]
    fn unsupported_version_is_rejected() -> Result<()> {
        let m = Message::method_return(serial(77)).with_serial(serial(78));

        let mut send = SendBuf::new();
        send.write_message(&m, None)?;

        let mut bytes = send.get().to_vec();
        // Version is the fourth byte of the fixed header.
        bytes[3] = 2;

        let error = decode(&bytes).unwrap_err();
        assert!(error.to_string().contains("version"));
        Ok(())
    }

    #[test]
    fn field_table_multiple_of_eight_has_no_padding() -> Result<()> {
        // A single REPLY_SERIAL entry is exactly 8 bytes, so the body starts
        // immediately after the field table.
        let mut body = OwnedBuf::new();
        body.store(0xdeadbeefu32);

        let m = Message::method_return(serial(0x12345678))
            .with_serial(serial(0x12345678))
            .with_body(body.get().to_vec());

        let mut send = SendBuf::new();
        send.write_message(&m, None)?;

        let bytes = send.get();
        let fields_len =
            u32::from_ne_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
        assert_eq!(fields_len % 8, 0);
        assert_eq!(padding_to::<u64>(fields_len), 0);
        assert_eq!(bytes.len(), 16 + fields_len + 4);

        assert_eq!(decode(bytes)?, m);
        Ok(())
    }

    fn test_header(message_type: protocol::MessageType, body_length: u32) -> protocol::Header {
        protocol::Header {
            endianness: Endianness::NATIVE,
            message_type,
            flags: Flags::EMPTY,
            version: protocol::VERSION,
            body_length,
            serial: 1,
        }
    }
}
