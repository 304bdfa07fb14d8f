use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Message ID of the enable/disable request.
pub const ENABLE_DISABLE: u16 = 0x0001;
/// Message ID of the enable/disable reply.
pub const ENABLE_DISABLE_REPLY: u16 = 0x0002;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("Unknown message ID: {0:#06x}")]
    UnknownMessage(u16),
    #[error("Invalid body size for message {msg_id:#06x}: expected {expected}, got {actual}")]
    BodySize { msg_id: u16, expected: u32, actual: u32 },
}

/// Request to arm or disarm the oddbuf stage on an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnableDisable {
    /// Client-chosen value, echoed back in the reply.
    pub context: u32,
    pub sw_if_index: u32,
    pub enable_disable: bool,
}

impl EnableDisable {
    const BODY_LEN: u32 = 5;
}

/// Reply to an [`EnableDisable`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnableDisableReply {
    pub context: u32,
    /// Status code, `0` on success and negative on failure.
    pub retval: i32,
}

impl EnableDisableReply {
    const BODY_LEN: u32 = 4;
}

/// A control API message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    EnableDisable(EnableDisable),
    EnableDisableReply(EnableDisableReply),
}

impl Message {
    #[inline]
    pub const fn msg_id(&self) -> u16 {
        match self {
            Self::EnableDisable(_) => ENABLE_DISABLE,
            Self::EnableDisableReply(_) => ENABLE_DISABLE_REPLY,
        }
    }

    #[inline]
    pub const fn context(&self) -> u32 {
        match self {
            Self::EnableDisable(req) => req.context,
            Self::EnableDisableReply(rep) => rep.context,
        }
    }

    /// Returns the total encoded size of the message in bytes.
    #[inline]
    pub const fn size(&self) -> usize {
        Header::len() + self.body_len() as usize
    }

    const fn body_len(&self) -> u32 {
        match self {
            Self::EnableDisable(_) => EnableDisable::BODY_LEN,
            Self::EnableDisableReply(_) => EnableDisableReply::BODY_LEN,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub(crate) msg_id: u16,
    pub(crate) context: u32,
    /// The size of the message body.
    pub(crate) size: u32,
}

impl Header {
    /// Returns the length of the header in bytes.
    #[inline]
    pub const fn len() -> usize {
        10
    }

    fn expected_body_len(&self) -> Result<u32, Error> {
        match self.msg_id {
            ENABLE_DISABLE => Ok(EnableDisable::BODY_LEN),
            ENABLE_DISABLE_REPLY => Ok(EnableDisableReply::BODY_LEN),
            other => Err(Error::UnknownMessage(other)),
        }
    }
}

#[derive(Default)]
enum State {
    #[default]
    Header,
    Body(Header),
}

/// Length-delimited codec for control API [`Message`]s. All integers are big-endian.
#[derive(Default)]
pub struct Codec {
    /// The current state of the decoder.
    state: State,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for Codec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                State::Header => {
                    if src.len() < Header::len() {
                        return Ok(None);
                    }

                    let header =
                        Header { msg_id: src.get_u16(), context: src.get_u32(), size: src.get_u32() };

                    // Reject bad frames before waiting on a body that may never come.
                    let expected = header.expected_body_len()?;
                    if expected != header.size {
                        return Err(Error::BodySize {
                            msg_id: header.msg_id,
                            expected,
                            actual: header.size,
                        });
                    }

                    self.state = State::Body(header);
                }
                State::Body(header) => {
                    if src.len() < header.size as usize {
                        return Ok(None);
                    }

                    let message = match header.msg_id {
                        ENABLE_DISABLE => Message::EnableDisable(EnableDisable {
                            context: header.context,
                            sw_if_index: src.get_u32(),
                            enable_disable: src.get_u8() != 0,
                        }),
                        _ => Message::EnableDisableReply(EnableDisableReply {
                            context: header.context,
                            retval: src.get_i32(),
                        }),
                    };

                    tracing::trace!(msg_id = header.msg_id, context = header.context, "decoded message");

                    self.state = State::Header;
                    return Ok(Some(message));
                }
            }
        }
    }
}

impl Encoder<Message> for Codec {
    type Error = Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.size());

        dst.put_u16(item.msg_id());
        dst.put_u32(item.context());
        dst.put_u32(item.body_len());

        match item {
            Message::EnableDisable(req) => {
                dst.put_u32(req.sw_if_index);
                dst.put_u8(u8::from(req.enable_disable));
            }
            Message::EnableDisableReply(rep) => {
                dst.put_i32(rep.retval);
            }
        }

        Ok(())
    }
}
