//! Line-based codec for tokio.
//!
//! Frames the transport byte stream into IRC lines. Unlike a server
//! codec this one never rejects a line: inbound length is unbounded
//! (bouncers routinely exceed the nominal 512 bytes) and invalid
//! UTF-8 is replaced lossily, because a client must stay connected in
//! the face of adversarial or merely sloppy input.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::WireError;

/// Line codec: decodes `\r\n`- (or bare `\n`-) terminated lines to
/// `String`, encodes `String`s appending `\r\n` when absent.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Index of the next byte to check for a newline.
    next_index: usize,
}

impl LineCodec {
    /// Create a new line codec.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, WireError> {
        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();
            return Ok(None);
        };
        let mut line = src.split_to(self.next_index + offset + 1);
        self.next_index = 0;

        // Drop the terminator(s)
        let mut end = line.len() - 1;
        if end > 0 && line[end - 1] == b'\r' {
            end -= 1;
        }
        line.truncate(end);

        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

impl Encoder<String> for LineCodec {
    type Error = WireError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> Result<(), WireError> {
        dst.reserve(msg.len() + 2);
        dst.put_slice(msg.as_bytes());
        if !msg.ends_with("\r\n") {
            dst.put_slice(b"\r\n");
        }
        Ok(())
    }
}
