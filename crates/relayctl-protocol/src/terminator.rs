//! Terminator-string decoding and message splitting.
//!
//! The incoming and outgoing message terminators are configured as plain
//! strings with backslash escapes (for example `\r\n`). [`decode_terminator`]
//! turns the configured string into the raw byte sequence;
//! [`TerminatorCodec`] accumulates received bytes and splits them into
//! messages on that sequence.

use bytes::{Buf, BytesMut};

/// Decode a configured terminator string into raw bytes.
///
/// A backslash escapes the next character only: `\r` CR, `\n` LF, `\f` FF,
/// `\b` BS, `\0` NUL. `\t` maps to CR, not tab — deployed configurations
/// depend on this, so it is kept. Any other character, escaped or not,
/// passes through literally; a trailing unmatched backslash is dropped.
pub fn decode_terminator(raw: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut escaped = false;
    for &byte in raw.as_bytes() {
        if escaped {
            out.push(match byte {
                b'r' => 0x0D,
                b'n' => 0x0A,
                b't' => 0x0D,
                b'f' => 0x0C,
                b'b' => 0x08,
                b'0' => 0x00,
                other => other,
            });
            escaped = false;
        } else if byte == b'\\' {
            escaped = true;
        } else {
            out.push(byte);
        }
    }
    out
}

/// Splits a received byte stream into messages on a terminator sequence.
///
/// Bytes are accumulated with [`push`](TerminatorCodec::push) and complete
/// messages extracted with [`decode`](TerminatorCodec::decode), which
/// returns `None` until a full terminator has been seen. The terminator
/// itself is consumed and not part of the returned message.
#[derive(Debug)]
pub struct TerminatorCodec {
    buffer: BytesMut,
    terminator: Vec<u8>,
}

impl TerminatorCodec {
    /// Create a codec splitting on the given byte sequence.
    pub fn new(terminator: Vec<u8>) -> Self {
        TerminatorCodec {
            buffer: BytesMut::with_capacity(256),
            terminator,
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract the next complete message.
    ///
    /// Returns `None` if no full terminator is buffered yet (or the
    /// terminator is empty, in which case messages can never be delimited).
    pub fn decode(&mut self) -> Option<String> {
        if self.terminator.is_empty() {
            return None;
        }
        let pos = self
            .buffer
            .windows(self.terminator.len())
            .position(|window| window == self.terminator.as_slice())?;
        let message = self.buffer.split_to(pos);
        self.buffer.advance(self.terminator.len());
        Some(String::from_utf8_lossy(&message).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_crlf() {
        assert_eq!(decode_terminator("\\r\\n"), vec![0x0D, 0x0A]);
    }

    #[test]
    fn test_decode_tab_maps_to_cr() {
        // Compatibility: \t has always produced CR on this controller.
        assert_eq!(decode_terminator("\\t"), vec![0x0D]);
    }

    #[test]
    fn test_decode_other_escapes() {
        assert_eq!(decode_terminator("\\f\\b\\0"), vec![0x0C, 0x08, 0x00]);
    }

    #[test]
    fn test_literal_characters_pass_through() {
        assert_eq!(decode_terminator(";"), vec![b';']);
        assert_eq!(decode_terminator("\\x"), vec![b'x']);
    }

    #[test]
    fn test_trailing_backslash_dropped() {
        assert_eq!(decode_terminator("\\n\\"), vec![0x0A]);
        assert_eq!(decode_terminator("\\"), Vec::<u8>::new());
    }

    #[test]
    fn test_codec_splits_messages() {
        let mut codec = TerminatorCodec::new(vec![b'\n']);
        codec.push(b"din1?\nc2\n");
        assert_eq!(codec.decode(), Some("din1?".to_string()));
        assert_eq!(codec.decode(), Some("c2".to_string()));
        assert_eq!(codec.decode(), None);
    }

    #[test]
    fn test_codec_multibyte_terminator_across_pushes() {
        let mut codec = TerminatorCodec::new(vec![0x0D, 0x0A]);
        codec.push(b"rout1?\r");
        assert_eq!(codec.decode(), None);
        codec.push(b"\nc1\r\n");
        assert_eq!(codec.decode(), Some("rout1?".to_string()));
        assert_eq!(codec.decode(), Some("c1".to_string()));
    }

    #[test]
    fn test_codec_empty_terminator_never_splits() {
        let mut codec = TerminatorCodec::new(Vec::new());
        codec.push(b"c1\n");
        assert_eq!(codec.decode(), None);
    }
}
