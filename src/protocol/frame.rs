//! NUL-Delimited Framing
//!
//! Messages in both directions are UTF-8 text terminated by a single `0x00`
//! byte. There is no length prefix; the delimiter is the frame boundary.
//!
//! ```text
//! S E L E C T   1 \0 I N S E R T ... \0
//! └───── frame ───┘  └──── frame ────┘
//! ```
//!
//! The parser works on an accumulating buffer, like any stream parser:
//! append what the socket delivered, then pull out complete frames. A
//! delimiter may arrive in any read, including one by itself.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// The frame delimiter.
pub const DELIMITER: u8 = 0x00;

/// Removes the first complete frame from `buf` and decodes it.
///
/// Returns `None` if no delimiter has arrived yet; `buf` is left untouched
/// in that case. Invalid UTF-8 is replaced with U+FFFD rather than rejected.
pub fn parse_frame(buf: &mut BytesMut) -> Option<String> {
    let pos = find_delimiter(buf)?;
    let frame = buf.split_to(pos);
    buf.advance(1);
    Some(String::from_utf8_lossy(&frame).into_owned())
}

/// Encodes `text` as one frame.
///
/// A NUL inside `text` would end the frame early, so any interior NUL is
/// replaced with U+FFFD.
pub fn encode_frame(text: &str) -> Bytes {
    let mut out = BytesMut::with_capacity(text.len() + 1);
    if text.as_bytes().contains(&DELIMITER) {
        out.put_slice(text.replace('\0', "\u{FFFD}").as_bytes());
    } else {
        out.put_slice(text.as_bytes());
    }
    out.put_u8(DELIMITER);
    out.freeze()
}

/// Finds the position of the first delimiter in the buffer.
#[inline]
fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_frame() {
        let mut buf = BytesMut::from(&b"SELECT 1\0"[..]);
        assert_eq!(parse_frame(&mut buf).as_deref(), Some("SELECT 1"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_parse_incomplete_frame() {
        let mut buf = BytesMut::from(&b"SELECT"[..]);
        assert_eq!(parse_frame(&mut buf), None);
        assert_eq!(&buf[..], b"SELECT");

        buf.extend_from_slice(b" 1\0");
        assert_eq!(parse_frame(&mut buf).as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn test_parse_multiple_frames() {
        let mut buf = BytesMut::from(&b"a\0\0b\0c"[..]);
        assert_eq!(parse_frame(&mut buf).as_deref(), Some("a"));
        assert_eq!(parse_frame(&mut buf).as_deref(), Some(""));
        assert_eq!(parse_frame(&mut buf).as_deref(), Some("b"));
        assert_eq!(parse_frame(&mut buf), None);
        assert_eq!(&buf[..], b"c");
    }

    #[test]
    fn test_parse_invalid_utf8() {
        let mut buf = BytesMut::from(&b"caf\xe9\0"[..]);
        assert_eq!(parse_frame(&mut buf).as_deref(), Some("caf\u{FFFD}"));
    }

    #[test]
    fn test_encode_frame() {
        assert_eq!(&encode_frame("done")[..], b"done\0");
        assert_eq!(&encode_frame("")[..], b"\0");
        assert_eq!(&encode_frame("héllo")[..], "héllo\0".as_bytes());
    }

    #[test]
    fn test_encode_interior_nul() {
        let frame = encode_frame("a\0b");
        assert_eq!(frame.iter().filter(|&&b| b == DELIMITER).count(), 1);
        assert_eq!(&frame[..], "a\u{FFFD}b\0".as_bytes());
    }
}
