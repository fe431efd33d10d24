//! Flat binary encoding primitives.
//!
//! Every message body is its fields written in declaration order with no
//! schema metadata. All multi-byte integers are **big-endian** (network
//! byte order) on both encode and decode; floats are their IEEE-754 bit
//! patterns, also big-endian. Strings are a `u16` byte length followed by
//! UTF-8 bytes.

use crate::ProtocolError;

/// Appends wire-encoded fields to a growable buffer.
///
/// Writing is infallible — the buffer grows as needed. All the fallibility
/// lives on the read side, where the bytes come from the network.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with pre-reserved capacity.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    /// Consumes the writer, returning the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Writes a length-prefixed UTF-8 string (`u16` byte count).
    ///
    /// Strings longer than `u16::MAX` bytes are truncated at the last
    /// char boundary that fits; protocol strings are names and reasons,
    /// nowhere near the limit in practice.
    pub fn put_str(&mut self, v: &str) {
        let mut end = v.len().min(u16::MAX as usize);
        while !v.is_char_boundary(end) {
            end -= 1;
        }
        self.put_u16(end as u16);
        self.buf.extend_from_slice(&v.as_bytes()[..end]);
    }

    /// Writes raw bytes with no length prefix.
    pub fn put_bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }
}

/// Reads wire-encoded fields from a borrowed buffer.
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Creates a reader over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, ProtocolError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32, ProtocolError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> Result<u64, ProtocolError> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn i32(&mut self) -> Result<i32, ProtocolError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn f32(&mut self) -> Result<f32, ProtocolError> {
        let b = self.take(4)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn str(&mut self) -> Result<String, ProtocolError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?.to_vec();
        Ok(String::from_utf8(bytes)?)
    }

    /// Reads `n` raw bytes.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        self.take(n)
    }

    /// Errors if any bytes remain unconsumed.
    pub fn finish(&self) -> Result<(), ProtocolError> {
        if self.remaining() > 0 {
            return Err(ProtocolError::TrailingBytes(self.remaining()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_round_trip_big_endian() {
        let mut w = WireWriter::new();
        w.put_u8(0xAB);
        w.put_u16(0x0102);
        w.put_u32(0xDEAD_BEEF);
        w.put_u64(42);
        w.put_i32(-7);
        w.put_f32(1.5);
        let bytes = w.into_bytes();

        // Spot-check the byte order is actually big-endian on the wire.
        assert_eq!(&bytes[1..3], &[0x01, 0x02]);
        assert_eq!(&bytes[3..7], &[0xDE, 0xAD, 0xBE, 0xEF]);

        let mut r = WireReader::new(&bytes);
        assert_eq!(r.u8().unwrap(), 0xAB);
        assert_eq!(r.u16().unwrap(), 0x0102);
        assert_eq!(r.u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.u64().unwrap(), 42);
        assert_eq!(r.i32().unwrap(), -7);
        assert_eq!(r.f32().unwrap(), 1.5);
        r.finish().unwrap();
    }

    #[test]
    fn test_str_round_trip() {
        let mut w = WireWriter::new();
        w.put_str("玩家-42");
        let bytes = w.into_bytes();

        let mut r = WireReader::new(&bytes);
        assert_eq!(r.str().unwrap(), "玩家-42");
    }

    #[test]
    fn test_truncated_read_reports_shortfall() {
        let mut r = WireReader::new(&[0x01, 0x02]);
        let err = r.u32().unwrap_err();
        assert!(
            matches!(err, ProtocolError::Truncated { needed: 4, remaining: 2 }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_str_with_lying_length_prefix_is_truncated_error() {
        let mut w = WireWriter::new();
        w.put_u16(100); // claims 100 bytes follow
        w.put_bytes(b"short");
        let bytes = w.into_bytes();

        let mut r = WireReader::new(&bytes);
        assert!(matches!(
            r.str(),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn test_finish_rejects_trailing_bytes() {
        let mut r = WireReader::new(&[1, 2, 3]);
        let _ = r.u8().unwrap();
        assert!(matches!(
            r.finish(),
            Err(ProtocolError::TrailingBytes(2))
        ));
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let mut w = WireWriter::new();
        w.put_u16(2);
        w.put_bytes(&[0xFF, 0xFE]);
        let bytes = w.into_bytes();

        let mut r = WireReader::new(&bytes);
        assert!(matches!(r.str(), Err(ProtocolError::InvalidUtf8(_))));
    }
}
