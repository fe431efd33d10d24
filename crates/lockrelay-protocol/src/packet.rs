//! The length-delimited wire envelope.
//!
//! Every datagram is exactly one packet:
//!
//! ```text
//! [ i32 opcode ][ i32 payload_len ][ payload ]
//! payload = [ u16 status ][ u16 reason_len ][ reason ][ body ]
//! ```
//!
//! All integers big-endian (see [`crate::wire`]). `status` 0 means the
//! packet is a normal message and `body` holds the message fields; a
//! non-zero status is an error reply, carrying a human-readable `reason`
//! and usually an empty body.

use crate::{Message, Opcode, ProtocolError, WireReader, WireWriter};

/// Hard cap on payload size. A datagram claiming more than this is
/// corrupt or hostile and is dropped at the framing boundary.
pub const MAX_PAYLOAD: usize = 64 * 1024;

/// Reply status codes, HTTP-flavored like the rest of the ecosystem.
pub mod status {
    /// Normal message.
    pub const OK: u16 = 0;
    /// The room (or the thing the request named) is full.
    pub const FULL: u16 = 403;
    /// No such room/user.
    pub const NOT_FOUND: u16 = 404;
    /// The operation is not valid in the room's current state.
    pub const INVALID_STATE: u16 = 409;
}

/// A decoded envelope: opcode, reply status, and the raw message body.
///
/// The body stays as bytes here — only the layer that knows which
/// message struct an opcode maps to turns it into fields, via
/// [`Packet::read`].
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Which message this is.
    pub opcode: Opcode,
    /// [`status::OK`] for normal traffic, an error code for replies.
    pub status: u16,
    /// Human-readable reason for a non-OK status; empty otherwise.
    pub reason: String,
    /// The flat-encoded message fields.
    pub body: Vec<u8>,
}

impl Packet {
    /// Builds a normal packet from a typed message.
    pub fn message<M: Message>(msg: &M) -> Self {
        let mut w = WireWriter::new();
        msg.write(&mut w);
        Self {
            opcode: M::OPCODE,
            status: status::OK,
            reason: String::new(),
            body: w.into_bytes(),
        }
    }

    /// Builds an error reply: status code plus reason, no body.
    pub fn error(opcode: Opcode, status: u16, reason: impl Into<String>) -> Self {
        Self {
            opcode,
            status,
            reason: reason.into(),
            body: Vec::new(),
        }
    }

    /// Whether this packet carries a normal message (status 0).
    pub fn is_ok(&self) -> bool {
        self.status == status::OK
    }

    /// Decodes the body as message type `M`, checking the opcode matches.
    pub fn read<M: Message>(&self) -> Result<M, ProtocolError> {
        if self.opcode != M::OPCODE {
            return Err(ProtocolError::OpcodeMismatch {
                actual: self.opcode,
                expected: M::OPCODE,
            });
        }
        let mut r = WireReader::new(&self.body);
        let msg = M::read(&mut r)?;
        r.finish()?;
        Ok(msg)
    }

    /// Encodes the full envelope into wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = WireWriter::with_capacity(4 + self.reason.len() + self.body.len());
        payload.put_u16(self.status);
        payload.put_str(&self.reason);
        payload.put_bytes(&self.body);
        let payload = payload.into_bytes();

        let mut w = WireWriter::with_capacity(8 + payload.len());
        w.put_i32(self.opcode.to_wire());
        w.put_i32(payload.len() as i32);
        w.put_bytes(&payload);
        w.into_bytes()
    }

    /// Decodes one envelope from a datagram.
    ///
    /// Rejects unknown opcodes, negative/oversized lengths, truncated
    /// payloads, and trailing bytes — a datagram is exactly one packet.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = WireReader::new(data);
        let opcode = Opcode::from_wire(r.i32()?)?;
        let len = r.i32()?;
        if len < 0 || len as usize > MAX_PAYLOAD {
            return Err(ProtocolError::InvalidLength(len as i64));
        }
        let payload = r.bytes(len as usize)?;
        r.finish()?;

        let mut p = WireReader::new(payload);
        let status = p.u16()?;
        let reason = p.str()?;
        let body = p.bytes(p.remaining())?.to_vec();

        Ok(Self {
            opcode,
            status,
            reason,
            body,
        })
    }
}
