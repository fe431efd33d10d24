//! Lockstep input data: one player's keyed input and the per-tick frame.

use lockrelay_pool::Recycle;
use serde::{Deserialize, Serialize};

use crate::{ProtocolError, UserId, WireReader, WireWriter};

/// One player's input for one tick: a small map from input key (axis,
/// button, whatever the client defines — opaque to the server) to a
/// numeric value.
///
/// Keys are unique within a set; setting a key that's already present
/// overwrites it. Entry order is not significant.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSet {
    /// The player this input belongs to.
    pub owner: UserId,
    entries: Vec<(u8, f32)>,
}

impl InputSet {
    /// Creates an empty input set for `owner`.
    pub fn empty(owner: UserId) -> Self {
        Self {
            owner,
            entries: Vec::new(),
        }
    }

    /// Sets a key, overwriting any existing value for it.
    pub fn set(&mut self, key: u8, value: f32) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Returns the value for `key`, or 0.0 when unset — the neutral
    /// input, matching what a client that sent nothing would mean.
    pub fn get(&self, key: u8) -> f32 {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }

    /// Whether no keys are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.put_u32(self.owner.0);
        w.put_u16(self.entries.len() as u16);
        for (key, value) in &self.entries {
            w.put_u8(*key);
            w.put_f32(*value);
        }
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let owner = UserId(r.u32()?);
        let count = r.u16()? as usize;
        let mut set = Self::empty(owner);
        for _ in 0..count {
            let key = r.u8()?;
            let value = r.f32()?;
            set.set(key, value);
        }
        Ok(set)
    }
}

impl Recycle for InputSet {
    fn recycle(&mut self) {
        self.owner = UserId::UNASSIGNED;
        self.entries.clear();
    }
}

/// The server's per-tick aggregate: every member's input for one frame
/// number, in member join order.
///
/// A frame is immutable once broadcast. The mutable thing is the
/// aggregation buffer inside the lockstep engine; this is its output.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Monotonic frame number, 0 on game start.
    pub frame: u64,
    /// One entry per room member, join order.
    pub inputs: Vec<InputSet>,
}

impl Frame {
    /// Appends a member's input.
    pub fn push(&mut self, input: InputSet) {
        self.inputs.push(input);
    }

    /// Returns the input for `owner`, if present.
    pub fn input_for(&self, owner: UserId) -> Option<&InputSet> {
        self.inputs.iter().find(|i| i.owner == owner)
    }

    /// Whether `owner` has an entry in this frame.
    pub fn contains(&self, owner: UserId) -> bool {
        self.input_for(owner).is_some()
    }

    pub(crate) fn write(&self, w: &mut WireWriter) {
        w.put_u64(self.frame);
        w.put_u16(self.inputs.len() as u16);
        for input in &self.inputs {
            input.write(w);
        }
    }

    pub(crate) fn read(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let frame = r.u64()?;
        let count = r.u16()? as usize;
        let mut inputs = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            inputs.push(InputSet::read(r)?);
        }
        Ok(Self { frame, inputs })
    }
}

impl Recycle for Frame {
    fn recycle(&mut self) {
        self.frame = 0;
        self.inputs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites_existing_key() {
        // Last write wins within a set — the same policy the lockstep
        // buffer applies across resubmissions in one tick.
        let mut input = InputSet::empty(UserId(1));
        input.set(3, 1.0);
        input.set(3, -1.0);

        assert_eq!(input.len(), 1);
        assert_eq!(input.get(3), -1.0);
    }

    #[test]
    fn test_get_unset_key_is_neutral() {
        let input = InputSet::empty(UserId(1));
        assert_eq!(input.get(9), 0.0);
    }

    #[test]
    fn test_input_set_wire_round_trip() {
        let mut input = InputSet::empty(UserId(42));
        input.set(0, 1.0);
        input.set(7, 0.25);

        let mut w = WireWriter::new();
        input.write(&mut w);
        let bytes = w.into_bytes();

        let mut r = WireReader::new(&bytes);
        let decoded = InputSet::read(&mut r).unwrap();
        r.finish().unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_frame_preserves_input_order() {
        let mut frame = Frame::default();
        frame.frame = 5;
        frame.push(InputSet::empty(UserId(2)));
        frame.push(InputSet::empty(UserId(1)));

        let mut w = WireWriter::new();
        frame.write(&mut w);
        let bytes = w.into_bytes();

        let decoded = Frame::read(&mut WireReader::new(&bytes)).unwrap();
        let owners: Vec<UserId> =
            decoded.inputs.iter().map(|i| i.owner).collect();
        assert_eq!(owners, vec![UserId(2), UserId(1)]);
    }

    #[test]
    fn test_recycle_clears_prior_use() {
        let mut input = InputSet::empty(UserId(9));
        input.set(1, 2.0);
        input.recycle();
        assert_eq!(input.owner, UserId::UNASSIGNED);
        assert!(input.is_empty());

        let mut frame = Frame {
            frame: 10,
            inputs: vec![InputSet::empty(UserId(1))],
        };
        frame.recycle();
        assert_eq!(frame.frame, 0);
        assert!(frame.inputs.is_empty());
    }

    #[test]
    fn test_frame_renders_as_json_for_trace_logs() {
        let mut input = InputSet::empty(UserId(1));
        input.set(0, 1.0);
        let frame = Frame {
            frame: 3,
            inputs: vec![input],
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"frame\":3"));
    }
}
