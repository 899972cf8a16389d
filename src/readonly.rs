//! The read-only serialized form: a header word, a descriptor array, and a
//! payload blob, in that order, with no further framing.

use crate::buffer::read_unit;
use crate::descriptor::Descriptor;
use crate::tag::{self, Type, UNIT_SIZE};

const ITEMS_BITS: u32 = 14;
const ITEMS_MASK: u32 = (1 << ITEMS_BITS) - 1;

/// A borrowed, validated-or-not view over a serialized tuple's bytes.
#[derive(Debug, Clone, Copy)]
pub struct RoTuple<'a> {
    bytes: &'a [u8],
}

impl<'a> RoTuple<'a> {
    /// Wraps `bytes` without validating them. Call [`validate`] first if the
    /// bytes come from an untrusted source.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        RoTuple { bytes }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    fn header_word(&self) -> u32 {
        if self.bytes.len() < UNIT_SIZE {
            return 0;
        }
        read_unit(self.bytes, 0)
    }

    /// Number of descriptor entries (live and dead).
    #[must_use]
    pub fn item_count(&self) -> u16 {
        (self.header_word() & ITEMS_MASK) as u16
    }

    /// Reserved sort/uniqueness flag bits (top 2 bits of the low half-word).
    #[must_use]
    pub fn flags(&self) -> u8 {
        ((self.header_word() >> ITEMS_BITS) & 0b11) as u8
    }

    /// Total size in units minus one.
    #[must_use]
    pub fn brutto(&self) -> u16 {
        (self.header_word() >> 16) as u16
    }

    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn descriptors(&self) -> impl Iterator<Item = Descriptor> + 'a {
        let bytes = self.bytes;
        let n = self.item_count() as usize;
        (0..n).map(move |i| Descriptor::from_word(read_unit(bytes, 1 + i)))
    }

    #[must_use]
    pub fn descriptor(&self, idx: usize) -> Option<Descriptor> {
        if idx >= self.item_count() as usize {
            return None;
        }
        Some(Descriptor::from_word(read_unit(self.bytes, 1 + idx)))
    }

    fn payload_start(&self) -> usize {
        (1 + self.item_count() as usize) * UNIT_SIZE
    }

    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        let start = self.payload_start().min(self.bytes.len());
        &self.bytes[start..]
    }

    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload().len()
    }

    /// Field payload bytes at `offset` units from the start of the payload
    /// area, `len` bytes long.
    #[must_use]
    pub fn field_bytes(&self, offset: u16, len: usize) -> Option<&'a [u8]> {
        let start = self.payload_start() + offset as usize * UNIT_SIZE;
        self.bytes.get(start..start + len)
    }

    /// First descriptor (live or dead) whose column and type satisfy `filter`.
    #[must_use]
    pub fn lookup(&self, column: u16, filter: crate::tag::TypeFilter) -> Option<Descriptor> {
        self.descriptors()
            .find(|d| !d.is_dead() && d.tag().matches(column, filter))
    }
}

/// Structurally validates a serialized tuple: bounds, monotonic payload
/// placement, declared lengths matching actual bytes. Does not inspect
/// individual field *values*, only their framing.
pub fn validate(bytes: &[u8]) -> std::result::Result<(), &'static str> {
    if bytes.is_empty() {
        return Ok(());
    }
    if bytes.len() < UNIT_SIZE {
        return Err("tuple.length_bytes < unit_size");
    }
    if bytes.len() > tag::MAX_TUPLE_BYTES {
        return Err("tuple.length_bytes > max_tuple_bytes");
    }
    let ro = RoTuple::new(bytes);
    let expected_len = (1 + ro.brutto() as usize) * UNIT_SIZE;
    if bytes.len() != expected_len {
        return Err("tuple.length_bytes != tuple.brutto");
    }
    let items = ro.item_count() as usize;
    if items > tag::MAX_FIELDS {
        return Err("tuple.items > max_fields");
    }
    let payload_start = ro.payload_start();
    if payload_start > bytes.len() {
        return Err("tuple.pivot > tuple.end");
    }

    let mut prev_payload_end = 0usize; // unit offset, monotonic non-decreasing
    let mut payload_total = 0usize;
    for desc in ro.descriptors() {
        let Some(ty) = desc.tag().ty() else {
            return Err("field.type unknown");
        };
        if desc.is_dead() {
            continue;
        }
        if ty.is_inline() {
            continue;
        }
        if desc.is_null() {
            continue;
        }
        let offset = desc.offset() as usize;
        if offset < prev_payload_end {
            return Err("field.payload < previous.payload (mesh tuples NOT supported)");
        }
        let field_len = match ty.fixed_units() {
            Some(units) => units,
            None => {
                let available = bytes.len().saturating_sub(payload_start + offset * UNIT_SIZE);
                match ty {
                    Type::CStr => {
                        let Some(data) = ro.field_bytes(desc.offset(), available) else {
                            return Err("field.end > detent");
                        };
                        let len = data.iter().position(|&b| b == 0).map_or(data.len(), |p| p + 1);
                        len.div_ceil(UNIT_SIZE)
                    }
                    Type::Opaque | Type::Nested => {
                        let Some(head) = ro.field_bytes(desc.offset(), UNIT_SIZE) else {
                            return Err("field.varlen > detent");
                        };
                        let brutto = u32::from_le_bytes(head.try_into().unwrap()) as usize;
                        1 + brutto
                    }
                    _ => unreachable!(),
                }
            }
        };
        if ro.field_bytes(desc.offset(), field_len * UNIT_SIZE).is_none() {
            return Err("field.end > detent");
        }
        prev_payload_end = offset + field_len;
        payload_total += field_len;
    }

    let payload_end = payload_start + payload_total * UNIT_SIZE;
    if payload_end > bytes.len() {
        return Err("tuple.overlapped");
    }
    if payload_end != bytes.len() {
        return Err("tuple.has_wholes");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{required_space, RwTuple};
    use crate::tag::Tag;

    #[test]
    fn empty_tuple_is_valid() {
        assert!(validate(&[]).is_ok());
    }

    #[test]
    fn round_trip_header_fields() {
        let mut raw = vec![0u8; required_space(2, 16)];
        let mut rw = RwTuple::init(&mut raw, 2).unwrap();
        rw.append_inline(Tag::pack(1, Type::Uint16), 7).unwrap();
        let ro = rw.take_noshrink();
        assert_eq!(ro.item_count(), 1);
        assert!(validate(ro.as_bytes()).is_ok());
    }
}
