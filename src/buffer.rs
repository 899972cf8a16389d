//! The mutable buffer form: an in-place, no-allocation tuple under
//! construction.
//!
//! The buffer is a flat array of 4-byte units. Descriptors are written
//! growing down from `pivot` toward `head`; payload is written growing up
//! from `pivot` toward `tail`. One unit below `head` is always reserved for
//! the header word that [`RwTuple::take`] stamps in when producing a
//! read-only form, so `head >= 1` holds at all times.
//!
//! ```text
//! [ 0 .. head ) reserved (header slot lives at head-1 once taken)
//! [ head .. pivot )  descriptors, most-recently-appended first
//! [ pivot .. tail )  payload, oldest first
//! [ tail .. end )    free space
//! ```
//!
//! A descriptor's `offset` is a unit count measured from `pivot`; `0xFFFF`
//! marks a null field.

use crate::descriptor::{Descriptor, NULL_OFFSET};
use crate::error::{Error, Result};
use crate::readonly::RoTuple;
use crate::tag::{self, Tag, Type, UNIT_SIZE};

#[inline]
pub(crate) fn read_unit(buf: &[u8], idx: usize) -> u32 {
    let off = idx * UNIT_SIZE;
    u32::from_le_bytes(buf[off..off + UNIT_SIZE].try_into().unwrap())
}

#[inline]
pub(crate) fn write_unit(buf: &mut [u8], idx: usize, value: u32) {
    let off = idx * UNIT_SIZE;
    buf[off..off + UNIT_SIZE].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn units_for_bytes(bytes: usize) -> usize {
    bytes.div_ceil(UNIT_SIZE)
}

/// Minimum buffer size, in bytes, needed for a tuple with room for `items`
/// descriptors and `data_bytes` of payload.
#[must_use]
pub fn required_space(items: usize, data_bytes: usize) -> usize {
    (1 + items + units_for_bytes(data_bytes)) * UNIT_SIZE
}

pub struct RwTuple<'a> {
    pub(crate) buf: &'a mut [u8],
    pub(crate) head: usize,
    pub(crate) pivot: usize,
    pub(crate) tail: usize,
    pub(crate) end: usize,
    pub(crate) junk: usize,
}

impl<'a> RwTuple<'a> {
    /// Initializes an empty tuple in `buf`, reserving room for up to
    /// `items_limit` descriptors; the rest of the buffer becomes payload
    /// capacity.
    pub fn init(buf: &'a mut [u8], items_limit: usize) -> Result<Self> {
        let end = buf.len() / UNIT_SIZE;
        let pivot = 1 + items_limit;
        if pivot > end || items_limit > tag::MAX_FIELDS {
            return Err(Error::NoSpace);
        }
        Ok(RwTuple {
            buf,
            head: pivot,
            pivot,
            tail: pivot,
            end,
            junk: 0,
        })
    }

    /// Number of additional descriptor slots that can still be appended.
    #[must_use]
    pub fn space_for_items(&self) -> usize {
        self.head - 1
    }

    /// Remaining payload capacity, in bytes.
    #[must_use]
    pub fn space_for_data(&self) -> usize {
        (self.end - self.tail) * UNIT_SIZE
    }

    /// Bytes that would become available after a [`RwTuple::shrink`].
    #[must_use]
    pub fn junk_bytes(&self) -> usize {
        self.junk * UNIT_SIZE
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pivot - self.head
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head == self.pivot
    }

    pub(crate) fn descriptor_at(&self, idx: usize) -> Descriptor {
        Descriptor::from_word(read_unit(self.buf, idx))
    }

    pub(crate) fn set_descriptor_at(&mut self, idx: usize, desc: Descriptor) {
        write_unit(self.buf, idx, desc.to_word());
    }

    /// Iterates live and dead descriptors from `head` to `pivot`.
    pub(crate) fn descriptor_indices(&self) -> std::ops::Range<usize> {
        self.head..self.pivot
    }

    pub(crate) fn payload_bytes(&self, offset: u16, len: usize) -> &[u8] {
        let start = (self.pivot + offset as usize) * UNIT_SIZE;
        &self.buf[start..start + len]
    }

    pub(crate) fn payload_bytes_mut(&mut self, offset: u16, len: usize) -> &mut [u8] {
        let start = (self.pivot + offset as usize) * UNIT_SIZE;
        &mut self.buf[start..start + len]
    }

    /// Finds a dead descriptor slot whose recorded payload size equals
    /// `units`, for reuse by [`RwTuple::append_raw`]. O(descriptors).
    pub(crate) fn find_dead(&self, units: usize) -> Option<usize> {
        self.descriptor_indices()
            .find(|&idx| self.dead_slot_units(idx) == Some(units))
    }

    /// `Some(units)` if the descriptor at `idx` is dead, else `None`.
    fn dead_slot_units(&self, idx: usize) -> Option<usize> {
        let d = self.descriptor_at(idx);
        if !d.is_dead() {
            return None;
        }
        Some(match d.tag().ty() {
            Some(ty) if !ty.is_inline() && !d.is_null() => field_units(self, d, ty),
            _ => 0,
        })
    }

    /// Appends one new descriptor + its payload (if any). First tries to
    /// recycle a dead slot of the exact same payload size via `find_dead`;
    /// only on a miss does this grow `head` downward and `tail` upward.
    /// `payload` is `None` for inline/null fields; `Some(bytes)` otherwise.
    pub(crate) fn append_raw(&mut self, tag: Tag, payload: Option<&[u8]>) -> Result<u16> {
        let units = payload.map_or(0, |bytes| units_for_bytes(bytes.len()));
        if let Some(idx) = self.find_dead(units) {
            let offset = match payload {
                None => NULL_OFFSET,
                Some(bytes) => {
                    let offset = self.descriptor_at(idx).offset();
                    let start = (self.pivot + offset as usize) * UNIT_SIZE;
                    self.buf[start..start + bytes.len()].copy_from_slice(bytes);
                    for pad in bytes.len()..units * UNIT_SIZE {
                        self.buf[start + pad] = 0;
                    }
                    offset
                }
            };
            self.set_descriptor_at(idx, Descriptor::new(tag, offset));
            self.junk -= units + 1;
            return Ok(offset);
        }

        if self.head <= 1 {
            return Err(Error::NoSpace);
        }
        let offset = match payload {
            None => NULL_OFFSET,
            Some(bytes) => {
                if self.tail + units > self.end {
                    return Err(Error::NoSpace);
                }
                let word_offset = self.tail - self.pivot;
                if word_offset >= usize::from(NULL_OFFSET) {
                    return Err(Error::NoSpace);
                }
                let start = self.tail * UNIT_SIZE;
                self.buf[start..start + bytes.len()].copy_from_slice(bytes);
                // zero-pad to a whole unit, matching the original's
                // zero-fill-last-unit-first convention for short tails.
                for pad in bytes.len()..units * UNIT_SIZE {
                    self.buf[start + pad] = 0;
                }
                self.tail += units;
                word_offset as u16
            }
        };
        self.head -= 1;
        let desc = Descriptor::new(tag, offset);
        self.set_descriptor_at(self.head, desc);
        Ok(offset)
    }

    pub(crate) fn append_inline(&mut self, tag: Tag, inline_value: u16) -> Result<()> {
        if self.head <= 1 {
            return Err(Error::NoSpace);
        }
        self.head -= 1;
        self.set_descriptor_at(self.head, Descriptor::new(tag, inline_value));
        Ok(())
    }

    /// Marks the descriptor at `idx` dead, accounting its payload (if any)
    /// as junk without moving any bytes.
    pub(crate) fn kill(&mut self, idx: usize) {
        let desc = self.descriptor_at(idx);
        if desc.is_dead() {
            return;
        }
        if let Some(ty) = desc.tag().ty() {
            if !ty.is_inline() && !desc.is_null() {
                let units = field_units(self, desc, ty);
                self.junk += units;
            }
        }
        self.junk += 1;
        let dead_tag = Tag(desc.tag().0 | (tag::DEAD_COLUMN << tag::COLUMN_SHIFT));
        self.set_descriptor_at(idx, Descriptor::new(dead_tag, desc.offset()));
    }

    /// Produces the read-only serialized form without defragmenting first.
    /// The result aliases this buffer's memory.
    #[must_use]
    pub fn take_noshrink(&mut self) -> RoTuple<'_> {
        let header_idx = self.head - 1;
        let items = (self.pivot - self.head) as u32;
        let brutto = (self.tail - header_idx - 1) as u32;
        write_unit(self.buf, header_idx, items | (brutto << 16));
        let start = header_idx * UNIT_SIZE;
        let end = self.tail * UNIT_SIZE;
        RoTuple::new(&self.buf[start..end])
    }

    /// Defragments first (if there is junk to reclaim) then returns the
    /// read-only serialized form.
    #[must_use]
    pub fn take(&mut self) -> RoTuple<'_> {
        let _ = self.shrink();
        self.take_noshrink()
    }

    /// Builds a fresh mutable form from a validated read-only tuple,
    /// reserving room for `more_items` additional descriptors and
    /// `more_payload` additional payload bytes.
    pub fn fetch(
        ro: &RoTuple<'_>,
        buf: &'a mut [u8],
        more_items: usize,
        more_payload: usize,
    ) -> Result<Self> {
        let items = ro.item_count() as usize;
        let payload_bytes = ro.payload_len();
        let items_limit = items + more_items;
        let end = buf.len() / UNIT_SIZE;
        let pivot = 1 + items_limit;
        let data_units = units_for_bytes(payload_bytes + more_payload);
        if pivot + data_units > end || items_limit > tag::MAX_FIELDS {
            return Err(Error::NoSpace);
        }
        let head = pivot - items;
        for (i, desc) in ro.descriptors().enumerate() {
            write_unit(buf, head + i, desc.to_word());
        }
        let payload = ro.payload();
        let payload_start = pivot * UNIT_SIZE;
        buf[payload_start..payload_start + payload.len()].copy_from_slice(payload);
        Ok(RwTuple {
            buf,
            head,
            pivot,
            tail: pivot + units_for_bytes(payload_bytes),
            end,
            junk: 0,
        })
    }

    /// Verifies the mutable form's internal invariants.
    pub fn check(&self) -> std::result::Result<(), &'static str> {
        if self.head < 1 {
            return Err("tuple.head < 1");
        }
        if self.head > self.pivot {
            return Err("tuple.head > tuple.pivot");
        }
        if self.pivot > self.tail {
            return Err("tuple.pivot > tuple.tail");
        }
        if self.tail > self.end {
            return Err("tuple.tail > tuple.end");
        }
        if self.pivot - self.head > tag::MAX_FIELDS {
            return Err("tuple.n_cols > max_fields");
        }
        if self.junk > self.tail - self.head {
            return Err("tuple.junk > tuple.size");
        }
        Ok(())
    }

    /// Compacts descriptors and payload, reclaiming junk space. Returns
    /// `true` if anything was moved. Refuses (returns `Err`) rather than
    /// attempt compaction of a non-canonical ("mesh") layout: every dead
    /// descriptor's payload slot must already be reclaimed by
    /// [`crate::mutate`]'s erase path before shrink runs, so this only ever
    /// needs to close descriptor-slot gaps and trailing junk.
    pub fn shrink(&mut self) -> Result<bool> {
        if self.junk == 0 {
            return Ok(false);
        }
        crate::mutate::shrink_impl(self)
    }
}

pub(crate) fn field_units(rw: &RwTuple<'_>, desc: Descriptor, ty: Type) -> usize {
    if let Some(units) = ty.fixed_units() {
        return units;
    }
    match ty {
        Type::CStr => {
            let available = (rw.tail - rw.pivot - desc.offset() as usize) * UNIT_SIZE;
            let bytes = rw.payload_bytes(desc.offset(), available);
            let len = bytes.iter().position(|&b| b == 0).map_or(bytes.len(), |p| p + 1);
            units_for_bytes(len)
        }
        Type::Opaque | Type::Nested => {
            let head_bytes = rw.payload_bytes(desc.offset(), UNIT_SIZE);
            let brutto = u32::from_le_bytes(head_bytes.try_into().unwrap());
            1 + (brutto as usize)
        }
        _ => unreachable!("fixed types handled above"),
    }
}
