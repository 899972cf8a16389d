//! Upsert/insert/update/erase and the compaction (`shrink`) that
//! [`RwTuple::take`] runs before stamping the header word.
//!
//! Three verbs share one underlying mechanism:
//! - `upsert_*` replaces an existing field of the same column/type if one
//!   exists, else appends a new one.
//! - `insert_*` always appends a new field, even if one with the same
//!   column/type already exists — this is how collections (repeated tags)
//!   are built.
//! - `update_*` requires an existing field and replaces it; `Error::NoField`
//!   if none exists.

use crate::buffer::{field_units, units_for_bytes, RwTuple};
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::iter::lookup_ct;
use crate::readonly::RoTuple;
use crate::tag::{Tag, Type, UNIT_SIZE};
use crate::time::Time;

fn rollback(rw: &mut RwTuple<'_>, idx: usize, original: Descriptor) {
    if let Some(ty) = original.tag().ty() {
        if !ty.is_inline() && !original.is_null() {
            let units = field_units(rw, original, ty);
            rw.junk -= units;
        }
    }
    rw.junk -= 1;
    rw.set_descriptor_at(idx, original);
}

/// Kills any existing field of `tag`, then appends a new one with `payload`.
/// Restores the killed field on `NoSpace` so a failed upsert leaves the
/// tuple exactly as it was, matching the reference `fptu_emplace`'s
/// takeover-then-rollback behavior.
fn emplace_raw(rw: &mut RwTuple<'_>, tag: Tag, payload: Option<&[u8]>) -> Result<()> {
    if let Some(idx) = lookup_ct(rw, tag) {
        let original = rw.descriptor_at(idx);
        rw.kill(idx);
        match rw.append_raw(tag, payload) {
            Ok(_) => Ok(()),
            Err(e) => {
                rollback(rw, idx, original);
                Err(e)
            }
        }
    } else {
        rw.append_raw(tag, payload).map(|_| ())
    }
}

fn emplace_inline(rw: &mut RwTuple<'_>, tag: Tag, value: u16) -> Result<()> {
    if let Some(idx) = lookup_ct(rw, tag) {
        let original = rw.descriptor_at(idx);
        rw.kill(idx);
        match rw.append_inline(tag, value) {
            Ok(()) => Ok(()),
            Err(e) => {
                rollback(rw, idx, original);
                Err(e)
            }
        }
    } else {
        rw.append_inline(tag, value)
    }
}

fn update_raw(rw: &mut RwTuple<'_>, tag: Tag, payload: Option<&[u8]>) -> Result<()> {
    if lookup_ct(rw, tag).is_none() {
        return Err(Error::NoField);
    }
    emplace_raw(rw, tag, payload)
}

fn update_inline(rw: &mut RwTuple<'_>, tag: Tag, value: u16) -> Result<()> {
    if lookup_ct(rw, tag).is_none() {
        return Err(Error::NoField);
    }
    emplace_inline(rw, tag, value)
}

fn encode_opaque(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() > crate::tag::MAX_OPAQUE_BYTES {
        return Err(Error::ValueOutOfRange);
    }
    let data_units = units_for_bytes(data.len());
    let brutto = 1 + data_units; // one unit for the inner length word
    let total_units = 1 + brutto;
    let mut out = vec![0u8; total_units * UNIT_SIZE];
    out[0..4].copy_from_slice(&(brutto as u32).to_le_bytes());
    out[4..8].copy_from_slice(&(data.len() as u32).to_le_bytes());
    out[8..8 + data.len()].copy_from_slice(data);
    Ok(out)
}

fn encode_nested(nested_bytes: &[u8]) -> Result<Vec<u8>> {
    let units = units_for_bytes(nested_bytes.len());
    if units > u32::from(u16::MAX) as usize {
        return Err(Error::ValueOutOfRange);
    }
    let mut out = vec![0u8; (1 + units) * UNIT_SIZE];
    out[0..4].copy_from_slice(&(units as u32).to_le_bytes());
    out[4..4 + nested_bytes.len()].copy_from_slice(nested_bytes);
    Ok(out)
}

fn encode_cstr(s: &str) -> Result<Vec<u8>> {
    if s.as_bytes().contains(&0) {
        return Err(Error::Invalid);
    }
    if s.len() + 1 > crate::tag::MAX_FIELD_BYTES {
        return Err(Error::ValueOutOfRange);
    }
    let mut out = Vec::with_capacity(s.len() + 1);
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    Ok(out)
}

macro_rules! scalar_methods {
    ($variant:ident, $rust_ty:ty, $upsert:ident, $insert:ident, $update:ident) => {
        pub fn $upsert(&mut self, column: u16, value: $rust_ty) -> Result<()> {
            emplace_raw(
                self,
                Tag::pack(column, Type::$variant),
                Some(&value.to_le_bytes()),
            )
        }

        pub fn $insert(&mut self, column: u16, value: $rust_ty) -> Result<()> {
            self.append_raw(Tag::pack(column, Type::$variant), Some(&value.to_le_bytes()))
                .map(|_| ())
        }

        pub fn $update(&mut self, column: u16, value: $rust_ty) -> Result<()> {
            update_raw(
                self,
                Tag::pack(column, Type::$variant),
                Some(&value.to_le_bytes()),
            )
        }
    };
}

macro_rules! fixed_blob_methods {
    ($variant:ident, $n:literal, $upsert:ident, $insert:ident, $update:ident) => {
        pub fn $upsert(&mut self, column: u16, value: &[u8; $n]) -> Result<()> {
            emplace_raw(self, Tag::pack(column, Type::$variant), Some(value))
        }

        pub fn $insert(&mut self, column: u16, value: &[u8; $n]) -> Result<()> {
            self.append_raw(Tag::pack(column, Type::$variant), Some(value))
                .map(|_| ())
        }

        pub fn $update(&mut self, column: u16, value: &[u8; $n]) -> Result<()> {
            update_raw(self, Tag::pack(column, Type::$variant), Some(value))
        }
    };
}

impl<'a> RwTuple<'a> {
    /// Appends or replaces a value-less marker field (`Type::Null`) at `column`.
    pub fn upsert_null_marker(&mut self, column: u16) -> Result<()> {
        emplace_inline(self, Tag::pack(column, Type::Null), 0)
    }

    pub fn insert_null_marker(&mut self, column: u16) -> Result<()> {
        self.append_inline(Tag::pack(column, Type::Null), 0)
    }

    pub fn update_null_marker(&mut self, column: u16) -> Result<()> {
        update_inline(self, Tag::pack(column, Type::Null), 0)
    }

    /// Sets `column`/`ty` explicitly to null (the `0xFFFF`-offset sentinel).
    /// `ty` must not be an inline type — inline fields have no separate null
    /// representation, their offset word always holds the value itself.
    pub fn upsert_null_field(&mut self, column: u16, ty: Type) -> Result<()> {
        if ty.is_inline() {
            return Err(Error::TypeMismatch);
        }
        emplace_raw(self, Tag::pack(column, ty), None)
    }

    pub fn insert_null_field(&mut self, column: u16, ty: Type) -> Result<()> {
        if ty.is_inline() {
            return Err(Error::TypeMismatch);
        }
        self.append_raw(Tag::pack(column, ty), None).map(|_| ())
    }

    pub fn update_null_field(&mut self, column: u16, ty: Type) -> Result<()> {
        if ty.is_inline() {
            return Err(Error::TypeMismatch);
        }
        update_raw(self, Tag::pack(column, ty), None)
    }

    pub fn upsert_uint16(&mut self, column: u16, value: u16) -> Result<()> {
        emplace_inline(self, Tag::pack(column, Type::Uint16), value)
    }

    pub fn insert_uint16(&mut self, column: u16, value: u16) -> Result<()> {
        self.append_inline(Tag::pack(column, Type::Uint16), value)
    }

    pub fn update_uint16(&mut self, column: u16, value: u16) -> Result<()> {
        update_inline(self, Tag::pack(column, Type::Uint16), value)
    }

    scalar_methods!(Int32, i32, upsert_int32, insert_int32, update_int32);
    scalar_methods!(Uint32, u32, upsert_uint32, insert_uint32, update_uint32);
    scalar_methods!(Float32, f32, upsert_float32, insert_float32, update_float32);
    scalar_methods!(Int64, i64, upsert_int64, insert_int64, update_int64);
    scalar_methods!(Uint64, u64, upsert_uint64, insert_uint64, update_uint64);
    scalar_methods!(Float64, f64, upsert_float64, insert_float64, update_float64);

    fixed_blob_methods!(Fixed96, 12, upsert_fixed96, insert_fixed96, update_fixed96);
    fixed_blob_methods!(Fixed128, 16, upsert_fixed128, insert_fixed128, update_fixed128);
    fixed_blob_methods!(Fixed160, 20, upsert_fixed160, insert_fixed160, update_fixed160);
    fixed_blob_methods!(Fixed256, 32, upsert_fixed256, insert_fixed256, update_fixed256);

    pub fn upsert_datetime(&mut self, column: u16, value: Time) -> Result<()> {
        emplace_raw(
            self,
            Tag::pack(column, Type::DateTime),
            Some(&value.to_fixedpoint().to_le_bytes()),
        )
    }

    pub fn insert_datetime(&mut self, column: u16, value: Time) -> Result<()> {
        self.append_raw(
            Tag::pack(column, Type::DateTime),
            Some(&value.to_fixedpoint().to_le_bytes()),
        )
        .map(|_| ())
    }

    pub fn update_datetime(&mut self, column: u16, value: Time) -> Result<()> {
        update_raw(
            self,
            Tag::pack(column, Type::DateTime),
            Some(&value.to_fixedpoint().to_le_bytes()),
        )
    }

    pub fn upsert_cstr(&mut self, column: u16, value: &str) -> Result<()> {
        let bytes = encode_cstr(value)?;
        emplace_raw(self, Tag::pack(column, Type::CStr), Some(&bytes))
    }

    pub fn insert_cstr(&mut self, column: u16, value: &str) -> Result<()> {
        let bytes = encode_cstr(value)?;
        self.append_raw(Tag::pack(column, Type::CStr), Some(&bytes))
            .map(|_| ())
    }

    pub fn update_cstr(&mut self, column: u16, value: &str) -> Result<()> {
        let bytes = encode_cstr(value)?;
        update_raw(self, Tag::pack(column, Type::CStr), Some(&bytes))
    }

    pub fn upsert_opaque(&mut self, column: u16, value: &[u8]) -> Result<()> {
        let bytes = encode_opaque(value)?;
        emplace_raw(self, Tag::pack(column, Type::Opaque), Some(&bytes))
    }

    pub fn insert_opaque(&mut self, column: u16, value: &[u8]) -> Result<()> {
        let bytes = encode_opaque(value)?;
        self.append_raw(Tag::pack(column, Type::Opaque), Some(&bytes))
            .map(|_| ())
    }

    pub fn update_opaque(&mut self, column: u16, value: &[u8]) -> Result<()> {
        let bytes = encode_opaque(value)?;
        update_raw(self, Tag::pack(column, Type::Opaque), Some(&bytes))
    }

    pub fn upsert_nested(&mut self, column: u16, value: &RoTuple<'_>) -> Result<()> {
        let bytes = encode_nested(value.as_bytes())?;
        emplace_raw(self, Tag::pack(column, Type::Nested), Some(&bytes))
    }

    pub fn insert_nested(&mut self, column: u16, value: &RoTuple<'_>) -> Result<()> {
        let bytes = encode_nested(value.as_bytes())?;
        self.append_raw(Tag::pack(column, Type::Nested), Some(&bytes))
            .map(|_| ())
    }

    pub fn update_nested(&mut self, column: u16, value: &RoTuple<'_>) -> Result<()> {
        let bytes = encode_nested(value.as_bytes())?;
        update_raw(self, Tag::pack(column, Type::Nested), Some(&bytes))
    }

    /// Erases the live field at logical index `idx` (0-based, in the same
    /// physical scan order [`crate::iter::FieldSource`] uses). Reclaims the
    /// descriptor slot, and its payload if it abuts `tail`, immediately.
    pub fn erase(&mut self, idx: usize) -> Result<()> {
        let phys = self.head + idx;
        if phys >= self.pivot {
            return Err(Error::NoField);
        }
        if self.descriptor_at(phys).is_dead() {
            return Err(Error::NoField);
        }
        self.kill(phys);
        reclaim_boundary(self);
        Ok(())
    }

    /// Erases every live field matching `column`/`filter`. Returns the
    /// number of fields erased.
    pub fn erase_by_column(&mut self, column: u16, filter: crate::tag::TypeFilter) -> usize {
        let mut n = 0;
        for phys in self.descriptor_indices() {
            let d = self.descriptor_at(phys);
            if !d.is_dead() && d.tag().matches(column, filter) {
                self.kill(phys);
                n += 1;
            }
        }
        if n > 0 {
            reclaim_boundary(self);
        }
        n
    }
}

/// While the descriptor at `head` is dead, drop it from the descriptor range
/// outright; if its payload (if any) directly abuts `tail`, reclaim that too.
/// This only ever looks at the single slot at `head` — interior dead slots
/// wait for an explicit [`RwTuple::shrink`].
fn reclaim_boundary(rw: &mut RwTuple<'_>) {
    while rw.head < rw.pivot {
        let d = rw.descriptor_at(rw.head);
        if !d.is_dead() {
            break;
        }
        if let Some(ty) = d.tag().ty() {
            if !ty.is_inline() && !d.is_null() {
                let units = field_units(rw, d, ty);
                let field_end = d.offset() as usize + units;
                if field_end + rw.pivot == rw.tail {
                    rw.tail -= units;
                    rw.junk -= units;
                }
            }
        }
        rw.junk -= 1;
        rw.head += 1;
    }
}

/// Compacts a tuple with junk: drops dead descriptor slots and slides live
/// payload down to close the gaps they left, in oldest-appended-first order.
/// Refuses (rather than mis-compacting) if payload offsets are not already
/// monotonic in that order — a layout this crate's own append path never
/// produces, but a corrupt or foreign buffer might.
pub(crate) fn shrink_impl(rw: &mut RwTuple<'_>) -> Result<bool> {
    if rw.junk == 0 {
        return Ok(false);
    }
    // Newest-first (head..pivot) scan order; reverse to oldest-first so
    // offsets should come out non-decreasing.
    let mut live: Vec<Descriptor> = rw
        .descriptor_indices()
        .map(|i| rw.descriptor_at(i))
        .filter(|d| !d.is_dead())
        .collect();
    live.reverse();

    let mut last_offset = 0u16;
    for d in &live {
        if let Some(ty) = d.tag().ty() {
            if !ty.is_inline() && !d.is_null() {
                if d.offset() < last_offset {
                    return Err(Error::Invalid);
                }
                last_offset = d.offset();
            }
        } else {
            return Err(Error::Invalid);
        }
    }

    let mut write_offset = 0usize;
    let mut new_descs = Vec::with_capacity(live.len());
    for d in &live {
        let ty = d.tag().ty().ok_or(Error::Invalid)?;
        if ty.is_inline() || d.is_null() {
            new_descs.push(*d);
            continue;
        }
        let units = field_units(rw, *d, ty);
        let bytes_len = units * UNIT_SIZE;
        let src_start = (rw.pivot + d.offset() as usize) * UNIT_SIZE;
        let dst_start = (rw.pivot + write_offset) * UNIT_SIZE;
        if src_start != dst_start {
            rw.buf.copy_within(src_start..src_start + bytes_len, dst_start);
        }
        new_descs.push(Descriptor::new(d.tag(), write_offset as u16));
        write_offset += units;
    }

    let mut phys = rw.pivot;
    for d in new_descs.iter().rev() {
        phys -= 1;
        rw.set_descriptor_at(phys, *d);
    }
    rw.head = phys;
    rw.tail = rw.pivot + write_offset;
    rw.junk = 0;
    Ok(true)
}
