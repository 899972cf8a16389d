//! The record comparator: a five-valued result plus the three-path
//! dispatch (identity / pre-ordered / tag-union) used to reach it.

use std::collections::BTreeMap;

use crate::descriptor::Descriptor;
use crate::iter::{is_ordered, FieldSource};
use crate::readonly::RoTuple;
use crate::sort;
use crate::tag::{Type, UNIT_SIZE};

/// A five-valued comparison result. Two tuples may be `Incomparable` — e.g.
/// a shared column holds different types on each side, or either side holds
/// a NaN float — rather than forced into a three-way ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering5 {
    Less,
    Equal,
    Greater,
    Incomparable,
}

impl Ordering5 {
    /// `left != right`, true for `Less`, `Greater`, and `Incomparable` alike.
    #[must_use]
    pub fn is_not_equal(self) -> bool {
        !matches!(self, Ordering5::Equal)
    }
}

/// Compares two raw byte strings as plain byte sequences; never
/// `Incomparable` since there is no type information to disagree about.
#[must_use]
pub fn compare_binary(a: &[u8], b: &[u8]) -> Ordering5 {
    match a.cmp(b) {
        std::cmp::Ordering::Less => Ordering5::Less,
        std::cmp::Ordering::Equal => Ordering5::Equal,
        std::cmp::Ordering::Greater => Ordering5::Greater,
    }
}

#[must_use]
pub fn compare_fixed_blob(a: &[u8], b: &[u8]) -> Ordering5 {
    compare_binary(a, b)
}

fn cmp_num<N: PartialOrd>(a: N, b: N) -> Ordering5 {
    match a.partial_cmp(&b) {
        Some(std::cmp::Ordering::Less) => Ordering5::Less,
        Some(std::cmp::Ordering::Equal) => Ordering5::Equal,
        Some(std::cmp::Ordering::Greater) => Ordering5::Greater,
        None => Ordering5::Incomparable,
    }
}

/// Compares two same-typed field payloads. `a`/`b` are the exact value
/// bytes (for `CStr`, the bytes before the terminator; for `Opaque`, the
/// bytes after the length prefix).
#[must_use]
pub fn compare_fields_same_type(ty: Type, a: &[u8], b: &[u8]) -> Ordering5 {
    match ty {
        Type::Null => Ordering5::Equal,
        Type::Uint16 => cmp_num(
            u16::from_le_bytes(a.try_into().unwrap()),
            u16::from_le_bytes(b.try_into().unwrap()),
        ),
        Type::Int32 => cmp_num(
            i32::from_le_bytes(a.try_into().unwrap()),
            i32::from_le_bytes(b.try_into().unwrap()),
        ),
        Type::Uint32 => cmp_num(
            u32::from_le_bytes(a.try_into().unwrap()),
            u32::from_le_bytes(b.try_into().unwrap()),
        ),
        Type::Float32 => cmp_num(
            f32::from_le_bytes(a.try_into().unwrap()),
            f32::from_le_bytes(b.try_into().unwrap()),
        ),
        Type::Int64 => cmp_num(
            i64::from_le_bytes(a.try_into().unwrap()),
            i64::from_le_bytes(b.try_into().unwrap()),
        ),
        Type::Uint64 => cmp_num(
            u64::from_le_bytes(a.try_into().unwrap()),
            u64::from_le_bytes(b.try_into().unwrap()),
        ),
        Type::Float64 => cmp_num(
            f64::from_le_bytes(a.try_into().unwrap()),
            f64::from_le_bytes(b.try_into().unwrap()),
        ),
        Type::DateTime => cmp_num(
            u64::from_le_bytes(a.try_into().unwrap()),
            u64::from_le_bytes(b.try_into().unwrap()),
        ),
        Type::Fixed96 | Type::Fixed128 | Type::Fixed160 | Type::Fixed256 | Type::Opaque => {
            compare_binary(a, b)
        }
        Type::CStr => compare_binary(a, b),
        Type::Nested => compare_tuples(&RoTuple::new(a), &RoTuple::new(b)),
    }
}

/// Slices out a field's logical value bytes (excluding any length/NUL
/// framing) from a tuple's payload.
fn field_value_bytes<'a>(ro: &RoTuple<'a>, desc: Descriptor, ty: Type) -> Option<&'a [u8]> {
    if ty.is_inline() {
        return None;
    }
    match ty.fixed_units() {
        Some(units) => ro.field_bytes(desc.offset(), units * UNIT_SIZE),
        None => {
            let available = ro.payload_len().saturating_sub(desc.offset() as usize * UNIT_SIZE);
            match ty {
                Type::CStr => {
                    let data = ro.field_bytes(desc.offset(), available)?;
                    let len = data.iter().position(|&b| b == 0)?;
                    Some(&data[..len])
                }
                Type::Opaque => {
                    let subheader = ro.field_bytes(desc.offset(), 2 * UNIT_SIZE)?;
                    let opaque_len =
                        u32::from_le_bytes(subheader[UNIT_SIZE..].try_into().unwrap()) as usize;
                    ro.field_bytes(desc.offset(), 2 * UNIT_SIZE + opaque_len)
                        .map(|b| &b[2 * UNIT_SIZE..])
                }
                Type::Nested => {
                    let head = ro.field_bytes(desc.offset(), UNIT_SIZE)?;
                    let brutto = u32::from_le_bytes(head.try_into().unwrap()) as usize;
                    ro.field_bytes(desc.offset(), (1 + brutto) * UNIT_SIZE)
                        .map(|b| &b[UNIT_SIZE..])
                }
                _ => unreachable!(),
            }
        }
    }
}

fn compare_one(
    a: &RoTuple<'_>,
    a_desc: Option<Descriptor>,
    b: &RoTuple<'_>,
    b_desc: Option<Descriptor>,
) -> Ordering5 {
    match (a_desc, b_desc) {
        (None, None) => Ordering5::Equal,
        (Some(_), None) => Ordering5::Greater, // present beats absent
        (None, Some(_)) => Ordering5::Less,
        (Some(da), Some(db)) => {
            let (Some(ta), Some(tb)) = (da.tag().ty(), db.tag().ty()) else {
                return Ordering5::Incomparable;
            };
            if ta != tb {
                return Ordering5::Incomparable;
            }
            if !ta.is_inline() && (da.is_null() || db.is_null()) {
                return if da.is_null() && db.is_null() {
                    Ordering5::Equal
                } else if da.is_null() {
                    Ordering5::Less
                } else {
                    Ordering5::Greater
                };
            }
            if ta.is_inline() {
                return cmp_num(da.inline_value(), db.inline_value());
            }
            match (
                field_value_bytes(a, da, ta),
                field_value_bytes(b, db, tb),
            ) {
                (Some(ab), Some(bb)) => compare_fields_same_type(ta, ab, bb),
                _ => Ordering5::Incomparable,
            }
        }
    }
}

fn group_by_tag(ro: &RoTuple<'_>) -> BTreeMap<u16, Vec<Descriptor>> {
    let mut map: BTreeMap<u16, Vec<Descriptor>> = BTreeMap::new();
    for desc in ro.descriptors() {
        if desc.is_dead() {
            continue;
        }
        map.entry(desc.tag().0).or_default().push(desc);
    }
    map
}

/// Tag-union slow path: groups each side's live fields by full tag (column
/// *and* type, so same-column fields of different types are never folded
/// together, preserving within-tag physical order so collections pair up
/// instance-for-instance rather than being collapsed), then walks tags from
/// highest to lowest. The tag union itself comes from the adaptive sorter in
/// [`crate::sort`], reused here rather than re-derived.
fn compare_slow(a: &RoTuple<'_>, b: &RoTuple<'_>) -> Ordering5 {
    let am = group_by_tag(a);
    let bm = group_by_tag(b);
    let mut tags: Vec<u16> = sort::sorted_tags(a)
        .into_iter()
        .chain(sort::sorted_tags(b))
        .collect();
    tags.sort_unstable_by(|x, y| y.cmp(x));
    tags.dedup();
    for tag in tags {
        let av = am.get(&tag).map_or(&[][..], Vec::as_slice);
        let bv = bm.get(&tag).map_or(&[][..], Vec::as_slice);
        let n = av.len().max(bv.len());
        for i in 0..n {
            let r = compare_one(a, av.get(i).copied(), b, bv.get(i).copied());
            if r.is_not_equal() {
                return r;
            }
        }
    }
    Ordering5::Equal
}

/// Pre-ordered fast path: both sides already scan in non-increasing full-tag
/// order, so a single simultaneous walk suffices, no grouping needed. Tags
/// are compared whole (column and type together), so same-column fields of
/// different types are never treated as a match.
fn compare_ordered(a: &RoTuple<'_>, b: &RoTuple<'_>) -> Ordering5 {
    let mut ia = 0usize;
    let mut ib = 0usize;
    let live = |ro: &RoTuple<'_>, i: &mut usize| -> Option<Descriptor> {
        while *i < ro.field_count() {
            let d = ro.field_at(*i);
            *i += 1;
            if !d.is_dead() {
                return Some(d);
            }
        }
        None
    };
    let mut cur_a = live(a, &mut ia);
    let mut cur_b = live(b, &mut ib);
    loop {
        match (cur_a, cur_b) {
            (None, None) => return Ordering5::Equal,
            (Some(da), None) => {
                let _ = da;
                return Ordering5::Greater;
            }
            (None, Some(_)) => return Ordering5::Less,
            (Some(da), Some(db)) => {
                let ta = da.tag().0;
                let tb = db.tag().0;
                if ta == tb {
                    let r = compare_one(a, Some(da), b, Some(db));
                    if r.is_not_equal() {
                        return r;
                    }
                    cur_a = live(a, &mut ia);
                    cur_b = live(b, &mut ib);
                } else if ta > tb {
                    return Ordering5::Greater;
                } else {
                    return Ordering5::Less;
                }
            }
        }
    }
}

/// Compares two fully-formed tuples field by field, highest column first.
/// Identical byte strings short-circuit to `Equal`; if both sides are
/// already in descending-column order the single-pass fast path runs,
/// otherwise fields are grouped by column and compared as a tag union.
#[must_use]
pub fn compare_tuples(a: &RoTuple<'_>, b: &RoTuple<'_>) -> Ordering5 {
    if a.as_bytes() == b.as_bytes() {
        return Ordering5::Equal;
    }
    if is_ordered(a) && is_ordered(b) {
        compare_ordered(a, b)
    } else {
        compare_slow(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{required_space, RwTuple};
    use crate::tag::Tag as T;

    fn tuple_with(cols: &[(u16, u16)]) -> Vec<u8> {
        let mut raw = vec![0u8; required_space(cols.len(), 64)];
        let mut rw = RwTuple::init(&mut raw, cols.len()).unwrap();
        for &(c, v) in cols {
            rw.append_inline(T::pack(c, Type::Uint16), v).unwrap();
        }
        let ro = rw.take_noshrink();
        ro.as_bytes().to_vec()
    }

    #[test]
    fn identity_fast_path() {
        let bytes = tuple_with(&[(1, 5), (2, 6)]);
        let a = RoTuple::new(&bytes);
        let b = RoTuple::new(&bytes);
        assert_eq!(compare_tuples(&a, &b), Ordering5::Equal);
    }

    #[test]
    fn ordered_fast_path_detects_difference() {
        // appended ascending -> physical scan descending -> ordered.
        let a_bytes = tuple_with(&[(1, 1), (2, 5)]);
        let b_bytes = tuple_with(&[(1, 1), (2, 9)]);
        let a = RoTuple::new(&a_bytes);
        let b = RoTuple::new(&b_bytes);
        assert_eq!(compare_tuples(&a, &b), Ordering5::Less);
    }

    #[test]
    fn missing_column_compares_absent_as_lesser() {
        let a_bytes = tuple_with(&[(1, 1)]);
        let b_bytes = tuple_with(&[(1, 1), (2, 9)]);
        let a = RoTuple::new(&a_bytes);
        let b = RoTuple::new(&b_bytes);
        assert_eq!(compare_tuples(&a, &b), Ordering5::Less);
    }

    #[test]
    fn nan_float_is_incomparable() {
        assert_eq!(
            cmp_num(f64::NAN, 1.0_f64),
            Ordering5::Incomparable
        );
    }
}
