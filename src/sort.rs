//! Deduplicated, descending-by-tag list used by the comparator's slow path
//! to build a tag union between two tuples. Sorts on the full 16-bit tag
//! (column and type together), matching `fptu_tags`: two live fields that
//! share a column but differ in type are distinct entries, never collapsed.

use crate::iter::FieldSource;

/// Naive reference implementation: collect every live tag, sort descending,
/// drop duplicates. Kept for cross-checking the adaptive path in tests, not
/// for production use.
#[must_use]
pub fn sorted_tags_naive<T: FieldSource + ?Sized>(src: &T) -> Vec<u16> {
    let mut tags: Vec<u16> = (0..src.field_count())
        .map(|i| src.field_at(i))
        .filter(|d| !d.is_dead())
        .map(|d| d.tag().0)
        .collect();
    tags.sort_unstable_by(|a, b| b.cmp(a));
    tags.dedup();
    tags
}

/// Adaptive variant: tuples are very often already in descending-tag order
/// (the common case for freshly-upserted or fetched data), so take a fast
/// pass assuming that and bail to a bitset-based slow path the moment an
/// out-of-order tag is seen.
#[must_use]
pub fn sorted_tags<T: FieldSource + ?Sized>(src: &T) -> Vec<u16> {
    let n = src.field_count();
    let mut out = Vec::with_capacity(n);
    let mut prev: Option<u16> = None;
    for i in 0..n {
        let d = src.field_at(i);
        if d.is_dead() {
            continue;
        }
        let tag = d.tag().0;
        match prev {
            Some(p) if tag > p => return slow_path(src, out, i),
            Some(p) if tag == p => continue, // duplicate tag, collapse
            _ => {}
        }
        out.push(tag);
        prev = Some(tag);
    }
    out
}

/// Bitset-based slow path: scan the remaining fields (plus everything the
/// fast pass already collected) to find the observed tag range, flip a bit
/// per distinct tag, then walk the bitset top-down. Sized to the observed
/// range rather than the full 16-bit tag space, so tuples with a handful of
/// widely spaced tags still sort in roughly `O(fields)`.
fn slow_path<T: FieldSource + ?Sized>(src: &T, mut prefix: Vec<u16>, resume_at: usize) -> Vec<u16> {
    let mut min_tag = prefix.iter().copied().min();
    let mut max_tag = prefix.iter().copied().max();
    let mut rest = Vec::new();
    for i in resume_at..src.field_count() {
        let d = src.field_at(i);
        if d.is_dead() {
            continue;
        }
        let tag = d.tag().0;
        min_tag = Some(min_tag.map_or(tag, |m| m.min(tag)));
        max_tag = Some(max_tag.map_or(tag, |m| m.max(tag)));
        rest.push(tag);
    }
    let (Some(min_tag), Some(max_tag)) = (min_tag, max_tag) else {
        return prefix;
    };
    let span = (max_tag - min_tag) as usize + 1;
    let mut bits = vec![0u64; span.div_ceil(64)];
    let mut set = |tag: u16| {
        let idx = (tag - min_tag) as usize;
        bits[idx / 64] |= 1 << (idx % 64);
    };
    for tag in prefix.drain(..) {
        set(tag);
    }
    for tag in rest {
        set(tag);
    }
    let mut out = Vec::new();
    for idx in (0..span).rev() {
        if bits[idx / 64] & (1 << (idx % 64)) != 0 {
            out.push(min_tag + idx as u16);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{required_space, RwTuple};
    use crate::tag::{Tag, Type};

    fn with_columns(cols: &[u16]) -> Vec<u16> {
        let mut raw = vec![0u8; required_space(cols.len(), 64)];
        let mut rw = RwTuple::init(&mut raw, cols.len()).unwrap();
        for &c in cols {
            rw.append_inline(Tag::pack(c, Type::Uint16), 0).unwrap();
        }
        let naive = sorted_tags_naive(&rw);
        let adaptive = sorted_tags(&rw);
        assert_eq!(adaptive, naive);
        adaptive
    }

    fn tags_for(cols: &[u16]) -> Vec<u16> {
        cols.iter().map(|&c| Tag::pack(c, Type::Uint16).0).collect()
    }

    #[test]
    fn adaptive_matches_naive_when_ordered() {
        // appended in increasing column order -> physical scan (most recent
        // first) is already descending, the fast path's assumed common case.
        assert_eq!(with_columns(&[2, 5, 5, 9]), tags_for(&[9, 5, 2]));
    }

    #[test]
    fn adaptive_matches_naive_when_unordered() {
        // appended in decreasing column order -> physical scan is ascending,
        // forcing the bitset slow path.
        assert_eq!(with_columns(&[9, 5, 5, 2]), tags_for(&[9, 5, 2]));
    }
}
