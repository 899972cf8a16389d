//! Key-space comparators handed to an external store: plain two-valued
//! `Ordering` over already-composed key bytes, one function per index kind.

use std::cmp::Ordering;

use crate::tag::Type;

/// How an index orders its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Forward,
    Reverse,
    Unordered,
}

/// Declares one index: its key columns, ordering kind, uniqueness, and key
/// length ceiling. Plain data handed to whatever store owns the actual
/// b-tree; this crate only composes keys and compares them.
pub struct IndexSpec<'a> {
    pub columns: &'a [(u16, Type)],
    pub kind: IndexKind,
    pub unique: bool,
    pub max_key_len: usize,
}

impl IndexSpec<'_> {
    #[must_use]
    pub fn comparator(&self) -> fn(&[u8], &[u8]) -> Ordering {
        match self.kind {
            IndexKind::Forward => forward_cmp,
            IndexKind::Reverse => reverse_cmp,
            IndexKind::Unordered => unordered_cmp,
        }
    }
}

/// Ordinary lexicographic byte-string order.
#[must_use]
pub fn forward_cmp(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Lexicographic order as if both byte strings were reversed, without
/// allocating a reversed copy.
#[must_use]
pub fn reverse_cmp(a: &[u8], b: &[u8]) -> Ordering {
    let mut ia = a.iter().rev();
    let mut ib = b.iter().rev();
    loop {
        match (ia.next(), ib.next()) {
            (Some(x), Some(y)) => match x.cmp(y) {
                Ordering::Equal => continue,
                ord => return ord,
            },
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// Hash-equality-only order: any two distinct byte strings compare
/// `Greater` (never `Equal`, never meaningfully ordered) except identical
/// ones, which compare `Equal`. Suited to indexes that only ever test
/// membership, never range-scan.
#[must_use]
pub fn unordered_cmp(a: &[u8], b: &[u8]) -> Ordering {
    if a == b {
        Ordering::Equal
    } else {
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_matches_reversed_copy() {
        let a = b"hello";
        let b = b"hellp";
        let mut ra = a.to_vec();
        ra.reverse();
        let mut rb = b.to_vec();
        rb.reverse();
        assert_eq!(reverse_cmp(a, b), ra.cmp(&rb));
    }

    #[test]
    fn unordered_equal_only_for_identical() {
        assert_eq!(unordered_cmp(b"abc", b"abc"), Ordering::Equal);
        assert_ne!(unordered_cmp(b"abc", b"abd"), Ordering::Equal);
    }
}
