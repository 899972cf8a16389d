//! Iteration and lookup over a tuple's descriptors, forward-only and
//! allocation-free.

use crate::buffer::RwTuple;
use crate::descriptor::Descriptor;
use crate::readonly::RoTuple;
use crate::tag::{Tag, TypeFilter};

/// A source of descriptors addressable by a 0-based logical index, common to
/// both the mutable and read-only forms.
pub trait FieldSource {
    fn field_count(&self) -> usize;
    fn field_at(&self, index: usize) -> Descriptor;
}

impl FieldSource for RoTuple<'_> {
    fn field_count(&self) -> usize {
        self.item_count() as usize
    }

    fn field_at(&self, index: usize) -> Descriptor {
        self.descriptor(index).expect("index within field_count")
    }
}

impl FieldSource for RwTuple<'_> {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn field_at(&self, index: usize) -> Descriptor {
        self.descriptor_at(self.head + index)
    }
}

/// First live field matching `column`/`filter`, scanning from the start.
#[must_use]
pub fn first<T: FieldSource + ?Sized>(src: &T, column: u16, filter: TypeFilter) -> Option<usize> {
    next_from(src, 0, column, filter)
}

/// Next live field matching `column`/`filter`, strictly after `from`.
#[must_use]
pub fn next<T: FieldSource + ?Sized>(
    src: &T,
    from: usize,
    column: u16,
    filter: TypeFilter,
) -> Option<usize> {
    next_from(src, from + 1, column, filter)
}

fn next_from<T: FieldSource + ?Sized>(
    src: &T,
    start: usize,
    column: u16,
    filter: TypeFilter,
) -> Option<usize> {
    (start..src.field_count()).find(|&i| {
        let d = src.field_at(i);
        !d.is_dead() && d.tag().matches(column, filter)
    })
}

/// First live field for which `pred` returns `true`.
#[must_use]
pub fn first_ex<T, P>(src: &T, pred: P) -> Option<usize>
where
    T: FieldSource + ?Sized,
    P: Fn(Descriptor) -> bool,
{
    next_ex_from(src, 0, pred)
}

/// Next live field for which `pred` returns `true`, strictly after `from`.
#[must_use]
pub fn next_ex<T, P>(src: &T, from: usize, pred: P) -> Option<usize>
where
    T: FieldSource + ?Sized,
    P: Fn(Descriptor) -> bool,
{
    next_ex_from(src, from + 1, pred)
}

fn next_ex_from<T, P>(src: &T, start: usize, pred: P) -> Option<usize>
where
    T: FieldSource + ?Sized,
    P: Fn(Descriptor) -> bool,
{
    (start..src.field_count()).find(|&i| {
        let d = src.field_at(i);
        !d.is_dead() && pred(d)
    })
}

/// Count of live fields matching `column`/`filter`.
#[must_use]
pub fn count<T: FieldSource + ?Sized>(src: &T, column: u16, filter: TypeFilter) -> usize {
    (0..src.field_count())
        .filter(|&i| {
            let d = src.field_at(i);
            !d.is_dead() && d.tag().matches(column, filter)
        })
        .count()
}

/// Exact-tag lookup (type and column both fixed), used internally by
/// update/upsert to find the field they should act on.
#[must_use]
pub fn lookup_ct<T: FieldSource + ?Sized>(src: &T, tag: Tag) -> Option<usize> {
    (0..src.field_count()).find(|&i| src.field_at(i).tag() == tag)
}

/// True if live fields appear in non-increasing tag order (the
/// precondition for the comparator's ordered fast path). Compares the full
/// tag, not just the column, so that same-column fields of different types
/// are never treated as adjacent/interchangeable.
#[must_use]
pub fn is_ordered<T: FieldSource + ?Sized>(src: &T) -> bool {
    let mut prev: Option<u16> = None;
    for i in 0..src.field_count() {
        let d = src.field_at(i);
        if d.is_dead() {
            continue;
        }
        if let Some(p) = prev {
            if d.tag().0 > p {
                return false;
            }
        }
        prev = Some(d.tag().0);
    }
    true
}

/// Forward iterator over live fields matching `column`/`filter`.
pub struct Fields<'a, T: FieldSource> {
    src: &'a T,
    column: u16,
    filter: TypeFilter,
    pos: Option<usize>,
    started: bool,
}

impl<'a, T: FieldSource> Fields<'a, T> {
    #[must_use]
    pub fn new(src: &'a T, column: u16, filter: TypeFilter) -> Self {
        Fields {
            src,
            column,
            filter,
            pos: None,
            started: false,
        }
    }
}

impl<T: FieldSource> Iterator for Fields<'_, T> {
    type Item = Descriptor;

    fn next(&mut self) -> Option<Descriptor> {
        let found = if self.started {
            next(self.src, self.pos.unwrap(), self.column, self.filter)
        } else {
            self.started = true;
            first(self.src, self.column, self.filter)
        };
        self.pos = found;
        found.map(|i| self.src.field_at(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{required_space, RwTuple};
    use crate::tag::Type;

    #[test]
    fn iterates_matching_fields_only() {
        let mut raw = vec![0u8; required_space(4, 64)];
        let mut rw = RwTuple::init(&mut raw, 4).unwrap();
        rw.append_inline(Tag::pack(1, Type::Uint16), 1).unwrap();
        rw.append_inline(Tag::pack(2, Type::Uint16), 2).unwrap();
        rw.append_inline(Tag::pack(1, Type::Uint16), 3).unwrap();
        let hits: Vec<_> = Fields::new(&rw, 1, TypeFilter::exact(Type::Uint16))
            .map(|d| d.inline_value())
            .collect();
        assert_eq!(hits, vec![3, 1]);
    }

    #[test]
    fn ordered_detection() {
        let mut raw = vec![0u8; required_space(4, 64)];
        let mut rw = RwTuple::init(&mut raw, 4).unwrap();
        rw.append_inline(Tag::pack(5, Type::Uint16), 0).unwrap();
        rw.append_inline(Tag::pack(3, Type::Uint16), 0).unwrap();
        assert!(is_ordered(&rw));
        rw.append_inline(Tag::pack(9, Type::Uint16), 0).unwrap();
        assert!(!is_ordered(&rw));
    }
}
