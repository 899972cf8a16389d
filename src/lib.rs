//! A compact, self-describing binary record codec plus a five-valued
//! semantic comparator and a canonical, order-preserving key composer.
//!
//! `RwTuple` builds a record in place over a caller-supplied `&mut [u8]`, no
//! allocation, no ownership of the buffer. `RoTuple` is the read-only view
//! over the same wire form — a header word, a descriptor array, and a
//! payload blob, nothing else. [`compare::compare_tuples`] compares two
//! tuples field by field and may return [`compare::Ordering5::Incomparable`]
//! rather than force an arbitrary order; [`key::KeyBuilder`] turns a chosen
//! set of fields into a byte string whose natural ordering matches the
//! fields' own, for use as an external store's index key.
//!
//! This crate has no notion of a table, schema, transaction, or cursor — it
//! is the codec and comparator core meant to sit underneath one.

/// Column/type tags and the packed 16-bit tag word.
pub mod tag;
/// The 32-bit field descriptor.
pub mod descriptor;
/// The mutable, in-place tuple buffer.
pub mod buffer;
/// The read-only serialized form and its structural validator.
pub mod readonly;
/// Typed value accessors bridging descriptors to Rust values.
pub mod value;
/// Upsert/insert/update/erase and buffer compaction.
pub mod mutate;
/// Descriptor iteration and lookup.
pub mod iter;
/// The adaptive tag sorter used by the slow comparator path.
pub mod sort;
/// The five-valued record comparator.
pub mod compare;
/// Canonical, order-preserving key encoding.
pub mod key;
/// Plain two-valued comparators for an external store's index b-trees.
pub mod storeindex;
/// Fixed-point 32.32 time values.
pub mod time;
/// The crate's error type.
pub mod error;

pub use self::buffer::RwTuple;
pub use self::compare::{compare_tuples, Ordering5};
pub use self::descriptor::Descriptor;
pub use self::error::{Error, Result};
pub use self::key::{compose_key, KeyBuilder};
pub use self::readonly::{validate, RoTuple};
pub use self::storeindex::{forward_cmp, reverse_cmp, unordered_cmp, IndexKind, IndexSpec};
pub use self::tag::{Tag, Type, TypeFilter};
pub use self::time::Time;
pub use self::value::Value;
