//! Column/type tags and the packed 16-bit tag word.
//!
//! A tag packs a 5-bit [`Type`] code, one reserved bit, and a 10-bit column
//! number into a single `u16`. Column `1023` is reserved as the "dead"
//! sentinel used to mark erased descriptors without compacting them.

use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const TYPE_BITS: u32 = 5;
pub const RESERVED_BITS: u32 = 1;
pub const COLUMN_BITS: u32 = 10;
pub const COLUMN_SHIFT: u32 = TYPE_BITS + RESERVED_BITS;
pub const TYPE_MASK: u16 = (1 << TYPE_BITS) - 1;
/// Set in the 5-bit type field to mark "array of" the base type below it.
pub const ARRAY_FLAG: u8 = 1 << (TYPE_BITS - 1); // 0x10

pub const UNIT_SIZE: usize = 4;
pub const UNIT_SHIFT: u32 = 2;

/// Column value reserved for erased ("dead") descriptors.
pub const DEAD_COLUMN: u16 = (1 << COLUMN_BITS) - 1; // 1023
/// Highest column number a live field may carry.
pub const MAX_COLUMN: u16 = DEAD_COLUMN - 1; // 1022
/// Upper bound on live descriptors a tuple may hold.
pub const MAX_FIELDS: usize = 1023;

pub const LIMIT16: usize = u16::MAX as usize;
pub const MAX_TUPLE_BYTES: usize = LIMIT16 * UNIT_SIZE;
pub const MAX_FIELD_BYTES: usize = LIMIT16;
pub const MAX_OPAQUE_BYTES: usize = MAX_FIELD_BYTES - UNIT_SIZE;

/// Field type code, the low 5 bits of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Type {
    Null = 0,
    Uint16 = 1,
    Int32 = 2,
    Uint32 = 3,
    Float32 = 4,
    Int64 = 5,
    Uint64 = 6,
    Float64 = 7,
    DateTime = 8,
    Fixed96 = 9,
    Fixed128 = 10,
    Fixed160 = 11,
    Fixed256 = 12,
    CStr = 13,
    Opaque = 14,
    Nested = 15,
}

impl Type {
    /// Payload size in bytes for fixed-size types; `None` for variable-length ones.
    #[must_use]
    pub fn fixed_bytes(self) -> Option<usize> {
        Some(match self {
            Type::Null | Type::Uint16 => 0,
            Type::Int32 | Type::Uint32 | Type::Float32 => 4,
            Type::Int64 | Type::Uint64 | Type::Float64 | Type::DateTime => 8,
            Type::Fixed96 => 12,
            Type::Fixed128 => 16,
            Type::Fixed160 => 20,
            Type::Fixed256 => 32,
            Type::CStr | Type::Opaque | Type::Nested => return None,
        })
    }

    /// Payload size in whole 4-byte units, rounding up.
    #[must_use]
    pub fn fixed_units(self) -> Option<usize> {
        self.fixed_bytes().map(|b| b.div_ceil(UNIT_SIZE))
    }

    /// True for the descriptor-only and inline-`u16` types that never reach past
    /// the pivot into the payload area.
    #[must_use]
    pub fn is_inline(self) -> bool {
        matches!(self, Type::Null | Type::Uint16)
    }

    /// True for types whose payload size is fixed once the type is known
    /// (everything below [`Type::CStr`]).
    #[must_use]
    pub fn is_fixed(self) -> bool {
        (self as u8) < (Type::CStr as u8)
    }
}

/// A packed tag: type (5 bits) + reserved (1 bit) + column (10 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u16);

impl Tag {
    #[must_use]
    pub fn pack(column: u16, ty: Type) -> Self {
        debug_assert!(column <= DEAD_COLUMN);
        Tag((column << COLUMN_SHIFT) | u16::from(u8::from(ty)))
    }

    /// Packs a tag for an array-of-`ty` field: same column/type encoding,
    /// with [`ARRAY_FLAG`] set in the type field.
    #[must_use]
    pub fn pack_array(column: u16, ty: Type) -> Self {
        debug_assert!(column <= DEAD_COLUMN);
        Tag((column << COLUMN_SHIFT) | u16::from(u8::from(ty) | ARRAY_FLAG))
    }

    /// True if [`ARRAY_FLAG`] is set in this tag's type field.
    #[must_use]
    pub fn is_array(self) -> bool {
        (self.raw_type() & ARRAY_FLAG) != 0
    }

    /// The dead-descriptor sentinel tag; the original column is discarded.
    #[must_use]
    pub fn dead() -> Self {
        Tag(DEAD_COLUMN << COLUMN_SHIFT)
    }

    #[must_use]
    pub fn column(self) -> u16 {
        self.0 >> COLUMN_SHIFT
    }

    #[must_use]
    pub fn raw_type(self) -> u8 {
        (self.0 & TYPE_MASK) as u8
    }

    /// The base type, with any [`ARRAY_FLAG`] bit masked off first.
    #[must_use]
    pub fn ty(self) -> Option<Type> {
        Type::try_from(self.raw_type() & !ARRAY_FLAG).ok()
    }

    #[must_use]
    pub fn is_dead(self) -> bool {
        self.column() == DEAD_COLUMN
    }

    #[must_use]
    pub fn matches(self, column: u16, filter: TypeFilter) -> bool {
        if self.column() != column {
            return false;
        }
        filter.accepts(self.raw_type())
    }
}

/// Either an exact type or a bitmask of acceptable types, used by lookup and
/// iteration to select fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
    Exact(Type),
    Mask(u32),
}

impl TypeFilter {
    pub const ANY: TypeFilter = TypeFilter::Mask(u32::MAX);
    pub const ANY_INT: TypeFilter =
        TypeFilter::Mask((1 << Type::Int32 as u32) | (1 << Type::Int64 as u32));
    pub const ANY_UINT: TypeFilter = TypeFilter::Mask(
        (1 << Type::Uint16 as u32) | (1 << Type::Uint32 as u32) | (1 << Type::Uint64 as u32),
    );
    pub const ANY_FLOAT: TypeFilter =
        TypeFilter::Mask((1 << Type::Float32 as u32) | (1 << Type::Float64 as u32));

    #[must_use]
    pub fn exact(ty: Type) -> Self {
        TypeFilter::Exact(ty)
    }

    #[must_use]
    pub fn mask(bits: u32) -> Self {
        TypeFilter::Mask(bits)
    }

    #[must_use]
    pub fn accepts(self, raw_type: u8) -> bool {
        match self {
            TypeFilter::Exact(ty) => u8::from(ty) == raw_type,
            TypeFilter::Mask(bits) => bits & (1 << raw_type) != 0,
        }
    }
}
