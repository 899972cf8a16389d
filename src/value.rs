//! A typed value view bridging the untyped descriptor/payload machinery and
//! the crate's public typed getters.

use crate::error::{Error, Result};
use crate::readonly::RoTuple;
use crate::tag::{Type, TypeFilter, UNIT_SIZE};
use crate::time::Time;

/// One decoded field value. Variable-length variants borrow from the
/// tuple's own buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Null,
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Float32(f32),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    DateTime(Time),
    Fixed96(&'a [u8; 12]),
    Fixed128(&'a [u8; 16]),
    Fixed160(&'a [u8; 20]),
    Fixed256(&'a [u8; 32]),
    CStr(&'a str),
    Opaque(&'a [u8]),
    Nested(RoTuple<'a>),
}

fn fixed_array<'a, const N: usize>(bytes: &'a [u8]) -> &'a [u8; N] {
    <&[u8; N]>::try_from(bytes).expect("length checked by caller")
}

impl<'a> Value<'a> {
    /// Decodes the first live field matching `column`/type from `ro`.
    pub fn get(ro: &RoTuple<'a>, column: u16, ty: Type) -> Result<Self> {
        let desc = ro
            .lookup(column, TypeFilter::exact(ty))
            .ok_or(Error::NoField)?;
        if !ty.is_inline() && desc.is_null() {
            return Ok(Value::Null);
        }
        Ok(match ty {
            Type::Null => Value::Null,
            Type::Uint16 => Value::Uint16(desc.inline_value()),
            Type::Int32 => Value::Int32(i32::from_le_bytes(
                ro.field_bytes(desc.offset(), 4).ok_or(Error::Invalid)?.try_into().unwrap(),
            )),
            Type::Uint32 => Value::Uint32(u32::from_le_bytes(
                ro.field_bytes(desc.offset(), 4).ok_or(Error::Invalid)?.try_into().unwrap(),
            )),
            Type::Float32 => Value::Float32(f32::from_le_bytes(
                ro.field_bytes(desc.offset(), 4).ok_or(Error::Invalid)?.try_into().unwrap(),
            )),
            Type::Int64 => Value::Int64(i64::from_le_bytes(
                ro.field_bytes(desc.offset(), 8).ok_or(Error::Invalid)?.try_into().unwrap(),
            )),
            Type::Uint64 => Value::Uint64(u64::from_le_bytes(
                ro.field_bytes(desc.offset(), 8).ok_or(Error::Invalid)?.try_into().unwrap(),
            )),
            Type::Float64 => Value::Float64(f64::from_le_bytes(
                ro.field_bytes(desc.offset(), 8).ok_or(Error::Invalid)?.try_into().unwrap(),
            )),
            Type::DateTime => Value::DateTime(Time::from_fixedpoint(u64::from_le_bytes(
                ro.field_bytes(desc.offset(), 8).ok_or(Error::Invalid)?.try_into().unwrap(),
            ))),
            Type::Fixed96 => {
                Value::Fixed96(fixed_array(ro.field_bytes(desc.offset(), 12).ok_or(Error::Invalid)?))
            }
            Type::Fixed128 => {
                Value::Fixed128(fixed_array(ro.field_bytes(desc.offset(), 16).ok_or(Error::Invalid)?))
            }
            Type::Fixed160 => {
                Value::Fixed160(fixed_array(ro.field_bytes(desc.offset(), 20).ok_or(Error::Invalid)?))
            }
            Type::Fixed256 => {
                Value::Fixed256(fixed_array(ro.field_bytes(desc.offset(), 32).ok_or(Error::Invalid)?))
            }
            Type::CStr => {
                let available = ro.payload_len().saturating_sub(desc.offset() as usize * UNIT_SIZE);
                let bytes = ro.field_bytes(desc.offset(), available).ok_or(Error::Invalid)?;
                let len = bytes.iter().position(|&b| b == 0).ok_or(Error::Invalid)?;
                Value::CStr(std::str::from_utf8(&bytes[..len]).map_err(|_| Error::Invalid)?)
            }
            Type::Opaque => {
                let head = ro.field_bytes(desc.offset(), 4).ok_or(Error::Invalid)?;
                let brutto = u32::from_le_bytes(head.try_into().unwrap()) as usize;
                let bytes = ro
                    .field_bytes(desc.offset(), 4 + brutto * UNIT_SIZE)
                    .ok_or(Error::Invalid)?;
                let opaque_len = u32::from_le_bytes(bytes[4..8].try_into().unwrap_or_default()) as usize;
                Value::Opaque(bytes.get(8..8 + opaque_len).unwrap_or(&bytes[4..]))
            }
            Type::Nested => {
                let head = ro.field_bytes(desc.offset(), 4).ok_or(Error::Invalid)?;
                let brutto = u32::from_le_bytes(head.try_into().unwrap()) as usize;
                let bytes = ro
                    .field_bytes(desc.offset(), (1 + brutto) * UNIT_SIZE)
                    .ok_or(Error::Invalid)?;
                Value::Nested(RoTuple::new(&bytes[UNIT_SIZE..]))
            }
        })
    }

    /// Like [`Value::get`], but returns a fixed sentinel ("designated NIL")
    /// instead of an error when the column is absent or holds a different
    /// type — ported from the original implementation's typed-getter
    /// convention of always returning *something* usable rather than
    /// forcing every call site to handle `Err`.
    #[must_use]
    pub fn get_or_denil(ro: &RoTuple<'a>, column: u16, ty: Type) -> Self {
        Self::get(ro, column, ty).unwrap_or(Self::denil(ty))
    }

    #[must_use]
    pub fn denil(ty: Type) -> Self {
        match ty {
            Type::Uint16 => Value::Uint16(0xFFFF),
            Type::Int32 => Value::Int32(i32::MIN),
            Type::Uint32 => Value::Uint32(u32::MAX),
            Type::Float32 => Value::Float32(f32::NAN),
            Type::Int64 => Value::Int64(i64::MIN),
            Type::Uint64 => Value::Uint64(u64::MAX),
            Type::Float64 => Value::Float64(f64::NAN),
            Type::DateTime => Value::DateTime(Time {
                utc: u32::MAX,
                fractional: u32::MAX,
            }),
            _ => Value::Null,
        }
    }
}
