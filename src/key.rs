//! Canonical, order-preserving key encoding: turns typed field values into
//! byte strings whose natural (unsigned, left-to-right) ordering matches the
//! values' own ordering, for use as external-store index keys.

use xxhash_rust::xxh3::xxh3_64;

use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::readonly::RoTuple;
use crate::tag::{Type, TypeFilter};

/// Default truncation point for variable-length fields and composite keys,
/// matching the reference implementation's key-length ceiling.
pub const DEFAULT_MAX_KEY_LEN: usize = 56;

const HASH_TAIL_LEN: usize = 8;

const DENIL_F32: u32 = 0xFFFF_FFFF;
const DENIL_F64: u64 = 0xFFFF_FFFF_FFFF_FFFF;

#[must_use]
pub fn encode_u16(v: u16) -> [u8; 2] {
    v.to_be_bytes()
}

#[must_use]
pub fn encode_u32(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

#[must_use]
pub fn encode_u64(v: u64) -> [u8; 8] {
    v.to_be_bytes()
}

#[must_use]
pub fn encode_i32(v: i32) -> [u8; 4] {
    ((v as u32) ^ 0x8000_0000).to_be_bytes()
}

#[must_use]
pub fn encode_i64(v: i64) -> [u8; 8] {
    ((v as u64) ^ 0x8000_0000_0000_0000).to_be_bytes()
}

/// IEEE-754 monotonic bit transform: flip the sign bit for non-negatives,
/// flip every bit for negatives, so the resulting unsigned integer orders
/// the same as the original float. NaN maps to a single designated-NIL
/// pattern rather than the incoherent ordering raw NaN bits would produce.
#[must_use]
pub fn encode_f32(v: f32) -> [u8; 4] {
    if v.is_nan() {
        return DENIL_F32.to_be_bytes();
    }
    let bits = v.to_bits();
    let mut t = if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000
    };
    if t == DENIL_F32 {
        t -= 1;
    }
    t.to_be_bytes()
}

#[must_use]
pub fn encode_f64(v: f64) -> [u8; 8] {
    if v.is_nan() {
        return DENIL_F64.to_be_bytes();
    }
    let bits = v.to_bits();
    let mut t = if bits & 0x8000_0000_0000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000_0000_0000
    };
    if t == DENIL_F64 {
        t -= 1;
    }
    t.to_be_bytes()
}

/// Truncates `bytes` to `max_len`, replacing the tail past `max_len -
/// HASH_TAIL_LEN` with a 64-bit hash of the *whole* input so unequal values
/// sharing a long common prefix still usually land in different buckets.
#[must_use]
pub fn truncate_with_hash(bytes: &[u8], max_len: usize) -> Vec<u8> {
    if bytes.len() <= max_len || max_len <= HASH_TAIL_LEN {
        return bytes[..bytes.len().min(max_len)].to_vec();
    }
    let prefix_len = max_len - HASH_TAIL_LEN;
    let mut out = Vec::with_capacity(max_len);
    out.extend_from_slice(&bytes[..prefix_len]);
    out.extend_from_slice(&xxh3_64(bytes).to_be_bytes());
    out
}

/// Composes one or more tuple fields into a single canonical key, in
/// declared column order.
pub struct KeyBuilder {
    reversed: bool,
    max_key_len: usize,
}

impl KeyBuilder {
    #[must_use]
    pub fn new(reversed: bool) -> Self {
        KeyBuilder {
            reversed,
            max_key_len: DEFAULT_MAX_KEY_LEN,
        }
    }

    #[must_use]
    pub fn with_max_len(reversed: bool, max_key_len: usize) -> Self {
        KeyBuilder {
            reversed,
            max_key_len,
        }
    }

    /// Encodes `columns` (in the given order) from `ro` into one key.
    /// A column absent from the tuple is an error; a column present but
    /// `null` is encoded as the type's NIL representation (all-zero bytes),
    /// sorting before any real value of that type.
    pub fn compose(&self, ro: &RoTuple<'_>, columns: &[(u16, Type)]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for &(column, ty) in columns {
            let desc = ro
                .lookup(column, TypeFilter::exact(ty))
                .ok_or(Error::ColumnMissing)?;
            self.encode_field(&mut out, ro, desc, ty)?;
        }
        if out.len() > self.max_key_len {
            out = truncate_with_hash(&out, self.max_key_len);
        }
        Ok(out)
    }

    fn encode_field(
        &self,
        out: &mut Vec<u8>,
        ro: &RoTuple<'_>,
        desc: Descriptor,
        ty: Type,
    ) -> Result<()> {
        if !ty.is_inline() && desc.is_null() {
            let width = ty.fixed_bytes().unwrap_or(0).max(1);
            out.extend(std::iter::repeat_n(0u8, width));
            return Ok(());
        }
        match ty {
            Type::Null => {}
            Type::Uint16 => out.extend_from_slice(&encode_u16(desc.inline_value())),
            Type::Int32 | Type::Uint32 | Type::Float32 | Type::Int64 | Type::Uint64
            | Type::Float64 | Type::DateTime => {
                let bytes = ro
                    .field_bytes(desc.offset(), ty.fixed_bytes().unwrap())
                    .ok_or(Error::Invalid)?;
                match ty {
                    Type::Int32 => out.extend_from_slice(&encode_i32(i32::from_le_bytes(
                        bytes.try_into().unwrap(),
                    ))),
                    Type::Uint32 => out.extend_from_slice(&encode_u32(u32::from_le_bytes(
                        bytes.try_into().unwrap(),
                    ))),
                    Type::Float32 => out.extend_from_slice(&encode_f32(f32::from_le_bytes(
                        bytes.try_into().unwrap(),
                    ))),
                    Type::Int64 => out.extend_from_slice(&encode_i64(i64::from_le_bytes(
                        bytes.try_into().unwrap(),
                    ))),
                    Type::Uint64 | Type::DateTime => out.extend_from_slice(&encode_u64(
                        u64::from_le_bytes(bytes.try_into().unwrap()),
                    )),
                    Type::Float64 => out.extend_from_slice(&encode_f64(f64::from_le_bytes(
                        bytes.try_into().unwrap(),
                    ))),
                    _ => unreachable!(),
                }
            }
            Type::Fixed96 | Type::Fixed128 | Type::Fixed160 | Type::Fixed256 => {
                let bytes = ro
                    .field_bytes(desc.offset(), ty.fixed_bytes().unwrap())
                    .ok_or(Error::Invalid)?;
                out.extend_from_slice(bytes);
            }
            Type::CStr | Type::Opaque => {
                let data = self.field_source_bytes(ro, desc, ty)?;
                if self.reversed {
                    let mut rev = data.to_vec();
                    rev.reverse();
                    out.extend_from_slice(&truncate_with_hash(&rev, self.max_key_len));
                } else {
                    out.extend_from_slice(data);
                }
            }
            Type::Nested => return Err(Error::TypeMismatch),
        }
        Ok(())
    }

    fn field_source_bytes<'a>(
        &self,
        ro: &RoTuple<'a>,
        desc: Descriptor,
        ty: Type,
    ) -> Result<&'a [u8]> {
        let available = ro
            .payload_len()
            .saturating_sub(desc.offset() as usize * crate::tag::UNIT_SIZE);
        match ty {
            Type::CStr => {
                let data = ro.field_bytes(desc.offset(), available).ok_or(Error::Invalid)?;
                let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                Ok(&data[..len])
            }
            Type::Opaque => {
                let subheader = ro.field_bytes(desc.offset(), 8).ok_or(Error::Invalid)?;
                let opaque_len = u32::from_le_bytes(subheader[4..8].try_into().unwrap()) as usize;
                let bytes = ro
                    .field_bytes(desc.offset(), 8 + opaque_len)
                    .ok_or(Error::Invalid)?;
                Ok(&bytes[8..])
            }
            _ => unreachable!(),
        }
    }
}

/// Composes a forward (non-reversed) canonical key from `columns`.
pub fn compose_key(ro: &RoTuple<'_>, columns: &[(u16, Type)]) -> Result<Vec<u8>> {
    KeyBuilder::new(false).compose(ro, columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_transform_preserves_order() {
        let mut values = [-100i32, -1, 0, 1, 100, i32::MIN, i32::MAX];
        values.sort_unstable();
        let mut encoded: Vec<[u8; 4]> = values.iter().map(|&v| encode_i32(v)).collect();
        let mut sorted_encoded = encoded.clone();
        sorted_encoded.sort_unstable();
        encoded.sort_unstable();
        assert_eq!(encoded, sorted_encoded);
        for w in values.windows(2) {
            let a = encode_i32(w[0]);
            let b = encode_i32(w[1]);
            assert!(a <= b);
        }
    }

    #[test]
    fn float_transform_preserves_order() {
        let values = [-1.0f32, -0.5, -0.0, 0.0, 0.5, 1.0, f32::MAX, -f32::MAX];
        let mut sorted = values;
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for w in sorted.windows(2) {
            assert!(encode_f32(w[0]) <= encode_f32(w[1]));
        }
    }

    #[test]
    fn nan_maps_to_designated_sentinel() {
        assert_eq!(encode_f32(f32::NAN), DENIL_F32.to_be_bytes());
        assert_eq!(encode_f32(-f32::NAN), DENIL_F32.to_be_bytes());
    }

    #[test]
    fn long_opaque_gets_hash_tail() {
        let long = vec![0x41u8; 200];
        let truncated = truncate_with_hash(&long, DEFAULT_MAX_KEY_LEN);
        assert_eq!(truncated.len(), DEFAULT_MAX_KEY_LEN);
        assert_eq!(&truncated[..DEFAULT_MAX_KEY_LEN - 8], &long[..DEFAULT_MAX_KEY_LEN - 8]);
    }

    #[test]
    fn short_value_passes_through() {
        let short = b"hello".to_vec();
        assert_eq!(truncate_with_hash(&short, DEFAULT_MAX_KEY_LEN), short);
    }
}
