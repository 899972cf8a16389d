//! S5: canonical keys order the same way the underlying values do, across
//! every field type the key composer supports.

use tupl::buffer::{required_space, RwTuple};
use tupl::{compose_key, KeyBuilder, Type};

fn key_for_u32(v: u32) -> Vec<u8> {
    let mut raw = vec![0u8; required_space(1, 32)];
    let mut rw = RwTuple::init(&mut raw, 1).unwrap();
    rw.upsert_uint32(1, v).unwrap();
    let ro = rw.take_noshrink();
    compose_key(&ro, &[(1, Type::Uint32)]).unwrap()
}

fn key_for_i32(v: i32) -> Vec<u8> {
    let mut raw = vec![0u8; required_space(1, 32)];
    let mut rw = RwTuple::init(&mut raw, 1).unwrap();
    rw.upsert_int32(1, v).unwrap();
    let ro = rw.take_noshrink();
    compose_key(&ro, &[(1, Type::Int32)]).unwrap()
}

fn key_for_str(v: &str) -> Vec<u8> {
    let mut raw = vec![0u8; required_space(1, 128)];
    let mut rw = RwTuple::init(&mut raw, 1).unwrap();
    rw.upsert_cstr(1, v).unwrap();
    let ro = rw.take_noshrink();
    compose_key(&ro, &[(1, Type::CStr)]).unwrap()
}

#[test]
fn u32_keys_order_like_u32_values() {
    let values = [0u32, 1, 1000, u32::MAX / 2, u32::MAX];
    for w in values.windows(2) {
        assert!(key_for_u32(w[0]) < key_for_u32(w[1]));
    }
}

#[test]
fn i32_keys_order_like_i32_values() {
    let values = [i32::MIN, -1000, -1, 0, 1, 1000, i32::MAX];
    for w in values.windows(2) {
        assert!(key_for_i32(w[0]) < key_for_i32(w[1]));
    }
}

#[test]
fn string_keys_order_lexicographically() {
    let values = ["aaa", "aab", "ab", "b"];
    for w in values.windows(2) {
        assert!(key_for_str(w[0]) < key_for_str(w[1]));
    }
}

#[test]
fn composite_key_orders_by_leading_column_first() {
    let mut raw_lo = vec![0u8; required_space(2, 64)];
    let mut lo = RwTuple::init(&mut raw_lo, 2).unwrap();
    lo.upsert_uint16(1, 1).unwrap();
    lo.upsert_uint32(2, 9999).unwrap();
    let lo_ro = lo.take_noshrink();

    let mut raw_hi = vec![0u8; required_space(2, 64)];
    let mut hi = RwTuple::init(&mut raw_hi, 2).unwrap();
    hi.upsert_uint16(1, 2).unwrap();
    hi.upsert_uint32(2, 0).unwrap();
    let hi_ro = hi.take_noshrink();

    let cols = [(1, Type::Uint16), (2, Type::Uint32)];
    let key_lo = compose_key(&lo_ro, &cols).unwrap();
    let key_hi = compose_key(&hi_ro, &cols).unwrap();
    assert!(key_lo < key_hi);
}

#[test]
fn reversed_builder_orders_opaque_keys_by_suffix() {
    let mut raw_a = vec![0u8; required_space(1, 64)];
    let mut a = RwTuple::init(&mut raw_a, 1).unwrap();
    a.upsert_opaque(1, b"example.com").unwrap();
    let a_ro = a.take_noshrink();

    let mut raw_b = vec![0u8; required_space(1, 64)];
    let mut b = RwTuple::init(&mut raw_b, 1).unwrap();
    b.upsert_opaque(1, b"other.com").unwrap();
    let b_ro = b.take_noshrink();

    let builder = KeyBuilder::new(true);
    let key_a = builder.compose(&a_ro, &[(1, Type::Opaque)]).unwrap();
    let key_b = builder.compose(&b_ro, &[(1, Type::Opaque)]).unwrap();
    // both share the ".com" suffix; a reversed-order key groups them
    // together ahead of anything not ending in ".com".
    assert!(key_a[..4] == key_b[..4]);
}
