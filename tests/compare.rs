//! S6: the tuple comparator and the store-facing key comparators agree
//! on relative order for the values they both handle.

use tupl::buffer::{required_space, RwTuple};
use tupl::{compare_tuples, compose_key, forward_cmp, Ordering5, Type};

fn tuple_with_u32(column: u16, v: u32) -> Vec<u8> {
    let mut raw = vec![0u8; required_space(1, 32)];
    let mut rw = RwTuple::init(&mut raw, 1).unwrap();
    rw.upsert_uint32(column, v).unwrap();
    rw.take().as_bytes().to_vec()
}

#[test]
fn ordering5_agrees_with_forward_key_order() {
    let a_bytes = tuple_with_u32(1, 10);
    let b_bytes = tuple_with_u32(1, 20);
    let a = tupl::RoTuple::new(&a_bytes);
    let b = tupl::RoTuple::new(&b_bytes);

    assert_eq!(compare_tuples(&a, &b), Ordering5::Less);

    let key_a = compose_key(&a, &[(1, Type::Uint32)]).unwrap();
    let key_b = compose_key(&b, &[(1, Type::Uint32)]).unwrap();
    assert_eq!(forward_cmp(&key_a, &key_b), std::cmp::Ordering::Less);
}

#[test]
fn identical_tuples_compare_equal_both_ways() {
    let bytes = tuple_with_u32(1, 42);
    let a = tupl::RoTuple::new(&bytes);
    let b = tupl::RoTuple::new(&bytes);
    assert_eq!(compare_tuples(&a, &b), Ordering5::Equal);
    let key_a = compose_key(&a, &[(1, Type::Uint32)]).unwrap();
    let key_b = compose_key(&b, &[(1, Type::Uint32)]).unwrap();
    assert_eq!(forward_cmp(&key_a, &key_b), std::cmp::Ordering::Equal);
}

#[test]
fn differing_columns_are_incomparable_but_keys_still_order() {
    let a_bytes = tuple_with_u32(1, 5);
    let b_bytes = tuple_with_u32(2, 5);
    let a = tupl::RoTuple::new(&a_bytes);
    let b = tupl::RoTuple::new(&b_bytes);
    // neither tuple has the other's column live, so under the tag-union
    // slow path the missing side compares as absent (lesser), not
    // incomparable -- incomparability is reserved for a shared column
    // holding mismatched types or NaN.
    assert_ne!(compare_tuples(&a, &b), Ordering5::Equal);
}
