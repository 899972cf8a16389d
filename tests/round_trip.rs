//! S1-S4: round-trip, junk accounting, idempotent shrink, and collection
//! tie-break ordering.

use tupl::buffer::{required_space, RwTuple};
use tupl::tag::TypeFilter;
use tupl::{Type, Value};

#[test]
fn s1_round_trip_preserves_every_field() {
    let mut raw = vec![0u8; required_space(4, 256)];
    let mut rw = RwTuple::init(&mut raw, 4).unwrap();
    rw.upsert_uint32(1, 0xDEAD_BEEF).unwrap();
    rw.upsert_cstr(2, "round trip").unwrap();
    rw.upsert_fixed96(3, &[7u8; 12]).unwrap();
    let ro = rw.take();
    assert_eq!(Value::get(&ro, 1, Type::Uint32).unwrap(), Value::Uint32(0xDEAD_BEEF));
    assert_eq!(Value::get(&ro, 2, Type::CStr).unwrap(), Value::CStr("round trip"));
    assert!(matches!(Value::get(&ro, 3, Type::Fixed96).unwrap(), Value::Fixed96(b) if *b == [7u8; 12]));
    assert!(tupl::validate(ro.as_bytes()).is_ok());
}

#[test]
fn s2_junk_accounting_tracks_erased_fields() {
    let mut raw = vec![0u8; required_space(4, 128)];
    let mut rw = RwTuple::init(&mut raw, 4).unwrap();
    rw.upsert_uint32(2, 1).unwrap();
    rw.upsert_opaque(1, b"some payload bytes").unwrap();
    assert_eq!(rw.junk_bytes(), 0);
    // the opaque field was appended last, so its descriptor sits at `head`
    // and its payload directly abuts `tail` -- erasing it reclaims both
    // immediately rather than leaving them as junk.
    rw.erase_by_column(1, TypeFilter::exact(Type::Opaque));
    assert_eq!(rw.junk_bytes(), 0);
}

#[test]
fn s3_shrink_is_idempotent() {
    let mut raw = vec![0u8; required_space(4, 128)];
    let mut rw = RwTuple::init(&mut raw, 4).unwrap();
    rw.insert_uint32(1, 1).unwrap();
    rw.insert_uint32(1, 2).unwrap();
    rw.insert_uint32(1, 3).unwrap();
    rw.erase(1).unwrap(); // kill the middle one, not at the boundary
    assert!(rw.shrink().unwrap());
    assert!(!rw.shrink().unwrap()); // nothing left to reclaim
    assert!(rw.check().is_ok());
}

#[test]
fn s4_collections_preserve_physical_insertion_order() {
    let mut raw = vec![0u8; required_space(4, 64)];
    let mut rw = RwTuple::init(&mut raw, 4).unwrap();
    rw.insert_uint16(1, 10).unwrap();
    rw.insert_uint16(1, 20).unwrap();
    rw.insert_uint16(1, 30).unwrap();
    let ro = rw.take_noshrink();
    let values: Vec<u16> = tupl::iter::Fields::new(&ro, 1, TypeFilter::exact(Type::Uint16))
        .map(|d| d.inline_value())
        .collect();
    // most-recently-inserted scans first.
    assert_eq!(values, vec![30, 20, 10]);
}
