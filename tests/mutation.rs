//! Exercises the upsert/insert/update/erase surface end to end.

use tupl::buffer::{required_space, RwTuple};
use tupl::tag::TypeFilter;
use tupl::{Error, Type, Value};

#[test]
fn upsert_then_update_then_erase() {
    let mut raw = vec![0u8; required_space(4, 128)];
    let mut rw = RwTuple::init(&mut raw, 4).unwrap();

    rw.upsert_int32(1, -5).unwrap();
    assert_eq!(rw.update_int32(1, -6), Ok(()));
    {
        let ro = rw.take_noshrink();
        assert_eq!(Value::get(&ro, 1, Type::Int32).unwrap(), Value::Int32(-6));
    }

    rw.erase_by_column(1, TypeFilter::exact(Type::Int32));
    let ro = rw.take_noshrink();
    assert!(Value::get(&ro, 1, Type::Int32).is_err());
}

#[test]
fn update_on_absent_column_fails() {
    let mut raw = vec![0u8; required_space(2, 32)];
    let mut rw = RwTuple::init(&mut raw, 2).unwrap();
    assert_eq!(rw.update_float64(9, 1.0), Err(Error::NoField));
}

#[test]
fn upsert_replacing_existing_field_rolls_back_on_no_space() {
    // just enough room for both short fields, not enough for a replacement.
    let mut raw = vec![0u8; required_space(2, 16)];
    let mut rw = RwTuple::init(&mut raw, 2).unwrap();
    rw.upsert_uint32(9, 1).unwrap();
    rw.upsert_cstr(1, "short").unwrap();
    // replacing it with something far longer can't fit: the old field's
    // payload bytes are still occupying the buffer (kill never moves
    // bytes), so this must roll back rather than leave column 1 erased.
    let long = "a".repeat(64);
    assert_eq!(rw.upsert_cstr(1, &long), Err(Error::NoSpace));
    let ro = rw.take_noshrink();
    assert_eq!(Value::get(&ro, 1, Type::CStr).unwrap(), Value::CStr("short"));
    assert_eq!(Value::get(&ro, 9, Type::Uint32).unwrap(), Value::Uint32(1));
}

#[test]
fn upsert_rolls_back_on_no_space() {
    // buffer with room for exactly one descriptor and minimal payload.
    let mut raw = vec![0u8; required_space(1, 8)];
    let mut rw = RwTuple::init(&mut raw, 1).unwrap();
    rw.upsert_uint64(1, 42).unwrap();
    // a second, distinct column can't fit (no descriptor slot left).
    assert_eq!(rw.upsert_uint64(2, 99), Err(Error::NoSpace));
    // the original field must be intact, not half-erased.
    let ro = rw.take_noshrink();
    assert_eq!(Value::get(&ro, 1, Type::Uint64).unwrap(), Value::Uint64(42));
}

#[test]
fn null_field_round_trips_as_null() {
    let mut raw = vec![0u8; required_space(2, 32)];
    let mut rw = RwTuple::init(&mut raw, 2).unwrap();
    rw.upsert_null_field(1, Type::Uint32).unwrap();
    let ro = rw.take_noshrink();
    assert_eq!(Value::get(&ro, 1, Type::Uint32).unwrap(), Value::Null);
}

#[test]
fn nested_tuple_round_trips() {
    let mut inner_raw = vec![0u8; required_space(1, 32)];
    let mut inner = RwTuple::init(&mut inner_raw, 1).unwrap();
    inner.upsert_uint32(1, 777).unwrap();
    let inner_ro = inner.take();

    let mut outer_raw = vec![0u8; required_space(1, 64)];
    let mut outer = RwTuple::init(&mut outer_raw, 1).unwrap();
    outer.upsert_nested(5, &inner_ro).unwrap();
    let outer_ro = outer.take_noshrink();

    match Value::get(&outer_ro, 5, Type::Nested).unwrap() {
        Value::Nested(nested) => {
            assert_eq!(Value::get(&nested, 1, Type::Uint32).unwrap(), Value::Uint32(777));
        }
        other => panic!("expected Nested, got {other:?}"),
    }
}
