use std::{error, fmt};

/// Failure modes for every fallible operation in this crate.
///
/// Nothing here is ever raised by way of a panic: malformed input always
/// comes back as `Err`, never `abort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Malformed buffer, tag, or argument combination.
    Invalid,
    /// Buffer lacks room for the requested descriptor or payload.
    NoSpace,
    /// No field with the requested column/type exists.
    NoField,
    /// Caller's value type does not match the field's stored type.
    TypeMismatch,
    /// Payload length does not match what the type requires.
    DatalenMismatch,
    /// Value out of the representable range for the target type.
    ValueOutOfRange,
    /// Composed key does not match the index's declared column list.
    KeyMismatch,
    /// A required column is absent from the tuple.
    ColumnMissing,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Invalid => "invalid tuple or argument",
            Self::NoSpace => "insufficient space in buffer",
            Self::NoField => "no such field",
            Self::TypeMismatch => "field type mismatch",
            Self::DatalenMismatch => "payload length mismatch",
            Self::ValueOutOfRange => "value out of range",
            Self::KeyMismatch => "key does not match index columns",
            Self::ColumnMissing => "required column missing",
        })
    }
}

impl error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
