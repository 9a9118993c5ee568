use thiserror::Error;
use tlgen_schema::{ReadError, WriteError};

#[derive(Debug, Error)]
pub enum TlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema file {0} is empty")]
    EmptyInput(String),

    #[error("Schema size {len} is not a multiple of 4")]
    UnalignedInput { len: usize },

    #[error("Truncated schema: {needed} more bytes needed at offset {offset}")]
    TruncatedInput { offset: usize, needed: usize },

    #[error("Invalid string length tag at offset {offset}")]
    InvalidStringTag { offset: usize },

    #[error("String at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    #[error("Unexpected trailing data at offset {offset}")]
    TrailingBytes { offset: usize },

    #[error("Unsupported TL schema version magic {0:#010x}")]
    UnsupportedVersion(i32),

    #[error("No binary encoding for TL schema version {0}")]
    UnknownSchemaVersion(i32),

    #[error("Wrong {what} magic {found:#010x} at offset {offset}")]
    BadMagic {
        what:   &'static str,
        found:  i32,
        offset: usize,
    },

    #[error("Unknown {what} tag {found:#010x} at offset {offset}")]
    UnknownTreeTag {
        what:   &'static str,
        found:  i32,
        offset: usize,
    },

    #[error("Negative {what} {value}")]
    NegativeValue { what: &'static str, value: i32 },

    #[error("Type variable {var_num} has forbidden flags {flags:#x}")]
    TypeVarFlags { var_num: usize, flags: i32 },

    #[error("Unknown type id {0:#010x}")]
    UnknownType(i32),

    #[error("Type {type_name} has arity {expected} but is applied to {found} parameters")]
    ArityMismatch {
        type_name: String,
        expected:  usize,
        found:     usize,
    },

    #[error("Schema declares {declared} constructors but its types declare {expected}")]
    ConstructorCountMismatch { declared: usize, expected: usize },

    #[error("Type {0} received more constructors than it declared")]
    TooManyConstructors(String),

    #[error("Constructor {0} does not construct its own type")]
    InvalidConstructorResult(String),

    #[error("Function {0} must return a type or a type variable")]
    InvalidFunctionResult(String),

    #[error("Argument {arg} of {combinator} binds a variable but is not a plain type")]
    InvalidBoundArg { combinator: String, arg: String },

    #[error("Parameter {slot} of type {type_name} is not bound the same way by every constructor")]
    InconsistentTypeParameter { type_name: String, slot: usize },

    #[error("Name of {len} bytes is too long to encode")]
    StringTooLong { len: usize },

    #[error("Cannot encode a {found} node as a {expected} expression")]
    MisplacedExpression {
        expected: &'static str,
        found:    &'static str,
    },

    #[error("Variable misuse while generating {combinator}: {reason}")]
    VarBinding { combinator: String, reason: String },
}

impl From<ReadError> for TlError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::Truncated { offset, needed } => TlError::TruncatedInput { offset, needed },
            ReadError::InvalidStringTag { offset } => TlError::InvalidStringTag { offset },
            ReadError::Unconsumed { offset } => TlError::TrailingBytes { offset },
            ReadError::InvalidUtf8 { offset } => TlError::InvalidUtf8 { offset },
        }
    }
}

impl From<WriteError> for TlError {
    fn from(e: WriteError) -> Self {
        match e {
            WriteError::StringTooLong { len } => TlError::StringTooLong { len },
        }
    }
}
