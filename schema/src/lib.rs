//! In-memory model of a binary TL (Type Language) schema, plus the word codec
//! the schema is stored with.
//!
//! ```
//! use tlgen_schema::*;
//!
//! let mut schema = Schema::new(4);
//! let int32 = schema.add_type(TlType::new(0x5cb934fa_u32 as i32, "Int32", 0, 1));
//! schema.add_constructor(Combinator {
//!     id:        0x5cb934fa_u32 as i32,
//!     name:      "int32".to_owned(),
//!     type_id:   0x5cb934fa_u32 as i32,
//!     var_count: 0,
//!     args:      vec![],
//!     result:    Tree::Type(TreeType { type_: int32, flags: FLAG_NOVAR, children: vec![] }),
//! });
//! assert_eq!(schema.type_by_name("Int32"), int32);
//! assert_eq!(schema.total_constructors(), 1);
//! ```

pub mod bb;
pub mod schema;

pub use bb::*;
pub use schema::*;

/// Type expression is bare (no constructor id on the wire).
pub const FLAG_BARE: i32 = 1 << 0;
/// Implicit argument written in braces, e.g. `{X:Type}`.
pub const FLAG_OPT_VAR: i32 = 1 << 17;
/// Argument whose type is a `!X` type witness.
pub const FLAG_EXCL: i32 = 1 << 18;
/// Nothing below depends on a free variable.
pub const FLAG_NOVAR: i32 = 1 << 21;
pub const FLAG_DEFAULT_CONSTRUCTOR: i32 = 1 << 25;

/// Type header flag bits that carry no meaning for generation.
pub const KNOWN_TYPE_FLAGS: i32 = 1 | 8 | 16 | 1024;

/// Id of the `#` natural-number type.
pub const ID_VAR_NUM: i32 = 0x70659eff;
/// Id of the `Type` kind.
pub const ID_VAR_TYPE: i32 = 0x2cecf817;

pub const TLS_SCHEMA_V2: i32 = 0x3a2f9be2;
pub const TLS_SCHEMA_V3: i32 = 0xe4a8604b_u32 as i32;
pub const TLS_SCHEMA_V4: i32 = 0x90ac88d7_u32 as i32;
pub const TLS_TYPE: i32 = 0x12eb4386;
pub const TLS_COMBINATOR: i32 = 0x5c0a1ed5;
pub const TLS_COMBINATOR_LEFT_BUILTIN: i32 = 0xcd211f63_u32 as i32;
pub const TLS_COMBINATOR_LEFT: i32 = 0x4c12c6d9;
pub const TLS_COMBINATOR_RIGHT_V2: i32 = 0x2c064372;
pub const TLS_ARG_V2: i32 = 0x29dfe61b;

pub const TLS_EXPR_NAT: i32 = 0xdcb49bd8_u32 as i32;
pub const TLS_EXPR_TYPE: i32 = 0xecc9da78_u32 as i32;

/// Older spelling of [`TLS_NAT_CONST`], still accepted on input.
pub const TLS_NAT_CONST_OLD: i32 = 0xdcb49bd8_u32 as i32;
pub const TLS_NAT_CONST: i32 = 0x8ce940b1_u32 as i32;
pub const TLS_NAT_VAR: i32 = 0x4e8a14f0;
pub const TLS_TYPE_VAR: i32 = 0x0142ceae;
pub const TLS_ARRAY: i32 = 0xd9fb20de_u32 as i32;
pub const TLS_TYPE_EXPR: i32 = 0xc1863d08_u32 as i32;

/// Maps a schema header magic to its version number.
pub fn schema_version(magic: i32) -> Option<i32> {
    match magic {
        TLS_SCHEMA_V4 => Some(4),
        TLS_SCHEMA_V3 => Some(3),
        TLS_SCHEMA_V2 => Some(2),
        _ => None,
    }
}

/// Header magic for a schema version.
pub fn schema_magic(version: i32) -> Option<i32> {
    match version {
        4 => Some(TLS_SCHEMA_V4),
        3 => Some(TLS_SCHEMA_V3),
        2 => Some(TLS_SCHEMA_V2),
        _ => None,
    }
}

/// Argument flag bits that mark an optional field and a bound variable.
///
/// Their positions swapped between schema versions 2 and 3.
pub fn arg_flag_bits(version: i32) -> (i32, i32) {
    let opt_field = 2 << (version >= 3) as i32;
    let has_vars = opt_field ^ 6;
    (opt_field, has_vars)
}

#[test]
fn arg_flag_bits_by_version() {
    assert_eq!(arg_flag_bits(2), (2, 4));
    assert_eq!(arg_flag_bits(3), (4, 2));
    assert_eq!(arg_flag_bits(4), (4, 2));
}
