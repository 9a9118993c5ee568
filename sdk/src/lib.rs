//! tlgen
//!
//! Facade over the TL schema tooling.
//!
//! - Reading binary `.tlo` schemas (re-exported from the compiler)
//! - Generating code through any `TlWriter`, including the bundled Rust writer
//! - Dumping a decoded schema as JSON

use std::collections::BTreeMap;

pub use tlgen_compiler::error::TlError;
pub use tlgen_compiler::{
    decode_binary_schema, encode_binary_schema, generate, generate_units, read_schema_from_file, write_tl_to_file,
    write_tl_to_multiple_files, Mode, RustWriter, RustWriterOptions, TlWriter,
};
pub use tlgen_schema::{Combinator, Schema, TlType, Tree};

/// Decode a binary schema into a pretty-printed JSON string.
pub fn decode_to_json(buffer: &[u8]) -> Result<String, TlError> {
    let schema = decode_binary_schema(buffer)?;
    Ok(serde_json::to_string_pretty(&schema)?)
}

/// Decode a binary schema and generate Rust for it in one step.
pub fn generate_rust(buffer: &[u8], options: RustWriterOptions) -> Result<String, TlError> {
    let schema = decode_binary_schema(buffer)?;
    generate(&schema, &RustWriter::new(options))
}

/// Split variant of [`generate_rust`]: file names mapped to their contents.
pub fn generate_rust_units(
    buffer: &[u8],
    options: RustWriterOptions,
    prefix: &str,
) -> Result<BTreeMap<String, String>, TlError> {
    let schema = decode_binary_schema(buffer)?;
    generate_units(&schema, &RustWriter::new(options), prefix, ".rs")
}

/// Parse writer options from JSON; missing keys keep their defaults.
pub fn rust_options_from_json(json: &str) -> Result<RustWriterOptions, TlError> {
    Ok(serde_json::from_str(json)?)
}

pub mod error {
    pub use tlgen_compiler::error::TlError;
}

pub mod schema {
    pub use tlgen_schema::{Arg, Combinator, Condition, Schema, TlType, Tree, TreeArray, TreeType, TypeRef};
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlgen_schema::*;

    fn sample() -> Vec<u8> {
        let mut schema = Schema::new(4);
        let int32 = schema.add_type(TlType::new(0x100, "Int32", 0, 0));
        let point = schema.add_type(TlType::new(0x101, "Point", 0, 1));
        let leaf = |r| Tree::Type(TreeType { type_: r, flags: FLAG_NOVAR, children: vec![] });
        schema.add_constructor(Combinator {
            id:        0x200,
            name:      "point".to_owned(),
            type_id:   0x101,
            var_count: 0,
            args:      vec![Arg {
                name:           "x".to_owned(),
                flags:          FLAG_NOVAR,
                bound_var:      None,
                conditional_on: None,
                type_:          leaf(int32),
            }],
            result:    leaf(point),
        });
        encode_binary_schema(&schema).unwrap()
    }

    #[test]
    fn test_decode_to_json() {
        let json = decode_to_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 4);
        assert_eq!(value["types"][1]["name"], "Point");
        assert_eq!(value["constructors"][0]["args"][0]["type"]["node"], "Type");
    }

    #[test]
    fn test_decode_to_json_rejects_garbage() {
        assert!(matches!(decode_to_json(&[1, 2, 3]), Err(TlError::UnalignedInput { len: 3 })));
    }

    #[test]
    fn test_generate_rust() {
        let options = rust_options_from_json(r#"{ "runtime": "tl_runtime", "additional_functions": [] }"#).unwrap();
        let text = generate_rust(&sample(), options).unwrap();
        assert!(text.contains("use tl_runtime::*;\n"));
        assert!(text.contains("pub struct Point {\n    pub x: i32,\n}\n"));
        assert!(!text.contains("TlName"));

        let files = generate_rust_units(&sample(), RustWriterOptions::default(), "tl").unwrap();
        assert!(files["tl.rs"].contains("include!(\"tl_Point.rs\");\n"));
    }

    #[test]
    fn test_bad_options() {
        assert!(matches!(rust_options_from_json(r#"{ "parser_mode": "both" }"#), Err(TlError::Json(_))));
    }
}
