use proptest::prelude::*;
use tlgen_compiler::*;
use tlgen_schema::*;

fn words_to_bytes(words: &[i32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Words that steer the decoder past its magic checks now and then.
fn schema_word() -> impl Strategy<Value = i32> {
    prop_oneof![
        4 => any::<i32>(),
        2 => 0..4,
        1 => Just(TLS_TYPE),
        1 => Just(TLS_COMBINATOR),
        1 => Just(TLS_COMBINATOR_LEFT),
        1 => Just(TLS_COMBINATOR_RIGHT_V2),
        1 => Just(TLS_ARG_V2),
        1 => Just(TLS_TYPE_EXPR),
        1 => Just(TLS_TYPE_VAR),
        1 => Just(TLS_ARRAY),
        1 => Just(TLS_NAT_CONST),
    ]
}

fn counted_schema(counts: &[usize]) -> Schema {
    let mut schema = Schema::new(4);
    for (i, &count) in counts.iter().enumerate() {
        let id = 0x100 + i as i32;
        let r = schema.add_type(TlType::new(id, &format!("T{}", i), 0, count));
        for j in 0..count {
            schema.add_constructor(Combinator {
                id:        0x1000 + (i * 16 + j) as i32,
                name:      format!("t{}_{}", i, j),
                type_id:   id,
                var_count: 0,
                args:      vec![],
                result:    Tree::Type(TreeType { type_: r, flags: FLAG_NOVAR, children: vec![] }),
            });
        }
    }
    schema
}

proptest! {
    #[test]
    fn decode_never_panics(version in 2..=4, words in prop::collection::vec(schema_word(), 0..64)) {
        let mut words = words;
        words.insert(0, schema_magic(version).unwrap());
        let _ = decode_binary_schema(&words_to_bytes(&words));
    }

    #[test]
    fn unaligned_input_is_rejected(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
        prop_assume!(bytes.len() % 4 != 0);
        let len = bytes.len();
        let rejected = matches!(
            decode_binary_schema(&bytes),
            Err(TlError::UnalignedInput { len: l }) if l == len
        );
        prop_assert!(rejected);
    }

    #[test]
    fn constructor_count_must_match_type_headers(
        counts in prop::collection::vec(0usize..4, 1..6),
        bumped in any::<prop::sample::Index>(),
        extra in 0usize..3,
    ) {
        let mut schema = counted_schema(&counts);
        let total: usize = counts.iter().sum();
        schema.types[bumped.index(counts.len())].constructors_num += extra;

        let bytes = encode_binary_schema(&schema).unwrap();
        match decode_binary_schema(&bytes) {
            Ok(decoded) => {
                prop_assert_eq!(extra, 0);
                prop_assert_eq!(decoded.total_constructors(), total);
                for (t, &count) in decoded.types.iter().zip(&counts) {
                    prop_assert_eq!(t.constructors.len(), count);
                }
            }
            Err(TlError::ConstructorCountMismatch { declared, expected }) => {
                prop_assert!(extra > 0);
                prop_assert_eq!(declared, total);
                prop_assert_eq!(expected, total + extra);
            }
            Err(e) => prop_assert!(false, "unexpected error: {}", e),
        }
    }
}
