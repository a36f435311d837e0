//! Schema resolution tests: projection, field reordering, default
//! injection, numeric promotion, union adjustment, and failure modes.

use contrail::codec::{
    BinaryDecoder, BinaryEncoder, Decoder, ResolvingDecoder, ValidatingEncoder,
};
use contrail::error::{CodecError, SchemaError};
use contrail::schema::{parse_schema, Schema};
use contrail::value::{read_resolved, write_datum, Datum, RecordDatum};
use std::sync::Arc;

fn encode(schema: &Arc<Schema>, datum: &Datum) -> Vec<u8> {
    let mut enc = ValidatingEncoder::new(schema, BinaryEncoder::buffered()).unwrap();
    write_datum(&mut enc, datum).unwrap();
    enc.into_inner().into_bytes()
}

fn decode_resolved(writer: &Arc<Schema>, reader: &Arc<Schema>, bytes: &[u8]) -> Datum {
    let mut dec =
        ResolvingDecoder::new(writer, reader, Box::new(BinaryDecoder::from_slice(bytes)))
            .unwrap();
    read_resolved(&mut dec, reader).unwrap()
}

fn record(schema: &Arc<Schema>, values: &[(&str, Datum)]) -> Datum {
    let mut rec = RecordDatum::new(schema).unwrap();
    for (name, value) in values {
        *rec.field_mut(name).unwrap() = value.clone();
    }
    Datum::Record(rec)
}

// ============================================================================
// Projection and reordering
// ============================================================================

#[test]
fn test_projection_drops_writer_field() {
    let writer = parse_schema(
        r#"{
            "type": "record",
            "name": "C",
            "fields": [
                {"name": "re", "type": "long"},
                {"name": "im", "type": "long"}
            ]
        }"#,
    )
    .unwrap();
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "C",
            "fields": [{"name": "re", "type": "long"}]
        }"#,
    )
    .unwrap();

    let bytes = encode(
        &writer,
        &record(&writer, &[("re", Datum::Long(3)), ("im", Datum::Long(5))]),
    );
    let decoded = decode_resolved(&writer, &reader, &bytes);
    assert_eq!(decoded, record(&reader, &[("re", Datum::Long(3))]));
}

#[test]
fn test_field_order_is_reader_indexed() {
    // writer fields [a, b, c]; reader fields [c, a] -> order [1, 0]
    let writer = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "a", "type": "long"},
                {"name": "b", "type": "string"},
                {"name": "c", "type": "long"}
            ]
        }"#,
    )
    .unwrap();
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "c", "type": "long"},
                {"name": "a", "type": "long"}
            ]
        }"#,
    )
    .unwrap();

    let bytes = encode(
        &writer,
        &record(
            &writer,
            &[
                ("a", Datum::Long(10)),
                ("b", Datum::String("skip".to_string())),
                ("c", Datum::Long(30)),
            ],
        ),
    );

    let mut dec =
        ResolvingDecoder::new(&writer, &reader, Box::new(BinaryDecoder::from_slice(&bytes)))
            .unwrap();
    let order = dec.field_order().unwrap();
    assert_eq!(&*order, &[1, 0]);
    // Reader index 1 is 'a' (stream-first), reader index 0 is 'c'.
    assert_eq!(dec.read_long().unwrap(), 10);
    assert_eq!(dec.read_long().unwrap(), 30);
    dec.drain().unwrap();
}

#[test]
fn test_projection_against_self_is_identity() {
    let schema = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "a", "type": "long"},
                {"name": "b", "type": "string"}
            ]
        }"#,
    )
    .unwrap();
    let datum = record(
        &schema,
        &[
            ("a", Datum::Long(-9)),
            ("b", Datum::String("same".to_string())),
        ],
    );
    let bytes = encode(&schema, &datum);
    assert_eq!(decode_resolved(&schema, &schema, &bytes), datum);
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_default_injection() {
    let writer = parse_schema(r#"{"type": "record", "name": "R", "fields": []}"#).unwrap();
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [{"name": "f", "type": "int", "default": 100}]
        }"#,
    )
    .unwrap();
    let decoded = decode_resolved(&writer, &reader, &[]);
    assert_eq!(decoded, record(&reader, &[("f", Datum::Int(100))]));
}

#[test]
fn test_default_union_and_string() {
    let writer = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [{"name": "present", "type": "long"}]
        }"#,
    )
    .unwrap();
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "present", "type": "long"},
                {"name": "note", "type": "string", "default": "n/a"},
                {"name": "opt", "type": ["null", "long"], "default": null}
            ]
        }"#,
    )
    .unwrap();

    let bytes = encode(&writer, &record(&writer, &[("present", Datum::Long(4))]));
    let decoded = decode_resolved(&writer, &reader, &bytes);
    assert_eq!(
        decoded,
        record(
            &reader,
            &[
                ("present", Datum::Long(4)),
                ("note", Datum::String("n/a".to_string())),
                ("opt", Datum::Union(0, Box::new(Datum::Null))),
            ],
        )
    );
}

#[test]
fn test_missing_default_fails_at_construction() {
    let writer = parse_schema(r#"{"type": "record", "name": "R", "fields": []}"#).unwrap();
    let reader = parse_schema(
        r#"{"type": "record", "name": "R", "fields": [{"name": "f", "type": "int"}]}"#,
    )
    .unwrap();
    let result =
        ResolvingDecoder::new(&writer, &reader, Box::new(BinaryDecoder::from_slice(&[])));
    assert!(matches!(result, Err(SchemaError::Incompatible(_))));
}

// ============================================================================
// Promotion
// ============================================================================

#[test]
fn test_promotion_chain() {
    let bytes = encode(&parse_schema(r#""int""#).unwrap(), &Datum::Int(7));
    for (reader_text, expected) in [
        (r#""long""#, Datum::Long(7)),
        (r#""float""#, Datum::Float(7.0)),
        (r#""double""#, Datum::Double(7.0)),
    ] {
        let writer = parse_schema(r#""int""#).unwrap();
        let reader = parse_schema(reader_text).unwrap();
        assert_eq!(decode_resolved(&writer, &reader, &bytes), expected);
    }
}

#[test]
fn test_promotion_is_one_way() {
    let writer = parse_schema(r#""double""#).unwrap();
    let reader = parse_schema(r#""int""#).unwrap();
    let bytes = encode(&writer, &Datum::Double(1.5));
    let mut dec =
        ResolvingDecoder::new(&writer, &reader, Box::new(BinaryDecoder::from_slice(&bytes)))
            .unwrap();
    assert!(matches!(
        dec.read_int(),
        Err(CodecError::Incompatible(_))
    ));
}

#[test]
fn test_promotion_inside_array() {
    let writer = parse_schema(r#"{"type": "array", "items": "int"}"#).unwrap();
    let reader = parse_schema(r#"{"type": "array", "items": "double"}"#).unwrap();
    let bytes = encode(&writer, &Datum::Array(vec![Datum::Int(7)]));
    assert_eq!(
        decode_resolved(&writer, &reader, &bytes),
        Datum::Array(vec![Datum::Double(7.0)])
    );
}

#[test]
fn test_promotion_inside_map() {
    let writer = parse_schema(r#"{"type": "map", "values": "long"}"#).unwrap();
    let reader = parse_schema(r#"{"type": "map", "values": "double"}"#).unwrap();
    let bytes = encode(
        &writer,
        &Datum::Map(vec![("k".to_string(), Datum::Long(2))]),
    );
    assert_eq!(
        decode_resolved(&writer, &reader, &bytes),
        Datum::Map(vec![("k".to_string(), Datum::Double(2.0))])
    );
}

// ============================================================================
// Unions
// ============================================================================

#[test]
fn test_union_reorder() {
    let writer = parse_schema(r#"["int", "string"]"#).unwrap();
    let reader = parse_schema(r#"["string", "int"]"#).unwrap();
    let bytes = encode(
        &writer,
        &Datum::Union(1, Box::new(Datum::String("x".to_string()))),
    );
    assert_eq!(
        decode_resolved(&writer, &reader, &bytes),
        Datum::Union(0, Box::new(Datum::String("x".to_string())))
    );
}

#[test]
fn test_writer_union_to_plain_reader() {
    let writer = parse_schema(r#"["int", "string"]"#).unwrap();
    let reader = parse_schema(r#""string""#).unwrap();
    let bytes = encode(
        &writer,
        &Datum::Union(1, Box::new(Datum::String("x".to_string()))),
    );
    assert_eq!(
        decode_resolved(&writer, &reader, &bytes),
        Datum::String("x".to_string())
    );
}

#[test]
fn test_writer_union_unmatched_branch_fails_at_decode() {
    let writer = parse_schema(r#"["int", "string"]"#).unwrap();
    let reader = parse_schema(r#""string""#).unwrap();
    // The resolver builds fine; only data selecting the int branch fails.
    let bytes = encode(&writer, &Datum::Union(0, Box::new(Datum::Int(3))));
    let mut dec =
        ResolvingDecoder::new(&writer, &reader, Box::new(BinaryDecoder::from_slice(&bytes)))
            .unwrap();
    assert!(matches!(
        dec.read_string(),
        Err(CodecError::Incompatible(_))
    ));
}

#[test]
fn test_plain_writer_to_union_reader() {
    let writer = parse_schema(r#""long""#).unwrap();
    let reader = parse_schema(r#"["null", "long"]"#).unwrap();
    let bytes = encode(&writer, &Datum::Long(12));
    assert_eq!(
        decode_resolved(&writer, &reader, &bytes),
        Datum::Union(1, Box::new(Datum::Long(12)))
    );
}

#[test]
fn test_union_branch_by_promotion() {
    // No long branch: the value lands on the first promotable branch.
    let writer = parse_schema(r#""long""#).unwrap();
    let reader = parse_schema(r#"["null", "double"]"#).unwrap();
    let bytes = encode(&writer, &Datum::Long(8));
    assert_eq!(
        decode_resolved(&writer, &reader, &bytes),
        Datum::Union(1, Box::new(Datum::Double(8.0)))
    );
}

// ============================================================================
// Enums, fixed, nested structures
// ============================================================================

#[test]
fn test_enum_symbol_remap() {
    let writer =
        parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["A", "B", "C"]}"#).unwrap();
    let reader =
        parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["C", "B"]}"#).unwrap();
    let bytes = encode(&writer, &Datum::Enum(2));
    assert_eq!(decode_resolved(&writer, &reader, &bytes), Datum::Enum(0));
}

#[test]
fn test_fixed_size_mismatch_fails() {
    let writer = parse_schema(r#"{"type": "fixed", "name": "F", "size": 4}"#).unwrap();
    let reader = parse_schema(r#"{"type": "fixed", "name": "F", "size": 8}"#).unwrap();
    let bytes = encode(&writer, &Datum::Fixed(vec![1, 2, 3, 4]));
    let mut dec =
        ResolvingDecoder::new(&writer, &reader, Box::new(BinaryDecoder::from_slice(&bytes)))
            .unwrap();
    assert!(matches!(
        dec.read_fixed(8),
        Err(CodecError::Incompatible(_))
    ));
}

#[test]
fn test_nested_record_projection_with_skip() {
    let writer = parse_schema(
        r#"{
            "type": "record",
            "name": "Outer",
            "fields": [
                {"name": "inner", "type": {
                    "type": "record",
                    "name": "Inner",
                    "fields": [
                        {"name": "x", "type": "int"},
                        {"name": "y", "type": {"type": "array", "items": "string"}}
                    ]
                }},
                {"name": "tail", "type": "long"}
            ]
        }"#,
    )
    .unwrap();
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "Outer",
            "fields": [
                {"name": "inner", "type": {
                    "type": "record",
                    "name": "Inner",
                    "fields": [{"name": "x", "type": "long"}]
                }},
                {"name": "tail", "type": "long"}
            ]
        }"#,
    )
    .unwrap();

    let Schema::Record(wrec) = &*writer else {
        unreachable!();
    };
    let inner = record(
        &wrec.fields[0].schema,
        &[
            ("x", Datum::Int(5)),
            (
                "y",
                Datum::Array(vec![Datum::String("dropped".to_string())]),
            ),
        ],
    );
    let bytes = encode(
        &writer,
        &record(&writer, &[("inner", inner), ("tail", Datum::Long(-1))]),
    );

    let decoded = decode_resolved(&writer, &reader, &bytes);
    let Schema::Record(rrec) = &*reader else {
        unreachable!();
    };
    let expected_inner = record(&rrec.fields[0].schema, &[("x", Datum::Long(5))]);
    assert_eq!(
        decoded,
        record(
            &reader,
            &[("inner", expected_inner), ("tail", Datum::Long(-1))],
        )
    );
}

#[test]
fn test_recursive_schema_resolves() {
    let text = r#"{
        "type": "record",
        "name": "Node",
        "fields": [
            {"name": "label", "type": "string"},
            {"name": "children", "type": {"type": "array", "items": "Node"}}
        ]
    }"#;
    let writer = parse_schema(text).unwrap();
    let reader = parse_schema(text).unwrap();

    let node = |label: &str, children: Vec<Datum>| {
        let mut rec = RecordDatum::new(&writer).unwrap();
        *rec.field_mut("label").unwrap() = Datum::String(label.to_string());
        *rec.field_mut("children").unwrap() = Datum::Array(children);
        Datum::Record(rec)
    };
    let tree = node("a", vec![node("b", vec![node("c", vec![])])]);
    let bytes = encode(&writer, &tree);

    let decoded = decode_resolved(&writer, &reader, &bytes);
    // Schemas parsed separately are equal, so datums compare equal too.
    assert_eq!(decoded, tree);
}

#[test]
fn test_skipped_trailing_field_before_next_item() {
    // array<record> where the writer record has a trailing field the
    // reader drops: the skip must happen before each block boundary.
    let writer = parse_schema(
        r#"{
            "type": "array",
            "items": {
                "type": "record",
                "name": "R",
                "fields": [
                    {"name": "keep", "type": "long"},
                    {"name": "drop", "type": "string"}
                ]
            }
        }"#,
    )
    .unwrap();
    let reader = parse_schema(
        r#"{
            "type": "array",
            "items": {
                "type": "record",
                "name": "R",
                "fields": [{"name": "keep", "type": "long"}]
            }
        }"#,
    )
    .unwrap();

    let Schema::Array(witems) = &*writer else {
        unreachable!();
    };
    let item = |keep: i64, drop: &str| {
        record(
            witems,
            &[
                ("keep", Datum::Long(keep)),
                ("drop", Datum::String(drop.to_string())),
            ],
        )
    };
    let bytes = encode(&writer, &Datum::Array(vec![item(1, "x"), item(2, "yy")]));

    let Schema::Array(ritems) = &*reader else {
        unreachable!();
    };
    assert_eq!(
        decode_resolved(&writer, &reader, &bytes),
        Datum::Array(vec![
            record(ritems, &[("keep", Datum::Long(1))]),
            record(ritems, &[("keep", Datum::Long(2))]),
        ])
    );
}
