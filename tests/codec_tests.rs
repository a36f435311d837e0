//! End-to-end codec tests: wire-format byte checks, datum round-trips
//! through the binary and JSON codecs, and grammar strictness.

use contrail::codec::{
    BinaryDecoder, BinaryEncoder, Decoder, Encoder, JsonDecoder, JsonEncoder, ValidatingDecoder,
    ValidatingEncoder,
};
use contrail::error::CodecError;
use contrail::schema::parse_schema;
use contrail::value::{read_datum, write_datum, Datum, RecordDatum};
use std::sync::Arc;

use contrail::schema::Schema;

fn encode_datum(schema: &Arc<Schema>, datum: &Datum) -> Vec<u8> {
    let mut enc = ValidatingEncoder::new(schema, BinaryEncoder::buffered()).unwrap();
    write_datum(&mut enc, datum).unwrap();
    enc.into_inner().into_bytes()
}

fn decode_datum(schema: &Arc<Schema>, bytes: &[u8]) -> Datum {
    let mut dec = ValidatingDecoder::new(schema, BinaryDecoder::from_slice(bytes)).unwrap();
    read_datum(&mut dec, schema).unwrap()
}

fn round_trip(schema: &Arc<Schema>, datum: Datum) {
    let bytes = encode_datum(schema, &datum);
    assert_eq!(decode_datum(schema, &bytes), datum);
}

// ============================================================================
// Wire format
// ============================================================================

#[test]
fn test_int_42_is_one_byte() {
    let schema = parse_schema(r#""int""#).unwrap();
    let bytes = encode_datum(&schema, &Datum::Int(42));
    assert_eq!(bytes, vec![0x54]);
    assert_eq!(decode_datum(&schema, &bytes), Datum::Int(42));
}

#[test]
fn test_long_minus_one_zigzags() {
    let schema = parse_schema(r#""long""#).unwrap();
    let bytes = encode_datum(&schema, &Datum::Long(-1));
    assert_eq!(bytes, vec![0x01]);
    assert_eq!(decode_datum(&schema, &bytes), Datum::Long(-1));
}

#[test]
fn test_null_is_empty() {
    let schema = parse_schema(r#""null""#).unwrap();
    assert!(encode_datum(&schema, &Datum::Null).is_empty());
}

#[test]
fn test_union_prefixes_branch_index() {
    let schema = parse_schema(r#"["null", "string"]"#).unwrap();
    let datum = Datum::Union(1, Box::new(Datum::String("x".to_string())));
    let bytes = encode_datum(&schema, &datum);
    // branch 1 (zigzag 2), length 1 (zigzag 2), 'x'
    assert_eq!(bytes, vec![0x02, 0x02, b'x']);
}

// ============================================================================
// Round-trips
// ============================================================================

#[test]
fn test_primitive_round_trips() {
    round_trip(&parse_schema(r#""boolean""#).unwrap(), Datum::Boolean(true));
    round_trip(&parse_schema(r#""int""#).unwrap(), Datum::Int(i32::MIN));
    round_trip(&parse_schema(r#""long""#).unwrap(), Datum::Long(i64::MAX));
    round_trip(&parse_schema(r#""float""#).unwrap(), Datum::Float(-0.5));
    round_trip(&parse_schema(r#""double""#).unwrap(), Datum::Double(1e300));
    round_trip(
        &parse_schema(r#""string""#).unwrap(),
        Datum::String("grüße".to_string()),
    );
    round_trip(
        &parse_schema(r#""bytes""#).unwrap(),
        Datum::Bytes(vec![0, 1, 255]),
    );
}

#[test]
fn test_record_round_trip() {
    let schema = parse_schema(
        r#"{
            "type": "record",
            "name": "Person",
            "fields": [
                {"name": "name", "type": "string"},
                {"name": "age", "type": "int"},
                {"name": "email", "type": ["null", "string"]}
            ]
        }"#,
    )
    .unwrap();
    let mut rec = RecordDatum::new(&schema).unwrap();
    *rec.field_mut("name").unwrap() = Datum::String("ada".to_string());
    *rec.field_mut("age").unwrap() = Datum::Int(36);
    *rec.field_mut("email").unwrap() =
        Datum::Union(1, Box::new(Datum::String("ada@example.org".to_string())));
    round_trip(&schema, Datum::Record(rec));
}

#[test]
fn test_array_and_map_round_trip() {
    let schema = parse_schema(r#"{"type": "array", "items": "long"}"#).unwrap();
    round_trip(
        &schema,
        Datum::Array(vec![Datum::Long(1), Datum::Long(-2), Datum::Long(3)]),
    );
    round_trip(&schema, Datum::Array(vec![]));

    let schema = parse_schema(r#"{"type": "map", "values": "string"}"#).unwrap();
    round_trip(
        &schema,
        Datum::Map(vec![
            ("a".to_string(), Datum::String("1".to_string())),
            ("b".to_string(), Datum::String("2".to_string())),
        ]),
    );
}

#[test]
fn test_enum_and_fixed_round_trip() {
    let schema =
        parse_schema(r#"{"type": "enum", "name": "Suit", "symbols": ["H", "S", "D", "C"]}"#)
            .unwrap();
    round_trip(&schema, Datum::Enum(3));

    let schema = parse_schema(r#"{"type": "fixed", "name": "MD5", "size": 4}"#).unwrap();
    round_trip(&schema, Datum::Fixed(vec![9, 8, 7, 6]));
}

#[test]
fn test_recursive_tree_round_trip() {
    let schema = parse_schema(
        r#"{
            "type": "record",
            "name": "Node",
            "fields": [
                {"name": "label", "type": "string"},
                {"name": "children", "type": {"type": "array", "items": "Node"}}
            ]
        }"#,
    )
    .unwrap();

    let node = |label: &str, children: Vec<Datum>| {
        let mut rec = RecordDatum::new(&schema).unwrap();
        *rec.field_mut("label").unwrap() = Datum::String(label.to_string());
        *rec.field_mut("children").unwrap() = Datum::Array(children);
        Datum::Record(rec)
    };

    let tree = node(
        "root",
        vec![
            node("left", vec![node("leaf", vec![])]),
            node("right", vec![]),
        ],
    );
    round_trip(&schema, tree);
}

// ============================================================================
// Grammar strictness
// ============================================================================

#[test]
fn test_wrong_leaf_call_fails() {
    let schema = parse_schema(r#""string""#).unwrap();
    let mut enc = ValidatingEncoder::new(&schema, BinaryEncoder::buffered()).unwrap();
    assert!(matches!(
        enc.write_long(1),
        Err(CodecError::GrammarViolation(_))
    ));
}

#[test]
fn test_extra_field_write_fails() {
    let schema = parse_schema(
        r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
    )
    .unwrap();
    let mut enc = ValidatingEncoder::new(&schema, BinaryEncoder::buffered()).unwrap();
    enc.write_int(1).unwrap();
    // The record is complete; a second datum may start, but only with
    // the declared field type.
    assert!(matches!(
        enc.write_string("oops"),
        Err(CodecError::GrammarViolation(_))
    ));
}

#[test]
fn test_consecutive_datums_share_a_codec() {
    let schema = parse_schema(r#""int""#).unwrap();
    let mut enc = ValidatingEncoder::new(&schema, BinaryEncoder::buffered()).unwrap();
    enc.write_int(1).unwrap();
    enc.write_int(2).unwrap();
    let bytes = enc.into_inner().into_bytes();

    let mut dec = ValidatingDecoder::new(&schema, BinaryDecoder::from_slice(&bytes)).unwrap();
    assert_eq!(dec.read_int().unwrap(), 1);
    assert_eq!(dec.read_int().unwrap(), 2);
}

#[test]
fn test_skip_string_field() {
    let schema = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "skipme", "type": "string"},
                {"name": "keep", "type": "long"}
            ]
        }"#,
    )
    .unwrap();
    let mut rec = RecordDatum::new(&schema).unwrap();
    *rec.field_mut("skipme").unwrap() = Datum::String("ignored".to_string());
    *rec.field_mut("keep").unwrap() = Datum::Long(11);
    let bytes = encode_datum(&schema, &Datum::Record(rec));

    let mut dec = ValidatingDecoder::new(&schema, BinaryDecoder::from_slice(&bytes)).unwrap();
    dec.skip_string().unwrap();
    assert_eq!(dec.read_long().unwrap(), 11);
}

// ============================================================================
// JSON codec
// ============================================================================

fn json_round_trip(schema: &Arc<Schema>, datum: Datum) -> String {
    let mut enc = JsonEncoder::new(schema).unwrap();
    write_datum(&mut enc, &datum).unwrap();
    let text = enc.into_string().unwrap();

    let mut dec = JsonDecoder::new(schema, &text).unwrap();
    assert_eq!(read_datum(&mut dec, schema).unwrap(), datum);
    dec.finish().unwrap();
    text
}

#[test]
fn test_json_record_round_trip() {
    let schema = parse_schema(
        r#"{
            "type": "record",
            "name": "P",
            "fields": [
                {"name": "x", "type": "long"},
                {"name": "tags", "type": {"type": "array", "items": "string"}}
            ]
        }"#,
    )
    .unwrap();
    let mut rec = RecordDatum::new(&schema).unwrap();
    *rec.field_mut("x").unwrap() = Datum::Long(-3);
    *rec.field_mut("tags").unwrap() = Datum::Array(vec![
        Datum::String("a".to_string()),
        Datum::String("b".to_string()),
    ]);
    let text = json_round_trip(&schema, Datum::Record(rec));
    assert_eq!(text, r#"{"x":-3,"tags":["a","b"]}"#);
}

#[test]
fn test_json_union_wrapper_form() {
    let schema = parse_schema(r#"["null", "long"]"#).unwrap();
    let text = json_round_trip(&schema, Datum::Union(1, Box::new(Datum::Long(5))));
    assert_eq!(text, r#"{"long":5}"#);
    let text = json_round_trip(&schema, Datum::Union(0, Box::new(Datum::Null)));
    assert_eq!(text, "null");
}

#[test]
fn test_json_map_round_trip() {
    let schema = parse_schema(r#"{"type": "map", "values": "int"}"#).unwrap();
    json_round_trip(
        &schema,
        Datum::Map(vec![
            ("one".to_string(), Datum::Int(1)),
            ("two".to_string(), Datum::Int(2)),
        ]),
    );
}

#[test]
fn test_json_nested_record_in_array() {
    let schema = parse_schema(
        r#"{
            "type": "array",
            "items": {
                "type": "record",
                "name": "Pt",
                "fields": [{"name": "x", "type": "int"}]
            }
        }"#,
    )
    .unwrap();
    let point = |x: i32| {
        let Schema::Array(items) = &*schema else {
            unreachable!();
        };
        let mut rec = RecordDatum::new(items).unwrap();
        *rec.field_mut("x").unwrap() = Datum::Int(x);
        Datum::Record(rec)
    };
    let text = json_round_trip(&schema, Datum::Array(vec![point(1), point(2)]));
    assert_eq!(text, r#"[{"x":1},{"x":2}]"#);
}

#[test]
fn test_json_rejects_misordered_fields() {
    let schema = parse_schema(
        r#"{
            "type": "record",
            "name": "P",
            "fields": [
                {"name": "a", "type": "int"},
                {"name": "b", "type": "int"}
            ]
        }"#,
    )
    .unwrap();
    let mut dec = JsonDecoder::new(&schema, r#"{"b":2,"a":1}"#).unwrap();
    assert!(matches!(
        dec.read_int(),
        Err(CodecError::GrammarViolation(_))
    ));
}
