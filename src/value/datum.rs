//! Generic datum values.
//!
//! A [`Datum`] carries any Avro value as a native tagged enum whose tag
//! mirrors the schema type. Records keep a back-reference to their schema
//! node so fields can be addressed by name. Values are constructed from a
//! schema (every field default-initialized for its type) and only the held
//! value may change afterwards; a datum never changes its tag in place.

use std::sync::Arc;

use serde_json::Value;

use crate::error::SchemaError;
use crate::schema::{RecordSchema, Schema};

/// A generic Avro value.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// Byte array
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Fixed-size byte array
    Fixed(Vec<u8>),
    /// Enum ordinal
    Enum(usize),
    /// Array of values
    Array(Vec<Datum>),
    /// Map with string keys, in insertion order
    Map(Vec<(String, Datum)>),
    /// Union branch index and value
    Union(usize, Box<Datum>),
    /// Record with per-field values
    Record(RecordDatum),
}

/// A record value bound to its schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDatum {
    schema: Arc<Schema>,
    fields: Vec<Datum>,
}

impl RecordDatum {
    /// Construct a record with every field default-initialized.
    ///
    /// # Errors
    /// `SchemaError::InvalidSchema` if `schema` is not a record.
    pub fn new(schema: &Arc<Schema>) -> Result<Self, SchemaError> {
        let rec = record_schema(schema)?;
        let fields = rec
            .fields
            .iter()
            .map(|f| Datum::from_schema(&f.schema))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            schema: Arc::clone(schema),
            fields,
        })
    }

    /// Construct a record from pre-built field values, one per schema
    /// field in declaration order.
    pub fn from_fields(schema: &Arc<Schema>, fields: Vec<Datum>) -> Result<Self, SchemaError> {
        let rec = record_schema(schema)?;
        if rec.fields.len() != fields.len() {
            return Err(SchemaError::InvalidSchema(format!(
                "record '{}' has {} fields, got {} values",
                rec.name,
                rec.fields.len(),
                fields.len()
            )));
        }
        Ok(Self {
            schema: Arc::clone(schema),
            fields,
        })
    }

    /// The record's schema node.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Field value by name.
    pub fn field(&self, name: &str) -> Option<&Datum> {
        let rec = record_schema(&self.schema).ok()?;
        Some(&self.fields[rec.field_index(name)?])
    }

    /// Mutable field value by name.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Datum> {
        let rec = record_schema(&self.schema).ok()?;
        let index = rec.field_index(name)?;
        Some(&mut self.fields[index])
    }

    /// Field value by position.
    pub fn field_at(&self, index: usize) -> &Datum {
        &self.fields[index]
    }

    /// Mutable field value by position.
    pub fn field_at_mut(&mut self, index: usize) -> &mut Datum {
        &mut self.fields[index]
    }

    /// All field values in declaration order.
    pub fn fields(&self) -> &[Datum] {
        &self.fields
    }
}

fn record_schema(schema: &Arc<Schema>) -> Result<&RecordSchema, SchemaError> {
    match &**schema {
        Schema::Record(rec) => Ok(rec),
        other => Err(SchemaError::InvalidSchema(format!(
            "expected a record schema, got {}",
            other.union_label()
        ))),
    }
}

impl Datum {
    /// Default-construct a value for `schema`: zero for numbers, empty
    /// for strings and containers, ordinal zero for enums, the first
    /// branch for unions, zero-filled bytes for fixed.
    pub fn from_schema(schema: &Arc<Schema>) -> Result<Datum, SchemaError> {
        let schema = Schema::follow(schema)?;
        Ok(match &*schema {
            Schema::Null => Datum::Null,
            Schema::Boolean => Datum::Boolean(false),
            Schema::Int => Datum::Int(0),
            Schema::Long => Datum::Long(0),
            Schema::Float => Datum::Float(0.0),
            Schema::Double => Datum::Double(0.0),
            Schema::Bytes => Datum::Bytes(Vec::new()),
            Schema::String => Datum::String(String::new()),
            Schema::Fixed(f) => Datum::Fixed(vec![0; f.size]),
            Schema::Enum(_) => Datum::Enum(0),
            Schema::Array(_) => Datum::Array(Vec::new()),
            Schema::Map(_) => Datum::Map(Vec::new()),
            Schema::Union(branches) => {
                let first = branches.first().ok_or_else(|| {
                    SchemaError::InvalidSchema("union has no branches".to_string())
                })?;
                Datum::Union(0, Box::new(Datum::from_schema(first)?))
            }
            Schema::Record(_) => Datum::Record(RecordDatum::new(&schema)?),
            Schema::Link(_) => unreachable!("links are followed above"),
        })
    }

    /// The type tag as a display label.
    pub fn type_label(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Boolean(_) => "boolean",
            Datum::Int(_) => "int",
            Datum::Long(_) => "long",
            Datum::Float(_) => "float",
            Datum::Double(_) => "double",
            Datum::Bytes(_) => "bytes",
            Datum::String(_) => "string",
            Datum::Fixed(_) => "fixed",
            Datum::Enum(_) => "enum",
            Datum::Array(_) => "array",
            Datum::Map(_) => "map",
            Datum::Union(_, _) => "union",
            Datum::Record(_) => "record",
        }
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Datum::Boolean(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Int(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Long(v)
    }
}

impl From<f32> for Datum {
    fn from(v: f32) -> Self {
        Datum::Float(v)
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Datum::Double(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::String(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::String(v)
    }
}

impl From<Vec<u8>> for Datum {
    fn from(v: Vec<u8>) -> Self {
        Datum::Bytes(v)
    }
}

/// Interpret a JSON value against a schema, as used for record field
/// defaults.
///
/// Bytes and fixed defaults are strings of code-point-valued characters;
/// enum defaults are symbol names; a union default applies to the first
/// branch.
pub fn datum_from_json(schema: &Arc<Schema>, json: &Value) -> Result<Datum, SchemaError> {
    let schema = Schema::follow(schema)?;
    let mismatch = |expected: &str| {
        SchemaError::InvalidDefault(format!("expected {} value, got {}", expected, json))
    };
    match &*schema {
        Schema::Null => match json {
            Value::Null => Ok(Datum::Null),
            _ => Err(mismatch("null")),
        },
        Schema::Boolean => match json {
            Value::Bool(b) => Ok(Datum::Boolean(*b)),
            _ => Err(mismatch("boolean")),
        },
        Schema::Int => {
            let v = json.as_i64().ok_or_else(|| mismatch("int"))?;
            if v < i32::MIN as i64 || v > i32::MAX as i64 {
                return Err(SchemaError::InvalidDefault(format!(
                    "{} out of range for int",
                    v
                )));
            }
            Ok(Datum::Int(v as i32))
        }
        Schema::Long => Ok(Datum::Long(json.as_i64().ok_or_else(|| mismatch("long"))?)),
        Schema::Float => Ok(Datum::Float(
            json.as_f64().ok_or_else(|| mismatch("float"))? as f32,
        )),
        Schema::Double => Ok(Datum::Double(
            json.as_f64().ok_or_else(|| mismatch("double"))?,
        )),
        Schema::String => match json {
            Value::String(s) => Ok(Datum::String(s.clone())),
            _ => Err(mismatch("string")),
        },
        Schema::Bytes => match json {
            Value::String(s) => Ok(Datum::Bytes(codepoint_bytes(s)?)),
            _ => Err(mismatch("bytes")),
        },
        Schema::Fixed(f) => match json {
            Value::String(s) => {
                let bytes = codepoint_bytes(s)?;
                if bytes.len() != f.size {
                    return Err(SchemaError::InvalidDefault(format!(
                        "fixed '{}' needs {} bytes, default has {}",
                        f.name,
                        f.size,
                        bytes.len()
                    )));
                }
                Ok(Datum::Fixed(bytes))
            }
            _ => Err(mismatch("fixed")),
        },
        Schema::Enum(e) => match json {
            Value::String(s) => e
                .symbol_index(s)
                .map(Datum::Enum)
                .ok_or_else(|| {
                    SchemaError::InvalidDefault(format!(
                        "'{}' is not a symbol of enum '{}'",
                        s, e.name
                    ))
                }),
            _ => Err(mismatch("enum symbol")),
        },
        Schema::Array(items) => match json {
            Value::Array(values) => {
                let parsed = values
                    .iter()
                    .map(|v| datum_from_json(items, v))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Datum::Array(parsed))
            }
            _ => Err(mismatch("array")),
        },
        Schema::Map(values) => match json {
            Value::Object(entries) => {
                let parsed = entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), datum_from_json(values, v)?)))
                    .collect::<Result<Vec<_>, SchemaError>>()?;
                Ok(Datum::Map(parsed))
            }
            _ => Err(mismatch("map")),
        },
        Schema::Union(branches) => {
            // Defaults always describe the first branch.
            let first = branches
                .first()
                .ok_or_else(|| SchemaError::InvalidSchema("union has no branches".to_string()))?;
            Ok(Datum::Union(0, Box::new(datum_from_json(first, json)?)))
        }
        Schema::Record(rec) => {
            let Value::Object(entries) = json else {
                return Err(mismatch("record"));
            };
            let mut fields = Vec::with_capacity(rec.fields.len());
            for field in &rec.fields {
                let value = match entries.get(&field.name) {
                    Some(v) => datum_from_json(&field.schema, v)?,
                    None => match &field.default {
                        Some(d) => datum_from_json(&field.schema, d)?,
                        None => Datum::from_schema(&field.schema)?,
                    },
                };
                fields.push(value);
            }
            Ok(Datum::Record(RecordDatum::from_fields(&schema, fields)?))
        }
        Schema::Link(_) => unreachable!("links are followed above"),
    }
}

fn codepoint_bytes(s: &str) -> Result<Vec<u8>, SchemaError> {
    s.chars()
        .map(|c| {
            let code = c as u32;
            u8::try_from(code).map_err(|_| {
                SchemaError::InvalidDefault(format!(
                    "code point U+{:04X} does not fit in a byte",
                    code
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;
    use serde_json::json;

    #[test]
    fn test_default_construction() {
        let schema = parse_schema(
            r#"{
                "type": "record",
                "name": "R",
                "fields": [
                    {"name": "n", "type": "long"},
                    {"name": "s", "type": "string"},
                    {"name": "u", "type": ["null", "int"]}
                ]
            }"#,
        )
        .unwrap();
        let Datum::Record(rec) = Datum::from_schema(&schema).unwrap() else {
            panic!("expected record");
        };
        assert_eq!(rec.field("n"), Some(&Datum::Long(0)));
        assert_eq!(rec.field("s"), Some(&Datum::String(String::new())));
        assert_eq!(
            rec.field("u"),
            Some(&Datum::Union(0, Box::new(Datum::Null)))
        );
    }

    #[test]
    fn test_field_mutation() {
        let schema = parse_schema(
            r#"{"type": "record", "name": "R", "fields": [{"name": "n", "type": "long"}]}"#,
        )
        .unwrap();
        let Datum::Record(mut rec) = Datum::from_schema(&schema).unwrap() else {
            panic!("expected record");
        };
        *rec.field_mut("n").unwrap() = Datum::Long(99);
        assert_eq!(rec.field_at(0), &Datum::Long(99));
    }

    #[test]
    fn test_json_default_int() {
        let schema = parse_schema(r#""int""#).unwrap();
        assert_eq!(
            datum_from_json(&schema, &json!(100)).unwrap(),
            Datum::Int(100)
        );
        assert!(datum_from_json(&schema, &json!("x")).is_err());
    }

    #[test]
    fn test_json_default_union_uses_first_branch() {
        let schema = parse_schema(r#"["null", "string"]"#).unwrap();
        assert_eq!(
            datum_from_json(&schema, &json!(null)).unwrap(),
            Datum::Union(0, Box::new(Datum::Null))
        );
        // A string default does not match the first (null) branch.
        assert!(datum_from_json(&schema, &json!("x")).is_err());
    }

    #[test]
    fn test_json_default_bytes_codepoints() {
        let schema = parse_schema(r#""bytes""#).unwrap();
        assert_eq!(
            datum_from_json(&schema, &json!("\u{00}\u{ff}")).unwrap(),
            Datum::Bytes(vec![0x00, 0xFF])
        );
    }

    #[test]
    fn test_json_default_enum_by_name() {
        let schema =
            parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["A", "B"]}"#).unwrap();
        assert_eq!(
            datum_from_json(&schema, &json!("B")).unwrap(),
            Datum::Enum(1)
        );
        assert!(datum_from_json(&schema, &json!("C")).is_err());
    }
}
