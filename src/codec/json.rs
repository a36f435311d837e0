//! Avro JSON codec.
//!
//! The same leaf operations as the binary codec, expressed over JSON
//! tokens and driven by the JSON grammar: records become objects (the
//! grammar's record hooks emit and verify braces and field names), maps
//! become objects with free-form keys, enums are symbol-name strings,
//! bytes and fixed are strings of code-point-valued characters, and
//! non-null union branches are wrapped as `{"<branch-name>": value}`.
//! Non-finite floats are encoded as the string literals `"NaN"`,
//! `"Infinity"`, and `"-Infinity"`.
//!
//! Tokenization of the document is delegated to `serde_json` (with key
//! order preserved); this module only walks the resulting token stream.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;

use super::{Decoder, Encoder};
use crate::error::{CodecError, SchemaError};
use crate::grammar::{json_grammar, Advance, Hook, Parser, Terminal};
use crate::schema::Schema;

/// One JSON document token.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    Str(String),
    /// An object key (record field name or map key).
    Key(String),
    ArrayStart,
    ArrayEnd,
    ObjectStart,
    ObjectEnd,
}

fn tokenize(value: &Value, out: &mut Vec<Token>) {
    match value {
        Value::Null => out.push(Token::Null),
        Value::Bool(b) => out.push(Token::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push(Token::Long(i));
            } else {
                out.push(Token::Double(n.as_f64().unwrap_or(f64::NAN)));
            }
        }
        Value::String(s) => out.push(Token::Str(s.clone())),
        Value::Array(items) => {
            out.push(Token::ArrayStart);
            for item in items {
                tokenize(item, out);
            }
            out.push(Token::ArrayEnd);
        }
        Value::Object(entries) => {
            out.push(Token::ObjectStart);
            for (key, value) in entries {
                out.push(Token::Key(key.clone()));
                tokenize(value, out);
            }
            out.push(Token::ObjectEnd);
        }
    }
}

/// Decoder for the Avro JSON encoding.
pub struct JsonDecoder {
    tokens: VecDeque<Token>,
    parser: Parser,
}

impl JsonDecoder {
    /// Decode `text` as a datum of `schema`.
    pub fn new(schema: &Arc<Schema>, text: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CodecError::InvalidData(format!("Invalid JSON: {}", e)))?;
        let grammar = json_grammar(schema)?;
        let mut tokens = Vec::new();
        tokenize(&value, &mut tokens);
        Ok(Self {
            tokens: tokens.into(),
            parser: Parser::new(grammar),
        })
    }

    /// Process trailing structure hooks and verify the document was
    /// consumed completely.
    pub fn finish(&mut self) -> Result<(), CodecError> {
        self.drain()?;
        if let Some(token) = self.tokens.front() {
            return Err(CodecError::InvalidData(format!(
                "trailing content after datum: {:?}",
                token
            )));
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token, CodecError> {
        self.tokens.pop_front().ok_or(CodecError::UnexpectedEof)
    }

    fn peek(&self) -> Result<&Token, CodecError> {
        self.tokens.front().ok_or(CodecError::UnexpectedEof)
    }

    fn expect_object_start(&mut self) -> Result<(), CodecError> {
        match self.next_token()? {
            Token::ObjectStart => Ok(()),
            other => Err(CodecError::InvalidData(format!(
                "expected an object, got {:?}",
                other
            ))),
        }
    }

    fn expect_object_end(&mut self) -> Result<(), CodecError> {
        match self.next_token()? {
            Token::ObjectEnd => Ok(()),
            other => Err(CodecError::InvalidData(format!(
                "expected the object to end, got {:?}",
                other
            ))),
        }
    }

    fn apply_hook(&mut self, hook: Hook) -> Result<(), CodecError> {
        match hook {
            Hook::RecordStart => self.expect_object_start(),
            Hook::RecordEnd | Hook::UnionEnd => self.expect_object_end(),
            Hook::FieldName(name) => match self.next_token()? {
                Token::Key(k) if k == *name => Ok(()),
                Token::Key(k) => Err(CodecError::GrammarViolation(format!(
                    "expected field '{}', document has '{}'",
                    name, k
                ))),
                other => Err(CodecError::InvalidData(format!(
                    "expected field '{}', got {:?}",
                    name, other
                ))),
            },
        }
    }

    fn advance(&mut self, expected: Terminal) -> Result<(), CodecError> {
        loop {
            match self.parser.advance(expected)? {
                Advance::Matched(_) => return Ok(()),
                Advance::Hook(hook) => self.apply_hook(hook)?,
                other => {
                    return Err(CodecError::GrammarViolation(format!(
                        "unexpected parser action {:?} in JSON decoding",
                        other
                    )));
                }
            }
        }
    }

    fn drain(&mut self) -> Result<(), CodecError> {
        while let Some(action) = self.parser.process_implicit()? {
            match action {
                Advance::Hook(hook) => self.apply_hook(hook)?,
                other => {
                    return Err(CodecError::GrammarViolation(format!(
                        "unexpected parser action {:?} in JSON decoding",
                        other
                    )));
                }
            }
        }
        Ok(())
    }

    fn container_count(&mut self, end_token: Token, end: Terminal) -> Result<u64, CodecError> {
        if *self.peek()? == end_token {
            self.next_token()?;
            self.parser.pop_repeater()?;
            self.advance(end)?;
            Ok(0)
        } else {
            self.parser.set_repeat_count(1)?;
            Ok(1)
        }
    }

    /// Consume tokens until the already-opened composite closes.
    fn skip_composite(&mut self) -> Result<(), CodecError> {
        let mut level = 0usize;
        loop {
            match self.next_token()? {
                Token::ArrayStart | Token::ObjectStart => level += 1,
                Token::ArrayEnd | Token::ObjectEnd => {
                    if level == 0 {
                        return Ok(());
                    }
                    level -= 1;
                }
                _ => {}
            }
        }
    }

    fn read_number(&mut self) -> Result<f64, CodecError> {
        match self.next_token()? {
            Token::Long(v) => Ok(v as f64),
            Token::Double(v) => Ok(v),
            Token::Str(s) => match s.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(CodecError::InvalidData(format!(
                    "expected a number, got string {:?}",
                    other
                ))),
            },
            other => Err(CodecError::InvalidData(format!(
                "expected a number, got {:?}",
                other
            ))),
        }
    }

    fn read_codepoint_string(&mut self) -> Result<Vec<u8>, CodecError> {
        match self.next_token()? {
            Token::Str(s) => s
                .chars()
                .map(|c| {
                    u8::try_from(c as u32).map_err(|_| {
                        CodecError::InvalidData(format!(
                            "code point U+{:04X} does not fit in a byte",
                            c as u32
                        ))
                    })
                })
                .collect(),
            other => Err(CodecError::InvalidData(format!(
                "expected a string of byte code points, got {:?}",
                other
            ))),
        }
    }
}

impl Decoder for JsonDecoder {
    fn read_null(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::Null)?;
        match self.next_token()? {
            Token::Null => Ok(()),
            other => Err(CodecError::InvalidData(format!(
                "expected null, got {:?}",
                other
            ))),
        }
    }

    fn read_bool(&mut self) -> Result<bool, CodecError> {
        self.advance(Terminal::Boolean)?;
        match self.next_token()? {
            Token::Bool(b) => Ok(b),
            other => Err(CodecError::InvalidData(format!(
                "expected a boolean, got {:?}",
                other
            ))),
        }
    }

    fn read_int(&mut self) -> Result<i32, CodecError> {
        self.advance(Terminal::Int)?;
        match self.next_token()? {
            Token::Long(v) if v >= i32::MIN as i64 && v <= i32::MAX as i64 => Ok(v as i32),
            Token::Long(v) => Err(CodecError::OutOfRange(format!(
                "{} does not fit in int",
                v
            ))),
            other => Err(CodecError::InvalidData(format!(
                "expected an integer, got {:?}",
                other
            ))),
        }
    }

    fn read_long(&mut self) -> Result<i64, CodecError> {
        self.advance(Terminal::Long)?;
        match self.next_token()? {
            Token::Long(v) => Ok(v),
            other => Err(CodecError::InvalidData(format!(
                "expected an integer, got {:?}",
                other
            ))),
        }
    }

    fn read_float(&mut self) -> Result<f32, CodecError> {
        self.advance(Terminal::Float)?;
        Ok(self.read_number()? as f32)
    }

    fn read_double(&mut self) -> Result<f64, CodecError> {
        self.advance(Terminal::Double)?;
        self.read_number()
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        self.advance(Terminal::String)?;
        match self.next_token()? {
            Token::Str(s) | Token::Key(s) => Ok(s),
            other => Err(CodecError::InvalidData(format!(
                "expected a string, got {:?}",
                other
            ))),
        }
    }

    fn skip_string(&mut self) -> Result<(), CodecError> {
        self.read_string()?;
        Ok(())
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        self.advance(Terminal::Bytes)?;
        self.read_codepoint_string()
    }

    fn skip_bytes(&mut self) -> Result<(), CodecError> {
        self.read_bytes()?;
        Ok(())
    }

    fn read_fixed(&mut self, n: usize) -> Result<Vec<u8>, CodecError> {
        self.advance(Terminal::Fixed)?;
        self.parser.assert_size(n)?;
        let bytes = self.read_codepoint_string()?;
        if bytes.len() != n {
            return Err(CodecError::InvalidData(format!(
                "fixed of size {} encoded with {} bytes",
                n,
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    fn skip_fixed(&mut self, n: usize) -> Result<(), CodecError> {
        self.read_fixed(n)?;
        Ok(())
    }

    fn read_enum(&mut self) -> Result<usize, CodecError> {
        self.advance(Terminal::Enum)?;
        let labels = self.parser.enum_labels()?;
        match self.next_token()? {
            Token::Str(s) => labels
                .iter()
                .position(|l| **l == *s)
                .ok_or_else(|| {
                    CodecError::InvalidData(format!("'{}' is not an enum symbol", s))
                }),
            other => Err(CodecError::InvalidData(format!(
                "expected an enum symbol string, got {:?}",
                other
            ))),
        }
    }

    fn array_start(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::ArrayStart)?;
        match self.next_token()? {
            Token::ArrayStart => {}
            other => {
                return Err(CodecError::InvalidData(format!(
                    "expected an array, got {:?}",
                    other
                )));
            }
        }
        self.container_count(Token::ArrayEnd, Terminal::ArrayEnd)
    }

    fn array_next(&mut self) -> Result<u64, CodecError> {
        self.drain()?;
        self.container_count(Token::ArrayEnd, Terminal::ArrayEnd)
    }

    fn skip_array(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::ArrayStart)?;
        match self.next_token()? {
            Token::ArrayStart => {}
            other => {
                return Err(CodecError::InvalidData(format!(
                    "expected an array, got {:?}",
                    other
                )));
            }
        }
        self.skip_composite()?;
        self.parser.take_repeater()?;
        self.advance(Terminal::ArrayEnd)?;
        Ok(0)
    }

    fn map_start(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::MapStart)?;
        self.expect_object_start()?;
        self.container_count(Token::ObjectEnd, Terminal::MapEnd)
    }

    fn map_next(&mut self) -> Result<u64, CodecError> {
        self.drain()?;
        self.container_count(Token::ObjectEnd, Terminal::MapEnd)
    }

    fn skip_map(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::MapStart)?;
        self.expect_object_start()?;
        self.skip_composite()?;
        self.parser.take_repeater()?;
        self.advance(Terminal::MapEnd)?;
        Ok(0)
    }

    fn read_union_index(&mut self) -> Result<usize, CodecError> {
        self.advance(Terminal::Union)?;
        let labels = self.parser.alternative_labels()?;
        let branch = if matches!(self.peek()?, Token::Null) {
            // The bare null literal selects the null branch; the token
            // itself is consumed by the following read_null.
            labels.iter().position(|l| &**l == "null").ok_or_else(|| {
                CodecError::InvalidData("null for a union without a null branch".to_string())
            })?
        } else {
            self.expect_object_start()?;
            match self.next_token()? {
                Token::Key(name) => labels
                    .iter()
                    .position(|l| **l == *name)
                    .ok_or_else(|| {
                        CodecError::InvalidData(format!("unknown union branch '{}'", name))
                    })?,
                other => {
                    return Err(CodecError::InvalidData(format!(
                        "expected a union branch name, got {:?}",
                        other
                    )));
                }
            }
        };
        self.parser.select_branch(branch)?;
        Ok(branch)
    }
}

/// JSON text writer with comma and key bookkeeping.
#[derive(Debug, Default)]
struct JsonWriter {
    out: String,
    stack: Vec<Frame>,
}

#[derive(Debug)]
enum Frame {
    Array { first: bool },
    Object { first: bool, expect_key: bool },
}

fn escape(s: &str) -> Result<String, CodecError> {
    serde_json::to_string(s).map_err(|e| CodecError::InvalidData(e.to_string()))
}

impl JsonWriter {
    fn value_prelude(&mut self) -> Result<(), CodecError> {
        match self.stack.last_mut() {
            Some(Frame::Array { first }) => {
                if !*first {
                    self.out.push(',');
                }
                *first = false;
                Ok(())
            }
            Some(Frame::Object { expect_key, .. }) => {
                if *expect_key {
                    Err(CodecError::InvalidData(
                        "value written where an object key is expected".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    fn finish_value(&mut self) {
        if let Some(Frame::Object { expect_key, .. }) = self.stack.last_mut() {
            *expect_key = true;
        }
    }

    fn scalar(&mut self, text: &str) -> Result<(), CodecError> {
        self.value_prelude()?;
        self.out.push_str(text);
        self.finish_value();
        Ok(())
    }

    fn key(&mut self, k: &str) -> Result<(), CodecError> {
        match self.stack.last_mut() {
            Some(Frame::Object { first, expect_key }) => {
                if !*expect_key {
                    return Err(CodecError::InvalidData(
                        "key written where a value is expected".to_string(),
                    ));
                }
                if !*first {
                    self.out.push(',');
                }
                *first = false;
                *expect_key = false;
            }
            _ => {
                return Err(CodecError::InvalidData(
                    "key written outside an object".to_string(),
                ));
            }
        }
        let escaped = escape(k)?;
        self.out.push_str(&escaped);
        self.out.push(':');
        Ok(())
    }

    fn string(&mut self, s: &str) -> Result<(), CodecError> {
        // At key position a string is the key (map entries).
        if let Some(Frame::Object {
            expect_key: true, ..
        }) = self.stack.last()
        {
            return self.key(s);
        }
        let escaped = escape(s)?;
        self.scalar(&escaped)
    }

    fn begin_array(&mut self) -> Result<(), CodecError> {
        self.value_prelude()?;
        self.out.push('[');
        self.stack.push(Frame::Array { first: true });
        Ok(())
    }

    fn end_array(&mut self) -> Result<(), CodecError> {
        match self.stack.pop() {
            Some(Frame::Array { .. }) => {
                self.out.push(']');
                self.finish_value();
                Ok(())
            }
            _ => Err(CodecError::InvalidData(
                "array closed while not in an array".to_string(),
            )),
        }
    }

    fn begin_object(&mut self) -> Result<(), CodecError> {
        self.value_prelude()?;
        self.out.push('{');
        self.stack.push(Frame::Object {
            first: true,
            expect_key: true,
        });
        Ok(())
    }

    fn end_object(&mut self) -> Result<(), CodecError> {
        match self.stack.pop() {
            Some(Frame::Object { .. }) => {
                self.out.push('}');
                self.finish_value();
                Ok(())
            }
            _ => Err(CodecError::InvalidData(
                "object closed while not in an object".to_string(),
            )),
        }
    }
}

/// Encoder for the Avro JSON encoding.
pub struct JsonEncoder {
    writer: JsonWriter,
    parser: Parser,
}

impl JsonEncoder {
    /// Encode datums of `schema` into a JSON document.
    pub fn new(schema: &Arc<Schema>) -> Result<Self, SchemaError> {
        let grammar = json_grammar(schema)?;
        Ok(Self {
            writer: JsonWriter::default(),
            parser: Parser::new(grammar),
        })
    }

    /// Finish the document and return its text.
    pub fn into_string(mut self) -> Result<String, CodecError> {
        self.drain()?;
        Ok(self.writer.out)
    }

    fn apply_hook(&mut self, hook: Hook) -> Result<(), CodecError> {
        match hook {
            Hook::RecordStart => self.writer.begin_object(),
            Hook::RecordEnd | Hook::UnionEnd => self.writer.end_object(),
            Hook::FieldName(name) => self.writer.key(&name),
        }
    }

    fn advance(&mut self, expected: Terminal) -> Result<(), CodecError> {
        loop {
            match self.parser.advance(expected)? {
                Advance::Matched(_) => return Ok(()),
                Advance::Hook(hook) => self.apply_hook(hook)?,
                other => {
                    return Err(CodecError::GrammarViolation(format!(
                        "unexpected parser action {:?} in JSON encoding",
                        other
                    )));
                }
            }
        }
    }

    fn drain(&mut self) -> Result<(), CodecError> {
        while let Some(action) = self.parser.process_implicit()? {
            match action {
                Advance::Hook(hook) => self.apply_hook(hook)?,
                other => {
                    return Err(CodecError::GrammarViolation(format!(
                        "unexpected parser action {:?} in JSON encoding",
                        other
                    )));
                }
            }
        }
        Ok(())
    }

    fn write_f64(&mut self, v: f64) -> Result<(), CodecError> {
        if v.is_nan() {
            return self.writer.scalar("\"NaN\"");
        }
        if v == f64::INFINITY {
            return self.writer.scalar("\"Infinity\"");
        }
        if v == f64::NEG_INFINITY {
            return self.writer.scalar("\"-Infinity\"");
        }
        let number = serde_json::Number::from_f64(v)
            .ok_or_else(|| CodecError::InvalidData(format!("unencodable number {}", v)))?;
        self.writer.scalar(&number.to_string())
    }

    fn codepoint_string(bytes: &[u8]) -> String {
        bytes.iter().map(|b| char::from(*b)).collect()
    }
}

impl Encoder for JsonEncoder {
    fn write_null(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::Null)?;
        self.writer.scalar("null")
    }

    fn write_bool(&mut self, v: bool) -> Result<(), CodecError> {
        self.advance(Terminal::Boolean)?;
        self.writer.scalar(if v { "true" } else { "false" })
    }

    fn write_int(&mut self, v: i32) -> Result<(), CodecError> {
        self.advance(Terminal::Int)?;
        self.writer.scalar(&v.to_string())
    }

    fn write_long(&mut self, v: i64) -> Result<(), CodecError> {
        self.advance(Terminal::Long)?;
        self.writer.scalar(&v.to_string())
    }

    fn write_float(&mut self, v: f32) -> Result<(), CodecError> {
        self.advance(Terminal::Float)?;
        if v.is_nan() {
            return self.writer.scalar("\"NaN\"");
        }
        if v == f32::INFINITY {
            return self.writer.scalar("\"Infinity\"");
        }
        if v == f32::NEG_INFINITY {
            return self.writer.scalar("\"-Infinity\"");
        }
        let number = serde_json::Number::from_f64(v as f64)
            .ok_or_else(|| CodecError::InvalidData(format!("unencodable number {}", v)))?;
        self.writer.scalar(&number.to_string())
    }

    fn write_double(&mut self, v: f64) -> Result<(), CodecError> {
        self.advance(Terminal::Double)?;
        self.write_f64(v)
    }

    fn write_string(&mut self, v: &str) -> Result<(), CodecError> {
        self.advance(Terminal::String)?;
        self.writer.string(v)
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<(), CodecError> {
        self.advance(Terminal::Bytes)?;
        let text = Self::codepoint_string(v);
        let escaped = escape(&text)?;
        self.writer.scalar(&escaped)
    }

    fn write_fixed(&mut self, v: &[u8]) -> Result<(), CodecError> {
        self.advance(Terminal::Fixed)?;
        self.parser.assert_size(v.len())?;
        let text = Self::codepoint_string(v);
        let escaped = escape(&text)?;
        self.writer.scalar(&escaped)
    }

    fn write_enum(&mut self, ordinal: usize) -> Result<(), CodecError> {
        self.advance(Terminal::Enum)?;
        let labels = self.parser.enum_labels()?;
        let label = labels.get(ordinal).ok_or_else(|| {
            CodecError::OutOfRange(format!(
                "enum ordinal {} out of range ({} symbols)",
                ordinal,
                labels.len()
            ))
        })?;
        let escaped = escape(label)?;
        self.writer.scalar(&escaped)
    }

    fn array_start(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::ArrayStart)?;
        self.writer.begin_array()
    }

    fn array_end(&mut self) -> Result<(), CodecError> {
        self.drain()?;
        self.parser.pop_repeater()?;
        self.advance(Terminal::ArrayEnd)?;
        self.writer.end_array()
    }

    fn map_start(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::MapStart)?;
        self.writer.begin_object()
    }

    fn map_end(&mut self) -> Result<(), CodecError> {
        self.drain()?;
        self.parser.pop_repeater()?;
        self.advance(Terminal::MapEnd)?;
        self.writer.end_object()
    }

    fn set_item_count(&mut self, n: u64) -> Result<(), CodecError> {
        self.drain()?;
        self.parser.set_repeat_count(n)
    }

    fn start_item(&mut self) -> Result<(), CodecError> {
        self.drain()?;
        if !self.parser.at_repeater() {
            return Err(CodecError::GrammarViolation(
                "item started outside an array or map".to_string(),
            ));
        }
        Ok(())
    }

    fn write_union_index(&mut self, branch: usize) -> Result<(), CodecError> {
        self.advance(Terminal::Union)?;
        let labels = self.parser.alternative_labels()?;
        let label = labels
            .get(branch)
            .cloned()
            .ok_or_else(|| {
                CodecError::OutOfRange(format!(
                    "union branch {} out of range ({} branches)",
                    branch,
                    labels.len()
                ))
            })?;
        if &*label != "null" {
            self.writer.begin_object()?;
            self.writer.key(&label)?;
        }
        self.parser.select_branch(branch)
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        self.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    #[test]
    fn test_scalar_round_trip() {
        let schema = parse_schema(r#""long""#).unwrap();
        let mut enc = JsonEncoder::new(&schema).unwrap();
        enc.write_long(-42).unwrap();
        assert_eq!(enc.into_string().unwrap(), "-42");

        let mut dec = JsonDecoder::new(&schema, "-42").unwrap();
        assert_eq!(dec.read_long().unwrap(), -42);
        dec.finish().unwrap();
    }

    #[test]
    fn test_record_object() {
        let schema = parse_schema(
            r#"{
                "type": "record",
                "name": "P",
                "fields": [
                    {"name": "x", "type": "int"},
                    {"name": "y", "type": "string"}
                ]
            }"#,
        )
        .unwrap();
        let mut enc = JsonEncoder::new(&schema).unwrap();
        enc.write_int(3).unwrap();
        enc.write_string("hi").unwrap();
        let text = enc.into_string().unwrap();
        assert_eq!(text, r#"{"x":3,"y":"hi"}"#);

        let mut dec = JsonDecoder::new(&schema, &text).unwrap();
        assert_eq!(dec.read_int().unwrap(), 3);
        assert_eq!(dec.read_string().unwrap(), "hi");
        dec.finish().unwrap();
    }

    #[test]
    fn test_field_name_mismatch() {
        let schema = parse_schema(
            r#"{"type": "record", "name": "P", "fields": [{"name": "x", "type": "int"}]}"#,
        )
        .unwrap();
        let mut dec = JsonDecoder::new(&schema, r#"{"wrong":3}"#).unwrap();
        assert!(matches!(
            dec.read_int(),
            Err(CodecError::GrammarViolation(_))
        ));
    }

    #[test]
    fn test_int_range_error() {
        let schema = parse_schema(r#""int""#).unwrap();
        let mut dec = JsonDecoder::new(&schema, "4294967296").unwrap();
        assert!(matches!(dec.read_int(), Err(CodecError::OutOfRange(_))));
    }

    #[test]
    fn test_nonfinite_floats_as_strings() {
        let schema = parse_schema(r#""double""#).unwrap();
        let mut enc = JsonEncoder::new(&schema).unwrap();
        enc.write_double(f64::NAN).unwrap();
        assert_eq!(enc.into_string().unwrap(), "\"NaN\"");

        let mut dec = JsonDecoder::new(&schema, "\"-Infinity\"").unwrap();
        assert_eq!(dec.read_double().unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_array_and_map() {
        let schema = parse_schema(r#"{"type": "array", "items": "int"}"#).unwrap();
        let mut enc = JsonEncoder::new(&schema).unwrap();
        enc.array_start().unwrap();
        enc.set_item_count(2).unwrap();
        enc.start_item().unwrap();
        enc.write_int(1).unwrap();
        enc.start_item().unwrap();
        enc.write_int(2).unwrap();
        enc.array_end().unwrap();
        let text = enc.into_string().unwrap();
        assert_eq!(text, "[1,2]");

        let mut dec = JsonDecoder::new(&schema, &text).unwrap();
        let mut total = 0;
        let mut n = dec.array_start().unwrap();
        while n > 0 {
            for _ in 0..n {
                total += dec.read_int().unwrap();
            }
            n = dec.array_next().unwrap();
        }
        assert_eq!(total, 3);
    }

    #[test]
    fn test_map_keys() {
        let schema = parse_schema(r#"{"type": "map", "values": "long"}"#).unwrap();
        let mut enc = JsonEncoder::new(&schema).unwrap();
        enc.map_start().unwrap();
        enc.set_item_count(1).unwrap();
        enc.start_item().unwrap();
        enc.write_string("k").unwrap();
        enc.write_long(9).unwrap();
        enc.map_end().unwrap();
        let text = enc.into_string().unwrap();
        assert_eq!(text, r#"{"k":9}"#);

        let mut dec = JsonDecoder::new(&schema, &text).unwrap();
        assert_eq!(dec.map_start().unwrap(), 1);
        assert_eq!(dec.read_string().unwrap(), "k");
        assert_eq!(dec.read_long().unwrap(), 9);
        assert_eq!(dec.map_next().unwrap(), 0);
    }

    #[test]
    fn test_union_wrapper() {
        let schema = parse_schema(r#"["null", "string"]"#).unwrap();

        let mut enc = JsonEncoder::new(&schema).unwrap();
        enc.write_union_index(1).unwrap();
        enc.write_string("x").unwrap();
        let text = enc.into_string().unwrap();
        assert_eq!(text, r#"{"string":"x"}"#);

        let mut dec = JsonDecoder::new(&schema, &text).unwrap();
        assert_eq!(dec.read_union_index().unwrap(), 1);
        assert_eq!(dec.read_string().unwrap(), "x");
        dec.finish().unwrap();
    }

    #[test]
    fn test_union_null_is_bare() {
        let schema = parse_schema(r#"["null", "string"]"#).unwrap();

        let mut enc = JsonEncoder::new(&schema).unwrap();
        enc.write_union_index(0).unwrap();
        enc.write_null().unwrap();
        assert_eq!(enc.into_string().unwrap(), "null");

        let mut dec = JsonDecoder::new(&schema, "null").unwrap();
        assert_eq!(dec.read_union_index().unwrap(), 0);
        dec.read_null().unwrap();
        dec.finish().unwrap();
    }

    #[test]
    fn test_enum_symbol_strings() {
        let schema =
            parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["A", "B"]}"#).unwrap();
        let mut enc = JsonEncoder::new(&schema).unwrap();
        enc.write_enum(1).unwrap();
        assert_eq!(enc.into_string().unwrap(), "\"B\"");

        let mut dec = JsonDecoder::new(&schema, "\"B\"").unwrap();
        assert_eq!(dec.read_enum().unwrap(), 1);
    }

    #[test]
    fn test_bytes_as_codepoints() {
        let schema = parse_schema(r#""bytes""#).unwrap();
        let mut enc = JsonEncoder::new(&schema).unwrap();
        enc.write_bytes(&[0x00, 0xFF, 0x41]).unwrap();
        let text = enc.into_string().unwrap();

        let mut dec = JsonDecoder::new(&schema, &text).unwrap();
        assert_eq!(dec.read_bytes().unwrap(), vec![0x00, 0xFF, 0x41]);
    }
}
