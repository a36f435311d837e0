//! Schema-directed reading and writing of generic datums.

use std::sync::Arc;

use crate::codec::{Decoder, Encoder, ResolvingDecoder};
use crate::error::CodecError;
use crate::schema::Schema;
use crate::value::datum::{Datum, RecordDatum};

/// Write a datum through any encoder.
///
/// The encoder's grammar (if it has one) checks that the datum's shape
/// matches the schema the encoder was built with.
pub fn write_datum<E: Encoder + ?Sized>(encoder: &mut E, datum: &Datum) -> Result<(), CodecError> {
    match datum {
        Datum::Null => encoder.write_null(),
        Datum::Boolean(v) => encoder.write_bool(*v),
        Datum::Int(v) => encoder.write_int(*v),
        Datum::Long(v) => encoder.write_long(*v),
        Datum::Float(v) => encoder.write_float(*v),
        Datum::Double(v) => encoder.write_double(*v),
        Datum::Bytes(v) => encoder.write_bytes(v),
        Datum::String(v) => encoder.write_string(v),
        Datum::Fixed(v) => encoder.write_fixed(v),
        Datum::Enum(ordinal) => encoder.write_enum(*ordinal),
        Datum::Array(items) => {
            encoder.array_start()?;
            if !items.is_empty() {
                encoder.set_item_count(items.len() as u64)?;
                for item in items {
                    encoder.start_item()?;
                    write_datum(encoder, item)?;
                }
            }
            encoder.array_end()
        }
        Datum::Map(entries) => {
            encoder.map_start()?;
            if !entries.is_empty() {
                encoder.set_item_count(entries.len() as u64)?;
                for (key, value) in entries {
                    encoder.start_item()?;
                    encoder.write_string(key)?;
                    write_datum(encoder, value)?;
                }
            }
            encoder.map_end()
        }
        Datum::Union(branch, value) => {
            encoder.write_union_index(*branch)?;
            write_datum(encoder, value)
        }
        Datum::Record(rec) => {
            for field in rec.fields() {
                write_datum(encoder, field)?;
            }
            Ok(())
        }
    }
}

/// Read a datum of the given schema through any decoder.
pub fn read_datum<D: Decoder + ?Sized>(
    decoder: &mut D,
    schema: &Arc<Schema>,
) -> Result<Datum, CodecError> {
    let schema = Schema::follow(schema)?;
    match &*schema {
        Schema::Null => {
            decoder.read_null()?;
            Ok(Datum::Null)
        }
        Schema::Boolean => Ok(Datum::Boolean(decoder.read_bool()?)),
        Schema::Int => Ok(Datum::Int(decoder.read_int()?)),
        Schema::Long => Ok(Datum::Long(decoder.read_long()?)),
        Schema::Float => Ok(Datum::Float(decoder.read_float()?)),
        Schema::Double => Ok(Datum::Double(decoder.read_double()?)),
        Schema::Bytes => Ok(Datum::Bytes(decoder.read_bytes()?)),
        Schema::String => Ok(Datum::String(decoder.read_string()?)),
        Schema::Fixed(f) => Ok(Datum::Fixed(decoder.read_fixed(f.size)?)),
        Schema::Enum(e) => {
            let ordinal = decoder.read_enum()?;
            if ordinal >= e.symbols.len() {
                return Err(CodecError::OutOfRange(format!(
                    "enum ordinal {} out of range for '{}' with {} symbols",
                    ordinal,
                    e.name,
                    e.symbols.len()
                )));
            }
            Ok(Datum::Enum(ordinal))
        }
        Schema::Array(items) => {
            let mut values = Vec::new();
            let mut count = decoder.array_start()?;
            while count > 0 {
                values.reserve(count as usize);
                for _ in 0..count {
                    values.push(read_datum(decoder, items)?);
                }
                count = decoder.array_next()?;
            }
            Ok(Datum::Array(values))
        }
        Schema::Map(values_schema) => {
            let mut entries = Vec::new();
            let mut count = decoder.map_start()?;
            while count > 0 {
                entries.reserve(count as usize);
                for _ in 0..count {
                    let key = decoder.read_string()?;
                    entries.push((key, read_datum(decoder, values_schema)?));
                }
                count = decoder.map_next()?;
            }
            Ok(Datum::Map(entries))
        }
        Schema::Union(branches) => {
            let branch = decoder.read_union_index()?;
            let branch_schema = branches.get(branch).ok_or_else(|| {
                CodecError::OutOfRange(format!(
                    "union branch {} out of range ({} branches)",
                    branch,
                    branches.len()
                ))
            })?;
            Ok(Datum::Union(
                branch,
                Box::new(read_datum(decoder, branch_schema)?),
            ))
        }
        Schema::Record(rec) => {
            let mut fields = Vec::with_capacity(rec.fields.len());
            for field in &rec.fields {
                fields.push(read_datum(decoder, &field.schema)?);
            }
            Ok(Datum::Record(RecordDatum::from_fields(&schema, fields)?))
        }
        Schema::Link(_) => unreachable!("links are followed above"),
    }
}

/// Read a datum of the reader schema through a resolving decoder.
///
/// Record fields are read in the order the resolver dictates
/// ([`ResolvingDecoder::field_order`]) and placed at their reader
/// positions.
pub fn read_resolved(
    decoder: &mut ResolvingDecoder,
    reader: &Arc<Schema>,
) -> Result<Datum, CodecError> {
    let datum = read_resolved_value(decoder, reader)?;
    decoder.drain()?;
    Ok(datum)
}

fn read_resolved_value(
    decoder: &mut ResolvingDecoder,
    schema: &Arc<Schema>,
) -> Result<Datum, CodecError> {
    let schema = Schema::follow(schema)?;
    match &*schema {
        Schema::Record(rec) => {
            let order = decoder.field_order()?;
            let mut fields: Vec<Option<Datum>> = (0..rec.fields.len()).map(|_| None).collect();
            for &reader_index in order.iter() {
                let field = rec.fields.get(reader_index).ok_or_else(|| {
                    CodecError::Incompatible(format!(
                        "field order index {} out of range for record '{}'",
                        reader_index, rec.name
                    ))
                })?;
                fields[reader_index] = Some(read_resolved_value(decoder, &field.schema)?);
            }
            let fields = fields
                .into_iter()
                .enumerate()
                .map(|(i, f)| {
                    f.ok_or_else(|| {
                        CodecError::Incompatible(format!(
                            "field '{}' of record '{}' was never decoded",
                            rec.fields[i].name, rec.name
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Datum::Record(RecordDatum::from_fields(&schema, fields)?))
        }
        Schema::Array(items) => {
            let mut values = Vec::new();
            let mut count = decoder.array_start()?;
            while count > 0 {
                values.reserve(count as usize);
                for _ in 0..count {
                    values.push(read_resolved_value(decoder, items)?);
                }
                count = decoder.array_next()?;
            }
            Ok(Datum::Array(values))
        }
        Schema::Map(values_schema) => {
            let mut entries = Vec::new();
            let mut count = decoder.map_start()?;
            while count > 0 {
                entries.reserve(count as usize);
                for _ in 0..count {
                    let key = decoder.read_string()?;
                    entries.push((key, read_resolved_value(decoder, values_schema)?));
                }
                count = decoder.map_next()?;
            }
            Ok(Datum::Map(entries))
        }
        Schema::Union(branches) => {
            let branch = decoder.read_union_index()?;
            let branch_schema = branches.get(branch).ok_or_else(|| {
                CodecError::OutOfRange(format!(
                    "union branch {} out of range ({} branches)",
                    branch,
                    branches.len()
                ))
            })?;
            Ok(Datum::Union(
                branch,
                Box::new(read_resolved_value(decoder, branch_schema)?),
            ))
        }
        // Leaves go through the decoder directly; promotions are applied
        // inside its read methods.
        _ => read_datum(decoder, &schema),
    }
}
