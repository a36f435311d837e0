//! Generic datum model: schema-tagged values, defaults, and
//! schema-directed reading and writing.

mod datum;
mod generic;

pub use datum::{datum_from_json, Datum, RecordDatum};
pub use generic::{read_datum, read_resolved, write_datum};
