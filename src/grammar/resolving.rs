//! Grammar generation for schema resolution.
//!
//! Compiles a (writer, reader) schema pair into productions that read
//! writer-encoded data while presenting reader-schema semantics: numeric
//! promotions, record field matching with skips and default injection,
//! enum ordinal remapping, and union adjustment in both directions. A
//! writer-only backup grammar is built into the same arena; its
//! productions drive the byte-accurate skipping of writer data the reader
//! never sees.

use std::collections::HashMap;
use std::mem::discriminant;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use super::symbol::{Grammar, GrammarBuilder, ProdRef, Production, Symbol, Terminal};
use super::validating::{node_prod_ref, node_production};
use crate::codec::BinaryEncoder;
use crate::error::SchemaError;
use crate::schema::{resolve, Resolution, Schema};
use crate::value::{datum_from_json, write_datum};

type PairKey = (usize, usize);

fn pair_key(writer: &Arc<Schema>, reader: &Arc<Schema>) -> PairKey {
    (Arc::as_ptr(writer) as usize, Arc::as_ptr(reader) as usize)
}

/// Compile the resolving grammar for a writer/reader schema pair.
///
/// # Errors
/// Fails when a reader record field has no writer counterpart and no
/// default, when a default does not match its field type, or when the
/// schema tree contains broken links. Structurally incompatible pairs do
/// not fail here; they compile to a mark that fails at first decode.
pub fn resolving_grammar(
    writer: &Arc<Schema>,
    reader: &Arc<Schema>,
) -> Result<Arc<Grammar>, SchemaError> {
    let mut gen = ResolvingGen {
        builder: GrammarBuilder::new(),
        pairs: HashMap::new(),
        wcache: HashMap::new(),
    };
    let backup = node_prod_ref(&mut gen.builder, &mut gen.wcache, writer)?;
    let main = gen.pair_prod_ref(writer, reader)?;
    debug!(productions = gen.builder.len(), "compiled resolving grammar");
    Ok(Arc::new(gen.builder.build(main, Some(backup))))
}

struct ResolvingGen {
    builder: GrammarBuilder,
    /// (writer, reader) pairs already compiled or being compiled.
    pairs: HashMap<PairKey, ProdRef>,
    /// Writer-only productions shared with the backup grammar.
    wcache: HashMap<usize, ProdRef>,
}

impl ResolvingGen {
    fn pair_prod_ref(
        &mut self,
        writer: &Arc<Schema>,
        reader: &Arc<Schema>,
    ) -> Result<ProdRef, SchemaError> {
        let writer = Schema::follow(writer)?;
        let reader = Schema::follow(reader)?;
        let key = pair_key(&writer, &reader);
        if let Some(r) = self.pairs.get(&key) {
            return Ok(*r);
        }
        let production = self.gen_pair(&writer, &reader)?;
        if let Some(r) = self.pairs.get(&key) {
            return Ok(*r);
        }
        Ok(self.builder.intern(production))
    }

    /// Compile one (writer, reader) pair, links already followed.
    fn gen_pair(
        &mut self,
        writer: &Arc<Schema>,
        reader: &Arc<Schema>,
    ) -> Result<Production, SchemaError> {
        let writer = Schema::follow(writer)?;
        let reader = Schema::follow(reader)?;

        if discriminant(&*writer) == discriminant(&*reader) {
            match (&*writer, &*reader) {
                (Schema::Null, _) => return Ok(vec![Symbol::Terminal(Terminal::Null)]),
                (Schema::Boolean, _) => return Ok(vec![Symbol::Terminal(Terminal::Boolean)]),
                (Schema::Int, _) => return Ok(vec![Symbol::Terminal(Terminal::Int)]),
                (Schema::Long, _) => return Ok(vec![Symbol::Terminal(Terminal::Long)]),
                (Schema::Float, _) => return Ok(vec![Symbol::Terminal(Terminal::Float)]),
                (Schema::Double, _) => return Ok(vec![Symbol::Terminal(Terminal::Double)]),
                (Schema::String, _) => return Ok(vec![Symbol::Terminal(Terminal::String)]),
                (Schema::Bytes, _) => return Ok(vec![Symbol::Terminal(Terminal::Bytes)]),
                (Schema::Fixed(w), Schema::Fixed(r)) => {
                    if w.fullname() == r.fullname() && w.size == r.size {
                        let production = vec![
                            Symbol::Terminal(Terminal::Fixed),
                            Symbol::SizeCheck(r.size),
                        ];
                        let pr = self.builder.intern(production.clone());
                        self.pairs.insert(pair_key(&writer, &reader), pr);
                        return Ok(production);
                    }
                }
                (Schema::Record(w), Schema::Record(r)) => {
                    if w.fullname() == r.fullname() {
                        let key = pair_key(&writer, &reader);
                        if let Some(pr) = self.pairs.get(&key) {
                            return Ok(vec![Symbol::Indirect(*pr)]);
                        }
                        let slot = self.builder.reserve();
                        self.pairs.insert(key, slot);
                        let production = self.resolve_records(&writer, &reader)?;
                        self.builder.fill(slot, production.clone());
                        return Ok(production);
                    }
                }
                (Schema::Enum(w), Schema::Enum(r)) => {
                    if w.fullname() == r.fullname() {
                        let mapping: Vec<Option<usize>> = w
                            .symbols
                            .iter()
                            .map(|s| r.symbol_index(s))
                            .collect();
                        let production = vec![
                            Symbol::Terminal(Terminal::Enum),
                            Symbol::EnumAdjust {
                                mapping: mapping.into(),
                            },
                        ];
                        let pr = self.builder.intern(production.clone());
                        self.pairs.insert(pair_key(&writer, &reader), pr);
                        return Ok(production);
                    }
                }
                (Schema::Array(w_items), Schema::Array(r_items)) => {
                    let skipper = node_prod_ref(&mut self.builder, &mut self.wcache, w_items)?;
                    let items_p = self.gen_pair(w_items, r_items)?;
                    let items = self.builder.intern(items_p);
                    return Ok(vec![
                        Symbol::Terminal(Terminal::ArrayStart),
                        Symbol::Repeater {
                            items,
                            skipper: Some(skipper),
                            is_array: true,
                            count: 0,
                        },
                        Symbol::Terminal(Terminal::ArrayEnd),
                    ]);
                }
                (Schema::Map(w_values), Schema::Map(r_values)) => {
                    let mut item = vec![Symbol::Terminal(Terminal::String)];
                    item.extend(self.gen_pair(w_values, r_values)?);
                    let items = self.builder.intern(item);

                    let mut skip_item = vec![Symbol::Terminal(Terminal::String)];
                    skip_item.extend(node_production(
                        &mut self.builder,
                        &mut self.wcache,
                        w_values,
                    )?);
                    let skipper = self.builder.intern(skip_item);

                    return Ok(vec![
                        Symbol::Terminal(Terminal::MapStart),
                        Symbol::Repeater {
                            items,
                            skipper: Some(skipper),
                            is_array: false,
                            count: 0,
                        },
                        Symbol::Terminal(Terminal::MapEnd),
                    ]);
                }
                (Schema::Union(_), Schema::Union(_)) => {
                    return self.resolve_writer_union(&writer, &reader);
                }
                _ => {}
            }
        } else if matches!(&*writer, Schema::Union(_)) {
            return self.resolve_writer_union(&writer, &reader);
        } else {
            match (&*writer, &*reader) {
                (Schema::Int, Schema::Long) => {
                    return Ok(vec![Symbol::Promote {
                        from: Terminal::Int,
                        to: Terminal::Long,
                    }]);
                }
                (Schema::Int, Schema::Float) => {
                    return Ok(vec![Symbol::Promote {
                        from: Terminal::Int,
                        to: Terminal::Float,
                    }]);
                }
                (Schema::Long, Schema::Float) => {
                    return Ok(vec![Symbol::Promote {
                        from: Terminal::Long,
                        to: Terminal::Float,
                    }]);
                }
                (Schema::Int, Schema::Double) => {
                    return Ok(vec![Symbol::Promote {
                        from: Terminal::Int,
                        to: Terminal::Double,
                    }]);
                }
                (Schema::Long, Schema::Double) => {
                    return Ok(vec![Symbol::Promote {
                        from: Terminal::Long,
                        to: Terminal::Double,
                    }]);
                }
                (Schema::Float, Schema::Double) => {
                    return Ok(vec![Symbol::Promote {
                        from: Terminal::Float,
                        to: Terminal::Double,
                    }]);
                }
                (_, Schema::Union(branches)) => {
                    if let Some(branch) = best_branch(&writer, branches)? {
                        let production = self.gen_pair(&writer, &branches[branch])?;
                        let pr = self.builder.intern(production);
                        return Ok(vec![
                            Symbol::Terminal(Terminal::Union),
                            Symbol::UnionAdjust {
                                branch,
                                production: pr,
                            },
                        ]);
                    }
                }
                _ => {}
            }
        }

        Ok(vec![Symbol::Incompatible(
            format!(
                "writer {} cannot be read as {}",
                writer.union_label(),
                reader.union_label()
            )
            .into(),
        )])
    }

    /// Writer union against any reader: consume the tag, dispatch to the
    /// per-branch resolution.
    fn resolve_writer_union(
        &mut self,
        writer: &Arc<Schema>,
        reader: &Arc<Schema>,
    ) -> Result<Production, SchemaError> {
        let Schema::Union(branches) = &**writer else {
            unreachable!("caller checked the writer is a union");
        };
        let refs = branches
            .iter()
            .map(|b| self.pair_prod_ref(b, reader))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vec![
            Symbol::WriterUnion,
            Symbol::Alternative {
                branches: refs.into(),
                labels: None,
            },
        ])
    }

    /// Field-by-field record resolution.
    ///
    /// Writer fields are walked in writer order: matched fields resolve
    /// recursively and contribute their reader index to the field order;
    /// unmatched writer fields compile to a skip of the writer encoding.
    /// Remaining reader fields decode from their pre-encoded defaults.
    fn resolve_records(
        &mut self,
        writer: &Arc<Schema>,
        reader: &Arc<Schema>,
    ) -> Result<Production, SchemaError> {
        let (Schema::Record(wrec), Schema::Record(rrec)) = (&**writer, &**reader) else {
            unreachable!("caller checked both sides are records");
        };

        let mut pending = vec![true; rrec.fields.len()];
        let mut order = Vec::with_capacity(rrec.fields.len());
        let mut body: Production = Vec::new();

        for wfield in &wrec.fields {
            match rrec.field_index(&wfield.name) {
                Some(ri) if pending[ri] => {
                    body.extend(self.gen_pair(&wfield.schema, &rrec.fields[ri].schema)?);
                    order.push(ri);
                    pending[ri] = false;
                }
                _ => {
                    let wref =
                        node_prod_ref(&mut self.builder, &mut self.wcache, &wfield.schema)?;
                    body.push(Symbol::SkipStart);
                    let wp = self.builder.get(wref);
                    if wp.len() == 1 {
                        body.push(wp[0].clone());
                    } else {
                        body.push(Symbol::Indirect(wref));
                    }
                }
            }
        }

        for (ri, rfield) in rrec.fields.iter().enumerate() {
            if !pending[ri] {
                continue;
            }
            order.push(ri);
            let default = rfield.default.as_ref().ok_or_else(|| {
                SchemaError::Incompatible(format!(
                    "reader field '{}.{}' has no writer counterpart and no default",
                    rrec.name, rfield.name
                ))
            })?;
            let bytes = default_bytes(&rfield.schema, default)?;
            body.push(Symbol::DefaultStart(bytes));
            body.extend(self.gen_pair(&rfield.schema, &rfield.schema)?);
            body.push(Symbol::DefaultEnd);
        }

        let mut production = Vec::with_capacity(body.len() + 2);
        production.push(Symbol::RecordMark);
        production.push(Symbol::FieldOrder(order.into()));
        production.extend(body);
        Ok(production)
    }
}

/// Pick the reader-union branch for a non-union writer: first the exact
/// type match (requiring equal names for named types), then the first
/// branch the writer type promotes to.
fn best_branch(
    writer: &Arc<Schema>,
    branches: &[Arc<Schema>],
) -> Result<Option<usize>, SchemaError> {
    for (j, branch) in branches.iter().enumerate() {
        let branch = Schema::follow(branch)?;
        if discriminant(&**writer) == discriminant(&*branch) {
            if branch.is_named() {
                if branch.fullname() == writer.fullname() {
                    return Ok(Some(j));
                }
            } else {
                return Ok(Some(j));
            }
        }
    }
    for (j, branch) in branches.iter().enumerate() {
        match resolve(writer, branch) {
            Resolution::PromotableToLong
            | Resolution::PromotableToFloat
            | Resolution::PromotableToDouble => return Ok(Some(j)),
            _ => {}
        }
    }
    Ok(None)
}

/// Pre-encode a field default to Avro binary.
fn default_bytes(schema: &Arc<Schema>, json: &serde_json::Value) -> Result<Bytes, SchemaError> {
    let datum = datum_from_json(schema, json)?;
    let mut encoder = BinaryEncoder::buffered();
    write_datum(&mut encoder, &datum)
        .map_err(|e| SchemaError::InvalidDefault(e.to_string()))?;
    Ok(Bytes::from(encoder.into_bytes()))
}
