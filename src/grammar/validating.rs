//! Grammar generation for validating codecs.
//!
//! Translates a schema tree into productions. The binary form emits bare
//! terminals; the JSON form adds record object hooks, enum label tables,
//! and union wrapper close marks so a token codec can mirror the document
//! structure.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::symbol::{Grammar, GrammarBuilder, ProdRef, Production, Symbol, Terminal};
use crate::error::SchemaError;
use crate::schema::Schema;

/// Cache key: schema node identity.
type NodeKey = usize;

fn key_of(node: &Arc<Schema>) -> NodeKey {
    Arc::as_ptr(node) as NodeKey
}

/// Compile the validating grammar for a schema.
pub fn validating_grammar(root: &Arc<Schema>) -> Result<Arc<Grammar>, SchemaError> {
    let mut builder = GrammarBuilder::new();
    let mut cache = HashMap::new();
    let root_ref = node_prod_ref(&mut builder, &mut cache, root)?;
    debug!(productions = builder.len(), "compiled validating grammar");
    Ok(Arc::new(builder.build(root_ref, None)))
}

/// Compile the JSON grammar for a schema.
pub fn json_grammar(root: &Arc<Schema>) -> Result<Arc<Grammar>, SchemaError> {
    let mut builder = GrammarBuilder::new();
    let mut cache = HashMap::new();
    let root_ref = json_prod_ref(&mut builder, &mut cache, root)?;
    debug!(productions = builder.len(), "compiled json grammar");
    Ok(Arc::new(builder.build(root_ref, None)))
}

/// Produce the validating production for `node`, inlined as a symbol
/// sequence. Named types are also cached in the arena so that links can
/// reference them.
pub(crate) fn node_production(
    builder: &mut GrammarBuilder,
    cache: &mut HashMap<NodeKey, ProdRef>,
    node: &Arc<Schema>,
) -> Result<Production, SchemaError> {
    match &**node {
        Schema::Null => Ok(vec![Symbol::Terminal(Terminal::Null)]),
        Schema::Boolean => Ok(vec![Symbol::Terminal(Terminal::Boolean)]),
        Schema::Int => Ok(vec![Symbol::Terminal(Terminal::Int)]),
        Schema::Long => Ok(vec![Symbol::Terminal(Terminal::Long)]),
        Schema::Float => Ok(vec![Symbol::Terminal(Terminal::Float)]),
        Schema::Double => Ok(vec![Symbol::Terminal(Terminal::Double)]),
        Schema::String => Ok(vec![Symbol::Terminal(Terminal::String)]),
        Schema::Bytes => Ok(vec![Symbol::Terminal(Terminal::Bytes)]),
        Schema::Fixed(f) => {
            let production = vec![
                Symbol::Terminal(Terminal::Fixed),
                Symbol::SizeCheck(f.size),
            ];
            let r = builder.intern(production.clone());
            cache.insert(key_of(node), r);
            Ok(production)
        }
        Schema::Enum(e) => {
            let production = vec![
                Symbol::Terminal(Terminal::Enum),
                Symbol::SizeCheck(e.symbols.len()),
            ];
            let r = builder.intern(production.clone());
            cache.insert(key_of(node), r);
            Ok(production)
        }
        Schema::Record(rec) => {
            // Reserve the slot up front so recursive references resolve
            // to it while the fields are still being generated.
            let slot = builder.reserve();
            cache.insert(key_of(node), slot);
            let mut production = Vec::new();
            for field in &rec.fields {
                production.extend(node_production(builder, cache, &field.schema)?);
            }
            builder.fill(slot, production.clone());
            Ok(production)
        }
        Schema::Array(items) => {
            let items_ref = node_prod_ref(builder, cache, items)?;
            Ok(vec![
                Symbol::Terminal(Terminal::ArrayStart),
                Symbol::Repeater {
                    items: items_ref,
                    skipper: None,
                    is_array: true,
                    count: 0,
                },
                Symbol::Terminal(Terminal::ArrayEnd),
            ])
        }
        Schema::Map(values) => {
            // A map item is the key string followed by the value.
            let mut item = vec![Symbol::Terminal(Terminal::String)];
            item.extend(node_production(builder, cache, values)?);
            let items_ref = builder.intern(item);
            Ok(vec![
                Symbol::Terminal(Terminal::MapStart),
                Symbol::Repeater {
                    items: items_ref,
                    skipper: None,
                    is_array: false,
                    count: 0,
                },
                Symbol::Terminal(Terminal::MapEnd),
            ])
        }
        Schema::Union(branches) => {
            let refs = branches
                .iter()
                .map(|b| node_prod_ref(builder, cache, b))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(vec![
                Symbol::Terminal(Terminal::Union),
                Symbol::Alternative {
                    branches: refs.into(),
                    labels: None,
                },
            ])
        }
        Schema::Link(l) => {
            let target = l.target()?;
            if let Some(r) = cache.get(&key_of(&target)) {
                return Ok(vec![Symbol::Indirect(*r)]);
            }
            let production = node_production(builder, cache, &target)?;
            match cache.get(&key_of(&target)) {
                Some(r) => Ok(vec![Symbol::Indirect(*r)]),
                None => Ok(production),
            }
        }
    }
}

/// Arena reference for the validating production of `node`.
pub(crate) fn node_prod_ref(
    builder: &mut GrammarBuilder,
    cache: &mut HashMap<NodeKey, ProdRef>,
    node: &Arc<Schema>,
) -> Result<ProdRef, SchemaError> {
    let node = Schema::follow(node)?;
    if let Some(r) = cache.get(&key_of(&node)) {
        return Ok(*r);
    }
    let production = node_production(builder, cache, &node)?;
    if let Some(r) = cache.get(&key_of(&node)) {
        return Ok(*r);
    }
    Ok(builder.intern(production))
}

fn json_production(
    builder: &mut GrammarBuilder,
    cache: &mut HashMap<NodeKey, ProdRef>,
    node: &Arc<Schema>,
) -> Result<Production, SchemaError> {
    match &**node {
        Schema::Record(rec) => {
            let slot = builder.reserve();
            cache.insert(key_of(node), slot);
            let mut production = vec![Symbol::RecordStart];
            for field in &rec.fields {
                production.push(Symbol::FieldName(field.name.as_str().into()));
                production.extend(json_production(builder, cache, &field.schema)?);
            }
            production.push(Symbol::RecordEnd);
            builder.fill(slot, production.clone());
            Ok(production)
        }
        Schema::Enum(e) => {
            let symbols: Vec<Arc<str>> = e.symbols.iter().map(|s| s.as_str().into()).collect();
            let production = vec![
                Symbol::Terminal(Terminal::Enum),
                Symbol::EnumLabels {
                    symbols: symbols.into(),
                },
            ];
            let r = builder.intern(production.clone());
            cache.insert(key_of(node), r);
            Ok(production)
        }
        Schema::Array(items) => {
            let items_ref = json_prod_ref(builder, cache, items)?;
            Ok(vec![
                Symbol::Terminal(Terminal::ArrayStart),
                Symbol::Repeater {
                    items: items_ref,
                    skipper: None,
                    is_array: true,
                    count: 0,
                },
                Symbol::Terminal(Terminal::ArrayEnd),
            ])
        }
        Schema::Map(values) => {
            let mut item = vec![Symbol::Terminal(Terminal::String)];
            item.extend(json_production(builder, cache, values)?);
            let items_ref = builder.intern(item);
            Ok(vec![
                Symbol::Terminal(Terminal::MapStart),
                Symbol::Repeater {
                    items: items_ref,
                    skipper: None,
                    is_array: false,
                    count: 0,
                },
                Symbol::Terminal(Terminal::MapEnd),
            ])
        }
        Schema::Union(branches) => {
            // Non-null branches decode inside a single-key wrapper object
            // closed by a trailing union-end mark.
            let mut refs = Vec::with_capacity(branches.len());
            let mut labels = Vec::with_capacity(branches.len());
            for branch in branches {
                labels.push(branch.union_label().into());
                let followed = Schema::follow(branch)?;
                if matches!(&*followed, Schema::Null) {
                    refs.push(builder.intern(vec![Symbol::Terminal(Terminal::Null)]));
                } else {
                    let mut p = json_production(builder, cache, branch)?;
                    p.push(Symbol::UnionEnd);
                    refs.push(builder.intern(p));
                }
            }
            Ok(vec![
                Symbol::Terminal(Terminal::Union),
                Symbol::Alternative {
                    branches: refs.into(),
                    labels: Some(labels.into()),
                },
            ])
        }
        Schema::Link(l) => {
            let target = l.target()?;
            if let Some(r) = cache.get(&key_of(&target)) {
                return Ok(vec![Symbol::Indirect(*r)]);
            }
            let production = json_production(builder, cache, &target)?;
            match cache.get(&key_of(&target)) {
                Some(r) => Ok(vec![Symbol::Indirect(*r)]),
                None => Ok(production),
            }
        }
        // Scalars and fixed share the validating productions.
        _ => node_production(builder, cache, node),
    }
}

fn json_prod_ref(
    builder: &mut GrammarBuilder,
    cache: &mut HashMap<NodeKey, ProdRef>,
    node: &Arc<Schema>,
) -> Result<ProdRef, SchemaError> {
    let node = Schema::follow(node)?;
    if let Some(r) = cache.get(&key_of(&node)) {
        return Ok(*r);
    }
    let production = json_production(builder, cache, &node)?;
    if let Some(r) = cache.get(&key_of(&node)) {
        return Ok(*r);
    }
    Ok(builder.intern(production))
}
