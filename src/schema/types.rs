//! Avro schema types and representations.
//!
//! This module defines the Avro schema type system: primitives, complex
//! types, and named-type references. Sub-schemas are held behind `Arc` so
//! trees can share nodes and the grammar generators can key caches on node
//! identity. Recursion is expressed with [`Schema::Link`] nodes holding a
//! non-owning back-reference to a previously declared named type.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use serde_json::{json, Map, Value};

use crate::error::SchemaError;

/// Represents an Avro schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    // Primitive types
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,

    // Complex types
    /// Record type with named fields.
    Record(RecordSchema),
    /// Enumeration type.
    Enum(EnumSchema),
    /// Array of items with a single schema.
    Array(Arc<Schema>),
    /// Map with string keys and values of a single schema.
    Map(Arc<Schema>),
    /// Union of multiple schemas.
    Union(Vec<Arc<Schema>>),
    /// Fixed-size byte array.
    Fixed(FixedSchema),

    /// Reference to a previously declared named type.
    Link(NamedRef),
}

/// Schema for a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The name of the record.
    pub name: String,
    /// Optional namespace for the record.
    pub namespace: Option<String>,
    /// The fields of the record, in declaration order.
    pub fields: Vec<FieldSchema>,
    index: HashMap<String, usize>,
}

impl RecordSchema {
    /// Create a new record schema with the given name and fields.
    ///
    /// # Errors
    /// `SchemaError::DuplicateName` if two fields share a name.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Result<Self, SchemaError> {
        let name = name.into();
        let mut index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if index.insert(field.name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateName(format!(
                    "field '{}' in record '{}'",
                    field.name, name
                )));
            }
        }
        Ok(Self {
            name,
            namespace: None,
            fields,
            index,
        })
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// Index of the field with the given name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Serialize the record schema to a JSON value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("record"));
        obj.insert("name".to_string(), json!(&self.name));
        if let Some(ns) = &self.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }
        let fields: Vec<Value> = self.fields.iter().map(|f| f.to_json_value()).collect();
        obj.insert("fields".to_string(), Value::Array(fields));
        Value::Object(obj)
    }
}

/// Schema for a field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The name of the field.
    pub name: String,
    /// The schema of the field's value.
    pub schema: Arc<Schema>,
    /// Optional default value for the field, as schema JSON.
    pub default: Option<Value>,
}

impl FieldSchema {
    /// Create a new field with the given name and schema.
    pub fn new(name: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Serialize the field schema to a JSON value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(&self.name));
        obj.insert("type".to_string(), self.schema.to_json_value());
        if let Some(default) = &self.default {
            obj.insert("default".to_string(), default.clone());
        }
        Value::Object(obj)
    }
}

/// Schema for an enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The name of the enum.
    pub name: String,
    /// Optional namespace for the enum.
    pub namespace: Option<String>,
    /// The symbols of the enum, in ordinal order.
    pub symbols: Vec<String>,
    index: HashMap<String, usize>,
}

impl EnumSchema {
    /// Create a new enum schema with the given name and symbols.
    ///
    /// # Errors
    /// `SchemaError::DuplicateName` if a symbol occurs more than once.
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Result<Self, SchemaError> {
        let name = name.into();
        let mut index = HashMap::with_capacity(symbols.len());
        for (i, symbol) in symbols.iter().enumerate() {
            if index.insert(symbol.clone(), i).is_some() {
                return Err(SchemaError::DuplicateName(format!(
                    "symbol '{}' in enum '{}'",
                    symbol, name
                )));
            }
        }
        Ok(Self {
            name,
            namespace: None,
            symbols,
            index,
        })
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// Get the ordinal of a symbol.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.index.get(symbol).copied()
    }

    /// Serialize the enum schema to a JSON value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("enum"));
        obj.insert("name".to_string(), json!(&self.name));
        if let Some(ns) = &self.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }
        obj.insert("symbols".to_string(), json!(&self.symbols));
        Value::Object(obj)
    }
}

/// Schema for a fixed-size byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The name of the fixed type.
    pub name: String,
    /// Optional namespace for the fixed type.
    pub namespace: Option<String>,
    /// The size in bytes.
    pub size: usize,
}

impl FixedSchema {
    /// Create a new fixed schema with the given name and size.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            size,
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// Serialize the fixed schema to a JSON value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("fixed"));
        obj.insert("name".to_string(), json!(&self.name));
        if let Some(ns) = &self.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }
        obj.insert("size".to_string(), json!(self.size));
        Value::Object(obj)
    }
}

/// A non-owning reference to a previously declared named type.
///
/// The target is set exactly once, when the declaration is known, and is
/// held weakly: a link never keeps its target alive, so recursive schemas
/// do not form reference cycles. Dereferencing a link whose target has
/// been dropped fails with `SchemaError::DanglingReference`.
#[derive(Debug, Clone)]
pub struct NamedRef {
    /// Fully qualified name of the referenced type.
    pub name: String,
    target: OnceLock<Weak<Schema>>,
}

impl NamedRef {
    /// Create an unbound reference to `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: OnceLock::new(),
        }
    }

    /// Create a reference already bound to its declaration.
    pub fn bound(name: impl Into<String>, target: &Arc<Schema>) -> Self {
        let r = Self::new(name);
        let _ = r.target.set(Arc::downgrade(target));
        r
    }

    /// Bind the reference to its declaration. Later binds are ignored.
    pub fn bind(&self, target: &Arc<Schema>) {
        let _ = self.target.set(Arc::downgrade(target));
    }

    /// Dereference the link.
    ///
    /// # Errors
    /// `SchemaError::UnknownType` if the link was never bound,
    /// `SchemaError::DanglingReference` if the declaration was dropped.
    pub fn target(&self) -> Result<Arc<Schema>, SchemaError> {
        let weak = self
            .target
            .get()
            .ok_or_else(|| SchemaError::UnknownType(self.name.clone()))?;
        weak.upgrade()
            .ok_or_else(|| SchemaError::DanglingReference(self.name.clone()))
    }
}

impl PartialEq for NamedRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Schema {
    /// Check if this schema is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Schema::Null
                | Schema::Boolean
                | Schema::Int
                | Schema::Long
                | Schema::Float
                | Schema::Double
                | Schema::Bytes
                | Schema::String
        )
    }

    /// Check if this schema is a named type (record, enum, or fixed).
    pub fn is_named(&self) -> bool {
        matches!(self, Schema::Record(_) | Schema::Enum(_) | Schema::Fixed(_))
    }

    /// Get the fully qualified name of a named type, if applicable.
    pub fn fullname(&self) -> Option<String> {
        match self {
            Schema::Record(r) => Some(r.fullname()),
            Schema::Enum(e) => Some(e.fullname()),
            Schema::Fixed(f) => Some(f.fullname()),
            Schema::Link(l) => Some(l.name.clone()),
            _ => None,
        }
    }

    /// The label identifying this type inside a JSON-encoded union:
    /// the fully qualified name for named types, the type keyword
    /// otherwise.
    pub fn union_label(&self) -> String {
        match self {
            Schema::Null => "null".to_string(),
            Schema::Boolean => "boolean".to_string(),
            Schema::Int => "int".to_string(),
            Schema::Long => "long".to_string(),
            Schema::Float => "float".to_string(),
            Schema::Double => "double".to_string(),
            Schema::Bytes => "bytes".to_string(),
            Schema::String => "string".to_string(),
            Schema::Array(_) => "array".to_string(),
            Schema::Map(_) => "map".to_string(),
            Schema::Union(_) => "union".to_string(),
            Schema::Record(r) => r.fullname(),
            Schema::Enum(e) => e.fullname(),
            Schema::Fixed(f) => f.fullname(),
            Schema::Link(l) => l.name.clone(),
        }
    }

    /// Follow link nodes until a concrete schema is reached.
    ///
    /// # Errors
    /// Propagates unbound or dangling references.
    pub fn follow(node: &Arc<Schema>) -> Result<Arc<Schema>, SchemaError> {
        let mut current = Arc::clone(node);
        loop {
            let next = match &*current {
                Schema::Link(l) => l.target()?,
                _ => return Ok(current),
            };
            current = next;
        }
    }

    /// Build an array schema.
    pub fn array(items: Arc<Schema>) -> Arc<Schema> {
        Arc::new(Schema::Array(items))
    }

    /// Build a map schema.
    pub fn map(values: Arc<Schema>) -> Arc<Schema> {
        Arc::new(Schema::Map(values))
    }

    /// Build a union schema from the given branches.
    pub fn union_of(branches: Vec<Arc<Schema>>) -> Arc<Schema> {
        Arc::new(Schema::Union(branches))
    }

    /// Serialize the schema to a JSON string.
    ///
    /// Produces Avro schema JSON that parses back to an equivalent schema.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_json_value()).unwrap_or_else(|_| "null".to_string())
    }

    /// Serialize the schema to a JSON value.
    pub fn to_json_value(&self) -> Value {
        match self {
            Schema::Null => json!("null"),
            Schema::Boolean => json!("boolean"),
            Schema::Int => json!("int"),
            Schema::Long => json!("long"),
            Schema::Float => json!("float"),
            Schema::Double => json!("double"),
            Schema::Bytes => json!("bytes"),
            Schema::String => json!("string"),
            Schema::Record(r) => r.to_json_value(),
            Schema::Enum(e) => e.to_json_value(),
            Schema::Array(items) => json!({
                "type": "array",
                "items": items.to_json_value()
            }),
            Schema::Map(values) => json!({
                "type": "map",
                "values": values.to_json_value()
            }),
            Schema::Union(branches) => {
                Value::Array(branches.iter().map(|b| b.to_json_value()).collect())
            }
            Schema::Fixed(f) => f.to_json_value(),
            Schema::Link(l) => json!(l.name),
        }
    }
}
