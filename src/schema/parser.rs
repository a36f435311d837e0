//! JSON schema parser for Avro schemas.
//!
//! Parses Avro schema JSON into the [`Schema`] tree. Named types are
//! registered as they are declared; later references become link nodes
//! bound to the declaration, which is also how recursive records are
//! expressed.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::schema::types::{
    EnumSchema, FieldSchema, FixedSchema, NamedRef, RecordSchema, Schema,
};

/// Parse an Avro schema from a JSON string.
///
/// # Example
/// ```
/// use contrail::schema::parse_schema;
///
/// let schema = parse_schema(r#""string""#).unwrap();
/// ```
pub fn parse_schema(json: &str) -> Result<Arc<Schema>, SchemaError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| SchemaError::ParseError(format!("Invalid JSON: {}", e)))?;
    let mut parser = SchemaParser::new();
    parser.parse(&value)
}

/// Registration state of a named type during parsing.
///
/// While a record's fields are being parsed, references to the record
/// itself produce unbound links that are collected and bound once the
/// declaration completes.
enum Registration {
    InProgress(Vec<Arc<Schema>>),
    Complete(Arc<Schema>),
}

/// Schema parser with a named-type registry.
pub struct SchemaParser {
    named: HashMap<String, Registration>,
    namespace: Option<String>,
}

impl SchemaParser {
    pub fn new() -> Self {
        Self {
            named: HashMap::new(),
            namespace: None,
        }
    }

    /// Parse a schema from a JSON value.
    pub fn parse(&mut self, value: &Value) -> Result<Arc<Schema>, SchemaError> {
        match value {
            Value::String(s) => self.parse_type_name(s),
            Value::Array(branches) => self.parse_union(branches),
            Value::Object(obj) => self.parse_complex(obj),
            other => Err(SchemaError::InvalidSchema(format!(
                "Expected string, array, or object, got: {}",
                other
            ))),
        }
    }

    fn parse_type_name(&mut self, name: &str) -> Result<Arc<Schema>, SchemaError> {
        match name {
            "null" => Ok(Arc::new(Schema::Null)),
            "boolean" => Ok(Arc::new(Schema::Boolean)),
            "int" => Ok(Arc::new(Schema::Int)),
            "long" => Ok(Arc::new(Schema::Long)),
            "float" => Ok(Arc::new(Schema::Float)),
            "double" => Ok(Arc::new(Schema::Double)),
            "bytes" => Ok(Arc::new(Schema::Bytes)),
            "string" => Ok(Arc::new(Schema::String)),
            other => self.reference(other),
        }
    }

    /// Produce a link node for a reference to a declared named type.
    fn reference(&mut self, name: &str) -> Result<Arc<Schema>, SchemaError> {
        let fullname = self.qualify(name);
        match self.named.get_mut(&fullname) {
            Some(Registration::Complete(target)) => {
                let target = Arc::clone(target);
                Ok(Arc::new(Schema::Link(NamedRef::bound(fullname, &target))))
            }
            Some(Registration::InProgress(links)) => {
                let node = Arc::new(Schema::Link(NamedRef::new(fullname)));
                links.push(Arc::clone(&node));
                Ok(node)
            }
            None => Err(SchemaError::UnknownType(fullname)),
        }
    }

    /// Resolve an unqualified name against the current namespace.
    fn qualify(&self, name: &str) -> String {
        if name.contains('.') {
            return name.to_string();
        }
        match &self.namespace {
            Some(ns) if self.named.contains_key(&format!("{}.{}", ns, name)) => {
                format!("{}.{}", ns, name)
            }
            _ => name.to_string(),
        }
    }

    fn parse_union(&mut self, branches: &[Value]) -> Result<Arc<Schema>, SchemaError> {
        let mut parsed = Vec::with_capacity(branches.len());
        let mut seen = Vec::with_capacity(branches.len());
        for branch in branches {
            if branch.is_array() {
                return Err(SchemaError::InvalidSchema(
                    "Unions may not immediately contain other unions".to_string(),
                ));
            }
            let schema = self.parse(branch)?;
            if matches!(&*schema, Schema::Union(_)) {
                return Err(SchemaError::InvalidSchema(
                    "Unions may not immediately contain other unions".to_string(),
                ));
            }
            // Branches are distinguished by type kind, or by fullname for
            // named types and links.
            let tag = schema
                .fullname()
                .unwrap_or_else(|| schema.union_label());
            if seen.contains(&tag) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Union has duplicate branch type: {}",
                    tag
                )));
            }
            seen.push(tag);
            parsed.push(schema);
        }
        Ok(Schema::union_of(parsed))
    }

    fn parse_complex(&mut self, obj: &Map<String, Value>) -> Result<Arc<Schema>, SchemaError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::InvalidSchema("Missing 'type' field".to_string()))?;
        let type_name = match type_value {
            Value::String(s) => s.as_str(),
            // An object or array in "type" position is a nested schema.
            other => return self.parse(other),
        };

        match type_name {
            "record" => self.parse_record(obj),
            "enum" => self.parse_enum(obj),
            "array" => {
                let items = obj.get("items").ok_or_else(|| {
                    SchemaError::InvalidSchema("Array missing 'items'".to_string())
                })?;
                Ok(Schema::array(self.parse(items)?))
            }
            "map" => {
                let values = obj.get("values").ok_or_else(|| {
                    SchemaError::InvalidSchema("Map missing 'values'".to_string())
                })?;
                Ok(Schema::map(self.parse(values)?))
            }
            "fixed" => self.parse_fixed(obj),
            // {"type": "int"} style wrapping of a primitive or reference
            other => self.parse_type_name(other),
        }
    }

    /// Pull the declared name and namespace out of a named-type object,
    /// honoring dotted names.
    fn declared_name(
        &self,
        obj: &Map<String, Value>,
    ) -> Result<(String, Option<String>), SchemaError> {
        let raw = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::InvalidSchema("Named type missing 'name'".to_string()))?;
        if let Some(pos) = raw.rfind('.') {
            return Ok((raw[pos + 1..].to_string(), Some(raw[..pos].to_string())));
        }
        let namespace = obj
            .get("namespace")
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| self.namespace.clone());
        Ok((raw.to_string(), namespace))
    }

    fn register(&mut self, fullname: &str) -> Result<(), SchemaError> {
        if self.named.contains_key(fullname) {
            return Err(SchemaError::DuplicateName(format!(
                "type '{}' declared more than once",
                fullname
            )));
        }
        self.named
            .insert(fullname.to_string(), Registration::InProgress(Vec::new()));
        Ok(())
    }

    fn complete(&mut self, fullname: &str, schema: &Arc<Schema>) {
        if let Some(Registration::InProgress(links)) = self
            .named
            .insert(fullname.to_string(), Registration::Complete(Arc::clone(schema)))
        {
            for link in links {
                if let Schema::Link(l) = &*link {
                    l.bind(schema);
                }
            }
        }
    }

    fn parse_record(&mut self, obj: &Map<String, Value>) -> Result<Arc<Schema>, SchemaError> {
        let (name, namespace) = self.declared_name(obj)?;
        let fullname = match &namespace {
            Some(ns) => format!("{}.{}", ns, name),
            None => name.clone(),
        };
        self.register(&fullname)?;

        let saved = self.namespace.clone();
        self.namespace = namespace.clone();

        let fields_json = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::InvalidSchema("Record missing 'fields'".to_string()))?;

        let mut fields = Vec::with_capacity(fields_json.len());
        for field in fields_json {
            let field_obj = field.as_object().ok_or_else(|| {
                SchemaError::InvalidSchema("Record field must be an object".to_string())
            })?;
            let field_name = field_obj
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    SchemaError::InvalidSchema("Record field missing 'name'".to_string())
                })?;
            let field_type = field_obj.get("type").ok_or_else(|| {
                SchemaError::InvalidSchema(format!("Field '{}' missing 'type'", field_name))
            })?;
            let schema = self.parse(field_type)?;
            let mut parsed = FieldSchema::new(field_name, schema);
            if let Some(default) = field_obj.get("default") {
                parsed = parsed.with_default(default.clone());
            }
            fields.push(parsed);
        }

        self.namespace = saved;

        let mut record = RecordSchema::new(name, fields)?;
        if let Some(ns) = namespace {
            record = record.with_namespace(ns);
        }
        let schema = Arc::new(Schema::Record(record));
        self.complete(&fullname, &schema);
        Ok(schema)
    }

    fn parse_enum(&mut self, obj: &Map<String, Value>) -> Result<Arc<Schema>, SchemaError> {
        let (name, namespace) = self.declared_name(obj)?;
        let fullname = match &namespace {
            Some(ns) => format!("{}.{}", ns, name),
            None => name.clone(),
        };
        self.register(&fullname)?;

        let symbols = obj
            .get("symbols")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::InvalidSchema("Enum missing 'symbols'".to_string()))?
            .iter()
            .map(|s| {
                s.as_str().map(String::from).ok_or_else(|| {
                    SchemaError::InvalidSchema("Enum symbols must be strings".to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut parsed = EnumSchema::new(name, symbols)?;
        if let Some(ns) = namespace {
            parsed = parsed.with_namespace(ns);
        }
        let schema = Arc::new(Schema::Enum(parsed));
        self.complete(&fullname, &schema);
        Ok(schema)
    }

    fn parse_fixed(&mut self, obj: &Map<String, Value>) -> Result<Arc<Schema>, SchemaError> {
        let (name, namespace) = self.declared_name(obj)?;
        let fullname = match &namespace {
            Some(ns) => format!("{}.{}", ns, name),
            None => name.clone(),
        };
        self.register(&fullname)?;

        let size = obj
            .get("size")
            .and_then(Value::as_u64)
            .ok_or_else(|| SchemaError::InvalidSchema("Fixed missing 'size'".to_string()))?;

        let mut parsed = FixedSchema::new(name, size as usize);
        if let Some(ns) = namespace {
            parsed = parsed.with_namespace(ns);
        }
        let schema = Arc::new(Schema::Fixed(parsed));
        self.complete(&fullname, &schema);
        Ok(schema)
    }
}

impl Default for SchemaParser {
    fn default() -> Self {
        Self::new()
    }
}
