/// JSON Schema node model consumed by the compiler.
/// Recognized keywords are lifted into typed fields; everything else is kept
/// verbatim in `extra`. Parsing is lenient: a recognized keyword with the
/// wrong JSON shape is treated as absent and preserved in `extra` as well.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// The `type` values the dispatcher routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    pub fn parse(s: &str) -> Option<SchemaType> {
        match s {
            "string" => Some(SchemaType::String),
            "number" => Some(SchemaType::Number),
            "integer" => Some(SchemaType::Integer),
            "boolean" => Some(SchemaType::Boolean),
            "array" => Some(SchemaType::Array),
            "object" => Some(SchemaType::Object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
        }
    }
}

/// `items`: one schema for every element, or a tuple of positional schemas.
#[derive(Debug, Clone, PartialEq)]
pub enum Items {
    Single(Box<Schema>),
    Tuple(Vec<Schema>),
}

/// `additionalProperties`: a flag or a schema for undeclared keys.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<Schema>),
}

/// Declared properties in declaration order.
pub type Properties = Vec<(String, Schema)>;

/// One JSON Schema fragment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// Raw `type` string. Routed through [`SchemaType::parse`] at dispatch so
    /// unknown names survive for error reporting.
    pub type_name: Option<String>,
    pub properties: Option<Properties>,
    pub items: Option<Items>,
    pub required: Option<Vec<String>>,
    pub enum_values: Option<Vec<Value>>,
    pub format: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub one_of: Option<Vec<Schema>>,
    pub any_of: Option<Vec<Schema>>,
    pub all_of: Option<Vec<Schema>>,
    pub description: Option<String>,
    /// `default`; JSON `null` is the absent sentinel and never lands here.
    pub default: Option<Value>,
    pub const_value: Option<Value>,
    pub additional_properties: Option<AdditionalProperties>,
    /// Unrecognized or malformed keywords, preserved verbatim.
    pub extra: Map<String, Value>,
}

impl Schema {
    /// The recognized dispatch type, if `type` names one.
    pub fn schema_type(&self) -> Option<SchemaType> {
        self.type_name.as_deref().and_then(SchemaType::parse)
    }

    /// Parse a schema node from JSON. Never fails: a non-object yields an
    /// empty node, which the compiler later rejects as unsupported.
    pub fn from_value(value: &Value) -> Schema {
        let mut schema = Schema::default();
        let Some(obj) = value.as_object() else {
            return schema;
        };

        for (key, v) in obj {
            let recognized = match key.as_str() {
                "type" => set(&mut schema.type_name, v.as_str().map(str::to_string)),
                "properties" => set(&mut schema.properties, parse_properties(v)),
                "items" => set(&mut schema.items, parse_items(v)),
                "required" => set(&mut schema.required, parse_required(v)),
                "enum" => set(&mut schema.enum_values, v.as_array().cloned()),
                "format" => set(&mut schema.format, v.as_str().map(str::to_string)),
                "minimum" => set(&mut schema.minimum, v.as_f64()),
                "maximum" => set(&mut schema.maximum, v.as_f64()),
                "minLength" => set(&mut schema.min_length, length_value(v)),
                "maxLength" => set(&mut schema.max_length, length_value(v)),
                "oneOf" => set(&mut schema.one_of, parse_schema_list(v)),
                "anyOf" => set(&mut schema.any_of, parse_schema_list(v)),
                "allOf" => set(&mut schema.all_of, parse_schema_list(v)),
                "description" => set(&mut schema.description, v.as_str().map(str::to_string)),
                "default" => set(&mut schema.default, (!v.is_null()).then(|| v.clone())),
                "const" => set(&mut schema.const_value, Some(v.clone())),
                "additionalProperties" => set(
                    &mut schema.additional_properties,
                    parse_additional_properties(v),
                ),
                _ => false,
            };
            if !recognized {
                schema.extra.insert(key.clone(), v.clone());
            }
        }

        schema
    }

    /// Drop the parsed value of a recognized keyword. Unknown keys are ignored.
    pub(crate) fn clear_keyword(&mut self, key: &str) {
        match key {
            "type" => self.type_name = None,
            "properties" => self.properties = None,
            "items" => self.items = None,
            "required" => self.required = None,
            "enum" => self.enum_values = None,
            "format" => self.format = None,
            "minimum" => self.minimum = None,
            "maximum" => self.maximum = None,
            "minLength" => self.min_length = None,
            "maxLength" => self.max_length = None,
            "oneOf" => self.one_of = None,
            "anyOf" => self.any_of = None,
            "allOf" => self.all_of = None,
            "description" => self.description = None,
            "default" => self.default = None,
            "const" => self.const_value = None,
            "additionalProperties" => self.additional_properties = None,
            _ => {}
        }
    }

    /// Render the node back to JSON. Recognized keywords come first in a
    /// fixed order, followed by `extra` in its original order.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(t) = &self.type_name {
            obj.insert("type".into(), Value::String(t.clone()));
        }
        if let Some(d) = &self.description {
            obj.insert("description".into(), Value::String(d.clone()));
        }
        if let Some(props) = &self.properties {
            let map = props
                .iter()
                .map(|(name, s)| (name.clone(), s.to_value()))
                .collect();
            obj.insert("properties".into(), Value::Object(map));
        }
        if let Some(req) = &self.required {
            obj.insert(
                "required".into(),
                Value::Array(req.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(ap) = &self.additional_properties {
            let v = match ap {
                AdditionalProperties::Allowed(b) => Value::Bool(*b),
                AdditionalProperties::Schema(s) => s.to_value(),
            };
            obj.insert("additionalProperties".into(), v);
        }
        if let Some(items) = &self.items {
            let v = match items {
                Items::Single(s) => s.to_value(),
                Items::Tuple(list) => schema_list_value(list),
            };
            obj.insert("items".into(), v);
        }
        if let Some(values) = &self.enum_values {
            obj.insert("enum".into(), Value::Array(values.clone()));
        }
        if let Some(c) = &self.const_value {
            obj.insert("const".into(), c.clone());
        }
        if let Some(f) = &self.format {
            obj.insert("format".into(), Value::String(f.clone()));
        }
        if let Some(n) = self.minimum {
            obj.insert("minimum".into(), number_value(n));
        }
        if let Some(n) = self.maximum {
            obj.insert("maximum".into(), number_value(n));
        }
        if let Some(n) = self.min_length {
            obj.insert("minLength".into(), Value::from(n));
        }
        if let Some(n) = self.max_length {
            obj.insert("maxLength".into(), Value::from(n));
        }
        for (key, list) in [
            ("oneOf", &self.one_of),
            ("anyOf", &self.any_of),
            ("allOf", &self.all_of),
        ] {
            if let Some(list) = list {
                obj.insert(key.into(), schema_list_value(list));
            }
        }
        if let Some(d) = &self.default {
            obj.insert("default".into(), d.clone());
        }
        for (key, v) in &self.extra {
            obj.entry(key.clone()).or_insert_with(|| v.clone());
        }
        Value::Object(obj)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Schema::from_value(&value))
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Store a parsed keyword; report whether it was usable.
fn set<T>(slot: &mut Option<T>, parsed: Option<T>) -> bool {
    match parsed {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

/// Non-negative integer, also written as a whole float such as `2.0`.
fn length_value(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn parse_properties(v: &Value) -> Option<Properties> {
    let obj = v.as_object()?;
    Some(
        obj.iter()
            .map(|(name, s)| (name.clone(), Schema::from_value(s)))
            .collect(),
    )
}

fn parse_items(v: &Value) -> Option<Items> {
    match v {
        Value::Object(_) => Some(Items::Single(Box::new(Schema::from_value(v)))),
        Value::Array(list) => Some(Items::Tuple(list.iter().map(Schema::from_value).collect())),
        _ => None,
    }
}

fn parse_required(v: &Value) -> Option<Vec<String>> {
    let arr = v.as_array()?;
    Some(
        arr.iter()
            .filter_map(|name| name.as_str().map(str::to_string))
            .collect(),
    )
}

fn parse_schema_list(v: &Value) -> Option<Vec<Schema>> {
    Some(v.as_array()?.iter().map(Schema::from_value).collect())
}

fn parse_additional_properties(v: &Value) -> Option<AdditionalProperties> {
    match v {
        Value::Bool(b) => Some(AdditionalProperties::Allowed(*b)),
        Value::Object(_) => Some(AdditionalProperties::Schema(Box::new(Schema::from_value(v)))),
        _ => None,
    }
}

fn schema_list_value(list: &[Schema]) -> Value {
    Value::Array(list.iter().map(Schema::to_value).collect())
}

/// Whole numbers render as integers so `{"minimum": 0}` survives unchanged.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
