/// Schema compiler: dispatches JSON Schema nodes to per-type handlers and
/// builds the validator tree. Conversion is a pure function of the input
/// node; nothing is cached between calls.
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::format::StringFormat;
use crate::merge::merge_all;
use crate::schema::{AdditionalProperties, Items, Schema, SchemaType};
use crate::validator::{
    pointer_push, Additional, Field, NumberRules, StringRules, UnionKeyword, Validator,
    ValidatorKind,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("Array schema must have items defined (at '#{location}')")]
    MissingItems { location: String },
    #[error("unsupported schema type{} (at '#{location}')", found_suffix(.found))]
    UnsupportedType {
        location: String,
        found: Option<String>,
    },
}

fn found_suffix(found: &Option<String>) -> String {
    match found {
        Some(t) => format!(" '{t}'"),
        None => String::new(),
    }
}

/// How a `oneOf` union treats values matched by several members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OneOfPolicy {
    /// Same as `anyOf`: the first matching member wins.
    #[default]
    FirstMatch,
    /// Exactly one member may match.
    Exclusive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    pub one_of: OneOfPolicy,
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a schema rooted at JSON Pointer `""`.
    pub fn compile(&self, schema: &Schema) -> Result<Validator, CompileError> {
        self.compile_node(schema, "")
    }

    fn compile_node(&self, schema: &Schema, location: &str) -> Result<Validator, CompileError> {
        trace!(location, type_name = ?schema.type_name, "compiling schema node");

        let validator = match schema.schema_type() {
            Some(SchemaType::String) => compile_string(schema, location),
            Some(SchemaType::Number) => compile_number(schema, location, false),
            Some(SchemaType::Integer) => compile_number(schema, location, true),
            Some(SchemaType::Boolean) => compile_boolean(schema, location),
            Some(SchemaType::Array) => self.compile_array(schema, location)?,
            Some(SchemaType::Object) => self.compile_object(schema, location)?,
            None => self.compile_combinator(schema, location)?,
        };

        Ok(annotate(validator, schema))
    }

    fn compile_array(&self, schema: &Schema, location: &str) -> Result<Validator, CompileError> {
        let missing = || CompileError::MissingItems {
            location: location.to_string(),
        };
        let element = match schema.items.as_ref().ok_or_else(missing)? {
            Items::Single(inner) => self.compile_node(inner, &pointer_push(location, "items"))?,
            Items::Tuple(list) if list.is_empty() => return Err(missing()),
            Items::Tuple(list) => self.compile_union(list, UnionKeyword::Items, false, location)?,
        };
        Ok(Validator::new(
            ValidatorKind::Array {
                items: Box::new(element),
            },
            location,
        ))
    }

    fn compile_object(&self, schema: &Schema, location: &str) -> Result<Validator, CompileError> {
        let required = schema.required.as_deref().unwrap_or_default();
        let mut fields = Vec::new();

        if let Some(props) = &schema.properties {
            let props_loc = pointer_push(location, "properties");
            for (name, prop) in props {
                let validator = self.compile_node(prop, &pointer_push(&props_loc, name))?;
                fields.push(Field {
                    name: name.clone(),
                    validator,
                    required: required.contains(name),
                });
            }
        }

        let additional = match &schema.additional_properties {
            Some(AdditionalProperties::Allowed(true)) => Additional::Any,
            Some(AdditionalProperties::Schema(extra)) => Additional::Schema(Box::new(
                self.compile_node(extra, &pointer_push(location, "additionalProperties"))?,
            )),
            Some(AdditionalProperties::Allowed(false)) | None => Additional::Reject,
        };

        Ok(Validator::new(
            ValidatorKind::Object { fields, additional },
            location,
        ))
    }

    fn compile_combinator(
        &self,
        schema: &Schema,
        location: &str,
    ) -> Result<Validator, CompileError> {
        if let Some(list) = non_empty(&schema.one_of) {
            let exclusive = self.options.one_of == OneOfPolicy::Exclusive;
            return self.compile_union(list, UnionKeyword::OneOf, exclusive, location);
        }
        if let Some(list) = non_empty(&schema.any_of) {
            return self.compile_union(list, UnionKeyword::AnyOf, false, location);
        }
        if let Some(merged) = non_empty(&schema.all_of).and_then(merge_all) {
            debug!(location, "merged allOf members into one schema");
            return self.compile_node(&merged, &pointer_push(location, "allOf"));
        }
        Err(CompileError::UnsupportedType {
            location: location.to_string(),
            found: schema.type_name.clone(),
        })
    }

    /// One member compiles to itself; two or more become a union located at
    /// the node that owns `keyword`.
    fn compile_union(
        &self,
        list: &[Schema],
        keyword: UnionKeyword,
        exclusive: bool,
        location: &str,
    ) -> Result<Validator, CompileError> {
        let keyword_loc = pointer_push(location, keyword.as_str());
        let mut variants = list
            .iter()
            .enumerate()
            .map(|(i, member)| self.compile_node(member, &pointer_push(&keyword_loc, &i.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        if variants.len() == 1 {
            return Ok(variants.remove(0));
        }
        debug!(
            location,
            keyword = keyword.as_str(),
            variants = variants.len(),
            exclusive,
            "built union"
        );
        Ok(Validator::new(
            ValidatorKind::Union {
                variants,
                keyword,
                exclusive,
            },
            location,
        ))
    }
}

fn non_empty(list: &Option<Vec<Schema>>) -> Option<&[Schema]> {
    list.as_deref().filter(|l| !l.is_empty())
}

fn compile_string(schema: &Schema, location: &str) -> Validator {
    if let Some(c) = &schema.const_value {
        return Validator::new(ValidatorKind::Literal(c.clone()), location);
    }
    if let Some(values) = &schema.enum_values {
        let texts = values.iter().map(enum_text).collect();
        return Validator::new(ValidatorKind::Enum(texts), location);
    }

    let format = schema.format.as_deref().and_then(|name| {
        let parsed = StringFormat::parse(name);
        if parsed.is_none() {
            debug!(location, format = name, "ignoring unrecognized string format");
        }
        parsed
    });
    Validator::new(
        ValidatorKind::String(StringRules {
            format,
            min_length: schema.min_length,
            max_length: schema.max_length,
        }),
        location,
    )
}

fn compile_number(schema: &Schema, location: &str, integer: bool) -> Validator {
    if let Some(c) = &schema.const_value {
        return Validator::new(ValidatorKind::Literal(c.clone()), location);
    }
    Validator::new(
        ValidatorKind::Number(NumberRules {
            integer,
            minimum: schema.minimum,
            maximum: schema.maximum,
        }),
        location,
    )
}

fn compile_boolean(schema: &Schema, location: &str) -> Validator {
    match &schema.const_value {
        Some(c) => Validator::new(ValidatorKind::Literal(c.clone()), location),
        None => Validator::new(ValidatorKind::Boolean, location),
    }
}

/// Text form of an enum member: strings verbatim, whole numbers without a
/// fractional part, everything else as compact JSON.
fn enum_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => n.as_f64().map(|f| f.to_string()).unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Metadata post-processing, applied to every compiled node.
fn annotate(validator: Validator, schema: &Schema) -> Validator {
    let validator = match schema.description.as_deref() {
        Some(text) if !text.is_empty() => validator.describe(text),
        _ => validator,
    };
    match &schema.default {
        Some(value) => validator.with_default(value.clone()),
        None => validator,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ViolationKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compile(v: Value) -> Result<Validator, CompileError> {
        Compiler::default().compile(&Schema::from_value(&v))
    }

    #[test]
    fn test_compile_type_string() {
        let v = compile(json!({"type": "string"})).unwrap();
        assert_eq!(v, Validator::new(ValidatorKind::String(StringRules::default()), ""));
    }

    #[test]
    fn test_compile_const_short_circuits() {
        let v = compile(json!({"type": "string", "const": "", "enum": ["a"]})).unwrap();
        assert_eq!(v.kind(), &ValidatorKind::Literal(json!("")));
        let v = compile(json!({"type": "integer", "const": 0, "minimum": 5})).unwrap();
        assert_eq!(v.kind(), &ValidatorKind::Literal(json!(0)));
        let v = compile(json!({"type": "boolean", "const": false})).unwrap();
        assert_eq!(v.kind(), &ValidatorKind::Literal(json!(false)));
    }

    #[test]
    fn test_compile_enum_coerces_to_text() {
        let v = compile(json!({"type": "string", "enum": ["a", 1, 2.5, true]})).unwrap();
        assert_eq!(
            v.kind(),
            &ValidatorKind::Enum(vec!["a".into(), "1".into(), "2.5".into(), "true".into()])
        );
    }

    #[test]
    fn test_zero_bounds_are_applied() {
        let v = compile(json!({"type": "string", "minLength": 0, "maxLength": 0})).unwrap();
        assert_eq!(
            v.kind(),
            &ValidatorKind::String(StringRules {
                format: None,
                min_length: Some(0),
                max_length: Some(0),
            })
        );
        assert!(v.check(&json!("")).is_ok());
        assert!(v.check(&json!("x")).is_err());

        let v = compile(json!({"type": "number", "minimum": 0})).unwrap();
        assert!(v.check(&json!(-0.5)).is_err());
        let v = compile(json!({"type": "number", "maximum": 0})).unwrap();
        assert!(v.check(&json!(0.5)).is_err());
    }

    #[test]
    fn test_unknown_format_ignored() {
        let v = compile(json!({"type": "string", "format": "hostname"})).unwrap();
        assert_eq!(v.kind(), &ValidatorKind::String(StringRules::default()));
    }

    #[test]
    fn test_compile_integer() {
        let v = compile(json!({"type": "integer", "maximum": 10})).unwrap();
        assert_eq!(
            v.kind(),
            &ValidatorKind::Number(NumberRules {
                integer: true,
                minimum: None,
                maximum: Some(10.0),
            })
        );
        assert!(v.check(&json!(1.5)).is_err());
    }

    #[test]
    fn test_array_requires_items() {
        let err = compile(json!({"type": "array"})).unwrap_err();
        assert_eq!(
            err,
            CompileError::MissingItems {
                location: String::new()
            }
        );
        assert!(err.to_string().contains("Array schema must have items defined"));
        assert!(compile(json!({"type": "array", "items": []})).is_err());
    }

    #[test]
    fn test_tuple_items_become_union() {
        let v = compile(json!({
            "type": "array",
            "items": [{"type": "string"}, {"type": "number"}]
        }))
        .unwrap();
        let items = v.items().unwrap();
        assert_eq!(items.variants().map(|vs| vs.len()), Some(2));
        assert!(v.check(&json!(["a", 1, "b"])).is_ok());
        assert!(v.check(&json!([true])).is_err());
    }

    #[test]
    fn test_singleton_tuple_is_not_a_union() {
        let v = compile(json!({"type": "array", "items": [{"type": "string"}]})).unwrap();
        let items = v.items().unwrap();
        assert!(items.variants().is_none());
        assert_eq!(items.location(), "/items/0");
    }

    #[test]
    fn test_object_required_and_optional() {
        let v = compile(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "age": {"type": "number"}},
            "required": ["name", "ghost"]
        }))
        .unwrap();
        assert!(v.field("name").unwrap().required);
        assert!(!v.field("age").unwrap().required);
        assert!(v.field("ghost").is_none());
        assert_eq!(v.field("age").unwrap().validator.location(), "/properties/age");
    }

    #[test]
    fn test_object_extensibility_policies() {
        let closed = compile(json!({"type": "object", "properties": {}})).unwrap();
        let explicit = compile(json!({"type": "object", "additionalProperties": false})).unwrap();
        let open = compile(json!({"type": "object", "additionalProperties": true})).unwrap();
        let typed = compile(json!({
            "type": "object",
            "additionalProperties": {"type": "number"}
        }))
        .unwrap();

        let extra = json!({"extra": 1});
        let errs = closed.check(&extra).unwrap_err();
        assert_eq!(
            errs[0].kind,
            ViolationKind::UnrecognizedKeys {
                keys: vec!["extra".into()]
            }
        );
        assert!(explicit.check(&extra).is_err());
        assert_eq!(open.check(&extra).unwrap(), extra);
        assert_eq!(typed.check(&extra).unwrap(), extra);
        let errs = typed.check(&json!({"extra": "one"})).unwrap_err();
        assert_eq!(errs[0].instance_path, "/extra");
        assert_eq!(errs[0].schema_path, "/additionalProperties/type");
    }

    #[test]
    fn test_single_member_combinator_unwrapped() {
        let v = compile(json!({"anyOf": [{"type": "boolean"}]})).unwrap();
        assert_eq!(v, Validator::new(ValidatorKind::Boolean, "/anyOf/0"));
    }

    #[test]
    fn test_one_of_checked_before_any_of() {
        let v = compile(json!({
            "oneOf": [{"type": "string"}, {"type": "number"}],
            "anyOf": [{"type": "boolean"}, {"type": "integer"}]
        }))
        .unwrap();
        match v.kind() {
            ValidatorKind::Union { keyword, .. } => assert_eq!(*keyword, UnionKeyword::OneOf),
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_combinator_falls_through() {
        let v = compile(json!({"oneOf": [], "anyOf": [{"type": "string"}]})).unwrap();
        assert_eq!(v.location(), "/anyOf/0");
        let err = compile(json!({"allOf": []})).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedType { .. }));
    }

    #[test]
    fn test_exclusive_one_of_option() {
        let schema = Schema::from_value(&json!({"oneOf": [{"type": "number"}, {"type": "integer"}]}));
        let loose = Compiler::default();
        assert_eq!(loose.options().one_of, OneOfPolicy::FirstMatch);
        let loose = loose.compile(&schema).unwrap();
        assert!(loose.check(&json!(3)).is_ok());

        let strict = Compiler::new(CompileOptions {
            one_of: OneOfPolicy::Exclusive,
        })
        .compile(&schema)
        .unwrap();
        assert!(strict.check(&json!(3)).is_err());
        assert!(strict.check(&json!(3.5)).is_ok());
    }

    #[test]
    fn test_exclusive_policy_leaves_any_of_alone() {
        let schema = Schema::from_value(&json!({"anyOf": [{"type": "number"}, {"type": "integer"}]}));
        let v = Compiler::new(CompileOptions {
            one_of: OneOfPolicy::Exclusive,
        })
        .compile(&schema)
        .unwrap();
        assert!(v.check(&json!(3)).is_ok());
    }

    #[test]
    fn test_all_of_later_type_wins() {
        let v = compile(json!({
            "allOf": [{"type": "string", "minLength": 2}, {"type": "number"}]
        }))
        .unwrap();
        assert!(matches!(v.kind(), ValidatorKind::Number(_)));
        assert_eq!(v.location(), "/allOf");
    }

    #[test]
    fn test_unsupported_type() {
        let err = compile(json!({"type": "unsupportedType"})).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnsupportedType {
                location: String::new(),
                found: Some("unsupportedType".into()),
            }
        );
        assert_eq!(
            err.to_string(),
            "unsupported schema type 'unsupportedType' (at '#')"
        );
    }

    #[test]
    fn test_nested_error_location() {
        let err = compile(json!({
            "type": "object",
            "properties": {"tags": {"type": "array"}}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            CompileError::MissingItems {
                location: "/properties/tags".into()
            }
        );
    }

    #[test]
    fn test_annotations() {
        let v = compile(json!({"type": "string", "description": "label", "default": ""})).unwrap();
        assert_eq!(v.description(), Some("label"));
        assert_eq!(v.default_value(), Some(&json!("")));

        let v = compile(json!({"type": "string", "description": ""})).unwrap();
        assert_eq!(v.description(), None);
    }

    #[test]
    fn test_options_deserialize() {
        let opts: CompileOptions = serde_json::from_value(json!({"oneOf": "exclusive"})).unwrap();
        assert_eq!(opts.one_of, OneOfPolicy::Exclusive);
        let opts: CompileOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(opts, CompileOptions::default());
    }
}
