/// Validator tree emitted by the compiler.
/// Immutable, tagged values; checking walks the tree and collects every
/// violation with its instance path and schema path (both JSON Pointers).
use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};

use crate::format::StringFormat;

/// One compiled schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct Validator {
    kind: ValidatorKind,
    /// JSON Pointer of the schema node this validator was compiled from.
    location: String,
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidatorKind {
    /// Accepts any present value. Used for `additionalProperties: true`.
    Any,
    /// `const`: exactly one JSON value.
    Literal(Value),
    /// String `enum`: closed set of texts.
    Enum(Vec<String>),
    String(StringRules),
    Number(NumberRules),
    Boolean,
    /// Homogeneous sequence, no length constraints.
    Array { items: Box<Validator> },
    Object {
        fields: Vec<Field>,
        additional: Additional,
    },
    /// Two or more alternatives; the first match supplies the parsed value.
    Union {
        variants: Vec<Validator>,
        keyword: UnionKeyword,
        exclusive: bool,
    },
    /// Substitutes `value` when the input is absent.
    Default { value: Value, inner: Box<Validator> },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringRules {
    pub format: Option<StringFormat>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumberRules {
    pub integer: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

/// A declared object property.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub validator: Validator,
    pub required: bool,
}

/// Policy for keys not declared in `properties`.
#[derive(Debug, Clone, PartialEq)]
pub enum Additional {
    /// Closed object: undeclared keys are violations.
    Reject,
    /// Undeclared keys pass through unchecked.
    Any,
    /// Undeclared keys must satisfy this validator.
    Schema(Box<Validator>),
}

/// The keyword a union was built from; names the schema path of union errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionKeyword {
    OneOf,
    AnyOf,
    Items,
}

impl UnionKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnionKeyword::OneOf => "oneOf",
            UnionKeyword::AnyOf => "anyOf",
            UnionKeyword::Items => "items",
        }
    }
}

/// One failed check.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub instance_path: String,
    pub schema_path: String,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViolationKind {
    #[error("required value is missing")]
    Required,
    #[error("expected {expected}, found {found}")]
    InvalidType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("expected the literal value {expected}")]
    NotConst { expected: Value },
    #[error("expected one of {}", quote_list(.allowed))]
    NotInEnum { allowed: Vec<String> },
    #[error("not a valid {} string", .0.as_str())]
    InvalidFormat(StringFormat),
    #[error("must contain at least {min} character(s)")]
    TooShort { min: u64 },
    #[error("must contain at most {max} character(s)")]
    TooLong { max: u64 },
    #[error("expected an integer, found {found}")]
    NotInteger { found: f64 },
    #[error("must be greater than or equal to {minimum}")]
    TooSmall { minimum: f64 },
    #[error("must be less than or equal to {maximum}")]
    TooLarge { maximum: f64 },
    #[error("unrecognized key(s) in object: {}", quote_list(.keys))]
    UnrecognizedKeys { keys: Vec<String> },
    #[error("matched none of the {} alternatives", .attempts.len())]
    NoUnionMatch { attempts: Vec<Vec<Violation>> },
    #[error("matched {matched} alternatives, expected exactly one")]
    AmbiguousUnionMatch { matched: usize },
}

fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.instance_path.is_empty() {
            "<root>"
        } else {
            &self.instance_path
        };
        write!(f, "{at}: {}", self.kind)
    }
}

impl Serialize for Violation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Violation", 3)?;
        st.serialize_field("instancePath", &self.instance_path)?;
        st.serialize_field("schemaPath", &self.schema_path)?;
        st.serialize_field("message", &self.kind.to_string())?;
        st.end()
    }
}

impl Validator {
    pub fn new(kind: ValidatorKind, location: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            description: None,
        }
    }

    /// Attach a description without changing checking behavior.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Wrap so an absent input is replaced by `value` before checking.
    pub fn with_default(self, value: Value) -> Self {
        let location = self.location.clone();
        Self::new(
            ValidatorKind::Default {
                value,
                inner: Box::new(self),
            },
            location,
        )
    }

    pub fn kind(&self) -> &ValidatorKind {
        &self.kind
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Description of this validator, looking through a default wrapper.
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or_else(|| match &self.kind {
                ValidatorKind::Default { inner, .. } => inner.description(),
                _ => None,
            })
    }

    pub fn default_value(&self) -> Option<&Value> {
        match &self.kind {
            ValidatorKind::Default { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The validator with any default wrapper removed.
    pub fn inner(&self) -> &Validator {
        match &self.kind {
            ValidatorKind::Default { inner, .. } => inner.inner(),
            _ => self,
        }
    }

    /// Declared property validator of an object validator.
    pub fn field(&self, name: &str) -> Option<&Field> {
        match &self.inner().kind {
            ValidatorKind::Object { fields, .. } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Element validator of an array validator.
    pub fn items(&self) -> Option<&Validator> {
        match &self.inner().kind {
            ValidatorKind::Array { items } => Some(items),
            _ => None,
        }
    }

    /// Alternatives of a union validator.
    pub fn variants(&self) -> Option<&[Validator]> {
        match &self.inner().kind {
            ValidatorKind::Union { variants, .. } => Some(variants),
            _ => None,
        }
    }

    /// Whether an absent input can be filled, directly or by a union member.
    fn has_default(&self) -> bool {
        match &self.kind {
            ValidatorKind::Default { .. } => true,
            ValidatorKind::Union { variants, .. } => variants.iter().any(Validator::has_default),
            _ => false,
        }
    }

    /// Check a present value. Returns the parsed value or every violation.
    pub fn check(&self, value: &Value) -> Result<Value, Vec<Violation>> {
        self.check_optional(Some(value))
    }

    /// Check a possibly absent value; `None` is only accepted when a default
    /// is attached.
    pub fn check_optional(&self, value: Option<&Value>) -> Result<Value, Vec<Violation>> {
        let mut errors = Vec::new();
        match self.validate(value, "", &mut errors) {
            Some(parsed) if errors.is_empty() => Ok(parsed),
            _ => Err(errors),
        }
    }

    fn violation(&self, ip: &str, keyword: &str, kind: ViolationKind) -> Violation {
        Violation {
            instance_path: ip.to_string(),
            schema_path: pointer_push(&self.location, keyword),
            kind,
        }
    }

    /// Returns the parsed value, or `None` after pushing at least one error.
    fn validate(&self, value: Option<&Value>, ip: &str, errors: &mut Vec<Violation>) -> Option<Value> {
        let Some(value) = value else {
            match &self.kind {
                ValidatorKind::Default { value, inner } => {
                    return inner.validate(Some(value), ip, errors);
                }
                ValidatorKind::Union {
                    variants,
                    keyword,
                    exclusive,
                } if self.has_default() => {
                    return self.validate_union(variants, *keyword, *exclusive, None, ip, errors);
                }
                _ => {}
            }
            errors.push(Violation {
                instance_path: ip.to_string(),
                schema_path: self.location.clone(),
                kind: ViolationKind::Required,
            });
            return None;
        };

        match &self.kind {
            ValidatorKind::Any => Some(value.clone()),
            ValidatorKind::Default { inner, .. } => inner.validate(Some(value), ip, errors),
            ValidatorKind::Literal(expected) => {
                if literal_eq(expected, value) {
                    Some(value.clone())
                } else {
                    errors.push(self.violation(
                        ip,
                        "const",
                        ViolationKind::NotConst {
                            expected: expected.clone(),
                        },
                    ));
                    None
                }
            }
            ValidatorKind::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.iter().any(|a| a == s) => Some(value.clone()),
                _ => {
                    errors.push(self.violation(
                        ip,
                        "enum",
                        ViolationKind::NotInEnum {
                            allowed: allowed.clone(),
                        },
                    ));
                    None
                }
            },
            ValidatorKind::String(rules) => self.validate_string(rules, value, ip, errors),
            ValidatorKind::Number(rules) => self.validate_number(rules, value, ip, errors),
            ValidatorKind::Boolean => {
                if value.is_boolean() {
                    Some(value.clone())
                } else {
                    errors.push(self.type_violation(ip, "boolean", value));
                    None
                }
            }
            ValidatorKind::Array { items } => {
                let Some(elements) = value.as_array() else {
                    errors.push(self.type_violation(ip, "array", value));
                    return None;
                };
                let before = errors.len();
                let mut out = Vec::with_capacity(elements.len());
                for (i, elem) in elements.iter().enumerate() {
                    let elem_ip = pointer_push(ip, &i.to_string());
                    if let Some(parsed) = items.validate(Some(elem), &elem_ip, errors) {
                        out.push(parsed);
                    }
                }
                (errors.len() == before).then_some(Value::Array(out))
            }
            ValidatorKind::Object { fields, additional } => {
                self.validate_object(fields, additional, value, ip, errors)
            }
            ValidatorKind::Union {
                variants,
                keyword,
                exclusive,
            } => self.validate_union(variants, *keyword, *exclusive, Some(value), ip, errors),
        }
    }

    fn type_violation(&self, ip: &str, expected: &'static str, value: &Value) -> Violation {
        self.violation(
            ip,
            "type",
            ViolationKind::InvalidType {
                expected,
                found: json_type_name(value),
            },
        )
    }

    fn validate_string(
        &self,
        rules: &StringRules,
        value: &Value,
        ip: &str,
        errors: &mut Vec<Violation>,
    ) -> Option<Value> {
        let Some(s) = value.as_str() else {
            errors.push(self.type_violation(ip, "string", value));
            return None;
        };
        let before = errors.len();
        if let Some(format) = rules.format {
            if !format.matches(s) {
                errors.push(self.violation(ip, "format", ViolationKind::InvalidFormat(format)));
            }
        }
        let len = s.chars().count() as u64;
        if let Some(min) = rules.min_length {
            if len < min {
                errors.push(self.violation(ip, "minLength", ViolationKind::TooShort { min }));
            }
        }
        if let Some(max) = rules.max_length {
            if len > max {
                errors.push(self.violation(ip, "maxLength", ViolationKind::TooLong { max }));
            }
        }
        (errors.len() == before).then(|| value.clone())
    }

    fn validate_number(
        &self,
        rules: &NumberRules,
        value: &Value,
        ip: &str,
        errors: &mut Vec<Violation>,
    ) -> Option<Value> {
        let Some(n) = value.as_f64() else {
            let expected = if rules.integer { "integer" } else { "number" };
            errors.push(self.type_violation(ip, expected, value));
            return None;
        };
        let before = errors.len();
        if rules.integer && !(value.is_i64() || value.is_u64() || n.fract() == 0.0) {
            errors.push(self.violation(ip, "type", ViolationKind::NotInteger { found: n }));
        }
        if let Some(minimum) = rules.minimum {
            if n < minimum {
                errors.push(self.violation(ip, "minimum", ViolationKind::TooSmall { minimum }));
            }
        }
        if let Some(maximum) = rules.maximum {
            if n > maximum {
                errors.push(self.violation(ip, "maximum", ViolationKind::TooLarge { maximum }));
            }
        }
        (errors.len() == before).then(|| value.clone())
    }

    fn validate_object(
        &self,
        fields: &[Field],
        additional: &Additional,
        value: &Value,
        ip: &str,
        errors: &mut Vec<Violation>,
    ) -> Option<Value> {
        let Some(obj) = value.as_object() else {
            errors.push(self.type_violation(ip, "object", value));
            return None;
        };
        let before = errors.len();
        let mut out = Map::new();

        for field in fields {
            let field_ip = pointer_push(ip, &field.name);
            match obj.get(&field.name) {
                Some(v) => {
                    if let Some(parsed) = field.validator.validate(Some(v), &field_ip, errors) {
                        out.insert(field.name.clone(), parsed);
                    }
                }
                None if field.validator.has_default() => {
                    if let Some(parsed) = field.validator.validate(None, &field_ip, errors) {
                        out.insert(field.name.clone(), parsed);
                    }
                }
                None if field.required => {
                    errors.push(Violation {
                        instance_path: field_ip,
                        schema_path: pointer_push(&self.location, "required"),
                        kind: ViolationKind::Required,
                    });
                }
                None => {}
            }
        }

        let mut unrecognized = Vec::new();
        for (key, v) in obj {
            if fields.iter().any(|f| &f.name == key) {
                continue;
            }
            match additional {
                Additional::Reject => unrecognized.push(key.clone()),
                Additional::Any => {
                    out.insert(key.clone(), v.clone());
                }
                Additional::Schema(extra) => {
                    let key_ip = pointer_push(ip, key);
                    if let Some(parsed) = extra.validate(Some(v), &key_ip, errors) {
                        out.insert(key.clone(), parsed);
                    }
                }
            }
        }
        if !unrecognized.is_empty() {
            errors.push(self.violation(
                ip,
                "additionalProperties",
                ViolationKind::UnrecognizedKeys { keys: unrecognized },
            ));
        }

        (errors.len() == before).then_some(Value::Object(out))
    }

    fn validate_union(
        &self,
        variants: &[Validator],
        keyword: UnionKeyword,
        exclusive: bool,
        value: Option<&Value>,
        ip: &str,
        errors: &mut Vec<Violation>,
    ) -> Option<Value> {
        let mut attempts = Vec::new();
        let mut first_match = None;
        let mut matched = 0usize;

        for variant in variants {
            let mut scratch = Vec::new();
            match variant.validate(value, ip, &mut scratch) {
                Some(parsed) if scratch.is_empty() => {
                    matched += 1;
                    if first_match.is_none() {
                        first_match = Some(parsed);
                    }
                    if !exclusive {
                        break;
                    }
                }
                _ => attempts.push(scratch),
            }
        }

        if matched > 1 {
            errors.push(self.violation(
                ip,
                keyword.as_str(),
                ViolationKind::AmbiguousUnionMatch { matched },
            ));
            return None;
        }
        if first_match.is_none() {
            errors.push(self.violation(
                ip,
                keyword.as_str(),
                ViolationKind::NoUnionMatch { attempts },
            ));
        }
        first_match
    }
}

/// Renders the static type this validator accepts, in TypeScript notation.
impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValidatorKind::Any => write!(f, "unknown"),
            ValidatorKind::Literal(v) => write!(f, "{v}"),
            ValidatorKind::Enum(values) if values.is_empty() => write!(f, "never"),
            ValidatorKind::Enum(values) => {
                let parts: Vec<String> = values.iter().map(|v| Value::from(v.as_str()).to_string()).collect();
                write!(f, "{}", parts.join(" | "))
            }
            ValidatorKind::String(_) => write!(f, "string"),
            ValidatorKind::Number(_) => write!(f, "number"),
            ValidatorKind::Boolean => write!(f, "boolean"),
            ValidatorKind::Array { items } => {
                let needs_parens = matches!(
                    items.inner().kind,
                    ValidatorKind::Union { .. }
                ) || matches!(&items.inner().kind, ValidatorKind::Enum(v) if v.len() > 1);
                if needs_parens {
                    write!(f, "({items})[]")
                } else {
                    write!(f, "{items}[]")
                }
            }
            ValidatorKind::Object { fields, additional } => {
                let mut members: Vec<String> = fields
                    .iter()
                    .map(|field| {
                        let optional = !field.required && !field.validator.has_default();
                        let mark = if optional { "?" } else { "" };
                        format!("{}{mark}: {}", property_name(&field.name), field.validator)
                    })
                    .collect();
                match additional {
                    Additional::Reject => {}
                    Additional::Any => members.push("[key: string]: unknown".to_string()),
                    Additional::Schema(v) => members.push(format!("[key: string]: {v}")),
                }
                if members.is_empty() {
                    write!(f, "{{}}")
                } else {
                    write!(f, "{{ {} }}", members.join("; "))
                }
            }
            ValidatorKind::Union { variants, .. } => {
                let parts: Vec<String> = variants.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(" | "))
            }
            ValidatorKind::Default { inner, .. } => write!(f, "{inner}"),
        }
    }
}

/// Quote property names that are not plain identifiers.
fn property_name(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if plain {
        name.to_string()
    } else {
        Value::from(name).to_string()
    }
}

/// Numbers compare by value so `1` matches `1.0`.
fn literal_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => expected == actual,
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Append one reference token to a JSON Pointer (RFC 6901 escaping).
pub fn pointer_push(base: &str, token: &str) -> String {
    let escaped = token.replace('~', "~0").replace('/', "~1");
    format!("{base}/{escaped}")
}
