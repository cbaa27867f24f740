//! Compiles JSON Schema documents into runtime validators.
//!
//! ```
//! use serde_json::json;
//!
//! let validator = jsonschema_compiler::convert_value(&json!({
//!     "type": "object",
//!     "properties": {"name": {"type": "string"}, "age": {"type": "number"}},
//!     "required": ["name"]
//! }))
//! .unwrap();
//!
//! assert!(validator.check(&json!({"name": "John", "age": 30})).is_ok());
//! assert!(validator.check(&json!({"age": 30})).is_err());
//! assert_eq!(validator.to_string(), "{ name: string; age?: number }");
//! ```
//!
//! Objects are closed unless `additionalProperties` says otherwise, `oneOf`
//! and `anyOf` share first-match semantics by default (see
//! [`compiler::OneOfPolicy`]), and `allOf` members are merged into a single
//! schema before compilation.
pub mod compiler;
pub mod format;
pub mod merge;
pub mod schema;
pub mod validator;

use serde_json::Value;

pub use compiler::{CompileError, CompileOptions, Compiler, OneOfPolicy};
pub use merge::merge_schemas;
pub use schema::Schema;
pub use validator::{Validator, ValidatorKind, Violation, ViolationKind};

/// Compile `schema` with default options.
pub fn convert(schema: &Schema) -> Result<Validator, CompileError> {
    Compiler::default().compile(schema)
}

/// Parse and compile a schema given as JSON.
pub fn convert_value(schema: &Value) -> Result<Validator, CompileError> {
    convert(&Schema::from_value(schema))
}
