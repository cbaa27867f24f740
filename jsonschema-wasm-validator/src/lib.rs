use std::sync::OnceLock;

use jsonschema_compiler::{Validator, Violation};
use wasm_bindgen::prelude::*;

/// Schema embedded at build time, compiled on first use.
const SCHEMA: &str = include_str!("../schema.json");

fn compiled() -> Result<&'static Validator, String> {
    static VALIDATOR: OnceLock<Result<Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            let schema: serde_json::Value =
                serde_json::from_str(SCHEMA).map_err(|e| format!("Invalid JSON in schema.json: {e}"))?;
            jsonschema_compiler::convert_value(&schema).map_err(|e| format!("Invalid schema.json: {e}"))
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Check a JSON document against the embedded schema.
/// Empty result means the instance is valid.
pub fn check_instance(instance_json: &str) -> Result<Vec<Violation>, String> {
    let instance: serde_json::Value =
        serde_json::from_str(instance_json).map_err(|e| format!("Invalid JSON: {e}"))?;
    Ok(compiled()?.check(&instance).err().unwrap_or_default())
}

/// Validate a JSON string against the embedded schema.
/// Returns a JSON array of error objects, each with `instancePath`,
/// `schemaPath` and `message`. Returns an empty array `[]` when valid.
#[wasm_bindgen]
pub fn validate(instance_json: &str) -> Result<JsValue, JsError> {
    let violations = check_instance(instance_json).map_err(|e| JsError::new(&e))?;

    let arr = js_sys::Array::new();
    for v in violations {
        let obj = js_sys::Object::new();
        js_sys::Reflect::set(&obj, &"instancePath".into(), &v.instance_path.into())
            .map_err(|_| JsError::new("cannot build error object"))?;
        js_sys::Reflect::set(&obj, &"schemaPath".into(), &v.schema_path.into())
            .map_err(|_| JsError::new("cannot build error object"))?;
        js_sys::Reflect::set(&obj, &"message".into(), &v.kind.to_string().into())
            .map_err(|_| JsError::new("cannot build error object"))?;
        arr.push(&obj);
    }
    Ok(arr.into())
}

/// The TypeScript type described by the embedded schema.
#[wasm_bindgen(js_name = schemaType)]
pub fn schema_type() -> Result<String, JsError> {
    compiled()
        .map(|v| v.to_string())
        .map_err(|e| JsError::new(&e))
}
