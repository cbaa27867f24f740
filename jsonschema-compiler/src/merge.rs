/// Structural merge of two schema nodes, used to fold `allOf`.
/// Every keyword present in `add` overrides `base`, except `properties`
/// (unioned key by key, `add` wins on collision) and `required` (set union).
use crate::schema::{Properties, Schema};

pub fn merge_schemas(base: &Schema, add: &Schema) -> Schema {
    // A keyword `add` spells but could not parse (including `default: null`)
    // still replaces whatever `base` had for it.
    let mut base = base.clone();
    for key in add.extra.keys() {
        base.clear_keyword(key);
    }

    let properties = match (&base.properties, &add.properties) {
        (Some(b), Some(a)) => Some(merge_properties(b, a)),
        _ => add.properties.clone().or_else(|| base.properties.clone()),
    };
    let required = match (&base.required, &add.required) {
        (Some(b), Some(a)) => Some(merge_required(b, a)),
        _ => add.required.clone().or_else(|| base.required.clone()),
    };

    let mut extra = base.extra.clone();
    for (key, v) in &add.extra {
        extra.insert(key.clone(), v.clone());
    }

    Schema {
        type_name: pick(&add.type_name, &base.type_name),
        properties,
        items: pick(&add.items, &base.items),
        required,
        enum_values: pick(&add.enum_values, &base.enum_values),
        format: pick(&add.format, &base.format),
        minimum: add.minimum.or(base.minimum),
        maximum: add.maximum.or(base.maximum),
        min_length: add.min_length.or(base.min_length),
        max_length: add.max_length.or(base.max_length),
        one_of: pick(&add.one_of, &base.one_of),
        any_of: pick(&add.any_of, &base.any_of),
        all_of: pick(&add.all_of, &base.all_of),
        description: pick(&add.description, &base.description),
        default: pick(&add.default, &base.default),
        const_value: pick(&add.const_value, &base.const_value),
        additional_properties: pick(&add.additional_properties, &base.additional_properties),
        extra,
    }
}

/// Fold a non-empty list left to right. `None` for an empty list.
pub fn merge_all(schemas: &[Schema]) -> Option<Schema> {
    let (first, rest) = schemas.split_first()?;
    Some(
        rest.iter()
            .fold(first.clone(), |acc, next| merge_schemas(&acc, next)),
    )
}

fn pick<T: Clone>(add: &Option<T>, base: &Option<T>) -> Option<T> {
    add.as_ref().or(base.as_ref()).cloned()
}

/// Colliding keys keep their original position with the incoming schema.
fn merge_properties(base: &Properties, add: &Properties) -> Properties {
    let mut merged = base.clone();
    for (name, schema) in add {
        match merged.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = schema.clone(),
            None => merged.push((name.clone(), schema.clone())),
        }
    }
    merged
}

fn merge_required(base: &[String], add: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(base.len() + add.len());
    for name in base.iter().chain(add) {
        if !merged.contains(name) {
            merged.push(name.clone());
        }
    }
    merged
}
