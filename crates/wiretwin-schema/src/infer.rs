//! Schema inference from sample JSON documents.

use crate::ir::{AdditionalProperties, Schema, SchemaType};
use crate::types::{InferOptions, InferResult};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Infer one schema covering every parseable sample.
///
/// Unparseable samples are skipped. With no usable sample the result is the
/// unconstrained schema, `sample_count == 0` and `all_match == false`.
pub fn infer<S: AsRef<[u8]>>(samples: &[S], opts: &InferOptions) -> InferResult {
    let values: Vec<Value> = samples
        .iter()
        .enumerate()
        .filter_map(|(idx, sample)| match serde_json::from_slice(sample.as_ref()) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Skipping sample {}: {}", idx, e);
                None
            }
        })
        .collect();

    infer_from_values(&values, opts)
}

/// Infer from already parsed samples.
pub fn infer_from_values(values: &[Value], opts: &InferOptions) -> InferResult {
    let per_sample: Vec<Schema> = values.iter().map(|v| infer_value(v, opts)).collect();

    let rendered: Vec<Option<String>> = per_sample
        .iter()
        .map(|s| serde_json::to_string(s).ok())
        .collect();
    let all_match = !rendered.is_empty()
        && rendered[0].is_some()
        && rendered.iter().all(|r| *r == rendered[0]);

    let mut schema = per_sample
        .into_iter()
        .reduce(merge)
        .unwrap_or_default();
    if let Some(allowed) = opts.additional_properties {
        apply_additional_properties(&mut schema, allowed);
    }

    InferResult {
        schema,
        sample_count: values.len(),
        all_match,
    }
}

/// Schema of a single value. Object `required` lists every key present
/// (minus null-valued keys when `mark_nullable_as_optional` is set); merging
/// intersects these lists.
pub fn infer_value(value: &Value, opts: &InferOptions) -> Schema {
    match value {
        Value::Null => Schema::of(SchemaType::Null),
        Value::Bool(_) => Schema::of(SchemaType::Boolean),
        Value::Number(n) => {
            let integral = n.is_i64()
                || n.is_u64()
                || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0);
            Schema::of(if integral {
                SchemaType::Integer
            } else {
                SchemaType::Number
            })
        }
        Value::String(_) => Schema::of(SchemaType::String),
        Value::Array(elements) => {
            let items = elements
                .iter()
                .map(|e| infer_value(e, opts))
                .reduce(merge);
            Schema {
                schema_type: Some(SchemaType::Array),
                items: items.map(Box::new),
                ..Default::default()
            }
        }
        Value::Object(map) => {
            let properties: BTreeMap<String, Schema> = map
                .iter()
                .map(|(k, v)| (k.clone(), infer_value(v, opts)))
                .collect();
            let required = if opts.strict_required {
                let mut keys: Vec<String> = map
                    .iter()
                    .filter(|(_, v)| !(opts.mark_nullable_as_optional && v.is_null()))
                    .map(|(k, _)| k.clone())
                    .collect();
                keys.sort();
                keys
            } else {
                Vec::new()
            };
            Schema::object(properties, required)
        }
    }
}

/// Merge two schemas into one that accepts what either accepts.
pub fn merge(a: Schema, b: Schema) -> Schema {
    if a == b {
        return a;
    }

    let mut variants: Vec<Schema> = Vec::new();
    for candidate in union_members(a).into_iter().chain(union_members(b)) {
        let same = candidate.schema_type.and_then(|t| {
            variants
                .iter()
                .position(|v| v.schema_type == Some(t))
        });
        match same {
            Some(idx) => {
                let existing = std::mem::take(&mut variants[idx]);
                variants[idx] = merge_same_type(existing, candidate);
            }
            None if variants.contains(&candidate) => {}
            None => variants.push(candidate),
        }
    }

    if variants.len() == 1 {
        return variants.remove(0);
    }
    variants.sort_by(|x, y| x.type_label().cmp(&y.type_label()));
    Schema::any_of(variants)
}

fn union_members(schema: Schema) -> Vec<Schema> {
    if schema.schema_type.is_none() && schema.reference.is_none() && !schema.any_of.is_empty() {
        schema.any_of
    } else {
        vec![schema]
    }
}

fn merge_same_type(a: Schema, b: Schema) -> Schema {
    match a.schema_type {
        Some(SchemaType::Object) => {
            let mut properties = a.properties.unwrap_or_default();
            for (key, schema) in b.properties.unwrap_or_default() {
                let merged = match properties.remove(&key) {
                    Some(existing) => merge(existing, schema),
                    None => schema,
                };
                properties.insert(key, merged);
            }
            let theirs: BTreeSet<&String> = b.required.iter().collect();
            let required = a
                .required
                .iter()
                .filter(|k| theirs.contains(k))
                .cloned()
                .collect();
            Schema {
                properties: Some(properties),
                required,
                additional_properties: a.additional_properties,
                ..Schema::of(SchemaType::Object)
            }
        }
        Some(SchemaType::Array) => {
            let items = match (a.items, b.items) {
                (Some(x), Some(y)) => Some(Box::new(merge(*x, *y))),
                (x, y) => x.or(y),
            };
            Schema {
                items,
                ..Schema::of(SchemaType::Array)
            }
        }
        _ => a,
    }
}

fn apply_additional_properties(schema: &mut Schema, allowed: bool) {
    if schema.schema_type == Some(SchemaType::Object) {
        schema.additional_properties = Some(AdditionalProperties::Allowed(allowed));
    }
    if let Some(properties) = schema.properties.as_mut() {
        for child in properties.values_mut() {
            apply_additional_properties(child, allowed);
        }
    }
    if let Some(items) = schema.items.as_mut() {
        apply_additional_properties(items, allowed);
    }
    for variant in &mut schema.any_of {
        apply_additional_properties(variant, allowed);
    }
}
