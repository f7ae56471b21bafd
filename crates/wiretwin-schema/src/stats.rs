//! Per-field statistics over sample documents.

use crate::ir::{Schema, SchemaType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Minimum number of string observations before format detection runs.
const MIN_FORMAT_SAMPLES: usize = 5;
const MAX_ENUM_VALUES: usize = 10;
const MAX_EXAMPLES: usize = 3;

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid pattern is valid")
});
static ISO8601: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}(T\d{2}:\d{2}:\d{2})?").expect("iso8601 pattern is valid")
});
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").expect("url pattern is valid"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("email pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStat {
    /// Dotted path; array elements add a `[]` suffix.
    pub path: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub present: usize,
    #[serde(rename = "null")]
    pub null_count: usize,
    pub frequency: f64,
    pub required: bool,
    pub nullable: bool,
    pub distinct: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    /// `uuid`, `iso8601`, `url`, `email`, `enum` or empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

/// Field stats for every property reachable from `schema`, parsing `samples`
/// as JSON and skipping the ones that fail.
pub fn field_stats<S: AsRef<[u8]>>(schema: &Schema, samples: &[S]) -> Vec<FieldStat> {
    let values: Vec<Value> = samples
        .iter()
        .filter_map(|s| serde_json::from_slice(s.as_ref()).ok())
        .collect();
    if values.len() < samples.len() {
        debug!(
            "Skipped {} unparseable sample(s)",
            samples.len() - values.len()
        );
    }
    field_stats_for_values(schema, &values, DEFAULT_MAX_DEPTH)
}

/// Field stats over parsed samples with an explicit depth limit.
pub fn field_stats_for_values(schema: &Schema, values: &[Value], max_depth: usize) -> Vec<FieldStat> {
    let walker = Walker {
        root: schema,
        max_depth,
    };
    let containers: Vec<&Value> = values.iter().collect();
    let mut out = Vec::new();
    walker.walk_object(schema, &containers, "", 1, &mut out);
    out
}

struct Walker<'a> {
    root: &'a Schema,
    max_depth: usize,
}

impl<'a> Walker<'a> {
    /// `containers` are the JSON values at this object's position, one per
    /// observation; non-objects count as observations without the key.
    fn walk_object(
        &self,
        schema: &'a Schema,
        containers: &[&Value],
        prefix: &str,
        depth: usize,
        out: &mut Vec<FieldStat>,
    ) {
        if depth > self.max_depth {
            out.push(FieldStat {
                path: format!("{prefix} (truncated at depth limit)"),
                field_type: "...".to_string(),
                ..Default::default()
            });
            return;
        }
        let Some(properties) = schema.properties.as_ref() else {
            return;
        };

        for (name, child) in properties {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            let child = child.resolve(self.root).unwrap_or(child);
            let observed: Vec<Option<&Value>> =
                containers.iter().map(|c| c.get(name.as_str())).collect();

            out.push(stat_for(&path, child, &observed, containers.len()));
            self.descend(child, &observed, &path, depth, out);
        }
    }

    fn descend(
        &self,
        child: &'a Schema,
        observed: &[Option<&Value>],
        path: &str,
        depth: usize,
        out: &mut Vec<FieldStat>,
    ) {
        let present: Vec<&Value> = observed
            .iter()
            .flatten()
            .copied()
            .filter(|v| !v.is_null())
            .collect();

        if let Some(object) = member_of(child, SchemaType::Object, self.root) {
            let objects: Vec<&Value> = present.iter().copied().filter(|v| v.is_object()).collect();
            self.walk_object(object, &objects, path, depth + 1, out);
        }

        if let Some(items) = member_of(child, SchemaType::Array, self.root)
            .and_then(|a| a.items.as_deref())
        {
            let items = items.resolve(self.root).unwrap_or(items);
            let elements: Vec<&Value> = present
                .iter()
                .filter_map(|v| v.as_array())
                .flatten()
                .collect();
            let element_path = format!("{path}[]");

            if depth + 1 > self.max_depth {
                self.walk_object(items, &elements, &element_path, depth + 1, out);
                return;
            }
            let observed: Vec<Option<&Value>> = elements.iter().map(|e| Some(*e)).collect();
            out.push(stat_for(&element_path, items, &observed, elements.len()));
            self.descend(items, &observed, &element_path, depth + 1, out);
        }
    }
}

/// The variant of `schema` with the given type, looking through `anyOf`.
fn member_of<'a>(schema: &'a Schema, wanted: SchemaType, root: &'a Schema) -> Option<&'a Schema> {
    if schema.schema_type == Some(wanted) {
        return Some(schema);
    }
    schema
        .any_of
        .iter()
        .filter_map(|v| v.resolve(root))
        .find(|v| v.schema_type == Some(wanted))
}

fn stat_for(path: &str, schema: &Schema, observed: &[Option<&Value>], total: usize) -> FieldStat {
    let mut stat = FieldStat {
        path: path.to_string(),
        field_type: schema.type_label(),
        ..Default::default()
    };

    let mut distinct = BTreeSet::new();
    let mut strings: Vec<&str> = Vec::new();
    for value in observed.iter().flatten() {
        stat.present += 1;
        if value.is_null() {
            stat.null_count += 1;
            continue;
        }
        if let Some(s) = value.as_str() {
            strings.push(s);
        }
        if value.is_array() || value.is_object() {
            continue;
        }
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if distinct.insert(rendered.clone()) && stat.examples.len() < MAX_EXAMPLES {
            stat.examples.push(rendered);
        }
    }

    stat.distinct = distinct.len();
    stat.frequency = if total == 0 {
        0.0
    } else {
        stat.present as f64 / total as f64
    };
    stat.required = total > 0 && stat.present == total && stat.null_count == 0;
    stat.nullable = stat.null_count > 0;

    if schema.schema_type == Some(SchemaType::String) {
        if let Some(format) = detect_format(&strings) {
            if format == "enum" {
                stat.enum_values = distinct.into_iter().collect();
            }
            stat.format = format.to_string();
        }
    }
    stat
}

/// Classify string observations; needs at least five of them.
pub fn detect_format(values: &[&str]) -> Option<&'static str> {
    if values.len() < MIN_FORMAT_SAMPLES {
        return None;
    }
    let all = |re: &Regex| values.iter().all(|v| re.is_match(v));

    if all(&*UUID) {
        return Some("uuid");
    }
    if all(&*ISO8601) {
        return Some("iso8601");
    }
    if all(&*URL) {
        return Some("url");
    }
    if all(&*EMAIL) {
        return Some("email");
    }
    let distinct: BTreeSet<&&str> = values.iter().collect();
    if distinct.len() <= MAX_ENUM_VALUES {
        return Some("enum");
    }
    None
}
