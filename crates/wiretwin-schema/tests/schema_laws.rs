//! Cross-stage behavior: parse, infer, stats and validation together.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use wiretwin_schema::{
    field_stats, infer, infer_from_values, parse, Format, InferOptions, Schema, SchemaError,
    Validator,
};

fn bytes(values: &[Value]) -> Vec<Vec<u8>> {
    values
        .iter()
        .map(|v| serde_json::to_vec(v).unwrap())
        .collect()
}

#[test]
fn test_inference_null_optionality_scenario() {
    let samples = bytes(&[
        json!({"id": 1, "name": "a"}),
        json!({"id": 2, "name": null}),
        json!({"id": 3, "name": "c"}),
    ]);

    let optional_nulls = InferOptions {
        strict_required: true,
        mark_nullable_as_optional: true,
        additional_properties: None,
    };
    assert_eq!(infer(&samples, &optional_nulls).schema.required, vec!["id"]);

    let required_nulls = InferOptions {
        mark_nullable_as_optional: false,
        ..optional_nulls
    };
    assert_eq!(
        infer(&samples, &required_nulls).schema.required,
        vec!["id", "name"]
    );
}

#[test]
fn test_nullable_pointer_scenario() {
    let validator = Validator::new(
        "type Reading struct {\n\tStatus string `json:\"status\"`\n\tValue  *int   `json:\"value\"`\n}",
        Format::RecordType,
    )
    .unwrap();

    assert!(validator.validate(br#"{"status":"ok","value":null}"#).unwrap().valid);
    assert!(!validator.validate(br#"{"status":null,"value":1}"#).unwrap().valid);
}

#[test]
fn test_record_and_fluent_agree_on_validation() {
    let record = Validator::new(
        r#"
type Order struct {
    ID    string     `json:"id"`
    Lines []Line     `json:"lines"`
    Note  string     `json:"note,omitempty"`
}

type Line struct {
    SKU string  `json:"sku"`
    Qty int     `json:"qty"`
}
"#,
        Format::RecordType,
    )
    .unwrap();
    let fluent = Validator::new(
        r#"z.object({
            id: z.string(),
            lines: z.array(z.object({ sku: z.string(), qty: z.number().int() })),
            note: z.string().optional(),
        })"#,
        Format::FluentDsl,
    )
    .unwrap();

    let docs = [
        (json!({"id": "o1", "lines": [{"sku": "A", "qty": 2}]}), true),
        (json!({"id": "o1", "lines": []}), true),
        (json!({"id": "o1", "lines": [{"sku": "A"}]}), false),
        (json!({"lines": []}), false),
        (json!({"id": 5, "lines": []}), false),
    ];
    for (doc, expected) in docs {
        assert_eq!(record.validate_value(&doc).valid, expected, "record: {doc}");
        assert_eq!(fluent.validate_value(&doc).valid, expected, "fluent: {doc}");
    }
}

#[test]
fn test_forbidden_types_fail_every_parser() {
    assert!(matches!(
        parse("type T struct { X any }", Format::RecordType),
        Err(SchemaError::ForbiddenType { .. })
    ));
    assert!(matches!(
        parse("z.object({ x: z.unknown() })", Format::FluentDsl),
        Err(SchemaError::ForbiddenType { .. })
    ));
}

#[test]
fn test_stats_over_inferred_schema() {
    let values: Vec<Value> = (0..6)
        .map(|i| {
            json!({
                "id": format!("123e4567-e89b-12d3-a456-42661417400{i}"),
                "status": if i % 2 == 0 { "open" } else { "closed" },
                "created": format!("2024-01-0{}T10:00:00Z", i + 1),
            })
        })
        .collect();
    let schema = infer_from_values(&values, &InferOptions::default()).schema;
    let stats = field_stats(&schema, &bytes(&values));

    let formats: Vec<(&str, &str)> = stats
        .iter()
        .map(|s| (s.path.as_str(), s.format.as_str()))
        .collect();
    assert_eq!(
        formats,
        vec![("created", "iso8601"), ("id", "uuid"), ("status", "enum")]
    );
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        (-1000.0f64..1000.0).prop_map(|f| json!(f)),
        "[a-z0-9 ]{0,8}".prop_map(Value::String),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

fn arb_object() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z]{1,4}", arb_value(), 0..5)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

proptest! {
    #[test]
    fn test_inferred_schema_validates_its_own_sample(sample in arb_object()) {
        let schema = infer_from_values(std::slice::from_ref(&sample), &InferOptions::default()).schema;
        let validator = Validator::from_schema(&schema).unwrap();
        let result = validator.validate_value(&sample);
        prop_assert!(result.valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn test_schema_json_round_trip(sample in arb_object()) {
        let schema = infer_from_values(&[sample], &InferOptions::default()).schema;
        let text = schema.to_json_pretty().unwrap();
        let reparsed = parse(&text, Format::JsonSchema).unwrap().schema;
        prop_assert_eq!(reparsed, schema);
    }

    #[test]
    fn test_identical_samples_always_match(sample in arb_object(), copies in 1usize..5) {
        let samples = vec![sample; copies];
        let result = infer_from_values(&samples, &InferOptions::default());
        prop_assert!(result.all_match);
        prop_assert_eq!(result.sample_count, copies);
    }

    #[test]
    fn test_required_keys_present_everywhere(
        samples in prop::collection::vec(arb_object(), 1..5),
        nullable_optional in any::<bool>(),
    ) {
        let opts = InferOptions {
            mark_nullable_as_optional: nullable_optional,
            ..Default::default()
        };
        let schema: Schema = infer_from_values(&samples, &opts).schema;
        for key in &schema.required {
            for sample in &samples {
                let value = sample.get(key);
                prop_assert!(value.is_some());
                if nullable_optional {
                    prop_assert!(!value.unwrap().is_null());
                }
            }
        }
    }
}
