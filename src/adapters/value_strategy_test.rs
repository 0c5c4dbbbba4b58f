use super::format_registry::{EnumFormat, FormatRegistry};
use super::value_strategy::ValueStrategy;
use crate::domain::{Data, Location};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};

fn draws_with(
    schema: &Value,
    root: Option<&Value>,
    location: Location,
    registry: &FormatRegistry,
) -> Vec<Option<Data>> {
    let strategy = ValueStrategy::from_schema(location, schema, root, registry, 4).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    (0..200).map(|_| strategy.draw(&mut rng)).collect()
}

fn draws(schema: &Value) -> Vec<Data> {
    draws_with(schema, None, Location::Body, &FormatRegistry::new())
        .into_iter()
        .flatten()
        .collect()
}

fn assert_all_valid(schema: &Value, values: &[Data]) {
    let validator = jsonschema::draft4::new(schema).unwrap();
    assert!(!values.is_empty(), "no values drawn for {}", schema);
    for value in values {
        let instance = value.to_json();
        assert!(validator.is_valid(&instance), "{} does not match {}", instance, schema);
    }
}

#[test]
fn test_integer_bounds_and_multiple_of() {
    let schema = json!({
        "type": "integer",
        "minimum": 0,
        "exclusiveMinimum": true,
        "maximum": 30,
        "multipleOf": 3
    });
    let values = draws(&schema);
    assert_all_valid(&schema, &values);
    assert!(values.iter().all(|v| v.as_i64().unwrap() > 0));
}

#[test]
fn test_number_exclusive_maximum() {
    let schema = json!({"type": "number", "minimum": 0, "maximum": 1, "exclusiveMaximum": true});
    let values = draws(&schema);
    assert_all_valid(&schema, &values);
    assert!(values.iter().all(|v| v.as_f64().unwrap() < 1.0));
}

#[test]
fn test_number_bounds_wider_than_f64_range() {
    let schema = json!({"type": "number", "minimum": -1.7e308, "maximum": 1.7e308});
    let values = draws(&schema);
    assert_eq!(values.len(), 200);
    assert_all_valid(&schema, &values);
    assert!(values.iter().any(|v| v.as_f64().unwrap() < 0.0));
    assert!(values.iter().any(|v| v.as_f64().unwrap() > 0.0));

    let stepped = json!({"type": "number", "minimum": -1e308, "maximum": 1e308, "multipleOf": 0.5});
    assert_all_valid(&stepped, &draws(&stepped));
}

#[test]
fn test_string_length_and_pattern() {
    let schema = json!({"type": "string", "minLength": 3, "maxLength": 5});
    assert_all_valid(&schema, &draws(&schema));

    let schema = json!({"type": "string", "pattern": "^[a-c]{3}-\\d{2}$"});
    assert_all_valid(&schema, &draws(&schema));
}

#[test]
fn test_enum_and_const() {
    let schema = json!({"enum": ["a", 1, null]});
    assert_all_valid(&schema, &draws(&schema));

    let schema = json!({"const": {"fixed": true}});
    let values = draws(&schema);
    assert!(values.iter().all(|v| *v == json!({"fixed": true})));
}

#[test]
fn test_unique_array_items() {
    let schema = json!({
        "type": "array",
        "items": {"type": "integer", "minimum": 1, "maximum": 5},
        "minItems": 2,
        "maxItems": 5,
        "uniqueItems": true
    });
    assert_all_valid(&schema, &draws(&schema));
}

#[test]
fn test_object_respects_required_and_closed_properties() {
    let schema = json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "name": {"type": "string"},
            "tags": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["id", "name"],
        "additionalProperties": false
    });
    let values = draws(&schema);
    assert_all_valid(&schema, &values);
    assert!(values.iter().all(|v| v.get("id").is_some() && v.get("name").is_some()));
}

#[test]
fn test_open_objects_sometimes_get_extra_properties() {
    let schema = json!({"type": "object", "properties": {"id": {"type": "integer"}}});
    let values = draws(&schema);
    assert_all_valid(&schema, &values);
    assert!(values
        .iter()
        .any(|v| v.as_object().unwrap().keys().any(|k| k != "id")));
}

#[test]
fn test_nullable_draws_null_sometimes() {
    let schema = json!({"type": "string", "nullable": true});
    let values = draws(&schema);
    assert!(values.iter().any(Data::is_null));
    assert!(values.iter().all(|v| v.is_null() || v.as_str().is_some()));
}

#[test]
fn test_one_of_matches_exactly_one_branch() {
    let schema = json!({
        "oneOf": [
            {"type": "integer", "minimum": 0, "maximum": 10},
            {"type": "integer", "minimum": 5, "maximum": 20}
        ]
    });
    assert_all_valid(&schema, &draws(&schema));
}

#[test]
fn test_not_excludes_values() {
    let schema = json!({"type": "integer", "minimum": 0, "maximum": 5, "not": {"enum": [2, 3]}});
    let values = draws(&schema);
    assert_all_valid(&schema, &values);
}

#[test]
fn test_disjoint_all_of_never_draws() {
    let schema = json!({"allOf": [{"type": "string"}, {"type": "integer"}]});
    let results = draws_with(&schema, None, Location::Body, &FormatRegistry::new());
    assert!(results.iter().all(Option::is_none));
}

#[test]
fn test_all_of_values_satisfy_every_branch() {
    let schema = json!({
        "allOf": [
            {"type": "object", "properties": {"a": {"type": "integer"}}, "required": ["a"]},
            {"type": "object", "properties": {"b": {"type": "string"}}, "required": ["b"]}
        ]
    });
    assert_all_valid(&schema, &draws(&schema));
}

#[test]
fn test_recursive_reference_terminates() {
    let root = json!({
        "definitions": {
            "Node": {
                "type": "object",
                "properties": {
                    "value": {"type": "integer"},
                    "children": {"type": "array", "items": {"$ref": "#/definitions/Node"}}
                },
                "required": ["value"]
            }
        }
    });
    let schema = json!({"$ref": "#/definitions/Node"});
    let values: Vec<Data> = draws_with(&schema, Some(&root), Location::Body, &FormatRegistry::new())
        .into_iter()
        .flatten()
        .collect();

    let full = json!({"$ref": "#/definitions/Node", "definitions": root["definitions"]});
    assert_all_valid(&full, &values);
}

#[test]
fn test_header_strings_are_visible_ascii() {
    let schema = json!({
        "type": "object",
        "properties": {"X-Token": {"type": "string", "minLength": 1}},
        "required": ["X-Token"],
        "additionalProperties": false
    });
    let values = draws_with(&schema, None, Location::Header, &FormatRegistry::new());
    for value in values.into_iter().flatten() {
        let token = value.get("X-Token").and_then(Data::as_str).unwrap();
        assert!(token.chars().all(|c| ('!'..='~').contains(&c)), "{:?}", token);
    }
}

#[test]
fn test_format_siblings_filter_generated_values() {
    let mut registry = FormatRegistry::new();
    registry
        .register("short_or_long", EnumFormat::new(vec!["ab".to_string(), "abcd".to_string()]))
        .unwrap();
    let schema = json!({"type": "string", "format": "short_or_long", "minLength": 4});
    let values: Vec<Data> = draws_with(&schema, None, Location::Query, &registry)
        .into_iter()
        .flatten()
        .collect();
    assert!(!values.is_empty());
    assert!(values.iter().all(|v| *v == json!("abcd")));
}

#[test]
fn test_unregistered_format_falls_back_to_type() {
    let schema = json!({"type": "string", "format": "made-up", "minLength": 2, "maxLength": 3});
    assert_all_valid(&schema, &draws(&schema));
}

#[test]
fn test_binary_format_yields_bytes() {
    let schema = json!({"type": "string", "format": "binary"});
    let values = draws(&schema);
    assert!(values.iter().all(|v| v.as_bytes().is_some()));
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let schema = json!({"type": "string", "pattern": "[a-"});
    let err = ValueStrategy::from_schema(Location::Query, &schema, None, &FormatRegistry::new(), 4)
        .unwrap_err();
    assert!(err.to_string().contains("query"));
}
