use super::case_strategy::{generator_for, StrategyBuilder};
use super::format_registry::{register_string_format, FormatGeneratorExt, FormatRegistry, PatternFormat};
use crate::domain::{Data, Endpoint, Location};
use crate::error::GenerationError;
use base64::Engine as _;
use serde_json::json;
use std::sync::Arc;

fn endpoint() -> Endpoint {
    Endpoint::new("/users", "POST")
}

fn builder() -> StrategyBuilder {
    StrategyBuilder::new()
        .with_registry(FormatRegistry::new())
        .with_seed(7)
}

#[test]
fn test_body_in_get_is_rejected() {
    let endpoint = Endpoint::new("/foo", "GET").with_body(json!({
        "required": ["foo"],
        "type": "object",
        "properties": {"foo": {"type": "string"}}
    }));
    let err = builder().build(endpoint).unwrap_err();
    assert_eq!(err.to_string(), "Body parameters are defined for GET request.");
    assert_eq!(err.location(), Some(Location::Body));
}

#[test]
fn test_body_allowed_for_post() {
    let endpoint = endpoint().with_body(json!({"type": "object"}));
    assert!(builder().build(endpoint).is_ok());
}

#[test]
fn test_custom_format_even_4_digits() {
    let even = PatternFormat::new("^[0-9]{4}$")
        .unwrap()
        .filter(|s| s.parse::<u32>().map_or(false, |n| n % 2 == 0));
    register_string_format("even_4_digits", even).unwrap();

    let endpoint = endpoint().with_query(json!({
        "required": ["id"],
        "type": "object",
        "additionalProperties": false,
        "properties": {"id": {"type": "string", "format": "even_4_digits"}}
    }));
    let mut generator = generator_for(endpoint).unwrap();
    for _ in 0..20 {
        let case = generator.example().unwrap();
        let id = case.query.as_ref().and_then(|q| q.get("id")).and_then(Data::as_str).unwrap();
        assert_eq!(id.len(), 4);
        assert_eq!(id.parse::<u32>().unwrap() % 2, 0);
    }
}

#[test]
fn test_binary_form_data_is_bytes() {
    let endpoint = endpoint().with_form_data(json!({
        "required": ["file"],
        "type": "object",
        "additionalProperties": false,
        "properties": {"file": {"type": "string", "format": "binary"}}
    }));
    let case = builder().build(endpoint).unwrap().example().unwrap();
    let form = case.form_data.unwrap();
    assert!(form.get("file").and_then(Data::as_bytes).is_some());
}

#[test]
fn test_byte_body_is_base64() {
    let endpoint = endpoint().with_body(json!({
        "required": ["byte"],
        "type": "object",
        "additionalProperties": false,
        "properties": {"byte": {"type": "string", "format": "byte"}}
    }));
    let case = builder().build(endpoint).unwrap().example().unwrap();
    let encoded = case.body.as_ref().and_then(|b| b.get("byte")).and_then(Data::as_str).unwrap();
    assert!(base64::engine::general_purpose::STANDARD.decode(encoded).is_ok());
}

#[test]
fn test_path_parameters_always_present() {
    let endpoint = Endpoint::new("/users/{user_id}/posts/{slug}", "GET").with_path_parameters(json!({
        "type": "object",
        "properties": {
            "user_id": {"type": "integer", "minimum": 1},
            "slug": {"type": "string"}
        },
        "additionalProperties": false
    }));
    let generator = builder().build(endpoint).unwrap();
    for case in generator.take(50) {
        let user_id = &case.path_parameters["user_id"];
        let slug = &case.path_parameters["slug"];
        assert!(user_id.parse::<i64>().unwrap() >= 1);
        assert!(!slug.is_empty());
        assert!(!case.formatted_path().contains('{'));
    }
}

#[test]
fn test_untyped_and_nullable_path_parameters_are_never_empty() {
    for property in [json!({}), json!({"type": "string", "nullable": true})] {
        let endpoint = Endpoint::new("/users/{id}", "GET").with_path_parameters(json!({
            "type": "object",
            "properties": {"id": property},
            "additionalProperties": false
        }));
        let generator = builder().build(endpoint).unwrap();
        for case in generator.take(200) {
            assert!(!case.path_parameters["id"].is_empty());
            assert_ne!(case.formatted_path(), "/users/");
        }
    }
}

#[test]
fn test_required_headers_always_present() {
    let endpoint = Endpoint::new("/api/success", "GET").with_headers(json!({
        "properties": {"api_key": {"name": "api_key", "in": "header", "type": "string"}},
        "additionalProperties": false,
        "type": "object",
        "required": ["api_key"]
    }));
    let generator = builder().build(endpoint).unwrap();
    for case in generator.take(50) {
        let pairs = case.header_pairs();
        assert!(pairs.iter().any(|(name, _)| name == "api_key"));
    }
}

#[test]
fn test_seeded_generators_repeat() {
    let endpoint = Arc::new(endpoint().with_query(json!({
        "type": "object",
        "properties": {"q": {"type": "string"}, "limit": {"type": "integer"}},
        "required": ["q"]
    })));
    let first: Vec<_> = builder().build(endpoint.clone()).unwrap().take(10).collect();
    let second: Vec<_> = builder().build(endpoint).unwrap().take(10).collect();
    assert_eq!(first, second);
}

#[test]
fn test_cases_carry_endpoint() {
    let endpoint = Arc::new(endpoint().with_body(json!({"type": "integer"})));
    let case = builder().build(endpoint.clone()).unwrap().example().unwrap();
    assert_eq!(case.path, "/users");
    assert_eq!(case.method, "POST");
    assert!(Arc::ptr_eq(case.endpoint.as_ref().unwrap(), &endpoint));
}

#[test]
fn test_unsatisfiable_schema_exhausts() {
    let endpoint = endpoint().with_query(json!({
        "type": "object",
        "properties": {"id": {"allOf": [{"type": "string"}, {"type": "integer"}]}},
        "required": ["id"]
    }));
    let mut generator = builder().with_max_attempts(5).build(endpoint).unwrap();
    let expected = GenerationError::Exhausted {
        location: Location::Query,
        attempts: 5,
    };
    assert_eq!(generator.try_next(), Err(expected.clone()));
    assert_eq!(generator.next(), None);
    assert_eq!(generator.last_error(), Some(&expected));
}

#[test]
fn test_unknown_type_is_invalid_schema() {
    let endpoint = endpoint().with_query(json!({
        "type": "object",
        "properties": {"id": {"type": "uuid"}}
    }));
    let err = builder().build(endpoint).unwrap_err();
    assert!(matches!(
        err,
        GenerationError::InvalidSchema { location: Some(Location::Query), .. }
    ));
    assert!(err.to_string().contains("uuid"));
}

#[test]
fn test_as_strategy_uses_global_registry() {
    let endpoint = endpoint().with_body(json!({"type": "string", "format": "date"}));
    let case = endpoint.as_strategy().unwrap().example().unwrap();
    let date = case.body.unwrap();
    assert!(chrono::NaiveDate::parse_from_str(date.as_str().unwrap(), "%Y-%m-%d").is_ok());
}
