//! Parsed JSON-Schema fragments
//!
//! A raw fragment is parsed once into a [`SchemaNode`] tree. Composition is
//! normalized while parsing: `allOf` branches are merged into one node, sibling
//! keywords of `anyOf`/`oneOf` are pushed into every branch, and a `type` list
//! becomes an `anyOf` over single types. `$ref` nodes stay unresolved so that
//! recursive schemas parse in finite time.

use crate::domain::Location;
use crate::error::GenerationError;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

const MAX_NESTING: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    /// OpenAPI `nullable: true`
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Any,
    /// Matches nothing
    Never,
    Null,
    Boolean,
    Integer(NumberBounds),
    Number(NumberBounds),
    String(StringRules),
    Array(ArrayRules),
    Object(ObjectRules),
    Enum(Vec<Value>),
    Const(Value),
    Ref(String),
    /// Merged `allOf`; `source` is the unmerged fragment used to check draws
    AllOf {
        merged: Box<SchemaNode>,
        source: Value,
    },
    AnyOf(Vec<SchemaNode>),
    OneOf {
        branches: Vec<SchemaNode>,
        source: Value,
    },
    Not {
        base: Box<SchemaNode>,
        source: Value,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberBounds {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub multiple_of: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringRules {
    pub min_length: usize,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRules {
    pub items: Items,
    pub min_items: usize,
    pub max_items: Option<usize>,
    pub unique_items: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Items {
    Any,
    Single(Box<SchemaNode>),
    Tuple(Vec<SchemaNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRules {
    pub properties: Vec<(String, SchemaNode)>,
    pub required: BTreeSet<String>,
    pub additional: AdditionalProperties,
    pub min_properties: usize,
    pub max_properties: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    Allowed,
    Forbidden,
    Schema(Box<SchemaNode>),
}

impl SchemaNode {
    fn new(kind: SchemaKind, nullable: bool) -> Self {
        Self { kind, nullable }
    }
}

/// Parses fragments of one location, resolving references against `root`
pub struct SchemaParser<'a> {
    location: Location,
    root: Option<&'a Value>,
}

impl<'a> SchemaParser<'a> {
    pub fn new(location: Location, root: Option<&'a Value>) -> Self {
        Self { location, root }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn parse(&self, schema: &Value) -> Result<SchemaNode, GenerationError> {
        self.parse_at(schema, 0)
    }

    /// Looks up a local `#/...` reference in the source document
    pub fn resolve(&self, pointer: &str) -> Result<&'a Value, GenerationError> {
        let fragment = pointer.strip_prefix('#').ok_or_else(|| {
            self.error(format!("external reference `{}` is not supported", pointer))
        })?;
        self.root
            .and_then(|root| root.pointer(fragment))
            .ok_or_else(|| self.error(format!("unresolvable reference `{}`", pointer)))
    }

    fn error(&self, detail: impl std::fmt::Display) -> GenerationError {
        GenerationError::invalid_schema(self.location, detail)
    }

    /// Follows top-level `$ref` chains so the fragment can be merged
    fn inline(&self, schema: &Value) -> Result<Value, GenerationError> {
        let mut current = schema;
        for _ in 0..MAX_NESTING {
            match current.get("$ref").and_then(Value::as_str) {
                Some(pointer) => current = self.resolve(pointer)?,
                None => return Ok(current.clone()),
            }
        }
        Err(self.error("reference chain is circular"))
    }

    fn parse_at(&self, schema: &Value, depth: usize) -> Result<SchemaNode, GenerationError> {
        if depth > MAX_NESTING {
            return Err(self.error("schema composition is nested too deeply"));
        }
        let obj = match schema {
            Value::Bool(true) => return Ok(SchemaNode::new(SchemaKind::Any, false)),
            Value::Bool(false) => return Ok(SchemaNode::new(SchemaKind::Never, false)),
            Value::Object(obj) => obj,
            other => {
                return Err(self.error(format!(
                    "expected a schema object, found {}",
                    json_type_name(other)
                )))
            }
        };
        let nullable = obj.get("nullable").and_then(Value::as_bool).unwrap_or(false);

        if let Some(reference) = obj.get("$ref") {
            let pointer = reference
                .as_str()
                .ok_or_else(|| self.error("`$ref` must be a string"))?;
            self.resolve(pointer)?;
            return Ok(SchemaNode::new(SchemaKind::Ref(pointer.to_string()), nullable));
        }

        if let Some(branches) = obj.get("allOf") {
            let branches = self.expect_array(branches, "allOf")?;
            let mut merged = without(obj, &["allOf", "nullable"]);
            for branch in branches {
                merged = merge_schemas(&merged, &self.inline(branch)?);
            }
            let merged = self.parse_at(&merged, depth + 1)?;
            return Ok(SchemaNode::new(
                SchemaKind::AllOf {
                    merged: Box::new(merged),
                    source: schema.clone(),
                },
                nullable,
            ));
        }

        if let Some(branches) = obj.get("anyOf") {
            let branches = self.parse_branches(obj, branches, "anyOf", depth)?;
            return Ok(SchemaNode::new(SchemaKind::AnyOf(branches), nullable));
        }

        if let Some(branches) = obj.get("oneOf") {
            let branches = self.parse_branches(obj, branches, "oneOf", depth)?;
            return Ok(SchemaNode::new(
                SchemaKind::OneOf {
                    branches,
                    source: schema.clone(),
                },
                nullable,
            ));
        }

        if obj.contains_key("not") {
            let base = self.parse_at(&without(obj, &["not", "nullable"]), depth + 1)?;
            return Ok(SchemaNode::new(
                SchemaKind::Not {
                    base: Box::new(base),
                    source: schema.clone(),
                },
                nullable,
            ));
        }

        if let Some(values) = obj.get("enum") {
            let values = self.expect_array(values, "enum")?;
            let kind = if values.is_empty() {
                SchemaKind::Never
            } else {
                SchemaKind::Enum(values.clone())
            };
            return Ok(SchemaNode::new(kind, nullable));
        }

        if let Some(value) = obj.get("const") {
            return Ok(SchemaNode::new(SchemaKind::Const(value.clone()), nullable));
        }

        let types: Vec<&str> = match obj.get("type") {
            None => match infer_type(obj) {
                Some(name) => vec![name],
                None => return Ok(SchemaNode::new(SchemaKind::Any, nullable)),
            },
            Some(Value::String(name)) => vec![name.as_str()],
            Some(Value::Array(names)) => names
                .iter()
                .map(|name| {
                    name.as_str()
                        .ok_or_else(|| self.error("`type` entries must be strings"))
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(self.error(format!(
                    "`type` must be a string or an array, found {}",
                    json_type_name(other)
                )))
            }
        };

        match types.as_slice() {
            [] => Ok(SchemaNode::new(SchemaKind::Never, nullable)),
            [name] => Ok(SchemaNode::new(self.typed(name, obj, depth)?, nullable)),
            names => {
                let branches = names
                    .iter()
                    .map(|name| Ok(SchemaNode::new(self.typed(name, obj, depth)?, false)))
                    .collect::<Result<Vec<_>, GenerationError>>()?;
                Ok(SchemaNode::new(SchemaKind::AnyOf(branches), nullable))
            }
        }
    }

    fn parse_branches(
        &self,
        obj: &Map<String, Value>,
        branches: &Value,
        keyword: &str,
        depth: usize,
    ) -> Result<Vec<SchemaNode>, GenerationError> {
        let branches = self.expect_array(branches, keyword)?;
        let siblings = without(obj, &[keyword, "nullable"]);
        let has_siblings = siblings.as_object().map_or(false, |s| !s.is_empty());
        branches
            .iter()
            .map(|branch| {
                if has_siblings {
                    self.parse_at(&merge_schemas(&siblings, &self.inline(branch)?), depth + 1)
                } else {
                    self.parse_at(branch, depth + 1)
                }
            })
            .collect()
    }

    fn typed(
        &self,
        name: &str,
        obj: &Map<String, Value>,
        depth: usize,
    ) -> Result<SchemaKind, GenerationError> {
        Ok(match name {
            "null" => SchemaKind::Null,
            "boolean" => SchemaKind::Boolean,
            "integer" => SchemaKind::Integer(self.number_bounds(obj)?),
            "number" => SchemaKind::Number(self.number_bounds(obj)?),
            "string" => SchemaKind::String(self.string_rules(obj)?),
            // Swagger 2.0 form-data uploads
            "file" => SchemaKind::String(StringRules {
                format: Some("binary".to_string()),
                ..Default::default()
            }),
            "array" => SchemaKind::Array(self.array_rules(obj, depth)?),
            "object" => SchemaKind::Object(self.object_rules(obj, depth)?),
            other => return Err(self.error(format!("unknown type `{}`", other))),
        })
    }

    fn number_bounds(&self, obj: &Map<String, Value>) -> Result<NumberBounds, GenerationError> {
        let mut bounds = NumberBounds {
            minimum: self.number(obj, "minimum")?,
            maximum: self.number(obj, "maximum")?,
            ..Default::default()
        };
        match obj.get("exclusiveMinimum") {
            Some(Value::Bool(flag)) => bounds.exclusive_minimum = *flag,
            Some(Value::Number(n)) => {
                let n = n.as_f64().unwrap_or_default();
                if bounds.minimum.map_or(true, |min| n >= min) {
                    bounds.minimum = Some(n);
                    bounds.exclusive_minimum = true;
                }
            }
            _ => {}
        }
        match obj.get("exclusiveMaximum") {
            Some(Value::Bool(flag)) => bounds.exclusive_maximum = *flag,
            Some(Value::Number(n)) => {
                let n = n.as_f64().unwrap_or_default();
                if bounds.maximum.map_or(true, |max| n <= max) {
                    bounds.maximum = Some(n);
                    bounds.exclusive_maximum = true;
                }
            }
            _ => {}
        }
        if let Some(step) = self.number(obj, "multipleOf")? {
            if step <= 0.0 {
                return Err(self.error("`multipleOf` must be greater than 0"));
            }
            bounds.multiple_of = Some(step);
        }
        Ok(bounds)
    }

    fn string_rules(&self, obj: &Map<String, Value>) -> Result<StringRules, GenerationError> {
        Ok(StringRules {
            min_length: self.count(obj, "minLength")?.unwrap_or(0),
            max_length: self.count(obj, "maxLength")?,
            pattern: self.string(obj, "pattern")?,
            format: self.string(obj, "format")?,
        })
    }

    fn array_rules(
        &self,
        obj: &Map<String, Value>,
        depth: usize,
    ) -> Result<ArrayRules, GenerationError> {
        let items = match obj.get("items") {
            None => Items::Any,
            Some(Value::Array(schemas)) => Items::Tuple(
                schemas
                    .iter()
                    .map(|s| self.parse_at(s, depth + 1))
                    .collect::<Result<_, _>>()?,
            ),
            Some(schema) => Items::Single(Box::new(self.parse_at(schema, depth + 1)?)),
        };
        Ok(ArrayRules {
            items,
            min_items: self.count(obj, "minItems")?.unwrap_or(0),
            max_items: self.count(obj, "maxItems")?,
            unique_items: obj
                .get("uniqueItems")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }

    fn object_rules(
        &self,
        obj: &Map<String, Value>,
        depth: usize,
    ) -> Result<ObjectRules, GenerationError> {
        let properties = match obj.get("properties") {
            None => Vec::new(),
            Some(Value::Object(props)) => props
                .iter()
                .map(|(name, schema)| Ok((name.clone(), self.parse_at(schema, depth + 1)?)))
                .collect::<Result<_, GenerationError>>()?,
            Some(other) => {
                return Err(self.error(format!(
                    "`properties` must be an object, found {}",
                    json_type_name(other)
                )))
            }
        };
        let required = match obj.get("required") {
            None => BTreeSet::new(),
            Some(Value::Array(names)) => names
                .iter()
                .map(|name| {
                    name.as_str()
                        .map(String::from)
                        .ok_or_else(|| self.error("`required` entries must be strings"))
                })
                .collect::<Result<_, _>>()?,
            // Swagger parameter-level `required: true` is not an object keyword
            Some(Value::Bool(_)) => BTreeSet::new(),
            Some(other) => {
                return Err(self.error(format!(
                    "`required` must be an array, found {}",
                    json_type_name(other)
                )))
            }
        };
        let additional = match obj.get("additionalProperties") {
            None | Some(Value::Bool(true)) => AdditionalProperties::Allowed,
            Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
            Some(schema) => {
                AdditionalProperties::Schema(Box::new(self.parse_at(schema, depth + 1)?))
            }
        };
        Ok(ObjectRules {
            properties,
            required,
            additional,
            min_properties: self.count(obj, "minProperties")?.unwrap_or(0),
            max_properties: self.count(obj, "maxProperties")?,
        })
    }

    fn expect_array<'v>(&self, value: &'v Value, keyword: &str) -> Result<&'v Vec<Value>, GenerationError> {
        value.as_array().ok_or_else(|| {
            self.error(format!(
                "`{}` must be an array, found {}",
                keyword,
                json_type_name(value)
            ))
        })
    }

    fn number(&self, obj: &Map<String, Value>, keyword: &str) -> Result<Option<f64>, GenerationError> {
        match obj.get(keyword) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(self.error(format!(
                "`{}` must be a number, found {}",
                keyword,
                json_type_name(other)
            ))),
        }
    }

    fn count(&self, obj: &Map<String, Value>, keyword: &str) -> Result<Option<usize>, GenerationError> {
        match obj.get(keyword) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .map(|n| Some(n as usize))
                .ok_or_else(|| {
                    self.error(format!("`{}` must be a non-negative integer", keyword))
                }),
        }
    }

    fn string(&self, obj: &Map<String, Value>, keyword: &str) -> Result<Option<String>, GenerationError> {
        match obj.get(keyword) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.error(format!(
                "`{}` must be a string, found {}",
                keyword,
                json_type_name(other)
            ))),
        }
    }
}

fn infer_type(obj: &Map<String, Value>) -> Option<&'static str> {
    const OBJECT: [&str; 5] = [
        "properties",
        "required",
        "additionalProperties",
        "minProperties",
        "maxProperties",
    ];
    const ARRAY: [&str; 4] = ["items", "minItems", "maxItems", "uniqueItems"];
    const STRING: [&str; 4] = ["minLength", "maxLength", "pattern", "format"];
    const NUMBER: [&str; 5] = [
        "minimum",
        "maximum",
        "exclusiveMinimum",
        "exclusiveMaximum",
        "multipleOf",
    ];
    let has = |keys: &[&str]| keys.iter().any(|k| obj.contains_key(*k));
    if has(&OBJECT) {
        Some("object")
    } else if has(&ARRAY) {
        Some("array")
    } else if has(&STRING) {
        Some("string")
    } else if has(&NUMBER) {
        Some("number")
    } else {
        None
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn without(obj: &Map<String, Value>, keys: &[&str]) -> Value {
    let mut out = obj.clone();
    for key in keys {
        out.remove(*key);
    }
    Value::Object(out)
}

/// Intersection of two schemas, as far as it can be expressed as one fragment.
///
/// The result is never looser than either input on the keywords it merges;
/// keywords it cannot merge keep the left value, so draws from the result must
/// still be checked against the original branches.
pub fn merge_schemas(left: &Value, right: &Value) -> Value {
    let (left, right) = match (left, right) {
        (Value::Bool(false), _) | (_, Value::Bool(false)) => return Value::Bool(false),
        (Value::Bool(true), other) | (other, Value::Bool(true)) => return other.clone(),
        (Value::Object(l), Value::Object(r)) => (l, r),
        _ => return Value::Bool(false),
    };
    let mut out = left.clone();
    for (key, rv) in right {
        let merged = match (key.as_str(), left.get(key)) {
            (_, None) => rv.clone(),
            ("type", Some(lv)) => match intersect_types(lv, rv) {
                Some(types) => types,
                None => return Value::Bool(false),
            },
            ("properties", Some(lv)) => merge_properties(lv, rv),
            ("required", Some(lv)) => union_strings(lv, rv),
            ("enum", Some(lv)) => {
                let common: Vec<Value> = match (lv.as_array(), rv.as_array()) {
                    (Some(l), Some(r)) => l.iter().filter(|v| r.contains(v)).cloned().collect(),
                    _ => Vec::new(),
                };
                if common.is_empty() {
                    return Value::Bool(false);
                }
                Value::Array(common)
            }
            ("minimum" | "minLength" | "minItems" | "minProperties", Some(lv)) => {
                pick_number(lv, rv, |a, b| a >= b)
            }
            ("maximum" | "maxLength" | "maxItems" | "maxProperties", Some(lv)) => {
                pick_number(lv, rv, |a, b| a <= b)
            }
            ("exclusiveMinimum", Some(lv)) => match (lv, rv) {
                (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a || *b),
                (Value::Number(_), Value::Number(_)) => pick_number(lv, rv, |a, b| a >= b),
                _ => lv.clone(),
            },
            ("exclusiveMaximum", Some(lv)) => match (lv, rv) {
                (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a || *b),
                (Value::Number(_), Value::Number(_)) => pick_number(lv, rv, |a, b| a <= b),
                _ => lv.clone(),
            },
            ("uniqueItems", Some(lv)) => Value::Bool(
                lv.as_bool().unwrap_or(false) || rv.as_bool().unwrap_or(false),
            ),
            ("additionalProperties" | "items", Some(lv)) => {
                if lv.is_array() || rv.is_array() {
                    lv.clone()
                } else {
                    merge_schemas(lv, rv)
                }
            }
            ("allOf", Some(lv)) => {
                let mut all = lv.as_array().cloned().unwrap_or_default();
                all.extend(rv.as_array().cloned().unwrap_or_default());
                Value::Array(all)
            }
            (_, Some(lv)) => lv.clone(),
        };
        out.insert(key.clone(), merged);
    }
    let nullable = |m: &Map<String, Value>| m.get("nullable").and_then(Value::as_bool) == Some(true);
    if nullable(left) && nullable(right) {
        out.insert("nullable".to_string(), Value::Bool(true));
    } else {
        out.remove("nullable");
    }
    Value::Object(out)
}

fn type_names(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn intersect_types(left: &Value, right: &Value) -> Option<Value> {
    let left = type_names(left);
    let right = type_names(right);
    let mut common: Vec<&str> = Vec::new();
    for name in &left {
        let shared = if right.contains(name) {
            Some(*name)
        } else if (*name == "integer" && right.contains(&"number"))
            || (*name == "number" && right.contains(&"integer"))
        {
            Some("integer")
        } else {
            None
        };
        if let Some(shared) = shared {
            if !common.contains(&shared) {
                common.push(shared);
            }
        }
    }
    match common.as_slice() {
        [] => None,
        [single] => Some(Value::String(single.to_string())),
        many => Some(Value::Array(
            many.iter().map(|s| Value::String(s.to_string())).collect(),
        )),
    }
}

fn merge_properties(left: &Value, right: &Value) -> Value {
    let (Some(left), Some(right)) = (left.as_object(), right.as_object()) else {
        return left.clone();
    };
    let mut out = left.clone();
    for (name, schema) in right {
        let merged = match left.get(name) {
            Some(existing) => serde_json::json!({ "allOf": [existing, schema] }),
            None => schema.clone(),
        };
        out.insert(name.clone(), merged);
    }
    Value::Object(out)
}

fn union_strings(left: &Value, right: &Value) -> Value {
    let mut names: Vec<Value> = left.as_array().cloned().unwrap_or_default();
    for name in right.as_array().into_iter().flatten() {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    Value::Array(names)
}

fn pick_number(left: &Value, right: &Value, keep_left: impl Fn(f64, f64) -> bool) -> Value {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) if !keep_left(a, b) => right.clone(),
        _ => left.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(schema: Value) -> Result<SchemaNode, GenerationError> {
        SchemaParser::new(Location::Body, None).parse(&schema)
    }

    #[test]
    fn test_disjoint_all_of_is_never() {
        let node = parse(json!({"allOf": [{"type": "integer"}, {"type": "string"}]})).unwrap();
        match node.kind {
            SchemaKind::AllOf { merged, .. } => assert_eq!(merged.kind, SchemaKind::Never),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_all_of_merges_bounds_and_required() {
        let merged = merge_schemas(
            &json!({"type": "object", "required": ["a"], "properties": {"a": {"minimum": 1}}}),
            &json!({"type": "object", "required": ["b"], "properties": {"a": {"maximum": 5}, "b": {}}}),
        );
        assert_eq!(merged["required"], json!(["a", "b"]));
        assert_eq!(
            merged["properties"]["a"],
            json!({"allOf": [{"minimum": 1}, {"maximum": 5}]})
        );
        assert!(merged["properties"].get("b").is_some());
    }

    #[test]
    fn test_number_and_integer_intersect_to_integer() {
        let merged = merge_schemas(&json!({"type": "number"}), &json!({"type": "integer"}));
        assert_eq!(merged["type"], json!("integer"));
    }

    #[test]
    fn test_type_list_becomes_any_of() {
        let node = parse(json!({"type": ["string", "null"]})).unwrap();
        match node.kind {
            SchemaKind::AnyOf(branches) => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[1].kind, SchemaKind::Null);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_names_location() {
        let err = SchemaParser::new(Location::Query, None)
            .parse(&json!({"type": "int"}))
            .unwrap_err();
        assert_eq!(err.location(), Some(Location::Query));
        assert!(err.to_string().contains("query"));
        assert!(err.to_string().contains("unknown type `int`"));
    }

    #[test]
    fn test_unresolvable_reference() {
        let err = parse(json!({"$ref": "#/definitions/Missing"})).unwrap_err();
        assert!(err.to_string().contains("#/definitions/Missing"));
    }

    #[test]
    fn test_refs_resolve_against_root() {
        let root = json!({"definitions": {"Pet": {"type": "object", "properties": {"name": {"type": "string"}}}}});
        let parser = SchemaParser::new(Location::Body, Some(&root));
        let node = parser
            .parse(&json!({"allOf": [{"$ref": "#/definitions/Pet"}, {"required": ["name"]}]}))
            .unwrap();
        match node.kind {
            SchemaKind::AllOf { merged, .. } => match merged.kind {
                SchemaKind::Object(rules) => {
                    assert!(rules.required.contains("name"));
                    assert_eq!(rules.properties.len(), 1);
                }
                other => panic!("unexpected kind {:?}", other),
            },
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_draft6_exclusive_bounds() {
        let node = parse(json!({"type": "integer", "exclusiveMinimum": 3, "maximum": 9})).unwrap();
        match node.kind {
            SchemaKind::Integer(bounds) => {
                assert_eq!(bounds.minimum, Some(3.0));
                assert!(bounds.exclusive_minimum);
                assert_eq!(bounds.maximum, Some(9.0));
                assert!(!bounds.exclusive_maximum);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
