//! Random values from parsed schema nodes.
//!
//! A [`SchemaNode`] is compiled once into a [`Strategy`] tree. Drawing walks the
//! tree and returns `None` when a branch cannot produce a value (an empty
//! `allOf`, an unsatisfiable bound, a rejected filter). Callers retry whole
//! draws; a draw never panics and never loops forever.

use crate::adapters::format_registry::{FormatGenerator, FormatRegistry};
use crate::adapters::pattern::Pattern;
use crate::domain::schema::{
    AdditionalProperties, Items, NumberBounds, SchemaKind, SchemaNode, SchemaParser, StringRules,
};
use crate::domain::{Data, Location};
use crate::error::GenerationError;
use rand::{Rng, RngCore};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Span used when a numeric bound is missing on one or both sides
const DEFAULT_SPAN: f64 = 1_000_000.0;
/// Largest integer magnitude that survives a round trip through `f64`
const SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
/// Extra characters beyond `minLength` when `maxLength` is absent
const DEFAULT_STRING_SPAN: usize = 16;
/// Extra items beyond `minItems` when `maxItems` is absent
const DEFAULT_ARRAY_SPAN: usize = 4;
/// Retries for a single leaf (unique items, filtered formats, patterns)
const LEAF_RETRIES: usize = 50;
/// References followed past the depth budget before a draw is abandoned
const REF_SLACK: usize = 8;
/// Non-ASCII characters mixed into generated text outside headers
const EXTRA_CHARS: [char; 6] = ['é', 'ß', 'λ', 'Ж', '中', '🙂'];

enum Strategy {
    Any,
    Never,
    Null,
    Boolean,
    Integer(NumberBounds),
    Number(NumberBounds),
    Text(TextStrategy),
    Array(ArrayStrategy),
    Object(ObjectStrategy),
    Choice(Vec<Value>),
    Const(Value),
    Ref(String),
    AnyOf(Vec<Strategy>),
    Filtered {
        inner: Box<Strategy>,
        validator: Arc<jsonschema::Validator>,
    },
    Nullable(Box<Strategy>),
}

struct TextStrategy {
    min_length: usize,
    max_length: Option<usize>,
    regex: Option<Regex>,
    pattern: Option<Pattern>,
    format: Option<Arc<dyn FormatGenerator>>,
}

enum ItemsStrategy {
    Any,
    Single(Box<Strategy>),
    Tuple(Vec<Strategy>),
}

struct ArrayStrategy {
    items: ItemsStrategy,
    min_items: usize,
    max_items: Option<usize>,
    unique_items: bool,
}

enum Extra {
    Allowed,
    Forbidden,
    Schema(Box<Strategy>),
}

struct ObjectStrategy {
    properties: Vec<(String, Strategy)>,
    required: BTreeSet<String>,
    additional: Extra,
    min_properties: usize,
    max_properties: Option<usize>,
}

/// Generator of values for one location's schema
pub struct ValueStrategy {
    location: Location,
    root: Strategy,
    definitions: HashMap<String, Strategy>,
    max_depth: usize,
}

impl std::fmt::Debug for ValueStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStrategy")
            .field("location", &self.location)
            .field("definitions", &self.definitions.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl ValueStrategy {
    /// Parses and compiles `schema`. `root` is the document `$ref`s point into.
    pub fn from_schema(
        location: Location,
        schema: &Value,
        root: Option<&Value>,
        registry: &FormatRegistry,
        max_depth: usize,
    ) -> Result<Self, GenerationError> {
        let parser = SchemaParser::new(location, root);
        let node = parser.parse(schema)?;
        Self::compile(&node, &parser, root, registry, max_depth)
    }

    pub fn compile(
        node: &SchemaNode,
        parser: &SchemaParser<'_>,
        root: Option<&Value>,
        registry: &FormatRegistry,
        max_depth: usize,
    ) -> Result<Self, GenerationError> {
        let mut compiler = Compiler {
            parser,
            root,
            registry,
            pending: Vec::new(),
        };
        let strategy = compiler.compile(node)?;

        let mut definitions = HashMap::new();
        while let Some(pointer) = compiler.pending.pop() {
            if definitions.contains_key(&pointer) {
                continue;
            }
            let target = parser.resolve(&pointer)?;
            let node = parser.parse(target)?;
            let compiled = compiler.compile(&node)?;
            definitions.insert(pointer, compiled);
        }
        debug!(
            location = %parser.location(),
            definitions = definitions.len(),
            "Compiled value strategy"
        );

        Ok(Self {
            location: parser.location(),
            root: strategy,
            definitions,
            max_depth,
        })
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// One attempt at a value; `None` when this draw was rejected
    pub fn draw<R: RngCore>(&self, rng: &mut R) -> Option<Data> {
        self.draw_from(&self.root, rng, 0)
    }

    fn draw_from(&self, strategy: &Strategy, rng: &mut dyn RngCore, depth: usize) -> Option<Data> {
        match strategy {
            Strategy::Any => Some(self.draw_any(rng, depth)),
            Strategy::Never => None,
            Strategy::Null => Some(Data::Null),
            Strategy::Boolean => Some(Data::Bool(rng.gen())),
            Strategy::Integer(bounds) => draw_integer(bounds, rng).map(|n| Data::Number(n.into())),
            Strategy::Number(bounds) => draw_number(bounds, rng),
            Strategy::Text(text) => self.draw_text(text, rng),
            Strategy::Array(array) => self.draw_array(array, rng, depth),
            Strategy::Object(object) => self.draw_object(object, rng, depth),
            Strategy::Choice(values) => {
                if values.is_empty() {
                    return None;
                }
                Some(Data::from(&values[rng.gen_range(0..values.len())]))
            }
            Strategy::Const(value) => Some(Data::from(value)),
            Strategy::Ref(pointer) => {
                if depth > self.max_depth + REF_SLACK {
                    return None;
                }
                let target = self.definitions.get(pointer)?;
                self.draw_from(target, rng, depth + 1)
            }
            Strategy::AnyOf(branches) => {
                if branches.is_empty() {
                    return None;
                }
                let start = rng.gen_range(0..branches.len());
                (0..branches.len())
                    .map(|offset| &branches[(start + offset) % branches.len()])
                    .find_map(|branch| self.draw_from(branch, rng, depth))
            }
            Strategy::Filtered { inner, validator } => (0..LEAF_RETRIES)
                .filter_map(|_| self.draw_from(inner, rng, depth))
                .find(|value| validator.is_valid(&value.to_json())),
            Strategy::Nullable(inner) => {
                if rng.gen_bool(0.1) {
                    Some(Data::Null)
                } else {
                    self.draw_from(inner, rng, depth)
                }
            }
        }
    }

    fn draw_any(&self, rng: &mut dyn RngCore, depth: usize) -> Data {
        let nested = depth < self.max_depth;
        match rng.gen_range(0..if nested { 7 } else { 5 }) {
            0 => Data::Null,
            1 => Data::Bool(rng.gen()),
            2 => Data::Number(rng.gen_range(-1000i64..=1000).into()),
            3 => Data::Number(
                Number::from_f64(rng.gen_range(-1000.0..1000.0)).unwrap_or_else(|| 0.into()),
            ),
            4 => {
                let len = rng.gen_range(0..=8);
                Data::String(self.random_text(len, rng))
            }
            5 => {
                let len = rng.gen_range(0..=2);
                Data::Array((0..len).map(|_| self.draw_any(rng, depth + 1)).collect())
            }
            _ => {
                let len = rng.gen_range(0..=2);
                Data::Object(
                    (0..len)
                        .map(|_| (random_name(rng), self.draw_any(rng, depth + 1)))
                        .collect(),
                )
            }
        }
    }

    fn random_text(&self, len: usize, rng: &mut dyn RngCore) -> String {
        (0..len)
            .map(|_| match self.location {
                Location::Header => char::from(rng.gen_range(b'!'..=b'~')),
                _ if rng.gen_bool(0.1) => EXTRA_CHARS[rng.gen_range(0..EXTRA_CHARS.len())],
                _ => char::from(rng.gen_range(b' '..=b'~')),
            })
            .collect()
    }

    fn draw_text(&self, text: &TextStrategy, rng: &mut dyn RngCore) -> Option<Data> {
        if let Some(format) = &text.format {
            return (0..LEAF_RETRIES)
                .filter_map(|_| format.generate(rng))
                .find(|value| match value {
                    Data::String(s) => text.accepts(s),
                    _ => true,
                });
        }
        if let Some(regex) = &text.regex {
            return (0..LEAF_RETRIES)
                .filter_map(|_| match &text.pattern {
                    Some(pattern) => Some(pattern.generate(&mut *rng)),
                    None => {
                        let len = self.text_length(text, rng)?;
                        Some(self.random_text(len, rng))
                    }
                })
                .find(|candidate| regex.is_match(candidate) && text.accepts_length(candidate))
                .map(Data::String);
        }
        let len = self.text_length(text, rng)?;
        Some(Data::String(self.random_text(len, rng)))
    }

    fn text_length(&self, text: &TextStrategy, rng: &mut dyn RngCore) -> Option<usize> {
        let max = text
            .max_length
            .unwrap_or(text.min_length + DEFAULT_STRING_SPAN);
        if text.min_length > max {
            return None;
        }
        Some(rng.gen_range(text.min_length..=max))
    }

    fn draw_array(&self, array: &ArrayStrategy, rng: &mut dyn RngCore, depth: usize) -> Option<Data> {
        let mut max = array
            .max_items
            .unwrap_or(array.min_items + DEFAULT_ARRAY_SPAN);
        if depth >= self.max_depth {
            max = max.min(array.min_items);
        }
        if array.min_items > max {
            return None;
        }
        let len = rng.gen_range(array.min_items..=max);

        let mut items: Vec<Data> = Vec::with_capacity(len);
        for index in 0..len {
            let strategy = match &array.items {
                ItemsStrategy::Any => None,
                ItemsStrategy::Single(item) => Some(item.as_ref()),
                ItemsStrategy::Tuple(positions) => positions.get(index),
            };
            let mut draw = || match strategy {
                Some(strategy) => self.draw_from(strategy, rng, depth + 1),
                None => Some(self.draw_any(rng, depth + 1)),
            };
            let item = if array.unique_items {
                (0..LEAF_RETRIES)
                    .filter_map(|_| draw())
                    .find(|candidate| !items.contains(candidate))
            } else {
                draw()
            };
            match item {
                Some(item) => items.push(item),
                None if array.unique_items && items.len() >= array.min_items => break,
                None => return None,
            }
        }
        Some(Data::Array(items))
    }

    fn draw_object(&self, object: &ObjectStrategy, rng: &mut dyn RngCore, depth: usize) -> Option<Data> {
        let shallow = depth >= self.max_depth;
        let mut values = BTreeMap::new();
        let mut optional = Vec::new();

        for (name, strategy) in &object.properties {
            if object.required.contains(name) {
                values.insert(name.clone(), self.draw_from(strategy, rng, depth + 1)?);
            } else if !shallow && rng.gen_bool(0.5) {
                if let Some(value) = self.draw_from(strategy, rng, depth + 1) {
                    values.insert(name.clone(), value);
                    optional.push(name.clone());
                }
            }
        }

        // Required names without a property schema fall to additionalProperties
        for name in &object.required {
            if values.contains_key(name) {
                continue;
            }
            let value = self.draw_additional(&object.additional, rng, depth)?;
            values.insert(name.clone(), value);
        }

        let extras_allowed =
            !matches!(object.additional, Extra::Forbidden) && self.location != Location::Path;
        if extras_allowed && !shallow && rng.gen_bool(0.25) {
            self.add_extras(object, &mut values, 1, rng, depth);
        }

        if values.len() < object.min_properties {
            let missing = object.min_properties - values.len();
            for (name, strategy) in &object.properties {
                if values.len() >= object.min_properties {
                    break;
                }
                if !values.contains_key(name) {
                    if let Some(value) = self.draw_from(strategy, rng, depth + 1) {
                        values.insert(name.clone(), value);
                        optional.push(name.clone());
                    }
                }
            }
            if values.len() < object.min_properties && extras_allowed {
                self.add_extras(object, &mut values, missing, rng, depth);
            }
            if values.len() < object.min_properties {
                return None;
            }
        }

        if let Some(max) = object.max_properties {
            while values.len() > max {
                let name = optional.pop()?;
                values.remove(&name);
            }
        }

        Some(Data::Object(values))
    }

    fn draw_additional(&self, additional: &Extra, rng: &mut dyn RngCore, depth: usize) -> Option<Data> {
        match additional {
            Extra::Forbidden => None,
            Extra::Allowed => Some(self.draw_any(rng, depth + 1)),
            Extra::Schema(strategy) => self.draw_from(strategy, rng, depth + 1),
        }
    }

    fn add_extras(
        &self,
        object: &ObjectStrategy,
        values: &mut BTreeMap<String, Data>,
        count: usize,
        rng: &mut dyn RngCore,
        depth: usize,
    ) {
        let mut added = 0;
        for _ in 0..count * 4 {
            if added == count {
                break;
            }
            let name = random_name(rng);
            let taken = values.contains_key(&name) || object.properties.iter().any(|(n, _)| *n == name);
            if taken {
                continue;
            }
            if let Some(value) = self.draw_additional(&object.additional, rng, depth) {
                values.insert(name, value);
                added += 1;
            }
        }
    }
}

impl TextStrategy {
    fn accepts_length(&self, s: &str) -> bool {
        let len = s.chars().count();
        len >= self.min_length && self.max_length.map_or(true, |max| len <= max)
    }

    fn accepts(&self, s: &str) -> bool {
        self.accepts_length(s) && self.regex.as_ref().map_or(true, |r| r.is_match(s))
    }
}

fn random_name(rng: &mut dyn RngCore) -> String {
    let len = rng.gen_range(1..=8);
    (0..len).map(|_| char::from(rng.gen_range(b'a'..=b'z'))).collect()
}

fn integer_range(bounds: &NumberBounds) -> Option<(i64, i64)> {
    let low = bounds.minimum.map(|m| {
        let c = m.ceil();
        if bounds.exclusive_minimum && c == m {
            c + 1.0
        } else {
            c
        }
    });
    let high = bounds.maximum.map(|m| {
        let f = m.floor();
        if bounds.exclusive_maximum && f == m {
            f - 1.0
        } else {
            f
        }
    });
    let (low, high) = match (low, high) {
        (Some(l), Some(h)) => (l, h),
        (Some(l), None) => (l, l + DEFAULT_SPAN),
        (None, Some(h)) => (h - DEFAULT_SPAN, h),
        (None, None) => (-DEFAULT_SPAN, DEFAULT_SPAN),
    };
    let low = low.max(-SAFE_INTEGER);
    let high = high.min(SAFE_INTEGER);
    if low > high {
        return None;
    }
    Some((low as i64, high as i64))
}

fn draw_integer(bounds: &NumberBounds, rng: &mut dyn RngCore) -> Option<i64> {
    let (low, high) = integer_range(bounds)?;
    match bounds.multiple_of {
        Some(step) if step.fract() == 0.0 && step >= 1.0 && step <= SAFE_INTEGER => {
            let step = step as i64;
            let first = low.div_euclid(step) + i64::from(low.rem_euclid(step) != 0);
            let last = high.div_euclid(step);
            if first > last {
                return None;
            }
            rng.gen_range(first..=last).checked_mul(step)
        }
        Some(step) => (0..LEAF_RETRIES)
            .map(|_| rng.gen_range(low..=high))
            .find(|n| (*n as f64 / step).fract() == 0.0),
        None => Some(rng.gen_range(low..=high)),
    }
}

/// Uniform draw in `[low, high]`.
///
/// A span wider than `f64::MAX` straddles zero, so one side of zero is picked
/// first and sampled on its own.
fn sample_float(low: f64, high: f64, rng: &mut dyn RngCore) -> f64 {
    if (high - low).is_finite() {
        rng.gen_range(low..=high)
    } else if rng.gen_bool(0.5) {
        rng.gen_range(low..=0.0)
    } else {
        rng.gen_range(0.0..=high)
    }
}

fn draw_number(bounds: &NumberBounds, rng: &mut dyn RngCore) -> Option<Data> {
    // Integral values are valid numbers and exercise a different parser path
    if bounds.multiple_of.is_none() && rng.gen_bool(0.25) {
        if let Some(n) = draw_integer(bounds, rng) {
            return Some(Data::Number(n.into()));
        }
    }
    let (low, high) = match (bounds.minimum, bounds.maximum) {
        (Some(l), Some(h)) => (l, h),
        (Some(l), None) => (l, l + DEFAULT_SPAN),
        (None, Some(h)) => (h - DEFAULT_SPAN, h),
        (None, None) => (-DEFAULT_SPAN, DEFAULT_SPAN),
    };
    if low > high {
        return None;
    }
    let in_bounds = |v: f64| {
        (if bounds.exclusive_minimum { v > low } else { v >= low })
            && (if bounds.exclusive_maximum { v < high } else { v <= high })
    };
    let value = match bounds.multiple_of {
        Some(step) => {
            // Multipliers stay within the exactly representable integers
            let first = (low / step).ceil().max(-SAFE_INTEGER);
            let last = (high / step).floor().min(SAFE_INTEGER);
            if first.is_nan() || last.is_nan() || first > last {
                return None;
            }
            let (first, last) = (first as i64, last as i64);
            (0..LEAF_RETRIES)
                .map(|_| rng.gen_range(first..=last) as f64 * step)
                .find(|v| in_bounds(*v))?
        }
        None if low == high => Some(low).filter(|v| in_bounds(*v))?,
        None => (0..LEAF_RETRIES)
            .map(|_| sample_float(low, high, rng))
            .find(|v| in_bounds(*v))?,
    };
    if value.fract() == 0.0 && value.abs() <= SAFE_INTEGER {
        return Some(Data::Number((value as i64).into()));
    }
    Number::from_f64(value).map(Data::Number)
}

struct Compiler<'p, 'a> {
    parser: &'p SchemaParser<'a>,
    root: Option<&'p Value>,
    registry: &'p FormatRegistry,
    pending: Vec<String>,
}

impl Compiler<'_, '_> {
    fn compile(&mut self, node: &SchemaNode) -> Result<Strategy, GenerationError> {
        let strategy = match &node.kind {
            SchemaKind::Any => Strategy::Any,
            SchemaKind::Never => Strategy::Never,
            SchemaKind::Null => Strategy::Null,
            SchemaKind::Boolean => Strategy::Boolean,
            SchemaKind::Integer(bounds) => Strategy::Integer(bounds.clone()),
            SchemaKind::Number(bounds) => Strategy::Number(bounds.clone()),
            SchemaKind::String(rules) => Strategy::Text(self.text(rules)?),
            SchemaKind::Array(rules) => Strategy::Array(ArrayStrategy {
                items: match &rules.items {
                    Items::Any => ItemsStrategy::Any,
                    Items::Single(item) => ItemsStrategy::Single(Box::new(self.compile(item)?)),
                    Items::Tuple(positions) => ItemsStrategy::Tuple(
                        positions
                            .iter()
                            .map(|p| self.compile(p))
                            .collect::<Result<_, _>>()?,
                    ),
                },
                min_items: rules.min_items,
                max_items: rules.max_items,
                unique_items: rules.unique_items,
            }),
            SchemaKind::Object(rules) => Strategy::Object(ObjectStrategy {
                properties: rules
                    .properties
                    .iter()
                    .map(|(name, node)| Ok((name.clone(), self.compile(node)?)))
                    .collect::<Result<_, GenerationError>>()?,
                required: rules.required.clone(),
                additional: match &rules.additional {
                    AdditionalProperties::Allowed => Extra::Allowed,
                    AdditionalProperties::Forbidden => Extra::Forbidden,
                    AdditionalProperties::Schema(node) => Extra::Schema(Box::new(self.compile(node)?)),
                },
                min_properties: rules.min_properties,
                max_properties: rules.max_properties,
            }),
            SchemaKind::Enum(values) => Strategy::Choice(values.clone()),
            SchemaKind::Const(value) => Strategy::Const(value.clone()),
            SchemaKind::Ref(pointer) => {
                self.pending.push(pointer.clone());
                Strategy::Ref(pointer.clone())
            }
            SchemaKind::AnyOf(branches) => Strategy::AnyOf(
                branches
                    .iter()
                    .map(|b| self.compile(b))
                    .collect::<Result<_, _>>()?,
            ),
            SchemaKind::AllOf { merged, source } => {
                let inner = self.compile(merged)?;
                self.filtered(inner, source)?
            }
            SchemaKind::OneOf { branches, source } => {
                let inner = Strategy::AnyOf(
                    branches
                        .iter()
                        .map(|b| self.compile(b))
                        .collect::<Result<_, _>>()?,
                );
                self.filtered(inner, source)?
            }
            SchemaKind::Not { base, source } => {
                let inner = self.compile(base)?;
                self.filtered(inner, source)?
            }
        };
        if node.nullable {
            return Ok(Strategy::Nullable(Box::new(strategy)));
        }
        Ok(strategy)
    }

    fn text(&self, rules: &StringRules) -> Result<TextStrategy, GenerationError> {
        let location = self.parser.location();
        let regex = rules
            .pattern
            .as_deref()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    GenerationError::invalid_schema(location, format!("invalid pattern `{}`: {}", p, e))
                })
            })
            .transpose()?;
        let pattern = rules.pattern.as_deref().and_then(|p| match Pattern::parse(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                debug!(pattern = %p, error = %e, "Pattern not generatable, falling back to filtering");
                None
            }
        });
        let format = rules.format.as_deref().and_then(|name| {
            let generator = self.registry.lookup(name);
            if generator.is_none() {
                debug!(format = %name, "Unregistered format, using generic strings");
            }
            generator
        });
        Ok(TextStrategy {
            min_length: rules.min_length,
            max_length: rules.max_length,
            regex,
            pattern,
            format,
        })
    }

    fn filtered(&self, inner: Strategy, source: &Value) -> Result<Strategy, GenerationError> {
        let validator = build_validator(source, self.root).map_err(|e| {
            GenerationError::invalid_schema(self.parser.location(), e)
        })?;
        Ok(Strategy::Filtered {
            inner: Box::new(inner),
            validator: Arc::new(validator),
        })
    }
}

/// Compiles a fragment for draw checking, with the document's reusable
/// definitions attached so local references resolve.
fn build_validator(source: &Value, root: Option<&Value>) -> Result<jsonschema::Validator, String> {
    let mut schema = normalize_nullable(source);
    if let (Value::Object(map), Some(Value::Object(root))) = (&mut schema, root) {
        for key in ["definitions", "components"] {
            if let Some(section) = root.get(key) {
                map.entry(key.to_string())
                    .or_insert_with(|| normalize_nullable(section));
            }
        }
    }
    match jsonschema::draft4::new(&schema) {
        Ok(validator) => Ok(validator),
        Err(_) => jsonschema::validator_for(&schema).map_err(|e| e.to_string()),
    }
}

/// Rewrites OpenAPI `nullable: true` into a JSON-Schema `anyOf` with null
fn normalize_nullable(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(normalize_nullable).collect()),
        Value::Object(map) => {
            let mut out: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), normalize_nullable(v)))
                .collect();
            if out.get("nullable") == Some(&Value::Bool(true)) {
                out.remove("nullable");
                let mut wrapper = Map::new();
                wrapper.insert(
                    "anyOf".to_string(),
                    Value::Array(vec![
                        serde_json::json!({"type": "null"}),
                        Value::Object(out),
                    ]),
                );
                return Value::Object(wrapper);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}
