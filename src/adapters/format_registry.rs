use crate::adapters::pattern::Pattern;
use crate::domain::schema::json_type_name;
use crate::domain::Data;
use crate::error::ConfigurationError;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, SecondsFormat};
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Word;
use fake::Fake;
use rand::{Rng, RngCore};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::debug;

/// Attempts a pattern or filtered generator makes before giving up on a draw
const FORMAT_RETRIES: usize = 100;

/// Produces values for one named string format.
///
/// `None` means no value could be produced; the caller treats it like a
/// rejected draw.
pub trait FormatGenerator: Send + Sync {
    fn generate(&self, rng: &mut dyn RngCore) -> Option<Data>;
}

impl<F> FormatGenerator for F
where
    F: Fn(&mut dyn RngCore) -> Option<Data> + Send + Sync,
{
    fn generate(&self, rng: &mut dyn RngCore) -> Option<Data> {
        self(rng)
    }
}

/// Strings matching a regular expression
pub struct PatternFormat {
    source: String,
    pattern: Pattern,
    regex: Regex,
}

impl PatternFormat {
    pub fn new(pattern: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };
        let regex = Regex::new(pattern).map_err(|e| invalid(e.to_string()))?;
        let parsed = Pattern::parse(pattern).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            pattern: parsed,
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FormatGenerator for PatternFormat {
    fn generate(&self, rng: &mut dyn RngCore) -> Option<Data> {
        (0..FORMAT_RETRIES)
            .map(|_| self.pattern.generate(&mut *rng))
            .find(|candidate| self.regex.is_match(candidate))
            .map(Data::String)
    }
}

/// Uniform choice among fixed strings
pub struct EnumFormat {
    values: Vec<String>,
}

impl EnumFormat {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }
}

impl FormatGenerator for EnumFormat {
    fn generate(&self, rng: &mut dyn RngCore) -> Option<Data> {
        if self.values.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.values.len());
        Some(Data::String(self.values[index].clone()))
    }
}

/// Wraps a generator and keeps only string values accepted by a predicate
pub struct Filtered<G, P> {
    inner: G,
    predicate: P,
}

impl<G, P> FormatGenerator for Filtered<G, P>
where
    G: FormatGenerator,
    P: Fn(&str) -> bool + Send + Sync,
{
    fn generate(&self, rng: &mut dyn RngCore) -> Option<Data> {
        for _ in 0..FORMAT_RETRIES {
            if let Some(value) = self.inner.generate(rng) {
                if value.as_str().map_or(false, |s| (self.predicate)(s)) {
                    return Some(value);
                }
            }
        }
        None
    }
}

pub trait FormatGeneratorExt: FormatGenerator + Sized {
    fn filter<P>(self, predicate: P) -> Filtered<Self, P>
    where
        P: Fn(&str) -> bool + Send + Sync,
    {
        Filtered {
            inner: self,
            predicate,
        }
    }
}

impl<G: FormatGenerator> FormatGeneratorExt for G {}

/// Named string formats and their generators.
///
/// Cloning is cheap and yields an independent snapshot: later registrations on
/// the original are not seen by the clone.
#[derive(Clone)]
pub struct FormatRegistry {
    formats: HashMap<String, Arc<dyn FormatGenerator>>,
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.names())
            .finish()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    /// Registry holding the built-in formats
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (name, generator) in builtin_formats() {
            registry.formats.insert(name.to_string(), generator);
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    /// Registers `generator` under `name`, replacing any previous entry
    pub fn register<G>(&mut self, name: impl Into<String>, generator: G) -> Result<(), ConfigurationError>
    where
        G: FormatGenerator + 'static,
    {
        self.register_arc(name, Arc::new(generator))
    }

    pub fn register_arc(
        &mut self,
        name: impl Into<String>,
        generator: Arc<dyn FormatGenerator>,
    ) -> Result<(), ConfigurationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigurationError::EmptyName);
        }
        debug!(format = %name, "Registering string format");
        self.formats.insert(name, generator);
        Ok(())
    }

    /// Registers a format described by untyped values, as found in config files.
    ///
    /// `generator` is an object with either a `pattern` string or an `enum`
    /// list of strings.
    pub fn register_value(&mut self, name: &Value, generator: &Value) -> Result<(), ConfigurationError> {
        let name = name.as_str().ok_or_else(|| ConfigurationError::InvalidArgument {
            argument: "name",
            expected: "string",
            found: json_type_name(name).to_string(),
        })?;
        let generator = parse_generator(generator)?;
        self.register_arc(name, generator)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn FormatGenerator>> {
        self.formats.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.formats.keys().cloned().collect();
        names.sort();
        names
    }

    /// The process-wide registry
    pub fn global() -> &'static RwLock<FormatRegistry> {
        static GLOBAL: OnceLock<RwLock<FormatRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| RwLock::new(FormatRegistry::new()))
    }

    /// Copy of the process-wide registry as it is right now
    pub fn snapshot() -> FormatRegistry {
        Self::global()
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Registers a format on the process-wide registry
pub fn register_string_format<G>(name: impl Into<String>, generator: G) -> Result<(), ConfigurationError>
where
    G: FormatGenerator + 'static,
{
    FormatRegistry::global()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .register(name, generator)
}

fn parse_generator(value: &Value) -> Result<Arc<dyn FormatGenerator>, ConfigurationError> {
    let invalid = || ConfigurationError::InvalidArgument {
        argument: "generator",
        expected: "object with a `pattern` or `enum` key",
        found: json_type_name(value).to_string(),
    };
    let object = value.as_object().ok_or_else(invalid)?;
    if let Some(pattern) = object.get("pattern") {
        let pattern = pattern.as_str().ok_or_else(invalid)?;
        return Ok(Arc::new(PatternFormat::new(pattern)?));
    }
    if let Some(Value::Array(items)) = object.get("enum") {
        let values = items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;
        return Ok(Arc::new(EnumFormat::new(values)));
    }
    Err(invalid())
}

fn random_bytes(rng: &mut dyn RngCore, max_len: usize) -> Vec<u8> {
    let len = rng.gen_range(0..=max_len);
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    bytes
}

fn lowercase_word(rng: &mut dyn RngCore) -> String {
    let mut rng = rng;
    let word: String = Word().fake_with_rng(&mut rng);
    let word: String = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if word.is_empty() {
        "item".to_string()
    } else {
        word
    }
}

fn builtin_formats() -> Vec<(&'static str, Arc<dyn FormatGenerator>)> {
    let binary = |rng: &mut dyn RngCore| Some(Data::Bytes(random_bytes(rng, 32)));
    let byte = |rng: &mut dyn RngCore| {
        let bytes = random_bytes(rng, 32);
        Some(Data::String(base64::engine::general_purpose::STANDARD.encode(bytes)))
    };
    let date = |rng: &mut dyn RngCore| {
        let year = rng.gen_range(1970..=2100);
        let ordinal = rng.gen_range(1..=365);
        NaiveDate::from_yo_opt(year, ordinal).map(|d| Data::String(d.format("%Y-%m-%d").to_string()))
    };
    let date_time = |rng: &mut dyn RngCore| {
        let seconds = rng.gen_range(0..4_102_444_800i64);
        DateTime::from_timestamp(seconds, 0)
            .map(|dt| Data::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
    };
    let email = |rng: &mut dyn RngCore| {
        let mut rng = rng;
        let address: String = SafeEmail().fake_with_rng(&mut rng);
        Some(Data::String(address))
    };
    let uuid = |rng: &mut dyn RngCore| {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        Some(Data::String(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()))
    };
    let ipv4 = |rng: &mut dyn RngCore| {
        let octets: [u8; 4] = rng.gen();
        Some(Data::String(std::net::Ipv4Addr::from(octets).to_string()))
    };
    let ipv6 = |rng: &mut dyn RngCore| {
        let segments: [u16; 8] = rng.gen();
        Some(Data::String(std::net::Ipv6Addr::from(segments).to_string()))
    };
    let hostname = |rng: &mut dyn RngCore| {
        Some(Data::String(format!("{}.example.com", lowercase_word(rng))))
    };
    let uri = |rng: &mut dyn RngCore| {
        let host = lowercase_word(rng);
        let segment = lowercase_word(rng);
        Some(Data::String(format!("https://{}.example.com/{}", host, segment)))
    };

    vec![
        ("binary", Arc::new(binary) as Arc<dyn FormatGenerator>),
        ("byte", Arc::new(byte)),
        ("date", Arc::new(date)),
        ("date-time", Arc::new(date_time)),
        ("email", Arc::new(email)),
        ("uuid", Arc::new(uuid)),
        ("ipv4", Arc::new(ipv4)),
        ("ipv6", Arc::new(ipv6)),
        ("hostname", Arc::new(hostname)),
        ("uri", Arc::new(uri)),
    ]
}
