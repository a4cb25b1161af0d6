//! Layered configuration consumed through the container.
//!
//! Sources are loaded in the order they were added and merged into one JSON
//! tree; later sources override earlier ones key by key. Keys are
//! case-insensitive `:`-separated paths (`database:pool:max_size`).
//!
//! The container has no special knowledge of configuration: a built
//! [`Configuration`] is registered as a plain singleton instance and other
//! services depend on it like on anything else.

use std::env;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{DiError, DiResult};

/// Separator between the segments of a configuration path.
pub const KEY_DELIMITER: char = ':';

/// A provider of configuration values.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Loads the full tree contributed by this source.
    fn load(&self) -> DiResult<Value>;
}

/// In-memory key/value pairs, mostly for defaults and tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    entries: Vec<(String, Value)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `path` (e.g. `"server:port"`) to `value`.
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((path.into(), value.into()));
        self
    }
}

impl ConfigSource for MemorySource {
    fn load(&self) -> DiResult<Value> {
        let mut root = Value::Object(Map::new());
        for (path, value) in &self.entries {
            insert_path(&mut root, path, normalize(value.clone()))?;
        }
        Ok(root)
    }
}

/// Environment variables, optionally filtered by prefix.
///
/// `APP_DATABASE__URL` with prefix `APP_` becomes `database:url`. Values that
/// look like booleans or numbers are stored as such, so `bind` can
/// deserialize them into typed fields.
#[derive(Debug, Default, Clone)]
pub struct EnvironmentSource {
    prefix: Option<String>,
}

impl EnvironmentSource {
    /// Every environment variable.
    pub fn new() -> Self {
        Self { prefix: None }
    }

    /// Only variables starting with `prefix` (case-insensitive), prefix removed.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn strip<'a>(&self, name: &'a str) -> Option<&'a str> {
        match &self.prefix {
            None => Some(name),
            Some(prefix) => {
                let head = name.get(..prefix.len())?;
                if head.eq_ignore_ascii_case(prefix) {
                    name.get(prefix.len()..)
                } else {
                    None
                }
            }
        }
    }
}

impl ConfigSource for EnvironmentSource {
    fn load(&self) -> DiResult<Value> {
        let mut root = Value::Object(Map::new());
        for (name, raw) in env::vars() {
            let Some(stripped) = self.strip(&name) else {
                continue;
            };
            let path = stripped.replace("__", ":");
            if path.split(KEY_DELIMITER).any(|segment| segment.trim().is_empty()) {
                continue;
            }
            insert_path(&mut root, &path, parse_scalar(&raw))?;
        }
        Ok(root)
    }
}

/// A JSON document held in memory.
#[derive(Debug, Clone)]
pub struct JsonSource {
    text: String,
}

impl JsonSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ConfigSource for JsonSource {
    fn load(&self) -> DiResult<Value> {
        let value: Value = serde_json::from_str(&self.text)
            .map_err(|e| DiError::Configuration(format!("invalid JSON source: {}", e)))?;
        if !value.is_object() {
            return Err(DiError::Configuration(
                "JSON source must contain an object at the top level".to_string(),
            ));
        }
        Ok(normalize(value))
    }
}

/// Collects sources and merges them into a [`Configuration`].
///
/// # Examples
///
/// ```
/// use keyed_di::{ConfigurationBuilder, JsonSource, MemorySource};
///
/// let config = ConfigurationBuilder::new()
///     .add_source(JsonSource::new(r#"{ "Server": { "Port": 80, "Host": "localhost" } }"#))
///     .add_source(MemorySource::new().set("server:port", 8080))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.get_as::<u16>("SERVER:PORT").unwrap(), 8080);
/// assert_eq!(config.get_as::<String>("server:host").unwrap(), "localhost");
/// ```
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source; it overrides every source added before it.
    pub fn add_source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn add_boxed_source(mut self, source: Box<dyn ConfigSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Loads and merges every source in order.
    pub fn build(&self) -> DiResult<Configuration> {
        let mut root = Value::Object(Map::new());
        for source in &self.sources {
            tracing::debug!(source = ?source, "loading configuration source");
            merge(&mut root, source.load()?);
        }
        Ok(Configuration { root })
    }
}

/// Merged, read-only configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    root: Value,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    /// Raw value at `path`; the empty path is the whole tree.
    pub fn get(&self, path: &str) -> Option<&Value> {
        segments(path).try_fold(&self.root, |node, segment| match node {
            Value::Object(map) => map.get(&segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Value at `path` deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> DiResult<T> {
        let value = self
            .get(path)
            .ok_or_else(|| DiError::Configuration(format!("missing key '{}'", path)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| DiError::Configuration(format!("key '{}': {}", path, e)))
    }

    /// True when `path` holds a value.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Sub-tree rooted at `path`; empty when the section does not exist.
    pub fn section(&self, path: &str) -> Configuration {
        match self.get(path) {
            Some(value) => Configuration { root: value.clone() },
            None => Configuration::default(),
        }
    }

    /// Deserializes the section at `path` into `T`.
    ///
    /// A missing section binds from an empty object, so types whose fields
    /// all have serde defaults still bind.
    ///
    /// ```
    /// use keyed_di::{ConfigurationBuilder, MemorySource};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Database {
    ///     url: String,
    ///     #[serde(default)]
    ///     pool_size: u32,
    /// }
    ///
    /// let config = ConfigurationBuilder::new()
    ///     .add_source(MemorySource::new().set("database:url", "postgres://localhost"))
    ///     .build()
    ///     .unwrap();
    ///
    /// let db: Database = config.bind("database").unwrap();
    /// assert_eq!(db.url, "postgres://localhost");
    /// assert_eq!(db.pool_size, 0);
    /// ```
    pub fn bind<T: DeserializeOwned>(&self, path: &str) -> DiResult<T> {
        let value = self.get(path).cloned().unwrap_or_else(|| Value::Object(Map::new()));
        serde_json::from_value(value)
            .map_err(|e| DiError::Configuration(format!("cannot bind section '{}': {}", path, e)))
    }

    /// The merged tree.
    pub fn as_value(&self) -> &Value {
        &self.root
    }
}

fn segments(path: &str) -> impl Iterator<Item = String> + '_ {
    path.split(KEY_DELIMITER)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

fn insert_path(root: &mut Value, path: &str, value: Value) -> DiResult<()> {
    let parts: Vec<String> = segments(path).collect();
    if parts.is_empty() {
        return Err(DiError::Configuration("configuration keys must not be empty".to_string()));
    }
    let nested = parts.into_iter().rev().fold(value, |inner, part| {
        let mut map = Map::new();
        map.insert(part, inner);
        Value::Object(map)
    });
    merge(root, nested);
    Ok(())
}

/// Deep merge: objects merge key by key, anything else is replaced.
fn merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

/// Lowercases every object key.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut normalized = Map::new();
            for (key, value) in map {
                let key = key.to_lowercase();
                let value = normalize(value);
                match normalized.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        normalized.insert(key, value);
                    }
                }
            }
            Value::Object(normalized)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

fn parse_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    Value::String(raw.to_string())
}
