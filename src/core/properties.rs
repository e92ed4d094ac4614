//! Key/value configuration sources
//!
//! Two sources are consulted, system first, then file:
//!
//! - [`SystemProperties`]: programmatic properties set at runtime, falling back
//!   to environment variables (`asynclogger.buffer.size` is looked up as
//!   `ASYNCLOGGER_BUFFER_SIZE`).
//! - [`FileProperties`]: a JSON document whose nested objects are flattened
//!   into dotted keys.

use super::error::{LoggerError, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read-only string lookup
pub trait PropertySource: Send + Sync {
    /// Value for `key`, or `None` if the source does not define it
    fn get_string(&self, key: &str) -> Option<String>;

    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    fn name(&self) -> &str;
}

impl PropertySource for HashMap<String, String> {
    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }

    fn name(&self) -> &str {
        "map"
    }
}

/// Ordered stack of sources; the first source defining a key wins
#[derive(Clone)]
pub struct LayeredProperties {
    layers: Vec<Arc<dyn PropertySource>>,
}

impl LayeredProperties {
    pub fn new(layers: Vec<Arc<dyn PropertySource>>) -> Self {
        Self { layers }
    }
}

impl PropertySource for LayeredProperties {
    fn get_string(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get_string(key))
    }

    fn name(&self) -> &str {
        "layered"
    }
}

/// Process-level properties
///
/// # Example
///
/// ```
/// use rust_async_logger::core::properties::{PropertySource, SystemProperties};
///
/// let props = SystemProperties::isolated();
/// props.set("asynclogger.plugin.Exporter.implementation", "json");
/// assert_eq!(
///     props.get_string("asynclogger.plugin.Exporter.implementation").as_deref(),
///     Some("json")
/// );
/// ```
#[derive(Debug)]
pub struct SystemProperties {
    values: RwLock<HashMap<String, String>>,
    read_env: bool,
}

impl SystemProperties {
    /// Properties backed by environment variables
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            read_env: true,
        }
    }

    /// Properties that ignore the environment
    pub fn isolated() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            read_env: false,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }

    /// Environment variable consulted for a property key
    pub fn env_key(key: &str) -> String {
        key.chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect()
    }
}

impl Default for SystemProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySource for SystemProperties {
    fn get_string(&self, key: &str) -> Option<String> {
        if let Some(value) = self.values.read().get(key) {
            return Some(value.clone());
        }

        if self.read_env {
            std::env::var(Self::env_key(key)).ok()
        } else {
            None
        }
    }

    fn name(&self) -> &str {
        "system"
    }
}

/// Properties loaded from a JSON file
#[derive(Debug, Clone, Default)]
pub struct FileProperties {
    path: Option<PathBuf>,
    values: HashMap<String, String>,
}

impl FileProperties {
    /// Default configuration file name, relative to the working directory
    pub const DEFAULT_PATH: &'static str = "async-logger.json";

    /// Source with no properties
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load properties from `path`
    ///
    /// A missing file yields an empty source.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file exists but cannot be read and
    /// `InvalidConfiguration` if it is not a JSON object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Self {
                    path: Some(path.to_path_buf()),
                    values: HashMap::new(),
                })
            }
            Err(e) => {
                return Err(LoggerError::io_operation(
                    "reading configuration file",
                    path.display().to_string(),
                    e,
                ))
            }
        };

        let mut props = Self::from_json_str(&text).map_err(|e| {
            LoggerError::config(path.display().to_string(), e.to_string())
        })?;
        props.path = Some(path.to_path_buf());
        Ok(props)
    }

    /// Parse properties from a JSON document
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the text is not a JSON object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| LoggerError::config("FileProperties", e.to_string()))?;

        if !root.is_object() {
            return Err(LoggerError::config(
                "FileProperties",
                "top-level value must be a JSON object",
            ));
        }

        let mut values = HashMap::new();
        flatten("", &root, &mut values);

        Ok(Self { path: None, values })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PropertySource for FileProperties {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn name(&self) -> &str {
        "file"
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(&join(key), child, out);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        scalar => {
            out.insert(prefix.to_string(), scalar.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_env_key_mapping() {
        assert_eq!(
            SystemProperties::env_key("asynclogger.plugin.Exporter.implementation"),
            "ASYNCLOGGER_PLUGIN_EXPORTER_IMPLEMENTATION"
        );
        assert_eq!(SystemProperties::env_key("a-b.c"), "A_B_C");
    }

    #[test]
    fn test_system_properties_set_and_remove() {
        let props = SystemProperties::isolated();
        assert_eq!(props.get_string("k"), None);
        assert_eq!(props.get_string_or("k", "fallback"), "fallback");

        props.set("k", "v");
        assert_eq!(props.get_string("k").as_deref(), Some("v"));

        assert_eq!(props.remove("k").as_deref(), Some("v"));
        assert_eq!(props.get_string("k"), None);
    }

    #[test]
    fn test_system_properties_read_environment() {
        std::env::set_var("ASYNCLOGGER_TEST_ONLY_PROPERTY", "from-env");

        assert_eq!(
            SystemProperties::new()
                .get_string("asynclogger.test-only.property")
                .as_deref(),
            Some("from-env")
        );
        assert_eq!(
            SystemProperties::isolated().get_string("asynclogger.test-only.property"),
            None
        );
    }

    #[test]
    fn test_layered_first_source_wins() {
        let system = SystemProperties::isolated();
        system.set("shared", "system");
        let file = FileProperties::from_json_str(r#"{"shared": "file", "only": "file"}"#).unwrap();

        let layered = LayeredProperties::new(vec![Arc::new(system), Arc::new(file)]);
        assert_eq!(layered.get_string("shared").as_deref(), Some("system"));
        assert_eq!(layered.get_string("only").as_deref(), Some("file"));
        assert_eq!(layered.get_string("missing"), None);
    }

    #[test]
    fn test_file_properties_flatten_nested_objects() {
        let props = FileProperties::from_json_str(
            r#"{
                "asynclogger": {
                    "plugin": { "Exporter": { "implementation": "json" } },
                    "buffer": { "size": 256 },
                    "enabled": true,
                    "tags": ["a", 1],
                    "unset": null
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            props.get_string("asynclogger.plugin.Exporter.implementation").as_deref(),
            Some("json")
        );
        assert_eq!(props.get_string("asynclogger.buffer.size").as_deref(), Some("256"));
        assert_eq!(props.get_string("asynclogger.enabled").as_deref(), Some("true"));
        assert_eq!(props.get_string("asynclogger.tags").as_deref(), Some("a,1"));
        assert_eq!(props.get_string("asynclogger.unset"), None);
    }

    #[test]
    fn test_file_properties_accept_dotted_keys() {
        let props =
            FileProperties::from_json_str(r#"{"asynclogger.backpressure": "drop"}"#).unwrap();
        assert_eq!(props.get_string("asynclogger.backpressure").as_deref(), Some("drop"));
    }

    #[test]
    fn test_file_properties_reject_non_object() {
        assert!(FileProperties::from_json_str("[1, 2]").is_err());
        assert!(FileProperties::from_json_str("not json").is_err());
    }

    #[test]
    fn test_missing_file_is_empty_source() {
        let dir = TempDir::new().unwrap();
        let props = FileProperties::load(dir.path().join("absent.json")).unwrap();
        assert!(props.is_empty());
        assert!(props.path().is_some());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("async-logger.json");
        std::fs::write(&path, r#"{"asynclogger": {"level": "warn"}}"#).unwrap();

        let props = FileProperties::load(&path).unwrap();
        assert_eq!(props.get_string("asynclogger.level").as_deref(), Some("warn"));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ nope").unwrap();

        let err = FileProperties::load(&path).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }
}
