//! Persistence of the tool registry document.
//!
//! The registry is one JSON object keyed by tool name. Every operation reads
//! or writes the whole document; there is no locking, so concurrent writers
//! race and the last one wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::config::ToolsConfig;
use crate::error::StorageError;
use crate::models::{Registry, ToolRecord};

const EMPTY_DOCUMENT: &str = "{}";

/// Whole-document storage for the registry.
pub trait DocumentStore: Send + Sync {
    /// Human readable location, used in errors and logs.
    fn location(&self) -> String;

    /// Returns the document, creating an empty one first if none exists.
    fn read(&self) -> Result<String, StorageError>;

    /// Replaces the document.
    fn write(&self, document: &str) -> Result<(), StorageError>;
}

/// Registry document stored in a file, `tool_template/tools.json` by default.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(config.registry_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the parent directory and an empty document when missing.
    fn ensure_exists(&self) -> Result<(), StorageError> {
        let write_err = |source| StorageError::Write {
            location: self.location(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(_) => {
                fs::write(&self.path, EMPTY_DOCUMENT).map_err(write_err)?;
                tracing::debug!(path = %self.path.display(), "Created empty tool registry");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(write_err(e)),
        }
    }
}

impl DocumentStore for FileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<String, StorageError> {
        self.ensure_exists()?;
        fs::read_to_string(&self.path).map_err(|source| StorageError::Read {
            location: self.location(),
            source,
        })
    }

    fn write(&self, document: &str) -> Result<(), StorageError> {
        self.ensure_exists()?;
        fs::write(&self.path, document).map_err(|source| StorageError::Write {
            location: self.location(),
            source,
        })
    }
}

/// Registry document kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing document.
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
        }
    }

    /// Current raw document, if one was ever created.
    pub fn snapshot(&self) -> Option<String> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl DocumentStore for MemoryStore {
    fn location(&self) -> String {
        "memory".to_owned()
    }

    fn read(&self) -> Result<String, StorageError> {
        let mut document = self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(document
            .get_or_insert_with(|| EMPTY_DOCUMENT.to_owned())
            .clone())
    }

    fn write(&self, document: &str) -> Result<(), StorageError> {
        *self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(document.to_owned());
        Ok(())
    }
}

/*───────────────────────────────────────────────────────────────────────────*/

/// The persisted registry: load, save and upsert against a [`DocumentStore`].
pub struct ToolRegistry {
    store: Box<dyn DocumentStore>,
}

impl ToolRegistry {
    pub fn new(store: impl DocumentStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Registry backed by the file named in `config`.
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(FileStore::from_config(config))
    }

    /// Registry held in memory only.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn load(&self) -> Result<Registry, StorageError> {
        let document = self.store.read()?;
        serde_json::from_str(&document).map_err(|source| StorageError::Corrupt {
            location: self.store.location(),
            source,
        })
    }

    /// Writes the full document, replacing whatever was stored before.
    pub fn save(&self, registry: &Registry) -> Result<(), StorageError> {
        let document = encode(registry)?;
        self.store.write(&document)
    }

    /// Upserts one record with a load → insert → save round trip.
    pub fn register_record(&self, record: ToolRecord) -> Result<(), StorageError> {
        let mut registry = self.load()?;
        registry.upsert(record);
        self.save(&registry)
    }
}

/// Four-space indented JSON; non-ASCII text is written as-is.
fn encode(registry: &Registry) -> Result<String, StorageError> {
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    registry
        .serialize(&mut serializer)
        .map_err(StorageError::Encode)?;
    String::from_utf8(out).map_err(|e| {
        StorageError::Encode(serde::ser::Error::custom(format!(
            "registry is not valid UTF-8: {e}"
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ToolRegistration, RUNTIME_MODULE};
    use futures::future::BoxFuture;
    use serde_json::{json, Value};

    fn noop(_: Value) -> BoxFuture<'static, Result<Value, crate::ToolError>> {
        Box::pin(async { Ok(Value::Null) })
    }

    static GREET: ToolRegistration = ToolRegistration::new(
        "greet",
        "Grüßt jemanden.",
        &[("name", "String")],
        "String",
        noop,
    );

    #[test]
    fn test_file_store_bootstraps_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool_template").join("tools.json");
        let registry = ToolRegistry::new(FileStore::new(&path));

        let loaded = registry.load().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_register_record_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        let registry = ToolRegistry::new(FileStore::new(&path));

        registry.register_record(ToolRecord::runtime(&GREET)).unwrap();

        let loaded = registry.load().unwrap();
        let record = loaded.get("greet").unwrap();
        assert_eq!(record.module_path, RUNTIME_MODULE);
        assert_eq!(record.arguments.keys().collect::<Vec<_>>(), ["name"]);
    }

    #[test]
    fn test_document_formatting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        let registry = ToolRegistry::new(FileStore::new(&path));
        registry.register_record(ToolRecord::runtime(&GREET)).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("{\n    \"greet\": {\n        \"tool_name\": \"greet\""));
        assert!(raw.contains("Grüßt jemanden."));
        assert!(!raw.contains("\\u00"));
    }

    #[test]
    fn test_save_replaces_document() {
        let registry = ToolRegistry::in_memory();
        registry.register_record(ToolRecord::runtime(&GREET)).unwrap();
        assert_eq!(registry.load().unwrap().len(), 1);

        registry.save(&Registry::new()).unwrap();
        assert!(registry.load().unwrap().is_empty());
    }

    #[test]
    fn test_reregistration_overwrites() {
        let registry = ToolRegistry::in_memory();
        let first = ToolRecord::runtime(&GREET);
        registry.register_record(first.clone()).unwrap();
        registry.register_record(ToolRecord::runtime(&GREET)).unwrap();

        let loaded = registry.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_ne!(loaded.get("greet").unwrap().call_id, first.call_id);
    }

    #[test]
    fn test_corrupt_document() {
        let registry = ToolRegistry::new(MemoryStore::with_document("not json at all"));
        let err = registry.load().unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));

        let registry = ToolRegistry::new(MemoryStore::with_document("[1, 2]"));
        assert!(matches!(
            registry.load().unwrap_err(),
            StorageError::Corrupt { .. }
        ));
    }

    #[test]
    fn test_unreadable_document() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the file should be
        let path = dir.path().join("tools.json");
        fs::create_dir(&path).unwrap();
        let registry = ToolRegistry::new(FileStore::new(&path));
        assert!(matches!(
            registry.load().unwrap_err(),
            StorageError::Read { .. } | StorageError::Write { .. }
        ));
    }

    #[test]
    fn test_hand_written_document_loads() {
        let document = json!({
            "legacy": {
                "tool_name": "legacy",
                "module_path": "old.module",
                "arguments": {"path": "str"}
            }
        });
        let registry = ToolRegistry::new(MemoryStore::with_document(document.to_string()));
        let loaded = registry.load().unwrap();
        let record = loaded.get("legacy").unwrap();
        assert_eq!(record.return_type, "Any");
        assert!(!record.is_runtime);
        assert!(record.call_id.is_empty());
    }

    /// Accepts reads, refuses every write.
    struct ReadOnlyStore(MemoryStore);

    impl DocumentStore for ReadOnlyStore {
        fn location(&self) -> String {
            "read-only".to_owned()
        }

        fn read(&self) -> Result<String, StorageError> {
            self.0.read()
        }

        fn write(&self, _: &str) -> Result<(), StorageError> {
            Err(StorageError::Write {
                location: self.location(),
                source: std::io::Error::new(ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[test]
    fn test_save_failure_is_a_write_error() {
        let registry = ToolRegistry::new(ReadOnlyStore(MemoryStore::new()));
        let err = registry
            .register_record(ToolRecord::runtime(&GREET))
            .unwrap_err();
        assert!(matches!(err, StorageError::Write { ref location, .. } if location == "read-only"));
        assert!(registry.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_save_failure_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        // the registry directory would have to live inside a regular file
        let blocker = dir.path().join("tool_template");
        fs::write(&blocker, "not a directory").unwrap();
        let registry = ToolRegistry::new(FileStore::new(blocker.join("tools.json")));

        let err = registry.save(&Registry::new()).unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
    }

    #[test]
    fn test_memory_store_keeps_saved_document() {
        let store = MemoryStore::new();
        assert_eq!(store.snapshot(), None);
        store.write("{\n    \"x\": 1\n}").unwrap();
        assert_eq!(store.snapshot().as_deref(), Some("{\n    \"x\": 1\n}"));
    }
}
