//! Core data models for the agentools registry
//!
//! Records persisted in the registry document, the link-time registrations
//! emitted by `#[tool]` / `#[tool_module]`, and the selection the model
//! returns at dispatch time.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FormatError, ToolError};

/// Module path of tools that only exist inside the current process.
pub const RUNTIME_MODULE: &str = "__runtime__";

/// Type description used when a signature leaves a type unspecified.
pub const ANY_TYPE: &str = "Any";

/// A type representing a tool function (keyword arguments in → JSON out)
pub type ToolFunc = dyn Fn(Value) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync;

/// Plain function pointer form of [`ToolFunc`], usable in `static` items.
pub type ToolFn = fn(Value) -> BoxFuture<'static, Result<Value, ToolError>>;

/// Mints a fresh, opaque tool call identifier.
pub fn new_call_id() -> String {
    format!("tool_{}", uuid::Uuid::new_v4())
}

/*───────────────────────────────────────────────────────────────────────────*/

/// One entry of the persisted registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    #[serde(rename = "tool_name")]
    pub name: String,
    /// Parameter name → type description, in declaration order.
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(rename = "return", default = "any_type")]
    pub return_type: String,
    #[serde(default)]
    pub docstring: String,
    pub module_path: String,
    #[serde(rename = "tool_call_id", default)]
    pub call_id: String,
    #[serde(default)]
    pub is_runtime: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Anything else the model attached to a module-sourced record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Extra key holding an `arguments` description that was not a mapping.
pub const RAW_ARGUMENTS: &str = "raw_arguments";

fn any_type() -> String {
    ANY_TYPE.to_owned()
}

impl ToolRecord {
    /// Record for a function that lives in this process only.
    pub fn runtime(registration: &ToolRegistration) -> Self {
        let arguments = registration
            .arguments
            .iter()
            .map(|(name, ty)| ((*name).to_owned(), Value::String((*ty).to_owned())))
            .collect();

        Self {
            name: registration.name.to_owned(),
            arguments,
            return_type: registration.returns.to_owned(),
            docstring: registration.doc.trim().to_owned(),
            module_path: RUNTIME_MODULE.to_owned(),
            call_id: new_call_id(),
            is_runtime: true,
            dependencies: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Builds a record from one entry of a model-generated module
    /// description. `module_path` always wins over whatever the model echoed.
    pub fn from_description(entry: Value, module_path: &str) -> Result<Self, FormatError> {
        let Value::Object(mut fields) = entry else {
            return Err(FormatError("every tool description must be a mapping".into()));
        };

        let name = match fields.remove("tool_name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            _ => return Err(FormatError("tool description without a `tool_name`".into())),
        };

        // Models sometimes describe the arguments as prose or a list; the
        // text is kept next to an empty mapping.
        let arguments = match fields.remove("arguments") {
            Some(Value::Object(arguments)) => arguments,
            None | Some(Value::Null) => Map::new(),
            Some(described) => {
                fields.insert(RAW_ARGUMENTS.to_owned(), described);
                Map::new()
            }
        };

        let return_type = match fields.remove("return") {
            Some(Value::String(s)) => s,
            None | Some(Value::Null) => any_type(),
            Some(other) => other.to_string(),
        };

        let docstring = match fields.remove("docstring") {
            Some(Value::String(s)) => s.trim().to_owned(),
            _ => String::new(),
        };

        let dependencies = match fields.remove("dependencies") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::String(list)) => list
                .split(',')
                .map(str::trim)
                .filter(|dep| !dep.is_empty())
                .map(str::to_owned)
                .collect(),
            _ => Vec::new(),
        };

        for key in ["module_path", "tool_call_id", "is_runtime"] {
            fields.remove(key);
        }

        Ok(Self {
            name,
            arguments,
            return_type,
            docstring,
            module_path: module_path.to_owned(),
            call_id: new_call_id(),
            is_runtime: module_path == RUNTIME_MODULE,
            dependencies,
            extra: fields,
        })
    }
}

/// Name → record mapping, persisted as a single JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    tools: BTreeMap<String, ToolRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `record` under its name, replacing any previous record.
    pub fn upsert(&mut self, record: ToolRecord) -> Option<ToolRecord> {
        self.tools.insert(record.name.clone(), record)
    }

    pub fn get(&self, name: &str) -> Option<&ToolRecord> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ToolRecord> + '_ {
        self.tools.values()
    }
}

/*───────────────────────────────────────────────────────────────────────────*/

/// Link-time registration submitted by `#[tool]`.
pub struct ToolRegistration {
    /// Symbolic tool name
    pub name: &'static str,
    /// Doc-string shown to the LLM
    pub doc: &'static str,
    /// Parameter names and their stringified types
    pub arguments: &'static [(&'static str, &'static str)],
    /// Stringified return type, `"Any"` when undeclared
    pub returns: &'static str,
    /// Wrapper (keyword arguments in → JSON out)
    pub f: ToolFn,
}

impl ToolRegistration {
    pub const fn new(
        name: &'static str,
        doc: &'static str,
        arguments: &'static [(&'static str, &'static str)],
        returns: &'static str,
        f: ToolFn,
    ) -> Self {
        Self {
            name,
            doc,
            arguments,
            returns,
            f,
        }
    }
}

/// A callable exported by a `#[tool_module]`.
pub struct ModuleExport {
    pub name: &'static str,
    pub f: ToolFn,
}

impl ModuleExport {
    pub const fn new(name: &'static str, f: ToolFn) -> Self {
        Self { name, f }
    }
}

/// Link-time registration submitted by `#[tool_module]`.
pub struct ModuleRegistration {
    /// Full module path, as `module_path!()` reports it
    pub path: &'static str,
    /// Source text of the module body
    pub source: &'static str,
    pub exports: &'static [ModuleExport],
}

impl ModuleRegistration {
    pub const fn new(
        path: &'static str,
        source: &'static str,
        exports: &'static [ModuleExport],
    ) -> Self {
        Self {
            path,
            source,
            exports,
        }
    }
}

inventory::collect!(ToolRegistration);
inventory::collect!(ModuleRegistration);

/*───────────────────────────────────────────────────────────────────────────*/

/// The model's choice of tool for a task.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Selection {
    pub tool_name: String,
    /// Keyword arguments for the call
    pub arguments: Map<String, Value>,
    pub module_path: String,
}

/// Response of a language model invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    pub content: String,
}

impl LlmResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}
