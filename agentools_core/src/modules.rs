//! Importable tool modules.
//!
//! A module pairs its source text (what the model reads during module
//! registration) with the callables it exports (what dispatch fetches by
//! name). `#[tool_module]` submits one [`ModuleRegistration`] per annotated
//! module; [`ModuleTable::linked`] gathers them.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::ToolError;
use crate::models::{ModuleRegistration, ToolFn, ToolFunc, RUNTIME_MODULE};

/// Turns a module path into a loaded module.
pub trait ModuleResolver: Send + Sync {
    fn import(&self, module_path: &str) -> Result<Arc<Module>, ToolError>;
}

/// A loaded module: optional source plus named callables.
pub struct Module {
    path: String,
    source: Option<String>,
    functions: HashMap<String, Arc<ToolFunc>>,
}

impl Module {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: None,
            functions: HashMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, func: Arc<ToolFunc>) -> Self {
        self.functions.insert(name.into(), func);
        self
    }

    pub fn with_fn(self, name: impl Into<String>, f: ToolFn) -> Self {
        self.with_function(name, Arc::new(f))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The exported callable called `name`.
    pub fn attribute(&self, name: &str) -> Option<Arc<ToolFunc>> {
        self.functions.get(name).cloned()
    }
}

impl From<&ModuleRegistration> for Module {
    fn from(reg: &ModuleRegistration) -> Self {
        reg.exports.iter().fold(
            Module::new(reg.path).with_source(reg.source),
            |module, export| module.with_fn(export.name, export.f),
        )
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("path", &self.path)
            .field("has_source", &self.source.is_some())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

static LINKED: Lazy<Arc<ModuleTable>> = Lazy::new(|| Arc::new(ModuleTable::linked()));

/// Shared table of every `#[tool_module]` linked into the binary.
pub fn linked_modules() -> Arc<ModuleTable> {
    LINKED.clone()
}

/// Module path → module.
#[derive(Debug, Default)]
pub struct ModuleTable {
    modules: HashMap<String, Arc<Module>>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from every submitted [`ModuleRegistration`].
    pub fn linked() -> Self {
        inventory::iter::<ModuleRegistration>
            .into_iter()
            .fold(Self::new(), |table, reg| table.with_module(Module::from(reg)))
    }

    pub fn insert(&mut self, module: Module) -> Option<Arc<Module>> {
        self.modules.insert(module.path.clone(), Arc::new(module))
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.insert(module);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleResolver for ModuleTable {
    fn import(&self, module_path: &str) -> Result<Arc<Module>, ToolError> {
        if module_path == RUNTIME_MODULE {
            return Err(ToolError::resolution(
                module_path,
                "runtime tools cannot be imported",
            ));
        }
        self.modules
            .get(module_path)
            .cloned()
            .ok_or_else(|| ToolError::resolution(module_path, "no such module"))
    }
}
