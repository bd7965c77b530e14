//! In-process symbol table and the [`ToolLocator`] seam.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ToolError;
use crate::models::{ToolFn, ToolFunc};
use crate::modules::ModuleResolver;

/// Finds the callable behind a tool selection.
pub trait ToolLocator {
    fn locate(&self, tool_name: &str, module_path: &str) -> Result<Arc<ToolFunc>, ToolError>;
}

/// Tools registered from inside this process, keyed by name.
///
/// Runtime tools have no module to re-import them from, so this table is the
/// only way back to them at dispatch time.
#[derive(Default, Clone)]
pub struct SymbolTable {
    funcs: HashMap<String, Arc<ToolFunc>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `func` under `name`, returning the callable it replaced.
    pub fn insert(&mut self, name: impl Into<String>, func: Arc<ToolFunc>) -> Option<Arc<ToolFunc>> {
        self.funcs.insert(name.into(), func)
    }

    pub fn insert_fn(&mut self, name: impl Into<String>, f: ToolFn) -> Option<Arc<ToolFunc>> {
        self.insert(name, Arc::new(f))
    }

    pub fn get(&self, name: &str) -> Option<Arc<ToolFunc>> {
        self.funcs.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.funcs.keys()).finish()
    }
}

impl ToolLocator for SymbolTable {
    fn locate(&self, tool_name: &str, _module_path: &str) -> Result<Arc<ToolFunc>, ToolError> {
        self.get(tool_name).ok_or_else(|| ToolError::FunctionNotFound {
            name: Cow::Owned(tool_name.to_owned()),
        })
    }
}

/// Imports the selected module and fetches the named attribute from it.
pub struct ModuleLocator<'a> {
    resolver: &'a dyn ModuleResolver,
}

impl<'a> ModuleLocator<'a> {
    pub fn new(resolver: &'a dyn ModuleResolver) -> Self {
        Self { resolver }
    }
}

impl ToolLocator for ModuleLocator<'_> {
    fn locate(&self, tool_name: &str, module_path: &str) -> Result<Arc<ToolFunc>, ToolError> {
        let module = self.resolver.import(module_path)?;
        module
            .attribute(tool_name)
            .ok_or_else(|| ToolError::AttributeMissing {
                module: module_path.to_owned(),
                name: tool_name.to_owned(),
            })
    }
}
