//! **agentools** – a tool registry driven by a language model.
//!
//! Functions become tools in two ways:
//!
//! * `#[tool]` registers a single function; [`ToolManager::collect_tools`]
//!   puts every linked one into the symbol table and the persisted registry.
//! * `#[tool_module]` makes an inline module importable; the model reads its
//!   source during [`ToolManager::register_module`] and describes its tools.
//!
//! [`ToolManager::resolve_and_invoke`] then lets the model pick a tool for a
//! task and runs it.

// Lets `#[tool]` expand to `::agentools::…` inside this crate as well.
extern crate self as agentools;

pub mod prelude;

pub use agentools_core::{
    config, error, extract, literal, llm, models, modules, prompt, store, symbols,
};
pub use agentools_core::{
    extract_json, linked_modules, DeserializationError, DocumentStore, FileStore, FormatError,
    LanguageModel, LlmConfig, LlmError, LlmResponse, MemoryStore, Module, ModuleLocator,
    ModuleResolver, ModuleTable, OpenAiChat, Registry, ScriptedModel, Selection, StorageError,
    SymbolTable, ToolError, ToolFunc, ToolLocator, ToolManager, ToolRecord, ToolRegistration,
    ToolRegistry, ToolsConfig, ANY_TYPE, RAW_ARGUMENTS, RUNTIME_MODULE,
};
pub use agentools_macros::{tool, tool_module};

// Re-exported for use in generated code
#[doc(hidden)]
pub use agentools_core::{ModuleExport, ModuleRegistration};
#[doc(hidden)]
pub use inventory;
#[doc(hidden)]
pub use serde;
#[doc(hidden)]
pub use serde_json;

/// Every `#[tool]` linked into the binary, in registration order.
pub fn linked_tools() -> impl Iterator<Item = &'static ToolRegistration> {
    inventory::iter::<ToolRegistration>.into_iter()
}
