#![deny(unsafe_code)]

//! Runtime of the agentools registry: persisted tool records, the in-process
//! symbol table, importable modules and the model-driven dispatcher.

pub mod config;
pub mod error;
pub mod extract;
pub mod literal;
pub mod llm;
pub mod manager;
pub mod models;
pub mod modules;
pub mod prompt;
pub mod store;
pub mod symbols;

pub use config::{LlmConfig, ToolsConfig};
pub use error::{
    DeserializationError, FormatError, LlmError, StorageError, ToolError,
};
pub use extract::extract_json;
pub use llm::{LanguageModel, OpenAiChat, ScriptedModel};
pub use manager::ToolManager;
pub use models::{
    LlmResponse, ModuleExport, ModuleRegistration, Registry, Selection, ToolFn, ToolFunc,
    ToolRecord, ToolRegistration, ANY_TYPE, RAW_ARGUMENTS, RUNTIME_MODULE,
};
pub use modules::{linked_modules, Module, ModuleResolver, ModuleTable};
pub use store::{DocumentStore, FileStore, MemoryStore, ToolRegistry};
pub use symbols::{ModuleLocator, SymbolTable, ToolLocator};

// Re-exported for use in generated code
#[doc(hidden)]
pub use futures;
#[doc(hidden)]
pub use inventory;
#[doc(hidden)]
pub use serde;
#[doc(hidden)]
pub use serde_json;
