//! Convenient re-exports for common usage patterns.
//!
//! ```rust
//! use agentools::prelude::*;
//! ```

// Registration and dispatch
pub use crate::{ToolManager, ToolRegistry, ToolsConfig};

// Model backends
pub use crate::{LanguageModel, LlmConfig, OpenAiChat, ScriptedModel};

// Essential types
pub use crate::{ToolError, ToolRecord};

// Macros
pub use crate::{tool, tool_module};

// Commonly used external types
pub use serde_json::{json, Value};

// Re-export commonly needed traits for tool argument and return types
pub use serde::{Deserialize, Serialize};

// Re-export async runtime for examples
pub use tokio;
