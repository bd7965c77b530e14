//! Environment driven configuration.

use std::env;
use std::path::PathBuf;

/// Directory holding the registry document.
pub const DEFAULT_TOOLS_DIR: &str = "tool_template";
/// File name of the registry document.
pub const DEFAULT_TOOLS_FILE: &str = "tools.json";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Where the registry document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsConfig {
    pub tools_dir: PathBuf,
    pub tools_file: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tools_dir: PathBuf::from(DEFAULT_TOOLS_DIR),
            tools_file: DEFAULT_TOOLS_FILE.to_owned(),
        }
    }
}

impl ToolsConfig {
    /// Reads `AGENTOOLS_TOOLS_DIR` and `AGENTOOLS_TOOLS_FILE`, falling back
    /// to `tool_template/tools.json`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tools_dir: non_empty_var("AGENTOOLS_TOOLS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.tools_dir),
            tools_file: non_empty_var("AGENTOOLS_TOOLS_FILE").unwrap_or(defaults.tools_file),
        }
    }

    pub fn with_tools_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tools_dir = dir.into();
        self
    }

    pub fn registry_path(&self) -> PathBuf {
        self.tools_dir.join(&self.tools_file)
    }
}

/// Settings for [`OpenAiChat`](crate::llm::OpenAiChat).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_owned(),
            api_base: DEFAULT_API_BASE.to_owned(),
        }
    }
}

impl LlmConfig {
    /// Reads `OPENAI_API_KEY`, `AGENTOOLS_MODEL` and `AGENTOOLS_API_BASE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: non_empty_var("OPENAI_API_KEY"),
            model: non_empty_var("AGENTOOLS_MODEL").unwrap_or(defaults.model),
            api_base: non_empty_var("AGENTOOLS_API_BASE").unwrap_or(defaults.api_base),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
