//! Prompts sent to the model.

use crate::error::StorageError;
use crate::models::Registry;

/// Asks the model to describe every tool-like function in `source`.
pub fn describe_module(module_path: &str, source: &str) -> String {
    format!(
        "Analyze this module and return a list of tools in JSON format:\n\
         - Module code:\n\
         {source}\n\
         Format: return only a list of objects, without further explanation, \
         without ```json markdown fences, and keep module_path unchanged.\n\
         [{{\
         \"tool_name\": \"The function\", \
         \"arguments\": \"A dictionary of keyword-arguments to execute the tool, keeping default values if they are set\", \
         \"return\": \"Return value of this tool\", \
         \"docstring\": \"Docstring of this tool\", \
         \"dependencies\": \"List of libraries needed to run this tool\", \
         \"module_path\": \"{module_path}\"\
         }}]"
    )
}

/// Asks the model to pick one tool for `task` out of `registry`.
pub fn select_tool(task: &str, registry: &Registry) -> Result<String, StorageError> {
    let tools = serde_json::to_string(registry).map_err(StorageError::Encode)?;
    Ok(format!(
        "Select a tool for this task from available tools:\n\
         - Task: {task}\n\
         - Available tools: {tools}\n\
         \n\
         Return format: only return a dictionary, without explanation and without \
         ```python``` or ```json``` fences. If no tool fits, answer None.\n\
         {{\n\
         \x20   \"tool_name\": \"The function\",\n\
         \x20   \"arguments\": \"A dictionary of keyword-arguments to execute tool_name\",\n\
         \x20   \"module_path\": \"module_path to import this tool\"\n\
         }}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_module_embeds_source_and_path() {
        let prompt = describe_module("app::weather", "pub fn forecast(city: String) {}");
        assert!(prompt.contains("pub fn forecast(city: String) {}"));
        assert!(prompt.contains("\"module_path\": \"app::weather\""));
        assert!(prompt.contains("[{\"tool_name\""));
    }

    #[test]
    fn test_select_tool_embeds_task_and_registry() {
        let prompt = select_tool("add 2 and 3", &Registry::new()).unwrap();
        assert!(prompt.contains("- Task: add 2 and 3"));
        assert!(prompt.contains("- Available tools: {}"));
        assert!(prompt.contains("    \"module_path\": \"module_path to import this tool\""));
    }
}
