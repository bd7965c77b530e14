//! Module registration: the model reads a module's source and describes it.

use std::sync::Arc;

use agentools::{tool_module, ScriptedModel, ToolManager, ToolsConfig};

#[tool_module]
pub mod geometry {
    /// Area of a circle with the given radius.
    pub fn circle_area(radius: f64) -> f64 {
        std::f64::consts::PI * radius * radius
    }

    /// Length of the hypotenuse of a right triangle.
    pub fn hypotenuse(a: f64, b: f64) -> f64 {
        a.hypot(b)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    demos::init_tracing();

    let path = concat!(module_path!(), "::geometry");
    let description = format!(
        "[{{'tool_name': 'circle_area', 'arguments': {{'radius': 'float'}}, 'return': 'float', \
         'docstring': 'Area of a circle with the given radius.', 'dependencies': [], \
         'module_path': '{path}'}}, \
         {{'tool_name': 'hypotenuse', 'arguments': {{'a': 'float', 'b': 'float'}}, \
         'return': 'float', 'docstring': 'Length of the hypotenuse of a right triangle.', \
         'dependencies': [], 'module_path': '{path}'}}]"
    );
    let selection = format!(
        r#"{{"tool_name": "hypotenuse", "arguments": {{"a": 3.0, "b": 4.0}}, "module_path": "{path}"}}"#
    );
    let llm = Arc::new(ScriptedModel::new([description, selection]));

    let manager = ToolManager::from_config(&ToolsConfig::from_env(), llm);
    manager.register_module(path).await?;

    let answer = manager
        .resolve_and_invoke("How long is the diagonal of a 3 by 4 rectangle?")
        .await?;
    println!("hypotenuse(3, 4) → {answer:?}");

    Ok(())
}
