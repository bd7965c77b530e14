//! Static registration and dispatch against a scripted model.
//!
//! Runs offline: the "model" answers from a fixed script.

use std::sync::Arc;

use agentools::{tool, ScriptedModel, ToolManager, ToolsConfig};

#[tool]
/// Adds two numbers.
fn add(x: i32, y: i32) -> i32 {
    x + y
}

#[tool]
/// Greets a person.
async fn greet(name: String) -> String {
    format!("Hello, {name}!")
}

#[tool]
/// Calculates the Fibonacci number at the given position.
fn fibonacci(n: u32) -> u64 {
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 0..n {
        let tmp = a + b;
        a = b;
        b = tmp;
    }
    a
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    demos::init_tracing();
    println!("Agentools Basic Example\n=======================");

    let llm = Arc::new(ScriptedModel::new([
        r#"{"tool_name": "add", "arguments": {"x": 3, "y": 4}, "module_path": "__runtime__"}"#,
        r#"Sure! {"tool_name": "greet", "arguments": {"name": "World"}, "module_path": "__runtime__"}"#,
        r#"{"tool_name": "fibonacci", "arguments": {"n": 10}, "module_path": "__runtime__"}"#,
        "None",
        "I am a scripted model, I only know what I am told.",
    ]));

    let config = ToolsConfig::from_env();
    let mut manager = ToolManager::from_config(&config, llm);
    let count = manager.collect_tools()?;
    println!("Registered {count} tools in {}", config.registry_path().display());

    for task in [
        "What is 3 plus 4?",
        "Say hello to the world",
        "What is the 10th Fibonacci number?",
        "Tell me about yourself",
    ] {
        match manager.resolve_and_invoke(task).await? {
            Some(answer) => println!("{task} → {answer}"),
            None => println!("{task} → (no usable tool)"),
        }
    }

    println!("\nAvailable tools:");
    for record in manager.registry().load()?.records() {
        println!("  - {}: {}", record.name, record.docstring);
    }

    Ok(())
}
