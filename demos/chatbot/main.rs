//! Interactive loop against an OpenAI-compatible endpoint.
//!
//! Needs `OPENAI_API_KEY`; `AGENTOOLS_MODEL` and `AGENTOOLS_API_BASE` are
//! optional.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use agentools::{tool, tool_module, OpenAiChat, ToolManager, ToolsConfig};
use serde_json::Value;

#[tool]
/// Gets the current temperature for given coordinates
async fn get_weather(lat: f64, lon: f64) -> Result<f64, String> {
    let url = format!(
        "https://api.open-meteo.com/v1/forecast?latitude={lat}&longitude={lon}&current=temperature_2m"
    );
    let response = reqwest::get(&url).await.map_err(|e| e.to_string())?;
    let json: Value = response.json().await.map_err(|e| e.to_string())?;

    json.get("current")
        .and_then(|current| current.get("temperature_2m"))
        .and_then(Value::as_f64)
        .ok_or_else(|| "Missing temperature_2m in response".to_owned())
}

#[tool]
/// Counts occurrences of `sub` in `s`
fn count_instance(s: String, sub: String) -> usize {
    s.matches(&sub).count()
}

#[tool_module]
pub mod mail {
    /// Sends an email.
    pub fn send_email(to: String, content: String) -> String {
        println!("Email sent to {to},\n{content}\n");
        format!("sent to {to}")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    demos::init_tracing();

    let llm = Arc::new(OpenAiChat::from_env()?);
    tracing::info!(model = llm.model(), "Connected");
    let mut manager = ToolManager::from_config(&ToolsConfig::from_env(), llm);
    manager.collect_tools()?;
    manager
        .register_module(concat!(module_path!(), "::mail"))
        .await?;

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let task = line.trim();
        if task.is_empty() {
            continue;
        }

        match manager.resolve_and_invoke(task).await {
            Ok(Some(Value::String(text))) => println!("{text}"),
            Ok(Some(value)) => println!("{value}"),
            Ok(None) => println!("(no tool could handle that)"),
            Err(e) => tracing::error!("{e}"),
        }
    }

    Ok(())
}
