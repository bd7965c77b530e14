//! Registration and dispatch.
//!
//! [`ToolManager`] owns the persisted [`ToolRegistry`], the in-process
//! [`SymbolTable`] and a [`ModuleResolver`], and talks to a
//! [`LanguageModel`] to describe modules and to pick a tool for a task.
//!
//! Registration errors are returned to the caller. Dispatch is lenient:
//! a selection that cannot be parsed or located is logged and yields
//! `Ok(None)`, while errors raised by the tool itself are passed on.

use std::sync::Arc;

use serde_json::Value;

use crate::config::ToolsConfig;
use crate::error::{FormatError, ToolError};
use crate::extract::extract_json;
use crate::literal;
use crate::llm::LanguageModel;
use crate::models::{Selection, ToolFunc, ToolRecord, ToolRegistration};
use crate::modules::{linked_modules, ModuleResolver};
use crate::prompt;
use crate::store::ToolRegistry;
use crate::symbols::{ModuleLocator, SymbolTable, ToolLocator};

/// Marker in a selection that means "no tool applies".
const NO_TOOL: &str = "None";

pub struct ToolManager {
    registry: ToolRegistry,
    symbols: SymbolTable,
    modules: Arc<dyn ModuleResolver>,
    llm: Arc<dyn LanguageModel>,
}

impl ToolManager {
    /// Manager over `registry`, resolving modules from the linked
    /// `#[tool_module]` table.
    pub fn new(registry: ToolRegistry, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            registry,
            symbols: SymbolTable::new(),
            modules: linked_modules(),
            llm,
        }
    }

    pub fn from_config(config: &ToolsConfig, llm: Arc<dyn LanguageModel>) -> Self {
        Self::new(ToolRegistry::from_config(config), llm)
    }

    pub fn with_modules(mut self, modules: Arc<dyn ModuleResolver>) -> Self {
        self.modules = modules;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /*──────────────────────────── registration ────────────────────────────*/

    /// Registers a runtime tool: the callable goes into the symbol table,
    /// its record is upserted into the registry.
    pub fn register_function(
        &mut self,
        registration: &ToolRegistration,
    ) -> Result<ToolRecord, ToolError> {
        let func: Arc<ToolFunc> = Arc::new(registration.f);
        self.register_callable(ToolRecord::runtime(registration), func)
    }

    /// Like [`register_function`](Self::register_function) for callables
    /// that are not plain function pointers, e.g. closures over state.
    pub fn register_callable(
        &mut self,
        record: ToolRecord,
        func: Arc<ToolFunc>,
    ) -> Result<ToolRecord, ToolError> {
        self.symbols.insert(record.name.clone(), func);
        self.registry.register_record(record.clone())?;
        tracing::info!(
            "Registered tool: {} ({})",
            record.name,
            if record.is_runtime { "runtime" } else { "file-based" }
        );
        Ok(record)
    }

    /// Registers every `#[tool]` linked into the binary. Returns how many.
    pub fn collect_tools(&mut self) -> Result<usize, ToolError> {
        let mut count = 0;
        for registration in inventory::iter::<ToolRegistration> {
            self.register_function(registration)?;
            count += 1;
        }
        Ok(count)
    }

    /// Asks the model to describe the tools of `module_path` and merges the
    /// description into the registry in a single save.
    pub async fn register_module(&self, module_path: &str) -> Result<(), ToolError> {
        let module = self.modules.import(module_path)?;
        let source = module
            .source()
            .ok_or_else(|| ToolError::resolution(module_path, "module source is unavailable"))?;

        let prompt = prompt::describe_module(module_path, source);
        tracing::debug!(module = module_path, "Requesting module description");
        let response = self.llm.invoke(&prompt).await?;

        let entries = match literal::parse(response.content.trim()).map_err(FormatError::from)? {
            Value::Array(entries) => entries,
            other => {
                return Err(FormatError(
                    format!("expected a list of tools, got {}", kind_of(&other)).into(),
                )
                .into())
            }
        };

        let records = entries
            .into_iter()
            .map(|entry| ToolRecord::from_description(entry, module_path))
            .collect::<Result<Vec<_>, _>>()?;

        let mut registry = self.registry.load()?;
        for record in records {
            tracing::info!(
                tool = %record.name,
                call_id = %record.call_id,
                "Registered {}",
                record.name
            );
            registry.upsert(record);
        }
        self.registry.save(&registry)?;

        tracing::info!("Completed registration for module {module_path}");
        Ok(())
    }

    /*────────────────────────────── dispatch ──────────────────────────────*/

    /// Lets the model pick a tool for `task` and runs it.
    ///
    /// * `Ok(Some(_))` – the tool's result, or the model's own answer when it
    ///   selected no tool.
    /// * `Ok(None)` – the selection could not be parsed or located.
    /// * `Err(_)` – the registry or the model failed, or the tool did.
    pub async fn resolve_and_invoke(&self, task: &str) -> Result<Option<Value>, ToolError> {
        let registry = self.registry.load()?;
        let prompt = prompt::select_tool(task, &registry)?;
        let response = self.llm.invoke(&prompt).await?;

        let fragment = match extract_json(&response.content) {
            Some(fragment) if !fragment.contains(NO_TOOL) => fragment,
            _ => {
                tracing::info!("No tool selected, answering the task directly");
                let answer = self.llm.invoke(task).await?;
                return Ok(Some(Value::String(answer.content)));
            }
        };

        let (selection, func) = match self.lookup(fragment) {
            Ok(found) => found,
            Err(e) if e.is_lookup_failure() => {
                tracing::error!("Tool execution failed: {e}");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(
            tool = %selection.tool_name,
            module = %selection.module_path,
            "Invoking selected tool"
        );
        func(Value::Object(selection.arguments)).await.map(Some)
    }

    /// Parses the selection and finds its callable.
    fn lookup(&self, fragment: &str) -> Result<(Selection, Arc<ToolFunc>), ToolError> {
        let selection: Selection =
            serde_json::from_str(fragment).map_err(ToolError::SelectionFormat)?;
        let func = self.locate(&selection)?;
        Ok((selection, func))
    }

    /// Symbol table first, then import-and-fetch.
    fn locate(&self, selection: &Selection) -> Result<Arc<ToolFunc>, ToolError> {
        if self.symbols.contains(&selection.tool_name) {
            return self
                .symbols
                .locate(&selection.tool_name, &selection.module_path);
        }
        ModuleLocator::new(self.modules.as_ref())
            .locate(&selection.tool_name, &selection.module_path)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DeserializationError, LlmError, StorageError};
    use crate::llm::ScriptedModel;
    use crate::models::{RAW_ARGUMENTS, RUNTIME_MODULE};
    use crate::modules::{Module, ModuleTable};
    use crate::store::{DocumentStore, MemoryStore};
    use futures::future::BoxFuture;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn add(args: Value) -> BoxFuture<'static, Result<Value, ToolError>> {
        Box::pin(async move {
            #[derive(Deserialize)]
            struct Args {
                x: i64,
                y: i64,
            }
            let Args { x, y } =
                serde_json::from_value(args).map_err(DeserializationError::from)?;
            Ok(json!(x + y))
        })
    }

    fn explode(_: Value) -> BoxFuture<'static, Result<Value, ToolError>> {
        Box::pin(async {
            Err(ToolError::Failed {
                name: "explode".into(),
                message: "boom".into(),
            })
        })
    }

    fn shout(args: Value) -> BoxFuture<'static, Result<Value, ToolError>> {
        Box::pin(async move {
            let text = args["text"].as_str().unwrap_or_default().to_uppercase();
            Ok(Value::String(text))
        })
    }

    static ADD: ToolRegistration = ToolRegistration::new(
        "add",
        "Adds two numbers.",
        &[("x", "int"), ("y", "int")],
        "int",
        add,
    );

    static EXPLODE: ToolRegistration =
        ToolRegistration::new("explode", "Always fails.", &[], "Any", explode);

    /// Module resolver that counts imports.
    struct CountingResolver {
        table: ModuleTable,
        imports: AtomicUsize,
    }

    impl ModuleResolver for CountingResolver {
        fn import(&self, module_path: &str) -> Result<Arc<Module>, ToolError> {
            self.imports.fetch_add(1, Ordering::SeqCst);
            self.table.import(module_path)
        }
    }

    /// Memory store that counts writes.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: Arc<AtomicUsize>,
    }

    impl DocumentStore for CountingStore {
        fn location(&self) -> String {
            self.inner.location()
        }
        fn read(&self) -> Result<String, StorageError> {
            self.inner.read()
        }
        fn write(&self, document: &str) -> Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write(document)
        }
    }

    fn text_module() -> Module {
        Module::new("app::text")
            .with_source("/// Upper-cases text.\npub fn shout(text: String) -> String { text.to_uppercase() }")
            .with_fn("shout", shout)
    }

    fn harness(responses: &[&str]) -> (ToolManager, Arc<ScriptedModel>, Arc<CountingResolver>) {
        let llm = Arc::new(ScriptedModel::new(responses.iter().copied()));
        let resolver = Arc::new(CountingResolver {
            table: ModuleTable::new().with_module(text_module()),
            imports: AtomicUsize::new(0),
        });
        let manager = ToolManager::new(ToolRegistry::in_memory(), llm.clone())
            .with_modules(resolver.clone());
        (manager, llm, resolver)
    }

    #[test]
    fn test_register_function_persists_record() {
        let (mut manager, _, _) = harness(&[]);
        let record = manager.register_function(&ADD).unwrap();

        let registry = manager.registry().load().unwrap();
        let stored = registry.get("add").unwrap();
        assert_eq!(stored, &record);
        assert_eq!(stored.arguments.keys().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(stored.return_type, "int");
        assert!(stored.is_runtime);
        assert!(manager.symbols().contains("add"));
    }

    #[test]
    fn test_reregistration_overwrites_record() {
        let (mut manager, _, _) = harness(&[]);
        let first = manager.register_function(&ADD).unwrap();
        let second = manager.register_function(&ADD).unwrap();
        assert_ne!(first.call_id, second.call_id);

        let registry = manager.registry().load().unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("add").unwrap().call_id, second.call_id);
    }

    #[tokio::test]
    async fn test_dispatch_through_symbol_table() {
        let (mut manager, llm, resolver) = harness(&[
            r#"{"tool_name":"add","arguments":{"x":2,"y":3},"module_path":"__runtime__"}"#,
        ]);
        manager.register_function(&ADD).unwrap();

        let result = manager.resolve_and_invoke("add 2 and 3").await.unwrap();
        assert_eq!(result, Some(json!(5)));
        assert_eq!(resolver.imports.load(Ordering::SeqCst), 0);

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("- Task: add 2 and 3"));
        assert!(prompts[0].contains("\"tool_name\":\"add\""));
    }

    #[tokio::test]
    async fn test_dispatch_tolerates_surrounding_prose() {
        let (mut manager, _, _) = harness(&[
            "Sure, use this:\n```json\n{\"tool_name\": \"add\", \"arguments\": {\"x\": 40, \"y\": 2}, \"module_path\": \"__runtime__\"}\n```",
        ]);
        manager.register_function(&ADD).unwrap();
        assert_eq!(
            manager.resolve_and_invoke("what is 40 + 2").await.unwrap(),
            Some(json!(42))
        );
    }

    #[tokio::test]
    async fn test_dispatch_through_module_import() {
        let (manager, _, resolver) = harness(&[
            r#"{"tool_name":"shout","arguments":{"text":"hi"},"module_path":"app::text"}"#,
        ]);
        let result = manager.resolve_and_invoke("shout hi").await.unwrap();
        assert_eq!(result, Some(json!("HI")));
        assert_eq!(resolver.imports.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_marker_falls_back_to_direct_answer() {
        let (manager, llm, _) = harness(&["none found: None", "Paris"]);
        let result = manager
            .resolve_and_invoke("What is the capital of France?")
            .await
            .unwrap();
        assert_eq!(result, Some(json!("Paris")));
        assert_eq!(llm.prompts()[1], "What is the capital of France?");
    }

    #[tokio::test]
    async fn test_none_inside_object_falls_back() {
        let (manager, _, _) = harness(&[r#"{"tool_name": None}"#, "no tool needed"]);
        assert_eq!(
            manager.resolve_and_invoke("say hello").await.unwrap(),
            Some(json!("no tool needed"))
        );
    }

    #[tokio::test]
    async fn test_missing_object_falls_back() {
        let (manager, llm, _) = harness(&["I cannot help with tools here.", "42"]);
        assert_eq!(
            manager.resolve_and_invoke("meaning of life").await.unwrap(),
            Some(json!("42"))
        );
        assert_eq!(llm.remaining(), 0);
    }

    #[tokio::test]
    async fn test_malformed_selection_yields_none() {
        let (manager, _, _) = harness(&["{'tool_name': 'add'}"]);
        assert_eq!(manager.resolve_and_invoke("add").await.unwrap(), None);

        let (manager, _, _) = harness(&[r#"{"tool_name": "add", "arguments": {}}"#]);
        assert_eq!(manager.resolve_and_invoke("add").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unimportable_module_yields_none() {
        let (manager, _, resolver) = harness(&[
            r#"{"tool_name":"fetch","arguments":{},"module_path":"app::network"}"#,
        ]);
        assert_eq!(manager.resolve_and_invoke("fetch").await.unwrap(), None);
        assert_eq!(resolver.imports.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_runtime_tool_from_other_process_yields_none() {
        let (manager, _, _) = harness(&[
            r#"{"tool_name":"add","arguments":{"x":1,"y":1},"module_path":"__runtime__"}"#,
        ]);
        assert_eq!(manager.resolve_and_invoke("add").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_attribute_yields_none() {
        let (manager, _, _) = harness(&[
            r#"{"tool_name":"whisper","arguments":{},"module_path":"app::text"}"#,
        ]);
        assert_eq!(manager.resolve_and_invoke("whisper").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tool_failure_propagates() {
        let (mut manager, _, _) = harness(&[
            r#"{"tool_name":"explode","arguments":{},"module_path":"__runtime__"}"#,
        ]);
        manager.register_function(&EXPLODE).unwrap();
        let err = manager.resolve_and_invoke("explode").await.unwrap_err();
        assert!(matches!(err, ToolError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_argument_mismatch_propagates() {
        let (mut manager, _, _) = harness(&[
            r#"{"tool_name":"add","arguments":{"x":"two"},"module_path":"__runtime__"}"#,
        ]);
        manager.register_function(&ADD).unwrap();
        let err = manager.resolve_and_invoke("add").await.unwrap_err();
        assert!(matches!(err, ToolError::Deserialize(_)));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let (manager, _, _) = harness(&[]);
        let err = manager.resolve_and_invoke("anything").await.unwrap_err();
        assert!(matches!(err, ToolError::Llm(LlmError::Exhausted(1))));
    }

    #[tokio::test]
    async fn test_corrupt_registry_propagates() {
        let llm = Arc::new(ScriptedModel::new(["{}"]));
        let manager = ToolManager::new(
            ToolRegistry::new(MemoryStore::with_document("{broken")),
            llm.clone(),
        );
        let err = manager.resolve_and_invoke("anything").await.unwrap_err();
        assert!(matches!(err, ToolError::Storage(StorageError::Corrupt { .. })));
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_register_module_merges_description() {
        let description = r#"[
            {'tool_name': 'shout', 'arguments': {'text': 'str'}, 'return': 'str',
             'docstring': 'Upper-cases text.', 'dependencies': [],
             'module_path': 'somewhere.else'},
            {'tool_name': 'whisper', 'arguments': {'text': 'str', 'quiet': 'bool = True'},
             'return': 'str', 'docstring': '', 'dependencies': ['unicode'],
             'module_path': 'app::text'},
        ]"#;
        let writes = Arc::new(AtomicUsize::new(0));
        let store = CountingStore {
            inner: MemoryStore::new(),
            writes: writes.clone(),
        };
        let llm = Arc::new(ScriptedModel::new([description]));
        let mut manager = ToolManager::new(ToolRegistry::new(store), llm.clone()).with_modules(
            Arc::new(ModuleTable::new().with_module(text_module())),
        );
        manager.register_function(&ADD).unwrap();
        assert_eq!(writes.load(Ordering::SeqCst), 1);

        manager.register_module("app::text").await.unwrap();
        assert_eq!(writes.load(Ordering::SeqCst), 2);

        let registry = manager.registry().load().unwrap();
        assert_eq!(registry.len(), 3);
        let shout = registry.get("shout").unwrap();
        let whisper = registry.get("whisper").unwrap();
        assert_eq!(shout.module_path, "app::text");
        assert!(!shout.is_runtime);
        assert_ne!(shout.call_id, whisper.call_id);
        assert_eq!(whisper.arguments.get("quiet"), Some(&json!("bool = True")));
        assert_eq!(whisper.dependencies, ["unicode"]);
        assert_eq!(registry.get("add").unwrap().module_path, RUNTIME_MODULE);

        assert!(llm.prompts()[0].contains("pub fn shout(text: String)"));
    }

    #[tokio::test]
    async fn test_register_module_keeps_prose_arguments() {
        let (manager, _, _) = harness(&[
            "[{'tool_name': 'shout', 'arguments': 'text: str', 'return': 'str'}]",
        ]);
        manager.register_module("app::text").await.unwrap();

        let registry = manager.registry().load().unwrap();
        let shout = registry.get("shout").unwrap();
        assert!(shout.arguments.is_empty());
        assert_eq!(shout.extra.get(RAW_ARGUMENTS), Some(&json!("text: str")));
        assert_eq!(shout.return_type, "str");
    }

    #[tokio::test]
    async fn test_register_module_rejects_non_list() {
        let (manager, _, _) = harness(&["{'tool_name': 'shout'}"]);
        let err = manager.register_module("app::text").await.unwrap_err();
        assert!(matches!(err, ToolError::Format(_)));
        assert!(manager.registry().load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_module_rejects_unparseable_output() {
        let (manager, _, _) = harness(&["```json\n[]\n```"]);
        let err = manager.register_module("app::text").await.unwrap_err();
        assert!(matches!(err, ToolError::Format(_)));
    }

    #[tokio::test]
    async fn test_register_module_rejects_entry_without_name() {
        let (manager, _, _) = harness(&["[{'tool_name': 'shout'}, {'arguments': {}}]"]);
        let err = manager.register_module("app::text").await.unwrap_err();
        assert!(matches!(err, ToolError::Format(_)));
        assert!(manager.registry().load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_unknown_module() {
        let (manager, llm, _) = harness(&[]);
        let err = manager.register_module("app::nowhere").await.unwrap_err();
        assert!(matches!(err, ToolError::Resolution { .. }));
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_register_module_without_source() {
        let llm = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let manager = ToolManager::new(ToolRegistry::in_memory(), llm).with_modules(Arc::new(
            ModuleTable::new().with_module(Module::new("app::opaque").with_fn("add", add)),
        ));
        let err = manager.register_module("app::opaque").await.unwrap_err();
        assert!(matches!(err, ToolError::Resolution { .. }));
    }

    #[tokio::test]
    async fn test_registered_module_tool_is_dispatchable() {
        let (manager, _, resolver) = harness(&[
            "[{'tool_name': 'shout', 'arguments': {'text': 'str'}, 'return': 'str'}]",
            r#"{"tool_name":"shout","arguments":{"text":"quiet"},"module_path":"app::text"}"#,
        ]);
        manager.register_module("app::text").await.unwrap();
        assert_eq!(
            manager.resolve_and_invoke("make it loud").await.unwrap(),
            Some(json!("QUIET"))
        );
        assert_eq!(resolver.imports.load(Ordering::SeqCst), 2);
    }
}
