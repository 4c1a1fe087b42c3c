//! Guarded operation dispatch
//!
//! Every registered tool runs behind the same wrapper: readiness is checked
//! exactly once, then arguments are validated, and only then does the body run
//! on its own task. Validation failures, body errors and panics become
//! `isError` responses; they never reach the transport.

use minecraft_mcp_core::{McpError, Result, ToolResponse};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::lifecycle::{Readiness, ReadinessGate};

/// Future produced by a tool body
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<ToolResponse>> + Send>>;

/// A validated invocation, not yet started
type Prepared = Box<dyn FnOnce() -> ToolFuture + Send>;

type ToolBody = Arc<dyn Fn(Value) -> Result<Prepared> + Send + Sync>;

/// Tool definition for MCP tools/list
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

struct Registered {
    def: ToolDef,
    body: ToolBody,
}

/// Registry of guarded tools
pub struct Dispatcher {
    gate: Arc<dyn ReadinessGate>,
    tools: HashMap<String, Registered>,
    /// Registration order, for listing
    order: Vec<String>,
}

impl Dispatcher {
    pub fn new(gate: Arc<dyn ReadinessGate>) -> Self {
        Self {
            gate,
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The registry is append-only: a second registration under a taken
    /// name is ignored
    fn insert(&mut self, def: ToolDef, body: ToolBody) {
        if self.tools.contains_key(&def.name) {
            warn!("Tool {} registered twice; keeping the first", def.name);
            return;
        }
        self.order.push(def.name.clone());
        self.tools.insert(def.name.clone(), Registered { def, body });
    }

    /// Register a tool taking raw JSON arguments
    pub fn register<F, Fut>(&mut self, name: &str, description: &str, input_schema: Value, body: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse>> + Send + 'static,
    {
        let body = Arc::new(body);
        let wrapped: ToolBody = Arc::new(move |args: Value| {
            let body = body.clone();
            Ok(Box::new(move || Box::pin(body(args)) as ToolFuture) as Prepared)
        });

        self.insert(
            ToolDef {
                name: name.to_string(),
                description: description.to_string(),
                input_schema,
            },
            wrapped,
        );
    }

    /// Register a tool whose arguments deserialize into `P`
    ///
    /// String arguments are coerced to numbers where the schema declares a
    /// numeric property.
    pub fn register_typed<P, F, Fut>(
        &mut self,
        name: &str,
        description: &str,
        input_schema: Value,
        body: F,
    ) where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse>> + Send + 'static,
    {
        let body = Arc::new(body);
        let schema = input_schema.clone();
        let wrapped: ToolBody = Arc::new(move |mut args: Value| {
            if args.is_null() {
                args = Value::Object(Default::default());
            }
            coerce_numeric_strings(&schema, &mut args);
            let params: P = serde_json::from_value(args)
                .map_err(|e| McpError::InvalidParams(e.to_string()))?;
            let body = body.clone();
            Ok(Box::new(move || Box::pin(body(params)) as ToolFuture) as Prepared)
        });

        self.insert(
            ToolDef {
                name: name.to_string(),
                description: description.to_string(),
                input_schema,
            },
            wrapped,
        );
    }

    /// Definitions in registration order
    pub fn tools(&self) -> Vec<ToolDef> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.def.clone())
            .collect()
    }

    /// Invoke a tool by name
    ///
    /// Unknown tools are protocol errors. Everything else yields a
    /// [`ToolResponse`].
    pub async fn call(&self, name: &str, args: Value) -> Result<ToolResponse> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| McpError::InvalidParams(format!("Unknown tool: {}", name)))?;

        if let Readiness::NotReady(detail) = self.gate.check_readiness().await {
            debug!("Tool {} refused: not ready", name);
            return Ok(ToolResponse::failure(detail));
        }

        let prepared = match (tool.body)(args) {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!("Tool {} rejected its arguments: {}", name, e);
                return Ok(ToolResponse::error(e));
            }
        };

        match tokio::spawn(prepared()).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                warn!("Tool {} failed: {}", name, e);
                Ok(ToolResponse::error(e))
            }
            Err(join) => {
                let message = if join.is_panic() {
                    panic_message(join.into_panic())
                } else {
                    "operation was cancelled".to_string()
                };
                warn!("Tool {} panicked: {}", name, message);
                Ok(ToolResponse::error(message))
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Replace numeric strings with numbers for properties typed as numbers
fn coerce_numeric_strings(schema: &Value, args: &mut Value) {
    let (Some(properties), Some(args)) = (
        schema.get("properties").and_then(Value::as_object),
        args.as_object_mut(),
    ) else {
        return;
    };

    for (key, property) in properties {
        let kind = property.get("type").and_then(Value::as_str);
        let Some(Value::String(raw)) = args.get(key) else {
            continue;
        };
        let raw = raw.trim();
        let coerced = match kind {
            Some("integer") => raw.parse::<i64>().ok().map(Value::from),
            Some("number") => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            _ => None,
        };
        if let Some(value) = coerced {
            args.insert(key.clone(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubGate {
        readiness: Readiness,
        checks: AtomicUsize,
    }

    impl StubGate {
        fn new(readiness: Readiness) -> Arc<Self> {
            Arc::new(Self {
                readiness,
                checks: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReadinessGate for StubGate {
        async fn check_readiness(&self) -> Readiness {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.readiness.clone()
        }
    }

    #[derive(Deserialize)]
    struct Target {
        x: f64,
        y: f64,
        z: f64,
        #[serde(default)]
        range: Option<i64>,
    }

    fn target_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "x": { "type": "number" },
                "y": { "type": "number" },
                "z": { "type": "number" },
                "range": { "type": "integer" }
            },
            "required": ["x", "y", "z"]
        })
    }

    fn counting_dispatcher(gate: Arc<StubGate>) -> (Dispatcher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut dispatcher = Dispatcher::new(gate);
        dispatcher.register("ping-bot", "Test tool", json!({ "type": "object" }), move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ToolResponse::text("pong"))
            }
        });
        (dispatcher, calls)
    }

    #[tokio::test]
    async fn test_not_ready_skips_body() {
        let gate = StubGate::new(Readiness::NotReady(
            "Bot is connecting to the Minecraft server.".into(),
        ));
        let (dispatcher, calls) = counting_dispatcher(gate.clone());

        let response = dispatcher.call("ping-bot", json!({})).await.unwrap();

        assert!(response.is_error());
        assert_eq!(response.text_content(), "Bot is connecting to the Minecraft server.");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(gate.checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ready_returns_body_result_unchanged() {
        let gate = StubGate::new(Readiness::Ready);
        let (dispatcher, calls) = counting_dispatcher(gate.clone());

        let response = dispatcher.call("ping-bot", Value::Null).await.unwrap();

        assert_eq!(response, ToolResponse::text("pong"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_body_error_becomes_failed_response() {
        let mut dispatcher = Dispatcher::new(StubGate::new(Readiness::Ready));
        dispatcher.register("dig", "Test tool", json!({ "type": "object" }), |_| async {
            Err::<ToolResponse, _>(McpError::game("Connection timeout"))
        });

        let response = dispatcher.call("dig", json!({})).await.unwrap();
        assert!(response.is_error());
        assert_eq!(response.text_content(), "Failed: Connection timeout");
    }

    #[tokio::test]
    async fn test_body_panic_is_contained() {
        let mut dispatcher = Dispatcher::new(StubGate::new(Readiness::Ready));
        dispatcher.register("explode", "Test tool", json!({ "type": "object" }), |_| async {
            if true {
                panic!("inventory slot out of range");
            }
            Ok(ToolResponse::text("unreachable"))
        });

        let response = dispatcher.call("explode", json!({})).await.unwrap();
        assert!(response.is_error());
        assert_eq!(response.text_content(), "Failed: inventory slot out of range");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_protocol_error() {
        let gate = StubGate::new(Readiness::Ready);
        let (dispatcher, _) = counting_dispatcher(gate.clone());

        let err = dispatcher.call("teleport", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));
        assert_eq!(gate.checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_typed_arguments_coerce_numeric_strings() {
        let mut dispatcher = Dispatcher::new(StubGate::new(Readiness::Ready));
        dispatcher.register_typed("goto", "Test tool", target_schema(), |t: Target| async move {
            Ok(ToolResponse::text(format!(
                "{} {} {} {:?}",
                t.x, t.y, t.z, t.range
            )))
        });

        let response = dispatcher
            .call("goto", json!({ "x": "10.5", "y": 64, "z": " -3 ", "range": "2" }))
            .await
            .unwrap();
        assert_eq!(response.text_content(), "10.5 64 -3 Some(2)");
    }

    #[tokio::test]
    async fn test_invalid_arguments_become_failed_response() {
        let gate = StubGate::new(Readiness::Ready);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut dispatcher = Dispatcher::new(gate.clone());
        dispatcher.register_typed("goto", "Test tool", target_schema(), move |_: Target| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(ToolResponse::text("moved")) }
        });

        let response = dispatcher
            .call("goto", json!({ "x": "north", "y": 64, "z": 0 }))
            .await
            .unwrap();
        assert!(response.is_error());
        assert!(
            response
                .text_content()
                .starts_with("Failed: Invalid params: invalid type: string \"north\"")
        );
        assert_eq!(gate.checks.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_ready_wins_over_invalid_arguments() {
        let gate = StubGate::new(Readiness::NotReady(
            "Bot is connecting to the Minecraft server.".into(),
        ));
        let mut dispatcher = Dispatcher::new(gate.clone());
        dispatcher.register_typed("goto", "Test tool", target_schema(), |_: Target| async {
            Ok(ToolResponse::text("moved"))
        });

        let response = dispatcher.call("goto", json!({ "y": 64 })).await.unwrap();
        assert!(response.is_error());
        assert_eq!(
            response.text_content(),
            "Bot is connecting to the Minecraft server."
        );
        assert_eq!(gate.checks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tools_listed_in_registration_order() {
        let mut dispatcher = Dispatcher::new(StubGate::new(Readiness::Ready));
        for name in ["get-position", "fly-to", "send-chat"] {
            dispatcher.register(name, "Test tool", json!({}), |_| async {
                Ok(ToolResponse::text(""))
            });
        }
        let names: Vec<_> = dispatcher.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["get-position", "fly-to", "send-chat"]);

        let json = serde_json::to_value(&dispatcher.tools()[0]).unwrap();
        assert!(json.get("inputSchema").is_some());
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_first() {
        let mut dispatcher = Dispatcher::new(StubGate::new(Readiness::Ready));
        for reply in ["first", "second"] {
            dispatcher.register("jump", "Test tool", json!({}), move |_| async move {
                Ok(ToolResponse::text(reply))
            });
        }
        assert_eq!(dispatcher.tools().len(), 1);
        let response = dispatcher.call("jump", json!({})).await.unwrap();
        assert_eq!(response.text_content(), "first");
    }
}
