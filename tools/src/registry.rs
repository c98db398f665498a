//! Tool Handler Registry (§4.8): maps tool_type -> handler, enforcing a
//! per-tool deadline and recording execution_time_ms, grounded on the
//! `ExecutionStep` bookkeeping in `agentic/src/services/orchestrator.rs`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conhub_ports::{PortError, PortResult};
use tracing::warn;

use crate::types::{ToolArgs, ToolOutput, ToolType};

pub const DEFAULT_TOOL_TIMEOUT_SECONDS: u64 = 15;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn tool_type(&self) -> ToolType;

    /// Validates required arguments before `execute` is called.
    fn validate(&self, arguments: &ToolArgs) -> PortResult<()>;

    async fn execute(&self, arguments: ToolArgs) -> PortResult<ToolOutput>;
}

#[derive(Debug, Clone)]
pub struct ToolExecutionResult {
    pub tool_type: ToolType,
    pub output: Option<ToolOutput>,
    pub execution_time_ms: u64,
    pub error: Option<String>,
}

#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<ToolType, Arc<dyn ToolHandler>>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { handlers: HashMap::new(), timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECONDS) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(handler.tool_type(), handler);
    }

    /// Runs the handler for `tool_type` under the registry's deadline.
    /// Never returns `Err` for a handler-level failure — the caller (the
    /// orchestrator's S5 Execute) decides whether a failed tool aborts the
    /// request (§4.9 S5).
    pub async fn execute(&self, tool_type: ToolType, arguments: ToolArgs) -> ToolExecutionResult {
        let start = std::time::Instant::now();

        let Some(handler) = self.handlers.get(&tool_type) else {
            return ToolExecutionResult {
                tool_type,
                output: None,
                execution_time_ms: start.elapsed().as_millis() as u64,
                error: Some(format!("no handler registered for {}", tool_type.as_str())),
            };
        };

        if let Err(e) = handler.validate(&arguments) {
            return ToolExecutionResult {
                tool_type,
                output: None,
                execution_time_ms: start.elapsed().as_millis() as u64,
                error: Some(e.to_string()),
            };
        }

        let result = tokio::time::timeout(self.timeout, handler.execute(arguments)).await;

        let (output, error) = match result {
            Ok(Ok(output)) => (Some(output), None),
            Ok(Err(e)) => {
                warn!(tool = tool_type.as_str(), error = %e, "tool handler failed");
                (None, Some(e.to_string()))
            }
            Err(_) => {
                let e = PortError::timeout(format!("{} exceeded {:?}", tool_type.as_str(), self.timeout));
                warn!(tool = tool_type.as_str(), "tool handler timed out");
                (None, Some(e.to_string()))
            }
        };

        ToolExecutionResult { tool_type, output, execution_time_ms: start.elapsed().as_millis() as u64, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        fn tool_type(&self) -> ToolType {
            ToolType::AnswerDirectly
        }

        fn validate(&self, _arguments: &ToolArgs) -> PortResult<()> {
            Ok(())
        }

        async fn execute(&self, arguments: ToolArgs) -> PortResult<ToolOutput> {
            Ok(arguments)
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl ToolHandler for SlowHandler {
        fn tool_type(&self) -> ToolType {
            ToolType::SearchWeb
        }

        fn validate(&self, _arguments: &ToolArgs) -> PortResult<()> {
            Ok(())
        }

        async fn execute(&self, _arguments: ToolArgs) -> PortResult<ToolOutput> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ToolOutput::new())
        }
    }

    #[tokio::test]
    async fn missing_handler_reports_error_not_panic() {
        let registry = ToolRegistry::new();
        let result = registry.execute(ToolType::FillForm, ToolArgs::new()).await;
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn registered_handler_runs_and_records_timing() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoHandler));
        let result = registry.execute(ToolType::AnswerDirectly, ToolArgs::new()).await;
        assert!(result.output.is_some());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn timeout_surfaces_as_error_not_hang() {
        let mut registry = ToolRegistry::new().with_timeout(Duration::from_millis(20));
        registry.register(Arc::new(SlowHandler));
        let result = registry.execute(ToolType::SearchWeb, ToolArgs::new()).await;
        assert!(result.error.is_some());
    }
}
