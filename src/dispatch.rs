use std::sync::Arc;

use ahash::AHashMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{ActionItem, Decision, ResolvedTarget, Target};

/// Errors raised when acting on a resolved action.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("action {code} needs a {field} but none was resolved")]
    UnresolvedReference { code: String, field: &'static str },

    #[error("action {code} requires a comment")]
    MissingComment { code: String },

    #[error("no handler registered for action {code}")]
    UnknownAction { code: String },

    #[error("action {code} is not permitted in this context")]
    NotPermitted { code: String },

    #[error("handler failed: {0}")]
    Handler(String),
}

/// Caller input accompanying an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Receiving user for transfer/delegate style actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub variables: serde_json::Map<String, serde_json::Value>,
}

impl ActionRequest {
    pub fn new() -> Self {
        ActionRequest::default()
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    fn has_comment(&self) -> bool {
        self.comment.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

/// What a handler reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ResolvedTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Performs one kind of action, e.g. completing a task.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Entity the action must have a resolved id for, if any.
    fn requires_target(&self) -> Option<Target> {
        None
    }

    async fn handle(&self, item: &ActionItem, request: &ActionRequest) -> anyhow::Result<ActionOutcome>;
}

/// Routes action items to their handlers after validating them.
#[derive(Default)]
pub struct Dispatcher {
    handlers: AHashMap<String, Arc<dyn ActionHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher::default()
    }

    /// Register the handler for an action code, replacing any previous one.
    pub fn register(&mut self, code: impl Into<String>, handler: Arc<dyn ActionHandler>) -> &mut Self {
        self.handlers.insert(code.into(), handler);
        self
    }

    pub fn handles(&self, code: &str) -> bool {
        self.handlers.contains_key(code)
    }

    /// Validate `item` and run its handler.
    ///
    /// Fails with `UnresolvedReference` if the handler needs a target the
    /// item does not carry, and with `MissingComment` if the item requires a
    /// comment and the request has none.
    pub async fn dispatch(&self, item: &ActionItem, request: &ActionRequest) -> Result<ActionOutcome, DispatchError> {
        let handler = self
            .handlers
            .get(&item.code)
            .ok_or_else(|| DispatchError::UnknownAction {
                code: item.code.clone(),
            })?;

        if let Some(kind) = handler.requires_target() {
            let resolved = item
                .target
                .as_ref()
                .is_some_and(|t| t.kind == kind && !t.id.is_empty());
            if !resolved {
                warn!(code = %item.code, field = kind.field(), "Dispatch without resolved target");
                return Err(DispatchError::UnresolvedReference {
                    code: item.code.clone(),
                    field: kind.field(),
                });
            }
        }

        if item.require_comment && !request.has_comment() {
            return Err(DispatchError::MissingComment {
                code: item.code.clone(),
            });
        }

        debug!(code = %item.code, "Dispatching action");

        handler
            .handle(item, request)
            .await
            .map_err(|e| DispatchError::Handler(format!("{}: {}", item.code, e)))
    }

    /// Dispatch the action `code` if `decision` permits it.
    pub async fn dispatch_from(
        &self,
        decision: &Decision,
        code: &str,
        request: &ActionRequest,
    ) -> Result<ActionOutcome, DispatchError> {
        let item = decision
            .actions()
            .find(|a| a.code == code)
            .ok_or_else(|| DispatchError::NotPermitted {
                code: code.to_string(),
            })?;

        self.dispatch(item, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{status, Context};
    use crate::rules::{desktop_table, PolicyResolver};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl ActionHandler for Recording {
        fn requires_target(&self) -> Option<Target> {
            Some(Target::Task)
        }

        async fn handle(&self, item: &ActionItem, request: &ActionRequest) -> anyhow::Result<ActionOutcome> {
            self.calls
                .lock()
                .push((item.code.clone(), request.comment.clone()));
            Ok(ActionOutcome {
                code: item.code.clone(),
                target: item.target.clone(),
                message: None,
            })
        }
    }

    struct Failing;

    #[async_trait]
    impl ActionHandler for Failing {
        async fn handle(&self, _item: &ActionItem, _request: &ActionRequest) -> anyhow::Result<ActionOutcome> {
            anyhow::bail!("engine rejected the request")
        }
    }

    fn pending_decision() -> Decision {
        let ctx = Context::new(status::PENDING)
            .with_node_type("userTask")
            .with_task("T1");
        PolicyResolver::desktop().resolve(&ctx, &desktop_table().unwrap())
    }

    fn action(decision: &Decision, code: &str) -> ActionItem {
        decision.get(code).and_then(|i| i.as_action()).cloned().unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_runs_handler() {
        let recording = Arc::new(Recording::default());
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("approve", recording.clone());

        let outcome = dispatcher
            .dispatch_from(&pending_decision(), "approve", &ActionRequest::new().with_comment("ok"))
            .await
            .unwrap();

        assert_eq!(outcome.target.unwrap().id, "T1");
        assert_eq!(
            *recording.calls.lock(),
            vec![("approve".to_string(), Some("ok".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_missing_target_is_unresolved_reference() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("approve", Arc::new(Recording::default()));

        let mut item = action(&pending_decision(), "approve");
        item.target = None;

        let request = ActionRequest::new().with_comment("ok");
        let err = dispatcher.dispatch(&item, &request).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::UnresolvedReference { field: "task_id", .. }
        ));
    }

    #[tokio::test]
    async fn test_comment_required() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("reject", Arc::new(Recording::default()));
        let decision = pending_decision();

        let err = dispatcher
            .dispatch_from(&decision, "reject", &ActionRequest::new().with_comment("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::MissingComment { .. }));

        let outcome = dispatcher
            .dispatch_from(&decision, "reject", &ActionRequest::new().with_comment("amount too high"))
            .await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_and_not_permitted() {
        let dispatcher = Dispatcher::new();
        let decision = pending_decision();

        let err = dispatcher
            .dispatch_from(&decision, "approve", &ActionRequest::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownAction { .. }));

        let err = dispatcher
            .dispatch_from(&decision, "resume", &ActionRequest::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotPermitted { .. }));
    }

    #[tokio::test]
    async fn test_handler_error_is_wrapped() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("claim", Arc::new(Failing));

        let err = dispatcher
            .dispatch_from(&pending_decision(), "claim", &ActionRequest::new())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "handler failed: claim: engine rejected the request"
        );
    }
}
