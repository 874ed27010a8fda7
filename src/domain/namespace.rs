use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Kind of value held under a cache key.
///
/// Namespaces partition the cache's key space so whole categories can be
/// dropped at once (e.g. every permission config after a model redeploy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Online form configuration
    FormConfig,
    /// Form data for a single record
    FormData,
    /// Resolved workflow actions for a task
    WorkflowButtons,
    /// Field permissions for a form at a node
    PermissionConfig,
    /// Process instance details
    ProcessInfo,
    /// User profile details
    UserInfo,
    /// Dictionary lookups
    Dictionary,
}

impl Namespace {
    pub const ALL: [Namespace; 7] = [
        Namespace::FormConfig,
        Namespace::FormData,
        Namespace::WorkflowButtons,
        Namespace::PermissionConfig,
        Namespace::ProcessInfo,
        Namespace::UserInfo,
        Namespace::Dictionary,
    ];

    /// Stable string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::FormConfig => "form_config",
            Namespace::FormData => "form_data",
            Namespace::WorkflowButtons => "workflow_buttons",
            Namespace::PermissionConfig => "permission_config",
            Namespace::ProcessInfo => "process_info",
            Namespace::UserInfo => "user_info",
            Namespace::Dictionary => "dictionary",
        }
    }

    /// Parse from the stable string name.
    pub fn parse(s: &str) -> Option<Self> {
        Namespace::ALL.into_iter().find(|ns| ns.as_str() == s)
    }

    /// Typical lifetime of values in this namespace.
    ///
    /// Returns `None` where the cache's configured default should apply.
    pub fn recommended_ttl(&self) -> Option<Duration> {
        match self {
            Namespace::FormConfig => Some(Duration::from_secs(15 * 60)),
            Namespace::FormData => Some(Duration::from_secs(5 * 60)),
            Namespace::WorkflowButtons => Some(Duration::from_secs(3 * 60)),
            Namespace::PermissionConfig => Some(Duration::from_secs(30 * 60)),
            Namespace::Dictionary => Some(Duration::from_secs(60 * 60)),
            Namespace::ProcessInfo | Namespace::UserInfo => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup key of a cache entry: namespace plus caller-chosen identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub namespace: Namespace,
    pub identifier: String,
}

impl CacheKey {
    pub fn new(namespace: Namespace, identifier: impl Into<String>) -> Self {
        CacheKey {
            namespace,
            identifier: identifier.into(),
        }
    }

    /// Key for the resolved actions of a task.
    pub fn buttons(task_id: &str) -> Self {
        CacheKey::new(Namespace::WorkflowButtons, task_id)
    }

    /// Key for the field permissions of a form at a node.
    pub fn permissions(node_id: &str, form_id: &str) -> Self {
        CacheKey::new(Namespace::PermissionConfig, format!("{}-{}", node_id, form_id))
    }

    /// Key for a single form record.
    pub fn form_data(form_id: &str, data_id: &str) -> Self {
        CacheKey::new(Namespace::FormData, format!("{}-{}", form_id, data_id))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.identifier)
    }
}
