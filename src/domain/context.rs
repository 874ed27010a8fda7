use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Well-known workflow status values.
///
/// The status vocabulary is open: any string is accepted in a [`Context`],
/// these are the values the built-in rule tables are written against.
pub mod status {
    pub const DRAFT: &str = "DRAFT";
    pub const PENDING: &str = "PENDING";
    pub const IN_PROCESS: &str = "IN_PROCESS";
    pub const COMPLETED: &str = "COMPLETED";
    pub const SUSPENDED: &str = "SUSPENDED";
    pub const TERMINATED: &str = "TERMINATED";
    pub const CLAIMED: &str = "CLAIMED";

    /// All known status values.
    pub const ALL: [&str; 7] = [
        DRAFT, PENDING, IN_PROCESS, COMPLETED, SUSPENDED, TERMINATED, CLAIMED,
    ];
}

/// Role set attached to a context. Most users carry only a handful of roles.
pub type Roles = SmallVec<[String; 4]>;

/// Runtime facts a resolution is made against.
///
/// Built by the caller (usually from a task-info lookup) and treated as
/// immutable for the duration of one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Current workflow status
    pub status: String,

    /// BPMN node type of the current task (e.g. `userTask`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    /// Form type bound to the task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_type: Option<String>,

    /// Roles held by the acting user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Roles>,

    /// Task the decision is for, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Process instance the task belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_instance_id: Option<String>,
}

impl Context {
    /// Create a context with only a status.
    pub fn new(status: impl Into<String>) -> Self {
        Context {
            status: status.into(),
            node_type: None,
            form_type: None,
            roles: None,
            task_id: None,
            process_instance_id: None,
        }
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_form_type(mut self, form_type: impl Into<String>) -> Self {
        self.form_type = Some(form_type.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_process_instance(mut self, process_instance_id: impl Into<String>) -> Self {
        self.process_instance_id = Some(process_instance_id.into());
        self
    }

    /// Check whether the user holds at least one of the given roles.
    ///
    /// Returns `None` when the context carries no role information at all.
    pub fn has_any_role<'a>(&self, candidates: impl IntoIterator<Item = &'a String>) -> Option<bool> {
        let roles = self.roles.as_ref()?;
        Some(candidates.into_iter().any(|c| roles.iter().any(|r| r == c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let ctx = Context::new(status::PENDING)
            .with_node_type("userTask")
            .with_roles(["admin", "auditor"])
            .with_task("T1");

        assert_eq!(ctx.status, "PENDING");
        assert_eq!(ctx.node_type.as_deref(), Some("userTask"));
        assert_eq!(ctx.roles.as_ref().map(|r| r.len()), Some(2));
        assert_eq!(ctx.task_id.as_deref(), Some("T1"));
        assert!(ctx.process_instance_id.is_none());
    }

    #[test]
    fn test_has_any_role() {
        let wanted = vec!["admin".to_string(), "process:suspend".to_string()];

        let ctx = Context::new(status::IN_PROCESS);
        assert_eq!(ctx.has_any_role(&wanted), None);

        let ctx = ctx.with_roles(["clerk"]);
        assert_eq!(ctx.has_any_role(&wanted), Some(false));

        let ctx = ctx.with_roles(["clerk", "admin"]);
        assert_eq!(ctx.has_any_role(&wanted), Some(true));
    }

    #[test]
    fn test_context_deserialization() {
        let json = r#"{"status":"PENDING","node_type":"userTask","roles":["a","b"]}"#;
        let ctx: Context = serde_json::from_str(json).unwrap();

        assert_eq!(ctx.status, status::PENDING);
        assert_eq!(ctx.node_type.as_deref(), Some("userTask"));
        assert!(ctx.form_type.is_none());
        assert_eq!(ctx.roles.unwrap().as_slice(), &["a".to_string(), "b".to_string()]);
    }
}
