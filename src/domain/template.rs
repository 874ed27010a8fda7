use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Context;

/// Visual style hint carried by action templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    #[default]
    Default,
    Dashed,
    Link,
    Text,
    Success,
    Warning,
    Danger,
}

/// Confirmation prompt shown before an action is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirm {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_text: Option<String>,
}

impl Confirm {
    pub fn new(title: impl Into<String>) -> Self {
        Confirm {
            title: title.into(),
            ok_text: None,
            cancel_text: None,
        }
    }
}

/// Entity an action operates on, filled in from the context at resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The current task (`Context::task_id`)
    Task,
    /// The owning process instance (`Context::process_instance_id`)
    ProcessInstance,
}

impl Target {
    /// Name of the context field this target is read from.
    pub fn field(&self) -> &'static str {
        match self {
            Target::Task => "task_id",
            Target::ProcessInstance => "process_instance_id",
        }
    }

    /// Look up the target id in a context.
    pub fn lookup<'a>(&self, ctx: &'a Context) -> Option<&'a str> {
        let id = match self {
            Target::Task => ctx.task_id.as_deref(),
            Target::ProcessInstance => ctx.process_instance_id.as_deref(),
        };
        id.filter(|s| !s.is_empty())
    }
}

/// Payload of an action template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub label: String,

    #[serde(default)]
    pub style: ButtonStyle,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Permission codes required to see the action (checked by the UI layer)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auth: Vec<String>,

    /// Whether dispatch needs a comment
    #[serde(default)]
    pub require_comment: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<Confirm>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// Entity whose id must be resolved from the context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
}

impl ActionSpec {
    pub fn new(label: impl Into<String>) -> Self {
        ActionSpec {
            label: label.into(),
            style: ButtonStyle::Default,
            icon: None,
            auth: Vec::new(),
            require_comment: false,
            confirm: None,
            class_name: None,
            target: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn auth<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn require_comment(mut self) -> Self {
        self.require_comment = true;
        self
    }

    pub fn confirm(mut self, confirm: Confirm) -> Self {
        self.confirm = Some(confirm);
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }
}

/// Payload of a field-permission template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPermissionSpec {
    #[serde(default)]
    pub editable: Vec<String>,
    #[serde(default)]
    pub readonly: Vec<String>,
    #[serde(default)]
    pub hidden: Vec<String>,
    #[serde(default)]
    pub required: Vec<String>,
}

/// What a template produces when it matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Action(ActionSpec),
    FieldPermission(FieldPermissionSpec),
}

/// Match conditions of a template.
///
/// Each dimension is optional. An absent dimension always matches. The status
/// dimension is always checked; node type, form type and roles are only
/// checked when the context carries a value for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Conditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_types: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_types: Option<Vec<String>>,
}

impl Conditions {
    /// Conditions that match every context.
    pub fn any() -> Self {
        Conditions::default()
    }

    pub fn status<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn node_types<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_types = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn roles<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn form_types<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.form_types = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// True if no dimension is constrained.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.node_types.is_none()
            && self.roles.is_none()
            && self.form_types.is_none()
    }

    /// Constrained dimensions by name, for validation and diagnostics.
    pub fn dimensions(&self) -> impl Iterator<Item = (&'static str, &Vec<String>)> {
        [
            ("status", self.status.as_ref()),
            ("node_types", self.node_types.as_ref()),
            ("roles", self.roles.as_ref()),
            ("form_types", self.form_types.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, values)| values.map(|v| (name, v)))
    }

    /// Evaluate the conditions against a context.
    pub fn matches(&self, ctx: &Context) -> bool {
        if let Some(allowed) = &self.status {
            if !allowed.iter().any(|s| *s == ctx.status) {
                return false;
            }
        }

        if let (Some(allowed), Some(node_type)) = (&self.node_types, &ctx.node_type) {
            if !allowed.iter().any(|n| n == node_type) {
                return false;
            }
        }

        if let Some(allowed) = &self.roles {
            if ctx.has_any_role(allowed) == Some(false) {
                return false;
            }
        }

        if let (Some(allowed), Some(form_type)) = (&self.form_types, &ctx.form_type) {
            if !allowed.iter().any(|f| f == form_type) {
                return false;
            }
        }

        true
    }
}

/// A template document that does not describe exactly one payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template {code:?} has no action or field_permission payload")]
    MissingPayload { code: String },

    #[error("template {code:?} has both an action and a field_permission payload")]
    ConflictingPayloads { code: String },
}

/// Wire form of a [`Template`]; every key must be known.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTemplate {
    code: String,
    #[serde(default)]
    priority: Option<u32>,
    #[serde(default)]
    conditions: Conditions,
    #[serde(default)]
    action: Option<ActionSpec>,
    #[serde(default)]
    field_permission: Option<FieldPermissionSpec>,
}

impl TryFrom<RawTemplate> for Template {
    type Error = TemplateError;

    fn try_from(raw: RawTemplate) -> Result<Self, Self::Error> {
        let payload = match (raw.action, raw.field_permission) {
            (Some(spec), None) => Payload::Action(spec),
            (None, Some(spec)) => Payload::FieldPermission(spec),
            (None, None) => return Err(TemplateError::MissingPayload { code: raw.code }),
            (Some(_), Some(_)) => return Err(TemplateError::ConflictingPayloads { code: raw.code }),
        };

        Ok(Template {
            code: raw.code,
            priority: raw.priority,
            conditions: raw.conditions,
            payload,
        })
    }
}

/// Declarative rule pairing match conditions with a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTemplate")]
pub struct Template {
    /// Unique identifier within a rule table
    pub code: String,

    /// Explicit sort priority (lower first); falls back to the priority table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,

    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub conditions: Conditions,

    #[serde(flatten)]
    pub payload: Payload,
}

impl Template {
    /// Create an action template.
    pub fn action(code: impl Into<String>, spec: ActionSpec) -> Self {
        Template {
            code: code.into(),
            priority: None,
            conditions: Conditions::any(),
            payload: Payload::Action(spec),
        }
    }

    /// Create a field-permission template.
    pub fn field_permission(code: impl Into<String>, spec: FieldPermissionSpec) -> Self {
        Template {
            code: code.into(),
            priority: None,
            conditions: Conditions::any(),
            payload: Payload::FieldPermission(spec),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Check whether this template applies to a context.
    #[inline]
    pub fn matches(&self, ctx: &Context) -> bool {
        self.conditions.matches(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::status;

    #[test]
    fn test_absent_conditions_match_everything() {
        let template = Template::action("print", ActionSpec::new("Print"));

        assert!(template.matches(&Context::new(status::DRAFT)));
        assert!(template.matches(&Context::new("ANYTHING").with_roles(["x"])));
    }

    #[test]
    fn test_status_condition() {
        let conditions = Conditions::any().status([status::PENDING]);

        assert!(conditions.matches(&Context::new(status::PENDING)));
        assert!(!conditions.matches(&Context::new(status::SUSPENDED)));
    }

    #[test]
    fn test_node_type_only_checked_when_present() {
        let conditions = Conditions::any().node_types(["userTask"]);

        assert!(conditions.matches(&Context::new(status::PENDING).with_node_type("userTask")));
        assert!(!conditions.matches(&Context::new(status::PENDING).with_node_type("serviceTask")));
        assert!(conditions.matches(&Context::new(status::PENDING)));
    }

    #[test]
    fn test_roles_intersect() {
        let conditions = Conditions::any().roles(["admin", "process:suspend"]);

        assert!(conditions.matches(&Context::new(status::IN_PROCESS).with_roles(["clerk", "admin"])));
        assert!(!conditions.matches(&Context::new(status::IN_PROCESS).with_roles(["clerk"])));
        assert!(conditions.matches(&Context::new(status::IN_PROCESS)));
    }

    #[test]
    fn test_form_type_condition() {
        let conditions = Conditions::any().form_types(["online"]);

        assert!(conditions.matches(&Context::new(status::PENDING).with_form_type("online")));
        assert!(!conditions.matches(&Context::new(status::PENDING).with_form_type("custom")));
    }

    #[test]
    fn test_target_lookup_ignores_empty_ids() {
        let ctx = Context::new(status::PENDING).with_task("").with_process_instance("P1");

        assert_eq!(Target::Task.lookup(&ctx), None);
        assert_eq!(Target::ProcessInstance.lookup(&ctx), Some("P1"));
    }

    #[test]
    fn test_template_yaml() {
        let yaml = r#"
code: reject
priority: 2
conditions:
  node_types: [userTask, approvalTask]
  status: [PENDING, IN_PROCESS]
action:
  label: Reject
  require_comment: true
  target: task
  confirm:
    title: Reject this task?
"#;
        let template: Template = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(template.code, "reject");
        assert_eq!(template.priority, Some(2));
        match &template.payload {
            Payload::Action(spec) => {
                assert!(spec.require_comment);
                assert_eq!(spec.target, Some(Target::Task));
                assert_eq!(spec.style, ButtonStyle::Default);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_template_key_rejected() {
        let yaml = r#"
code: terminate
condition:
  status: [IN_PROCESS]
  roles: [admin]
action:
  label: Terminate
"#;
        assert!(serde_yaml::from_str::<Template>(yaml).is_err());

        let yaml = r#"
code: terminate
priorty: 1
action:
  label: Terminate
"#;
        assert!(serde_yaml::from_str::<Template>(yaml).is_err());
    }

    #[test]
    fn test_exactly_one_payload_required() {
        let both = r#"
code: approve
action:
  label: Approve
field_permission:
  editable: [opinion]
"#;
        let err = serde_yaml::from_str::<Template>(both).unwrap_err();
        assert!(err.to_string().contains("both an action and a field_permission"));

        let neither = "code: approve\npriority: 1\n";
        let err = serde_yaml::from_str::<Template>(neither).unwrap_err();
        assert!(err.to_string().contains("no action or field_permission"));
    }

    #[test]
    fn test_template_serializes_back() {
        let template = Template::field_permission(
            "fields",
            FieldPermissionSpec {
                hidden: vec!["salary".to_string()],
                ..Default::default()
            },
        )
        .with_priority(4);

        let yaml = serde_yaml::to_string(&template).unwrap();
        let restored: Template = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(restored, template);
    }

    #[test]
    fn test_unknown_condition_dimension_rejected() {
        let yaml = r#"
code: approve
conditions:
  weekday: [MON]
action:
  label: Approve
"#;
        assert!(serde_yaml::from_str::<Template>(yaml).is_err());
    }
}
