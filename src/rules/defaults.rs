//! Built-in action tables for the desktop and mobile clients.

use crate::domain::status::{CLAIMED, COMPLETED, IN_PROCESS, PENDING, SUSPENDED, TERMINATED};
use crate::domain::{ActionSpec, ButtonStyle, Conditions, Confirm, Target, Template};

use super::table::{ConfigurationError, RuleTable};

/// Version tag of the built-in tables.
pub const BUILTIN_VERSION: &str = "builtin-1";

const USER_TASK: &str = "userTask";
const APPROVAL_TASK: &str = "approvalTask";

fn confirm(title: &str, ok: &str) -> Confirm {
    Confirm {
        title: title.to_string(),
        ok_text: Some(ok.to_string()),
        cancel_text: Some("Cancel".to_string()),
    }
}

fn task_conditions(node_types: &[&str], statuses: &[&str]) -> Conditions {
    Conditions::any()
        .node_types(node_types.iter().copied())
        .status(statuses.iter().copied())
}

/// Templates of the desktop action bar, in declaration order.
pub fn desktop_templates() -> Vec<Template> {
    vec![
        Template::action(
            "approve",
            ActionSpec::new("Approve")
                .style(ButtonStyle::Primary)
                .icon("ant-design:check-circle-outlined")
                .require_comment()
                .target(Target::Task),
        )
        .with_conditions(task_conditions(&[USER_TASK, APPROVAL_TASK], &[PENDING, IN_PROCESS])),
        Template::action(
            "reject",
            ActionSpec::new("Reject")
                .icon("ant-design:close-circle-outlined")
                .require_comment()
                .confirm(confirm("Reject this task?", "Reject"))
                .class_name("btn-danger")
                .target(Target::Task),
        )
        .with_conditions(task_conditions(&[USER_TASK, APPROVAL_TASK], &[PENDING, IN_PROCESS])),
        Template::action(
            "return",
            ActionSpec::new("Return")
                .icon("ant-design:rollback-outlined")
                .require_comment()
                .confirm(confirm("Return to the previous step?", "Return"))
                .target(Target::Task),
        )
        .with_conditions(task_conditions(&[USER_TASK], &[PENDING, IN_PROCESS])),
        Template::action(
            "transfer",
            ActionSpec::new("Transfer")
                .icon("ant-design:swap-outlined")
                .target(Target::Task),
        )
        .with_conditions(task_conditions(&[USER_TASK], &[PENDING, IN_PROCESS])),
        Template::action(
            "delegate",
            ActionSpec::new("Delegate")
                .icon("ant-design:user-switch-outlined")
                .target(Target::Task),
        )
        .with_conditions(task_conditions(&[USER_TASK], &[PENDING, IN_PROCESS])),
        Template::action(
            "claim",
            ActionSpec::new("Claim")
                .style(ButtonStyle::Primary)
                .icon("ant-design:hand-outlined")
                .target(Target::Task),
        )
        .with_conditions(task_conditions(&[USER_TASK], &[PENDING])),
        Template::action(
            "unclaim",
            ActionSpec::new("Release")
                .icon("ant-design:unlock-outlined")
                .target(Target::Task),
        )
        .with_conditions(task_conditions(&[USER_TASK], &[CLAIMED])),
        Template::action(
            "suspend",
            ActionSpec::new("Suspend")
                .icon("ant-design:pause-circle-outlined")
                .auth(["admin", "process:suspend"])
                .confirm(confirm("Suspend this process?", "Suspend"))
                .target(Target::ProcessInstance),
        )
        .with_conditions(Conditions::any().status([IN_PROCESS])),
        Template::action(
            "resume",
            ActionSpec::new("Resume")
                .style(ButtonStyle::Primary)
                .icon("ant-design:play-circle-outlined")
                .auth(["admin", "process:resume"])
                .target(Target::ProcessInstance),
        )
        .with_conditions(Conditions::any().status([SUSPENDED])),
        Template::action(
            "terminate",
            ActionSpec::new("Terminate")
                .icon("ant-design:stop-outlined")
                .auth(["admin", "process:terminate"])
                .require_comment()
                .confirm(confirm("Terminate this process? This cannot be undone.", "Terminate"))
                .class_name("btn-danger")
                .target(Target::ProcessInstance),
        )
        .with_conditions(Conditions::any().status([IN_PROCESS, SUSPENDED])),
        Template::action(
            "view_history",
            ActionSpec::new("History")
                .style(ButtonStyle::Link)
                .icon("ant-design:history-outlined")
                .target(Target::ProcessInstance),
        )
        .with_conditions(Conditions::any().status([IN_PROCESS, COMPLETED, TERMINATED])),
        Template::action(
            "view_diagram",
            ActionSpec::new("Diagram")
                .style(ButtonStyle::Link)
                .icon("ant-design:node-index-outlined")
                .target(Target::ProcessInstance),
        )
        .with_conditions(Conditions::any().status([IN_PROCESS, COMPLETED, TERMINATED])),
        Template::action(
            "print",
            ActionSpec::new("Print").icon("ant-design:printer-outlined"),
        )
        .with_conditions(Conditions::any().status([IN_PROCESS, COMPLETED])),
    ]
}

/// Templates of the mobile client, in declaration order.
pub fn mobile_templates() -> Vec<Template> {
    vec![
        Template::action(
            "approve",
            ActionSpec::new("Approve")
                .style(ButtonStyle::Primary)
                .require_comment()
                .target(Target::Task),
        )
        .with_conditions(task_conditions(&[USER_TASK, APPROVAL_TASK], &[PENDING, IN_PROCESS])),
        Template::action(
            "reject",
            ActionSpec::new("Reject")
                .style(ButtonStyle::Danger)
                .require_comment()
                .confirm(Confirm::new("Reject this task?"))
                .target(Target::Task),
        )
        .with_conditions(task_conditions(&[USER_TASK, APPROVAL_TASK], &[PENDING, IN_PROCESS])),
        Template::action(
            "return",
            ActionSpec::new("Return")
                .style(ButtonStyle::Warning)
                .require_comment()
                .confirm(Confirm::new("Return to the previous step?"))
                .target(Target::Task),
        )
        .with_conditions(task_conditions(&[USER_TASK], &[PENDING, IN_PROCESS])),
        Template::action(
            "claim",
            ActionSpec::new("Claim")
                .style(ButtonStyle::Success)
                .target(Target::Task),
        )
        .with_conditions(task_conditions(&[USER_TASK], &[PENDING])),
        Template::action("unclaim", ActionSpec::new("Release").target(Target::Task))
            .with_conditions(task_conditions(&[USER_TASK], &[CLAIMED])),
        Template::action("transfer", ActionSpec::new("Transfer").target(Target::Task))
            .with_conditions(task_conditions(&[USER_TASK], &[PENDING, IN_PROCESS])),
        Template::action(
            "suspend",
            ActionSpec::new("Suspend")
                .style(ButtonStyle::Warning)
                .confirm(Confirm::new("Suspend this process?"))
                .target(Target::ProcessInstance),
        )
        .with_conditions(Conditions::any().status([IN_PROCESS])),
        Template::action(
            "resume",
            ActionSpec::new("Resume")
                .style(ButtonStyle::Success)
                .target(Target::ProcessInstance),
        )
        .with_conditions(Conditions::any().status([SUSPENDED])),
    ]
}

/// The built-in desktop table.
pub fn desktop_table() -> Result<RuleTable, ConfigurationError> {
    RuleTable::new(BUILTIN_VERSION, desktop_templates())
}

/// The built-in mobile table.
pub fn mobile_table() -> Result<RuleTable, ConfigurationError> {
    RuleTable::new(BUILTIN_VERSION, mobile_templates())
}
