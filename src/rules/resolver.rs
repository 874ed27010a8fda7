use tracing::debug;

use crate::domain::{
    ActionItem, ActionSpec, Context, Decision, DecisionItem, FieldPermissionItem,
    FieldPermissionSpec, Payload, ResolvedTarget, Template,
};

use super::priority::PriorityTable;
use super::table::RuleTable;

/// Derives the ordered set of permitted items for a context.
///
/// Resolution filters templates by condition, stable-sorts the matches by
/// effective priority (declaration order breaks ties) and materializes each
/// into a decision item. Templates are never modified.
#[derive(Debug, Clone, Default)]
pub struct PolicyResolver {
    priorities: PriorityTable,
}

impl PolicyResolver {
    /// Create a resolver with the given priority fallback table.
    pub fn new(priorities: PriorityTable) -> Self {
        PolicyResolver { priorities }
    }

    /// Resolver ranking actions the way the desktop action bar does.
    pub fn desktop() -> Self {
        PolicyResolver::new(PriorityTable::desktop())
    }

    /// Resolver ranking actions the way the mobile client does.
    pub fn mobile() -> Self {
        PolicyResolver::new(PriorityTable::mobile())
    }

    pub fn priorities(&self) -> &PriorityTable {
        &self.priorities
    }

    /// Evaluate a rule table against a context.
    ///
    /// An empty decision is a valid outcome. Items whose target id is missing
    /// from the context are left out rather than reported.
    pub fn resolve(&self, ctx: &Context, table: &RuleTable) -> Decision {
        let mut matched: Vec<(u32, &Template)> = table
            .templates()
            .iter()
            .filter(|t| t.matches(ctx))
            .map(|t| (self.priorities.priority_of(t), t))
            .collect();

        // sort_by_key is stable
        matched.sort_by_key(|(priority, _)| *priority);

        let items: Vec<DecisionItem> = matched
            .into_iter()
            .filter_map(|(priority, template)| materialize(template, priority, ctx))
            .collect();

        debug!(
            status = %ctx.status,
            table_version = table.version(),
            items = items.len(),
            "Resolved decision"
        );

        Decision::new(items)
    }
}

/// Build a concrete decision item from a matched template.
fn materialize(template: &Template, priority: u32, ctx: &Context) -> Option<DecisionItem> {
    match &template.payload {
        Payload::Action(spec) => materialize_action(&template.code, spec, priority, ctx)
            .map(DecisionItem::Action),
        Payload::FieldPermission(spec) => Some(DecisionItem::FieldPermission(
            materialize_permission(&template.code, spec, priority),
        )),
    }
}

fn materialize_action(code: &str, spec: &ActionSpec, priority: u32, ctx: &Context) -> Option<ActionItem> {
    let target = match spec.target {
        Some(kind) => match kind.lookup(ctx) {
            Some(id) => Some(ResolvedTarget {
                kind,
                id: id.to_string(),
            }),
            None => {
                debug!(code, field = kind.field(), "Omitting action with unresolved target");
                return None;
            }
        },
        None => None,
    };

    Some(ActionItem {
        code: code.to_string(),
        priority,
        label: spec.label.clone(),
        style: spec.style,
        icon: spec.icon.clone(),
        auth: spec.auth.clone(),
        require_comment: spec.require_comment,
        confirm: spec.confirm.clone(),
        class_name: spec.class_name.clone(),
        target,
        enabled: true,
        visible: true,
    })
}

fn materialize_permission(code: &str, spec: &FieldPermissionSpec, priority: u32) -> FieldPermissionItem {
    FieldPermissionItem {
        code: code.to_string(),
        priority,
        editable: spec.editable.clone(),
        readonly: spec.readonly.clone(),
        hidden: spec.hidden.clone(),
        required: spec.required.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{status, Conditions, Target};
    use crate::rules::priority::UNRANKED;

    fn action(code: &str) -> Template {
        Template::action(code, ActionSpec::new(code))
    }

    #[test]
    fn test_orders_by_priority() {
        let table = RuleTable::new(
            "v1",
            vec![
                action("reject").with_priority(2),
                action("approve").with_priority(1),
                action("claim").with_priority(3),
            ],
        )
        .unwrap();

        let decision = PolicyResolver::default().resolve(&Context::new(status::PENDING), &table);

        assert_eq!(decision.codes(), vec!["approve", "reject", "claim"]);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let table = RuleTable::new(
            "v1",
            vec![
                action("b").with_priority(5),
                action("a").with_priority(5),
                action("first").with_priority(1),
                action("c").with_priority(5),
            ],
        )
        .unwrap();

        let decision = PolicyResolver::default().resolve(&Context::new(status::PENDING), &table);

        assert_eq!(decision.codes(), vec!["first", "b", "a", "c"]);
    }

    #[test]
    fn test_fallback_and_unranked() {
        let table = RuleTable::new(
            "v1",
            vec![action("custom"), action("print"), action("approve")],
        )
        .unwrap();

        let decision = PolicyResolver::desktop().resolve(&Context::new(status::PENDING), &table);

        assert_eq!(decision.codes(), vec!["approve", "print", "custom"]);
        assert_eq!(decision.items[2].priority(), UNRANKED);
    }

    #[test]
    fn test_condition_filtering() {
        let table = RuleTable::new(
            "v1",
            vec![action("claim").with_conditions(Conditions::any().status([status::PENDING]))],
        )
        .unwrap();
        let resolver = PolicyResolver::default();

        assert!(resolver.resolve(&Context::new(status::SUSPENDED), &table).is_empty());
        assert_eq!(
            resolver.resolve(&Context::new(status::PENDING), &table).codes(),
            vec!["claim"]
        );
    }

    #[test]
    fn test_target_materialized_from_context() {
        let template = Template::action("claim", ActionSpec::new("Claim").target(Target::Task));
        let table = RuleTable::new("v1", vec![template.clone()]).unwrap();
        let resolver = PolicyResolver::default();

        let decision = resolver.resolve(&Context::new(status::PENDING).with_task("T-9"), &table);
        let item = decision.actions().next().unwrap();
        assert_eq!(
            item.target,
            Some(ResolvedTarget {
                kind: Target::Task,
                id: "T-9".to_string()
            })
        );

        // the template itself is untouched
        assert_eq!(table.templates()[0], template);
    }

    #[test]
    fn test_missing_target_omits_item() {
        let table = RuleTable::new(
            "v1",
            vec![
                Template::action("claim", ActionSpec::new("Claim").target(Target::Task)),
                Template::action("suspend", ActionSpec::new("Suspend").target(Target::ProcessInstance)),
            ],
        )
        .unwrap();

        let ctx = Context::new(status::PENDING).with_process_instance("P1");
        let decision = PolicyResolver::default().resolve(&ctx, &table);

        assert_eq!(decision.codes(), vec!["suspend"]);
    }

    #[test]
    fn test_field_permission_items() {
        let spec = FieldPermissionSpec {
            editable: vec!["amount".to_string()],
            hidden: vec!["cost_center".to_string()],
            ..Default::default()
        };
        let table = RuleTable::new(
            "v1",
            vec![Template::field_permission("approver_fields", spec)
                .with_conditions(Conditions::any().node_types(["approvalTask"]))],
        )
        .unwrap();

        let ctx = Context::new(status::PENDING).with_node_type("approvalTask");
        let decision = PolicyResolver::default().resolve(&ctx, &table);

        let access = decision.field_access("cost_center");
        assert!(!access.visible);
        assert!(decision.field_access("amount").editable);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let table = RuleTable::new(
            "v1",
            vec![
                action("approve").with_conditions(
                    Conditions::any()
                        .node_types(["userTask"])
                        .status([status::PENDING]),
                ),
                action("suspend").with_conditions(Conditions::any().status([status::IN_PROCESS])),
            ],
        )
        .unwrap();
        let resolver = PolicyResolver::default();

        let pending = Context::new(status::PENDING).with_node_type("userTask");
        assert_eq!(resolver.resolve(&pending, &table).codes(), vec!["approve"]);

        let in_process = Context::new(status::IN_PROCESS);
        assert_eq!(resolver.resolve(&in_process, &table).codes(), vec!["suspend"]);

        let completed = Context::new(status::COMPLETED);
        assert!(resolver.resolve(&completed, &table).is_empty());
    }
}
