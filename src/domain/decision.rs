use serde::{Deserialize, Serialize};

use super::template::{ButtonStyle, Confirm, Target};

/// A resolved target entity, e.g. the task an action applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub kind: Target,
    pub id: String,
}

/// An action the user may take in the current context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub code: String,
    pub priority: u32,
    pub label: String,
    pub style: ButtonStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auth: Vec<String>,
    pub require_comment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<Confirm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Entity the action applies to, filled in from the context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ResolvedTarget>,
    pub enabled: bool,
    pub visible: bool,
}

/// Effective access of a single form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAccess {
    pub editable: bool,
    pub visible: bool,
    pub required: bool,
}

impl Default for FieldAccess {
    fn default() -> Self {
        FieldAccess {
            editable: true,
            visible: true,
            required: false,
        }
    }
}

/// Field permissions that apply in the current context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPermissionItem {
    pub code: String,
    pub priority: u32,
    #[serde(default)]
    pub editable: Vec<String>,
    #[serde(default)]
    pub readonly: Vec<String>,
    #[serde(default)]
    pub hidden: Vec<String>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl FieldPermissionItem {
    /// Apply these permissions to a field whose current access is `base`.
    ///
    /// Editable wins over readonly; fields listed in neither keep their
    /// editability. Visibility is reset from the hidden list. Required is
    /// only ever switched on.
    pub fn apply(&self, field: &str, base: FieldAccess) -> FieldAccess {
        let listed = |list: &[String]| list.iter().any(|f| f == field);

        let editable = if listed(&self.editable) {
            true
        } else if listed(&self.readonly) {
            false
        } else {
            base.editable
        };

        FieldAccess {
            editable,
            visible: !listed(&self.hidden),
            required: base.required || listed(&self.required),
        }
    }

    /// Effective access of a field under these permissions alone.
    pub fn access(&self, field: &str) -> FieldAccess {
        self.apply(field, FieldAccess::default())
    }

    /// Combine several items into one, keeping the first item's code and the
    /// lowest priority. Field lists are unioned in order without duplicates.
    pub fn merge<'a>(items: impl IntoIterator<Item = &'a FieldPermissionItem>) -> Option<FieldPermissionItem> {
        fn extend_unique(into: &mut Vec<String>, from: &[String]) {
            for field in from {
                if !into.contains(field) {
                    into.push(field.clone());
                }
            }
        }

        let mut items = items.into_iter();
        let mut merged = items.next()?.clone();

        for item in items {
            merged.priority = merged.priority.min(item.priority);
            extend_unique(&mut merged.editable, &item.editable);
            extend_unique(&mut merged.readonly, &item.readonly);
            extend_unique(&mut merged.hidden, &item.hidden);
            extend_unique(&mut merged.required, &item.required);
        }

        Some(merged)
    }
}

/// A single element of a [`Decision`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionItem {
    Action(ActionItem),
    FieldPermission(FieldPermissionItem),
}

impl DecisionItem {
    /// Template code the item was built from.
    pub fn code(&self) -> &str {
        match self {
            DecisionItem::Action(a) => &a.code,
            DecisionItem::FieldPermission(p) => &p.code,
        }
    }

    /// Effective priority the item was sorted by.
    pub fn priority(&self) -> u32 {
        match self {
            DecisionItem::Action(a) => a.priority,
            DecisionItem::FieldPermission(p) => p.priority,
        }
    }

    pub fn as_action(&self) -> Option<&ActionItem> {
        match self {
            DecisionItem::Action(a) => Some(a),
            DecisionItem::FieldPermission(_) => None,
        }
    }

    pub fn as_field_permission(&self) -> Option<&FieldPermissionItem> {
        match self {
            DecisionItem::FieldPermission(p) => Some(p),
            DecisionItem::Action(_) => None,
        }
    }
}

/// Ordered result of evaluating a rule table against a context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub items: Vec<DecisionItem>,
}

impl Decision {
    pub fn new(items: Vec<DecisionItem>) -> Self {
        Decision { items }
    }

    /// Empty decision (nothing permitted).
    pub fn empty() -> Self {
        Decision::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item codes in decision order.
    pub fn codes(&self) -> Vec<&str> {
        self.items.iter().map(DecisionItem::code).collect()
    }

    /// Find an item by code.
    pub fn get(&self, code: &str) -> Option<&DecisionItem> {
        self.items.iter().find(|i| i.code() == code)
    }

    /// Action items in decision order.
    pub fn actions(&self) -> impl Iterator<Item = &ActionItem> {
        self.items.iter().filter_map(DecisionItem::as_action)
    }

    /// Field-permission items in decision order.
    pub fn field_permissions(&self) -> impl Iterator<Item = &FieldPermissionItem> {
        self.items.iter().filter_map(DecisionItem::as_field_permission)
    }

    /// Effective access of a field after applying every permission item in order.
    pub fn field_access(&self, field: &str) -> FieldAccess {
        self.field_permissions()
            .fold(FieldAccess::default(), |acc, p| p.apply(field, acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissions(editable: &[&str], readonly: &[&str], hidden: &[&str], required: &[&str]) -> FieldPermissionItem {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        FieldPermissionItem {
            code: "p".to_string(),
            priority: 1,
            editable: owned(editable),
            readonly: owned(readonly),
            hidden: owned(hidden),
            required: owned(required),
        }
    }

    #[test]
    fn test_editable_wins_over_readonly() {
        let p = permissions(&["amount"], &["amount", "note"], &[], &[]);

        assert!(p.access("amount").editable);
        assert!(!p.access("note").editable);
        assert!(p.access("other").editable);
    }

    #[test]
    fn test_hidden_and_required() {
        let p = permissions(&[], &[], &["secret"], &["amount"]);

        assert!(!p.access("secret").visible);
        assert!(p.access("amount").visible);
        assert!(p.access("amount").required);
        assert!(!p.access("secret").required);
    }

    #[test]
    fn test_field_access_folds_in_order() {
        let first = permissions(&[], &["amount"], &[], &["amount"]);
        let second = permissions(&[], &[], &["amount"], &[]);
        let decision = Decision::new(vec![
            DecisionItem::FieldPermission(first),
            DecisionItem::FieldPermission(second),
        ]);

        let access = decision.field_access("amount");
        assert!(!access.editable);
        assert!(!access.visible);
        assert!(access.required);
    }

    #[test]
    fn test_merge_unions_lists() {
        let mut first = permissions(&["amount"], &[], &["salary"], &[]);
        first.priority = 4;
        let second = permissions(&["note"], &["amount"], &["salary"], &["note"]);

        let merged = FieldPermissionItem::merge([&first, &second]).unwrap();

        assert_eq!(merged.priority, 1);
        assert_eq!(merged.editable, vec!["amount", "note"]);
        assert_eq!(merged.hidden, vec!["salary"]);
        assert!(merged.access("amount").editable);
        assert!(merged.access("note").required);
        assert!(FieldPermissionItem::merge([]).is_none());
    }

    #[test]
    fn test_decision_item_serialization() {
        let item = DecisionItem::FieldPermission(permissions(&["a"], &[], &[], &[]));
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["kind"], "field_permission");
        assert_eq!(json["code"], "p");

        let back: DecisionItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}
