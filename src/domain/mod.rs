pub mod context;
pub mod decision;
pub mod namespace;
pub mod template;

pub use context::{status, Context, Roles};
pub use decision::{ActionItem, Decision, DecisionItem, FieldAccess, FieldPermissionItem, ResolvedTarget};
pub use namespace::{CacheKey, Namespace};
pub use template::{ActionSpec, ButtonStyle, Conditions, Confirm, FieldPermissionSpec, Payload, Target, Template, TemplateError};
