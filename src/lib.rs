pub mod cache;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod observability;
pub mod policy;
pub mod rules;

pub use cache::{with_cache, CacheStats, PolicyCache};
pub use config::{CacheConfig, Config};
pub use dispatch::{ActionHandler, DispatchError, Dispatcher};
pub use domain::{CacheKey, Context, Decision, DecisionItem, Namespace, Template};
pub use engine::PolicyEngine;
pub use rules::{ConfigurationError, PolicyResolver, RuleTable};
