pub mod defaults;
pub mod priority;
pub mod resolver;
pub mod table;

pub use defaults::{desktop_table, mobile_table};
pub use priority::{PriorityTable, UNRANKED};
pub use resolver::PolicyResolver;
pub use table::{ConfigurationError, RuleTable};
