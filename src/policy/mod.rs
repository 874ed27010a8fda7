pub mod hot_reload;
pub mod loader;

pub use hot_reload::{TableWatcher, TABLE_DERIVED};
pub use loader::{load_table, parse_table, TableError, TableLoader, TableSource};
