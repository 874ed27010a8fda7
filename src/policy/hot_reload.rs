use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::domain::Namespace;
use crate::engine::PolicyEngine;
use crate::rules::RuleTable;

use super::loader::{TableError, TableLoader};

/// Namespaces whose cached values are derived from the rule table.
pub const TABLE_DERIVED: [Namespace; 2] = [Namespace::WorkflowButtons, Namespace::PermissionConfig];

/// Watch the rule table for version changes and broadcast updates.
///
/// When an engine is attached, every decision derived from the previous
/// table is dropped before the new table is published.
pub struct TableWatcher {
    loader: TableLoader,
    check_interval: Duration,
    last_version: Option<String>,
    engine: Option<Arc<PolicyEngine>>,
}

impl TableWatcher {
    pub fn new(loader: TableLoader, check_interval: Duration) -> Self {
        TableWatcher {
            loader,
            check_interval,
            last_version: None,
            engine: None,
        }
    }

    /// Invalidate this engine's table-derived namespaces on every reload.
    pub fn with_engine(mut self, engine: Arc<PolicyEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Load the table now and start polling for changes.
    ///
    /// Returns a receiver holding the current table. If the initial load
    /// fails an empty table is published and polling continues.
    pub fn start(mut self) -> (watch::Receiver<Arc<RuleTable>>, tokio::task::JoinHandle<()>) {
        let initial = match self.loader.load() {
            Ok(table) => {
                info!(version = table.version(), templates = table.len(), "Loaded initial rule table");
                self.last_version = Some(table.version().to_string());
                Arc::new(table)
            }
            Err(e) => {
                error!(error = %e, "Failed to load initial rule table");
                Arc::new(RuleTable::empty())
            }
        };

        let (tx, rx) = watch::channel(initial);
        let period = self.check_interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);

            loop {
                ticker.tick().await;

                match self.check_for_updates(&tx) {
                    Ok(true) => info!("Rule table reloaded"),
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "Error checking for rule table updates"),
                }

                if tx.is_closed() {
                    break;
                }
            }
        });

        (rx, handle)
    }

    /// Reload the table and broadcast it if its version changed.
    fn check_for_updates(&mut self, tx: &watch::Sender<Arc<RuleTable>>) -> Result<bool, TableError> {
        let table = self.loader.load()?;

        if self.last_version.as_deref() == Some(table.version()) {
            return Ok(false);
        }

        info!(
            previous = ?self.last_version,
            current = table.version(),
            "Rule table version changed"
        );

        if let Some(engine) = &self.engine {
            for namespace in TABLE_DERIVED {
                engine.invalidate_namespace(namespace);
            }
        }

        self.last_version = Some(table.version().to_string());
        let _ = tx.send(Arc::new(table));

        Ok(true)
    }
}
