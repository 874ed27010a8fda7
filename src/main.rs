use clap::{Args, Parser};
use tracing::info;

use flowpolicy::config::{Config, Profile};
use flowpolicy::domain::{Context, Namespace};
use flowpolicy::engine::PolicyEngine;
use flowpolicy::observability::init_tracing;
use flowpolicy::policy::TableLoader;
use flowpolicy::rules::PolicyResolver;

/// Context to resolve.
#[derive(Debug, Clone, Args)]
struct ContextArgs {
    /// Task or process status, e.g. PENDING
    #[arg(long)]
    status: String,

    /// BPMN node type, e.g. userTask
    #[arg(long)]
    node_type: Option<String>,

    /// Form type of the current node
    #[arg(long)]
    form_type: Option<String>,

    /// Role of the current user (repeatable)
    #[arg(long = "role")]
    roles: Vec<String>,

    #[arg(long)]
    task_id: Option<String>,

    #[arg(long)]
    process_instance_id: Option<String>,
}

impl ContextArgs {
    fn to_context(&self) -> Context {
        let mut ctx = Context::new(&self.status);
        if let Some(node_type) = &self.node_type {
            ctx = ctx.with_node_type(node_type);
        }
        if let Some(form_type) = &self.form_type {
            ctx = ctx.with_form_type(form_type);
        }
        if !self.roles.is_empty() {
            ctx = ctx.with_roles(self.roles.iter().cloned());
        }
        if let Some(task_id) = &self.task_id {
            ctx = ctx.with_task(task_id);
        }
        if let Some(id) = &self.process_instance_id {
            ctx = ctx.with_process_instance(id);
        }
        ctx
    }

    /// Cache identifier for the context's decision.
    fn identifier(&self) -> &str {
        self.task_id
            .as_deref()
            .or(self.process_instance_id.as_deref())
            .unwrap_or("anonymous")
    }
}

#[derive(Debug, Parser)]
#[command(name = "flowpolicy", version)]
#[command(about = "Resolve permitted workflow actions for a task context")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(flatten)]
    context: ContextArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config;

    init_tracing(&config.log_level, config.log_format);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting flowpolicy");

    let loader = TableLoader::from_config(&config);
    let table = loader.load()?;
    info!(source = ?loader.source(), version = table.version(), "Rule table loaded");

    let resolver = match config.profile {
        Profile::Desktop => PolicyResolver::desktop(),
        Profile::Mobile => PolicyResolver::mobile(),
    };
    let engine = PolicyEngine::create(config.cache_config(), resolver);

    let ctx = cli.context.to_context();
    let decision = engine.resolve_cached(
        Namespace::WorkflowButtons,
        cli.context.identifier(),
        &ctx,
        &table,
        None,
        Some(table.version()),
    );

    println!("{}", serde_json::to_string_pretty(&decision)?);

    engine.destroy();
    Ok(())
}
