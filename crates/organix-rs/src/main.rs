//! Maintenance CLI for an OrganiX installation.

mod offline;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::{debug, info};
use offline::OfflineProvider;
use organix_rs::init_logging;
use organix_rs_config::{LayeredConfigOptions, OrganixConfig};
use organix_rs_core::Coordinator;
use organix_rs_memory::{MemoryKind, MemoryStore, Metadata};
use organix_rs_tools::{ToolRegistry, register_builtin_tools};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options for the maintenance CLI.
#[derive(Parser)]
#[command(name = "organix", version)]
struct Cli {
    /// Optional organix.json5 applied over the layered config
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the memory storage directory
    #[arg(long, global = true)]
    memory_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify text and show the agent it would be routed to
    Classify {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// List the registered agent personas
    Agents,
    /// Inspect and maintain the memory store
    #[command(subcommand)]
    Memory(MemoryCommand),
    /// List or call the built-in tools
    #[command(subcommand)]
    Tools(ToolsCommand),
}

#[derive(Debug, PartialEq, Subcommand)]
enum MemoryCommand {
    /// Record counts, importance and cache counters
    Stats,
    /// Store a new memory
    Add {
        content: String,
        #[arg(long, default_value = "semantic", value_parser = parse_kind)]
        kind: MemoryKind,
        #[arg(long, default_value_t = 3)]
        importance: u8,
    },
    /// Rank memories by relevance to a query
    Recall {
        query: String,
        #[arg(long, value_parser = parse_kind)]
        kind: Option<MemoryKind>,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        min_importance: u8,
    },
    /// Remove old, unimportant memories
    Prune {
        #[arg(long)]
        max_age_days: Option<u32>,
    },
    /// Digest of recent memories
    Summary {
        #[arg(long, value_parser = parse_kind)]
        kind: Option<MemoryKind>,
        #[arg(long, default_value_t = 7)]
        days: u32,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Debug, PartialEq, Subcommand)]
enum ToolsCommand {
    /// Show the built-in tool specs
    List,
    /// Invoke a built-in tool with JSON arguments
    Call {
        name: String,
        #[arg(default_value = "{}")]
        args: String,
    },
}

fn parse_kind(raw: &str) -> Result<MemoryKind, String> {
    raw.parse::<MemoryKind>().map_err(|err| err.to_string())
}

/// Entry point for the OrganiX CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    debug!(
        "config loaded (memory_path_set={}, fallback_agent={})",
        config.memory.path.is_some(),
        config.coordinator.fallback_agent
    );

    match cli.command {
        Command::Classify { text } => classify(&config, &text.join(" ")).await,
        Command::Agents => agents(&config).await,
        Command::Memory(command) => memory(&config, command).await,
        Command::Tools(command) => tools(&config, command).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<OrganixConfig> {
    let cwd = std::env::current_dir().context("resolve working directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = &cli.config {
        options = options.with_runtime_path(path);
    }
    let layered = OrganixConfig::load_layered_with_options(options)
        .context("load organix config")?;
    info!("config layers loaded (count={})", layered.layers.len());
    let mut config = layered.config;
    if let Some(path) = &cli.memory_path {
        config.memory.path = Some(path.display().to_string());
    }
    Ok(config)
}

async fn open_store(config: &OrganixConfig) -> anyhow::Result<Arc<MemoryStore>> {
    let store = MemoryStore::open(&config.memory)
        .await
        .context("open memory store")?;
    Ok(Arc::new(store))
}

/// Coordinator without a chat provider, used for routing and listings.
async fn offline_coordinator(config: &OrganixConfig) -> anyhow::Result<Coordinator> {
    let store = Arc::new(
        MemoryStore::in_memory(&config.memory)
            .await
            .context("create scratch memory")?,
    );
    Coordinator::builder(Arc::new(OfflineProvider), store)
        .config(config.clone())
        .build()
        .context("build coordinator")
}

async fn classify(config: &OrganixConfig, text: &str) -> anyhow::Result<()> {
    let coordinator = offline_coordinator(config).await?;
    let intent = coordinator.classify(text);
    let agent_id = coordinator.select_agent(&intent);
    print_json(&json!({ "intent": intent, "agent_id": agent_id }))
}

async fn agents(config: &OrganixConfig) -> anyhow::Result<()> {
    let coordinator = offline_coordinator(config).await?;
    for (id, persona) in coordinator.list_agents() {
        println!("{id:<16} {:<28} {}", persona.name, persona.description);
    }
    Ok(())
}

async fn memory(config: &OrganixConfig, command: MemoryCommand) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    match command {
        MemoryCommand::Stats => print_json(&store.stats()),
        MemoryCommand::Add {
            content,
            kind,
            importance,
        } => {
            let mut metadata = Metadata::new();
            metadata.insert("type".to_string(), Value::from("manual_entry"));
            let id = store.add(kind, content, metadata, importance).await?;
            println!("{id}");
            Ok(())
        }
        MemoryCommand::Recall {
            query,
            kind,
            limit,
            min_importance,
        } => {
            let hits = store
                .retrieve_relevant(&query, kind, limit, min_importance)
                .await?;
            let rendered = hits
                .iter()
                .map(|hit| {
                    json!({
                        "id": hit.record.id,
                        "kind": hit.record.kind,
                        "importance": hit.record.importance,
                        "score": hit.score,
                        "content": hit.record.content,
                    })
                })
                .collect::<Vec<_>>();
            print_json(&rendered)
        }
        MemoryCommand::Prune { max_age_days } => {
            let removed = store.prune(max_age_days).await?;
            println!("removed {removed} memories");
            Ok(())
        }
        MemoryCommand::Summary { kind, days, limit } => {
            println!("{}", store.summarize(kind, days, limit, None).await?);
            Ok(())
        }
    }
}

async fn tools(config: &OrganixConfig, command: ToolsCommand) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let registry = ToolRegistry::from_config(&config.tools);
    let root = std::env::current_dir().context("resolve working directory")?;
    register_builtin_tools(&registry, store, root);
    match command {
        ToolsCommand::List => print_json(&registry.specs()),
        ToolsCommand::Call { name, args } => {
            let args: Value = serde_json::from_str(&args).context("parse tool arguments")?;
            if !args.is_object() {
                bail!("tool arguments must be a JSON object");
            }
            let output = registry.invoke(&name, args).await?;
            print_json(&output)
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
