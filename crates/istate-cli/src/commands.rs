use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use istate_provider::{
    CloudMetadata, ConflictResolver, FixedResolver, HandshakeResult, HttpDocumentFetcher,
    InMemoryHost, InteractiveApiProvider, LaunchLogger, LaunchParams, MemoryLaunchLog,
    ProviderBackends, ProviderConfig, StaticHostChannel,
};
use istate_store::{AttachmentStore, StateStoreAdapter, StorageStrategy};
use istate_types::{serialized_size, Capability, ModuleState};
use serde_json::json;

use crate::cli::*;
use crate::prompt::{self, StdinResolver};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Capabilities => cmd_capabilities(cli.format),
        Command::Load(args) => cmd_load(args, cli.format).await,
        Command::Plan(args) => cmd_plan(args, cli.format),
        Command::Rewrite(args) => cmd_rewrite(args, cli.format),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ProviderConfig> {
    match path {
        Some(path) => ProviderConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(ProviderConfig::default()),
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_capabilities(format: OutputFormat) -> anyhow::Result<()> {
    let caps = InteractiveApiProvider::capabilities();
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(caps)?),
        OutputFormat::Text => {
            println!("Provider {}", InteractiveApiProvider::NAME.bold());
            for capability in Capability::ALL {
                let mark = if caps.supports(capability) {
                    "✓".green()
                } else {
                    "✗".red()
                };
                println!("  {} {}", mark, capability.as_str());
            }
            Ok(())
        }
    }
}

async fn cmd_load(args: LoadArgs, format: OutputFormat) -> anyhow::Result<()> {
    let handshake: HandshakeResult = read_json(&args.handshake)?;
    let mut config = load_config(args.config.as_deref())?;
    if let Some(query) = &args.query {
        LaunchParams::from_query(query).apply(&mut config);
    }

    let host = Arc::new(match &handshake.instance_id {
        Some(id) => InMemoryHost::with_owner(id.clone()),
        None => InMemoryHost::new(),
    });
    if let Some(state) = &handshake.current_state {
        host.seed_state(state.clone(), handshake.updated_at);
    }
    let resolver: Arc<dyn ConflictResolver> = match args.choose {
        Some(choice) => Arc::new(FixedResolver::new(prompt::fixed(choice))),
        None => Arc::new(StdinResolver),
    };
    let log = Arc::new(MemoryLaunchLog::new());
    let logger: Arc<dyn LaunchLogger> = log.clone();

    let provider = InteractiveApiProvider::new(
        config,
        ProviderBackends::shared_host(
            host.clone(),
            Arc::new(StaticHostChannel::new(handshake)),
            resolver,
            Arc::new(HttpDocumentFetcher::new()),
        ),
    )
    .with_launch_logger(logger);

    let params = provider.initialize().await?;
    let opened = provider.open_saved(params).await?;
    let loaded = provider.load(CloudMetadata::default()).await?;
    let launches = log.records();

    match format {
        OutputFormat::Json => print_json(&json!({
            "opened": opened.content.to_envelope(),
            "metadata": opened.metadata,
            "stored": host.committed_state(),
            "loaded": loaded.content.to_envelope(),
            "launchLog": launches,
        })),
        OutputFormat::Text => {
            println!("{} Opened module state", "✓".green().bold());
            println!("{}", serde_json::to_string_pretty(opened.content.content())?);
            match host.committed_state() {
                Some(stored) => {
                    let label = if istate_types::StateReference::is_reference(&stored) {
                        "attachment".yellow()
                    } else {
                        "inline".green()
                    };
                    println!("  Stored: {}", label);
                }
                None => println!("  Stored: {}", "nothing".dimmed()),
            }
            println!("  Attachments: {}", host.attachment_count());
            for launch in launches {
                println!("  Launch: {} {}", launch.operation, launch.run_remote_endpoint.blue());
            }
            Ok(())
        }
    }
}

fn cmd_plan(args: PlanArgs, format: OutputFormat) -> anyhow::Result<()> {
    let state: ModuleState = read_json(&args.state)?;
    let config = load_config(args.config.as_deref())?;
    let threshold = config.storage.attachment_threshold;

    let host = Arc::new(InMemoryHost::new());
    let store = StateStoreAdapter::new(host.clone(), AttachmentStore::new(host), config.storage);
    let size = serialized_size(&state)?;
    let strategy = store.strategy_for(&state)?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "size": size,
            "threshold": threshold,
            "strategy": strategy.to_string(),
        })),
        OutputFormat::Text => {
            let label = match strategy {
                StorageStrategy::Inline => "inline".green(),
                StorageStrategy::Attachment => "attachment".yellow(),
            };
            println!("Serialized size: {} bytes (threshold {})", size.to_string().bold(), threshold);
            println!("Strategy: {}", label);
            Ok(())
        }
    }
}

fn cmd_rewrite(args: RewriteArgs, format: OutputFormat) -> anyhow::Result<()> {
    let state: ModuleState = read_json(&args.state)?;
    let count = istate_rewrite::count_rewritable(&state);
    let rewritten = istate_rewrite::rewrite(&state, Some(&args.domain));

    match format {
        OutputFormat::Json => print_json(&rewritten),
        OutputFormat::Text => {
            println!(
                "{} {} URL(s) pointed at {}",
                "✓".green().bold(),
                count,
                args.domain.cyan()
            );
            println!("{}", serde_json::to_string_pretty(&rewritten)?);
            Ok(())
        }
    }
}
