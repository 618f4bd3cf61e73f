//! Command-line interface for the plugdeck asset manager.

mod builtin;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use plugdeck_core::config::DEFAULT_CONFIG_FILE;
use plugdeck_core::prelude::*;
use plugdeck_core::UnitLayout;

/// Plugdeck - discover, load and enable pluggable assets.
#[derive(Parser, Debug)]
#[command(name = "plugdeck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Asset root directory (overrides the configuration).
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Asset kind (overrides the configuration).
    #[arg(short, long, global = true, value_enum)]
    kind: Option<KindArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Plugin,
    Component,
}

impl From<KindArg> for AssetKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Plugin => AssetKind::Plugin,
            KindArg::Component => AssetKind::Component,
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// List asset units found under the root directory.
    Discover,
    /// List loaded assets.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show asset counts.
    Stats {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Load an asset.
    Load { name: String },
    /// Enable a loaded asset.
    Enable { name: String },
    /// Disable an enabled asset.
    Disable { name: String },
    /// Unload an asset.
    Unload { name: String },
    /// Unload and load an asset again.
    Reload { name: String },
    /// Load every discovered asset in dependency order.
    LoadAll,
    /// Enable every loaded asset.
    EnableAll,
    /// Disable every enabled asset.
    DisableAll,
    /// Unload every asset.
    UnloadAll,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let config = resolve_config(&args)?;
    let manager = AssetManager::new(config, builtin::catalog(), Arc::new(())).await;

    // every invocation starts from the persisted state
    let restored = manager.restore().await;
    if !restored.failed.is_empty() {
        eprintln!("Warning: could not restore: {}", restored.failed.join(", "));
    }

    run(&manager, args.command).await
}

fn init_logging() {
    let json_logging = std::env::var("PLUGDECK_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("plugdeck=info").add_directive(tracing::Level::WARN.into())
    });

    // stdout carries command output
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

fn resolve_config(args: &Args) -> Result<ManagerConfig> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    if args.config.is_some() && !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }

    let mut config = ManagerConfig::load_with_kind(&path, args.kind.map(AssetKind::from))
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    if let Some(root) = &args.root {
        config = config.with_root_dir(root);
    }
    Ok(config)
}

async fn run(manager: &AssetManager, command: Command) -> Result<()> {
    match command {
        Command::Discover => discover(manager).await,
        Command::List { json } => list(manager, json).await,
        Command::Stats { json } => stats(manager, json).await,
        Command::Load { name } => {
            manager.load(&name).await?;
            println!("Loaded {}", name);
            Ok(())
        }
        Command::Enable { name } => {
            manager.enable(&name).await?;
            println!("Enabled {}", name);
            Ok(())
        }
        Command::Disable { name } => {
            manager.disable(&name).await?;
            println!("Disabled {}", name);
            Ok(())
        }
        Command::Unload { name } => {
            manager.unload(&name).await?;
            println!("Unloaded {}", name);
            Ok(())
        }
        Command::Reload { name } => {
            manager.reload(&name).await?;
            println!("Reloaded {}", name);
            Ok(())
        }
        Command::LoadAll => {
            let count = manager.load_all().await;
            println!("Loaded {} {}(s)", count, manager.kind());
            Ok(())
        }
        Command::EnableAll => {
            let count = manager.enable_all().await;
            println!("Enabled {} {}(s)", count, manager.kind());
            Ok(())
        }
        Command::DisableAll => {
            manager.disable_all().await;
            println!("Disabled all {}s", manager.kind());
            Ok(())
        }
        Command::UnloadAll => {
            manager.unload_all().await;
            println!("Unloaded all {}s", manager.kind());
            Ok(())
        }
    }
}

async fn discover(manager: &AssetManager) -> Result<()> {
    let candidates = manager.discover().await?;
    let root = &manager.config().root_dir;

    if candidates.is_empty() {
        println!("No assets found in {}", root.display());
        return Ok(());
    }

    for candidate in &candidates {
        let layout = match candidate.layout {
            UnitLayout::File => "file",
            UnitLayout::Directory => "dir",
        };
        let descriptor = candidate
            .descriptor_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<missing descriptor>".to_string());
        println!("{:<24} {:<4} {}", candidate.name, layout, descriptor);
    }
    println!("\nTotal: {} asset(s)", candidates.len());
    Ok(())
}

async fn list(manager: &AssetManager, json: bool) -> Result<()> {
    let assets = manager.list_info().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&assets)?);
        return Ok(());
    }

    if assets.is_empty() {
        println!("No {}s loaded", manager.kind());
        return Ok(());
    }

    println!("{:<24} {:<10} {:<12} LOADED AT", "NAME", "STATE", "VERSION");
    for asset in &assets {
        println!(
            "{:<24} {:<10} {:<12} {}",
            asset.name,
            asset.state.to_string(),
            asset.descriptor.version.to_string(),
            asset.loaded_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

async fn stats(manager: &AssetManager, json: bool) -> Result<()> {
    let stats = manager.get_asset_stats().await;
    if json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        println!("Total:    {}", stats.total);
        println!("Enabled:  {}", stats.enabled);
        println!("Disabled: {}", stats.disabled);
    }
    Ok(())
}
