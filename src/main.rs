//! WoT-MCP Bridge binary
//!
//! Bridges Web of Things devices into the Model Context Protocol.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use wot_mcp_bridge::{BridgeConfig, NullSurface, ThingDescription, WotMcpBridge};

/// WoT-MCP Bridge
#[derive(Parser, Debug)]
#[command(name = "wot-mcp")]
#[command(version)]
#[command(about = "Bridge Web of Things devices into MCP tools and resources")]
struct Args {
    /// Thing Description URLs to bridge at startup
    #[arg(long = "td")]
    td_urls: Vec<String>,

    /// Thing Directory URL to discover TDs from (GET returning a TD array)
    #[arg(long)]
    directory: Option<String>,

    /// Per-operation transport timeout in milliseconds
    #[arg(long, default_value = "30000")]
    timeout_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = BridgeConfig::builder().timeout_ms(args.timeout_ms).build();
    let bridge = WotMcpBridge::new(config, Arc::new(NullSurface));
    bridge.start().await?;

    let mut bridged = 0usize;

    for url in &args.td_urls {
        let thing = bridge
            .add_thing(url.as_str(), true)
            .await
            .with_context(|| format!("failed to bridge {}", url))?;
        tracing::info!(
            "Bridged '{}': {} tools, {} resources",
            thing.id,
            thing.tools().len(),
            thing.resources().len()
        );
        bridged += 1;
    }

    if let Some(directory) = &args.directory {
        for td in discover_things(directory).await? {
            let thing = bridge.add_thing(td, true).await?;
            tracing::info!(
                "Bridged '{}' from directory: {} tools, {} resources",
                thing.id,
                thing.tools().len(),
                thing.resources().len()
            );
            bridged += 1;
        }
    }

    if bridged == 0 {
        tracing::warn!("No things bridged; pass --td or --directory");
    }

    tokio::signal::ctrl_c().await?;
    bridge.stop().await?;
    Ok(())
}

/// Fetch every TD registered in a Thing Directory.
async fn discover_things(directory: &str) -> anyhow::Result<Vec<ThingDescription>> {
    let documents: Vec<serde_json::Value> = reqwest::get(directory)
        .await
        .with_context(|| format!("failed to reach Thing Directory at {}", directory))?
        .json()
        .await
        .context("Thing Directory did not return a TD array")?;

    tracing::info!("Discovered {} things from directory", documents.len());

    let mut tds = Vec::new();
    for document in documents {
        match ThingDescription::from_value(document) {
            Ok(td) => tds.push(td),
            Err(e) => tracing::warn!("Skipping unparseable directory TD: {}", e),
        }
    }
    Ok(tds)
}
