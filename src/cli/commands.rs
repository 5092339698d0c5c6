//! Command handlers for the SQLite loader CLI
//!
//! This module implements the command handlers that coordinate between CLI
//! arguments and the loader.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::{
    pick_source, run_query, CacheManager, Encoding, LoadOptions, LoadedDatabase, Loader,
    LoaderClient, QueryOutput,
};
use crate::cli::{ClearArgs, LoadArgs, ProgressDisplay, QueryArgs, SourceArgs, StatusArgs};
use crate::config::AppConfig;
use crate::errors::{ConfigError, Result};

/// State shared by all command handlers
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: AppConfig,
    /// Fired on Ctrl-C
    pub cancel: CancellationToken,
    /// Suppress progress display
    pub quiet: bool,
}

impl CommandContext {
    pub fn new(config: AppConfig, cancel: CancellationToken, quiet: bool) -> Self {
        Self {
            config,
            cancel,
            quiet,
        }
    }
}

/// Build a loader from the runtime configuration
pub fn build_loader(config: &AppConfig) -> Result<Loader> {
    let client = LoaderClient::with_config(config.client_config())?;
    let cache = CacheManager::from_config(
        &config.cache_config(),
        client.clone(),
        config.decompressors(),
    );
    Ok(Loader::new(client, cache))
}

/// Handle the load command
pub async fn handle_load(args: LoadArgs, ctx: &CommandContext) -> Result<()> {
    let loader = build_loader(&ctx.config)?;
    let loaded = load_with_progress(&loader, &args.source, args.force, ctx).await?;

    println!("✅ Database ready");
    println!("  Version:  {}", loaded.version);
    println!("  Location: {}", loaded.location);
    println!("  Source:   {}", loaded.source);
    println!("  File:     {}", args.source.file_name(&ctx.config));

    loaded.db.close().await?;
    Ok(())
}

/// Handle the query command
pub async fn handle_query(args: QueryArgs, ctx: &CommandContext) -> Result<()> {
    let loader = build_loader(&ctx.config)?;
    let loaded = load_with_progress(&loader, &args.source, false, ctx).await?;

    info!("Running query against version {}", loaded.version);
    let output = run_query(loaded.db.as_ref(), &args.sql, args.limit).await;
    loaded.db.close().await?;
    let output = output?;

    if args.json {
        for row in &output.rows {
            println!("{}", Value::Object(row.clone()));
        }
    } else {
        print!("{}", format_table(&output));
    }

    if output.truncated {
        eprintln!(
            "Showing the first {} rows; raise --limit to see more",
            output.rows.len()
        );
    }
    Ok(())
}

/// Handle the clear command
pub async fn handle_clear(args: ClearArgs, ctx: &CommandContext) -> Result<()> {
    let loader = build_loader(&ctx.config)?;
    let file_name = args
        .file_name
        .as_deref()
        .unwrap_or(&ctx.config.loader.file_name);

    loader.clear_stored_database(file_name).await?;

    println!("🗑️  Cleared stored database {}", file_name);
    Ok(())
}

/// Handle the status command
///
/// Reports capabilities and the cache record without downloading the
/// artifact. The manifest is fetched when a URL is known.
pub async fn handle_status(args: StatusArgs, ctx: &CommandContext) -> Result<()> {
    let config = &ctx.config;
    let loader = build_loader(config)?;
    let cache = loader.cache();
    let file_name = args.source.file_name(config);

    println!("📋 SQLite Loader Status");
    println!("=======================");
    println!();
    println!("Storage:");
    match cache.storage().backend_name() {
        Some(name) => println!("  Durable:  available ({})", name),
        None => println!("  Durable:  unavailable (loads stay in memory)"),
    }
    println!("  Root:     {}", config.cache_config().resolved_root().display());

    println!();
    println!("Decompression:");
    let decompressors = cache.decompressors();
    for encoding in Encoding::all() {
        println!(
            "  {:<9} streaming: {:<3}  buffered: {}",
            encoding.as_str(),
            yes_no(decompressors.supports_streaming(encoding)),
            yes_no(decompressors.supports_buffered(encoding)),
        );
    }

    println!();
    println!("Cache record:");
    let record = cache.record().await?;
    match &record {
        Some(record) => {
            println!("  Version:  {}", record.version);
            println!("  File:     {}", record.file_name);
            println!("  Source:   {}", record.source);
            println!("  Stored:   {}", record.stored_at.to_rfc3339());
        }
        None => println!("  None"),
    }

    let Some(manifest_url) = args.source.manifest_url(config) else {
        println!();
        println!("No manifest URL configured; pass --manifest-url to check for updates.");
        return Ok(());
    };

    println!();
    println!("Manifest: {}", manifest_url);
    let manifest = loader.manifest(manifest_url).await?;
    println!("  Version:  {}", manifest.version);
    match pick_source(&manifest, args.source.prefer_brotli(config), decompressors) {
        Ok(source) => println!("  Selected: {}", source),
        Err(e) => println!("  Selected: none ({})", e),
    }

    let existing = cache.storage().open_existing(file_name).await;
    let fresh = record
        .as_ref()
        .is_some_and(|record| record.matches(&manifest.version, file_name))
        && existing.exists
        && existing.size > 0;
    if fresh {
        println!("  Cache:    up to date ({} bytes stored)", existing.size);
    } else {
        println!("  Cache:    the next load will download");
    }

    Ok(())
}

/// Load the database, rendering transfer progress unless quiet
async fn load_with_progress(
    loader: &Loader,
    source: &SourceArgs,
    force: bool,
    ctx: &CommandContext,
) -> Result<LoadedDatabase> {
    let manifest_url = source
        .manifest_url(&ctx.config)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "loader.manifest_url".to_string(),
            value: String::new(),
            reason: "Pass --manifest-url or set it in the configuration file".to_string(),
        })?;

    let display = ProgressDisplay::start(!ctx.quiet);
    let mut options = LoadOptions::default()
        .with_file_name(source.file_name(&ctx.config))
        .with_prefer_brotli(source.prefer_brotli(&ctx.config))
        .with_force(force)
        .with_cancel(ctx.cancel.clone());
    if let Some(sender) = display.sender() {
        options = options.with_progress(sender);
    }

    debug!("Loading {} from {}", options.file_name, manifest_url);
    let result = loader.load_database(manifest_url, &options).await;

    // The display only drains once every sender is gone
    drop(options);
    display.finish().await;

    if matches!(&result, Err(e) if e.is_aborted()) {
        eprintln!("🛑 Download cancelled");
    }
    result
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render query output as an aligned text table
pub fn format_table(output: &QueryOutput) -> String {
    if output.columns.is_empty() {
        return "(no columns)\n".to_string();
    }

    let cells: Vec<Vec<String>> = output
        .rows
        .iter()
        .map(|row| {
            output
                .columns
                .iter()
                .map(|column| row.get(column).map(render_value).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = output
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| -> String {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{:<width$}", value, width = *width))
            .collect();
        padded.join(" | ").trim_end().to_string()
    };

    let mut table = String::new();
    table.push_str(&line(&output.columns));
    table.push('\n');
    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    table.push_str(&separator.join("-+-"));
    table.push('\n');
    for row in &cells {
        table.push_str(&line(row));
        table.push('\n');
    }
    table.push_str(&format!(
        "({} row{})\n",
        output.rows.len(),
        if output.rows.len() == 1 { "" } else { "s" }
    ));
    table
}
