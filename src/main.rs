mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use rc_av::ToolRegistry;
use rc_core::config::Config;
use rc_server::storage::FsArtifactStore;
use rc_server::sweeper::Sweeper;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path);

    // CLI flags win over the config file.
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting reelcast");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    rc_server::start(config).await?;
    Ok(())
}

async fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools).check_all().await;
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg is missing. Direct streaming works; HLS transcoding will fail.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let config = Config::load(p)
                .with_context(|| format!("failed to load config {}", p.display()))?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Roots: {}", config.roots.len());
    for root in &config.roots {
        println!("    {} -> {}", root.name, root.path.display());
    }
    println!("  Video extensions: {}", config.library.video_extensions.join(", "));
    println!("  Stream temp root: {}", config.streaming.temp_root.display());
    println!(
        "  Retention: {} (every {}s, max age {}s)",
        if config.retention.enabled { "enabled" } else { "disabled" },
        config.retention.sweep_interval_secs,
        config.retention.max_age_secs
    );

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  ! {warning}");
        }
    }

    Ok(())
}

async fn sweep_once(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let sweeper = Sweeper::from_config(&config, Arc::new(FsArtifactStore));

    let report = sweeper.sweep().await;
    println!(
        "Scanned {} entries, removed {}, failed {}",
        report.scanned, report.removed, report.failed
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            // Verbose mode also shows transcoder stderr.
            "reelcast=trace,rc_server=trace,rc_av=trace,rc_core=debug,tower_http=debug".to_string()
        } else {
            "reelcast=debug,rc_server=debug,rc_av=debug,rc_core=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Start { host, port } => {
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::CheckTools => rt.block_on(check_tools(cli.config.as_deref())),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Sweep => rt.block_on(sweep_once(cli.config.as_deref())),
        Commands::Version => {
            println!("reelcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
