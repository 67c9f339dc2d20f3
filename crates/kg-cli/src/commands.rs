use anyhow::Context;
use colored::Colorize;
use kg_server::{logging, migrate, KgServer, NotifyConfig, ServerConfig, StorageConfig};

use crate::cli::{Cli, Command, OutputFormat, ServeArgs};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Migrate => cmd_migrate(config).await,
        Command::CheckConfig => cmd_check_config(&config, &cli.format),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

async fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.http.bind = bind;
    }
    logging::init(&config.log)?;
    tracing::info!(
        env = ?config.log.env,
        duplicate_policy = ?config.service.duplicate_policy,
        notify_failure = ?config.service.notify_failure,
        "starting kirkagram"
    );
    let server = KgServer::build(config).await?;
    server.serve().await?;
    Ok(())
}

async fn cmd_migrate(config: ServerConfig) -> anyhow::Result<()> {
    logging::init(&config.log)?;
    if migrate(&config.storage).await? {
        println!("{} Schema applied.", "✓".green().bold());
    } else {
        println!(
            "Storage backend is {}; nothing to migrate.",
            "memory".yellow()
        );
    }
    Ok(())
}

fn cmd_check_config(config: &ServerConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let config = config.redacted();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => {
            println!("{} Configuration OK", "✓".green().bold());
            println!("  Listening on: {}", config.http.bind.to_string().bold());
            println!("  Storage: {}", storage_label(&config.storage).cyan());
            println!("  Events: {}", notify_label(&config.notify).cyan());
            println!();
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}

/// One-line storage summary.
fn storage_label(storage: &StorageConfig) -> String {
    match storage {
        StorageConfig::Memory => "memory".to_string(),
        StorageConfig::Postgres {
            max_connections, ..
        } => format!("postgres (pool of {max_connections})"),
    }
}

fn notify_label(notify: &NotifyConfig) -> String {
    match notify {
        NotifyConfig::Log => "log".to_string(),
        NotifyConfig::Kafka { brokers, .. } => format!("kafka ({})", brokers.join(",")),
    }
}
