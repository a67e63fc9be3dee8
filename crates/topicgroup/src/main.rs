use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use topicgroup_config::{RuntimeConfig, StorageBackend};

/// Group partitioned records into named batch files
#[derive(Parser)]
#[command(name = "topicgroup")]
#[command(version)]
#[command(about = "Group partitioned records into named batch files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// File name template (overrides config file)
    #[arg(short, long, value_name = "TEMPLATE", global = true)]
    template: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read JSON-lines records and write grouped batches
    Group {
        /// Input file (defaults to stdin)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Output directory (filesystem backend only)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Maximum records per batch; 0 for unlimited
        #[arg(short, long, value_name = "N")]
        max_records: Option<usize>,

        /// Flush after this many buffered records; 0 flushes only at the end
        #[arg(long, value_name = "N")]
        flush_every: Option<usize>,
    },
    /// Print the batch key a head record would open now
    Render {
        #[arg(long)]
        topic: String,

        #[arg(long)]
        partition: i32,

        #[arg(long)]
        offset: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Step 1: Load base configuration
    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RuntimeConfig::load().context("Failed to load configuration")?,
    };

    // Step 2: Apply CLI overrides (highest priority), then validate the result
    apply_cli_overrides(&mut config, &cli)?;
    config.validate()?;

    // Step 3: Initialize tracing
    topicgroup::init_tracing(&config);

    match cli.command {
        Commands::Group { input, .. } => run_group(config, input),
        Commands::Render {
            topic,
            partition,
            offset,
        } => {
            println!(
                "{}",
                topicgroup::render_key(&config, &topic, partition, offset)?
            );
            Ok(())
        }
    }
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) -> Result<()> {
    if let Some(template) = &cli.template {
        config.grouper.file_name_template = template.clone();
    }

    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }

    if let Commands::Group {
        output,
        max_records,
        flush_every,
        ..
    } = &cli.command
    {
        if let Some(max_records) = max_records {
            config.grouper.max_records_per_file = *max_records;
        }
        if let Some(flush_every) = flush_every {
            config.flush.every_records = *flush_every;
        }

        // Override output directory (only valid for fs backend)
        if let Some(output) = output {
            if config.storage.backend != StorageBackend::Fs {
                anyhow::bail!(
                    "--output flag only works with filesystem backend, but backend is '{}'.",
                    config.storage.backend
                );
            }
            let fs_config = config.storage.fs.get_or_insert_with(Default::default);
            fs_config.path = output.to_string_lossy().to_string();
        }
    }

    Ok(())
}

fn run_group(config: RuntimeConfig, input: Option<PathBuf>) -> Result<()> {
    let summary = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(topicgroup::run_with_config(config, input.as_deref()))?;

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
