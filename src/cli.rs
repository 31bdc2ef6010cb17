//! Command line interface over the release query engine

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, log_path};
use crate::release::fetchers::UnityReleaseFetcher;
use crate::release::query::{DEFAULT_QUERY_LIMIT, Order, QueryRequest, ReleaseQueryEngine};
use crate::release::types::Release;

#[derive(Parser, Debug)]
#[command(name = "unity-releases")]
#[command(version, about = "Query Unity Editor releases, downloads and release notes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file, defaults to config.json in the data directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List releases, newest first
    Releases {
        /// Case-insensitive version substring, e.g. 2022.3 or 0a22
        #[arg(long)]
        version: Option<String>,

        /// Release stream such as LTS, TECH, BETA or ALPHA (repeatable)
        #[arg(long = "stream")]
        streams: Vec<String>,

        /// Download platform such as WINDOWS, MAC_OS or LINUX (repeatable)
        #[arg(long = "platform")]
        platforms: Vec<String>,

        /// Download architecture such as X86_64 or ARM64 (repeatable)
        #[arg(long = "architecture")]
        architectures: Vec<String>,

        /// RELEASE_DATE_DESC or RELEASE_DATE_ASC; anything else sorts descending
        #[arg(long, default_value = "RELEASE_DATE_DESC")]
        order: Order,

        #[arg(long, default_value_t = DEFAULT_QUERY_LIMIT)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show the latest release
    Latest {
        #[arg(long)]
        stream: Option<String>,

        /// Pick the latest alpha or beta instead of the latest final release
        #[arg(long)]
        preview: bool,

        /// Include the release notes summary
        #[arg(long)]
        notes: bool,
    },

    /// Show a single release
    Release { version: String },

    /// Fetch the release notes of a version
    Notes { version: String },
}

/// Release notes reference attached to `latest --notes`
#[derive(Debug, Serialize)]
struct NotesSummary {
    url: String,
    summary: String,
}

#[derive(Debug, Serialize)]
struct LatestRelease {
    #[serde(flatten)]
    release: Release,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<NotesSummary>,
}

/// Install the global subscriber, writing to the log file in the data directory
///
/// Falls back to stderr when the data directory cannot be created. The returned guard
/// flushes the file writer on drop.
pub fn init_logging(level: &str, json: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let path = log_path();

    let file_appender = path.parent().and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        let file_name = path.file_name()?;
        Some(tracing_appender::rolling::never(dir, file_name))
    });

    let Some(file_appender) = file_appender else {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);
        if json {
            builder.json().init();
        } else {
            builder.init();
        }
        return None;
    };

    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Some(guard)
}

/// Run a command against the engine and return its JSON output
pub async fn execute(
    engine: &ReleaseQueryEngine,
    command: Command,
) -> anyhow::Result<serde_json::Value> {
    debug!("Executing {:?}", command);

    let output = match command {
        Command::Releases {
            version,
            streams,
            platforms,
            architectures,
            order,
            limit,
            offset,
        } => {
            let request = QueryRequest {
                limit,
                offset,
                order,
                streams,
                platforms,
                architectures,
                version,
            };
            serde_json::to_value(engine.query(&request).await?)?
        }
        Command::Latest {
            stream,
            preview,
            notes,
        } => {
            let release = engine.latest(stream.as_deref(), !preview).await?;
            let notes = if notes {
                let notes = engine.release_notes(&release.version).await?;
                Some(NotesSummary {
                    url: notes.url,
                    summary: notes.summary,
                })
            } else {
                None
            };
            serde_json::to_value(LatestRelease { release, notes })?
        }
        Command::Release { version } => serde_json::to_value(engine.release(&version).await?)?,
        Command::Notes { version } => {
            serde_json::to_value(engine.release_notes(&version).await?)?
        }
    };

    Ok(output)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let _guard = init_logging(&cli.log_level, config.log.json);
    info!("Using release API at {}", config.upstream.base_url);

    let fetcher = UnityReleaseFetcher::new(
        &config.upstream.base_url,
        Duration::from_millis(config.upstream.timeout),
    )?;
    let engine = ReleaseQueryEngine::from_config(Arc::new(fetcher), &config);

    let output = execute(&engine, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
