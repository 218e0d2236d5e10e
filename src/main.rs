//! CLI entry point for the Redis post-processor.
//!
//! Records one finished build's artifact id per invocation, and offers
//! subcommands for checking the configuration and previewing derived keys.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use redis_post_processor::policy::BuilderPolicyTable;
use redis_post_processor::publisher::plan_keys;
use redis_post_processor::{ArtifactDescriptor, PublishConfig, Publisher, RawConfig};
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "redis-post-processor")]
#[command(about = "Records build artifact ids in Redis", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// JSON file with store_address, key_prefix and explicit_value_override
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Redis address: host:port or user:password@host:port
    #[arg(long, global = true, env = "STORE_ADDRESS")]
    store_address: Option<String>,

    /// Namespace for every derived key
    #[arg(long, global = true, env = "KEY_PREFIX")]
    key_prefix: Option<String>,

    /// Store this value instead of the parsed artifact id
    #[arg(long, global = true, env = "EXPLICIT_VALUE_OVERRIDE")]
    value_override: Option<String>,
}

#[derive(Args)]
struct ArtifactArgs {
    /// Id of the builder that produced the artifact
    #[arg(short, long)]
    builder_id: String,

    /// Artifact id, e.g. "us-east-1:ami-123,us-west-1:ami-456"
    #[arg(short, long)]
    artifact_id: String,
}

impl ArtifactArgs {
    fn descriptor(&self) -> ArtifactDescriptor {
        ArtifactDescriptor::new(&self.builder_id, &self.artifact_id)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write the artifact id(s) to Redis
    Publish(ArtifactArgs),
    /// Check that the configuration is complete
    Validate,
    /// Print the keys and values a publish would write, without connecting
    /// (only key_prefix must be set)
    Keys(ArtifactArgs),
    /// List supported builder ids
    ListBuilders,
}

impl ConfigArgs {
    /// File values first, flags and environment on top.
    fn raw(&self) -> Result<RawConfig> {
        let base = match &self.config {
            Some(path) => RawConfig::load(path)?,
            None => RawConfig::default(),
        };
        Ok(base.layer(RawConfig {
            store_address: self.store_address.clone(),
            key_prefix: self.key_prefix.clone(),
            explicit_value_override: self.value_override.clone(),
        }))
    }

    fn resolve(&self) -> Result<PublishConfig> {
        Ok(PublishConfig::validate(&self.raw()?)?)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/redis_post_processor.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("redis_post_processor.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Publish(artifact) => {
            let publisher = Publisher::redis(cli.config.resolve()?);
            let outcome = publisher.publish(&artifact.descriptor())?;
            info!(
                builder_id = %outcome.artifact.builder_id,
                artifact_id = %outcome.artifact.id,
                keep = outcome.keep,
                "Artifact recorded"
            );
        }
        Commands::Validate => {
            let config = cli.config.resolve()?;
            info!(
                key_prefix = %config.key_prefix,
                has_override = config.explicit_value_override.is_some(),
                "Configuration is valid"
            );
        }
        Commands::Keys(artifact) => {
            // no connection is made, so store_address may be unset
            let policies = BuilderPolicyTable::builtin();
            let pairs = plan_keys(&policies, &cli.config.raw()?, &artifact.descriptor())?;
            println!("{}", serde_json::to_string_pretty(&pairs)?);
        }
        Commands::ListBuilders => {
            let policies = BuilderPolicyTable::builtin();
            info!(total = policies.len(), "Supported builders");
            for (builder_id, policy) in policies.iter() {
                info!(
                    builder_id,
                    label = %policy.label,
                    digest_prefixed = policy.digest_prefixed,
                    "Builder"
                );
            }
        }
    }

    Ok(())
}
