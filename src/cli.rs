//! Command-line surface: `gitfit compress` and `gitfit serve`

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::avatar;
use crate::blob_store::{BlobStore, Janitor, MemoryBlobStore};
use crate::compression::{self, Compressed, CompressionRequest};
use crate::config::{CompressionConfig, Config, GravatarConfig};
use crate::errors::{AppError, AppResult};
use crate::imaging::OutputFormat;
use crate::web::{AppState, WebServer};

#[derive(Debug, Parser)]
#[command(name = "gitfit")]
#[command(version)]
#[command(about = "Shrink images under a byte budget, locally or over HTTP")]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compress a single image file
    Compress(CompressArgs),
    /// Run the HTTP server
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct CompressArgs {
    /// Image to compress
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Where to write the result
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Byte budget for the output
    #[arg(short, long, value_name = "BYTES")]
    pub maxsize: Option<usize>,

    /// Output format: jpeg, png or gif (defaults to the input's extension)
    #[arg(short, long)]
    pub format: Option<String>,

    /// JPEG quality, 1-100
    #[arg(short, long)]
    pub quality: Option<u32>,

    /// Log every width probe
    #[arg(short, long)]
    pub verbose: bool,

    /// Publish the result as your Gravatar avatar
    #[arg(long)]
    pub gravatar: bool,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    pub host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// `RUST_LOG`-style filter used when the environment does not set one
    pub fn log_filter(&self) -> String {
        match &self.command {
            Command::Compress(args) if args.verbose => "gitfit=debug".to_string(),
            Command::Compress(_) => "gitfit=warn".to_string(),
            Command::Serve(args) if args.log_level == "trace" => {
                format!("gitfit={},tower_http=trace", args.log_level)
            }
            Command::Serve(args) => format!("gitfit={},tower_http=debug", args.log_level),
        }
    }
}

/// A validated `compress` invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CompressJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub request: CompressionRequest,
    pub publish_to_gravatar: bool,
}

impl CompressArgs {
    /// Validate the flags. `Ok(None)` means nothing was asked for and usage
    /// should be shown.
    pub fn into_job(self, defaults: &CompressionConfig) -> AppResult<Option<CompressJob>> {
        let (input, output) = match (self.input, self.output) {
            (None, None) => return Ok(None),
            (Some(input), Some(output)) => (input, output),
            _ => return Err(AppError::validation("you must provide both --input and --output")),
        };

        if !input.exists() {
            return Err(AppError::validation(format!(
                "input file does not exist: {}",
                input.display()
            )));
        }

        let format = match self.format.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            Some(name) => name.parse::<OutputFormat>()?,
            None => OutputFormat::from_path(&input),
        };

        let quality = match self.quality {
            Some(q) if (1..=100).contains(&q) => q as u8,
            Some(q) => {
                return Err(AppError::validation(format!(
                    "quality must be between 1 and 100, got {q}"
                )));
            }
            None => defaults.default_quality,
        };

        let max_size = self.maxsize.unwrap_or(defaults.default_max_size);
        if max_size == 0 {
            return Err(AppError::validation("maxsize must be greater than 0"));
        }

        let mut output = output;
        if output.extension().is_none() {
            output.set_extension(format.as_str());
        }

        Ok(Some(CompressJob {
            input,
            output,
            request: CompressionRequest::new(format, quality, max_size).with_min_width(defaults.min_width),
            publish_to_gravatar: self.gravatar,
        }))
    }
}

/// Run a validated job, optionally publishing the result afterwards
pub async fn run_compress(job: &CompressJob, gravatar: Option<&GravatarConfig>) -> AppResult<Compressed> {
    let compressed = {
        let job = job.clone();
        tokio::task::spawn_blocking(move || compression::compress_file(&job.input, &job.output, job.request))
            .await
            .map_err(|e| AppError::Io(std::io::Error::other(e)))??
    };

    for probe in &compressed.probes {
        debug!("probe width={} height={} size={}", probe.width, probe.height, probe.size);
    }
    info!(
        "Wrote {} ({}x{}, {} bytes, budget {})",
        job.output.display(),
        compressed.width,
        compressed.height,
        compressed.size(),
        job.request.byte_budget
    );

    if job.publish_to_gravatar {
        let gravatar = gravatar.ok_or_else(|| {
            AppError::configuration(
                "gravatar credentials missing: set GRAVATAR_CLIENT_ID and GRAVATAR_CLIENT_SECRET or add a [gravatar] section",
            )
        })?;
        avatar::publish_avatar(gravatar, &job.output).await?;
        println!("Avatar uploaded to Gravatar!");
    }

    Ok(compressed)
}

/// Entry point for `gitfit compress`; returns the process exit code
pub async fn compress_command(config_path: &str, args: CompressArgs) -> Result<u8> {
    let mut config = Config::load_or_default(config_path)?;
    config.apply_env_overrides()?;

    let Some(job) = args.into_job(&config.compression)? else {
        let mut command = Cli::command();
        if let Some(compress) = command.find_subcommand_mut("compress") {
            compress.print_help()?;
        }
        return Ok(1);
    };

    run_compress(&job, config.gravatar.as_ref()).await?;
    println!("Image compressed successfully!");
    Ok(0)
}

/// Entry point for `gitfit serve`
pub async fn serve_command(config_path: &str, args: ServeArgs) -> Result<()> {
    let mut config = Config::load_from_file(config_path)?;
    info!("Configuration loaded from: {}", config_path);

    config.apply_env_overrides()?;
    if let Some(host) = args.host {
        config.web.host = host;
    }
    if let Some(port) = args.port {
        config.web.port = port;
    }
    config.validate()?;

    let blob_store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new(config.blob_store.ttl));
    let janitor = Janitor::start(blob_store.clone(), config.blob_store.sweep_interval);

    let state = AppState::new(Arc::new(config), blob_store);
    let server = WebServer::new(state)?;
    info!("Starting web server on {}:{}", server.host(), server.port());

    let result = server.serve(CancellationToken::new()).await;

    janitor.shutdown().await;
    info!("Shutdown complete");
    result
}
