use crate::config::{UploadConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CHUNK_RETRIES};
use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, time::Duration};

#[derive(Parser, Debug)]
#[command(author, version, about = "Resumable chunked uploads over HTTP")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload one or more files and print a JSON report
    Upload(UploadArgs),
    /// Print how a file would be split into chunks
    Chunks {
        file: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
    },
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Endpoint accepting resumable.js GET probes and POST uploads
    pub target: String,
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: u64,
    #[arg(long, default_value_t = 3)]
    pub simultaneous: usize,
    #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_RETRIES)]
    pub max_retries: u32,
    /// Status treated as permanent; repeat to replace the default set
    #[arg(long = "permanent-error", value_name = "CODE")]
    pub permanent_errors: Vec<u16>,
    /// Extra request header as NAME:VALUE
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
    /// Upload every chunk without probing the server first
    #[arg(long)]
    pub no_test_chunks: bool,
    #[arg(long, value_name = "MS")]
    pub retry_interval_ms: Option<u64>,
}

impl UploadArgs {
    pub fn to_config(&self) -> UploadConfig {
        let mut config = UploadConfig::new(self.target.clone())
            .with_chunk_size(self.chunk_size)
            .with_simultaneous_uploads(self.simultaneous)
            .with_max_chunk_retries(self.max_retries)
            .with_test_chunks(!self.no_test_chunks);
        if !self.permanent_errors.is_empty() {
            config = config.with_permanent_errors(self.permanent_errors.iter().copied());
        }
        for (name, value) in &self.headers {
            config = config.with_header(name.clone(), value.clone());
        }
        if let Some(ms) = self.retry_interval_ms {
            config = config.with_chunk_retry_interval(Duration::from_millis(ms));
        }
        config
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got {raw:?}"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
