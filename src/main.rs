use anyhow::{Context, Result};
use resumable_upload::{
    chunk::{build_chunks, ByteSource, LocalFile},
    cli,
    models::ChunkPlan,
    SignalKind, UploadEvent, UploadSession,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = cli::Cli::parse_args();

    match args.command {
        cli::Command::Upload(upload) => {
            let session = UploadSession::new(upload.to_config())?;
            session.on(SignalKind::FileCompleted, |event| {
                tracing::info!(file = %event.file(), "upload complete");
            });
            session.on(SignalKind::ChunkRetry, |event| {
                if let UploadEvent::ChunkRetry { index, retry, status, .. } = event {
                    tracing::warn!(file = %event.file(), chunk = index, retry, ?status, "retrying chunk");
                }
            });

            for path in &upload.files {
                session
                    .add_file(path)
                    .with_context(|| format!("add file: {}", path.display()))?;
            }

            let report = session.finish().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        cli::Command::Chunks { file, chunk_size } => {
            anyhow::ensure!(chunk_size > 0, "chunk size must be positive");
            let source = Arc::new(
                LocalFile::open(&file).with_context(|| format!("open: {}", file.display()))?,
            );
            let size = source.len();
            let plans: Vec<ChunkPlan> = build_chunks(source, size, chunk_size)
                .iter()
                .map(|c| c.plan())
                .collect();
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
    }

    Ok(())
}
