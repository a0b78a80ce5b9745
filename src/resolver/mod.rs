use crate::{
    config::UploadConfig,
    error::{ChunkFailure, FailureReason},
    file::UploadFile,
    models::ChunkStatus,
    network::HttpClient,
    signal::UploadEvent,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ChunkJob {
    file: Arc<UploadFile>,
    index: usize,
    status: ChunkStatus,
    retry_count: u32,
    tested: bool,
}

impl ChunkJob {
    pub fn new(file: Arc<UploadFile>, index: usize) -> Self {
        Self {
            file,
            index,
            status: ChunkStatus::Pending,
            retry_count: 0,
            tested: false,
        }
    }

    pub fn file(&self) -> &Arc<UploadFile> {
        &self.file
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> ChunkStatus {
        self.status
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn tested(&self) -> bool {
        self.tested
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Succeeded,
    Retry,
    /// The file was released mid-attempt, e.g. by `abandon`.
    Released,
    Failed(ChunkFailure),
}

pub struct ChunkResolver {
    client: Arc<dyn HttpClient>,
    config: Arc<UploadConfig>,
}

impl ChunkResolver {
    pub fn new(client: Arc<dyn HttpClient>, config: Arc<UploadConfig>) -> Self {
        Self { client, config }
    }

    /// Runs exactly one attempt. The caller re-submits on `Retry`.
    pub async fn resolve(&self, job: &mut ChunkJob) -> Resolution {
        job.status = ChunkStatus::InFlight;
        let file = job.file.clone();
        let Some(chunk) = file.chunk(job.index).cloned() else {
            return self.fail(job, FailureReason::Read("no such chunk".into()));
        };
        let query = file.query(&chunk);

        // At most one probe per chunk, even across retries.
        if self.config.test_chunks && !job.tested {
            job.tested = true;
            match self.client.get(&self.config.target, &query).await {
                Ok(200) => {
                    debug!(file = %file.identifier(), chunk = job.index, "chunk already on server");
                    return self.succeed(job);
                }
                Ok(status) => {
                    debug!(file = %file.identifier(), chunk = job.index, status, "chunk not on server");
                }
                Err(err) => {
                    debug!(file = %file.identifier(), chunk = job.index, error = %err, "probe failed");
                }
            }
        }

        let data = match tokio::task::spawn_blocking(move || chunk.load()).await {
            Ok(Ok(data)) => data,
            Ok(Err(err)) if file.is_closed() => {
                debug!(file = %file.identifier(), chunk = job.index, error = %err, "file released, dropping chunk");
                job.status = ChunkStatus::Pending;
                return Resolution::Released;
            }
            Ok(Err(err)) => return self.fail(job, FailureReason::Read(err.to_string())),
            Err(err) => return self.fail(job, FailureReason::Read(err.to_string())),
        };

        let (status, last) = match self.client.post(&self.config.target, &query, data).await {
            Ok(200 | 201) => return self.succeed(job),
            Ok(status) if self.config.is_permanent_error(status) => {
                return self.fail(job, FailureReason::PermanentStatus(status));
            }
            Ok(status) => (Some(status), format!("status {status}")),
            Err(err) => (None, err.to_string()),
        };

        if job.retry_count >= self.config.max_chunk_retries {
            let attempts = job.retry_count + 1;
            return self.fail(job, FailureReason::RetriesExhausted { attempts, last });
        }

        job.retry_count += 1;
        job.status = ChunkStatus::Pending;
        debug!(
            file = %file.identifier(),
            chunk = job.index,
            retry = job.retry_count,
            reason = %last,
            "chunk rejected, will retry"
        );
        file.signals().emit(&UploadEvent::ChunkRetry {
            file: file.identifier(),
            index: job.index,
            retry: job.retry_count,
            status,
        });
        Resolution::Retry
    }

    fn succeed(&self, job: &mut ChunkJob) -> Resolution {
        job.status = ChunkStatus::Succeeded;
        job.file.mark_chunk_completed(job.index);
        Resolution::Succeeded
    }

    fn fail(&self, job: &mut ChunkJob, reason: FailureReason) -> Resolution {
        job.status = ChunkStatus::Failed;
        let file = &job.file;
        warn!(
            file = %file.identifier(),
            path = %file.path().display(),
            chunk = job.index,
            reason = %reason,
            "chunk failed"
        );
        file.signals().emit(&UploadEvent::ChunkFailed {
            file: file.identifier(),
            index: job.index,
        });
        Resolution::Failed(ChunkFailure {
            file: file.identifier(),
            path: file.path().to_string_lossy().into_owned(),
            chunk_number: job.index + 1,
            reason,
        })
    }
}
