use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    ChunkFailed(#[from] ChunkFailure),

    #[error("upload session cancelled")]
    Cancelled,

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("chunk {chunk_number} of {path} ({file}) failed: {reason}")]
pub struct ChunkFailure {
    pub file: Uuid,
    pub path: String,
    /// 1-based, as sent on the wire.
    pub chunk_number: usize,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("server answered permanent error status {0}")]
    PermanentStatus(u16),

    #[error("gave up after {attempts} attempts (last: {last})")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("could not read chunk data: {0}")]
    Read(String),
}
