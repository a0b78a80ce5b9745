pub mod chunk;
pub mod cli;
pub mod config;
pub mod error;
pub mod file;
pub mod models;
pub mod network;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod signal;

#[cfg(test)]
mod testing;

pub use chunk::{ByteSource, Chunk, LocalFile, MemorySource};
pub use config::UploadConfig;
pub use error::{ChunkFailure, FailureReason, UploadError};
pub use file::UploadFile;
pub use models::{ChunkStatus, UploadReport};
pub use network::{HttpClient, ReqwestClient};
pub use session::UploadSession;
pub use signal::{SignalDispatcher, SignalKind, UploadEvent};
