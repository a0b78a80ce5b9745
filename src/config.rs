use crate::error::UploadError;
use std::{
    collections::{BTreeMap, HashSet},
    time::Duration,
};

pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_SIMULTANEOUS_UPLOADS: usize = 3;
pub const DEFAULT_MAX_CHUNK_RETRIES: u32 = 100;
pub const DEFAULT_PERMANENT_ERRORS: [u16; 5] = [400, 404, 415, 500, 501];

#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub target: String,
    pub chunk_size: u64,
    pub simultaneous_uploads: usize,
    pub headers: BTreeMap<String, String>,
    pub max_chunk_retries: u32,
    /// Upload statuses that fail a chunk without retrying.
    pub permanent_errors: HashSet<u16>,
    pub test_chunks: bool,
    /// Delay before a rejected chunk is queued again.
    pub chunk_retry_interval: Option<Duration>,
}

impl UploadConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            simultaneous_uploads: DEFAULT_SIMULTANEOUS_UPLOADS,
            headers: BTreeMap::new(),
            max_chunk_retries: DEFAULT_MAX_CHUNK_RETRIES,
            permanent_errors: DEFAULT_PERMANENT_ERRORS.into_iter().collect(),
            test_chunks: true,
            chunk_retry_interval: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_simultaneous_uploads(mut self, workers: usize) -> Self {
        self.simultaneous_uploads = workers;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_max_chunk_retries(mut self, retries: u32) -> Self {
        self.max_chunk_retries = retries;
        self
    }

    pub fn with_permanent_errors(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.permanent_errors = codes.into_iter().collect();
        self
    }

    pub fn with_test_chunks(mut self, enabled: bool) -> Self {
        self.test_chunks = enabled;
        self
    }

    pub fn with_chunk_retry_interval(mut self, interval: Duration) -> Self {
        self.chunk_retry_interval = Some(interval);
        self
    }

    pub fn is_permanent_error(&self, status: u16) -> bool {
        self.permanent_errors.contains(&status)
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        if self.target.trim().is_empty() {
            return Err(UploadError::InvalidConfig("target URL is empty".into()));
        }
        if self.chunk_size == 0 {
            return Err(UploadError::InvalidConfig(
                "chunk size must be positive".into(),
            ));
        }
        if self.simultaneous_uploads == 0 {
            return Err(UploadError::InvalidConfig(
                "simultaneous uploads must be positive".into(),
            ));
        }
        Ok(())
    }
}
