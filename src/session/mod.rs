use crate::{
    chunk::ByteSource,
    config::UploadConfig,
    error::UploadError,
    file::UploadFile,
    models::UploadReport,
    network::{HttpClient, ReqwestClient},
    resolver::{ChunkJob, ChunkResolver},
    scheduler::{Progress, UploadScheduler},
    signal::{SignalDispatcher, SignalKind, UploadEvent},
};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use tracing::{info, warn};

/// Must be created inside a tokio runtime.
pub struct UploadSession {
    config: Arc<UploadConfig>,
    files: Mutex<Vec<Arc<UploadFile>>>,
    scheduler: UploadScheduler,
    signals: SignalDispatcher,
}

impl UploadSession {
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        config.validate()?;
        let client = ReqwestClient::new(&config)?;
        Self::with_client(config, Arc::new(client))
    }

    pub fn with_client(
        config: UploadConfig,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self, UploadError> {
        config.validate()?;
        let config = Arc::new(config);
        let resolver = Arc::new(ChunkResolver::new(client, config.clone()));
        let scheduler = UploadScheduler::new(
            config.simultaneous_uploads,
            resolver,
            config.chunk_retry_interval,
        );

        Ok(Self {
            config,
            files: Mutex::new(Vec::new()),
            scheduler,
            signals: SignalDispatcher::new(),
        })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn signals(&self) -> &SignalDispatcher {
        &self.signals
    }

    pub fn on<F>(&self, kind: SignalKind, callback: F)
    where
        F: Fn(&UploadEvent) + Send + Sync + 'static,
    {
        self.signals.register_callback(kind, callback);
    }

    pub fn add_file(&self, path: impl AsRef<Path>) -> Result<Arc<UploadFile>, UploadError> {
        let file = UploadFile::open(path, self.config.chunk_size)?;
        self.register(file)
    }

    /// Uploads `source` as if it were the file at `path`.
    pub fn add_source(
        &self,
        path: impl Into<PathBuf>,
        source: Arc<dyn ByteSource>,
    ) -> Result<Arc<UploadFile>, UploadError> {
        let file = UploadFile::from_source(path, source, self.config.chunk_size);
        self.register(file)
    }

    fn register(&self, file: UploadFile) -> Result<Arc<UploadFile>, UploadError> {
        if self.scheduler.is_cancelled() {
            file.close();
            return Err(UploadError::Cancelled);
        }

        let file = Arc::new(file);
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(file.clone());

        file.signals().proxy_to(&self.signals);
        info!(
            file = %file.identifier(),
            path = %file.path().display(),
            size = file.size(),
            chunks = file.chunks().len(),
            "file added"
        );
        file.signals().emit(&UploadEvent::FileAdded {
            file: file.identifier(),
        });

        file.complete_if_empty();
        for index in 0..file.chunks().len() {
            self.scheduler.submit(ChunkJob::new(file.clone(), index))?;
        }
        Ok(file)
    }

    pub fn files(&self) -> Vec<Arc<UploadFile>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn progress(&self) -> Progress {
        self.scheduler.progress()
    }

    pub fn report(&self) -> UploadReport {
        UploadReport {
            files: self.files().iter().map(|f| f.status()).collect(),
        }
    }

    pub async fn join(&self) -> Result<(), UploadError> {
        self.scheduler.join().await
    }

    pub fn abandon(&self) {
        self.scheduler.cancel();
        self.release_files();
    }

    pub async fn close(&self) {
        self.scheduler.shutdown().await;
        self.release_files();
    }

    /// Joins, then closes regardless of outcome.
    pub async fn finish(self) -> Result<UploadReport, UploadError> {
        let result = self.join().await;
        if let Err(err) = &result {
            warn!(error = %err, "upload session failed");
            self.scheduler.cancel();
        }
        self.close().await;
        result.map(|()| self.report())
    }

    fn release_files(&self) {
        for file in self.files() {
            file.close();
        }
    }
}
