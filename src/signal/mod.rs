use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    FileAdded,
    ChunkCompleted,
    ChunkRetry,
    ChunkFailed,
    FileCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    FileAdded {
        file: Uuid,
    },
    ChunkCompleted {
        file: Uuid,
        index: usize,
    },
    ChunkRetry {
        file: Uuid,
        index: usize,
        retry: u32,
        /// `None` when the transport itself failed.
        status: Option<u16>,
    },
    ChunkFailed {
        file: Uuid,
        index: usize,
    },
    FileCompleted {
        file: Uuid,
    },
}

impl UploadEvent {
    pub fn kind(&self) -> SignalKind {
        match self {
            UploadEvent::FileAdded { .. } => SignalKind::FileAdded,
            UploadEvent::ChunkCompleted { .. } => SignalKind::ChunkCompleted,
            UploadEvent::ChunkRetry { .. } => SignalKind::ChunkRetry,
            UploadEvent::ChunkFailed { .. } => SignalKind::ChunkFailed,
            UploadEvent::FileCompleted { .. } => SignalKind::FileCompleted,
        }
    }

    pub fn file(&self) -> Uuid {
        match self {
            UploadEvent::FileAdded { file }
            | UploadEvent::ChunkCompleted { file, .. }
            | UploadEvent::ChunkRetry { file, .. }
            | UploadEvent::ChunkFailed { file, .. }
            | UploadEvent::FileCompleted { file } => *file,
        }
    }
}

pub type Callback = Arc<dyn Fn(&UploadEvent) + Send + Sync>;

#[derive(Default)]
struct DispatcherInner {
    callbacks: RwLock<HashMap<SignalKind, Vec<Callback>>>,
    proxies: RwLock<Vec<SignalDispatcher>>,
}

#[derive(Clone, Default)]
pub struct SignalDispatcher {
    inner: Arc<DispatcherInner>,
}

impl SignalDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_callback<F>(&self, kind: SignalKind, callback: F)
    where
        F: Fn(&UploadEvent) + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(Arc::new(callback));
    }

    pub fn proxy_to(&self, target: &SignalDispatcher) {
        self.inner
            .proxies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.clone());
    }

    /// Runs local callbacks, then forwards to proxy targets.
    pub fn emit(&self, event: &UploadEvent) {
        // Snapshot so no lock is held while user code runs.
        let callbacks: Vec<Callback> = self
            .inner
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();
        for callback in &callbacks {
            callback(event);
        }

        let proxies: Vec<SignalDispatcher> = self
            .inner
            .proxies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for target in &proxies {
            target.emit(event);
        }
    }
}
