use crate::{
    error::{ChunkFailure, UploadError},
    resolver::{ChunkJob, ChunkResolver, Resolution},
};
use futures::future::join_all;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, watch, Mutex as AsyncMutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub outstanding: usize,
    pub failed: bool,
}

struct Shared {
    queue: mpsc::UnboundedSender<ChunkJob>,
    pending: AsyncMutex<mpsc::UnboundedReceiver<ChunkJob>>,
    progress: watch::Sender<Progress>,
    failure: Mutex<Option<ChunkFailure>>,
    dropped: AtomicBool,
    cancel: CancellationToken,
    retry_interval: Option<Duration>,
}

impl Shared {
    fn finish_one(&self) {
        self.progress
            .send_modify(|p| p.outstanding = p.outstanding.saturating_sub(1));
    }

    fn drop_job(&self) {
        self.dropped.store(true, Ordering::SeqCst);
        self.finish_one();
    }

    fn record_failure(&self, failure: ChunkFailure) {
        {
            let mut slot = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(failure);
            }
        }
        self.progress.send_modify(|p| {
            p.outstanding = p.outstanding.saturating_sub(1);
            p.failed = true;
        });
        self.cancel.cancel();
    }

    fn enqueue(&self, job: ChunkJob) {
        if self.queue.send(job).is_err() {
            self.drop_job();
        }
    }

    fn requeue(self: &Arc<Self>, job: ChunkJob) {
        let Some(delay) = self.retry_interval else {
            self.enqueue(job);
            return;
        };
        let shared = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shared.cancel.cancelled() => shared.drop_job(),
                _ = tokio::time::sleep(delay) => shared.enqueue(job),
            }
        });
    }
}

pub struct UploadScheduler {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl UploadScheduler {
    pub fn new(
        workers: usize,
        resolver: Arc<ChunkResolver>,
        retry_interval: Option<Duration>,
    ) -> Self {
        let (queue, pending) = mpsc::unbounded_channel();
        let (progress, _) = watch::channel(Progress::default());
        let shared = Arc::new(Shared {
            queue,
            pending: AsyncMutex::new(pending),
            progress,
            failure: Mutex::new(None),
            dropped: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            retry_interval,
        });

        let handles: Vec<JoinHandle<()>> = (0..workers.max(1))
            .map(|worker| tokio::spawn(run_worker(worker, shared.clone(), resolver.clone())))
            .collect();

        Self {
            shared,
            workers: Mutex::new(handles),
        }
    }

    pub fn submit(&self, job: ChunkJob) -> Result<(), UploadError> {
        if self.shared.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        self.shared.progress.send_modify(|p| p.outstanding += 1);
        self.shared.enqueue(job);
        Ok(())
    }

    pub fn progress(&self) -> Progress {
        *self.shared.progress.borrow()
    }

    pub fn failure(&self) -> Option<ChunkFailure> {
        self.shared
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Stops handing out queued work. Attempts already running finish.
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
    }

    pub async fn join(&self) -> Result<(), UploadError> {
        let mut progress = self.shared.progress.subscribe();
        tokio::select! {
            biased;
            _ = progress.wait_for(|p| p.outstanding == 0 || p.failed) => {}
            _ = self.shared.cancel.cancelled() => {}
        }

        if let Some(failure) = self.failure() {
            return Err(failure.into());
        }
        // Cancelling after everything succeeded is not a failure.
        if self.progress().outstanding == 0 && !self.shared.dropped.load(Ordering::SeqCst) {
            return Ok(());
        }
        Err(UploadError::Cancelled)
    }

    pub async fn shutdown(&self) {
        self.shared.cancel.cancel();
        let handles = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for result in join_all(handles).await {
            if let Err(err) = result {
                warn!(error = %err, "upload worker ended abnormally");
            }
        }
    }
}

impl Drop for UploadScheduler {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

async fn run_worker(worker: usize, shared: Arc<Shared>, resolver: Arc<ChunkResolver>) {
    debug!(worker, "upload worker started");
    loop {
        let next = {
            let mut pending = shared.pending.lock().await;
            tokio::select! {
                biased;
                _ = shared.cancel.cancelled() => None,
                job = pending.recv() => job,
            }
        };
        let Some(mut job) = next else { break };
        if shared.cancel.is_cancelled() {
            shared.drop_job();
            break;
        }

        match resolver.resolve(&mut job).await {
            Resolution::Succeeded => shared.finish_one(),
            Resolution::Retry if shared.cancel.is_cancelled() => shared.drop_job(),
            Resolution::Retry => shared.requeue(job),
            Resolution::Released => shared.drop_job(),
            Resolution::Failed(failure) => shared.record_failure(failure),
        }
    }
    debug!(worker, "upload worker stopped");
}
