use crate::{
    chunk::{build_chunks, ByteSource, Chunk, LocalFile},
    error::UploadError,
    models::{FileStatus, ResumableQuery},
    signal::{SignalDispatcher, UploadEvent},
};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};
use tracing::debug;
use uuid::Uuid;

pub struct UploadFile {
    identifier: Uuid,
    path: PathBuf,
    name: String,
    mime_type: &'static str,
    size: u64,
    chunk_size: u64,
    chunks: Vec<Chunk>,
    done: Mutex<Vec<bool>>,
    signalled: AtomicUsize,
    completion_sent: AtomicBool,
    released: AtomicBool,
    source: Arc<dyn ByteSource>,
    signals: SignalDispatcher,
}

impl UploadFile {
    pub fn open(path: impl AsRef<Path>, chunk_size: u64) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let source = LocalFile::open(path)?;
        Ok(Self::from_source(path, Arc::new(source), chunk_size))
    }

    /// `path` is what the server sees as `resumableRelativePath`.
    pub fn from_source(
        path: impl Into<PathBuf>,
        source: Arc<dyn ByteSource>,
        chunk_size: u64,
    ) -> Self {
        let path = path.into();
        let size = source.len();
        let chunks = build_chunks(source.clone(), size, chunk_size);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            identifier: Uuid::new_v4(),
            mime_type: detect_content_type(&path).unwrap_or(""),
            name,
            path,
            size,
            chunk_size,
            done: Mutex::new(vec![false; chunks.len()]),
            chunks,
            signalled: AtomicUsize::new(0),
            completion_sent: AtomicBool::new(false),
            released: AtomicBool::new(false),
            source,
            signals: SignalDispatcher::new(),
        }
    }

    pub fn identifier(&self) -> Uuid {
        self.identifier
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn signals(&self) -> &SignalDispatcher {
        &self.signals
    }

    pub fn query(&self, chunk: &Chunk) -> ResumableQuery {
        ResumableQuery {
            chunk_size: self.chunk_size,
            total_size: self.size,
            mime_type: self.mime_type.to_string(),
            identifier: self.identifier,
            filename: self.name.clone(),
            relative_path: self.path.to_string_lossy().into_owned(),
            total_chunks: self.chunks.len(),
            chunk_number: chunk.index() + 1,
            current_chunk_size: chunk.size(),
        }
    }

    pub fn completed_chunks(&self) -> usize {
        self.done
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| **d)
            .count()
    }

    pub fn is_completed(&self) -> bool {
        self.done
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .all(|d| *d)
    }

    pub fn fraction_completed(&self) -> f64 {
        if self.chunks.is_empty() {
            return 1.0;
        }
        self.completed_chunks() as f64 / self.chunks.len() as f64
    }

    /// Returns `false` if the chunk was already recorded.
    pub fn mark_chunk_completed(&self, index: usize) -> bool {
        {
            let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
            match done.get_mut(index) {
                Some(flag) if !*flag => *flag = true,
                _ => return false,
            }
        }

        self.signals.emit(&UploadEvent::ChunkCompleted {
            file: self.identifier,
            index,
        });

        let signalled = self.signalled.fetch_add(1, Ordering::AcqRel) + 1;
        if signalled == self.chunks.len() {
            self.complete();
        }
        true
    }

    pub(crate) fn complete_if_empty(&self) {
        if self.chunks.is_empty() {
            self.complete();
        }
    }

    fn complete(&self) {
        if self.completion_sent.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(file = %self.identifier, path = %self.path.display(), "file completed");
        self.signals.emit(&UploadEvent::FileCompleted {
            file: self.identifier,
        });
        self.close();
    }

    pub fn close(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.source.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn status(&self) -> FileStatus {
        FileStatus {
            identifier: self.identifier,
            path: self.path.clone(),
            size: self.size,
            total_chunks: self.chunks.len(),
            completed_chunks: self.completed_chunks(),
            fraction_completed: self.fraction_completed(),
            completed: self.is_completed(),
        }
    }
}

pub fn detect_content_type(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("txt" | "text" | "log") => Some("text/plain"),
        Some("csv") => Some("text/csv"),
        Some("htm" | "html") => Some("text/html"),
        Some("css") => Some("text/css"),
        Some("js" | "mjs") => Some("text/javascript"),
        Some("json") => Some("application/json"),
        Some("xml") => Some("application/xml"),
        Some("pdf") => Some("application/pdf"),
        Some("zip") => Some("application/zip"),
        Some("gz" | "tgz") => Some("application/gzip"),
        Some("tar") => Some("application/x-tar"),
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("gif") => Some("image/gif"),
        Some("webp") => Some("image/webp"),
        Some("svg") => Some("image/svg+xml"),
        Some("ico") => Some("image/x-icon"),
        Some("mp3") => Some("audio/mpeg"),
        Some("wav") => Some("audio/wav"),
        Some("mp4") => Some("video/mp4"),
        Some("webm") => Some("video/webm"),
        _ => None,
    }
}
