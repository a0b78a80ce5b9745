use crate::models::ChunkPlan;
use std::{
    fmt,
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

pub trait ByteSource: Send + Sync {
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_range(&self, start: u64, size: u64) -> io::Result<Vec<u8>>;

    /// Releases the underlying handle. Later reads fail.
    fn close(&self) {}
}

/// A file on disk. Seek+read is serialized on the shared handle.
pub struct LocalFile {
    handle: Mutex<Option<File>>,
    len: u64,
}

impl LocalFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            handle: Mutex::new(Some(file)),
            len,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl ByteSource for LocalFile {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_range(&self, start: u64, size: u64) -> io::Result<Vec<u8>> {
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        let file = guard
            .as_mut()
            .ok_or_else(|| io::Error::other("file handle already released"))?;
        file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; size as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn close(&self) {
        // Dropping the File closes it.
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&self, start: u64, size: u64) -> io::Result<Vec<u8>> {
        let start = start as usize;
        let end = start + size as usize;
        self.data
            .get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "range out of bounds"))
    }
}

#[derive(Clone)]
pub struct Chunk {
    index: usize,
    start: u64,
    size: u64,
    source: Arc<dyn ByteSource>,
}

impl Chunk {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn load(&self) -> io::Result<Vec<u8>> {
        self.source.read_range(self.start, self.size)
    }

    pub fn plan(&self) -> ChunkPlan {
        ChunkPlan {
            index: self.index,
            start: self.start,
            size: self.size,
        }
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("index", &self.index)
            .field("start", &self.start)
            .field("size", &self.size)
            .finish()
    }
}

pub fn chunk_count(file_size: u64, chunk_size: u64) -> usize {
    file_size.div_ceil(chunk_size) as usize
}

pub fn build_chunks(source: Arc<dyn ByteSource>, file_size: u64, chunk_size: u64) -> Vec<Chunk> {
    if chunk_size == 0 {
        return Vec::new();
    }
    let mut chunks = Vec::with_capacity(chunk_count(file_size, chunk_size));
    let mut start = 0;
    let mut index = 0;

    while start < file_size {
        let end = (start + chunk_size).min(file_size);
        chunks.push(Chunk {
            index,
            start,
            size: end - start,
            source: source.clone(),
        });
        start = end;
        index += 1;
    }

    chunks
}
