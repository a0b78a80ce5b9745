use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

impl ChunkStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ChunkStatus::Succeeded | ChunkStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub index: usize,
    pub start: u64,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumableQuery {
    pub chunk_size: u64,
    pub total_size: u64,
    pub mime_type: String,
    pub identifier: Uuid,
    pub filename: String,
    pub relative_path: String,
    pub total_chunks: usize,
    /// 1-based.
    pub chunk_number: usize,
    pub current_chunk_size: u64,
}

impl ResumableQuery {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("resumableChunkSize", self.chunk_size.to_string()),
            ("resumableTotalSize", self.total_size.to_string()),
            ("resumableType", self.mime_type.clone()),
            ("resumableIdentifier", self.identifier.to_string()),
            ("resumableFilename", self.filename.clone()),
            ("resumableRelativePath", self.relative_path.clone()),
            ("resumableTotalChunks", self.total_chunks.to_string()),
            ("resumableChunkNumber", self.chunk_number.to_string()),
            ("resumableCurrentChunkSize", self.current_chunk_size.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStatus {
    pub identifier: Uuid,
    pub path: PathBuf,
    pub size: u64,
    pub total_chunks: usize,
    pub completed_chunks: usize,
    pub fraction_completed: f64,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadReport {
    pub files: Vec<FileStatus>,
}

impl UploadReport {
    pub fn all_completed(&self) -> bool {
        self.files.iter().all(|f| f.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_fields_use_protocol_names() {
        let id = Uuid::new_v4();
        let query = ResumableQuery {
            chunk_size: 10,
            total_size: 23,
            mime_type: "text/plain".into(),
            identifier: id,
            filename: "sample.txt".into(),
            relative_path: "data/sample.txt".into(),
            total_chunks: 3,
            chunk_number: 3,
            current_chunk_size: 3,
        };

        let fields = query.fields();
        let get = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(fields.len(), 9);
        assert_eq!(get("resumableChunkSize"), Some("10"));
        assert_eq!(get("resumableTotalSize"), Some("23"));
        assert_eq!(get("resumableType"), Some("text/plain"));
        assert_eq!(get("resumableIdentifier"), Some(id.to_string().as_str()));
        assert_eq!(get("resumableFilename"), Some("sample.txt"));
        assert_eq!(get("resumableRelativePath"), Some("data/sample.txt"));
        assert_eq!(get("resumableTotalChunks"), Some("3"));
        assert_eq!(get("resumableChunkNumber"), Some("3"));
        assert_eq!(get("resumableCurrentChunkSize"), Some("3"));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ChunkStatus::InFlight).unwrap();
        assert_eq!(json, "\"in_flight\"");
        assert!(ChunkStatus::Failed.is_terminal());
        assert!(!ChunkStatus::Pending.is_terminal());
    }
}
