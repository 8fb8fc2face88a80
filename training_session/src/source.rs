use std::fmt;
use std::io::SeekFrom;
use std::ops::Range;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::errors::{Result, TrainingSessionError};

const DEFAULT_CONTENT_TYPE: &str = "text/csv";

#[derive(Clone)]
enum SourceData {
    Path(PathBuf),
    Memory(Bytes),
}

/// A training file selected for upload.
///
/// Name, size and content type are fixed when the source is created.  Path-backed sources
/// read their bytes lazily, one range at a time.
#[derive(Clone)]
pub struct SourceFile {
    name: String,
    size: u64,
    content_type: String,
    data: SourceData,
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SourceFile");
        s.field("name", &self.name)
            .field("size", &self.size)
            .field("content_type", &self.content_type);
        if let SourceData::Path(p) = &self.data {
            s.field("path", p);
        }
        s.finish()
    }
}

impl SourceFile {
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{} is not a file", path.display()))
                .into());
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            content_type: content_type_for(&name).to_string(),
            name,
            size: metadata.len(),
            data: SourceData::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let data = data.into();
        Self {
            content_type: content_type_for(&name).to_string(),
            name,
            size: data.len() as u64,
            data: SourceData::Memory(data),
        }
    }

    /// Overrides the content type guessed from the file name; an empty value keeps the default.
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        let content_type = content_type.trim();
        self.content_type = if content_type.is_empty() {
            DEFAULT_CONTENT_TYPE.to_string()
        } else {
            content_type.to_string()
        };
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Fails fast when the file cannot be uploaded at all.
    pub fn check_uploadable(&self, max_file_size: u64) -> Result<()> {
        if self.size > max_file_size {
            return Err(TrainingSessionError::FileTooLarge {
                size: self.size,
                limit: max_file_size,
            });
        }
        if self.is_empty() {
            return Err(TrainingSessionError::EmptyFile);
        }
        Ok(())
    }

    pub async fn read_range(&self, range: Range<u64>) -> Result<Bytes> {
        if range.start > range.end || range.end > self.size {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("range {range:?} outside of {} ({} bytes)", self.name, self.size),
            )
            .into());
        }

        match &self.data {
            SourceData::Memory(bytes) => Ok(bytes.slice(range.start as usize..range.end as usize)),
            SourceData::Path(path) => {
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(SeekFrom::Start(range.start)).await?;
                let mut buf = vec![0u8; (range.end - range.start) as usize];
                file.read_exact(&mut buf).await?;
                Ok(Bytes::from(buf))
            },
        }
    }

    pub async fn read_all(&self) -> Result<Bytes> {
        self.read_range(0..self.size).await
    }
}

fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" => "application/json",
        "txt" => "text/plain",
        "tsv" => "text/tab-separated-values",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
