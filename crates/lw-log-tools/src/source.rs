//! Log source abstraction: read appended bytes from files, remote hosts,
//! or mocks.

use async_trait::async_trait;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::{LogError, LogResult};

/// Bytes read from a source starting at some offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadChunk {
    /// Content from the requested offset up to the end observed by the read.
    pub bytes: Vec<u8>,
    /// Offset just past `bytes`.
    pub new_offset: u64,
    /// Source length observed by the read. Less than the requested offset
    /// means the source was truncated; `bytes` is then empty.
    pub len: u64,
    /// False when the source does not exist (yet).
    pub exists: bool,
}

impl ReadChunk {
    pub fn missing(offset: u64) -> Self {
        Self {
            bytes: Vec::new(),
            new_offset: offset,
            len: 0,
            exists: false,
        }
    }

    pub fn is_truncated(&self, from_offset: u64) -> bool {
        self.exists && self.len < from_offset
    }
}

/// Capability for reading an append-only log source by path.
///
/// Enables mocking for tests and swappable backends (local file, remote
/// host exec channel, etc.).
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Read everything from `from_offset` to the current end of `path`.
    ///
    /// A missing source is reported through `ReadChunk::exists`, not as an
    /// error. Errors mean the source cannot be read at all.
    async fn read(&self, path: &str, from_offset: u64) -> LogResult<ReadChunk>;
}

/// Reads logs from the local filesystem.
pub struct FileLogSource;

#[async_trait]
impl LogSource for FileLogSource {
    async fn read(&self, path: &str, from_offset: u64) -> LogResult<ReadChunk> {
        let mut file = match tokio::fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ReadChunk::missing(from_offset));
            }
            Err(e) => return Err(LogError::unavailable(path, e.to_string())),
        };

        let len = file
            .metadata()
            .await
            .map_err(|e| LogError::Io(format!("{path}: {e}")))?
            .len();
        if len < from_offset {
            return Ok(ReadChunk {
                bytes: Vec::new(),
                new_offset: from_offset,
                len,
                exists: true,
            });
        }

        file.seek(SeekFrom::Start(from_offset))
            .await
            .map_err(|e| LogError::Io(format!("{path}: {e}")))?;
        // Read to EOF rather than `len` bytes so growth after the size check
        // is picked up in the same read.
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .await
            .map_err(|e| LogError::Io(format!("{path}: {e}")))?;

        let new_offset = from_offset + bytes.len() as u64;
        Ok(ReadChunk {
            bytes,
            new_offset,
            len: len.max(new_offset),
            exists: true,
        })
    }
}
