//! Incremental reader that yields only lines appended since the last poll.

use crate::error::{LogError, LogResult};
use crate::source::LogSource;
use crate::types::RawLine;

/// Read position into one log source.
///
/// Owned by a single scanner; `poll` takes `&mut self`, so concurrent polls
/// of the same cursor are ruled out by the borrow checker.
#[derive(Debug)]
pub struct LogCursor {
    source_id: String,
    path: String,
    /// Bytes consumed from the source, including `partial`.
    offset: u64,
    /// Complete lines delivered since the last reset.
    lines_read: usize,
    /// Bytes after the last newline: an in-progress line held back until its
    /// terminator arrives.
    partial: Vec<u8>,
    /// The source has been observed to exist at least once.
    seen: bool,
}

impl LogCursor {
    pub fn new(source_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            path: path.into(),
            offset: 0,
            lines_read: 0,
            partial: Vec::new(),
            seen: false,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bytes consumed from the source so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Offset of the first byte not yet delivered as part of a complete line.
    pub fn delivered_offset(&self) -> u64 {
        self.offset - self.partial.len() as u64
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Length of the held-back incomplete line.
    pub fn pending_bytes(&self) -> usize {
        self.partial.len()
    }

    /// Rewind to the start of the source.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.lines_read = 0;
        self.partial.clear();
    }

    /// Return the complete lines appended since the previous poll.
    ///
    /// A source that has never existed yields nothing. One that existed
    /// before and is now gone is `SourceUnavailable`. A source shorter than
    /// the cursor was truncated or rotated: the cursor rewinds and all
    /// current content is delivered as new.
    ///
    /// State is only updated after every read has completed, so dropping
    /// the returned future (e.g. on timeout) leaves the cursor untouched.
    pub async fn poll(&mut self, source: &dyn LogSource) -> LogResult<Vec<RawLine>> {
        let mut from = self.offset;
        let mut chunk = source
            .read(&self.path, from)
            .await
            .map_err(|e| e.for_source(&self.source_id))?;

        if !chunk.exists {
            if self.seen {
                return Err(LogError::unavailable(
                    &self.source_id,
                    format!("{} no longer exists", self.path),
                ));
            }
            return Ok(Vec::new());
        }

        let truncated = chunk.is_truncated(from);
        if truncated {
            tracing::warn!(
                source = %self.source_id,
                path = %self.path,
                old_offset = self.offset,
                new_len = chunk.len,
                "log source truncated or rotated, rereading from start"
            );
            from = 0;
            chunk = source
                .read(&self.path, 0)
                .await
                .map_err(|e| e.for_source(&self.source_id))?;
            if !chunk.exists {
                return Err(LogError::unavailable(
                    &self.source_id,
                    format!("{} disappeared after truncation", self.path),
                ));
            }
        }

        self.seen = true;
        if truncated {
            self.reset();
        }
        debug_assert_eq!(from, self.offset);

        if chunk.bytes.is_empty() {
            return Ok(Vec::new());
        }

        let line_start = self.delivered_offset();
        self.offset = chunk.new_offset;
        self.partial.extend_from_slice(&chunk.bytes);

        let Some(last_nl) = self.partial.iter().rposition(|&b| b == b'\n') else {
            tracing::trace!(
                source = %self.source_id,
                pending = self.partial.len(),
                "holding back incomplete line"
            );
            return Ok(Vec::new());
        };

        let rest = self.partial.split_off(last_nl + 1);
        let complete = std::mem::replace(&mut self.partial, rest);

        let mut lines = Vec::new();
        let mut start = 0usize;
        for (i, &b) in complete.iter().enumerate() {
            if b != b'\n' {
                continue;
            }
            self.lines_read += 1;
            lines.push(RawLine {
                text: String::from_utf8_lossy(&complete[start..i]).into_owned(),
                offset: line_start + start as u64,
                line_number: self.lines_read,
            });
            start = i + 1;
        }

        tracing::debug!(
            source = %self.source_id,
            count = lines.len(),
            offset = self.offset,
            "read new log lines"
        );
        Ok(lines)
    }
}
