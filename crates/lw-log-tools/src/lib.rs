//! Log exception scanning for LogWatch.
//!
//! Tails append-only log sources incrementally (`LogCursor`), classifies each
//! new line against the `<date> <time> [SEVERITY][pid] file.ext N: message`
//! grammar (`classifier`), flags lines that breach a severity policy
//! (`ExceptionScanner`) and fans scans out across many sources
//! (`LogAnalyzer`). Sources are read through the `LogSource` capability so
//! files, remote hosts and in-memory mocks are interchangeable.

pub mod analyzer;
pub mod classifier;
pub mod cursor;
pub mod error;
pub mod mock;
pub mod scanner;
pub mod source;
pub mod types;

// Re-export key types for convenience
pub use analyzer::{CheckReport, LogAnalyzer, Verdict};
pub use classifier::classify;
pub use cursor::LogCursor;
pub use error::{LogError, LogResult};
pub use mock::MockLogSource;
pub use scanner::ExceptionScanner;
pub use source::{FileLogSource, LogSource, ReadChunk};
pub use types::{
    ExceptionReason, FlaggedLine, LineKind, LogLine, RawLine, ScanPolicy, ScanResult, Severity,
};
