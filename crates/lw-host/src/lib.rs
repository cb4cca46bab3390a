//! Host capability for LogWatch.
//!
//! A `Host` runs commands, writes files and cleans up after itself. Three
//! backends: `LocalHost` (processes on this machine), `DockerHost`
//! (`docker exec` into a running container) and `MockHost` (in-memory, for
//! tests). `HostLogSource` reads log files through any of them.

pub mod docker;
pub mod error;
pub mod host;
pub mod local;
pub mod log_source;
pub mod mock;

pub use docker::DockerHost;
pub use error::{HostError, HostResult};
pub use host::{ExecOutput, Host};
pub use local::LocalHost;
pub use log_source::HostLogSource;
pub use mock::MockHost;
