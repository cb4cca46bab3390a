//! Mock host for testing: an in-memory filesystem that understands the
//! handful of commands LogWatch issues.
//!
//! Supported: `mkdir [-p] DIR`, `stat -c %s FILE`, `tail -c +N FILE`,
//! `cat FILE`, `true`. Anything else exits 127. Every command is recorded.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{HostError, HostResult};
use crate::host::{ExecOutput, Host, split_command};

/// Mock implementation of the `Host` trait.
///
/// Thread-safe via `Mutex` (fine for test contexts).
pub struct MockHost {
    name: String,
    files: Mutex<HashMap<String, Vec<u8>>>,
    dirs: Mutex<BTreeSet<String>>,
    unreadable: Mutex<BTreeSet<String>>,
    commands: Mutex<Vec<String>>,
    cleaned_up: AtomicBool,
}

impl MockHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Mutex::new(HashMap::new()),
            dirs: Mutex::new(BTreeSet::new()),
            unreadable: Mutex::new(BTreeSet::new()),
            commands: Mutex::new(Vec::new()),
            cleaned_up: AtomicBool::new(false),
        }
    }

    /// Append bytes to `path`, as a process on the host logging would.
    pub fn append(&self, path: &str, content: impl AsRef<[u8]>) {
        self.files
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .extend_from_slice(content.as_ref());
    }

    /// Append one newline-terminated line to `path`.
    pub fn append_line(&self, path: &str, line: &str) {
        self.append(path, format!("{line}\n"));
    }

    /// Make `path` unreadable (permission denied).
    pub fn revoke(&self, path: &str) {
        self.unreadable.lock().unwrap().insert(path.to_string());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn has_dir(&self, dir: &str) -> bool {
        self.dirs.lock().unwrap().contains(dir)
    }

    /// Every command executed so far.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn is_cleaned_up(&self) -> bool {
        self.cleaned_up.load(Ordering::SeqCst)
    }

    fn failure(code: i32, stderr: String) -> ExecOutput {
        ExecOutput {
            stdout: Vec::new(),
            stderr,
            exit_code: Some(code),
        }
    }

    fn ok(stdout: Vec<u8>) -> ExecOutput {
        ExecOutput {
            stdout,
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// Look up a file the way `stat`/`tail`/`cat` would see it.
    fn open(&self, tool: &str, path: &str) -> Result<Vec<u8>, ExecOutput> {
        if self.unreadable.lock().unwrap().contains(path) {
            return Err(Self::failure(
                1,
                format!("{tool}: cannot open '{path}': Permission denied"),
            ));
        }
        self.files.lock().unwrap().get(path).cloned().ok_or_else(|| {
            Self::failure(1, format!("{tool}: cannot open '{path}': No such file or directory"))
        })
    }

    fn run(&self, argv: &[String]) -> ExecOutput {
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["true"] => Self::ok(Vec::new()),
            ["mkdir", "-p", dir] | ["mkdir", dir] => {
                self.dirs.lock().unwrap().insert((*dir).to_string());
                Self::ok(Vec::new())
            }
            ["stat", "-c", "%s", path] => match self.open("stat", path) {
                Ok(content) => Self::ok(format!("{}\n", content.len()).into_bytes()),
                Err(out) => out,
            },
            ["tail", "-c", start, path] => {
                let Some(start) = start.strip_prefix('+').and_then(|s| s.parse::<usize>().ok())
                else {
                    return Self::failure(1, format!("tail: invalid number of bytes: {start}"));
                };
                match self.open("tail", path) {
                    Ok(content) => {
                        let from = start.saturating_sub(1).min(content.len());
                        Self::ok(content[from..].to_vec())
                    }
                    Err(out) => out,
                }
            }
            ["cat", path] => match self.open("cat", path) {
                Ok(content) => Self::ok(content),
                Err(out) => out,
            },
            [program, ..] => Self::failure(127, format!("{program}: command not found")),
            [] => Self::failure(127, String::new()),
        }
    }
}

#[async_trait]
impl Host for MockHost {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, command: &str) -> HostResult<ExecOutput> {
        let argv = split_command(command)?;
        self.commands.lock().unwrap().push(command.to_string());
        Ok(self.run(&argv))
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> HostResult<()> {
        if self.cleaned_up.load(Ordering::SeqCst) {
            return Err(HostError::Io(format!("{}: host already cleaned up", self.name)));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_vec());
        Ok(())
    }

    async fn cleanup(&self) -> HostResult<()> {
        self.files.lock().unwrap().clear();
        self.dirs.lock().unwrap().clear();
        self.cleaned_up.store(true, Ordering::SeqCst);
        Ok(())
    }
}
