//! Mock log source for testing: in-memory files that can grow, shrink,
//! disappear or become unreadable between polls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{LogError, LogResult};
use crate::source::{LogSource, ReadChunk};

/// Baseline agent log used to seed sources before a scenario runs.
pub const FELIX_BASELINE: &[&str] = &[
    r#"2017-01-12 19:19:04.419 [INFO][87] ipip_mgr.go 75: Setting local IPv4 address on link. addr=192.168.151.0 link="tunl0""#,
    r#"2017-01-12 19:19:04.419 [INFO][87] int_dataplane.go 389: Received interface update msg=&intdataplane.ifaceUpdate{Name:"lo", State:"up"}"#,
    r#"2017-01-12 19:19:04.419 [INFO][87] ipip_mgr.go 95: Removing old address addr=192.168.151.0 link="tunl0" oldAddr=192.168.151.0/32 tunl0"#,
    r#"2017-01-12 19:19:04.416 [INFO][87] syncer.go 247: etcd watch thread started."#,
    r#"2017-01-12 19:19:04.419 [INFO][87] int_dataplane.go 378: Received update from calculation graph msg=config:<key:"ClusterGUID" value:"328b9309c07447db893cd7c155f2547b" > config:<key:"DefaultEndpointToHostAction" value:"RETURN" > config:<key:"EtcdAddr" value:"" > config:<key:"EtcdCaFile" value:"" > config:<key:"EtcdCertFile" value:"" > config:<key:"EtcdEndpoints" value:"http://10.96.232.136:6666" > config:<key:"EtcdKeyFile" value:"" > config:<key:"EtcdScheme" value:"" > config:<key:"FelixHostname" value:"tigera-lwr-kubetest-02" > config:<key:"InterfacePrefix" value:"cali" > config:<key:"IpInIpEnabled" value:"true" > config:<key:"IpInIpTunnelAddr" value:"192.168.151.0" > config:<key:"IpfixCollectorAddr" value:"192.168.67.75" > config:<key:"IpfixCollectorPort" value:"4739" > config:<key:"LogFilePath" value:"None" > config:<key:"LogSeverityFile" value:"None" > config:<key:"LogSeverityScreen" value:"info" > config:<key:"MetadataAddr" value:"None" > config:<key:"ReportingIntervalSecs" value:"0" > config:<key:"marker" value:"created" >"#,
    r#"2017-01-12 19:19:04.419 [INFO][87] int_dataplane.go 398: Received interface addresses update msg=&intdataplane.ifaceAddrsUpdate{Name:"lo", Addrs:set.mapSet{"127.0.0.1":set.empty{}, "::1":set.empty{}}}"#,
    r#"2017-01-12 19:19:04.419 [INFO][87] int_dataplane.go 398: Received interface addresses update msg=&intdataplane.ifaceAddrsUpdate{Name:"ens4", Addrs:set.mapSet{"fe80::4001:aff:fef0:30":set.empty{}, "10.240.0.48":set.empty{}}}"#,
    r#"2017-01-12 19:19:04.419 [INFO][87] int_dataplane.go 398: Received interface addresses update msg=&intdataplane.ifaceAddrsUpdate{Name:"calic50350b9abf", Addrs:set.mapSet{"fe80::a077:a7ff:fe1c:8436":set.empty{}}}"#,
    r#"2017-01-12 19:19:04.420 [INFO][87] int_dataplane.go 398: Received interface addresses update msg=&intdataplane.ifaceAddrsUpdate{Name:"calie9054722202", Addrs:set.mapSet{"fe80::d046:64ff:fe86:c21":set.empty{}}}"#,
    r#"2017-01-12 19:19:04.420 [INFO][87] int_dataplane.go 398: Received interface addresses update msg=&intdataplane.ifaceAddrsUpdate{Name:"cali076a4d2f51a", Addrs:set.mapSet{"fe80::2c6e:f7ff:fe0d:2b86":set.empty{}}}"#,
    r#"2017-01-12 19:19:04.420 [INFO][87] syncer.go 261: Polled etcd for initial watch index. index=0x3f85"#,
    r#"2017-01-12 19:19:04.420 [INFO][87] int_dataplane.go 398: Received interface addresses update msg=&intdataplane.ifaceAddrsUpdate{Name:"cali76b1299437f", Addrs:set.mapSet{"fe80::30f3:a9ff:fe6e:2d22":set.empty{}}}"#,
    r#"2017-01-12 19:19:04.420 [INFO][87] int_dataplane.go 398: Received interface addresses update msg=&intdataplane.ifaceAddrsUpdate{Name:"cali477d4934e36", Addrs:set.mapSet{"fe80::70d6:51ff:feca:1b41":set.empty{}}}"#,
    r#"2017-01-12 19:19:04.419 [INFO][87] iface_monitor.go 120: Netlink address update. addr="192.168.151.0" exists=false ifIndex=14"#,
    r#"2017-01-12 19:19:04.421 [INFO][87] int_dataplane.go 389: Received interface update msg=&intdataplane.ifaceUpdate{Name:"ens4", State:"up"}"#,
    r#"2017-01-12 19:19:04.421 [INFO][87] int_dataplane.go 288: Linux interface addrs changed. addrs=set.mapSet{} ifaceName="tunl0""#,
    r#"2017-01-12 19:19:04.420 [INFO][87] syncer.go 461: Watcher out-of-sync, starting to track deletions"#,
    r#"2017-01-12 19:19:04.421 [INFO][87] int_dataplane.go 389: Received interface update msg=&intdataplane.ifaceUpdate{Name:"calic50350b9abf", State:"up"}"#,
    r#"2017-01-12 19:19:04.421 [INFO][87] ipip_mgr.go 103: Address wasn't present, adding it. addr=192.168.151.0 link="tunl0""#,
    r#"2017-01-12 19:19:04.421 [INFO][87] int_dataplane.go 398: Received interface addresses update msg=&intdataplane.ifaceAddrsUpdate{Name:"cali3b05e50a7e8", Addrs:set.mapSet{"fe80::94d3:2bff:fe26:e4fe":set.empty{}}}"#,
    r#"2017-01-12 19:19:04.421 [INFO][87] iface_monitor.go 120: Netlink address update. addr="192.168.151.0" exists=true ifIndex=14"#,
    r#"2017-01-12 19:19:04.421 [INFO][87] syncer.go 500: Watcher is out-of-sync but no snapshot in progress, starting one."#,
];

/// Join lines into newline-terminated log content.
pub fn to_content(lines: &[&str]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

#[derive(Default)]
struct MockFile {
    content: Vec<u8>,
    revoked: bool,
}

/// A mock log source that serves in-memory content by path.
///
/// Thread-safe via `Mutex` (fine for test contexts).
pub struct MockLogSource {
    files: Mutex<HashMap<String, MockFile>>,
    delay: Mutex<Option<Duration>>,
}

impl MockLogSource {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            delay: Mutex::new(None),
        }
    }

    /// Create a mock with the baseline agent log at `path`.
    pub fn with_felix_baseline(path: &str) -> Self {
        let m = Self::new();
        m.write(path, to_content(FELIX_BASELINE));
        m
    }

    /// Replace the content of `path`, creating it if needed.
    pub fn write(&self, path: &str, content: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap();
        files.entry(path.to_string()).or_default().content = content.into();
    }

    /// Append raw bytes to `path`, creating it if needed.
    pub fn append(&self, path: &str, content: impl AsRef<[u8]>) {
        let mut files = self.files.lock().unwrap();
        files
            .entry(path.to_string())
            .or_default()
            .content
            .extend_from_slice(content.as_ref());
    }

    /// Append one newline-terminated line to `path`.
    pub fn append_line(&self, path: &str, line: &str) {
        self.append(path, format!("{line}\n"));
    }

    /// Truncate `path` to `len` bytes.
    pub fn truncate(&self, path: &str, len: usize) {
        if let Some(file) = self.files.lock().unwrap().get_mut(path) {
            file.content.truncate(len);
        }
    }

    /// Delete `path`.
    pub fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(path);
    }

    /// Make `path` unreadable, as if its permissions were revoked.
    pub fn revoke(&self, path: &str) {
        self.files
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .revoked = true;
    }

    /// Delay every read by `delay` (simulates a slow remote host).
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Current length of `path` in bytes, if it exists.
    pub fn len_of(&self, path: &str) -> Option<usize> {
        self.files.lock().unwrap().get(path).map(|f| f.content.len())
    }
}

impl Default for MockLogSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn read(&self, path: &str, from_offset: u64) -> LogResult<ReadChunk> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let files = self.files.lock().unwrap();
        let Some(file) = files.get(path) else {
            return Ok(ReadChunk::missing(from_offset));
        };
        if file.revoked {
            return Err(LogError::unavailable(path, "permission denied"));
        }

        let len = file.content.len() as u64;
        if len < from_offset {
            return Ok(ReadChunk {
                bytes: Vec::new(),
                new_offset: from_offset,
                len,
                exists: true,
            });
        }
        Ok(ReadChunk {
            bytes: file.content[from_offset as usize..].to_vec(),
            new_offset: len,
            len,
            exists: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "/var/log/calico/felix/current";

    #[tokio::test]
    async fn mock_reads_baseline() {
        let source = MockLogSource::with_felix_baseline(PATH);
        let chunk = source.read(PATH, 0).await.unwrap();
        assert!(chunk.exists);
        let text = String::from_utf8(chunk.bytes).unwrap();
        assert_eq!(text.lines().count(), FELIX_BASELINE.len());
    }

    #[tokio::test]
    async fn mock_reads_appended_tail() {
        let source = MockLogSource::new();
        source.append_line(PATH, "first");
        let offset = source.len_of(PATH).unwrap() as u64;
        source.append_line(PATH, "second");

        let chunk = source.read(PATH, offset).await.unwrap();
        assert_eq!(chunk.bytes, b"second\n");
        assert_eq!(chunk.new_offset, 13);
    }

    #[tokio::test]
    async fn mock_missing_path() {
        let source = MockLogSource::new();
        let chunk = source.read("/nonexistent", 0).await.unwrap();
        assert!(!chunk.exists);
    }

    #[tokio::test]
    async fn mock_revoked_path_errors() {
        let source = MockLogSource::with_felix_baseline(PATH);
        source.revoke(PATH);
        let result = source.read(PATH, 0).await;
        assert!(matches!(result, Err(LogError::SourceUnavailable { .. })));
    }

    #[tokio::test]
    async fn mock_truncated_path() {
        let source = MockLogSource::new();
        source.append_line(PATH, "0123456789");
        source.truncate(PATH, 3);
        let chunk = source.read(PATH, 11).await.unwrap();
        assert!(chunk.is_truncated(11));
    }
}
