//! Shared test rig for E2E tests.
//!
//! Two mock hosts (`host1`, `host2`) share a `Session` watching the agent
//! log at `LOG_PATH`, seeded with the INFO-only baseline before each test.
#![allow(dead_code)]

use std::sync::Arc;

use lw_host::{Host, HostError, MockHost};
use lw_log_tools::mock::{FELIX_BASELINE, to_content};
use lw_log_tools::{CheckReport, ScanPolicy};
use lw_monitor::session::{Session, SessionResult, setup_hosts};

pub const LOG_PATH: &str = "/var/log/calico/felix/current";

pub const ERROR_LINE: &str =
    "2017-01-12 19:19:05.421 [ERROR][87] syncer.go 500: Watcher is out-of-sync.";
pub const INFO_LINE: &str =
    "2017-01-12 19:19:05.421 [INFO][87] syncer.go 500: Watcher is out-of-sync.";

/// One row of a table-driven log scenario.
pub struct LogCase {
    pub name: &'static str,
    pub line: &'static str,
    pub expect_error: bool,
}

/// The ERROR and INFO variants of the same agent message.
pub const NEWLOG_CASES: &[LogCase] = &[
    LogCase {
        name: "ERROR",
        line: ERROR_LINE,
        expect_error: true,
    },
    LogCase {
        name: "INFO",
        line: INFO_LINE,
        expect_error: false,
    },
];

/// Session over two in-memory hosts.
pub struct TestRig {
    /// Typed handles to the hosts the session owns.
    pub hosts: Vec<Arc<MockHost>>,
    pub session: Session,
}

impl TestRig {
    /// Build `host1` and `host2` concurrently and seed the baseline log.
    pub async fn seeded() -> Self {
        Self::seeded_with_policy(ScanPolicy::default()).await
    }

    pub async fn seeded_with_policy(policy: ScanPolicy) -> Self {
        let mocks = vec![Arc::new(MockHost::new("host1")), Arc::new(MockHost::new("host2"))];
        let names = mocks.iter().map(|h| h.name().to_string()).collect();

        let pool = mocks.clone();
        let hosts = setup_hosts(names, move |name| {
            let found = pool.iter().find(|h| h.name() == name).cloned();
            async move {
                found
                    .map(|h| h as Arc<dyn Host>)
                    .ok_or_else(|| HostError::Exec(format!("no such host: {name}")))
            }
        })
        .await
        .unwrap();

        let session = Session::new(LOG_PATH, policy).with_hosts(hosts);
        session
            .seed_log(to_content(FELIX_BASELINE).as_bytes())
            .await
            .unwrap();

        Self {
            hosts: mocks,
            session,
        }
    }

    pub fn host(&self, name: &str) -> &Arc<MockHost> {
        self.hosts
            .iter()
            .find(|h| h.name() == name)
            .unwrap_or_else(|| panic!("no host named {name}"))
    }

    /// Append a line to the agent log on `host`, as the agent would.
    pub fn log(&self, host: &str, line: &str) {
        self.host(host).append_line(LOG_PATH, line);
    }

    /// Run one step: begin, let `during` write logs, then end.
    pub async fn step<F>(&mut self, name: &str, during: F) -> SessionResult<CheckReport>
    where
        F: FnOnce(&TestRig),
    {
        self.session.begin_step(name);
        during(self);
        self.session.end_step().await
    }
}
