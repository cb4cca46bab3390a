//! Line classifier for agent log lines.
//!
//! Recognizes `<date> <time> [<SEVERITY>][<pid>] <component>.<ext> <lineno>: <message>`,
//! e.g. `2017-01-12 19:19:04.419 [INFO][87] ipip_mgr.go 75: Setting local IPv4 address`.
//! Anything else classifies as `Unstructured`; classification never fails.

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

use crate::types::{LineKind, LogLine, RawLine, Severity};

static RE_STRUCTURED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4}-\d{2}-\d{2}) (\d{2}:\d{2}:\d{2}(?:\.\d+)?) \[([^\[\]]+)\]\[(\d+)\] (\S+\.[A-Za-z0-9]+) (\d+): ?(.*)$",
    )
    .unwrap()
});

/// Classify one raw line found at `offset` / `line_number` of its source.
pub fn classify(raw: &str, offset: u64, line_number: usize) -> LogLine {
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    LogLine {
        raw: raw.to_string(),
        offset,
        line_number,
        kind: parse_kind(raw).unwrap_or(LineKind::Unstructured),
    }
}

/// Classify a line delivered by a `LogCursor`.
pub fn classify_raw(line: &RawLine) -> LogLine {
    classify(&line.text, line.offset, line.line_number)
}

fn parse_kind(raw: &str) -> Option<LineKind> {
    let caps = RE_STRUCTURED.captures(raw)?;

    // Digit runs too long for u32 mean the line is not what it looks like.
    let pid: u32 = caps[4].parse().ok()?;
    let component_line: u32 = caps[6].parse().ok()?;

    let (severity, nonstandard_severity) = match Severity::from_token(&caps[3]) {
        Some(severity) => (severity, false),
        None => (Severity::Info, true),
    };

    let timestamp =
        NaiveDateTime::parse_from_str(&format!("{} {}", &caps[1], &caps[2]), "%Y-%m-%d %H:%M:%S%.f")
            .ok();

    Some(LineKind::Structured {
        timestamp,
        severity,
        nonstandard_severity,
        pid,
        component: caps[5].to_string(),
        component_line,
        message: caps[7].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FELIX_BASELINE;
    use chrono::{Datelike, Timelike};
    use proptest::prelude::*;

    const ERROR_LINE: &str =
        "2017-01-12 19:19:05.421 [ERROR][87] syncer.go 500: Watcher is out-of-sync.";
    const INFO_LINE: &str =
        "2017-01-12 19:19:05.421 [INFO][87] syncer.go 500: Watcher is out-of-sync.";

    #[test]
    fn classify_error_line() {
        let line = classify(ERROR_LINE, 0, 1);
        match line.kind {
            LineKind::Structured {
                severity,
                nonstandard_severity,
                pid,
                ref component,
                component_line,
                ref message,
                timestamp,
            } => {
                assert_eq!(severity, Severity::Error);
                assert!(!nonstandard_severity);
                assert_eq!(pid, 87);
                assert_eq!(component, "syncer.go");
                assert_eq!(component_line, 500);
                assert_eq!(message, "Watcher is out-of-sync.");
                let ts = timestamp.unwrap();
                assert_eq!(ts.year(), 2017);
                assert_eq!(ts.hour(), 19);
                assert_eq!(ts.and_utc().timestamp_subsec_millis(), 421);
            }
            LineKind::Unstructured => panic!("expected structured line"),
        }
    }

    #[test]
    fn classify_info_line() {
        let line = classify(INFO_LINE, 10, 2);
        assert_eq!(line.severity(), Some(Severity::Info));
        assert_eq!(line.offset, 10);
        assert_eq!(line.line_number, 2);
        assert_eq!(line.raw, INFO_LINE);
    }

    #[test]
    fn severity_token_case_insensitive() {
        let line = classify(
            "2017-01-12 19:19:05.421 [warning][87] syncer.go 500: lagging",
            0,
            1,
        );
        assert_eq!(line.severity(), Some(Severity::Warn));
    }

    #[test]
    fn unknown_severity_maps_to_info_with_flag() {
        let line = classify(
            "2017-01-12 19:19:05.421 [NOTICE][87] syncer.go 500: something",
            0,
            1,
        );
        match line.kind {
            LineKind::Structured {
                severity,
                nonstandard_severity,
                ..
            } => {
                assert_eq!(severity, Severity::Info);
                assert!(nonstandard_severity);
            }
            LineKind::Unstructured => panic!("expected structured line"),
        }
    }

    #[test]
    fn truncated_line_is_unstructured() {
        let line = classify("2017-01-12 19:19:05.421 [ERROR][87] syn", 0, 1);
        assert_eq!(line.kind, LineKind::Unstructured);
        assert_eq!(line.severity(), None);
        assert_eq!(line.message(), "2017-01-12 19:19:05.421 [ERROR][87] syn");
    }

    #[test]
    fn free_text_is_unstructured() {
        assert!(!classify("panic: runtime error: index out of range", 0, 1).is_structured());
        assert!(!classify("", 0, 1).is_structured());
        assert!(!classify("[ERROR][87] syncer.go 500: no timestamp", 0, 1).is_structured());
    }

    #[test]
    fn oversized_pid_is_unstructured() {
        let line = classify(
            "2017-01-12 19:19:05.421 [INFO][99999999999999999999] syncer.go 500: x",
            0,
            1,
        );
        assert!(!line.is_structured());
    }

    #[test]
    fn impossible_date_keeps_structure_without_timestamp() {
        let line = classify("2017-13-45 19:19:05.421 [ERROR][87] syncer.go 500: x", 0, 1);
        match line.kind {
            LineKind::Structured { timestamp, .. } => assert!(timestamp.is_none()),
            LineKind::Unstructured => panic!("expected structured line"),
        }
        assert_eq!(line.severity(), Some(Severity::Error));
    }

    #[test]
    fn carriage_return_is_stripped() {
        let line = classify(&format!("{INFO_LINE}\r"), 0, 1);
        assert!(line.is_structured());
        assert_eq!(line.raw, INFO_LINE);
    }

    #[test]
    fn message_with_colons_and_braces_kept_whole() {
        let raw = r#"2017-01-12 19:19:04.419 [INFO][87] int_dataplane.go 389: Received interface update msg=&intdataplane.ifaceUpdate{Name:"lo", State:"up"}"#;
        let line = classify(raw, 0, 1);
        assert_eq!(
            line.message(),
            r#"Received interface update msg=&intdataplane.ifaceUpdate{Name:"lo", State:"up"}"#
        );
    }

    #[test]
    fn classification_is_total_over_odd_input() {
        let inputs = [
            "\u{0}\u{1}\u{2}",
            "[[[[]]]]",
            "2017-01-12",
            "2017-01-12 19:19:05.421 [][87] syncer.go 500: empty severity",
            "日本語のログ行",
            "2017-01-12 19:19:05.421 [ERROR][87] syncer.go 500:",
        ];
        for input in inputs {
            let line = classify(input, 0, 1);
            assert_eq!(line.raw, input);
        }
    }

    #[test]
    fn baseline_lines_are_structured_info() {
        for (i, raw) in FELIX_BASELINE.iter().enumerate() {
            let line = classify(raw, 0, i + 1);
            assert!(line.is_structured(), "line {} not structured: {raw}", i + 1);
            assert_eq!(line.severity(), Some(Severity::Info));
        }
    }

    #[test]
    fn long_config_dump_kept_whole() {
        let raw = FELIX_BASELINE
            .iter()
            .find(|l| l.contains("int_dataplane.go 378"))
            .unwrap();
        let line = classify(raw, 0, 1);
        match &line.kind {
            LineKind::Structured {
                component,
                component_line,
                ..
            } => {
                assert_eq!(component, "int_dataplane.go");
                assert_eq!(*component_line, 378);
            }
            LineKind::Unstructured => panic!("expected structured line"),
        }
        assert!(
            line.message()
                .starts_with(r#"Received update from calculation graph msg=config:<key:"ClusterGUID""#)
        );
        assert!(line.message().ends_with(r#"config:<key:"marker" value:"created" >"#));
    }

    proptest! {
        #[test]
        fn classify_is_total(raw in any::<String>(), offset in any::<u64>(), line_number in any::<usize>()) {
            let line = classify(&raw, offset, line_number);
            prop_assert_eq!(&line.raw, raw.strip_suffix('\r').unwrap_or(&raw));
            prop_assert_eq!(line.offset, offset);
            prop_assert_eq!(line.line_number, line_number);
            if !line.is_structured() {
                prop_assert_eq!(line.message(), line.raw.as_str());
            }
        }

        #[test]
        fn classify_total_on_near_miss_lines(
            date in "[0-9]{4}-[0-9]{2}-[0-9]{2}",
            sev in "[A-Za-z\\[\\]]{0,8}",
            pid in "[0-9]{0,12}",
            tail in ".{0,40}",
        ) {
            let raw = format!("{date} 19:19:05.421 [{sev}][{pid}] syncer.go 500: {tail}");
            let line = classify(&raw, 0, 1);
            prop_assert_eq!(&line.raw, raw.strip_suffix('\r').unwrap_or(&raw));
        }
    }
}
