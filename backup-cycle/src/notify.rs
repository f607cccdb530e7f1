//! Operator notifications.
//!
//! Notifications are the messages an operator acts on (missing anchors,
//! skipped purges, failed deletions), as opposed to diagnostic logging.
//! Each one is stamped with the local time and the host name before it is
//! handed to a sink.

use chrono::Local;
use std::process::{Command, Stdio};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Err,
}

impl Severity {
    /// syslog priority name.
    fn syslog_priority(self) -> &'static str {
        match self {
            Severity::Info => "user.info",
            Severity::Warn => "user.warning",
            Severity::Err => "user.err",
        }
    }
}

pub trait Notifier {
    fn notify(&self, severity: Severity, text: &str);

    fn info(&self, text: &str) {
        self.notify(Severity::Info, text);
    }

    fn warn(&self, text: &str) {
        self.notify(Severity::Warn, text);
    }

    fn err(&self, text: &str) {
        self.notify(Severity::Err, text);
    }
}

/// Prefix `text` with a timestamp and the host name.
pub fn stamp(host: &str, text: &str) -> String {
    format!("[{}] {} {}", Local::now().format("%Y-%m-%d %H:%M:%S"), host, text)
}

/// Local host name, or `localhost` if it cannot be determined.
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Emits notifications through `tracing`.
#[derive(Debug, Clone)]
pub struct TracingNotifier {
    host: String,
}

impl TracingNotifier {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, text: &str) {
        let line = stamp(&self.host, text);
        match severity {
            Severity::Info => info!("{}", line),
            Severity::Warn => warn!("{}", line),
            Severity::Err => error!("{}", line),
        }
    }
}

/// Forwards notifications to the system log through `logger(1)`, and to
/// `tracing` as well.
#[derive(Debug, Clone)]
pub struct SyslogNotifier {
    tag: String,
    console: TracingNotifier,
}

impl SyslogNotifier {
    pub fn new(tag: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            console: TracingNotifier::new(host),
        }
    }

    fn logger_args(&self, severity: Severity, line: &str) -> Vec<String> {
        vec![
            "-t".to_string(),
            self.tag.clone(),
            "-p".to_string(),
            severity.syslog_priority().to_string(),
            "--".to_string(),
            line.to_string(),
        ]
    }
}

impl Notifier for SyslogNotifier {
    fn notify(&self, severity: Severity, text: &str) {
        self.console.notify(severity, text);

        let line = stamp(&self.console.host, text);
        match Command::new("logger")
            .args(self.logger_args(severity, &line))
            .stdin(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("logger exited with: {}", status),
            Err(e) => warn!("Failed to run logger: {}", e),
        }
    }
}
