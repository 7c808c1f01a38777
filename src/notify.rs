//! Notifications
//!
//! Short notices raised when a detection, a monitoring run or a streamed
//! packet turns up botnet traffic. Delivery goes through a [`Notifier`];
//! [`PreferenceGate`] drops everything unless the user switched
//! notifications on.

use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use crate::api::{DetectionSummary, MonitorSummary, StreamPacket};
use crate::session::Preferences;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Danger,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Danger => f.write_str("danger"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub body: String,
}

impl Notice {
    fn new(severity: Severity, title: &str, body: String) -> Self {
        Self {
            severity,
            title: title.to_string(),
            body,
        }
    }

    /// Outcome of a batch detection
    pub fn detection(summary: &DetectionSummary) -> Self {
        let botnets = summary.botnet_detected.unwrap_or(0);
        let normal = summary.normal_detected.unwrap_or(0);

        if botnets > 0 {
            Self::new(
                Severity::Danger,
                "Botnet Detected",
                format!("{} threat(s) found, {} normal.", botnets, normal),
            )
        } else {
            Self::new(
                Severity::Info,
                "No Botnet Detected",
                format!("{} normal, {} threats.", normal, botnets),
            )
        }
    }

    /// Outcome of a timed monitoring run
    pub fn monitoring(summary: &MonitorSummary) -> Self {
        if summary.botnet_detected > 0 {
            Self::new(
                Severity::Danger,
                "Botnet Detected (Monitoring)",
                format!("{} threat(s) detected.", summary.botnet_detected),
            )
        } else {
            Self::new(
                Severity::Info,
                "Monitoring Complete",
                "No threats detected.".to_string(),
            )
        }
    }

    /// Streamed packet; only botnet packets raise a notice
    pub fn packet(packet: &StreamPacket) -> Option<Self> {
        packet.is_botnet().then(|| {
            Self::new(
                Severity::Danger,
                "Botnet Packet Detected",
                format!("Confidence {:.1}%", packet.confidence * 100.0),
            )
        })
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.title, self.body)
    }
}

/// Delivers notices somewhere a person will see them
pub trait Notifier: Send + Sync {
    /// Returns whether the notice was shown
    fn notify(&self, notice: &Notice) -> bool;
}

/// Writes one line per notice, to stderr by default
pub struct TerminalNotifier<W: Write + Send = std::io::Stderr> {
    out: Mutex<W>,
}

impl TerminalNotifier {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> TerminalNotifier<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> Notifier for TerminalNotifier<W> {
    fn notify(&self, notice: &Notice) -> bool {
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        match writeln!(out, "{}", notice) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to write notice");
                false
            }
        }
    }
}

/// Passes notices through only when notifications are enabled
pub struct PreferenceGate<N> {
    inner: N,
    enabled: bool,
}

impl<N: Notifier> PreferenceGate<N> {
    pub fn new(inner: N, preferences: &Preferences) -> Self {
        Self {
            inner,
            enabled: preferences.notifications,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn into_inner(self) -> N {
        self.inner
    }
}

impl<N: Notifier> Notifier for PreferenceGate<N> {
    fn notify(&self, notice: &Notice) -> bool {
        if !self.enabled {
            tracing::trace!(title = %notice.title, "Notifications disabled, notice dropped");
            return false;
        }
        self.inner.notify(notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn packet(prediction: u8, confidence: f64) -> StreamPacket {
        StreamPacket {
            timestamp: None,
            prediction,
            prediction_label: None,
            probability: 0.9,
            confidence,
            actual_label: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_detection_notice() {
        let danger = Notice::detection(&DetectionSummary {
            botnet_detected: Some(3),
            normal_detected: Some(7),
            ..Default::default()
        });
        assert_eq!(danger.severity, Severity::Danger);
        assert_eq!(danger.title, "Botnet Detected");
        assert_eq!(danger.body, "3 threat(s) found, 7 normal.");

        let clean = Notice::detection(&DetectionSummary {
            normal_detected: Some(10),
            ..Default::default()
        });
        assert_eq!(clean.severity, Severity::Info);
        assert_eq!(clean.title, "No Botnet Detected");
        assert_eq!(clean.body, "10 normal, 0 threats.");
    }

    #[test]
    fn test_monitoring_notice() {
        let danger = Notice::monitoring(&MonitorSummary {
            botnet_detected: 2,
            ..Default::default()
        });
        assert_eq!(danger.title, "Botnet Detected (Monitoring)");
        assert_eq!(danger.body, "2 threat(s) detected.");

        let clean = Notice::monitoring(&MonitorSummary::default());
        assert_eq!(clean.title, "Monitoring Complete");
        assert_eq!(clean.body, "No threats detected.");
    }

    #[test]
    fn test_packet_notice() {
        assert!(Notice::packet(&packet(0, 0.99)).is_none());

        let notice = Notice::packet(&packet(1, 0.9375)).unwrap();
        assert_eq!(notice.title, "Botnet Packet Detected");
        assert_eq!(notice.body, "Confidence 93.8%");
    }

    #[test]
    fn test_terminal_notifier_writes_line() {
        let notifier = TerminalNotifier::new(Vec::new());
        let notice = Notice::monitoring(&MonitorSummary::default());
        assert!(notifier.notify(&notice));

        let out = String::from_utf8(notifier.into_inner()).unwrap();
        assert_eq!(out, "[info] Monitoring Complete: No threats detected.\n");
    }

    #[test]
    fn test_gate_follows_preference() {
        let notice = Notice::packet(&packet(1, 0.5)).unwrap();

        let off = PreferenceGate::new(TerminalNotifier::new(Vec::new()), &Preferences::default());
        assert!(!off.notify(&notice));
        assert!(off.into_inner().into_inner().is_empty());

        let prefs = Preferences {
            notifications: true,
            ..Default::default()
        };
        let on = PreferenceGate::new(TerminalNotifier::new(Vec::new()), &prefs);
        assert!(on.is_enabled());
        assert!(on.notify(&notice));
        assert!(!on.into_inner().into_inner().is_empty());
    }
}
