use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    ProtocolDecode,
    VulnerabilityScan,
    PayloadGenerated,
    SystemNotice,
    ShellEcho,
    Success,
    ReceivedData,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::ProtocolDecode => "protocol_decode",
            LogCategory::VulnerabilityScan => "vulnerability_scan",
            LogCategory::PayloadGenerated => "payload_generated",
            LogCategory::SystemNotice => "system_notice",
            LogCategory::ShellEcho => "shell_echo",
            LogCategory::Success => "success",
            LogCategory::ReceivedData => "received_data",
        }
    }

    /// Short fixed-width tag for a scrolling terminal display.
    pub fn tag(&self) -> &'static str {
        match self {
            LogCategory::ProtocolDecode => "PDU ",
            LogCategory::VulnerabilityScan => "SCAN",
            LogCategory::PayloadGenerated => "STK ",
            LogCategory::SystemNotice => "SYS ",
            LogCategory::ShellEcho => "$   ",
            LogCategory::Success => "OK  ",
            LogCategory::ReceivedData => "RX  ",
        }
    }
}

/// One immutable activity record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub category: LogCategory,
    pub text: String,
}

/// Change notifications for display subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Appended(LogEntry),
    Cleared,
}

#[derive(Default)]
struct Entries {
    items: Vec<LogEntry>,
    last_ts: Option<DateTime<Utc>>,
}

/// Append-only, ordered activity log shared by every session component.
///
/// Entries are never edited or removed one at a time; `clear` drops the whole
/// sequence under a single lock acquisition.
#[derive(Clone)]
pub struct ActivityLog {
    inner: Arc<Mutex<Entries>>,
    tx: broadcast::Sender<LogEvent>,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Mutex::new(Entries::default())),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.tx.subscribe()
    }

    pub fn append(&self, text: impl Into<String>, category: LogCategory) -> LogEntry {
        let text = text.into();
        let mut guard = self.inner.lock();
        // Wall clocks can step backwards; the log must not.
        let now = Utc::now();
        let timestamp = match guard.last_ts {
            Some(last) if last > now => last,
            _ => now,
        };
        let entry = LogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            category,
            text,
        };
        guard.last_ts = Some(timestamp);
        guard.items.push(entry.clone());
        // Sending under the lock keeps subscriber order identical to log order.
        let _ = self.tx.send(LogEvent::Appended(entry.clone()));
        drop(guard);

        tracing::info!(
            target: "simlab::activity",
            category = category.as_str(),
            "{}",
            entry.text
        );
        entry
    }

    pub fn clear(&self) {
        let mut guard = self.inner.lock();
        guard.items.clear();
        let _ = self.tx.send(LogEvent::Cleared);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.inner.lock().items.clone()
    }

    /// Entries appended after the given index, for incremental rendering.
    pub fn since(&self, offset: usize) -> Vec<LogEntry> {
        let guard = self.inner.lock();
        guard.items.iter().skip(offset).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    pub fn last(&self) -> Option<LogEntry> {
        self.inner.lock().items.last().cloned()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn preserves_append_order_with_non_decreasing_timestamps() {
        let log = ActivityLog::default();
        let categories = [
            LogCategory::SystemNotice,
            LogCategory::ProtocolDecode,
            LogCategory::VulnerabilityScan,
            LogCategory::ShellEcho,
        ];
        for i in 0..200 {
            log.append(format!("entry {i}"), categories[i % categories.len()]);
        }
        let entries = log.entries();
        assert_eq!(entries.len(), 200);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.text, format!("entry {i}"));
            assert_eq!(entry.category, categories[i % categories.len()]);
        }
        for pair in entries.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        let ids: HashSet<_> = entries.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids.len(), entries.len(), "ids must be unique");
    }

    #[test]
    fn clear_empties_everything_at_once() {
        let log = ActivityLog::default();
        log.append("one", LogCategory::SystemNotice);
        log.append("two", LogCategory::Success);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.last(), None);
        log.append("three", LogCategory::Success);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn since_returns_tail_only() {
        let log = ActivityLog::default();
        log.append("a", LogCategory::SystemNotice);
        log.append("b", LogCategory::SystemNotice);
        log.append("c", LogCategory::SystemNotice);
        let tail: Vec<_> = log.since(1).into_iter().map(|e| e.text).collect();
        assert_eq!(tail, vec!["b", "c"]);
        assert!(log.since(10).is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_appends_and_clears_in_order() {
        let log = ActivityLog::new(16);
        let mut rx = log.subscribe();
        log.append("first", LogCategory::ShellEcho);
        log.clear();
        log.append("second", LogCategory::ReceivedData);

        match rx.recv().await.expect("first event") {
            LogEvent::Appended(entry) => assert_eq!(entry.text, "first"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(rx.recv().await.expect("clear event"), LogEvent::Cleared);
        match rx.recv().await.expect("second event") {
            LogEvent::Appended(entry) => {
                assert_eq!(entry.text, "second");
                assert_eq!(entry.category, LogCategory::ReceivedData);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
