//! The operation logger.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};
use warden_core::RiskLevel;

use crate::entry::{LogCategory, LogEntry, LogEntryId, LogLevel, LogStatus};
use crate::error::AuditResult;
use crate::filter::{ExportFormat, LogFilter};
use crate::subscriber::{LogCallback, SubscriberRegistry, Subscription};

/// Default ring buffer capacity.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Capacity of the notification broadcast channel.
const NOTIFICATION_CHANNEL_CAPACITY: usize = 1024;

/// A log entry published under a topic.
///
/// Every append publishes three notifications: `log`, `log:<level>` and
/// `log:<status>`.
#[derive(Debug, Clone)]
pub struct LogNotification {
    /// Topic name.
    pub topic: String,
    /// The appended entry.
    pub entry: Arc<LogEntry>,
}

/// Counts of retained entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    /// Number of entries retained.
    pub total: usize,
    /// Entries per level.
    pub by_level: BTreeMap<LogLevel, usize>,
    /// Entries per status.
    pub by_status: BTreeMap<LogStatus, usize>,
}

/// Append-only bounded operation log.
///
/// Clones share the same buffer, subscribers and notification channel.
#[derive(Debug, Clone)]
pub struct OperationLogger {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
    registry: Arc<SubscriberRegistry>,
    sender: broadcast::Sender<LogNotification>,
}

impl Default for OperationLogger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl OperationLogger {
    /// Create a logger retaining at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(4096)))),
            capacity,
            registry: Arc::new(SubscriberRegistry::new()),
            sender,
        }
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| {
            warn!("OperationLogger lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Append an entry, evicting the oldest on overflow, and fan it out.
    pub fn append(&self, entry: LogEntry) -> LogEntryId {
        let id = entry.id;
        emit_tracing(&entry);

        {
            let mut entries = self.lock();
            entries.push_back(entry.clone());
            while entries.len() > self.capacity {
                entries.pop_front();
            }
        }

        self.registry.notify(&entry);

        let entry = Arc::new(entry);
        let topics = [
            "log".to_string(),
            format!("log:{}", entry.level),
            format!("log:{}", entry.status),
        ];
        for topic in topics {
            let notification = LogNotification {
                topic,
                entry: Arc::clone(&entry),
            };
            if self.sender.send(notification).is_err() {
                trace!("No receivers for log notification");
                break;
            }
        }

        id
    }

    /// A tool call was received.
    pub fn log_tool_start(&self, tool: &str, params: &serde_json::Value) -> LogEntryId {
        self.append(
            LogEntry::new(
                LogLevel::Info,
                LogStatus::Started,
                LogCategory::Tool,
                "Tool call started",
                format!("{tool} requested"),
            )
            .with_tool(tool)
            .with_details(params.clone()),
        )
    }

    /// A tool call is waiting for a human decision.
    pub fn log_awaiting_approval(
        &self,
        tool: &str,
        request_id: &str,
        risk_level: RiskLevel,
        reason: &str,
    ) -> LogEntryId {
        self.append(
            LogEntry::new(
                LogLevel::Info,
                LogStatus::AwaitingApproval,
                LogCategory::Approval,
                "Awaiting approval",
                reason,
            )
            .with_tool(tool)
            .with_details(serde_json::json!({
                "request_id": request_id,
                "risk_level": risk_level,
            })),
        )
    }

    /// A tool call was approved.
    pub fn log_approval_granted(
        &self,
        tool: &str,
        reason: &str,
        auto_approved: bool,
    ) -> LogEntryId {
        let title = if auto_approved {
            "Auto-approved"
        } else {
            "Approval granted"
        };
        self.append(
            LogEntry::new(
                LogLevel::Info,
                LogStatus::Approved,
                LogCategory::Approval,
                title,
                reason,
            )
            .with_tool(tool)
            .with_details(serde_json::json!({ "auto_approved": auto_approved })),
        )
    }

    /// A tool call was refused.
    pub fn log_approval_denied(&self, tool: &str, reason: &str) -> LogEntryId {
        self.append(
            LogEntry::new(
                LogLevel::Warn,
                LogStatus::Denied,
                LogCategory::Approval,
                "Approval denied",
                reason,
            )
            .with_tool(tool),
        )
    }

    /// A tool call completed successfully.
    pub fn log_tool_success(
        &self,
        tool: &str,
        duration: Duration,
        details: Option<serde_json::Value>,
    ) -> LogEntryId {
        let mut entry = LogEntry::new(
            LogLevel::Info,
            LogStatus::Success,
            LogCategory::Tool,
            "Tool call succeeded",
            format!("{tool} completed"),
        )
        .with_tool(tool)
        .with_duration_ms(millis(duration));
        entry.details = details;
        self.append(entry)
    }

    /// A tool call failed.
    pub fn log_tool_error(
        &self,
        tool: &str,
        error: &str,
        duration: Option<Duration>,
    ) -> LogEntryId {
        let mut entry = LogEntry::new(
            LogLevel::Error,
            LogStatus::Error,
            LogCategory::Tool,
            "Tool call failed",
            error,
        )
        .with_tool(tool);
        entry.duration_ms = duration.map(millis);
        self.append(entry)
    }

    /// A runtime message unrelated to a specific call.
    pub fn log_system(&self, level: LogLevel, title: &str, message: &str) -> LogEntryId {
        self.append(LogEntry::new(
            level,
            LogStatus::Info,
            LogCategory::System,
            title,
            message,
        ))
    }

    /// A checkpoint was created or removed.
    pub fn log_checkpoint(
        &self,
        title: &str,
        message: &str,
        details: serde_json::Value,
    ) -> LogEntryId {
        self.append(
            LogEntry::new(
                LogLevel::Info,
                LogStatus::Info,
                LogCategory::Checkpoint,
                title,
                message,
            )
            .with_details(details),
        )
    }

    /// A rollback finished.
    pub fn log_rollback(
        &self,
        target: &str,
        success: bool,
        details: serde_json::Value,
    ) -> LogEntryId {
        let (level, status, title) = if success {
            (LogLevel::Info, LogStatus::Success, "Rollback completed")
        } else {
            (LogLevel::Error, LogStatus::Error, "Rollback failed")
        };
        self.append(
            LogEntry::new(
                level,
                status,
                LogCategory::Checkpoint,
                title,
                format!("rollback of {target}"),
            )
            .with_details(details),
        )
    }

    /// All retained entries, oldest first.
    #[must_use]
    pub fn get_logs(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// The `n` most recent entries, oldest first.
    #[must_use]
    pub fn get_recent(&self, n: usize) -> Vec<LogEntry> {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Entries matching every set field of `filter`, oldest first.
    #[must_use]
    pub fn get_filtered_logs(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.lock()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// Drop every retained entry.
    pub fn clear(&self) {
        let removed = {
            let mut entries = self.lock();
            let n = entries.len();
            entries.clear();
            n
        };
        debug!(removed, "Operation log cleared");
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Counts per level and per status.
    #[must_use]
    pub fn stats(&self) -> LogStats {
        let entries = self.lock();
        let mut stats = LogStats {
            total: entries.len(),
            ..LogStats::default()
        };
        for e in entries.iter() {
            let l = stats.by_level.entry(e.level).or_insert(0);
            *l = l.saturating_add(1);
            let s = stats.by_status.entry(e.status).or_insert(0);
            *s = s.saturating_add(1);
        }
        stats
    }

    /// Export all retained entries.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn export(&self, format: ExportFormat) -> AuditResult<String> {
        let entries = self.get_logs();
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&entries)?),
            ExportFormat::Text => Ok(entries
                .iter()
                .map(LogEntry::to_line)
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Register a callback invoked for every appended entry.
    pub fn subscribe(&self, callback: LogCallback) -> Subscription {
        let id = self.registry.register(callback);
        Subscription::new(id, &self.registry)
    }

    /// Number of callback subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Receive notifications whose topic equals `topic`, or starts with its
    /// prefix when it ends in `*`.
    #[must_use]
    pub fn subscribe_notifications(&self, topic: impl Into<String>) -> NotificationReceiver {
        NotificationReceiver {
            receiver: self.sender.subscribe(),
            topic_pattern: topic.into(),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn emit_tracing(entry: &LogEntry) {
    let tool = entry.tool.as_deref().unwrap_or("-");
    match entry.level {
        LogLevel::Debug => debug!(
            tool,
            status = %entry.status,
            category = %entry.category,
            detail = %entry.message,
            "{}",
            entry.title
        ),
        LogLevel::Info => info!(
            tool,
            status = %entry.status,
            category = %entry.category,
            detail = %entry.message,
            "{}",
            entry.title
        ),
        LogLevel::Warn => warn!(
            tool,
            status = %entry.status,
            category = %entry.category,
            detail = %entry.message,
            "{}",
            entry.title
        ),
        LogLevel::Error => error!(
            tool,
            status = %entry.status,
            category = %entry.category,
            detail = %entry.message,
            "{}",
            entry.title
        ),
    }
}

/// Topic-filtered receiver of [`LogNotification`]s.
pub struct NotificationReceiver {
    receiver: broadcast::Receiver<LogNotification>,
    topic_pattern: String,
}

impl NotificationReceiver {
    fn matches(&self, topic: &str) -> bool {
        match self.topic_pattern.strip_suffix('*') {
            Some(prefix) => topic.starts_with(prefix),
            None => topic == self.topic_pattern,
        }
    }

    /// Receive the next matching notification.
    ///
    /// Returns `None` once every logger clone has been dropped.
    pub async fn recv(&mut self) -> Option<LogNotification> {
        loop {
            match self.receiver.recv().await {
                Ok(n) => {
                    if self.matches(&n.topic) {
                        return Some(n);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Log receiver lagged, notifications dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive the next matching notification without waiting.
    pub fn try_recv(&mut self) -> Option<LogNotification> {
        loop {
            match self.receiver.try_recv() {
                Ok(n) => {
                    if self.matches(&n.topic) {
                        return Some(n);
                    }
                },
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Log receiver lagged, notifications dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}
