//! Results returned by sync cycles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sync direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Remote to local.
    Pull,
    /// Local to remote.
    Push,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull => f.write_str("Pull"),
            Self::Push => f.write_str("Push"),
        }
    }
}

/// Per-cycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl SyncStats {
    /// Records that were created or updated.
    pub fn successful(&self) -> usize {
        self.created + self.updated
    }
}

/// Outcome of a single pull or push cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    pub stats: SyncStats,
}

impl SyncResult {
    /// A cycle that ran to completion.
    pub fn completed(message: impl Into<String>, stats: SyncStats) -> Self {
        Self {
            success: true,
            message: message.into(),
            stats,
        }
    }

    /// A cycle that aborted.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            stats: SyncStats::default(),
        }
    }

    /// Placeholder for a direction that is switched off inside `sync`.
    pub fn skipped_disabled(direction: Direction) -> Self {
        Self::failed(format!("{} skipped (disabled)", direction))
    }
}

/// Outcome of a combined pull-then-push invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// True if either direction succeeded.
    pub success: bool,
    /// Both messages, pull first.
    pub message: String,
    pub pull: SyncResult,
    pub push: SyncResult,
}

impl SyncReport {
    /// Combines the two directions.
    pub fn combine(pull: SyncResult, push: SyncResult) -> Self {
        Self {
            success: pull.success || push.success,
            message: format!("{}\n{}", pull.message, push.message),
            pull,
            push,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_counts_writes() {
        let stats = SyncStats {
            total: 5,
            created: 2,
            updated: 1,
            skipped: 2,
        };
        assert_eq!(stats.successful(), 3);
    }

    #[test]
    fn combined_success_if_either_side_succeeds() {
        let pull = SyncResult::skipped_disabled(Direction::Pull);
        let push = SyncResult::completed("Push completed", SyncStats::default());
        let report = SyncReport::combine(pull, push);
        assert!(report.success);
        assert_eq!(
            report.message,
            "Pull skipped (disabled)\nPush completed"
        );

        let report = SyncReport::combine(
            SyncResult::failed("boom"),
            SyncResult::skipped_disabled(Direction::Push),
        );
        assert!(!report.success);
        assert!(report.message.ends_with("Push skipped (disabled)"));
    }
}
