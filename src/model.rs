use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SCHEMA_VERSION: u32 = 1;

/// A repository discovered for analysis. Immutable for the rest of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    /// Local clone, when one exists. Online-discovered projects without a
    /// local clone keep `None` and are skipped during collection.
    pub path: Option<PathBuf>,
    pub web_url: Option<String>,
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStats {
    pub path: String,
    pub added_lines: u32,
    pub deleted_lines: u32,
}

/// A single commit as read from git history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    /// Branches whose traversal reached this commit.
    pub branches: Vec<String>,
    /// More than one parent. Counted for activity, no line deltas.
    pub is_merge: bool,
    pub files: Vec<FileStats>,
}

impl Commit {
    pub fn added_lines(&self) -> u64 {
        self.files.iter().map(|f| f.added_lines as u64).sum()
    }

    pub fn deleted_lines(&self) -> u64 {
        self.files.iter().map(|f| f.deleted_lines as u64).sum()
    }
}

/// Outcome of processing one repository, reported distinctly in the summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepoStatus {
    /// At least one commit in the requested range.
    Included { commit_count: usize },
    /// Valid repository, zero commits in range. Not an error.
    Inactive,
    /// Matched the configured exclusion set.
    Excluded,
    /// Collection failed; the run continued without it.
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoActivity {
    pub name: String,
    #[serde(flatten)]
    pub status: RepoStatus,
}

/// One consolidated author in serialized output, sorted by net lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRow {
    pub key: String,
    /// "email" for the canonical path, "name" for the fallback.
    pub fidelity: String,
    pub name: String,
    pub emails: Vec<String>,
    pub names: Vec<String>,
    pub commits: u64,
    pub added: u64,
    pub removed: u64,
    pub net: i64,
    pub active_days: u64,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub mode: String,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub repositories: Vec<RepoActivity>,
    pub authors: Vec<AuthorRow>,
}

/// Half-open interval: `since` inclusive, `until` exclusive. Comparisons are
/// done in UTC after offsets in commit metadata have been normalized.
#[derive(Debug, Clone)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if timestamp < &since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if timestamp >= &until {
                return false;
            }
        }
        true
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new()
    }
}
