//! Author identity consolidation.
//!
//! Commits are folded into per-author aggregates keyed by a canonical
//! identity. The fold is commutative and associative: any permutation of the
//! same commit set produces identical stats.

use crate::model::{AuthorRow, Commit};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Canonical author key. The email path trims whitespace and lower-cases; the
/// name fallback is used only when a commit carries no email and is lower
/// fidelity (display names collide more easily than addresses).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuthorKey {
    ByEmail(String),
    ByNameFallback(String),
}

impl AuthorKey {
    pub fn from_commit(raw_email: &str, raw_name: &str) -> Self {
        let email = raw_email.trim();
        if email.is_empty() {
            AuthorKey::ByNameFallback(raw_name.trim().to_string())
        } else {
            AuthorKey::ByEmail(email.to_lowercase())
        }
    }

    pub fn fidelity(&self) -> &'static str {
        match self {
            AuthorKey::ByEmail(_) => "email",
            AuthorKey::ByNameFallback(_) => "name",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuthorKey::ByEmail(k) | AuthorKey::ByNameFallback(k) => k,
        }
    }
}

/// Per-author aggregate. Mutated incrementally as commits fold in.
#[derive(Debug, Clone, Default)]
pub struct AuthorStats {
    display_name: Option<(DateTime<Utc>, String)>,
    pub raw_emails: BTreeSet<String>,
    pub raw_names: BTreeSet<String>,
    pub commit_count: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub active_days: BTreeSet<NaiveDate>,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
}

impl AuthorStats {
    /// Display name is first-seen by earliest commit timestamp; ties break on
    /// the lexicographically smaller name so the result stays order
    /// independent.
    pub fn display_name(&self) -> &str {
        self.display_name.as_ref().map(|(_, n)| n.as_str()).unwrap_or("")
    }

    pub fn net_lines(&self) -> i64 {
        self.lines_added as i64 - self.lines_removed as i64
    }

    fn fold(&mut self, commit: &Commit) {
        let name = commit.author_name.trim().to_string();
        let candidate = (commit.timestamp, name.clone());
        match &self.display_name {
            Some(current) if *current <= candidate => {}
            _ => self.display_name = Some(candidate),
        }

        if !name.is_empty() {
            self.raw_names.insert(name);
        }
        let email = commit.author_email.trim();
        if !email.is_empty() {
            self.raw_emails.insert(email.to_string());
        }

        self.commit_count += 1;
        self.active_days.insert(commit.timestamp.date_naive());

        if !commit.is_merge {
            self.lines_added += commit.added_lines();
            self.lines_removed += commit.deleted_lines();
        }

        if self.first_commit.map_or(true, |t| commit.timestamp < t) {
            self.first_commit = Some(commit.timestamp);
        }
        if self.last_commit.map_or(true, |t| commit.timestamp > t) {
            self.last_commit = Some(commit.timestamp);
        }
    }
}

/// Fold commits into per-author aggregates. Order independent and idempotent
/// for a fixed commit set; safe to rerun.
pub fn consolidate<'a, I>(commits: I) -> BTreeMap<AuthorKey, AuthorStats>
where
    I: IntoIterator<Item = &'a Commit>,
{
    let mut stats: BTreeMap<AuthorKey, AuthorStats> = BTreeMap::new();
    for commit in commits {
        let key = AuthorKey::from_commit(&commit.author_email, &commit.author_name);
        stats.entry(key).or_default().fold(commit);
    }
    stats
}

/// Flatten aggregates into serializable rows, sorted by net lines descending
/// the way the original reports rank authors.
pub fn author_rows(stats: &BTreeMap<AuthorKey, AuthorStats>) -> Vec<AuthorRow> {
    let mut rows: Vec<AuthorRow> = stats
        .iter()
        .map(|(key, s)| AuthorRow {
            key: key.as_str().to_string(),
            fidelity: key.fidelity().to_string(),
            name: s.display_name().to_string(),
            emails: s.raw_emails.iter().cloned().collect(),
            names: s.raw_names.iter().cloned().collect(),
            commits: s.commit_count,
            added: s.lines_added,
            removed: s.lines_removed,
            net: s.net_lines(),
            active_days: s.active_days.len() as u64,
            first_commit: s.first_commit,
            last_commit: s.last_commit,
        })
        .collect();
    rows.sort_by(|a, b| b.net.cmp(&a.net).then_with(|| a.key.cmp(&b.key)));
    rows
}
