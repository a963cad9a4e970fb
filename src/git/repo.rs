use crate::config::Config;
use crate::error::{GlactError, Result};
use crate::model::{Commit, DateRange, FileStats};
use chrono::DateTime;
use gix::{discover, ObjectId, Repository};
use gix::object::tree::diff::ChangeDetached;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open a repository at `path`. Read-only for the entire run.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = discover(path.as_ref())?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Walk history from every local branch tip and collect commits inside
    /// the half-open range. Commits reachable from multiple branches are
    /// de-duplicated by hash; merge commits are kept for activity presence
    /// but carry no file stats.
    pub fn collect_commits(&self, range: &DateRange, config: &Config) -> Result<Vec<Commit>> {
        let tips = self.branch_tips()?;
        if tips.is_empty() {
            // Unborn HEAD or no refs: zero commits, not an error.
            return Ok(Vec::new());
        }

        let mut commits: Vec<Commit> = Vec::new();
        let mut index: HashMap<ObjectId, usize> = HashMap::new();
        let mut seen: HashSet<ObjectId> = HashSet::new();

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Collecting commits in {}", self.path.display()));

        for (branch, tip) in &tips {
            let mut stack: VecDeque<ObjectId> = VecDeque::from([*tip]);

            while let Some(commit_id) = stack.pop_back() {
                if !seen.insert(commit_id) {
                    // Already walked from another branch; just record the
                    // extra membership on the collected commit, if any.
                    if let Some(&i) = index.get(&commit_id) {
                        if !commits[i].branches.contains(branch) {
                            commits[i].branches.push(branch.clone());
                        }
                    }
                    continue;
                }

                let commit = self.repo.find_commit(commit_id)?;
                let secs = commit.time()?.seconds;
                let timestamp = DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| GlactError::InvalidDate(format!("Invalid timestamp: {secs}")))?;

                let parents: Vec<ObjectId> = commit.parent_ids().map(|id| id.into()).collect();

                for pid in &parents {
                    stack.push_back(*pid);
                }

                // History is not strictly sorted; keep walking through
                // out-of-range commits to reach older in-range ones.
                if !range.contains(&timestamp) {
                    continue;
                }

                let is_merge = parents.len() > 1;
                let files = if is_merge {
                    Vec::new()
                } else if let Some(parent_id) = parents.first() {
                    self.diff_stats(commit_id, Some(*parent_id), config)?
                } else {
                    self.diff_stats(commit_id, None, config)?
                };

                let author = commit.author()?;
                index.insert(commit_id, commits.len());
                commits.push(Commit {
                    id: commit_id.to_string(),
                    author_name: author.name.to_string(),
                    author_email: author.email.to_string(),
                    timestamp,
                    branches: vec![branch.clone()],
                    is_merge,
                    files,
                });

                pb.inc(1);
            }
        }

        pb.finish_and_clear();
        Ok(commits)
    }

    /// Local branch tips, falling back to HEAD when the repository has no
    /// local branch refs (detached checkouts).
    fn branch_tips(&self) -> Result<Vec<(String, ObjectId)>> {
        let mut tips = Vec::new();

        let refs = self
            .repo
            .references()
            .map_err(|e| GlactError::GitRepo(e.to_string()))?;
        let branches = refs
            .local_branches()
            .map_err(|e| GlactError::GitRepo(e.to_string()))?;

        for reference in branches {
            let mut reference = reference.map_err(|e| GlactError::GitRepo(e.to_string()))?;
            let name = reference.name().shorten().to_string();
            let id = reference
                .peel_to_id_in_place()
                .map_err(|e| GlactError::GitRepo(e.to_string()))?;
            tips.push((name, id.detach()));
        }

        if tips.is_empty() {
            if let Ok(mut head) = self.repo.head() {
                if let Ok(head_commit) = head.peel_to_commit_in_place() {
                    tips.push(("HEAD".to_string(), head_commit.id));
                }
            }
        }

        Ok(tips)
    }

    fn diff_stats(
        &self,
        commit_id: ObjectId,
        parent_id: Option<ObjectId>,
        config: &Config,
    ) -> Result<Vec<FileStats>> {
        let commit_tree = self.repo.find_commit(commit_id)?.tree()?;
        let parent_tree = match parent_id {
            Some(pid) => Some(self.repo.find_commit(pid)?.tree()?),
            None => None,
        };

        let changes: Vec<ChangeDetached> =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), None)?;

        let mut files = Vec::new();
        for change in changes {
            self.handle_change(change, config, &mut files)?;
        }
        Ok(files)
    }

    fn handle_change(
        &self,
        change: ChangeDetached,
        config: &Config,
        files: &mut Vec<FileStats>,
    ) -> Result<()> {
        match change {
            ChangeDetached::Addition { id, location, .. } => {
                let path = location.to_string();
                if !config.is_code_file(&path) {
                    return Ok(());
                }
                if let Ok(obj) = self.repo.find_object(id) {
                    if !is_binary_object(&obj) {
                        files.push(FileStats {
                            path,
                            added_lines: count_lines(&obj),
                            deleted_lines: 0,
                        });
                    }
                }
            }
            ChangeDetached::Deletion { id, location, .. } => {
                let path = location.to_string();
                if !config.is_code_file(&path) {
                    return Ok(());
                }
                if let Ok(obj) = self.repo.find_object(id) {
                    if !is_binary_object(&obj) {
                        files.push(FileStats {
                            path,
                            added_lines: 0,
                            deleted_lines: count_lines(&obj),
                        });
                    }
                }
            }
            ChangeDetached::Modification {
                previous_id,
                id,
                location,
                ..
            } => {
                let path = location.to_string();
                if !config.is_code_file(&path) {
                    return Ok(());
                }
                if let (Ok(old_obj), Ok(new_obj)) =
                    (self.repo.find_object(previous_id), self.repo.find_object(id))
                {
                    if !is_binary_object(&old_obj) && !is_binary_object(&new_obj) {
                        let (added, deleted) = compute_line_diff(&old_obj, &new_obj);
                        files.push(FileStats {
                            path,
                            added_lines: added,
                            deleted_lines: deleted,
                        });
                    }
                }
            }
            ChangeDetached::Rewrite {
                source_id,
                id,
                source_location,
                location,
                copy,
                ..
            } => {
                let source_path = source_location.to_string();
                let path = location.to_string();
                if !config.is_code_file(&path) && !config.is_code_file(&source_path) {
                    return Ok(());
                }
                if let (Ok(old_obj), Ok(new_obj)) =
                    (self.repo.find_object(source_id), self.repo.find_object(id))
                {
                    if !is_binary_object(&old_obj) && !is_binary_object(&new_obj) {
                        let (added, deleted) = compute_line_diff(&old_obj, &new_obj);

                        if config.is_code_file(&source_path) {
                            files.push(FileStats {
                                path: source_path,
                                added_lines: 0,
                                deleted_lines: if copy { 0 } else { deleted },
                            });
                        }
                        if config.is_code_file(&path) {
                            files.push(FileStats {
                                path,
                                added_lines: if copy { added } else { 0 },
                                deleted_lines: 0,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn is_binary_object(object: &gix::Object) -> bool {
    object.data.as_slice().iter().take(8192).any(|&b| b == 0)
}

fn count_lines(object: &gix::Object) -> u32 {
    std::str::from_utf8(object.data.as_slice())
        .map(|t| t.lines().count() as u32)
        .unwrap_or(0)
}

fn compute_line_diff(old_object: &gix::Object, new_object: &gix::Object) -> (u32, u32) {
    let old_text = std::str::from_utf8(old_object.data.as_slice()).unwrap_or("");
    let new_text = std::str::from_utf8(new_object.data.as_slice()).unwrap_or("");

    let old_lines: Vec<&str> = old_text.lines().collect();
    let new_lines: Vec<&str> = new_text.lines().collect();

    let mut added = 0usize;
    let mut deleted = 0usize;
    let (mut oi, mut ni) = (0usize, 0usize);

    while oi < old_lines.len() || ni < new_lines.len() {
        if oi >= old_lines.len() {
            added += new_lines.len() - ni;
            break;
        }
        if ni >= new_lines.len() {
            deleted += old_lines.len() - oi;
            break;
        }

        if old_lines[oi] == new_lines[ni] {
            oi += 1;
            ni += 1;
            continue;
        }

        let mut found = false;
        for look_ahead in 1..=3 {
            if oi + look_ahead < old_lines.len() && old_lines[oi + look_ahead] == new_lines[ni] {
                deleted += look_ahead;
                oi += look_ahead;
                found = true;
                break;
            }
            if ni + look_ahead < new_lines.len() && old_lines[oi] == new_lines[ni + look_ahead] {
                added += look_ahead;
                ni += look_ahead;
                found = true;
                break;
            }
        }

        if !found {
            deleted += 1;
            added += 1;
            oi += 1;
            ni += 1;
        }
    }

    (added as u32, deleted as u32)
}
