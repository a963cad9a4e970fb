//! Repository Source: enumerate repositories for one run.
//!
//! Offline mode scans the projects directory for cloned repositories; online
//! mode asks the GitLab API for the project listing and pairs each project
//! with its local clone when one exists.

use crate::config::{AnalysisMode, Config};
use crate::error::{GlactError, Result};
use crate::gitlab::GitLabClient;
use crate::model::Repository;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub fn list_repositories(config: &Config) -> Result<Vec<Repository>> {
    match config.mode {
        AnalysisMode::Offline => scan_projects_directory(config),
        AnalysisMode::Online => list_from_gitlab(config),
    }
}

/// Find every directory under the projects root that holds a git history.
fn scan_projects_directory(config: &Config) -> Result<Vec<Repository>> {
    let root = &config.projects_directory;
    if !root.is_dir() {
        return Err(GlactError::Discovery(format!(
            "Projects directory not found: {}",
            root.display()
        )));
    }

    let mut repos = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .max_depth(Some(4))
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| GlactError::Discovery(e.to_string()))?;
        let is_dir = entry.file_type().map_or(false, |t| t.is_dir());
        if !is_dir || entry.file_name() != ".git" {
            continue;
        }
        let Some(repo_dir) = entry.path().parent() else { continue };

        // Confirm it is an openable repository, not just a stray .git dir.
        if gix::discover(repo_dir).is_err() {
            debug!(path = %repo_dir.display(), "directory has .git but no valid history");
            continue;
        }

        repos.push(Repository {
            name: repo_name(repo_dir),
            path: Some(repo_dir.to_path_buf()),
            web_url: None,
            default_branch: None,
        });
    }

    repos.sort_by(|a, b| a.name.cmp(&b.name));
    info!(count = repos.len(), root = %root.display(), "discovered local repositories");
    Ok(repos)
}

/// List projects from the GitLab API and attach local clone paths where the
/// clone layout (`<projects>/<namespace>/<project>`) matches.
fn list_from_gitlab(config: &Config) -> Result<Vec<Repository>> {
    let client = GitLabClient::new(config)?;
    let projects = client.list_projects()?;
    info!(count = projects.len(), url = %config.gitlab_url, "listed GitLab projects");

    let mut repos: Vec<Repository> = projects
        .into_iter()
        .map(|p| {
            let local = local_clone_path(&config.projects_directory, &p.path_with_namespace);
            Repository {
                name: p.name,
                path: local,
                web_url: p.web_url,
                default_branch: p.default_branch,
            }
        })
        .collect();

    repos.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(repos)
}

fn local_clone_path(projects_dir: &Path, path_with_namespace: &str) -> Option<PathBuf> {
    let candidate = projects_dir.join(path_with_namespace);
    if candidate.join(".git").is_dir() {
        Some(candidate)
    } else {
        None
    }
}

fn repo_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
