use crate::cli::{AnalyzeArgs, CommonArgs};
use crate::config::Config;
use crate::consolidate::{author_rows, consolidate};
use crate::dates::resolve_range;
use crate::discover;
use crate::error::Result;
use crate::git::GitRepo;
use crate::model::{
    ActivityOutput, AuthorRow, Commit, DateRange, RepoActivity, RepoStatus, SCHEMA_VERSION,
};
use anyhow::Context;
use chrono::Utc;
use console::style;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{info, warn};

pub fn exec(common: CommonArgs, args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = Config::load(&common).context("Failed to load configuration")?;

    let range = resolve_range(
        common.since.as_deref(),
        common.until.as_deref(),
        config.default_analysis_days,
    )
    .context("Failed to resolve date range")?;

    // Discovery failures are fatal: nothing has been written yet.
    let repositories =
        discover::list_repositories(&config).context("Failed to discover repositories")?;

    let (activity, commits) = collect_all(&repositories, &range, &config);

    let filtered = filter_by_authors(commits, &config.default_authors);
    let authors = author_rows(&consolidate(&filtered));

    let output = ActivityOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        mode: config.mode.as_str().to_string(),
        since: range.since,
        until: range.until,
        repositories: activity,
        authors,
    };

    if let Some(dir) = &args.out {
        write_reports(&output, dir).context("Failed to write report files")?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if args.ndjson {
        for row in &output.authors {
            println!("{}", serde_json::to_string(row)?);
        }
    } else if args.csv {
        print!("{}", render_csv(&output.authors));
    } else {
        print_table(&output);
    }

    Ok(())
}

/// Process repositories one at a time. A collection failure marks the
/// repository skipped and the run continues; only discovery is fatal.
fn collect_all(
    repositories: &[crate::model::Repository],
    range: &DateRange,
    config: &Config,
) -> (Vec<RepoActivity>, Vec<Commit>) {
    let mut activity = Vec::with_capacity(repositories.len());
    let mut all_commits = Vec::new();

    for repo in repositories {
        if config.should_exclude(&repo.name) {
            activity.push(RepoActivity {
                name: repo.name.clone(),
                status: RepoStatus::Excluded,
            });
            continue;
        }

        let Some(path) = &repo.path else {
            activity.push(RepoActivity {
                name: repo.name.clone(),
                status: RepoStatus::Skipped {
                    reason: "no local clone".to_string(),
                },
            });
            continue;
        };

        let status = match collect_one(&repo.name, path, range, config) {
            Ok(commits) if commits.is_empty() => RepoStatus::Inactive,
            Ok(commits) => {
                info!(repo = %repo.name, commits = commits.len(), "collected");
                let status = RepoStatus::Included {
                    commit_count: commits.len(),
                };
                all_commits.extend(commits);
                status
            }
            Err(e) => {
                warn!(repo = %repo.name, error = %e, "collection failed, skipping");
                RepoStatus::Skipped {
                    reason: e.to_string(),
                }
            }
        };
        activity.push(RepoActivity {
            name: repo.name.clone(),
            status,
        });
    }

    (activity, all_commits)
}

fn collect_one(
    name: &str,
    path: &Path,
    range: &DateRange,
    config: &Config,
) -> Result<Vec<Commit>> {
    let wrap = |e: crate::error::GlactError| crate::error::GlactError::Collection {
        repo: name.to_string(),
        reason: e.to_string(),
    };
    let repo = GitRepo::open(path).map_err(wrap)?;
    repo.collect_commits(range, config).map_err(wrap)
}

/// Substring match on author name or email, case-insensitive. An empty
/// filter list keeps everything.
fn filter_by_authors(commits: Vec<Commit>, filters: &[String]) -> Vec<Commit> {
    if filters.is_empty() {
        return commits;
    }
    let needles: Vec<String> = filters.iter().map(|f| f.to_lowercase()).collect();
    commits
        .into_iter()
        .filter(|c| {
            let name = c.author_name.to_lowercase();
            let email = c.author_email.to_lowercase();
            needles.iter().any(|n| name.contains(n) || email.contains(n))
        })
        .collect()
}

fn print_table(output: &ActivityOutput) {
    println!(
        "{:<38} {:>8} {:>8} {:>8} {:>7} {:>9}",
        style("Author").bold(),
        style("Added").bold(),
        style("Removed").bold(),
        style("Net").bold(),
        style("Commits").bold(),
        style("Act.Days").bold()
    );
    println!("{}", "─".repeat(84));
    for row in &output.authors {
        let display = truncate_display(&format!("{} ({})", row.name, row.key), 38);
        println!(
            "{:<38} {:>8} {:>8} {:>8} {:>7} {:>9}",
            display, row.added, row.removed, row.net, row.commits, row.active_days
        );
    }

    let total_commits: u64 = output.authors.iter().map(|a| a.commits).sum();
    let total_added: u64 = output.authors.iter().map(|a| a.added).sum();
    let total_removed: u64 = output.authors.iter().map(|a| a.removed).sum();

    println!();
    println!("{}", style("Summary").bold());
    println!("Authors: {}", style(output.authors.len()).cyan());
    println!("Commits: {}", style(total_commits).cyan());
    println!("Lines added: {}", style(total_added).green());
    println!("Lines removed: {}", style(total_removed).red());

    print_repo_summary(&output.repositories);
}

fn print_repo_summary(repositories: &[RepoActivity]) {
    let mut included = Vec::new();
    let mut inactive = Vec::new();
    let mut excluded = Vec::new();
    let mut skipped = Vec::new();

    for repo in repositories {
        match &repo.status {
            RepoStatus::Included { commit_count } => {
                included.push(format!("{} ({} commits)", repo.name, commit_count))
            }
            RepoStatus::Inactive => inactive.push(repo.name.clone()),
            RepoStatus::Excluded => excluded.push(repo.name.clone()),
            RepoStatus::Skipped { reason } => {
                skipped.push(format!("{} ({})", repo.name, reason))
            }
        }
    }

    println!();
    println!("{}", style("Repositories").bold());
    println!("Included ({}): {}", included.len(), included.join(", "));
    if !inactive.is_empty() {
        println!("Inactive ({}): {}", inactive.len(), inactive.join(", "));
    }
    if !excluded.is_empty() {
        println!("Excluded ({}): {}", excluded.len(), excluded.join(", "));
    }
    if !skipped.is_empty() {
        println!(
            "{} ({}): {}",
            style("Skipped").yellow(),
            skipped.len(),
            skipped.join(", ")
        );
    }
}

fn truncate_display(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(width.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_csv(authors: &[AuthorRow]) -> String {
    let mut out = String::from(
        "key,fidelity,name,added,removed,net,commits,active_days,first_commit,last_commit\n",
    );
    for row in authors {
        let first = row
            .first_commit
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let last = row.last_commit.map(|t| t.to_rfc3339()).unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            csv_field(&row.key),
            row.fidelity,
            csv_field(&row.name),
            row.added,
            row.removed,
            row.net,
            row.commits,
            row.active_days,
            first,
            last
        );
    }
    out
}

/// Plain-text report for files, formatted the way the console table is but
/// without styling, plus the run header.
fn render_text_report(output: &ActivityOutput) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Git Repository Activity Report (Email-Consolidated)");
    let _ = writeln!(out, "{}", "=".repeat(84));
    let _ = writeln!(out, "Generated on: {}", output.generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(
        out,
        "Analysis period: {} to {}",
        output
            .since
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "beginning".to_string()),
        output
            .until
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "now".to_string()),
    );
    let _ = writeln!(out, "Mode: {}", output.mode);
    let _ = writeln!(out, "Note: merge commits counted for activity, excluded from line totals");
    let _ = writeln!(out, "{}", "=".repeat(84));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<38} {:>8} {:>8} {:>8} {:>7} {:>9}",
        "Author (key)", "Added", "Removed", "Net", "Commits", "Act.Days"
    );
    let _ = writeln!(out, "{}", "-".repeat(84));
    for row in &output.authors {
        let display = truncate_display(&format!("{} ({})", row.name, row.key), 38);
        let _ = writeln!(
            out,
            "{:<38} {:>8} {:>8} {:>8} {:>7} {:>9}",
            display, row.added, row.removed, row.net, row.commits, row.active_days
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Repositories:");
    for repo in &output.repositories {
        let status = match &repo.status {
            RepoStatus::Included { commit_count } => format!("included, {commit_count} commits"),
            RepoStatus::Inactive => "inactive".to_string(),
            RepoStatus::Excluded => "excluded".to_string(),
            RepoStatus::Skipped { reason } => format!("skipped: {reason}"),
        };
        let _ = writeln!(out, "  {:<30} {status}", repo.name);
    }
    out
}

/// Write a timestamped text + CSV report pair under the output directory,
/// mirroring the `analysis_<timestamp>/` layout of the original reports.
fn write_reports(output: &ActivityOutput, dir: &Path) -> Result<()> {
    let stamp = output.generated_at.format("%Y%m%d_%H%M%S");
    let run_dir = dir.join(format!("analysis_{stamp}"));
    std::fs::create_dir_all(&run_dir)?;

    let text_path = run_dir.join(format!("activity_report_{stamp}.txt"));
    let csv_path = run_dir.join(format!("activity_report_{stamp}.csv"));
    std::fs::write(&text_path, render_text_report(output))?;
    std::fs::write(&csv_path, render_csv(&output.authors))?;

    eprintln!("Reports saved to: {}", run_dir.display());
    Ok(())
}
