use assert_cmd::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn init_git_repo(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    assert!(Command::new("git")
        .args(["init"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["config", "core.autocrlf", "false"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["config", "user.email", "you@example.com"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["config", "user.name", "Your Name"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn commit_file_as(dir: &Path, name: &str, content: &str, author: &str, email: &str, date: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut f = File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.sync_all().unwrap();
    assert!(Command::new("git")
        .args(["add", "."])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["commit", "-m", &format!("add {name}")])
        .env("GIT_AUTHOR_NAME", author)
        .env("GIT_AUTHOR_EMAIL", email)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_NAME", author)
        .env("GIT_COMMITTER_EMAIL", email)
        .env("GIT_COMMITTER_DATE", date)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn glact() -> Command {
    let mut cmd = Command::cargo_bin("glact").unwrap();
    // Keep host environment out of the configuration layer.
    cmd.env_remove("ANALYSIS_MODE")
        .env_remove("GITLAB_TOKEN")
        .env_remove("GITLAB_URL")
        .env_remove("PROJECTS_DIRECTORY")
        .env_remove("EXCLUDE_REPOSITORIES")
        .env_remove("DEFAULT_AUTHORS")
        .env_remove("CODE_FILE_EXTENSIONS")
        .env_remove("DEFAULT_ANALYSIS_DAYS");
    cmd
}

#[test]
fn analyze_json_consolidates_email_case_variants() {
    if !has_git() {
        return;
    }
    let root = tempdir().unwrap();
    let repo = root.path().join("alpha");
    init_git_repo(&repo);
    commit_file_as(
        &repo,
        "src/a.rs",
        "fn a(){}\n",
        "Alice",
        "A@x.com",
        "2024-05-01T10:00:00 +0000",
    );
    commit_file_as(
        &repo,
        "src/b.rs",
        "fn b(){}\n",
        "Alice Smith",
        "a@x.com ",
        "2024-05-02T10:00:00 +0000",
    );

    let mut cmd = glact();
    cmd.arg("--projects-dir")
        .arg(root.path())
        .args(["--since", "2024-04-25", "--until", "2024-05-25"])
        .args(["analyze", "--json"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();

    let authors = v["authors"].as_array().unwrap();
    assert_eq!(authors.len(), 1, "case/whitespace variants must merge");
    assert_eq!(authors[0]["key"], "a@x.com");
    assert_eq!(authors[0]["commits"], 2);
    assert_eq!(authors[0]["name"], "Alice", "first-seen name by earliest commit");

    let repos = v["repositories"].as_array().unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0]["status"], "included");
    assert_eq!(repos[0]["commit_count"], 2);
}

#[test]
fn repo_without_commits_in_range_is_inactive_not_an_error() {
    if !has_git() {
        return;
    }
    let root = tempdir().unwrap();
    let repo = root.path().join("dormant");
    init_git_repo(&repo);
    commit_file_as(
        &repo,
        "old.py",
        "print('old')\n",
        "Old Author",
        "old@x.com",
        "2020-01-15T10:00:00 +0000",
    );

    let mut cmd = glact();
    cmd.arg("--projects-dir")
        .arg(root.path())
        .args(["--since", "2024-04-25", "--until", "2024-05-25"])
        .args(["analyze", "--json"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(v["repositories"][0]["status"], "inactive");
    assert!(v["authors"].as_array().unwrap().is_empty());
}

#[test]
fn range_boundaries_are_half_open() {
    if !has_git() {
        return;
    }
    let root = tempdir().unwrap();
    let repo = root.path().join("edges");
    init_git_repo(&repo);
    // Exactly at since: included.
    commit_file_as(
        &repo,
        "a.rs",
        "fn a(){}\n",
        "Edge",
        "edge@x.com",
        "2024-04-25T00:00:00 +0000",
    );
    // Exactly at until: excluded.
    commit_file_as(
        &repo,
        "b.rs",
        "fn b(){}\n",
        "Edge",
        "edge@x.com",
        "2024-05-25T00:00:00 +0000",
    );

    let mut cmd = glact();
    cmd.arg("--projects-dir")
        .arg(root.path())
        .args(["--since", "2024-04-25", "--until", "2024-05-25"])
        .args(["analyze", "--json"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(v["authors"][0]["commits"], 1);
}

#[test]
fn merge_commits_count_for_presence_without_line_deltas() {
    if !has_git() {
        return;
    }
    let root = tempdir().unwrap();
    let repo = root.path().join("merger");
    init_git_repo(&repo);
    let date = "2024-05-02T10:00:00 +0000";

    commit_file_as(&repo, "base.rs", "fn base(){}\n", "Dev", "dev@x.com", date);
    assert!(Command::new("git")
        .args(["checkout", "-b", "feat"])
        .current_dir(&repo)
        .status()
        .unwrap()
        .success());
    commit_file_as(&repo, "feat.rs", "fn feat(){}\n", "Dev", "dev@x.com", date);
    assert!(Command::new("git")
        .args(["checkout", "-"])
        .current_dir(&repo)
        .status()
        .unwrap()
        .success());
    commit_file_as(&repo, "main.rs", "fn main(){}\n", "Dev", "dev@x.com", date);
    assert!(Command::new("git")
        .args(["merge", "--no-ff", "feat", "-m", "merge feat"])
        .env("GIT_AUTHOR_NAME", "Dev")
        .env("GIT_AUTHOR_EMAIL", "dev@x.com")
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_NAME", "Dev")
        .env("GIT_COMMITTER_EMAIL", "dev@x.com")
        .env("GIT_COMMITTER_DATE", date)
        .current_dir(&repo)
        .status()
        .unwrap()
        .success());

    let mut cmd = glact();
    cmd.arg("--projects-dir")
        .arg(root.path())
        .args(["--since", "2024-04-25", "--until", "2024-05-25"])
        .args(["analyze", "--json"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();

    // 3 regular commits + 1 merge commit, each file one line added.
    assert_eq!(v["authors"][0]["commits"], 4);
    assert_eq!(v["authors"][0]["added"], 3);
}

#[test]
fn excluded_repositories_are_reported_distinctly() {
    if !has_git() {
        return;
    }
    let root = tempdir().unwrap();
    let kept = root.path().join("kept");
    let legacy = root.path().join("legacy");
    init_git_repo(&kept);
    init_git_repo(&legacy);
    let date = "2024-05-02T10:00:00 +0000";
    commit_file_as(&kept, "a.rs", "fn a(){}\n", "Dev", "dev@x.com", date);
    commit_file_as(&legacy, "b.rs", "fn b(){}\n", "Dev", "dev@x.com", date);

    let mut cmd = glact();
    cmd.arg("--projects-dir")
        .arg(root.path())
        .args(["--exclude", "legacy"])
        .args(["--since", "2024-04-25", "--until", "2024-05-25"])
        .args(["analyze", "--json"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();

    let statuses: Vec<(String, String)> = v["repositories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r["name"].as_str().unwrap().to_string(),
                r["status"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert!(statuses.contains(&("kept".to_string(), "included".to_string())));
    assert!(statuses.contains(&("legacy".to_string(), "excluded".to_string())));
    assert_eq!(v["authors"][0]["commits"], 1, "excluded repo contributes nothing");
}

#[test]
fn missing_projects_directory_aborts_the_run() {
    let root = tempdir().unwrap();
    let missing = root.path().join("does-not-exist");

    let mut cmd = glact();
    cmd.arg("--projects-dir").arg(&missing).args(["analyze", "--json"]);
    cmd.assert().failure();
}

#[test]
fn online_mode_without_token_fails_fast() {
    let root = tempdir().unwrap();

    let mut cmd = glact();
    cmd.arg("--projects-dir")
        .arg(root.path())
        .args(["--mode", "online", "analyze", "--json"]);
    let assert = cmd.assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("GITLAB_TOKEN") || stderr.contains("token"));
}

#[test]
fn non_code_files_do_not_contribute_lines() {
    if !has_git() {
        return;
    }
    let root = tempdir().unwrap();
    let repo = root.path().join("mixed");
    init_git_repo(&repo);
    let date = "2024-05-02T10:00:00 +0000";
    commit_file_as(&repo, "a.rs", "fn a(){}\nfn b(){}\n", "Dev", "dev@x.com", date);
    commit_file_as(&repo, "README.md", "docs\nmore docs\n", "Dev", "dev@x.com", date);

    let mut cmd = glact();
    cmd.arg("--projects-dir")
        .arg(root.path())
        .args(["--since", "2024-04-25", "--until", "2024-05-25"])
        .args(["analyze", "--json"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();

    // Both commits count; only the .rs lines do.
    assert_eq!(v["authors"][0]["commits"], 2);
    assert_eq!(v["authors"][0]["added"], 2);
}

#[test]
fn repos_command_lists_discovered_repositories() {
    if !has_git() {
        return;
    }
    let root = tempdir().unwrap();
    init_git_repo(&root.path().join("one"));
    init_git_repo(&root.path().join("two"));

    let mut cmd = glact();
    cmd.arg("--projects-dir")
        .arg(root.path())
        .args(["repos", "--json"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let names: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["one", "two"]);
}

#[test]
fn csv_output_has_expected_header() {
    if !has_git() {
        return;
    }
    let root = tempdir().unwrap();
    let repo = root.path().join("csvrepo");
    init_git_repo(&repo);
    commit_file_as(
        &repo,
        "a.rs",
        "fn a(){}\n",
        "Dev",
        "dev@x.com",
        "2024-05-02T10:00:00 +0000",
    );

    let mut cmd = glact();
    cmd.arg("--projects-dir")
        .arg(root.path())
        .args(["--since", "2024-04-25", "--until", "2024-05-25"])
        .args(["analyze", "--csv"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("key,fidelity,name,added,removed,net,commits,active_days"));
    assert!(text.contains("dev@x.com"));
}

#[test]
fn out_dir_receives_text_and_csv_reports() {
    if !has_git() {
        return;
    }
    let root = tempdir().unwrap();
    let repo = root.path().join("reports");
    init_git_repo(&repo);
    commit_file_as(
        &repo,
        "a.rs",
        "fn a(){}\n",
        "Dev",
        "dev@x.com",
        "2024-05-02T10:00:00 +0000",
    );
    let out_dir = root.path().join("gitlab_reports");

    let mut cmd = glact();
    cmd.arg("--projects-dir")
        .arg(root.path().join("reports").parent().unwrap())
        .args(["--since", "2024-04-25", "--until", "2024-05-25"])
        .args(["analyze", "--json", "--out"])
        .arg(&out_dir);
    cmd.assert().success();

    let run_dir = fs::read_dir(&out_dir).unwrap().next().unwrap().unwrap().path();
    let files: Vec<String> = fs::read_dir(&run_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert!(files.iter().any(|f| f.ends_with(".txt")));
    assert!(files.iter().any(|f| f.ends_with(".csv")));
}
