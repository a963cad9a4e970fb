use crate::cli::CommonArgs;
use crate::error::{GlactError, Result};
use clap::ValueEnum;
use console::style;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_GITLAB_URL: &str = "https://gitlab.example.com";
const DEFAULT_ANALYSIS_DAYS: u32 = 60;
const DEFAULT_PROJECTS_DIRECTORY: &str = "projects";
const DEFAULT_REPORTS_DIRECTORY: &str = "gitlab_reports";
const DEFAULT_CODE_FILE_EXTENSIONS: &str = ".py,.js,.java,.cpp,.c,.h,.cs,.php,.rb,.go,.rs,.ts,.jsx,.vue,.html,.css,.scss,.sql,.yaml,.yml,.json,.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Analyze already-cloned repositories under the projects directory.
    Offline,
    /// Also query the GitLab API for the project listing.
    Online,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Offline => "offline",
            AnalysisMode::Online => "online",
        }
    }
}

/// Effective configuration for one run. Built once from environment plus CLI
/// overrides and passed into each component explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: AnalysisMode,
    pub gitlab_url: String,
    pub gitlab_token: Option<String>,
    pub default_analysis_days: u32,
    pub projects_directory: PathBuf,
    pub reports_directory: PathBuf,
    pub exclude_repositories: Vec<String>,
    pub code_file_extensions: Vec<String>,
    pub default_authors: Vec<String>,
}

impl Config {
    /// Load from the environment, then apply CLI overrides.
    pub fn load(common: &CommonArgs) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(mode) = common.mode {
            config.mode = mode;
        }
        if let Some(dir) = &common.projects_dir {
            config.projects_directory = dir.clone();
        }
        if let Some(days) = common.days {
            config.default_analysis_days = days;
        }
        if !common.exclude.is_empty() {
            config.exclude_repositories = common.exclude.clone();
        }
        if !common.authors.is_empty() {
            config.default_authors = common.authors.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let mode = match env_var("ANALYSIS_MODE") {
            Some(raw) => match raw.to_lowercase().as_str() {
                "offline" => AnalysisMode::Offline,
                "online" => AnalysisMode::Online,
                other => {
                    return Err(GlactError::Config(format!(
                        "ANALYSIS_MODE must be 'online' or 'offline', got '{other}'"
                    )))
                }
            },
            None => AnalysisMode::Offline,
        };

        let default_analysis_days = match env_var("DEFAULT_ANALYSIS_DAYS") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                GlactError::Config(format!("DEFAULT_ANALYSIS_DAYS must be a number, got '{raw}'"))
            })?,
            None => DEFAULT_ANALYSIS_DAYS,
        };

        Ok(Self {
            mode,
            gitlab_url: env_var("GITLAB_URL").unwrap_or_else(|| DEFAULT_GITLAB_URL.to_string()),
            gitlab_token: env_var("GITLAB_TOKEN"),
            default_analysis_days,
            projects_directory: env_var("PROJECTS_DIRECTORY")
                .unwrap_or_else(|| DEFAULT_PROJECTS_DIRECTORY.to_string())
                .into(),
            reports_directory: env_var("REPORTS_DIRECTORY")
                .unwrap_or_else(|| DEFAULT_REPORTS_DIRECTORY.to_string())
                .into(),
            exclude_repositories: env_list("EXCLUDE_REPOSITORIES"),
            code_file_extensions: parse_extension_list(
                &env_var("CODE_FILE_EXTENSIONS")
                    .unwrap_or_else(|| DEFAULT_CODE_FILE_EXTENSIONS.to_string()),
            ),
            default_authors: env_list("DEFAULT_AUTHORS"),
        })
    }

    /// Fail fast before any work starts: online mode is unusable without
    /// credentials.
    fn validate(&self) -> Result<()> {
        if self.mode == AnalysisMode::Online {
            if self.gitlab_token.as_deref().map_or(true, str::is_empty) {
                return Err(GlactError::Config(
                    "GitLab token not found. Set GITLAB_TOKEN (personal access token with \
                     scopes: api, read_repository)"
                        .to_string(),
                ));
            }
            if self.gitlab_url.is_empty() {
                return Err(GlactError::Config("GITLAB_URL must not be empty".to_string()));
            }
        }
        Ok(())
    }

    pub fn should_exclude(&self, repo_name: &str) -> bool {
        self.exclude_repositories.iter().any(|r| r == repo_name)
    }

    pub fn is_code_file(&self, path: &str) -> bool {
        self.code_file_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }

    pub fn print_summary(&self) {
        println!("{}", style("glact configuration").bold());
        println!("{}", "─".repeat(50));
        println!("{:<25}: {}", "Mode", self.mode.as_str());
        println!("{:<25}: {}", "GitLab URL", self.gitlab_url);
        println!(
            "{:<25}: {}",
            "Token configured",
            if self.gitlab_token.is_some() { "yes" } else { "no" }
        );
        println!("{:<25}: {}", "Default analysis days", self.default_analysis_days);
        println!("{:<25}: {}", "Projects directory", self.projects_directory.display());
        println!("{:<25}: {}", "Reports directory", self.reports_directory.display());
        println!("{:<25}: {}", "Code file extensions", self.code_file_extensions.len());
        println!("{:<25}: {}", "Excluded repositories", self.exclude_repositories.len());
        if !self.exclude_repositories.is_empty() {
            println!("  {}", self.exclude_repositories.join(", "));
        }
        if !self.default_authors.is_empty() {
            println!("{:<25}: {}", "Author filter", self.default_authors.join(", "));
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_list(name: &str) -> Vec<String> {
    env_var(name).map(|raw| parse_comma_list(&raw)).unwrap_or_default()
}

fn parse_comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_extension_list(raw: &str) -> Vec<String> {
    parse_comma_list(raw)
        .into_iter()
        .map(|ext| if ext.starts_with('.') { ext } else { format!(".{ext}") })
        .collect()
}
