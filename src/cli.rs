use crate::config::AnalysisMode;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "glact")]
#[command(about = "GitLab and local git activity aggregation with author consolidation")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, value_enum, help = "Analysis mode (overrides ANALYSIS_MODE)")]
    pub mode: Option<AnalysisMode>,

    #[arg(long, help = "Directory holding cloned repositories (overrides PROJECTS_DIRECTORY)")]
    pub projects_dir: Option<PathBuf>,

    #[arg(long, help = "Start of range, inclusive (RFC3339, YYYY-MM-DD, or duration like '30d')")]
    pub since: Option<String>,

    #[arg(long, help = "End of range, exclusive (RFC3339, YYYY-MM-DD, or duration like '30d')")]
    pub until: Option<String>,

    #[arg(long, help = "Analysis window in days when --since is not given")]
    pub days: Option<u32>,

    #[arg(long, num_args = 1.., help = "Only count authors matching these name/email substrings")]
    pub authors: Vec<String>,

    #[arg(long, num_args = 1.., help = "Repository names to exclude")]
    pub exclude: Vec<String>,
}

#[derive(Args, Clone)]
pub struct AnalyzeArgs {
    #[arg(long, help = "Output as JSON")]
    pub json: bool,

    #[arg(long, help = "Output author rows as NDJSON")]
    pub ndjson: bool,

    #[arg(long, help = "Output author rows as CSV")]
    pub csv: bool,

    #[arg(long, help = "Also write text + CSV report files under this directory")]
    pub out: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline: discover, collect, consolidate, report
    Analyze(AnalyzeArgs),
    /// List discovered repositories without collecting commits
    Repos {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Analyze(args) => crate::analyze::exec(self.common, args),
            Commands::Repos { json } => crate::repos::exec(self.common, json),
            Commands::Config => {
                let config = crate::config::Config::load(&self.common)?;
                config.print_summary();
                Ok(())
            }
        }
    }
}
