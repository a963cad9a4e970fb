use crate::cli::CommonArgs;
use crate::config::Config;
use crate::discover;
use anyhow::Context;
use console::style;
use serde::Serialize;

#[derive(Serialize)]
struct RepoListing {
    name: String,
    local_path: Option<String>,
    web_url: Option<String>,
    excluded: bool,
}

/// Discovery only: list what a run would see, with exclusion marks.
pub fn exec(common: CommonArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load(&common).context("Failed to load configuration")?;
    let repositories =
        discover::list_repositories(&config).context("Failed to discover repositories")?;

    let listings: Vec<RepoListing> = repositories
        .iter()
        .map(|r| RepoListing {
            name: r.name.clone(),
            local_path: r.path.as_ref().map(|p| p.display().to_string()),
            web_url: r.web_url.clone(),
            excluded: config.should_exclude(&r.name),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    println!(
        "{:<30} {:<10} {}",
        style("Repository").bold(),
        style("Status").bold(),
        style("Location").bold()
    );
    println!("{}", "─".repeat(80));
    for l in &listings {
        let status = if l.excluded {
            style("excluded").yellow().to_string()
        } else if l.local_path.is_some() {
            "local".to_string()
        } else {
            "remote".to_string()
        };
        let location = l
            .local_path
            .clone()
            .or_else(|| l.web_url.clone())
            .unwrap_or_default();
        println!("{:<30} {:<10} {}", l.name, status, location);
    }
    println!("\n{} repositories", listings.len());
    Ok(())
}
