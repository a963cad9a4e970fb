//! GitLab REST API client for project discovery.
//!
//! Sync HTTP via ureq — no async runtime needed. Transient failures (5xx,
//! transport errors) are retried with backoff; auth failures escalate
//! immediately.

use crate::config::Config;
use crate::error::{GlactError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const PER_PAGE: u32 = 100;
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
    pub web_url: Option<String>,
    pub default_branch: Option<String>,
}

/// How a response or transport failure should be handled at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Disposition {
    Ok,
    /// Retry with backoff, then escalate.
    Transient(String),
    /// Bad token, missing resource: never retried.
    Fatal(String),
}

fn classify_status(status: u16) -> Disposition {
    match status {
        200..=299 => Disposition::Ok,
        401 | 403 => Disposition::Fatal(format!(
            "HTTP {status}: authentication rejected (check GITLAB_TOKEN scopes: api, read_repository)"
        )),
        404 => Disposition::Fatal("HTTP 404: GitLab API endpoint not found (check GITLAB_URL)".into()),
        500..=599 => Disposition::Transient(format!("HTTP {status} from GitLab")),
        other => Disposition::Fatal(format!("HTTP {other} from GitLab")),
    }
}

#[derive(Debug)]
pub struct GitLabClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl GitLabClient {
    pub fn new(config: &Config) -> Result<Self> {
        let token = config
            .gitlab_token
            .clone()
            .ok_or_else(|| GlactError::Discovery("GITLAB_TOKEN is not set".to_string()))?;

        let agent = ureq::config::Config::builder()
            .http_status_as_error(false) // status codes handled by classify_status
            .timeout_global(Some(Duration::from_secs(30)))
            .build()
            .new_agent();

        Ok(Self {
            agent,
            base_url: config.gitlab_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Paginate the project listing until an empty page.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!(
                "{}/api/v4/projects?membership=true&per_page={PER_PAGE}&page={page}",
                self.base_url
            );
            let body = self.get_with_retry(&url)?;
            let batch: Vec<Project> = serde_json::from_str(&body)?;
            if batch.is_empty() {
                break;
            }
            debug!(page, count = batch.len(), "fetched project page");
            projects.extend(batch);
            page += 1;
        }

        Ok(projects)
    }

    fn get_with_retry(&self, url: &str) -> Result<String> {
        let mut last_transient = GlactError::TransientNetwork("no attempt made".to_string());

        for attempt in 1..=MAX_ATTEMPTS {
            let result = self
                .agent
                .get(url)
                .header("Authorization", &format!("Bearer {}", self.token))
                .call();

            let disposition = match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match classify_status(status) {
                        Disposition::Ok => {
                            return response.into_body().read_to_string().map_err(|e| {
                                GlactError::Discovery(format!("Failed to read response body: {e}"))
                            });
                        }
                        other => other,
                    }
                }
                Err(e) => Disposition::Transient(format!("transport error: {e}")),
            };

            match disposition {
                Disposition::Fatal(reason) => return Err(GlactError::Discovery(reason)),
                Disposition::Transient(reason) => {
                    warn!(attempt, %reason, "transient GitLab API failure");
                    last_transient = GlactError::TransientNetwork(reason);
                    if attempt < MAX_ATTEMPTS {
                        std::thread::sleep(Duration::from_millis(500 * attempt as u64));
                    }
                }
                Disposition::Ok => unreachable!(),
            }
        }

        // Retry budget exhausted; at the discovery call site this is fatal.
        Err(GlactError::Discovery(format!(
            "GitLab API unreachable after {MAX_ATTEMPTS} attempts: {last_transient}"
        )))
    }
}
