//! Audit configuration loading.

use crate::CliResult;
use crate::github::{DEFAULT_API_URL, DEFAULT_GRAPHQL_QUERY, GitHubSettings, RetryPolicy};
use clap::Args;
use imageaudit_core::AllowList;
use log::{debug, info};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.json";
const DEFAULT_PAGE_SIZE: u32 = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_RETRY_BASE_SECS: u64 = 5;

/// Connection arguments shared by every command.
///
/// Each flag falls back to its environment variable, and both win over the
/// config file.
#[derive(Args, Clone, Debug, Default)]
pub struct ConfigArgs {
    /// Path to the JSON config file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
    /// GitHub token used for every API call.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Organization to audit.
    #[arg(long, env = "IMAGEAUDIT_ORG")]
    pub org: Option<String>,
    /// GitHub REST API base URL.
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,
    /// Compliant image names (repeatable or comma-separated).
    #[arg(long = "compliant-image", value_delimiter = ',')]
    pub compliant_images: Vec<String>,
}

/// Config file contents; every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    /// GitHub token.
    pub github_token: Option<String>,
    /// Organization login.
    pub org_name: Option<String>,
    /// Compliant image names.
    #[serde(alias = "complioant_images")]
    pub compliant_images: Option<Vec<String>>,
    /// Custom catalog query.
    pub graphql_query: Option<String>,
    /// REST API base URL.
    pub api_url: Option<String>,
    /// GraphQL endpoint.
    pub graphql_url: Option<String>,
    /// Repositories per catalog page.
    pub page_size: Option<u32>,
    /// Stop after this many catalog pages.
    pub max_pages: Option<usize>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Attempts per call on gateway failures.
    pub max_retries: Option<u32>,
    /// First retry delay in seconds.
    pub retry_base_secs: Option<u64>,
}

/// Fully resolved audit configuration.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Transport settings.
    pub github: GitHubSettings,
    /// Compliant images.
    pub allow_list: AllowList,
    /// Optional page cap.
    pub max_pages: Option<usize>,
}

/// Read the config file named by `args` and resolve a full scan configuration.
///
/// A missing file at the default location is treated as empty.
pub async fn load_config(args: &ConfigArgs) -> CliResult<AuditConfig> {
    let file = read_config_file(&args.config).await?;
    resolve_config(file, args)
}

/// Read the config file named by `args` and resolve only the transport settings.
#[cfg_attr(test, allow(dead_code))]
pub async fn load_settings(args: &ConfigArgs) -> CliResult<GitHubSettings> {
    let file = read_config_file(&args.config).await?;
    resolve_settings(&file, args)
}

async fn read_config_file(path: &Path) -> CliResult<FileConfig> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            debug!("Loaded config from {}", path.display());
            parse_config(&contents)
        }
        Err(err)
            if err.kind() == std::io::ErrorKind::NotFound
                && path == Path::new(DEFAULT_CONFIG_PATH) =>
        {
            info!("No {DEFAULT_CONFIG_PATH} found; using environment and flags only");
            Ok(FileConfig::default())
        }
        Err(err) => Err(format!("failed to read config {}: {err}", path.display()).into()),
    }
}

/// Parse the JSON config file format.
pub fn parse_config(contents: &str) -> CliResult<FileConfig> {
    Ok(serde_json::from_str(contents)?)
}

/// Merge file values with overrides and validate the result.
pub fn resolve_config(file: FileConfig, args: &ConfigArgs) -> CliResult<AuditConfig> {
    let github = resolve_settings(&file, args)?;

    let images = if args.compliant_images.is_empty() {
        file.compliant_images.unwrap_or_default()
    } else {
        args.compliant_images.clone()
    };
    let allow_list = AllowList::new(&images);
    if allow_list.is_empty() {
        return Err("at least one compliant image is required (compliant_images)".into());
    }

    Ok(AuditConfig {
        github,
        allow_list,
        max_pages: file.max_pages,
    })
}

/// Transport settings with overrides applied; token and organization are required.
pub fn resolve_settings(file: &FileConfig, args: &ConfigArgs) -> CliResult<GitHubSettings> {
    let token = pick(args.token.clone(), file.github_token.clone())
        .ok_or("a GitHub token is required (github_token, GITHUB_TOKEN or --token)")?;
    let org = pick(args.org.clone(), file.org_name.clone())
        .ok_or("an organization is required (org_name, IMAGEAUDIT_ORG or --org)")?;

    let api_url = pick(args.api_url.clone(), file.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
        .trim_end_matches('/')
        .to_string();
    let graphql_url =
        non_blank(file.graphql_url.clone()).unwrap_or_else(|| format!("{api_url}/graphql"));
    let query = non_blank(file.graphql_query.clone())
        .unwrap_or_else(|| DEFAULT_GRAPHQL_QUERY.to_string());
    let page_size = file.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err("page_size must be at least 1".into());
    }
    let retry_base_secs = file.retry_base_secs.unwrap_or(DEFAULT_RETRY_BASE_SECS);

    Ok(GitHubSettings {
        token,
        org,
        api_url,
        graphql_url,
        query,
        page_size,
        timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        retry: RetryPolicy {
            max_attempts: file.max_retries.unwrap_or(DEFAULT_MAX_RETRIES).max(1),
            base_delay: Duration::from_secs(retry_base_secs),
        },
    })
}

/// First non-blank value, preferring the override.
fn pick(preferred: Option<String>, fallback: Option<String>) -> Option<String> {
    non_blank(preferred).or_else(|| non_blank(fallback))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
