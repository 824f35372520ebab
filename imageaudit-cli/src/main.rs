#![deny(missing_docs)]
//! ImageAudit command-line interface.
//!
//! Audits the container images that the repositories of a GitHub
//! organization build on, and writes compliance reports.

mod config;
mod github;
mod sink;

use clap::{Args, Parser, Subcommand};
use config::{AuditConfig, ConfigArgs};
use imageaudit_core::{
    EnrichedNonCompliantImage, RepositoryHost, ReportSink, ScanOptions, ScanReport, Scanner,
    emit_tables, enrich_non_compliant, render_json, without_contributors,
};
use log::info;
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(
    name = "imageaudit",
    version,
    about = "Container image audit for GitHub organizations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
struct ScanArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Directory receiving the CSV tables.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
    /// Also write the full report as JSON to this path.
    #[arg(long = "json-output")]
    json_output: Option<PathBuf>,
    /// Skip commit-history lookups for non-compliant findings.
    #[arg(long)]
    skip_contributors: bool,
    /// Stop after this many catalog pages.
    #[arg(long)]
    max_pages: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan every repository of the organization and write the reports.
    Scan(ScanArgs),
    /// Print the remaining API quota.
    RateLimit {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            let config = config::load_config(&args.config).await?;
            let client = github::GitHubClient::new(config.github.clone())?;
            info!("Scanning organization {}", client.org());
            let report = scan_organization(&client, &config, args.max_pages).await?;
            print!("{}", imageaudit_core::render_statistics(&report));

            let mut sink = sink::DirectorySink::new(&args.output);
            publish_report(&client, &report, &args, &mut sink).await?;
        }
        Commands::RateLimit { config: args } => {
            let settings = config::load_settings(&args).await?;
            let client = github::GitHubClient::new(settings)?;
            print!("{}", render_rate_limit(&client).await?);
        }
    }

    Ok(())
}

#[cfg(test)]
fn main() {}

/// Run the organization scan; the flag page cap wins over the config file.
async fn scan_organization<H>(
    host: &H,
    config: &AuditConfig,
    max_pages: Option<usize>,
) -> CliResult<ScanReport>
where
    H: RepositoryHost + ?Sized,
{
    let options = ScanOptions {
        max_pages: max_pages.or(config.max_pages),
    };
    let scanner = Scanner::new(host)?.with_options(options);
    let report = scanner.run(config.allow_list.clone()).await?;
    if report.halted {
        info!(
            "Scan halted after {} pages; reports cover partial results",
            report.pages_fetched
        );
    }
    Ok(report)
}

/// Enrich findings, write the CSV tables and the optional JSON report.
async fn publish_report<H, S>(
    host: &H,
    report: &ScanReport,
    args: &ScanArgs,
    sink: &mut S,
) -> CliResult<Vec<EnrichedNonCompliantImage>>
where
    H: RepositoryHost + ?Sized,
    S: ReportSink + ?Sized,
{
    let enriched = if args.skip_contributors {
        without_contributors(&report.non_compliant)
    } else {
        info!(
            "Fetching top contributors for {} non-compliant images",
            report.non_compliant.len()
        );
        enrich_non_compliant(host, &report.non_compliant).await
    };

    emit_tables(sink, report, &enriched)?;

    if let Some(path) = &args.json_output {
        let payload = JsonReport {
            report,
            non_compliant_contributors: &enriched,
        };
        write_output(path, render_json(&payload)?).await?;
        info!("JSON report generated: {}", path.display());
    }
    Ok(enriched)
}

/// Describe the current quota.
async fn render_rate_limit<H>(host: &H) -> CliResult<String>
where
    H: RepositoryHost + ?Sized,
{
    let status = host.rate_limit().await?;
    let mut output = String::new();
    let _ = writeln!(output, "API calls remaining: {}", status.remaining);
    if status.is_exhausted() {
        let _ = writeln!(
            output,
            "Rate limit exceeded. Resets at: {}",
            status.reset_time_display()
        );
    } else {
        let _ = writeln!(output, "Quota resets at: {}", status.reset_time_display());
    }
    Ok(output)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a ScanReport,
    non_compliant_contributors: &'a [EnrichedNonCompliantImage],
}

async fn write_output(path: &Path, contents: String) -> CliResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}
