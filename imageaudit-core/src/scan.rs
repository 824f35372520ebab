//! Organization scan driver.
//!
//! Walks the repository catalog page by page, strictly one repository at a
//! time. A failure inside one repository is logged and the scan moves on; only
//! a failing catalog query ends the run. The API quota is checked before the
//! first page and before every following page, and an exhausted quota stops
//! pagination while keeping everything collected so far.

use log::{debug, info, warn};

use crate::classify::{AllowList, ImageLedger};
use crate::domain::{Repository, ScanReport};
use crate::error::Result;
use crate::extract::{DockerfileExtractor, PipelineExtractor};
use crate::host::RepositoryHost;
use crate::locate::{PipelineFileMatcher, find_dockerfile, find_pipeline_files};

/// Tuning knobs for a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Stop after this many catalog pages.
    pub max_pages: Option<usize>,
}

/// Where pagination goes after a completed page.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NextPage {
    Fetch(String),
    Done,
    Halted,
}

/// Drives a full organization scan against a [`RepositoryHost`].
pub struct Scanner<'h, H: RepositoryHost + ?Sized> {
    host: &'h H,
    dockerfiles: DockerfileExtractor,
    pipelines: PipelineExtractor,
    matcher: PipelineFileMatcher,
    options: ScanOptions,
}

impl<'h, H: RepositoryHost + ?Sized> Scanner<'h, H> {
    /// Create a scanner with the built-in extraction rules.
    pub fn new(host: &'h H) -> Result<Self> {
        Ok(Self {
            host,
            dockerfiles: DockerfileExtractor::new()?,
            pipelines: PipelineExtractor::new()?,
            matcher: PipelineFileMatcher::default(),
            options: ScanOptions::default(),
        })
    }

    /// Replace the pipeline-file matcher.
    pub fn with_matcher(mut self, matcher: PipelineFileMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Replace the pipeline extractor.
    pub fn with_pipeline_extractor(mut self, pipelines: PipelineExtractor) -> Self {
        self.pipelines = pipelines;
        self
    }

    /// Replace the scan options.
    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Scan every repository of the organization.
    ///
    /// Returns an error only when the catalog itself cannot be fetched.
    pub async fn run(&self, allow_list: AllowList) -> Result<ScanReport> {
        let mut ledger = ImageLedger::new(allow_list);

        if self.quota_exhausted().await {
            warn!("Rate limit exhausted before the scan started");
            return Ok(ledger.into_report(true, 0));
        }

        let mut cursor: Option<String> = None;
        let mut pages = 0usize;
        let halted = loop {
            let page = self.host.fetch_repositories(cursor.as_deref()).await?;
            pages += 1;
            info!(
                "Catalog page {pages}: {} repositories",
                page.repositories.len()
            );

            for repo in &page.repositories {
                self.scan_repository(repo, &mut ledger).await;
            }

            match self
                .next_page(pages, page.page_info.has_next_page, page.page_info.end_cursor)
                .await
            {
                NextPage::Fetch(next) => cursor = Some(next),
                NextPage::Done => break false,
                NextPage::Halted => break true,
            }
        };

        let report = ledger.into_report(halted, pages);
        info!(
            "Scan finished: {} repositories, {} images, {} pipeline images",
            report.statistics.total_repos,
            report.statistics.total_images,
            report.pipeline_statistics.total_pipeline_images
        );
        Ok(report)
    }

    async fn next_page(
        &self,
        pages: usize,
        has_next_page: bool,
        end_cursor: Option<String>,
    ) -> NextPage {
        if !has_next_page {
            return NextPage::Done;
        }
        if self.options.max_pages.is_some_and(|max| pages >= max) {
            info!("Stopping after {pages} catalog pages");
            return NextPage::Done;
        }
        let Some(next) = end_cursor else {
            warn!("Catalog reported another page without a cursor; stopping");
            return NextPage::Done;
        };
        if self.quota_exhausted().await {
            warn!("Rate limit reached. Stopping pagination until the quota resets");
            return NextPage::Halted;
        }
        NextPage::Fetch(next)
    }

    async fn quota_exhausted(&self) -> bool {
        match self.host.rate_limit().await {
            Ok(status) => {
                info!("API calls remaining: {}", status.remaining);
                if status.is_exhausted() {
                    warn!(
                        "Rate limit exceeded. Resets at: {}",
                        status.reset_time_display()
                    );
                }
                status.is_exhausted()
            }
            Err(err) => {
                warn!("Failed to check rate limit: {err}");
                false
            }
        }
    }

    async fn scan_repository(&self, repo: &Repository, ledger: &mut ImageLedger) {
        if repo.is_archived {
            info!("Skipping archived repo: {}", repo.name);
            return;
        }
        let Some(branch) = repo.scannable_branch() else {
            info!("Skipping repo without a default branch: {}", repo.name);
            return;
        };
        ledger.record_repository();
        debug!("Scanning {}@{branch}", repo.name);

        self.scan_dockerfile(&repo.name, branch, ledger).await;
        self.scan_pipeline_files(&repo.name, branch, ledger).await;
    }

    async fn scan_dockerfile(&self, repo: &str, branch: &str, ledger: &mut ImageLedger) {
        match find_dockerfile(self.host, repo, branch).await {
            Ok(Some(file)) => {
                for image in self.dockerfiles.extract(&file.contents) {
                    ledger.record_image(repo, branch, &file.path, &image);
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!("Failed to fetch Dockerfile for repo: {repo}, branch: {branch} - {err}");
            }
        }
    }

    async fn scan_pipeline_files(&self, repo: &str, branch: &str, ledger: &mut ImageLedger) {
        let paths = match find_pipeline_files(self.host, &self.matcher, repo, branch).await {
            Ok(paths) => paths,
            Err(err) => {
                warn!("Failed to fetch tree for repo: {repo}, branch: {branch} - {err}");
                return;
            }
        };

        for path in paths {
            match self.host.fetch_file(repo, branch, &path).await {
                Ok(Some(contents)) => {
                    for image in self.pipelines.extract(&contents) {
                        ledger.record_pipeline_image(repo, branch, &path, &image);
                    }
                }
                Ok(None) => debug!("{path} in {repo}@{branch} is not a regular file"),
                Err(err) => {
                    warn!("Failed to fetch {path} for repo: {repo}, branch: {branch} - {err}");
                }
            }
        }
    }
}
