//! Domain entities for image audits.

use std::collections::BTreeMap;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Per-image occurrence counts keyed by short image name.
pub type ImageCounts = BTreeMap<String, usize>;

/// A repository listed in the organization catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Repository name within the organization.
    pub name: String,
    /// Whether the repository is archived.
    pub is_archived: bool,
    /// Default branch, absent for empty repositories.
    pub default_branch: Option<String>,
}

impl Repository {
    /// Branch to scan, if the repository is eligible for scanning.
    pub fn scannable_branch(&self) -> Option<&str> {
        if self.is_archived {
            return None;
        }
        self.default_branch
            .as_deref()
            .map(str::trim)
            .filter(|branch| !branch.is_empty())
    }
}

/// Cursor state returned with each catalog page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether another page follows.
    pub has_next_page: bool,
    /// Opaque cursor for the following page.
    pub end_cursor: Option<String>,
}

/// One page of the organization repository catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryPage {
    /// Repositories on this page.
    pub repositories: Vec<Repository>,
    /// Continuation state.
    pub page_info: PageInfo,
}

/// Remaining API quota as reported by the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    /// Calls left in the current window.
    pub remaining: u64,
    /// Window reset as a unix timestamp (seconds).
    pub reset: i64,
}

impl RateLimitStatus {
    /// Whether no calls remain.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Reset time rendered in local time.
    pub fn reset_time_display(&self) -> String {
        Local
            .timestamp_opt(self.reset, 0)
            .single()
            .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.reset.to_string())
    }
}

/// An entry in a repository root directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// File or directory name.
    pub name: String,
    /// Raw download location; directories have none.
    pub download_url: Option<String>,
}

/// An entry in a recursive repository tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Path relative to the repository root.
    pub path: String,
    /// Git object kind (`blob`, `tree`, `commit`).
    pub kind: String,
}

impl TreeEntry {
    /// Whether the entry is a regular file.
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}

/// A fetched file with its repository path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the repository root.
    pub path: String,
    /// Raw text contents.
    pub contents: String,
}

/// A resolved image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    /// Reference without registry path, tag retained (e.g. `nginx:1.21`).
    pub full_name: String,
    /// Reference without registry path or tag (e.g. `nginx`).
    pub short_name: String,
}

/// A Dockerfile image found on the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompliantImage {
    /// Repository name.
    pub repo: String,
    /// Scanned branch.
    pub branch: String,
    /// Resolved full image name.
    pub image: String,
    /// Compliance marker column value.
    pub marker: String,
}

/// A Dockerfile image missing from the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonCompliantImage {
    /// Repository name.
    pub repo: String,
    /// Scanned branch.
    pub branch: String,
    /// Resolved full image name.
    pub image: String,
    /// Path of the Dockerfile that declared the image.
    pub file_path: String,
}

/// A non-compliant image together with the repository's top contributors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedNonCompliantImage {
    /// The underlying finding.
    #[serde(flatten)]
    pub image: NonCompliantImage,
    /// Most active recent commit authors, best first.
    pub top_contributors: Vec<String>,
}

/// An image referenced from a compose, CI or pipeline definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineImage {
    /// Repository name.
    pub repo: String,
    /// Scanned branch.
    pub branch: String,
    /// Resolved full image name.
    pub image: String,
    /// Path of the pipeline file.
    pub file_path: String,
}

/// Aggregate counts for Dockerfile-sourced images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatistics {
    /// Non-archived repositories with a default branch.
    pub total_repos: usize,
    /// Counted image occurrences.
    pub total_images: usize,
    /// Occurrences per short image name.
    pub image_counts: ImageCounts,
    /// Compliant occurrences per short image name.
    pub compliant_counts: ImageCounts,
}

impl ScanStatistics {
    /// Count one occurrence of an image.
    pub fn record_occurrence(&mut self, short_name: &str) {
        self.total_images += 1;
        *self.image_counts.entry(short_name.to_string()).or_insert(0) += 1;
    }

    /// Count one compliant occurrence of an image.
    pub fn record_compliant(&mut self, short_name: &str) {
        *self
            .compliant_counts
            .entry(short_name.to_string())
            .or_insert(0) += 1;
    }

    /// Sum of compliant occurrences.
    pub fn compliant_total(&self) -> usize {
        self.compliant_counts.values().sum()
    }

    /// Compliant occurrences as a percentage of all counted images.
    pub fn compliant_percentage(&self) -> f64 {
        percentage(self.compliant_total(), self.total_images)
    }
}

/// Aggregate counts for pipeline-sourced images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatistics {
    /// Counted pipeline image occurrences.
    pub total_pipeline_images: usize,
    /// Occurrences per short image name.
    pub pipeline_image_counts: ImageCounts,
}

impl PipelineStatistics {
    /// Count one occurrence of a pipeline image.
    pub fn record_occurrence(&mut self, short_name: &str) {
        self.total_pipeline_images += 1;
        *self
            .pipeline_image_counts
            .entry(short_name.to_string())
            .or_insert(0) += 1;
    }
}

/// Structured outcome of an organization scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Dockerfile statistics.
    pub statistics: ScanStatistics,
    /// Pipeline statistics.
    pub pipeline_statistics: PipelineStatistics,
    /// Allow-listed Dockerfile images.
    pub compliant: Vec<CompliantImage>,
    /// Dockerfile images outside the allow-list.
    pub non_compliant: Vec<NonCompliantImage>,
    /// Images referenced from pipeline files.
    pub pipeline_images: Vec<PipelineImage>,
    /// Whether pagination stopped early on an exhausted quota.
    pub halted: bool,
    /// Catalog pages processed.
    pub pages_fetched: usize,
}

/// Share of `part` in `total`, in percent; zero when `total` is zero.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64) * 100.0
}
