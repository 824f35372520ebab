//! Compliance classification and result aggregation.

use std::collections::BTreeSet;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::domain::{
    CompliantImage, ImageReference, NonCompliantImage, PipelineImage, PipelineStatistics,
    ScanReport, ScanStatistics,
};

/// Tag suffix marking locally built images.
pub const LOCAL_TAG: &str = ":local";

/// Structural names counted but never classified.
pub const PLACEHOLDER_IMAGES: [&str; 5] = ["base", "final", "builder", "amd64", "arm64"];

/// Marker written in the compliance column of compliant records.
pub const COMPLIANT_MARKER: &str = "X";

/// Short image names approved by the organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    images: BTreeSet<String>,
}

impl AllowList {
    /// Build an allow-list from short names, ignoring blanks.
    pub fn new<I, S>(images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let images = images
            .into_iter()
            .map(|image| image.as_ref().trim().to_string())
            .filter(|image| !image.is_empty())
            .collect();
        Self { images }
    }

    /// Whether a short name is approved; any tag suffix is ignored.
    pub fn contains(&self, short_name: &str) -> bool {
        let untagged = short_name.split(':').next().unwrap_or(short_name);
        self.images.contains(untagged)
    }

    /// Number of approved images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether nothing is approved.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Outcome of classifying one Dockerfile image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Locally built; not counted.
    LocalBuild,
    /// Counted, but a structural placeholder.
    Placeholder,
    /// Counted and allow-listed.
    Compliant,
    /// Counted and not allow-listed.
    NonCompliant,
}

/// Accumulates statistics and result records for one scan.
#[derive(Debug, Clone)]
pub struct ImageLedger {
    allow_list: AllowList,
    statistics: ScanStatistics,
    pipeline_statistics: PipelineStatistics,
    compliant: Vec<CompliantImage>,
    non_compliant: Vec<NonCompliantImage>,
    pipeline_images: Vec<PipelineImage>,
}

impl ImageLedger {
    /// Start an empty ledger.
    pub fn new(allow_list: AllowList) -> Self {
        Self {
            allow_list,
            statistics: ScanStatistics::default(),
            pipeline_statistics: PipelineStatistics::default(),
            compliant: Vec::new(),
            non_compliant: Vec::new(),
            pipeline_images: Vec::new(),
        }
    }

    /// Count a repository that is eligible for scanning.
    pub fn record_repository(&mut self) {
        self.statistics.total_repos += 1;
    }

    /// Classify and record an image found in a Dockerfile.
    pub fn record_image(
        &mut self,
        repo: &str,
        branch: &str,
        file_path: &str,
        image: &ImageReference,
    ) -> Classification {
        if image.full_name.contains(LOCAL_TAG) {
            info!(
                "Skipping image {} in {repo}@{branch}: local tag",
                image.full_name
            );
            return Classification::LocalBuild;
        }

        self.statistics.record_occurrence(&image.short_name);

        if PLACEHOLDER_IMAGES.contains(&image.short_name.as_str()) {
            debug!(
                "Skipping placeholder image {} in {repo}@{branch}",
                image.full_name
            );
            return Classification::Placeholder;
        }

        if self.allow_list.contains(&image.short_name) {
            self.statistics.record_compliant(&image.short_name);
            info!(
                "Repo: {repo}, Branch: {branch}, Image: {}, Full Image: {}",
                image.short_name, image.full_name
            );
            self.compliant.push(CompliantImage {
                repo: repo.to_string(),
                branch: branch.to_string(),
                image: image.full_name.clone(),
                marker: COMPLIANT_MARKER.to_string(),
            });
            Classification::Compliant
        } else {
            info!(
                "Repo: {repo}, Branch: {branch}, Image: {} is non-compliant ({file_path})",
                image.full_name
            );
            self.non_compliant.push(NonCompliantImage {
                repo: repo.to_string(),
                branch: branch.to_string(),
                image: image.full_name.clone(),
                file_path: file_path.to_string(),
            });
            Classification::NonCompliant
        }
    }

    /// Record an image found in a pipeline file.
    pub fn record_pipeline_image(
        &mut self,
        repo: &str,
        branch: &str,
        file_path: &str,
        image: &ImageReference,
    ) {
        self.pipeline_statistics
            .record_occurrence(&image.short_name);
        info!(
            "Repo: {repo}, Branch: {branch}, Pipeline Image: {}, Full Image: {}, File: {file_path}",
            image.short_name, image.full_name
        );
        self.pipeline_images.push(PipelineImage {
            repo: repo.to_string(),
            branch: branch.to_string(),
            image: image.full_name.clone(),
            file_path: file_path.to_string(),
        });
    }

    /// Dockerfile statistics gathered so far.
    pub fn statistics(&self) -> &ScanStatistics {
        &self.statistics
    }

    /// Pipeline statistics gathered so far.
    pub fn pipeline_statistics(&self) -> &PipelineStatistics {
        &self.pipeline_statistics
    }

    /// Close the ledger into a report.
    pub fn into_report(self, halted: bool, pages_fetched: usize) -> ScanReport {
        ScanReport {
            statistics: self.statistics,
            pipeline_statistics: self.pipeline_statistics,
            compliant: self.compliant,
            non_compliant: self.non_compliant,
            pipeline_images: self.pipeline_images,
            halted,
            pages_fetched,
        }
    }
}
