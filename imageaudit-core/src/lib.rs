#![deny(missing_docs)]
//! ImageAudit core library.
//!
//! This crate holds the domain types, extraction rules and scan driver used to
//! audit which container images an organization's repositories build on.

pub mod classify;
pub mod contributors;
pub mod domain;
pub mod error;
pub mod extract;
pub mod host;
pub mod locate;
pub mod report;
pub mod scan;

pub use classify::{AllowList, Classification, ImageLedger};
pub use contributors::{enrich_non_compliant, rank_contributors, without_contributors};
pub use domain::{
    CompliantImage, DirectoryEntry, EnrichedNonCompliantImage, ImageReference, NonCompliantImage,
    PageInfo, PipelineImage, PipelineStatistics, RateLimitStatus, Repository, RepositoryPage,
    ScanReport, ScanStatistics, SourceFile, TreeEntry,
};
pub use error::{AuditError, Result};
pub use extract::{DockerfileExtractor, ExtractionRule, PipelineExtractor};
pub use host::{HostFuture, RepositoryHost};
pub use locate::PipelineFileMatcher;
pub use report::{ReportSink, emit_tables, render_json, render_statistics};
pub use scan::{ScanOptions, Scanner};
