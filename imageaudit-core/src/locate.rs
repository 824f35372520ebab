//! Dockerfile and pipeline-file discovery.

use log::debug;

use crate::domain::SourceFile;
use crate::error::Result;
use crate::host::RepositoryHost;

/// Lowercase prefix shared by Dockerfile names (`Dockerfile`, `dockerfile.prod`, ...).
pub const DOCKERFILE_PREFIX: &str = "dockerfile";

/// Path suffixes that mark compose, CI and pipeline definitions.
pub const DEFAULT_PIPELINE_MARKERS: [&str; 6] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    ".gitlab-ci.yml",
    ".github/workflows",
    ".concourse",
    "pipeline",
];

const WORKFLOW_DIR: &str = ".github/workflows/";

/// Whether a root entry name looks like a Dockerfile.
pub fn is_dockerfile_name(name: &str) -> bool {
    name.to_lowercase().starts_with(DOCKERFILE_PREFIX)
}

/// Selects pipeline-definition paths from a repository tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineFileMatcher {
    markers: Vec<String>,
}

impl Default for PipelineFileMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_PIPELINE_MARKERS)
    }
}

impl PipelineFileMatcher {
    /// Build a matcher from case-insensitive path suffixes.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let markers = markers
            .into_iter()
            .map(|marker| marker.as_ref().trim().to_lowercase())
            .filter(|marker| !marker.is_empty())
            .collect();
        Self { markers }
    }

    /// Whether `path` names a pipeline definition.
    ///
    /// YAML files inside a `.github/workflows/` directory always match.
    pub fn matches(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        if self.markers.iter().any(|marker| lower.ends_with(marker)) {
            return true;
        }
        is_workflow_file(&lower)
    }
}

fn is_workflow_file(lower: &str) -> bool {
    let in_workflow_dir =
        lower.starts_with(WORKFLOW_DIR) || lower.contains(&format!("/{WORKFLOW_DIR}"));
    in_workflow_dir && (lower.ends_with(".yml") || lower.ends_with(".yaml"))
}

/// Fetch the first Dockerfile at the repository root.
///
/// Returns `Ok(None)` when the root holds no downloadable Dockerfile.
pub async fn find_dockerfile<H>(host: &H, repo: &str, branch: &str) -> Result<Option<SourceFile>>
where
    H: RepositoryHost + ?Sized,
{
    let entries = host.list_root(repo, branch).await?;
    let Some((name, url)) = entries.into_iter().find_map(|entry| {
        if !is_dockerfile_name(&entry.name) {
            return None;
        }
        entry.download_url.map(|url| (entry.name, url))
    }) else {
        debug!("No Dockerfile at the root of {repo}@{branch}");
        return Ok(None);
    };
    let contents = host.download(&url).await?;
    Ok(Some(SourceFile {
        path: name,
        contents,
    }))
}

/// List every pipeline-definition path in the repository tree.
pub async fn find_pipeline_files<H>(
    host: &H,
    matcher: &PipelineFileMatcher,
    repo: &str,
    branch: &str,
) -> Result<Vec<String>>
where
    H: RepositoryHost + ?Sized,
{
    let tree = host.list_tree(repo, branch).await?;
    let paths: Vec<String> = tree
        .into_iter()
        .filter(|entry| entry.is_blob() && matcher.matches(&entry.path))
        .map(|entry| entry.path)
        .collect();
    debug!("{} pipeline files in {repo}@{branch}", paths.len());
    Ok(paths)
}
