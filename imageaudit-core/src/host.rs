//! Remote repository host abstraction.

use std::future::Future;
use std::pin::Pin;

use crate::domain::{DirectoryEntry, RateLimitStatus, RepositoryPage, TreeEntry};
use crate::error::Result;

/// Boxed future returned by [`RepositoryHost`] calls.
pub type HostFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Read access to an organization's repositories on a source-control host.
pub trait RepositoryHost {
    /// Current API quota.
    fn rate_limit(&self) -> HostFuture<'_, RateLimitStatus>;

    /// One page of the organization catalog, starting after `cursor`.
    fn fetch_repositories<'a>(&'a self, cursor: Option<&'a str>)
    -> HostFuture<'a, RepositoryPage>;

    /// Entries at the repository root on `branch`.
    fn list_root<'a>(
        &'a self,
        repo: &'a str,
        branch: &'a str,
    ) -> HostFuture<'a, Vec<DirectoryEntry>>;

    /// Raw text behind a download URL from a directory listing.
    fn download<'a>(&'a self, url: &'a str) -> HostFuture<'a, String>;

    /// Every entry of the repository tree on `branch`, recursively.
    fn list_tree<'a>(&'a self, repo: &'a str, branch: &'a str) -> HostFuture<'a, Vec<TreeEntry>>;

    /// Raw text of a single file; `None` when the path is not a file.
    fn fetch_file<'a>(
        &'a self,
        repo: &'a str,
        branch: &'a str,
        path: &'a str,
    ) -> HostFuture<'a, Option<String>>;

    /// Author names of the most recent commits on `branch`.
    fn recent_commit_authors<'a>(
        &'a self,
        repo: &'a str,
        branch: &'a str,
    ) -> HostFuture<'a, Vec<String>>;
}
