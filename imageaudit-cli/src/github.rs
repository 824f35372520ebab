//! GitHub transport for organization scans.

use imageaudit_core::{
    AuditError, DirectoryEntry, HostFuture, PageInfo, RateLimitStatus, Repository,
    RepositoryHost, RepositoryPage, Result, TreeEntry,
};
use log::{debug, warn};
use reqwest::header::ACCEPT;
use reqwest::{Client, Request, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";
/// Number of commits inspected when ranking contributors.
pub const COMMIT_PAGE_SIZE: u32 = 100;
const USER_AGENT: &str = "imageaudit-cli";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Catalog query used when no custom query is configured.
///
/// Receives the `orgName`, `afterCursor` and `pageSize` variables.
pub const DEFAULT_GRAPHQL_QUERY: &str = r#"query($orgName: String!, $afterCursor: String, $pageSize: Int!) {
  organization(login: $orgName) {
    repositories(first: $pageSize, after: $afterCursor) {
      edges {
        node {
          name
          isArchived
          defaultBranchRef {
            name
          }
        }
      }
      pageInfo {
        hasNextPage
        endCursor
      }
    }
  }
}"#;

/// Backoff schedule for gateway failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt numbered `attempt` (zero based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Connection settings for [`GitHubClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    /// Bearer credential.
    pub token: String,
    /// Organization login.
    pub org: String,
    /// REST API base URL.
    pub api_url: String,
    /// GraphQL endpoint.
    pub graphql_url: String,
    /// Repository catalog query.
    pub query: String,
    /// Repositories per catalog page.
    pub page_size: u32,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Gateway retry schedule.
    pub retry: RetryPolicy,
}

impl GitHubSettings {
    /// Settings against the public GitHub API.
    pub fn new(token: impl Into<String>, org: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            org: org.into(),
            api_url: DEFAULT_API_URL.to_string(),
            graphql_url: format!("{DEFAULT_API_URL}/graphql"),
            query: DEFAULT_GRAPHQL_QUERY.to_string(),
            page_size: 50,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Async sleep abstraction so retry tests do not wait.
pub trait Sleeper {
    /// Wait for `duration`.
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Tokio-backed sleeper used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// GitHub REST and GraphQL client implementing [`RepositoryHost`].
pub struct GitHubClient<S = TokioSleeper> {
    client: Client,
    settings: GitHubSettings,
    sleeper: S,
}

impl GitHubClient<TokioSleeper> {
    /// Build a client that sleeps on the tokio timer.
    #[cfg_attr(test, allow(dead_code))]
    pub fn new(settings: GitHubSettings) -> Result<Self> {
        Self::with_sleeper(settings, TokioSleeper)
    }
}

impl<S: Sleeper + Send + Sync> GitHubClient<S> {
    /// Build a client with a custom sleeper.
    pub fn with_sleeper(settings: GitHubSettings, sleeper: S) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| AuditError::Other(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            settings,
            sleeper,
        })
    }

    /// Organization this client scans.
    #[cfg_attr(test, allow(dead_code))]
    pub fn org(&self) -> &str {
        &self.settings.org
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.api_url.trim_end_matches('/'))
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(&self.settings.token)
            .header(ACCEPT, JSON_MEDIA_TYPE)
    }

    /// Send a request, retrying gateway failures with exponential backoff.
    async fn execute(&self, request: Request, context: &str) -> Result<Response> {
        let attempts = self.settings.retry.max_attempts.max(1);
        let mut last_status = None;
        for attempt in 0..attempts {
            let Some(attempt_request) = request.try_clone() else {
                return Err(AuditError::Other(format!(
                    "{context}: request body cannot be replayed"
                )));
            };
            let response = self
                .client
                .execute(attempt_request)
                .await
                .map_err(|err| transport_error(context, err))?;
            if response.status() != StatusCode::BAD_GATEWAY {
                return ensure_success(response, context).await;
            }

            last_status = Some(response.status().as_u16());
            if attempt + 1 < attempts {
                let wait = self.settings.retry.delay(attempt);
                warn!(
                    "502 Bad Gateway from {context}: retrying in {} seconds",
                    wait.as_secs()
                );
                self.sleeper.sleep(wait).await;
            }
        }
        Err(AuditError::remote(
            last_status,
            format!("{context}: max retries exceeded"),
        ))
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        context: &str,
    ) -> Result<T> {
        let request = builder
            .build()
            .map_err(|err| transport_error(context, err))?;
        let response = self.execute(request, context).await?;
        decode_json(response, context).await
    }

    async fn fetch_text(&self, builder: RequestBuilder, context: &str) -> Result<String> {
        let request = builder
            .build()
            .map_err(|err| transport_error(context, err))?;
        let response = self.execute(request, context).await?;
        response
            .text()
            .await
            .map_err(|err| AuditError::Decode(format!("{context}: {err}")))
    }

    async fn check_rate_limit(&self) -> Result<RateLimitStatus> {
        let context = "GET /rate_limit";
        let request = self
            .get(&self.api_url("/rate_limit"))
            .build()
            .map_err(|err| transport_error(context, err))?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| transport_error(context, err))?;
        let response = ensure_success(response, context).await?;
        let payload: RateLimitResponse = decode_json(response, context).await?;
        Ok(RateLimitStatus {
            remaining: payload.rate.remaining,
            reset: payload.rate.reset,
        })
    }

    async fn query_repositories(&self, cursor: Option<&str>) -> Result<RepositoryPage> {
        let context = format!("POST /graphql (org {})", self.settings.org);
        let body = serde_json::json!({
            "query": self.settings.query,
            "variables": {
                "orgName": self.settings.org,
                "afterCursor": cursor,
                "pageSize": self.settings.page_size,
            },
        });
        let builder = self
            .client
            .post(&self.settings.graphql_url)
            .bearer_auth(&self.settings.token)
            .json(&body);
        let payload: GraphQlResponse = self.fetch_json(builder, &context).await?;
        payload.into_page(&context)
    }

    async fn root_entries(&self, repo: &str, branch: &str) -> Result<Vec<DirectoryEntry>> {
        let path = format!("/repos/{}/{repo}/contents/", self.settings.org);
        let context = format!("GET {path}?ref={branch}");
        let builder = self.get(&self.api_url(&path)).query(&[("ref", branch)]);
        let entries: Vec<ContentEntry> = self.fetch_json(builder, &context).await?;
        Ok(entries
            .into_iter()
            .map(|entry| DirectoryEntry {
                name: entry.name,
                download_url: entry.download_url,
            })
            .collect())
    }

    async fn download_text(&self, url: &str) -> Result<String> {
        let context = format!("GET {url}");
        self.fetch_text(self.get(url), &context).await
    }

    async fn tree_entries(&self, repo: &str, branch: &str) -> Result<Vec<TreeEntry>> {
        let path = format!("/repos/{}/{repo}/git/trees/{branch}", self.settings.org);
        let context = format!("GET {path}?recursive=1");
        let builder = self.get(&self.api_url(&path)).query(&[("recursive", "1")]);
        let tree: TreeResponse = self.fetch_json(builder, &context).await?;
        if tree.truncated {
            warn!("Tree listing for {repo}@{branch} was truncated by the API");
        }
        Ok(tree
            .tree
            .into_iter()
            .map(|node| TreeEntry {
                path: node.path,
                kind: node.kind,
            })
            .collect())
    }

    async fn file_text(&self, repo: &str, branch: &str, path: &str) -> Result<Option<String>> {
        let api_path = format!("/repos/{}/{repo}/contents/{path}", self.settings.org);
        let context = format!("GET {api_path}?ref={branch}");
        let builder = self.get(&self.api_url(&api_path)).query(&[("ref", branch)]);
        let payload: serde_json::Value = self.fetch_json(builder, &context).await?;
        let Some(url) = payload.get("download_url").and_then(|value| value.as_str()) else {
            debug!("{context} did not return a downloadable file");
            return Ok(None);
        };
        self.download_text(url).await.map(Some)
    }

    async fn commit_authors(&self, repo: &str, branch: &str) -> Result<Vec<String>> {
        let path = format!("/repos/{}/{repo}/commits", self.settings.org);
        let context = format!("GET {path}?sha={branch}");
        let per_page = COMMIT_PAGE_SIZE.to_string();
        let builder = self
            .get(&self.api_url(&path))
            .query(&[("sha", branch), ("per_page", per_page.as_str())]);
        let commits: Vec<CommitItem> = self.fetch_json(builder, &context).await?;
        Ok(commits
            .into_iter()
            .filter_map(|item| item.commit.author.and_then(|author| author.name))
            .collect())
    }
}

impl<S: Sleeper + Send + Sync> RepositoryHost for GitHubClient<S> {
    fn rate_limit(&self) -> HostFuture<'_, RateLimitStatus> {
        Box::pin(self.check_rate_limit())
    }

    fn fetch_repositories<'a>(
        &'a self,
        cursor: Option<&'a str>,
    ) -> HostFuture<'a, RepositoryPage> {
        Box::pin(self.query_repositories(cursor))
    }

    fn list_root<'a>(
        &'a self,
        repo: &'a str,
        branch: &'a str,
    ) -> HostFuture<'a, Vec<DirectoryEntry>> {
        Box::pin(self.root_entries(repo, branch))
    }

    fn download<'a>(&'a self, url: &'a str) -> HostFuture<'a, String> {
        Box::pin(self.download_text(url))
    }

    fn list_tree<'a>(&'a self, repo: &'a str, branch: &'a str) -> HostFuture<'a, Vec<TreeEntry>> {
        Box::pin(self.tree_entries(repo, branch))
    }

    fn fetch_file<'a>(
        &'a self,
        repo: &'a str,
        branch: &'a str,
        path: &'a str,
    ) -> HostFuture<'a, Option<String>> {
        Box::pin(self.file_text(repo, branch, path))
    }

    fn recent_commit_authors<'a>(
        &'a self,
        repo: &'a str,
        branch: &'a str,
    ) -> HostFuture<'a, Vec<String>> {
        Box::pin(self.commit_authors(repo, branch))
    }
}

fn transport_error(context: &str, err: reqwest::Error) -> AuditError {
    AuditError::remote(
        err.status().map(|status| status.as_u16()),
        format!("{context}: {err}"),
    )
}

async fn ensure_success(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AuditError::remote(
        Some(status.as_u16()),
        format!("{context}: {}", body.trim()),
    ))
}

async fn decode_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| AuditError::Decode(format!("{context}: {err}")))
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    rate: RateNode,
}

#[derive(Debug, Deserialize)]
struct RateNode {
    remaining: u64,
    reset: i64,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

impl GraphQlResponse {
    fn into_page(self, context: &str) -> Result<RepositoryPage> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self.errors.into_iter().map(|err| err.message).collect();
            return Err(AuditError::Decode(format!(
                "{context}: {}",
                messages.join("; ")
            )));
        }
        let connection = self
            .data
            .and_then(|data| data.organization)
            .map(|organization| organization.repositories)
            .ok_or_else(|| AuditError::Decode(format!("{context}: organization not found")))?;

        let repositories = connection
            .edges
            .into_iter()
            .map(|edge| Repository {
                name: edge.node.name,
                is_archived: edge.node.is_archived,
                default_branch: edge.node.default_branch_ref.map(|branch| branch.name),
            })
            .collect();
        Ok(RepositoryPage {
            repositories,
            page_info: PageInfo {
                has_next_page: connection.page_info.has_next_page,
                end_cursor: connection.page_info.end_cursor,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    organization: Option<OrganizationNode>,
}

#[derive(Debug, Deserialize)]
struct OrganizationNode {
    repositories: RepositoryConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryConnection {
    #[serde(default)]
    edges: Vec<RepositoryEdge>,
    page_info: PageInfoNode,
}

#[derive(Debug, Deserialize)]
struct RepositoryEdge {
    node: RepositoryNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    name: String,
    #[serde(default)]
    is_archived: bool,
    default_branch_ref: Option<BranchRef>,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfoNode {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeNode>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeNode {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use std::sync::Mutex;

    struct RecordingSleeper {
        durations: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn new() -> Self {
            Self {
                durations: Mutex::new(Vec::new()),
            }
        }

        fn durations(&self) -> Vec<Duration> {
            self.durations.lock().expect("durations").clone()
        }
    }

    impl Sleeper for &RecordingSleeper {
        fn sleep<'a>(
            &'a self,
            duration: Duration,
        ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
            Box::pin(async move {
                self.durations.lock().expect("durations").push(duration);
            })
        }
    }

    fn settings(server: &MockServer) -> GitHubSettings {
        GitHubSettings {
            api_url: server.base_url(),
            graphql_url: server.url("/graphql"),
            ..GitHubSettings::new("secret", "acme")
        }
    }

    fn client<'s>(
        server: &MockServer,
        sleeper: &'s RecordingSleeper,
    ) -> GitHubClient<&'s RecordingSleeper> {
        GitHubClient::with_sleeper(settings(server), sleeper).expect("client")
    }

    #[test]
    fn retry_delays_double_from_the_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(5));
        assert_eq!(policy.delay(1), Duration::from_secs(10));
        assert_eq!(policy.delay(3), Duration::from_secs(40));
    }

    #[test]
    fn default_settings_target_public_github() {
        let settings = GitHubSettings::new("token", "acme");
        assert_eq!(settings.api_url, "https://api.github.com");
        assert_eq!(settings.graphql_url, "https://api.github.com/graphql");
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(settings.query.contains("$afterCursor"));
    }

    #[tokio::test]
    async fn rate_limit_reads_remaining_and_reset() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rate_limit")
                    .header("authorization", "Bearer secret");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"rate":{"limit":5000,"remaining":42,"reset":1700000000}}"#);
            })
            .await;
        let sleeper = RecordingSleeper::new();

        let status = client(&server, &sleeper).rate_limit().await.expect("rate");

        mock.assert_async().await;
        assert_eq!(status.remaining, 42);
        assert_eq!(status.reset, 1_700_000_000);
    }

    #[tokio::test]
    async fn rate_limit_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/rate_limit");
                then.status(502);
            })
            .await;
        let sleeper = RecordingSleeper::new();

        let err = client(&server, &sleeper).rate_limit().await.unwrap_err();

        assert_eq!(err.status(), Some(502));
        assert_eq!(mock.hits_async().await, 1);
        assert!(sleeper.durations().is_empty());
    }

    #[tokio::test]
    async fn catalog_page_maps_graphql_nodes() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .body_contains(r#""orgName":"acme""#)
                    .body_contains(r#""afterCursor":"abc""#);
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        r#"{"data":{"organization":{"repositories":{
                            "edges":[
                                {"node":{"name":"api","isArchived":false,"defaultBranchRef":{"name":"main"}}},
                                {"node":{"name":"old","isArchived":true,"defaultBranchRef":null}}
                            ],
                            "pageInfo":{"hasNextPage":true,"endCursor":"def"}}}}}"#,
                    );
            })
            .await;
        let sleeper = RecordingSleeper::new();

        let page = client(&server, &sleeper)
            .fetch_repositories(Some("abc"))
            .await
            .expect("page");

        mock.assert_async().await;
        assert_eq!(page.repositories.len(), 2);
        assert_eq!(page.repositories[0].default_branch.as_deref(), Some("main"));
        assert!(page.repositories[1].is_archived);
        assert_eq!(page.repositories[1].default_branch, None);
        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("def"));
    }

    #[tokio::test]
    async fn catalog_errors_payload_is_terminal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"data":null,"errors":[{"message":"Could not resolve organization"}]}"#);
            })
            .await;
        let sleeper = RecordingSleeper::new();

        let err = client(&server, &sleeper)
            .fetch_repositories(None)
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::Decode(_)));
        assert!(err.to_string().contains("Could not resolve organization"));
    }

    #[tokio::test]
    async fn gateway_failures_retry_with_backoff_until_exhausted() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(502);
            })
            .await;
        let sleeper = RecordingSleeper::new();

        let err = client(&server, &sleeper)
            .fetch_repositories(None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("max retries exceeded"));
        assert_eq!(mock.hits_async().await, 5);
        assert_eq!(
            sleeper.durations(),
            vec![
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(20),
                Duration::from_secs(40),
            ]
        );
    }

    #[tokio::test]
    async fn other_failures_are_terminal_with_context() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(401).body("Bad credentials");
            })
            .await;
        let sleeper = RecordingSleeper::new();

        let err = client(&server, &sleeper)
            .fetch_repositories(None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("POST /graphql"));
        assert!(err.to_string().contains("Bad credentials"));
        assert_eq!(mock.hits_async().await, 1);
        assert!(sleeper.durations().is_empty());
    }

    #[tokio::test]
    async fn root_listing_and_download_use_branch_ref() {
        let server = MockServer::start_async().await;
        let download_url = server.url("/raw/api/Dockerfile");
        let listing = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/acme/api/contents/")
                    .query_param("ref", "main");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!([
                        {"name": "src", "download_url": null},
                        {"name": "Dockerfile", "download_url": download_url},
                    ]));
            })
            .await;
        let raw = server
            .mock_async(|when, then| {
                when.method(GET).path("/raw/api/Dockerfile");
                then.status(200).body("FROM alpine:3.19\n");
            })
            .await;
        let sleeper = RecordingSleeper::new();
        let client = client(&server, &sleeper);

        let entries = client.list_root("api", "main").await.expect("listing");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].download_url, None);
        let url = entries[1].download_url.clone().expect("url");
        let contents = client.download(&url).await.expect("download");

        listing.assert_async().await;
        raw.assert_async().await;
        assert_eq!(contents, "FROM alpine:3.19\n");
    }

    #[tokio::test]
    async fn tree_listing_maps_entry_kinds() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/acme/api/git/trees/main")
                    .query_param("recursive", "1");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        r#"{"sha":"x","tree":[
                            {"path":".github/workflows","type":"tree"},
                            {"path":".github/workflows/ci.yml","type":"blob"}
                        ],"truncated":false}"#,
                    );
            })
            .await;
        let sleeper = RecordingSleeper::new();

        let tree = client(&server, &sleeper)
            .list_tree("api", "main")
            .await
            .expect("tree");

        assert_eq!(tree.len(), 2);
        assert!(!tree[0].is_blob());
        assert!(tree[1].is_blob());
        assert_eq!(tree[1].path, ".github/workflows/ci.yml");
    }

    #[tokio::test]
    async fn fetch_file_follows_download_url() {
        let server = MockServer::start_async().await;
        let download_url = server.url("/raw/api/docker-compose.yml");
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/acme/api/contents/docker-compose.yml")
                    .query_param("ref", "main");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!({
                        "name": "docker-compose.yml",
                        "download_url": download_url,
                    }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/raw/api/docker-compose.yml");
                then.status(200).body("image: redis:7\n");
            })
            .await;
        let sleeper = RecordingSleeper::new();

        let contents = client(&server, &sleeper)
            .fetch_file("api", "main", "docker-compose.yml")
            .await
            .expect("file");

        assert_eq!(contents.as_deref(), Some("image: redis:7\n"));
    }

    #[tokio::test]
    async fn fetch_file_returns_none_for_directories() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/acme/api/contents/pipeline");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"[{"name":"build.yml","download_url":"https://x/build.yml"}]"#);
            })
            .await;
        let sleeper = RecordingSleeper::new();

        let contents = client(&server, &sleeper)
            .fetch_file("api", "main", "pipeline")
            .await
            .expect("file");

        assert_eq!(contents, None);
    }

    #[tokio::test]
    async fn commit_authors_skip_missing_names() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/acme/api/commits")
                    .query_param("sha", "main")
                    .query_param("per_page", "100");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        r#"[
                            {"commit":{"author":{"name":"lee"}}},
                            {"commit":{"author":null}},
                            {"commit":{"author":{"name":"dana"}}}
                        ]"#,
                    );
            })
            .await;
        let sleeper = RecordingSleeper::new();

        let authors = client(&server, &sleeper)
            .recent_commit_authors("api", "main")
            .await
            .expect("authors");

        mock.assert_async().await;
        assert_eq!(authors, vec!["lee", "dana"]);
    }
}
