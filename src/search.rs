use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::time::Duration;
use tracing::info;

use crate::config::Settings;
use crate::error::SearchError;
use crate::models::{CodeMatch, PendingRequest, Repo, RepoResult, SearchParams};
use crate::paginator::paginate;
use crate::progress::{Reporter, Stage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct GroupRecord {
    id: u64,
}

/// Drives the three-stage search pipeline against one GitLab instance:
/// resolve groups, enumerate their repositories, search code in every
/// repository.
#[derive(Clone)]
pub struct CodeSearcher {
    client: Client,
    settings: Settings,
    reporter: Arc<Reporter>,
}

impl CodeSearcher {
    /// Build the shared HTTP client with the private token attached to every
    /// request and a fixed per-request timeout.
    pub fn new(settings: Settings, reporter: Reporter) -> Result<Self, SearchError> {
        let mut token = HeaderValue::from_str(&settings.private_token)
            .map_err(|_| SearchError::Config("token contains invalid characters".to_string()))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("PRIVATE-TOKEN", token);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(CodeSearcher {
            client,
            settings,
            reporter: Arc::new(reporter),
        })
    }

    /// Run the full pipeline and return one result per searched repository,
    /// in completion order.
    pub async fn search(&self, params: &SearchParams) -> Result<Vec<RepoResult>, SearchError> {
        let group_ids = self.resolve_groups(params).await?;
        let repos = self.enumerate_repositories(group_ids, params).await?;
        self.search_code(repos, params).await
    }

    /// The explicit group list when one was given, otherwise every group
    /// visible to the token.
    async fn resolve_groups(&self, params: &SearchParams) -> Result<Vec<u64>, SearchError> {
        let group_ids = match &params.groups {
            Some(raw) => parse_group_ids(raw)?,
            None => self.retrieve_group_ids(params).await?,
        };

        self.reporter.complete(Stage::Groups);
        info!("searching {} groups", group_ids.len());
        Ok(group_ids)
    }

    async fn retrieve_group_ids(&self, params: &SearchParams) -> Result<Vec<u64>, SearchError> {
        let request = PendingRequest::new(
            format!("{}/api/v4/groups", self.settings.gitlab_url),
            &[
                ("per_page", "100"),
                ("pagination", "keyset"),
                ("order_by", "id"),
                ("sort", "asc"),
            ],
        );

        paginate(
            &self.client,
            &self.settings,
            request,
            |record| Ok(serde_json::from_value::<GroupRecord>(record)?.id),
            params.max_jitter_secs,
            &self.reporter,
        )
        .await
    }

    /// Fan out one enumeration task per group, merging the per-group sets as
    /// tasks finish. The set union deduplicates repositories reported by more
    /// than one group. A failed group aborts the enumeration.
    async fn enumerate_repositories(
        &self,
        group_ids: Vec<u64>,
        params: &SearchParams,
    ) -> Result<HashSet<Repo>, SearchError> {
        self.reporter.set_total(Stage::Repos, group_ids.len() as u64);
        let semaphore = Arc::new(Semaphore::new(params.max_workers));

        let mut tasks = FuturesUnordered::new();
        for group_id in group_ids {
            let searcher = self.clone();
            let params = params.clone();
            let semaphore = semaphore.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.unwrap();
                searcher.repositories_in_group(group_id, &params).await
            }));
        }

        let mut repos: HashSet<Repo> = HashSet::new();
        while let Some(joined) = tasks.next().await {
            repos.extend(joined??);
            self.reporter.advance(Stage::Repos);
        }

        info!("searching {} repositories", repos.len());
        Ok(repos)
    }

    /// Repositories of one group (subgroups included), restricted to the
    /// requested visibility levels.
    async fn repositories_in_group(
        &self,
        group_id: u64,
        params: &SearchParams,
    ) -> Result<HashSet<Repo>, SearchError> {
        let request = PendingRequest::new(
            format!(
                "{}/api/v4/groups/{}/projects",
                self.settings.gitlab_url, group_id
            ),
            &[("per_page", "100"), ("include_subgroups", "true")],
        );

        let repos: Vec<Repo> = paginate(
            &self.client,
            &self.settings,
            request,
            |record| Ok(serde_json::from_value(record)?),
            params.max_jitter_secs,
            &self.reporter,
        )
        .await?;

        Ok(repos
            .into_iter()
            .filter(|repo| params.visibility.contains(&repo.visibility))
            .collect())
    }

    /// Fan out one search task per repository, collecting one `RepoResult`
    /// per task in completion order.
    async fn search_code(
        &self,
        repos: HashSet<Repo>,
        params: &SearchParams,
    ) -> Result<Vec<RepoResult>, SearchError> {
        self.reporter.set_total(Stage::Code, repos.len() as u64);
        let semaphore = Arc::new(Semaphore::new(params.max_workers));

        let mut tasks = FuturesUnordered::new();
        for repo in repos {
            let searcher = self.clone();
            let params = params.clone();
            let semaphore = semaphore.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.unwrap();
                let matches = searcher.search_in_repo(repo.id, &params).await?;
                Ok::<RepoResult, SearchError>(RepoResult {
                    name: repo.name,
                    web_url: repo.web_url,
                    matches,
                })
            }));
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.next().await {
            results.push(joined??);
            self.reporter.advance(Stage::Code);
        }

        Ok(results)
    }

    async fn search_in_repo(
        &self,
        repo_id: u64,
        params: &SearchParams,
    ) -> Result<Vec<CodeMatch>, SearchError> {
        let term = params.scoped_search_term();
        let request = PendingRequest::new(
            format!(
                "{}/api/v4/projects/{}/search",
                self.settings.gitlab_url, repo_id
            ),
            &[("scope", "blobs"), ("search", &term), ("per_page", "100")],
        );

        paginate(
            &self.client,
            &self.settings,
            request,
            |record| Ok(serde_json::from_value(record)?),
            params.max_jitter_secs,
            &self.reporter,
        )
        .await
    }
}

/// Parse the user-supplied comma-separated group-id list.
fn parse_group_ids(raw: &str) -> Result<Vec<u64>, SearchError> {
    raw.split(',')
        .map(|id| {
            id.trim()
                .parse::<u64>()
                .map_err(|_| SearchError::Config(format!("invalid group id '{}'", id.trim())))
        })
        .collect()
}
