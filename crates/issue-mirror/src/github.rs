use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use issue_mirror_core::config::RepoRef;
use issue_mirror_core::issue::{Issue, IssueState};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::transport::IssueTransport;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PER_PAGE: usize = 100;

/// REST issue client bound to a single repository.
#[derive(Debug, Clone)]
pub struct GithubIssues {
    client: reqwest::Client,
    api_url: Url,
    token: String,
    repo: RepoRef,
}

impl GithubIssues {
    pub fn new(repo: RepoRef, token: String, api_url: &str) -> anyhow::Result<Self> {
        if repo.owner.trim().is_empty() || repo.name.trim().is_empty() {
            return Err(anyhow!("invalid github repo: {}", repo.slug()));
        }
        if token.trim().is_empty() {
            return Err(anyhow!("missing github token"));
        }

        let api_url = Url::parse(api_url.trim())
            .with_context(|| format!("parse github api url: {api_url}"))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = reqwest::Client::builder()
            .user_agent(format!("issue-mirror/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("build reqwest client")?;

        Ok(Self {
            client,
            api_url,
            token,
            repo,
        })
    }

    fn endpoint(&self, tail: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("github api url cannot be a base: {}", self.api_url))?
            .pop_if_empty()
            .extend(["repos", self.repo.owner.as_str(), self.repo.name.as_str(), "issues"])
            .extend(tail);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> anyhow::Result<T> {
        let resp = req
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.token),
            )
            .send()
            .await
            .context("send request")?;
        let status = resp.status();
        let text = resp.text().await.context("read response")?;

        if !status.is_success() {
            return Err(anyhow!("github api error ({status}): {text}"));
        }

        serde_json::from_str(&text).context("parse github response")
    }
}

#[derive(Debug, Deserialize)]
struct RestIssue {
    #[serde(flatten)]
    issue: Issue,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RestState {
    state: String,
}

#[derive(Debug, Serialize)]
struct CreateIssueBody<'a> {
    title: &'a str,
    body: &'a str,
    labels: Vec<String>,
}

#[async_trait]
impl IssueTransport for GithubIssues {
    async fn get_issue_state(&self, number: u64) -> anyhow::Result<IssueState> {
        let url = self.endpoint(&[&number.to_string()])?;
        let data: RestState = self
            .send(self.client.get(url))
            .await
            .with_context(|| format!("github get issue #{number}"))?;

        Ok(if data.state == "open" {
            IssueState::Open
        } else {
            IssueState::Closed
        })
    }

    async fn list_issues(
        &self,
        exclude_closed: bool,
        labels: &[String],
    ) -> anyhow::Result<Vec<Issue>> {
        let state = if exclude_closed { "open" } else { "all" };
        let per_page = PER_PAGE.to_string();
        let mut out = Vec::new();

        for page in 1usize.. {
            let mut url = self.endpoint(&[])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("state", state);
                if !labels.is_empty() {
                    query.append_pair("labels", &labels.join(","));
                }
                query.append_pair("per_page", &per_page);
                query.append_pair("page", &page.to_string());
            }

            let batch: Vec<RestIssue> = self
                .send(self.client.get(url))
                .await
                .with_context(|| format!("github list issues (page {page})"))?;

            let fetched = batch.len();
            out.extend(
                batch
                    .into_iter()
                    .filter(|i| i.pull_request.is_none())
                    .map(|i| i.issue),
            );

            if fetched < PER_PAGE {
                break;
            }
        }

        tracing::debug!(repo = %self.repo.slug(), count = out.len(), state, "listed issues");
        Ok(out)
    }

    async fn create_issue(&self, issue: &Issue) -> anyhow::Result<Issue> {
        if issue.title.trim().is_empty() {
            return Err(anyhow!("issue #{} has no title", issue.number));
        }

        let labels = issue.label_names();
        tracing::info!(
            issue = issue.number,
            repo = %self.repo.slug(),
            labels = ?labels,
            "copying issue to target repo"
        );

        let url = self.endpoint(&[])?;
        let body = CreateIssueBody {
            title: &issue.title,
            body: issue.body.as_deref().unwrap_or_default(),
            labels,
        };

        let created: RestIssue = self
            .send(self.client.post(url).json(&body))
            .await
            .with_context(|| format!("github create issue from #{}", issue.number))?;

        Ok(created.issue)
    }
}
