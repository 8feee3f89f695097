use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use issue_mirror_core::issue::{Issue, IssueState};
use issue_mirror_core::project::{FieldDescriptor, FieldOption, ProjectHandle, FIELD_PAGE_SIZE};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::transport::ProjectTransport;

pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// GraphQL client for projects (v2). Needs a token with `project` scope on
/// the organization that owns the board.
#[derive(Debug, Clone)]
pub struct GithubProjects {
    client: reqwest::Client,
    graphql_url: String,
    token: String,
    destination_token: Option<String>,
}

impl GithubProjects {
    pub fn new(token: String, graphql_url: String) -> anyhow::Result<Self> {
        if token.trim().is_empty() {
            return Err(anyhow!("missing github token"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .user_agent(format!("issue-mirror/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("build reqwest client")?;

        Ok(Self {
            client,
            graphql_url,
            token,
            destination_token: None,
        })
    }

    /// Token used when creating issues in the destination organization.
    pub fn with_destination_token(mut self, token: Option<String>) -> Self {
        self.destination_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    async fn repository_id(&self, token: &str, org: &str, repo: &str) -> anyhow::Result<String> {
        let query = r#"
            query FindRepo($organization: String!, $repo: String!) {
                repository(owner: $organization, name: $repo) { id }
            }
        "#;

        #[derive(Debug, Deserialize)]
        struct Data {
            repository: Option<Repository>,
        }
        #[derive(Debug, Deserialize)]
        struct Repository {
            id: String,
        }

        let data: Data = self
            .graphql(
                token,
                query,
                serde_json::json!({ "organization": org, "repo": repo }),
            )
            .await
            .context("github find repository")?;

        data.repository
            .map(|r| r.id)
            .ok_or_else(|| anyhow!("repository {org}/{repo} not found"))
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        token: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> anyhow::Result<T> {
        #[derive(Debug, Serialize)]
        struct GraphqlRequest<'a> {
            query: &'a str,
            variables: serde_json::Value,
        }

        #[derive(Debug, Deserialize)]
        struct GraphqlResponse<T> {
            data: Option<T>,
            #[serde(default)]
            errors: Vec<GraphqlError>,
        }

        #[derive(Debug, Deserialize)]
        struct GraphqlError {
            message: String,
        }

        let resp = self
            .client
            .post(&self.graphql_url)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
            .json(&GraphqlRequest { query, variables })
            .send()
            .await
            .context("send request")?;
        let status = resp.status();
        let text = resp.text().await.context("read response")?;

        if !status.is_success() {
            return Err(anyhow!("github api error ({status}): {text}"));
        }

        let parsed: GraphqlResponse<T> =
            serde_json::from_str(&text).context("parse graphql response")?;
        if let Some(first) = parsed.errors.first() {
            return Err(anyhow!("github graphql error: {}", first.message));
        }
        parsed
            .data
            .ok_or_else(|| anyhow!("github graphql response missing data"))
    }
}

#[derive(Debug, Deserialize)]
struct RawField {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    options: Option<Vec<FieldOption>>,
}

#[async_trait]
impl ProjectTransport for GithubProjects {
    async fn resolve_project(&self, org: &str, number: u64) -> anyhow::Result<ProjectHandle> {
        let query = r#"
            query ProjectV2($organization: String!, $number: Int!) {
                organization(login: $organization) {
                    projectV2(number: $number) { id title }
                }
            }
        "#;

        #[derive(Debug, Deserialize)]
        struct Data {
            organization: Organization,
        }
        #[derive(Debug, Deserialize)]
        struct Organization {
            #[serde(rename = "projectV2")]
            project: Option<ProjectHandle>,
        }

        let data: Data = self
            .graphql(
                &self.token,
                query,
                serde_json::json!({ "organization": org, "number": number }),
            )
            .await
            .context("github project lookup")?;

        data.organization
            .project
            .ok_or_else(|| anyhow!("project {number} not found in {org}"))
    }

    async fn list_fields(&self, project_id: &str) -> anyhow::Result<Vec<FieldDescriptor>> {
        let query = r#"
            query ProjectFields($project: ID!, $first: Int!) {
                node(id: $project) {
                    ... on ProjectV2 {
                        fields(first: $first) {
                            nodes {
                                ... on ProjectV2Field { id name }
                                ... on ProjectV2IterationField { id name }
                                ... on ProjectV2SingleSelectField {
                                    id
                                    name
                                    options { id name }
                                }
                            }
                        }
                    }
                }
            }
        "#;

        #[derive(Debug, Deserialize)]
        struct Data {
            node: Option<Node>,
        }
        #[derive(Debug, Deserialize)]
        struct Node {
            fields: Fields,
        }
        #[derive(Debug, Deserialize)]
        struct Fields {
            nodes: Vec<RawField>,
        }

        let data: Data = self
            .graphql(
                &self.token,
                query,
                serde_json::json!({ "project": project_id, "first": FIELD_PAGE_SIZE }),
            )
            .await
            .context("github project fields")?;

        let node = data
            .node
            .ok_or_else(|| anyhow!("project node {project_id} not found"))?;

        let fields: Vec<FieldDescriptor> = node
            .fields
            .nodes
            .into_iter()
            .filter(|f| !f.id.is_empty())
            .map(|f| FieldDescriptor {
                name: f.name,
                id: f.id,
                options: f.options,
            })
            .collect();

        tracing::debug!(project = %project_id, count = fields.len(), "fetched project fields");
        Ok(fields)
    }

    async fn add_item(&self, project_id: &str, issue_node_id: &str) -> anyhow::Result<String> {
        let query = r#"
            mutation AddProjectItem($project: ID!, $issue: ID!) {
                addProjectV2ItemById(input: {projectId: $project, contentId: $issue}) {
                    item { id }
                }
            }
        "#;

        #[derive(Debug, Deserialize)]
        struct Data {
            #[serde(rename = "addProjectV2ItemById")]
            add_item: AddItem,
        }
        #[derive(Debug, Deserialize)]
        struct AddItem {
            item: Item,
        }
        #[derive(Debug, Deserialize)]
        struct Item {
            id: String,
        }

        let data: Data = self
            .graphql(
                &self.token,
                query,
                serde_json::json!({ "project": project_id, "issue": issue_node_id }),
            )
            .await
            .context("github add project item")?;

        Ok(data.add_item.item.id)
    }

    async fn set_field_value(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> anyhow::Result<()> {
        let query = r#"
            mutation UpdateItemField(
                $project: ID!
                $item: ID!
                $targetField: ID!
                $targetFieldValue: String!
            ) {
                updateProjectV2ItemFieldValue(
                    input: {
                        projectId: $project
                        itemId: $item
                        fieldId: $targetField
                        value: { singleSelectOptionId: $targetFieldValue }
                    }
                ) {
                    projectV2Item { id }
                }
            }
        "#;

        let resp: serde_json::Value = self
            .graphql(
                &self.token,
                query,
                serde_json::json!({
                    "project": project_id,
                    "item": item_id,
                    "targetField": field_id,
                    "targetFieldValue": option_id,
                }),
            )
            .await
            .context("github update project item field")?;

        tracing::debug!(response = %resp, "updated project item field");
        Ok(())
    }

    async fn create_issue_in_org(
        &self,
        org: &str,
        repo: &str,
        title: &str,
        body: &str,
    ) -> anyhow::Result<Issue> {
        let token = self.destination_token.as_deref().unwrap_or(&self.token);
        let repo_id = self.repository_id(token, org, repo).await?;

        let query = r#"
            mutation CreateIssue($title: String!, $body: String!, $repo_id: ID!) {
                createIssue(input: {repositoryId: $repo_id, title: $title, body: $body}) {
                    issue { id number title body state }
                }
            }
        "#;

        #[derive(Debug, Deserialize)]
        struct Data {
            #[serde(rename = "createIssue")]
            create_issue: CreateIssue,
        }
        #[derive(Debug, Deserialize)]
        struct CreateIssue {
            issue: GraphqlIssue,
        }
        #[derive(Debug, Deserialize)]
        struct GraphqlIssue {
            id: String,
            number: u64,
            title: String,
            #[serde(default)]
            body: Option<String>,
            state: String,
        }

        let data: Data = self
            .graphql(
                token,
                query,
                serde_json::json!({ "title": title, "body": body, "repo_id": repo_id }),
            )
            .await
            .context("github create issue in org")?;

        let gh = data.create_issue.issue;
        Ok(Issue {
            number: gh.number,
            node_id: Some(gh.id),
            title: gh.title,
            body: gh.body,
            labels: Vec::new(),
            state: IssueState::parse(&gh.state).ok(),
        })
    }
}
