use anyhow::Result;
use async_trait::async_trait;

use issue_mirror_core::issue::{Issue, IssueState};
use issue_mirror_core::project::{FieldDescriptor, ProjectHandle};

/// Issue reads and writes against one repository.
#[async_trait]
pub trait IssueTransport: Send + Sync {
    async fn get_issue_state(&self, number: u64) -> Result<IssueState>;
    async fn list_issues(&self, exclude_closed: bool, labels: &[String]) -> Result<Vec<Issue>>;
    /// Creates a copy of `issue` in this transport's repository. Labels may be
    /// in either representation and are normalized before submission.
    async fn create_issue(&self, issue: &Issue) -> Result<Issue>;
}

/// Project board operations.
#[async_trait]
pub trait ProjectTransport: Send + Sync {
    async fn resolve_project(&self, org: &str, number: u64) -> Result<ProjectHandle>;
    async fn list_fields(&self, project_id: &str) -> Result<Vec<FieldDescriptor>>;
    async fn add_item(&self, project_id: &str, issue_node_id: &str) -> Result<String>;
    async fn set_field_value(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> Result<()>;
    async fn create_issue_in_org(
        &self,
        org: &str,
        repo: &str,
        title: &str,
        body: &str,
    ) -> Result<Issue>;
}
