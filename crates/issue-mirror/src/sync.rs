use std::sync::Arc;

use issue_mirror_core::config::RepoRef;
use issue_mirror_core::decision::{self, AcceptReason, Decision, RejectReason};
use issue_mirror_core::error::SyncError;
use issue_mirror_core::event::{Event, EventKind};
use issue_mirror_core::issue::Issue;
use issue_mirror_core::project::{FieldValueRequest, ResolvedFieldValue};
use tokio::task::JoinSet;

use crate::resolver::ProjectFieldResolver;
use crate::transport::{IssueTransport, ProjectTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Bulk sync found no source issues.
    NothingToSync,
    /// The issue did not qualify for mirroring.
    Skipped(RejectReason),
    /// Issues created in the destination, in source order.
    Mirrored(Vec<Issue>),
}

/// Project board propagation for mirrored issues.
pub struct ProjectSync {
    transport: Arc<dyn ProjectTransport>,
    resolver: ProjectFieldResolver,
    field: Option<FieldValueRequest>,
    create_in: Option<RepoRef>,
}

impl ProjectSync {
    pub fn new(transport: Arc<dyn ProjectTransport>, org: impl Into<String>, number: u64) -> Self {
        Self {
            resolver: ProjectFieldResolver::new(transport.clone(), org, number),
            transport,
            field: None,
            create_in: None,
        }
    }

    pub fn with_field(mut self, field: Option<FieldValueRequest>) -> Self {
        self.field = field;
        self
    }

    /// Create mirrored issues in `repo` through the project transport
    /// instead of the destination issue transport.
    pub fn create_in(mut self, repo: Option<RepoRef>) -> Self {
        self.create_in = repo;
        self
    }

    /// Resolves the configured field value. Called before anything is written.
    async fn resolve_field(&self) -> Result<Option<ResolvedFieldValue>, SyncError> {
        match &self.field {
            Some(field) => Ok(Some(self.resolver.resolve(field).await?)),
            None => Ok(None),
        }
    }

    async fn assign(
        &self,
        issue: &Issue,
        resolved: Option<&ResolvedFieldValue>,
    ) -> Result<(), SyncError> {
        let project = self.resolver.project().await?;
        let node_id = issue.node_id.as_deref().ok_or_else(|| {
            SyncError::invalid_payload(format!("issue #{} has no node id", issue.number))
        })?;

        tracing::info!(issue = issue.number, project = %project.title, "syncing issue to project");

        let item = self
            .transport
            .add_item(&project.id, node_id)
            .await
            .map_err(|e| {
                SyncError::transport(format!("add issue #{} to project", issue.number), e)
            })?;

        let (Some(field), Some(resolved)) = (&self.field, resolved) else {
            return Ok(());
        };

        self.transport
            .set_field_value(&project.id, &item, &resolved.field, &resolved.value)
            .await
            .map_err(|e| {
                SyncError::transport(
                    format!("set '{}' on project item for #{}", field.field, issue.number),
                    e,
                )
            })?;

        tracing::info!(
            issue = issue.number,
            field = %field.field,
            value = %field.value,
            "project field set"
        );
        Ok(())
    }
}

struct Forwarder {
    target: Arc<dyn IssueTransport>,
    sync_labels: bool,
    project: Option<ProjectSync>,
}

impl Forwarder {
    async fn forward(&self, issue: &Issue) -> Result<Issue, SyncError> {
        let outgoing = if self.sync_labels {
            issue.clone()
        } else {
            issue.without_labels()
        };

        let resolved = match &self.project {
            Some(project) => project.resolve_field().await?,
            None => None,
        };

        let org_target = self
            .project
            .as_ref()
            .and_then(|p| p.create_in.as_ref().map(|repo| (p, repo)));

        let created = match org_target {
            Some((project, repo)) => {
                tracing::info!(issue = issue.number, repo = %repo.slug(), "creating issue in org");
                project
                    .transport
                    .create_issue_in_org(
                        &repo.owner,
                        &repo.name,
                        &outgoing.title,
                        outgoing.body.as_deref().unwrap_or_default(),
                    )
                    .await
                    .map_err(|e| {
                        SyncError::transport(
                            format!("create issue from #{} in {}", issue.number, repo.slug()),
                            e,
                        )
                    })?
            }
            None => self.target.create_issue(&outgoing).await.map_err(|e| {
                SyncError::transport(format!("create issue from #{}", issue.number), e)
            })?,
        };

        if let Some(project) = &self.project {
            project.assign(&created, resolved.as_ref()).await?;
        }

        Ok(created)
    }
}

/// Mirrors issues from a source repository into a destination repository in
/// response to a single automation event.
pub struct Synchronizer {
    source: Arc<dyn IssueTransport>,
    forwarder: Arc<Forwarder>,
}

impl Synchronizer {
    pub fn new(source: Arc<dyn IssueTransport>, target: Arc<dyn IssueTransport>) -> Self {
        Self::with_options(source, target, true, None)
    }

    pub fn with_options(
        source: Arc<dyn IssueTransport>,
        target: Arc<dyn IssueTransport>,
        sync_labels: bool,
        project: Option<ProjectSync>,
    ) -> Self {
        Self {
            source,
            forwarder: Arc::new(Forwarder {
                target,
                sync_labels,
                project,
            }),
        }
    }

    pub async fn synchronize(&self, event: &Event) -> Result<SyncOutcome, SyncError> {
        match event.kind() {
            EventKind::WorkflowDispatch => {
                let exclude_closed = event
                    .payload
                    .inputs
                    .as_ref()
                    .is_some_and(|i| i.exclude_closed());
                if exclude_closed {
                    tracing::info!(notice = true, "Closed issues will NOT be synced.");
                } else {
                    tracing::info!(notice = true, "Closed issues will be synced.");
                }
                self.mirror_all(exclude_closed, &event.config.labels).await
            }
            EventKind::Issues => self.mirror_one(event).await,
            EventKind::Unsupported(name) => {
                tracing::warn!(event = %name, "event is not expected, failing");
                Err(SyncError::UnsupportedEvent { name })
            }
        }
    }

    async fn mirror_one(&self, event: &Event) -> Result<SyncOutcome, SyncError> {
        tracing::debug!(labels = ?event.config.labels, "required labels");
        tracing::debug!(payload = ?event.payload, "payload received");

        let issue = event
            .payload
            .issue
            .as_ref()
            .ok_or_else(|| SyncError::invalid_payload("issue payload object was null"))?;

        let decision = decision::evaluate(&event.payload, &event.config.labels)?;
        log_decision(&decision, &event.config.labels);

        match decision {
            Decision::Accept(_) => {
                tracing::info!(issue = issue.number, "copying issue to target organization");
                let created = self.forwarder.forward(issue).await?;
                Ok(SyncOutcome::Mirrored(vec![created]))
            }
            Decision::Reject(reason) => {
                tracing::info!(issue = issue.number, %reason, "skipped assignment as it didn't fulfill requirements");
                Ok(SyncOutcome::Skipped(reason))
            }
        }
    }

    async fn mirror_all(
        &self,
        exclude_closed: bool,
        labels: &[String],
    ) -> Result<SyncOutcome, SyncError> {
        let issues = self
            .source
            .list_issues(exclude_closed, labels)
            .await
            .map_err(|e| SyncError::transport("list source issues", e))?;

        if issues.is_empty() {
            tracing::info!(notice = true, "No issues found");
            return Ok(SyncOutcome::NothingToSync);
        }

        let total = issues.len();
        tracing::info!(count = total, "updating issues");

        let mut set = JoinSet::new();
        for (idx, issue) in issues.into_iter().enumerate() {
            let forwarder = self.forwarder.clone();
            set.spawn(async move {
                let result = forwarder.forward(&issue).await;
                (idx, issue.number, result)
            });
        }

        let mut created = Vec::with_capacity(total);
        let mut failures = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, _, Ok(issue))) => created.push((idx, issue)),
                Ok((_, number, Err(err))) => {
                    tracing::error!(issue = number, error = %err, "failed to mirror issue");
                    failures.push(err);
                }
                Err(err) => failures.push(SyncError::transport("mirror task", err)),
            }
        }

        if !failures.is_empty() {
            return Err(SyncError::Aggregate {
                failed: failures.len(),
                total,
                source: Box::new(failures.swap_remove(0)),
            });
        }

        created.sort_by_key(|(idx, _)| *idx);
        Ok(SyncOutcome::Mirrored(
            created.into_iter().map(|(_, issue)| issue).collect(),
        ))
    }
}

fn log_decision(decision: &Decision, required: &[String]) {
    match decision {
        Decision::Accept(AcceptReason::LabelRequired { label }) => {
            tracing::info!(%label, "found matching label in required labels");
        }
        Decision::Accept(AcceptReason::NoFilter) => {
            tracing::info!("matching requirements: not a labeling event and no labels found in the configuration");
        }
        Decision::Accept(AcceptReason::MatchingLabel { issue_labels }) => {
            tracing::info!(?issue_labels, ?required, "found matching element between issue and required labels");
        }
        Decision::Accept(AcceptReason::CatchAll { action }) => {
            tracing::debug!(?action, "case not considered, accepted");
        }
        Decision::Reject(RejectReason::NoRequiredLabels { label }) => {
            tracing::info!(notice = true, %label, "no required labels found for event, skipping assignment");
        }
        Decision::Reject(RejectReason::LabelNotRequired { label }) => {
            tracing::info!(notice = true, %label, ?required, "label does not match any required label, skipping");
        }
        Decision::Reject(RejectReason::UnlabeledUnsupported) => {
            tracing::warn!("no support for 'unlabeled' event, skipping");
        }
        Decision::Reject(RejectReason::NoMatchingLabel { .. }) => {}
    }
}
