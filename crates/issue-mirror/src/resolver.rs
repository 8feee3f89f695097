use std::sync::{Arc, OnceLock};

use issue_mirror_core::error::SyncError;
use issue_mirror_core::project::{
    resolve_field_value, FieldValueRequest, ProjectHandle, ResolvedFieldValue,
};

use crate::transport::ProjectTransport;

/// Turns field/option names into project identifiers.
///
/// The project handle is looked up once and kept for the resolver's
/// lifetime. The field catalog is fetched on every request since options can
/// change while a workflow runs.
pub struct ProjectFieldResolver {
    transport: Arc<dyn ProjectTransport>,
    org: String,
    number: u64,
    handle: OnceLock<ProjectHandle>,
}

impl ProjectFieldResolver {
    pub fn new(transport: Arc<dyn ProjectTransport>, org: impl Into<String>, number: u64) -> Self {
        Self {
            transport,
            org: org.into(),
            number,
            handle: OnceLock::new(),
        }
    }

    pub async fn project(&self) -> Result<ProjectHandle, SyncError> {
        if let Some(handle) = self.handle.get() {
            return Ok(handle.clone());
        }

        let fetched = self
            .transport
            .resolve_project(&self.org, self.number)
            .await
            .map_err(|e| {
                SyncError::transport(format!("resolve project {}#{}", self.org, self.number), e)
            })?;

        tracing::debug!(project = %fetched.title, id = %fetched.id, "resolved project");

        // Concurrent first lookups may both fetch; the first stored value wins.
        Ok(self.handle.get_or_init(|| fetched).clone())
    }

    pub async fn resolve(
        &self,
        request: &FieldValueRequest,
    ) -> Result<ResolvedFieldValue, SyncError> {
        let project = self.project().await?;

        let fields = self
            .transport
            .list_fields(&project.id)
            .await
            .map_err(|e| SyncError::transport(format!("list fields of {}", project.title), e))?;

        let resolved = resolve_field_value(&fields, request)?;
        tracing::debug!(
            field = %request.field,
            value = %request.value,
            "resolved project field value"
        );
        Ok(resolved)
    }
}
