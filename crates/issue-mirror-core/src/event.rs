use serde::{Deserialize, Deserializer, Serialize};

use crate::issue::Issue;

pub const EVT_WORKFLOW_DISPATCH: &str = "workflow_dispatch";
pub const EVT_ISSUES: &str = "issues";

/// One automation trigger: the event name, its payload, and the operator's
/// required labels.
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub name: String,
    pub payload: Payload,
    pub config: EventConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventConfig {
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<DispatchInputs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<Issue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<EventLabel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchInputs {
    #[serde(
        default,
        rename = "excludeClosed",
        alias = "exclude_closed",
        deserialize_with = "string_or_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub exclude_closed: Option<String>,
}

// Boolean dispatch inputs arrive as strings or as JSON booleans depending on
// how the workflow declares them.
fn string_or_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl DispatchInputs {
    pub fn exclude_closed(&self) -> bool {
        self.exclude_closed.as_deref() == Some("true")
    }
}

/// The label that triggered a `labeled`/`unlabeled` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLabel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    WorkflowDispatch,
    Issues,
    Unsupported(String),
}

impl EventKind {
    pub fn classify(name: &str) -> Self {
        match name {
            EVT_WORKFLOW_DISPATCH => EventKind::WorkflowDispatch,
            EVT_ISSUES => EventKind::Issues,
            other => EventKind::Unsupported(other.to_owned()),
        }
    }
}

/// The `issues` actions the assignment predicate tells apart. Every other
/// action (`opened`, `edited`, `reopened`, ...) is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueAction {
    Labeled,
    Unlabeled,
    Other(String),
    Missing,
}

impl IssueAction {
    pub fn parse(action: Option<&str>) -> Self {
        let Some(action) = action else {
            return IssueAction::Missing;
        };
        match action {
            "labeled" => IssueAction::Labeled,
            "unlabeled" => IssueAction::Unlabeled,
            other => IssueAction::Other(other.to_owned()),
        }
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        EventKind::classify(&self.name)
    }

    /// Builds an event from a raw webhook payload as written by the runner.
    pub fn from_json(
        name: impl Into<String>,
        payload: &str,
        labels: Vec<String>,
    ) -> Result<Self, serde_json::Error> {
        let payload: Payload = serde_json::from_str(payload)?;
        Ok(Self {
            name: name.into(),
            payload,
            config: EventConfig { labels },
        })
    }
}
