use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::labels::{normalize_labels, Label};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn parse(s: &str) -> Result<Self, ParseStateError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(IssueState::Open),
            "closed" => Ok(IssueState::Closed),
            other => Err(ParseStateError::UnknownState {
                value: other.to_owned(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseStateError {
    #[error("unknown issue state: {value}")]
    UnknownState { value: String },
}

/// An issue as delivered by an event payload or an issue listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,
}

impl Issue {
    pub fn new(number: u64, title: impl Into<String>) -> Self {
        Self {
            number,
            node_id: None,
            title: title.into(),
            body: None,
            labels: Vec::new(),
            state: None,
        }
    }

    pub fn label_names(&self) -> Vec<String> {
        normalize_labels(Some(&self.labels))
    }

    pub fn without_labels(&self) -> Self {
        Self {
            labels: Vec::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_webhook_issue_with_label_objects() {
        let issue: Issue = serde_json::from_value(serde_json::json!({
            "number": 12,
            "node_id": "I_kwDO",
            "title": "Crash on start",
            "body": null,
            "state": "open",
            "labels": [{ "id": 1, "name": "bug", "color": "d73a4a" }],
            "user": { "login": "octocat" },
        }))
        .unwrap();

        assert_eq!(issue.number, 12);
        assert_eq!(issue.node_id.as_deref(), Some("I_kwDO"));
        assert_eq!(issue.body, None);
        assert_eq!(issue.state, Some(IssueState::Open));
        assert_eq!(issue.label_names(), vec!["bug".to_owned()]);
    }

    #[test]
    fn deserializes_minimal_issue() {
        let issue: Issue =
            serde_json::from_value(serde_json::json!({ "number": 123, "node_id": "n" })).unwrap();
        assert_eq!(issue.title, "");
        assert!(issue.labels.is_empty());
        assert_eq!(issue.state, None);
    }

    #[test]
    fn parse_state_is_case_insensitive() {
        assert_eq!(IssueState::parse("OPEN").unwrap(), IssueState::Open);
        assert_eq!(IssueState::parse(" closed ").unwrap(), IssueState::Closed);
        assert!(matches!(
            IssueState::parse("merged"),
            Err(ParseStateError::UnknownState { .. })
        ));
    }
}
