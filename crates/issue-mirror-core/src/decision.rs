//! Decides whether a single `issues` event qualifies for mirroring.
//!
//! Labeling events are judged on the label that triggered them, never on the
//! issue's full label set: an unrelated label added to an already-matching
//! issue must not mirror it a second time. Every other action is judged on
//! the labels the issue currently carries.

use crate::error::SyncError;
use crate::event::{IssueAction, Payload};
use crate::labels::{any_match, contains_ignore_case, normalize_labels};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept(AcceptReason),
    Reject(RejectReason),
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptReason {
    /// The triggering label is one of the required labels.
    LabelRequired { label: String },
    /// No required labels configured and this is not a labeling event.
    NoFilter,
    /// The issue carries at least one required label.
    MatchingLabel { issue_labels: Vec<String> },
    /// Required labels configured but the issue has none, or the action is
    /// one nothing else covers. Accepted as-is.
    CatchAll { action: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NoRequiredLabels { label: String },
    LabelNotRequired { label: String },
    UnlabeledUnsupported,
    NoMatchingLabel { issue_labels: Vec<String> },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NoRequiredLabels { label } => {
                write!(f, "label '{label}' added but no required labels are configured")
            }
            RejectReason::LabelNotRequired { label } => {
                write!(f, "label '{label}' does not match any required label")
            }
            RejectReason::UnlabeledUnsupported => write!(f, "'unlabeled' events are not supported"),
            RejectReason::NoMatchingLabel { issue_labels } => {
                write!(f, "issue labels {issue_labels:?} match no required label")
            }
        }
    }
}

/// Evaluates the assignment predicate. Branch order is fixed and the first
/// matching branch decides.
pub fn evaluate(payload: &Payload, required: &[String]) -> Result<Decision, SyncError> {
    let action = IssueAction::parse(payload.action.as_deref());

    match action {
        IssueAction::Labeled => {
            let label = payload
                .label
                .as_ref()
                .and_then(|l| l.name.as_deref())
                .filter(|n| !n.is_empty())
                .ok_or(SyncError::MissingLabelOnEvent)?;

            if required.is_empty() {
                return Ok(Decision::Reject(RejectReason::NoRequiredLabels {
                    label: label.to_owned(),
                }));
            }

            if contains_ignore_case(required, label) {
                Ok(Decision::Accept(AcceptReason::LabelRequired {
                    label: label.to_owned(),
                }))
            } else {
                Ok(Decision::Reject(RejectReason::LabelNotRequired {
                    label: label.to_owned(),
                }))
            }
        }
        IssueAction::Unlabeled => Ok(Decision::Reject(RejectReason::UnlabeledUnsupported)),
        _ if required.is_empty() => Ok(Decision::Accept(AcceptReason::NoFilter)),
        _ => {
            let issue_labels =
                normalize_labels(payload.issue.as_ref().map(|i| i.labels.as_slice()));

            if issue_labels.is_empty() {
                return Ok(Decision::Accept(AcceptReason::CatchAll {
                    action: payload.action.clone(),
                }));
            }

            if any_match(&issue_labels, required) {
                Ok(Decision::Accept(AcceptReason::MatchingLabel { issue_labels }))
            } else {
                Ok(Decision::Reject(RejectReason::NoMatchingLabel { issue_labels }))
            }
        }
    }
}
