use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every way a synchronization run can fail.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },

    #[error("event '{name}' is not expected")]
    UnsupportedEvent { name: String },

    #[error("no label found in a labeling event")]
    MissingLabelOnEvent,

    #[error("field '{field}' does not exist")]
    FieldNotFound { field: String },

    #[error("field '{field}' does not have any available options; add options to set values")]
    FieldHasNoOptions { field: String },

    #[error("project value '{value}' does not exist; available values are {}", quoted_list(.available))]
    OptionNotFound { value: String, available: Vec<String> },

    #[error("{operation} failed")]
    Transport {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("{failed} of {total} issues failed to mirror")]
    Aggregate {
        failed: usize,
        total: usize,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        SyncError::InvalidPayload {
            reason: reason.into(),
        }
    }

    pub fn transport(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        SyncError::Transport {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

fn quoted_list(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("\"{n}\"")).collect();
    format!("[{}]", quoted.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_not_found_lists_available_values() {
        let err = SyncError::OptionNotFound {
            value: "Blocked".to_owned(),
            available: vec!["Todo".to_owned(), "Done".to_owned()],
        };
        assert_eq!(
            err.to_string(),
            "project value 'Blocked' does not exist; available values are [\"Todo\",\"Done\"]"
        );
    }

    #[test]
    fn transport_keeps_cause_chain() {
        let inner = std::io::Error::other("connection reset");
        let err = SyncError::Aggregate {
            failed: 1,
            total: 2,
            source: Box::new(SyncError::transport("create issue #4", inner)),
        };

        let mut chain = Vec::new();
        let mut cur: Option<&(dyn std::error::Error + 'static)> = Some(&err);
        while let Some(e) = cur {
            chain.push(e.to_string());
            cur = e.source();
        }
        assert_eq!(
            chain,
            vec![
                "1 of 2 issues failed to mirror".to_owned(),
                "create issue #4 failed".to_owned(),
                "connection reset".to_owned(),
            ]
        );
    }
}
