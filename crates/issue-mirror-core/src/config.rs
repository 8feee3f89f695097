use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::project::FieldValueRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Source repository as `owner/name`.
    pub source: String,

    pub destination: DestinationConfig,

    /// Required labels; empty means no filter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    #[serde(
        rename = "sync-labels",
        alias = "sync_labels",
        default = "default_sync_labels"
    )]
    pub sync_labels: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectConfig>,

    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DestinationConfig {
    #[serde(default)]
    pub org: String,

    /// Defaults to the source repository's name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub org: String,

    pub number: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Create mirrored issues through the project API in the destination org
    /// instead of the REST issue endpoint.
    #[serde(rename = "create-in-org", alias = "create_in_org", default)]
    pub create_in_org: bool,
}

impl ProjectConfig {
    pub fn field_request(&self) -> Option<FieldValueRequest> {
        match (&self.field, &self.value) {
            (Some(field), Some(value)) => Some(FieldValueRequest {
                field: field.clone(),
                value: value.clone(),
            }),
            _ => None,
        }
    }
}

fn default_sync_labels() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(slug: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidRepo {
            value: slug.to_owned(),
        };
        let path = slug.trim().trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let mut parts = path.split('/');
        let owner = parts.next().map(str::trim).unwrap_or_default();
        let name = parts.next().map(str::trim).unwrap_or_default();
        if owner.is_empty() || name.is_empty() || parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid repository '{value}', expected owner/name")]
    InvalidRepo { value: String },

    #[error("destination organization is required")]
    MissingDestinationOrg,

    #[error("project field '{field}' needs a value")]
    FieldWithoutValue { field: String },

    #[error("project value '{value}' needs a field")]
    ValueWithoutField { value: String },

    #[error("project number must be greater than zero")]
    InvalidProjectNumber,

    #[error("project organization is required")]
    MissingProjectOrg,
}

impl MirrorConfig {
    pub fn new(source: impl Into<String>, destination_org: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: DestinationConfig {
                org: destination_org.into(),
                repo: None,
            },
            labels: Vec::new(),
            sync_labels: true,
            project: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        RepoRef::parse(&self.source)?;

        if self.destination.org.trim().is_empty() {
            return Err(ConfigError::MissingDestinationOrg);
        }

        if let Some(project) = &self.project {
            if project.org.trim().is_empty() {
                return Err(ConfigError::MissingProjectOrg);
            }
            if project.number == 0 {
                return Err(ConfigError::InvalidProjectNumber);
            }
            match (&project.field, &project.value) {
                (Some(field), None) => {
                    return Err(ConfigError::FieldWithoutValue {
                        field: field.clone(),
                    })
                }
                (None, Some(value)) => {
                    return Err(ConfigError::ValueWithoutField {
                        value: value.clone(),
                    })
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Top-level keys this version does not understand (typos, settings from
    /// newer releases).
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().map(String::as_str)
    }

    pub fn source_repo(&self) -> Result<RepoRef, ConfigError> {
        RepoRef::parse(&self.source)
    }

    pub fn destination_repo(&self) -> Result<RepoRef, ConfigError> {
        let source = self.source_repo()?;
        let name = self
            .destination
            .repo
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .unwrap_or(source.name);
        Ok(RepoRef {
            owner: self.destination.org.trim().to_owned(),
            name,
        })
    }
}

/// Splits a multiline action input into trimmed, non-empty lines.
pub fn parse_multiline_input(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn parse_bool_input(input: Option<&str>) -> bool {
    input.is_some_and(|v| v.trim() == "true")
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn parses_full_config() {
        let cfg = MirrorConfig::parse(
            r#"
source = "acme/widgets"
labels = ["bug", "Feature"]
sync-labels = false

[destination]
org = "acme-mirror"

[project]
org = "acme-mirror"
number = 4
field = "Status"
value = "Todo"
create-in-org = true
"#,
        )
        .unwrap();

        cfg.validate().unwrap();
        assert_eq!(cfg.labels, vec!["bug".to_owned(), "Feature".to_owned()]);
        assert!(!cfg.sync_labels);
        assert_eq!(
            cfg.destination_repo().unwrap(),
            RepoRef {
                owner: "acme-mirror".to_owned(),
                name: "widgets".to_owned(),
            }
        );
        let project = cfg.project.unwrap();
        assert!(project.create_in_org);
        assert_eq!(
            project.field_request(),
            Some(FieldValueRequest {
                field: "Status".to_owned(),
                value: "Todo".to_owned(),
            })
        );
    }

    #[test]
    fn unknown_top_level_keys_are_kept_and_reported() {
        let cfg = MirrorConfig::parse(
            r#"
source = "acme/widgets"
lables = ["bug"]
retries = 3

[destination]
org = "acme-mirror"
"#,
        )
        .unwrap();

        cfg.validate().unwrap();
        assert!(cfg.labels.is_empty());
        assert_eq!(cfg.unknown_keys().collect::<Vec<_>>(), vec!["lables", "retries"]);
    }

    #[test]
    fn sync_labels_defaults_to_true() {
        let cfg = MirrorConfig::parse(
            r#"
source = "acme/widgets"
[destination]
org = "acme-mirror"
repo = "widgets-public"
"#,
        )
        .unwrap();
        assert!(cfg.sync_labels);
        assert_eq!(cfg.destination_repo().unwrap().slug(), "acme-mirror/widgets-public");
    }

    #[test]
    fn validate_rejects_bad_source_slug() {
        let cfg = MirrorConfig::new("widgets", "acme-mirror");
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::InvalidRepo { .. }
        ));

        let cfg = MirrorConfig::new("acme/widgets/extra", "acme-mirror");
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::InvalidRepo { .. }
        ));
    }

    #[test]
    fn validate_rejects_missing_destination_org() {
        let cfg = MirrorConfig::new("acme/widgets", "  ");
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::MissingDestinationOrg
        ));
    }

    #[test]
    fn validate_rejects_half_configured_field() {
        let mut cfg = MirrorConfig::new("acme/widgets", "acme-mirror");
        cfg.project = Some(ProjectConfig {
            org: "acme-mirror".to_owned(),
            number: 1,
            field: Some("Status".to_owned()),
            value: None,
            create_in_org: false,
        });
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::FieldWithoutValue { .. }
        ));

        cfg.project = Some(ProjectConfig {
            org: "acme-mirror".to_owned(),
            number: 0,
            field: None,
            value: None,
            create_in_org: false,
        });
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::InvalidProjectNumber
        ));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "source = \"acme/widgets\"\n[destination]\norg = \"mirror\""
        )
        .unwrap();

        let cfg = MirrorConfig::load(file.path()).unwrap();
        assert_eq!(cfg.source_repo().unwrap().owner, "acme");

        let missing = MirrorConfig::load(Path::new("/nonexistent/mirror.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn multiline_input_drops_blank_lines() {
        assert_eq!(
            parse_multiline_input("bug\n\n  feature  \n"),
            vec!["bug".to_owned(), "feature".to_owned()]
        );
        assert!(parse_multiline_input("").is_empty());
    }

    #[test]
    fn bool_input_is_true_only_for_literal_true() {
        assert!(parse_bool_input(Some("true")));
        assert!(!parse_bool_input(Some("yes")));
        assert!(!parse_bool_input(None));
    }
}
