use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

/// A label as it appears in issue payloads: either a bare name or a label
/// object carrying a `name` (and whatever else the API attached to it).
/// Anything else lands in `Other` and has no name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Name(String),
    Record {
        #[serde(default, deserialize_with = "string_or_none")]
        name: Option<String>,
    },
    Other(serde_json::Value),
}

impl Label {
    pub fn name(&self) -> Option<&str> {
        match self {
            Label::Name(name) => Some(name.as_str()),
            Label::Record { name } => name.as_deref().filter(|n| !n.is_empty()),
            Label::Other(_) => None,
        }
    }
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(name)) => Some(name),
        _ => None,
    })
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Label::Name(name.to_owned())
    }
}

/// Flattens a mixed label list into names, keeping input order and dropping
/// records without a usable name.
pub fn normalize_labels(labels: Option<&[Label]>) -> Vec<String> {
    let Some(labels) = labels else {
        return Vec::new();
    };

    labels
        .iter()
        .filter_map(Label::name)
        .map(str::to_owned)
        .collect()
}

fn lowercased<S: AsRef<str>>(names: &[S]) -> BTreeSet<String> {
    names.iter().map(|n| n.as_ref().to_lowercase()).collect()
}

/// True when the two name sets share at least one label, ignoring case.
pub fn any_match<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    let b = lowercased(b);
    a.iter().any(|name| b.contains(&name.as_ref().to_lowercase()))
}

pub fn contains_ignore_case<S: AsRef<str>>(set: &[S], name: &str) -> bool {
    let needle = name.to_lowercase();
    set.iter().any(|s| s.as_ref().to_lowercase() == needle)
}
