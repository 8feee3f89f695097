use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Fields are fetched as a single page; anything past it reads as missing.
pub const FIELD_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectHandle {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub name: String,
    pub id: String,
}

/// A project custom field. Only single-select fields carry `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValueRequest {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFieldValue {
    pub field: String,
    pub value: String,
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Maps a `{field, value}` request onto the field and option identifiers of
/// a project's field catalog.
pub fn resolve_field_value(
    fields: &[FieldDescriptor],
    request: &FieldValueRequest,
) -> Result<ResolvedFieldValue, SyncError> {
    let field = fields
        .iter()
        .find(|f| same_name(&f.name, &request.field))
        .ok_or_else(|| SyncError::FieldNotFound {
            field: request.field.clone(),
        })?;

    let Some(options) = field.options.as_deref() else {
        return Err(SyncError::FieldHasNoOptions {
            field: request.field.clone(),
        });
    };

    let option = options
        .iter()
        .find(|o| same_name(&o.name, &request.value))
        .ok_or_else(|| SyncError::OptionNotFound {
            value: request.value.clone(),
            available: options.iter().map(|o| o.name.clone()).collect(),
        })?;

    Ok(ResolvedFieldValue {
        field: field.id.clone(),
        value: option.id.clone(),
    })
}
