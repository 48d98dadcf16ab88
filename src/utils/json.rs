use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::documents::RelationshipSet;
use crate::error::{StoreError, StoreResult};
use crate::models::DocumentPatch;

pub enum NullableValue<T> {
    Omitted,
    Null,
    Value(T),
}

impl<T> NullableValue<T> {
    /// `None` when omitted, `Some(None)` when null.
    pub fn into_patch(self) -> Option<Option<T>> {
        match self {
            NullableValue::Omitted => None,
            NullableValue::Null => Some(None),
            NullableValue::Value(value) => Some(Some(value)),
        }
    }
}

pub fn classify_nullable<T: DeserializeOwned>(
    optional_value: Option<&Value>,
) -> Result<NullableValue<T>, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(other) => serde_json::from_value(other.clone())
            .map(NullableValue::Value)
            .map_err(|err| format!("unexpected value {other}: {err}")),
    }
}

fn nullable<T: DeserializeOwned>(
    body: &Map<String, Value>,
    key: &str,
) -> StoreResult<Option<Option<T>>> {
    classify_nullable(body.get(key))
        .map(NullableValue::into_patch)
        .map_err(|err| StoreError::validation(format!("{key}: {err}")))
}

fn required<T: DeserializeOwned>(body: &Map<String, Value>, key: &str) -> StoreResult<Option<T>> {
    match nullable(body, key)? {
        Some(None) => Err(StoreError::validation(format!("{key} cannot be null"))),
        other => Ok(other.flatten()),
    }
}

impl DocumentPatch {
    pub fn from_json(value: &Value) -> StoreResult<Self> {
        let body = value
            .as_object()
            .ok_or_else(|| StoreError::validation("update body must be a JSON object"))?;
        if body.contains_key("status") {
            return Err(StoreError::validation(
                "status is changed through the workflow, not by update",
            ));
        }

        Ok(Self {
            document_code: required(body, "document_code")?,
            name: required(body, "name")?,
            document_number: nullable(body, "document_number")?,
            document_type: required(body, "document_type")?,
            department: required(body, "department")?,
            country: nullable(body, "country")?,
            description: nullable(body, "description")?,
            version_number: required(body, "version_number")?,
            upload_date: nullable(body, "upload_date")?,
            last_revision_date: nullable(body, "last_revision_date")?,
            next_revision_date: nullable(body, "next_revision_date")?,
            review_deadline: nullable(body, "review_deadline")?,
            pending_with: nullable(body, "pending_with")?,
        })
    }
}

/// Splits an update body into the field patch and the relationship kinds it
/// names.
pub fn parse_update(value: &Value) -> StoreResult<(DocumentPatch, RelationshipSet)> {
    let mut fields = value.clone();
    let mut relationships = Map::new();
    if let Some(body) = fields.as_object_mut() {
        for key in [
            "owners",
            "reviewers",
            "creators",
            "compliance_contacts",
            "compliance_names",
        ] {
            if let Some(entry) = body.remove(key) {
                relationships.insert(key.to_string(), entry);
            }
        }
    }
    let patch = DocumentPatch::from_json(&fields)?;
    let relationships: RelationshipSet = serde_json::from_value(Value::Object(relationships))
        .map_err(|err| StoreError::validation(format!("invalid relationships: {err}")))?;
    Ok((patch, relationships))
}
