//! Request payload validation for position writes.
//!
//! # Responsibility
//! - Convert an untyped JSON body into a `PositionDraft`, or report every
//!   field problem at once.
//!
//! # Invariants
//! - Validation is total: the result is either a complete draft or a
//!   non-empty error list, never partially validated data.
//! - `parentId` must be present; `null` is the only way to request a root.

use crate::model::position::{PositionDraft, PositionId, MAX_NAME_CHARS};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("valid uuid regex")
});

/// One field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// JSON path of the offending value; empty for whole-body problems.
    pub path: Vec<String>,
    pub message: String,
}

impl FieldError {
    fn at(field: &str, message: impl Into<String>) -> Self {
        Self {
            path: vec![field.to_string()],
            message: message.into(),
        }
    }

    fn body(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }
}

/// Validation failure carrying every field error found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftValidationError {
    pub errors: Vec<FieldError>,
}

impl Display for DraftValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let fields = self
            .errors
            .iter()
            .map(|error| {
                if error.path.is_empty() {
                    error.message.clone()
                } else {
                    format!("{}: {}", error.path.join("."), error.message)
                }
            })
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "invalid position payload: {fields}")
    }
}

impl Error for DraftValidationError {}

/// Parses a raw request body string, then validates it.
pub fn parse_position_body(raw: &str) -> Result<PositionDraft, DraftValidationError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => parse_position_draft(&value),
        Err(err) => Err(DraftValidationError {
            errors: vec![FieldError::body(format!("Malformed JSON body: {err}"))],
        }),
    }
}

/// Validates a JSON value as a position create/update payload.
///
/// Rules:
/// - `name`: non-empty string of at most 255 characters.
/// - `description`: non-empty string.
/// - `parentId`: `null` or a hyphenated UUID string.
///
/// Text is stored exactly as sent; surrounding whitespace is kept.
pub fn parse_position_draft(body: &Value) -> Result<PositionDraft, DraftValidationError> {
    let Some(object) = body.as_object() else {
        return Err(DraftValidationError {
            errors: vec![FieldError::body(format!(
                "Expected object, received {}",
                json_type_name(body)
            ))],
        });
    };

    let mut errors = Vec::new();
    let name = required_text(object, "name", "Name is required", &mut errors);
    let description = required_text(object, "description", "Description is required", &mut errors);
    let parent_id = parent_reference(object, &mut errors);

    if let Some(name) = &name {
        if name.chars().count() > MAX_NAME_CHARS {
            errors.push(FieldError::at(
                "name",
                format!("Name must contain at most {MAX_NAME_CHARS} character(s)"),
            ));
        }
    }

    match (name, description, parent_id) {
        (Some(name), Some(description), Some(parent_id)) if errors.is_empty() => {
            Ok(PositionDraft {
                name,
                description,
                parent_id,
            })
        }
        _ => Err(DraftValidationError { errors }),
    }
}

fn required_text(
    object: &Map<String, Value>,
    field: &str,
    empty_message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match object.get(field) {
        None => {
            errors.push(FieldError::at(field, "Required"));
            None
        }
        Some(Value::String(text)) if text.is_empty() => {
            errors.push(FieldError::at(field, empty_message));
            None
        }
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => {
            errors.push(FieldError::at(
                field,
                format!("Expected string, received {}", json_type_name(other)),
            ));
            None
        }
    }
}

/// Returns `Some(None)` for an explicit root request, `Some(Some(id))` for a
/// valid parent reference and `None` when the field is invalid.
fn parent_reference(
    object: &Map<String, Value>,
    errors: &mut Vec<FieldError>,
) -> Option<Option<PositionId>> {
    match object.get("parentId") {
        None => {
            errors.push(FieldError::at("parentId", "Required"));
            None
        }
        Some(Value::Null) => Some(None),
        Some(Value::String(text)) => match parse_uuid_text(text) {
            Some(id) => Some(Some(id)),
            None => {
                errors.push(FieldError::at("parentId", "Invalid uuid"));
                None
            }
        },
        Some(other) => {
            errors.push(FieldError::at(
                "parentId",
                format!("Expected string, received {}", json_type_name(other)),
            ));
            None
        }
    }
}

/// Parses a hyphenated UUID, rejecting the braced/simple/urn forms that
/// `Uuid::parse_str` would otherwise accept.
pub fn parse_uuid_text(text: &str) -> Option<PositionId> {
    if !UUID_RE.is_match(text) {
        return None;
    }
    Uuid::parse_str(text).ok()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_position_body, parse_position_draft, parse_uuid_text};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn accepts_root_draft_with_null_parent() {
        let draft = parse_position_draft(&json!({
            "name": "CEO",
            "description": "Chief",
            "parentId": null
        }))
        .unwrap();
        assert_eq!(draft.name, "CEO");
        assert_eq!(draft.description, "Chief");
        assert_eq!(draft.parent_id, None);
    }

    #[test]
    fn child_draft_keeps_text_verbatim() {
        let parent = Uuid::new_v4();
        let draft = parse_position_draft(&json!({
            "name": "  CTO ",
            "description": "Tech\n",
            "parentId": parent.to_string()
        }))
        .unwrap();
        assert_eq!(draft.name, "  CTO ");
        assert_eq!(draft.description, "Tech\n");
        assert_eq!(draft.parent_id, Some(parent));
    }

    #[test]
    fn reports_every_field_error_at_once() {
        let err = parse_position_draft(&json!({
            "name": "",
            "description": 42,
            "parentId": "not-a-uuid"
        }))
        .unwrap_err();

        let paths = err
            .errors
            .iter()
            .map(|error| error.path.join("."))
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["name", "description", "parentId"]);
        assert_eq!(err.errors[0].message, "Name is required");
        assert_eq!(err.errors[1].message, "Expected string, received number");
        assert_eq!(err.errors[2].message, "Invalid uuid");
    }

    #[test]
    fn missing_parent_id_is_required_not_root() {
        let err = parse_position_draft(&json!({
            "name": "CEO",
            "description": "Chief"
        }))
        .unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].path, vec!["parentId".to_string()]);
        assert_eq!(err.errors[0].message, "Required");
    }

    #[test]
    fn only_empty_text_is_rejected() {
        let err = parse_position_draft(&json!({
            "name": "",
            "description": "",
            "parentId": null
        }))
        .unwrap_err();
        assert_eq!(err.errors[0].message, "Name is required");
        assert_eq!(err.errors[1].message, "Description is required");

        let draft = parse_position_draft(&json!({
            "name": " ",
            "description": "\t",
            "parentId": null
        }))
        .unwrap();
        assert_eq!(draft.name, " ");
        assert_eq!(draft.description, "\t");
    }

    #[test]
    fn overlong_name_is_rejected() {
        let err = parse_position_draft(&json!({
            "name": "x".repeat(256),
            "description": "Too long",
            "parentId": null
        }))
        .unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert!(err.errors[0].message.contains("255"));
    }

    #[test]
    fn non_object_and_malformed_bodies_are_rejected() {
        let err = parse_position_draft(&json!(["CEO"])).unwrap_err();
        assert!(err.errors[0].path.is_empty());
        assert_eq!(err.errors[0].message, "Expected object, received array");

        let err = parse_position_body("{not json").unwrap_err();
        assert!(err.errors[0].message.starts_with("Malformed JSON body"));
        assert!(err.to_string().contains("Malformed JSON body"));
    }

    #[test]
    fn uuid_text_requires_hyphenated_form() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid_text(&id.to_string()), Some(id));
        assert_eq!(parse_uuid_text(&id.simple().to_string()), None);
        assert_eq!(parse_uuid_text(&format!("{{{id}}}")), None);
        assert_eq!(parse_uuid_text(""), None);
    }
}
