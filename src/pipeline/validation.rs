//! Request validation shared by the render and export operations.

use serde_json::{Map, Value};

use crate::error::AppError;

pub const TEMPLATE_REQUIRED: &str = "Template content is required";
pub const INVALID_VARIABLES_JSON: &str = "Invalid JSON in variables";
pub const VARIABLES_NOT_OBJECT: &str = "Variables must be a JSON object";

/// Require non-empty template text.
pub fn require_template(template: Option<&str>) -> Result<&str, AppError> {
    match template {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(AppError::Validation(TEMPLATE_REQUIRED.to_string())),
    }
}

/// Normalize the `variables` field into a JSON object.
///
/// Absent, `null` and `""` all mean an empty context. A string is parsed as
/// JSON; objects are taken as they are.
pub fn parse_variables(variables: Option<&Value>) -> Result<Value, AppError> {
    let value = match variables {
        None | Some(Value::Null) => return Ok(Value::Object(Map::new())),
        Some(Value::String(text)) if text.trim().is_empty() => {
            return Ok(Value::Object(Map::new()))
        }
        Some(Value::String(text)) => serde_json::from_str::<Value>(text)
            .map_err(|_| AppError::Validation(INVALID_VARIABLES_JSON.to_string()))?,
        Some(other) => other.clone(),
    };

    if value.is_object() {
        Ok(value)
    } else {
        Err(AppError::Validation(VARIABLES_NOT_OBJECT.to_string()))
    }
}
