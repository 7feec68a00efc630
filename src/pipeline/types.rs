use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::exporter::PdfOptions;

/// Request payload for POST /api/render
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub template: Option<String>,
    /// Either a JSON object or a string containing one
    #[serde(default)]
    pub variables: Option<Value>,
}

/// Request payload for POST /api/export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub variables: Option<Value>,
    /// Suggested download name; synthesized when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<PdfOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResponse {
    pub html: String,
}

/// A materialized PDF and the name it should be downloaded as
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
}
