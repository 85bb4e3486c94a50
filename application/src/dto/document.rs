use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConvertDocumentRequest {
    /// An http(s) URL or the base64 encoded document.
    #[validate(length(min = 1))]
    pub file: String,
    pub start: Option<u32>,
    pub end: Option<u32>,
}
