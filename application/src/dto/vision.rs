use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmbedQueryRequest {
    /// Caption text, or an http(s) / `data:image` reference to an image.
    #[validate(length(min = 1))]
    pub query: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmbedImageRequest {
    #[validate(length(min = 1))]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmbedImageBytesRequest {
    /// Base64 encoded PNG or JPEG.
    #[validate(length(min = 1))]
    pub image: String,
}
