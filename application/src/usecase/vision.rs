use std::sync::Arc;

use async_trait::async_trait;
use validator::Validate;

use photon_domain::{
    ContentSourcePort, DecodedImage, Embedding, ImageCodecPort, VisionEmbeddingPort,
};

use crate::{ApplicationError, EmbedImageBytesRequest, EmbedImageRequest, EmbedQueryRequest};

#[async_trait]
pub trait VisionUseCase: Send + Sync {
    /// Embeds `query` as an image when it is an image reference, otherwise as text.
    async fn embed(&self, request: EmbedQueryRequest) -> Result<Embedding, ApplicationError>;
    async fn embed_text(&self, request: EmbedQueryRequest) -> Result<Embedding, ApplicationError>;
    async fn embed_image(&self, request: EmbedImageRequest) -> Result<Embedding, ApplicationError>;
    async fn embed_image_bytes(
        &self,
        request: EmbedImageBytesRequest,
    ) -> Result<Embedding, ApplicationError>;
}

pub struct VisionUseCaseImpl {
    source: Arc<dyn ContentSourcePort>,
    codec: Arc<dyn ImageCodecPort>,
    model: Arc<dyn VisionEmbeddingPort>,
}

impl VisionUseCaseImpl {
    pub fn new(
        source: Arc<dyn ContentSourcePort>,
        codec: Arc<dyn ImageCodecPort>,
        model: Arc<dyn VisionEmbeddingPort>,
    ) -> Self {
        Self {
            source,
            codec,
            model,
        }
    }

    async fn load_image(&self, reference: &str) -> Result<DecodedImage, ApplicationError> {
        let bytes = self.source.fetch(reference).await?;
        Ok(self.codec.decode(&bytes)?)
    }

    async fn image_embedding(&self, image: DecodedImage) -> Result<Embedding, ApplicationError> {
        tracing::debug!(
            model = %self.model.model_name(),
            width = image.width,
            height = image.height,
            "embedding image"
        );
        Ok(self.model.embed_image(&image).await?)
    }
}

pub fn is_image_reference(query: &str) -> bool {
    let query = query.trim();
    let is_url = (query.starts_with("http://") || query.starts_with("https://"))
        && !query.contains(char::is_whitespace);
    is_url || query.starts_with("data:image/")
}

#[async_trait]
impl VisionUseCase for VisionUseCaseImpl {
    async fn embed(&self, request: EmbedQueryRequest) -> Result<Embedding, ApplicationError> {
        if is_image_reference(&request.query) {
            let url = request.query.trim().to_string();
            return self.embed_image(EmbedImageRequest { url }).await;
        }
        self.embed_text(request).await
    }

    async fn embed_text(&self, request: EmbedQueryRequest) -> Result<Embedding, ApplicationError> {
        request.validate()?;
        Ok(self.model.embed_text(&request.query).await?)
    }

    async fn embed_image(&self, request: EmbedImageRequest) -> Result<Embedding, ApplicationError> {
        request.validate()?;
        let url = request.url.trim();
        let image = self.load_image(url).await.map_err(|err| {
            tracing::warn!(url, error = %err, "cannot load image");
            ApplicationError::Validation(format!("Cannot download image at url {url}."))
        })?;
        self.image_embedding(image).await
    }

    async fn embed_image_bytes(
        &self,
        request: EmbedImageBytesRequest,
    ) -> Result<Embedding, ApplicationError> {
        request.validate()?;
        let payload = request.image.trim();
        if payload.starts_with("http://") || payload.starts_with("https://") {
            return Err(ApplicationError::validation("Cannot read image from bytes."));
        }
        let image = self.load_image(payload).await.map_err(|err| {
            tracing::warn!(error = %err, "cannot read image bytes");
            ApplicationError::validation("Cannot read image from bytes.")
        })?;
        self.image_embedding(image).await
    }
}

#[cfg(test)]
mod tests {
    use super::is_image_reference;

    #[test]
    fn detects_image_references() {
        assert!(is_image_reference("https://example.com/cat.png"));
        assert!(is_image_reference(" http://example.com/a.jpg "));
        assert!(is_image_reference("data:image/png;base64,AAAA"));
        assert!(!is_image_reference("a photo of a cat"));
        assert!(!is_image_reference("https://example.com is a site"));
        assert!(!is_image_reference("data:text/plain;base64,AAAA"));
    }
}
