use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use validator::Validate;

use photon_domain::{ContentSourcePort, DocumentReaderPort, DomainError, PageRange};

use crate::{ApplicationError, ConvertDocumentRequest};

pub type PageStream = BoxStream<'static, Result<String, DomainError>>;

#[async_trait]
pub trait DocumentUseCase: Send + Sync {
    async fn convert(&self, request: ConvertDocumentRequest)
        -> Result<PageStream, ApplicationError>;
}

pub struct DocumentUseCaseImpl {
    source: Arc<dyn ContentSourcePort>,
    reader: Arc<dyn DocumentReaderPort>,
    batch_size: usize,
}

impl DocumentUseCaseImpl {
    pub fn new(
        source: Arc<dyn ContentSourcePort>,
        reader: Arc<dyn DocumentReaderPort>,
        batch_size: usize,
    ) -> Self {
        Self {
            source,
            reader,
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl DocumentUseCase for DocumentUseCaseImpl {
    async fn convert(
        &self,
        request: ConvertDocumentRequest,
    ) -> Result<PageStream, ApplicationError> {
        request.validate()?;
        let content = match self.source.fetch(&request.file).await {
            Ok(content) => content,
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch document");
                return Err(ApplicationError::validation("Failed to read document."));
            }
        };
        let total_pages = match self.reader.page_count(&content).await {
            Ok(total) => total,
            Err(err) => {
                tracing::error!(error = %err, "failed to parse document");
                return Err(ApplicationError::validation("Failed to read document."));
            }
        };

        let range = PageRange::resolve(request.start, request.end, total_pages)?;
        tracing::info!(total_pages, start = range.start, end = range.end, "converting document");

        let batches: Vec<Vec<usize>> = range
            .indices()
            .collect::<Vec<_>>()
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect();
        let reader = self.reader.clone();
        let content = Arc::new(content);

        let pages = stream::iter(batches)
            .then(move |batch| {
                let reader = reader.clone();
                let content = content.clone();
                async move {
                    let rendered = reader.render_pages(&content, &batch).await;
                    match &rendered {
                        Ok(pages) => tracing::info!(
                            input_pages = batch.len(),
                            output_pages = pages.len(),
                            "rendered page batch"
                        ),
                        Err(err) => tracing::error!(error = %err, "page batch failed"),
                    }
                    rendered
                }
            })
            .flat_map(|rendered| match rendered {
                Ok(pages) => stream::iter(pages.into_iter().map(Ok::<String, DomainError>)).boxed(),
                Err(err) => stream::once(async move { Err(err) }).boxed(),
            })
            .boxed();
        Ok(pages)
    }
}
