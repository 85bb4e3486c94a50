use async_trait::async_trait;
use lopdf::Document;
use photon_domain::{DocumentReaderPort, DomainError};

const PAGE_BREAK: char = '\u{000C}';
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Reads PDF files through their text layer and falls back to UTF-8 text with
/// form feeds between pages. Each page is rendered as markdown paragraphs.
#[derive(Default)]
pub struct DocumentPageReader;

impl DocumentPageReader {
    pub fn new() -> Self {
        Self
    }
}

fn is_pdf(content: &[u8]) -> bool {
    content.starts_with(PDF_MAGIC)
}

fn text_pages(content: &[u8]) -> Result<Vec<&str>, DomainError> {
    let text = std::str::from_utf8(content)
        .map_err(|err| DomainError::InvalidInput(format!("document is not utf-8 text: {err}")))?;
    if text.trim().is_empty() {
        return Err(DomainError::invalid_input("document is empty"));
    }
    Ok(text.split(PAGE_BREAK).collect())
}

fn load_pdf(content: &[u8]) -> Result<Document, DomainError> {
    Document::load_mem(content)
        .map_err(|err| DomainError::InvalidInput(format!("cannot parse pdf: {err}")))
}

fn missing_page(idx: usize) -> DomainError {
    DomainError::InvalidInput(format!("page {} does not exist", idx + 1))
}

fn render_pdf_pages(content: &[u8], indices: &[usize]) -> Result<Vec<String>, DomainError> {
    let document = load_pdf(content)?;
    let page_numbers: Vec<u32> = document.get_pages().into_keys().collect();
    indices
        .iter()
        .map(|&idx| {
            let page_number = *page_numbers.get(idx).ok_or_else(|| missing_page(idx))?;
            let text = document.extract_text(&[page_number]).map_err(|err| {
                DomainError::InvalidInput(format!("cannot read page {}: {err}", idx + 1))
            })?;
            Ok(render_markdown(&text))
        })
        .collect()
}

async fn blocking<T, F>(task: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| DomainError::internal_error(&format!("pdf worker failed: {err}")))?
}

fn render_markdown(page: &str) -> String {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in page.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
            continue;
        }
        current.push(line);
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    paragraphs.join("\n\n")
}

#[async_trait]
impl DocumentReaderPort for DocumentPageReader {
    async fn page_count(&self, content: &[u8]) -> Result<u32, DomainError> {
        if is_pdf(content) {
            let content = content.to_vec();
            return blocking(move || Ok(load_pdf(&content)?.get_pages().len() as u32)).await;
        }
        Ok(text_pages(content)?.len() as u32)
    }

    async fn render_pages(
        &self,
        content: &[u8],
        indices: &[usize],
    ) -> Result<Vec<String>, DomainError> {
        if is_pdf(content) {
            let content = content.to_vec();
            let indices = indices.to_vec();
            return blocking(move || render_pdf_pages(&content, &indices)).await;
        }
        let pages = text_pages(content)?;
        indices
            .iter()
            .map(|&idx| {
                pages
                    .get(idx)
                    .map(|page| render_markdown(page))
                    .ok_or_else(|| missing_page(idx))
            })
            .collect()
    }
}
