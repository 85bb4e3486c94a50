use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use bytes::Bytes;
use futures::StreamExt;

use photon_application::{ConvertDocumentRequest, DocumentUseCase};

use crate::error::{error_mapper, HttpError};
use crate::extract::JsonBody;
use crate::photon::Photon;

type NougatState = Arc<dyn DocumentUseCase>;

pub struct NougatPhoton {
    use_case: NougatState,
}

impl NougatPhoton {
    pub fn new(use_case: NougatState) -> Self {
        Self { use_case }
    }
}

impl Photon for NougatPhoton {
    fn name(&self) -> &'static str {
        "nougat"
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/run", post(run))
            .with_state(Arc::clone(&self.use_case))
    }
}

async fn run(
    State(use_case): State<NougatState>,
    JsonBody(request): JsonBody<ConvertDocumentRequest>,
) -> Result<Response, HttpError> {
    let pages = use_case.convert(request).await.map_err(|error| {
        tracing::warn!(error = %error, "document conversion rejected");
        error_mapper(error)
    })?;
    // blank line between pages
    let body = Body::from_stream(pages.map(|page| page.map(|page| Bytes::from(page + "\n\n"))));
    Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], body).into_response())
}
