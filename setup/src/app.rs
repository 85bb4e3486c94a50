use anyhow::{Context, Error};
use axum::Router;
use tokio::net::TcpListener;

use photon_configuration::AppConfig;
use photon_http_server::create_router;
use photon_infra_asr_whisper::WHISPER_RUNTIME_ENABLED;

use crate::context::ServiceContext;

pub async fn build_and_run(config: AppConfig) -> Result<(), Error> {
    let app = Application::new(config).await?;
    app.run().await
}

pub struct Application {
    pub config: AppConfig,
    context: ServiceContext,
    router: Router,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self, Error> {
        if WHISPER_RUNTIME_ENABLED {
            tracing::info!("whisper runtime feature enabled");
        } else {
            tracing::warn!(
                "service compiled without `whisper-runtime`; transcripts come from the energy segmenter"
            );
        }
        #[cfg(feature = "whisper-cuda")]
        tracing::info!("whisper backend: CUDA");
        #[cfg(feature = "whisper-vulkan")]
        tracing::info!("whisper backend: Vulkan");
        #[cfg(feature = "whisper-openblas")]
        tracing::info!("whisper backend: OpenBLAS");

        tracing::info!(
            enabled_photons = ?config.service.photons.enabled,
            body_limit_bytes = config.server.body_limit_bytes,
            "initializing photon application"
        );

        let context = ServiceContext::build(&config).await?;
        let router = create_router(context.photons(), config.server.body_limit_bytes);
        Ok(Self {
            config,
            context,
            router,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(self) -> Result<(), Error> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener until Ctrl-C or SIGTERM.
    pub async fn serve(self, listener: TcpListener) -> Result<(), Error> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "starting photon HTTP server");

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error");
        self.context.shutdown();
        tracing::info!("photon HTTP server stopped");
        result
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
