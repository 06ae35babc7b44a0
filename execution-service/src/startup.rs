//! Application startup and lifecycle management.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use service_core::error::AppError;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::ExecutionConfig;
use crate::services::{
    LineItemService, LineItemStore, LocalStorage, MailService, Mailer, MaterialService,
    MaterialStore, MockMailer, MongoDb, PhotoLimits, SmtpMailer, Storage,
};
use crate::{build_router, AppState};

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: ExecutionConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;
        let db = Arc::new(db);

        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(&config.storage.local_path)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize local storage at {}: {}",
                        config.storage.local_path,
                        e
                    );
                    e
                })?,
        );

        let mailer = build_mailer(&config).await;
        let state = build_state(config.clone(), db.clone(), db, storage, mailer);
        let app = build_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();
        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

/// Wires the services over the given backends.
pub fn build_state(
    config: ExecutionConfig,
    line_item_store: Arc<dyn LineItemStore>,
    material_store: Arc<dyn MaterialStore>,
    storage: Arc<dyn Storage>,
    mailer: Arc<dyn Mailer>,
) -> AppState {
    let line_items = LineItemService::new(line_item_store, storage.clone());
    let mail = MailService::new(
        line_items.clone(),
        storage,
        mailer,
        config.mail.clone(),
    );
    let photo_limits = PhotoLimits {
        max_bytes: config.uploads.max_photo_bytes,
        max_count: config.uploads.max_photos_per_request,
    };

    AppState {
        line_items,
        materials: MaterialService::new(material_store),
        mail,
        photo_limits,
        config,
    }
}

async fn build_mailer(config: &ExecutionConfig) -> Arc<dyn Mailer> {
    if !config.smtp.enabled {
        tracing::info!("SMTP disabled, using mock mailer");
        return Arc::new(MockMailer::new());
    }
    match SmtpMailer::new(config.smtp.clone()) {
        Ok(mailer) => {
            match mailer.health_check().await {
                Ok(()) => tracing::info!(host = %config.smtp.host, "SMTP mailer initialized"),
                Err(e) => tracing::warn!(host = %config.smtp.host, "SMTP server not reachable yet: {}", e),
            }
            Arc::new(mailer)
        }
        Err(e) => {
            tracing::warn!("Failed to initialize SMTP mailer: {}. Using mock.", e);
            Arc::new(MockMailer::new())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
