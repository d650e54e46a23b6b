pub mod config;
pub mod middleware;

use crate::{
    clock::{Clock, SystemClock},
    config::Config,
    data::{CsvDataProvider, DataProvider},
    error::AppError,
    health::{DataProviderHealthChecker, HealthService, SavingsCacheHealthChecker},
    routes::{create_device_routes, create_health_routes, create_savings_routes},
    savings::SavingsService,
    server::middleware::request_response_logger,
    shutdown::{ShutdownCoordinator, ShutdownManager},
};
use axum::{Router, middleware as axum_middleware};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct Server {
    pub config: Arc<Config>,
    pub provider: Arc<dyn DataProvider>,
    pub savings: Arc<SavingsService>,
    pub clock: Arc<dyn Clock>,
    pub health_service: Arc<HealthService>,
    pub shutdown_coordinator: Arc<ShutdownCoordinator>,
    /// CSV loader started by [`Server::run`]; absent when the provider is injected
    loader: Option<Arc<CsvDataProvider>>,
}

impl Server {
    /// Server backed by the CSV files named in `config.data`
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let csv_provider = Arc::new(CsvDataProvider::from_config(&config.data));
        let provider: Arc<dyn DataProvider> = csv_provider.clone();

        let mut server = Self::with_components(config, provider, Arc::new(SystemClock)).await;
        server.loader = Some(csv_provider);
        Ok(server)
    }

    /// Server over an already constructed provider and clock
    pub async fn with_components(
        config: Config,
        provider: Arc<dyn DataProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let savings = Arc::new(SavingsService::new(provider.clone(), &config.savings));

        let health_service = Arc::new(HealthService::new());
        health_service
            .register(Arc::new(DataProviderHealthChecker::new(provider.clone())))
            .await;
        health_service
            .register(Arc::new(SavingsCacheHealthChecker::new(savings.clone())))
            .await;

        Self {
            config: Arc::new(config),
            provider,
            savings,
            clock,
            health_service,
            shutdown_coordinator: Arc::new(ShutdownCoordinator::new()),
            loader: None,
        }
    }

    pub async fn run(&self) -> Result<(), AppError> {
        let shutdown_manager = ShutdownManager::new(Duration::from_secs(5));

        // serve 503s until the first load lands
        if let Some(loader) = self.loader.clone() {
            let reload_task = loader.start_reload_task(Duration::from_secs(
                self.config.data.reload_interval_seconds,
            ));
            shutdown_manager
                .register_background_task(reload_task, "data reload")
                .await;
        }

        if let Some(cleanup) = self.savings.start_cache_cleanup(Duration::from_secs(
            self.config.savings.cache_cleanup_interval_seconds,
        )) {
            shutdown_manager
                .register_background_task(cleanup, "cache cleanup")
                .await;
        }

        let app = self.create_app();

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

        info!("Server listening on http://{}", addr);

        let coordinator = self.shutdown_coordinator.clone();
        tokio::spawn(async move {
            coordinator.wait_for_shutdown_signal().await;
        });

        let mut shutdown_rx = self.shutdown_coordinator.subscribe();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
                info!("Graceful shutdown initiated");
            })
            .await;

        if let Err(e) = &result {
            error!("Server error: {}", e);
        }

        shutdown_manager.shutdown_all().await;
        info!("Server shutdown complete");

        result.map_err(|e| AppError::Internal(format!("Server error: {}", e)))
    }

    /// Creates the application router
    pub fn create_app(&self) -> Router {
        let mut app = Router::new()
            .merge(create_health_routes())
            .merge(create_device_routes())
            .merge(create_savings_routes())
            .with_state(self.clone());

        if self.config.logging.log_request {
            app = app.layer(axum_middleware::from_fn(request_response_logger));
        }
        app
    }
}
