use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    signal,
    sync::{Mutex, watch},
    task::JoinHandle,
    time::timeout,
};
use tracing::{error, info, warn};

/// Broadcasts a single shutdown request to every subscriber
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_requested: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Relaxed)
    }

    /// Idempotent; only the first call broadcasts
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            info!("Initiating graceful shutdown...");
            if let Err(e) = self.shutdown_tx.send(true) {
                error!("Failed to broadcast shutdown signal: {}", e);
            }
        }
    }

    /// Wait for Ctrl+C or SIGTERM, then initiate shutdown
    pub async fn wait_for_shutdown_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C signal");
            },
            _ = terminate => {
                info!("Received terminate signal");
            },
        }

        self.initiate_shutdown();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Background tasks (data load, cache sweeper) stopped after the HTTP server drains
pub struct ShutdownManager {
    tasks: Mutex<Vec<(String, JoinHandle<()>)>>,
    timeout_duration: Duration,
}

impl ShutdownManager {
    pub fn new(timeout_duration: Duration) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            timeout_duration,
        }
    }

    pub async fn register_background_task(&self, task: JoinHandle<()>, name: &str) {
        self.tasks.lock().await.push((name.to_string(), task));
    }

    pub async fn task_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Abort every registered task and wait for each, bounded by the timeout
    pub async fn shutdown_all(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        info!("Shutting down {} background tasks...", tasks.len());

        for (name, handle) in tasks {
            if handle.is_finished() {
                info!("Background task '{}' already finished", name);
                continue;
            }

            handle.abort();
            match timeout(self.timeout_duration, handle).await {
                Ok(_) => info!("Background task '{}' shut down", name),
                Err(_) => warn!("Background task '{}' shutdown timed out", name),
            }
        }

        info!("Shutdown complete");
    }
}
