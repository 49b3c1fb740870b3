use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::{runtime, signal};
use tracing::{error, info, trace};

use crate::service::{Server, ServerConfig, Shutdown};
use crate::session::{SessionHandler, SessionRegistry};
use crate::stats::HourlyStats;
use crate::{AppError, AppResult};

/// Owns everything the listener needs: the configuration snapshot, the hourly
/// stats and the registry of open sessions.
#[derive(Debug)]
pub struct StatusServer {
    config: Arc<ServerConfig>,
    stats: Arc<HourlyStats>,
    registry: Arc<SessionRegistry>,
}

impl StatusServer {
    pub fn new(config: ServerConfig) -> Self {
        let stats = Arc::new(HourlyStats::new(config.stats.statistics_map_size));
        StatusServer {
            config: Arc::new(config),
            stats,
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<HourlyStats> {
        self.stats.clone()
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Builds a multi-threaded runtime and serves until Ctrl-C.
    pub fn start(&self) -> AppResult<()> {
        // startup tokio runtime
        let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
        rt.block_on(self.run_until(async {
            if let Err(err) = signal::ctrl_c().await {
                error!("failed to listen for ctrl-c: {}", err);
                std::future::pending::<()>().await;
            }
            info!("get shutdown signal");
        }))?;
        info!("status server shutdown complete");
        Ok(())
    }

    /// Binds the configured address and serves until `signal` resolves.
    pub async fn run_until<F: Future<Output = ()>>(&self, signal: F) -> AppResult<()> {
        let listen_address = self.config.network.listen_address();
        let listener = match TcpListener::bind(&listen_address).await {
            Ok(listener) => listener,
            Err(source) => {
                error!(
                    "Failed to bind server to address: {} - Error: {}",
                    listen_address, source
                );
                return Err(AppError::Bind {
                    address: listen_address,
                    source,
                });
            }
        };
        info!("tcp server binding to {} for listening", &listen_address);
        self.serve(listener, signal).await
    }

    /// Serves an already bound listener until `signal` resolves or accepting
    /// fails, then waits for every connection worker to finish.
    pub async fn serve<F: Future<Output = ()>>(
        &self,
        listener: TcpListener,
        signal: F,
    ) -> AppResult<()> {
        let (notify_shutdown, _) = broadcast::channel(1);
        let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel::<()>(1);

        let session_handler = Arc::new(SessionHandler::new(
            &self.config,
            self.registry.clone(),
            self.stats.clone(),
        )?);

        let roller = self.stats.clone().start_roller(
            Duration::from_secs(self.config.stats.roll_interval),
            Shutdown::subscribe(&notify_shutdown),
        );

        let server = Server::new(
            listener,
            notify_shutdown.clone(),
            shutdown_complete_tx,
            self.registry.clone(),
            session_handler,
            self.config.network.clone(),
        );

        let result = tokio::select! {
            res = server.run() => {
                if let Err(err) = &res {
                    error!(cause = %err, "failed to accept");
                }
                res
            }
            _ = signal => Ok(()),
        };

        // stop accepting, then tell every worker to leave its read loop
        drop(server);
        let _ = notify_shutdown.send(());
        trace!("waiting for shutdown complete...");
        let _ = shutdown_complete_rx.recv().await;
        if let Err(err) = roller.await {
            error!("stats roller task failed: {}", err);
        }
        match self.stats.to_json() {
            Ok(json) => info!("hourly stats at shutdown: {}", json),
            Err(err) => error!("failed to serialize hourly stats: {}", err),
        }
        info!("all connections closed");
        result
    }
}
