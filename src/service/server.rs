use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::time::{self, Duration};
use tracing::{debug, error, info, warn, Level};

use crate::network::Connection;
use crate::session::{IdleWatchdog, SessionGuard, SessionHandler, SessionRegistry};
use crate::AppError;
use crate::AppResult;

use super::{ErrorCategory, NetworkConfig, Shutdown};

/// Severity at which a failed connection is reported.
///
/// Transport errors raised after the idle watchdog fired are the watchdog
/// closing the socket and only show up at debug level.
fn connection_error_level(category: ErrorCategory, timed_out: bool) -> Level {
    match category {
        ErrorCategory::Transport if timed_out => Level::DEBUG,
        ErrorCategory::Transport | ErrorCategory::Framing | ErrorCategory::Protocol => Level::WARN,
        ErrorCategory::Internal | ErrorCategory::Startup => Level::ERROR,
    }
}

fn report_connection_error(err: &AppError, timed_out: bool, peer: &str) {
    let category = err.category();
    let level = connection_error_level(category, timed_out);
    if level == Level::DEBUG {
        debug!("[{}] transport error after idle timeout: {}", peer, err);
    } else if level == Level::ERROR {
        error!("[{}] closing connection on fatal error: {:?}", peer, err);
    } else if category == ErrorCategory::Framing {
        warn!("[{}] malformed packet, closing connection: {}", peer, err);
    } else {
        warn!("[{}] connection error: {}", peer, err);
    }
}

// handler for each connection
struct ConnectionHandler {
    _shutdown_complete_tx: mpsc::Sender<()>,
    shutdown: Shutdown,
    session: SessionGuard,
    session_handler: Arc<SessionHandler>,
    connection: Connection,
    peer: String,
}

impl ConnectionHandler {
    async fn handle_connection(&mut self, watchdog: &IdleWatchdog) -> AppResult<()> {
        loop {
            // read packet from client, if client close the connection gracefully, return None,
            // if client close the connection in the middle of a frame, return Err
            let maybe_packet = tokio::select! {
                res = self.connection.read_packet() => res?,
                _ = watchdog.fired() => {
                    info!("[{}] idle timeout exceeded", self.peer);
                    return Ok(());
                }
                _ = self.shutdown.recv() => {
                    debug!("connection handler exit read loop after recv shutdown signal");
                    return Ok(());
                }
            };

            let packet = match maybe_packet {
                Some(packet) => packet,
                None => break,
            };

            let Some(reply) = self
                .session_handler
                .handle_packet(self.session.id(), packet)?
            else {
                continue;
            };

            tokio::select! {
                res = self.connection.write_packet(&reply) => res?,
                _ = watchdog.fired() => {
                    info!("[{}] idle timeout exceeded", self.peer);
                    return Ok(());
                }
            }
        }
        debug!("[{}] client closed the connection", self.peer);

        Ok(())
    }
}

/// The accept loop of the status listener.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    limit_connections: Arc<Semaphore>,
    notify_shutdown: broadcast::Sender<()>,
    shutdown_complete_tx: mpsc::Sender<()>,
    registry: Arc<SessionRegistry>,
    session_handler: Arc<SessionHandler>,
    network: NetworkConfig,
}

impl Server {
    pub fn new(
        listener: TcpListener,
        notify_shutdown: broadcast::Sender<()>,
        shutdown_complete_tx: mpsc::Sender<()>,
        registry: Arc<SessionRegistry>,
        session_handler: Arc<SessionHandler>,
        network: NetworkConfig,
    ) -> Self {
        Server {
            listener,
            limit_connections: Arc::new(Semaphore::new(network.max_connection)),
            notify_shutdown,
            shutdown_complete_tx,
            registry,
            session_handler,
            network,
        }
    }

    /// Accepts connections until accepting fails for good.
    ///
    /// Every socket is served by its own task, after a permit has been taken
    /// from the connection limit. The session entry, the permit and the
    /// completion handle are all released when that task ends, whether the
    /// handler returned or panicked.
    ///
    // Graceful shutdown sequence:
    // 1. The `run loop` is canceled by the caller once the shutdown signal arrives.
    // 2. Each `connection handler` observes the broadcast, stops reading and returns.
    // 3. Dropping a handler drops its `shutdown_complete_tx` clone; the caller waits
    //    for the channel to close before returning.
    pub async fn run(&self) -> AppResult<()> {
        let connection_timeout = self.network.connection_timeout();
        loop {
            let permit = self
                .limit_connections
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AppError::IllegalStateError(e.to_string().into()))?;

            let socket = self.accept().await?;
            let peer = socket
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            let session = self.registry.open();
            info!("[{}] --> new connection (session {})", peer, session.id());

            let mut handler = ConnectionHandler {
                _shutdown_complete_tx: self.shutdown_complete_tx.clone(),
                shutdown: Shutdown::subscribe(&self.notify_shutdown),
                session,
                session_handler: self.session_handler.clone(),
                connection: Connection::new(socket, self.network.max_packet_size),
                peer,
            };

            tokio::spawn(async move {
                let watchdog = IdleWatchdog::arm(connection_timeout);
                if let Err(err) = handler.handle_connection(&watchdog).await {
                    report_connection_error(&err, watchdog.has_fired(), &handler.peer);
                }
                // whether gracefully or unexpectedly closed, release connection
                drop(handler);
                drop(permit);
            });
        }
    }

    async fn accept(&self) -> AppResult<TcpStream> {
        let mut backoff = 1;

        loop {
            match self.listener.accept().await {
                Ok((socket, _)) => return Ok(socket),
                Err(err) => {
                    if backoff > 64 {
                        return Err(AppError::Accept(err.to_string()));
                    }
                    warn!("accept failed, retrying in {}s: {}", backoff, err);
                }
            }

            time::sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        debug!("tcp server dropped");
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        info!("[{}] <-- closed connection", self.peer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{FramingError, ProtocolViolation};

    #[test]
    fn test_timed_out_transport_error_is_suppressed() {
        assert_eq!(connection_error_level(ErrorCategory::Transport, true), Level::DEBUG);
        assert_eq!(connection_error_level(ErrorCategory::Transport, false), Level::WARN);
    }

    #[test]
    fn test_level_per_category() {
        let cases = [
            (AppError::from(FramingError::UnexpectedEndOfInput), Level::WARN),
            (AppError::from(ProtocolViolation::PlayerNameTooLong(17)), Level::WARN),
            (
                AppError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe)),
                Level::WARN,
            ),
            (AppError::IllegalStateError("missing session".into()), Level::ERROR),
        ];
        for (err, level) in &cases {
            assert_eq!(connection_error_level(err.category(), false), *level, "{:?}", err);
            // a fired watchdog only softens transport errors
            if err.category() != ErrorCategory::Transport {
                assert_eq!(connection_error_level(err.category(), true), *level);
            }
            report_connection_error(err, false, "127.0.0.1:1");
        }
    }
}
