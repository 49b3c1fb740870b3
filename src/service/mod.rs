pub use app_error::{AppError, AppResult, ErrorCategory, FramingError, ProtocolViolation};
pub use config::{
    LogConfig, LoginAttemptConfig, MotdConfig, NetworkConfig, ServerConfig, StatsConfig,
    ENV_PREFIX,
};
pub use favicon::{apply_favicon, load_favicon};
pub use server::Server;
pub use shutdown::Shutdown;
pub use status_server::StatusServer;
pub use tracing_config::{default_level, setup_tracing};

mod app_error;
mod config;
mod favicon;
mod server;
mod shutdown;
mod status_server;
mod tracing_config;
