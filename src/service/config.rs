use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::{AppError, AppResult};
use crate::protocol::{
    ChatComponent, ChatMessage, Description, Players, SamplePlayer, Version, VAR_INT_MAX_BYTES,
};

/// Prefix of environment variables that override file settings,
/// e.g. `MCSTATUS_NETWORK__PORT=25566`.
pub const ENV_PREFIX: &str = "MCSTATUS";

/// Ten years of hourly buckets.
pub const MAX_STATISTICS_MAP_SIZE: usize = 24 * 366 * 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub ip: String,
    pub port: u16,
    pub max_connection: usize,
    /// Largest accepted frame, length prefix excluded.
    pub max_packet_size: usize,
    /// Idle timeout per connection, in milliseconds.
    pub connection_timeout: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            ip: "localhost".to_string(),
            port: 25565,
            max_connection: 1024,
            max_packet_size: 2_097_151,
            connection_timeout: 10_000,
        }
    }
}

impl NetworkConfig {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotdConfig {
    pub version: Version,
    pub players: Players,
    pub description: Description,
    /// Path of a PNG file on disk; swapped for a data URI once the favicon is loaded.
    #[serde(alias = "favicon-path")]
    pub favicon_path: String,
}

impl Default for MotdConfig {
    fn default() -> Self {
        MotdConfig {
            version: MotdConfig::default_version(),
            players: MotdConfig::default_players(),
            description: MotdConfig::default_description(),
            favicon_path: String::new(),
        }
    }
}

impl MotdConfig {
    /// Fallback for every `motd.version` key a config source leaves out.
    pub fn default_version() -> Version {
        Version {
            name: "mcstatusserver 420".to_string(),
            protocol: -1,
        }
    }

    pub fn default_players() -> Players {
        Players {
            max: 1337,
            online: 42,
            sample: vec![
                SamplePlayer {
                    name: "Hi there, this is".to_string(),
                    id: "7cd21442-4bd9-4b02-8539-1a2c4771ed3c".to_string(),
                },
                SamplePlayer {
                    name: "my public server".to_string(),
                    id: "c87a3f54-3802-4227-b72a-17ee3f10cbd9".to_string(),
                },
            ],
        }
    }

    pub fn default_description() -> Description {
        Description {
            text: "§cThis server runs with §aRust§c.\n§7mcstatusd".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginAttemptConfig {
    pub disconnect_text: ChatMessage,
}

impl Default for LoginAttemptConfig {
    fn default() -> Self {
        LoginAttemptConfig {
            disconnect_text: ChatMessage {
                text: "You are not ".to_string(),
                bold: "true".to_string(),
                italic: "true".to_string(),
                underlined: "true".to_string(),
                strikethrough: String::new(),
                obfuscated: "true".to_string(),
                color: "red".to_string(),
                insertion: "true".to_string(),
                extra: Some(vec![
                    ChatComponent {
                        text: "allowed to access ".to_string(),
                        color: "green".to_string(),
                        ..Default::default()
                    },
                    ChatComponent {
                        text: "this server.".to_string(),
                        italic: "true".to_string(),
                        ..Default::default()
                    },
                ]),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Number of hourly buckets kept.
    pub statistics_map_size: usize,
    /// Seconds between two checks that start a new bucket on an hour change.
    pub roll_interval: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            statistics_map_size: 24 * 7,
            roll_interval: 50 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: String,
    /// File name prefix of the hourly log files; empty logs to stdout only.
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            dir: "logs".to_string(),
            file_prefix: String::new(),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    pub motd: MotdConfig,
    pub login_attempt: LoginAttemptConfig,
    pub stats: StatsConfig,
    pub log: LogConfig,
}

impl ServerConfig {
    /// Reads the config file at `path` (any format the `config` crate knows,
    /// picked by extension) and applies `MCSTATUS_*` environment overrides on top.
    ///
    /// When `required` is false a missing file falls back to the defaults.
    pub fn set_up_config<P: AsRef<Path>>(path: P, required: bool) -> AppResult<ServerConfig> {
        let path_str = path
            .as_ref()
            .to_str()
            .ok_or(AppError::InvalidValue(format!(
                "config file path: {}",
                path.as_ref().to_string_lossy()
            )))?;
        let config = config::Config::builder()
            .add_source(config::File::with_name(path_str).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.network.connection_timeout == 0 {
            return Err(AppError::InvalidValue(
                "network.connection_timeout must be greater than 0".to_string(),
            ));
        }
        if self.network.max_connection == 0
            || self.network.max_connection > Semaphore::MAX_PERMITS
        {
            return Err(AppError::InvalidValue(format!(
                "network.max_connection must be in [1, {}]",
                Semaphore::MAX_PERMITS
            )));
        }
        // the frame length prefix is a VarInt
        let max_frame = i32::MAX as usize;
        if self.network.max_packet_size == 0 || self.network.max_packet_size > max_frame {
            return Err(AppError::InvalidValue(format!(
                "network.max_packet_size must be in [1, {}] to fit a {}-byte varint",
                max_frame, VAR_INT_MAX_BYTES
            )));
        }
        if self.stats.statistics_map_size == 0
            || self.stats.statistics_map_size > MAX_STATISTICS_MAP_SIZE
        {
            return Err(AppError::InvalidValue(format!(
                "stats.statistics_map_size must be in [1, {}]",
                MAX_STATISTICS_MAP_SIZE
            )));
        }
        if self.stats.roll_interval == 0 {
            return Err(AppError::InvalidValue(
                "stats.roll_interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
