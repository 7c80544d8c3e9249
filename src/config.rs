//! Server Configuration
//!
//! Command-line parsing for the relay binary. The first positional argument
//! is accepted as the port, so `sqlrelay 7778` keeps working for scripts
//! that launch the server that way.

use crate::connection::framed::DEFAULT_MAX_FRAME_SIZE;
use crate::protocol::types::DEFAULT_WRITE_ACK;
use crate::storage::store::{StoreConfig, DEFAULT_BUSY_TIMEOUT, DEFAULT_DB_PATH};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Errors produced while parsing arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid value for {flag}: {value}")]
    InvalidValue { flag: String, value: String },

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// What the binary should do after parsing its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    Run(Config),
    Help,
    Version,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// SQLite database file
    pub db_path: PathBuf,
    /// How long a store handle waits on a locked database
    pub busy_timeout: Duration,
    /// Literal returned for a successful write
    pub write_ack: String,
    /// Largest inbound message accepted, in bytes
    pub max_frame_size: usize,
    /// Create the front-end tables at startup
    pub init_schema: bool,
    /// How long shutdown waits for open connections
    pub shutdown_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            write_ack: DEFAULT_WRITE_ACK.to_string(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            init_schema: true,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Parses configuration from command-line arguments (without the
    /// program name).
    pub fn from_args<I, A>(args: I) -> Result<CliAction, ConfigError>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter().map(Into::<String>::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => {
                    config.host = next_value(&mut args, &arg)?;
                }
                "--port" | "-p" => {
                    config.port = parse_value(&arg, next_value(&mut args, &arg)?)?;
                }
                "--db" | "-d" => {
                    config.db_path = PathBuf::from(next_value(&mut args, &arg)?);
                }
                "--busy-timeout-ms" => {
                    let ms: u64 = parse_value(&arg, next_value(&mut args, &arg)?)?;
                    config.busy_timeout = Duration::from_millis(ms);
                }
                "--write-ack" => {
                    config.write_ack = next_value(&mut args, &arg)?;
                }
                "--max-frame" => {
                    config.max_frame_size = parse_value(&arg, next_value(&mut args, &arg)?)?;
                }
                "--shutdown-grace-ms" => {
                    let ms: u64 = parse_value(&arg, next_value(&mut args, &arg)?)?;
                    config.shutdown_grace = Duration::from_millis(ms);
                }
                "--no-init-schema" => config.init_schema = false,
                "--help" => return Ok(CliAction::Help),
                "--version" | "-v" => return Ok(CliAction::Version),
                other if !other.starts_with('-') => {
                    let raw = other.trim();
                    match raw.parse() {
                        Ok(port) => config.port = port,
                        Err(_) => warn!(
                            "Invalid port '{}', falling back to default {}",
                            raw, config.port
                        ),
                    }
                }
                _ => return Err(ConfigError::UnknownArgument(arg.clone())),
            }
        }

        Ok(CliAction::Run(config))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Store settings derived from this configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            path: self.db_path.clone(),
            busy_timeout: self.busy_timeout,
        }
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, ConfigError> {
    args.next()
        .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_config(args: &[&str]) -> Config {
        match Config::from_args(args.iter().copied()).unwrap() {
            CliAction::Run(config) => config,
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let config = run_config(&[]);
        assert_eq!(config.bind_address(), "127.0.0.1:7778");
        assert_eq!(config.db_path, PathBuf::from("stomp_server.db"));
        assert_eq!(config.write_ack, "done");
        assert!(config.init_schema);
    }

    #[test]
    fn test_flags() {
        let config = run_config(&[
            "--host",
            "0.0.0.0",
            "-p",
            "9000",
            "--db",
            "/tmp/relay.db",
            "--busy-timeout-ms",
            "250",
            "--write-ack",
            "SUCCESS",
            "--max-frame",
            "1024",
            "--shutdown-grace-ms",
            "1500",
            "--no-init-schema",
        ]);

        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.store_config().path, PathBuf::from("/tmp/relay.db"));
        assert_eq!(config.store_config().busy_timeout, Duration::from_millis(250));
        assert_eq!(config.write_ack, "SUCCESS");
        assert_eq!(config.max_frame_size, 1024);
        assert_eq!(config.shutdown_grace, Duration::from_millis(1500));
        assert!(!config.init_schema);
    }

    #[test]
    fn test_positional_port() {
        assert_eq!(run_config(&["7001"]).port, 7001);
        // An unparsable positional port falls back to the default
        assert_eq!(run_config(&["seventy"]).port, 7778);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            Config::from_args(["--port"]),
            Err(ConfigError::MissingValue("--port".to_string()))
        );
        assert_eq!(
            Config::from_args(["--port", "high"]),
            Err(ConfigError::InvalidValue {
                flag: "--port".to_string(),
                value: "high".to_string()
            })
        );
        assert_eq!(
            Config::from_args(["--verbose"]),
            Err(ConfigError::UnknownArgument("--verbose".to_string()))
        );
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(Config::from_args(["--help"]), Ok(CliAction::Help));
        assert_eq!(Config::from_args(["-v"]), Ok(CliAction::Version));
    }
}
