//! Resolved options consumed by the foundation.

use std::time::Duration;

use crate::config::environment::Environment;
use crate::config::schema::AppConfig;

pub const DEFAULT_HTTP_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_GRPC_ADDRESS: &str = "0.0.0.0:8081";
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SHUTDOWN_WAIT: Duration = Duration::from_secs(30);

/// Whether a listener runs and where it binds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub enabled: bool,
    pub bind_address: String,
}

impl ListenerOptions {
    pub fn enabled(bind_address: impl Into<String>) -> Self {
        Self {
            enabled: true,
            bind_address: bind_address.into(),
        }
    }
}

/// Foundation settings. Zero values are replaced by
/// [`FoundationOptions::values_or_defaults`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoundationOptions {
    pub environment: Environment,
    pub http: ListenerOptions,
    pub grpc: ListenerOptions,
    pub write_timeout: Duration,
    pub read_timeout: Duration,
    pub idle_timeout: Duration,
    /// Deadline for draining the HTTP listener during shutdown.
    pub shutdown_wait: Duration,
    /// Abort `run` when any processor fails to start.
    pub stop_on_processor_start_failure: bool,
    /// Request paths the HTTP request logger stays quiet about.
    pub log_skip_paths: Vec<String>,
}

impl FoundationOptions {
    /// Fill unset values with defaults.
    pub fn values_or_defaults(mut self) -> Self {
        if self.http.bind_address.is_empty() {
            self.http.bind_address = DEFAULT_HTTP_ADDRESS.to_string();
        }
        if self.grpc.bind_address.is_empty() {
            self.grpc.bind_address = DEFAULT_GRPC_ADDRESS.to_string();
        }
        if self.write_timeout.is_zero() {
            self.write_timeout = DEFAULT_WRITE_TIMEOUT;
        }
        if self.read_timeout.is_zero() {
            self.read_timeout = DEFAULT_READ_TIMEOUT;
        }
        if self.idle_timeout.is_zero() {
            self.idle_timeout = DEFAULT_IDLE_TIMEOUT;
        }
        if self.shutdown_wait.is_zero() {
            self.shutdown_wait = DEFAULT_SHUTDOWN_WAIT;
        }
        self
    }

    /// Map a loaded application config. A listener is enabled when its port is set.
    pub fn from_config(config: &AppConfig) -> Self {
        let http = &config.http_server_config;
        let grpc = &config.grpc_server_config;

        Self {
            environment: Environment::parse_lenient(&config.environment),
            http: listener_from_port(&http.port),
            grpc: listener_from_port(&grpc.port),
            write_timeout: Duration::from_secs(http.write_timeout),
            read_timeout: Duration::from_secs(http.read_timeout),
            idle_timeout: Duration::from_secs(http.idle_timeout),
            shutdown_wait: Duration::from_secs(http.shutdown_wait),
            stop_on_processor_start_failure: false,
            log_skip_paths: Vec::new(),
        }
        .values_or_defaults()
    }
}

fn listener_from_port(port: &str) -> ListenerOptions {
    if port.is_empty() {
        ListenerOptions::default()
    } else {
        ListenerOptions::enabled(format!("0.0.0.0:{}", port))
    }
}
