//! Configuration schema definitions.
//!
//! This module defines the application configuration consumed by services
//! built on the foundation. All types derive Serde traits; field names are
//! camelCase on the wire.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root application configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Service name, used in logs.
    pub app_name: String,

    /// Root domain the service is reachable under.
    pub root_domain: String,

    /// Secret used for session cookies.
    pub session_key: String,

    /// One of development, staging, production.
    pub environment: String,

    /// Project identifier for cloud integrations.
    #[serde(rename = "googleProjectID")]
    pub google_project_id: String,

    /// HTTP listener settings. An empty port disables the listener.
    pub http_server_config: ServerConfig,

    /// gRPC listener settings. An empty port disables the listener.
    pub grpc_server_config: ServerConfig,

    /// Outbound gRPC clients keyed by name.
    pub grpc_client_configs: HashMap<String, ClientConfig>,

    /// Database pools keyed by use (e.g. "main", "readOnly").
    pub db_configs: HashMap<String, DbConfig>,

    pub pub_sub_config: PubSubConfig,

    #[serde(rename = "auth0Config")]
    pub auth0_config: Auth0Config,

    /// Credentials accepted by the basic auth middleware.
    pub basic_auth_users: HashMap<String, String>,
}

/// Listener settings. Durations are in seconds.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub port: String,
    pub shutdown_wait: u64,
    pub write_timeout: u64,
    pub read_timeout: u64,
    pub idle_timeout: u64,
}

impl ServerConfig {
    pub(crate) fn with_http_defaults() -> Self {
        Self {
            port: String::new(),
            shutdown_wait: 30,
            write_timeout: 15,
            read_timeout: 15,
            idle_timeout: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub name: String,
    pub host: String,
    pub port: String,
    #[serde(rename = "googleIAMAudience")]
    pub google_iam_audience: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DbConfig {
    #[serde(rename = "connectionURL")]
    pub connection_url: String,
    pub max_idle_conns: u32,
    pub max_open_conns: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct PubSubConfig {
    pub host: String,
    pub port: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Auth0Config {
    pub domain: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_secret: String,
}
