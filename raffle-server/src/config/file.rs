//! TOML file configuration structures.
//!
//! These structs directly map to the `raffle-config.toml` file format.

use raffle_core::config::AdminConfig as RuntimeAdminConfig;
use raffle_core::events::{DEFAULT_ANNOUNCEMENT_BUFFER, DEFAULT_PROGRESS_BUFFER};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub draw: DrawConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Admin configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext it will be hashed and the
    /// config file will be rewritten.
    pub secret: String,
}

/// Draw tuning section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawConfig {
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,
    #[serde(default = "default_announcement_buffer")]
    pub announcement_buffer: usize,
    #[serde(default = "default_exclude")]
    pub default_exclude_previous_winners: bool,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            progress_buffer: default_progress_buffer(),
            announcement_buffer: default_announcement_buffer(),
            default_exclude_previous_winners: default_exclude(),
        }
    }
}

fn default_progress_buffer() -> usize {
    DEFAULT_PROGRESS_BUFFER
}

fn default_announcement_buffer() -> usize {
    DEFAULT_ANNOUNCEMENT_BUFFER
}

fn default_exclude() -> bool {
    true
}

impl FileConfig {
    /// Check if the admin secret is already an argon2 hash.
    pub fn is_admin_secret_hashed(&self) -> bool {
        RuntimeAdminConfig::is_hashed(&self.admin.secret)
    }
}
