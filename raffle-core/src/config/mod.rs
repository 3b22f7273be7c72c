//! Runtime configuration types for the raffle server.
//!
//! These are the validated values the server runs with. Loading and parsing
//! the TOML file is handled by the server crate.

mod admin;
mod draw;
mod server;

pub use admin::AdminConfig;
pub use draw::DrawConfig;
pub use server::ServerConfig;

use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};

/// Shared configuration state with separate locks for each section.
#[derive(Clone)]
pub struct SharedConfig {
    pub server: Arc<RwLock<ServerConfig>>,
    pub admin: Arc<RwLock<AdminConfig>>,
    pub draw: Arc<RwLock<DrawConfig>>,
}

impl SharedConfig {
    pub fn new(server: ServerConfig, admin: AdminConfig, draw: DrawConfig) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
            admin: Arc::new(RwLock::new(admin)),
            draw: Arc::new(RwLock::new(draw)),
        }
    }

    pub async fn server(&self) -> RwLockReadGuard<'_, ServerConfig> {
        self.server.read().await
    }

    pub async fn admin(&self) -> RwLockReadGuard<'_, AdminConfig> {
        self.admin.read().await
    }

    pub async fn draw(&self) -> RwLockReadGuard<'_, DrawConfig> {
        self.draw.read().await
    }

    pub async fn update_admin(&self, config: AdminConfig) {
        let mut admin = self.admin.write().await;
        *admin = config;
    }

    pub async fn update_draw(&self, config: DrawConfig) {
        let mut draw = self.draw.write().await;
        *draw = config;
    }
}
