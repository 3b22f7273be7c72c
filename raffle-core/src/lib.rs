#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod eligibility;
pub mod entities;
pub mod events;
pub mod framework;
pub mod guard;
pub mod orchestrator;
pub mod recorder;
pub mod sampler;
pub mod service;
pub mod store;

/// Schema migrations shared by the server and the database tests.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../migrations");
