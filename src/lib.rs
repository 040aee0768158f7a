// Library exports for the boardlog log console

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
pub mod server;
pub mod telemetry;
pub mod trace;
