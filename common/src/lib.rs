// Common library for the portal: command construction, scheduler
// integration and the ambient configuration/auth/telemetry stack

pub mod actions;
pub mod auth;
pub mod command;
pub mod config;
pub mod errors;
pub mod locator;
pub mod models;
pub mod normalizer;
pub mod scheduler;
pub mod scripts;
pub mod shell;
pub mod telemetry;
