// Library root for the auth orchestrator

pub mod core;
pub mod keycloak;
pub mod auth;
pub mod api;
pub mod config;
pub mod utils;
