//! ---
//! osscat_section: "01-core-functionality"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Shared primitives and utilities for the catalog runtime."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
//! Core shared primitives for the OSS catalog workspace.
//! This crate exposes configuration loading, logging, and the timestamp
//! codec used by the relational store.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, AuthConfig, BootstrapConfig, DatabaseConfig, LoadedAppConfig, LoggingConfig,
    PasswordHashConfig, ServerConfig,
};
pub use logging::{init_tracing, LogFormat};
