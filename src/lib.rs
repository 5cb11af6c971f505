//! pma-backup Core Library
//!
//! Downloads SQL dump backups through a phpMyAdmin web interface by driving
//! its login and export forms.
//!
//! # Architecture
//!
//! - [`config`] - Backup request, compression modes and defaults
//! - [`backup`] - The download workflow, HTTP session and filename rules
//! - [`html`] - Page queries: fields by id, links, multi-select options, forms

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backup;
pub mod config;
pub mod html;
mod user_agent;

// Re-export commonly used types
pub use backup::{
    BackupError, LoginCheckFailed, dbs_to_dump, download_sql_backup, download_sql_backup_at,
    parse_excluded_dbs,
};
pub use config::{
    BackupRequest, Compression, DEFAULT_PREFIX_FORMAT, DEFAULT_TIMEOUT_SECS, HttpAuth,
};
pub use html::{Document, Field, Form, HtmlDocument};
