//! PyCon Togo back office library.
//!
//! This crate provides the back office as a library, allowing it to be
//! tested and reused by the CLI.
//!
//! # Architecture
//!
//! - Axum JSON API for registrations, inquiries, proposals and staff
//! - Record store behind the [`db::RecordStore`] trait (`PostgreSQL` in
//!   production, in memory for tests)
//! - Ticket pipeline ([`services::ticket`]): reference, rendering, upload to
//!   the image host, email through the SMTP relay
//! - Staff authentication with Argon2 passwords and HS256 bearer tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use config::BackofficeConfig;
pub use error::AppError;
pub use state::AppState;
