//! PyCon Togo Core - Shared types library.
//!
//! This crate provides the types shared by every back office component:
//! - `backoffice` - HTTP API, record store and ticket issuance pipeline
//! - `cli` - Command-line tools for migrations, staff and tickets
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. The ticket reference generator lives
//! here because it needs nothing but the participant identifier.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, staff roles and ticket references

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
