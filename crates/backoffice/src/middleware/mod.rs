//! HTTP middleware for the back office.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, outermost)
//! 2. `TraceLayer` (request tracing with status and latency)
//! 3. `CorsLayer` (public registration form on the event site)
//!
//! Authentication is not a layer: handlers take one of the bearer token
//! extractors from [`auth`] and state which roles they accept.

pub mod auth;

pub use auth::{Authenticated, AuthRejection, RequireAdmin, RequireReviewer, RequireStaff};
