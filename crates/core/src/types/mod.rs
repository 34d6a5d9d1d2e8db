//! Core types for the PyCon Togo back office.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod reference;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use reference::{EVENT_YEAR, InvalidReferenceInput, TicketReference, reference};
pub use role::StaffRole;
