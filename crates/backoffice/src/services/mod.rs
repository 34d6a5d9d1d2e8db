//! Business logic services for the back office.
//!
//! # Services
//!
//! - `auth` - Staff login, password hashing and bearer tokens
//! - `registration` - Registration intake and ticket re-issuance
//! - `ticket` - Ticket rendering, storage and email delivery

pub mod auth;
pub mod registration;
pub mod ticket;

pub use auth::{AuthError, AuthService, Claims, JwtService, hash_password, verify_password};
pub use registration::{RegistrationError, RegistrationService};
pub use ticket::{
    IssuanceFailure, IssuedTicket, Stage, TicketIssuance, TicketIssuer, TicketRequest, build_issuer,
};
