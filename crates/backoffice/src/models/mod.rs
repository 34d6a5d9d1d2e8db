//! Domain models for the back office.

pub mod proposal;
pub mod registration;
pub mod sponsor;
pub mod staff;

pub use proposal::{NewReview, ProposalReview, RATING_RANGE};
pub use registration::{
    CheckInUpdate, FoodCheckUpdate, NewRegistration, Registration, RegistrationCreated,
};
pub use sponsor::normalize_tier;
pub use staff::{
    CurrentStaff, NewStaff, StaffLogin, StaffMember, StaffProfile, StaffUpdate, TokenResponse,
};
