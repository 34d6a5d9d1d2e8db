//! Staff roles.

use serde::{Deserialize, Serialize};

/// Role of a back office staff member.
///
/// Endpoints state which roles they accept; `Admin` is accepted everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Manages staff accounts, deletes records and re-issues tickets.
    Admin,
    /// Registration desk: check-in, food distribution, inquiry follow-up.
    #[default]
    Staff,
    /// Reviews talk proposals.
    Reviewer,
}

impl StaffRole {
    /// Whether this role satisfies any of `allowed`. Admins satisfy every check.
    #[must_use]
    pub fn is_any_of(self, allowed: &[Self]) -> bool {
        self == Self::Admin || allowed.contains(&self)
    }
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Staff => write!(f, "staff"),
            Self::Reviewer => write!(f, "reviewer"),
        }
    }
}

impl std::str::FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            "reviewer" => Ok(Self::Reviewer),
            _ => Err(format!("invalid staff role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_satisfies_every_check() {
        assert!(StaffRole::Admin.is_any_of(&[StaffRole::Reviewer]));
        assert!(StaffRole::Admin.is_any_of(&[]));
    }

    #[test]
    fn test_role_checks() {
        assert!(StaffRole::Staff.is_any_of(&[StaffRole::Staff]));
        assert!(!StaffRole::Staff.is_any_of(&[StaffRole::Reviewer]));
        assert!(!StaffRole::Reviewer.is_any_of(&[StaffRole::Admin]));
    }

    #[test]
    fn test_display_parse_roundtrip() {
        for role in [StaffRole::Admin, StaffRole::Staff, StaffRole::Reviewer] {
            assert_eq!(role.to_string().parse::<StaffRole>(), Ok(role));
        }
        assert!("organizer".parse::<StaffRole>().is_err());
    }
}
