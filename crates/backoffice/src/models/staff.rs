//! Staff account models.

use serde::{Deserialize, Serialize};

use pycontg_core::{Email, StaffId, StaffRole};

/// A stored staff account.
///
/// Never serialized to clients directly; use [`StaffProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    #[serde(rename = "fullname")]
    pub full_name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: StaffRole,
}

/// Public view of a staff account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffProfile {
    pub id: StaffId,
    #[serde(rename = "fullname")]
    pub full_name: String,
    pub email: Email,
    pub role: StaffRole,
}

impl From<StaffMember> for StaffProfile {
    fn from(member: StaffMember) -> Self {
        Self {
            id: member.id,
            full_name: member.full_name,
            email: member.email,
            role: member.role,
        }
    }
}

/// Staff creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
    #[serde(rename = "fullname")]
    pub full_name: String,
    pub email: Email,
    pub password: String,
    #[serde(default)]
    pub role: StaffRole,
}

/// Partial staff update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffUpdate {
    #[serde(rename = "fullname", default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<StaffRole>,
}

/// Login request.
#[derive(Debug, Clone, Deserialize)]
pub struct StaffLogin {
    pub email: String,
    pub password: String,
}

/// Bearer token issued on login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Authenticated staff member, resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentStaff {
    pub id: StaffId,
    #[serde(rename = "fullname")]
    pub full_name: String,
    pub email: String,
    pub role: StaffRole,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_profile_hides_password_hash() {
        let member = StaffMember {
            id: StaffId::new(1),
            full_name: "Desk One".to_string(),
            email: Email::parse("desk@pytogo.org").unwrap(),
            password_hash: "$argon2id$v=19$...".to_string(),
            role: StaffRole::Staff,
        };
        let value = serde_json::to_value(StaffProfile::from(member)).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["role"], "staff");
        assert_eq!(value["fullname"], "Desk One");
    }

    #[test]
    fn test_new_staff_defaults_to_staff_role() {
        let new: NewStaff = serde_json::from_value(json!({
            "fullname": "Desk Two",
            "email": "desk2@pytogo.org",
            "password": "correct horse battery staple",
        }))
        .unwrap();
        assert_eq!(new.role, StaffRole::Staff);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result: Result<StaffUpdate, _> = serde_json::from_value(json!({"role": "owner"}));
        assert!(result.is_err());
    }
}
