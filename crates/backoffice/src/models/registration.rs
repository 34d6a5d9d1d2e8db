//! Registration models.

use serde::{Deserialize, Serialize};

use pycontg_core::{Email, RegistrationId};

const DEFAULT_PHONE: &str = "90000000";
const DEFAULT_COUNTRY: &str = "Togo";

const fn default_true() -> bool {
    true
}

fn default_phone() -> String {
    DEFAULT_PHONE.to_string()
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

/// A stored registration.
///
/// Field names on the wire and in storage follow the public registration form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: Email,
    pub phone: String,
    #[serde(default)]
    pub organization: String,
    pub country: String,
    #[serde(rename = "tshirtsize", default)]
    pub tshirt_size: String,
    #[serde(rename = "dietaryrestrictions", default)]
    pub dietary_restrictions: String,
    pub newsletter: bool,
    #[serde(rename = "codeofconduct")]
    pub code_of_conduct: bool,
    #[serde(default)]
    pub checked: bool,
    #[serde(rename = "foodchecked", default)]
    pub food_checked: bool,
}

impl Registration {
    /// Organization to print on the ticket, if any.
    #[must_use]
    pub fn organization(&self) -> Option<&str> {
        let organization = self.organization.trim();
        (!organization.is_empty()).then_some(organization)
    }

    /// Country/city line for the ticket, falling back to `default` when blank.
    #[must_use]
    pub fn country_city<'a>(&'a self, default: &'a str) -> &'a str {
        let country = self.country.trim();
        if country.is_empty() { default } else { country }
    }
}

/// Registration form submission.
///
/// Missing optional fields take the same defaults as the public form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRegistration {
    #[serde(default)]
    pub id: Option<RegistrationId>,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: Email,
    #[serde(default = "default_phone")]
    pub phone: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(rename = "tshirtsize", default)]
    pub tshirt_size: Option<String>,
    #[serde(rename = "dietaryrestrictions", default)]
    pub dietary_restrictions: Option<String>,
    #[serde(default = "default_true")]
    pub newsletter: bool,
    #[serde(rename = "codeofconduct", default = "default_true")]
    pub code_of_conduct: bool,
}

impl NewRegistration {
    /// Build the record to store, generating an id when none was supplied.
    #[must_use]
    pub fn into_registration(self) -> Registration {
        Registration {
            id: self.id.unwrap_or_else(RegistrationId::generate),
            full_name: self.full_name.trim().to_string(),
            email: self.email,
            phone: self.phone,
            organization: self.organization.unwrap_or_default(),
            country: self.country,
            tshirt_size: self.tshirt_size.unwrap_or_default(),
            dietary_restrictions: self.dietary_restrictions.unwrap_or_default(),
            newsletter: self.newsletter,
            code_of_conduct: self.code_of_conduct,
            checked: false,
            food_checked: false,
        }
    }
}

/// Body of the check-in endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CheckInUpdate {
    #[serde(rename = "isChecked")]
    pub is_checked: bool,
}

/// Body of the food distribution endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FoodCheckUpdate {
    #[serde(rename = "isChecked")]
    pub is_checked: bool,
}

/// Response of a successful registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationCreated {
    pub message: &'static str,
    pub registration_id: RegistrationId,
    pub ticket_reference: String,
    pub ticket_url: String,
}
