//! Ticket references.
//!
//! A ticket reference is the short code printed on a ticket and quoted in
//! support requests, e.g. `PYCONTG-2025-5C663C`. It is derived from the
//! participant identifier alone, so it can be recomputed at any time without
//! a database lookup and is never stored.

use core::fmt;

use serde::Serialize;

/// Edition year used when no other year is configured.
pub const EVENT_YEAR: u16 = 2025;

/// Prefix shared by every ticket reference.
const PREFIX: &str = "PYCONTG";

/// Maximum number of characters kept from the identifier's leading segment.
const SHORTCODE_LENGTH: usize = 6;

/// Delimiter separating the segments of a textual UUID.
const SEGMENT_DELIMITER: char = '-';

/// The participant identifier cannot produce a reference.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot derive a ticket reference from an empty participant identifier")]
pub struct InvalidReferenceInput;

/// A derived ticket reference of the form `PYCONTG-<year>-<SHORTCODE>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TicketReference(String);

impl TicketReference {
    /// Derive the reference for `participant_id` in the given edition year.
    ///
    /// The identifier does not have to be a UUID: it is split on its first
    /// `-`, and the leading segment is truncated to six characters and
    /// upper-cased. Identifiers sharing the same first six characters before
    /// the first `-` collide.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidReferenceInput`] when `participant_id` is empty.
    pub fn derive(participant_id: &str, year: u16) -> Result<Self, InvalidReferenceInput> {
        if participant_id.is_empty() {
            return Err(InvalidReferenceInput);
        }

        let segment = participant_id
            .split(SEGMENT_DELIMITER)
            .next()
            .unwrap_or_default();
        let shortcode: String = segment
            .chars()
            .take(SHORTCODE_LENGTH)
            .flat_map(char::to_uppercase)
            .collect();

        Ok(Self(format!("{PREFIX}-{year}-{shortcode}")))
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TicketReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the reference for `participant_id` in the default edition year.
///
/// ```
/// use pycontg_core::reference;
///
/// let reference = reference("5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c").unwrap();
/// assert_eq!(reference.as_str(), "PYCONTG-2025-5C663C");
/// ```
///
/// # Errors
///
/// Returns [`InvalidReferenceInput`] when `participant_id` is empty.
pub fn reference(participant_id: &str) -> Result<TicketReference, InvalidReferenceInput> {
    TicketReference::derive(participant_id, EVENT_YEAR)
}
