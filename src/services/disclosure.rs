// src/services/disclosure.rs
//! Selective disclosure frame builder.
//!
//! Turns a holder's claim choices into the JSON-LD frame the presentation
//! endpoint applies to a stored credential. Building the frame is pure; the
//! network and file side of the flow lives in
//! [`crate::services::presentation`].

use crate::error::{PortalError, PortalResult};
use crate::models::credential::CredentialDocument;
use crate::models::presentation::{DisclosureFrame, SelectedClaimSet, SubjectFrame};
use serde_json::{json, Map};

/// Builds the disclosure frame for `document` revealing `claims`.
///
/// - `@context` and `type` are copied unmodified from the document
/// - `credentialSubject` is `@explicit` and always lists `id`, followed by one
///   empty-object entry per selected claim
///
/// An empty selection still yields a valid frame revealing only `id`;
/// rejecting it is up to [`DisclosurePolicy`].
pub fn build_disclosure_frame(
    document: &CredentialDocument,
    claims: &SelectedClaimSet,
) -> DisclosureFrame {
    let mut properties = Map::new();
    properties.insert("id".to_string(), json!({}));
    for claim in claims.iter() {
        properties.insert(claim.to_string(), json!({}));
    }

    DisclosureFrame {
        context: document.context().cloned(),
        types: document.type_value().cloned(),
        credential_subject: SubjectFrame {
            explicit: true,
            properties,
        },
    }
}

/// Client side rule applied to a selection before it is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisclosurePolicy {
    /// Claims that must be selected besides the always revealed `id`
    pub minimum_claims: usize,
}

impl Default for DisclosurePolicy {
    fn default() -> Self {
        Self { minimum_claims: 1 }
    }
}

impl DisclosurePolicy {
    pub fn new(minimum_claims: usize) -> Self {
        Self { minimum_claims }
    }

    pub fn check(&self, claims: &SelectedClaimSet) -> PortalResult<()> {
        if claims.len() < self.minimum_claims {
            return Err(PortalError::InsufficientClaims {
                required: self.minimum_claims,
                selected: claims.len(),
            });
        }
        Ok(())
    }
}
