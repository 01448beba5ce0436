// src/models/credential.rs
//! Verifiable Credential data model.
//!
//! Credentials are signed by the portal API and handed to the client as
//! JSON-LD. The client never re-signs or re-validates them, so the document is
//! kept as an opaque JSON object with read accessors for the handful of fields
//! the client actually looks at.

use crate::error::{PortalError, PortalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type entry every credential carries.
pub const VERIFIABLE_CREDENTIAL: &str = "VerifiableCredential";
/// Type entry every presentation carries.
pub const VERIFIABLE_PRESENTATION: &str = "VerifiablePresentation";

/// A W3C Verifiable Credential as returned by the portal API.
///
/// The wrapped object is expected to carry:
/// - `@context`: ordered list of context identifiers/objects
/// - `type`: ordered list of type names, including `"VerifiableCredential"`
/// - `credentialSubject`: claim name to claim value, always with an `id`
/// - `issuer` and `issuanceDate`
///
/// None of these are enforced on construction; accessors return `None` when a
/// field is absent so a partially formed document can still be displayed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct CredentialDocument(Map<String, Value>);

impl CredentialDocument {
    /// Wraps a JSON value, which must be an object.
    pub fn from_value(value: Value) -> PortalResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(PortalError::MalformedResponse(format!(
                "expected a credential object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// The raw `@context` entry, untouched.
    pub fn context(&self) -> Option<&Value> {
        self.0.get("@context")
    }

    /// The raw `type` entry, untouched.
    pub fn type_value(&self) -> Option<&Value> {
        self.0.get("type")
    }

    /// Type names as strings. A bare string `type` counts as a single entry.
    pub fn types(&self) -> Vec<&str> {
        match self.type_value() {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(single)) => vec![single.as_str()],
            _ => Vec::new(),
        }
    }

    pub fn credential_subject(&self) -> Option<&Map<String, Value>> {
        self.0.get("credentialSubject").and_then(Value::as_object)
    }

    /// Identifier of the credential subject (usually a DID).
    pub fn subject_id(&self) -> Option<&str> {
        self.credential_subject()
            .and_then(|subject| subject.get("id"))
            .and_then(Value::as_str)
    }

    /// Names of the claims a holder may choose to disclose, in document
    /// order. The subject `id` is never part of this list.
    pub fn claim_names(&self) -> Vec<&str> {
        self.credential_subject()
            .map(|subject| {
                subject
                    .keys()
                    .map(String::as_str)
                    .filter(|name| *name != "id")
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_claim(&self, name: &str) -> bool {
        name != "id"
            && self
                .credential_subject()
                .map_or(false, |subject| subject.contains_key(name))
    }

    /// The issuer, either a plain identifier or the `id` of an issuer object.
    pub fn issuer(&self) -> Option<&str> {
        match self.0.get("issuer") {
            Some(Value::String(id)) => Some(id),
            Some(Value::Object(issuer)) => issuer.get("id").and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn issuance_date(&self) -> Option<&str> {
        self.0.get("issuanceDate").and_then(Value::as_str)
    }

    pub fn is_presentation(&self) -> bool {
        self.types().contains(&VERIFIABLE_PRESENTATION)
    }

    /// Credentials embedded in a presentation's `verifiableCredential` list.
    pub fn embedded_credentials(&self) -> Vec<CredentialDocument> {
        match self.0.get("verifiableCredential") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_object().cloned().map(CredentialDocument))
                .collect(),
            Some(Value::Object(single)) => vec![CredentialDocument(single.clone())],
            _ => Vec::new(),
        }
    }

    /// Human readable title: the first type that is not the generic
    /// `VerifiableCredential` marker.
    pub fn title(&self) -> String {
        self.types()
            .into_iter()
            .find(|t| *t != VERIFIABLE_CREDENTIAL)
            .unwrap_or("Credential")
            .to_string()
    }
}

/// Storage category the API assigns to a record.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    VC,
    VP,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::VC => "VC",
            Category::VP => "VP",
        }
    }
}

/// A credential or presentation as stored by the portal API.
///
/// Fetched when the holder's dashboard loads and kept in the session cache
/// until logout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CredentialRecord {
    /// Server assigned identifier, unique per record
    pub cred_id: i64,

    /// Older rows carry no category; they are credentials
    #[serde(default, deserialize_with = "category_or_default")]
    pub category: Category,

    /// The document serialized as a JSON string
    pub credential_data: String,

    /// Storage timestamp exactly as the server rendered it
    #[serde(default)]
    pub issued_at: String,
}

fn category_or_default<'de, D>(deserializer: D) -> Result<Category, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Category>::deserialize(deserializer)?.unwrap_or_default())
}

impl CredentialRecord {
    /// Parses the stored document.
    pub fn document(&self) -> PortalResult<CredentialDocument> {
        let value: Value = serde_json::from_str(&self.credential_data).map_err(|e| {
            PortalError::MalformedResponse(format!(
                "credential {} holds invalid JSON: {}",
                self.cred_id, e
            ))
        })?;
        CredentialDocument::from_value(value)
    }

    /// Dashboard card title.
    ///
    /// Presentations are titled after the last specific type of their first
    /// embedded credential.
    pub fn title(&self) -> String {
        let Ok(document) = self.document() else {
            return "Credential".to_string();
        };
        match self.category {
            Category::VC => document.title(),
            Category::VP => document
                .embedded_credentials()
                .first()
                .map(|vc| {
                    vc.types()
                        .into_iter()
                        .filter(|t| *t != VERIFIABLE_CREDENTIAL)
                        .last()
                        .unwrap_or("Credential")
                        .to_string()
                })
                .unwrap_or_else(|| "Verifiable Presentation".to_string()),
        }
    }

    /// Parses `issued_at`, which the API renders either as RFC 3339 or as an
    /// HTTP date (`Tue, 14 Oct 2025 10:00:00 GMT`).
    pub fn issued_at_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.issued_at)
            .or_else(|_| DateTime::parse_from_rfc2822(&self.issued_at))
            .ok()
            .map(|time| time.with_timezone(&Utc))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn diploma() -> Value {
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential", "DiplomaCredential"],
            "issuer": "did:key:z6Mkissuer",
            "issuanceDate": "2025-06-01T00:00:00Z",
            "credentialSubject": {
                "id": "did:x:1",
                "name": "Ann",
                "course": "CS",
                "grade": "A"
            }
        })
    }

    #[test]
    fn test_claim_names_skip_subject_id() {
        let doc = CredentialDocument::from_value(diploma()).unwrap();
        assert_eq!(doc.claim_names(), vec!["name", "course", "grade"]);
        assert_eq!(doc.subject_id(), Some("did:x:1"));
        assert!(doc.has_claim("course"));
        assert!(!doc.has_claim("id"));
        assert!(!doc.has_claim("email"));
    }

    #[test]
    fn test_title_and_issuer() {
        let doc = CredentialDocument::from_value(diploma()).unwrap();
        assert_eq!(doc.title(), "DiplomaCredential");
        assert_eq!(doc.issuer(), Some("did:key:z6Mkissuer"));
        assert_eq!(doc.issuance_date(), Some("2025-06-01T00:00:00Z"));
        assert!(!doc.is_presentation());
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        let err = CredentialDocument::from_value(json!(["not", "a", "credential"])).unwrap_err();
        assert!(matches!(err, PortalError::MalformedResponse(_)));
    }

    #[test]
    fn test_record_without_category_is_a_credential() {
        let record: CredentialRecord = serde_json::from_value(json!({
            "cred_id": 7,
            "category": null,
            "credential_data": diploma().to_string(),
            "issued_at": "Tue, 14 Oct 2025 10:30:00 GMT",
            "holder_id": 3
        }))
        .unwrap();

        assert_eq!(record.category, Category::VC);
        assert_eq!(record.title(), "DiplomaCredential");

        let issued = record.issued_at_time().unwrap();
        assert_eq!((issued.year(), issued.month(), issued.day()), (2025, 10, 14));
        assert_eq!(issued.hour(), 10);
    }

    #[test]
    fn test_presentation_record_title_comes_from_embedded_credential() {
        let vp = json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiablePresentation"],
            "verifiableCredential": [diploma()]
        });
        let record = CredentialRecord {
            cred_id: 9,
            category: Category::VP,
            credential_data: vp.to_string(),
            issued_at: "2025-10-14T10:30:00Z".into(),
        };
        assert_eq!(record.title(), "DiplomaCredential");
        assert!(record.document().unwrap().is_presentation());

        let empty = CredentialRecord {
            credential_data: json!({"type": ["VerifiablePresentation"]}).to_string(),
            ..record
        };
        assert_eq!(empty.title(), "Verifiable Presentation");
    }

    #[test]
    fn test_corrupt_credential_data() {
        let record = CredentialRecord {
            cred_id: 1,
            category: Category::VC,
            credential_data: "{not json".into(),
            issued_at: String::new(),
        };
        assert!(matches!(record.document(), Err(PortalError::MalformedResponse(_))));
        assert_eq!(record.title(), "Credential");
        assert!(record.issued_at_time().is_none());
    }
}
