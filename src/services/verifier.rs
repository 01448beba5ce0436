// src/services/verifier.rs
//! File based credential verification.
//!
//! Reads a credential or presentation from disk and hands it to the portal's
//! verifier endpoint. The cryptographic check happens server side; this
//! module only makes sure the file is a JSON document and reports what kind
//! of document it is.

use crate::error::PortalResult;
use crate::models::credential::{VERIFIABLE_CREDENTIAL, VERIFIABLE_PRESENTATION};
use crate::services::api_client::{PortalClient, VerificationOutcome};
use crate::utils::serialization::parse_json_document;
use log::{info, warn};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

/// What a document claims to be, judged by its `type` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Credential,
    Presentation,
    Unknown,
}

impl DocumentKind {
    pub fn classify(document: &Value) -> Self {
        let has_type = |wanted: &str| match document.get("type") {
            Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted)),
            Some(Value::String(single)) => single == wanted,
            _ => false,
        };
        if has_type(VERIFIABLE_PRESENTATION) {
            DocumentKind::Presentation
        } else if has_type(VERIFIABLE_CREDENTIAL) {
            DocumentKind::Credential
        } else {
            DocumentKind::Unknown
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Credential => "VC",
            DocumentKind::Presentation => "VP",
            DocumentKind::Unknown => "unknown document",
        })
    }
}

/// Outcome of verifying one file.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub kind: DocumentKind,
    pub outcome: VerificationOutcome,
}

/// Loads a JSON document from `path`.
///
/// # Errors
/// - `Io` if the file cannot be read
/// - `MalformedInput` if it is not UTF-8 JSON or not a JSON object
pub fn load_document(path: &Path) -> PortalResult<Value> {
    let bytes = fs::read(path)?;
    parse_json_document(&bytes, &path.display().to_string())
}

/// Verifies uploaded documents through the portal API.
#[derive(Clone)]
pub struct Verifier {
    client: PortalClient,
}

impl Verifier {
    pub fn new(client: PortalClient) -> Self {
        Self { client }
    }

    /// Verifies the credential or presentation stored in `path`.
    ///
    /// # Errors
    /// - `MalformedInput` before any request if the file is not JSON
    /// - `Remote` if the verifier rejects the request (e.g. unknown `type`)
    pub async fn verify_file(&self, path: &Path) -> PortalResult<VerificationReport> {
        let document = load_document(path)?;
        self.verify_document(&document).await
    }

    pub async fn verify_document(&self, document: &Value) -> PortalResult<VerificationReport> {
        let kind = DocumentKind::classify(document);
        if kind == DocumentKind::Unknown {
            warn!("Document declares neither VerifiableCredential nor VerifiablePresentation");
        }
        let outcome = self.client.verify_document(document).await?;
        info!(
            "{} verification {}",
            kind,
            if outcome.verified { "passed" } else { "failed" }
        );
        Ok(VerificationReport { kind, outcome })
    }
}

impl VerificationReport {
    /// One-line summary for display.
    pub fn summary(&self) -> String {
        if self.outcome.verified {
            return format!("{} is valid", self.kind);
        }
        let reason = self
            .outcome
            .message
            .clone()
            .or_else(|| {
                let errors: Vec<String> = self
                    .outcome
                    .errors
                    .iter()
                    .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                    .collect();
                (!errors.is_empty()).then(|| errors.join("; "))
            })
            .unwrap_or_else(|| "no reason given".to_string());
        format!("{} is NOT valid: {}", self.kind, reason)
    }
}
