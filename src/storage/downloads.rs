// src/storage/downloads.rs
//! Local file delivery for documents the user downloads.
//!
//! Every file is UTF-8 JSON, pretty printed with a two-space indent.
//! Presentations and stored records use the `.jsonld` extension, a freshly
//! issued credential is saved as plain `.json`.

use crate::error::PortalResult;
use crate::models::credential::{CredentialDocument, CredentialRecord};
use crate::models::presentation::Presentation;
use crate::utils::serialization::serialize_pretty;
use chrono::Utc;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// File name an issuer's download of a new credential gets.
pub const ISSUED_CREDENTIAL_FILE: &str = "verifiable-credential.json";

/// `presentation-<cred_id>-<epoch_millis>.jsonld`
pub fn presentation_file_name(cred_id: i64, epoch_millis: i64) -> String {
    format!("presentation-{}-{}.jsonld", cred_id, epoch_millis)
}

/// `<category>-<cred_id>.jsonld`, category in lower case.
pub fn record_file_name(record: &CredentialRecord) -> String {
    format!(
        "{}-{}.jsonld",
        record.category.as_str().to_lowercase(),
        record.cred_id
    )
}

/// Directory downloaded documents are written to.
#[derive(Debug, Clone)]
pub struct DownloadDir {
    root: PathBuf,
}

impl DownloadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DownloadDir { root: root.into() }
    }

    /// Offers a presentation to the user as
    /// `presentation-<cred_id>-<now in epoch millis>.jsonld`.
    ///
    /// # Returns
    /// Path of the written file
    pub fn deliver_presentation(
        &self,
        presentation: &Presentation,
        cred_id: i64,
    ) -> PortalResult<PathBuf> {
        let name = presentation_file_name(cred_id, Utc::now().timestamp_millis());
        self.write(&name, presentation.as_value())
    }

    /// Saves a stored record's document (the dashboard download button).
    pub fn save_record(&self, record: &CredentialRecord) -> PortalResult<PathBuf> {
        let document = record.document()?;
        self.write(&record_file_name(record), &document)
    }

    /// Saves a credential the issuer just created.
    pub fn save_issued(&self, document: &CredentialDocument) -> PortalResult<PathBuf> {
        self.write(ISSUED_CREDENTIAL_FILE, document)
    }

    fn write<T: Serialize + ?Sized>(&self, name: &str, document: &T) -> PortalResult<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(name);
        fs::write(&path, serialize_pretty(document)?)?;
        info!("Saved {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::Category;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn is_presentation_file_name(name: &str, cred_id: i64) -> bool {
        let prefix = format!("presentation-{}-", cred_id);
        name.strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".jsonld"))
            .map_or(false, |millis| {
                !millis.is_empty() && millis.chars().all(|c| c.is_ascii_digit())
            })
    }

    #[test]
    fn test_presentation_file_matches_naming_convention() {
        let dir = tempdir().unwrap();
        let downloads = DownloadDir::new(dir.path());
        let presentation = Presentation(json!({
            "type": ["VerifiablePresentation"],
            "verifiableCredential": [{"credentialSubject": {"id": "did:x:1", "name": "Ann"}}]
        }));

        let path = downloads.deliver_presentation(&presentation, 42).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(is_presentation_file_name(name, 42), "unexpected name {}", name);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \""));
        let written: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(&written, presentation.as_value());
    }

    #[test]
    fn test_record_download_uses_category_prefix() {
        let dir = tempdir().unwrap();
        let downloads = DownloadDir::new(dir.path().join("out"));
        let record = CredentialRecord {
            cred_id: 5,
            category: Category::VP,
            credential_data: r#"{"type":["VerifiablePresentation"]}"#.into(),
            issued_at: String::new(),
        };

        let path = downloads.save_record(&record).unwrap();
        assert_eq!(path.file_name().unwrap(), "vp-5.jsonld");
        let written: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, json!({"type": ["VerifiablePresentation"]}));
    }

    #[test]
    fn test_issued_credential_file() {
        let dir = tempdir().unwrap();
        let downloads = DownloadDir::new(dir.path());
        let doc = CredentialDocument::from_value(json!({"type": ["VerifiableCredential"]})).unwrap();
        let path = downloads.save_issued(&doc).unwrap();
        assert_eq!(path.file_name().unwrap(), ISSUED_CREDENTIAL_FILE);
    }

    #[test]
    fn test_file_name_helpers() {
        assert_eq!(presentation_file_name(3, 1700000000000), "presentation-3-1700000000000.jsonld");
        assert!(!is_presentation_file_name("presentation-3-.jsonld", 3));
    }
}
