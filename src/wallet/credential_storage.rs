// src/wallet/credential_storage.rs
//! In-memory credential cache for the current session.
//!
//! Holds the records the holder's credential list returned so screens can be
//! rendered and presentations requested without re-fetching. The cache is
//! replaced on every refresh and discarded on logout.

use crate::models::credential::CredentialRecord;

/// Session cache of stored credentials and presentations.
///
/// Records keep the order the API listed them in (newest first).
#[derive(Debug, Default, Clone)]
pub struct CredentialStorage {
    records: Vec<CredentialRecord>,
}

impl CredentialStorage {
    /// Creates a new empty CredentialStorage instance.
    pub fn new() -> Self {
        CredentialStorage {
            records: Vec::new(),
        }
    }

    /// Replaces the cached list with a fresh one from the API.
    pub fn replace_all(&mut self, records: Vec<CredentialRecord>) {
        self.records = records;
    }

    /// Retrieves a record by its server assigned id.
    ///
    /// # Returns
    /// - `Some(&CredentialRecord)` if found
    /// - `None` if the id is not cached
    pub fn get_credential(&self, cred_id: i64) -> Option<&CredentialRecord> {
        self.records.iter().find(|r| r.cred_id == cred_id)
    }

    /// Returns the number of cached records.
    pub fn count_credentials(&self) -> usize {
        self.records.len()
    }

    /// Records whose title contains `term`, ignoring case. An empty term
    /// matches everything.
    pub fn search(&self, term: &str) -> Vec<&CredentialRecord> {
        let needle = term.trim().to_lowercase();
        self.records
            .iter()
            .filter(|r| needle.is_empty() || r.title().to_lowercase().contains(&needle))
            .collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::Category;
    use serde_json::json;

    fn create_test_record(cred_id: i64, credential_type: &str) -> CredentialRecord {
        CredentialRecord {
            cred_id,
            category: Category::VC,
            credential_data: json!({
                "type": ["VerifiableCredential", credential_type],
                "credentialSubject": {"id": "did:x:1", "name": "Ann"}
            })
            .to_string(),
            issued_at: "2025-10-14T10:30:00Z".into(),
        }
    }

    #[test]
    fn test_get_credential() {
        let mut storage = CredentialStorage::new();

        // Initially should not contain
        assert!(storage.get_credential(12).is_none());

        storage.replace_all(vec![create_test_record(12, "DiplomaCredential")]);
        assert_eq!(storage.get_credential(12).unwrap().title(), "DiplomaCredential");
    }

    #[test]
    fn test_refresh_replaces_previous_list() {
        let mut storage = CredentialStorage::new();
        storage.replace_all(vec![
            create_test_record(1, "DiplomaCredential"),
            create_test_record(2, "CourseCertificate"),
        ]);
        assert_eq!(storage.count_credentials(), 2);

        storage.replace_all(vec![create_test_record(3, "DiplomaCredential")]);
        assert_eq!(storage.count_credentials(), 1);
        assert!(storage.get_credential(1).is_none());
    }

    #[test]
    fn test_search_by_title_ignores_case() {
        let mut storage = CredentialStorage::new();
        storage.replace_all(vec![
            create_test_record(1, "DiplomaCredential"),
            create_test_record(2, "CourseCertificate"),
        ]);

        let hits: Vec<i64> = storage.search("diploma").iter().map(|r| r.cred_id).collect();
        assert_eq!(hits, vec![1]);
        assert_eq!(storage.search("  ").len(), 2);
        assert!(storage.search("transcript").is_empty());
    }

    #[test]
    fn test_get_after_clear() {
        let mut storage = CredentialStorage::new();
        storage.replace_all(vec![create_test_record(4, "DiplomaCredential")]);
        storage.clear();

        assert!(storage.get_credential(4).is_none());
        assert_eq!(storage.count_credentials(), 0);
    }
}
