// src/services/credential_issuer.rs
//! Issuer side of the portal: issuing diploma credentials, registering
//! holders and reading the dashboard counters.
//!
//! Issuance requests are checked locally with the same rules the portal
//! applies, so an obviously incomplete form never leaves the machine.

use crate::error::{PortalError, PortalResult};
use crate::models::credential::CredentialDocument;
use crate::services::api_client::{DashboardData, IssueCredentialRequest, PortalClient};
use crate::storage::downloads::DownloadDir;
use crate::wallet::session::SessionContext;
use chrono::{NaiveDate, Utc};
use log::info;
use std::path::PathBuf;

/// Field names as the portal reports them when one is missing.
const REQUIRED_FIELDS: [&str; 5] = ["holder_email", "name", "course", "grade", "completionDate"];

impl IssueCredentialRequest {
    /// The same form with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        IssueCredentialRequest {
            name: self.name.trim().to_string(),
            holder_email: self.holder_email.trim().to_string(),
            course: self.course.trim().to_string(),
            grade: self.grade.trim().to_string(),
            completion_date: self.completion_date.trim().to_string(),
        }
    }

    /// Checks the form against `today`.
    ///
    /// # Errors
    /// `InvalidForm` if a field is blank, the date is not `YYYY-MM-DD`, or the
    /// date lies after `today`.
    pub fn validate_on(&self, today: NaiveDate) -> PortalResult<()> {
        let fields = [
            &self.holder_email,
            &self.name,
            &self.course,
            &self.grade,
            &self.completion_date,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(PortalError::InvalidForm(format!(
                "Missing required fields. Required: {}",
                REQUIRED_FIELDS.join(", ")
            )));
        }

        let completed = NaiveDate::parse_from_str(self.completion_date.trim(), "%Y-%m-%d")
            .map_err(|_| {
                PortalError::InvalidForm(
                    "Invalid date format for completionDate. Use YYYY-MM-DD.".to_string(),
                )
            })?;
        if completed > today {
            return Err(PortalError::InvalidForm(
                "Completion date cannot be in the future.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Issuer operations on top of the portal client.
#[derive(Clone)]
pub struct CredentialIssuer {
    client: PortalClient,
    session: SessionContext,
}

impl CredentialIssuer {
    pub fn new(client: PortalClient, session: SessionContext) -> Self {
        Self { client, session }
    }

    /// Issues a credential and optionally saves it as
    /// `verifiable-credential.json` in `save_to`. Fields are sent trimmed.
    ///
    /// # Returns
    /// The signed credential and, when saved, the file it went to
    pub async fn issue(
        &self,
        request: &IssueCredentialRequest,
        save_to: Option<&DownloadDir>,
    ) -> PortalResult<(CredentialDocument, Option<PathBuf>)> {
        let request = request.trimmed();
        request.validate_on(Utc::now().date_naive())?;

        let document = self.client.issue_credential(&self.session, &request).await?;
        info!(
            "Issued '{}' credential to {}",
            request.course, request.holder_email
        );

        let saved = match save_to {
            Some(dir) => Some(dir.save_issued(&document)?),
            None => None,
        };
        Ok((document, saved))
    }

    pub async fn dashboard(&self) -> PortalResult<DashboardData> {
        self.client.dashboard(&self.session).await
    }

    /// Creates a holder account and returns the portal's confirmation.
    pub async fn register_holder(&self, email: &str, password: &str) -> PortalResult<String> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(PortalError::InvalidForm(
                "Email and password are required".to_string(),
            ));
        }
        self.client
            .register_holder(&self.session, email.trim(), password)
            .await
    }
}
