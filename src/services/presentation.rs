// src/services/presentation.rs
//! Presentation request flow.
//!
//! Drives one credential at a time through
//! `Idle -> ClaimsSelected -> Submitting -> Delivered | Failed`:
//! the holder picks claims, the disclosure frame is built and sent to the
//! presentation endpoint, and the signed presentation is written out as a
//! download. A failed attempt keeps its selection so it can be submitted
//! again; nothing is retried automatically.
//!
//! At most one request per credential is in flight. Selecting or submitting
//! while a request is outstanding fails with `SubmissionInProgress`.

use crate::error::{PortalError, PortalResult};
use crate::models::presentation::SelectedClaimSet;
use crate::services::api_client::PortalClient;
use crate::services::disclosure::{build_disclosure_frame, DisclosurePolicy};
use crate::storage::downloads::DownloadDir;
use crate::utils::serialization::serialize;
use crate::wallet::session::SessionContext;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Where a credential's presentation request stands.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PresentationState {
    #[default]
    Idle,
    ClaimsSelected { claims: SelectedClaimSet },
    Submitting,
    Delivered { path: PathBuf },
    Failed { claims: SelectedClaimSet, message: String },
}

/// Presentation requests for the credentials of one session.
pub struct PresentationFlow {
    client: PortalClient,
    session: SessionContext,
    downloads: DownloadDir,
    policy: DisclosurePolicy,
    states: Mutex<HashMap<i64, PresentationState>>,
}

impl PresentationFlow {
    pub fn new(
        client: PortalClient,
        session: SessionContext,
        downloads: DownloadDir,
        policy: DisclosurePolicy,
    ) -> Self {
        PresentationFlow {
            client,
            session,
            downloads,
            policy,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self, cred_id: i64) -> PresentationState {
        self.lock_states()
            .get(&cred_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Records which claims of cached credential `cred_id` to reveal.
    ///
    /// `id` is always revealed and is skipped if named.
    ///
    /// # Errors
    /// - `SubmissionInProgress` while a request for the credential is out
    /// - `CredentialNotFound` if the credential is not in the session cache
    /// - `UnknownClaim` for a name the credential subject does not have
    pub fn select_claims<I, S>(&self, cred_id: i64, names: I) -> PortalResult<SelectedClaimSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut states = self.lock_states();
        if states.get(&cred_id) == Some(&PresentationState::Submitting) {
            return Err(PortalError::SubmissionInProgress(cred_id));
        }

        let document = self
            .session
            .credential(cred_id)
            .ok_or(PortalError::CredentialNotFound(cred_id))?
            .document()?;

        let mut claims = SelectedClaimSet::new();
        for name in names {
            let name = name.as_ref();
            if name == "id" {
                continue;
            }
            if !document.has_claim(name) {
                return Err(PortalError::UnknownClaim(name.to_string()));
            }
            claims.insert(name);
        }
        if claims.is_empty() {
            debug!("Selection for credential {} reveals only the subject id", cred_id);
        }

        states.insert(
            cred_id,
            PresentationState::ClaimsSelected {
                claims: claims.clone(),
            },
        );
        Ok(claims)
    }

    /// Requests and downloads a presentation for the current selection.
    ///
    /// Accepted from `ClaimsSelected`, and from `Failed` to resubmit the
    /// previous selection.
    ///
    /// # Returns
    /// Path of the downloaded presentation
    pub async fn submit(&self, cred_id: i64) -> PortalResult<PathBuf> {
        let claims = {
            let mut states = self.lock_states();
            let claims = match states.get(&cred_id) {
                Some(PresentationState::ClaimsSelected { claims })
                | Some(PresentationState::Failed { claims, .. }) => claims.clone(),
                Some(PresentationState::Submitting) => {
                    return Err(PortalError::SubmissionInProgress(cred_id))
                }
                _ => return Err(PortalError::NothingSelected(cred_id)),
            };
            self.policy.check(&claims)?;
            states.insert(cred_id, PresentationState::Submitting);
            claims
        };

        let mut guard = SubmissionGuard {
            flow: self,
            cred_id,
            claims: Some(claims.clone()),
        };
        let result = self.request_and_deliver(cred_id, &claims).await;
        let next = match &result {
            Ok(path) => PresentationState::Delivered { path: path.clone() },
            Err(e) => {
                warn!("Presentation for credential {} failed: {}", cred_id, e);
                PresentationState::Failed {
                    claims,
                    message: e.to_string(),
                }
            }
        };
        guard.claims = None;
        self.lock_states().insert(cred_id, next);
        result
    }

    /// Selects `names` and submits right away.
    pub async fn generate<I, S>(&self, cred_id: i64, names: I) -> PortalResult<PathBuf>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select_claims(cred_id, names)?;
        self.submit(cred_id).await
    }

    async fn request_and_deliver(
        &self,
        cred_id: i64,
        claims: &SelectedClaimSet,
    ) -> PortalResult<PathBuf> {
        let document = self
            .session
            .credential(cred_id)
            .ok_or(PortalError::CredentialNotFound(cred_id))?
            .document()?;
        let frame = build_disclosure_frame(&document, claims);
        debug!("Disclosure frame for credential {}: {}", cred_id, serialize(&frame)?);

        let presentation = self
            .client
            .create_presentation(&self.session, cred_id, &frame)
            .await?;
        let path = self.downloads.deliver_presentation(&presentation, cred_id)?;
        info!(
            "Presentation of credential {} revealing {:?} saved to {}",
            cred_id,
            frame.credential_subject.property_names(),
            path.display()
        );
        Ok(path)
    }

    fn lock_states(&self) -> std::sync::MutexGuard<'_, HashMap<i64, PresentationState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a submission as failed if its future is dropped before finishing.
struct SubmissionGuard<'a> {
    flow: &'a PresentationFlow,
    cred_id: i64,
    /// Still set while the submission is outstanding
    claims: Option<SelectedClaimSet>,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        if let Some(claims) = self.claims.take() {
            debug!("Presentation request for credential {} abandoned", self.cred_id);
            self.flow.lock_states().insert(
                self.cred_id,
                PresentationState::Failed {
                    claims,
                    message: "request abandoned".to_string(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::{Category, CredentialRecord};
    use crate::services::api_client::RouteLayout;
    use crate::storage::session_store::{MemorySessionStore, SessionStore, TOKEN_KEY};
    use mockito::{mock, Matcher};
    use serde_json::{json, Value};
    use std::fs;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::Poll;
    use tempfile::{tempdir, TempDir};
    use tokio_test::assert_err;

    fn diploma_record(cred_id: i64) -> CredentialRecord {
        CredentialRecord {
            cred_id,
            category: Category::VC,
            credential_data: json!({
                "@context": ["https://www.w3.org/2018/credentials/v1"],
                "type": ["VerifiableCredential", "DiplomaCredential"],
                "credentialSubject": {"id": "did:x:1", "name": "Ann", "course": "CS"}
            })
            .to_string(),
            issued_at: "2025-10-14T10:30:00Z".into(),
        }
    }

    /// A logged-in flow whose API lives under `/<prefix>` on the mock server.
    fn flow(prefix: &str, minimum_claims: usize) -> (PresentationFlow, TempDir) {
        let store = Arc::new(MemorySessionStore::new());
        store.set(TOKEN_KEY, "tok").unwrap();
        let session = SessionContext::new(store);
        session.cache_credentials(vec![diploma_record(7), diploma_record(8)]);

        let client = PortalClient::new(
            format!("{}/{}", mockito::server_url(), prefix),
            RouteLayout::Scoped,
            None,
        )
        .unwrap();
        let dir = tempdir().unwrap();
        let flow = PresentationFlow::new(
            client,
            session,
            DownloadDir::new(dir.path()),
            DisclosurePolicy::new(minimum_claims),
        );
        (flow, dir)
    }

    fn presentation_body() -> Value {
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiablePresentation"],
            "verifiableCredential": [{
                "type": ["VerifiableCredential", "DiplomaCredential"],
                "credentialSubject": {"id": "did:x:1", "name": "Ann"}
            }]
        })
    }

    #[tokio::test]
    async fn test_generate_delivers_presentation_file() {
        let endpoint = mock("POST", "/flow-ok/holder/create_presentation")
            .match_body(Matcher::PartialJson(json!({
                "cred_id": 7,
                "disclosure_frame": {"credentialSubject": {"@explicit": true, "id": {}, "name": {}}}
            })))
            .with_status(200)
            .with_body(presentation_body().to_string())
            .create();
        let (flow, _dir) = flow("flow-ok", 1);

        let path = flow.generate(7, ["name"]).await.unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        let millis = name
            .strip_prefix("presentation-7-")
            .and_then(|rest| rest.strip_suffix(".jsonld"))
            .unwrap();
        assert!(!millis.is_empty() && millis.chars().all(|c| c.is_ascii_digit()));

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, presentation_body());
        assert_eq!(flow.state(7), PresentationState::Delivered { path });
        endpoint.assert();
    }

    #[tokio::test]
    async fn test_policy_blocks_empty_selection_before_any_request() {
        let endpoint = mock("POST", "/flow-empty/holder/create_presentation")
            .expect(0)
            .create();
        let (flow, _dir) = flow("flow-empty", 1);

        let err = flow.generate(7, Vec::<String>::new()).await.unwrap_err();

        assert!(matches!(err, PortalError::InsufficientClaims { required: 1, selected: 0 }));
        assert_eq!(
            flow.state(7),
            PresentationState::ClaimsSelected { claims: SelectedClaimSet::new() }
        );
        endpoint.assert();
    }

    #[tokio::test]
    async fn test_zero_minimum_allows_id_only_presentation() {
        let _m = mock("POST", "/flow-id-only/holder/create_presentation")
            .match_body(Matcher::PartialJson(json!({
                "disclosure_frame": {"credentialSubject": {"@explicit": true, "id": {}}}
            })))
            .with_status(200)
            .with_body(presentation_body().to_string())
            .create();
        let (flow, _dir) = flow("flow-id-only", 0);

        assert!(flow.generate(7, ["id"]).await.is_ok());
    }

    #[test]
    fn test_selection_is_checked_against_the_credential() {
        let (flow, _dir) = flow("flow-select", 1);

        let claims = flow.select_claims(7, ["id", "course", "name"]).unwrap();
        assert_eq!(claims.iter().collect::<Vec<_>>(), vec!["course", "name"]);

        assert!(matches!(
            flow.select_claims(7, ["email"]),
            Err(PortalError::UnknownClaim(name)) if name == "email"
        ));
        assert!(matches!(
            flow.select_claims(99, ["name"]),
            Err(PortalError::CredentialNotFound(99))
        ));
        assert_eq!(flow.state(99), PresentationState::Idle);
    }

    #[tokio::test]
    async fn test_submit_without_selection() {
        let (flow, _dir) = flow("flow-nothing", 1);
        let result = flow.submit(8).await;
        assert_err!(&result);
        assert!(matches!(result, Err(PortalError::NothingSelected(8))));
    }

    #[tokio::test]
    async fn test_second_click_while_submitting_is_rejected() {
        let endpoint = mock("POST", "/flow-reentrant/holder/create_presentation")
            .with_status(200)
            .with_body(presentation_body().to_string())
            .expect(1)
            .create();
        let (flow, _dir) = flow("flow-reentrant", 1);

        let (first, second) = tokio::join!(flow.generate(8, ["name"]), flow.generate(8, ["course"]));

        assert!(first.is_ok());
        assert!(matches!(second, Err(PortalError::SubmissionInProgress(8))));
        endpoint.assert();
    }

    #[tokio::test]
    async fn test_failed_attempt_can_be_resubmitted() {
        let failing = mock("POST", "/flow-retry/holder/create_presentation")
            .with_status(500)
            .with_body(r#"{"error":"Could not create presentation: key missing"}"#)
            .create();
        let (flow, _dir) = flow("flow-retry", 1);

        let err = flow.generate(7, ["course"]).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not create presentation: key missing");
        let course_only: SelectedClaimSet = ["course"].into_iter().collect();
        assert_eq!(
            flow.state(7),
            PresentationState::Failed {
                claims: course_only,
                message: "Could not create presentation: key missing".into()
            }
        );
        drop(failing);

        let _ok = mock("POST", "/flow-retry/holder/create_presentation")
            .with_status(200)
            .with_body(presentation_body().to_string())
            .create();
        let path = flow.submit(7).await.unwrap();
        assert!(path.exists());
        assert!(matches!(flow.state(7), PresentationState::Delivered { .. }));
    }

    #[tokio::test]
    async fn test_abandoned_submission_is_marked_failed() {
        let _m = mock("POST", "/flow-abandon/holder/create_presentation")
            .with_status(200)
            .with_body(presentation_body().to_string())
            .create();
        let (flow, _dir) = flow("flow-abandon", 1);
        flow.select_claims(7, ["name"]).unwrap();

        {
            let mut submission = Box::pin(flow.submit(7));
            // Poll once so the request is outstanding, then walk away.
            assert!(poll_once(submission.as_mut()).await.is_none());
            assert_eq!(flow.state(7), PresentationState::Submitting);
        }

        match flow.state(7) {
            PresentationState::Failed { message, .. } => assert_eq!(message, "request abandoned"),
            other => panic!("unexpected state {:?}", other),
        }
    }

    async fn poll_once<F: Future + Unpin>(mut future: F) -> Option<F::Output> {
        std::future::poll_fn(|cx| match Pin::new(&mut future).poll(cx) {
            Poll::Ready(output) => Poll::Ready(Some(output)),
            Poll::Pending => Poll::Ready(None),
        })
        .await
    }
}
