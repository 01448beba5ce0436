// src/services/api_client.rs
//! HTTP client for the credential portal API.
//!
//! The portal signs, verifies and stores every credential; this client only
//! sends JSON requests to it and maps the answers onto typed results:
//! - login / current account (`me`) / holder registration
//! - listing stored credentials and importing new ones
//! - issuing credentials and reading the issuer dashboard
//! - requesting selectively disclosed presentations
//! - verifying documents
//!
//! Authenticated calls read the bearer token from the [`SessionContext`]
//! and fail with `Authentication` before any network I/O when none is stored.
//! A 401 or 403 answer ends the session.

use crate::config::Settings;
use crate::error::{PortalError, PortalResult};
use crate::models::credential::{CredentialDocument, CredentialRecord};
use crate::models::presentation::{DisclosureFrame, Presentation};
use crate::models::user::User;
use crate::wallet::session::SessionContext;
use log::{debug, warn};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

// API request and response structures

/// Request payload for logging in
#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Response of a successful login
#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

/// Request payload for registering a new account
#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    role: &'a str,
}

/// Plain acknowledgement returned by registration and upload
#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Request payload for deriving a presentation from a stored credential
#[derive(Serialize)]
struct CreatePresentationRequest<'a> {
    cred_id: i64,
    disclosure_frame: &'a DisclosureFrame,
}

/// Request payload for issuing a diploma credential
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssueCredentialRequest {
    pub name: String,
    pub holder_email: String,
    pub course: String,
    pub grade: String,
    /// `YYYY-MM-DD`
    #[serde(rename = "completionDate")]
    pub completion_date: String,
}

/// Counters shown on the issuer dashboard
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    #[serde(default)]
    pub credentials_issued: u64,
    #[serde(default)]
    pub active_students: u64,
    #[serde(default)]
    pub revoked_credentials: u64,
}

/// Response of the issuer dashboard endpoint
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardData {
    pub stats: DashboardStats,
    #[serde(default)]
    pub recent_activity: Vec<String>,
}

/// Result of verifying a credential or presentation
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub verified: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<Value>,
}

/// Generations of endpoint paths the portal API has exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteLayout {
    /// Role scoped paths (`/holder/...`, `/issuer/...`, `/verifier/...`)
    #[default]
    Scoped,
    /// Older unscoped paths for the holder's list and presentation calls
    Flat,
}

/// Endpoint paths, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    pub login: String,
    pub me: String,
    pub register: String,
    pub list_credentials: String,
    pub create_presentation: String,
    pub upload: String,
    pub issue_credential: String,
    pub dashboard: String,
    pub verify: String,
}

impl Routes {
    pub fn for_layout(layout: RouteLayout) -> Self {
        let (list_credentials, create_presentation) = match layout {
            RouteLayout::Scoped => ("/holder/list_credentials", "/holder/create_presentation"),
            RouteLayout::Flat => ("/list_credentials", "/create_presentation"),
        };
        Routes {
            login: "/login".into(),
            me: "/me".into(),
            register: "/register".into(),
            list_credentials: list_credentials.into(),
            create_presentation: create_presentation.into(),
            upload: "/holder/upload".into(),
            issue_credential: "/issuer/issue_vc".into(),
            dashboard: "/issuer/dashboard_data".into(),
            verify: "/verifier/verify".into(),
        }
    }
}

/// Client for the portal API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
    routes: Routes,
}

impl PortalClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - e.g. `http://localhost:5001/api`; a trailing `/` is ignored
    /// * `layout` - endpoint path generation the server speaks
    /// * `timeout` - optional per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        layout: RouteLayout,
        timeout: Option<Duration>,
    ) -> PortalResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!("Creating portal client for {} ({:?} routes)", base_url, layout);
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
            routes: Routes::for_layout(layout),
        })
    }

    pub fn from_settings(settings: &Settings) -> PortalResult<Self> {
        Self::new(
            settings.api_base_url.clone(),
            settings.route_layout,
            settings.request_timeout(),
        )
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    // =====================
    // Session
    // =====================

    /// Logs in and starts `session` with the returned token and account.
    ///
    /// # Errors
    /// - `Remote` with the server's message on bad credentials
    /// - `MalformedResponse` if the answer carries no token or no account
    pub async fn login(
        &self,
        session: &SessionContext,
        email: &str,
        password: &str,
    ) -> PortalResult<User> {
        let request = self
            .http
            .post(self.url(&self.routes.login))
            .json(&LoginRequest { email, password });
        let response: LoginResponse = self.execute(request, None, "Login failed").await?;

        let token = response.token.filter(|t| !t.is_empty()).ok_or_else(|| {
            PortalError::MalformedResponse("login response did not include a token".into())
        })?;
        let user = response.user.ok_or_else(|| {
            PortalError::MalformedResponse("login response did not include the account".into())
        })?;
        session.begin(&token, user.clone())?;
        Ok(user)
    }

    /// Fetches the account the stored token belongs to.
    pub async fn current_user(&self, session: &SessionContext) -> PortalResult<User> {
        let request = self.authorized(session, self.http.get(self.url(&self.routes.me)))?;
        let user: User = self
            .execute(request, Some(session), "Failed to load the current user")
            .await?;
        session.set_user(user.clone());
        Ok(user)
    }

    /// Resumes a session from a stored token.
    ///
    /// # Returns
    /// - `Ok(Some(user))` if the stored token is still accepted
    /// - `Ok(None)` if no token is stored or the server rejected it (the
    ///   token is removed in that case)
    pub async fn restore(&self, session: &SessionContext) -> PortalResult<Option<User>> {
        if session.token()?.is_none() {
            return Ok(None);
        }
        match self.current_user(session).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.requires_login() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // =====================
    // Holder
    // =====================

    /// Lists the holder's stored credentials and presentations and refreshes
    /// the session cache with them.
    pub async fn list_credentials(
        &self,
        session: &SessionContext,
    ) -> PortalResult<Vec<CredentialRecord>> {
        let request = self.authorized(
            session,
            self.http.get(self.url(&self.routes.list_credentials)),
        )?;
        let records: Vec<CredentialRecord> = self
            .execute(request, Some(session), "Failed to fetch credentials")
            .await?;
        debug!("Fetched {} stored documents", records.len());
        session.cache_credentials(records.clone());
        Ok(records)
    }

    /// Asks the API to derive a presentation of credential `cred_id` that
    /// reveals what `frame` selects.
    ///
    /// # Returns
    /// The presentation exactly as the server produced it
    ///
    /// # Errors
    /// - `Authentication` if no token is stored (nothing is sent)
    /// - `Remote` carrying the server's message on a non-success status
    /// - `MalformedResponse` if the body is not JSON
    pub async fn create_presentation(
        &self,
        session: &SessionContext,
        cred_id: i64,
        frame: &DisclosureFrame,
    ) -> PortalResult<Presentation> {
        let request = self.authorized(
            session,
            self.http
                .post(self.url(&self.routes.create_presentation))
                .json(&CreatePresentationRequest {
                    cred_id,
                    disclosure_frame: frame,
                }),
        )?;
        self.execute(
            request,
            Some(session),
            "Server failed to generate the presentation.",
        )
        .await
    }

    /// Imports an existing credential or presentation into the holder's
    /// store.
    ///
    /// # Returns
    /// The server's confirmation message
    pub async fn upload_document(
        &self,
        session: &SessionContext,
        document: &Value,
    ) -> PortalResult<String> {
        let request = self.authorized(
            session,
            self.http.post(self.url(&self.routes.upload)).json(document),
        )?;
        let response: MessageResponse = self
            .execute(request, Some(session), "Failed to upload the document.")
            .await?;
        Ok(response
            .message
            .unwrap_or_else(|| "Document imported.".to_string()))
    }

    // =====================
    // Issuer
    // =====================

    /// Issues a credential; the server signs it and returns the document.
    pub async fn issue_credential(
        &self,
        session: &SessionContext,
        request: &IssueCredentialRequest,
    ) -> PortalResult<CredentialDocument> {
        let request = self.authorized(
            session,
            self.http
                .post(self.url(&self.routes.issue_credential))
                .json(request),
        )?;
        let document: Value = self
            .execute(request, Some(session), "An unknown error occurred.")
            .await?;
        CredentialDocument::from_value(document)
    }

    pub async fn dashboard(&self, session: &SessionContext) -> PortalResult<DashboardData> {
        let request = self.authorized(session, self.http.get(self.url(&self.routes.dashboard)))?;
        self.execute(request, Some(session), "Failed to load dashboard data.")
            .await
    }

    /// Creates a holder account. Only issuers may do this.
    ///
    /// # Returns
    /// The server's confirmation message
    pub async fn register_holder(
        &self,
        session: &SessionContext,
        email: &str,
        password: &str,
    ) -> PortalResult<String> {
        let request = self.authorized(
            session,
            self.http
                .post(self.url(&self.routes.register))
                .json(&RegisterRequest {
                    email,
                    password,
                    role: "holder",
                }),
        )?;
        let response: MessageResponse = self
            .execute(request, Some(session), "An unknown error occurred.")
            .await?;
        Ok(response
            .message
            .unwrap_or_else(|| "Holder registered successfully!".to_string()))
    }

    // =====================
    // Verifier
    // =====================

    /// Sends a document to the verifier endpoint as is. Needs no session.
    pub async fn verify_document(&self, document: &Value) -> PortalResult<VerificationOutcome> {
        let request = self.http.post(self.url(&self.routes.verify)).json(document);
        self.execute(request, None, "Verification failed or file is invalid.")
            .await
    }

    // =====================
    // Transport
    // =====================

    /// Attaches the session's bearer token.
    fn authorized(
        &self,
        session: &SessionContext,
        request: RequestBuilder,
    ) -> PortalResult<RequestBuilder> {
        let token = session.require_token()?;
        Ok(request.bearer_auth(token))
    }

    /// Sends `request` and decodes a success body into `T`.
    ///
    /// With a `session`, a 401 ends it and turns into `Authentication`; a 403
    /// ends it as well but keeps the server's message as `Remote`. Other failures become `Remote` with the server's `error` or `message`
    /// field, or `fallback` when the body has neither.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        session: Option<&SessionContext>,
        fallback: &str,
    ) -> PortalResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| fallback.to_string());
            warn!("{} answered {}: {}", url, status, message);
            if let Some(session) = session {
                if status == StatusCode::UNAUTHORIZED {
                    session.end()?;
                    return Err(PortalError::Authentication(message));
                }
                if status == StatusCode::FORBIDDEN {
                    session.end()?;
                }
            }
            return Err(PortalError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        debug!("{} answered {}", url, status);
        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            PortalError::MalformedResponse(format!("{} returned invalid JSON: {}", url, e))
        })?;
        serde_json::from_value(value).map_err(|e| {
            PortalError::MalformedResponse(format!("unexpected response from {}: {}", url, e))
        })
    }
}

/// The server's explanation for a failed request, if the body carries one.
fn error_message(body: &[u8]) -> Option<String> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|field| payload.get(*field).and_then(Value::as_str))
        .find(|message| !message.is_empty())
        .map(str::to_string)
}
