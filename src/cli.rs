// src/cli.rs
//! Command line surface.
//!
//! Every invocation restores the session from the session file, runs one
//! command and exits. Holder commands that address a credential by id
//! refresh the credential list first so the local cache matches the server.

use crate::config::Settings;
use crate::error::{PortalError, PortalResult};
use crate::models::credential::CredentialRecord;
use crate::services::api_client::{IssueCredentialRequest, PortalClient};
use crate::services::credential_issuer::CredentialIssuer;
use crate::services::disclosure::DisclosurePolicy;
use crate::services::presentation::PresentationFlow;
use crate::services::verifier::{load_document, Verifier};
use crate::storage::downloads::DownloadDir;
use crate::wallet::session::SessionContext;
use clap::{Parser, Subcommand};
use log::debug;
use std::path::PathBuf;

/// Client for the verifiable credential portal
#[derive(Debug, Parser)]
#[command(name = "vc-portal", version, arg_required_else_help = true)]
pub struct Cli {
    /// Settings file (defaults to ./vc-portal.toml when present)
    #[arg(long, global = true, env = "VC_PORTAL_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session token
    Login {
        email: String,
        #[arg(long, env = "VC_PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the account of the stored session
    Whoami,
    /// List stored credentials and presentations
    List {
        /// Only show documents whose title contains this text
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Show the claims a credential can disclose
    Claims { cred_id: i64 },
    /// Request a presentation revealing only the chosen claims
    Present {
        cred_id: i64,
        /// Claim to reveal; repeat for several
        #[arg(long = "claim", short = 'c')]
        claims: Vec<String>,
    },
    /// Save a stored document as `<category>-<id>.jsonld`
    Download { cred_id: i64 },
    /// Verify a credential or presentation file
    Verify { path: PathBuf },
    /// Import a credential or presentation file into the wallet
    Upload { path: PathBuf },
    /// Issue a diploma credential (issuers only)
    Issue {
        #[arg(long)]
        name: String,
        #[arg(long)]
        holder_email: String,
        #[arg(long)]
        course: String,
        #[arg(long)]
        grade: String,
        /// YYYY-MM-DD
        #[arg(long)]
        completion_date: String,
        /// Also write the credential to verifiable-credential.json
        #[arg(long)]
        save: bool,
    },
    /// Register a holder account (issuers only)
    Register {
        email: String,
        #[arg(long, env = "VC_PORTAL_HOLDER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the issuer dashboard
    Dashboard,
}

/// Everything a command needs.
pub struct App {
    pub settings: Settings,
    pub client: PortalClient,
    pub session: SessionContext,
}

impl App {
    fn downloads(&self) -> DownloadDir {
        DownloadDir::new(&self.settings.download_dir)
    }

    /// Refreshes the credential cache and returns record `cred_id`.
    async fn fetch_record(&self, cred_id: i64) -> PortalResult<CredentialRecord> {
        self.client.list_credentials(&self.session).await?;
        self.session
            .credential(cred_id)
            .ok_or(PortalError::CredentialNotFound(cred_id))
    }
}

impl Command {
    pub async fn run(self, app: &App) -> PortalResult<()> {
        match self {
            Command::Login { email, password } => {
                let user = app.client.login(&app.session, &email, &password).await?;
                println!("Logged in as {} ({})", user.email, user.role);
                if user.is_issuer() {
                    println!("Issuer commands: issue, register, dashboard");
                }
            }
            Command::Logout => {
                app.session.end()?;
                println!("Logged out");
            }
            Command::Whoami => {
                let remembered = app.session.stored_email()?;
                app.client.restore(&app.session).await?;
                match (app.session.user(), remembered) {
                    (Some(user), _) => println!("{} ({})", user.email, user.role),
                    (None, Some(email)) => println!("Session of {} has expired", email),
                    (None, None) => println!("Not logged in"),
                }
            }
            Command::List { search } => {
                let records = app.client.list_credentials(&app.session).await?;
                let records = match search {
                    Some(term) => {
                        let found = app.session.search_credentials(&term);
                        println!(
                            "{} of {} documents match '{}'",
                            found.len(),
                            app.session.credential_count(),
                            term
                        );
                        found
                    }
                    None => records,
                };
                if records.is_empty() {
                    println!("No credentials found");
                }
                for record in &records {
                    print_record(record);
                }
            }
            Command::Claims { cred_id } => {
                let document = app.fetch_record(cred_id).await?.document()?;
                if document.is_presentation() {
                    println!(
                        "Document {} is a presentation; only credentials can be disclosed selectively",
                        cred_id
                    );
                    return Ok(());
                }
                println!("Subject: {}", document.subject_id().unwrap_or("-"));
                println!("Issuer:  {}", document.issuer().unwrap_or("-"));
                println!("Issued:  {}", document.issuance_date().unwrap_or("-"));
                for name in document.claim_names() {
                    println!("  {}", name);
                }
            }
            Command::Present { cred_id, claims } => {
                app.fetch_record(cred_id).await?;
                let flow = PresentationFlow::new(
                    app.client.clone(),
                    app.session.clone(),
                    app.downloads(),
                    DisclosurePolicy::new(app.settings.minimum_claims),
                );
                let result = flow.generate(cred_id, &claims).await;
                debug!("Credential {} is now {:?}", cred_id, flow.state(cred_id));
                println!("Presentation saved to {}", result?.display());
            }
            Command::Download { cred_id } => {
                let record = app.fetch_record(cred_id).await?;
                let path = app.downloads().save_record(&record)?;
                println!("Saved {}", path.display());
            }
            Command::Verify { path } => {
                let report = Verifier::new(app.client.clone()).verify_file(&path).await?;
                println!("{}", report.summary());
            }
            Command::Upload { path } => {
                let document = load_document(&path)?;
                let message = app.client.upload_document(&app.session, &document).await?;
                println!("{}", message);
            }
            Command::Issue {
                name,
                holder_email,
                course,
                grade,
                completion_date,
                save,
            } => {
                let request = IssueCredentialRequest {
                    name,
                    holder_email,
                    course,
                    grade,
                    completion_date,
                };
                let downloads = app.downloads();
                let issuer = CredentialIssuer::new(app.client.clone(), app.session.clone());
                let (document, saved) = issuer
                    .issue(&request, save.then_some(&downloads))
                    .await?;
                match saved {
                    Some(path) => println!("Credential issued and saved to {}", path.display()),
                    None => println!("{}", serde_json::to_string_pretty(&document)?),
                }
            }
            Command::Register { email, password } => {
                let issuer = CredentialIssuer::new(app.client.clone(), app.session.clone());
                println!("{}", issuer.register_holder(&email, &password).await?);
            }
            Command::Dashboard => {
                let issuer = CredentialIssuer::new(app.client.clone(), app.session.clone());
                let data = issuer.dashboard().await?;
                println!("Credentials issued:  {}", data.stats.credentials_issued);
                println!("Active students:     {}", data.stats.active_students);
                println!("Revoked credentials: {}", data.stats.revoked_credentials);
                if !data.recent_activity.is_empty() {
                    println!();
                    println!("Recent activity:");
                    for line in &data.recent_activity {
                        println!("  {}", line);
                    }
                }
            }
        }
        Ok(())
    }
}

fn print_record(record: &CredentialRecord) {
    let issued = record
        .issued_at_time()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| record.issued_at.clone());
    println!(
        "{:>5}  {:<3}  {:<40}  {}",
        record.cred_id,
        record.category.as_str(),
        record.title(),
        issued
    );
}
