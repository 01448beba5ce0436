// src/models/user.rs
//! Portal account as reported by the login and `me` endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned to an account by the portal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Issuer,
    Holder,
    Verifier,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Issuer => "issuer",
            Role::Holder => "holder",
            Role::Verifier => "verifier",
            Role::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// The logged-in account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    #[serde(default)]
    pub user_id: Option<i64>,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn is_issuer(&self) -> bool {
        self.role == Role::Issuer
    }
}
