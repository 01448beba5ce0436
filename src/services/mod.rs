// src/services/mod.rs
pub mod api_client;
pub mod credential_issuer;
pub mod disclosure;
pub mod presentation;
pub mod verifier;
