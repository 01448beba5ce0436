// src/wallet/mod.rs
pub mod credential_storage;
pub mod session;
