// src/storage/mod.rs
pub mod downloads;
pub mod session_store;
