// src/models/mod.rs
pub mod credential;
pub mod presentation;
pub mod user;
