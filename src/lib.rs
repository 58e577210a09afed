//! Secure-link token validation service library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod cache;
pub mod clock;
pub mod config;
pub mod decision;
pub mod geo;
pub mod link;
pub mod routes;
pub mod secrets;
pub mod state;
pub mod token;
